use bitflags::bitflags;

bitflags! {
    /// Open mode bits. `READ` and `WRITE` may be combined; `SEEKABLE`
    /// asks for efficient random access (backends may emulate it).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct OpenMode: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const SEEKABLE = 1 << 2;
    }
}

impl OpenMode {
    pub fn is_write(self) -> bool {
        self.contains(OpenMode::WRITE)
    }
}
