//! Pure path string utilities.
//!
//! VFS paths are `/`-separated. A normalized path contains no empty
//! segments, no `.` segments and no `..` segments; the empty string denotes
//! the root. Platform separators are translated at the OS-path boundary by
//! the host backend, never here.

pub const SEPARATOR: char = '/';

/// Normalize a path in a single left-to-right scan.
///
/// Separator runs collapse, `.` segments drop, and `..` retracts the output
/// past the last emitted segment. Excess `..` above the root is silently
/// absorbed; normalization never fails and is idempotent.
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());

    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => match out.rfind(SEPARATOR) {
                Some(pos) => out.truncate(pos),
                None => out.clear(),
            },
            _ => {
                if !out.is_empty() {
                    out.push(SEPARATOR);
                }
                out.push_str(segment);
            }
        }
    }

    out
}

/// Split off the first segment: `"a/b/c"` becomes `("a", "b/c")`.
/// A single segment yields an empty remainder.
pub fn split_left(path: &str) -> (&str, &str) {
    match path.split_once(SEPARATOR) {
        Some((first, rest)) => (first, rest),
        None => (path, ""),
    }
}

/// Split off the last segment: `"a/b/c"` becomes `("a/b", "c")`.
/// A single segment yields an empty parent (the root).
pub fn split_right(path: &str) -> (&str, &str) {
    match path.rsplit_once(SEPARATOR) {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn normalize_examples() {
        assert_eq!(normalize("a//b/../c/./"), "a/c");
        assert_eq!(normalize("/a/b"), "a/b");
        assert_eq!(normalize("a/b/"), "a/b");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("."), "");
        assert_eq!(normalize("./././"), "");
        assert_eq!(normalize("a/.."), "");
        assert_eq!(normalize("../../a"), "a");
        assert_eq!(normalize("a/../../../b"), "b");
        assert_eq!(normalize("a/b/c/../../d"), "a/d");
        assert_eq!(normalize("..a/b..c/..."), "..a/b..c/...");
    }

    #[test]
    fn split_left_right() {
        assert_eq!(split_left("a/b/c"), ("a", "b/c"));
        assert_eq!(split_left("a"), ("a", ""));
        assert_eq!(split_right("a/b/c"), ("a/b", "c"));
        assert_eq!(split_right("a"), ("", "a"));
    }

    // Property: normalization is idempotent and the result contains no
    // empty, `.` or `..` segments, over a randomized corpus.
    #[test]
    fn normalize_properties() {
        let pieces = ["a", "bb", "ccc", ".", "..", "", "d.e", "..f"];
        let mut rng = SmallRng::seed_from_u64(0x76667370);

        for _ in 0..10_000 {
            let len = rng.random_range(0..12);
            let mut path = String::new();
            for i in 0..len {
                if i > 0 || rng.random_bool(0.3) {
                    for _ in 0..rng.random_range(1..=3) {
                        path.push(SEPARATOR);
                    }
                }
                path.push_str(pieces[rng.random_range(0..pieces.len())]);
            }

            let once = normalize(&path);
            assert_eq!(normalize(&once), once, "not idempotent for {path:?}");

            if !once.is_empty() {
                for segment in once.split(SEPARATOR) {
                    assert!(
                        !segment.is_empty() && segment != "." && segment != "..",
                        "bad segment in {once:?} (from {path:?})"
                    );
                }
            }
        }
    }
}
