//! Small shared utilities.

use std::path::{Path, PathBuf};

/// Creates a unique binary id for the given lines.
///
/// The hash is order-sensitive: each line is folded into the digest in
/// sequence, so reordering training lines invalidates cached models.
pub fn lines_hash(lines: &[String]) -> [u8; 4] {
    let mut hasher = crc32fast::Hasher::new();
    for line in lines {
        hasher.update(line.as_bytes());
    }
    hasher.finalize().to_be_bytes()
}

/// Append a suffix to a path's file name, e.g. `cache/greet` + `.hash`
/// becomes `cache/greet.hash`.
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_hash_deterministic() {
        let lines = vec!["hello there".to_string(), "hi".to_string()];
        assert_eq!(lines_hash(&lines), lines_hash(&lines));
    }

    #[test]
    fn test_lines_hash_order_sensitive() {
        let forward = vec!["a".to_string(), "b".to_string()];
        let backward = vec!["b".to_string(), "a".to_string()];
        assert_ne!(lines_hash(&forward), lines_hash(&backward));
    }

    #[test]
    fn test_append_suffix() {
        let path = Path::new("cache/greet");
        assert_eq!(append_suffix(path, ".hash"), PathBuf::from("cache/greet.hash"));
        assert_eq!(
            append_suffix(&append_suffix(path, ".pos"), ".{place}.l.net"),
            PathBuf::from("cache/greet.pos.{place}.l.net")
        );
    }
}
