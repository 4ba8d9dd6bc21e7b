use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use crate::filesystem::dev_ino;

/// Outcome of registering a directory before descending into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SymloopStatus {
    /// First visit, recursion may proceed.
    Entered,
    /// The `(device, inode)` pair was seen before: a symlink or hardlink
    /// cycle, or a subtree reachable through two paths. Either way the
    /// subtree is skipped.
    Loop,
}

/// Process-wide set of visited directory identities.
///
/// Keys are never removed: reaching the same directory twice through any
/// route counts as a loop for the lifetime of the search.
#[derive(Debug, Default)]
pub struct SymloopGuard {
    seen: Mutex<HashSet<(u64, u64)>>,
}

impl SymloopGuard {
    pub fn new() -> SymloopGuard {
        SymloopGuard::default()
    }

    /// Stat `path` and atomically record its identity.
    pub fn enter(&self, path: &Path) -> io::Result<SymloopStatus> {
        let md = fs::metadata(path)?;
        let key = dev_ino(&md);

        let mut seen = self.seen.lock().unwrap();
        if seen.insert(key) {
            Ok(SymloopStatus::Entered)
        } else {
            Ok(SymloopStatus::Loop)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_visit_is_a_loop() {
        let dir = tempfile::tempdir().unwrap();
        let guard = SymloopGuard::new();

        assert_eq!(guard.enter(dir.path()).unwrap(), SymloopStatus::Entered);
        assert_eq!(guard.enter(dir.path()).unwrap(), SymloopStatus::Loop);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_visited_directory_is_a_loop() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("loop");
        std::os::unix::fs::symlink(dir.path(), &link).unwrap();

        let guard = SymloopGuard::new();
        assert_eq!(guard.enter(dir.path()).unwrap(), SymloopStatus::Entered);
        assert_eq!(guard.enter(&link).unwrap(), SymloopStatus::Loop);
    }

    #[test]
    fn missing_path_is_an_error() {
        let guard = SymloopGuard::new();
        assert!(guard.enter(Path::new("/definitely/not/here")).is_err());
    }
}
