//! Memoized per-file line counts, invalidated by size and modification time.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::fs::tree::{FileTree, LineCount, NodeId};

/// Files larger than this are never read (1 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 1_048_576;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheEntry {
    size: u64,
    mtime: Option<SystemTime>,
    count: u64,
}

/// What `ensure_line_count` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOutcome {
    /// Size and mtime matched; no read.
    Cached,
    /// First count for this path.
    Counted,
    /// A cached count existed but the file changed on disk; re-read.
    Recounted,
    /// Above the size ceiling.
    Skipped,
    /// Stat or read failed.
    Unavailable,
    /// Not a file node.
    NotAFile,
}

/// Path-keyed cache of `(size, mtime, count)`.
#[derive(Debug)]
pub struct LineCountCache {
    entries: HashMap<PathBuf, CacheEntry>,
    max_bytes: u64,
    reads: u64,
}

impl Default for LineCountCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}

impl LineCountCache {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            entries: HashMap::new(),
            max_bytes,
            reads: 0,
        }
    }

    /// Number of file contents read so far.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Count lines of `path`, reusing the cached count when size and mtime
    /// are unchanged.
    pub fn count(&mut self, path: &Path) -> (LineCount, CountOutcome) {
        let metadata = match fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return (LineCount::Unavailable, CountOutcome::Unavailable),
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "stat failed, line count unknown");
                self.entries.remove(path);
                return (LineCount::Unavailable, CountOutcome::Unavailable);
            }
        };
        let size = metadata.len();
        let mtime = metadata.modified().ok();

        let previous = self.entries.get(path).copied();
        if let Some(entry) = previous {
            if entry.size == size && entry.mtime == mtime {
                return (LineCount::Counted(entry.count), CountOutcome::Cached);
            }
        }

        if size > self.max_bytes {
            self.entries.remove(path);
            return (LineCount::Skipped, CountOutcome::Skipped);
        }

        self.reads += 1;
        match fast_line_count(path) {
            Ok(count) => {
                self.entries
                    .insert(path.to_path_buf(), CacheEntry { size, mtime, count });
                let outcome = if previous.is_some() {
                    CountOutcome::Recounted
                } else {
                    CountOutcome::Counted
                };
                (LineCount::Counted(count), outcome)
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "read failed, line count unknown");
                self.entries.remove(path);
                (LineCount::Unavailable, CountOutcome::Unavailable)
            }
        }
    }

    /// Bring a file node's line count up to date.
    pub fn ensure_line_count(&mut self, tree: &mut FileTree, id: NodeId) -> CountOutcome {
        if tree.node(id).is_dir() {
            return CountOutcome::NotAFile;
        }
        let path = tree.node(id).path.clone();
        let (count, outcome) = self.count(&path);
        if let Some(file) = tree.node_mut(id).file_mut() {
            file.line_count = count;
        }
        outcome
    }
}

/// Count lines using byte scanning in 64KB chunks.
///
/// A final line without a trailing newline still counts; an empty file has
/// zero lines.
pub fn fast_line_count(path: &Path) -> std::io::Result<u64> {
    let mut file = fs::File::open(path)?;
    let mut buf = [0u8; 65536];
    let mut count = 0u64;
    let mut last = None;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        count += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
        last = Some(buf[n - 1]);
    }
    if matches!(last, Some(b) if b != b'\n') {
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::tree::MAX_DEPTH;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn counts_lines_with_and_without_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, "one\ntwo\nthree\n").unwrap();
        assert_eq!(fast_line_count(&a).unwrap(), 3);
        fs::write(&a, "one\ntwo").unwrap();
        assert_eq!(fast_line_count(&a).unwrap(), 2);
        fs::write(&a, "").unwrap();
        assert_eq!(fast_line_count(&a).unwrap(), 0);
        fs::write(&a, "single").unwrap();
        assert_eq!(fast_line_count(&a).unwrap(), 1);
    }

    #[test]
    fn unchanged_file_is_not_reread() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "1\n2\n3\n").unwrap();

        let mut cache = LineCountCache::default();
        assert_eq!(cache.count(&path), (LineCount::Counted(3), CountOutcome::Counted));
        assert_eq!(cache.reads(), 1);
        for _ in 0..5 {
            assert_eq!(cache.count(&path), (LineCount::Counted(3), CountOutcome::Cached));
        }
        assert_eq!(cache.reads(), 1);
    }

    #[test]
    fn size_change_forces_reread() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "1\n2\n").unwrap();
        let mut cache = LineCountCache::default();
        cache.count(&path);

        fs::write(&path, "1\n2\n3\n4\n").unwrap();
        assert_eq!(cache.count(&path), (LineCount::Counted(4), CountOutcome::Recounted));
        assert_eq!(cache.reads(), 2);
    }

    #[test]
    fn mtime_change_forces_reread() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "ab\n").unwrap();
        let mut cache = LineCountCache::default();
        cache.count(&path);

        // Same size, different content and mtime.
        fs::write(&path, "a\nb").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(120))
            .unwrap();
        drop(file);

        assert_eq!(cache.count(&path), (LineCount::Counted(2), CountOutcome::Recounted));
        assert_eq!(cache.reads(), 2);
    }

    #[test]
    fn oversized_file_is_skipped_without_reading() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.log");
        fs::write(&path, "x\n".repeat(100)).unwrap();
        let mut cache = LineCountCache::new(16);
        assert_eq!(cache.count(&path), (LineCount::Skipped, CountOutcome::Skipped));
        assert_eq!(cache.reads(), 0);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut cache = LineCountCache::default();
        let (count, outcome) = cache.count(&dir.path().join("gone.txt"));
        assert_eq!(count, LineCount::Unavailable);
        assert_eq!(outcome, CountOutcome::Unavailable);
    }

    #[test]
    fn ensure_line_count_updates_node() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "fn a() {}\nfn b() {}\n").unwrap();

        let mut tree = FileTree::new(dir.path());
        let (id, _) = tree.ensure_file(Path::new("src/lib.rs"), MAX_DEPTH).unwrap();
        let mut cache = LineCountCache::default();
        assert_eq!(cache.ensure_line_count(&mut tree, id), CountOutcome::Counted);
        assert_eq!(tree.node(id).file().unwrap().line_count, LineCount::Counted(2));

        let src = tree.find(&dir.path().join("src")).unwrap();
        assert_eq!(cache.ensure_line_count(&mut tree, src), CountOutcome::NotAFile);
    }

    #[test]
    fn deleted_file_drops_cache_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "1\n").unwrap();
        let mut cache = LineCountCache::default();
        cache.count(&path);
        assert_eq!(cache.len(), 1);
        fs::remove_file(&path).unwrap();
        assert_eq!(cache.count(&path).0, LineCount::Unavailable);
        assert_eq!(cache.len(), 0);
    }
}
