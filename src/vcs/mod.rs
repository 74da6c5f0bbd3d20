//! Version-control status: status codes, numstat diffs, and the snapshot a poll
//! produces. Everything here is plain data; `git` holds the process plumbing.

pub mod git;
pub mod poller;

use std::collections::HashMap;
use std::path::PathBuf;

/// Per-path status code reported by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Untracked,
    Ignored,
    /// Unmerged, type-changed, copied and anything else.
    Other,
}

impl VcsStatus {
    /// Map a porcelain `XY` pair to a single code, worktree side first.
    pub fn from_porcelain(index: char, worktree: char) -> Option<Self> {
        match (index, worktree) {
            ('?', '?') => return Some(VcsStatus::Untracked),
            ('!', '!') => return Some(VcsStatus::Ignored),
            ('U', _) | (_, 'U') | ('A', 'A') | ('D', 'D') => return Some(VcsStatus::Other),
            _ => {}
        }
        let code = if worktree != ' ' { worktree } else { index };
        match code {
            'M' => Some(VcsStatus::Modified),
            'A' => Some(VcsStatus::Added),
            'D' => Some(VcsStatus::Deleted),
            'R' => Some(VcsStatus::Renamed),
            ' ' => None,
            _ => Some(VcsStatus::Other),
        }
    }

    /// Whether this status counts as a change for the "only changed" view.
    pub fn is_change(self) -> bool {
        !matches!(self, VcsStatus::Ignored)
    }

    /// One-character badge shown next to the entry name.
    pub fn badge(self) -> char {
        match self {
            VcsStatus::Modified => 'M',
            VcsStatus::Added => 'A',
            VcsStatus::Deleted => 'D',
            VcsStatus::Renamed => 'R',
            VcsStatus::Untracked => '?',
            VcsStatus::Ignored => '!',
            VcsStatus::Other => '~',
        }
    }
}

/// Added/removed line counts for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffStats {
    pub added: u64,
    pub removed: u64,
}

impl DiffStats {
    pub fn new(added: u64, removed: u64) -> Self {
        Self { added, removed }
    }
}

impl std::ops::AddAssign for DiffStats {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.removed += rhs.removed;
    }
}

/// Everything one status poll learned about the repository.
///
/// Keys are absolute paths. An empty snapshot means "no data", which is also
/// what every failure degrades to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsSnapshot {
    pub is_repository: bool,
    pub branch: Option<String>,
    pub statuses: HashMap<PathBuf, VcsStatus>,
    pub diffs: HashMap<PathBuf, DiffStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn porcelain_codes() {
        assert_eq!(VcsStatus::from_porcelain('?', '?'), Some(VcsStatus::Untracked));
        assert_eq!(VcsStatus::from_porcelain('!', '!'), Some(VcsStatus::Ignored));
        assert_eq!(VcsStatus::from_porcelain(' ', 'M'), Some(VcsStatus::Modified));
        assert_eq!(VcsStatus::from_porcelain('M', ' '), Some(VcsStatus::Modified));
        assert_eq!(VcsStatus::from_porcelain('A', ' '), Some(VcsStatus::Added));
        assert_eq!(VcsStatus::from_porcelain('A', 'M'), Some(VcsStatus::Modified));
        assert_eq!(VcsStatus::from_porcelain(' ', 'D'), Some(VcsStatus::Deleted));
        assert_eq!(VcsStatus::from_porcelain('R', ' '), Some(VcsStatus::Renamed));
        assert_eq!(VcsStatus::from_porcelain('U', 'U'), Some(VcsStatus::Other));
        assert_eq!(VcsStatus::from_porcelain('T', ' '), Some(VcsStatus::Other));
        assert_eq!(VcsStatus::from_porcelain(' ', ' '), None);
    }

    #[test]
    fn ignored_is_not_a_change() {
        assert!(!VcsStatus::Ignored.is_change());
        assert!(VcsStatus::Untracked.is_change());
        assert!(VcsStatus::Deleted.is_change());
    }

    #[test]
    fn diff_stats_sum() {
        let mut total = DiffStats::new(3, 1);
        total += DiffStats::new(2, 4);
        assert_eq!(total, DiffStats::new(5, 5));
    }
}
