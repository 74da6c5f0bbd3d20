//! Cooperative, batched directory scanning.
//!
//! The scheduler never runs on its own: the event loop calls `run_batch` on
//! every tick and the scheduler decides whether a batch is due. Each batch
//! lists a handful of directories, so the loop is blocked for at most one
//! batch's worth of I/O.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::fs::ignore::IgnorePolicy;
use crate::fs::tree::{FileTree, NodeId, MAX_DEPTH};

/// Default number of directories listed per batch.
pub const DEFAULT_BATCH_SIZE: usize = 4;
/// Default delay between batches in milliseconds.
pub const DEFAULT_BATCH_DELAY_MS: u64 = 30;
/// Delay between batches in safe mode in milliseconds.
pub const DEFAULT_SAFE_BATCH_DELAY_MS: u64 = 250;
/// First-level entry count above which the root is scanned in safe mode.
pub const DEFAULT_SAFE_MODE_THRESHOLD: usize = 2000;
/// Entries created per directory before it is marked partial.
pub const DEFAULT_MAX_DIR_ENTRIES: usize = 5000;

/// Tunables for the scanner.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub safe_batch_delay: Duration,
    pub safe_mode_threshold: usize,
    pub max_depth: usize,
    pub max_dir_entries: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            safe_batch_delay: Duration::from_millis(DEFAULT_SAFE_BATCH_DELAY_MS),
            safe_mode_threshold: DEFAULT_SAFE_MODE_THRESHOLD,
            max_depth: MAX_DEPTH,
            max_dir_entries: DEFAULT_MAX_DIR_ENTRIES,
        }
    }
}

/// A queued directory scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTask {
    pub node: NodeId,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Normal,
    /// One directory per batch, one level deep, longer delay.
    Safe,
}

/// What one batch did.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub scanned: usize,
    /// Files created by this batch, in creation order.
    pub new_files: Vec<NodeId>,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.scanned == 0
    }
}

/// FIFO of pending directory scans with per-path de-duplication.
#[derive(Debug)]
pub struct ScanScheduler {
    settings: ScanSettings,
    mode: ScanMode,
    queue: VecDeque<ScanTask>,
    queued: HashSet<PathBuf>,
    next_batch: Option<Instant>,
}

impl ScanScheduler {
    pub fn new(settings: ScanSettings) -> Self {
        Self {
            settings,
            mode: ScanMode::Normal,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            next_batch: None,
        }
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &ScanTask> {
        self.queue.iter()
    }

    /// Whether `root` should be scanned in safe mode: the home directory, the
    /// filesystem root, or a directory with too many first-level entries.
    pub fn needs_safe_mode(root: &Path, threshold: usize) -> bool {
        if root.parent().is_none() {
            return true;
        }
        if dirs::home_dir().is_some_and(|home| home.canonicalize().unwrap_or(home) == root) {
            return true;
        }
        match fs::read_dir(root) {
            Ok(entries) => entries.take(threshold.saturating_add(1)).count() > threshold,
            Err(_) => false,
        }
    }

    /// Pick the scan mode for the tree's root and queue the root scan.
    pub fn start(&mut self, tree: &mut FileTree, now: Instant) {
        if Self::needs_safe_mode(tree.root_path(), self.settings.safe_mode_threshold) {
            tracing::info!(root = %tree.root_path().display(), "large or sensitive root, scanning in safe mode");
            self.mode = ScanMode::Safe;
            tree.partial = true;
        }
        self.enqueue(tree, NodeId::ROOT, now);
    }

    /// Queue a background scan at the back of the queue.
    pub fn enqueue(&mut self, tree: &mut FileTree, id: NodeId, now: Instant) -> bool {
        self.push(tree, id, now, false)
    }

    /// Queue a user-requested scan ahead of background work.
    pub fn enqueue_urgent(&mut self, tree: &mut FileTree, id: NodeId, now: Instant) -> bool {
        self.push(tree, id, now, true)
    }

    fn push(&mut self, tree: &mut FileTree, id: NodeId, now: Instant, urgent: bool) -> bool {
        let max_depth = self.settings.max_depth.min(MAX_DEPTH);
        let node = tree.node_mut(id);
        let depth = node.depth;
        let path = node.path.clone();
        let Some(dir) = node.dir_mut() else {
            return false;
        };
        if depth >= max_depth {
            dir.partial = true;
            return false;
        }
        if self.queued.contains(&path) {
            if urgent {
                if let Some(pos) = self.queue.iter().position(|t| t.node == id) {
                    if let Some(task) = self.queue.remove(pos) {
                        self.queue.push_front(task);
                    }
                }
            }
            return false;
        }
        dir.loading = true;
        self.queued.insert(path);
        let task = ScanTask { node: id, depth };
        if urgent {
            self.queue.push_front(task);
            self.next_batch = Some(now);
        } else {
            self.queue.push_back(task);
            self.next_batch.get_or_insert(now);
        }
        true
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_batch.is_some_and(|at| now >= at)
    }

    /// Deepest level scanned without the user asking for it.
    fn auto_scan_depth(&self) -> usize {
        match self.mode {
            ScanMode::Normal => self.settings.max_depth.min(MAX_DEPTH).saturating_sub(1),
            ScanMode::Safe => 1,
        }
    }

    /// Run one batch if it is due.
    pub fn run_batch(&mut self, tree: &mut FileTree, ignore: &IgnorePolicy, now: Instant) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if !self.is_due(now) {
            return outcome;
        }
        let (batch_size, delay) = match self.mode {
            ScanMode::Normal => (self.settings.batch_size.max(1), self.settings.batch_delay),
            ScanMode::Safe => (1, self.settings.safe_batch_delay),
        };

        for _ in 0..batch_size {
            let Some(task) = self.queue.pop_front() else {
                break;
            };
            self.queued.remove(&tree.node(task.node).path);
            let subdirs = self.scan_directory(tree, ignore, task, &mut outcome.new_files);
            for subdir in subdirs {
                self.enqueue(tree, subdir, now);
            }
            outcome.scanned += 1;
        }

        self.next_batch = if self.queue.is_empty() {
            None
        } else {
            Some(now + delay)
        };
        outcome
    }

    /// List one directory and create its children. Returns the subdirectories
    /// that should be scanned next.
    fn scan_directory(
        &self,
        tree: &mut FileTree,
        ignore: &IgnorePolicy,
        task: ScanTask,
        new_files: &mut Vec<NodeId>,
    ) -> Vec<NodeId> {
        let path = tree.node(task.node).path.clone();
        let mut subdirs = Vec::new();

        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "directory listing failed");
                tree.mark_scanned(task.node);
                if let Some(dir) = tree.node_mut(task.node).dir_mut() {
                    dir.loading = false;
                }
                return subdirs;
            }
        };

        let mut listed = Vec::new();
        let mut truncated = false;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if ignore.is_ignored(&name) {
                continue;
            }
            let Some(is_dir) = classify(&entry) else {
                continue;
            };
            if listed.len() >= self.settings.max_dir_entries {
                truncated = true;
                break;
            }
            listed.push((name, is_dir));
        }

        tree.mark_scanned(task.node);
        let auto_depth = self.auto_scan_depth();
        let max_depth = self.settings.max_depth.min(MAX_DEPTH);
        for (name, is_dir) in listed {
            let Some((child, created)) = tree.add_child(task.node, &name, is_dir) else {
                continue;
            };
            let child_node = tree.node(child);
            if child_node.is_dir() != is_dir {
                continue;
            }
            if !is_dir {
                if created {
                    new_files.push(child);
                }
                continue;
            }
            let unscanned = child_node.dir().is_some_and(|d| d.children.is_none());
            if !unscanned {
                continue;
            }
            let depth = child_node.depth;
            if depth >= max_depth {
                if let Some(dir) = tree.node_mut(child).dir_mut() {
                    dir.partial = true;
                }
            } else if depth <= auto_depth {
                subdirs.push(child);
            }
        }

        if let Some(dir) = tree.node_mut(task.node).dir_mut() {
            dir.loading = false;
            if truncated {
                dir.partial = true;
            }
        }
        subdirs
    }

    /// Drop all pending work. Directories that were waiting stop loading.
    pub fn cancel(&mut self, tree: &mut FileTree) {
        for task in self.queue.drain(..) {
            if let Some(dir) = tree.node_mut(task.node).dir_mut() {
                dir.loading = false;
            }
        }
        self.queued.clear();
        self.next_batch = None;
    }
}

/// Directory or file, following symlinks. `None` for broken links and
/// entries that cannot be stat'ed.
fn classify(entry: &fs::DirEntry) -> Option<bool> {
    let file_type = entry.file_type().ok()?;
    if file_type.is_symlink() {
        return fs::metadata(entry.path()).ok().map(|m| m.is_dir());
    }
    Some(file_type.is_dir())
}
