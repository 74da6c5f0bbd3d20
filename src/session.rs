//! The browsing session: owns the tree and every piece of state that keeps it
//! in sync with the filesystem and the repository.
//!
//! All mutation happens on the event loop. Background work is expressed as
//! deadlines (`scan`, `line count`) checked by `tick`, plus status snapshots
//! delivered to `reconcile`.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::fs::ignore::IgnorePolicy;
use crate::fs::line_count::{CountOutcome, LineCountCache, DEFAULT_MAX_BYTES};
use crate::fs::projection::{self, FlatEntry, ProjectionFilter};
use crate::fs::reconcile;
use crate::fs::scan::{ScanMode, ScanScheduler, ScanSettings};
use crate::fs::stats;
use crate::fs::tree::{FileTree, LineCount, Node, NodeId};
use crate::vcs::VcsSnapshot;

/// Default number of files counted per line-count batch.
pub const DEFAULT_COUNT_BATCH_SIZE: usize = 8;
/// Default delay between line-count batches in milliseconds.
pub const DEFAULT_COUNT_BATCH_DELAY_MS: u64 = 20;

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub scan: ScanSettings,
    pub line_count_max_bytes: u64,
    pub count_batch_size: usize,
    pub count_batch_delay: Duration,
    pub untracked_as_added: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            scan: ScanSettings::default(),
            line_count_max_bytes: DEFAULT_MAX_BYTES,
            count_batch_size: DEFAULT_COUNT_BATCH_SIZE,
            count_batch_delay: Duration::from_millis(DEFAULT_COUNT_BATCH_DELAY_MS),
            untracked_as_added: true,
        }
    }
}

/// How the tree was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSource {
    /// Lazily, by scanning directories.
    Plain,
    /// Eagerly, from the repository's file list.
    Vcs,
}

/// Result of applying a status snapshot.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The viewer's file, resolved again by path.
    pub viewer: Option<NodeId>,
    /// Nodes created for newly reported paths.
    pub added: usize,
    /// Whether any node data changed.
    pub changed: bool,
}

/// FIFO of files waiting for a line count, de-duplicated by node.
#[derive(Debug, Default)]
struct CountQueue {
    queue: VecDeque<NodeId>,
    queued: HashSet<NodeId>,
    next_batch: Option<Instant>,
}

impl CountQueue {
    fn push(&mut self, id: NodeId, now: Instant) {
        if self.queued.insert(id) {
            self.queue.push_back(id);
            self.next_batch.get_or_insert(now);
        }
    }

    fn is_due(&self, now: Instant) -> bool {
        self.next_batch.is_some_and(|at| now >= at)
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
        self.next_batch = None;
    }
}

pub struct BrowserSession {
    tree: FileTree,
    source: TreeSource,
    ignore: IgnorePolicy,
    settings: SessionSettings,
    scanner: ScanScheduler,
    counter: LineCountCache,
    counts: CountQueue,
    /// Paths supplied by the edit tracker.
    external: HashSet<PathBuf>,
    /// Files whose content changed on disk since they were last counted.
    changed_on_disk: Vec<PathBuf>,
    branch: Option<String>,
    partial: bool,
    closed: bool,

    filter: ProjectionFilter,
    entries: Vec<FlatEntry>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    height: usize,
}

impl BrowserSession {
    fn with_tree(tree: FileTree, source: TreeSource, ignore: IgnorePolicy, settings: SessionSettings) -> Self {
        Self {
            tree,
            source,
            ignore,
            scanner: ScanScheduler::new(settings.scan.clone()),
            counter: LineCountCache::new(settings.line_count_max_bytes),
            settings,
            counts: CountQueue::default(),
            external: HashSet::new(),
            changed_on_disk: Vec::new(),
            branch: None,
            partial: false,
            closed: false,
            filter: ProjectionFilter::default(),
            entries: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            height: 0,
        }
    }

    /// Open a plain directory. The tree starts with the root only and fills
    /// in as scan batches run.
    pub fn open_plain(root: &Path, ignore: IgnorePolicy, settings: SessionSettings, now: Instant) -> Self {
        let tree = FileTree::new(root);
        let mut session = Self::with_tree(tree, TreeSource::Plain, ignore, settings);
        session.scanner.start(&mut session.tree, now);
        tracing::info!(root = %root.display(), mode = ?session.scanner.mode(), "opened plain directory");
        session.settle();
        session
    }

    /// Open a version-controlled project from its file list (relative to
    /// `root`) and an initial status snapshot. Every directory is known up
    /// front; only line counts arrive later.
    pub fn open_vcs(
        root: &Path,
        files: &[PathBuf],
        snapshot: &VcsSnapshot,
        ignore: IgnorePolicy,
        settings: SessionSettings,
        now: Instant,
    ) -> Self {
        let tree = FileTree::from_file_list(root, files, &ignore, settings.scan.max_depth);
        let mut session = Self::with_tree(tree, TreeSource::Vcs, ignore, settings);
        let applied = reconcile::apply_snapshot(
            &mut session.tree,
            snapshot,
            &session.external,
            &session.ignore,
            session.settings.scan.max_depth,
        );
        session.branch = snapshot.branch.clone();
        let files: Vec<NodeId> = session.tree.file_ids().collect();
        for id in files {
            session.counts.push(id, now);
        }
        tracing::info!(
            root = %root.display(),
            nodes = session.tree.len(),
            synthesized = applied.added.len(),
            "opened repository"
        );
        session.settle();
        session
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn source(&self) -> TreeSource {
        self.source
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.tree.node(id)
    }

    pub fn root_path(&self) -> &Path {
        self.tree.root_path()
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn untracked_as_added(&self) -> bool {
        self.settings.untracked_as_added
    }

    /// Some scan was throttled or truncated.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Scans or line counts are still pending.
    pub fn is_busy(&self) -> bool {
        !self.scanner.is_idle() || !self.counts.queue.is_empty()
    }

    pub fn scan_mode(&self) -> ScanMode {
        self.scanner.mode()
    }

    pub fn line_count_reads(&self) -> u64 {
        self.counter.reads()
    }

    // Projection

    /// Set the filters and return the resulting projection.
    pub fn get_projection(&mut self, filter_text: &str, only_changed: bool) -> &[FlatEntry] {
        let filter = ProjectionFilter::new(filter_text, only_changed);
        if filter != self.filter {
            self.filter = filter;
            self.rebuild();
        }
        &self.entries
    }

    /// The current projection.
    pub fn entries(&self) -> &[FlatEntry] {
        &self.entries
    }

    pub fn filter(&self) -> &ProjectionFilter {
        &self.filter
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter.text.push(c);
        self.rebuild();
    }

    pub fn pop_filter_char(&mut self) {
        if self.filter.text.pop().is_some() {
            self.rebuild();
        }
    }

    pub fn clear_filter(&mut self) {
        if !self.filter.text.is_empty() {
            self.filter.text.clear();
            self.rebuild();
        }
    }

    pub fn toggle_only_changed(&mut self) {
        self.filter.only_changed = !self.filter.only_changed;
        self.rebuild();
    }

    /// Recompute the projection and put the selection back on the same path.
    fn rebuild(&mut self) {
        let selected_path = self.selected_path();
        self.entries = projection::project(&self.tree, &self.filter);
        self.restore_selection(selected_path.as_deref());
    }

    fn restore_selection(&mut self, path: Option<&Path>) {
        let found = path
            .and_then(|p| self.tree.find(p))
            .and_then(|id| projection::position_of(&self.entries, id));
        self.selected_index = match found {
            Some(index) => index,
            None => self.selected_index.min(self.entries.len().saturating_sub(1)),
        };
        self.update_scroll();
    }

    /// Recompute aggregates and derived flags, then the projection.
    fn settle(&mut self) {
        stats::recompute(&mut self.tree, self.settings.untracked_as_added);
        self.partial = self.tree.partial
            || self
                .tree
                .ids()
                .any(|id| self.tree.node(id).dir().is_some_and(|d| d.partial));
        self.rebuild();
    }

    // Cursor

    pub fn selected(&self) -> Option<NodeId> {
        self.entries.get(self.selected_index).map(|e| e.id)
    }

    pub fn selected_path(&self) -> Option<PathBuf> {
        self.selected().map(|id| self.tree.node(id).path.clone())
    }

    pub fn select_next(&mut self) {
        let len = self.entries.len();
        if len > 0 && self.selected_index < len - 1 {
            self.selected_index += 1;
        }
        self.update_scroll();
    }

    pub fn select_previous(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
        self.update_scroll();
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
        self.update_scroll();
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.entries.len().saturating_sub(1);
        self.update_scroll();
    }

    pub fn page_down(&mut self) {
        let step = self.height.max(1);
        self.selected_index = (self.selected_index + step).min(self.entries.len().saturating_sub(1));
        self.update_scroll();
    }

    pub fn page_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(self.height.max(1));
        self.update_scroll();
    }

    /// Select the entry for `path` if it is in the projection.
    pub fn select_path(&mut self, path: &Path) -> bool {
        let Some(index) = self
            .tree
            .find(path)
            .and_then(|id| projection::position_of(&self.entries, id))
        else {
            return false;
        };
        self.selected_index = index;
        self.update_scroll();
        true
    }

    /// Rows available to the tree panel.
    pub fn set_height(&mut self, height: usize) {
        self.height = height;
        self.update_scroll();
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Adjust scroll offset to keep the selected item visible.
    fn update_scroll(&mut self) {
        if self.height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + self.height {
            self.scroll_offset = self.selected_index + 1 - self.height;
        }
        let max_offset = self.entries.len().saturating_sub(self.height);
        self.scroll_offset = self.scroll_offset.min(max_offset);
    }

    // Structure

    /// Expand or collapse a directory. Expanding an unscanned directory
    /// queues its scan ahead of background work; in a plain directory an
    /// already scanned one is rescanned to pick up new entries.
    pub fn toggle_expand(&mut self, id: NodeId, now: Instant) -> bool {
        let Some(dir) = self.tree.node(id).dir() else {
            return false;
        };
        let expand = !dir.expanded;
        let unscanned = dir.children.is_none();
        self.tree.set_expanded(id, expand);
        if expand && !self.closed && (unscanned || self.source == TreeSource::Plain) {
            self.scanner.enqueue_urgent(&mut self.tree, id, now);
        }
        self.settle();
        true
    }

    /// Expand the selected directory.
    pub fn expand_selected(&mut self, now: Instant) {
        if let Some(id) = self.selected() {
            if !self.tree.node(id).is_expanded() {
                self.toggle_expand(id, now);
            }
        }
    }

    /// Collapse the selected directory, or jump to its parent.
    pub fn collapse_selected(&mut self, now: Instant) {
        let Some(id) = self.selected() else {
            return;
        };
        if self.tree.node(id).is_expanded() {
            self.toggle_expand(id, now);
            return;
        }
        if let Some(parent) = self.tree.node(id).parent {
            if let Some(index) = projection::position_of(&self.entries, parent) {
                self.selected_index = index;
                self.update_scroll();
            }
        }
    }

    /// Count a file's lines now, bypassing the queue.
    pub fn ensure_line_count(&mut self, id: NodeId) -> CountOutcome {
        let outcome = self.counter.ensure_line_count(&mut self.tree, id);
        self.note_count(id, outcome);
        if outcome != CountOutcome::Cached && outcome != CountOutcome::NotAFile {
            self.settle();
        }
        outcome
    }

    fn note_count(&mut self, id: NodeId, outcome: CountOutcome) {
        if outcome == CountOutcome::Recounted {
            self.changed_on_disk.push(self.tree.node(id).path.clone());
        }
    }

    /// Queue a file for the next line-count batch.
    pub fn queue_line_count(&mut self, id: NodeId, now: Instant) {
        if !self.closed && !self.tree.node(id).is_dir() {
            self.counts.push(id, now);
        }
    }

    /// Re-list expanded directories (plain trees) and recheck every known
    /// line count. Status is refreshed separately by the poller.
    pub fn refresh(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        if self.source == TreeSource::Plain {
            let expanded: Vec<NodeId> = self
                .tree
                .ids()
                .filter(|&id| {
                    let node = self.tree.node(id);
                    node.is_expanded() && node.dir().is_some_and(|d| d.children.is_some())
                })
                .collect();
            for id in expanded {
                self.scanner.enqueue(&mut self.tree, id, now);
            }
        }
        let files: Vec<NodeId> = self
            .tree
            .file_ids()
            .filter(|&id| {
                self.tree
                    .node(id)
                    .file()
                    .is_some_and(|f| f.line_count != LineCount::Skipped)
            })
            .collect();
        for id in files {
            self.counts.push(id, now);
        }
        tracing::debug!(pending = self.counts.queue.len(), "refresh queued");
        self.settle();
    }

    /// Run whatever background work is due. Returns true if the tree changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.closed {
            return false;
        }
        let mut dirty = false;

        let scanned = self.scanner.run_batch(&mut self.tree, &self.ignore, now);
        if !scanned.is_empty() {
            for id in scanned.new_files {
                self.counts.push(id, now);
            }
            dirty = true;
        }

        if self.counts.is_due(now) {
            for _ in 0..self.settings.count_batch_size.max(1) {
                let Some(id) = self.counts.queue.pop_front() else {
                    break;
                };
                self.counts.queued.remove(&id);
                let before = self.tree.node(id).file().map(|f| f.line_count);
                let outcome = self.counter.ensure_line_count(&mut self.tree, id);
                self.note_count(id, outcome);
                if self.tree.node(id).file().map(|f| f.line_count) != before {
                    dirty = true;
                }
            }
            self.counts.next_batch = if self.counts.queue.is_empty() {
                None
            } else {
                Some(now + self.settings.count_batch_delay)
            };
        }

        if dirty {
            self.settle();
        }
        dirty
    }

    /// Apply a status snapshot while keeping expansion, selection, and the
    /// viewer's file.
    pub fn reconcile(&mut self, snapshot: &VcsSnapshot, viewer_path: Option<&Path>, now: Instant) -> ReconcileOutcome {
        if self.closed {
            return ReconcileOutcome::default();
        }
        let selected_path = self.selected_path();
        let expanded = self.tree.collect_expanded_paths();

        self.branch = snapshot.branch.clone();
        let applied = reconcile::apply_snapshot(
            &mut self.tree,
            snapshot,
            &self.external,
            &self.ignore,
            self.settings.scan.max_depth,
        );
        for &id in applied.added.iter().chain(applied.touched.iter()) {
            self.queue_line_count(id, now);
        }

        for id in self.tree.restore_expanded(&expanded) {
            self.scanner.enqueue(&mut self.tree, id, now);
        }

        self.settle();
        self.restore_selection(selected_path.as_deref());

        if applied.changed() {
            tracing::debug!(added = applied.added.len(), touched = applied.touched.len(), "reconciled");
        }
        ReconcileOutcome {
            viewer: viewer_path.and_then(|p| self.tree.find(p)),
            added: applied.added.len(),
            changed: applied.changed(),
        }
    }

    /// Replace the externally-modified path set and update node markers.
    pub fn set_external_modified(&mut self, paths: HashSet<PathBuf>) {
        if paths == self.external {
            return;
        }
        self.external = paths;
        let ids: Vec<NodeId> = self.tree.ids().collect();
        for id in ids {
            let node = self.tree.node_mut(id);
            node.externally_modified = self.external.contains(&node.path);
        }
        self.settle();
    }

    /// Paths whose content changed since their previous count.
    pub fn drain_changed_on_disk(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.changed_on_disk)
    }

    /// End the session: drop every pending scan and count.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.scanner.cancel(&mut self.tree);
        self.counts.clear();
        self.closed = true;
        tracing::info!(
            reads = self.counter.reads(),
            cached = self.counter.len(),
            nodes = self.tree.len(),
            "session closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::tree::MAX_DEPTH;
    use crate::rows;
    use crate::vcs::{DiffStats, VcsStatus};
    use std::fs;
    use tempfile::TempDir;

    /// Run ticks until no work is left.
    fn drain(session: &mut BrowserSession) -> Instant {
        let mut now = Instant::now();
        for _ in 0..10_000 {
            if !session.is_busy() {
                break;
            }
            now += Duration::from_secs(1);
            session.tick(now);
        }
        assert!(!session.is_busy(), "session never settled");
        now
    }

    fn rel_entries(session: &BrowserSession) -> Vec<String> {
        session
            .entries()
            .iter()
            .map(|e| session.tree().relative_path(e.id).to_string_lossy().to_string())
            .collect()
    }

    fn write_lines(path: &Path, n: usize) {
        fs::write(path, "line\n".repeat(n)).unwrap();
    }

    /// `src/a.ts` untracked (10 lines), `src/b.ts` modified +3/-1 (12 lines),
    /// `node_modules/` ignored.
    fn scenario() -> (TempDir, BrowserSession) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        write_lines(&root.join("src/a.ts"), 10);
        write_lines(&root.join("src/b.ts"), 12);
        write_lines(&root.join("node_modules/pkg/index.js"), 50);

        let files = vec![
            PathBuf::from("src/a.ts"),
            PathBuf::from("src/b.ts"),
            PathBuf::from("node_modules/pkg/index.js"),
        ];
        let mut snapshot = VcsSnapshot {
            is_repository: true,
            branch: Some("main".into()),
            ..VcsSnapshot::default()
        };
        snapshot.statuses.insert(root.join("src/a.ts"), VcsStatus::Untracked);
        snapshot.statuses.insert(root.join("src/b.ts"), VcsStatus::Modified);
        snapshot.statuses.insert(root.join("node_modules"), VcsStatus::Ignored);
        snapshot.diffs.insert(root.join("src/b.ts"), DiffStats::new(3, 1));

        let mut session = BrowserSession::open_vcs(
            &root,
            &files,
            &snapshot,
            IgnorePolicy::default(),
            SessionSettings::default(),
            Instant::now(),
        );
        drain(&mut session);
        (dir, session)
    }

    #[test]
    fn scenario_totals_and_rows() {
        let (_dir, mut session) = scenario();
        let root = session.tree().node(NodeId::ROOT).totals;
        assert_eq!(root.lines, 22);
        assert!(root.complete);
        assert_eq!(root.added, 13);
        assert_eq!(root.removed, 1);

        assert_eq!(rel_entries(&session), vec!["src"]);
        let src = session.tree().find(&session.root_path().join("src")).unwrap();
        session.toggle_expand(src, Instant::now());
        assert_eq!(rel_entries(&session), vec!["src", "src/a.ts", "src/b.ts"]);

        let rows = rows::rows(&session);
        assert_eq!(rows[1].stats.as_deref(), Some("+10 10L"));
        assert_eq!(rows[2].stats.as_deref(), Some("+3 -1 12L"));
        assert!(!session.entries().iter().any(|e| session.node(e.id).name == "node_modules"));
    }

    #[test]
    fn untracked_as_added_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        write_lines(&root.join("a.ts"), 10);
        let mut snapshot = VcsSnapshot::default();
        snapshot.statuses.insert(root.join("a.ts"), VcsStatus::Untracked);
        let settings = SessionSettings {
            untracked_as_added: false,
            ..SessionSettings::default()
        };
        let mut session = BrowserSession::open_vcs(
            &root,
            &[PathBuf::from("a.ts")],
            &snapshot,
            IgnorePolicy::default(),
            settings,
            Instant::now(),
        );
        drain(&mut session);
        assert_eq!(session.tree().node(NodeId::ROOT).totals.added, 0);
        assert_eq!(rows::rows(&session)[0].stats.as_deref(), Some("10L"));
    }

    #[test]
    fn reconcile_twice_is_idempotent() {
        let (_dir, mut session) = scenario();
        let src = session.tree().find(&session.root_path().join("src")).unwrap();
        let now = Instant::now();
        session.toggle_expand(src, now);
        session.select_last();

        let mut snapshot = VcsSnapshot {
            is_repository: true,
            ..VcsSnapshot::default()
        };
        let b = session.root_path().join("src/b.ts");
        snapshot.statuses.insert(b.clone(), VcsStatus::Modified);
        snapshot.diffs.insert(b, DiffStats::new(5, 0));

        session.reconcile(&snapshot, None, now);
        let entries = session.entries().to_vec();
        let selected = session.selected_index;
        let outcome = session.reconcile(&snapshot, None, now);
        assert!(!outcome.changed);
        assert_eq!(session.entries(), entries.as_slice());
        assert_eq!(session.selected_index, selected);
    }

    #[test]
    fn reconcile_preserves_expansion_selection_and_viewer() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join("a")).unwrap();
        write_lines(&root.join("a/b.txt"), 2);
        write_lines(&root.join("z.txt"), 1);

        let files = vec![PathBuf::from("a/b.txt"), PathBuf::from("z.txt")];
        let mut session = BrowserSession::open_vcs(
            &root,
            &files,
            &VcsSnapshot::default(),
            IgnorePolicy::default(),
            SessionSettings::default(),
            Instant::now(),
        );
        let now = drain(&mut session);
        let a = session.tree().find(&root.join("a")).unwrap();
        session.toggle_expand(a, now);
        let b_path = root.join("a/b.txt");
        assert!(session.select_path(&b_path));
        let b_id = session.selected().unwrap();

        write_lines(&root.join("c.txt"), 3);
        let mut snapshot = VcsSnapshot {
            is_repository: true,
            ..VcsSnapshot::default()
        };
        snapshot.statuses.insert(root.join("c.txt"), VcsStatus::Untracked);
        let outcome = session.reconcile(&snapshot, Some(&b_path), now);

        assert_eq!(outcome.added, 1);
        assert!(session.tree().node(a).is_expanded());
        assert_eq!(session.selected_path().as_deref(), Some(b_path.as_path()));
        assert_eq!(outcome.viewer, Some(b_id));
        assert_eq!(rel_entries(&session), vec!["a", "a/b.txt", "c.txt", "z.txt"]);

        drain(&mut session);
        assert_eq!(session.tree().node(NodeId::ROOT).totals.lines, 6);
    }

    #[test]
    fn selection_is_clamped_when_path_vanishes_from_projection() {
        let (_dir, mut session) = scenario();
        let src = session.tree().find(&session.root_path().join("src")).unwrap();
        session.toggle_expand(src, Instant::now());
        session.select_last();
        assert_eq!(session.selected_index, 2);

        session.toggle_expand(src, Instant::now());
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.selected_index, 0);
    }

    #[test]
    fn plain_directory_scans_in_background_and_respects_ignore() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/deep")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        write_lines(&root.join("src/lib.rs"), 4);
        write_lines(&root.join("src/deep/mod.rs"), 6);
        write_lines(&root.join("node_modules/pkg/index.js"), 100);
        write_lines(&root.join("README.md"), 2);

        let mut session = BrowserSession::open_plain(
            root,
            IgnorePolicy::default(),
            SessionSettings::default(),
            Instant::now(),
        );
        assert!(session.is_busy());
        drain(&mut session);

        assert_eq!(rel_entries(&session), vec!["src", "README.md"]);
        let totals = session.tree().node(NodeId::ROOT).totals;
        assert_eq!(totals.lines, 12);
        assert!(totals.complete);
        assert!(session.tree().find(&root.join("node_modules")).is_none());
        assert!(session.tree().find(&root.join(".cache")).is_none());

        let filtered = session.get_projection("mod", false).to_vec();
        assert_eq!(filtered.len(), 3);
        assert!(session.get_projection("node_modules", false).is_empty());
        assert!(session.get_projection("index", false).is_empty());
    }

    #[test]
    fn expanding_rescans_plain_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("src")).unwrap();
        write_lines(&root.join("src/a.rs"), 1);
        let mut session = BrowserSession::open_plain(
            root,
            IgnorePolicy::default(),
            SessionSettings::default(),
            Instant::now(),
        );
        let now = drain(&mut session);
        write_lines(&root.join("src/b.rs"), 1);

        let src = session.tree().find(&root.join("src")).unwrap();
        session.toggle_expand(src, now);
        drain(&mut session);
        assert_eq!(rel_entries(&session), vec!["src", "src/a.rs", "src/b.rs"]);
    }

    #[test]
    fn refresh_picks_up_changed_content() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_lines(&root.join("a.txt"), 2);
        let mut session = BrowserSession::open_plain(
            root,
            IgnorePolicy::default(),
            SessionSettings::default(),
            Instant::now(),
        );
        let now = drain(&mut session);
        assert_eq!(session.tree().node(NodeId::ROOT).totals.lines, 2);

        write_lines(&root.join("a.txt"), 7);
        session.refresh(now);
        drain(&mut session);
        assert_eq!(session.tree().node(NodeId::ROOT).totals.lines, 7);
        assert_eq!(session.drain_changed_on_disk(), vec![root.join("a.txt")]);
        assert!(session.drain_changed_on_disk().is_empty());
    }

    #[test]
    fn refresh_without_changes_reads_nothing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_lines(&root.join("a.txt"), 3);
        write_lines(&root.join("b.txt"), 4);
        let mut session = BrowserSession::open_plain(
            root,
            IgnorePolicy::default(),
            SessionSettings::default(),
            Instant::now(),
        );
        let now = drain(&mut session);
        assert_eq!(session.line_count_reads(), 2);

        session.refresh(now);
        drain(&mut session);
        assert_eq!(session.line_count_reads(), 2);
        assert!(session.drain_changed_on_disk().is_empty());
    }

    #[test]
    fn external_markers_feed_only_changed_view() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join("docs")).unwrap();
        write_lines(&root.join("docs/guide.md"), 1);
        write_lines(&root.join("other.md"), 1);
        let files = vec![PathBuf::from("docs/guide.md"), PathBuf::from("other.md")];
        let mut session = BrowserSession::open_vcs(
            &root,
            &files,
            &VcsSnapshot::default(),
            IgnorePolicy::default(),
            SessionSettings::default(),
            Instant::now(),
        );
        drain(&mut session);

        let mut external = HashSet::new();
        external.insert(root.join("docs/guide.md"));
        session.set_external_modified(external);
        assert_eq!(session.get_projection("", true).len(), 1);
        let guide = session.tree().find(&root.join("docs/guide.md")).unwrap();
        assert!(session.node(guide).externally_modified);
    }

    #[test]
    fn cursor_moves_and_clamps() {
        let (_dir, mut session) = scenario();
        let src = session.tree().find(&session.root_path().join("src")).unwrap();
        session.toggle_expand(src, Instant::now());
        session.set_height(2);

        session.select_previous();
        assert_eq!(session.selected_index, 0);
        session.select_next();
        session.select_next();
        session.select_next();
        assert_eq!(session.selected_index, 2);
        assert_eq!(session.scroll_offset, 1);
        session.select_first();
        assert_eq!(session.scroll_offset, 0);
        session.page_down();
        assert_eq!(session.selected_index, 2);
        session.page_up();
        assert_eq!(session.selected_index, 0);
    }

    #[test]
    fn collapse_selected_jumps_to_parent() {
        let (_dir, mut session) = scenario();
        let now = Instant::now();
        session.expand_selected(now);
        session.select_last();
        session.collapse_selected(now);
        assert_eq!(session.selected_index, 0);
        session.collapse_selected(now);
        assert_eq!(session.entries().len(), 1);
    }

    #[test]
    fn close_cancels_pending_work() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        let mut session = BrowserSession::open_plain(
            dir.path(),
            IgnorePolicy::default(),
            SessionSettings::default(),
            Instant::now(),
        );
        assert!(session.is_busy());
        session.close();
        assert!(!session.is_busy());
        assert!(!session.tick(Instant::now() + Duration::from_secs(60)));
        assert!(!session.tree().node(NodeId::ROOT).dir().unwrap().loading);
    }

    #[test]
    fn depth_capped_directories_mark_session_partial() {
        let dir = TempDir::new().unwrap();
        let deep: PathBuf = (0..MAX_DEPTH + 1).map(|i| format!("d{i}")).collect();
        fs::create_dir_all(dir.path().join(&deep)).unwrap();
        let mut session = BrowserSession::open_plain(
            dir.path(),
            IgnorePolicy::default(),
            SessionSettings::default(),
            Instant::now(),
        );
        drain(&mut session);
        assert!(session.is_partial());
    }
}
