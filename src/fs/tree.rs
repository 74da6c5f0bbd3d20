use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::fs::ignore::IgnorePolicy;
use crate::vcs::{DiffStats, VcsStatus};

/// Deepest level a node may live at (root is depth 0).
pub const MAX_DEPTH: usize = 6;

/// Index of a node inside its `FileTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Line count state of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCount {
    /// Not counted yet.
    Pending,
    Counted(u64),
    /// Above the size ceiling, never read.
    Skipped,
    /// Could not be stat'ed or read.
    Unavailable,
}

impl LineCount {
    pub fn known(self) -> Option<u64> {
        match self {
            LineCount::Counted(n) => Some(n),
            _ => None,
        }
    }
}

/// Rolled-up figures for a node: its own for files, its subtree's for directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub lines: u64,
    pub added: u64,
    pub removed: u64,
    /// False if any descendant line count is unknown.
    pub complete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirState {
    pub expanded: bool,
    /// A scan for this directory is queued.
    pub loading: bool,
    /// `None` = not scanned yet, `Some(vec![])` = scanned and empty.
    pub children: Option<Vec<NodeId>>,
    /// Listing was truncated or the directory lies beyond the depth cap.
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    pub line_count: LineCount,
    pub diff: Option<DiffStats>,
}

impl Default for FileState {
    fn default() -> Self {
        Self {
            line_count: LineCount::Pending,
            diff: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory(DirState),
    File(FileState),
}

/// A node in the browsed tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub path: PathBuf,
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub kind: NodeKind,
    pub status: Option<VcsStatus>,
    pub totals: Totals,
    /// Set from the edit tracker's path set.
    pub externally_modified: bool,
    pub has_changed_descendant: bool,
}

impl Node {
    fn new(name: String, path: PathBuf, parent: Option<NodeId>, depth: usize, kind: NodeKind) -> Self {
        Self {
            name,
            path,
            parent,
            depth,
            kind,
            status: None,
            totals: Totals::default(),
            externally_modified: false,
            has_changed_descendant: false,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn dir(&self) -> Option<&DirState> {
        match &self.kind {
            NodeKind::Directory(dir) => Some(dir),
            NodeKind::File(_) => None,
        }
    }

    pub fn dir_mut(&mut self) -> Option<&mut DirState> {
        match &mut self.kind {
            NodeKind::Directory(dir) => Some(dir),
            NodeKind::File(_) => None,
        }
    }

    pub fn file(&self) -> Option<&FileState> {
        match &self.kind {
            NodeKind::File(file) => Some(file),
            NodeKind::Directory(_) => None,
        }
    }

    pub fn file_mut(&mut self) -> Option<&mut FileState> {
        match &mut self.kind {
            NodeKind::File(file) => Some(file),
            NodeKind::Directory(_) => None,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.dir().is_some_and(|d| d.expanded)
    }

    /// Loaded children, empty for files and unscanned directories.
    pub fn children(&self) -> &[NodeId] {
        self.dir()
            .and_then(|d| d.children.as_deref())
            .unwrap_or(&[])
    }

    /// Whether this node itself carries a change worth surfacing.
    pub fn is_changed(&self) -> bool {
        self.externally_modified || self.status.is_some_and(|s| s.is_change())
    }
}

/// The browsed tree: an arena of nodes owned by the browsing session.
///
/// Nodes are never removed, so a `NodeId` stays valid for the life of the
/// tree. Paths resolve through an index maintained as children are added.
#[derive(Debug)]
pub struct FileTree {
    nodes: Vec<Node>,
    index: HashMap<PathBuf, NodeId>,
    /// Scanning was throttled; the tree may be missing entries.
    pub partial: bool,
}

impl FileTree {
    /// Create a tree holding only the (unscanned, expanded) root directory.
    pub fn new(root: &Path) -> Self {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.to_string_lossy().to_string());
        let root_node = Node::new(
            name,
            root.to_path_buf(),
            None,
            0,
            NodeKind::Directory(DirState {
                expanded: true,
                ..DirState::default()
            }),
        );
        let mut index = HashMap::new();
        index.insert(root.to_path_buf(), NodeId::ROOT);
        Self {
            nodes: vec![root_node],
            index,
            partial: false,
        }
    }

    /// Build the whole tree eagerly from an authoritative list of file paths
    /// relative to `root`. Every directory created this way counts as scanned.
    pub fn from_file_list(root: &Path, files: &[PathBuf], ignore: &IgnorePolicy, max_depth: usize) -> Self {
        let mut tree = Self::new(root);
        tree.mark_scanned(NodeId::ROOT);
        for relative in files {
            if ignore.is_path_ignored(relative) {
                continue;
            }
            tree.ensure_file(relative, max_depth);
        }
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn root_path(&self) -> &Path {
        &self.nodes[0].path
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Look a node up by absolute path.
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    /// Path of `id` relative to the root (empty for the root itself).
    pub fn relative_path(&self, id: NodeId) -> &Path {
        let node = self.node(id);
        node.path
            .strip_prefix(self.root_path())
            .unwrap_or(&node.path)
    }

    /// Give an unscanned directory an empty child list.
    pub fn mark_scanned(&mut self, id: NodeId) {
        if let Some(dir) = self.node_mut(id).dir_mut() {
            if dir.children.is_none() {
                dir.children = Some(Vec::new());
            }
        }
    }

    /// Add a child under `parent`, keeping siblings sorted.
    ///
    /// Returns the existing node if the path is already present. Adding to a
    /// file, or beyond `MAX_DEPTH`, is refused.
    pub fn add_child(&mut self, parent: NodeId, name: &str, is_dir: bool) -> Option<(NodeId, bool)> {
        let parent_node = self.node(parent);
        if !parent_node.is_dir() || parent_node.depth >= MAX_DEPTH {
            return None;
        }
        let path = parent_node.path.join(name);
        if let Some(existing) = self.find(&path) {
            return Some((existing, false));
        }

        let depth = parent_node.depth + 1;
        let kind = if is_dir {
            NodeKind::Directory(DirState::default())
        } else {
            NodeKind::File(FileState::default())
        };
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Node::new(name.to_string(), path.clone(), Some(parent), depth, kind));
        self.index.insert(path, id);

        let position = {
            let siblings = self.node(parent).children();
            let new_node = self.node(id);
            siblings.partition_point(|&s| sibling_order(self.node(s), new_node) == Ordering::Less)
        };
        if let Some(dir) = self.node_mut(parent).dir_mut() {
            dir.children.get_or_insert_with(Vec::new).insert(position, id);
        }
        Some((id, true))
    }

    /// Make sure a file exists at `relative`, synthesizing missing ancestor
    /// directories as scanned. Returns the file and every node created.
    ///
    /// Paths deeper than `max_depth`, or that collide with an existing node of
    /// the other kind, are dropped.
    pub fn ensure_file(&mut self, relative: &Path, max_depth: usize) -> Option<(NodeId, Vec<NodeId>)> {
        let names: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        if names.is_empty() || names.len() > max_depth.min(MAX_DEPTH) {
            return None;
        }

        let mut created = Vec::new();
        let mut current = NodeId::ROOT;
        let last = names.len() - 1;
        for (i, name) in names.iter().enumerate() {
            let is_dir = i < last;
            let (id, is_new) = self.add_child(current, name, is_dir)?;
            if self.node(id).is_dir() != is_dir {
                return None;
            }
            if is_new {
                created.push(id);
                if is_dir {
                    self.mark_scanned(id);
                }
            }
            current = id;
        }
        Some((current, created))
    }

    /// Expand or collapse a directory. Returns false for files.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> bool {
        match self.node_mut(id).dir_mut() {
            Some(dir) => {
                dir.expanded = expanded;
                true
            }
            None => false,
        }
    }

    /// Collect all expanded directory paths, walking with an explicit stack.
    pub fn collect_expanded_paths(&self) -> HashSet<PathBuf> {
        let mut expanded = HashSet::new();
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.is_expanded() {
                expanded.insert(node.path.clone());
            }
            stack.extend(node.children().iter().copied().filter(|&c| self.node(c).is_dir()));
        }
        expanded
    }

    /// Re-expand directories from a saved set of paths, ancestors first.
    ///
    /// Paths that no longer resolve to a directory are skipped. Returns the
    /// directories that were expanded but have not been scanned yet.
    pub fn restore_expanded(&mut self, expanded: &HashSet<PathBuf>) -> Vec<NodeId> {
        let mut unscanned = Vec::new();
        for path in Self::expanded_paths_in_restore_order(expanded) {
            let Some(id) = self.find(path) else {
                continue;
            };
            if let Some(dir) = self.node_mut(id).dir_mut() {
                dir.expanded = true;
                if dir.children.is_none() {
                    unscanned.push(id);
                }
            }
        }
        unscanned
    }

    /// Return expanded paths sorted so ancestors are restored before descendants.
    fn expanded_paths_in_restore_order(expanded: &HashSet<PathBuf>) -> Vec<&PathBuf> {
        let mut ordered: Vec<&PathBuf> = expanded.iter().collect();
        ordered.sort_by(|a, b| {
            a.components()
                .count()
                .cmp(&b.components().count())
                .then_with(|| a.cmp(b))
        });
        ordered
    }

    /// All file nodes in arena order.
    pub fn file_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids().filter(|&id| !self.node(id).is_dir())
    }

    /// Node ids in depth-first pre-order from the root, explicit stack.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children().iter().rev().copied());
        }
        order
    }
}

/// Directories before files, then case-insensitive name, then exact name.
pub fn sibling_order(a: &Node, b: &Node) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &FileTree, id: NodeId) -> Vec<String> {
        tree.node(id)
            .children()
            .iter()
            .map(|&c| tree.node(c).name.clone())
            .collect()
    }

    #[test]
    fn new_tree_root_is_unscanned_and_expanded() {
        let tree = FileTree::new(Path::new("/tmp/project"));
        let root = tree.node(tree.root());
        assert_eq!(root.name, "project");
        assert!(root.is_expanded());
        assert!(root.dir().unwrap().children.is_none());
    }

    #[test]
    fn add_child_sorts_dirs_first_case_insensitive() {
        let mut tree = FileTree::new(Path::new("/p"));
        tree.add_child(NodeId::ROOT, "zeta.txt", false);
        tree.add_child(NodeId::ROOT, "Beta", true);
        tree.add_child(NodeId::ROOT, "alpha.rs", false);
        tree.add_child(NodeId::ROOT, "alpha", true);
        tree.add_child(NodeId::ROOT, "Gamma.md", false);
        assert_eq!(names(&tree, NodeId::ROOT), vec!["alpha", "Beta", "alpha.rs", "Gamma.md", "zeta.txt"]);
    }

    #[test]
    fn add_child_is_idempotent_by_path() {
        let mut tree = FileTree::new(Path::new("/p"));
        let (first, created) = tree.add_child(NodeId::ROOT, "a.txt", false).unwrap();
        assert!(created);
        let (second, created) = tree.add_child(NodeId::ROOT, "a.txt", false).unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(tree.node(NodeId::ROOT).children().len(), 1);
    }

    #[test]
    fn add_child_to_file_is_refused() {
        let mut tree = FileTree::new(Path::new("/p"));
        let (file, _) = tree.add_child(NodeId::ROOT, "a.txt", false).unwrap();
        assert!(tree.add_child(file, "nested", false).is_none());
    }

    #[test]
    fn unscanned_and_empty_are_distinct() {
        let mut tree = FileTree::new(Path::new("/p"));
        let (dir, _) = tree.add_child(NodeId::ROOT, "empty", true).unwrap();
        assert!(tree.node(dir).dir().unwrap().children.is_none());
        tree.mark_scanned(dir);
        assert_eq!(tree.node(dir).dir().unwrap().children, Some(Vec::new()));
    }

    #[test]
    fn from_file_list_builds_ancestors_and_skips_ignored() {
        let files = vec![
            PathBuf::from("src/main.rs"),
            PathBuf::from("src/fs/tree.rs"),
            PathBuf::from("node_modules/x/index.js"),
            PathBuf::from(".env"),
            PathBuf::from("Cargo.toml"),
        ];
        let tree = FileTree::from_file_list(Path::new("/p"), &files, &IgnorePolicy::default(), MAX_DEPTH);
        assert_eq!(names(&tree, NodeId::ROOT), vec!["src", "Cargo.toml"]);
        let src = tree.find(Path::new("/p/src")).unwrap();
        assert_eq!(names(&tree, src), vec!["fs", "main.rs"]);
        assert!(tree.find(Path::new("/p/node_modules")).is_none());
        let fs_dir = tree.find(Path::new("/p/src/fs")).unwrap();
        assert_eq!(tree.node(fs_dir).depth, 2);
        assert!(tree.node(fs_dir).dir().unwrap().children.is_some());
    }

    #[test]
    fn ensure_file_drops_paths_beyond_depth_cap() {
        let mut tree = FileTree::new(Path::new("/p"));
        tree.mark_scanned(NodeId::ROOT);
        let deep = PathBuf::from("a/b/c/d/e/f/g.txt");
        assert!(tree.ensure_file(&deep, MAX_DEPTH).is_none());
        let ok = PathBuf::from("a/b/c/d/e/f.txt");
        let (id, created) = tree.ensure_file(&ok, MAX_DEPTH).unwrap();
        assert_eq!(tree.node(id).depth, 6);
        assert_eq!(created.len(), 6);
    }

    #[test]
    fn ensure_file_refuses_kind_collision() {
        let mut tree = FileTree::new(Path::new("/p"));
        tree.ensure_file(Path::new("a"), MAX_DEPTH).unwrap();
        assert!(tree.ensure_file(Path::new("a/b.txt"), MAX_DEPTH).is_none());
    }

    #[test]
    fn relative_path_strips_root() {
        let mut tree = FileTree::new(Path::new("/p"));
        let (id, _) = tree.ensure_file(Path::new("src/lib.rs"), MAX_DEPTH).unwrap();
        assert_eq!(tree.relative_path(id), Path::new("src/lib.rs"));
        assert_eq!(tree.relative_path(NodeId::ROOT), Path::new(""));
    }

    #[test]
    fn collect_expanded_paths_includes_root_and_expanded_dirs() {
        let mut tree = FileTree::new(Path::new("/p"));
        tree.ensure_file(Path::new("a/b/c.txt"), MAX_DEPTH);
        let a = tree.find(Path::new("/p/a")).unwrap();
        tree.set_expanded(a, true);
        let expanded = tree.collect_expanded_paths();
        assert!(expanded.contains(Path::new("/p")));
        assert!(expanded.contains(Path::new("/p/a")));
        assert!(!expanded.contains(Path::new("/p/a/b")));
    }

    #[test]
    fn restore_expanded_re_expands_and_reports_unscanned() {
        let mut tree = FileTree::new(Path::new("/p"));
        tree.mark_scanned(NodeId::ROOT);
        let (scanned, _) = tree.add_child(NodeId::ROOT, "scanned", true).unwrap();
        tree.mark_scanned(scanned);
        let (lazy, _) = tree.add_child(NodeId::ROOT, "lazy", true).unwrap();

        let mut saved = HashSet::new();
        saved.insert(PathBuf::from("/p/scanned"));
        saved.insert(PathBuf::from("/p/lazy"));
        saved.insert(PathBuf::from("/p/vanished"));

        let unscanned = tree.restore_expanded(&saved);
        assert!(tree.node(scanned).is_expanded());
        assert!(tree.node(lazy).is_expanded());
        assert_eq!(unscanned, vec![lazy]);
    }

    #[test]
    fn expanded_restore_order_is_parent_first() {
        let root = PathBuf::from("/tmp/root");
        let alpha = root.join("alpha");
        let nested = alpha.join("nested");

        let mut expanded = HashSet::new();
        expanded.insert(nested.clone());
        expanded.insert(root.clone());
        expanded.insert(alpha.clone());

        let ordered = FileTree::expanded_paths_in_restore_order(&expanded);
        let ordered_paths: Vec<PathBuf> = ordered.into_iter().cloned().collect();

        assert_eq!(ordered_paths, vec![root, alpha, nested]);
    }

    #[test]
    fn preorder_visits_sorted_children() {
        let mut tree = FileTree::new(Path::new("/p"));
        tree.ensure_file(Path::new("b.txt"), MAX_DEPTH);
        tree.ensure_file(Path::new("a/x.txt"), MAX_DEPTH);
        let order: Vec<String> = tree
            .preorder()
            .into_iter()
            .map(|id| tree.relative_path(id).to_string_lossy().to_string())
            .collect();
        assert_eq!(order, vec!["", "a", "a/x.txt", "b.txt"]);
    }
}
