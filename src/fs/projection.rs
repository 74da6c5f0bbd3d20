//! Flattening the tree into the ordered list the browser displays.

use crate::fs::tree::{FileTree, NodeId};

/// One row of the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatEntry {
    pub id: NodeId,
    /// Depth below the root (top-level entries are 1).
    pub depth: usize,
    pub is_last_sibling: bool,
}

/// Filters applied while projecting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionFilter {
    /// Case-insensitive substring. Matched against the name, or against the
    /// root-relative path when it contains a `/`.
    pub text: String,
    /// Keep only changed entries and directories containing changes.
    pub only_changed: bool,
}

impl ProjectionFilter {
    pub fn new(text: &str, only_changed: bool) -> Self {
        Self {
            text: text.to_string(),
            only_changed,
        }
    }

    /// Search mode walks every directory regardless of expansion.
    pub fn is_search(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Project the tree. Without filter text only expanded directories are
/// descended into; with filter text the whole tree is searched and ancestors
/// of matches are kept. The root itself never appears.
pub fn project(tree: &FileTree, filter: &ProjectionFilter) -> Vec<FlatEntry> {
    let mut items = Vec::new();
    if filter.is_search() {
        let query = filter.text.to_lowercase();
        let by_path = query.contains('/');
        flatten_children_filtered(tree, tree.root(), &mut items, filter, &query, by_path);
    } else {
        flatten_children(tree, tree.root(), &mut items, filter);
    }
    items
}

fn keep_changed(tree: &FileTree, id: NodeId, filter: &ProjectionFilter) -> bool {
    if !filter.only_changed {
        return true;
    }
    let node = tree.node(id);
    node.is_changed() || node.has_changed_descendant
}

fn flatten_children(tree: &FileTree, id: NodeId, items: &mut Vec<FlatEntry>, filter: &ProjectionFilter) {
    let visible: Vec<NodeId> = tree
        .node(id)
        .children()
        .iter()
        .copied()
        .filter(|&c| keep_changed(tree, c, filter))
        .collect();

    for (i, &child) in visible.iter().enumerate() {
        let node = tree.node(child);
        items.push(FlatEntry {
            id: child,
            depth: node.depth,
            is_last_sibling: i == visible.len() - 1,
        });
        if node.is_expanded() {
            flatten_children(tree, child, items, filter);
        }
    }
}

/// Collect matching descendants of `id` (plus their ancestors) into `items`.
/// Returns true if anything below `id` matched.
fn flatten_children_filtered(
    tree: &FileTree,
    id: NodeId,
    items: &mut Vec<FlatEntry>,
    filter: &ProjectionFilter,
    query: &str,
    by_path: bool,
) -> bool {
    let mut subtrees: Vec<Vec<FlatEntry>> = Vec::new();

    for &child in tree.node(id).children() {
        if !keep_changed(tree, child, filter) {
            continue;
        }
        let node = tree.node(child);
        let haystack = if by_path {
            tree.relative_path(child).to_string_lossy().to_lowercase()
        } else {
            node.name.to_lowercase()
        };
        let self_matches = haystack.contains(query);

        let mut below = Vec::new();
        let child_matches = flatten_children_filtered(tree, child, &mut below, filter, query, by_path);

        if self_matches || child_matches {
            let mut subtree = Vec::with_capacity(below.len() + 1);
            subtree.push(FlatEntry {
                id: child,
                depth: node.depth,
                is_last_sibling: false,
            });
            subtree.extend(below);
            subtrees.push(subtree);
        }
    }

    if let Some(last) = subtrees.last_mut() {
        last[0].is_last_sibling = true;
    }
    let matched = !subtrees.is_empty();
    items.extend(subtrees.into_iter().flatten());
    matched
}

/// Index of `id` in a projection.
pub fn position_of(entries: &[FlatEntry], id: NodeId) -> Option<usize> {
    entries.iter().position(|e| e.id == id)
}
