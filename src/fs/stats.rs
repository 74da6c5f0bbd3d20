//! Bottom-up roll-up of line counts and diff stats.

use crate::fs::tree::{FileTree, Node, NodeKind, Totals};
use crate::vcs::{DiffStats, VcsStatus};

/// The diff figures a file contributes.
///
/// With `untracked_as_added`, an untracked file with a known line count
/// reports all of its lines as additions.
pub fn effective_diff(node: &Node, untracked_as_added: bool) -> Option<DiffStats> {
    let file = node.file()?;
    if let Some(diff) = file.diff {
        return Some(diff);
    }
    if untracked_as_added && node.status == Some(VcsStatus::Untracked) {
        return file.line_count.known().map(|lines| DiffStats::new(lines, 0));
    }
    None
}

/// Recompute `totals` and `has_changed_descendant` for every node.
///
/// Runs in reverse pre-order so each directory sees its children's final
/// values. A directory is complete only when it has been scanned in full
/// (not loading, not truncated) and every child is complete.
pub fn recompute(tree: &mut FileTree, untracked_as_added: bool) {
    for id in tree.preorder().into_iter().rev() {
        let (totals, changed_below) = match &tree.node(id).kind {
            NodeKind::File(file) => {
                let node = tree.node(id);
                let diff = effective_diff(node, untracked_as_added).unwrap_or_default();
                let known = file.line_count.known();
                let totals = Totals {
                    lines: known.unwrap_or(0),
                    added: diff.added,
                    removed: diff.removed,
                    complete: known.is_some(),
                };
                (totals, false)
            }
            NodeKind::Directory(dir) => match &dir.children {
                None => (Totals::default(), false),
                Some(children) => {
                    let mut totals = Totals {
                        complete: !dir.loading && !dir.partial,
                        ..Totals::default()
                    };
                    let mut changed_below = false;
                    for &child in children {
                        let child = tree.node(child);
                        totals.lines += child.totals.lines;
                        totals.added += child.totals.added;
                        totals.removed += child.totals.removed;
                        totals.complete &= child.totals.complete;
                        changed_below |= child.is_changed() || child.has_changed_descendant;
                    }
                    (totals, changed_below)
                }
            },
        };
        let node = tree.node_mut(id);
        node.totals = totals;
        node.has_changed_descendant = changed_below;
    }
}
