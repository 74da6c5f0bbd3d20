//! Applying a status snapshot to an existing tree in place.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::fs::ignore::IgnorePolicy;
use crate::fs::tree::{FileTree, NodeId};
use crate::vcs::{VcsSnapshot, VcsStatus};

/// What applying a snapshot did to the tree.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Nodes synthesized for paths the tree did not know yet.
    pub added: Vec<NodeId>,
    /// Existing nodes whose status, diff, or external marker changed.
    pub touched: Vec<NodeId>,
}

impl ApplyOutcome {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.touched.is_empty()
    }
}

/// Update status, diff, and external-modification data on every node, then
/// synthesize nodes for reported paths that do not exist yet.
///
/// Existing nodes are never replaced, so their ids stay valid. Values absent
/// from the snapshot are cleared.
pub fn apply_snapshot(
    tree: &mut FileTree,
    snapshot: &VcsSnapshot,
    external: &HashSet<PathBuf>,
    ignore: &IgnorePolicy,
    max_depth: usize,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();

    let ids: Vec<NodeId> = tree.ids().collect();
    for id in ids {
        if update_node(tree, id, snapshot, external) {
            outcome.touched.push(id);
        }
    }

    let mut missing: Vec<(&PathBuf, VcsStatus)> = snapshot
        .statuses
        .iter()
        .filter(|(path, status)| should_synthesize(**status) && tree.find(path).is_none())
        .map(|(path, status)| (path, *status))
        .collect();
    missing.sort_by(|a, b| a.0.cmp(b.0));

    for (path, _) in missing {
        let Some(relative) = path.strip_prefix(tree.root_path()).ok().map(Path::to_path_buf) else {
            continue;
        };
        if ignore.is_path_ignored(&relative) || under_unscanned_directory(tree, path) {
            continue;
        }
        let Some((file, created)) = tree.ensure_file(&relative, max_depth) else {
            tracing::debug!(path = %path.display(), "status entry dropped, beyond depth cap or kind mismatch");
            continue;
        };
        update_node(tree, file, snapshot, external);
        outcome.added.extend(created);
    }
    outcome
}

fn should_synthesize(status: VcsStatus) -> bool {
    !matches!(status, VcsStatus::Ignored | VcsStatus::Deleted)
}

/// Whether the closest existing ancestor of `path` is a directory that has
/// not been listed yet. Adding a child there would make it look scanned.
fn under_unscanned_directory(tree: &FileTree, path: &Path) -> bool {
    path.ancestors()
        .skip(1)
        .find_map(|ancestor| tree.find(ancestor))
        .and_then(|id| tree.node(id).dir())
        .is_some_and(|dir| dir.children.is_none())
}

/// Returns true if anything on the node changed.
fn update_node(tree: &mut FileTree, id: NodeId, snapshot: &VcsSnapshot, external: &HashSet<PathBuf>) -> bool {
    let node = tree.node_mut(id);
    let status = snapshot.statuses.get(&node.path).copied();
    let diff = snapshot.diffs.get(&node.path).copied();
    let externally_modified = external.contains(&node.path);

    let mut changed = false;
    if node.status != status {
        node.status = status;
        changed = true;
    }
    if node.externally_modified != externally_modified {
        node.externally_modified = externally_modified;
        changed = true;
    }
    if let Some(file) = node.file_mut() {
        if file.diff != diff {
            file.diff = diff;
            changed = true;
        }
    }
    changed
}
