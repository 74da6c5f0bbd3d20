//! Plain display rows built from the projection. No drawing happens here; the
//! tree widget turns rows into styled lines.

use crate::fs::tree::{LineCount, Node, NodeKind, NodeId, Totals};
use crate::session::BrowserSession;
use crate::vcs::VcsStatus;
use crate::viewer::Viewer;

/// Styling hint for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Directory,
    File,
    Modified,
    Added,
    Deleted,
    Untracked,
    Ignored,
    /// Changed on disk by something other than the repository.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: NodeId,
    pub depth: usize,
    pub is_last_sibling: bool,
    pub name: String,
    pub is_dir: bool,
    pub expanded: bool,
    pub loading: bool,
    pub partial: bool,
    /// Status badge, e.g. `M` or `?`.
    pub badge: Option<char>,
    /// Formatted figures, e.g. `+3 -1 12L`.
    pub stats: Option<String>,
    pub style: RowStyle,
}

/// Rows for the session's current projection.
pub fn rows(session: &BrowserSession) -> Vec<Row> {
    session
        .entries()
        .iter()
        .map(|entry| {
            let node = session.node(entry.id);
            let dir = node.dir();
            Row {
                id: entry.id,
                depth: entry.depth,
                is_last_sibling: entry.is_last_sibling,
                name: node.name.clone(),
                is_dir: node.is_dir(),
                expanded: node.is_expanded(),
                loading: dir.is_some_and(|d| d.loading),
                partial: dir.is_some_and(|d| d.partial),
                badge: node.status.map(|s| s.badge()),
                stats: node_stats(node),
                style: row_style(node),
            }
        })
        .collect()
}

/// Figures shown next to a node. Directories only show their aggregate while
/// collapsed, since their children already show theirs when expanded.
pub fn node_stats(node: &Node) -> Option<String> {
    match &node.kind {
        NodeKind::Directory(dir) => {
            if dir.expanded || dir.children.is_none() {
                None
            } else {
                Some(format_stats(&node.totals))
            }
        }
        NodeKind::File(file) => match file.line_count {
            LineCount::Skipped => Some(with_diff(&node.totals, "skipped")),
            LineCount::Pending | LineCount::Unavailable => Some(with_diff(&node.totals, "?L")),
            LineCount::Counted(_) => Some(format_stats(&node.totals)),
        },
    }
}

/// Viewer panel title with the open file's live badge and figures, read from
/// the node the viewer was last attached to.
pub fn viewer_title(session: &BrowserSession, viewer: &Viewer) -> String {
    let title = viewer.title();
    let Some(node) = viewer.node().and_then(|id| session.tree().get(id)) else {
        return title;
    };
    if viewer.path() != Some(node.path.as_path()) {
        return title;
    }
    let mut info = Vec::new();
    if let Some(status) = node.status {
        info.push(status.badge().to_string());
    }
    if node.externally_modified {
        info.push("edited".to_string());
    }
    info.extend(node_stats(node));
    if info.is_empty() {
        return title;
    }
    format!("{}[{}] ", title, info.join(" "))
}

/// `+added -removed linesL`, zero diff parts omitted. Incomplete totals get a
/// `~` in front of the line figure.
pub fn format_stats(totals: &Totals) -> String {
    let lines = if totals.complete {
        format!("{}L", totals.lines)
    } else {
        format!("~{}L", totals.lines)
    };
    with_diff(totals, &lines)
}

fn with_diff(totals: &Totals, tail: &str) -> String {
    let mut parts = Vec::with_capacity(3);
    if totals.added > 0 {
        parts.push(format!("+{}", totals.added));
    }
    if totals.removed > 0 {
        parts.push(format!("-{}", totals.removed));
    }
    parts.push(tail.to_string());
    parts.join(" ")
}

fn row_style(node: &Node) -> RowStyle {
    match node.status {
        Some(VcsStatus::Ignored) => return RowStyle::Ignored,
        Some(VcsStatus::Untracked) => return RowStyle::Untracked,
        Some(VcsStatus::Added) => return RowStyle::Added,
        Some(VcsStatus::Deleted) => return RowStyle::Deleted,
        Some(VcsStatus::Modified | VcsStatus::Renamed | VcsStatus::Other) => return RowStyle::Modified,
        None => {}
    }
    if node.externally_modified {
        RowStyle::External
    } else if node.is_dir() {
        RowStyle::Directory
    } else {
        RowStyle::File
    }
}
