use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, AppMode, Focus};
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeWidget;
use crate::components::viewer::ViewerWidget;
use crate::fs::scan::ScanMode;
use crate::rows;
use crate::session::TreeSource;

/// Tree panel width as a percentage of the screen.
const TREE_PERCENT: u16 = 40;

/// Split the screen into tree panel, viewer panel and status bar.
fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(TREE_PERCENT),
            Constraint::Percentage(100 - TREE_PERCENT),
        ])
        .split(vertical[0]);
    (horizontal[0], horizontal[1], vertical[1])
}

fn panel_block<'a>(title: String, focused: bool, app: &App) -> Block<'a> {
    let border = if focused {
        app.theme.border_focused_fg
    } else {
        app.theme.border_fg
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let (tree_area, viewer_area, status_area) = layout(frame.area());

    // Keep cursor and scroll inside the panels' inner heights (minus borders).
    app.session.set_height(tree_area.height.saturating_sub(2) as usize);
    app.viewer.set_height(viewer_area.height.saturating_sub(2) as usize);

    let root_name = app
        .session
        .root_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| app.session.root_path().display().to_string());
    let tree_title = match app.session.source() {
        TreeSource::Vcs => format!(" {} (git) ", root_name),
        TreeSource::Plain => format!(" {} ", root_name),
    };

    let rows = rows::rows(&app.session);
    let tree_block = panel_block(tree_title, app.focus == Focus::Tree, app);
    let tree = TreeWidget::new(&rows, &app.theme)
        .selected(app.session.selected_index)
        .scroll_offset(app.session.scroll_offset)
        .block(tree_block);
    frame.render_widget(tree, tree_area);

    let viewer_title = rows::viewer_title(&app.session, &app.viewer);
    let viewer_block = panel_block(viewer_title, app.focus == Focus::Viewer, app);
    frame.render_widget(ViewerWidget::new(&app.viewer, &app.theme).block(viewer_block), viewer_area);

    let selected_path = app
        .session
        .selected()
        .map(|id| app.session.tree().relative_path(id).display().to_string())
        .unwrap_or_default();
    let status = StatusBarWidget::new(&selected_path, &app.theme)
        .branch(app.session.branch())
        .busy(app.session.is_busy())
        .safe_mode(app.session.scan_mode() == ScanMode::Safe)
        .partial(app.session.is_partial())
        .only_changed(app.session.filter().only_changed)
        .edits(app.edits.len())
        .filter(&app.session.filter().text, app.mode == AppMode::Filter)
        .status_message(app.status_message.as_ref().map(|(msg, _)| msg.as_str()));
    frame.render_widget(status, status_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_reserves_one_status_line() {
        let (tree, viewer, status) = layout(Rect::new(0, 0, 100, 30));
        assert_eq!(status.height, 1);
        assert_eq!(status.y, 29);
        assert_eq!(tree.width, 40);
        assert_eq!(tree.height, 29);
        assert_eq!(viewer.x, 40);
        assert_eq!(viewer.width, 60);
    }
}
