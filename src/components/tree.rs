use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::rows::{Row, RowStyle};
use crate::theme::ThemeColors;

/// Tree panel: one line per row with box-drawing connectors, status badge and
/// right-aligned line figures.
pub struct TreeWidget<'a> {
    rows: &'a [Row],
    selected: usize,
    scroll_offset: usize,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(rows: &'a [Row], theme: &'a ThemeColors) -> Self {
        Self {
            rows,
            selected: 0,
            scroll_offset: 0,
            theme,
            block: None,
        }
    }

    pub fn selected(mut self, selected: usize) -> Self {
        self.selected = selected;
        self
    }

    pub fn scroll_offset(mut self, scroll_offset: usize) -> Self {
        self.scroll_offset = scroll_offset;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Connector prefix for `rows[index]`.
    ///
    /// Each ancestor level draws a continuation bar unless that ancestor was the
    /// last of its siblings; the ancestor is the nearest earlier row one level up.
    fn build_prefix(rows: &[Row], index: usize) -> String {
        let row = &rows[index];
        if row.depth == 0 {
            return String::new();
        }

        let mut prefix = String::new();
        for d in 1..row.depth {
            let mut ancestor_is_last = false;
            for earlier in rows[..index].iter().rev() {
                if earlier.depth == d {
                    ancestor_is_last = earlier.is_last_sibling;
                    break;
                }
                if earlier.depth < d {
                    break;
                }
            }
            prefix.push_str(if ancestor_is_last { "   " } else { "│  " });
        }
        prefix.push_str(if row.is_last_sibling { "└──" } else { "├──" });
        prefix
    }

    fn indicator(row: &Row) -> &'static str {
        match (row.is_dir, row.expanded) {
            (true, true) => "▾ ",
            (true, false) => "▸ ",
            (false, _) => "  ",
        }
    }

    /// Name plus loading and partial markers.
    fn label(row: &Row) -> String {
        let mut label = row.name.clone();
        if row.is_dir {
            label.push('/');
        }
        if row.loading {
            label.push_str(" …");
        }
        if row.partial {
            label.push_str(" [partial]");
        }
        label
    }

    fn name_style(&self, row: &Row, is_selected: bool) -> Style {
        if is_selected {
            return Style::default()
                .bg(self.theme.tree_selected_bg)
                .fg(self.theme.tree_selected_fg)
                .add_modifier(Modifier::BOLD);
        }
        let style = Style::default().fg(self.theme.row_fg(row.style));
        match row.style {
            RowStyle::Directory => style.add_modifier(Modifier::BOLD),
            RowStyle::Ignored => style.add_modifier(Modifier::DIM),
            RowStyle::Deleted => style.add_modifier(Modifier::CROSSED_OUT),
            RowStyle::External => style.add_modifier(Modifier::ITALIC),
            _ => style,
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let visible_height = inner.height as usize;
        if visible_height == 0 || inner.width == 0 {
            return;
        }
        if self.rows.is_empty() {
            let line = Line::from(Span::styled("No matches", Style::default().fg(self.theme.dim_fg)));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        let width = inner.width as usize;
        let visible = self
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(visible_height);

        for (i, (index, row)) in visible.enumerate() {
            let y = inner.y + i as u16;
            let is_selected = index == self.selected;

            let left = format!(
                "{}{}{}",
                Self::build_prefix(self.rows, index),
                Self::indicator(row),
                Self::label(row)
            );
            let badge = row.badge.map(|b| format!(" {}", b)).unwrap_or_default();
            let stats = row.stats.as_deref().map(|s| format!(" {}", s)).unwrap_or_default();

            let used = left.chars().count() + badge.chars().count() + stats.chars().count();
            let gap = width.saturating_sub(used);

            let name_style = self.name_style(row, is_selected);
            let mut spans = vec![
                Span::styled(left, name_style),
                Span::styled(
                    badge,
                    Style::default()
                        .fg(self.theme.row_fg(row.style))
                        .add_modifier(Modifier::BOLD),
                ),
            ];
            let fill_style = if is_selected { name_style } else { Style::default() };
            spans.push(Span::styled(" ".repeat(gap), fill_style));
            spans.push(Span::styled(stats, Style::default().fg(self.theme.tree_stats_fg)));

            buf.set_line(inner.x, y, &Line::from(spans), inner.width);
        }
    }
}
