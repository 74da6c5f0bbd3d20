use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::theme::ThemeColors;
use crate::viewer::{format_size, Viewer, ViewerContent};

/// Viewer panel: numbered lines from the scroll offset down.
pub struct ViewerWidget<'a> {
    viewer: &'a Viewer,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> ViewerWidget<'a> {
    pub fn new(viewer: &'a Viewer, theme: &'a ThemeColors) -> Self {
        Self {
            viewer,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    fn message(&self, inner: Rect, buf: &mut Buffer, text: String) {
        let line = Line::from(Span::styled(text, Style::default().fg(self.theme.dim_fg)));
        buf.set_line(inner.x, inner.y, &line, inner.width);
    }
}

impl<'a> Widget for ViewerWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let lines = match self.viewer.content() {
            ViewerContent::Empty => return self.message(inner, buf, "No file open".to_string()),
            ViewerContent::Binary { size } => {
                return self.message(inner, buf, format!("Binary file ({})", format_size(*size)))
            }
            ViewerContent::TooLarge { size } => {
                return self.message(inner, buf, format!("File too large to view ({})", format_size(*size)))
            }
            ViewerContent::Unreadable(reason) => {
                return self.message(inner, buf, format!("Cannot read file: {}", reason))
            }
            ViewerContent::Text(lines) => lines,
        };
        if lines.is_empty() {
            return self.message(inner, buf, "(empty file)".to_string());
        }

        let number_width = lines.len().to_string().len();
        let start = self.viewer.scroll_offset().min(lines.len());
        let end = (start + inner.height as usize).min(lines.len());

        for (i, text) in lines[start..end].iter().enumerate() {
            let y = inner.y + i as u16;
            let line = Line::from(vec![
                Span::styled(
                    format!("{:>width$} │ ", start + i + 1, width = number_width),
                    Style::default().fg(self.theme.viewer_line_nr_fg),
                ),
                Span::styled(text.as_str(), Style::default().fg(self.theme.viewer_fg)),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}
