use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

const KEY_HINTS: &str = " /:filter  c:changed  r:refresh  q:quit ";

/// Bottom bar: branch, selected path, session flags and key hints. A status
/// message or an active filter prompt replaces the path.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    theme: &'a ThemeColors,
    branch: Option<&'a str>,
    busy: bool,
    safe_mode: bool,
    partial: bool,
    only_changed: bool,
    edits: usize,
    filter: Option<(&'a str, bool)>,
    status_message: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            theme,
            branch: None,
            busy: false,
            safe_mode: false,
            partial: false,
            only_changed: false,
            edits: 0,
            filter: None,
            status_message: None,
        }
    }

    pub fn branch(mut self, branch: Option<&'a str>) -> Self {
        self.branch = branch;
        self
    }

    pub fn busy(mut self, busy: bool) -> Self {
        self.busy = busy;
        self
    }

    /// Scanning is throttled.
    pub fn safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn only_changed(mut self, only_changed: bool) -> Self {
        self.only_changed = only_changed;
        self
    }

    /// Number of files marked as edited on disk.
    pub fn edits(mut self, edits: usize) -> Self {
        self.edits = edits;
        self
    }

    /// Filter text, and whether the prompt is being typed into.
    pub fn filter(mut self, text: &'a str, editing: bool) -> Self {
        if editing || !text.is_empty() {
            self.filter = Some((text, editing));
        }
        self
    }

    pub fn status_message(mut self, msg: Option<&'a str>) -> Self {
        self.status_message = msg;
        self
    }

    /// Flag spans shown after the branch: `[loading]`, `[partial]`, ...
    fn flags(&self) -> Vec<Span<'a>> {
        let mut flags = Vec::new();
        let flag_style = Style::default()
            .fg(self.theme.warning_fg)
            .add_modifier(Modifier::BOLD);
        if self.busy {
            flags.push(Span::styled(" [loading]", Style::default().fg(self.theme.info_fg)));
        }
        if self.safe_mode {
            flags.push(Span::styled(" [safe]", flag_style));
        }
        if self.partial {
            flags.push(Span::styled(" [partial]", flag_style));
        }
        if self.only_changed {
            flags.push(Span::styled(" [changed]", Style::default().fg(self.theme.accent_fg)));
        }
        if self.edits > 0 {
            flags.push(Span::styled(
                format!(" [{} edited]", self.edits),
                Style::default().fg(self.theme.accent_fg),
            ));
        }
        flags
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let width = area.width as usize;
        let base = Style::default().bg(self.theme.status_bg).fg(self.theme.status_fg);

        let mut spans: Vec<Span> = Vec::new();
        if let Some(branch) = self.branch {
            spans.push(Span::styled(
                format!(" {} ", branch),
                Style::default()
                    .fg(self.theme.vcs_added_fg)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        spans.extend(self.flags());
        spans.push(Span::raw(" "));

        match (self.filter, self.status_message) {
            (Some((text, editing)), _) => {
                let cursor = if editing { "_" } else { "" };
                spans.push(Span::styled(
                    format!("/{}{}", text, cursor),
                    Style::default().fg(self.theme.accent_fg),
                ));
            }
            (None, Some(msg)) => spans.push(Span::styled(msg, Style::default().fg(self.theme.info_fg))),
            (None, None) => {
                let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
                let budget = width.saturating_sub(used).saturating_sub(KEY_HINTS.len());
                spans.push(Span::raw(truncate_left(self.path_str, budget)));
            }
        }

        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let pad = width.saturating_sub(used).saturating_sub(KEY_HINTS.len());
        if used + KEY_HINTS.len() <= width {
            spans.push(Span::raw(" ".repeat(pad)));
            spans.push(Span::styled(
                KEY_HINTS,
                Style::default().fg(self.theme.dim_fg).add_modifier(Modifier::DIM),
            ));
        }

        buf.set_style(area, base);
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

/// Keep the tail of `s` within `budget` characters, marking the cut with `...`.
fn truncate_left(s: &str, budget: usize) -> String {
    let len = s.chars().count();
    if len <= budget {
        return s.to_string();
    }
    if budget <= 3 {
        return s.chars().skip(len - budget).collect();
    }
    let tail: String = s.chars().skip(len - (budget - 3)).collect();
    format!("...{}", tail)
}
