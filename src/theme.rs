//! Theme data model: built-in palettes and resolution from config.
//!
//! The theme system provides two built-in palettes (dark and light) and
//! supports custom color overrides from the config file.

use ratatui::style::Color;

use crate::config::{ThemeColorsConfig, ThemeConfig};
use crate::rows::RowStyle;

// ── Runtime theme colors ─────────────────────────────────────────────────────

/// All runtime colors used in the UI.
///
/// Constructed from a config-level `ThemeConfig` via `resolve_theme()`.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Tree panel
    pub tree_fg: Color,
    pub tree_selected_bg: Color,
    pub tree_selected_fg: Color,
    pub tree_dir_fg: Color,
    pub tree_stats_fg: Color,

    // Viewer panel
    pub viewer_fg: Color,
    pub viewer_line_nr_fg: Color,

    // Status bar
    pub status_bg: Color,
    pub status_fg: Color,

    // Borders & chrome
    pub border_fg: Color,
    pub border_focused_fg: Color,

    // Version control
    pub vcs_modified_fg: Color,
    pub vcs_added_fg: Color,
    pub vcs_deleted_fg: Color,
    pub vcs_untracked_fg: Color,
    pub vcs_ignored_fg: Color,

    // Semantic colors (not configurable, consistent across themes)
    pub error_fg: Color,
    pub warning_fg: Color,
    pub info_fg: Color,
    pub accent_fg: Color,
    pub dim_fg: Color,
}

impl ThemeColors {
    /// Foreground for a row's styling hint.
    pub fn row_fg(&self, style: RowStyle) -> Color {
        match style {
            RowStyle::Directory => self.tree_dir_fg,
            RowStyle::File => self.tree_fg,
            RowStyle::Modified => self.vcs_modified_fg,
            RowStyle::Added => self.vcs_added_fg,
            RowStyle::Deleted => self.vcs_deleted_fg,
            RowStyle::Untracked => self.vcs_untracked_fg,
            RowStyle::Ignored => self.vcs_ignored_fg,
            RowStyle::External => self.accent_fg,
        }
    }
}

// ── Built-in palettes ────────────────────────────────────────────────────────

/// Dark theme using Catppuccin Mocha palette.
pub fn dark_theme() -> ThemeColors {
    ThemeColors {
        tree_fg: Color::Rgb(205, 214, 244),          // #cdd6f4 (text)
        tree_selected_bg: Color::Rgb(69, 71, 90),    // #45475a (surface1)
        tree_selected_fg: Color::Rgb(205, 214, 244), // #cdd6f4
        tree_dir_fg: Color::Rgb(137, 180, 250),      // #89b4fa (blue)
        tree_stats_fg: Color::Rgb(147, 153, 178),    // #9399b2 (overlay2)

        viewer_fg: Color::Rgb(205, 214, 244),
        viewer_line_nr_fg: Color::Rgb(108, 112, 134), // #6c7086 (overlay0)

        status_bg: Color::Rgb(30, 30, 46), // #1e1e2e (base)
        status_fg: Color::Rgb(205, 214, 244),

        border_fg: Color::Rgb(88, 91, 112),           // #585b70 (surface2)
        border_focused_fg: Color::Rgb(137, 180, 250), // #89b4fa (blue)

        vcs_modified_fg: Color::Rgb(249, 226, 175),  // #f9e2af (yellow)
        vcs_added_fg: Color::Rgb(166, 227, 161),     // #a6e3a1 (green)
        vcs_deleted_fg: Color::Rgb(243, 139, 168),   // #f38ba8 (red)
        vcs_untracked_fg: Color::Rgb(148, 226, 213), // #94e2d5 (teal)
        vcs_ignored_fg: Color::Rgb(108, 112, 134),   // #6c7086

        error_fg: Color::Rgb(243, 139, 168),
        warning_fg: Color::Rgb(250, 179, 135), // #fab387 (peach)
        info_fg: Color::Rgb(137, 180, 250),
        accent_fg: Color::Rgb(203, 166, 247), // #cba6f7 (mauve)
        dim_fg: Color::Rgb(108, 112, 134),
    }
}

/// Light theme — complementary light palette.
pub fn light_theme() -> ThemeColors {
    ThemeColors {
        tree_fg: Color::Rgb(76, 79, 105),            // #4c4f69 (text)
        tree_selected_bg: Color::Rgb(204, 208, 218), // #ccd0da (surface1)
        tree_selected_fg: Color::Rgb(76, 79, 105),
        tree_dir_fg: Color::Rgb(30, 102, 245),       // #1e66f5 (blue)
        tree_stats_fg: Color::Rgb(124, 127, 147),    // #7c7f93 (overlay2)

        viewer_fg: Color::Rgb(76, 79, 105),
        viewer_line_nr_fg: Color::Rgb(156, 160, 176), // #9ca0b0 (overlay0)

        status_bg: Color::Rgb(239, 241, 245), // #eff1f5 (base)
        status_fg: Color::Rgb(76, 79, 105),

        border_fg: Color::Rgb(172, 176, 190), // #acb0be (surface2)
        border_focused_fg: Color::Rgb(30, 102, 245),

        vcs_modified_fg: Color::Rgb(223, 142, 29),  // #df8e1d (yellow)
        vcs_added_fg: Color::Rgb(64, 160, 43),      // #40a02b (green)
        vcs_deleted_fg: Color::Rgb(210, 15, 57),    // #d20f39 (red)
        vcs_untracked_fg: Color::Rgb(23, 146, 153), // #179299 (teal)
        vcs_ignored_fg: Color::Rgb(156, 160, 176),

        error_fg: Color::Rgb(210, 15, 57),
        warning_fg: Color::Rgb(254, 100, 11), // #fe640b (peach)
        info_fg: Color::Rgb(30, 102, 245),
        accent_fg: Color::Rgb(136, 57, 239), // #8839ef (mauve)
        dim_fg: Color::Rgb(156, 160, 176),
    }
}

// ── Color parsing ────────────────────────────────────────────────────────────

/// Parse a hex color string like `"#aabbcc"` into a `ratatui::style::Color`.
/// Returns `None` for malformed input.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

// ── Theme resolution ─────────────────────────────────────────────────────────

/// Resolve the final `ThemeColors` from config.
///
/// - `"dark"` (default): dark Catppuccin palette
/// - `"light"`: light Catppuccin palette
/// - `"custom"`: start from dark palette, then override with custom hex values
pub fn resolve_theme(config: &ThemeConfig) -> ThemeColors {
    let scheme = config.scheme.as_deref().unwrap_or("dark");
    match scheme {
        "light" => light_theme(),
        "custom" => {
            let mut theme = dark_theme();
            if let Some(custom) = &config.custom {
                apply_custom_colors(&mut theme, custom);
            }
            theme
        }
        _ => dark_theme(),
    }
}

/// Apply custom hex color overrides on top of an existing theme. Malformed
/// values keep the existing color.
fn apply_custom_colors(theme: &mut ThemeColors, custom: &ThemeColorsConfig) {
    let overrides: [(&Option<String>, &mut Color); 15] = [
        (&custom.tree_fg, &mut theme.tree_fg),
        (&custom.tree_selected_bg, &mut theme.tree_selected_bg),
        (&custom.tree_selected_fg, &mut theme.tree_selected_fg),
        (&custom.tree_dir_fg, &mut theme.tree_dir_fg),
        (&custom.tree_stats_fg, &mut theme.tree_stats_fg),
        (&custom.viewer_fg, &mut theme.viewer_fg),
        (&custom.viewer_line_nr_fg, &mut theme.viewer_line_nr_fg),
        (&custom.status_bg, &mut theme.status_bg),
        (&custom.status_fg, &mut theme.status_fg),
        (&custom.border_fg, &mut theme.border_fg),
        (&custom.vcs_modified_fg, &mut theme.vcs_modified_fg),
        (&custom.vcs_added_fg, &mut theme.vcs_added_fg),
        (&custom.vcs_deleted_fg, &mut theme.vcs_deleted_fg),
        (&custom.vcs_untracked_fg, &mut theme.vcs_untracked_fg),
        (&custom.vcs_ignored_fg, &mut theme.vcs_ignored_fg),
    ];
    for (value, slot) in overrides {
        if let Some(color) = value.as_deref().and_then(parse_hex_color) {
            *slot = color;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
