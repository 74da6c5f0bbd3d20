//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--no-vcs`, `--show-hidden`, `--log-file`)
//! 2. `--config <file>`
//! 3. `$PB_CONFIG` environment variable (path to config file)
//! 4. Project-local `.pb.toml` in the current working directory
//! 5. Global `~/.config/project-browser/config.toml`
//! 6. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::fs::ignore::IgnorePolicy;
use crate::fs::line_count::DEFAULT_MAX_BYTES;
use crate::fs::scan::{
    ScanSettings, DEFAULT_BATCH_DELAY_MS, DEFAULT_BATCH_SIZE, DEFAULT_MAX_DIR_ENTRIES,
    DEFAULT_SAFE_BATCH_DELAY_MS, DEFAULT_SAFE_MODE_THRESHOLD,
};
use crate::fs::tree::MAX_DEPTH;
use crate::session::{SessionSettings, DEFAULT_COUNT_BATCH_DELAY_MS, DEFAULT_COUNT_BATCH_SIZE};
use crate::vcs::git::DEFAULT_TIMEOUT_MS;
use crate::vcs::poller::DEFAULT_POLL_INTERVAL_MS;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable mouse support.
    pub mouse: Option<bool>,
    /// Show hidden entries.
    pub show_hidden: Option<bool>,
}

/// Directory scanning settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Directories listed per batch.
    pub batch_size: Option<usize>,
    /// Delay between batches in milliseconds.
    pub batch_delay_ms: Option<u64>,
    /// Delay between batches in safe mode in milliseconds.
    pub safe_batch_delay_ms: Option<u64>,
    /// First-level entry count that switches to safe mode.
    pub safe_mode_threshold: Option<usize>,
    /// Deepest level scanned (capped at the built-in limit).
    pub max_depth: Option<usize>,
    /// Entries kept per directory before it is marked partial.
    pub max_dir_entries: Option<usize>,
}

/// Line counting settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LineCountConfig {
    /// Files above this size are not read.
    pub max_bytes: Option<u64>,
    /// Files counted per batch.
    pub batch_size: Option<usize>,
    /// Delay between batches in milliseconds.
    pub batch_delay_ms: Option<u64>,
}

/// Version-control settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VcsConfig {
    /// Query git for status and diffs.
    pub enabled: Option<bool>,
    /// Interval between status polls in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Timeout for a single git invocation in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Show an untracked file's lines as additions.
    pub untracked_as_added: Option<bool>,
}

/// Extra ignore patterns on top of the built-in set.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct IgnoreConfig {
    pub patterns: Option<Vec<String>>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub tree_fg: Option<String>,
    pub tree_selected_bg: Option<String>,
    pub tree_selected_fg: Option<String>,
    pub tree_dir_fg: Option<String>,
    pub tree_stats_fg: Option<String>,
    pub viewer_fg: Option<String>,
    pub viewer_line_nr_fg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
    pub vcs_modified_fg: Option<String>,
    pub vcs_added_fg: Option<String>,
    pub vcs_deleted_fg: Option<String>,
    pub vcs_untracked_fg: Option<String>,
    pub vcs_ignored_fg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// Log file path.
    pub file: Option<PathBuf>,
    /// Filter directive, e.g. `"debug"` or `"project_browser=trace"`.
    pub filter: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub scan: ScanConfig,
    pub line_count: LineCountConfig,
    pub vcs: VcsConfig,
    pub ignore: IgnoreConfig,
    pub theme: ThemeConfig,
    pub log: LogConfig,
}

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path — that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("PB_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".pb.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("project-browser").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self` — `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                mouse: other.general.mouse.or(self.general.mouse),
                show_hidden: other.general.show_hidden.or(self.general.show_hidden),
            },
            scan: ScanConfig {
                batch_size: other.scan.batch_size.or(self.scan.batch_size),
                batch_delay_ms: other.scan.batch_delay_ms.or(self.scan.batch_delay_ms),
                safe_batch_delay_ms: other
                    .scan
                    .safe_batch_delay_ms
                    .or(self.scan.safe_batch_delay_ms),
                safe_mode_threshold: other
                    .scan
                    .safe_mode_threshold
                    .or(self.scan.safe_mode_threshold),
                max_depth: other.scan.max_depth.or(self.scan.max_depth),
                max_dir_entries: other.scan.max_dir_entries.or(self.scan.max_dir_entries),
            },
            line_count: LineCountConfig {
                max_bytes: other.line_count.max_bytes.or(self.line_count.max_bytes),
                batch_size: other.line_count.batch_size.or(self.line_count.batch_size),
                batch_delay_ms: other
                    .line_count
                    .batch_delay_ms
                    .or(self.line_count.batch_delay_ms),
            },
            vcs: VcsConfig {
                enabled: other.vcs.enabled.or(self.vcs.enabled),
                poll_interval_ms: other.vcs.poll_interval_ms.or(self.vcs.poll_interval_ms),
                timeout_ms: other.vcs.timeout_ms.or(self.vcs.timeout_ms),
                untracked_as_added: other
                    .vcs
                    .untracked_as_added
                    .or(self.vcs.untracked_as_added),
            },
            ignore: IgnoreConfig {
                patterns: other.ignore.patterns.clone().or(self.ignore.patterns),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: other.theme.custom.clone().or(self.theme.custom),
            },
            log: LogConfig {
                file: other.log.file.clone().or(self.log.file),
                filter: other.log.filter.clone().or(self.log.filter),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(false)
    }

    pub fn show_hidden(&self) -> bool {
        self.general.show_hidden.unwrap_or(false)
    }

    pub fn vcs_enabled(&self) -> bool {
        self.vcs.enabled.unwrap_or(true)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.vcs.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn vcs_timeout(&self) -> Duration {
        Duration::from_millis(self.vcs.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    pub fn untracked_as_added(&self) -> bool {
        self.vcs.untracked_as_added.unwrap_or(true)
    }

    pub fn ignore_patterns(&self) -> &[String] {
        self.ignore.patterns.as_deref().unwrap_or(&[])
    }

    /// Theme scheme: "dark", "light", or "custom".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }

    /// Log filter directive; `$PB_LOG` still wins when set.
    pub fn log_filter(&self) -> &str {
        self.log.filter.as_deref().unwrap_or("info")
    }

    /// Log file, defaulting to `<cache_dir>/project-browser/browser.log`.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log.file.clone().or_else(|| {
            dirs::cache_dir().map(|dir| dir.join("project-browser").join("browser.log"))
        })
    }

    pub fn ignore_policy(&self) -> IgnorePolicy {
        IgnorePolicy::new(self.ignore_patterns(), self.show_hidden())
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            batch_size: self.scan.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            batch_delay: Duration::from_millis(self.scan.batch_delay_ms.unwrap_or(DEFAULT_BATCH_DELAY_MS)),
            safe_batch_delay: Duration::from_millis(
                self.scan
                    .safe_batch_delay_ms
                    .unwrap_or(DEFAULT_SAFE_BATCH_DELAY_MS),
            ),
            safe_mode_threshold: self
                .scan
                .safe_mode_threshold
                .unwrap_or(DEFAULT_SAFE_MODE_THRESHOLD),
            max_depth: self.scan.max_depth.unwrap_or(MAX_DEPTH).min(MAX_DEPTH),
            max_dir_entries: self.scan.max_dir_entries.unwrap_or(DEFAULT_MAX_DIR_ENTRIES),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            scan: self.scan_settings(),
            line_count_max_bytes: self.line_count.max_bytes.unwrap_or(DEFAULT_MAX_BYTES),
            count_batch_size: self.line_count.batch_size.unwrap_or(DEFAULT_COUNT_BATCH_SIZE),
            count_batch_delay: Duration::from_millis(
                self.line_count
                    .batch_delay_ms
                    .unwrap_or(DEFAULT_COUNT_BATCH_DELAY_MS),
            ),
            untracked_as_added: self.untracked_as_added(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
