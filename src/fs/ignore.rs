use std::path::{Component, Path};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Names that never appear in the tree and are never scanned.
pub const DEFAULT_IGNORED_NAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".DS_Store",
    "target",
];

/// Prefix marking hidden entries.
pub const HIDDEN_PREFIX: char = '.';

/// Static name/pattern policy deciding which entries are excluded from the tree.
///
/// The built-in names and configured patterns are gitignore-style globs
/// (`*.pyc`, `*cache*`, `build-?`) matched against each entry name. A
/// trailing `/` is dropped since only names are seen.
#[derive(Debug, Clone)]
pub struct IgnorePolicy {
    matcher: Gitignore,
    show_hidden: bool,
}

impl Default for IgnorePolicy {
    fn default() -> Self {
        Self::new(&[], false)
    }
}

impl IgnorePolicy {
    /// Build a policy from the built-in name set plus configured patterns.
    pub fn new(extra_patterns: &[String], show_hidden: bool) -> Self {
        let mut builder = GitignoreBuilder::new("");
        let lines = DEFAULT_IGNORED_NAMES
            .iter()
            .copied()
            .chain(extra_patterns.iter().map(String::as_str));
        for line in lines {
            let line = line.trim().trim_end_matches('/');
            if line.is_empty() {
                continue;
            }
            if let Err(err) = builder.add_line(None, line) {
                tracing::warn!(pattern = line, %err, "ignoring invalid ignore pattern");
            }
        }
        let matcher = builder.build().unwrap_or_else(|err| {
            tracing::warn!(%err, "ignore patterns failed to compile");
            Gitignore::empty()
        });
        Self { matcher, show_hidden }
    }

    /// Whether an entry with this name is excluded.
    pub fn is_ignored(&self, name: &str) -> bool {
        if !self.show_hidden && name.starts_with(HIDDEN_PREFIX) {
            return true;
        }
        self.matcher.matched(Path::new(name), false).is_ignore()
    }

    /// Whether any normal component of `relative` is excluded.
    pub fn is_path_ignored(&self, relative: &Path) -> bool {
        relative.components().any(|component| match component {
            Component::Normal(name) => self.is_ignored(&name.to_string_lossy()),
            _ => false,
        })
    }
}
