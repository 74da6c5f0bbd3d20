//! File viewer state: the open file, its loaded text and the scroll position.
//!
//! The viewer holds a path, not a node. After each reconciliation the app
//! resolves the path against the fresh tree and calls [`Viewer::attach`], which
//! reloads the contents only when the file's size or mtime moved.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::fs::line_count::DEFAULT_MAX_BYTES;
use crate::fs::tree::NodeId;

/// Extensions treated as binary without looking at the bytes.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "pdf", "zip", "tar", "gz", "bz2", "xz", "so", "dylib",
    "exe", "bin", "img", "iso", "wasm", "o", "a",
];

/// How many leading bytes are scanned for a null byte.
const BINARY_SNIFF_BYTES: usize = 8192;

const TAB_WIDTH: usize = 4;

/// What the viewer currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewerContent {
    #[default]
    Empty,
    Text(Vec<String>),
    Binary { size: u64 },
    TooLarge { size: u64 },
    Unreadable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    size: u64,
    mtime: Option<SystemTime>,
}

impl Stamp {
    fn read(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        Some(Self {
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }
}

#[derive(Debug)]
pub struct Viewer {
    path: Option<PathBuf>,
    node: Option<NodeId>,
    content: ViewerContent,
    stamp: Option<Stamp>,
    scroll_offset: usize,
    height: usize,
    max_bytes: u64,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}

impl Viewer {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            path: None,
            node: None,
            content: ViewerContent::Empty,
            stamp: None,
            scroll_offset: 0,
            height: 0,
            max_bytes,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn content(&self) -> &ViewerContent {
        &self.content
    }

    pub fn is_open(&self) -> bool {
        self.path.is_some()
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Open `path`. Reopening the file already shown keeps the scroll offset.
    pub fn open(&mut self, path: &Path, node: NodeId) {
        if self.path.as_deref() != Some(path) {
            self.scroll_offset = 0;
        }
        self.path = Some(path.to_path_buf());
        self.node = Some(node);
        self.load();
    }

    pub fn close(&mut self) {
        self.path = None;
        self.node = None;
        self.content = ViewerContent::Empty;
        self.stamp = None;
        self.scroll_offset = 0;
    }

    /// Take the node the open path resolves to after a reconcile, then reload
    /// if the file changed on disk. Returns true when the contents were reloaded.
    pub fn attach(&mut self, node: Option<NodeId>) -> bool {
        if self.path.is_none() {
            return false;
        }
        self.node = node;
        self.reload_if_changed()
    }

    /// Reload when size or mtime differs from the last load.
    pub fn reload_if_changed(&mut self) -> bool {
        let Some(path) = self.path.as_deref() else {
            return false;
        };
        if Stamp::read(path) == self.stamp && self.stamp.is_some() {
            return false;
        }
        tracing::debug!(path = %path.display(), "viewer file changed, reloading");
        self.load();
        true
    }

    fn load(&mut self) {
        let Some(path) = self.path.clone() else {
            return;
        };
        self.stamp = Stamp::read(&path);
        self.content = match self.stamp {
            None => ViewerContent::Unreadable("file not found".to_string()),
            Some(stamp) if stamp.size > self.max_bytes => ViewerContent::TooLarge { size: stamp.size },
            Some(stamp) if has_binary_extension(&path) => ViewerContent::Binary { size: stamp.size },
            Some(stamp) => match read_bounded(&path, self.max_bytes) {
                Ok(bytes) if looks_binary(&bytes) => ViewerContent::Binary { size: stamp.size },
                Ok(bytes) => ViewerContent::Text(split_lines(&bytes)),
                Err(err) => {
                    tracing::debug!(path = %path.display(), %err, "viewer read failed");
                    ViewerContent::Unreadable(err.to_string())
                }
            },
        };
        self.clamp_scroll();
    }

    pub fn line_count(&self) -> usize {
        match &self.content {
            ViewerContent::Text(lines) => lines.len(),
            _ => 0,
        }
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height;
        self.clamp_scroll();
    }

    fn max_offset(&self) -> usize {
        self.line_count().saturating_sub(self.height.max(1))
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_offset());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(self.max_offset());
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_offset();
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.height.max(1));
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.height.max(1));
    }

    /// Panel title: file name plus line count or kind.
    pub fn title(&self) -> String {
        let Some(path) = self.path.as_deref() else {
            return " Viewer ".to_string();
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match &self.content {
            ViewerContent::Text(lines) => format!(" {} ({} lines) ", name, lines.len()),
            ViewerContent::Binary { size } => format!(" {} (binary, {}) ", name, format_size(*size)),
            ViewerContent::TooLarge { size } => format!(" {} ({}) ", name, format_size(*size)),
            ViewerContent::Unreadable(_) | ViewerContent::Empty => format!(" {} ", name),
        }
    }
}

fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.iter().any(|b| b.eq_ignore_ascii_case(ext)))
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(BINARY_SNIFF_BYTES)].contains(&0)
}

fn read_bounded(path: &Path, max_bytes: u64) -> std::io::Result<Vec<u8>> {
    let file = fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.take(max_bytes).read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(|line| line.replace('\t', &" ".repeat(TAB_WIDTH)))
        .collect()
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    fn node(n: usize) -> NodeId {
        let mut tree = crate::fs::tree::FileTree::new(Path::new("/v"));
        let mut id = NodeId::ROOT;
        for i in 0..n {
            id = tree
                .ensure_file(Path::new(&format!("f{}", i)), crate::fs::tree::MAX_DEPTH)
                .unwrap()
                .0;
        }
        id
    }

    fn write_lines(path: &Path, count: usize) {
        let mut f = File::create(path).unwrap();
        for i in 0..count {
            writeln!(f, "line {}", i).unwrap();
        }
    }

    fn bump_mtime(path: &Path) {
        let file = File::options().write(true).open(path).unwrap();
        let later = SystemTime::now() + Duration::from_secs(60);
        file.set_modified(later).unwrap();
    }

    #[test]
    fn opens_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.rs");
        std::fs::write(&path, "fn main() {\n\tlet x = 1;\n}\n").unwrap();

        let mut viewer = Viewer::default();
        viewer.open(&path, node(1));
        match viewer.content() {
            ViewerContent::Text(lines) => {
                assert_eq!(lines.len(), 3);
                assert_eq!(lines[1], "    let x = 1;");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(viewer.title(), " a.rs (3 lines) ");
    }

    #[test]
    fn oversized_and_binary_files_are_not_shown_as_text() {
        let dir = TempDir::new().unwrap();
        let big = dir.path().join("big.txt");
        std::fs::write(&big, vec![b'x'; 64]).unwrap();
        let mut viewer = Viewer::new(16);
        viewer.open(&big, node(1));
        assert_eq!(viewer.content(), &ViewerContent::TooLarge { size: 64 });

        let blob = dir.path().join("blob.dat");
        std::fs::write(&blob, b"abc\0def").unwrap();
        let mut viewer = Viewer::default();
        viewer.open(&blob, node(1));
        assert_eq!(viewer.content(), &ViewerContent::Binary { size: 7 });
    }

    #[test]
    fn missing_file_is_unreadable() {
        let mut viewer = Viewer::default();
        viewer.open(Path::new("/definitely/not/here.txt"), node(1));
        assert!(matches!(viewer.content(), ViewerContent::Unreadable(_)));
    }

    #[test]
    fn attach_keeps_contents_when_file_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        write_lines(&path, 30);
        let mut viewer = Viewer::default();
        viewer.set_height(10);
        viewer.open(&path, node(1));
        viewer.scroll_down(5);

        assert!(!viewer.attach(Some(node(2))));
        assert_eq!(viewer.node(), Some(node(2)));
        assert_eq!(viewer.scroll_offset(), 5);
    }

    #[test]
    fn attach_reloads_changed_file_and_clamps_scroll() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        write_lines(&path, 50);
        let mut viewer = Viewer::default();
        viewer.set_height(10);
        viewer.open(&path, node(1));
        viewer.scroll_to_bottom();
        assert_eq!(viewer.scroll_offset(), 40);

        write_lines(&path, 15);
        bump_mtime(&path);
        assert!(viewer.attach(Some(node(1))));
        assert_eq!(viewer.line_count(), 15);
        assert_eq!(viewer.scroll_offset(), 5);
    }

    #[test]
    fn reopening_same_path_keeps_scroll() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        write_lines(&a, 40);
        write_lines(&b, 40);
        let mut viewer = Viewer::default();
        viewer.set_height(10);
        viewer.open(&a, node(1));
        viewer.scroll_down(7);
        viewer.open(&a, node(1));
        assert_eq!(viewer.scroll_offset(), 7);
        viewer.open(&b, node(2));
        assert_eq!(viewer.scroll_offset(), 0);
    }

    #[test]
    fn scrolling_is_bounded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        write_lines(&path, 12);
        let mut viewer = Viewer::default();
        viewer.set_height(10);
        viewer.open(&path, node(1));
        viewer.page_down();
        assert_eq!(viewer.scroll_offset(), 2);
        viewer.scroll_up(100);
        assert_eq!(viewer.scroll_offset(), 0);
    }

    #[test]
    fn closed_viewer_ignores_attach() {
        let mut viewer = Viewer::default();
        assert!(!viewer.attach(Some(node(1))));
        assert_eq!(viewer.title(), " Viewer ");
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
