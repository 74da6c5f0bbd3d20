use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::edits::EditTracker;
use crate::session::BrowserSession;
use crate::theme::ThemeColors;
use crate::vcs::poller::VcsPoller;
use crate::vcs::VcsSnapshot;
use crate::viewer::Viewer;

/// How long a status message stays up.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Which panel receives navigation keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Tree,
    Viewer,
}

/// Application mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    /// Typing into the filter prompt.
    Filter,
}

/// Main application state.
pub struct App {
    pub session: BrowserSession,
    pub viewer: Viewer,
    pub edits: EditTracker,
    pub theme: ThemeColors,
    pub focus: Focus,
    pub mode: AppMode,
    pub should_quit: bool,
    pub status_message: Option<(String, Instant)>,
    poller: Option<VcsPoller>,
}

impl App {
    pub fn new(session: BrowserSession, viewer: Viewer, theme: ThemeColors) -> Self {
        Self {
            session,
            viewer,
            edits: EditTracker::new(),
            theme,
            focus: Focus::Tree,
            mode: AppMode::Normal,
            should_quit: false,
            status_message: None,
            poller: None,
        }
    }

    /// Hand over the status poller; it lives as long as the session.
    pub fn attach_poller(&mut self, poller: VcsPoller) {
        self.poller = Some(poller);
    }

    pub fn has_poller(&self) -> bool {
        self.poller.is_some()
    }

    /// Quit the application, ending the session and its status timer.
    pub fn quit(&mut self) {
        self.should_quit = true;
        self.poller = None;
        self.session.close();
    }

    /// Run due scan and count batches.
    pub fn on_tick(&mut self, now: Instant) {
        self.session.tick(now);
        self.sync_edits();
        self.clear_expired_status(now);
    }

    /// Apply a finished status poll.
    pub fn on_vcs(&mut self, snapshot: VcsSnapshot, now: Instant) {
        let outcome = self.session.reconcile(&snapshot, self.viewer.path(), now);
        self.viewer.attach(outcome.viewer);
        if outcome.added > 0 {
            tracing::debug!(added = outcome.added, "new paths from status poll");
        }
        self.sync_edits();
    }

    /// Feed content changes seen by the line counter into the edit markers.
    fn sync_edits(&mut self) {
        let changed = self.session.drain_changed_on_disk();
        if changed.is_empty() {
            return;
        }
        let viewer_touched = self
            .viewer
            .path()
            .is_some_and(|p| changed.iter().any(|c| c == p));
        if self.edits.record(changed) {
            self.session.set_external_modified(self.edits.paths().clone());
        }
        if viewer_touched {
            self.viewer.reload_if_changed();
        }
    }

    pub fn clear_edit_markers(&mut self) {
        self.edits.clear();
        self.session.set_external_modified(HashSet::new());
        self.set_status_message("Edit markers cleared".to_string());
    }

    /// Re-list directories, recheck line counts and ask for a status poll now.
    pub fn refresh(&mut self, now: Instant) {
        self.session.refresh(now);
        if let Some(poller) = &self.poller {
            poller.poke();
        }
        self.viewer.reload_if_changed();
        self.set_status_message("Refreshing".to_string());
    }

    /// Enter on the selected row: toggle a directory, open a file.
    pub fn activate_selected(&mut self, now: Instant) {
        let Some(id) = self.session.selected() else {
            return;
        };
        if self.session.node(id).is_dir() {
            self.session.toggle_expand(id, now);
            return;
        }
        let path = self.session.node(id).path.clone();
        self.session.ensure_line_count(id);
        self.viewer.open(&path, id);
        self.sync_edits();
    }

    /// `l`: expand a collapsed directory, open a file.
    pub fn expand_or_open(&mut self, now: Instant) {
        match self.session.selected() {
            Some(id) if self.session.node(id).is_dir() => self.session.expand_selected(now),
            Some(_) => self.activate_selected(now),
            None => {}
        }
    }

    /// Close the open file and return to the tree.
    pub fn close_viewer(&mut self) {
        self.viewer.close();
        self.focus = Focus::Tree;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree if self.viewer.is_open() => Focus::Viewer,
            _ => Focus::Tree,
        };
    }

    // Filter prompt

    pub fn start_filter(&mut self) {
        self.mode = AppMode::Filter;
        self.focus = Focus::Tree;
    }

    pub fn filter_input_char(&mut self, c: char) {
        self.session.push_filter_char(c);
    }

    pub fn filter_delete_char(&mut self) {
        self.session.pop_filter_char();
    }

    /// Leave the prompt, keeping the filter applied.
    pub fn accept_filter(&mut self) {
        self.mode = AppMode::Normal;
    }

    /// Leave the prompt and drop the filter.
    pub fn cancel_filter(&mut self) {
        self.mode = AppMode::Normal;
        self.session.clear_filter();
    }

    pub fn toggle_only_changed(&mut self) {
        self.session.toggle_only_changed();
        let msg = if self.session.filter().only_changed {
            "Showing changed files only"
        } else {
            "Showing all files"
        };
        self.set_status_message(msg.to_string());
    }

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    pub fn clear_expired_status(&mut self, now: Instant) {
        if let Some((_, created)) = &self.status_message {
            if now.saturating_duration_since(*created) > STATUS_TTL {
                self.status_message = None;
            }
        }
    }
}
