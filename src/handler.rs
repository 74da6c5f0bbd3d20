use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, AppMode, Focus};

/// Lines scrolled per mouse wheel step.
const WHEEL_STEP: usize = 3;

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }
    match app.mode {
        AppMode::Filter => handle_filter_key(app, key),
        AppMode::Normal => match app.focus {
            Focus::Tree => handle_tree_key(app, key),
            Focus::Viewer => handle_viewer_key(app, key),
        },
    }
}

fn handle_filter_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.accept_filter(),
        KeyCode::Esc => app.cancel_filter(),
        KeyCode::Backspace => app.filter_delete_char(),
        KeyCode::Down => app.session.select_next(),
        KeyCode::Up => app.session.select_previous(),
        KeyCode::Char(c) => app.filter_input_char(c),
        _ => {}
    }
}

/// Keys shared by both panels.
fn handle_global_key(app: &mut App, key: KeyEvent) -> bool {
    let now = Instant::now();
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Char('/') => app.start_filter(),
        KeyCode::Char('c') => app.toggle_only_changed(),
        KeyCode::Char('r') => app.refresh(now),
        KeyCode::Char('x') => app.clear_edit_markers(),
        _ => return false,
    }
    true
}

fn handle_tree_key(app: &mut App, key: KeyEvent) {
    if handle_global_key(app, key) {
        return;
    }
    let now = Instant::now();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.session.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.session.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.session.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.session.select_last(),
        KeyCode::PageDown => app.session.page_down(),
        KeyCode::PageUp => app.session.page_up(),
        KeyCode::Enter => app.activate_selected(now),
        KeyCode::Char('l') | KeyCode::Right => app.expand_or_open(now),
        KeyCode::Char('h') | KeyCode::Left => app.session.collapse_selected(now),
        KeyCode::Esc => app.session.clear_filter(),
        _ => {}
    }
}

fn handle_viewer_key(app: &mut App, key: KeyEvent) {
    if handle_global_key(app, key) {
        return;
    }
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.viewer.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.viewer.scroll_up(1),
        KeyCode::Char('g') | KeyCode::Home => app.viewer.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.viewer.scroll_to_bottom(),
        KeyCode::PageDown | KeyCode::Char(' ') => app.viewer.page_down(),
        KeyCode::PageUp => app.viewer.page_up(),
        KeyCode::Esc => app.close_viewer(),
        KeyCode::Char('h') | KeyCode::Left => app.focus = Focus::Tree,
        _ => {}
    }
}

/// Mouse wheel scrolls whichever panel has focus.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match (mouse.kind, app.focus) {
        (MouseEventKind::ScrollDown, Focus::Tree) => app.session.select_next(),
        (MouseEventKind::ScrollUp, Focus::Tree) => app.session.select_previous(),
        (MouseEventKind::ScrollDown, Focus::Viewer) => app.viewer.scroll_down(WHEEL_STEP),
        (MouseEventKind::ScrollUp, Focus::Viewer) => app.viewer.scroll_up(WHEEL_STEP),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ignore::IgnorePolicy;
    use crate::session::{BrowserSession, SessionSettings};
    use crate::theme;
    use crate::viewer::Viewer;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn setup_app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "pub fn f() {}\n").unwrap();
        fs::write(dir.path().join("notes.md"), "a\nb\nc\n").unwrap();
        let mut now = Instant::now();
        let session = BrowserSession::open_plain(
            dir.path(),
            IgnorePolicy::default(),
            SessionSettings::default(),
            now,
        );
        let mut app = App::new(session, Viewer::default(), theme::dark_theme());
        for _ in 0..100 {
            now += Duration::from_secs(1);
            app.on_tick(now);
            if !app.session.is_busy() {
                break;
            }
        }
        (dir, app)
    }

    #[test]
    fn q_and_ctrl_c_quit() {
        let (_dir, mut app) = setup_app();
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);

        let (_dir, mut app) = setup_app();
        handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn navigation_keys_move_selection() {
        let (_dir, mut app) = setup_app();
        handle_key_event(&mut app, key(KeyCode::Char('j')));
        assert_eq!(app.session.selected_index, 1);
        handle_key_event(&mut app, key(KeyCode::Char('k')));
        assert_eq!(app.session.selected_index, 0);
        handle_key_event(&mut app, key(KeyCode::Char('G')));
        assert_eq!(app.session.selected_index, app.session.entries().len() - 1);
        handle_key_event(&mut app, key(KeyCode::Char('g')));
        assert_eq!(app.session.selected_index, 0);
    }

    #[test]
    fn filter_prompt_captures_typed_keys() {
        let (_dir, mut app) = setup_app();
        handle_key_event(&mut app, key(KeyCode::Char('/')));
        assert_eq!(app.mode, AppMode::Filter);
        // 'q' is filter text here, not quit.
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.should_quit);
        handle_key_event(&mut app, key(KeyCode::Backspace));
        for c in "lib".chars() {
            handle_key_event(&mut app, key(KeyCode::Char(c)));
        }
        assert_eq!(app.session.filter().text, "lib");
        handle_key_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.mode, AppMode::Normal);
        assert!(app.session.filter().text.is_empty());
    }

    #[test]
    fn enter_opens_file_and_tab_switches_to_viewer() {
        let (dir, mut app) = setup_app();
        assert!(app.session.select_path(&dir.path().join("notes.md")));
        handle_key_event(&mut app, key(KeyCode::Enter));
        assert!(app.viewer.is_open());
        handle_key_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::Viewer);
        handle_key_event(&mut app, key(KeyCode::Char('h')));
        assert_eq!(app.focus, Focus::Tree);
        assert!(app.viewer.is_open());
        handle_key_event(&mut app, key(KeyCode::Tab));
        handle_key_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.focus, Focus::Tree);
        assert!(!app.viewer.is_open());
    }

    #[test]
    fn l_expands_but_never_collapses() {
        let (dir, mut app) = setup_app();
        assert!(app.session.select_path(&dir.path().join("src")));
        let id = app.session.selected().unwrap();
        handle_key_event(&mut app, key(KeyCode::Char('l')));
        assert!(app.session.node(id).is_expanded());
        handle_key_event(&mut app, key(KeyCode::Char('l')));
        assert!(app.session.node(id).is_expanded());
        handle_key_event(&mut app, key(KeyCode::Char('h')));
        assert!(!app.session.node(id).is_expanded());
    }

    #[test]
    fn c_toggles_only_changed() {
        let (_dir, mut app) = setup_app();
        handle_key_event(&mut app, key(KeyCode::Char('c')));
        assert!(app.session.filter().only_changed);
        assert!(app.session.entries().is_empty());
        handle_key_event(&mut app, key(KeyCode::Char('c')));
        assert!(!app.session.filter().only_changed);
    }
}
