use std::io::{self, Stdout};

use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::error::{AppError, Result};

pub type Backend = CrosstermBackend<Stdout>;

/// Owns the terminal for the lifetime of the browser: raw mode, alternate
/// screen and, when configured, mouse capture. Dropping it restores the
/// terminal if `restore` was never called.
pub struct Tui {
    terminal: Terminal<Backend>,
    mouse_enabled: bool,
    active: bool,
}

impl Tui {
    pub fn new(enable_mouse: bool) -> Result<Self> {
        terminal::enable_raw_mode()
            .map_err(|e| AppError::Terminal(format!("cannot enable raw mode: {}", e)))?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        if enable_mouse {
            execute!(stdout, EnableMouseCapture)?;
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        tracing::debug!(mouse = enable_mouse, "terminal initialized");
        Ok(Self {
            terminal,
            mouse_enabled: enable_mouse,
            active: true,
        })
    }

    /// Leave the alternate screen and raw mode. Safe to call twice.
    pub fn restore(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        reset_terminal(self.mouse_enabled)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<Backend> {
        &mut self.terminal
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!(error = %e, "terminal restore failed");
        }
    }
}

fn reset_terminal(mouse_enabled: bool) -> Result<()> {
    let mut stdout = io::stdout();
    if mouse_enabled {
        execute!(stdout, DisableMouseCapture)?;
    }
    terminal::disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen, cursor::Show)?;
    Ok(())
}

/// Restore the terminal before the default panic output is printed.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = reset_terminal(true);
        original_hook(panic_info);
    }));
}
