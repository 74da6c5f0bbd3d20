mod app;
mod components;
mod config;
mod edits;
mod error;
mod event;
mod fs;
mod handler;
mod logging;
mod rows;
mod session;
mod theme;
mod tui;
mod ui;
mod vcs;
mod viewer;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::sync::mpsc;

use crate::app::App;
use crate::config::{AppConfig, GeneralConfig, LogConfig, VcsConfig};
use crate::event::{Event, EventHandler};
use crate::session::BrowserSession;
use crate::tui::{install_panic_hook, Tui};
use crate::vcs::git::GitProvider;
use crate::vcs::poller::VcsPoller;
use crate::viewer::Viewer;

/// Tick rate of the event loop; scan and count deadlines are checked per tick.
const TICK_RATE_MS: u64 = 16;

/// A terminal project browser with live version-control status and line counts.
#[derive(Parser, Debug)]
#[command(name = "pb", version, about)]
struct Cli {
    /// Project root to browse (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not query version control; browse as a plain directory
    #[arg(long)]
    no_vcs: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Show hidden entries
    #[arg(long)]
    show_hidden: bool,
}

impl Cli {
    /// CLI flags as a partial config layered on top of the files.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                show_hidden: self.show_hidden.then_some(true),
                ..Default::default()
            },
            vcs: VcsConfig {
                enabled: self.no_vcs.then_some(false),
                ..Default::default()
            },
            log: LogConfig {
                file: self.log_file.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Open the project: from the repository's file list when it is one, else by
/// scanning. Returns the poller for repository sessions.
async fn open_session(
    root: &Path,
    config: &AppConfig,
    event_tx: mpsc::UnboundedSender<Event>,
) -> (BrowserSession, Option<VcsPoller>) {
    let ignore = config.ignore_policy();
    let settings = config.session_settings();

    if config.vcs_enabled() {
        let provider = GitProvider::new(config.vcs_timeout());
        if provider.is_repository(root).await {
            if let Some(files) = provider.tracked_files(root).await {
                let snapshot = provider.snapshot(root).await;
                let session = BrowserSession::open_vcs(root, &files, &snapshot, ignore, settings, Instant::now());
                let poller = VcsPoller::spawn(root.to_path_buf(), provider, config.poll_interval(), event_tx);
                return (session, Some(poller));
            }
            tracing::warn!("repository file list unavailable, scanning instead");
        }
    }

    let session = BrowserSession::open_plain(root, ignore, settings, Instant::now());
    (session, None)
}

fn app_vcs_label(session: &BrowserSession) -> &'static str {
    match session.source() {
        session::TreeSource::Vcs => "git",
        session::TreeSource::Plain => "none",
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    if let Some(log_file) = config.log_file() {
        if let Err(e) = logging::init_tracing(&log_file, config.log_filter()) {
            eprintln!("Warning: logging disabled: {}", e);
        }
    }

    let root = cli.path.canonicalize().map_err(|_| {
        error::AppError::InvalidPath(format!("{} does not exist", cli.path.display()))
    })?;
    if !root.is_dir() {
        return Err(error::AppError::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut events = EventHandler::new(Duration::from_millis(TICK_RATE_MS));
    let (session, poller) = open_session(&root, &config, events.sender()).await;

    tracing::info!(
        root = %root.display(),
        vcs = app_vcs_label(&session),
        theme = config.theme_scheme(),
        "session opened"
    );
    let theme = theme::resolve_theme(&config.theme);
    let viewer = Viewer::new(config.session_settings().line_count_max_bytes);
    let mut app = App::new(session, viewer, theme);
    if let Some(poller) = poller {
        app.attach_poller(poller);
    }

    install_panic_hook();
    let mut tui = Tui::new(config.mouse_enabled())?;

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(&mut app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(&mut app, mouse),
            Event::Tick => app.on_tick(Instant::now()),
            Event::Resize(_, _) => {}
            Event::Vcs(snapshot) => app.on_vcs(snapshot, Instant::now()),
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    tracing::info!("exiting");
    Ok(())
}
