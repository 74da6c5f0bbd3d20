use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};
use tokio::sync::mpsc;

use crate::error::{AppError, Result};
use crate::vcs::VcsSnapshot;

/// Events the main loop reacts to.
#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Periodic tick; drives rendering and the scan/count deadlines.
    Tick,
    Resize(u16, u16),
    /// A finished status poll.
    Vcs(VcsSnapshot),
}

/// Forwards terminal input and ticks from a background task over a channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            loop {
                let event = if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
                        Ok(CrosstermEvent::Mouse(mouse)) => Event::Mouse(mouse),
                        Ok(CrosstermEvent::Resize(w, h)) => Event::Resize(w, h),
                        Ok(_) => continue,
                        Err(err) => {
                            tracing::warn!(%err, "terminal read failed");
                            continue;
                        }
                    }
                } else {
                    Event::Tick
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Sender for background producers such as the status poller.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| AppError::Terminal("event channel closed".into()))
    }
}
