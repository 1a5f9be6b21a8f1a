//! Terminal event pump

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

/// Spinner and notification refresh rate
pub const TICK_RATE: Duration = Duration::from_millis(100);

/// TUI Events
#[derive(Debug, Clone)]
pub enum TuiEvent {
    Key(KeyEvent),

    Resize(u16, u16),

    /// Animation tick
    Tick,

    /// Ctrl+C
    Quit,
}

/// Receives terminal events from a blocking reader thread
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<TuiEvent>,
}

impl EventHandler {
    pub fn new() -> (Self, mpsc::UnboundedSender<TuiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, tx)
    }

    /// Start reading. Stops once the receiver is dropped or Ctrl+C is pressed.
    pub fn start(tx: mpsc::UnboundedSender<TuiEvent>) {
        tokio::task::spawn_blocking(move || loop {
            if event::poll(TICK_RATE).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        if is_interrupt(&key) {
                            let _ = tx.send(TuiEvent::Quit);
                            break;
                        }
                        if tx.send(TuiEvent::Key(key)).is_err() {
                            break;
                        }
                    }
                    Ok(Event::Resize(w, h)) => {
                        let _ = tx.send(TuiEvent::Resize(w, h));
                    }
                    _ => {}
                }
            }

            if tx.send(TuiEvent::Tick).is_err() {
                break;
            }
        });
    }

    pub async fn next(&mut self) -> Option<TuiEvent> {
        self.rx.recv().await
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_detection() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert!(is_interrupt(&ctrl_c));
        assert!(!is_interrupt(&plain_c));
    }
}
