use crossterm::event::{
  self, Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Mouse press, drag or release
  Mouse(MouseEvent),
  /// Terminal was resized; the next draw picks up the new size
  Resize,
  /// Periodic tick for UI refresh
  Tick,
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate. Ticks keep their
  /// rate while input is arriving.
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn terminal event reader
    tokio::task::spawn_blocking(move || {
      let mut last_tick = Instant::now();
      loop {
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).unwrap_or(false) {
          let event = match event::read() {
            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
            Ok(CrosstermEvent::Mouse(mouse)) => from_mouse(mouse),
            Ok(CrosstermEvent::Resize(..)) => Some(Event::Resize),
            _ => None,
          };
          if let Some(event) = event {
            if tx.send(event).is_err() {
              break;
            }
          }
        }

        if last_tick.elapsed() >= tick_rate {
          last_tick = Instant::now();
          if tx.send(Event::Tick).is_err() {
            break;
          }
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

/// Plain pointer motion is dropped; only presses, drags and releases matter.
fn from_mouse(mouse: MouseEvent) -> Option<Event> {
  match mouse.kind {
    MouseEventKind::Moved => None,
    _ => Some(Event::Mouse(mouse)),
  }
}
