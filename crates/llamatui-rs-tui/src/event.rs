//! Events consumed by the console loop.

use crossterm::event::KeyEvent;

/// Application event emitted by the input reader, the ticker or a probe task.
#[derive(Debug)]
pub enum AppEvent {
    /// Keyboard input event.
    Input(KeyEvent),
    /// Periodic tick event.
    Tick,
    /// Output of a finished telemetry run, tagged with the run's id.
    Telemetry { run: u64, lines: Vec<String> },
}
