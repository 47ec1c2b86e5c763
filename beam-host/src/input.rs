//! Input sinks — where resolved control commands go.
//!
//! Commands arrive already scaled to screen coordinates. A platform
//! backend would replay them into the OS input stream; the built-in
//! sink logs them instead.

use beam_core::{BeamError, InputEvent};

// ── InputSink ────────────────────────────────────────────────────

/// Executes screen-space input events.
pub trait InputSink: Send {
    fn apply(&mut self, event: InputEvent) -> Result<(), BeamError>;
}

// ── LoggingInputSink ─────────────────────────────────────────────

/// Stand-in injection backend: records events to the log.
#[derive(Debug, Default)]
pub struct LoggingInputSink;

impl LoggingInputSink {
    pub fn new() -> Self {
        Self
    }
}

impl InputSink for LoggingInputSink {
    fn apply(&mut self, event: InputEvent) -> Result<(), BeamError> {
        tracing::info!("input: {event:?}");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_sink_accepts_events() {
        let mut sink = LoggingInputSink::new();
        sink.apply(InputEvent::MouseMove { x: 10, y: 20 }).unwrap();
        sink.apply(InputEvent::KeyPress { code: 65 }).unwrap();
    }
}
