//! Frame sinks — where verified payloads go.
//!
//! A payload handed to a sink has already passed length and checksum
//! verification; decoding and display belong to the sink. The
//! built-in sink logs each frame and can mirror the latest one to a
//! file in place of a real display backend.

use std::path::PathBuf;

use beam_core::BeamError;

// ── FrameSink ────────────────────────────────────────────────────

/// Consumes verified frame payloads.
pub trait FrameSink: Send {
    fn present(&mut self, payload: &[u8]) -> Result<(), BeamError>;
}

// ── LoggingFrameSink ─────────────────────────────────────────────

/// Stand-in display backend: logs frames, optionally mirroring the
/// latest payload to a file.
#[derive(Debug, Default)]
pub struct LoggingFrameSink {
    save_path: Option<PathBuf>,
    frames: u64,
}

impl LoggingFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror every presented frame to `path`.
    pub fn with_save_path(mut self, path: PathBuf) -> Self {
        self.save_path = Some(path);
        self
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for LoggingFrameSink {
    fn present(&mut self, payload: &[u8]) -> Result<(), BeamError> {
        self.frames += 1;
        tracing::info!("frame {}: {} bytes", self.frames, payload.len());

        if let Some(path) = &self.save_path {
            std::fs::write(path, payload)?;
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
