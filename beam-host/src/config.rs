//! Configuration for the host service.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::service::SubmitMode;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Relay connection settings.
    pub relay: RelayEndpointConfig,
    /// Capture settings.
    pub capture: CaptureConfig,
    /// Frame submission settings.
    pub submit: SubmitConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Relay connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEndpointConfig {
    /// Relay address (`host:port`).
    pub address: String,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Delay before a reconnect attempt, in seconds. Fixed — there is
    /// no backoff and no retry cap.
    pub reconnect_delay_secs: u64,
}

/// Capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Interval between frame submissions in milliseconds.
    pub interval_ms: u64,
    /// Captured surface width in pixels.
    pub width: u32,
    /// Captured surface height in pixels.
    pub height: u32,
}

/// Frame submission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    /// Submission granularity: "whole" sends each frame as one binary
    /// message (the relay makes one transfer per frame); "chunked"
    /// splits it into `chunk_size` pieces sent as independent binary
    /// messages, each of which the relay wraps as its own transfer.
    pub mode: String,
    /// Piece size for "chunked" mode, in bytes.
    pub chunk_size: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Optional log file path. If empty, logs to stderr.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            relay: RelayEndpointConfig::default(),
            capture: CaptureConfig::default(),
            submit: SubmitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RelayEndpointConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5000".into(),
            connect_timeout_ms: 5000,
            reconnect_delay_secs: 5,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 50,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            mode: "whole".into(),
            chunk_size: 32 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading / conversions ────────────────────────────────────────

impl HostConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let cfg = Self::default();
        let text = toml::to_string_pretty(&cfg)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, text)
    }

    /// Resolve the configured submission mode. Unknown values fall
    /// back to whole-frame submission with a warning.
    pub fn submit_mode(&self) -> SubmitMode {
        match self.submit.mode.as_str() {
            "whole" => SubmitMode::Whole,
            "chunked" => SubmitMode::Chunked,
            other => {
                tracing::warn!("unknown submit mode {other:?}; using whole");
                SubmitMode::Whole
            }
        }
    }

    /// The reconnect delay as a `Duration`.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.relay.reconnect_delay_secs)
    }

    /// The connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.relay.connect_timeout_ms)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = HostConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("address"));
        assert!(text.contains("interval_ms"));
        assert!(text.contains("chunk_size"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = HostConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: HostConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.relay.reconnect_delay_secs, 5);
        assert_eq!(parsed.capture.interval_ms, 50);
        assert_eq!(parsed.submit.chunk_size, 32 * 1024);
    }

    #[test]
    fn submit_mode_resolution() {
        let mut cfg = HostConfig::default();
        assert_eq!(cfg.submit_mode(), SubmitMode::Whole);
        cfg.submit.mode = "chunked".into();
        assert_eq!(cfg.submit_mode(), SubmitMode::Chunked);
        cfg.submit.mode = "streamed".into();
        assert_eq!(cfg.submit_mode(), SubmitMode::Whole);
    }

    #[test]
    fn reconnect_delay_is_fixed_five_seconds() {
        let cfg = HostConfig::default();
        assert_eq!(cfg.reconnect_delay(), Duration::from_secs(5));
    }
}
