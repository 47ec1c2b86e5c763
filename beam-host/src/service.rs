//! Host service core logic.
//!
//! Connects to the relay, waits for a viewer to show up, then submits
//! frames from the screen source on a fixed interval while executing
//! any control commands that come back. A lost connection is retried
//! after a fixed delay, forever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use beam_core::{
    chunk_ranges, BeamError, ControlCommand, Frame, FrameCodec, Role, VIEWER_CONNECTED,
};

use crate::config::HostConfig;
use crate::input::InputSink;
use crate::source::ScreenSource;

// ── SubmitMode ───────────────────────────────────────────────────

/// How a captured frame is handed to the relay.
///
/// The relay wraps every inbound binary message as one complete
/// transfer, so `Whole` yields one decodable transfer per frame while
/// `Chunked` reproduces the classic split-submission behavior where
/// each piece becomes its own (undecodable alone) transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// One binary message per captured frame.
    Whole,
    /// Fixed-size pieces sent as independent binary messages.
    Chunked,
}

// ── ReconnectPolicy ──────────────────────────────────────────────

/// Decides how long to wait before the next connection attempt.
pub trait ReconnectPolicy: Send {
    fn next_delay(&mut self) -> Duration;
}

/// The stock policy: a fixed delay, no backoff, no retry cap.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl ReconnectPolicy for FixedDelay {
    fn next_delay(&mut self) -> Duration {
        self.delay
    }
}

// ── HostService ──────────────────────────────────────────────────

/// Why a relay session ended.
enum SessionEnd {
    /// The service was asked to stop.
    Stopped,
    /// The relay went away; reconnect applies.
    Disconnected,
}

/// The top-level host service.
pub struct HostService<S, I> {
    config: HostConfig,
    mode: SubmitMode,
    source: S,
    input: I,
    reconnect: Box<dyn ReconnectPolicy>,
    running: Arc<AtomicBool>,
}

impl<S: ScreenSource, I: InputSink> HostService<S, I> {
    /// Create a new host service over the given capture source and
    /// input backend.
    pub fn new(config: HostConfig, source: S, input: I) -> Self {
        let mode = config.submit_mode();
        let reconnect = Box::new(FixedDelay::new(config.reconnect_delay()));
        Self {
            config,
            mode,
            source,
            input,
            reconnect,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Substitute a different reconnect policy.
    pub fn with_reconnect_policy(mut self, policy: Box<dyn ReconnectPolicy>) -> Self {
        self.reconnect = policy;
        self
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run until stopped, reconnecting after every lost session.
    pub async fn run(&mut self) -> Result<(), BeamError> {
        self.running.store(true, Ordering::SeqCst);

        while self.running.load(Ordering::SeqCst) {
            match self.run_session().await {
                Ok(SessionEnd::Stopped) => break,
                Ok(SessionEnd::Disconnected) => {}
                Err(e) => warn!("session error: {e}"),
            }
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let delay = self.reconnect.next_delay();
            info!("reconnecting in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;
        }

        self.running.store(false, Ordering::SeqCst);
        info!("host service stopped");
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────

    /// One connected session, from handshake to disconnect.
    async fn run_session(&mut self) -> Result<SessionEnd, BeamError> {
        let addr = self.config.relay.address.clone();
        let timeout = self.config.connect_timeout();

        info!("connecting to relay at {addr}");
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| BeamError::Timeout(timeout))??;
        stream.set_nodelay(true)?;

        let mut framed = Framed::new(stream, FrameCodec::new());
        framed
            .send(Frame::text(Role::Host.handshake_line()))
            .await?;
        info!("connected to relay as host");

        let running = Arc::clone(&self.running);
        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.capture.interval_ms));
        // Submission stays off until the relay reports a viewer.
        let mut viewer_connected = false;

        loop {
            tokio::select! {
                maybe = framed.next() => match maybe {
                    None => {
                        info!("relay closed the connection");
                        return Ok(SessionEnd::Disconnected);
                    }
                    Some(Err(e)) => {
                        warn!("read error: {e}");
                        return Ok(SessionEnd::Disconnected);
                    }
                    Some(Ok(Frame::Text(line))) => self.handle_text(&line, &mut viewer_connected),
                    Some(Ok(Frame::Close { code, reason })) => {
                        info!("relay closed session ({code}): {reason}");
                        return Ok(SessionEnd::Disconnected);
                    }
                    Some(Ok(Frame::Binary(_))) => trace!("ignoring binary frame from relay"),
                },
                _ = ticker.tick(), if viewer_connected => {
                    let payload = self.source.next_frame().await?;
                    self.submit(&mut framed, payload).await?;
                }
                _ = Self::wait_for_stop(&running) => return Ok(SessionEnd::Stopped),
            }
        }
    }

    /// Hand one captured frame to the relay.
    async fn submit(
        &mut self,
        framed: &mut Framed<TcpStream, FrameCodec>,
        payload: Bytes,
    ) -> Result<(), BeamError> {
        let len = payload.len();
        match self.mode {
            SubmitMode::Whole => framed.send(Frame::Binary(payload)).await?,
            SubmitMode::Chunked => {
                for range in chunk_ranges(len, self.config.submit.chunk_size) {
                    framed.send(Frame::Binary(payload.slice(range))).await?;
                }
            }
        }
        debug!("submitted frame: {len} bytes");
        Ok(())
    }

    /// Process one text line from the relay.
    fn handle_text(&mut self, line: &str, viewer_connected: &mut bool) {
        if line == VIEWER_CONNECTED {
            if !*viewer_connected {
                info!("viewer connected — starting frame submission");
            }
            *viewer_connected = true;
            return;
        }

        if ControlCommand::matches(line) {
            let (width, height) = self.source.dimensions();
            match ControlCommand::parse(line) {
                Ok(cmd) => {
                    let event = cmd.resolve(width, height);
                    if let Err(e) = self.input.apply(event) {
                        warn!("input backend error: {e}");
                    }
                }
                // Bad commands are dropped; the channel stays open.
                Err(e) => warn!("dropping control command: {e}"),
            }
            return;
        }

        debug!("ignoring text from relay: {line}");
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
