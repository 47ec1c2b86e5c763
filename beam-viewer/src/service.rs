//! Viewer service core logic.
//!
//! One connected session: receive transfer frames, assemble and
//! verify them, hand verified payloads to the frame sink. Control
//! commands queued on the service's sender go out on the same
//! connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use beam_core::{
    BeamError, ControlCommand, Frame, FrameCodec, Role, TransferAssembler, TransferHeader,
    TRANSFER_END, VIEWER_CONNECTED,
};

use crate::config::ViewerConfig;
use crate::sink::FrameSink;

/// Outbound control-command queue depth.
const CONTROL_QUEUE: usize = 64;

// ── ViewerService ────────────────────────────────────────────────

/// The top-level viewer service.
pub struct ViewerService<F> {
    config: ViewerConfig,
    sink: F,
    assembler: TransferAssembler,
    control_tx: mpsc::Sender<ControlCommand>,
    control_rx: mpsc::Receiver<ControlCommand>,
    running: Arc<AtomicBool>,
}

impl<F: FrameSink> ViewerService<F> {
    /// Create a new viewer service over the given frame sink.
    pub fn new(config: ViewerConfig, sink: F) -> Self {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE);
        Self {
            config,
            sink,
            assembler: TransferAssembler::new(),
            control_tx,
            control_rx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A sender for queueing control commands to the host. The input
    /// front-end (UI, tests) holds one of these.
    pub fn control_sender(&self) -> mpsc::Sender<ControlCommand> {
        self.control_tx.clone()
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

    /// Run one session against the relay until it ends or the
    /// service is stopped.
    pub async fn run(&mut self) -> Result<(), BeamError> {
        self.running.store(true, Ordering::SeqCst);

        let addr = self.config.relay.address.clone();
        let timeout = self.config.connect_timeout();

        info!("connecting to relay at {addr}");
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| BeamError::Timeout(timeout))??;
        stream.set_nodelay(true)?;

        let mut framed = Framed::new(stream, FrameCodec::new());
        framed
            .send(Frame::text(Role::Viewer.handshake_line()))
            .await?;
        // Announce ourselves; the relay passes this on to the host.
        framed.send(Frame::text(VIEWER_CONNECTED)).await?;
        info!("connected to relay as viewer");

        let running = Arc::clone(&self.running);
        loop {
            tokio::select! {
                maybe = framed.next() => match maybe {
                    None => {
                        info!("relay closed the connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("read error: {e}");
                        break;
                    }
                    Some(Ok(Frame::Text(line))) => self.handle_text(&line),
                    Some(Ok(Frame::Binary(chunk))) => self.handle_chunk(&chunk),
                    Some(Ok(Frame::Close { code, reason })) => {
                        info!("relay closed session ({code}): {reason}");
                        break;
                    }
                },
                Some(cmd) = self.control_rx.recv() => {
                    framed.send(Frame::text(cmd.encode())).await?;
                }
                _ = Self::wait_for_stop(&running) => break,
            }
        }

        self.assembler.reset();
        self.running.store(false, Ordering::SeqCst);
        info!("viewer service stopped");
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Process one text line from the relay.
    fn handle_text(&mut self, line: &str) {
        if TransferHeader::matches(line) {
            match TransferHeader::parse(line) {
                Ok(header) => {
                    debug!("receiving transfer: {} bytes", header.len);
                    self.assembler.on_header(header);
                }
                Err(e) => warn!("bad transfer header: {e}"),
            }
            return;
        }

        if line == TRANSFER_END {
            match self.assembler.on_terminator() {
                Ok(Some(payload)) => {
                    if let Err(e) = self.sink.present(&payload) {
                        warn!("frame sink error: {e}");
                    }
                }
                Ok(None) => debug!("terminator without transfer in flight"),
                // The frame is lost until the host sends the next
                // one; nothing is requested from the relay.
                Err(e) => warn!("discarding transfer: {e}"),
            }
            return;
        }

        debug!("ignoring text from relay: {line}");
    }

    /// Process one binary chunk from the relay.
    fn handle_chunk(&mut self, chunk: &[u8]) {
        if !self.assembler.on_chunk(chunk) {
            debug!("dropping {} chunk bytes outside a transfer", chunk.len());
        }
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
