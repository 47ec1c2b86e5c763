//! Relay service core logic.
//!
//! One accept loop; per connection, a reader loop on the current task
//! plus a writer task fed by an mpsc channel. The first frame a client
//! sends is its role handshake (`role:host` / `role:viewer`); after
//! that, host binary frames become fan-out transfers and viewer text
//! frames become pass-through input commands.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use beam_core::{
    BeamError, Frame, FrameCodec, PeerHandle, RelayDispatcher, Role, CLOSE_NORMAL,
    ROLE_CONFLICT_REASON,
};

use crate::config::RelayConfig;

/// Outbound queue depth per connection.
const WRITE_QUEUE: usize = 64;

// ── RelayService ─────────────────────────────────────────────────

/// The top-level relay service.
///
/// Owns the dispatcher (and through it the session registry) and the
/// TCP listener accepting host and viewer connections.
pub struct RelayService {
    config: RelayConfig,
    dispatcher: RelayDispatcher,
    running: Arc<AtomicBool>,
}

impl RelayService {
    /// Create a new relay service with the given config.
    pub fn new(config: RelayConfig) -> Self {
        let dispatcher = RelayDispatcher::new(config.transfer.chunk_size);
        Self {
            config,
            dispatcher,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// The dispatcher backing this service.
    pub fn dispatcher(&self) -> &RelayDispatcher {
        &self.dispatcher
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind the configured address and serve until stopped.
    pub async fn run(&self) -> Result<(), BeamError> {
        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        info!("relay listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Serve connections on an already-bound listener until stopped.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), BeamError> {
        self.running.store(true, Ordering::SeqCst);

        while self.running.load(Ordering::SeqCst) {
            let accept = tokio::select! {
                result = listener.accept() => result,
                _ = Self::wait_for_stop(&self.running) => break,
            };

            let (stream, peer) = match accept {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };

            debug!("connection from {peer}");
            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                handle_connection(dispatcher, stream, peer).await;
            });
        }

        self.running.store(false, Ordering::SeqCst);
        info!("relay service stopped");
        Ok(())
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Per-connection handling ──────────────────────────────────────

/// Service one connection from handshake to close.
async fn handle_connection(dispatcher: RelayDispatcher, stream: TcpStream, peer: SocketAddr) {
    let framed = Framed::new(stream, FrameCodec::new());
    let (mut sink, mut frames) = framed.split();

    // Writer task: everything queued on `tx` goes out in order.
    let (tx, mut rx) = mpsc::channel::<Frame>(WRITE_QUEUE);
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sink.send(frame).await {
                debug!("write error: {e}");
                break;
            }
        }
    });

    // Handshake: the first frame names the requested role.
    let role = match frames.next().await {
        Some(Ok(Frame::Text(line))) => Role::from_handshake(&line),
        Some(Ok(_)) | Some(Err(_)) => None,
        None => {
            drop(tx);
            let _ = writer.await;
            return;
        }
    };

    let mut admitted = false;
    match role {
        Some(role) => {
            let handle = PeerHandle::new(peer, tx.clone());
            match dispatcher.admit(handle, role).await {
                Ok(()) => admitted = true,
                Err(BeamError::RoleConflict) => {
                    let _ = tx.send(Frame::close(CLOSE_NORMAL, ROLE_CONFLICT_REASON)).await;
                    drop(tx);
                    let _ = writer.await;
                    return;
                }
                Err(e) => {
                    warn!("admission failed for {peer}: {e}");
                    drop(tx);
                    let _ = writer.await;
                    return;
                }
            }
        }
        // Never registered, but the connection stays serviced.
        None => warn!("unrecognized handshake from {peer}"),
    }

    while let Some(result) = frames.next().await {
        let frame = match result {
            Ok(frame) => frame,
            Err(e) => {
                warn!("read error from {peer}: {e}");
                break;
            }
        };

        match (role, frame) {
            // Each host binary submission is one complete transfer.
            (Some(Role::Host), Frame::Binary(payload)) => {
                dispatcher.dispatch_transfer(payload).await;
            }
            // Hosts are not expected to send text in steady state.
            (Some(Role::Host), Frame::Text(line)) => {
                trace!("ignoring host text: {line}");
            }
            // Viewer text goes to the host verbatim.
            (Some(Role::Viewer), Frame::Text(line)) => {
                dispatcher.forward_control(&line).await;
            }
            (Some(Role::Viewer), Frame::Binary(_)) => {
                debug!("ignoring binary frame from viewer {peer}");
            }
            (_, Frame::Close { code, reason }) => {
                debug!("{peer} closed ({code}): {reason}");
                break;
            }
            (None, _) => trace!("ignoring frame from unregistered {peer}"),
        }
    }

    if admitted {
        dispatcher.remove(peer).await;
    }
    drop(tx);
    let _ = writer.await;
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_creates_with_defaults() {
        let svc = RelayService::new(RelayConfig::default());
        assert!(!svc.is_running());
        assert_eq!(svc.dispatcher().chunk_size(), 64 * 1024);
    }

    #[test]
    fn stop_handle_works() {
        let svc = RelayService::new(RelayConfig::default());
        let handle = svc.stop_handle();
        handle.store(true, Ordering::SeqCst);
        assert!(svc.is_running());
        svc.stop();
        assert!(!svc.is_running());
    }
}
