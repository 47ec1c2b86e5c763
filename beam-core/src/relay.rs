//! Relay dispatcher — one host in, all viewers out.
//!
//! Every binary submission from the host becomes one transfer: the
//! header goes to every viewer, then each chunk goes to every viewer
//! before the next chunk is touched, then the terminator. That
//! per-chunk barrier bounds how far apart two viewers can be to one
//! chunk. Viewer text goes to the host verbatim.
//!
//! The dispatcher owns the session registry; the relay service and
//! tests reach the registry only through the methods here.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::BeamError;
use crate::frame::Frame;
use crate::session::{PeerHandle, Role, SessionRegistry, VIEWER_CONNECTED};
use crate::transfer::{chunk_ranges, TransferHeader, TRANSFER_END};

// ── RelayDispatcher ──────────────────────────────────────────────

/// Fans host submissions out to viewers and passes viewer text back
/// to the host.
#[derive(Debug, Clone)]
pub struct RelayDispatcher {
    registry: Arc<Mutex<SessionRegistry>>,
    chunk_size: usize,
}

impl RelayDispatcher {
    /// Create a dispatcher with the given fan-out chunk size.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be at least 1");
        Self {
            registry: Arc::new(Mutex::new(SessionRegistry::new())),
            chunk_size,
        }
    }

    /// Fan-out chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    // ── Admission / removal ──────────────────────────────────────

    /// Register a connection under its requested role.
    ///
    /// On viewer admission the host (if any) is notified with
    /// [`VIEWER_CONNECTED`]; delivery failure is logged, not fatal.
    /// On a host conflict the registry is untouched and the caller
    /// must close the connection.
    pub async fn admit(&self, handle: PeerHandle, role: Role) -> Result<(), BeamError> {
        let addr = handle.addr();
        let host = {
            let mut registry = self.registry.lock().await;
            registry.admit(handle, role)?;
            match role {
                Role::Viewer => registry.host().cloned(),
                Role::Host => None,
            }
        };
        info!("{role} connected: {addr}");

        if let Some(host) = host {
            if let Err(e) = host.send(Frame::text(VIEWER_CONNECTED)).await {
                warn!("failed to notify host of new viewer: {e}");
            }
        }
        Ok(())
    }

    /// Remove a connection, whichever role it held. No-op for peers
    /// that were never admitted.
    pub async fn remove(&self, addr: SocketAddr) -> Option<Role> {
        let role = self.registry.lock().await.remove(addr);
        match role {
            Some(role) => info!("{role} disconnected: {addr}"),
            None => debug!("unregistered peer disconnected: {addr}"),
        }
        role
    }

    /// Whether a host is currently registered.
    pub async fn has_host(&self) -> bool {
        self.registry.lock().await.host().is_some()
    }

    /// Number of currently registered viewers.
    pub async fn viewer_count(&self) -> usize {
        self.registry.lock().await.viewer_count()
    }

    // ── Dispatch ─────────────────────────────────────────────────

    /// Relay one host submission to every viewer as a complete
    /// transfer: header, chunks in order, terminator.
    pub async fn dispatch_transfer(&self, payload: Bytes) {
        let header = TransferHeader::for_payload(&payload);
        self.broadcast(Frame::text(header.encode())).await;

        let mut chunk_count = 0usize;
        for range in chunk_ranges(payload.len(), self.chunk_size) {
            // All viewers get chunk k before any viewer sees k+1.
            self.broadcast(Frame::Binary(payload.slice(range))).await;
            chunk_count += 1;
        }

        self.broadcast(Frame::text(TRANSFER_END)).await;

        info!(
            "forwarded {} bytes in {chunk_count} chunks to {} viewers",
            payload.len(),
            self.viewer_count().await,
        );
    }

    /// Pass a viewer text line to the host verbatim.
    ///
    /// With no host registered the line is dropped — there is no
    /// store-and-forward.
    pub async fn forward_control(&self, line: &str) {
        let host = self.registry.lock().await.host().cloned();
        match host {
            Some(host) => {
                if let Err(e) = host.send(Frame::text(line)).await {
                    warn!("failed to forward to host: {e}");
                }
            }
            None => debug!("no host registered, dropping: {line}"),
        }
    }

    /// Send one frame to every open viewer, skipping peers that have
    /// closed since the snapshot was taken.
    ///
    /// TODO: put a deadline on the per-viewer send so one stalled
    /// viewer's full queue cannot hold up delivery to the others.
    async fn broadcast(&self, frame: Frame) {
        let viewers = self.registry.lock().await.viewer_snapshot();
        for viewer in viewers {
            if !viewer.is_open() {
                continue;
            }
            if let Err(e) = viewer.send(frame.clone()).await {
                debug!("skipping viewer {}: {e}", viewer.addr());
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn peer(port: u16) -> (PeerHandle, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(32);
        (PeerHandle::new(([127, 0, 0, 1], port).into(), tx), rx)
    }

    async fn drain(rx: &mut mpsc::Receiver<Frame>, n: usize) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(n);
        for _ in 0..n {
            frames.push(rx.recv().await.expect("frame"));
        }
        frames
    }

    #[tokio::test]
    async fn fan_out_reaches_every_viewer() {
        let dispatcher = RelayDispatcher::new(64 * 1024);
        let mut rxs = Vec::new();
        for port in 1..=3 {
            let (handle, rx) = peer(port);
            dispatcher.admit(handle, Role::Viewer).await.unwrap();
            rxs.push(rx);
        }

        let payload = Bytes::from(vec![0xEE; 150_000]);
        let expected_header = TransferHeader::for_payload(&payload).encode();
        dispatcher.dispatch_transfer(payload.clone()).await;

        for rx in &mut rxs {
            let frames = drain(rx, 5).await;
            assert_eq!(frames[0], Frame::Text(expected_header.clone()));
            assert_eq!(frames[1], Frame::Binary(payload.slice(0..65_536)));
            assert_eq!(frames[2], Frame::Binary(payload.slice(65_536..131_072)));
            assert_eq!(frames[3], Frame::Binary(payload.slice(131_072..150_000)));
            assert_eq!(frames[4], Frame::Text(TRANSFER_END.into()));
        }
    }

    #[tokio::test]
    async fn closed_viewer_is_skipped_not_fatal() {
        let dispatcher = RelayDispatcher::new(1024);
        let (alive, mut alive_rx) = peer(1);
        let (dead, dead_rx) = peer(2);
        dispatcher.admit(alive, Role::Viewer).await.unwrap();
        dispatcher.admit(dead, Role::Viewer).await.unwrap();
        drop(dead_rx);

        dispatcher
            .dispatch_transfer(Bytes::from(vec![1u8; 2048]))
            .await;

        // header + 2 chunks + end, all delivered to the live viewer.
        let frames = drain(&mut alive_rx, 4).await;
        assert!(matches!(&frames[0], Frame::Text(t) if t.starts_with("size:2048:")));
        assert_eq!(frames[3], Frame::Text(TRANSFER_END.into()));
    }

    #[tokio::test]
    async fn empty_payload_is_header_and_terminator_only() {
        let dispatcher = RelayDispatcher::new(1024);
        let (viewer, mut rx) = peer(1);
        dispatcher.admit(viewer, Role::Viewer).await.unwrap();

        dispatcher.dispatch_transfer(Bytes::new()).await;

        let frames = drain(&mut rx, 2).await;
        assert!(matches!(&frames[0], Frame::Text(t) if t.starts_with("size:0:")));
        assert_eq!(frames[1], Frame::Text(TRANSFER_END.into()));
    }

    #[tokio::test]
    async fn viewer_admission_notifies_host() {
        let dispatcher = RelayDispatcher::new(1024);
        let (host, mut host_rx) = peer(1);
        dispatcher.admit(host, Role::Host).await.unwrap();

        let (viewer, _viewer_rx) = peer(2);
        dispatcher.admit(viewer, Role::Viewer).await.unwrap();

        assert_eq!(
            host_rx.recv().await.unwrap(),
            Frame::Text(VIEWER_CONNECTED.into())
        );
    }

    #[tokio::test]
    async fn viewer_admission_without_host_is_fine() {
        let dispatcher = RelayDispatcher::new(1024);
        let (viewer, _rx) = peer(1);
        dispatcher.admit(viewer, Role::Viewer).await.unwrap();
        assert_eq!(dispatcher.viewer_count().await, 1);
    }

    #[tokio::test]
    async fn second_host_conflict_leaves_registry_intact() {
        let dispatcher = RelayDispatcher::new(1024);
        let (first, mut first_rx) = peer(1);
        dispatcher.admit(first, Role::Host).await.unwrap();

        let (second, _second_rx) = peer(2);
        let err = dispatcher.admit(second, Role::Host).await.unwrap_err();
        assert!(matches!(err, BeamError::RoleConflict));

        // The surviving host still receives pass-through traffic.
        dispatcher.forward_control("control:mouseScroll:-3").await;
        assert_eq!(
            first_rx.recv().await.unwrap(),
            Frame::Text("control:mouseScroll:-3".into())
        );
    }

    #[tokio::test]
    async fn control_preserves_per_viewer_order() {
        let dispatcher = RelayDispatcher::new(1024);
        let (host, mut host_rx) = peer(1);
        dispatcher.admit(host, Role::Host).await.unwrap();

        for delta in [-1, -2, -3] {
            dispatcher
                .forward_control(&format!("control:mouseScroll:{delta}"))
                .await;
        }
        for delta in [-1, -2, -3] {
            assert_eq!(
                host_rx.recv().await.unwrap(),
                Frame::Text(format!("control:mouseScroll:{delta}"))
            );
        }
    }

    #[tokio::test]
    async fn control_without_host_is_dropped() {
        let dispatcher = RelayDispatcher::new(1024);
        // Nothing to assert beyond "does not hang or panic".
        dispatcher.forward_control("control:keyPress:65").await;
        assert!(!dispatcher.has_host().await);
    }

    #[tokio::test]
    async fn removed_host_stops_receiving() {
        let dispatcher = RelayDispatcher::new(1024);
        let (host, _host_rx) = peer(1);
        let addr = host.addr();
        dispatcher.admit(host, Role::Host).await.unwrap();

        assert_eq!(dispatcher.remove(addr).await, Some(Role::Host));
        assert!(!dispatcher.has_host().await);

        // A replacement host can now connect.
        let (next, _next_rx) = peer(2);
        dispatcher.admit(next, Role::Host).await.unwrap();
        assert!(dispatcher.has_host().await);
    }
}
