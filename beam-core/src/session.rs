//! Connection roles and the relay's session registry.
//!
//! The registry tracks at most one host and any number of viewers,
//! keyed by peer address. It is a plain state object — the relay
//! service owns it behind a mutex and is the only writer; readers
//! take cloned snapshots of the viewer handles and tolerate peers
//! closing between snapshot and send.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::error::BeamError;
use crate::frame::Frame;

// ── Wire constants ───────────────────────────────────────────────

/// Handshake line prefix: `role:host` / `role:viewer`.
pub const ROLE_PREFIX: &str = "role:";

/// Notification sent to the host when a viewer joins.
pub const VIEWER_CONNECTED: &str = "viewer_connected";

/// Close status code used for protocol-level rejections.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close reason for a second host attempting to register.
pub const ROLE_CONFLICT_REASON: &str = "Only one host can connect at a time.";

// ── Role ─────────────────────────────────────────────────────────

/// The role a connection requested at handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The single screen producer.
    Host,
    /// A screen consumer.
    Viewer,
}

impl Role {
    /// Wire token for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Viewer => "viewer",
        }
    }

    /// Render the full handshake line.
    pub fn handshake_line(&self) -> String {
        format!("{ROLE_PREFIX}{}", self.as_str())
    }

    /// Parse a handshake line. Returns `None` for anything that is
    /// not exactly `role:host` or `role:viewer` — such connections
    /// are never registered.
    pub fn from_handshake(line: &str) -> Option<Role> {
        match line.strip_prefix(ROLE_PREFIX)? {
            "host" => Some(Role::Host),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── PeerHandle ───────────────────────────────────────────────────

/// A cloneable sending handle to one connection's writer task.
///
/// Dropping the connection drops the receiving end; `is_open` turns
/// false and sends start failing, which fan-out treats as "skip".
#[derive(Debug, Clone)]
pub struct PeerHandle {
    addr: SocketAddr,
    sender: mpsc::Sender<Frame>,
}

impl PeerHandle {
    pub fn new(addr: SocketAddr, sender: mpsc::Sender<Frame>) -> Self {
        Self { addr, sender }
    }

    /// Peer address — the connection's identity.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether the connection's writer is still alive.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a frame for this peer.
    pub async fn send(&self, frame: Frame) -> Result<(), BeamError> {
        self.sender.send(frame).await.map_err(BeamError::from)
    }
}

// ── SessionRegistry ──────────────────────────────────────────────

/// Tracks the single host slot and the set of connected viewers.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    host: Option<PeerHandle>,
    viewers: HashMap<SocketAddr, PeerHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under the requested role.
    ///
    /// A viewer is always accepted. A host is accepted only while the
    /// host slot is empty; otherwise [`BeamError::RoleConflict`] is
    /// returned, the registry is left untouched, and the caller must
    /// close the connection.
    pub fn admit(&mut self, handle: PeerHandle, role: Role) -> Result<(), BeamError> {
        match role {
            Role::Host => {
                if self.host.is_some() {
                    return Err(BeamError::RoleConflict);
                }
                self.host = Some(handle);
            }
            Role::Viewer => {
                self.viewers.insert(handle.addr(), handle);
            }
        }
        Ok(())
    }

    /// Remove a connection, whichever role it held.
    ///
    /// Returns the role it was registered under, or `None` if it was
    /// never admitted (in which case this is a no-op).
    pub fn remove(&mut self, addr: SocketAddr) -> Option<Role> {
        if self.host.as_ref().is_some_and(|h| h.addr() == addr) {
            self.host = None;
            return Some(Role::Host);
        }
        self.viewers.remove(&addr).map(|_| Role::Viewer)
    }

    /// The active host, if one is registered.
    pub fn host(&self) -> Option<&PeerHandle> {
        self.host.as_ref()
    }

    /// Iterate over currently registered viewers.
    pub fn viewers(&self) -> impl Iterator<Item = &PeerHandle> {
        self.viewers.values()
    }

    /// Point-in-time snapshot of viewer handles for use outside the
    /// registry lock. Peers may close between snapshot and send.
    pub fn viewer_snapshot(&self) -> Vec<PeerHandle> {
        self.viewers.values().cloned().collect()
    }

    /// Number of registered viewers.
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(port: u16) -> PeerHandle {
        let (tx, _rx) = mpsc::channel(1);
        PeerHandle::new(([127, 0, 0, 1], port).into(), tx)
    }

    #[test]
    fn role_handshake_roundtrip() {
        assert_eq!(Role::from_handshake("role:host"), Some(Role::Host));
        assert_eq!(Role::from_handshake("role:viewer"), Some(Role::Viewer));
        assert_eq!(Role::from_handshake(&Role::Host.handshake_line()), Some(Role::Host));
    }

    #[test]
    fn unrecognized_handshake_yields_no_role() {
        assert_eq!(Role::from_handshake("role:admin"), None);
        assert_eq!(Role::from_handshake("host"), None);
        assert_eq!(Role::from_handshake(""), None);
    }

    #[test]
    fn admits_viewers_and_one_host() {
        let mut reg = SessionRegistry::new();
        reg.admit(handle(1), Role::Viewer).unwrap();
        reg.admit(handle(2), Role::Viewer).unwrap();
        reg.admit(handle(3), Role::Host).unwrap();

        assert_eq!(reg.viewer_count(), 2);
        assert_eq!(reg.host().unwrap().addr().port(), 3);
    }

    #[test]
    fn second_host_rejected_without_mutation() {
        let mut reg = SessionRegistry::new();
        reg.admit(handle(1), Role::Host).unwrap();

        let err = reg.admit(handle(2), Role::Host).unwrap_err();
        assert!(matches!(err, BeamError::RoleConflict));

        // The registry still points at the first host and the loser
        // is observable nowhere.
        assert_eq!(reg.host().unwrap().addr().port(), 1);
        assert_eq!(reg.viewer_count(), 0);
        assert!(reg.viewers().all(|v| v.addr().port() != 2));
    }

    #[test]
    fn host_slot_frees_on_removal() {
        let mut reg = SessionRegistry::new();
        let addr = handle(1).addr();
        reg.admit(handle(1), Role::Host).unwrap();

        assert_eq!(reg.remove(addr), Some(Role::Host));
        assert!(reg.host().is_none());

        // A new host can now be admitted.
        reg.admit(handle(2), Role::Host).unwrap();
        assert_eq!(reg.host().unwrap().addr().port(), 2);
    }

    #[test]
    fn viewer_removal() {
        let mut reg = SessionRegistry::new();
        let v = handle(1);
        let addr = v.addr();
        reg.admit(v, Role::Viewer).unwrap();

        assert_eq!(reg.remove(addr), Some(Role::Viewer));
        assert_eq!(reg.viewer_count(), 0);
    }

    #[test]
    fn removing_unknown_peer_is_noop() {
        let mut reg = SessionRegistry::new();
        reg.admit(handle(1), Role::Viewer).unwrap();
        assert_eq!(reg.remove(([10, 0, 0, 1], 99).into()), None);
        assert_eq!(reg.viewer_count(), 1);
    }

    #[test]
    fn at_most_one_host_after_any_sequence() {
        let mut reg = SessionRegistry::new();
        let mut hosts_alive = 0usize;
        for port in 1u16..=20 {
            if port % 3 == 0 {
                if reg.admit(handle(port), Role::Host).is_ok() {
                    hosts_alive += 1;
                }
            } else {
                reg.admit(handle(port), Role::Viewer).unwrap();
            }
            assert!(hosts_alive <= 1);
            assert_eq!(reg.host().is_some(), hosts_alive == 1);
        }
    }

    #[test]
    fn snapshot_is_point_in_time() {
        let mut reg = SessionRegistry::new();
        let v = handle(1);
        let addr = v.addr();
        reg.admit(v, Role::Viewer).unwrap();

        let snapshot = reg.viewer_snapshot();
        reg.remove(addr);

        // The snapshot still holds the handle; the registry does not.
        assert_eq!(snapshot.len(), 1);
        assert_eq!(reg.viewer_count(), 0);
    }
}
