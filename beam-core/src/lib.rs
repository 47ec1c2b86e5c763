//! # beam-core
//!
//! Protocol library for the beam screen-share relay.
//!
//! This crate contains:
//! - **Frames**: `Frame` and `FrameCodec` — tagged text/binary/close
//!   framing over TCP via `tokio_util`
//! - **Transfers**: `TransferHeader`, `chunk_ranges`,
//!   `TransferAssembler` — checksummed chunked payload delivery
//! - **Control**: `ControlCommand` / `InputEvent` — the textual input
//!   channel and viewport→screen coordinate scaling
//! - **Sessions**: `Role`, `PeerHandle`, `SessionRegistry` —
//!   single-host/many-viewer admission
//! - **Relay**: `RelayDispatcher` — fan-out with a per-chunk barrier
//!   and viewer→host pass-through
//! - **Error**: `BeamError` — typed, `thiserror`-based error hierarchy

pub mod control;
pub mod error;
pub mod frame;
pub mod relay;
pub mod session;
pub mod transfer;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use control::{ControlCommand, InputEvent, CONTROL_PREFIX};
pub use error::BeamError;
pub use frame::{Frame, FrameCodec, MAX_FRAME_SIZE};
pub use relay::RelayDispatcher;
pub use session::{
    PeerHandle, Role, SessionRegistry, CLOSE_NORMAL, ROLE_CONFLICT_REASON, ROLE_PREFIX,
    VIEWER_CONNECTED,
};
pub use transfer::{
    checksum_hex, chunk_ranges, verify, TransferAssembler, TransferHeader, DEFAULT_CHUNK_SIZE,
    TRANSFER_END,
};
