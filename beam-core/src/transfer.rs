//! Chunked-transfer codec: framing one opaque payload for fan-out,
//! and reassembling + verifying it on the receiving side.
//!
//! One transfer on the wire is:
//!
//! ```text
//! "size:<byteLength>:<checksumHex>"   text   (header)
//! <chunk bytes>                       binary (0..n frames, each ≤ max)
//! "end"                               text   (terminator)
//! ```
//!
//! The checksum is a 128-bit content digest (truncated BLAKE3, hex).
//! It guards against partial or corrupted delivery across chunk
//! boundaries — the binary frames themselves carry no integrity check
//! at this layer. The receiver checks length before digest because
//! length is the cheaper of the two tests.

use std::ops::Range;

use crate::error::BeamError;

// ── Constants ────────────────────────────────────────────────────

/// Default fan-out chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Text frame that terminates a transfer.
pub const TRANSFER_END: &str = "end";

/// Hex length of the content digest (128 bits).
pub const CHECKSUM_HEX_LEN: usize = 32;

// ── Checksum ─────────────────────────────────────────────────────

/// 128-bit content digest of `payload`, lowercase hex.
pub fn checksum_hex(payload: &[u8]) -> String {
    let hex = blake3::hash(payload).to_hex();
    hex[..CHECKSUM_HEX_LEN].to_string()
}

/// Verify `payload` against an expected digest.
pub fn verify(payload: &[u8], expected: &str) -> Result<(), BeamError> {
    let actual = checksum_hex(payload);
    if actual != expected {
        return Err(BeamError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

// ── TransferHeader ───────────────────────────────────────────────

/// The `size:<len>:<checksumHex>` line that begins every transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferHeader {
    /// Total payload length in bytes.
    pub len: usize,
    /// Expected content digest, lowercase hex.
    pub checksum: String,
}

impl TransferHeader {
    /// Line prefix identifying a header frame.
    pub const PREFIX: &'static str = "size:";

    /// Compute the header for a payload about to be sent.
    pub fn for_payload(payload: &[u8]) -> Self {
        Self {
            len: payload.len(),
            checksum: checksum_hex(payload),
        }
    }

    /// Render as the wire line.
    pub fn encode(&self) -> String {
        format!("{}{}:{}", Self::PREFIX, self.len, self.checksum)
    }

    /// Parse a wire line.
    pub fn parse(line: &str) -> Result<Self, BeamError> {
        let rest = line
            .strip_prefix(Self::PREFIX)
            .ok_or(BeamError::InvalidHeader("missing size: prefix"))?;
        let (len, checksum) = rest
            .split_once(':')
            .ok_or(BeamError::InvalidHeader("missing checksum field"))?;
        let len: usize = len
            .parse()
            .map_err(|_| BeamError::InvalidHeader("non-numeric length"))?;
        if checksum.is_empty() {
            return Err(BeamError::InvalidHeader("empty checksum"));
        }
        Ok(Self {
            len,
            checksum: checksum.to_string(),
        })
    }

    /// Whether a text line looks like a transfer header.
    pub fn matches(line: &str) -> bool {
        line.starts_with(Self::PREFIX)
    }
}

// ── Chunking ─────────────────────────────────────────────────────

/// Byte ranges covering `0..total_len` in order, each `≤ max_chunk_size`,
/// no gaps or overlaps. The final range may be shorter. The iterator is
/// `Clone`, so a fan-out can restart it per consumer if it needs to.
///
/// # Panics
///
/// Panics if `max_chunk_size` is zero.
pub fn chunk_ranges(
    total_len: usize,
    max_chunk_size: usize,
) -> impl Iterator<Item = Range<usize>> + Clone {
    assert!(max_chunk_size > 0, "chunk size must be at least 1");
    (0..total_len)
        .step_by(max_chunk_size)
        .map(move |start| start..(start + max_chunk_size).min(total_len))
}

// ── TransferAssembler ────────────────────────────────────────────

/// Receiver-side state for one connection.
///
/// ```text
/// Idle ──header──► Receiving ──terminator──► Idle
///                      │ header (restart assembly)
///                      ▼
///                  Receiving
/// ```
///
/// A header arriving mid-assembly silently abandons the in-flight
/// transfer; chunks arriving while idle are dropped.
#[derive(Debug, Default)]
pub struct TransferAssembler {
    state: AssemblyState,
}

#[derive(Debug, Default)]
enum AssemblyState {
    #[default]
    Idle,
    Receiving {
        header: TransferHeader,
        buf: Vec<u8>,
    },
}

impl TransferAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transfer is currently being assembled.
    pub fn is_receiving(&self) -> bool {
        matches!(self.state, AssemblyState::Receiving { .. })
    }

    /// Begin (or restart) assembly for the announced transfer.
    pub fn on_header(&mut self, header: TransferHeader) {
        let buf = Vec::with_capacity(header.len);
        self.state = AssemblyState::Receiving { header, buf };
    }

    /// Append one chunk. Returns `false` if no transfer is in flight
    /// and the chunk was dropped.
    pub fn on_chunk(&mut self, chunk: &[u8]) -> bool {
        match &mut self.state {
            AssemblyState::Receiving { buf, .. } => {
                buf.extend_from_slice(chunk);
                true
            }
            AssemblyState::Idle => false,
        }
    }

    /// Complete the in-flight transfer.
    ///
    /// Returns the verified payload, `None` if no transfer was in
    /// flight, or an error (the buffered data is discarded and the
    /// assembler returns to idle either way).
    pub fn on_terminator(&mut self) -> Result<Option<Vec<u8>>, BeamError> {
        match std::mem::take(&mut self.state) {
            AssemblyState::Idle => Ok(None),
            AssemblyState::Receiving { header, buf } => {
                if buf.len() != header.len {
                    return Err(BeamError::SizeMismatch {
                        expected: header.len,
                        actual: buf.len(),
                    });
                }
                verify(&buf, &header.checksum)?;
                Ok(Some(buf))
            }
        }
    }

    /// Drop any in-flight state (connection closed).
    pub fn reset(&mut self) {
        self.state = AssemblyState::Idle;
    }
}

// ── Tests ────────────────────────────────────────────────────────
