//! Duplex wire frames and their codec.
//!
//! Every message between a peer and the relay is one tagged frame:
//! text frames carry the line-oriented control plane (role handshake,
//! transfer headers, input commands), binary frames carry raw chunk
//! bytes, and close frames carry a status code plus a human-readable
//! reason.
//!
//! ## Wire format
//!
//! All integers little-endian:
//! ```text
//! tag:  u8   (0 = text, 1 = binary, 2 = close)
//! len:  u32  (payload length in bytes)
//! data: [u8] (close payload: code u16 + utf-8 reason)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::BeamError;

// ── Constants ────────────────────────────────────────────────────

/// Hard upper bound on a single frame's payload.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Prefix length: tag (1) + payload length (4).
const FRAME_PREFIX: usize = 5;

const TAG_TEXT: u8 = 0;
const TAG_BINARY: u8 = 1;
const TAG_CLOSE: u8 = 2;

// ── Frame ────────────────────────────────────────────────────────

/// One message on a peer connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A UTF-8 text line (control plane).
    Text(String),
    /// Raw payload bytes (one chunk of a transfer).
    Binary(Bytes),
    /// Connection close with status code and reason.
    Close { code: u16, reason: String },
}

impl Frame {
    /// Build a text frame.
    pub fn text(s: impl Into<String>) -> Self {
        Frame::Text(s.into())
    }

    /// Build a binary frame.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Frame::Binary(data.into())
    }

    /// Build a close frame.
    pub fn close(code: u16, reason: impl Into<String>) -> Self {
        Frame::Close {
            code,
            reason: reason.into(),
        }
    }

    /// Payload length in bytes as it will appear on the wire.
    pub fn payload_len(&self) -> usize {
        match self {
            Frame::Text(s) => s.len(),
            Frame::Binary(b) => b.len(),
            Frame::Close { reason, .. } => 2 + reason.len(),
        }
    }
}

// ── FrameCodec ───────────────────────────────────────────────────

/// `tokio_util` codec for [`Frame`]s over a byte stream.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = BeamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_PREFIX {
            return Ok(None);
        }

        let tag = src[0];
        let len = u32::from_le_bytes(src[1..5].try_into().expect("4-byte slice")) as usize;

        if len > MAX_FRAME_SIZE {
            return Err(BeamError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }

        if src.len() < FRAME_PREFIX + len {
            // Reserve so the next read can complete the frame.
            src.reserve(FRAME_PREFIX + len - src.len());
            return Ok(None);
        }

        src.advance(FRAME_PREFIX);
        let payload = src.split_to(len).freeze();

        let frame = match tag {
            TAG_TEXT => Frame::Text(String::from_utf8(payload.to_vec())?),
            TAG_BINARY => Frame::Binary(payload),
            TAG_CLOSE => {
                if payload.len() < 2 {
                    return Err(BeamError::InvalidFrame("close frame shorter than 2 bytes"));
                }
                let code = u16::from_le_bytes(payload[0..2].try_into().expect("2-byte slice"));
                let reason = String::from_utf8(payload[2..].to_vec())?;
                Frame::Close { code, reason }
            }
            _ => return Err(BeamError::InvalidFrame("unknown frame tag")),
        };

        Ok(Some(frame))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = BeamError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let len = item.payload_len();
        if len > MAX_FRAME_SIZE {
            return Err(BeamError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }

        dst.reserve(FRAME_PREFIX + len);
        match item {
            Frame::Text(s) => {
                dst.put_u8(TAG_TEXT);
                dst.put_u32_le(len as u32);
                dst.put_slice(s.as_bytes());
            }
            Frame::Binary(b) => {
                dst.put_u8(TAG_BINARY);
                dst.put_u32_le(len as u32);
                dst.put_slice(&b);
            }
            Frame::Close { code, reason } => {
                dst.put_u8(TAG_CLOSE);
                dst.put_u32_le(len as u32);
                dst.put_u16_le(code);
                dst.put_slice(reason.as_bytes());
            }
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(frame: Frame) -> Frame {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(frame, &mut buf).unwrap();
        codec.decode(&mut buf).unwrap().unwrap()
    }

    #[test]
    fn text_roundtrip() {
        let decoded = roundtrip(Frame::text("size:150000:abcdef"));
        assert_eq!(decoded, Frame::Text("size:150000:abcdef".into()));
    }

    #[test]
    fn binary_roundtrip() {
        let data = Bytes::from(vec![0xAB; 4096]);
        let decoded = roundtrip(Frame::Binary(data.clone()));
        assert_eq!(decoded, Frame::Binary(data));
    }

    #[test]
    fn close_roundtrip() {
        let decoded = roundtrip(Frame::close(1000, "Only one host can connect at a time."));
        assert_eq!(
            decoded,
            Frame::Close {
                code: 1000,
                reason: "Only one host can connect at a time.".into()
            }
        );
    }

    #[test]
    fn empty_text_roundtrip() {
        let decoded = roundtrip(Frame::text(""));
        assert_eq!(decoded, Frame::Text(String::new()));
    }

    #[test]
    fn partial_prefix_yields_none() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[TAG_TEXT, 4, 0][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn partial_payload_yields_none() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Frame::text("hello"), &mut buf).unwrap();
        let mut truncated = buf.split_to(buf.len() - 2);
        assert!(codec.decode(&mut truncated).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_rejected() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u8(TAG_BINARY);
        buf.put_u32_le((MAX_FRAME_SIZE + 1) as u32);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(BeamError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn unknown_tag_rejected() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u8(9);
        buf.put_u32_le(0);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(BeamError::InvalidFrame(_))
        ));
    }

    #[test]
    fn short_close_rejected() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u8(TAG_CLOSE);
        buf.put_u32_le(1);
        buf.put_u8(0);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(BeamError::InvalidFrame(_))
        ));
    }

    #[test]
    fn two_frames_in_one_buffer() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Frame::text("first"), &mut buf).unwrap();
        codec
            .encode(Frame::binary(vec![1u8, 2, 3]), &mut buf)
            .unwrap();

        assert_eq!(
            codec.decode(&mut buf).unwrap().unwrap(),
            Frame::Text("first".into())
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap().unwrap(),
            Frame::Binary(Bytes::from(vec![1u8, 2, 3]))
        );
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }
}
