//! Screen sources — where submitted frame payloads come from.
//!
//! The relay and viewers treat payloads as opaque bytes, so anything
//! that yields an encoded image per call can stand behind this trait.
//! The built-in [`TestPatternSource`] produces a deterministic moving
//! pattern in place of a platform capture backend.

use async_trait::async_trait;
use bytes::Bytes;

use beam_core::BeamError;

// ── ScreenSource ─────────────────────────────────────────────────

/// Produces encoded screen frames for submission.
#[async_trait]
pub trait ScreenSource: Send {
    /// Dimensions of the captured surface in pixels. Control-command
    /// coordinates are scaled against these.
    fn dimensions(&self) -> (u32, u32);

    /// Produce the next frame payload.
    async fn next_frame(&mut self) -> Result<Bytes, BeamError>;
}

// ── TestPatternSource ────────────────────────────────────────────

/// Deterministic stand-in for a capture backend.
///
/// Each frame is a byte pattern derived from the frame number, so
/// consecutive frames differ and a given frame is reproducible.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_number: u64,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_number: 0,
        }
    }

    /// Frames produced so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    fn payload_len(&self) -> usize {
        // Roughly what a compressed frame of this surface would weigh.
        (self.width as usize * self.height as usize / 16).max(1)
    }
}

#[async_trait]
impl ScreenSource for TestPatternSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn next_frame(&mut self) -> Result<Bytes, BeamError> {
        let n = self.frame_number;
        self.frame_number += 1;

        let len = self.payload_len();
        let data: Vec<u8> = (0..len)
            .map(|i| (i as u64).wrapping_mul(31).wrapping_add(n) as u8)
            .collect();
        Ok(Bytes::from(data))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pattern_is_deterministic() {
        let mut a = TestPatternSource::new(320, 240);
        let mut b = TestPatternSource::new(320, 240);
        assert_eq!(a.next_frame().await.unwrap(), b.next_frame().await.unwrap());
    }

    #[tokio::test]
    async fn consecutive_frames_differ() {
        let mut src = TestPatternSource::new(320, 240);
        let first = src.next_frame().await.unwrap();
        let second = src.next_frame().await.unwrap();
        assert_ne!(first, second);
        assert_eq!(src.frame_number(), 2);
    }

    #[test]
    fn dimensions_reported() {
        let src = TestPatternSource::new(1280, 720);
        assert_eq!(src.dimensions(), (1280, 720));
    }

    #[tokio::test]
    async fn tiny_surface_still_produces_payload() {
        let mut src = TestPatternSource::new(1, 1);
        assert!(!src.next_frame().await.unwrap().is_empty());
    }
}
