//! Playback frame representation.
//!
//! A frame is one musical instant: the pitches that start together, how many
//! beats they last, and where on the source page they are printed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound of the normalized page coordinate scale.
pub const NORMALIZED_SCALE: f64 = 1000.0;

/// Locally assigned identifier for a frame.
///
/// Only used to key frames in the UI. It carries no ordering or timing
/// meaning, and is never taken from the recognition payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameId(Uuid);

impl FrameId {
    /// Generates a new random frame ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FrameId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rectangle in normalized page coordinates (0-1000 on both axes).
///
/// Bounds follow the recognition payload order: top, left, bottom, right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageRect {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl PageRect {
    /// The whole page.
    pub const FULL_PAGE: PageRect = PageRect {
        top: 0.0,
        left: 0.0,
        bottom: NORMALIZED_SCALE,
        right: NORMALIZED_SCALE,
    };

    /// Creates a rectangle from bounds in payload order.
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Builds a rectangle from untrusted bounds.
    ///
    /// Each bound is clamped into the normalized scale (non-finite values
    /// become 0) and swapped bounds are reordered.
    pub fn normalized(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        let clamp = |v: f64| {
            if v.is_finite() {
                v.clamp(0.0, NORMALIZED_SCALE)
            } else {
                0.0
            }
        };
        let (top, bottom) = (clamp(top), clamp(bottom));
        let (left, right) = (clamp(left), clamp(right));
        Self {
            top: top.min(bottom),
            left: left.min(right),
            bottom: top.max(bottom),
            right: left.max(right),
        }
    }

    /// Width on the normalized scale.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Height on the normalized scale.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Returns true if the rectangle has no area.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }
}

/// One discrete musical event in performance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Local identifier for UI keying.
    pub id: FrameId,

    /// Index of the source page image this frame's region refers to.
    pub page_index: usize,

    /// Pitch tokens that start together, e.g. "E4", "G4" or "rest".
    /// Duplicates each produce their own voice. Empty plays as silence.
    pub notes: Vec<String>,

    /// Musical length in beats. Always at least `MIN_DURATION_BEATS`.
    pub duration: f64,

    /// Page area to display while this frame sounds.
    /// Wider than the notes themselves to give look-ahead context.
    pub region: PageRect,

    /// One rectangle per sounding note head. May be empty.
    pub highlights: Vec<PageRect>,
}

impl Frame {
    /// Creates a frame with a fresh ID.
    pub fn new(
        page_index: usize,
        notes: Vec<String>,
        duration: f64,
        region: PageRect,
        highlights: Vec<PageRect>,
    ) -> Self {
        Self {
            id: FrameId::new(),
            page_index,
            notes,
            duration: super::floor_duration(duration),
            region,
            highlights,
        }
    }

    /// Returns true if nothing in this frame makes a sound.
    pub fn is_silent(&self) -> bool {
        self.notes
            .iter()
            .all(|n| super::Pitch::parse(n) == super::Pitch::Rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::MIN_DURATION_BEATS;

    #[test]
    fn test_normalized_rect() {
        let rect = PageRect::normalized(500.0, 900.0, 100.0, 1200.0);
        assert_eq!(rect, PageRect::new(100.0, 900.0, 500.0, 1000.0));

        let rect = PageRect::normalized(f64::NAN, -5.0, 20.0, 30.0);
        assert_eq!(rect, PageRect::new(0.0, 0.0, 20.0, 30.0));
    }

    #[test]
    fn test_degenerate_rect() {
        assert!(PageRect::default().is_degenerate());
        assert!(PageRect::new(10.0, 10.0, 10.0, 50.0).is_degenerate());
        assert!(!PageRect::FULL_PAGE.is_degenerate());
    }

    #[test]
    fn test_frame_ids_unique() {
        let a = Frame::new(0, vec![], 1.0, PageRect::FULL_PAGE, vec![]);
        let b = Frame::new(0, vec![], 1.0, PageRect::FULL_PAGE, vec![]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_frame_duration_floor() {
        let frame = Frame::new(0, vec!["C4".into()], 0.0, PageRect::FULL_PAGE, vec![]);
        assert_eq!(frame.duration, MIN_DURATION_BEATS);
    }

    #[test]
    fn test_silent_frames() {
        let rest = Frame::new(0, vec!["rest".into()], 1.0, PageRect::FULL_PAGE, vec![]);
        let empty = Frame::new(0, vec![], 1.0, PageRect::FULL_PAGE, vec![]);
        let chord = Frame::new(0, vec!["rest".into(), "E4".into()], 1.0, PageRect::FULL_PAGE, vec![]);
        assert!(rest.is_silent());
        assert!(empty.is_silent());
        assert!(!chord.is_silent());
    }
}
