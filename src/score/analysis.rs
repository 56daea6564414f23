//! Ingestion of recognition results.
//!
//! The recognition service returns a schema-shaped but untrusted JSON payload.
//! This module validates its top-level structure and normalizes every frame
//! into the local model. Only structural problems are errors; degenerate
//! field values are clamped or defaulted so one bad frame cannot halt a
//! whole performance.

use super::frame::{Frame, PageRect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Page indices at or above this are treated as garbage and reset to 0.
pub const MAX_PAGE_INDEX: f64 = u32::MAX as f64;

/// Errors that can occur while ingesting a recognition result.
#[derive(Debug, Error)]
pub enum IngestError {
    /// File could not be read.
    #[error("failed to read analysis: {0}")]
    Io(#[from] std::io::Error),
    /// Payload is not JSON at all.
    #[error("analysis is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Payload is JSON but lacks the required top-level shape.
    #[error("no usable data in analysis: {0}")]
    NoUsableData(&'static str),
}

/// A complete recognition result: tempo plus frames in performance order.
///
/// Immutable once built. A new upload produces a new value rather than
/// mutating an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Tempo in beats per minute. Checked for positivity when loaded.
    pub tempo: f64,

    /// Frames in performance order.
    pub frames: Vec<Frame>,
}

impl AnalysisResult {
    /// Creates a result from already-normalized frames.
    pub fn new(tempo: f64, frames: Vec<Frame>) -> Self {
        Self { tempo, frames }
    }

    /// Parses and normalizes a recognition payload.
    ///
    /// A surrounding markdown code fence is tolerated.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not JSON, the root is not an object, or
    /// `frames` is missing or not an array.
    pub fn from_json(text: &str) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_str(strip_code_fence(text))?;
        Self::from_value(&value)
    }

    /// Reads and normalizes a recognition payload from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, IngestError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Normalizes an already-parsed payload.
    pub fn from_value(value: &Value) -> Result<Self, IngestError> {
        let root = value
            .as_object()
            .ok_or(IngestError::NoUsableData("root is not an object"))?;
        let raw_frames = root
            .get("frames")
            .and_then(Value::as_array)
            .ok_or(IngestError::NoUsableData("missing frames array"))?;

        let tempo = root.get("tempo").and_then(Value::as_f64).unwrap_or_else(|| {
            tracing::warn!("analysis has no numeric tempo");
            0.0
        });

        let mut frames = Vec::with_capacity(raw_frames.len());
        for (index, raw) in raw_frames.iter().enumerate() {
            match raw.as_object() {
                Some(obj) => frames.push(normalize_frame(obj)),
                None => tracing::warn!("skipping frame {}: not an object", index),
            }
        }

        tracing::debug!("ingested {} frames at {} BPM", frames.len(), tempo);
        Ok(Self { tempo, frames })
    }

    /// Number of distinct pages referenced by frames (highest index + 1).
    pub fn page_count(&self) -> usize {
        self.frames
            .iter()
            .map(|f| f.page_index.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Total musical length in beats.
    pub fn total_beats(&self) -> f64 {
        self.frames.iter().map(|f| f.duration).sum()
    }

    /// Serializes the normalized result to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Removes a ```` ``` ```` / ```` ```json ```` fence around a payload, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let body = match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => body,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn normalize_frame(obj: &Map<String, Value>) -> Frame {
    let page_index = match obj.get("pageIndex").and_then(Value::as_f64) {
        Some(v) if v.is_finite() && v >= MAX_PAGE_INDEX => {
            tracing::warn!("page index {} out of range, using page 0", v);
            0
        }
        Some(v) if v.is_finite() && v > 0.0 => v.round() as usize,
        _ => 0,
    };

    let notes = obj
        .get("notes")
        .and_then(Value::as_array)
        .map(|notes| {
            notes
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let duration = obj
        .get("duration")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let region = obj.get("region").and_then(parse_rect).unwrap_or_default();

    let highlights = obj
        .get("highlights")
        .and_then(Value::as_array)
        .map(|rects| rects.iter().filter_map(parse_rect).collect())
        .unwrap_or_default();

    Frame::new(page_index, notes, duration, region, highlights)
}

/// Parses a `[top, left, bottom, right]` array of four numbers.
fn parse_rect(value: &Value) -> Option<PageRect> {
    let bounds = value.as_array()?;
    if bounds.len() != 4 {
        return None;
    }
    let mut nums = [0.0f64; 4];
    for (slot, bound) in nums.iter_mut().zip(bounds) {
        *slot = bound.as_f64()?;
    }
    Some(PageRect::normalized(nums[0], nums[1], nums[2], nums[3]))
}
