//! On-disk shape of a detection record written by the detection service.
//!
//! Only the fields the director needs are modelled; anything else in the
//! record (inference metadata, camera hints, status) is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionRecord {
    pub version: i64,
    #[serde(default)]
    pub frame: FrameId,
    /// Write time in epoch seconds.
    #[serde(default)]
    pub ts: Option<f64>,
    pub width: i64,
    pub height: i64,
    #[serde(default)]
    pub objects: Vec<RecordObject>,
}

/// Frames are named by stem, which the producer may emit as text or number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FrameId {
    Text(String),
    Number(u64),
}

impl Default for FrameId {
    fn default() -> Self {
        FrameId::Text(String::new())
    }
}

impl FrameId {
    pub fn into_string(self) -> String {
        match self {
            FrameId::Text(text) => text,
            FrameId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordObject {
    #[serde(default)]
    pub class_id: Option<i64>,
    #[serde(default, rename = "class")]
    pub label: Option<String>,
    #[serde(default)]
    pub conf: f32,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub center: Option<PixelPoint>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl RecordObject {
    /// Explicit center, or the middle of the bounding box.
    pub fn pixel_center(&self) -> Option<PixelPoint> {
        self.center.or_else(|| {
            self.bbox.map(|b| PixelPoint {
                x: b.x + b.w / 2.0,
                y: b.y + b.h / 2.0,
            })
        })
    }
}
