use serde::Serialize;

/// A position expressed as a fraction of frame width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormPoint {
    pub x: f64,
    pub y: f64,
}

impl NormPoint {
    pub const CENTER: NormPoint = NormPoint { x: 0.5, y: 0.5 };

    /// Builds a point clamped into the unit square. NaN collapses to 0.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    pub fn distance(&self, other: &NormPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear interpolation towards `other`, clamped.
    pub fn lerp(&self, other: &NormPoint, t: f64) -> NormPoint {
        NormPoint::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Chebyshev distance from the frame center.
    pub fn offset_from_center(&self) -> f64 {
        (self.x - 0.5).abs().max((self.y - 0.5).abs())
    }

    pub fn is_normalized(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

impl Default for NormPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
