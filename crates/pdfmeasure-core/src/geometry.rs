//! Distance measurement between two points on a page

use serde::{Deserialize, Serialize};

use crate::error::{MeasureError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned extent and straight-line distance between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub width: f64,
    pub height: f64,
    pub diagonal: f64,
}

/// Measure the horizontal, vertical and Euclidean distance from `a` to `b`.
///
/// Coordinates are taken as given; no unit conversion happens here.
pub fn measure(a: Point, b: Point) -> Result<Measurement> {
    for (name, value) in [("x1", a.x), ("y1", a.y), ("x2", b.x), ("y2", b.y)] {
        if !value.is_finite() {
            return Err(MeasureError::InvalidCoordinates(format!(
                "{} must be a finite number",
                name
            )));
        }
    }

    let width = (b.x - a.x).abs();
    let height = (b.y - a.y).abs();

    Ok(Measurement {
        width,
        height,
        diagonal: width.hypot(height),
    })
}
