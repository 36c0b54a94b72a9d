//! Frame-space geometry for region drawing.
//!
//! Points are stored either as percentages of the displayed frame (0-100 on
//! both axes, resolution independent) or as absolute pixels on a fixed-size
//! canvas. This module converts pointer events into either space and computes
//! the V-shaped arrowhead used as a direction indicator.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::region::Direction;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound of the percentage coordinate space on both axes.
pub const PERCENT_MAX: f64 = 100.0;

/// Length of each arrowhead wing, in the units of the region's points.
pub const ARROW_WING_LENGTH: f64 = 8.0;

/// Half-angle between the two arrowhead wings, in degrees.
pub const ARROW_WING_SPREAD_DEG: f64 = 30.0;

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A 2D point in either percentage or pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// Bounding box
// ---------------------------------------------------------------------------

/// On-screen bounding box of the displayed reference frame, in client pixels.
///
/// Callers must pass the box measured at the time of the pointer event; the
/// frame can be resized between clicks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Reject boxes that cannot be mapped against (collapsed or non-finite).
    pub fn validate(&self) -> Result<(), CoreError> {
        let finite = [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(CoreError::Validation(
                "bounding box must contain only finite numbers".to_string(),
            ));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(CoreError::Validation(format!(
                "bounding box must have a positive size, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Convert client (viewport) coordinates to percentage-of-box coordinates.
///
/// `x% = (client_x - left) / width * 100`, likewise for `y`. The result is
/// not clamped: clicks just outside the frame map to values outside 0-100,
/// which the editor then rejects.
pub fn client_to_percent(client: Point, bbox: &BoundingBox) -> Result<Point, CoreError> {
    bbox.validate()?;
    if !client.is_finite() {
        return Err(CoreError::Validation(
            "pointer coordinates must be finite".to_string(),
        ));
    }
    Ok(Point {
        x: (client.x - bbox.left) / bbox.width * PERCENT_MAX,
        y: (client.y - bbox.top) / bbox.height * PERCENT_MAX,
    })
}

// ---------------------------------------------------------------------------
// Coordinate spaces
// ---------------------------------------------------------------------------

/// The space in which a region editor stores its points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// 0-100 on both axes relative to the displayed frame.
    Percent,
    /// Absolute pixels on a canvas of the given size.
    Pixel { width: u32, height: u32 },
}

impl CoordinateSpace {
    /// Width and height of the space in its own units.
    pub fn extent(&self) -> (f64, f64) {
        match *self {
            Self::Percent => (PERCENT_MAX, PERCENT_MAX),
            Self::Pixel { width, height } => (f64::from(width), f64::from(height)),
        }
    }

    /// Map a pointer event into this space.
    pub fn map_client(&self, client: Point, bbox: &BoundingBox) -> Result<Point, CoreError> {
        let pct = client_to_percent(client, bbox)?;
        Ok(self.from_percent(pct))
    }

    /// Scale a percentage point into this space.
    pub fn from_percent(&self, pct: Point) -> Point {
        let (w, h) = self.extent();
        Point {
            x: pct.x / PERCENT_MAX * w,
            y: pct.y / PERCENT_MAX * h,
        }
    }

    /// Scale a point in this space back to percentages.
    pub fn to_percent(&self, p: Point) -> Point {
        let (w, h) = self.extent();
        Point {
            x: p.x / w * PERCENT_MAX,
            y: p.y / h * PERCENT_MAX,
        }
    }

    /// Check that a point is finite and inside the space (edges inclusive).
    pub fn validate_point(&self, p: Point) -> Result<(), CoreError> {
        if !p.is_finite() {
            return Err(CoreError::Validation(
                "point coordinates must be finite numbers".to_string(),
            ));
        }
        let (w, h) = self.extent();
        if p.x < 0.0 || p.x > w || p.y < 0.0 || p.y > h {
            return Err(CoreError::Validation(format!(
                "point ({}, {}) lies outside the frame (0..={w}, 0..={h})",
                p.x, p.y
            )));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if let Self::Pixel { width, height } = *self {
            if width == 0 || height == 0 {
                return Err(CoreError::Validation(format!(
                    "pixel canvas must have a positive size, got {width}x{height}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Arrowhead
// ---------------------------------------------------------------------------

/// Two wing segments forming a V at the tip of a directed region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrowHead {
    pub tip: Point,
    pub left_wing: Point,
    pub right_wing: Point,
    /// Orientation of the arrow in degrees.
    pub angle_deg: f64,
}

/// Orientation in degrees for an arrow drawn from `from` to `to` with the
/// given direction.
///
/// Vertical directions use a fixed angle regardless of the drawn geometry;
/// horizontal ones derive it from the last segment (reversed for
/// right-to-left).
pub fn arrow_angle_deg(from: Point, to: Point, direction: Direction) -> f64 {
    let base = (to.y - from.y).atan2(to.x - from.x).to_degrees();
    match direction {
        Direction::TopToBottom | Direction::Vertical => 90.0,
        Direction::BottomToTop => -90.0,
        Direction::RightToLeft => base + 180.0,
        Direction::LeftToRight | Direction::Horizontal => base,
    }
}

/// Compute the arrowhead for a polyline, anchored at its last point.
///
/// Returns `None` when fewer than two points are available.
pub fn arrowhead(points: &[Point], direction: Direction) -> Option<ArrowHead> {
    let [.., from, tip] = points else {
        return None;
    };
    let angle_deg = arrow_angle_deg(*from, *tip, direction);
    let angle = angle_deg.to_radians();
    let spread = ARROW_WING_SPREAD_DEG.to_radians();

    let wing = |offset: f64| Point {
        x: tip.x - ARROW_WING_LENGTH * (angle + offset).cos(),
        y: tip.y - ARROW_WING_LENGTH * (angle + offset).sin(),
    };

    Some(ArrowHead {
        tip: *tip,
        left_wing: wing(-spread),
        right_wing: wing(spread),
        angle_deg,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
