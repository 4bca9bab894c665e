//! # Line clipping
//!
//! Clips a line segment to the interior of a (possibly non-convex) polygon, returning every
//! sub-segment that lies inside.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Sub-segments shorter than this fraction of the clipped line are treated as touches and
/// dropped.
const MIN_SEGMENT_FRACTION: f64 = 1e-12;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A straight line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Vector2<f64>,
    pub end: Vector2<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Line {
    pub fn new(start: Vector2<f64>, end: Vector2<f64>) -> Self {
        Self { start, end }
    }

    /// The same line travelled in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// The point at the given fraction along the line.
    pub fn point_at(&self, t: f64) -> Vector2<f64> {
        self.start + (self.end - self.start) * t
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Clip `line` to the interior of `polygon`.
///
/// The polygon is closed implicitly. Crossings are found with a half-open side test: a polygon
/// vertex lying exactly on the line counts as being on its left. Crossing pairs then bound the
/// inside stretches (even-odd rule), which are clamped to the line's extent. The returned
/// segments are ordered along the line and share its direction. Touches of zero length are
/// dropped.
pub fn clip_line_to_polygon(line: &Line, polygon: &[Vector2<f64>]) -> Vec<Line> {
    let d = line.end - line.start;
    let len_sq = d.norm_squared();

    if len_sq == 0.0 || polygon.len() < 3 {
        return Vec::new();
    }

    let mut crossings: Vec<f64> = Vec::new();

    for (p, q) in polygon.iter().zip(polygon.iter().cycle().skip(1)) {
        let s1 = d.perp(&(p - line.start));
        let s2 = d.perp(&(q - line.start));

        if (s1 >= 0.0) != (s2 >= 0.0) {
            let u = s1 / (s1 - s2);
            let x = p + (q - p) * u;
            crossings.push((x - line.start).dot(&d) / len_sq);
        }
    }

    crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    crossings
        .chunks_exact(2)
        .filter_map(|pair| {
            let t0 = pair[0].max(0.0).min(1.0);
            let t1 = pair[1].max(0.0).min(1.0);

            if t1 - t0 > MIN_SEGMENT_FRACTION {
                Some(Line::new(line.point_at(t0), line.point_at(t1)))
            } else {
                None
            }
        })
        .collect()
}
