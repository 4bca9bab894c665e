//! # Boundary
//!
//! The boundary is the closed polygon enclosing the area to be mowed. It is used both to plan the
//! coverage path and as a fence while driving.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use ordered_float::OrderedFloat;
use std::{collections::BTreeSet, path::Path};

use super::{
    geo::{self, GeoPoint},
    map_file::{self, MapFileError},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Minimum number of distinct points in a valid boundary.
pub const MIN_DISTINCT_POINTS: usize = 5;

/// Distance in degrees within which a point is considered to lie on an edge (about 0.1 mm).
const ON_EDGE_TOLERANCE_DEG: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A simple closed polygon in (lon, lat).
///
/// The last point is implicitly joined to the first. Boundaries can only be created through
/// [`Boundary::new`] or [`Boundary::load`], so every instance has been validated.
#[derive(Debug, Clone)]
pub struct Boundary {
    points: Vec<GeoPoint>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("A boundary requires at least 5 distinct points but only {num_distinct} were given")]
    InvalidBoundary { num_distinct: usize },

    #[error("Boundary point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    #[error("Could not read the boundary: {0}")]
    MapFile(#[from] MapFileError),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Boundary {
    /// Create a new boundary from the given points.
    ///
    /// No self-intersection or winding checks are performed.
    pub fn new(points: Vec<GeoPoint>) -> Result<Self, BoundaryError> {
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(BoundaryError::NonFiniteCoordinate { index });
        }

        let num_distinct = points
            .iter()
            .map(|p| (OrderedFloat(p.lon), OrderedFloat(p.lat)))
            .collect::<BTreeSet<_>>()
            .len();

        if num_distinct < MIN_DISTINCT_POINTS {
            return Err(BoundaryError::InvalidBoundary { num_distinct });
        }

        Ok(Self { points })
    }

    /// Load and validate a boundary from a map file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BoundaryError> {
        let points = map_file::load(path.as_ref())?;

        debug!(
            "Loaded {} boundary points from {:?}",
            points.len(),
            path.as_ref()
        );

        Self::new(points)
    }

    /// The vertices of the boundary.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Iterate over the edges of the boundary, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (&GeoPoint, &GeoPoint)> + '_ {
        self.points
            .iter()
            .zip(self.points.iter().cycle().skip(1))
    }

    /// Returns true if the point is inside the boundary or on its edge.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        if self.edges().any(|(a, b)| on_segment(point, a, b)) {
            return true;
        }

        // Even-odd ray cast towards +lon
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.lat > point.lat) != (b.lat > point.lat) {
                let cross_lon = a.lon + (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat);
                if point.lon < cross_lon {
                    inside = !inside;
                }
            }
        }

        inside
    }

    /// Distance in meters from the point to the boundary if it lies outside, otherwise 0.
    ///
    /// Computed in a flat local frame centred on the point.
    pub fn distance_outside_m(&self, point: &GeoPoint) -> f64 {
        if self.contains(point) {
            return 0.0;
        }

        self.edges()
            .map(|(a, b)| geo::distance_to_segment_m(point, a, b))
            .fold(f64::INFINITY, f64::min)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Returns true if `p` lies on the segment `a -> b` within the tolerance.
fn on_segment(p: &GeoPoint, a: &GeoPoint, b: &GeoPoint) -> bool {
    let tol = ON_EDGE_TOLERANCE_DEG;

    if p.lon < a.lon.min(b.lon) - tol
        || p.lon > a.lon.max(b.lon) + tol
        || p.lat < a.lat.min(b.lat) - tol
        || p.lat > a.lat.max(b.lat) + tol
    {
        return false;
    }

    let d = b.to_vector() - a.to_vector();
    let r = p.to_vector() - a.to_vector();
    let len = d.norm();

    if len == 0.0 {
        return r.norm() <= tol;
    }

    // Perpendicular distance from the line through a and b
    (d.perp(&r) / len).abs() <= tol
}
