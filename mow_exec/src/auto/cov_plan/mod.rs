//! # Coverage path planner
//!
//! Plans a boustrophedon ("ox plough") sweep over the area enclosed by a boundary.
//!
//! The boundary is first expressed in its principal axis frame so that the sweep is aligned with
//! the dominant orientation of the area regardless of how it sits in the world. Sweep lines are
//! then placed at constant x (along the major axis) separated by the requested spacing, each
//! spanning the full y extent of the boundary. Every line is clipped to the boundary, giving zero
//! or more inside segments per line (several where a non-convex boundary is crossed more than
//! once). The segment endpoints are visited line by line, alternating the direction of travel on
//! each line, and finally transformed back into (lon, lat).
//!
//! The planner works directly on degrees, using the local meters per degree of longitude to
//! convert the spacing.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod clip;
pub mod frame;
pub mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};
use nalgebra::Vector2;

pub use clip::{clip_line_to_polygon, Line};
pub use frame::PrincipalAxisFrame;
pub use params::CovPlanParams;

use super::{
    boundary::{Boundary, BoundaryError},
    geo::{self, GeoPoint},
    path::Path,
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The coverage planner.
#[derive(Debug, Clone, Default)]
pub struct CovPlanner {
    params: CovPlanParams,
}

/// One sweep line and the parts of it which lie inside the boundary.
#[derive(Debug, Clone)]
pub struct Sweep {
    /// Position of the line along the major axis, in frame units
    pub x: f64,

    /// Inside segments, ordered by increasing y and pointing towards +y
    pub segments: Vec<Line>,
}

/// The result of the sweep stage, expressed in the principal axis frame.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub frame: PrincipalAxisFrame,

    /// Separation between sweep lines in frame units
    pub step: f64,

    /// Extent of the boundary along the major axis as `(min, max)`
    pub x_range: (f64, f64),

    /// Extent of the boundary along the minor axis as `(min, max)`
    pub y_range: (f64, f64),

    /// All sweep lines in order of increasing x, including those that missed the boundary
    pub sweeps: Vec<Sweep>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CovPlanError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("The start position {0:?} is not inside the boundary")]
    NotInsideBoundary(GeoPoint),

    #[error("The sweep spacing must be a positive number of meters, got {0}")]
    InvalidSpacing(f64),

    #[error("Boundary error: {0}")]
    Boundary(#[from] BoundaryError),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl CovPlanner {
    /// Create a new planner with the given parameters.
    pub fn new(params: CovPlanParams) -> Self {
        Self { params }
    }

    /// Create a new planner, loading the parameters from the given file.
    pub fn init(params_path: &str) -> Result<Self, CovPlanError> {
        let params = util::params::load(params_path).map_err(CovPlanError::ParamLoadError)?;

        Ok(Self::new(params))
    }

    pub fn params(&self) -> &CovPlanParams {
        &self.params
    }

    /// Plan a path over the boundary with the spacing from the parameters.
    pub fn plan(&self, boundary: &Boundary, start: &GeoPoint) -> Result<Path, CovPlanError> {
        self.plan_with_spacing(boundary, start, self.params.sweep_spacing_m)
    }

    /// Plan a path over the boundary starting from `start`.
    ///
    /// An empty path is returned if no sweep line intersects the boundary, which can only happen
    /// when the boundary is narrower than the spacing.
    pub fn plan_with_spacing(
        &self,
        boundary: &Boundary,
        start: &GeoPoint,
        spacing_m: f64,
    ) -> Result<Path, CovPlanError> {
        let plan = self.plan_sweeps(boundary, start, spacing_m)?;

        let mut lines: Vec<&Sweep> = plan
            .sweeps
            .iter()
            .filter(|s| !s.segments.is_empty())
            .collect();

        // Visit from the minimum of the major axis travelling towards -y, unless anchoring to the
        // entry point
        let mut descending = true;

        if self.params.start_near_entry && !lines.is_empty() {
            let start_f = plan.frame.forward(&start.to_vector());

            if start_f.x - plan.x_range.0 > plan.x_range.1 - start_f.x {
                lines.reverse();
            }

            let first = lines[0];
            let bottom = first.segments[0].start.y;
            let top = first.segments[first.segments.len() - 1].end.y;
            descending = (top - start_f.y).abs() < (start_f.y - bottom).abs();
        }

        let mut points_f: Vec<Vector2<f64>> = Vec::new();

        for sweep in lines {
            if descending {
                for seg in sweep.segments.iter().rev() {
                    points_f.push(seg.end);
                    points_f.push(seg.start);
                }
            } else {
                for seg in sweep.segments.iter() {
                    points_f.push(seg.start);
                    points_f.push(seg.end);
                }
            }

            descending = !descending;
        }

        let points: Vec<GeoPoint> = points_f
            .iter()
            .map(|p| GeoPoint::from_vector(&plan.frame.inverse(p)))
            .collect();

        info!(
            "Coverage plan: {} sweep lines, {} waypoints",
            plan.sweeps.len(),
            points.len()
        );

        Ok(Path::new(points))
    }

    /// Compute the sweep lines and their clipped segments without stitching them into a path.
    pub fn plan_sweeps(
        &self,
        boundary: &Boundary,
        start: &GeoPoint,
        spacing_m: f64,
    ) -> Result<SweepPlan, CovPlanError> {
        if !spacing_m.is_finite() || spacing_m <= 0.0 {
            return Err(CovPlanError::InvalidSpacing(spacing_m));
        }

        if !boundary.contains(start) {
            return Err(CovPlanError::NotInsideBoundary(*start));
        }

        let points: Vec<Vector2<f64>> = boundary.points().iter().map(|p| p.to_vector()).collect();

        let frame = PrincipalAxisFrame::from_points(&points).ok_or(
            BoundaryError::InvalidBoundary {
                num_distinct: points.len(),
            },
        )?;

        let polygon: Vec<Vector2<f64>> = points.iter().map(|p| frame.forward(p)).collect();

        let (_, m_per_deg_lon) = geo::local_scale(frame.mean().y);
        let step = spacing_m / m_per_deg_lon * frame.axis(0).norm();

        let x_range = extent(polygon.iter().map(|p| p.x));
        let y_range = extent(polygon.iter().map(|p| p.y));

        debug!(
            "Sweep frame: axis {:?}, step {:e}, x {:?}, y {:?}",
            frame.axis(0).as_slice(),
            step,
            x_range,
            y_range
        );

        let mut sweeps = Vec::new();
        let mut k = 0usize;

        loop {
            let x = x_range.0 + k as f64 * step;
            if !(x <= x_range.1) {
                break;
            }

            let line = Line::new(Vector2::new(x, y_range.0), Vector2::new(x, y_range.1));
            sweeps.push(Sweep {
                x,
                segments: clip_line_to_polygon(&line, &polygon),
            });

            k += 1;
        }

        Ok(SweepPlan {
            frame,
            step,
            x_range,
            y_range,
            sweeps,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Plan a coverage path with the default parameters and the given spacing.
pub fn plan(boundary: &Boundary, start: &GeoPoint, spacing_m: f64) -> Result<Path, CovPlanError> {
    CovPlanner::default().plan_with_spacing(boundary, start, spacing_m)
}

/// Minimum and maximum of a sequence of values.
fn extent<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
        (min.min(v), max.max(v))
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const ORIGIN: GeoPoint = GeoPoint {
        lon: -74.4612,
        lat: 40.5218,
    };

    /// Build a boundary from local east/north offsets in meters.
    fn boundary_m(points_m: &[(f64, f64)]) -> Boundary {
        Boundary::new(
            points_m
                .iter()
                .map(|(e, n)| geo::offset_m(&ORIGIN, *e, *n))
                .collect(),
        )
        .unwrap()
    }

    fn square_10m() -> Boundary {
        boundary_m(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])
    }

    fn pentagon() -> Boundary {
        boundary_m(&[(0.0, 0.0), (20.0, 8.0), (16.0, 18.0), (2.0, 16.0), (-4.0, 6.0)])
    }

    /// C shape, long along east and open towards the east.
    fn c_shape() -> Boundary {
        boundary_m(&[
            (0.0, 0.0),
            (30.0, 0.0),
            (30.0, 3.0),
            (8.0, 3.0),
            (8.0, 7.0),
            (30.0, 7.0),
            (30.0, 10.0),
            (0.0, 10.0),
        ])
    }

    #[test]
    fn test_invalid_spacing() {
        let b = square_10m();
        let start = geo::offset_m(&ORIGIN, 5.0, 5.0);

        for s in &[0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                plan(&b, &start, *s),
                Err(CovPlanError::InvalidSpacing(_))
            ));
        }
    }

    #[test]
    fn test_start_outside() {
        let b = square_10m();

        assert!(matches!(
            plan(&b, &geo::offset_m(&ORIGIN, -5.0, 5.0), 1.0),
            Err(CovPlanError::NotInsideBoundary(_))
        ));

        // Starting on a vertex is allowed
        assert!(plan(&b, &b.points()[3], 1.0).is_ok());
    }

    #[test]
    fn test_convex_points_inside() {
        let b = pentagon();
        let path = plan(&b, &geo::offset_m(&ORIGIN, 5.0, 5.0), 0.5).unwrap();

        assert!(path.get_num_points() > 20);
        assert_eq!(path.get_num_points() % 2, 0);
        for p in path.points() {
            assert!(b.contains(p), "{:?} is outside the boundary", p);
        }
    }

    #[test]
    fn test_square_spacing() {
        let b = square_10m();
        let planner = CovPlanner::new(CovPlanParams {
            sweep_spacing_m: 1.0,
            start_near_entry: false,
        });
        let path = planner.plan(&b, &geo::offset_m(&ORIGIN, 5.0, 5.0)).unwrap();

        let legs: Vec<&[GeoPoint]> = path.points().chunks(2).collect();
        assert!(legs.len() >= 9);

        for pair in legs.windows(2) {
            let (a, b) = (pair[0], pair[1]);

            // Neighbouring legs travel in opposite directions along the north-south lines
            assert!((a[1].lat - a[0].lat) * (b[1].lat - b[0].lat) < 0.0);

            // The end of one leg is a spacing away from the start of the next
            let gap = geo::distance(&a[1], &b[0]);
            assert!((gap - 1.0).abs() < 0.01, "gap was {}", gap);
        }

        // The first leg starts from the top of the line
        assert!(legs[0][0].lat > legs[0][1].lat);

        // Frame round trip
        let sweeps = planner
            .plan_sweeps(&b, &geo::offset_m(&ORIGIN, 5.0, 5.0), 1.0)
            .unwrap();
        for p in b.points().iter().chain(path.points()) {
            let v = p.to_vector();
            let back = sweeps.frame.inverse(&sweeps.frame.forward(&v));
            assert!((back - v).norm() < 1e-6);
        }
    }

    #[test]
    fn test_non_convex_keeps_all_segments() {
        let b = c_shape();
        let start = geo::offset_m(&ORIGIN, 2.0, 5.0);
        let planner = CovPlanner::default();

        let sweeps = planner.plan_sweeps(&b, &start, 1.0).unwrap();
        assert!(sweeps.sweeps.iter().any(|s| s.segments.len() >= 2));

        let num_segments: usize = sweeps.sweeps.iter().map(|s| s.segments.len()).sum();
        let path = planner.plan_with_spacing(&b, &start, 1.0).unwrap();
        assert_eq!(path.get_num_points(), 2 * num_segments);

        for p in path.points() {
            assert!(b.contains(p));
        }
    }

    #[test]
    fn test_start_near_entry() {
        let b = c_shape();
        let start = geo::offset_m(&ORIGIN, 29.0, 9.0);

        let path = plan(&b, &start, 1.0).unwrap();
        let first = path.points()[0];
        let last = path.points()[path.get_num_points() - 1];

        assert!(geo::distance(&start, &first) < 3.0);
        assert!(geo::distance(&start, &first) < geo::distance(&start, &last));
    }

    #[test]
    fn test_narrow_boundary_gives_empty_path() {
        let b = boundary_m(&[
            (0.0, 0.0),
            (0.3, 0.05),
            (0.35, 0.2),
            (0.15, 0.3),
            (-0.05, 0.15),
        ]);

        let path = plan(&b, &geo::offset_m(&ORIGIN, 0.15, 0.14), 1.0).unwrap();
        assert!(path.is_empty());
    }
}
