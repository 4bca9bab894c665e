//! # Autonomy Module
//!
//! This module provides the autonomous navigation of the mower: planning a coverage path over a
//! recorded boundary and driving the mower along it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Geodesy utilities - bearings, distances and angle wrapping on (lon, lat) points
pub mod geo;

/// Coordinate list files used for boundaries and paths
pub mod map_file;

/// Boundary polygon and the membership test
pub mod boundary;

/// Coverage path planner - boustrophedon sweep of a boundary
pub mod cov_plan;

/// Defines the path type
pub mod path;

/// Trajectory control module - drives the mower along the path
pub mod traj_ctrl;

/// Follow manager - runs trajectory control against a rover
pub mod follow;

/// Localisation module - position and heading sources
pub mod loc;

/// Boundary mapping - records a boundary by driving the perimeter
pub mod mapper;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use boundary::Boundary;
pub use geo::GeoPoint;
pub use path::Path;
