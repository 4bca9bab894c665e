//! # Path
//!
//! This module defines the path used by the autonomy system. A path is an ordered list of
//! waypoints which is built once by the planner and then consumed in sequence.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;

use super::{
    geo::{self, GeoPoint},
    map_file::{self, MapFileError},
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A path defining the desired trajectory of the mower.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    points: Vec<GeoPoint>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Path {
    /// Create a new path from the given waypoints.
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    /// Create a new empty path
    pub fn new_empty() -> Self {
        Self { points: Vec::new() }
    }

    /// Load a path from a map file.
    pub fn load<P: AsRef<FsPath>>(path: P) -> Result<Self, MapFileError> {
        Ok(Self::new(map_file::load(path)?))
    }

    /// Save the path as a map file.
    pub fn save<P: AsRef<FsPath>>(&self, path: P) -> Result<(), MapFileError> {
        map_file::save(path, &self.points)
    }

    /// The waypoints of the path.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Get a waypoint by index.
    pub fn get(&self, index: usize) -> Option<&GeoPoint> {
        self.points.get(index)
    }

    /// Get the number of points in the path
    pub fn get_num_points(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the path has no waypoints.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total length of the path in meters.
    pub fn length_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| geo::distance(&w[0], &w[1]))
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_path_accessors() {
        let origin = GeoPoint::new(-74.4612, 40.5218);
        let path = Path::new(vec![
            origin,
            geo::offset_m(&origin, 0.0, 10.0),
            geo::offset_m(&origin, 1.0, 10.0),
        ]);

        assert_eq!(path.get_num_points(), 3);
        assert!(!path.is_empty());
        assert_eq!(path.get(0), Some(&origin));
        assert!(path.get(3).is_none());
        assert!((path.length_m() - 11.0).abs() < 0.05);

        assert!(Path::new_empty().is_empty());
        assert_eq!(Path::new_empty().length_m(), 0.0);
    }

    #[test]
    fn test_path_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("path.txt");

        let path = Path::new(vec![GeoPoint::new(1.0, 2.0), GeoPoint::new(1.5, 2.5)]);
        path.save(&file).unwrap();

        assert_eq!(Path::load(&file).unwrap(), path);
    }
}
