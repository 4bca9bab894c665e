//! # Geodesy utilities
//!
//! Small set of functions operating on (longitude, latitude) points in decimal degrees. No datum
//! correction is applied, all functions assume a spherical Earth.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Mean radius of the Earth used by the haversine distance.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude.
pub const M_PER_DEG_LAT: f64 = 111_320.0;

/// Equatorial circumference used to derive meters per degree of longitude.
pub const EARTH_CIRCUMFERENCE_M: f64 = 40_075_000.0;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A point on the Earth's surface.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in decimal degrees, positive east
    pub lon: f64,

    /// Latitude in decimal degrees, positive north
    pub lat: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns true if both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// The point as a flat (lon, lat) vector.
    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.lon, self.lat)
    }

    /// Build a point from a flat (lon, lat) vector.
    pub fn from_vector(v: &Vector2<f64>) -> Self {
        Self { lon: v.x, lat: v.y }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Initial great-circle bearing from `p1` to `p2` in degrees, in the range [0, 360).
///
/// 0 is north and angles increase clockwise.
pub fn bearing(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let dlon = (p2.lon - p1.lon).to_radians();

    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Haversine distance between two points in meters.
pub fn distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (p2.lon - p1.lon).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Wrap an angle in degrees into the range (-180, 180].
pub fn normalize_angle(angle_deg: f64) -> f64 {
    let wrapped = (angle_deg + 180.0).rem_euclid(360.0) - 180.0;

    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Meters per degree of latitude and longitude at the given latitude.
///
/// Returned as `(m_per_deg_lat, m_per_deg_lon)`.
pub fn local_scale(lat_deg: f64) -> (f64, f64) {
    (
        M_PER_DEG_LAT,
        EARTH_CIRCUMFERENCE_M * lat_deg.to_radians().cos() / 360.0,
    )
}

/// Offset a point by a flat east/north displacement in meters.
pub fn offset_m(origin: &GeoPoint, east_m: f64, north_m: f64) -> GeoPoint {
    let (m_per_deg_lat, m_per_deg_lon) = local_scale(origin.lat);

    GeoPoint {
        lon: origin.lon + east_m / m_per_deg_lon,
        lat: origin.lat + north_m / m_per_deg_lat,
    }
}

/// Flat east/north displacement in meters of `p` relative to `origin`.
///
/// The inverse of [`offset_m`], only meaningful over short distances.
pub fn local_m(origin: &GeoPoint, p: &GeoPoint) -> Vector2<f64> {
    let (m_per_deg_lat, m_per_deg_lon) = local_scale(origin.lat);

    Vector2::new(
        (p.lon - origin.lon) * m_per_deg_lon,
        (p.lat - origin.lat) * m_per_deg_lat,
    )
}

/// Flat distance in meters from `p` to the segment `a -> b`.
pub fn distance_to_segment_m(p: &GeoPoint, a: &GeoPoint, b: &GeoPoint) -> f64 {
    let a = local_m(p, a);
    let d = local_m(p, b) - a;
    let len_sq = d.norm_squared();

    if len_sq == 0.0 {
        return a.norm();
    }

    let t = (-a.dot(&d) / len_sq).max(0.0).min(1.0);
    (a + d * t).norm()
}

#[cfg(test)]
mod test {
    use super::*;

    const ORIGIN: GeoPoint = GeoPoint {
        lon: -74.4612,
        lat: 40.5218,
    };

    #[test]
    fn test_bearing_cardinals() {
        let north = offset_m(&ORIGIN, 0.0, 10.0);
        let east = offset_m(&ORIGIN, 10.0, 0.0);
        let south = offset_m(&ORIGIN, 0.0, -10.0);
        let west = offset_m(&ORIGIN, -10.0, 0.0);

        assert!(bearing(&ORIGIN, &north).abs() < 1e-6);
        assert!((bearing(&ORIGIN, &east) - 90.0).abs() < 1e-3);
        assert!((bearing(&ORIGIN, &south) - 180.0).abs() < 1e-6);
        assert!((bearing(&ORIGIN, &west) - 270.0).abs() < 1e-3);
    }

    #[test]
    fn test_bearing_reciprocal() {
        let other = offset_m(&ORIGIN, 7.0, -3.0);

        let fwd = bearing(&ORIGIN, &other);
        let back = bearing(&other, &ORIGIN);

        assert!((0.0..360.0).contains(&fwd));
        assert!((normalize_angle(back - fwd).abs() - 180.0).abs() < 1e-3);
    }

    #[test]
    fn test_distance() {
        let other = offset_m(&ORIGIN, 30.0, 40.0);

        assert_eq!(distance(&ORIGIN, &ORIGIN), 0.0);
        assert!((distance(&ORIGIN, &other) - distance(&other, &ORIGIN)).abs() < 1e-9);

        // Flat offsets and the haversine agree to within a fraction of a percent at this scale
        assert!((distance(&ORIGIN, &other) - 50.0).abs() < 0.5);

        // One degree of latitude along a meridian
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        assert!((distance(&a, &b) - 111_194.93).abs() < 0.1);
    }

    #[test]
    fn test_normalize_angle() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(190.0), -170.0);
        assert_eq!(normalize_angle(-190.0), 170.0);
        assert_eq!(normalize_angle(180.0), 180.0);
        assert_eq!(normalize_angle(-180.0), 180.0);
        assert_eq!(normalize_angle(540.0), 180.0);
        assert_eq!(normalize_angle(-45.0), -45.0);
        assert_eq!(normalize_angle(350.0), -10.0);
    }

    #[test]
    fn test_local_round_trip() {
        let p = offset_m(&ORIGIN, -12.5, 4.25);
        let v = local_m(&ORIGIN, &p);

        assert!((v.x + 12.5).abs() < 1e-9);
        assert!((v.y - 4.25).abs() < 1e-9);

        let (lat_scale, lon_scale) = local_scale(0.0);
        assert_eq!(lat_scale, M_PER_DEG_LAT);
        assert!((lon_scale - EARTH_CIRCUMFERENCE_M / 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_to_segment() {
        let a = offset_m(&ORIGIN, 0.0, 0.0);
        let b = offset_m(&ORIGIN, 0.0, 10.0);

        // Beside, beyond each end, and on the segment
        let d = distance_to_segment_m(&offset_m(&ORIGIN, 2.0, 5.0), &a, &b);
        assert!((d - 2.0).abs() < 1e-3);
        let d = distance_to_segment_m(&offset_m(&ORIGIN, 0.0, 13.0), &a, &b);
        assert!((d - 3.0).abs() < 1e-3);
        let d = distance_to_segment_m(&offset_m(&ORIGIN, -3.0, -4.0), &a, &b);
        assert!((d - 5.0).abs() < 1e-3);
        assert!(distance_to_segment_m(&offset_m(&ORIGIN, 0.0, 7.0), &a, &b) < 1e-3);

        // Degenerate segment
        let d = distance_to_segment_m(&offset_m(&ORIGIN, 1.0, 0.0), &a, &a);
        assert!((d - 1.0).abs() < 1e-3);
    }
}
