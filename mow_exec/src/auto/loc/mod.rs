//! # Localisation module
//!
//! Provides the mower with its position and heading. Position comes from an RTK GNSS receiver
//! whose NMEA output is appended to a feed file by a separate acquisition process. Heading comes
//! from a heading feed written the same way.
//!
//! Sources only ever report the most recent data. A missing or stale fix is reported as
//! `NoFixAvailable`, which consumers treat as a transient gap rather than a failure.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod feed;
pub mod nmea;
mod params;

pub use feed::{GnssFeed, HeadingFeed};
pub use params::LocParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use super::geo::GeoPoint;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of position fixes.
pub trait PositionSource {
    /// Get the most recent fix.
    fn latest_fix(&mut self) -> Result<GeoPoint, LocError>;
}

/// A source of heading measurements.
pub trait HeadingSource {
    /// Get the current heading in degrees in the range [0, 360), 0 being north and increasing
    /// clockwise. `None` if no heading is available.
    fn heading_deg(&mut self) -> Option<f64>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LocError {
    #[error("No position fix is available")]
    NoFixAvailable,

    #[error("Cannot read the feed {0:?}: {1}")]
    Io(PathBuf, std::io::Error),
}
