//! # Drive Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A differential drive demand.
///
/// Each side is a normalised value in [-1, 1]: the sign gives the direction (positive is
/// forwards) and the magnitude the duty fraction applied to that side's motor.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct DriveCmd {
    /// Left side demand
    pub left: f64,

    /// Right side demand
    pub right: f64,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl DriveCmd {
    /// Both sides stopped.
    pub const STOP: DriveCmd = DriveCmd {
        left: 0.0,
        right: 0.0,
    };

    /// Create a new command, saturating both sides into [-1, 1].
    ///
    /// Non-finite demands are treated as zero.
    pub fn new(left: f64, right: f64) -> Self {
        Self {
            left: saturate(left),
            right: saturate(right),
        }
    }

    /// A turn on the spot at the given speed.
    ///
    /// A clockwise spin (viewed from above) drives the left side forwards and the right side
    /// backwards.
    pub fn spin(speed: f64, clockwise: bool) -> Self {
        let speed = saturate(speed).abs();
        if clockwise {
            Self::new(speed, -speed)
        } else {
            Self::new(-speed, speed)
        }
    }

    /// Returns true if both sides are at zero.
    pub fn is_stop(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

impl Default for DriveCmd {
    fn default() -> Self {
        Self::STOP
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Saturate a normalised demand into [-1, 1].
pub fn saturate(value: f64) -> f64 {
    if value.is_finite() {
        value.max(-1.0).min(1.0)
    } else {
        0.0
    }
}
