//! Steering controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use mow_if::eqpt::DriveCmd;
use util::maths::clamp;

use super::TrajCtrlParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Proportional steering on the heading error.
#[derive(Debug, Clone)]
pub struct SteeringCtrl {
    base_speed: f64,
    max_correction: f64,
    full_scale_deg: f64,
    allow_reverse: bool,
    invert: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteeringCtrl {
    pub fn new(params: &TrajCtrlParams) -> Self {
        Self {
            base_speed: params.base_speed,
            max_correction: params.max_correction,
            full_scale_deg: params.heading_error_full_scale_deg,
            allow_reverse: params.allow_reverse_steering,
            invert: params.invert_steering,
        }
    }

    /// Normalised correction in [-1, 1] for a heading error in degrees.
    pub fn correction(&self, heading_error_deg: f64) -> f64 {
        if self.full_scale_deg <= 0.0 {
            return heading_error_deg.signum();
        }

        clamp(heading_error_deg / self.full_scale_deg, -1.0, 1.0)
    }

    /// Drive command for the given heading error, along with the correction used.
    ///
    /// A positive error means the target lies clockwise of the heading, so the left side is sped
    /// up and the right slowed down.
    pub fn drive_cmd(&self, heading_error_deg: f64) -> (DriveCmd, f64) {
        let correction = self.correction(heading_error_deg);

        let delta = if self.invert {
            -correction * self.max_correction
        } else {
            correction * self.max_correction
        };

        let min = if self.allow_reverse { -1.0 } else { 0.0 };

        let left = clamp(self.base_speed + delta, min, 1.0);
        let right = clamp(self.base_speed - delta, min, 1.0);

        (DriveCmd::new(left, right), correction)
    }
}
