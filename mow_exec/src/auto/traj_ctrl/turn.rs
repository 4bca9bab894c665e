//! Turn in place manouvre

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace, warn};

use super::{AbortSignal, TrajCtrlError, TrajCtrlParams};
use crate::{
    auto::{geo::normalize_angle, loc::HeadingSource},
    mech::Actuator,
};
use mow_if::eqpt::DriveCmd;
use util::{maths::wrap_360, time::Clock};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Turn the mower on the spot through `rel_deg` degrees (positive is clockwise).
///
/// Blocks until the heading is within the turn tolerance of the target, the abort signal is
/// raised or the turn times out. The wheels are stopped in every case, an abort also stops the
/// blade. While no heading is available the mower waits where it is.
pub fn turn_in_place<R>(
    rel_deg: f64,
    rover: &mut R,
    abort: &AbortSignal,
    params: &TrajCtrlParams,
) -> Result<(), TrajCtrlError>
where
    R: HeadingSource + Actuator + Clock,
{
    let start_s = rover.now_s();
    let mut target_deg: Option<f64> = None;
    let mut last_error_deg = rel_deg;

    debug!("Turn in place by {:.1} deg", rel_deg);

    loop {
        if abort.is_raised() {
            rover.stop()?;
            return Err(TrajCtrlError::Aborted);
        }

        if rover.now_s() - start_s > params.turn_timeout_s {
            warn!(
                "Turn in place timed out {:.1} deg from the target",
                last_error_deg
            );
            rover.set_drive(DriveCmd::STOP)?;
            return Err(TrajCtrlError::TurnTimeout {
                remaining_deg: last_error_deg,
            });
        }

        if let Some(heading_deg) = rover.heading_deg() {
            let target = *target_deg.get_or_insert_with(|| wrap_360(heading_deg + rel_deg));
            let error_deg = normalize_angle(target - heading_deg);
            last_error_deg = error_deg;

            trace!("Turn: heading {:.1}, error {:.1}", heading_deg, error_deg);

            if error_deg.abs() <= params.turn_tolerance_deg {
                rover.set_drive(DriveCmd::STOP)?;
                debug!("Turn complete, heading {:.1}", heading_deg);
                return Ok(());
            }

            let clockwise = (error_deg > 0.0) != params.invert_steering;
            rover.set_drive(DriveCmd::spin(params.turn_speed, clockwise))?;
        }

        rover.sleep_s(params.turn_period_s);
    }
}
