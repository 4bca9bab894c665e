//! # Trajectory control module
//!
//! Trajectory control drives the mower along the planned path, one waypoint at a time.
//!
//! Each cycle the bearing from the current position to the target waypoint is compared with the
//! mower's heading. The resulting heading error is turned into a steering correction which is
//! added to one side's base speed and subtracted from the other's. When the mower comes within the
//! arrival threshold of the target the next waypoint becomes the target, and once the last
//! waypoint is reached the mower is stopped.
//!
//! Large heading errors (for example at the end of each sweep line, where the path doubles back)
//! are not handled by the steering law. Instead the mower is turned on the spot with
//! [`turn_in_place`] until it is roughly aligned with the target.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod abort;
pub mod controllers;
pub mod params;
pub mod state;
pub mod turn;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use abort::AbortSignal;
pub use controllers::SteeringCtrl;
pub use params::{FencePolicy, TrajCtrlParams};
pub use state::*;
pub use turn::turn_in_place;
