//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TrajCtrlParams {
    /// Distance under which a waypoint is considered reached.
    pub arrival_threshold_m: f64,

    /// Drive demand applied to both sides before steering.
    pub base_speed: f64,

    /// Largest steering correction added to or removed from a side.
    pub max_correction: f64,

    /// Heading error which produces the full correction.
    pub heading_error_full_scale_deg: f64,

    /// If true the steering may drive a side backwards, otherwise sides are limited to [0, 1].
    pub allow_reverse_steering: bool,

    /// Reverse the sense of the steering and of turns in place. Needed if the heading source
    /// increases anticlockwise.
    pub invert_steering: bool,

    /// Heading errors above this are corrected by turning in place before driving on.
    pub align_threshold_deg: f64,

    /// A turn in place finishes once the heading is within this tolerance of the target.
    pub turn_tolerance_deg: f64,

    /// Drive demand for each side during a turn in place.
    pub turn_speed: f64,

    /// Period of the turn in place loop.
    pub turn_period_s: f64,

    /// Turns in place taking longer than this are abandoned.
    pub turn_timeout_s: f64,

    /// Action to take when the mower leaves the boundary.
    pub fence_policy: FencePolicy,

    /// Distance outside the boundary tolerated before the fence policy applies, to allow for
    /// position noise. The mower may also be further outside while it stays within this distance
    /// of the leg it is driving, which is how planned crossings of gaps in the lawn are made.
    pub fence_margin_m: f64,
}

/// Behaviour when the mower is found outside the boundary.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FencePolicy {
    /// Don't check the fence
    Ignore,

    /// Log a warning but carry on
    Warn,

    /// Abort the path and stop
    Abort,
}

impl Default for TrajCtrlParams {
    fn default() -> Self {
        Self {
            arrival_threshold_m: 0.25,
            base_speed: 0.3,
            max_correction: 0.1,
            heading_error_full_scale_deg: 45.0,
            allow_reverse_steering: false,
            invert_steering: false,
            align_threshold_deg: 45.0,
            turn_tolerance_deg: 3.0,
            turn_speed: 0.3,
            turn_period_s: 0.1,
            turn_timeout_s: 30.0,
            fence_policy: FencePolicy::Abort,
            fence_margin_m: 0.5,
        }
    }
}

impl Default for FencePolicy {
    fn default() -> Self {
        FencePolicy::Abort
    }
}
