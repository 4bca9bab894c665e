//! Mechanisms parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pin assignments (BCM numbering) and scaling of the motor drivers.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MechParams {
    pub left_pwm_pin: u8,
    pub left_dir_pin: u8,

    pub right_pwm_pin: u8,
    pub right_dir_pin: u8,

    pub blade_pwm_pin: u8,
    pub blade_fwd_pin: u8,
    pub blade_rev_pin: u8,

    /// Software PWM frequency
    pub pwm_frequency_hz: f64,

    /// Duty applied to the smallest non-zero drive demand, to overcome motor stiction
    pub min_duty: f64,

    /// Scale applied to the left drive demand
    pub left_trim: f64,

    /// Scale applied to the right drive demand. The right motor on the mower runs faster than
    /// the left.
    pub right_trim: f64,
}

impl Default for MechParams {
    fn default() -> Self {
        Self {
            left_pwm_pin: 21,
            left_dir_pin: 20,
            right_pwm_pin: 6,
            right_dir_pin: 5,
            blade_pwm_pin: 11,
            blade_fwd_pin: 9,
            blade_rev_pin: 10,
            pwm_frequency_hz: 100.0,
            min_duty: 0.0,
            left_trim: 1.0,
            right_trim: 0.93,
        }
    }
}
