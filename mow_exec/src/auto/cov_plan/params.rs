//! Coverage planner parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters for the coverage planner
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CovPlanParams {
    /// Separation between neighbouring sweep lines. Should be a little less than the cutting
    /// width so that strips overlap.
    pub sweep_spacing_m: f64,

    /// If true the sweep starts from the end of the area nearest the start position, otherwise it
    /// always starts from the minimum of the principal axis.
    pub start_near_entry: bool,
}

impl Default for CovPlanParams {
    fn default() -> Self {
        Self {
            sweep_spacing_m: 0.5,
            start_near_entry: true,
        }
    }
}
