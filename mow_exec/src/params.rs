//! # Mower Executable Parameters
//!
//! Parameters of the executable itself and of the components it assembles. Every section may be
//! left out of the file, in which case its defaults are used.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{
    auto::{follow::FollowParams, loc::LocParams, mapper::MapperParams},
    sim::SimParams,
    supervisor::{SupervisedCommand, SupervisorParams},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MowExecParams {
    /// Longest wait for a first position fix before giving up
    pub fix_timeout_s: f64,

    pub follow: FollowParams,

    pub mapper: MapperParams,

    pub loc: LocParams,

    pub sim: SimParams,

    pub supervisor: SupervisorParams,

    /// Acquisition process to run alongside the exec, usually the RTK GNSS reader
    pub acquisition: Option<SupervisedCommand>,
}

impl Default for MowExecParams {
    fn default() -> Self {
        Self {
            fix_timeout_s: 30.0,
            follow: FollowParams::default(),
            mapper: MapperParams::default(),
            loc: LocParams::default(),
            sim: SimParams::default(),
            supervisor: SupervisorParams::default(),
            acquisition: None,
        }
    }
}
