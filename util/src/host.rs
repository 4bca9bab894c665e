//! Host platform (linux for example) utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the root of the mower software tree. Parameter files are
/// looked up in `$MOWER_SW_ROOT/params` and sessions are created beneath it.
pub const SW_ROOT_ENV_VAR: &str = "MOWER_SW_ROOT";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable ({0}) is not set")]
    SwRootNotSet(&'static str),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Retrieve uname information.
pub fn get_uname() -> std::io::Result<uname::Info> {
    uname::uname()
}

/// Get the root directory of the software tree from the environment.
pub fn get_mower_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var_os(SW_ROOT_ENV_VAR) {
        Some(p) => Ok(PathBuf::from(p)),
        None => Err(HostError::SwRootNotSet(SW_ROOT_ENV_VAR)),
    }
}
