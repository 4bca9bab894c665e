//! # Mower interface crate.
//!
//! Provides the interfaces shared between the navigation library, the exec and the equipment
//! adapters: actuator demands and the telecommands accepted on the command line.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command definitions for equipment (drive motors and blade)
pub mod eqpt;

/// Telecommands accepted by the exec
pub mod tc;
