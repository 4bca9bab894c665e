//! # Mower library.
//!
//! This library allows the executable, the benches and other crates in the workspace to access
//! the items defined inside the mower crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomy - coverage planning, localisation and trajectory control
pub mod auto;

/// Mechanisms - converts drive and blade demands into motor driver outputs
pub mod mech;

/// Parameters of the executable
pub mod params;

/// Simulated rover - kinematic model used for dry runs and tests
pub mod sim;

/// Acquisition supervisor - keeps the GNSS acquisition process running
pub mod supervisor;
