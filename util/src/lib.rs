//! Utility library for the mower software.
//!
//! Holds the ambient services every executable in the workspace needs: logging, parameter
//! loading, session directories, CSV archives and a handful of maths helpers.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
#[macro_use]
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod time;
