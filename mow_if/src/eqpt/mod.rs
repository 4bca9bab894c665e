//! # Equipment interface definitions

pub mod drive;

pub use drive::DriveCmd;
