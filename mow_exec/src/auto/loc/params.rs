//! Localisation parameters

use serde::Deserialize;

/// Parameters for the position and heading feeds.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LocParams {
    /// Path to the GNSS feed file, relative paths are from the software root.
    pub gnss_feed_path: String,

    /// Path to the heading feed file, relative paths are from the software root.
    pub heading_feed_path: String,

    /// Data older than this is considered stale. Zero or less disables the check.
    pub max_fix_age_s: f64,

    /// Number of bytes read back from the end of a feed when searching for the latest record.
    pub tail_bytes: u64,
}

impl Default for LocParams {
    fn default() -> Self {
        Self {
            gnss_feed_path: String::from("assets/raw_gps.txt"),
            heading_feed_path: String::from("assets/heading.txt"),
            max_fix_age_s: 2.0,
            tail_bytes: 4096,
        }
    }
}
