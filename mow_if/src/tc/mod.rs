//! # Telecommands
//!
//! The commands the mower exec accepts. They are parsed from the command line with structopt.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;
use structopt::{clap::AppSettings, StructOpt};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command that can be performed by the mower exec.
#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "mow_exec", about = "Autonomous mower navigation")]
pub enum MowCmd {
    /// Plan a coverage path over a recorded boundary and save it.
    #[structopt(name = "plan")]
    Plan {
        /// The boundary file (one `longitude,latitude` pair per line)
        #[structopt(parse(from_os_str))]
        boundary: PathBuf,

        /// Where to write the path file. Defaults to `path.txt` in the session directory.
        #[structopt(long, parse(from_os_str))]
        out: Option<PathBuf>,

        /// Separation between sweep lines in meters, overriding the parameter file.
        #[structopt(long)]
        spacing_m: Option<f64>,

        /// The start position as `LON LAT` in decimal degrees. If not given the latest GNSS fix
        /// is used.
        #[structopt(long, number_of_values = 2, allow_hyphen_values = true)]
        start: Option<Vec<f64>>,
    },

    /// Plan a coverage path over a recorded boundary and drive it.
    #[structopt(name = "follow")]
    Follow {
        /// The boundary file (one `longitude,latitude` pair per line)
        #[structopt(parse(from_os_str))]
        boundary: PathBuf,

        /// Separation between sweep lines in meters, overriding the parameter file.
        #[structopt(long)]
        spacing_m: Option<f64>,

        /// Drive a simulated rover instead of the hardware.
        #[structopt(long)]
        sim: bool,
    },

    /// Record a boundary by driving the perimeter, appending each new fix to the given file.
    #[structopt(name = "record")]
    Record {
        /// The boundary file to write
        #[structopt(parse(from_os_str))]
        out: PathBuf,
    },

    /// Turn on the spot by the given relative angle (positive is clockwise).
    #[structopt(name = "turn", setting = AppSettings::AllowNegativeNumbers)]
    Turn {
        /// The relative angle to turn through in degrees
        angle_deg: f64,

        /// Turn a simulated rover instead of the hardware.
        #[structopt(long)]
        sim: bool,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let cmd = MowCmd::from_iter_safe(&[
            "mow_exec", "plan", "lawn.txt", "--spacing-m", "0.4", "--start", "-74.46", "40.52",
        ])
        .unwrap();

        match cmd {
            MowCmd::Plan {
                boundary,
                out,
                spacing_m,
                start,
            } => {
                assert_eq!(boundary, PathBuf::from("lawn.txt"));
                assert!(out.is_none());
                assert_eq!(spacing_m, Some(0.4));
                assert_eq!(start, Some(vec![-74.46, 40.52]));
            }
            c => panic!("Unexpected command {:?}", c),
        }
    }

    #[test]
    fn test_parse_turn_negative() {
        let cmd = MowCmd::from_iter_safe(&["mow_exec", "turn", "-90", "--sim"]).unwrap();
        match cmd {
            MowCmd::Turn { angle_deg, sim } => {
                assert_eq!(angle_deg, -90.0);
                assert!(sim);
            }
            c => panic!("Unexpected command {:?}", c),
        }

        let cmd = MowCmd::from_iter_safe(&["mow_exec", "turn", "--sim", "-12.5"]).unwrap();
        assert!(matches!(cmd, MowCmd::Turn { angle_deg, sim: true } if angle_deg == -12.5));

        // Flags are still flags
        assert!(MowCmd::from_iter_safe(&["mow_exec", "turn", "90", "--bogus"]).is_err());
    }
}
