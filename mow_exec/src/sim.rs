//! # Simulated rover
//!
//! A kinematic model of the mower's differential drive. It stands in for the GNSS feed, the
//! heading source and the motors, so that whole plans can be driven without hardware.
//!
//! Time only advances when the model is asked to sleep through its [`Clock`] implementation,
//! which makes every run deterministic.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::Vector2;
use serde::Deserialize;

use crate::{
    auto::{
        geo::{self, GeoPoint},
        loc::{HeadingSource, LocError, PositionSource},
    },
    mech::{Actuator, MechError},
};
use mow_if::eqpt::{drive::saturate, DriveCmd};
use util::{maths::wrap_360, time::Clock};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of recent drive commands kept in the log.
pub const DRIVE_LOG_LEN: usize = 1024;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated rover.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SimParams {
    /// Ground speed of a side at full demand
    pub max_speed_ms: f64,

    /// Distance between the left and right wheels
    pub track_width_m: f64,

    /// Integration step
    pub dt_s: f64,

    /// Drop `dropout_len` fixes out of every `dropout_every` position reads. Zero disables.
    pub dropout_every: usize,
    pub dropout_len: usize,
}

/// The simulated rover.
#[derive(Debug, Clone)]
pub struct SimRover {
    params: SimParams,

    /// Reference point of the local frame
    origin: GeoPoint,

    /// Position east and north of the origin
    position_m: Vector2<f64>,

    heading_deg: f64,
    time_s: f64,

    cmd: DriveCmd,
    blade: f64,

    drive_log: Vec<DriveCmd>,
    num_drives: usize,
    num_stops: usize,
    num_reads: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            max_speed_ms: 0.5,
            track_width_m: 0.4,
            dt_s: 0.02,
            dropout_every: 0,
            dropout_len: 0,
        }
    }
}

impl SimRover {
    /// Create a new rover at rest at the given position and heading.
    pub fn new(position: GeoPoint, heading_deg: f64, params: SimParams) -> Self {
        Self {
            params,
            origin: position,
            position_m: Vector2::zeros(),
            heading_deg: wrap_360(heading_deg),
            time_s: 0.0,
            cmd: DriveCmd::STOP,
            blade: 0.0,
            drive_log: Vec::with_capacity(2 * DRIVE_LOG_LEN),
            num_drives: 0,
            num_stops: 0,
            num_reads: 0,
        }
    }

    /// The true position, unaffected by drop outs.
    pub fn position(&self) -> GeoPoint {
        geo::offset_m(&self.origin, self.position_m.x, self.position_m.y)
    }

    /// The most recent drive commands received, in order. At least the last `DRIVE_LOG_LEN`
    /// are kept.
    pub fn drive_log(&self) -> &[DriveCmd] {
        &self.drive_log
    }

    /// Number of drive commands received since creation.
    pub fn num_drives(&self) -> usize {
        self.num_drives
    }

    /// The drive command currently applied.
    pub fn last_drive(&self) -> DriveCmd {
        self.cmd
    }

    pub fn blade(&self) -> f64 {
        self.blade
    }

    /// Number of times the rover has been told to stop.
    pub fn num_stops(&self) -> usize {
        self.num_stops
    }

    /// Advance the model by `dt_s`.
    fn step(&mut self, dt_s: f64) {
        let l = self.cmd.left * self.params.max_speed_ms;
        let r = self.cmd.right * self.params.max_speed_ms;

        let speed_ms = (l + r) / 2.0;
        let yaw_rate_dps = ((l - r) / self.params.track_width_m).to_degrees();

        // Midpoint heading over the step
        let mid_heading = (self.heading_deg + 0.5 * yaw_rate_dps * dt_s).to_radians();
        self.position_m += Vector2::new(mid_heading.sin(), mid_heading.cos()) * speed_ms * dt_s;
        self.heading_deg = wrap_360(self.heading_deg + yaw_rate_dps * dt_s);
        self.time_s += dt_s;
    }
}

impl PositionSource for SimRover {
    fn latest_fix(&mut self) -> Result<GeoPoint, LocError> {
        let read = self.num_reads;
        self.num_reads += 1;

        let every = self.params.dropout_every;
        if every > 0 && read % every < self.params.dropout_len {
            return Err(LocError::NoFixAvailable);
        }

        Ok(self.position())
    }
}

impl HeadingSource for SimRover {
    fn heading_deg(&mut self) -> Option<f64> {
        Some(self.heading_deg)
    }
}

impl Actuator for SimRover {
    fn set_drive(&mut self, cmd: DriveCmd) -> Result<(), MechError> {
        self.cmd = DriveCmd::new(cmd.left, cmd.right);
        if self.drive_log.len() >= 2 * DRIVE_LOG_LEN {
            self.drive_log.drain(..DRIVE_LOG_LEN);
        }
        self.drive_log.push(self.cmd);
        self.num_drives += 1;
        Ok(())
    }

    fn set_blade(&mut self, speed: f64) -> Result<(), MechError> {
        self.blade = saturate(speed);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MechError> {
        trace!("Sim stop at t = {:.2} s", self.time_s);
        self.cmd = DriveCmd::STOP;
        self.blade = 0.0;
        self.num_stops += 1;
        Ok(())
    }
}

impl Clock for SimRover {
    fn now_s(&self) -> f64 {
        self.time_s
    }

    fn sleep_s(&mut self, secs: f64) {
        if !secs.is_finite() || secs <= 0.0 {
            return;
        }

        let dt = if self.params.dt_s > 0.0 {
            self.params.dt_s
        } else {
            secs
        };

        let mut remaining = secs;
        while remaining > 1e-12 {
            let h = remaining.min(dt);
            self.step(h);
            remaining -= h;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ORIGIN: GeoPoint = GeoPoint {
        lon: -74.4612,
        lat: 40.5218,
    };

    #[test]
    fn test_straight_line() {
        let mut sim = SimRover::new(ORIGIN, 90.0, SimParams::default());
        sim.set_drive(DriveCmd::new(1.0, 1.0)).unwrap();
        sim.sleep_s(2.0);

        // 1 m east
        let v = geo::local_m(&ORIGIN, &sim.latest_fix().unwrap());
        assert!((v.x - 1.0).abs() < 1e-6);
        assert!(v.y.abs() < 1e-6);
        assert!((sim.now_s() - 2.0).abs() < 1e-9);
        assert_eq!(sim.heading_deg(), Some(90.0));
    }

    #[test]
    fn test_spin_clockwise() {
        let mut sim = SimRover::new(ORIGIN, 0.0, SimParams::default());
        sim.set_drive(DriveCmd::spin(0.4, true)).unwrap();

        // 0.4 * 0.5 * 2 / 0.4 = 1 rad/s
        sim.sleep_s(0.5);
        let h = sim.heading_deg().unwrap();
        assert!((h - 0.5f64.to_degrees()).abs() < 1e-9);

        // No translation
        assert!(geo::local_m(&ORIGIN, &sim.position()).norm() < 1e-9);
    }

    #[test]
    fn test_dropouts_and_log() {
        let params = SimParams {
            dropout_every: 4,
            dropout_len: 1,
            ..Default::default()
        };
        let mut sim = SimRover::new(ORIGIN, 0.0, params);

        let fixes: Vec<bool> = (0..8).map(|_| sim.latest_fix().is_ok()).collect();
        assert_eq!(
            fixes,
            vec![false, true, true, true, false, true, true, true]
        );

        sim.set_drive(DriveCmd::new(0.5, 0.2)).unwrap();
        sim.set_blade(0.3).unwrap();
        sim.stop().unwrap();
        assert_eq!(sim.drive_log(), &[DriveCmd::new(0.5, 0.2)]);
        assert_eq!(sim.num_stops(), 1);
        assert_eq!(sim.blade(), 0.0);
        assert!(sim.last_drive().is_stop());
    }

    #[test]
    fn test_drive_log_bounded() {
        let mut sim = SimRover::new(ORIGIN, 0.0, SimParams::default());

        let n = 5 * DRIVE_LOG_LEN + 3;
        for i in 0..n {
            sim.set_drive(DriveCmd::new(i as f64 / n as f64, 0.0)).unwrap();
        }

        assert_eq!(sim.num_drives(), n);
        assert!(sim.drive_log().len() >= DRIVE_LOG_LEN);
        assert!(sim.drive_log().len() <= 2 * DRIVE_LOG_LEN);
        assert_eq!(
            *sim.drive_log().last().unwrap(),
            DriveCmd::new((n - 1) as f64 / n as f64, 0.0)
        );
    }
}
