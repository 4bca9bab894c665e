//! # Follow manager
//!
//! Runs trajectory control against a rover: reads the position and heading, steps the
//! controller and applies its commands at a fixed rate, turning in place whenever the mower is
//! badly misaligned with its target. The blade runs for the whole of the path.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::Deserialize;

use super::{
    geo::GeoPoint,
    loc::{HeadingSource, LocError, PositionSource},
    path::Path,
    traj_ctrl::{turn_in_place, AbortSignal, TrajCtrl, TrajCtrlError, TrajCtrlInput, TrajCtrlMode},
};
use crate::mech::{Actuator, MechError};
use mow_if::eqpt::DriveCmd;
use util::{
    module::State,
    time::{Clock, WallClock},
};

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// Everything needed to drive the mower: position, heading, actuation and a clock to pace the
/// control loop.
pub trait Rover: PositionSource + HeadingSource + Actuator + Clock {}

impl<T> Rover for T where T: PositionSource + HeadingSource + Actuator + Clock {}

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Parameters of the follow manager.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FollowParams {
    /// Period of the control loop
    pub cycle_period_s: f64,

    /// Blade speed while following
    pub blade_speed: f64,
}

/// A real rover assembled from separate sources and an actuator, paced by the wall clock.
pub struct HwRover<P, H, A> {
    pub position: P,
    pub heading: H,
    pub actuator: A,
    clock: WallClock,
}

pub struct FollowMgr {
    params: FollowParams,
    traj_ctrl: TrajCtrl,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// Outcome of one cycle of the follow manager.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FollowStatus {
    /// Still following the path
    Running,

    /// Still following, a turn in place was made this cycle
    Aligned,

    /// The end of the path was reached
    Arrived,

    /// The path was abandoned
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    #[error("Trajectory control error: {0}")]
    TrajCtrl(#[from] TrajCtrlError),

    #[error("Actuator error: {0}")]
    Mech(#[from] MechError),

    #[error("No path is being followed")]
    NotStarted,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Default for FollowParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.1,
            blade_speed: 0.3,
        }
    }
}

impl<P, H, A> HwRover<P, H, A> {
    pub fn new(position: P, heading: H, actuator: A) -> Self {
        Self {
            position,
            heading,
            actuator,
            clock: WallClock::new(),
        }
    }
}

impl<P: PositionSource, H, A> PositionSource for HwRover<P, H, A> {
    fn latest_fix(&mut self) -> Result<GeoPoint, LocError> {
        self.position.latest_fix()
    }
}

impl<P, H: HeadingSource, A> HeadingSource for HwRover<P, H, A> {
    fn heading_deg(&mut self) -> Option<f64> {
        self.heading.heading_deg()
    }
}

impl<P, H, A: Actuator> Actuator for HwRover<P, H, A> {
    fn set_drive(&mut self, cmd: DriveCmd) -> Result<(), MechError> {
        self.actuator.set_drive(cmd)
    }

    fn set_blade(&mut self, speed: f64) -> Result<(), MechError> {
        self.actuator.set_blade(speed)
    }

    fn stop(&mut self) -> Result<(), MechError> {
        self.actuator.stop()
    }
}

impl<P, H, A> Clock for HwRover<P, H, A> {
    fn now_s(&self) -> f64 {
        self.clock.now_s()
    }

    fn sleep_s(&mut self, secs: f64) {
        self.clock.sleep_s(secs)
    }
}

impl FollowMgr {
    pub fn new(traj_ctrl: TrajCtrl, params: FollowParams) -> Self {
        Self { params, traj_ctrl }
    }

    pub fn traj_ctrl(&self) -> &TrajCtrl {
        &self.traj_ctrl
    }

    /// Load the path into trajectory control and start the blade.
    pub fn start<R: Rover>(&mut self, path: Path, rover: &mut R) -> Result<(), FollowError> {
        self.traj_ctrl.start(path)?;
        rover.set_blade(self.params.blade_speed)?;

        Ok(())
    }

    /// Follow the path to its end, or until aborted.
    pub fn run<R: Rover>(
        &mut self,
        path: Path,
        rover: &mut R,
        abort: &AbortSignal,
    ) -> Result<FollowStatus, FollowError> {
        self.start(path, rover)?;

        loop {
            let cycle_start_s = rover.now_s();

            let status = match self.step(rover, abort) {
                Ok(s) => s,
                Err(e) => {
                    self.traj_ctrl.abort();
                    if let Err(se) = rover.stop() {
                        warn!("Could not stop the mower: {}", se);
                    }
                    return Err(e);
                }
            };

            match status {
                FollowStatus::Arrived | FollowStatus::Aborted => return Ok(status),
                FollowStatus::Aligned => continue,
                FollowStatus::Running => (),
            }

            // Wait for the end of the cycle
            let cycle_dur_s = rover.now_s() - cycle_start_s;
            match self.params.cycle_period_s - cycle_dur_s {
                d if d > 0.0 => rover.sleep_s(d),
                d => warn!("Cycle overran by {:.06} s", -d),
            }
        }
    }

    /// Run one cycle.
    pub fn step<R: Rover>(
        &mut self,
        rover: &mut R,
        abort: &AbortSignal,
    ) -> Result<FollowStatus, FollowError> {
        if abort.is_raised() {
            self.traj_ctrl.abort();
            rover.stop()?;
            return Ok(FollowStatus::Aborted);
        }

        let position = match rover.latest_fix() {
            Ok(p) => Some(p),
            Err(LocError::NoFixAvailable) => None,
            Err(e) => {
                warn!("{}", e);
                None
            }
        };
        let input = TrajCtrlInput {
            position,
            heading_deg: rover.heading_deg(),
        };

        let (cmd, report) = self.traj_ctrl.proc(&input)?;

        match self.traj_ctrl.mode() {
            TrajCtrlMode::Arrived => {
                info!("Path complete");
                rover.stop()?;
                return Ok(FollowStatus::Arrived);
            }
            TrajCtrlMode::Aborted => {
                rover.stop()?;
                return Ok(FollowStatus::Aborted);
            }
            TrajCtrlMode::Idle => return Err(FollowError::NotStarted),
            TrajCtrlMode::Seeking(_) => (),
        }

        let align_threshold_deg = self.traj_ctrl.params().align_threshold_deg;

        if let (Some(_), Some(error_deg)) = (cmd, report.heading_error_deg) {
            if error_deg.abs() > align_threshold_deg {
                debug!("Heading error {:.1} deg, turning in place", error_deg);

                return match turn_in_place(error_deg, rover, abort, self.traj_ctrl.params()) {
                    Ok(()) => Ok(FollowStatus::Aligned),
                    Err(TrajCtrlError::Aborted) => {
                        // The turn has already stopped the mower
                        self.traj_ctrl.abort();
                        Ok(FollowStatus::Aborted)
                    }
                    Err(TrajCtrlError::TurnTimeout { remaining_deg }) => {
                        warn!(
                            "Alignment abandoned {:.1} deg from the target, continuing",
                            remaining_deg
                        );
                        Ok(FollowStatus::Aligned)
                    }
                    Err(e) => Err(e.into()),
                };
            }
        }

        if let Some(cmd) = cmd {
            rover.set_drive(cmd)?;
        }

        Ok(FollowStatus::Running)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        auto::{boundary::Boundary, cov_plan, geo},
        sim::{SimParams, SimRover},
    };

    const ORIGIN: GeoPoint = GeoPoint {
        lon: -74.4612,
        lat: 40.5218,
    };

    fn lawn() -> Boundary {
        Boundary::new(
            [(0.0, 0.0), (6.0, 0.5), (7.0, 5.0), (3.0, 7.0), (-0.5, 4.0)]
                .iter()
                .map(|(e, n)| geo::offset_m(&ORIGIN, *e, *n))
                .collect(),
        )
        .unwrap()
    }

    fn mgr() -> FollowMgr {
        FollowMgr::new(TrajCtrl::default(), FollowParams::default())
    }

    /// Step the manager until it finishes, sleeping the rover between cycles.
    fn drive(mgr: &mut FollowMgr, sim: &mut SimRover, abort: &AbortSignal) -> FollowStatus {
        for _ in 0..50_000 {
            match mgr.step(sim, abort).unwrap() {
                FollowStatus::Running => sim.sleep_s(0.1),
                FollowStatus::Aligned => (),
                s => return s,
            }
        }
        panic!("Follow did not finish");
    }

    #[test]
    fn test_follow_planned_path() {
        let b = lawn();
        let start = geo::offset_m(&ORIGIN, 2.0, 2.0);
        let path = cov_plan::plan(&b, &start, 1.0).unwrap();
        let last = *path.points().last().unwrap();

        let params = SimParams {
            dropout_every: 10,
            dropout_len: 2,
            ..Default::default()
        };
        let mut sim = SimRover::new(start, 0.0, params);
        let abort = AbortSignal::new();

        let mut mgr = mgr();
        mgr.start(path, &mut sim).unwrap();
        assert_eq!(sim.blade(), 0.3);

        assert_eq!(drive(&mut mgr, &mut sim, &abort), FollowStatus::Arrived);
        assert_eq!(mgr.traj_ctrl().mode(), TrajCtrlMode::Arrived);
        assert!(geo::distance(&sim.position(), &last) < 0.5);
        assert!(sim.last_drive().is_stop());
        assert_eq!(sim.blade(), 0.0);

        // The mower never strayed far outside the lawn
        assert!(b.distance_outside_m(&sim.position()) < 0.5);
    }

    #[test]
    fn test_follow_c_shape_with_fence() {
        let b = Boundary::new(
            [
                (0.0, 0.0),
                (30.0, 0.0),
                (30.0, 3.0),
                (8.0, 3.0),
                (8.0, 7.0),
                (30.0, 7.0),
                (30.0, 10.0),
                (0.0, 10.0),
            ]
            .iter()
            .map(|(e, n)| geo::offset_m(&ORIGIN, *e, *n))
            .collect(),
        )
        .unwrap();
        let start = geo::offset_m(&ORIGIN, 2.0, 5.0);
        let path = cov_plan::plan(&b, &start, 1.5).unwrap();

        let mut traj_ctrl = TrajCtrl::default();
        traj_ctrl.set_fence(Some(b.clone()));
        let mut mgr = FollowMgr::new(traj_ctrl, FollowParams::default());

        let mut sim = SimRover::new(start, 0.0, SimParams::default());
        let abort = AbortSignal::new();
        mgr.start(path, &mut sim).unwrap();

        let mut max_outside_m: f64 = 0.0;
        let status = loop {
            match mgr.step(&mut sim, &abort).unwrap() {
                FollowStatus::Running => sim.sleep_s(0.1),
                FollowStatus::Aligned => (),
                s => break s,
            }
            max_outside_m = max_outside_m.max(b.distance_outside_m(&sim.position()));
            assert!(sim.now_s() < 20_000.0, "Follow did not finish");
        };

        assert_eq!(status, FollowStatus::Arrived);
        assert_eq!(mgr.traj_ctrl().mode(), TrajCtrlMode::Arrived);

        // The gap between the arms was crossed
        assert!(max_outside_m > 1.0);
    }

    #[test]
    fn test_abort() {
        let b = lawn();
        let start = geo::offset_m(&ORIGIN, 2.0, 2.0);
        let path = cov_plan::plan(&b, &start, 1.0).unwrap();

        let mut sim = SimRover::new(start, 0.0, SimParams::default());
        let abort = AbortSignal::new();

        let mut mgr = mgr();
        mgr.start(path, &mut sim).unwrap();
        for _ in 0..20 {
            mgr.step(&mut sim, &abort).unwrap();
            sim.sleep_s(0.1);
        }

        abort.raise();
        assert_eq!(mgr.step(&mut sim, &abort).unwrap(), FollowStatus::Aborted);
        assert_eq!(mgr.traj_ctrl().mode(), TrajCtrlMode::Aborted);
        assert!(sim.last_drive().is_stop());
        assert_eq!(sim.blade(), 0.0);
    }

    #[test]
    fn test_not_started() {
        let mut sim = SimRover::new(ORIGIN, 0.0, SimParams::default());
        assert!(matches!(
            mgr().step(&mut sim, &AbortSignal::new()),
            Err(FollowError::NotStarted)
        ));
    }

    #[test]
    fn test_run_to_completion() {
        let start = geo::offset_m(&ORIGIN, 1.0, 1.0);
        let path = Path::new(vec![
            geo::offset_m(&ORIGIN, 1.0, 3.0),
            geo::offset_m(&ORIGIN, 3.0, 3.0),
        ]);

        let mut sim = SimRover::new(start, 0.0, SimParams::default());
        let status = mgr().run(path, &mut sim, &AbortSignal::new()).unwrap();

        assert_eq!(status, FollowStatus::Arrived);
        assert_eq!(sim.num_stops(), 1);
    }
}
