//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::*;
use crate::{
    auto::{
        boundary::Boundary,
        geo::{self, GeoPoint},
        path::Path,
    },
    mech::MechError,
};
use mow_if::eqpt::DriveCmd;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Archive file for the status reports, relative to the session archive root.
const STATUS_ARCH_PATH: &str = "traj_ctrl/status_report.csv";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The trajectory controller.
pub struct TrajCtrl {
    params: TrajCtrlParams,

    /// Executing mode
    mode: TrajCtrlMode,

    steering: SteeringCtrl,

    /// The path being followed
    path: Option<Path>,

    /// The boundary used as a fence while following
    fence: Option<Boundary>,

    /// Start of the leg being driven: the first fix of the path, then each reached waypoint
    leg_start: Option<GeoPoint>,

    last_position: Option<GeoPoint>,
    last_heading_deg: Option<f64>,

    /// The last command emitted, held while no new command is produced
    last_cmd: DriveCmd,

    output_cmd: Option<DriveCmd>,
    report: StatusReport,

    arch: Archiver,
}

/// Input data for one cycle of trajectory control.
#[derive(Debug, Default, Copy, Clone)]
pub struct TrajCtrlInput {
    /// Most recent position fix, if there is one
    pub position: Option<GeoPoint>,

    /// Most recent heading in degrees, if there is one
    pub heading_deg: Option<f64>,
}

/// The status report containing various error flags and monitoring quantities.
///
/// Fields are flat so that each report archives as one CSV row.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// The mode at the end of the cycle
    pub mode: &'static str,

    /// Index of the target waypoint
    pub target_index: Option<usize>,

    /// Distance to the target waypoint
    pub dist_to_target_m: Option<f64>,

    /// Bearing from the position to the target waypoint
    pub target_bearing_deg: Option<f64>,

    /// Heading used this cycle
    pub heading_deg: Option<f64>,

    /// Signed heading error in (-180, 180], positive if the target is clockwise of the heading
    pub heading_error_deg: Option<f64>,

    /// Normalised steering correction
    pub correction: Option<f64>,

    /// Command emitted this cycle, if any
    pub cmd_left: Option<f64>,
    pub cmd_right: Option<f64>,

    /// True if no position was available and the cycle was skipped
    pub no_fix: bool,

    /// True if no heading was available and the cycle was skipped
    pub no_heading: bool,

    /// True if the target waypoint was reached this cycle
    pub waypoint_reached: bool,

    /// Distance outside the boundary, if the fence is checked
    pub fence_dist_m: Option<f64>,

    /// Distance from the current leg, if the mower is outside the boundary
    pub leg_dist_m: Option<f64>,

    /// True if the fence margin was exceeded
    pub fence_breach: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(params::LoadError),

    #[error("Could not initialise the status archive: {0}")]
    ArchiveError(ArchiveError),

    /// Attempted to follow a path with no waypoints.
    #[error("Attempted to follow an empty path")]
    EmptyPath,

    /// A path is already being followed. Abort it before starting a new one.
    #[error("Attempted to start a path while one is already being followed")]
    SessionInProgress,

    /// The operation was cancelled by the operator.
    #[error("Aborted")]
    Aborted,

    /// A turn in place didn't reach its target in time.
    #[error("Turn in place timed out {remaining_deg:.1} degrees from the target")]
    TurnTimeout { remaining_deg: f64 },

    #[error("Actuator error: {0}")]
    Mech(#[from] MechError),
}

/// The possible modes of execution of TrajCtrl. Each mode is handled by a
/// `mode_xyz` function.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrajCtrlMode {
    /// No path loaded
    Idle,

    /// Driving towards the waypoint with the given index
    Seeking(usize),

    /// The last waypoint has been reached
    Arrived,

    /// The path was abandoned
    Aborted,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrajCtrl {
    fn default() -> Self {
        Self::new(TrajCtrlParams::default())
    }
}

impl State for TrajCtrl {
    type InitData = &'static str;
    type InitError = TrajCtrlError;

    type InputData = TrajCtrlInput;
    type OutputData = Option<DriveCmd>;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    /// Intiailise the TrajCtrl module.
    ///
    /// Expected init data is a path to the parameter file. The status reports of every cycle are
    /// archived in the session.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        let params: TrajCtrlParams =
            params::load(init_data).map_err(TrajCtrlError::ParamLoadError)?;

        self.arch =
            Archiver::from_path(session, STATUS_ARCH_PATH).map_err(TrajCtrlError::ArchiveError)?;
        self.steering = SteeringCtrl::new(&params);
        self.params = params;

        debug!("TrajCtrl parameters: {:?}", self.params);

        Ok(())
    }

    /// Process trajectory control.
    ///
    /// Returns the drive command to apply this cycle, or `None` if the previous command should be
    /// held.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Setup cycle data
        self.output_cmd = None;
        self.report = StatusReport::default();

        if let Some(p) = input_data.position {
            self.last_position = Some(p);
        }
        if let Some(h) = input_data.heading_deg {
            self.last_heading_deg = Some(h);
        }

        match self.mode {
            TrajCtrlMode::Seeking(i) => self.mode_seeking(i, input_data),
            TrajCtrlMode::Idle | TrajCtrlMode::Arrived | TrajCtrlMode::Aborted => (),
        }

        if let Some(cmd) = self.output_cmd {
            self.last_cmd = cmd;
            self.report.cmd_left = Some(cmd.left);
            self.report.cmd_right = Some(cmd.right);
        }
        self.report.mode = self.mode.name();

        if self.arch.is_active() {
            if let Err(e) = self.write() {
                warn!("Could not archive TrajCtrl status: {}", e);
            }
        }

        Ok((self.output_cmd, self.report))
    }
}

impl Archived for TrajCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch.serialise(self.report)
    }
}

impl TrajCtrl {
    /// Create a new controller with the given parameters and no archiving.
    pub fn new(params: TrajCtrlParams) -> Self {
        Self {
            steering: SteeringCtrl::new(&params),
            params,
            mode: TrajCtrlMode::Idle,
            path: None,
            fence: None,
            leg_start: None,
            last_position: None,
            last_heading_deg: None,
            last_cmd: DriveCmd::STOP,
            output_cmd: None,
            report: StatusReport::default(),
            arch: Archiver::default(),
        }
    }

    /// Begin following a path.
    ///
    /// Execution begins on the next call to `proc`, targeting the first waypoint. Starting a new
    /// path while one is being followed is an error, to stop a path whilst it's executing you
    /// must call `abort`.
    pub fn start(&mut self, path: Path) -> Result<(), TrajCtrlError> {
        if let TrajCtrlMode::Seeking(_) = self.mode {
            return Err(TrajCtrlError::SessionInProgress);
        }

        if path.is_empty() {
            return Err(TrajCtrlError::EmptyPath);
        }

        info!(
            "Starting path of {} waypoints ({:.1} m)",
            path.get_num_points(),
            path.length_m()
        );

        self.path = Some(path);
        self.leg_start = None;
        self.last_position = None;
        self.last_heading_deg = None;
        self.last_cmd = DriveCmd::STOP;
        self.report = StatusReport::default();
        self.mode = TrajCtrlMode::Seeking(0);

        Ok(())
    }

    /// Abandon the current path.
    ///
    /// Always succeeds, returning the stop command which must be applied immediately.
    pub fn abort(&mut self) -> DriveCmd {
        if self.mode != TrajCtrlMode::Aborted {
            warn!("TrajCtrl aborted in mode {:?}", self.mode);
        }

        self.mode = TrajCtrlMode::Aborted;
        self.last_cmd = DriveCmd::STOP;

        DriveCmd::STOP
    }

    /// Set the boundary used to check the mower stays inside the area.
    pub fn set_fence(&mut self, fence: Option<Boundary>) {
        self.fence = fence;
    }

    pub fn mode(&self) -> TrajCtrlMode {
        self.mode
    }

    pub fn params(&self) -> &TrajCtrlParams {
        &self.params
    }

    /// The last command emitted.
    pub fn last_cmd(&self) -> DriveCmd {
        self.last_cmd
    }

    pub fn last_position(&self) -> Option<GeoPoint> {
        self.last_position
    }

    pub fn last_heading_deg(&self) -> Option<f64> {
        self.last_heading_deg
    }

    /// The report from the last cycle.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    fn mode_seeking(&mut self, index: usize, input: &TrajCtrlInput) {
        let path = match self.path {
            Some(ref p) => p,
            None => {
                self.mode = TrajCtrlMode::Idle;
                return;
            }
        };
        let num_points = path.get_num_points();

        self.report.target_index = Some(index);

        // Without a fix the cycle is skipped and the last command held
        let position = match input.position {
            Some(p) => p,
            None => {
                self.report.no_fix = true;
                return;
            }
        };

        let leg_start = *self.leg_start.get_or_insert(position);

        // Fence check. Outside the boundary the mower must be on the leg it was sent along.
        if let (Some(fence), policy) = (&self.fence, self.params.fence_policy) {
            if policy != FencePolicy::Ignore {
                let margin_m = self.params.fence_margin_m;
                let outside_m = fence.distance_outside_m(&position);
                self.report.fence_dist_m = Some(outside_m);

                let off_leg = outside_m > margin_m && {
                    let leg_dist_m = path
                        .get(index)
                        .map(|t| geo::distance_to_segment_m(&position, &leg_start, t))
                        .unwrap_or(outside_m);
                    self.report.leg_dist_m = Some(leg_dist_m);

                    leg_dist_m > margin_m
                };

                if off_leg {
                    self.report.fence_breach = true;

                    match policy {
                        FencePolicy::Abort => {
                            warn!(
                                "Mower is {:.2} m outside the boundary, aborting path",
                                outside_m
                            );
                            self.output_cmd = Some(self.abort());
                            return;
                        }
                        _ => warn!("Mower is {:.2} m outside the boundary", outside_m),
                    }
                }
            }
        }

        let target = match path.get(index) {
            Some(t) => *t,
            None => {
                self.mode = TrajCtrlMode::Arrived;
                self.output_cmd = Some(DriveCmd::STOP);
                return;
            }
        };

        let dist_m = geo::distance(&position, &target);
        self.report.dist_to_target_m = Some(dist_m);

        // Arrival, advance the target. The command is held on this cycle.
        if dist_m < self.params.arrival_threshold_m {
            self.report.waypoint_reached = true;

            let next = index + 1;
            if next >= num_points {
                info!("Final waypoint {} reached", index);
                self.mode = TrajCtrlMode::Arrived;
                self.output_cmd = Some(DriveCmd::STOP);
            } else {
                debug!("Waypoint {} reached, targeting {}", index, next);
                self.mode = TrajCtrlMode::Seeking(next);
                self.leg_start = Some(target);
            }

            return;
        }

        let target_bearing_deg = geo::bearing(&position, &target);
        self.report.target_bearing_deg = Some(target_bearing_deg);

        let heading_deg = match input.heading_deg {
            Some(h) => h,
            None => {
                self.report.no_heading = true;
                return;
            }
        };
        self.report.heading_deg = Some(heading_deg);

        let heading_error_deg = geo::normalize_angle(target_bearing_deg - heading_deg);
        self.report.heading_error_deg = Some(heading_error_deg);

        let (cmd, correction) = self.steering.drive_cmd(heading_error_deg);
        self.report.correction = Some(correction);
        self.output_cmd = Some(cmd);
    }
}

impl TrajCtrlMode {
    /// Short name used in the status archive.
    pub fn name(&self) -> &'static str {
        match self {
            TrajCtrlMode::Idle => "Idle",
            TrajCtrlMode::Seeking(_) => "Seeking",
            TrajCtrlMode::Arrived => "Arrived",
            TrajCtrlMode::Aborted => "Aborted",
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

    fn two_point_path() -> Path {
        Path::new(vec![
            geo::offset_m(&ORIGIN, 0.0, 5.0),
            geo::offset_m(&ORIGIN, 5.0, 5.0),
        ])
    }

    fn input(east_m: f64, north_m: f64, heading_deg: f64) -> TrajCtrlInput {
        TrajCtrlInput {
            position: Some(geo::offset_m(&ORIGIN, east_m, north_m)),
            heading_deg: Some(heading_deg),
        }
    }

    #[test]
    fn test_start_errors() {
        let mut tc = TrajCtrl::default();

        assert!(matches!(
            tc.start(Path::new_empty()),
            Err(TrajCtrlError::EmptyPath)
        ));
        assert_eq!(tc.mode(), TrajCtrlMode::Idle);

        tc.start(two_point_path()).unwrap();
        assert_eq!(tc.mode(), TrajCtrlMode::Seeking(0));
        assert!(matches!(
            tc.start(two_point_path()),
            Err(TrajCtrlError::SessionInProgress)
        ));

        // After an abort a new path may be started
        assert!(tc.abort().is_stop());
        assert_eq!(tc.mode(), TrajCtrlMode::Aborted);
        tc.start(two_point_path()).unwrap();
        assert_eq!(tc.mode(), TrajCtrlMode::Seeking(0));
    }

    #[test]
    fn test_sequence_single_stop() {
        let mut tc = TrajCtrl::default();
        tc.start(two_point_path()).unwrap();

        let mut stops = 0;
        let mut run = |tc: &mut TrajCtrl, i: TrajCtrlInput| {
            let (cmd, report) = tc.proc(&i).unwrap();
            if cmd.map(|c| c.is_stop()).unwrap_or(false) {
                stops += 1;
            }
            (cmd, report)
        };

        // Heading north towards the first waypoint
        let (cmd, report) = run(&mut tc, input(0.0, 0.0, 0.0));
        assert_eq!(tc.mode(), TrajCtrlMode::Seeking(0));
        let cmd = cmd.unwrap();
        assert!((cmd.left - cmd.right).abs() < 1e-6);
        assert!(report.heading_error_deg.unwrap().abs() < 1e-3);

        // Reach the first waypoint, the command is held
        let (cmd, report) = run(&mut tc, input(0.0, 4.9, 0.0));
        assert!(cmd.is_none());
        assert!(report.waypoint_reached);
        assert_eq!(tc.mode(), TrajCtrlMode::Seeking(1));

        // Second waypoint lies to the east, steer right
        let (cmd, report) = run(&mut tc, input(0.0, 5.0, 0.0));
        let cmd = cmd.unwrap();
        assert!(cmd.left > cmd.right);
        assert!((report.heading_error_deg.unwrap() - 90.0).abs() < 0.1);

        // Arrive
        let (cmd, _) = run(&mut tc, input(4.9, 5.0, 90.0));
        assert!(cmd.unwrap().is_stop());
        assert_eq!(tc.mode(), TrajCtrlMode::Arrived);

        // Nothing more is emitted
        let (cmd, report) = run(&mut tc, input(4.9, 5.0, 90.0));
        assert!(cmd.is_none());
        assert_eq!(report.mode, "Arrived");

        assert_eq!(stops, 1);
    }

    #[test]
    fn test_missing_inputs_hold() {
        let mut tc = TrajCtrl::default();
        tc.start(two_point_path()).unwrap();

        let (cmd, report) = tc.proc(&TrajCtrlInput::default()).unwrap();
        assert!(cmd.is_none());
        assert!(report.no_fix);
        assert_eq!(tc.mode(), TrajCtrlMode::Seeking(0));

        let (cmd, report) = tc
            .proc(&TrajCtrlInput {
                position: Some(ORIGIN),
                heading_deg: None,
            })
            .unwrap();
        assert!(cmd.is_none());
        assert!(report.no_heading);
        assert!(report.target_bearing_deg.is_some());
    }

    #[test]
    fn test_one_waypoint_per_cycle() {
        // All waypoints within the threshold of the position
        let mut tc = TrajCtrl::default();
        tc.start(Path::new(vec![ORIGIN, ORIGIN, ORIGIN])).unwrap();

        let i = input(0.0, 0.0, 0.0);
        tc.proc(&i).unwrap();
        assert_eq!(tc.mode(), TrajCtrlMode::Seeking(1));
        tc.proc(&i).unwrap();
        assert_eq!(tc.mode(), TrajCtrlMode::Seeking(2));
        let (cmd, _) = tc.proc(&i).unwrap();
        assert_eq!(tc.mode(), TrajCtrlMode::Arrived);
        assert!(cmd.unwrap().is_stop());
    }

    #[test]
    fn test_fence_policy() {
        let fence = Boundary::new(vec![
            ORIGIN,
            geo::offset_m(&ORIGIN, 10.0, 0.0),
            geo::offset_m(&ORIGIN, 10.0, 10.0),
            geo::offset_m(&ORIGIN, 5.0, 12.0),
            geo::offset_m(&ORIGIN, 0.0, 10.0),
        ])
        .unwrap();

        // Within the margin carries on
        let mut tc = TrajCtrl::default();
        tc.set_fence(Some(fence.clone()));
        tc.start(two_point_path()).unwrap();
        let (cmd, report) = tc.proc(&input(-0.2, 2.0, 0.0)).unwrap();
        assert!(!report.fence_breach);
        assert!(!cmd.unwrap().is_stop());

        // Beyond it aborts
        let (cmd, report) = tc.proc(&input(-2.0, 2.0, 0.0)).unwrap();
        assert!(report.fence_breach);
        assert!(cmd.unwrap().is_stop());
        assert_eq!(tc.mode(), TrajCtrlMode::Aborted);

        // Warn only
        let mut tc = TrajCtrl::new(TrajCtrlParams {
            fence_policy: FencePolicy::Warn,
            ..Default::default()
        });
        tc.set_fence(Some(fence));
        tc.start(two_point_path()).unwrap();
        tc.proc(&input(1.0, 2.0, 0.0)).unwrap();
        let (cmd, report) = tc.proc(&input(-2.0, 2.0, 0.0)).unwrap();
        assert!(report.fence_breach);
        assert!(!cmd.unwrap().is_stop());
        assert_eq!(tc.mode(), TrajCtrlMode::Seeking(0));
    }

    #[test]
    fn test_fence_allows_planned_crossing() {
        // C shape, the gap between the arms is outside
        let fence = Boundary::new(
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

        let mut tc = TrajCtrl::default();
        tc.set_fence(Some(fence));
        tc.start(Path::new(vec![
            geo::offset_m(&ORIGIN, 20.0, 2.0),
            geo::offset_m(&ORIGIN, 20.0, 8.0),
        ]))
        .unwrap();

        tc.proc(&input(20.0, 1.0, 0.0)).unwrap();
        tc.proc(&input(20.0, 1.9, 0.0)).unwrap();
        assert_eq!(tc.mode(), TrajCtrlMode::Seeking(1));

        // Crossing the gap along the leg
        let (cmd, report) = tc.proc(&input(20.2, 5.0, 0.0)).unwrap();
        assert!(report.fence_dist_m.unwrap() > 1.9);
        assert!(report.leg_dist_m.unwrap() < 0.25);
        assert!(!report.fence_breach);
        assert!(!cmd.unwrap().is_stop());
        assert_eq!(tc.mode(), TrajCtrlMode::Seeking(1));

        // Wandering off the leg in the gap
        let (cmd, report) = tc.proc(&input(21.0, 5.0, 0.0)).unwrap();
        assert!(report.fence_breach);
        assert!(cmd.unwrap().is_stop());
        assert_eq!(tc.mode(), TrajCtrlMode::Aborted);
    }
}
