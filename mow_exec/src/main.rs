//! Main mower executable entry point.
//!
//! # Architecture
//!
//! The executable performs one command per run, chosen on the command line:
//!
//!     - `plan`: plan a coverage path over a boundary file and save it
//!     - `follow`: plan a coverage path and drive it, on the hardware or in simulation
//!     - `record`: record a boundary by driving the perimeter
//!     - `turn`: turn on the spot
//!
//! Typing `abort` (or `q`) on the standard input stops the mower at any point. When running on
//! the hardware the GNSS acquisition process, if configured, is supervised for the whole run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::{
    io::BufRead,
    path::{Path as FsPath, PathBuf},
    thread,
};
use structopt::StructOpt;

// Internal
use mow_if::tc::MowCmd;
use mow_lib::{
    auto::{
        cov_plan::CovPlanner,
        follow::{FollowMgr, FollowStatus, HwRover, Rover},
        loc::{GnssFeed, HeadingFeed, HeadingSource, LocError, PositionSource},
        mapper::BoundaryRecorder,
        traj_ctrl::{turn_in_place, AbortSignal, TrajCtrl},
        Boundary, GeoPoint, Path,
    },
    mech::{self, MechParams},
    params::MowExecParams,
    sim::SimRover,
    supervisor::ProcessSupervisor,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
    time::Clock,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the planned path file written to the session directory.
const PATH_FILE_NAME: &str = "path.txt";

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let cmd = MowCmd::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("mow_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Mower Navigation Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);
    info!("Command: {:?}", cmd);

    // ---- LOAD PARAMETERS ----

    let params: MowExecParams =
        util::params::load("mow_exec.toml").wrap_err("Could not load exec params")?;
    let mech_params: MechParams =
        util::params::load("mech.toml").wrap_err("Could not load mech params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let cov_planner = CovPlanner::init("cov_plan.toml").wrap_err("Failed to initialise CovPlan")?;
    info!("CovPlan init complete");

    let mut traj_ctrl = TrajCtrl::default();
    traj_ctrl
        .init("traj_ctrl.toml", &session)
        .wrap_err("Failed to initialise TrajCtrl")?;
    info!("TrajCtrl init complete");

    let abort = AbortSignal::new();
    spawn_operator_input(abort.clone()).wrap_err("Failed to start the operator input thread")?;

    // ---- ACQUISITION ----

    let uses_hardware = match cmd {
        MowCmd::Plan { ref start, .. } => start.is_none(),
        MowCmd::Follow { sim, .. } | MowCmd::Turn { sim, .. } => !sim,
        MowCmd::Record { .. } => true,
    };

    let mut supervisor = match (&params.acquisition, uses_hardware) {
        (Some(acq), true) => {
            info!("Supervising acquisition process {}", acq.program);
            Some(
                ProcessSupervisor::spawn(acq.clone(), params.supervisor.clone())
                    .wrap_err("Failed to start the acquisition supervisor")?,
            )
        }
        _ => None,
    };

    info!("Initialisation complete\n");

    // ---- EXECUTE COMMAND ----

    let result = match cmd {
        MowCmd::Plan {
            boundary,
            out,
            spacing_m,
            start,
        } => {
            let boundary = Boundary::load(&boundary).wrap_err("Could not load the boundary")?;

            let start = match start {
                Some(ref s) if s.len() == 2 => GeoPoint::new(s[0], s[1]),
                Some(s) => return Err(eyre!("Expected a start of LON LAT, got {:?}", s)),
                None => {
                    let mut feed = HwRover::new(gnss_feed(&params)?, (), ());
                    wait_for_fix(&mut feed, &abort, &params)?
                }
            };

            let spacing_m = spacing_m.unwrap_or(cov_planner.params().sweep_spacing_m);
            let path = cov_planner
                .plan_with_spacing(&boundary, &start, spacing_m)
                .wrap_err("Failed to plan the coverage path")?;

            save_path(&session, &path, out.as_deref())
        }

        MowCmd::Follow {
            boundary,
            spacing_m,
            sim,
        } => {
            let boundary = Boundary::load(&boundary).wrap_err("Could not load the boundary")?;
            let spacing_m = spacing_m.unwrap_or(cov_planner.params().sweep_spacing_m);

            if sim {
                let start = centroid(&boundary);
                info!("Simulated mower starting at {:?}", start);
                let mut rover = SimRover::new(start, 0.0, params.sim.clone());

                follow_path(
                    &session,
                    &cov_planner,
                    traj_ctrl,
                    &params,
                    boundary,
                    spacing_m,
                    &mut rover,
                    &abort,
                )
            } else {
                let mut rover = hw_rover(&params, &mech_params)?;

                follow_path(
                    &session,
                    &cov_planner,
                    traj_ctrl,
                    &params,
                    boundary,
                    spacing_m,
                    &mut rover,
                    &abort,
                )
            }
        }

        MowCmd::Record { out } => {
            let mut feed = HwRover::new(gnss_feed(&params)?, (), ());

            BoundaryRecorder::new(&out, params.mapper.clone())
                .run(&mut feed, &abort)
                .map(|n| info!("Recorded {} points to {:?}", n, out))
                .wrap_err("Boundary recording failed")
        }

        MowCmd::Turn { angle_deg, sim } => {
            let turn_params = traj_ctrl.params().clone();

            let turn_result = if sim {
                let mut rover = SimRover::new(GeoPoint::default(), 0.0, params.sim.clone());
                turn_in_place(angle_deg, &mut rover, &abort, &turn_params)
                    .map(|_| info!("Simulated heading {:?}", rover.heading_deg()))
            } else {
                let mut rover = hw_rover(&params, &mech_params)?;
                turn_in_place(angle_deg, &mut rover, &abort, &turn_params)
            };

            turn_result.wrap_err("Turn in place failed")
        }
    };

    // ---- SHUTDOWN ----

    if let Some(ref mut s) = supervisor {
        for e in s.drain_events() {
            info!("Acquisition: {:?}", e);
        }
        if let Err(e) = s.stop() {
            warn!("Could not stop the acquisition supervisor: {}", e);
        }
    }

    match result {
        Ok(()) => info!("End of execution"),
        Err(ref e) => warn!("Execution failed: {:#}", e),
    }

    result
}

/// Plan the coverage path, save it and drive it with the given rover.
#[allow(clippy::too_many_arguments)]
fn follow_path<R: Rover>(
    session: &Session,
    cov_planner: &CovPlanner,
    mut traj_ctrl: TrajCtrl,
    params: &MowExecParams,
    boundary: Boundary,
    spacing_m: f64,
    rover: &mut R,
    abort: &AbortSignal,
) -> Result<(), Report> {
    let start = wait_for_fix(rover, abort, params)?;

    let path = cov_planner
        .plan_with_spacing(&boundary, &start, spacing_m)
        .wrap_err("Failed to plan the coverage path")?;
    save_path(session, &path, None)?;

    if path.is_empty() {
        warn!("The boundary is too narrow for the sweep spacing, nothing to mow");
        return Ok(());
    }

    traj_ctrl.set_fence(Some(boundary));

    let mut mgr = FollowMgr::new(traj_ctrl, params.follow.clone());

    match mgr
        .run(path, rover, abort)
        .wrap_err("Error while following the path")?
    {
        FollowStatus::Arrived => {
            info!("Coverage complete");
            Ok(())
        }
        status => Err(eyre!("Path following ended with {:?}", status)),
    }
}

/// Save the path in the session, as JSON and as a coordinate file, and optionally to another
/// coordinate file.
fn save_path(session: &Session, path: &Path, out: Option<&FsPath>) -> Result<(), Report> {
    info!(
        "Planned path of {} waypoints ({:.1} m)",
        path.get_num_points(),
        path.length_m()
    );

    session
        .save_json("path.json", path)
        .wrap_err("Could not save the path")?;

    let mut targets = vec![session.session_root.join(PATH_FILE_NAME)];
    if let Some(o) = out {
        targets.push(o.to_path_buf());
    }

    for t in targets.iter() {
        path.save(t)
            .wrap_err_with(|| format!("Could not write the path to {:?}", t))?;
        info!("Path written to {:?}", t);
    }

    Ok(())
}

/// Wait for the first position fix.
fn wait_for_fix<S>(
    source: &mut S,
    abort: &AbortSignal,
    params: &MowExecParams,
) -> Result<GeoPoint, Report>
where
    S: PositionSource + Clock,
{
    let start_s = source.now_s();

    info!("Waiting for a position fix...");

    loop {
        if abort.is_raised() {
            return Err(eyre!("Aborted while waiting for a position fix"));
        }

        match source.latest_fix() {
            Ok(p) => {
                info!("Position fix: {:?}", p);
                return Ok(p);
            }
            Err(LocError::NoFixAvailable) => (),
            Err(e) => warn!("{}", e),
        }

        if source.now_s() - start_s > params.fix_timeout_s {
            return Err(eyre!("No position fix after {:.0} s", params.fix_timeout_s));
        }

        source.sleep_s(params.follow.cycle_period_s);
    }
}

/// Centroid of the boundary's points.
fn centroid(boundary: &Boundary) -> GeoPoint {
    let n = boundary.points().len() as f64;
    let (lon, lat) = boundary
        .points()
        .iter()
        .fold((0.0, 0.0), |(lon, lat), p| (lon + p.lon, lat + p.lat));

    GeoPoint::new(lon / n, lat / n)
}

/// Resolve a feed path against the software root.
fn feed_path(path: &str) -> Result<PathBuf, Report> {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        return Ok(path);
    }

    Ok(host::get_mower_sw_root()
        .wrap_err("Cannot locate the software root")?
        .join(path))
}

fn gnss_feed(params: &MowExecParams) -> Result<GnssFeed, Report> {
    Ok(GnssFeed::new(feed_path(&params.loc.gnss_feed_path)?, &params.loc))
}

fn hw_rover(
    params: &MowExecParams,
    mech_params: &MechParams,
) -> Result<HwRover<GnssFeed, HeadingFeed, Box<dyn mech::Actuator>>, Report> {
    let heading = HeadingFeed::new(feed_path(&params.loc.heading_feed_path)?, &params.loc);
    let actuator = mech::hw_actuator(mech_params).wrap_err("Could not open the motor drivers")?;

    Ok(HwRover::new(gnss_feed(params)?, heading, actuator))
}

/// Raise the abort signal when the operator types `abort` or `q`.
fn spawn_operator_input(abort: AbortSignal) -> std::io::Result<()> {
    thread::Builder::new()
        .name("operator_input".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(l) => match l.trim() {
                        "abort" | "q" => {
                            warn!("Abort requested by the operator");
                            abort.raise();
                        }
                        "" => (),
                        other => info!("Unknown input {:?}, type \"abort\" to stop", other),
                    },
                    Err(_) => break,
                }
            }
        })
        .map(|_| ())
}
