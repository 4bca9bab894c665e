//! # Acquisition supervisor
//!
//! Runs an external acquisition process, typically the RTK GNSS reader that appends NMEA to the
//! position feed, as a child of a background thread. The child is restarted whenever it exits,
//! waiting longer after each consecutive failure. Everything that happens is reported as a
//! [`SupervisorEvent`] over a channel.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs::OpenOptions,
    path::PathBuf,
    process::{Child, Command, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use log::{debug, info, warn};
use serde::Deserialize;

use util::time::secs_to_duration;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SupervisorParams {
    /// Delay before the first restart
    pub initial_backoff_s: f64,

    /// Longest delay between restarts
    pub max_backoff_s: f64,

    /// A child running for at least this long resets the backoff
    pub stable_run_s: f64,

    /// Interval at which the child and the stop request are checked
    pub poll_interval_s: f64,
}

/// The process to supervise.
#[derive(Deserialize, Debug, Clone)]
pub struct SupervisedCommand {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// File the child's standard output is appended to, discarded if `None`
    #[serde(default)]
    pub stdout_path: Option<PathBuf>,
}

pub struct ProcessSupervisor {
    shutdown: Arc<AtomicBool>,
    events: Receiver<SupervisorEvent>,
    worker_jh: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEvent {
    /// The child was started with the given pid
    Started { pid: u32 },

    /// The child exited after running for `run_s` seconds
    Exited { code: Option<i32>, run_s: f64 },

    /// The child could not be started
    SpawnFailed(String),

    /// The child will be restarted after the delay
    Restarting { delay_s: f64 },

    /// Supervision has ended and no child is running
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Could not start the supervisor thread: {0}")]
    Io(std::io::Error),

    #[error("The supervisor thread panicked")]
    ThreadPanicked,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SupervisorParams {
    fn default() -> Self {
        Self {
            initial_backoff_s: 1.0,
            max_backoff_s: 30.0,
            stable_run_s: 10.0,
            poll_interval_s: 0.1,
        }
    }
}

impl ProcessSupervisor {
    /// Start supervising the command.
    pub fn spawn(
        cmd: SupervisedCommand,
        params: SupervisorParams,
    ) -> Result<Self, SupervisorError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, events) = channel();

        let worker_shutdown = shutdown.clone();
        let worker_jh = thread::Builder::new()
            .name("supervisor::worker".into())
            .spawn(move || supervise(cmd, params, worker_shutdown, tx))
            .map_err(SupervisorError::Io)?;

        Ok(Self {
            shutdown,
            events,
            worker_jh: Some(worker_jh),
        })
    }

    /// Receiver for the events of the supervisor.
    pub fn events(&self) -> &Receiver<SupervisorEvent> {
        &self.events
    }

    /// All events received since the last call.
    pub fn drain_events(&self) -> Vec<SupervisorEvent> {
        self.events.try_iter().collect()
    }

    /// Kill the child and wait for the supervisor thread to finish.
    pub fn stop(&mut self) -> Result<(), SupervisorError> {
        self.shutdown.store(true, Ordering::Relaxed);

        match self.worker_jh.take() {
            Some(jh) => jh.join().map_err(|_| SupervisorError::ThreadPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("{}", e);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Delay before the next restart after the given number of consecutive failures.
///
/// Doubles from `initial_backoff_s` for every failure after the first, capped at
/// `max_backoff_s`.
pub fn backoff_delay_s(params: &SupervisorParams, failures: u32) -> f64 {
    let exp = failures.saturating_sub(1).min(30) as i32;
    (params.initial_backoff_s * 2f64.powi(exp)).min(params.max_backoff_s)
}

fn supervise(
    cmd: SupervisedCommand,
    params: SupervisorParams,
    shutdown: Arc<AtomicBool>,
    tx: Sender<SupervisorEvent>,
) {
    // The receiver may be gone if the supervisor is being dropped, which is fine
    let send = |event: SupervisorEvent| {
        tx.send(event).ok();
    };

    let mut failures = 0u32;

    while !shutdown.load(Ordering::Relaxed) {
        let started = Instant::now();

        match start_child(&cmd) {
            Ok(mut child) => {
                info!("Started {} (pid {})", cmd.program, child.id());
                send(SupervisorEvent::Started { pid: child.id() });

                let code = match wait_child(&mut child, &params, &shutdown) {
                    Some(c) => c,
                    None => break,
                };
                let run_s = started.elapsed().as_secs_f64();

                warn!(
                    "{} exited with code {:?} after {:.1} s",
                    cmd.program, code, run_s
                );
                send(SupervisorEvent::Exited { code, run_s });

                if run_s >= params.stable_run_s {
                    failures = 0;
                }
            }
            Err(e) => {
                warn!("Could not start {}: {}", cmd.program, e);
                send(SupervisorEvent::SpawnFailed(e.to_string()));
            }
        }

        failures += 1;
        let delay_s = backoff_delay_s(&params, failures);
        info!("Restarting {} in {:.1} s", cmd.program, delay_s);
        send(SupervisorEvent::Restarting { delay_s });

        // Wait out the backoff, staying responsive to a stop request
        let wake_at = Instant::now() + secs_to_duration(delay_s);
        while !shutdown.load(Ordering::Relaxed) && Instant::now() < wake_at {
            thread::sleep(secs_to_duration(params.poll_interval_s));
        }
    }

    debug!("Supervisor of {} stopped", cmd.program);
    send(SupervisorEvent::Stopped);
}

fn start_child(cmd: &SupervisedCommand) -> std::io::Result<Child> {
    let mut command = Command::new(&cmd.program);
    command.args(&cmd.args).stdin(Stdio::null());

    match cmd.stdout_path {
        Some(ref path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            command.stdout(Stdio::from(file));
        }
        None => {
            command.stdout(Stdio::null());
        }
    }

    command.spawn()
}

/// Wait for the child to exit, returning its exit code.
///
/// Returns `None` if a stop was requested, in which case the child has been killed.
fn wait_child(
    child: &mut Child,
    params: &SupervisorParams,
    shutdown: &AtomicBool,
) -> Option<Option<i32>> {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Stopping child {}", child.id());
            if let Err(e) = child.kill() {
                warn!("Could not kill child {}: {}", child.id(), e);
            }
            child.wait().ok();
            return None;
        }

        match child.try_wait() {
            Ok(Some(status)) => return Some(status.code()),
            Ok(None) => thread::sleep(secs_to_duration(params.poll_interval_s)),
            Err(e) => {
                warn!("Could not check child {}: {}", child.id(), e);
                child.kill().ok();
                return Some(child.wait().ok().and_then(|s| s.code()));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn fast() -> SupervisorParams {
        SupervisorParams {
            initial_backoff_s: 0.02,
            max_backoff_s: 0.05,
            stable_run_s: 10.0,
            poll_interval_s: 0.005,
        }
    }

    fn sh(script: &str) -> SupervisedCommand {
        SupervisedCommand {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            stdout_path: None,
        }
    }

    /// Collect events until `n` of them satisfy the predicate.
    fn wait_for<F>(sup: &ProcessSupervisor, n: usize, pred: F) -> Vec<SupervisorEvent>
    where
        F: Fn(&SupervisorEvent) -> bool,
    {
        let mut seen = Vec::new();
        let mut matched = 0;
        while matched < n {
            let e = sup
                .events()
                .recv_timeout(Duration::from_secs(10))
                .expect("No supervisor event");
            if pred(&e) {
                matched += 1;
            }
            seen.push(e);
        }
        seen
    }

    #[test]
    fn test_backoff_schedule() {
        let p = SupervisorParams::default();
        let delays: Vec<f64> = (1..=7).map(|f| backoff_delay_s(&p, f)).collect();
        assert_eq!(delays, vec![1.0, 2.0, 4.0, 8.0, 16.0, 30.0, 30.0]);
        assert_eq!(backoff_delay_s(&p, u32::MAX), 30.0);
    }

    #[test]
    fn test_restarts_failing_child() {
        let mut sup = ProcessSupervisor::spawn(sh("exit 3"), fast()).unwrap();

        let events = wait_for(&sup, 3, |e| matches!(e, SupervisorEvent::Exited { .. }));
        sup.stop().unwrap();

        let exits: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SupervisorEvent::Exited { code, .. } => Some(*code),
                _ => None,
            })
            .collect();
        assert_eq!(exits, vec![Some(3); 3]);

        let delays: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                SupervisorEvent::Restarting { delay_s } => Some(*delay_s),
                _ => None,
            })
            .collect();
        assert_eq!(&delays[..2], &[0.02, 0.04]);

        assert_eq!(sup.drain_events().last(), Some(&SupervisorEvent::Stopped));
    }

    #[test]
    fn test_stop_kills_child() {
        let mut sup = ProcessSupervisor::spawn(sh("sleep 10"), fast()).unwrap();
        wait_for(&sup, 1, |e| matches!(e, SupervisorEvent::Started { .. }));

        let t = Instant::now();
        sup.stop().unwrap();
        assert!(t.elapsed() < Duration::from_secs(5));

        let events = sup.drain_events();
        assert_eq!(events, vec![SupervisorEvent::Stopped]);
    }

    #[test]
    fn test_spawn_failure() {
        let cmd = SupervisedCommand {
            program: "/nonexistent/rtk_reader".into(),
            args: vec![],
            stdout_path: None,
        };
        let mut sup = ProcessSupervisor::spawn(cmd, fast()).unwrap();

        let events = wait_for(&sup, 1, |e| matches!(e, SupervisorEvent::Restarting { .. }));
        sup.stop().unwrap();

        assert!(matches!(events[0], SupervisorEvent::SpawnFailed(_)));
    }

    #[test]
    fn test_stdout_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("raw_gps.txt");

        let mut cmd = sh("echo '$GNGGA'");
        cmd.stdout_path = Some(out.clone());

        let mut sup = ProcessSupervisor::spawn(cmd, fast()).unwrap();
        wait_for(&sup, 2, |e| matches!(e, SupervisorEvent::Exited { .. }));
        sup.stop().unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.lines().filter(|l| *l == "$GNGGA").count() >= 2);
    }
}
