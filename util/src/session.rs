//! Session management
//!
//! A session is one execution of an exec. Each gets its own timestamped directory holding the
//! log file, the archives written during the run and any saved products (like planned paths).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::{host, time};

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
#[derive(Clone, Debug)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot locate the software root: {0}")]
    SwRootNotSet(host::HostError),

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised the \
         session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,

    #[error("Cannot write {0:?}: {1}")]
    WriteError(PathBuf, std::io::Error),

    #[error("Cannot serialize data for {0:?}: {1}")]
    SerializeError(PathBuf, serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory of the software root.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = host::get_mower_sw_root().map_err(SessionError::SwRootNotSet)?;

        Self::new_in(root, exec_name, sessions_dir)
    }

    /// Start a new session beneath an explicit root directory.
    pub fn new_in<P: AsRef<Path>>(
        root: P,
        exec_name: &str,
        sessions_dir: &str,
    ) -> Result<Self, SessionError> {
        // Set the session epoch, only one session may exist per process
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;

        let timestamp = match SESSION_EPOCH.get() {
            Some(e) => e.format(TIMESTAMP_FORMAT),
            None => return Err(SessionError::CannotGetEpoch),
        };

        let session_root = root
            .as_ref()
            .join(sessions_dir)
            .join(format!("{}_{}", exec_name, timestamp));
        let arch_root = session_root.join("arch");

        fs::create_dir_all(&arch_root).map_err(SessionError::CannotCreateDir)?;

        let log_file_path = session_root.join(format!("{}.log", exec_name));

        Ok(Session {
            session_root,
            arch_root,
            log_file_path,
        })
    }

    /// Get the absolute path of an item in the archive directory, creating its parent
    /// directories.
    pub fn arch_path<P: AsRef<Path>>(&self, rel_path: P) -> Result<PathBuf, SessionError> {
        let path = self.arch_root.join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SessionError::CannotCreateDir)?;
        }
        Ok(path)
    }

    /// Save the given data as pretty JSON at a session-relative path.
    ///
    /// Returns the absolute path of the written file.
    pub fn save_json<P: AsRef<Path>, T: Serialize>(
        &self,
        rel_path: P,
        data: &T,
    ) -> Result<PathBuf, SessionError> {
        let path = self.session_root.join(rel_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SessionError::CannotCreateDir)?;
        }

        let json = serde_json::to_string_pretty(data)
            .map_err(|e| SessionError::SerializeError(path.clone(), e))?;
        fs::write(&path, json).map_err(|e| SessionError::WriteError(path.clone(), e))?;

        debug!("Saved {:?}", path);

        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// Before a session has been started this is always zero, so log lines emitted during early
/// initialisation still format.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => time::duration_to_seconds(Utc::now() - *e).unwrap_or(std::f64::NAN),
        None => 0.0,
    }
}

/// Return a reference to the session's epoch, if a session has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

#[cfg(test)]
mod test {
    use super::*;

    // Only one session can exist per process so everything session related is checked here.
    #[test]
    fn test_session_layout() {
        let root = tempfile::tempdir().unwrap();
        let session = Session::new_in(root.path(), "test_exec", "sessions").unwrap();

        assert!(session.session_root.starts_with(root.path().join("sessions")));
        assert!(session.arch_root.is_dir());
        assert_eq!(
            session.log_file_path.file_name().unwrap().to_str().unwrap(),
            "test_exec.log"
        );

        // A second session in the same process is refused
        assert!(Session::new_in(root.path(), "test_exec", "sessions").is_err());

        let saved = session.save_json("plan/path.json", &vec![1.0, 2.0]).unwrap();
        let back: Vec<f64> = serde_json::from_str(&fs::read_to_string(saved).unwrap()).unwrap();
        assert_eq!(back, vec![1.0, 2.0]);

        assert!(get_epoch().is_some());
        assert!(get_elapsed_seconds() >= 0.0);
    }
}
