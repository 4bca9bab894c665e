//! # Boundary recorder
//!
//! Records the boundary of a lawn by walking the mower around its perimeter. Each new fix is
//! appended to a map file as it arrives so that nothing is lost if the recording is cut short.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Deserialize;

use super::{
    geo::{self, GeoPoint},
    loc::{LocError, PositionSource},
    map_file::{self, MapFileError},
    traj_ctrl::AbortSignal,
};
use util::time::Clock;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MapperParams {
    /// Time between two polls of the position source
    pub update_interval_s: f64,

    /// Minimum distance between two recorded points, 0 records every distinct fix
    pub min_spacing_m: f64,
}

pub struct BoundaryRecorder {
    params: MapperParams,
    out_path: PathBuf,
    paused: bool,

    /// Last recorded point, in its stored form
    last: Option<(GeoPoint, String)>,
    num_recorded: usize,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("Cannot read the position: {0}")]
    Loc(LocError),

    #[error(transparent)]
    MapFile(#[from] MapFileError),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Default for MapperParams {
    fn default() -> Self {
        Self {
            update_interval_s: 0.1,
            min_spacing_m: 0.0,
        }
    }
}

impl BoundaryRecorder {
    /// Create a recorder appending to the file at `out_path`.
    pub fn new<P: AsRef<Path>>(out_path: P, params: MapperParams) -> Self {
        Self {
            params,
            out_path: out_path.as_ref().to_path_buf(),
            paused: false,
            last: None,
            num_recorded: 0,
        }
    }

    pub fn pause(&mut self) {
        info!("Recording paused");
        self.paused = true;
    }

    pub fn resume(&mut self) {
        info!("Recording resumed");
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of points written so far.
    pub fn num_recorded(&self) -> usize {
        self.num_recorded
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    /// Read the source once, recording the fix if it is new.
    ///
    /// Returns the point if one was written. A missing fix is not an error.
    pub fn poll<S: PositionSource>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<GeoPoint>, MapperError> {
        if self.paused {
            return Ok(None);
        }

        let fix = match source.latest_fix() {
            Ok(f) => f,
            Err(LocError::NoFixAvailable) => return Ok(None),
            Err(e) => return Err(MapperError::Loc(e)),
        };

        let stored = map_file::format_point(&fix);

        if let Some((last, last_stored)) = &self.last {
            // Identical once written
            if last_stored == &stored {
                return Ok(None);
            }

            if self.params.min_spacing_m > 0.0
                && geo::distance(last, &fix) < self.params.min_spacing_m
            {
                return Ok(None);
            }
        }

        map_file::append(&self.out_path, &fix)?;
        debug!("Recorded {}", stored);

        self.last = Some((fix, stored));
        self.num_recorded += 1;

        Ok(Some(fix))
    }

    /// Record until the abort signal is raised, pacing polls with the source's clock.
    pub fn run<S>(&mut self, source: &mut S, abort: &AbortSignal) -> Result<usize, MapperError>
    where
        S: PositionSource + Clock,
    {
        info!("Recording boundary to {:?}", self.out_path);

        while !abort.is_raised() {
            match self.poll(source) {
                Ok(_) => (),
                Err(MapperError::Loc(e)) => warn!("{}", e),
                Err(e) => return Err(e),
            }

            source.sleep_s(self.params.update_interval_s);
        }

        info!("Recording stopped with {} points", self.num_recorded);

        Ok(self.num_recorded)
    }
}
