//! # Feed files
//!
//! The acquisition processes append their output to plain text files. The feeds here read back
//! the end of those files and return the most recent valid record.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    time::SystemTime,
};

use super::{nmea, HeadingSource, LocError, LocParams, PositionSource};
use crate::auto::geo::GeoPoint;
use util::maths::wrap_360;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Tails an append-only file of NMEA sentences.
#[derive(Debug, Clone)]
pub struct GnssFeed {
    tail: FeedTail,
}

/// Tails an append-only file holding one heading in degrees per line.
#[derive(Debug, Clone)]
pub struct HeadingFeed {
    tail: FeedTail,
}

#[derive(Debug, Clone)]
struct FeedTail {
    path: PathBuf,
    max_age_s: f64,
    tail_bytes: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl GnssFeed {
    pub fn new<P: AsRef<Path>>(path: P, params: &LocParams) -> Self {
        Self {
            tail: FeedTail::new(path, params),
        }
    }
}

impl PositionSource for GnssFeed {
    fn latest_fix(&mut self) -> Result<GeoPoint, LocError> {
        let text = self.tail.read()?.ok_or(LocError::NoFixAvailable)?;

        // Only the newest GGA sentence counts, other telemetry is skipped. An unterminated last
        // line is still being written.
        let complete = match text.rfind('\n') {
            Some(i) => &text[..i],
            None => "",
        };

        let newest = complete
            .lines()
            .rev()
            .find(|l| nmea::is_gga(l))
            .ok_or(LocError::NoFixAvailable)?;

        nmea::parse_gga(newest).map_err(|e| {
            trace!("Newest GGA sentence rejected: {}", e);
            LocError::NoFixAvailable
        })
    }
}

impl HeadingFeed {
    pub fn new<P: AsRef<Path>>(path: P, params: &LocParams) -> Self {
        Self {
            tail: FeedTail::new(path, params),
        }
    }
}

impl HeadingSource for HeadingFeed {
    fn heading_deg(&mut self) -> Option<f64> {
        let text = match self.tail.read() {
            Ok(Some(t)) => t,
            Ok(None) => return None,
            Err(e) => {
                trace!("Heading feed unavailable: {}", e);
                return None;
            }
        };

        text.lines()
            .rev()
            .filter_map(|l| l.trim().parse::<f64>().ok())
            .find(|h| h.is_finite())
            .map(wrap_360)
    }
}

impl FeedTail {
    fn new<P: AsRef<Path>>(path: P, params: &LocParams) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_age_s: params.max_fix_age_s,
            tail_bytes: params.tail_bytes.max(128),
        }
    }

    /// Read the end of the feed.
    ///
    /// Returns `None` if the feed doesn't exist or is stale.
    fn read(&self) -> Result<Option<String>, LocError> {
        let to_err = |e| LocError::Io(self.path.clone(), e);

        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(to_err(e)),
        };

        let meta = file.metadata().map_err(to_err)?;

        if self.max_age_s > 0.0 {
            let age_s = meta
                .modified()
                .ok()
                .and_then(|m| SystemTime::now().duration_since(m).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);

            if age_s > self.max_age_s {
                trace!("Feed {:?} is stale ({:.1} s old)", self.path, age_s);
                return Ok(None);
            }
        }

        let start = meta.len().saturating_sub(self.tail_bytes);
        file.seek(SeekFrom::Start(start)).map_err(to_err)?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(to_err)?;

        let mut text = String::from_utf8_lossy(&buf).into_owned();

        // Drop the partial first line when reading from the middle of the file
        if start > 0 {
            text = match text.find('\n') {
                Some(i) => text[i + 1..].to_string(),
                None => String::new(),
            };
        }

        Ok(Some(text))
    }
}
