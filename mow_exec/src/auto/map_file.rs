//! # Map files
//!
//! Boundaries and paths are stored as plain text, one `longitude,latitude` pair per line in
//! decimal degrees. There is no header. Lines which don't parse as exactly two numbers are
//! skipped with a warning.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use super::geo::GeoPoint;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of decimal places written for each coordinate (about 1 cm).
pub const COORD_DECIMALS: usize = 7;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MapFileError {
    #[error("Cannot read map file {0:?}: {1}")]
    ReadError(PathBuf, std::io::Error),

    #[error("Cannot write map file {0:?}: {1}")]
    WriteError(PathBuf, std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load all points from a map file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<GeoPoint>, MapFileError> {
    let text = fs::read_to_string(path.as_ref())
        .map_err(|e| MapFileError::ReadError(path.as_ref().to_path_buf(), e))?;

    Ok(parse(&text))
}

/// Parse the contents of a map file.
pub fn parse(text: &str) -> Vec<GeoPoint> {
    let mut points = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line) {
            Some(p) => points.push(p),
            None => warn!("Skipping malformed map file line {}: {:?}", i + 1, line),
        }
    }

    points
}

/// Parse a single `lon,lat` line.
pub fn parse_line(line: &str) -> Option<GeoPoint> {
    let mut fields = line.split(',');

    let lon = fields.next()?.trim().parse::<f64>().ok()?;
    let lat = fields.next()?.trim().parse::<f64>().ok()?;

    if fields.next().is_some() {
        return None;
    }

    Some(GeoPoint { lon, lat })
}

/// Format a point the way it is stored in map files.
pub fn format_point(point: &GeoPoint) -> String {
    format!(
        "{:.*},{:.*}",
        COORD_DECIMALS, point.lon, COORD_DECIMALS, point.lat
    )
}

/// Write the points to a map file, replacing any previous content.
pub fn save<P: AsRef<Path>>(path: P, points: &[GeoPoint]) -> Result<(), MapFileError> {
    let mut text = String::new();
    for p in points {
        text.push_str(&format_point(p));
        text.push('\n');
    }

    fs::write(path.as_ref(), text)
        .map_err(|e| MapFileError::WriteError(path.as_ref().to_path_buf(), e))
}

/// Append a single point to the end of a map file, creating it if needed.
pub fn append<P: AsRef<Path>>(path: P, point: &GeoPoint) -> Result<(), MapFileError> {
    let to_err = |e| MapFileError::WriteError(path.as_ref().to_path_buf(), e);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())
        .map_err(to_err)?;

    writeln!(file, "{}", format_point(point)).map_err(to_err)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_skips_bad_lines() {
        let text = "-74.4612000,40.5218000\n\
                    not,a point\n\
                    \n\
                    -74.4611, 40.5219\n\
                    1.0,2.0,3.0\n\
                    -74.4610,40.5220";

        let points = parse(text);
        assert_eq!(
            points,
            vec![
                GeoPoint::new(-74.4612, 40.5218),
                GeoPoint::new(-74.4611, 40.5219),
                GeoPoint::new(-74.4610, 40.5220),
            ]
        );
    }

    #[test]
    fn test_format_point() {
        assert_eq!(
            format_point(&GeoPoint::new(-74.46123456789, 40.5)),
            "-74.4612346,40.5000000"
        );
    }

    #[test]
    fn test_save_append_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boundary.txt");

        let points = vec![GeoPoint::new(1.25, -2.5), GeoPoint::new(1.5, -2.75)];
        save(&path, &points).unwrap();
        append(&path, &GeoPoint::new(1.75, -3.0)).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0], points[0]);
        assert_eq!(loaded[2], GeoPoint::new(1.75, -3.0));

        assert!(matches!(
            load(dir.path().join("missing.txt")),
            Err(MapFileError::ReadError(_, _))
        ));
    }
}
