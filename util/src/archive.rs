//! Struct archiving functionality
//!
//! Archives are CSV files with one row per cycle, written into the session's archive
//! directory. Records must serialize to a flat set of columns.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;
use thiserror::Error;

// Internal imports
use crate::session::{Session, SessionError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive path: {0}")]
    SessionError(SessionError),

    #[error("Cannot open the archive file: {0}")]
    FileError(std::io::Error),

    #[error("Cannot write the archive record: {0}")]
    CsvError(csv::Error),

    #[error("The archiver has not been initialised")]
    NotInitialised,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a csv.
///
/// To implement this trait the struct shall hold an `Archiver`, set up in its `init` or `new`
/// function.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        let full_path = session
            .arch_path(path)
            .map_err(ArchiveError::SessionError)?;

        Self::from_file_path(full_path)
    }

    /// Create a new archiver writing to an explicit file, truncating any previous content.
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(ArchiveError::FileError)?;

        let w = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self { writer: Some(w) })
    }

    /// Returns true if the archiver has somewhere to write to.
    pub fn is_active(&self) -> bool {
        self.writer.is_some()
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        match self.writer {
            Some(ref mut w) => {
                w.serialize(record).map_err(ArchiveError::CsvError)?;
                w.flush().map_err(ArchiveError::FileError)
            }
            None => Err(ArchiveError::NotInitialised),
        }
    }
}
