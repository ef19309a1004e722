//! Persisted fallback state
//!
//! The last computed volume is written to disk on every sync so that other
//! processes (e.g. a CamillaDSP startup script) can prime the engine before
//! the first sync reaches it.
//!
//! The volume uses Rust's shortest float formatting, so an integral value is
//! written without a fractional part (`-60 1`, not `-60.0 1`). Readers must
//! parse the first token as a float; both spellings are accepted here.

use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

/// Last computed volume and mute flag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackRecord {
    pub db: f64,
    pub mute: bool,
}

impl FallbackRecord {
    pub fn new(db: f64, mute: bool) -> Self {
        Self { db, mute }
    }

    /// Overwrite the record at `path`
    pub fn write(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_string())
    }

    /// Read a record back from `path`
    pub fn read(path: &Path) -> io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        contents
            .parse()
            .map_err(|e: ParseRecordError| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl fmt::Display for FallbackRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.db, u8::from(self.mute))
    }
}

/// Malformed fallback record
#[derive(Debug, Clone, PartialEq)]
pub struct ParseRecordError(String);

impl fmt::Display for ParseRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid volume state: {}", self.0)
    }
}

impl std::error::Error for ParseRecordError {}

impl FromStr for FallbackRecord {
    type Err = ParseRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let (Some(db), Some(mute), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(ParseRecordError(format!("expected two fields, got {:?}", s)));
        };

        let db = db
            .parse::<f64>()
            .map_err(|e| ParseRecordError(format!("volume {:?}: {}", db, e)))?;
        let mute = match mute {
            "0" => false,
            "1" => true,
            other => return Err(ParseRecordError(format!("mute flag {:?}", other))),
        };

        Ok(Self { db, mute })
    }
}
