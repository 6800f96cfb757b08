//! Input container access
//!
//! A granule is one mission data file. The core only needs by-name access to
//! dimensions, global attributes and 1-D/2-D variables; unit scaling happens
//! in the [`FieldExtractor`], never here.

pub mod extractor;
pub mod json_granule;

pub use extractor::FieldExtractor;
pub use json_granule::JsonGranule;

use std::path::Path;

#[derive(Debug)]
pub enum GranuleError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Malformed(String),
}

impl From<std::io::Error> for GranuleError {
    fn from(err: std::io::Error) -> Self {
        GranuleError::Io(err)
    }
}

impl From<serde_json::Error> for GranuleError {
    fn from(err: serde_json::Error) -> Self {
        GranuleError::Parse(err)
    }
}

impl std::fmt::Display for GranuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GranuleError::Io(e) => write!(f, "IO error: {}", e),
            GranuleError::Parse(e) => write!(f, "Parse error: {}", e),
            GranuleError::Malformed(msg) => write!(f, "Malformed granule: {}", msg),
        }
    }
}

impl std::error::Error for GranuleError {}

/// Row-major view of a high-rate variable: one row per 1 Hz record.
#[derive(Debug, Clone, Copy)]
pub struct Grid<'a> {
    pub rows: usize,
    pub cols: usize,
    pub data: &'a [f64],
}

/// Read-only access to one opened granule
pub trait Granule {
    fn path(&self) -> &Path;

    /// Length of a named dimension, `None` when the dimension does not exist
    fn dimension(&self, name: &str) -> Option<usize>;

    fn attribute(&self, name: &str) -> Option<&str>;

    /// Variable flattened to one dimension; missing values are NaN
    fn variable(&self, name: &str) -> Option<&[f64]>;

    /// Two-dimensional variable; `None` when absent or not 2-D
    fn variable_2d(&self, name: &str) -> Option<Grid<'_>>;
}
