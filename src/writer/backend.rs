//! Writer backend trait for emitted passes
//!
//! One pass is open at a time: `begin_pass`, then `define_variable` /
//! `put_values` per variable, then `close_pass`.

use serde::Serialize;

#[derive(Debug)]
pub enum WriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
    /// Calls made out of order, e.g. values for an undefined variable
    InvalidState(String),
}

impl From<std::io::Error> for WriterError {
    fn from(err: std::io::Error) -> Self {
        WriterError::Io(err)
    }
}

impl From<serde_json::Error> for WriterError {
    fn from(err: serde_json::Error) -> Self {
        WriterError::Serialization(err)
    }
}

impl From<rusqlite::Error> for WriterError {
    fn from(err: rusqlite::Error) -> Self {
        WriterError::Database(err.to_string())
    }
}

impl std::fmt::Display for WriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriterError::Io(e) => write!(f, "IO error: {}", e),
            WriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
            WriterError::Database(e) => write!(f, "Database error: {}", e),
            WriterError::InvalidState(e) => write!(f, "Invalid writer state: {}", e),
        }
    }
}

impl std::error::Error for WriterError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassHandle(pub u64);

/// Everything known about a pass besides its variables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassMetadata {
    /// Lower-cased phase name
    pub phase: String,
    pub cycle: i32,
    pub pass: i32,
    pub orbit: i64,
    /// sec85 of the first and last record
    pub start_time: f64,
    pub end_time: f64,
    pub equator_time: f64,
    pub equator_lon: f64,
    pub records: usize,
    /// Space-separated product names the records came from
    pub source: String,
    pub baseline: String,
}

/// Backend trait for writing passes
pub trait PassWriterBackend {
    /// Open the output context of one mission; `tag` distinguishes product versions
    fn init_mission(&mut self, mission: &str, tag: &str) -> Result<(), WriterError>;

    /// Get or create the context of a phase
    fn phase(&mut self, name: &str) -> Result<(), WriterError>;

    fn begin_pass(&mut self, meta: &PassMetadata) -> Result<PassHandle, WriterError>;

    fn define_variable(&mut self, pass: PassHandle, name: &str) -> Result<(), WriterError>;

    fn put_values(&mut self, pass: PassHandle, name: &str, values: &[f64]) -> Result<(), WriterError>;

    /// Persist the pass and return where it went
    fn close_pass(&mut self, pass: PassHandle) -> Result<String, WriterError>;

    fn shutdown(&mut self) -> Result<(), WriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Mission context set by `init_mission`
#[derive(Debug, Clone)]
pub(crate) struct MissionContext {
    pub id: String,
    pub tag: String,
}

/// Variables of the open pass, held until it is closed
#[derive(Debug)]
pub(crate) struct StagedPass {
    pub handle: PassHandle,
    pub meta: PassMetadata,
    pub variables: Vec<(String, Option<Vec<f64>>)>,
}

impl StagedPass {
    pub fn new(handle: PassHandle, meta: PassMetadata) -> Self {
        Self {
            handle,
            meta,
            variables: Vec::new(),
        }
    }

    pub fn define(&mut self, name: &str) {
        if !self.variables.iter().any(|(n, _)| n == name) {
            self.variables.push((name.to_string(), None));
        }
    }

    pub fn put(&mut self, name: &str, values: &[f64]) -> Result<(), WriterError> {
        if values.len() != self.meta.records {
            return Err(WriterError::InvalidState(format!(
                "variable {} has {} values, pass has {} records",
                name,
                values.len(),
                self.meta.records
            )));
        }
        match self.variables.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => {
                *slot = Some(values.to_vec());
                Ok(())
            }
            None => Err(WriterError::InvalidState(format!(
                "variable {} was not defined",
                name
            ))),
        }
    }

    /// Variables that received values, in definition order
    pub fn written(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.variables
            .iter()
            .filter_map(|(n, v)| v.as_deref().map(|v| (n.as_str(), v)))
    }
}

/// Take the staged pass matching `handle`.
pub(crate) fn take_staged(
    open: &mut Option<StagedPass>,
    handle: PassHandle,
) -> Result<StagedPass, WriterError> {
    match open.take() {
        Some(staged) if staged.handle == handle => Ok(staged),
        other => {
            *open = other;
            Err(WriterError::InvalidState(format!("pass {:?} is not open", handle)))
        }
    }
}

pub(crate) fn staged_mut(
    open: &mut Option<StagedPass>,
    handle: PassHandle,
) -> Result<&mut StagedPass, WriterError> {
    match open {
        Some(staged) if staged.handle == handle => Ok(staged),
        _ => Err(WriterError::InvalidState(format!("pass {:?} is not open", handle))),
    }
}
