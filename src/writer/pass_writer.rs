//! Unified pass writer
//!
//! Routes writes to either the JSONL or the SQLite backend based on configuration.

use super::backend::{PassHandle, PassMetadata, PassWriterBackend, WriterError};
use super::jsonl_writer::JsonlPassWriter;
use super::sqlite_writer::SqlitePassWriter;
use crate::config::BackendType;
use std::path::Path;

pub enum PassWriter {
    Jsonl(JsonlPassWriter),
    Sqlite(SqlitePassWriter),
}

impl PassWriter {
    /// `path` is the output directory for JSONL, the database file for SQLite
    pub fn new(backend: BackendType, path: &Path) -> Result<Self, WriterError> {
        match backend {
            BackendType::Jsonl => Ok(PassWriter::Jsonl(JsonlPassWriter::new(path)?)),
            BackendType::Sqlite => Ok(PassWriter::Sqlite(SqlitePassWriter::new(path)?)),
        }
    }

    fn inner(&mut self) -> &mut dyn PassWriterBackend {
        match self {
            PassWriter::Jsonl(w) => w,
            PassWriter::Sqlite(w) => w,
        }
    }
}

impl PassWriterBackend for PassWriter {
    fn init_mission(&mut self, mission: &str, tag: &str) -> Result<(), WriterError> {
        self.inner().init_mission(mission, tag)
    }

    fn phase(&mut self, name: &str) -> Result<(), WriterError> {
        self.inner().phase(name)
    }

    fn begin_pass(&mut self, meta: &PassMetadata) -> Result<PassHandle, WriterError> {
        self.inner().begin_pass(meta)
    }

    fn define_variable(&mut self, pass: PassHandle, name: &str) -> Result<(), WriterError> {
        self.inner().define_variable(pass, name)
    }

    fn put_values(&mut self, pass: PassHandle, name: &str, values: &[f64]) -> Result<(), WriterError> {
        self.inner().put_values(pass, name, values)
    }

    fn close_pass(&mut self, pass: PassHandle) -> Result<String, WriterError> {
        self.inner().close_pass(pass)
    }

    fn shutdown(&mut self) -> Result<(), WriterError> {
        self.inner().shutdown()
    }

    fn backend_type(&self) -> &'static str {
        match self {
            PassWriter::Jsonl(_) => "JSONL",
            PassWriter::Sqlite(_) => "SQLite",
        }
    }
}
