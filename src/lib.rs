pub mod args;
pub mod config;
pub mod epoch;
pub mod geodesy;
pub mod granule;
pub mod pass_core;
pub mod writer;

pub use config::{BackendType, ConfigError, RunConfig};
pub use geodesy::{Geodesy, MissionSpec, NominalOrbit, PassIdentity};
pub use pass_core::{PassGenerator, RunError, RunSummary, Selection};
pub use writer::{PassWriter, PassWriterBackend, WriterError};
