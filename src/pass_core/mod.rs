//! Pass Core - Streaming Re-segmentation Engine
//!
//! Turns a time-ordered stream of granules into passes: half orbits bounded
//! by equator crossings.
//!
//! # Architecture
//!
//! ```text
//! stdin paths → JsonGranule → GranuleDecoder (FieldExtractor, aggregate, CorrectionLedger)
//!     ↓
//! RecordBuffer::ingest (overlap trim + time-order validation)
//!     ↓
//! find_split (first record of the next pass)
//!     ↓
//! PassEmitter (selection, provenance, empty variables)
//!     ↓
//! PassWriter → JSONL or SQLite backend
//!     ↓
//! RecordBuffer::shift
//! ```

pub mod aggregate;
pub mod buffer;
pub mod decoder;
pub mod emitter;
pub mod generator;
pub mod layout;
pub mod ledger;
pub mod provenance;
pub mod splitter;
pub mod validator;

pub use buffer::{IngestReport, RecordBlock, RecordBuffer, Variable};
pub use decoder::{GranuleDecoder, ProductVariant};
pub use emitter::{CycleRange, PassEmitter, Selection, TimeRange};
pub use generator::{PassGenerator, RunError, RunSummary};
pub use ledger::{CorrectionFlag, CorrectionLedger};
pub use provenance::{ProvenanceLog, SourceSpan};
pub use splitter::{find_split, Split};

/// Internal consistency failures; always fatal to the run
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    CapacityExceeded { capacity: usize, required: usize },
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::CapacityExceeded { capacity, required } => write!(
                f,
                "Record buffer capacity exceeded: {} records required, capacity {}",
                required, capacity
            ),
            CoreError::LengthMismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "Length mismatch in {}: expected {}, got {}",
                what, expected, actual
            ),
        }
    }
}

impl std::error::Error for CoreError {}
