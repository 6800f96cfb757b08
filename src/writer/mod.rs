//! Pass output
//!
//! # Architecture
//!
//! ```text
//! PassEmitter → PassWriter ─┬→ JsonlPassWriter  (one .jsonl file per pass)
//!                           └→ SqlitePassWriter (passes + pass_values tables)
//! ```

pub mod backend;
pub mod jsonl_writer;
pub mod pass_writer;
pub mod sqlite_writer;

pub use backend::{PassHandle, PassMetadata, PassWriterBackend, WriterError};
pub use jsonl_writer::JsonlPassWriter;
pub use pass_writer::PassWriter;
pub use sqlite_writer::SqlitePassWriter;
