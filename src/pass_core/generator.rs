//! Driver loop: decode → ingest → split → emit → shift

use super::buffer::RecordBuffer;
use super::decoder::GranuleDecoder;
use super::emitter::{PassEmitter, Selection};
use super::layout::MissionLayout;
use super::provenance::{ProvenanceLog, SourceSpan};
use super::splitter::find_split;
use super::CoreError;
use crate::geodesy::{Geodesy, PassIdentity};
use crate::granule::JsonGranule;
use crate::writer::{PassWriterBackend, WriterError};
use std::path::Path;

/// Failures that abort the run
#[derive(Debug)]
pub enum RunError {
    Core(CoreError),
    Writer(WriterError),
}

impl From<CoreError> for RunError {
    fn from(err: CoreError) -> Self {
        RunError::Core(err)
    }
}

impl From<WriterError> for RunError {
    fn from(err: WriterError) -> Self {
        RunError::Writer(err)
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Core(e) => write!(f, "Core error: {}", e),
            RunError::Writer(e) => write!(f, "Writer error: {}", e),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Core(e) => Some(e),
            RunError::Writer(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_read: usize,
    pub files_skipped: usize,
    pub records_trimmed: usize,
    pub records_dropped: usize,
    pub passes_written: usize,
    pub passes_skipped: usize,
}

pub struct PassGenerator<G: Geodesy, W: PassWriterBackend> {
    decoder: GranuleDecoder,
    geodesy: G,
    writer: W,
    buffer: RecordBuffer,
    emitter: PassEmitter,
    provenance: ProvenanceLog,
    summary: RunSummary,
}

impl<G: Geodesy, W: PassWriterBackend> PassGenerator<G, W> {
    /// Opens the writer's mission context for `geodesy`'s mission.
    pub fn new(
        geodesy: G,
        mut writer: W,
        capacity: usize,
        selection: Selection,
        phase_tag: &str,
    ) -> Result<Self, RunError> {
        writer.init_mission(geodesy.mission(), phase_tag)?;
        log::info!(
            "Mission {} ({} backend, buffer capacity {})",
            geodesy.mission(),
            writer.backend_type(),
            capacity
        );

        Ok(Self {
            decoder: GranuleDecoder::new(MissionLayout::reference()),
            geodesy,
            writer,
            buffer: RecordBuffer::new(capacity),
            emitter: PassEmitter::new(selection),
            provenance: ProvenanceLog::new(),
            summary: RunSummary::default(),
        })
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            passes_written: self.emitter.written(),
            passes_skipped: self.emitter.skipped(),
            ..self.summary
        }
    }

    /// Read one granule and emit every pass it closes.
    ///
    /// Unreadable or unrecognized files are reported and skipped.
    pub fn process_path(&mut self, path: &Path) -> Result<(), RunError> {
        let granule = match JsonGranule::open(path) {
            Ok(g) => g,
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                self.summary.files_skipped += 1;
                return Ok(());
            }
        };

        let decoded = match self.decoder.decode(&granule, &self.geodesy)? {
            Some(d) => d,
            None => {
                self.summary.files_skipped += 1;
                return Ok(());
            }
        };
        self.summary.files_read += 1;

        let product = decoded.product_name;
        let baseline = decoded.baseline;
        let report = self.buffer.ingest(decoded.block)?;
        self.summary.records_trimmed += report.trimmed;
        self.summary.records_dropped += report.dropped;

        let retained = self.buffer.len() - report.appended;
        if report.trimmed > 0 {
            let last_retained = retained.checked_sub(1).map(|i| self.buffer.time()[i]);
            self.provenance.truncate_after(last_retained);
        }
        if report.appended > 0 {
            let time = self.buffer.time();
            self.provenance.record(SourceSpan {
                product: product.clone(),
                baseline,
                first_time: time[retained],
                last_time: time[time.len() - 1],
            });
        }
        log::debug!(
            "{}: {} records appended, {} trimmed, {} dropped",
            product,
            report.appended,
            report.trimmed,
            report.dropped
        );

        // Records of this granule stay buffered until the next one has been
        // ingested, since its overlap trim may still remove them.
        self.emit_closed(retained)
    }

    /// Emit closed passes lying entirely before buffer index `horizon`.
    fn emit_closed(&mut self, mut horizon: usize) -> Result<(), RunError> {
        while let Some(split) = find_split(self.buffer.time(), &mut self.geodesy) {
            if split.is_open(self.buffer.len()) || split.index > horizon {
                break;
            }
            self.emit_prefix(split.index, &split.identity)?;
            horizon -= split.index;
        }
        Ok(())
    }

    fn emit_prefix(&mut self, count: usize, identity: &PassIdentity) -> Result<(), RunError> {
        self.emitter.emit(
            &mut self.buffer,
            0..count,
            identity,
            &self.provenance,
            &mut self.writer,
        )?;
        self.buffer.shift(count);
        match self.buffer.first_time() {
            Some(t) => self.provenance.prune_before(t),
            None => self.provenance.clear(),
        }
        Ok(())
    }

    /// Emit what is left as the final pass and shut the writer down.
    pub fn finish(mut self) -> Result<RunSummary, RunError> {
        self.emit_closed(self.buffer.len())?;
        if let Some(split) = find_split(self.buffer.time(), &mut self.geodesy) {
            self.emit_prefix(split.index, &split.identity)?;
        }
        self.writer.shutdown()?;
        Ok(self.summary())
    }

    pub fn run<I, P>(mut self, paths: I) -> Result<RunSummary, RunError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.process_path(path.as_ref())?;
        }
        self.finish()
    }
}
