//! Pass emission
//!
//! Applies the selection bounds, composes the pass metadata and hands the
//! record range to the writer. Variables that are entirely NaN over the range
//! are reported and left out.

use super::buffer::RecordBuffer;
use super::provenance::ProvenanceLog;
use crate::epoch::format_iso;
use crate::geodesy::PassIdentity;
use crate::writer::{PassMetadata, PassWriterBackend, WriterError};
use std::ops::Range;

/// Inclusive cycle bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleRange {
    pub first: i32,
    pub last: i32,
}

impl CycleRange {
    pub fn contains(&self, cycle: i32) -> bool {
        (self.first..=self.last).contains(&cycle)
    }
}

/// Inclusive sec85 bounds on the equator crossing time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Selection {
    pub cycles: Option<CycleRange>,
    pub equator_times: Option<TimeRange>,
}

impl Selection {
    pub fn accepts(&self, identity: &PassIdentity) -> bool {
        self.cycles.map_or(true, |c| c.contains(identity.cycle))
            && self
                .equator_times
                .map_or(true, |t| t.contains(identity.equator_time))
    }
}

pub struct PassEmitter {
    selection: Selection,
    written: usize,
    skipped: usize,
}

impl PassEmitter {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            written: 0,
            skipped: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Passes dropped by the selection bounds
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Write `range` of the buffer as the pass `identity`.
    ///
    /// Returns the output location, or `None` when the pass is outside the
    /// selection.
    pub fn emit<W: PassWriterBackend + ?Sized>(
        &mut self,
        buffer: &mut RecordBuffer,
        range: Range<usize>,
        identity: &PassIdentity,
        provenance: &ProvenanceLog,
        writer: &mut W,
    ) -> Result<Option<String>, WriterError> {
        if range.is_empty() {
            return Ok(None);
        }

        if !self.selection.accepts(identity) {
            log::debug!(
                "Pass c{:03} p{:04} ({}) outside selection, skipped",
                identity.cycle,
                identity.pass,
                format_iso(identity.equator_time)
            );
            self.skipped += 1;
            return Ok(None);
        }

        let phase = identity.phase.to_lowercase();
        writer.phase(&phase)?;

        let start_time = buffer.time()[range.start];
        let end_time = buffer.time()[range.end - 1];
        let (source, baseline) = provenance.describe(start_time, end_time);

        let meta = PassMetadata {
            phase,
            cycle: identity.cycle,
            pass: identity.pass,
            orbit: identity.orbit,
            start_time,
            end_time,
            equator_time: identity.equator_time,
            equator_lon: identity.equator_lon,
            records: range.len(),
            source,
            baseline,
        };

        for name in buffer.mark_empty(range.clone()) {
            log::warn!(
                "Pass c{:03} p{:04}: variable {} has no valid values",
                meta.cycle,
                meta.pass,
                name
            );
        }

        let handle = writer.begin_pass(&meta)?;
        let variables = buffer.variables().iter().filter(|v| !v.empty);
        for var in variables.clone() {
            writer.define_variable(handle, &var.name)?;
        }
        for var in variables {
            writer.put_values(handle, &var.name, &var.values[range.clone()])?;
        }
        let location = writer.close_pass(handle)?;

        self.written += 1;
        log::info!(
            "📦 Pass c{:03} p{:04}: {} records, {} → {}",
            meta.cycle,
            meta.pass,
            meta.records,
            format_iso(start_time),
            location
        );
        Ok(Some(location))
    }
}
