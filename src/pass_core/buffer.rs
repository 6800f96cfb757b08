//! Cross-file record buffer
//!
//! Holds 1 Hz records for every variable, index-aligned, across granule
//! boundaries. Grows by [`RecordBuffer::ingest`] and shrinks from the head by
//! [`RecordBuffer::shift`] once a pass has been emitted.

use super::validator::{validate_times, MIN_STEP};
use super::CoreError;
use std::collections::HashMap;
use std::ops::Range;

/// Name of the time variable; always the first column
pub const TIME: &str = "time";

/// Tail records at or after (new first time - this) are treated as overlap
pub const OVERLAP_TOLERANCE: f64 = MIN_STEP;

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub values: Vec<f64>,
    /// All values NaN in the range last checked by [`RecordBuffer::mark_empty`]
    pub empty: bool,
}

/// One granule's decoded records, column per variable, time first.
#[derive(Debug, Clone)]
pub struct RecordBlock {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl RecordBlock {
    pub fn new(time: Vec<f64>) -> Self {
        Self {
            names: vec![TIME.to_string()],
            columns: vec![time],
        }
    }

    pub fn len(&self) -> usize {
        self.columns[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn time(&self) -> &[f64] {
        &self.columns[0]
    }

    /// Add or replace a column; its length must match the time column.
    pub fn push(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), CoreError> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(CoreError::LengthMismatch {
                what: "block column",
                expected: self.len(),
                actual: values.len(),
            });
        }
        match self.names.iter().position(|n| *n == name) {
            Some(i) => self.columns[i] = values,
            None => {
                self.names.push(name);
                self.columns.push(values);
            }
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Compact every column to `keep` (ascending indices).
    fn retain_indices(&mut self, keep: &[usize]) {
        if keep.len() == self.len() {
            return;
        }
        for column in self.columns.iter_mut() {
            let compacted: Vec<f64> = keep.iter().map(|&i| column[i]).collect();
            *column = compacted;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Buffered records discarded as overlap with the new block
    pub trimmed: usize,
    /// Block records dropped by the time-order validator
    pub dropped: usize,
    pub appended: usize,
}

pub struct RecordBuffer {
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
    len: usize,
    capacity: usize,
}

impl RecordBuffer {
    pub fn new(capacity: usize) -> Self {
        let mut buffer = Self {
            variables: Vec::new(),
            index: HashMap::new(),
            len: 0,
            capacity,
        };
        buffer.variable_slot(TIME);
        buffer
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn time(&self) -> &[f64] {
        &self.variables[0].values
    }

    pub fn first_time(&self) -> Option<f64> {
        self.time().first().copied()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.time().last().copied()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&i| &self.variables[i])
    }

    /// Index of `name`, creating the variable (NaN-filled) when new.
    fn variable_slot(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        self.variables.push(Variable {
            name: name.to_string(),
            values: vec![f64::NAN; self.len],
            empty: false,
        });
        let i = self.variables.len() - 1;
        self.index.insert(name.to_string(), i);
        i
    }

    /// Append a decoded block.
    ///
    /// Buffered records at or after the block's first time minus
    /// [`OVERLAP_TOLERANCE`] are discarded first, then the block is validated
    /// for time order and compacted before it is appended.
    pub fn ingest(&mut self, mut block: RecordBlock) -> Result<IngestReport, CoreError> {
        let mut report = IngestReport::default();
        if block.is_empty() {
            return Ok(report);
        }

        if let Some(first) = block.time().iter().copied().find(|t| t.is_finite()) {
            let cutoff = first - OVERLAP_TOLERANCE;
            let keep = self
                .time()
                .iter()
                .position(|&t| t >= cutoff)
                .unwrap_or(self.len);
            report.trimmed = self.len - keep;
            if report.trimmed > 0 {
                log::debug!(
                    "Trimming {} overlapping records at or after {:.3}",
                    report.trimmed,
                    cutoff
                );
                for var in self.variables.iter_mut() {
                    var.values.truncate(keep);
                }
                self.len = keep;
            }
        }

        let (keep, anomalies) = validate_times(block.time(), self.last_time());
        for a in &anomalies {
            log::warn!(
                "Dropping record {}: {} ({:.3} {:.3} {:.3})",
                a.index,
                a.kind.as_str(),
                a.previous,
                a.current,
                a.next
            );
        }
        report.dropped = anomalies.len();
        block.retain_indices(&keep);

        let incoming = block.len();
        if self.len + incoming > self.capacity {
            return Err(CoreError::CapacityExceeded {
                capacity: self.capacity,
                required: self.len + incoming,
            });
        }

        let mut filled = vec![false; self.variables.len()];
        for (name, column) in block.names.iter().zip(block.columns) {
            let slot = self.variable_slot(name);
            if slot >= filled.len() {
                filled.resize(slot + 1, false);
            }
            self.variables[slot].values.extend(column);
            filled[slot] = true;
        }
        for (var, done) in self.variables.iter_mut().zip(&filled) {
            if !done {
                var.values.resize(self.len + incoming, f64::NAN);
            }
        }

        self.len += incoming;
        report.appended = incoming;
        Ok(report)
    }

    /// Drop the first `consumed` records, moving the rest to the front.
    pub fn shift(&mut self, consumed: usize) {
        let consumed = consumed.min(self.len);
        for var in self.variables.iter_mut() {
            var.values.drain(..consumed);
        }
        self.len -= consumed;
    }

    /// Refresh the empty flag of every variable over `range` and return the
    /// names of the empty ones.
    pub fn mark_empty(&mut self, range: Range<usize>) -> Vec<String> {
        let mut empty = Vec::new();
        for var in self.variables.iter_mut() {
            var.empty = var.values[range.clone()].iter().all(|v| v.is_nan());
            if var.empty {
                empty.push(var.name.clone());
            }
        }
        empty
    }
}
