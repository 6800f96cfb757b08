//! Which granules the buffered records came from

use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpan {
    pub product: String,
    pub baseline: Option<String>,
    pub first_time: f64,
    pub last_time: f64,
}

/// Spans of every granule that may still have records in the buffer, oldest first
#[derive(Debug, Default)]
pub struct ProvenanceLog {
    spans: VecDeque<SourceSpan>,
}

impl ProvenanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn record(&mut self, span: SourceSpan) {
        self.spans.push_back(span);
    }

    /// Forget granules whose records all precede `time`.
    pub fn prune_before(&mut self, time: f64) {
        while self.spans.front().is_some_and(|s| s.last_time < time) {
            self.spans.pop_front();
        }
    }

    /// Cut every span back to `last_retained` after an overlap trim,
    /// dropping granules that no longer have any record in the buffer.
    pub fn truncate_after(&mut self, last_retained: Option<f64>) {
        match last_retained {
            Some(t) => {
                self.spans.retain(|s| s.first_time <= t);
                for span in self.spans.iter_mut() {
                    span.last_time = span.last_time.min(t);
                }
            }
            None => self.spans.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }

    /// Products and distinct baselines overlapping `[first, last]`, space-joined.
    pub fn describe(&self, first: f64, last: f64) -> (String, String) {
        let overlapping: Vec<&SourceSpan> = self
            .spans
            .iter()
            .filter(|s| s.first_time <= last && s.last_time >= first)
            .collect();

        let products: Vec<&str> = overlapping.iter().map(|s| s.product.as_str()).collect();

        let mut baselines: Vec<&str> = Vec::new();
        for b in overlapping.iter().filter_map(|s| s.baseline.as_deref()) {
            if !baselines.contains(&b) {
                baselines.push(b);
            }
        }

        (products.join(" "), baselines.join(" "))
    }
}
