//! Time-order validation for a freshly decoded block

/// Minimum spacing between two retained records (seconds)
pub const MIN_STEP: f64 = 0.5;

/// A record this far above both neighbours is a spike (seconds)
pub const SPIKE_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    /// Later than both neighbours by more than a second
    Spike,
    /// Less than half a second after the previous retained record
    TooClose,
    /// Time is NaN or infinite
    Invalid,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::Spike => "time spike",
            AnomalyKind::TooClose => "duplicate or inverted time",
            AnomalyKind::Invalid => "invalid time",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeAnomaly {
    pub index: usize,
    pub kind: AnomalyKind,
    /// Previous retained time, NaN when there is none
    pub previous: f64,
    pub current: f64,
    /// Following time in the block, NaN at the end
    pub next: f64,
}

/// Forward scan over `times`, returning the indices to keep and the dropped
/// anomalies.
///
/// `predecessor` is the last retained time before this block, so the first
/// record is checked against data already in the buffer. Kept times are
/// strictly increasing, each at least [`MIN_STEP`] after its predecessor.
pub fn validate_times(times: &[f64], predecessor: Option<f64>) -> (Vec<usize>, Vec<TimeAnomaly>) {
    let mut keep = Vec::with_capacity(times.len());
    let mut anomalies = Vec::new();
    let mut last = predecessor;

    for (index, &current) in times.iter().enumerate() {
        let next = times.get(index + 1).copied();

        let kind = if !current.is_finite() {
            Some(AnomalyKind::Invalid)
        } else {
            match (last, next) {
                (Some(p), Some(n)) if current > p + SPIKE_THRESHOLD && current > n + SPIKE_THRESHOLD => {
                    Some(AnomalyKind::Spike)
                }
                (Some(p), _) if current - p < MIN_STEP => Some(AnomalyKind::TooClose),
                _ => None,
            }
        };

        match kind {
            Some(kind) => anomalies.push(TimeAnomaly {
                index,
                kind,
                previous: last.unwrap_or(f64::NAN),
                current,
                next: next.unwrap_or(f64::NAN),
            }),
            None => {
                keep.push(index);
                last = Some(current);
            }
        }
    }

    (keep, anomalies)
}
