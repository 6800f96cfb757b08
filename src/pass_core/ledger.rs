//! Correction flag bookkeeping
//!
//! Every record carries two bit words: which corrections were already
//! applied to the range ("applied") and which correction values are suspect
//! ("in error"). Each bit maps to exactly one correction through
//! [`CorrectionFlag`]; the mapping itself lives in the mission layout.

use super::CoreError;

/// How a correction interacts with the flag words.
///
/// Mirrors the signed bit-index convention of the mission products: a
/// positive index means "accumulate when applied, invalidate when in error",
/// a negative index means "invalidate when in error" only, and no index means
/// the value is stored untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionFlag {
    Applied(u8),
    ErrorOnly(u8),
    Unflagged,
}

impl CorrectionFlag {
    pub fn from_bit_index(index: Option<i8>) -> Self {
        match index {
            Some(b) if b >= 0 => CorrectionFlag::Applied(b as u8),
            Some(b) => CorrectionFlag::ErrorOnly(b.unsigned_abs()),
            None => CorrectionFlag::Unflagged,
        }
    }

    pub fn applied_bit(&self) -> Option<u8> {
        match self {
            CorrectionFlag::Applied(b) => Some(*b),
            _ => None,
        }
    }

    pub fn error_bit(&self) -> Option<u8> {
        match self {
            CorrectionFlag::Applied(b) | CorrectionFlag::ErrorOnly(b) => Some(*b),
            CorrectionFlag::Unflagged => None,
        }
    }
}

fn bit_set(word: f64, bit: u8) -> bool {
    word.is_finite() && word >= 0.0 && ((word as u64) >> bit) & 1 == 1
}

/// Per-granule accumulator of applied corrections
#[derive(Debug, Clone)]
pub struct CorrectionLedger {
    applied: Vec<f64>,
    in_error: Vec<f64>,
    total: Vec<f64>,
}

impl CorrectionLedger {
    /// Flag words are read as f64 because the extractor hands out f64 arrays.
    pub fn new(applied: Vec<f64>, in_error: Vec<f64>) -> Result<Self, CoreError> {
        if applied.len() != in_error.len() {
            return Err(CoreError::LengthMismatch {
                what: "correction flag words",
                expected: applied.len(),
                actual: in_error.len(),
            });
        }
        let total = vec![0.0; applied.len()];
        Ok(Self {
            applied,
            in_error,
            total,
        })
    }

    pub fn len(&self) -> usize {
        self.total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }

    /// Sum of all corrections flagged as applied, per record
    pub fn total_applied(&self) -> &[f64] {
        &self.total
    }

    /// Fold one correction into the ledger.
    ///
    /// Applied values are accumulated before in-error values are nulled, so a
    /// record flagged both ways still undoes what was applied.
    pub fn apply(&mut self, values: &mut [f64], flag: CorrectionFlag) -> Result<(), CoreError> {
        if values.len() != self.total.len() {
            return Err(CoreError::LengthMismatch {
                what: "correction values",
                expected: self.total.len(),
                actual: values.len(),
            });
        }

        if let Some(bit) = flag.applied_bit() {
            for ((total, value), word) in self.total.iter_mut().zip(values.iter()).zip(&self.applied) {
                if bit_set(*word, bit) {
                    *total += value;
                }
            }
        }

        if let Some(bit) = flag.error_bit() {
            for (value, word) in values.iter_mut().zip(&self.in_error) {
                if bit_set(*word, bit) {
                    *value = f64::NAN;
                }
            }
        }

        Ok(())
    }

    /// Compare the accumulated total with an independently supplied one.
    ///
    /// Returns the indices of records differing by more than `tolerance`;
    /// records where either side is NaN are not compared.
    pub fn cross_check(&self, reference: &[f64], tolerance: f64) -> Result<Vec<usize>, CoreError> {
        if reference.len() != self.total.len() {
            return Err(CoreError::LengthMismatch {
                what: "total correction cross-check",
                expected: self.total.len(),
                actual: reference.len(),
            });
        }
        Ok(self
            .total
            .iter()
            .zip(reference)
            .enumerate()
            .filter(|(_, (a, b))| a.is_finite() && b.is_finite() && (*a - *b).abs() > tolerance)
            .map(|(i, _)| i)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_bit_accumulates() {
        let mut ledger = CorrectionLedger::new(vec![0.0, 8.0, 8.0], vec![0.0; 3]).unwrap();
        let mut values = vec![1.5, 2.5, -0.25];
        ledger.apply(&mut values, CorrectionFlag::Applied(3)).unwrap();
        assert_eq!(ledger.total_applied(), &[0.0, 2.5, -0.25]);
        assert_eq!(values, vec![1.5, 2.5, -0.25]);
    }

    #[test]
    fn test_error_bit_nulls_value_not_total() {
        // Bit 2 in error only: value becomes NaN, nothing accumulated
        let mut ledger = CorrectionLedger::new(vec![0.0], vec![4.0]).unwrap();
        let mut values = vec![0.7];
        ledger.apply(&mut values, CorrectionFlag::Applied(2)).unwrap();
        assert!(values[0].is_nan());
        assert_eq!(ledger.total_applied(), &[0.0]);
    }

    #[test]
    fn test_applied_and_error_same_bit() {
        let mut ledger = CorrectionLedger::new(vec![2.0], vec![2.0]).unwrap();
        let mut values = vec![0.3];
        ledger.apply(&mut values, CorrectionFlag::Applied(1)).unwrap();
        assert_eq!(ledger.total_applied(), &[0.3]);
        assert!(values[0].is_nan());
    }

    #[test]
    fn test_error_only_never_accumulates() {
        let mut ledger = CorrectionLedger::new(vec![1024.0, 1024.0], vec![0.0, 1024.0]).unwrap();
        let mut values = vec![0.1, 0.2];
        ledger.apply(&mut values, CorrectionFlag::ErrorOnly(10)).unwrap();
        assert_eq!(ledger.total_applied(), &[0.0, 0.0]);
        assert_eq!(values[0], 0.1);
        assert!(values[1].is_nan());
    }

    #[test]
    fn test_unflagged_untouched() {
        let mut ledger = CorrectionLedger::new(vec![u32::MAX as f64], vec![u32::MAX as f64]).unwrap();
        let mut values = vec![9.0];
        ledger.apply(&mut values, CorrectionFlag::Unflagged).unwrap();
        assert_eq!(values, vec![9.0]);
        assert_eq!(ledger.total_applied(), &[0.0]);
    }

    #[test]
    fn test_other_bits_ignored() {
        let mut ledger = CorrectionLedger::new(vec![1.0 + 4.0], vec![2.0]).unwrap();
        let mut values = vec![0.5];
        ledger.apply(&mut values, CorrectionFlag::Applied(1)).unwrap();
        assert_eq!(ledger.total_applied(), &[0.0]);
        assert!(values[0].is_nan());
    }

    #[test]
    fn test_from_bit_index() {
        assert_eq!(CorrectionFlag::from_bit_index(Some(4)), CorrectionFlag::Applied(4));
        assert_eq!(CorrectionFlag::from_bit_index(Some(-10)), CorrectionFlag::ErrorOnly(10));
        assert_eq!(CorrectionFlag::from_bit_index(None), CorrectionFlag::Unflagged);
        assert_eq!(CorrectionFlag::ErrorOnly(10).applied_bit(), None);
        assert_eq!(CorrectionFlag::ErrorOnly(10).error_bit(), Some(10));
    }

    #[test]
    fn test_cross_check_reports_mismatch() {
        let mut ledger = CorrectionLedger::new(vec![1.0; 3], vec![0.0; 3]).unwrap();
        let mut values = vec![0.100, 0.200, f64::NAN];
        ledger.apply(&mut values, CorrectionFlag::Applied(0)).unwrap();
        let mismatches = ledger.cross_check(&[0.1004, 0.250, 0.0], 0.001).unwrap();
        assert_eq!(mismatches, vec![1]);
    }

    #[test]
    fn test_length_mismatch_is_error() {
        assert!(CorrectionLedger::new(vec![0.0; 2], vec![0.0; 3]).is_err());
        let mut ledger = CorrectionLedger::new(vec![0.0; 2], vec![0.0; 2]).unwrap();
        assert!(ledger.apply(&mut [1.0], CorrectionFlag::Applied(0)).is_err());
        assert!(ledger.cross_check(&[0.0], 0.001).is_err());
    }
}
