//! 20 Hz → 1 Hz reduction with a per-subsample validity mask

use super::CoreError;

/// High-rate sub-samples per 1 Hz record
pub const SUBSAMPLES: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct HighRateSummary {
    pub mean: Vec<f64>,
    pub rms: Vec<f64>,
    /// Valid sub-samples per record, kept as f64 so it can live in the buffer
    pub count: Vec<f64>,
}

/// A sub-sample is valid when its quality flag is zero and its value finite.
/// Without flags only finiteness counts.
pub fn validity_mask(samples: &[f64], flags: Option<&[f64]>) -> Result<Vec<bool>, CoreError> {
    match flags {
        Some(flags) => {
            if flags.len() != samples.len() {
                return Err(CoreError::LengthMismatch {
                    what: "high-rate flags",
                    expected: samples.len(),
                    actual: flags.len(),
                });
            }
            Ok(samples
                .iter()
                .zip(flags)
                .map(|(s, f)| s.is_finite() && *f == 0.0)
                .collect())
        }
        None => Ok(samples.iter().map(|s| s.is_finite()).collect()),
    }
}

/// Mean and sample RMS over the valid sub-samples of every record.
///
/// No valid sub-sample gives a NaN mean; fewer than two give a NaN RMS.
pub fn mean_rms(samples: &[f64], valid: &[bool], width: usize) -> Result<HighRateSummary, CoreError> {
    if valid.len() != samples.len() {
        return Err(CoreError::LengthMismatch {
            what: "high-rate validity mask",
            expected: samples.len(),
            actual: valid.len(),
        });
    }
    if width == 0 || samples.len() % width != 0 {
        return Err(CoreError::LengthMismatch {
            what: "high-rate rows",
            expected: width,
            actual: samples.len(),
        });
    }

    let records = samples.len() / width;
    let mut summary = HighRateSummary {
        mean: Vec::with_capacity(records),
        rms: Vec::with_capacity(records),
        count: Vec::with_capacity(records),
    };

    for (row, mask) in samples.chunks_exact(width).zip(valid.chunks_exact(width)) {
        let mut n = 0usize;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for (x, _) in row.iter().zip(mask).filter(|(_, ok)| **ok) {
            n += 1;
            sum += x;
            sum_sq += x * x;
        }

        let mean = if n > 0 { sum / n as f64 } else { f64::NAN };
        let rms = if n > 1 {
            ((sum_sq - n as f64 * mean * mean) / (n - 1) as f64).max(0.0).sqrt()
        } else {
            f64::NAN
        };

        summary.mean.push(mean);
        summary.rms.push(rms);
        summary.count.push(n as f64);
    }

    Ok(summary)
}
