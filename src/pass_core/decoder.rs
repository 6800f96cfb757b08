//! Granule → 1 Hz record block
//!
//! Drives the field extractor, the 20 Hz aggregator and the correction ledger
//! over the mission layout for one opened granule.

use super::aggregate::{mean_rms, validity_mask, SUBSAMPLES};
use super::buffer::RecordBlock;
use super::layout::*;
use super::ledger::CorrectionLedger;
use super::CoreError;
use crate::epoch::SEC85_AT_2000;
use crate::geodesy::Geodesy;
use crate::granule::{FieldExtractor, Granule};
use std::path::Path;

/// Product variant, read from the granule file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductVariant {
    /// Final geophysical data record
    Final,
    /// Interim geophysical data record
    Interim,
}

impl ProductVariant {
    /// Looks for a `GDR` or `IGDR` token among the `_`-separated parts of the
    /// file stem.
    pub fn from_path(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        stem.split('_').find_map(|token| match token {
            "GDR" => Some(ProductVariant::Final),
            "IGDR" => Some(ProductVariant::Interim),
            _ => None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductVariant::Final => "GDR",
            ProductVariant::Interim => "IGDR",
        }
    }

    /// Only final products carry a trustworthy total-applied field
    pub fn cross_checks_total(&self) -> bool {
        matches!(self, ProductVariant::Final)
    }
}

#[derive(Debug)]
pub struct DecodedGranule {
    pub block: RecordBlock,
    pub variant: ProductVariant,
    pub product_name: String,
    pub baseline: Option<String>,
    /// Fields that could not be extracted (left at zero)
    pub missing_fields: usize,
    pub cross_check_mismatches: usize,
}

pub struct GranuleDecoder {
    layout: MissionLayout,
}

impl GranuleDecoder {
    pub fn new(layout: MissionLayout) -> Self {
        Self { layout }
    }

    /// Decode one granule.
    ///
    /// `Ok(None)` means the file is skipped (already reported); errors are
    /// internal consistency failures.
    pub fn decode(
        &self,
        granule: &dyn Granule,
        geodesy: &dyn Geodesy,
    ) -> Result<Option<DecodedGranule>, CoreError> {
        let path = granule.path();

        let variant = match ProductVariant::from_path(path) {
            Some(v) => v,
            None => {
                log::warn!("Skipping {}: not a GDR or IGDR product", path.display());
                return Ok(None);
            }
        };

        let records = granule.dimension(RECORD_DIMENSION).unwrap_or(0);
        if records == 0 {
            log::warn!("Skipping {}: no records", path.display());
            return Ok(None);
        }

        let mut extractor = FieldExtractor::new(granule, records);

        let time = match extractor.fetch(TIME_FIELD, 1.0) {
            Some(t) => t.into_iter().map(|t| t + SEC85_AT_2000).collect(),
            None => {
                log::warn!("Skipping {}: no usable time field", path.display());
                return Ok(None);
            }
        };
        let mut block = RecordBlock::new(time);

        let mut lat = vec![0.0; records];
        extractor.fill(LATITUDE_FIELD, MICRODEGREE, &mut lat);
        let mut lon = vec![0.0; records];
        extractor.fill(LONGITUDE_FIELD, MICRODEGREE, &mut lon);

        let mut alt = vec![0.0; records];
        extractor.fill(ALTITUDE_FIELD, MILLIMETRE, &mut alt);
        for (a, phi) in alt.iter_mut().zip(&lat) {
            *a += geodesy.ellipsoid_correction(*phi);
        }

        block.push("lat", lat)?;
        block.push("lon", lon)?;
        block.push("alt", alt)?;

        for field in &self.layout.fields {
            let mut values = vec![0.0; records];
            extractor.fill(field.source, field.scale, &mut values);
            block.push(field.name, values)?;
        }

        let flags = extractor.fetch_2d(HIGH_RATE_FLAGS_FIELD, 1.0, SUBSAMPLES);
        let mut high_rate = Vec::with_capacity(self.layout.high_rate.len() * 3);
        for spec in &self.layout.high_rate {
            let (mean, rms, count) = match extractor.fetch_2d(spec.source, spec.scale, SUBSAMPLES) {
                Some(samples) => {
                    let valid = validity_mask(&samples, flags.as_deref())?;
                    let summary = mean_rms(&samples, &valid, SUBSAMPLES)?;
                    (summary.mean, summary.rms, summary.count)
                }
                None => (
                    vec![f64::NAN; records],
                    vec![f64::NAN; records],
                    vec![0.0; records],
                ),
            };
            high_rate.push((spec.mean_name(), mean));
            high_rate.push((spec.rms_name(), rms));
            high_rate.push((spec.count_name(), count));
        }

        let applied = extractor
            .fetch(APPLIED_FLAGS_FIELD, 1.0)
            .unwrap_or_else(|| vec![0.0; records]);
        let in_error = extractor
            .fetch(ERROR_FLAGS_FIELD, 1.0)
            .unwrap_or_else(|| vec![0.0; records]);
        let mut ledger = CorrectionLedger::new(applied, in_error)?;

        for correction in &self.layout.corrections {
            let mut values = vec![0.0; records];
            extractor.fill(correction.source, correction.scale, &mut values);
            ledger.apply(&mut values, correction.flag)?;
            block.push(correction.name, values)?;
        }

        if let Some((_, range)) = high_rate.iter_mut().find(|(name, _)| name == RANGE_OUTPUT) {
            for (r, total) in range.iter_mut().zip(ledger.total_applied()) {
                *r -= total;
            }
        }
        for (name, values) in high_rate {
            block.push(name, values)?;
        }

        let mut cross_check_mismatches = 0;
        if variant.cross_checks_total() && extractor.has_field(TOTAL_APPLIED_FIELD) {
            if let Some(reference) = extractor.fetch(TOTAL_APPLIED_FIELD, MILLIMETRE) {
                let mismatches = ledger.cross_check(&reference, CROSS_CHECK_TOLERANCE)?;
                for &i in &mismatches {
                    log::warn!(
                        "{}: record {} applied corrections sum to {:.4} m, product says {:.4} m",
                        path.display(),
                        i,
                        ledger.total_applied()[i],
                        reference[i]
                    );
                }
                cross_check_mismatches = mismatches.len();
            }
        }

        let product_name = granule
            .attribute(PRODUCT_NAME_ATTRIBUTE)
            .map(str::to_string)
            .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default();
        let baseline = granule.attribute(BASELINE_ATTRIBUTE).map(str::to_string);

        log::debug!(
            "Decoded {} ({}, {} records, {} missing fields)",
            path.display(),
            variant.as_str(),
            records,
            extractor.missing_count()
        );

        Ok(Some(DecodedGranule {
            block,
            variant,
            product_name,
            baseline,
            missing_fields: extractor.missing_count(),
            cross_check_mismatches,
        }))
    }
}
