//! Mission record layout
//!
//! The fixed set of quantities read from every granule, with their source
//! expressions, unit scales and correction-flag bits. Built once and shared.

use super::ledger::CorrectionFlag;

pub const RECORD_DIMENSION: &str = "time_01";

pub const TIME_FIELD: &str = "time_01";
pub const LATITUDE_FIELD: &str = "lat_01";
pub const LONGITUDE_FIELD: &str = "lon_01";
pub const ALTITUDE_FIELD: &str = "alt_01";

pub const APPLIED_FLAGS_FIELD: &str = "flag_cor_applied_01";
pub const ERROR_FLAGS_FIELD: &str = "flag_cor_err_01";
pub const TOTAL_APPLIED_FIELD: &str = "tot_cor_applied_01";
pub const HIGH_RATE_FLAGS_FIELD: &str = "flag_meas_20_ku";

pub const PRODUCT_NAME_ATTRIBUTE: &str = "product_name";
pub const BASELINE_ATTRIBUTE: &str = "processing_baseline";

/// Microdegrees to degrees
pub const MICRODEGREE: f64 = 1e-6;
/// Millimetres to metres
pub const MILLIMETRE: f64 = 1e-3;

/// Output name of the corrected range; the ledger total is subtracted from it
pub const RANGE_OUTPUT: &str = "range_ku";
/// Maximum disagreement between the ledger total and the product's own total
pub const CROSS_CHECK_TOLERANCE: f64 = 1e-3;

/// A plain 1 Hz quantity
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub source: &'static str,
    pub scale: f64,
}

/// A correction term with its place in the flag words
#[derive(Debug, Clone, Copy)]
pub struct CorrectionSpec {
    pub name: &'static str,
    pub source: &'static str,
    pub scale: f64,
    pub flag: CorrectionFlag,
}

/// A 20 Hz quantity reduced to mean, RMS and valid count
#[derive(Debug, Clone, Copy)]
pub struct HighRateSpec {
    /// Output stem; produces `<stem>_ku`, `<stem>_rms_ku`, `<stem>_numval_ku`
    pub stem: &'static str,
    pub source: &'static str,
    pub scale: f64,
}

impl HighRateSpec {
    pub fn mean_name(&self) -> String {
        format!("{}_ku", self.stem)
    }

    pub fn rms_name(&self) -> String {
        format!("{}_rms_ku", self.stem)
    }

    pub fn count_name(&self) -> String {
        format!("{}_numval_ku", self.stem)
    }
}

#[derive(Debug, Clone)]
pub struct MissionLayout {
    pub fields: Vec<FieldSpec>,
    pub high_rate: Vec<HighRateSpec>,
    pub corrections: Vec<CorrectionSpec>,
}

impl MissionLayout {
    pub fn reference() -> Self {
        let fields = vec![
            FieldSpec { name: "alt_rate", source: "orb_alt_rate_01", scale: MILLIMETRE },
            FieldSpec { name: "surface_type", source: "surf_type_01", scale: 1.0 },
            FieldSpec { name: "wind_speed_alt", source: "wind_speed_alt_01_ku", scale: MILLIMETRE },
        ];

        let high_rate = vec![
            HighRateSpec { stem: "range", source: "range_ocean_20_ku", scale: MILLIMETRE },
            HighRateSpec { stem: "swh", source: "swh_ocean_20_ku", scale: MILLIMETRE },
            HighRateSpec { stem: "sig0", source: "sig0_ocean_20_ku", scale: 1e-2 },
        ];

        let correction = |name, source, bit: Option<i8>| CorrectionSpec {
            name,
            source,
            scale: MILLIMETRE,
            flag: CorrectionFlag::from_bit_index(bit),
        };
        let corrections = vec![
            correction("dry_tropo_ecmwf", "mod_dry_tropo_cor_01", Some(0)),
            correction("wet_tropo_ecmwf", "mod_wet_tropo_cor_01", Some(1)),
            correction("inv_bar_static", "inv_bar_cor_01", Some(2)),
            correction("inv_bar_mog2d", "inv_bar_cor_01+hf_fluct_cor_01", Some(3)),
            correction("iono_gim", "iono_cor_gim_01", Some(4)),
            correction("tide_ocean_got", "ocean_tide_01", Some(5)),
            correction("tide_load_got", "load_tide_01", Some(6)),
            correction("tide_equil", "ocean_tide_eq_01", Some(7)),
            correction("tide_solid", "solid_earth_tide_01", Some(8)),
            correction("tide_pole", "pole_tide_01", Some(9)),
            correction("ssb", "sea_state_bias_01_ku", Some(-10)),
            correction("mss", "mean_sea_surf_01", None),
            correction("geoid", "geoid_01", None),
        ];

        Self {
            fields,
            high_rate,
            corrections,
        }
    }

    pub fn correction(&self, name: &str) -> Option<&CorrectionSpec> {
        self.corrections.iter().find(|c| c.name == name)
    }
}
