//! Nominal repeat-orbit pass prediction
//!
//! A phase is a stretch of the mission flown on one repeat orbit. Passes are
//! half revolutions of equal length starting at the reference equator
//! crossing; pass numbers run 1..=passes_per_cycle within each cycle.

use super::{Ellipsoid, Geodesy, PassIdentity};
use crate::config::ConfigError;

#[derive(Debug, Clone)]
pub struct PhaseSpec {
    pub name: String,
    /// sec85 time from which this phase is in force
    pub start_time: f64,
    pub first_cycle: i32,
    pub first_orbit: i64,
    /// Equator crossing opening pass 1 of `first_cycle` (sec85)
    pub equator_time: f64,
    pub equator_lon: f64,
    pub passes_per_cycle: i32,
    /// Cycle length in days
    pub repeat_days: f64,
    /// Nodal days per cycle, i.e. ground-track revolutions of the Earth
    pub repeat_nodal: f64,
}

impl PhaseSpec {
    pub fn pass_duration(&self) -> f64 {
        self.repeat_days * 86_400.0 / f64::from(self.passes_per_cycle)
    }

    /// Westward drift of the equator crossing between consecutive passes
    pub fn longitude_step(&self) -> f64 {
        180.0 - 360.0 * self.repeat_nodal / f64::from(self.passes_per_cycle)
    }
}

#[derive(Debug, Clone)]
pub struct MissionSpec {
    pub id: String,
    pub name: String,
    pub ellipsoid: Ellipsoid,
    /// Ordered by start time
    pub phases: Vec<PhaseSpec>,
}

impl MissionSpec {
    /// The single mission this crate processes.
    pub fn reference() -> Self {
        Self {
            id: "ra".to_string(),
            name: "Reference Altimeter".to_string(),
            ellipsoid: Ellipsoid::Topex,
            phases: vec![
                PhaseSpec {
                    name: "A".to_string(),
                    // 2016-01-17T00:00:00Z
                    start_time: 979_603_200.0,
                    first_cycle: 1,
                    first_orbit: 1,
                    equator_time: 979_603_200.0,
                    equator_lon: 130.0,
                    passes_per_cycle: 254,
                    repeat_days: 9.915_64,
                    repeat_nodal: 10.0,
                },
                PhaseSpec {
                    name: "B".to_string(),
                    // 2022-04-25T00:00:00Z, interleaved ground track
                    start_time: 1_177_459_200.0,
                    first_cycle: 1,
                    first_orbit: 30_000,
                    equator_time: 1_177_459_200.0,
                    equator_lon: 310.0,
                    passes_per_cycle: 254,
                    repeat_days: 9.915_64,
                    repeat_nodal: 10.0,
                },
            ],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "mission {} has no phases",
                self.id
            )));
        }
        for phase in &self.phases {
            if phase.passes_per_cycle <= 0 || phase.repeat_days <= 0.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "phase {} of mission {} has a degenerate repeat orbit",
                    phase.name, self.id
                )));
            }
        }
        if self.phases.windows(2).any(|w| w[1].start_time <= w[0].start_time) {
            return Err(ConfigError::InvalidValue(format!(
                "phases of mission {} are not ordered by start time",
                self.id
            )));
        }
        Ok(())
    }

    pub fn phase_at(&self, time: f64) -> &PhaseSpec {
        self.phases
            .iter()
            .rev()
            .find(|p| time >= p.start_time)
            .unwrap_or(&self.phases[0])
    }
}

/// Pass predictor for one mission.
///
/// Times before the first phase are extrapolated backwards on that phase.
pub struct NominalOrbit {
    spec: MissionSpec,
    last: Option<(String, i64)>,
}

impl NominalOrbit {
    pub fn new(spec: MissionSpec) -> Result<Self, ConfigError> {
        spec.validate()?;
        Ok(Self { spec, last: None })
    }

    pub fn spec(&self) -> &MissionSpec {
        &self.spec
    }
}

impl Geodesy for NominalOrbit {
    fn mission(&self) -> &str {
        &self.spec.id
    }

    fn classify(&mut self, time: f64) -> PassIdentity {
        let phase = self.spec.phase_at(time);
        let duration = phase.pass_duration();
        let per_cycle = i64::from(phase.passes_per_cycle);

        let k = ((time - phase.equator_time) / duration).floor() as i64;
        let identity = PassIdentity {
            new_pass: false,
            orbit: phase.first_orbit + k.div_euclid(2),
            phase: phase.name.clone(),
            cycle: phase.first_cycle + k.div_euclid(per_cycle) as i32,
            pass: k.rem_euclid(per_cycle) as i32 + 1,
            equator_time: phase.equator_time + k as f64 * duration,
            equator_lon: (phase.equator_lon + k as f64 * phase.longitude_step()).rem_euclid(360.0),
        };

        let key = (identity.phase.clone(), k);
        let new_pass = self.last.as_ref() != Some(&key);
        self.last = Some(key);

        PassIdentity { new_pass, ..identity }
    }

    fn ellipsoid_correction(&self, latitude: f64) -> f64 {
        self.spec.ellipsoid.correction_from_wgs84(latitude)
    }
}
