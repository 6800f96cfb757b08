//! Orbit and ellipsoid utilities
//!
//! The core treats these as pure lookups: classify a time into its pass, and
//! convert heights between reference ellipsoids.

pub mod ellipsoid;
pub mod orbit;

pub use ellipsoid::Ellipsoid;
pub use orbit::{MissionSpec, NominalOrbit, PhaseSpec};

/// Where one timestamp falls in the mission's pass sequence
#[derive(Debug, Clone, PartialEq)]
pub struct PassIdentity {
    /// First classification of a pass since the previous one
    pub new_pass: bool,
    pub orbit: i64,
    pub phase: String,
    pub cycle: i32,
    pub pass: i32,
    /// sec85 time of the equator crossing anchoring the pass
    pub equator_time: f64,
    /// Degrees east, in [0, 360)
    pub equator_lon: f64,
}

impl PassIdentity {
    pub fn same_pass(&self, other: &PassIdentity) -> bool {
        self.cycle == other.cycle && self.pass == other.pass && self.phase == other.phase
    }
}

/// Geodesy collaborator bound to one mission
pub trait Geodesy {
    fn mission(&self) -> &str;

    fn classify(&mut self, time: f64) -> PassIdentity;

    /// Height to add to a WGS84 height to express it on the mission ellipsoid
    fn ellipsoid_correction(&self, latitude: f64) -> f64;
}
