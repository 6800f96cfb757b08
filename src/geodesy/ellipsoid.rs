//! Reference ellipsoids and the height difference between them

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ellipsoid {
    Wgs84,
    Topex,
}

impl Ellipsoid {
    pub fn semi_major_axis(&self) -> f64 {
        match self {
            Ellipsoid::Wgs84 => 6_378_137.0,
            Ellipsoid::Topex => 6_378_136.3,
        }
    }

    pub fn flattening(&self) -> f64 {
        match self {
            Ellipsoid::Wgs84 => 1.0 / 298.257_223_563,
            Ellipsoid::Topex => 1.0 / 298.257,
        }
    }

    /// First-order radius of the ellipsoid at geodetic latitude `lat` (deg)
    fn radius(&self, lat: f64) -> f64 {
        let s = lat.to_radians().sin();
        self.semi_major_axis() * (1.0 - self.flattening() * s * s)
    }

    /// Height difference (metres) to add to a height above WGS84 to get the
    /// height above `self` at latitude `lat` (degrees).
    pub fn correction_from_wgs84(&self, lat: f64) -> f64 {
        match self {
            Ellipsoid::Wgs84 => 0.0,
            _ => Ellipsoid::Wgs84.radius(lat) - self.radius(lat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_is_identity() {
        assert_eq!(Ellipsoid::Wgs84.correction_from_wgs84(45.0), 0.0);
    }

    #[test]
    fn test_topex_offset_equator_and_pole() {
        let equator = Ellipsoid::Topex.correction_from_wgs84(0.0);
        let pole = Ellipsoid::Topex.correction_from_wgs84(90.0);
        assert!((equator - 0.7).abs() < 1e-9);

        let semi_minor = |e: Ellipsoid| e.semi_major_axis() * (1.0 - e.flattening());
        let expected = semi_minor(Ellipsoid::Wgs84) - semi_minor(Ellipsoid::Topex);
        assert!((expected - 0.7137).abs() < 1e-3);
        assert!((pole - expected).abs() < 1e-6);
        assert!(Ellipsoid::Topex.correction_from_wgs84(f64::NAN).is_nan());
    }
}
