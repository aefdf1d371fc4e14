//! Transverse Mercator projection on the WGS84 ellipsoid.
//!
//! Uses the Krüger n-series (third order), which keeps forward errors at the
//! millimetre level within a few thousand kilometres of the central meridian.
//! That is far beyond the 6° width of a UTM zone.
//!
//! The projection parameters include:
//! - Central meridian (lon0)
//! - Scale factor on the central meridian (k0)
//! - False easting / false northing in metres

use std::f64::consts::FRAC_PI_2;

use crate::utm::{Hemisphere, UtmZone};

/// WGS84 semi-major axis (metres)
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// UTM scale factor on the central meridian
pub const UTM_K0: f64 = 0.9996;
/// UTM false easting (metres)
pub const UTM_FALSE_EASTING: f64 = 500_000.0;
/// UTM false northing for the southern hemisphere (metres)
pub const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Transverse Mercator projection parameters.
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    /// False easting (metres)
    pub false_easting: f64,
    /// False northing (metres)
    pub false_northing: f64,
    /// First eccentricity
    e: f64,
    /// Rectifying radius
    big_a: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

impl TransverseMercator {
    /// Create a projection on the WGS84 ellipsoid.
    ///
    /// # Arguments
    /// * `lon0_deg` - Central meridian (degrees)
    /// * `k0` - Scale factor on the central meridian
    /// * `false_easting` - Added to x (metres)
    /// * `false_northing` - Added to y (metres)
    pub fn new(lon0_deg: f64, k0: f64, false_easting: f64, false_northing: f64) -> Self {
        let f = WGS84_F;
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;

        let big_a = WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);

        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
            61.0 * n3 / 240.0,
        ];
        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
            n2 / 48.0 + n3 / 15.0,
            17.0 * n3 / 480.0,
        ];
        let delta = [
            2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
            7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
            56.0 * n3 / 15.0,
        ];

        Self {
            lon0: lon0_deg.to_radians(),
            k0,
            false_easting,
            false_northing,
            e: (f * (2.0 - f)).sqrt(),
            big_a,
            alpha,
            beta,
            delta,
        }
    }

    /// Create the projection for a UTM zone.
    pub fn utm(zone: UtmZone) -> Self {
        let false_northing = match zone.hemisphere() {
            Hemisphere::North => 0.0,
            Hemisphere::South => UTM_FALSE_NORTHING_SOUTH,
        };
        Self::new(zone.central_meridian(), UTM_K0, UTM_FALSE_EASTING, false_northing)
    }

    /// Central meridian in degrees.
    pub fn central_meridian(&self) -> f64 {
        self.lon0.to_degrees()
    }

    /// Convert geographic coordinates (degrees) to projected (x, y) in metres.
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let phi = lat_deg.to_radians();
        let dlon = normalize_lon(lon_deg.to_radians() - self.lon0);

        let sin_phi = phi.sin();
        // Conformal latitude, as tan. Poles map onto xi' = ±π/2, eta' = 0.
        let (xi_p, eta_p) = if sin_phi.abs() >= 1.0 {
            (FRAC_PI_2.copysign(sin_phi), 0.0)
        } else {
            let t = (sin_phi.atanh() - self.e * (self.e * sin_phi).atanh()).sinh();
            (
                t.atan2(dlon.cos()),
                (dlon.sin() / (1.0 + t * t).sqrt()).atanh(),
            )
        };

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += alpha * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += alpha * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        let x = self.false_easting + self.k0 * self.big_a * eta;
        let y = self.false_northing + self.k0 * self.big_a * xi;
        (x, y)
    }

    /// Convert projected (x, y) in metres to geographic coordinates.
    ///
    /// Returns (lat, lon) in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let xi = (y - self.false_northing) / (self.k0 * self.big_a);
        let eta = (x - self.false_easting) / (self.k0 * self.big_a);

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, beta) in self.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        let chi = (xi_p.sin() / eta_p.cosh()).clamp(-1.0, 1.0).asin();
        let mut phi = chi;
        for (j, delta) in self.delta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            phi += delta * (k * chi).sin();
        }

        let lon = self.lon0 + eta_p.sinh().atan2(xi_p.cos());
        (phi.to_degrees(), lon.to_degrees())
    }
}

/// Normalize a longitude difference to [-π, π].
fn normalize_lon(mut dlon: f64) -> f64 {
    use std::f64::consts::PI;
    while dlon > PI {
        dlon -= 2.0 * PI;
    }
    while dlon < -PI {
        dlon += 2.0 * PI;
    }
    dlon
}
