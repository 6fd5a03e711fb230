//! Solar ephemeris and the day/night terminator.
//!
//! Sun altitude uses the low-precision solar coordinates (mean anomaly,
//! equation of center, obliquity 23.4397°), which are good to a fraction of a
//! degree and plenty for a terminator sampled every 10° of longitude.

use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::data::City;
use crate::geo::{ring_contains, LonLat};

const DAY_MS: f64 = 86_400_000.0;
const J1970: f64 = 2_440_588.0;
const J2000: f64 = 2_451_545.0;
const OBLIQUITY: f64 = 23.4397 * PI / 180.0;

/// Accepted terminator step range, in degrees.
const MIN_STEP: f64 = 0.1;
const MAX_STEP: f64 = 90.0;

/// Longitude step between terminator samples, in degrees.
pub const DEFAULT_PRECISION_LON: f64 = 10.0;
/// Latitude step of the per-longitude scan, in degrees.
pub const DEFAULT_PRECISION_LAT: f64 = 1.0;

fn days_since_j2000(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / DAY_MS - 0.5 + J1970 - J2000
}

/// Sun's declination and right ascension (radians) for a day number.
fn sun_coords(d: f64) -> (f64, f64) {
    let m = (357.5291 + 0.985_600_28 * d).to_radians();
    let center = (1.9148 * m.sin() + 0.02 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin()).to_radians();
    let perihelion = 102.9372f64.to_radians();
    let l = m + center + perihelion + PI;

    let declination = (l.sin() * OBLIQUITY.sin()).asin();
    let right_ascension = (l.sin() * OBLIQUITY.cos()).atan2(l.cos());
    (declination, right_ascension)
}

/// Sun altitude above the horizon at (lat, lon), in radians.
pub fn solar_altitude(at: DateTime<Utc>, lat: f64, lon: f64) -> f64 {
    let d = days_since_j2000(at);
    let (dec, ra) = sun_coords(d);
    let lw = (-lon).to_radians();
    let phi = lat.to_radians();
    let sidereal = (280.16 + 360.985_623_5 * d).to_radians() - lw;
    let hour_angle = sidereal - ra;
    (phi.sin() * dec.sin() + phi.cos() * dec.cos() * hour_angle.cos()).asin()
}

#[inline]
pub fn is_daylight(at: DateTime<Utc>, lat: f64, lon: f64) -> bool {
    solar_altitude(at, lat, lon) > 0.0
}

/// Whether the north pole currently sees the sun.
pub fn is_north_sun(at: DateTime<Utc>) -> bool {
    is_daylight(at, 90.0, 0.0)
}

/// Sampled day/night boundary for one instant.
#[derive(Clone, Debug)]
pub struct Terminator {
    /// (lon, lat) samples from -180° to 180°
    boundary: Vec<LonLat>,
    /// Boundary closed over the night-side pole
    night_ring: Vec<LonLat>,
    north_sun: bool,
}

impl Terminator {
    pub fn compute(at: DateTime<Utc>) -> Self {
        Self::with_precision(at, DEFAULT_PRECISION_LON, DEFAULT_PRECISION_LAT)
    }

    /// Scan each longitude from the night pole toward the lit pole and
    /// record the first latitude where the sun is up. Steps outside
    /// 0.1..=90 degrees fall back to the defaults.
    pub fn with_precision(at: DateTime<Utc>, precision_lon: f64, precision_lat: f64) -> Self {
        let step = |value: f64, default: f64| {
            if (MIN_STEP..=MAX_STEP).contains(&value) {
                value
            } else {
                warn!(value, "terminator step out of range, using {default}");
                default
            }
        };
        let precision_lon = step(precision_lon, DEFAULT_PRECISION_LON);
        let precision_lat = step(precision_lat, DEFAULT_PRECISION_LAT);
        let north_sun = is_north_sun(at);
        let (start, end, delta) = if north_sun {
            (-90.0, 90.0, precision_lat)
        } else {
            (90.0, -90.0, -precision_lat)
        };
        let lat_steps = (180.0 / precision_lat).round() as usize;
        let lon_samples = (360.0 / precision_lon).floor() as usize + 1;

        let boundary: Vec<LonLat> = (0..lon_samples)
            .map(|i| {
                let lon = -180.0 + i as f64 * precision_lon;
                let lat = (0..lat_steps)
                    .map(|j| start + j as f64 * delta)
                    .find(|&lat| is_daylight(at, lat, lon))
                    .unwrap_or(end);
                (lon, lat)
            })
            .collect();

        let night_pole = if north_sun { -90.0 } else { 90.0 };
        let mut night_ring = boundary.clone();
        if let (Some(&(last_lon, _)), Some(&(first_lon, _))) = (boundary.last(), boundary.first()) {
            night_ring.push((last_lon, night_pole));
            night_ring.push((first_lon, night_pole));
        }

        Self {
            boundary,
            night_ring,
            north_sun,
        }
    }

    pub fn boundary(&self) -> &[LonLat] {
        &self.boundary
    }

    /// Closed polygon covering the night side.
    pub fn night_ring(&self) -> &[LonLat] {
        &self.night_ring
    }

    pub fn north_sun(&self) -> bool {
        self.north_sun
    }

    pub fn is_night(&self, lon: f64, lat: f64) -> bool {
        ring_contains(&self.night_ring, lon, lat)
    }
}

/// Light glyph radius for a city of the given population.
pub fn city_light_radius(population: u64) -> f64 {
    match population {
        p if p < 200_000 => 0.3,
        p if p < 500_000 => 0.4,
        p if p < 2_000_000 => 0.6,
        p if p < 4_000_000 => 0.8,
        _ => 1.0,
    }
}

/// Radius of the city's light, or `None` while the city is in daylight.
pub fn city_light(at: DateTime<Utc>, city: &City) -> Option<f64> {
    (!is_daylight(at, city.lat, city.lon)).then(|| city_light_radius(city.population))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn june_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap()
    }

    fn december_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 21, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_noon_greenwich_is_day() {
        assert!(is_daylight(june_noon(), 0.0, 0.0));
        assert!(!is_daylight(june_noon(), 0.0, 180.0));
        // Sun is roughly overhead near the tropic of Cancer.
        let alt = solar_altitude(june_noon(), 23.4, 0.0).to_degrees();
        assert!(alt > 85.0, "{alt}");
    }

    #[test]
    fn test_pole_follows_season() {
        assert!(is_north_sun(june_noon()));
        assert!(!is_north_sun(december_noon()));
    }

    #[test]
    fn test_terminator_samples() {
        let t = Terminator::compute(june_noon());
        assert_eq!(t.boundary().len(), 37);
        assert_eq!(t.boundary()[0].0, -180.0);
        assert_eq!(t.boundary()[36].0, 180.0);
        assert_eq!(t.night_ring().len(), 39);
    }

    #[test]
    fn test_bad_steps_use_defaults() {
        for (lon, lat) in [(0.0, 1.0), (10.0, -1.0), (f64::NAN, f64::INFINITY), (1e-9, 0.0)] {
            let t = Terminator::with_precision(june_noon(), lon, lat);
            assert_eq!(t.boundary().len(), 37);
        }
        let coarse = Terminator::with_precision(june_noon(), 30.0, 2.0);
        assert_eq!(coarse.boundary().len(), 13);
    }

    #[test]
    fn test_terminator_has_no_runaway_jumps() {
        for at in [june_noon(), december_noon(), Utc.with_ymd_and_hms(2025, 3, 20, 3, 30, 0).unwrap()] {
            let t = Terminator::compute(at);
            for pair in t.boundary().windows(2) {
                assert!((pair[1].1 - pair[0].1).abs() <= 180.0);
                assert!((-90.0..=90.0).contains(&pair[0].1));
            }
        }
    }

    #[test]
    fn test_night_region_matches_altitude() {
        for at in [june_noon(), december_noon()] {
            let t = Terminator::compute(at);
            // Points far from the boundary agree with the ephemeris.
            for &(lon, lat) in &[(0.0, 0.0), (179.0, 0.0), (-175.0, 5.0), (10.0, -10.0)] {
                assert_eq!(t.is_night(lon, lat), !is_daylight(at, lat, lon), "{at} ({lon}, {lat})");
            }
        }
    }

    #[test]
    fn test_city_light_tiers() {
        assert_eq!(city_light_radius(150_000), 0.3);
        assert_eq!(city_light_radius(450_000), 0.4);
        assert_eq!(city_light_radius(1_000_000), 0.6);
        assert_eq!(city_light_radius(3_000_000), 0.8);
        assert_eq!(city_light_radius(12_000_000), 1.0);
    }

    #[test]
    fn test_city_light_suppressed_in_daylight() {
        let london = City {
            name: "London".to_string(),
            population: 9_000_000,
            lat: 51.5,
            lon: -0.1,
        };
        assert_eq!(city_light(june_noon(), &london), None);
        let midnight = Utc.with_ymd_and_hms(2024, 12, 21, 0, 0, 0).unwrap();
        assert_eq!(city_light(midnight, &london), Some(1.0));
    }
}
