//! A coarse built-in world used when no atlas files are installed.

use super::{Atlas, City, Country, Polygon};
use crate::geo::LonLat;

const CONTINENTS: &[(&str, &str, &[LonLat])] = &[
    (
        "NA",
        "North America",
        &[
            (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
            (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
            (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
            (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
            (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
            (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
            (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
            (-168.0, 65.0),
        ],
    ),
    (
        "SA",
        "South America",
        &[
            (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
            (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
            (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
            (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
            (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
            (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
        ],
    ),
    (
        "EU",
        "Europe",
        &[
            (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
            (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
            (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
            (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
            (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
            (-5.0, 48.0), (-5.0, 43.0), (-10.0, 36.0),
        ],
    ),
    (
        "AF",
        "Africa",
        &[
            (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
            (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
            (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
            (40.0, -5.0), (35.0, -20.0), (35.0, -25.0), (30.0, -30.0),
            (20.0, -35.0), (18.0, -35.0), (15.0, -30.0), (10.0, -15.0),
            (10.0, 0.0), (5.0, 5.0), (-5.0, 5.0), (-10.0, 8.0),
            (-17.0, 15.0),
        ],
    ),
    (
        "AS",
        "Asia",
        &[
            (40.0, 43.0), (50.0, 40.0), (55.0, 37.0), (60.0, 25.0),
            (65.0, 25.0), (70.0, 20.0), (75.0, 15.0), (80.0, 8.0),
            (80.0, 15.0), (88.0, 22.0), (92.0, 22.0), (95.0, 16.0),
            (100.0, 14.0), (105.0, 10.0), (110.0, 20.0), (115.0, 22.0),
            (120.0, 22.0), (122.0, 25.0), (125.0, 30.0), (130.0, 35.0),
            (135.0, 35.0), (140.0, 40.0), (145.0, 45.0), (145.0, 50.0),
            (140.0, 55.0), (135.0, 55.0), (130.0, 52.0), (130.0, 43.0),
            (120.0, 40.0), (110.0, 45.0), (90.0, 50.0), (70.0, 55.0),
            (60.0, 55.0), (50.0, 50.0), (40.0, 43.0),
        ],
    ),
    (
        "OC",
        "Australia",
        &[
            (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
            (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
            (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
            (125.0, -32.0), (115.0, -35.0), (115.0, -25.0), (115.0, -20.0),
        ],
    ),
];

const CITIES: &[(&str, u64, f64, f64)] = &[
    ("New York", 18_800_000, 40.7, -74.0),
    ("London", 9_000_000, 51.5, -0.1),
    ("Paris", 11_000_000, 48.9, 2.3),
    ("Tokyo", 37_400_000, 35.7, 139.7),
    ("Sydney", 5_300_000, -33.9, 151.2),
    ("Rio", 13_500_000, -22.9, -43.2),
    ("Moscow", 12_500_000, 55.8, 37.6),
    ("Beijing", 21_500_000, 39.9, 116.4),
    ("Delhi", 32_900_000, 28.6, 77.2),
    ("Los Angeles", 12_400_000, 34.0, -118.2),
    ("Washington", 5_300_000, 38.9, -77.0),
    ("Mexico City", 21_800_000, 19.4, -99.1),
    ("Buenos Aires", 15_000_000, -34.6, -58.4),
    ("Nairobi", 4_400_000, -1.3, 36.8),
    ("Lagos", 15_300_000, 6.5, 3.4),
    ("Reykjavik", 130_000, 64.1, -21.9),
    ("Perth", 2_100_000, -31.9, 115.9),
    ("Anchorage", 290_000, 61.2, -149.9),
];

impl Atlas {
    /// Continent outlines standing in for countries, plus a short city list.
    pub fn builtin() -> Self {
        let countries: Vec<Country> = CONTINENTS
            .iter()
            .map(|(code, name, ring)| {
                Country::new(*code, Some(name.to_string()), vec![Polygon::new(vec![ring.to_vec()])])
            })
            .collect();
        let land = countries.iter().flat_map(|c| c.polygons.clone()).collect();
        let cities = CITIES
            .iter()
            .map(|&(name, population, lat, lon)| City {
                name: name.to_string(),
                population,
                lat,
                lon,
            })
            .collect();

        Self {
            land,
            countries,
            cities,
            graticule: crate::globe::path::graticule10(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rings_are_closed() {
        for (code, _, ring) in CONTINENTS {
            assert_eq!(ring.first(), ring.last(), "{code}");
        }
    }

    #[test]
    fn test_builtin_lookup() {
        let atlas = Atlas::builtin();
        let australia = atlas.countries.iter().find(|c| c.code == "OC").unwrap();
        assert!(australia.contains(135.0, -25.0));
        assert!(!australia.contains(0.0, 0.0));
        assert!(atlas.countries.iter().any(|c| c.contains(20.0, 0.0)));
        assert_eq!(atlas.cities.len(), CITIES.len());
    }
}
