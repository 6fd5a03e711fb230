use glam::DVec3;

/// A (longitude, latitude) pair in degrees.
pub type LonLat = (f64, f64);

/// Wrap longitude into [-180, 180)
#[inline(always)]
pub fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// True when the coordinate is finite and inside the geographic range.
#[inline]
pub fn is_valid_lonlat(lon: f64, lat: f64) -> bool {
    lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat)
}

/// Convert lon/lat (degrees) to a unit sphere vector.
#[inline(always)]
pub fn lonlat_to_vec3(lon: f64, lat: f64) -> DVec3 {
    let lon_rad = lon.to_radians();
    let lat_rad = lat.to_radians();
    DVec3::new(
        lat_rad.cos() * lon_rad.cos(),
        lat_rad.cos() * lon_rad.sin(),
        lat_rad.sin(),
    )
}

/// Convert a unit sphere vector back to lon/lat (degrees).
#[inline(always)]
pub fn vec3_to_lonlat(p: DVec3) -> LonLat {
    let lat = p.z.clamp(-1.0, 1.0).asin().to_degrees();
    let lon = p.y.atan2(p.x).to_degrees();
    (lon, lat)
}

/// Planar even-odd containment test in lon/lat space.
/// The ring may or may not repeat its first vertex.
pub fn ring_contains(ring: &[LonLat], lon: f64, lat: f64) -> bool {
    let Some(&last) = ring.last() else {
        return false;
    };

    let mut inside = false;
    let (mut x0, mut y0) = last;
    for &(x1, y1) in ring {
        if (y1 > lat) != (y0 > lat) && lon < (x0 - x1) * (lat - y1) / (y0 - y1) + x1 {
            inside = !inside;
        }
        x0 = x1;
        y0 = y1;
    }
    inside
}

/// Planar area-weighted centroid of a ring, with its absolute area.
/// Falls back to the vertex mean for degenerate rings.
pub fn ring_centroid(ring: &[LonLat]) -> Option<(LonLat, f64)> {
    let n = ring.len();
    if n == 0 {
        return None;
    }

    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let (x0, y0) = ring[i];
        let (x1, y1) = ring[(i + 1) % n];
        let cross = x0 * y1 - x1 * y0;
        area2 += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }

    if area2.abs() < 1e-12 {
        let (sx, sy) = ring
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
        return Some(((sx / n as f64, sy / n as f64), 0.0));
    }

    Some(((cx / (3.0 * area2), cy / (3.0 * area2)), area2.abs() / 2.0))
}

/// Axis-aligned lon/lat bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    pub const EMPTY: BBox = BBox {
        min_lon: f64::MAX,
        min_lat: f64::MAX,
        max_lon: f64::MIN,
        max_lat: f64::MIN,
    };

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a LonLat>) -> Self {
        points.into_iter().fold(Self::EMPTY, |b, &(lon, lat)| b.extend(lon, lat))
    }

    #[inline]
    pub fn extend(self, lon: f64, lat: f64) -> Self {
        Self {
            min_lon: self.min_lon.min(lon),
            min_lat: self.min_lat.min(lat),
            max_lon: self.max_lon.max(lon),
            max_lat: self.max_lat.max(lat),
        }
    }

    pub fn union(self, other: BBox) -> Self {
        Self {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    #[inline(always)]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}
