//! World atlas loading: country polygons, land, the country name table and
//! the city list. Everything here is loaded once and then shared read-only.

mod builtin;
mod topojson;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use geojson::{feature::Id, GeoJson, Geometry, Value};
use serde::de::IgnoredAny;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::geo::{ring_centroid, ring_contains, BBox, LonLat};
use crate::globe::path::graticule10;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid JSON: {0}")]
    Json(#[from] simd_json::Error),
    #[error("file is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("invalid topology: {0}")]
    Topology(String),
    #[error("invalid city list: {0}")]
    Cities(String),
    #[error("atlas contains no country polygons")]
    Empty,
}

/// One polygon: exterior ring first, then holes.
#[derive(Clone, Debug)]
pub struct Polygon {
    pub rings: Vec<Vec<LonLat>>,
    pub bbox: BBox,
}

impl Polygon {
    pub fn new(rings: Vec<Vec<LonLat>>) -> Self {
        let bbox = BBox::from_points(rings.iter().flatten());
        Self { rings, bbox }
    }

    /// True when any ring (holes included) contains the point.
    pub fn any_ring_contains(&self, lon: f64, lat: f64) -> bool {
        self.bbox.contains(lon, lat) && self.rings.iter().any(|r| ring_contains(r, lon, lat))
    }
}

#[derive(Clone, Debug)]
pub struct Country {
    /// Normalized numeric code ("004" becomes "4")
    pub code: String,
    pub name: Option<String>,
    pub polygons: Vec<Polygon>,
    pub bbox: BBox,
    /// Centroid of the largest ring, used to place the label
    pub label_anchor: Option<LonLat>,
}

impl Country {
    pub fn new(code: impl Into<String>, name: Option<String>, polygons: Vec<Polygon>) -> Self {
        let bbox = polygons.iter().fold(BBox::EMPTY, |b, p| b.union(p.bbox));
        let label_anchor = polygons
            .iter()
            .filter_map(|p| p.rings.first())
            .filter_map(|r| ring_centroid(r))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c);
        Self {
            code: code.into(),
            name,
            polygons,
            bbox,
            label_anchor,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.bbox.contains(lon, lat) && self.polygons.iter().any(|p| p.any_ring_contains(lon, lat))
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.code)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct City {
    pub name: String,
    pub population: u64,
    pub lat: f64,
    pub lon: f64,
}

/// The immutable world dataset.
#[derive(Debug)]
pub struct Atlas {
    pub land: Vec<Polygon>,
    pub countries: Vec<Country>,
    pub cities: Vec<City>,
    pub graticule: Vec<Vec<LonLat>>,
}

impl Atlas {
    pub fn new(land: Vec<Polygon>, countries: Vec<Country>, cities: Vec<City>) -> Result<Self, AtlasError> {
        if countries.iter().all(|c| c.polygons.is_empty()) {
            return Err(AtlasError::Empty);
        }
        Ok(Self {
            land,
            countries,
            cities,
            graticule: graticule10(),
        })
    }

    pub fn country(&self, index: usize) -> Option<&Country> {
        self.countries.get(index)
    }
}

/// Locations of the three data files.
#[derive(Clone, Debug)]
pub struct DataPaths {
    pub atlas: PathBuf,
    pub country_names: PathBuf,
    pub cities: PathBuf,
}

fn read(path: &Path) -> Result<Vec<u8>, AtlasError> {
    std::fs::read(path).map_err(|source| AtlasError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and assemble the atlas. Any failure is fatal to the globe view.
pub fn load_atlas(paths: &DataPaths) -> Result<Atlas, AtlasError> {
    let (land, mut countries) = parse_world(read(&paths.atlas)?)?;

    let names_bytes = read(&paths.country_names)?;
    let names = parse_country_names(std::str::from_utf8(&names_bytes)?);
    for country in &mut countries {
        if let Some(name) = names.get(&country.code) {
            country.name = Some(name.clone());
        }
    }

    let cities = parse_cities(read(&paths.cities)?)?;
    info!(
        countries = countries.len(),
        land = land.len(),
        cities = cities.len(),
        names = names.len(),
        "atlas loaded from {}",
        paths.atlas.display()
    );
    Atlas::new(land, countries, cities)
}

/// Load on a background thread; the result arrives on the returned channel.
pub fn spawn_loader(paths: DataPaths) -> io::Result<Receiver<Result<Arc<Atlas>, AtlasError>>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::Builder::new()
        .name("atlas-loader".to_string())
        .spawn(move || {
            let result = load_atlas(&paths).map(Arc::new);
            // Receiver gone means the UI already quit.
            let _ = tx.send(result);
        })?;
    Ok(rx)
}

#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "type")]
    kind: String,
}

/// Parse a TopoJSON topology or a GeoJSON feature collection of countries.
/// Returns (land, countries).
pub fn parse_world(bytes: Vec<u8>) -> Result<(Vec<Polygon>, Vec<Country>), AtlasError> {
    let mut probe_bytes = bytes.clone();
    let probe: TypeProbe = simd_json::serde::from_slice(&mut probe_bytes)?;

    if probe.kind == "Topology" {
        let mut bytes = bytes;
        let topology: topojson::Topology = simd_json::serde::from_slice(&mut bytes)?;
        let features = topology
            .features("countries")?
            .ok_or_else(|| AtlasError::Topology("missing `countries` object".to_string()))?;

        let countries: Vec<Country> = features
            .into_iter()
            .enumerate()
            .map(|(i, f)| Country::new(f.code.unwrap_or_else(|| format!("#{i}")), f.name, f.polygons))
            .collect();

        let land = match topology.features("land")? {
            Some(land) => land.into_iter().flat_map(|f| f.polygons).collect(),
            None => countries.iter().flat_map(|c| c.polygons.clone()).collect(),
        };
        return Ok((land, countries));
    }

    let geojson: GeoJson = std::str::from_utf8(&bytes)?.parse()?;
    let countries = geojson_countries(&geojson);
    let land = countries.iter().flat_map(|c| c.polygons.clone()).collect();
    Ok((land, countries))
}

fn geojson_countries(geojson: &GeoJson) -> Vec<Country> {
    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features.iter().collect::<Vec<_>>(),
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => {
            return vec![Country::new("#0", None, geometry_polygons(g))];
        }
    };

    features
        .into_iter()
        .enumerate()
        .filter_map(|(i, feature)| {
            let geometry = feature.geometry.as_ref()?;
            let code = match &feature.id {
                Some(Id::String(s)) => normalize_code(s),
                Some(Id::Number(n)) => normalize_code(&n.to_string()),
                None => format!("#{i}"),
            };
            let name = feature
                .property("name")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            Some(Country::new(code, name, geometry_polygons(geometry)))
        })
        .collect()
}

fn geometry_polygons(geometry: &Geometry) -> Vec<Polygon> {
    fn rings(polygon: &[Vec<Vec<f64>>]) -> Polygon {
        Polygon::new(
            polygon
                .iter()
                .map(|ring| ring.iter().filter(|c| c.len() >= 2).map(|c| (c[0], c[1])).collect())
                .collect(),
        )
    }

    match &geometry.value {
        Value::Polygon(polygon) => vec![rings(polygon)],
        Value::MultiPolygon(polygons) => polygons.iter().map(|p| rings(p)).collect(),
        Value::GeometryCollection(geometries) => geometries.iter().flat_map(geometry_polygons).collect(),
        _ => Vec::new(),
    }
}

/// Strip leading zeros from numeric codes so "004" and 4 agree.
pub fn normalize_code(code: &str) -> String {
    let code = code.trim();
    match code.parse::<u64>() {
        Ok(n) => n.to_string(),
        Err(_) => code.to_string(),
    }
}

/// Parse the tab-separated code→name table. The header must name a
/// `country-code` (or `id`) column and a `name` column.
pub fn parse_country_names(text: &str) -> HashMap<String, String> {
    let mut lines = text.lines();
    let Some(header) = lines.next() else {
        return HashMap::new();
    };
    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();
    let code_col = columns.iter().position(|c| *c == "country-code" || *c == "id");
    let name_col = columns.iter().position(|c| *c == "name");
    let (Some(code_col), Some(name_col)) = (code_col, name_col) else {
        warn!("country name table has no code/name columns");
        return HashMap::new();
    };

    lines
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            let code = fields.get(code_col)?.trim();
            let name = fields.get(name_col)?.trim();
            (!code.is_empty() && !name.is_empty()).then(|| (normalize_code(code), name.to_string()))
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CityField {
    Num(f64),
    Text(String),
    Other(IgnoredAny),
}

impl CityField {
    fn number(&self) -> Option<f64> {
        match self {
            CityField::Num(n) => Some(*n),
            CityField::Text(s) => s.trim().parse().ok(),
            CityField::Other(_) => None,
        }
        .filter(|n| n.is_finite())
    }

    fn text(&self) -> Option<String> {
        match self {
            CityField::Text(s) => Some(s.clone()),
            CityField::Num(n) => Some(n.to_string()),
            CityField::Other(_) => None,
        }
    }
}

/// Parse `[population, name, latitude, longitude]` rows. Malformed rows are
/// skipped.
pub fn parse_cities(mut bytes: Vec<u8>) -> Result<Vec<City>, AtlasError> {
    let rows: Vec<Vec<CityField>> =
        simd_json::serde::from_slice(&mut bytes).map_err(|e| AtlasError::Cities(e.to_string()))?;

    let total = rows.len();
    let cities: Vec<City> = rows
        .iter()
        .filter_map(|row| {
            let [population, name, lat, lon] = row.as_slice() else {
                return None;
            };
            let city = City {
                population: population.number()?.max(0.0) as u64,
                name: name.text()?,
                lat: lat.number()?,
                lon: lon.number()?,
            };
            crate::geo::is_valid_lonlat(city.lon, city.lat).then_some(city)
        })
        .collect();

    if cities.len() < total {
        warn!(skipped = total - cities.len(), "skipped malformed city rows");
    }
    Ok(cities)
}
