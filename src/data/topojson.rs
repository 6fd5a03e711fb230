//! Minimal TopoJSON decoding: quantized arcs, polygon and multipolygon
//! geometries, and geometry collections. Lines and points are ignored.

use std::collections::HashMap;

use serde::Deserialize;

use super::{AtlasError, Polygon};
use crate::geo::LonLat;

#[derive(Debug, Deserialize)]
pub(super) struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    arcs: Vec<Vec<Vec<f64>>>,
    objects: HashMap<String, TopoGeometry>,
}

#[derive(Debug, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(super) enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<TopoGeometry>,
    },
    Polygon {
        arcs: Vec<Vec<i64>>,
        #[serde(default)]
        id: Option<TopoId>,
        #[serde(default)]
        properties: Option<Properties>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i64>>>,
        #[serde(default)]
        id: Option<TopoId>,
        #[serde(default)]
        properties: Option<Properties>,
    },
    #[serde(other)]
    Other,
}

/// Feature ids are numeric in some atlases and zero-padded strings in others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum TopoId {
    Num(i64),
    Text(String),
}

impl TopoId {
    pub(super) fn to_code(&self) -> String {
        match self {
            TopoId::Num(n) => n.to_string(),
            TopoId::Text(s) => super::normalize_code(s),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct Properties {
    #[serde(default)]
    pub name: Option<String>,
}

/// A decoded feature: optional id and name plus its polygons.
pub(super) struct TopoFeature {
    pub code: Option<String>,
    pub name: Option<String>,
    pub polygons: Vec<Polygon>,
}

impl Topology {
    /// Absolute lon/lat for every arc.
    fn decode_arcs(&self) -> Vec<Vec<LonLat>> {
        self.arcs
            .iter()
            .map(|arc| match &self.transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| {
                            x += p[0];
                            y += p[1];
                            (x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1])
                        })
                        .collect()
                }
                None => arc.iter().filter(|p| p.len() >= 2).map(|p| (p[0], p[1])).collect(),
            })
            .collect()
    }

    /// Features of the named object, flattened out of any collections.
    pub(super) fn features(&self, object: &str) -> Result<Option<Vec<TopoFeature>>, AtlasError> {
        let Some(geometry) = self.objects.get(object) else {
            return Ok(None);
        };
        let arcs = self.decode_arcs();
        let mut out = Vec::new();
        collect_features(geometry, &arcs, &mut out)?;
        Ok(Some(out))
    }
}

fn collect_features(
    geometry: &TopoGeometry,
    arcs: &[Vec<LonLat>],
    out: &mut Vec<TopoFeature>,
) -> Result<(), AtlasError> {
    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_features(g, arcs, out)?;
            }
        }
        TopoGeometry::Polygon { arcs: rings, id, properties } => {
            out.push(TopoFeature {
                code: id.as_ref().map(TopoId::to_code),
                name: properties.as_ref().and_then(|p| p.name.clone()),
                polygons: vec![polygon(rings, arcs)?],
            });
        }
        TopoGeometry::MultiPolygon { arcs: polys, id, properties } => {
            out.push(TopoFeature {
                code: id.as_ref().map(TopoId::to_code),
                name: properties.as_ref().and_then(|p| p.name.clone()),
                polygons: polys
                    .iter()
                    .map(|rings| polygon(rings, arcs))
                    .collect::<Result<_, _>>()?,
            });
        }
        TopoGeometry::Other => {}
    }
    Ok(())
}

fn polygon(rings: &[Vec<i64>], arcs: &[Vec<LonLat>]) -> Result<Polygon, AtlasError> {
    let rings = rings
        .iter()
        .map(|r| stitch(r, arcs))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(rings))
}

/// Join arcs into one ring. A negative index `i` means arc `!i` reversed;
/// consecutive arcs share their junction point, which is kept once.
fn stitch(indices: &[i64], arcs: &[Vec<LonLat>]) -> Result<Vec<LonLat>, AtlasError> {
    let mut ring: Vec<LonLat> = Vec::new();
    for &index in indices {
        let (slot, reversed) = if index < 0 { (!index, true) } else { (index, false) };
        let arc = usize::try_from(slot)
            .ok()
            .and_then(|i| arcs.get(i))
            .ok_or_else(|| AtlasError::Topology(format!("arc index {index} out of range")))?;

        ring.pop();
        if reversed {
            ring.extend(arc.iter().rev());
        } else {
            ring.extend(arc.iter());
        }
    }
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arcs() -> Vec<Vec<LonLat>> {
        vec![
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)],
            vec![(10.0, 10.0), (0.0, 10.0), (0.0, 0.0)],
        ]
    }

    #[test]
    fn test_stitch_drops_shared_points() {
        let ring = stitch(&[0, 1], &arcs()).unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_stitch_reversed_arc() {
        let ring = stitch(&[!1], &arcs()).unwrap();
        assert_eq!(ring, vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0)]);
    }

    #[test]
    fn test_stitch_bad_index() {
        assert!(matches!(stitch(&[7], &arcs()), Err(AtlasError::Topology(_))));
    }

    #[test]
    fn test_quantized_arcs() {
        let mut bytes = br#"{
            "type": "Topology",
            "transform": {"scale": [0.5, 0.25], "translate": [-10, 20]},
            "arcs": [[[0, 0], [20, 0], [0, 40], [-20, 0], [0, -40]]],
            "objects": {
                "countries": {"type": "GeometryCollection", "geometries": [
                    {"type": "Polygon", "arcs": [[0]], "id": "004", "properties": {"name": "Squareland"}},
                    {"type": "Point", "coordinates": [0, 0]}
                ]}
            }
        }"#
        .to_vec();
        let topology: Topology = simd_json::serde::from_slice(&mut bytes).unwrap();
        let features = topology.features("countries").unwrap().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].code.as_deref(), Some("4"));
        assert_eq!(features[0].name.as_deref(), Some("Squareland"));

        let ring = &features[0].polygons[0].rings[0];
        assert_eq!(ring[0], (-10.0, 20.0));
        assert_eq!(ring[1], (0.0, 20.0));
        assert_eq!(ring[2], (0.0, 30.0));
        assert!(topology.features("land").unwrap().is_none());
    }
}
