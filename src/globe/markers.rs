//! User-placed markers and the connections derived from them.

use std::fmt;

use thiserror::Error;

use super::projection::Projection;
use crate::geo::{is_valid_lonlat, LonLat};

#[derive(Debug, Error, PartialEq)]
pub enum MarkerError {
    #[error("invalid marker coordinate ({lon}, {lat})")]
    InvalidCoordinate { lon: f64, lat: f64 },
    #[error("no marker with id {0}")]
    UnknownMarker(MarkerId),
}

/// Synthetic marker id, unique for the lifetime of a [`MarkerLayer`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarkerId(String);

impl MarkerId {
    fn nth(n: u64) -> Self {
        Self(format!("mark{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    pub lon: f64,
    pub lat: f64,
}

impl Marker {
    pub fn position(&self) -> LonLat {
        (self.lon, self.lat)
    }
}

/// Lines joining consecutive markers, plus the closed polygon once there are
/// at least three of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Connections {
    pub segments: Vec<[LonLat; 2]>,
    /// Closed ring (first vertex repeated at the end)
    pub polygon: Option<Vec<LonLat>>,
}

impl Connections {
    fn derive(markers: &[Marker]) -> Self {
        let segments = markers
            .windows(2)
            .map(|w| [w[0].position(), w[1].position()])
            .collect();

        let polygon = (markers.len() > 2).then(|| {
            markers
                .iter()
                .chain(markers.first())
                .map(Marker::position)
                .collect()
        });

        Self { segments, polygon }
    }
}

/// Ordered marker list. Insertion order is draw order, so the last marker is
/// on top.
#[derive(Debug, Default)]
pub struct MarkerLayer {
    markers: Vec<Marker>,
    connections: Connections,
    selected: Option<MarkerId>,
    next_id: u64,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(lon: f64, lat: f64) -> Result<(), MarkerError> {
        if is_valid_lonlat(lon, lat) {
            Ok(())
        } else {
            Err(MarkerError::InvalidCoordinate { lon, lat })
        }
    }

    fn refresh(&mut self) {
        self.connections = Connections::derive(&self.markers);
    }

    pub fn add(&mut self, lon: f64, lat: f64) -> Result<MarkerId, MarkerError> {
        Self::validate(lon, lat)?;
        let id = MarkerId::nth(self.next_id);
        self.next_id += 1;
        self.markers.push(Marker {
            id: id.clone(),
            lon,
            lat,
        });
        self.refresh();
        Ok(id)
    }

    pub fn move_marker(&mut self, id: &MarkerId, lon: f64, lat: f64) -> Result<(), MarkerError> {
        Self::validate(lon, lat)?;
        let marker = self
            .markers
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| MarkerError::UnknownMarker(id.clone()))?;
        marker.lon = lon;
        marker.lat = lat;
        self.refresh();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.markers.clear();
        self.selected = None;
        self.refresh();
    }

    /// Drop every marker and place a single one.
    pub fn replace_with(&mut self, lon: f64, lat: f64) -> Result<MarkerId, MarkerError> {
        Self::validate(lon, lat)?;
        self.clear();
        self.add(lon, lat)
    }

    /// Select a marker by id; `None` or an unknown id clears the selection.
    pub fn select(&mut self, id: Option<&MarkerId>) {
        self.selected = id.filter(|id| self.markers.iter().any(|m| &m.id == *id)).cloned();
    }

    pub fn selected(&self) -> Option<&MarkerId> {
        self.selected.as_ref()
    }

    pub fn get(&self, id: &MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| &m.id == id)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Topmost visible marker whose glyph covers the screen point. The glyph
    /// is a pin of `size` dots anchored at its bottom center. Markers on the
    /// far hemisphere are never hit.
    pub fn marker_at(&self, projection: &Projection, x: f64, y: f64, size: f64) -> Option<&Marker> {
        let half = size / 2.0;
        self.markers.iter().rev().find(|m| {
            projection.project(m.lon, m.lat).is_some_and(|(mx, my)| {
                let dx = x - mx;
                let dy = y - my;
                dx.abs() <= half && (-size..=0.0).contains(&dy)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globe::projection::{Rotation, Viewport};

    fn layer_with(n: usize) -> MarkerLayer {
        let mut layer = MarkerLayer::new();
        for i in 0..n {
            layer.add(i as f64 * 10.0, i as f64).unwrap();
        }
        layer
    }

    #[test]
    fn test_connection_topology() {
        for n in 0..6 {
            let layer = layer_with(n);
            let c = layer.connections();
            assert_eq!(c.segments.len(), n.saturating_sub(1), "n = {n}");
            assert_eq!(c.polygon.is_some(), n > 2, "n = {n}");
        }
    }

    #[test]
    fn test_polygon_closes_on_first_marker() {
        let layer = layer_with(3);
        let ring = layer.connections().polygon.clone().unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut layer = MarkerLayer::new();
        let a = layer.add(0.0, 0.0).unwrap();
        layer.clear();
        let b = layer.add(0.0, 0.0).unwrap();
        assert_eq!(a.as_str(), "mark0");
        assert_eq!(b.as_str(), "mark1");
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        let mut layer = layer_with(2);
        assert!(layer.add(f64::NAN, 0.0).is_err());
        assert!(layer.add(0.0, 91.0).is_err());
        assert!(layer.add(181.0, 0.0).is_err());
        assert_eq!(layer.len(), 2);

        let id = layer.markers()[0].id.clone();
        assert_eq!(
            layer.move_marker(&id, 0.0, -95.0),
            Err(MarkerError::InvalidCoordinate { lon: 0.0, lat: -95.0 })
        );
        assert_eq!(layer.markers()[0].position(), (0.0, 0.0));
    }

    #[test]
    fn test_move_updates_connections() {
        let mut layer = layer_with(2);
        let id = layer.markers()[1].id.clone();
        layer.move_marker(&id, 50.0, 5.0).unwrap();
        assert_eq!(layer.connections().segments[0][1], (50.0, 5.0));

        let missing = MarkerId::nth(99);
        assert_eq!(
            layer.move_marker(&missing, 1.0, 1.0),
            Err(MarkerError::UnknownMarker(missing.clone()))
        );
    }

    #[test]
    fn test_replace_with_leaves_one_marker() {
        let mut layer = layer_with(4);
        layer.replace_with(12.0, 34.0).unwrap();
        assert_eq!(layer.len(), 1);
        assert!(layer.connections().segments.is_empty());
    }

    #[test]
    fn test_marker_at_skips_far_side() {
        let mut projection = Projection::new(Rotation::default(), 0.5);
        projection.fit(Viewport::new(200.0, 200.0), 1.0);
        let mut layer = MarkerLayer::new();
        let front = layer.add(0.0, 0.0).unwrap();
        layer.add(180.0, 0.0).unwrap();

        // Glyph sits above its anchor point at the disk center.
        let hit = layer.marker_at(&projection, 100.0, 97.0, 8.0).unwrap();
        assert_eq!(hit.id, front);
        assert!(layer.marker_at(&projection, 100.0, 110.0, 8.0).is_none());
    }

    #[test]
    fn test_select_unknown_clears() {
        let mut layer = layer_with(2);
        let id = layer.markers()[0].id.clone();
        layer.select(Some(&id));
        assert_eq!(layer.selected(), Some(&id));
        layer.select(Some(&MarkerId::nth(42)));
        assert_eq!(layer.selected(), None);
    }
}
