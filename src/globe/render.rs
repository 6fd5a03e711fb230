//! Frame painting: the fixed layer order, and the coalescing redraw flag.
//!
//! The renderer owns its drawing [`Surface`]; nothing else draws on it.

use chrono::{DateTime, Utc};

use super::markers::{Connections, MarkerLayer};
use super::path::project_path;
use super::policy::Visibility;
use super::projection::{Projection, Viewport};
use super::solar::{city_light, Terminator};
use crate::data::{Atlas, Polygon};
use crate::geo::{ring_contains, LonLat};

/// Logical layers, listed in paint order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Water,
    Graticule,
    Land,
    Coastline,
    Borders,
    Night,
    Terminator,
    CityLights,
    MarkerPolygon,
    MarkerLinks,
    MarkersHidden,
    Markers,
    MarkerSelected,
    Hover,
    Selection,
    SelectionOutline,
    Labels,
}

impl Layer {
    pub const ALL: [Layer; 17] = [
        Layer::Water,
        Layer::Graticule,
        Layer::Land,
        Layer::Coastline,
        Layer::Borders,
        Layer::Night,
        Layer::Terminator,
        Layer::CityLights,
        Layer::MarkerPolygon,
        Layer::MarkerLinks,
        Layer::MarkersHidden,
        Layer::Markers,
        Layer::MarkerSelected,
        Layer::Hover,
        Layer::Selection,
        Layer::SelectionOutline,
        Layer::Labels,
    ];
}

/// Drawing target. Coordinates are in dots, y pointing down.
pub trait Surface {
    fn size(&self) -> Viewport;

    fn resize(&mut self, viewport: Viewport);

    fn clear(&mut self);

    /// Fill every sample point of the surface for which `inside` holds.
    fn fill(&mut self, layer: Layer, inside: &dyn Fn(f64, f64) -> bool);

    fn stroke(&mut self, layer: Layer, from: (f64, f64), to: (f64, f64));

    fn dot(&mut self, layer: Layer, at: (f64, f64), radius: f64);

    /// Text centered horizontally on `at`.
    fn label(&mut self, layer: Layer, at: (f64, f64), text: &str);

    fn stroke_run(&mut self, layer: Layer, run: &[(f64, f64)]) {
        for pair in run.windows(2) {
            self.stroke(layer, pair[0], pair[1]);
        }
    }
}

/// Collapses any number of redraw requests into a single pending paint.
#[derive(Debug, Default)]
pub struct RedrawScheduler {
    pending: bool,
    requests: u64,
    paints: u64,
}

impl RedrawScheduler {
    pub fn request(&mut self) {
        self.pending = true;
        self.requests += 1;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending flag. True when a paint is due.
    pub fn take(&mut self) -> bool {
        let due = std::mem::take(&mut self.pending);
        if due {
            self.paints += 1;
        }
        due
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn paints(&self) -> u64 {
        self.paints
    }
}

/// Everything one frame reads. Borrowed, never retained.
pub struct FrameInput<'a> {
    pub projection: &'a Projection,
    pub atlas: &'a Atlas,
    pub markers: &'a MarkerLayer,
    pub hovered: Option<usize>,
    pub selected: Option<usize>,
    pub visibility: Visibility,
    /// Sun time when day/night mode is on
    pub sun_time: Option<DateTime<Utc>>,
    /// Marker glyph height in dots
    pub marker_size: f64,
    pub scale_factor: f64,
}

pub struct Renderer<S: Surface> {
    surface: S,
    scheduler: RedrawScheduler,
}

impl<S: Surface> Renderer<S> {
    pub fn new(surface: S) -> Self {
        let mut scheduler = RedrawScheduler::default();
        scheduler.request();
        Self { surface, scheduler }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn scheduler(&self) -> &RedrawScheduler {
        &self.scheduler
    }

    pub fn request_redraw(&mut self) {
        self.scheduler.request();
    }

    pub fn is_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Paint if a redraw is pending. Returns whether anything was painted.
    pub fn paint(&mut self, frame: &FrameInput) -> bool {
        if !self.scheduler.take() {
            return false;
        }
        paint_frame(&mut self.surface, frame);
        true
    }
}

fn stroke_path(surface: &mut dyn Surface, layer: Layer, projection: &Projection, coords: &[LonLat], closed: bool) {
    for run in project_path(projection, coords, closed) {
        surface.stroke_run(layer, &run);
    }
}

fn stroke_polygon(surface: &mut dyn Surface, layer: Layer, projection: &Projection, polygon: &Polygon) {
    for ring in &polygon.rings {
        stroke_path(surface, layer, projection, ring, true);
    }
}

fn fill_polygons(surface: &mut dyn Surface, layer: Layer, projection: &Projection, polygons: &[Polygon]) {
    surface.fill(layer, &|x, y| {
        projection
            .invert(x, y)
            .is_some_and(|(lon, lat)| polygons.iter().any(|p| p.any_ring_contains(lon, lat)))
    });
}

/// Full repaint in fixed order: water, graticule, land, borders, day/night,
/// markers, highlights, labels.
pub fn paint_frame(surface: &mut dyn Surface, frame: &FrameInput) {
    let projection = frame.projection;
    let atlas = frame.atlas;

    surface.clear();
    surface.fill(Layer::Water, &|x, y| projection.disk_contains(x, y));

    for line in &atlas.graticule {
        stroke_path(surface, Layer::Graticule, projection, line, false);
    }

    fill_polygons(surface, Layer::Land, projection, &atlas.land);
    for polygon in &atlas.land {
        stroke_polygon(surface, Layer::Coastline, projection, polygon);
    }

    if frame.visibility.show_boundaries {
        for polygon in atlas.countries.iter().flat_map(|c| &c.polygons) {
            stroke_polygon(surface, Layer::Borders, projection, polygon);
        }
    }

    if let Some(at) = frame.sun_time {
        paint_day_night(surface, frame, at);
    }

    paint_markers(surface, frame);

    if let Some(country) = frame.hovered.filter(|h| Some(*h) != frame.selected).and_then(|i| atlas.country(i)) {
        fill_polygons(surface, Layer::Hover, projection, &country.polygons);
    }
    if let Some(country) = frame.selected.and_then(|i| atlas.country(i)) {
        fill_polygons(surface, Layer::Selection, projection, &country.polygons);
        for polygon in &country.polygons {
            stroke_polygon(surface, Layer::SelectionOutline, projection, polygon);
        }
    }

    for (index, country) in atlas.countries.iter().enumerate() {
        if !frame.visibility.show_labels && frame.selected != Some(index) {
            continue;
        }
        let Some((lon, lat)) = country.label_anchor else {
            continue;
        };
        if let Some(at) = projection.project(lon, lat) {
            surface.label(Layer::Labels, at, country.display_name());
        }
    }
}

fn paint_day_night(surface: &mut dyn Surface, frame: &FrameInput, at: DateTime<Utc>) {
    let projection = frame.projection;
    let terminator = Terminator::compute(at);

    surface.fill(Layer::Night, &|x, y| {
        projection
            .invert(x, y)
            .is_some_and(|(lon, lat)| terminator.is_night(lon, lat))
    });
    stroke_path(surface, Layer::Terminator, projection, terminator.boundary(), false);

    let light_scale = frame.scale_factor.max(1.0);
    for city in &frame.atlas.cities {
        let Some(radius) = city_light(at, city) else {
            continue;
        };
        if let Some(p) = projection.project(city.lon, city.lat) {
            surface.dot(Layer::CityLights, p, radius * light_scale);
        }
    }
}

/// Links between consecutive markers, plus the edge back to the first one
/// when they form a polygon.
fn marker_links(connections: &Connections) -> Vec<[LonLat; 2]> {
    let closing = connections
        .polygon
        .as_ref()
        .and_then(|ring| ring.len().checked_sub(2).map(|i| [ring[i], ring[i + 1]]));
    connections.segments.iter().copied().chain(closing).collect()
}

fn paint_markers(surface: &mut dyn Surface, frame: &FrameInput) {
    let projection = frame.projection;
    let connections = frame.markers.connections();

    if let Some(ring) = &connections.polygon {
        surface.fill(Layer::MarkerPolygon, &|x, y| {
            projection
                .invert(x, y)
                .is_some_and(|(lon, lat)| ring_contains(ring, lon, lat))
        });
    }
    for segment in marker_links(connections) {
        stroke_path(surface, Layer::MarkerLinks, projection, &segment, false);
    }

    let size = frame.marker_size;
    for marker in frame.markers.markers() {
        let (layer, (x, y)) = match projection.project(marker.lon, marker.lat) {
            Some(p) if frame.markers.selected() == Some(&marker.id) => (Layer::MarkerSelected, p),
            Some(p) => (Layer::Markers, p),
            None => (Layer::MarkersHidden, projection.project_unclipped(marker.lon, marker.lat)),
        };
        // Pin: stem from the anchor up, head on top.
        surface.stroke(layer, (x, y), (x, y - size * 0.6));
        surface.dot(layer, (x, y - size * 0.75), size * 0.25);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::Country;
    use crate::globe::projection::Rotation;
    use chrono::TimeZone;

    /// Surface that records which layer each operation hit.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub viewport: Option<Viewport>,
        pub ops: Vec<Layer>,
        pub clears: usize,
        pub labels: Vec<String>,
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> Viewport {
            self.viewport.unwrap_or(Viewport::new(200.0, 200.0))
        }

        fn resize(&mut self, viewport: Viewport) {
            self.viewport = Some(viewport);
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.ops.clear();
            self.labels.clear();
        }

        fn fill(&mut self, layer: Layer, inside: &dyn Fn(f64, f64) -> bool) {
            // Sample a coarse grid so fills with no coverage are not recorded.
            let hit = (0..20).any(|i| (0..20).any(|j| inside(i as f64 * 10.0 + 5.0, j as f64 * 10.0 + 5.0)));
            if hit {
                self.ops.push(layer);
            }
        }

        fn stroke(&mut self, layer: Layer, _from: (f64, f64), _to: (f64, f64)) {
            self.ops.push(layer);
        }

        fn dot(&mut self, layer: Layer, _at: (f64, f64), _radius: f64) {
            self.ops.push(layer);
        }

        fn label(&mut self, layer: Layer, _at: (f64, f64), text: &str) {
            self.ops.push(layer);
            self.labels.push(text.to_string());
        }
    }

    pub(crate) fn square_atlas() -> Atlas {
        let square = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)];
        let polygon = Polygon::new(vec![square]);
        let country = Country::new("1", Some("Squareland".to_string()), vec![polygon.clone()]);
        Atlas::new(vec![polygon], vec![country], vec![]).unwrap()
    }

    fn projection() -> Projection {
        let mut p = Projection::new(Rotation::centering(5.0, 5.0), 0.5);
        p.fit(Viewport::new(200.0, 200.0), 1.0);
        p
    }

    fn first_index(ops: &[Layer], layer: Layer) -> Option<usize> {
        ops.iter().position(|l| *l == layer)
    }

    #[test]
    fn test_redundant_requests_paint_once() {
        let atlas = square_atlas();
        let markers = MarkerLayer::new();
        let p = projection();
        let frame = FrameInput {
            projection: &p,
            atlas: &atlas,
            markers: &markers,
            hovered: None,
            selected: None,
            visibility: Visibility::default(),
            sun_time: None,
            marker_size: 8.0,
            scale_factor: 1.0,
        };

        let mut renderer = Renderer::new(RecordingSurface::default());
        assert!(renderer.paint(&frame));
        renderer.request_redraw();
        renderer.request_redraw();
        renderer.request_redraw();
        assert!(renderer.paint(&frame));
        assert!(!renderer.paint(&frame));
        assert_eq!(renderer.surface().clears, 2);
        assert_eq!(renderer.scheduler().paints(), 2);
        assert_eq!(renderer.scheduler().requests(), 4);
    }

    #[test]
    fn test_layer_order() {
        let mut atlas = square_atlas();
        atlas.cities.push(crate::data::City {
            name: "Dark".to_string(),
            population: 1_000_000,
            lat: 5.0,
            lon: 5.0,
        });
        let mut markers = MarkerLayer::new();
        markers.add(2.0, 2.0).unwrap();
        markers.add(8.0, 2.0).unwrap();
        markers.add(5.0, 8.0).unwrap();
        markers.add(-170.0, 0.0).unwrap();
        let p = projection();
        // Midnight at the square's longitude, sun over the northern tropic.
        let midnight = Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let frame = FrameInput {
            projection: &p,
            atlas: &atlas,
            markers: &markers,
            hovered: Some(0),
            selected: Some(0),
            visibility: Visibility {
                show_boundaries: true,
                show_labels: false,
            },
            sun_time: Some(midnight),
            marker_size: 8.0,
            scale_factor: 1.0,
        };

        let mut surface = RecordingSurface::default();
        paint_frame(&mut surface, &frame);

        let order = [
            Layer::Water,
            Layer::Graticule,
            Layer::Land,
            Layer::Coastline,
            Layer::Borders,
            Layer::Night,
            Layer::Terminator,
            Layer::CityLights,
            Layer::MarkerPolygon,
            Layer::MarkerLinks,
            Layer::Markers,
            Layer::MarkersHidden,
            Layer::Selection,
            Layer::SelectionOutline,
            Layer::Labels,
        ];
        let firsts: Vec<usize> = order
            .iter()
            .map(|l| first_index(&surface.ops, *l).unwrap_or_else(|| panic!("{l:?} never drawn")))
            .collect();
        assert!(firsts.windows(2).all(|w| w[0] < w[1]), "{:?}", surface.ops);

        // Hovering the selected country does not double-highlight it.
        assert!(first_index(&surface.ops, Layer::Hover).is_none());
        // Labels hidden by policy, but the selected country keeps its label.
        assert_eq!(surface.labels, vec!["Squareland".to_string()]);
    }

    #[test]
    fn test_marker_links_close_the_loop() {
        let mut markers = MarkerLayer::new();
        markers.add(0.0, 0.0).unwrap();
        markers.add(10.0, 0.0).unwrap();
        assert_eq!(marker_links(markers.connections()), vec![[(0.0, 0.0), (10.0, 0.0)]]);

        markers.add(10.0, 10.0).unwrap();
        let links = marker_links(markers.connections());
        assert_eq!(links.len(), 3);
        assert_eq!(links[2], [(10.0, 10.0), (0.0, 0.0)]);
    }

    #[test]
    fn test_hidden_layers_skipped() {
        let atlas = square_atlas();
        let markers = MarkerLayer::new();
        let p = projection();
        let frame = FrameInput {
            projection: &p,
            atlas: &atlas,
            markers: &markers,
            hovered: None,
            selected: None,
            visibility: Visibility::default(),
            sun_time: None,
            marker_size: 8.0,
            scale_factor: 1.0,
        };
        let mut surface = RecordingSurface::default();
        paint_frame(&mut surface, &frame);
        for layer in [Layer::Borders, Layer::Night, Layer::Terminator, Layer::Markers, Layer::Labels] {
            assert!(first_index(&surface.ops, layer).is_none(), "{layer:?}");
        }
    }
}
