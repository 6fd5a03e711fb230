//! The globe view: owns all globe state and turns input into state changes
//! and redraw requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::gesture::{AnimationStep, Arrival, GestureController, GestureEvent};
use super::hit_test::{country_at, hit_test_country};
use super::markers::{MarkerError, MarkerId, MarkerLayer};
use super::policy::{self, DeviceClass, InputMode, ZoomBounds};
use super::projection::{Projection, Rotation, Viewport};
use super::render::{FrameInput, Renderer, Surface};
use crate::data::Atlas;
use crate::geo::is_valid_lonlat;

/// Settings resolved once when the view is created.
#[derive(Clone, Debug)]
pub struct GlobeOptions {
    pub device: DeviceClass,
    pub input: InputMode,
    pub day_night: bool,
    /// Adaptive sampling tolerance in dots
    pub precision: f64,
    pub initial_rotation: Rotation,
    pub fly_duration: Duration,
    pub resize_debounce: Duration,
    pub sun_refresh: Duration,
}

impl Default for GlobeOptions {
    fn default() -> Self {
        Self {
            device: DeviceClass::Desktop,
            input: InputMode::Pointer,
            day_night: true,
            precision: 0.5,
            initial_rotation: Rotation::new(40.0, -20.0, 0.0),
            fly_duration: Duration::from_millis(1000),
            resize_debounce: Duration::from_millis(250),
            sun_refresh: Duration::from_secs(60),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// A click that identified a place.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub latitude: f64,
    pub longitude: f64,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
}

/// Notifications for the host.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    Selected(Selection),
    MarkerPlaced { id: MarkerId, lon: f64, lat: f64 },
    /// A dragged marker was dropped; `country` is the code under it
    MarkerMoved { id: MarkerId, country: Option<String> },
}

/// Camera and selection state.
#[derive(Clone, Debug)]
pub struct GlobeState {
    rotation: Rotation,
    scale_factor: f64,
    viewport: Viewport,
    hovered_country: Option<usize>,
    selected_country: Option<usize>,
    day_night: bool,
}

impl GlobeState {
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn hovered_country(&self) -> Option<usize> {
        self.hovered_country
    }

    pub fn selected_country(&self) -> Option<usize> {
        self.selected_country
    }

    pub fn day_night(&self) -> bool {
        self.day_night
    }
}

fn round8(v: f64) -> f64 {
    (v * 1e8).round() / 1e8
}

pub struct GlobeView<S: Surface> {
    atlas: Arc<Atlas>,
    options: GlobeOptions,
    bounds: ZoomBounds,
    state: GlobeState,
    projection: Projection,
    gestures: GestureController,
    markers: MarkerLayer,
    renderer: Renderer<S>,
    pending_resize: Option<(Viewport, Instant)>,
    last_sun_refresh: Instant,
    events: Vec<ViewEvent>,
}

impl<S: Surface> GlobeView<S> {
    pub fn new(atlas: Arc<Atlas>, surface: S, options: GlobeOptions, now: Instant) -> Self {
        let bounds = ZoomBounds::for_device(options.device);
        let viewport = surface.size();
        let rotation = options.initial_rotation.level();
        let state = GlobeState {
            rotation,
            scale_factor: bounds.initial,
            viewport,
            hovered_country: None,
            selected_country: None,
            day_night: options.day_night,
        };
        let mut projection = Projection::new(rotation, options.precision);
        projection.fit(viewport, state.scale_factor);
        info!(device = ?options.device, input = ?options.input, ?viewport, "globe view ready");

        Self {
            atlas,
            options,
            bounds,
            state,
            projection,
            gestures: GestureController::new(),
            markers: MarkerLayer::new(),
            renderer: Renderer::new(surface),
            pending_resize: None,
            last_sun_refresh: now,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &GlobeState {
        &self.state
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn markers(&self) -> &MarkerLayer {
        &self.markers
    }

    pub fn options(&self) -> &GlobeOptions {
        &self.options
    }

    pub fn surface(&self) -> &S {
        self.renderer.surface()
    }

    pub fn renderer(&self) -> &Renderer<S> {
        &self.renderer
    }

    pub fn is_animating(&self) -> bool {
        self.gestures.is_animating()
    }

    pub fn needs_redraw(&self) -> bool {
        self.renderer.is_pending()
    }

    pub fn request_redraw(&mut self) {
        self.renderer.request_redraw();
    }

    /// Drain notifications raised since the last call.
    pub fn take_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.state.rotation = rotation.level();
        self.projection.set_rotation(self.state.rotation);
        self.camera_moved();
    }

    fn set_scale_factor(&mut self, scale_factor: f64) {
        if scale_factor == self.state.scale_factor {
            return;
        }
        self.state.scale_factor = scale_factor;
        self.projection.fit(self.state.viewport, scale_factor);
        self.camera_moved();
    }

    /// The ground under the pointer changed; hover resumes on the next motion.
    fn camera_moved(&mut self) {
        self.state.hovered_country = None;
        self.renderer.request_redraw();
    }

    /// Multiply the scale factor, clamped to the device bounds.
    pub fn zoom_by(&mut self, ratio: f64) {
        if ratio.is_finite() && ratio > 0.0 {
            self.set_scale_factor(self.bounds.clamp(self.state.scale_factor * ratio));
        }
    }

    /// Wheel zoom; positive `lines` scroll down and zoom out.
    pub fn wheel(&mut self, lines: f64) {
        let ratio = 2f64.powf(-lines * 0.25);
        self.set_scale_factor(self.bounds.clamp_wheel(self.state.scale_factor * ratio));
    }

    /// Keyboard nudge in degrees.
    pub fn rotate_by(&mut self, d_yaw: f64, d_pitch: f64) {
        let r = self.state.rotation;
        let pitch = (r.pitch + d_pitch).clamp(-90.0, 90.0);
        self.set_rotation(Rotation::new(r.yaw + d_yaw, pitch, 0.0));
    }

    pub fn reset_view(&mut self) {
        self.gestures.cancel_animation();
        self.set_rotation(self.options.initial_rotation);
        self.set_scale_factor(self.bounds.initial);
    }

    pub fn set_day_night(&mut self, enabled: bool) {
        if self.state.day_night != enabled {
            self.state.day_night = enabled;
            self.renderer.request_redraw();
        }
    }

    pub fn toggle_day_night(&mut self) {
        self.set_day_night(!self.state.day_night);
    }

    pub fn add_marker(&mut self, lon: f64, lat: f64) -> Result<MarkerId, MarkerError> {
        let id = self.markers.add(lon, lat)?;
        self.renderer.request_redraw();
        Ok(id)
    }

    pub fn move_marker(&mut self, id: &MarkerId, lon: f64, lat: f64) -> Result<(), MarkerError> {
        self.markers.move_marker(id, lon, lat)?;
        self.renderer.request_redraw();
        Ok(())
    }

    pub fn clear_markers(&mut self) {
        if !self.markers.is_empty() {
            self.markers.clear();
            self.renderer.request_redraw();
        }
    }

    /// Animate toward `(lon, lat)`; `arrival` decides what happens to the
    /// markers when it gets there.
    pub fn fly_to(&mut self, lon: f64, lat: f64, arrival: Arrival, now: Instant) -> Result<(), MarkerError> {
        if !is_valid_lonlat(lon, lat) {
            return Err(MarkerError::InvalidCoordinate { lon, lat });
        }
        self.gestures
            .start_fly_to(self.state.rotation, (lon, lat), self.options.fly_duration, arrival, now);
        self.renderer.request_redraw();
        Ok(())
    }

    fn emit_selection(&mut self, lon: f64, lat: f64, country: Option<usize>) {
        let country = country.and_then(|i| self.atlas.country(i));
        let selection = Selection {
            latitude: round8(lat),
            longitude: round8(lon),
            country_code: country.map(|c| c.code.clone()),
            country_name: country.and_then(|c| c.name.clone()),
        };
        info!(?selection, "place selected");
        self.events.push(ViewEvent::Selected(selection));
    }

    /// Externally chosen coordinate: identify the country, report it, and
    /// fly there, leaving a single marker.
    pub fn select_coordinate(&mut self, lat: f64, lon: f64, now: Instant) -> Result<(), MarkerError> {
        if !is_valid_lonlat(lon, lat) {
            return Err(MarkerError::InvalidCoordinate { lon, lat });
        }
        let country = country_at(&self.atlas, lon, lat);
        self.state.selected_country = country;
        self.emit_selection(lon, lat, country);
        self.fly_to(lon, lat, Arrival::ReplaceMarkers, now)
    }

    fn click(&mut self, x: f64, y: f64, now: Instant) {
        let Some((lon, lat)) = self.projection.invert(x, y) else {
            return;
        };
        let country = country_at(&self.atlas, lon, lat);
        self.state.selected_country = country;
        self.emit_selection(lon, lat, country);
        if let Err(e) = self.fly_to(lon, lat, Arrival::ReplaceMarkers, now) {
            warn!("click produced an invalid coordinate: {e}");
        }
    }

    fn apply(&mut self, event: GestureEvent, now: Instant) {
        match event {
            GestureEvent::None => {}
            GestureEvent::Rotate(rotation) => self.set_rotation(rotation),
            GestureEvent::Zoom(ratio) => self.zoom_by(ratio),
            GestureEvent::Click { x, y } => self.click(x, y, now),
            GestureEvent::MoveMarker { id, lon, lat } => {
                if let Err(e) = self.move_marker(&id, lon, lat) {
                    debug!("marker move ignored: {e}");
                }
            }
            GestureEvent::MarkerReleased { id, moved } => {
                if moved {
                    let country = self
                        .markers
                        .get(&id)
                        .and_then(|m| country_at(&self.atlas, m.lon, m.lat))
                        .and_then(|i| self.atlas.country(i))
                        .map(|c| c.code.clone());
                    debug!(%id, ?country, "marker dropped");
                    self.events.push(ViewEvent::MarkerMoved { id, country });
                } else {
                    let select = (self.markers.selected() != Some(&id)).then_some(&id);
                    self.markers.select(select);
                }
                self.renderer.request_redraw();
            }
        }
    }

    fn marker_under(&self, x: f64, y: f64) -> Option<MarkerId> {
        let size = policy::marker_size(self.options.device);
        self.markers
            .marker_at(&self.projection, x, y, size)
            .map(|m| m.id.clone())
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, button: PointerButton, now: Instant) {
        match button {
            PointerButton::Primary => match self.marker_under(x, y) {
                Some(id) => self.gestures.press_marker(id),
                None => {
                    self.gestures.press_globe(&self.projection, x, y);
                }
            },
            PointerButton::Secondary => {
                if let Some((lon, lat)) = self.projection.invert(x, y) {
                    if let Err(e) = self.fly_to(lon, lat, Arrival::AppendMarker, now) {
                        warn!("secondary click ignored: {e}");
                    }
                }
            }
        }
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, now: Instant) {
        if self.gestures.is_dragging() {
            let event = self.gestures.pointer_move(&self.projection, x, y);
            self.apply(event, now);
            return;
        }
        if self.options.input == InputMode::Pointer {
            let hovered = hit_test_country(&self.atlas, &self.projection, x, y);
            if hovered != self.state.hovered_country {
                self.state.hovered_country = hovered;
                self.renderer.request_redraw();
            }
        }
    }

    pub fn pointer_up(&mut self, x: f64, y: f64, now: Instant) {
        let event = self.gestures.pointer_up(x, y);
        self.apply(event, now);
    }

    pub fn pointer_leave(&mut self, now: Instant) {
        let event = self.gestures.pointer_leave();
        self.apply(event, now);
        if self.state.hovered_country.take().is_some() {
            self.renderer.request_redraw();
        }
    }

    /// A lone finger on a marker drags the marker; otherwise the globe.
    pub fn touch_start(&mut self, touches: &[(f64, f64)], now: Instant) {
        if let [(x, y)] = touches {
            if let Some(id) = self.marker_under(*x, *y) {
                self.gestures.touch_marker(id, now);
                return;
            }
        }
        self.gestures.touch_start(&self.projection, touches, now);
    }

    pub fn touch_move(&mut self, touches: &[(f64, f64)], now: Instant) {
        let event = self.gestures.touch_move(&self.projection, touches);
        self.apply(event, now);
    }

    pub fn touch_end(&mut self, remaining: usize, now: Instant) {
        let event = self.gestures.touch_end(remaining, now);
        self.apply(event, now);
    }

    /// Record a new surface size. Applied once sizes stop changing for the
    /// debounce interval; unusable sizes keep the last viewport.
    pub fn resize(&mut self, width: f64, height: f64, now: Instant) {
        let viewport = Viewport::new(width, height);
        if !width.is_finite() || !height.is_finite() || viewport.is_empty() {
            warn!(width, height, "ignoring unusable viewport size");
            return;
        }
        self.pending_resize = Some((viewport, now + self.options.resize_debounce));
    }

    fn apply_resize(&mut self, viewport: Viewport) {
        debug!(?viewport, "viewport resized");
        self.state.viewport = viewport;
        self.renderer.surface_mut().resize(viewport);
        self.projection.fit(viewport, self.state.scale_factor);
        self.renderer.request_redraw();
    }

    /// Advance time-driven state: fly-to frames, the debounced resize, and
    /// the periodic sun refresh.
    pub fn tick(&mut self, now: Instant) {
        match self.gestures.tick(now) {
            AnimationStep::Idle => {}
            AnimationStep::Frame(rotation) => self.set_rotation(rotation),
            AnimationStep::Finished {
                rotation,
                target: (lon, lat),
                arrival,
            } => {
                self.set_rotation(rotation);
                let placed = match arrival {
                    Arrival::ReplaceMarkers => Some(self.markers.replace_with(lon, lat)),
                    Arrival::AppendMarker => Some(self.markers.add(lon, lat)),
                    Arrival::Nothing => None,
                };
                match placed {
                    Some(Ok(id)) => self.events.push(ViewEvent::MarkerPlaced { id, lon, lat }),
                    Some(Err(e)) => warn!("marker not placed: {e}"),
                    None => {}
                }
            }
        }

        if let Some((viewport, due)) = self.pending_resize {
            if now >= due {
                self.pending_resize = None;
                self.apply_resize(viewport);
            }
        }

        if self.state.day_night && now.saturating_duration_since(self.last_sun_refresh) >= self.options.sun_refresh {
            self.last_sun_refresh = now;
            self.renderer.request_redraw();
        }
    }

    /// Paint if a redraw is pending.
    pub fn paint(&mut self, sun_time: DateTime<Utc>) -> bool {
        let frame = FrameInput {
            projection: &self.projection,
            atlas: &self.atlas,
            markers: &self.markers,
            hovered: self.state.hovered_country,
            selected: self.state.selected_country,
            visibility: policy::visibility(self.options.device, self.state.scale_factor),
            sun_time: self.state.day_night.then_some(sun_time),
            marker_size: policy::marker_size(self.options.device),
            scale_factor: self.state.scale_factor,
        };
        self.renderer.paint(&frame)
    }
}
