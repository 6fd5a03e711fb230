use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use crossbeam_channel::{Receiver, TryRecvError};
use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use tracing::{error, info};

use tui_globe::braille::BrailleSurface;
use tui_globe::config::Config;
use tui_globe::data::{Atlas, AtlasError};
use tui_globe::globe::{GlobeView, InputMode, PointerButton, Selection, ViewEvent};

/// Degrees per keyboard nudge.
const NUDGE_DEG: f64 = 10.0;
/// Zoom ratio per `+`/`-` press.
const KEY_ZOOM: f64 = 1.25;

pub type AtlasReceiver = Receiver<Result<Arc<Atlas>, AtlasError>>;

/// Lifecycle of the globe: nothing renders until the atlas is in.
pub enum LoadState {
    Loading,
    Failed(String),
    Ready(Box<GlobeView<BrailleSurface>>),
}

/// Application state
pub struct App {
    pub state: LoadState,
    pub config: Config,
    pub should_quit: bool,
    /// Last place reported by a click or `--goto`
    pub last_selection: Option<Selection>,
    /// Short message for the status bar
    pub status: Option<String>,
    loader: Option<AtlasReceiver>,
    goto: Option<(f64, f64)>,
    /// Terminal size in cells
    width: u16,
    height: u16,
}

impl App {
    pub fn new(width: u16, height: u16, config: Config, goto: Option<(f64, f64)>, loader: AtlasReceiver) -> Self {
        Self {
            state: LoadState::Loading,
            config,
            should_quit: false,
            last_selection: None,
            status: None,
            loader: Some(loader),
            goto,
            width,
            height,
        }
    }

    /// Start directly from an atlas already in memory.
    pub fn with_atlas(width: u16, height: u16, config: Config, goto: Option<(f64, f64)>, atlas: Arc<Atlas>) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        // Bounded(1) with a live receiver: the send cannot fail.
        let _ = tx.send(Ok(atlas));
        Self::new(width, height, config, goto, rx)
    }

    /// Map area inside the border, in cells: (x, y, cols, rows).
    /// Account for border (2 chars horizontal, 2 vertical) plus the status bar.
    pub fn map_area(&self) -> (u16, u16, u16, u16) {
        (1, 1, self.width.saturating_sub(2), self.height.saturating_sub(3))
    }

    pub fn view(&self) -> Option<&GlobeView<BrailleSurface>> {
        match &self.state {
            LoadState::Ready(view) => Some(&**view),
            _ => None,
        }
    }

    fn view_mut(&mut self) -> Option<&mut GlobeView<BrailleSurface>> {
        match &mut self.state {
            LoadState::Ready(view) => Some(&mut **view),
            _ => None,
        }
    }

    fn poll_loader(&mut self, now: Instant) {
        let Some(loader) = &self.loader else {
            return;
        };
        let result = match loader.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                self.loader = None;
                self.state = LoadState::Failed("atlas loader stopped unexpectedly".to_string());
                return;
            }
        };
        self.loader = None;

        match result {
            Ok(atlas) => {
                let (_, _, cols, rows) = self.map_area();
                let options = self.config.view.globe_options(self.width);
                let surface = BrailleSurface::new(cols as usize, rows as usize);
                let mut view = GlobeView::new(atlas, surface, options, now);
                if let Some((lat, lon)) = self.goto.take() {
                    if let Err(e) = view.select_coordinate(lat, lon, now) {
                        self.status = Some(e.to_string());
                    }
                }
                info!("globe ready");
                self.state = LoadState::Ready(Box::new(view));
            }
            Err(e) => {
                error!("atlas failed to load: {e}");
                self.state = LoadState::Failed(e.to_string());
            }
        }
    }

    /// Advance loading, animations and timers, then collect view events.
    pub fn tick(&mut self, now: Instant) {
        self.poll_loader(now);
        let Some(view) = self.view_mut() else {
            return;
        };
        view.tick(now);
        let events = view.take_events();
        for event in events {
            match event {
                ViewEvent::Selected(selection) => self.last_selection = Some(selection),
                ViewEvent::MarkerPlaced { id, lon, lat } => {
                    self.status = Some(format!("{id} at {lat:.2}, {lon:.2}"));
                }
                ViewEvent::MarkerMoved { id, country } => {
                    let place = country.as_deref().unwrap_or("open water");
                    self.status = Some(format!("{id} moved to {place}"));
                }
            }
        }
    }

    /// Rasterize the globe if anything changed since the last frame.
    pub fn paint(&mut self) -> bool {
        self.view_mut().is_some_and(|view| view.paint(Utc::now()))
    }

    pub fn resize(&mut self, width: u16, height: u16, now: Instant) {
        self.width = width;
        self.height = height;
        let (_, _, cols, rows) = self.map_area();
        if let Some(view) = self.view_mut() {
            // Braille gives 2x4 resolution per character
            view.resize(cols as f64 * 2.0, rows as f64 * 4.0, now);
        }
    }

    /// Terminal cell to braille dot (cell center), or `None` outside the map.
    fn to_dots(&self, column: u16, row: u16) -> Option<(f64, f64)> {
        let (x, y, cols, rows) = self.map_area();
        if column < x || row < y || column >= x + cols || row >= y + rows {
            return None;
        }
        Some((
            (column - x) as f64 * 2.0 + 1.0,
            (row - y) as f64 * 4.0 + 2.0,
        ))
    }

    /// Handle mouse events for rotating, zooming and selecting
    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        let dots = self.to_dots(mouse.column, mouse.row);
        let Some(view) = self.view_mut() else {
            return;
        };
        let touch = view.options().input == InputMode::Touch;

        let Some((x, y)) = dots else {
            // Leaving the map ends any gesture in progress.
            if matches!(
                mouse.kind,
                MouseEventKind::Drag(_) | MouseEventKind::Moved | MouseEventKind::Up(MouseButton::Left)
            ) {
                view.pointer_leave(now);
            }
            return;
        };

        match mouse.kind {
            MouseEventKind::ScrollUp => view.wheel(-1.0),
            MouseEventKind::ScrollDown => view.wheel(1.0),
            MouseEventKind::Down(MouseButton::Left) if touch => view.touch_start(&[(x, y)], now),
            MouseEventKind::Drag(MouseButton::Left) if touch => view.touch_move(&[(x, y)], now),
            MouseEventKind::Up(MouseButton::Left) if touch => view.touch_end(0, now),
            MouseEventKind::Down(MouseButton::Left) => view.pointer_down(x, y, PointerButton::Primary, now),
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => view.pointer_move(x, y, now),
            MouseEventKind::Up(MouseButton::Left) => view.pointer_up(x, y, now),
            MouseEventKind::Down(MouseButton::Right) => view.pointer_down(x, y, PointerButton::Secondary, now),
            _ => {}
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
            self.should_quit = true;
            return;
        }
        let Some(view) = self.view_mut() else {
            return;
        };
        match code {
            KeyCode::Left | KeyCode::Char('h') => view.rotate_by(NUDGE_DEG, 0.0),
            KeyCode::Right | KeyCode::Char('l') => view.rotate_by(-NUDGE_DEG, 0.0),
            KeyCode::Up | KeyCode::Char('k') => view.rotate_by(0.0, -NUDGE_DEG),
            KeyCode::Down | KeyCode::Char('j') => view.rotate_by(0.0, NUDGE_DEG),
            KeyCode::Char('+') | KeyCode::Char('=') => view.zoom_by(KEY_ZOOM),
            KeyCode::Char('-') | KeyCode::Char('_') => view.zoom_by(1.0 / KEY_ZOOM),
            KeyCode::Char('n') | KeyCode::Char('N') => view.toggle_day_night(),
            KeyCode::Char('x') | KeyCode::Char('X') => view.clear_markers(),
            KeyCode::Char('r') | KeyCode::Char('0') => view.reset_view(),
            _ => {}
        }
    }

    /// Get current zoom level as a display string
    pub fn zoom_level(&self) -> String {
        match self.view() {
            Some(view) => format!("{:.2}x", view.state().scale_factor()),
            None => "-".to_string(),
        }
    }

    /// Geographic point at the disk center
    pub fn center_coords(&self) -> String {
        let Some(view) = self.view() else {
            return String::new();
        };
        let (lon, lat) = view.projection().center_lonlat();
        let lat_dir = if lat >= 0.0 { 'N' } else { 'S' };
        let lon_dir = if lon >= 0.0 { 'E' } else { 'W' };
        format!("{:.2}°{} {:.2}°{}", lat.abs(), lat_dir, lon.abs(), lon_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use tui_globe::globe::Rotation;

    fn ready_app() -> (App, Instant) {
        let now = Instant::now();
        let mut config = Config::default();
        config.view.initial_yaw = 0.0;
        config.view.initial_pitch = 0.0;
        let mut app = App::with_atlas(122, 43, config, None, Arc::new(Atlas::builtin()));
        app.tick(now);
        (app, now)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_loading_until_atlas_arrives() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut app = App::new(100, 40, Config::default(), None, rx);
        let now = Instant::now();
        app.tick(now);
        assert!(matches!(app.state, LoadState::Loading));
        assert!(!app.paint());

        tx.send(Err(AtlasError::Empty)).unwrap();
        app.tick(now);
        assert!(matches!(app.state, LoadState::Failed(_)));
        assert!(!app.paint());
    }

    #[test]
    fn test_ready_paints_once() {
        let (mut app, _) = ready_app();
        assert!(app.view().is_some());
        assert!(app.paint());
        assert!(!app.paint());
    }

    #[test]
    fn test_goto_selects_on_load() {
        let now = Instant::now();
        let mut app = App::with_atlas(122, 43, Config::default(), Some((-25.0, 135.0)), Arc::new(Atlas::builtin()));
        app.tick(now);
        let selection = app.last_selection.clone().unwrap();
        assert_eq!(selection.country_code.as_deref(), Some("OC"));
        assert!(app.view().unwrap().is_animating());
    }

    #[test]
    fn test_keys() {
        let (mut app, _) = ready_app();
        app.handle_key(KeyCode::Char('l'));
        let r = app.view().unwrap().state().rotation();
        assert_eq!(r, Rotation::new(-10.0, 0.0, 0.0));
        let before = app.view().unwrap().state().scale_factor();
        app.handle_key(KeyCode::Char('+'));
        let after = app.view().unwrap().state().scale_factor();
        assert!((after - before * KEY_ZOOM).abs() < 1e-9);
        app.handle_key(KeyCode::Char('n'));
        assert!(!app.view().unwrap().state().day_night());
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_click_in_map_selects() {
        let (mut app, now) = ready_app();
        // Map is 120x40 cells; its center cell sits over (0, 0).
        let (x, y, cols, rows) = app.map_area();
        let (cx, cy) = (x + cols / 2, y + rows / 2);
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), cx, cy), now);
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), cx, cy), now);
        app.tick(now);
        let selection = app.last_selection.clone().unwrap();
        assert!(selection.latitude.abs() < 3.0 && selection.longitude.abs() < 3.0);
    }

    #[test]
    fn test_mouse_outside_map_is_ignored() {
        let (mut app, now) = ready_app();
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 0, 0), now);
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 0, 0), now);
        app.tick(now);
        assert!(app.last_selection.is_none());
    }
}
