use std::str::FromStr;

use crate::app::{App, LoadState};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};
use tracing::warn;
use tui_globe::braille::BrailleSurface;
use tui_globe::config::ThemeConfig;
use tui_globe::globe::Layer;

/// Fill layers, back to front.
const FILLS: [Layer; 6] = [
    Layer::Water,
    Layer::Land,
    Layer::Night,
    Layer::MarkerPolygon,
    Layer::Hover,
    Layer::Selection,
];

/// Luminance factor applied to whatever lies under the night side.
const NIGHT_SHADE: f64 = -0.45;

type Rgb = (u8, u8, u8);

/// Parse a `#rrggbb` theme colour. Named and indexed colours have no RGB
/// value to shade, so they are rejected.
pub fn parse_hex(s: &str) -> Option<Rgb> {
    match Color::from_str(s.trim()) {
        Ok(Color::Rgb(r, g, b)) => Some((r, g, b)),
        _ => None,
    }
}

/// Lighten (positive) or darken (negative) by a luminance factor in [-1, 1].
pub fn shade(rgb: Rgb, factor: f64) -> Rgb {
    let f = factor.clamp(-1.0, 1.0);
    let adjust = |c: u8| {
        let c = c as f64;
        let v = if f >= 0.0 { c + (255.0 - c) * f } else { c * (1.0 + f) };
        v.round() as u8
    };
    (adjust(rgb.0), adjust(rgb.1), adjust(rgb.2))
}

/// Linear mix of two colours; `t = 0` is `a`.
pub fn blend(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

fn rgb(c: Rgb) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

/// Theme colours resolved once per frame.
struct Palette {
    water: Rgb,
    land: Rgb,
    graticule: Rgb,
    coastline: Rgb,
    borders: Rgb,
    night: Rgb,
    terminator: Rgb,
    city_lights: Rgb,
    markers: Rgb,
    marker_polygon: Rgb,
    marker_links: Rgb,
    highlight: Rgb,
    selection: Rgb,
    labels: Rgb,
}

impl Palette {
    fn from_theme(theme: &ThemeConfig) -> Self {
        let defaults = ThemeConfig::default();
        let pick = |value: &str, fallback: &str| {
            parse_hex(value).unwrap_or_else(|| {
                warn!("invalid theme colour {value:?}, using {fallback}");
                parse_hex(fallback).unwrap_or((255, 255, 255))
            })
        };
        Self {
            water: pick(&theme.water, &defaults.water),
            land: pick(&theme.land, &defaults.land),
            graticule: pick(&theme.graticule, &defaults.graticule),
            coastline: pick(&theme.coastline, &defaults.coastline),
            borders: pick(&theme.borders, &defaults.borders),
            night: pick(&theme.night, &defaults.night),
            terminator: pick(&theme.terminator, &defaults.terminator),
            city_lights: pick(&theme.city_lights, &defaults.city_lights),
            markers: pick(&theme.markers, &defaults.markers),
            marker_polygon: pick(&theme.marker_polygon, &defaults.marker_polygon),
            marker_links: pick(&theme.marker_links, &defaults.marker_links),
            highlight: pick(&theme.highlight, &defaults.highlight),
            selection: pick(&theme.selection, &defaults.selection),
            labels: pick(&theme.labels, &defaults.labels),
        }
    }

    fn stroke(&self, layer: Layer) -> Rgb {
        match layer {
            Layer::Graticule => self.graticule,
            Layer::Coastline => self.coastline,
            Layer::Borders => self.borders,
            Layer::Terminator => self.terminator,
            Layer::CityLights => self.city_lights,
            Layer::MarkerLinks => self.marker_links,
            Layer::MarkersHidden => shade(self.markers, -0.5),
            Layer::Markers => self.markers,
            Layer::MarkerSelected => shade(self.markers, 0.5),
            Layer::SelectionOutline => self.selection,
            Layer::Water | Layer::Land | Layer::Night => self.labels,
            Layer::MarkerPolygon => self.marker_polygon,
            Layer::Hover => self.highlight,
            Layer::Selection => self.selection,
            Layer::Labels => self.labels,
        }
    }

    /// Apply one fill layer on top of the colour beneath it.
    fn fill(&self, layer: Layer, under: Option<Rgb>) -> Rgb {
        match (layer, under) {
            (Layer::Water, _) => self.water,
            (Layer::Land, _) => self.land,
            (Layer::Night, Some(c)) => blend(shade(c, NIGHT_SHADE), self.night, 0.15),
            (Layer::MarkerPolygon, Some(c)) => blend(c, self.marker_polygon, 0.4),
            (Layer::Hover, Some(c)) => blend(c, self.highlight, 0.5),
            (Layer::Selection, Some(c)) => blend(c, self.selection, 0.5),
            (Layer::Night, None) => shade(self.night, NIGHT_SHADE),
            (_, None) => self.stroke(layer),
            (_, Some(c)) => c,
        }
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into map area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    // Create a block with border
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Globe ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    match &app.state {
        LoadState::Loading => {
            let text = Paragraph::new("Loading atlas...")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            frame.render_widget(text, centered_line(inner));
        }
        LoadState::Failed(message) => {
            let text = Paragraph::new(format!("Failed to load atlas: {message}"))
                .style(Style::default().fg(Color::Red))
                .alignment(Alignment::Center);
            frame.render_widget(text, centered_line(inner));
        }
        LoadState::Ready(view) => {
            let widget = GlobeWidget {
                surface: view.surface(),
                palette: Palette::from_theme(&app.config.theme),
            };
            frame.render_widget(widget, inner);
        }
    }
}

fn centered_line(area: Rect) -> Rect {
    Rect {
        y: area.y + area.height / 2,
        height: area.height.min(1),
        ..area
    }
}

/// Composites the per-layer braille canvases into terminal cells: fills
/// become background colours, strokes and dots become glyphs, labels go on top.
struct GlobeWidget<'a> {
    surface: &'a BrailleSurface,
    palette: Palette,
}

impl GlobeWidget<'_> {
    fn cell(&self, col: usize, row: usize) -> (Option<char>, Option<Rgb>, Option<Rgb>) {
        let bg = FILLS
            .iter()
            .filter(|&&layer| self.surface.is_filled(layer, col, row))
            .fold(None, |under, &layer| Some(self.palette.fill(layer, under)));

        // Topmost stroke wins the glyph.
        let top = Layer::ALL
            .iter()
            .rev()
            .filter(|layer| !FILLS.contains(*layer))
            .find_map(|&layer| self.surface.glyph(layer, col, row).map(|ch| (ch, layer)));

        match top {
            Some((ch, layer)) => (Some(ch), Some(self.palette.stroke(layer)), bg),
            None => (None, None, bg),
        }
    }
}

impl Widget for GlobeWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // The surface may lag the terminal while a resize is debounced.
        let cols = area.width.min(self.surface.cols() as u16);
        let rows = area.height.min(self.surface.rows() as u16);

        for row in 0..rows {
            for col in 0..cols {
                let (ch, fg, bg) = self.cell(col as usize, row as usize);
                let cell = &mut buf[(area.x + col, area.y + row)];
                if let Some(bg) = bg {
                    cell.set_bg(rgb(bg));
                }
                if let (Some(ch), Some(fg)) = (ch, fg) {
                    cell.set_char(ch).set_fg(rgb(fg));
                }
            }
        }

        let label_style = Style::default()
            .fg(rgb(self.palette.labels))
            .add_modifier(Modifier::BOLD);
        for label in self.surface.labels() {
            if label.row >= rows as usize || label.col >= cols as usize {
                continue;
            }
            let max_len = cols as usize - label.col;
            let y = area.y + label.row as u16;
            for (i, ch) in label.text.chars().take(max_len).enumerate() {
                let x = area.x + label.col as u16 + i as u16;
                buf[(x, y)].set_char(ch).set_style(label_style);
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" ", Style::default()),
    ];

    if let Some(view) = app.view() {
        let on = view.state().day_night();
        spans.push(Span::styled(
            if on { "[N]ight " } else { "[n]ight " },
            Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
        ));
        spans.push(Span::styled(
            format!("{} markers ", view.markers().len()),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if let Some(selection) = &app.last_selection {
        let place = selection
            .country_name
            .as_deref()
            .or(selection.country_code.as_deref())
            .unwrap_or("Open water");
        spans.push(Span::styled("| ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            format!("{place} ({:.2}, {:.2}) ", selection.latitude, selection.longitude),
            Style::default().fg(Color::Magenta),
        ));
    }

    if let Some(status) = &app.status {
        spans.push(Span::styled("| ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(format!("{status} "), Style::default().fg(Color::White)));
    }

    spans.push(Span::styled(
        "| drag:rotate wheel:zoom click:select right:mark x:clear r:reset q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
