use super::draw::{draw_disk, draw_segment};
use super::BrailleCanvas;
use crate::globe::render::{Layer, Surface};
use crate::globe::Viewport;

/// A text label anchored to a character cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub layer: Layer,
    pub col: usize,
    pub row: usize,
    pub text: String,
}

/// Per-layer dot canvas plus a per-cell fill mask.
#[derive(Clone, Debug)]
struct LayerBuffer {
    dots: BrailleCanvas,
    fill: Vec<bool>,
}

impl LayerBuffer {
    fn new(cols: usize, rows: usize) -> Self {
        Self {
            dots: BrailleCanvas::new(cols, rows),
            fill: vec![false; cols * rows],
        }
    }
}

/// Terminal drawing surface: one braille canvas per layer, composited by the
/// UI with a colour per layer. Fills are resolved per character cell by
/// sampling the cell center.
#[derive(Clone, Debug)]
pub struct BrailleSurface {
    cols: usize,
    rows: usize,
    layers: Vec<LayerBuffer>,
    labels: Vec<Label>,
}

impl BrailleSurface {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            layers: Layer::ALL.iter().map(|_| LayerBuffer::new(cols, rows)).collect(),
            labels: Vec::new(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn buffer(&mut self, layer: Layer) -> &mut LayerBuffer {
        &mut self.layers[layer as usize]
    }

    /// Braille glyph drawn on `layer` at a cell, if any.
    pub fn glyph(&self, layer: Layer, col: usize, row: usize) -> Option<char> {
        self.layers[layer as usize].dots.glyph(col, row)
    }

    pub fn is_filled(&self, layer: Layer, col: usize, row: usize) -> bool {
        col < self.cols && row < self.rows && self.layers[layer as usize].fill[row * self.cols + col]
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Resize to a character grid.
    pub fn resize_cells(&mut self, cols: usize, rows: usize) {
        self.cols = cols;
        self.rows = rows;
        for buffer in &mut self.layers {
            buffer.dots.resize(cols, rows);
            buffer.fill = vec![false; cols * rows];
        }
        self.labels.clear();
    }
}

impl Surface for BrailleSurface {
    fn size(&self) -> Viewport {
        Viewport::new((self.cols * 2) as f64, (self.rows * 4) as f64)
    }

    fn resize(&mut self, viewport: Viewport) {
        let cols = (viewport.width / 2.0).floor().max(0.0) as usize;
        let rows = (viewport.height / 4.0).floor().max(0.0) as usize;
        if cols != self.cols || rows != self.rows {
            self.resize_cells(cols, rows);
        }
    }

    fn clear(&mut self) {
        for buffer in &mut self.layers {
            buffer.dots.clear();
            buffer.fill.fill(false);
        }
        self.labels.clear();
    }

    fn fill(&mut self, layer: Layer, inside: &dyn Fn(f64, f64) -> bool) {
        let cols = self.cols;
        let rows = self.rows;
        let mask = &mut self.buffer(layer).fill;
        for row in 0..rows {
            for col in 0..cols {
                let x = (col * 2) as f64 + 1.0;
                let y = (row * 4) as f64 + 2.0;
                if inside(x, y) {
                    mask[row * cols + col] = true;
                }
            }
        }
    }

    fn stroke(&mut self, layer: Layer, from: (f64, f64), to: (f64, f64)) {
        draw_segment(&mut self.buffer(layer).dots, from, to);
    }

    fn dot(&mut self, layer: Layer, at: (f64, f64), radius: f64) {
        draw_disk(&mut self.buffer(layer).dots, at, radius);
    }

    fn label(&mut self, layer: Layer, at: (f64, f64), text: &str) {
        if !(at.0.is_finite() && at.1.is_finite()) || at.0 < 0.0 || at.1 < 0.0 {
            return;
        }
        let row = (at.1 / 4.0) as usize;
        let center = (at.0 / 2.0) as usize;
        if row >= self.rows || center >= self.cols {
            return;
        }
        let width = text.chars().count();
        let col = center.saturating_sub(width / 2);
        self.labels.push(Label {
            layer,
            col,
            row,
            text: text.to_string(),
        });
    }
}
