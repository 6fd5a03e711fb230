use super::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Clip a segment to the rectangle [0, w] x [0, h] (Liang-Barsky).
fn clip(from: (f64, f64), to: (f64, f64), w: f64, h: f64) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [(-dx, from.0), (dx, w - from.0), (-dy, from.1), (dy, h - from.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    (t0 <= t1).then(|| {
        (
            (from.0 + t0 * dx, from.1 + t0 * dy),
            (from.0 + t1 * dx, from.1 + t1 * dy),
        )
    })
}

/// Draw a segment given in fractional dots, clipped to the canvas.
pub fn draw_segment(canvas: &mut BrailleCanvas, from: (f64, f64), to: (f64, f64)) {
    if !(from.0.is_finite() && from.1.is_finite() && to.0.is_finite() && to.1.is_finite()) {
        return;
    }
    let w = (canvas.width() * 2) as f64;
    let h = (canvas.height() * 4) as f64;
    let Some((a, b)) = clip(from, to, w, h) else {
        return;
    };
    draw_line(
        canvas,
        a.0.floor() as i32,
        a.1.floor() as i32,
        b.0.floor() as i32,
        b.1.floor() as i32,
    );
}

/// Draw a filled disk; radii under one dot set a single dot.
pub fn draw_disk(canvas: &mut BrailleCanvas, center: (f64, f64), radius: f64) {
    let (cx, cy) = (center.0.floor() as i32, center.1.floor() as i32);
    let r = radius.round().max(0.0) as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        assert_eq!(canvas.to_string(), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert_eq!(canvas.to_string(), "⡇\n⡇");
    }

    #[test]
    fn test_segment_far_outside_is_clipped() {
        let mut canvas = BrailleCanvas::new(2, 1);
        draw_segment(&mut canvas, (-1e9, 1.0), (1e9, 1.0));
        assert_eq!(canvas.to_string(), "⠒⠒");
        draw_segment(&mut canvas, (-10.0, -10.0), (-5.0, -1.0));
        assert_eq!(canvas.to_string(), "⠒⠒");
    }

    #[test]
    fn test_small_disk_is_one_dot() {
        let mut canvas = BrailleCanvas::new(1, 1);
        draw_disk(&mut canvas, (1.2, 2.7), 0.3);
        assert_eq!(canvas.to_string(), "⠠");
    }
}
