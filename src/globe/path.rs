//! Geographic paths to screen polylines.
//!
//! Edges between vertices are great-circle arcs. Each arc is subdivided until
//! its projection is within the projection's precision of a straight chord,
//! and polylines are broken where they pass behind the globe.

use glam::DVec3;

use super::projection::Projection;
use crate::geo::{lonlat_to_vec3, vec3_to_lonlat, LonLat};

/// A connected screen-space polyline in dots.
pub type ScreenRun = Vec<(f64, f64)>;

/// Recursion limit for adaptive subdivision.
const MAX_DEPTH: u32 = 16;

/// Arcs longer than this are always split before the precision test.
const MAX_ARC: f64 = 30.0 * std::f64::consts::PI / 180.0;

/// Bisection steps used to locate a horizon crossing.
const HORIZON_STEPS: u32 = 20;

struct RunBuilder {
    runs: Vec<ScreenRun>,
    current: ScreenRun,
}

impl RunBuilder {
    fn new() -> Self {
        Self {
            runs: Vec::new(),
            current: Vec::new(),
        }
    }

    fn move_to(&mut self, p: (f64, f64)) {
        self.break_run();
        self.current.push(p);
    }

    fn line_to(&mut self, p: (f64, f64)) {
        if self.current.is_empty() {
            self.current.push(p);
        } else if self.current.last() != Some(&p) {
            self.current.push(p);
        }
    }

    fn break_run(&mut self) {
        if self.current.len() >= 2 {
            self.runs.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }

    fn finish(mut self) -> Vec<ScreenRun> {
        self.break_run();
        self.runs
    }
}

fn project_vec(projection: &Projection, v: DVec3) -> Option<(f64, f64)> {
    let (lon, lat) = vec3_to_lonlat(v);
    projection.project(lon, lat)
}

fn midpoint(a: DVec3, b: DVec3) -> DVec3 {
    (a + b).normalize_or_zero()
}

/// Last visible point between a visible `a` and hidden `b`.
fn horizon_crossing(projection: &Projection, mut visible: DVec3, mut hidden: DVec3) -> (DVec3, (f64, f64)) {
    let mut best = project_vec(projection, visible);
    for _ in 0..HORIZON_STEPS {
        let m = midpoint(visible, hidden);
        match project_vec(projection, m) {
            Some(p) => {
                visible = m;
                best = Some(p);
            }
            None => hidden = m,
        }
    }
    // `visible` starts out visible, so `best` is always populated.
    (visible, best.unwrap_or((f64::NAN, f64::NAN)))
}

/// Subdivide a fully visible arc until it is flat enough, emitting its end.
fn refine(
    projection: &Projection,
    out: &mut RunBuilder,
    a: (DVec3, (f64, f64)),
    b: (DVec3, (f64, f64)),
    depth: u32,
) {
    let m = midpoint(a.0, b.0);
    if depth >= MAX_DEPTH || m == DVec3::ZERO {
        out.line_to(b.1);
        return;
    }

    let Some(pm) = project_vec(projection, m) else {
        // Dipped behind the limb: split at the horizon on both sides.
        let (_, pa) = horizon_crossing(projection, a.0, m);
        out.line_to(pa);
        let (_, pb) = horizon_crossing(projection, b.0, m);
        out.move_to(pb);
        out.line_to(b.1);
        return;
    };

    let chord = ((a.1 .0 + b.1 .0) / 2.0, (a.1 .1 + b.1 .1) / 2.0);
    let dx = pm.0 - chord.0;
    let dy = pm.1 - chord.1;
    let tolerance = projection.precision();
    let long_arc = a.0.dot(b.0).clamp(-1.0, 1.0).acos() > MAX_ARC;

    if !long_arc && dx * dx + dy * dy <= tolerance * tolerance {
        out.line_to(b.1);
    } else {
        refine(projection, out, a, (m, pm), depth + 1);
        refine(projection, out, (m, pm), b, depth + 1);
    }
}

/// Sample the arc a→b into `out`, handling horizon crossings.
fn sample_arc(projection: &Projection, out: &mut RunBuilder, a: DVec3, b: DVec3) {
    let angle = a.dot(b).clamp(-1.0, 1.0).acos();
    let pieces = ((angle / MAX_ARC).ceil() as usize).max(1);

    let sin_angle = angle.sin();
    let point = |t: f64| -> DVec3 {
        if sin_angle.abs() < 1e-10 {
            return a.lerp(b, t).normalize_or_zero();
        }
        let sa = ((1.0 - t) * angle).sin() / sin_angle;
        let sb = (t * angle).sin() / sin_angle;
        a * sa + b * sb
    };

    let mut prev = a;
    let mut prev_p = project_vec(projection, a);
    for i in 1..=pieces {
        let next = if i == pieces { b } else { point(i as f64 / pieces as f64) };
        let next_p = project_vec(projection, next);

        match (prev_p, next_p) {
            (Some(p0), Some(p1)) => {
                if out.current.is_empty() {
                    out.move_to(p0);
                }
                refine(projection, out, (prev, p0), (next, p1), 0);
            }
            (Some(p0), None) => {
                if out.current.is_empty() {
                    out.move_to(p0);
                }
                let (edge, pe) = horizon_crossing(projection, prev, next);
                refine(projection, out, (prev, p0), (edge, pe), 0);
                out.break_run();
            }
            (None, Some(p1)) => {
                let (edge, pe) = horizon_crossing(projection, next, prev);
                out.move_to(pe);
                refine(projection, out, (edge, pe), (next, p1), 0);
            }
            (None, None) => out.break_run(),
        }

        prev = next;
        prev_p = next_p;
    }
}

/// Project a geographic linestring (or ring, when `closed`) into visible runs.
pub fn project_path(projection: &Projection, coords: &[LonLat], closed: bool) -> Vec<ScreenRun> {
    let mut out = RunBuilder::new();
    if coords.len() < 2 {
        return Vec::new();
    }

    let vectors: Vec<DVec3> = coords.iter().map(|&(lon, lat)| lonlat_to_vec3(lon, lat)).collect();
    for pair in vectors.windows(2) {
        sample_arc(projection, &mut out, pair[0], pair[1]);
    }
    if closed && coords.first() != coords.last() {
        if let (Some(&last), Some(&first)) = (vectors.last(), vectors.first()) {
            sample_arc(projection, &mut out, last, first);
        }
    }
    out.finish()
}

/// Graticule with 10° spacing: meridians stop at ±80° except every 90°,
/// parallels run from -80° to 80°. Lines are densified every 2.5°.
pub fn graticule10() -> Vec<Vec<LonLat>> {
    const STEP: f64 = 2.5;
    let mut lines = Vec::new();

    for i in 0..36 {
        let lon = -180.0 + i as f64 * 10.0;
        let extent = if (lon as i64) % 90 == 0 { 90.0 } else { 80.0 };
        let n = (2.0 * extent / STEP) as usize;
        lines.push((0..=n).map(|j| (lon, -extent + j as f64 * STEP)).collect());
    }

    for i in 0..=16 {
        let lat = -80.0 + i as f64 * 10.0;
        let n = (360.0 / STEP) as usize;
        lines.push((0..=n).map(|j| (-180.0 + j as f64 * STEP, lat)).collect());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globe::projection::{Rotation, Viewport};

    fn fitted() -> Projection {
        let mut p = Projection::new(Rotation::default(), 0.5);
        p.fit(Viewport::new(200.0, 200.0), 1.0);
        p
    }

    #[test]
    fn test_visible_segment_is_one_run() {
        let runs = project_path(&fitted(), &[(-20.0, 0.0), (20.0, 0.0)], false);
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert!((run[0].0 - (100.0 - 100.0 * 20f64.to_radians().sin())).abs() < 1e-6);
        assert!((run.last().unwrap().0 - (100.0 + 100.0 * 20f64.to_radians().sin())).abs() < 1e-6);
    }

    #[test]
    fn test_hidden_segment_is_dropped() {
        let runs = project_path(&fitted(), &[(150.0, 0.0), (-150.0, 10.0)], false);
        assert!(runs.is_empty());
    }

    #[test]
    fn test_crossing_segment_stops_at_limb() {
        let p = fitted();
        let runs = project_path(&p, &[(0.0, 0.0), (140.0, 0.0)], false);
        assert_eq!(runs.len(), 1);
        let end = *runs[0].last().unwrap();
        // Ends on the right-hand edge of the disk.
        assert!((end.0 - 200.0).abs() < 0.5, "{end:?}");
        assert!(runs[0].iter().all(|&(x, y)| p.disk_contains(x, y) || (x - 200.0).abs() < 0.5 && (y - 100.0).abs() < 0.5));
    }

    #[test]
    fn test_meridian_is_densified() {
        let runs = project_path(&fitted(), &[(0.0, -80.0), (0.0, 80.0)], false);
        assert_eq!(runs.len(), 1);
        assert!(runs[0].len() > 6);
    }

    #[test]
    fn test_closed_ring_adds_closing_edge() {
        let ring = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)];
        let open = project_path(&fitted(), &ring, false);
        let closed = project_path(&fitted(), &ring, true);
        let first = closed[0][0];
        let last = *closed[0].last().unwrap();
        assert!((first.0 - last.0).abs() < 1e-9 && (first.1 - last.1).abs() < 1e-9);
        assert!(closed[0].len() > open[0].len());
    }

    #[test]
    fn test_graticule_shape() {
        let lines = graticule10();
        assert_eq!(lines.len(), 36 + 17);
        // Major meridian reaches the pole, minor ones stop at 80°.
        assert_eq!(lines[0].last().unwrap().1, 90.0);
        assert_eq!(lines[1].last().unwrap().1, 80.0);
    }
}
