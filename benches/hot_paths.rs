use std::sync::Arc;
use std::time::Instant;

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tui_globe::braille::BrailleSurface;
use tui_globe::data::Atlas;
use tui_globe::globe::path::{graticule10, project_path};
use tui_globe::globe::{hit_test_country, GlobeOptions, GlobeView, Projection, Rotation, Terminator, Viewport};

fn projection() -> Projection {
    let mut projection = Projection::new(Rotation::new(40.0, -20.0, 0.0), 0.5);
    projection.fit(Viewport::new(240.0, 160.0), 0.9);
    projection
}

fn bench_project_invert(c: &mut Criterion) {
    let projection = projection();
    c.bench_function("project", |b| {
        b.iter(|| black_box(projection.project(black_box(-30.0), black_box(15.0))))
    });
    c.bench_function("invert", |b| {
        b.iter(|| black_box(projection.invert(black_box(130.0), black_box(70.0))))
    });
}

fn bench_project_path(c: &mut Criterion) {
    let projection = projection();
    let lines = graticule10();
    c.bench_function("project_path_graticule", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(project_path(&projection, line, false));
            }
        })
    });
}

fn bench_hit_test(c: &mut Criterion) {
    let atlas = Atlas::builtin();
    let projection = projection();
    c.bench_function("hit_test_country", |b| {
        b.iter(|| black_box(hit_test_country(&atlas, &projection, black_box(100.0), black_box(60.0))))
    });
}

fn bench_terminator(c: &mut Criterion) {
    let at = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).single().unwrap_or_else(Utc::now);
    c.bench_function("terminator_compute", |b| b.iter(|| black_box(Terminator::compute(black_box(at)))));
}

fn bench_full_frame(c: &mut Criterion) {
    let now = Instant::now();
    let mut view = GlobeView::new(
        Arc::new(Atlas::builtin()),
        BrailleSurface::new(120, 40),
        GlobeOptions::default(),
        now,
    );
    let at = Utc::now();
    c.bench_function("paint_frame", |b| {
        b.iter(|| {
            view.request_redraw();
            black_box(view.paint(at))
        })
    });
}

criterion_group!(
    benches,
    bench_project_invert,
    bench_project_path,
    bench_hit_test,
    bench_terminator,
    bench_full_frame
);
criterion_main!(benches);
