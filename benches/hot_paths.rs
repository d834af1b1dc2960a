use std::hint::black_box;

use bubble_map::config::LegendConfig;
use bubble_map::data::{Geography, NumberFormat};
use bubble_map::legend::SizeLegend;
use bubble_map::map::{GeoIndex, PathGenerator, Projection, ScaleChange, SqrtScale};
use criterion::{criterion_group, criterion_main, Criterion};

/// A topology of `n` x `n` rectangular countries covering the globe
fn grid_topology(n: usize) -> Vec<u8> {
    let mut arcs = Vec::new();
    let mut geometries = Vec::new();
    let (dx, dy) = (360.0 / n as f64, 160.0 / n as f64);
    for row in 0..n {
        for col in 0..n {
            let (x0, y0) = (-180.0 + col as f64 * dx, -80.0 + row as f64 * dy);
            let (x1, y1) = (x0 + dx * 0.9, y0 + dy * 0.9);
            let id = arcs.len();
            arcs.push(format!(
                "[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]"
            ));
            geometries.push(format!(
                r#"{{"type":"Polygon","arcs":[[{id}]],"id":"{id:03}"}}"#
            ));
        }
    }
    format!(
        r#"{{"type":"Topology","arcs":[{}],"objects":{{"countries":{{"type":"GeometryCollection","geometries":[{}]}}}}}}"#,
        arcs.join(","),
        geometries.join(",")
    )
    .into_bytes()
}

fn bench_index_build(c: &mut Criterion) {
    let bytes = grid_topology(15);
    c.bench_function("index_build_225", |b| {
        b.iter(|| {
            let geography = Geography::from_bytes(bytes.clone()).unwrap();
            black_box(GeoIndex::build(geography, "countries", "000", "643").unwrap())
        })
    });
}

fn bench_projection(c: &mut Criterion) {
    let geography = Geography::from_bytes(grid_topology(15)).unwrap();
    let index = GeoIndex::build(geography, "countries", "000", "643").unwrap();
    let features = index.features();
    let mut projection = Projection::natural_earth(-10.0);
    projection.fit_width(400.0, features);

    c.bench_function("project_all_features", |b| {
        let path = PathGenerator::new(projection);
        b.iter(|| black_box(path.paths(features)))
    });
}

fn bench_legend_layout(c: &mut Criterion) {
    let change = ScaleChange {
        title: "Population".to_string(),
        scale: SqrtScale::new(1_400_000_000.0, 40.0),
        format: NumberFormat::Grouped,
    };
    c.bench_function("legend_layout", |b| {
        let mut legend = SizeLegend::new(LegendConfig::default());
        b.iter(|| legend.update(black_box(&change)))
    });
}

criterion_group!(benches, bench_index_build, bench_projection, bench_legend_layout);
criterion_main!(benches);
