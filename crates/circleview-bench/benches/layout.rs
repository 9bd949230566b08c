use circleview_bench::generate_synthetic_tree;
use circleview_core::LayoutSettings;
use circleview_layout::packing::pack_siblings;
use circleview_layout::{CharWidthMeasure, Diagram, InstantView};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn bench_full_relayout_100_nodes(c: &mut Criterion) {
    let data = generate_synthetic_tree(10, 9);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("current-thread runtime");

    c.bench_function("full_relayout_100_nodes", |b| {
        b.iter(|| {
            let diagram = Diagram::new(
                black_box(&data),
                LayoutSettings::default(),
                Arc::new(InstantView),
                Arc::new(CharWidthMeasure::default()),
            )
            .expect("valid tree");
            runtime.block_on(diagram.relayout_completely());
            black_box(diagram);
        })
    });
}

fn bench_pack_siblings_1000_circles(c: &mut Criterion) {
    let radii: Vec<f64> = (0..1000).map(|i| 5.0 + (i % 23) as f64).collect();

    c.bench_function("pack_siblings_1000_circles", |b| {
        b.iter(|| {
            let packed = pack_siblings(black_box(&radii));
            black_box(packed);
        })
    });
}

criterion_group!(
    benches,
    bench_full_relayout_100_nodes,
    bench_pack_siblings_1000_circles
);
criterion_main!(benches);
