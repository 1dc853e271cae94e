//! Benchmarks for the enhancement pipeline.
//!
//! Run with: cargo bench -p capsule-enhance

use capsule_core::{EnhancementSettings, Provenance, RasterImage, UpscaleFactor};
use capsule_enhance::enhance;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn photo(w: u32, h: u32) -> RasterImage {
    let mut raster = RasterImage::solid(w, h, [0, 0, 0, 255], Provenance::synthetic("bench"))
        .expect("allocate bench raster");
    for y in 0..h {
        let row = raster.row_mut(y);
        for x in 0..w as usize {
            row[x * 4] = (x % 256) as u8;
            row[x * 4 + 1] = (y % 256) as u8;
            row[x * 4 + 2] = ((x + y as usize) % 256) as u8;
        }
    }
    raster
}

fn bench_enhance(c: &mut Criterion) {
    let src = photo(320, 480);

    c.bench_function("enhance_default_x2", |bencher| {
        let settings = EnhancementSettings::default();
        bencher.iter(|| enhance(black_box(&src), black_box(&settings)));
    });

    c.bench_function("enhance_neutral_x1", |bencher| {
        let settings = EnhancementSettings::neutral(UpscaleFactor::X1);
        bencher.iter(|| enhance(black_box(&src), black_box(&settings)));
    });
}

criterion_group!(benches, bench_enhance);
criterion_main!(benches);
