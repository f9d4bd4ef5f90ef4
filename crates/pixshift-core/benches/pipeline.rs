//! Benchmarks for the pixshift conversion pipeline.
//!
//! Run with: cargo bench -p pixshift-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::DynamicImage;
use pixshift_core::pipeline::{AbandonFlag, ConversionTask, ImageRsCodec, PathResolver};
use pixshift_core::{BatchConverter, Config, ConversionRequest, Reporter, TargetFormat};
use pixshift_core::{ConversionResult, StatsSummary};
use std::path::Path;
use std::sync::Arc;

struct Silent;

impl Reporter for Silent {
    fn on_result(&self, _result: &ConversionResult) {}
    fn on_summary(&self, _summary: &StatsSummary) {}
}

fn benchmark_path_resolution(c: &mut Criterion) {
    let resolver = PathResolver::new("/out", TargetFormat::Webp, true);
    let root = Path::new("/photos");
    let file = Path::new("/photos/2024/summer/beach/IMG_0042.JPG");

    c.bench_function("output_path_mirror", |b| {
        b.iter(|| {
            let _ = resolver.output_path(black_box(root), black_box(file));
        })
    });
}

fn benchmark_single_conversion(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("frame.png");
    DynamicImage::new_rgba8(640, 480)
        .save(&input)
        .expect("write fixture");

    for format in [TargetFormat::Jpeg, TargetFormat::Png, TargetFormat::Webp] {
        let request = ConversionRequest::new(format, 85, false, false).expect("request");
        let resolver = PathResolver::new(dir.path().join("out"), format, false);
        let task = ConversionTask::new(Arc::new(ImageRsCodec), request, resolver, dir.path());

        c.bench_function(&format!("convert_640x480_to_{}", format.extension()), |b| {
            b.iter(|| {
                let _ = task.convert(black_box(&input), &AbandonFlag::new());
            })
        });
    }
}

fn benchmark_batch(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in");
    std::fs::create_dir_all(&input).expect("input dir");
    for i in 0..32 {
        DynamicImage::new_rgb8(256, 256)
            .save(input.join(format!("img{i:02}.png")))
            .expect("write fixture");
    }

    let converter = BatchConverter::new(Config::default());
    let request = ConversionRequest::new(TargetFormat::Bmp, 85, false, false).expect("request");
    let out = dir.path().join("out");
    let rt = tokio::runtime::Runtime::new().expect("runtime");

    c.bench_function("batch_32_png_to_bmp", |b| {
        b.iter(|| {
            let _ = rt.block_on(converter.run(&input, &out, &request, &Silent));
        })
    });
}

criterion_group!(
    benches,
    benchmark_path_resolution,
    benchmark_single_conversion,
    benchmark_batch,
);
criterion_main!(benches);
