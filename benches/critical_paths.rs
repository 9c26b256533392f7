//! Criterion benchmarks for Muyu critical paths
//!
//! Benchmarks the core performance-critical operations:
//! - Keying: per-pixel chroma-key pass, per algorithm
//! - Pipeline: full sheet processing (key + seams + budget)
//! - Scheduler: per-tick evaluation cost

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgba, RgbaImage};
use muyu::downscale::BudgetOptions;
use muyu::keying::apply_chroma_key;
use muyu::models::{ChromaKeyAlgorithm, ChromaKeyOptions, SchedulerConfig, SpriteSheetConfig};
use muyu::pipeline::process_image;
use muyu::scheduler::{PlaybackScheduler, TickInput};

/// Generate a green-screen sheet with a red subject per cell
fn make_sheet(columns: u32, rows: u32, frame: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(columns * frame, rows * frame, Rgba([0, 255, 0, 255]));
    for row in 0..rows {
        for col in 0..columns {
            for dy in frame / 4..frame * 3 / 4 {
                for dx in frame / 4..frame * 3 / 4 {
                    img.put_pixel(col * frame + dx, row * frame + dy, Rgba([220, 40, 40, 255]));
                }
            }
        }
    }
    img
}

fn bench_keying(c: &mut Criterion) {
    let mut group = c.benchmark_group("keying");
    let sheet = make_sheet(8, 7, 64);
    let pixels = u64::from(sheet.width()) * u64::from(sheet.height());
    group.throughput(Throughput::Elements(pixels));

    for algorithm in [
        ChromaKeyAlgorithm::Classic,
        ChromaKeyAlgorithm::Yuv,
        ChromaKeyAlgorithm::Hsl,
        ChromaKeyAlgorithm::Aggressive,
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(algorithm),
            &algorithm,
            |b, &algorithm| {
                b.iter(|| {
                    let mut img = sheet.clone();
                    apply_chroma_key(&mut img, algorithm, &ChromaKeyOptions::default());
                    black_box(img)
                })
            },
        );
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    for frame in [32u32, 64, 128] {
        let sheet = make_sheet(8, 7, frame);
        let mut config = SpriteSheetConfig::simple(8, 7);
        config.remove_grid_lines = true;
        group.bench_with_input(BenchmarkId::new("process", frame), &sheet, |b, sheet| {
            b.iter(|| {
                process_image(sheet.clone(), &config, &BudgetOptions::default()).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_scheduler(c: &mut Criterion) {
    c.bench_function("scheduler_tick", |b| {
        let mut scheduler = PlaybackScheduler::new(SchedulerConfig::default());
        let mut now = 0u64;
        let mut signal = 0u64;
        b.iter(|| {
            now += 220;
            signal += 1;
            black_box(scheduler.tick(&TickInput::at(now).with_signal(signal)))
        })
    });
}

criterion_group!(benches, bench_keying, bench_pipeline, bench_scheduler);
criterion_main!(benches);
