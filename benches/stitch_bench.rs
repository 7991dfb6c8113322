use criterion::{black_box, Criterion};
use std::time::Instant;

// Consolidated benchmark suite for pagestitch. Run with:
//    cargo bench

use image::{Rgba, RgbaImage};
use pagestitch::rendering::layout::{self, FitMode, LayoutMode};
use pagestitch::rendering::paint::compose;
use pagestitch::rendering::raster::encode_png;
use pagestitch::rendering::{stitch, StitchOptions};

const WHITE: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);

fn solid(w: u32, h: u32, seed: u8) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([seed, seed.wrapping_mul(3), seed.wrapping_mul(7), 0xff]))
}

/// Images of assorted sizes; the first pins the tile edge so every
/// other image takes the resize path under contain-fit.
fn mixed_images(count: usize) -> Vec<RgbaImage> {
    let mut images = vec![solid(96, 96, 17)];
    for i in 1..count {
        let w = 24 + ((i % 5) as u32) * 12;
        let h = 40 + ((i % 3) as u32) * 25;
        images.push(solid(w, h, (i * 31) as u8));
    }
    images
}

/// Bench: grid shape planning across the supported range
fn bench_plan_grid(c: &mut Criterion) {
    c.bench_function("plan_grid_tight_1_to_800", |b| {
        b.iter(|| {
            for count in 1..=800usize {
                black_box(layout::plan_grid(black_box(count), LayoutMode::TightGrid));
            }
        })
    });
}

/// Bench: compositing uniform tiles (no resampling)
fn bench_compose_uniform(c: &mut Criterion) {
    let images: Vec<RgbaImage> = (0..9u8).map(|i| solid(64, 64, i * 23)).collect();

    c.bench_function("compose_9x64_tight", |b| {
        b.iter(|| {
            compose(
                black_box(&images),
                LayoutMode::TightGrid,
                FitMode::Contain,
                16,
                WHITE,
            )
            .unwrap()
        })
    });
}

/// Bench: compositing mixed sizes through the resize path
fn bench_compose_mixed(c: &mut Criterion) {
    let images = mixed_images(12);

    c.bench_function("compose_12_mixed_contain", |b| {
        b.iter(|| {
            compose(
                black_box(&images),
                LayoutMode::TightGrid,
                FitMode::Contain,
                16,
                WHITE,
            )
            .unwrap()
        })
    });
}

/// Bench: PNG encoding of a finished canvas
fn bench_encode_png(c: &mut Criterion) {
    let images: Vec<RgbaImage> = (0..9u8).map(|i| solid(64, 64, i * 23)).collect();
    let canvas = compose(&images, LayoutMode::TightGrid, FitMode::Contain, 16, WHITE).unwrap();

    c.bench_function("encode_png_3x3_grid", |b| {
        b.iter(|| encode_png(black_box(&canvas)).unwrap())
    });
}

/// Micro-benchmark: full stitch latency percentiles (p50/p95/p99).
///
/// This bench is executed as part of `cargo bench` and prints percentile values
/// in addition to Criterion's reports. Configure iterations with `BENCH_ITERATIONS`.
fn bench_stitch_percentiles(_c: &mut Criterion) {
    let images = mixed_images(9);
    let options = StitchOptions::default();

    let iterations: usize = std::env::var("BENCH_ITERATIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);
    let warmup = 2usize;

    // Warmup
    for _ in 0..warmup {
        stitch(&images, &options).expect("warmup failed");
    }

    // Collect samples
    let mut samples = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let t0 = Instant::now();
        stitch(&images, &options).expect("stitch failed");
        samples.push(t0.elapsed().as_micros() as u64);
    }

    samples.sort_unstable();
    let p50 = percentile(&samples, 50.0);
    let p95 = percentile(&samples, 95.0);
    let p99 = percentile(&samples, 99.0);

    println!("[stitch_percentiles] samples={:?}", samples);
    println!(
        "[stitch_percentiles] p50={}us p95={}us p99={}us",
        p50, p95, p99
    );
}

fn percentile(samples: &[u64], pct: f64) -> u64 {
    if samples.is_empty() {
        return 0;
    }
    let n = samples.len();
    let rank = ((pct / 100.0) * (n as f64)).ceil() as usize;
    let idx = if rank == 0 {
        0
    } else {
        rank.saturating_sub(1).min(n - 1)
    };
    samples[idx]
}

// Run benches manually so we can print percentile output to the console
fn main() {
    // Create a Criterion instance, run the standard benchmark suites, then run the
    // percentile microbench and output percentiles alongside Criterion's reports.
    let mut c = Criterion::default();

    bench_plan_grid(&mut c);
    bench_compose_uniform(&mut c);
    bench_compose_mixed(&mut c);
    bench_encode_png(&mut c);

    // Finalize criterion reports (writes reports into target/criterion)
    c.final_summary();

    bench_stitch_percentiles(&mut c);
}
