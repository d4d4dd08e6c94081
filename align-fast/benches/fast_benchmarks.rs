use align_core::{FeatureConfig, Image, ScoreType};
use align_fast::{CornerDetector, DetectorBuilder, FastDetector};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Blocky random texture with corners at every block joint
fn create_benchmark_image(width: usize, height: usize, block: usize) -> Image {
    let mut rng = StdRng::seed_from_u64(0xBEEF);
    let bw = width.div_ceil(block);
    let bh = height.div_ceil(block);
    let levels: Vec<u8> = (0..bw * bh).map(|_| rng.random()).collect();
    let data = (0..width * height)
        .map(|i| levels[(i / width) / block * bw + (i % width) / block])
        .collect();
    Image::gray(width, height, data).unwrap()
}

fn bench_segment_test(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_test");
    for &(w, h) in &[(320usize, 240usize), (640, 480)] {
        let img = create_benchmark_image(w, h, 8);
        for score in [ScoreType::Fast, ScoreType::Harris] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", score), format!("{}x{}", w, h)),
                &img,
                |b, img| b.iter(|| CornerDetector::detect(black_box(img), 20, 16, score)),
            );
        }
    }
    group.finish();
}

fn bench_full_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_keypoints");
    for &levels in &[1usize, 4, 8] {
        let img = create_benchmark_image(640, 480, 8);
        let detector: FastDetector = DetectorBuilder::from_config(FeatureConfig::default(), 640, 480)
            .pyramid(levels, 1.2)
            .build()
            .unwrap();
        group.bench_with_input(BenchmarkId::new("levels", levels), &img, |b, img| {
            b.iter(|| detector.detect_keypoints(black_box(img)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_segment_test, bench_full_detection);
criterion_main!(benches);
