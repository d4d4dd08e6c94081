use align_cli::{render, setup_logging, AlignConfig, Aligner};
use anyhow::{bail, Context, Result};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

const USAGE: &str = "usage: align <reference> <moving> <out_dir> [config.toml|config.json]";

#[derive(Serialize)]
struct HomographyReport {
    /// Row-major, maps moving-image coordinates onto the reference image
    homography: [[f64; 3]; 3],
    retained_matches: usize,
    inliers: usize,
    ransac_iterations: usize,
}

fn load_config(path: &Path) -> Result<AlignConfig> {
    let cfg = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => AlignConfig::load_json(path),
        _ => AlignConfig::load_toml(path),
    }
    .with_context(|| format!("Failed to load config {}", path.display()))?;
    Ok(cfg)
}

fn main() -> Result<()> {
    let _logger = setup_logging("info")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !(3..=4).contains(&args.len()) {
        bail!(USAGE);
    }
    let reference_path = PathBuf::from(&args[0]);
    let moving_path = PathBuf::from(&args[1]);
    let out_dir = PathBuf::from(&args[2]);
    let cfg = match args.get(3) {
        Some(path) => load_config(Path::new(path))?,
        None => AlignConfig::default(),
    };

    info!("Reading reference image {}", reference_path.display());
    let reference = image::open(&reference_path)
        .with_context(|| format!("Failed to read {}", reference_path.display()))?;
    info!("Reading image to align {}", moving_path.display());
    let moving = image::open(&moving_path).with_context(|| format!("Failed to read {}", moving_path.display()))?;
    let reference = render::from_dynamic(&reference)?;
    let moving = render::from_dynamic(&moving)?;

    fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let aligner = Aligner::new(cfg)?;
    let t0 = Instant::now();
    let alignment = aligner.align(&moving, &reference)?;
    info!("Alignment took {:.2?}", t0.elapsed());
    info!("Estimated homography: {:?}", alignment.homography.to_rows());

    let composite = render::side_by_side(&[&reference, &alignment.registered, &moving], 0);
    let aligned_path = out_dir.join("aligned.png");
    composite
        .save(&aligned_path)
        .with_context(|| format!("Failed to write {}", aligned_path.display()))?;

    let matches = render::draw_matches(
        &moving,
        &alignment.source_keypoints,
        &reference,
        &alignment.target_keypoints,
        &alignment.matches,
        Some(alignment.inlier_mask.as_slice()),
    );
    let matches_path = out_dir.join("matches.png");
    matches
        .save(&matches_path)
        .with_context(|| format!("Failed to write {}", matches_path.display()))?;

    let report = HomographyReport {
        homography: alignment.homography.to_rows(),
        retained_matches: alignment.matches.len(),
        inliers: alignment.inlier_count(),
        ransac_iterations: alignment.ransac_iterations,
    };
    let report_path = out_dir.join("homography.json");
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    info!("Results written to {}", out_dir.display());
    Ok(())
}
