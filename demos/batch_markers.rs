//! Example of styling many incident markers and building a heatmap.
//!
//! Run with: cargo run --example batch_markers --features parallel

use chrono::{TimeDelta, Utc};
use crime_safety::{
    crime_markers, crime_markers_parallel, generate_heatmap_parallel, query_heatmap_cell,
    DensityConfig, HeatmapConfig, IncidentReport,
};
use std::time::Instant;

fn main() {
    println!("Batch Marker Example\n");

    let now = Utc::now();
    let config = DensityConfig::default();

    // Three hotspots around Metro Manila with scattered incidents
    let hotspots = [(14.6760, 121.0437), (14.5547, 121.0244), (14.5995, 120.9842)];
    let mut incidents = Vec::new();
    for (h, &(lat, lng)) in hotspots.iter().enumerate() {
        for i in 0..2000 {
            let jitter = pseudo_random(h * 10_000 + i);
            incidents.push(IncidentReport::new(
                lat + (jitter - 0.5) * 0.02,
                lng + (pseudo_random(i * 7 + h) - 0.5) * 0.02,
                now - TimeDelta::days((i % 90) as i64),
            ));
        }
    }

    println!("Created {} incidents\n", incidents.len());

    let start = Instant::now();
    let sequential = crime_markers(&incidents, now, &config);
    println!("Sequential markers: {:?}", start.elapsed());

    let start = Instant::now();
    let markers = crime_markers_parallel(&incidents, now, &config);
    println!("Parallel markers:   {:?}\n", start.elapsed());

    assert_eq!(sequential, markers);

    let recent = markers.iter().filter(|m| m.is_recent).count();
    let densest = markers.iter().max_by_key(|m| m.density);
    println!("{} recent markers, {} older", recent, markers.len() - recent);
    if let Some(m) = densest {
        println!(
            "Densest marker at ({:.4}, {:.4}): {} neighbours, {}\n",
            m.latitude, m.longitude, m.density, m.fill_color
        );
    }

    let start = Instant::now();
    let heatmap = generate_heatmap_parallel(&incidents, now, &HeatmapConfig::default());
    println!(
        "Heatmap: {} cells ({}x{}) in {:?}, max intensity {:.2}",
        heatmap.cells.len(),
        heatmap.grid_rows,
        heatmap.grid_cols,
        start.elapsed(),
        heatmap.max_intensity
    );

    for &(lat, lng) in &hotspots {
        match query_heatmap_cell(&heatmap, lat, lng) {
            Some(hit) => println!(
                "   ({lat}, {lng}): {} (intensity {:.2})",
                hit.suggested_label, hit.cell.intensity
            ),
            None => println!("   ({lat}, {lng}): no incidents"),
        }
    }
}

/// Deterministic value in [0, 1)
fn pseudo_random(seed: usize) -> f64 {
    let x = (seed as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    ((x >> 33) % 10_000) as f64 / 10_000.0
}
