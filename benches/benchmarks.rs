//! Performance benchmarks for skilldex
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use skilldex::index::build::{Baseline, BuildOptions, build_snapshot};
use skilldex::{AppConfig, SkillIndex};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ACTION_TYPES: &[&str] = &[
    "DamageAction",
    "AnimationAction",
    "SoundAction",
    "MoveAction",
    "BuffAction",
];

/// Create a corpus of generated skill documents for benchmarking
fn create_benchmark_fixtures(files: usize) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root_path = temp_dir.path().to_path_buf();

    for i in 0..files {
        let tracks: Vec<serde_json::Value> = (0..4)
            .map(|t| {
                let actions: Vec<serde_json::Value> = (0..8)
                    .map(|a| {
                        serde_json::json!({
                            "frame": a * 5,
                            "duration": 3 + a % 4,
                            "actionType": ACTION_TYPES[(i + t + a) % ACTION_TYPES.len()],
                            "parameters": {
                                "baseDamage": (i * 7 + a * 13) % 300,
                                "animationClipName": format!("Clip{}_{}", i, a),
                                "radius": (a as f64) * 0.5,
                                "tags": ["fire", "aoe"],
                            }
                        })
                    })
                    .collect();
                serde_json::json!({ "trackName": format!("Track{}", t), "actions": actions })
            })
            .collect();
        let doc = serde_json::json!({ "skillName": format!("Skill{}", i), "tracks": tracks });
        fs::write(root_path.join(format!("skill_{}.json", i)), doc.to_string())
            .expect("Failed to write file");
    }

    (temp_dir, root_path)
}

fn bench_query_parsing(c: &mut Criterion) {
    let queries = vec![
        "DamageAction",
        "where frame > 10",
        "DamageAction where baseDamage > 100",
        "animationClipName contains 'Cast'",
        "DamageAction where baseDamage >= 50 and radius < 2.5 and track_name == 'Main'",
    ];

    let mut group = c.benchmark_group("query_parsing");
    for query in queries {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, &q| {
            b.iter(|| skilldex::parse_query(black_box(q)))
        });
    }
    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let (_temp_dir, root_path) = create_benchmark_fixtures(200);
    let (snapshot, _) = build_snapshot(&root_path, &Baseline::default(), &BuildOptions::default())
        .expect("Failed to build index");

    let mut group = c.benchmark_group("evaluation");
    for query in [
        "DamageAction",
        "DamageAction where baseDamage > 100",
        "animationClipName contains 'clip1'",
        "tags contains 'AOE' and frame >= 20",
    ] {
        let ast = skilldex::parse_query(query).expect("valid query");
        group.bench_with_input(BenchmarkId::from_parameter(query), &ast, |b, ast| {
            b.iter(|| skilldex::query::evaluate(black_box(ast), &snapshot, 50))
        });
    }
    group.finish();
}

fn bench_cached_query(c: &mut Criterion) {
    let (_temp_dir, root_path) = create_benchmark_fixtures(200);
    let config = AppConfig {
        persist_snapshot: false,
        ..AppConfig::default()
    };
    let index = SkillIndex::new(&root_path, config);
    index.build_index(false).expect("Failed to build index");

    c.bench_function("cached_query", |b| {
        b.iter(|| index.query(black_box("DamageAction where baseDamage > 100"), 50))
    });
}

fn bench_build(c: &mut Criterion) {
    let (_temp_dir, root_path) = create_benchmark_fixtures(200);

    let mut group = c.benchmark_group("build");
    group.sample_size(20);

    group.bench_function("full", |b| {
        b.iter(|| build_snapshot(&root_path, &Baseline::default(), &BuildOptions::default()))
    });

    let (previous, _) = build_snapshot(&root_path, &Baseline::default(), &BuildOptions::default())
        .expect("Failed to build index");
    let baseline = Baseline::from_snapshot(&previous);
    group.bench_function("incremental_unchanged", |b| {
        b.iter(|| build_snapshot(&root_path, black_box(&baseline), &BuildOptions::default()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_query_parsing,
    bench_evaluation,
    bench_cached_query,
    bench_build,
);

criterion_main!(benches);
