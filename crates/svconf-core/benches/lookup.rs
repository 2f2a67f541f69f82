//! Benchmarks for configuration lookups.
//!
//! Run with: cargo bench --package svconf-core
//!
//! These benchmarks measure:
//! - Directory key computation
//! - Synchronous cache hits and misses
//! - Preloading a synthetic project tree

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::Path;
use tempfile::TempDir;
use tokio::runtime::Runtime;

use svconf_core::{directory_key, CacheOptions, ConfigCache};

fn build_tree(root: &Path, dirs: usize, files_per_dir: usize) {
    for d in 0..dirs {
        let dir = root.join(format!("src/feature_{}", d));
        std::fs::create_dir_all(&dir).unwrap();
        for f in 0..files_per_dir {
            std::fs::write(dir.join(format!("Component{}.svelte", f)), "<h1>hi</h1>").unwrap();
        }
    }
}

fn bench_directory_key(c: &mut Criterion) {
    let paths = [
        ("shallow", "/app/App.svelte"),
        ("deep", "/app/src/routes/(group)/blog/[slug]/+page.svelte"),
        ("dotted", "/app/src/./lib/../routes/+layout.svelte"),
    ];

    let mut group = c.benchmark_group("directory_key");
    for (name, path) in paths {
        group.bench_with_input(BenchmarkId::new("path", name), Path::new(path), |b, p| {
            b.iter(|| directory_key(black_box(p)))
        });
    }
    group.finish();
}

fn bench_sync_lookup(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp = TempDir::new().unwrap();
    build_tree(temp.path(), 8, 4);

    let cache = ConfigCache::new(CacheOptions::default()).unwrap();
    rt.block_on(cache.preload_configs(temp.path())).unwrap();

    let hit = temp.path().join("src/feature_3/Component1.svelte");
    let miss = temp.path().join("elsewhere/Component1.svelte");

    c.bench_function("get_config_sync/hit", |b| {
        b.iter(|| cache.get_config_sync(black_box(&hit)))
    });
    c.bench_function("get_config_sync/miss", |b| {
        b.iter(|| cache.get_config_sync(black_box(&miss)))
    });
}

fn bench_preload(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp = TempDir::new().unwrap();
    build_tree(temp.path(), 32, 8);

    let mut group = c.benchmark_group("preload_configs");
    group.sample_size(20);
    group.bench_function("cold_32_dirs", |b| {
        b.iter(|| {
            let cache = ConfigCache::new(CacheOptions::default()).unwrap();
            rt.block_on(cache.preload_configs(black_box(temp.path())))
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_directory_key, bench_sync_lookup, bench_preload);
criterion_main!(benches);
