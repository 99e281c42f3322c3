// crates/wlm-core/benches/selector_bench.rs
//
// Benchmarks the candidate-selection hot path across fleet sizes, since it
// runs on the control-loop thread every tick the fleet cap is exceeded.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wlm_core::selector::select;
use wlm_core::status::Status;
use wlm_core::{WorkerId, WorkerProcessMetrics};

fn metric(id: WorkerId, kib: u64) -> WorkerProcessMetrics {
    WorkerProcessMetrics {
        pid: id as u32,
        worker_key_hash: format!("hash-{id}"),
        mnemonic: "Javac".to_string(),
        worker_ids: vec![id],
        resident_memory_kib: kib,
        status: Status::new(),
    }
}

fn fleet(size: usize) -> Vec<WorkerProcessMetrics> {
    (0..size as u64)
        .map(|id| metric(id, 50_000 + (id % 37) * 10_000))
        .collect()
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");

    for &size in &[16usize, 128, 1024] {
        let metrics = fleet(size);
        let used_mb = metrics.iter().map(WorkerProcessMetrics::memory_mb).sum::<u64>();
        let cap_mb = used_mb / 2;

        group.bench_function(format!("fleet_{size}"), |b| {
            b.iter(|| black_box(select(black_box(&metrics), black_box(cap_mb), black_box(used_mb))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_select);
criterion_main!(benches);
