use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use swarm_bmt::hasher::hash;
use swarm_primitives::CHUNK_SIZE;

fn hash_chunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash");
    for len in [64usize, 1024, CHUNK_SIZE] {
        let payload = vec![0xabu8; len];
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &payload, |b, payload| {
            b.iter(|| hash(payload.len() as u64, payload).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, hash_chunk);
criterion_main!(benches);
