use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quantization::rvq::rvq::ResidualQuantizerConfig;
use quantization::rvq::rvq_builder::ResidualQuantizerBuilder;
use utils::kmeans::kmeans::IterationPolicy;
use utils::kmeans::seeding::SeedingType;
use utils::test_utils::{generate_random_vector, generate_seeded_dataset};

fn bench_rvq_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("RVQ Encode");
    let dimension = 128;
    let flattened = generate_seeded_dataset(4096, dimension, 1016);
    for num_stages in [1, 2, 4, 8].iter() {
        let mut builder = ResidualQuantizerBuilder::new(ResidualQuantizerConfig {
            dimension,
            num_stages: *num_stages,
            num_centroids: 256,
            iterations_per_stage: 5,
            iteration_policy: IterationPolicy::Fixed,
            seeding: SeedingType::FirstPoints,
            seed: 0,
        });
        flattened
            .chunks_exact(dimension)
            .for_each(|row| builder.add(row.to_vec()));
        let (rq, _) = builder.build().expect("Failed to build ResidualQuantizer");

        let point = generate_random_vector(dimension);
        let codes = rq.encode(&point).expect("Failed to encode");
        group.bench_with_input(
            BenchmarkId::new("encode", num_stages),
            num_stages,
            |bencher, _| bencher.iter(|| rq.encode(black_box(&point))),
        );
        group.bench_with_input(
            BenchmarkId::new("decode", num_stages),
            num_stages,
            |bencher, _| bencher.iter(|| rq.decode(black_box(&codes))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_rvq_encode);
criterion_main!(benches);
