use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use vasreg_3d::{pointcloud::PointCloud, sampling::PoissonDiskSampler, voxel_grid::VoxelGrid};

fn random_cloud(num_points: usize) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(0);
    PointCloud::from_points(
        (0..num_points)
            .map(|_| std::array::from_fn(|_| rng.random_range(0.0..50.0)))
            .collect(),
    )
}

fn bench_downsample(c: &mut Criterion) {
    let mut group = c.benchmark_group("downsample");

    for num_points in [1000, 10000, 100000].iter() {
        group.throughput(criterion::Throughput::Elements(*num_points as u64));
        let parameter_string = format!("{}", num_points);
        let cloud = random_cloud(*num_points);

        group.bench_with_input(
            BenchmarkId::new("poisson_disk", &parameter_string),
            &cloud,
            |b, cloud| {
                let sampler = PoissonDiskSampler::new(1.5);
                b.iter(|| black_box(sampler.downsample(cloud)));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("voxel_grid", &parameter_string),
            &cloud,
            |b, cloud| {
                let grid = VoxelGrid::new(1.5).unwrap();
                b.iter(|| black_box(grid.downsample(cloud)));
            },
        );
    }
}

criterion_group!(benches, bench_downsample);
criterion_main!(benches);
