use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::distributions::{Distribution, Uniform};
use rflow::matrix::MatrixParams;
use rflow::rainflow::rainflow;
use rflow::{compute_matrix, cycle_gen};

fn random_history(len: usize) -> Vec<f64> {
    let step = Uniform::new(0.0, 50.0);
    let mut rng = rand::thread_rng();
    step.sample_iter(&mut rng).take(len).collect()
}

fn bench_rainflow(c: &mut Criterion) {
    let choices = random_history(100000);
    c.bench_function("Rainflow counting algorithm on large dataset", |b| {
        b.iter(|| {
            let (_means, _ranges) = rainflow(black_box(&choices)).unwrap();
        });
    });
}

fn bench_cycle_gen(c: &mut Criterion) {
    let choices = random_history(100000);
    c.bench_function("cycle generator over 100k samples", |b| {
        b.iter(|| {
            let gen = cycle_gen(black_box(&choices)).unwrap();
            gen.map(|c| c.unwrap()).count()
        });
    });
}

fn bench_compute_matrix(c: &mut Criterion) {
    let choices = random_history(100000);
    let params = MatrixParams {
        amp_bin_count: 64,
        mean_bin_count: 32,
        mean_min: 0.0,
        amp_min: 0.0,
        mean_bin_size: 50.0 / 32.0,
        amp_bin_size: 25.0 / 64.0,
    };
    c.bench_function("rainflow matrix over 100k samples", |b| {
        b.iter(|| compute_matrix(black_box(&choices), &params).unwrap());
    });
}

criterion_group!(benches, bench_rainflow, bench_cycle_gen, bench_compute_matrix);
criterion_main!(benches);
