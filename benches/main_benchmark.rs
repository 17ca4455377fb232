use mpsim::{
    FloatValue, LinearSystem, Precisions, SolverConfig, FP16, FP32, FP64,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn test_add() {
    let a = FloatValue::from_f64(FP64, 1.0 / 3.0);
    let b = FloatValue::from_f64(FP64, -2.0 / 7.0);
    for _ in 0..100 {
        black_box(a.add(&b).unwrap());
    }
}

fn test_mul() {
    let a = FloatValue::from_f64(FP64, 1.0 / 3.0);
    let b = FloatValue::from_f64(FP64, 17.25);
    for _ in 0..100 {
        black_box(a.mul(&b).unwrap());
    }
}

fn test_div() {
    let a = FloatValue::from_f64(FP64, 1.0 / 3.0);
    let b = FloatValue::from_f64(FP64, 17.25);
    for _ in 0..100 {
        black_box(a.div(&b).unwrap());
    }
}

fn test_cast() {
    for i in 0..100 {
        let a = FloatValue::from_f64(FP64, i as f64 / 7.0);
        black_box(a.cast_to(FP16).cast_to(FP32));
    }
}

fn test_refine() {
    let precisions = Precisions::new(FP32, FP64, FP64);
    let config = SolverConfig::new(8, precisions).unwrap();
    let mut system = LinearSystem::new(config);
    let mut rng = StdRng::seed_from_u64(7);
    system.set_random_matrix(&mut rng).unwrap();
    let b = system.random_rhs(&mut rng).unwrap();
    black_box(system.refine(&b).unwrap());
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("test_add", |b| b.iter(test_add));
    c.bench_function("test_mul", |b| b.iter(test_mul));
    c.bench_function("test_div", |b| b.iter(test_div));
    c.bench_function("test_cast", |b| b.iter(test_cast));
    c.bench_function("test_refine", |b| b.iter(test_refine));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
