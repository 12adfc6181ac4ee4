use criterion::{Criterion, black_box, criterion_group, criterion_main};
use k_nn::KnnClassifier;
use ndarray::{Array1, Array2};
use petal_helpers::{DataPoint, L2Dist};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn random_points(n: usize, dim: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<DataPoint<usize, f64>> {
    (0..n)
        .map(|i| {
            let features = Array1::from_shape_fn(dim, |_| rng.random_range(-10.0..10.0));
            DataPoint::new(features, i % 3)
        })
        .collect()
}

fn bench_predict(c: &mut Criterion) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    let training = random_points(1_000, 4, &mut rng);
    let queries = Array2::from_shape_fn((100, 4), |_| rng.random_range(-10.0..10.0));

    let mut classifier = KnnClassifier::new(5, L2Dist).unwrap();
    classifier.train(training).unwrap();

    c.bench_function("knn predict 100x1000x4", |b| {
        b.iter(|| classifier.predict_batch(black_box(queries.view())).unwrap())
    });
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);
