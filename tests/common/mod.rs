#![allow(dead_code)]

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use petal::{LabeledDataset, Value};

pub const CLASSES: [&str; 3] = ["Iris-setosa", "Iris-versicolor", "Iris-virginica"];

const CENTERS: [[f64; 4]; 3] = [
    [5.0, 3.4, 1.5, 0.25],
    [5.9, 2.8, 4.3, 1.3],
    [6.6, 3.0, 5.6, 2.0],
];

/// 150 iris-like rows, 50 per class, with class blocks in order.
pub fn iris_rows(seed: u64) -> Vec<([f64; 4], &'static str)> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(150);
    for (center, class) in CENTERS.iter().zip(CLASSES) {
        for _ in 0..50 {
            let mut features = [0.0; 4];
            for (f, c) in features.iter_mut().zip(center) {
                let noisy = *c + rng.random_range(-0.2..0.2_f64);
                *f = (noisy * 10.0).round() / 10.0;
            }
            rows.push((features, class));
        }
    }
    rows
}

pub fn iris_dataset(seed: u64) -> LabeledDataset {
    let (rows, labels): (Vec<Vec<Value>>, Vec<String>) = iris_rows(seed)
        .into_iter()
        .map(|(features, class)| {
            (
                features.iter().map(|&v| Value::Continuous(v)).collect(),
                class.to_string(),
            )
        })
        .unzip();
    LabeledDataset::new(
        petal::config::IRIS_FEATURES.iter().map(|s| s.to_string()).collect(),
        rows,
        labels,
    )
    .unwrap()
}

pub fn iris_csv(seed: u64) -> String {
    let mut text = String::from("sepal_length,sepal_width,petal_length,petal_width,class\n");
    for (f, class) in iris_rows(seed) {
        text.push_str(&format!("{},{},{},{},{}\n", f[0], f[1], f[2], f[3], class));
    }
    text
}

pub fn iris_ndjson(seed: u64) -> String {
    let mut text = String::new();
    for (f, class) in iris_rows(seed) {
        let line = serde_json::json!({
            "sepal_length": f[0],
            "sepal_width": f[1],
            "petal_length": f[2],
            "petal_width": f[3],
            "class": class,
        });
        text.push_str(&line.to_string());
        text.push('\n');
    }
    text
}
