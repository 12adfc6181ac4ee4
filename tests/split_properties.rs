use proptest::prelude::*;

use petal::{LabeledDataset, Value};

/// Rows carry their original index so partitions can be checked exactly.
fn indexed(labels: &[u8]) -> LabeledDataset {
    LabeledDataset::new(
        vec!["index".into()],
        (0..labels.len())
            .map(|i| vec![Value::Continuous(i as f64)])
            .collect(),
        labels.iter().map(|l| format!("class-{}", l)).collect(),
    )
    .unwrap()
}

fn indices(dataset: &LabeledDataset) -> Vec<usize> {
    dataset
        .rows()
        .iter()
        .filter_map(|row| row[0].as_f64())
        .map(|v| v as usize)
        .collect()
}

fn count(dataset: &LabeledDataset, class: &str) -> usize {
    dataset.labels().iter().filter(|l| *l == class).count()
}

proptest! {
    #[test]
    fn split_partitions_the_dataset(
        labels in prop::collection::vec(0u8..4, 1..120),
        ratio in 0.01f64..0.99,
    ) {
        let data = indexed(&labels);
        let (left, right) = data.split(ratio).unwrap();

        prop_assert_eq!(left.len(), (ratio * labels.len() as f64).floor() as usize);
        let mut all = indices(&left);
        all.extend(indices(&right));
        prop_assert_eq!(all, (0..labels.len()).collect::<Vec<_>>());
    }

    #[test]
    fn stratified_split_keeps_class_proportions(
        labels in prop::collection::vec(0u8..3, 6..150),
        ratio in 0.05f64..0.95,
    ) {
        let data = indexed(&labels);
        let singleton = data.classes().iter().any(|c| count(&data, c) < 2);
        let result = data.stratified_split(ratio);
        if singleton {
            prop_assert!(result.is_err());
            return Ok(());
        }
        let (left, right) = result.unwrap();

        let mut all = indices(&left);
        all.extend(indices(&right));
        all.sort_unstable();
        prop_assert_eq!(all, (0..labels.len()).collect::<Vec<_>>());

        for class in data.classes() {
            let total = count(&data, class) as f64;
            let exact = ratio * total;
            let on_left = count(&left, class) as f64;
            prop_assert!((on_left - exact).abs() < 1.0);
            prop_assert!(((count(&right, class) as f64) - (total - exact)).abs() < 1.0);
        }
    }

    #[test]
    fn randomize_is_a_permutation(
        labels in prop::collection::vec(0u8..5, 0..80),
        seed in any::<u64>(),
    ) {
        let mut data = indexed(&labels);
        data.randomize(Some(seed));
        let mut seen = indices(&data);
        for (i, label) in seen.iter().zip(data.labels()) {
            prop_assert_eq!(label, &format!("class-{}", labels[*i]));
        }
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..labels.len()).collect::<Vec<_>>());
    }
}
