use std::collections::HashMap;
use std::fmt;

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;
use tracing::{debug, info};

use petal_helpers::{DataPoint, Transformer};

use crate::error::{Error, Result};
use crate::extract::{Extractor, Schema};

/// A single cell of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Continuous(f64),
    Categorical(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Continuous(v) => Some(*v),
            Value::Categorical(_) => None,
        }
    }

    pub fn kind(&self) -> ColumnType {
        match self {
            Value::Continuous(_) => ColumnType::Continuous,
            Value::Categorical(_) => ColumnType::Categorical,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Continuous(v) => write!(f, "{}", v),
            Value::Categorical(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Continuous,
    Categorical,
}

/// Feature rows with one label per row.
///
/// Every row has one value per feature name, every column holds values of a
/// single [`ColumnType`], and `rows` and `labels` stay index-aligned through
/// every operation. Mutating operations either succeed completely or leave
/// the dataset as it was.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    feature_names: Vec<String>,
    rows: Vec<Vec<Value>>,
    labels: Vec<String>,
}

impl LabeledDataset {
    pub fn new(
        feature_names: Vec<String>,
        rows: Vec<Vec<Value>>,
        labels: Vec<String>,
    ) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(Error::Schema(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != feature_names.len())
        {
            return Err(Error::Schema(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                feature_names.len()
            )));
        }
        if let Some(first) = rows.first() {
            for (j, name) in feature_names.iter().enumerate() {
                let kind = first[j].kind();
                if rows.iter().any(|row| row[j].kind() != kind) {
                    return Err(Error::Schema(format!(
                        "column '{}' mixes continuous and categorical values",
                        name
                    )));
                }
            }
        }
        Ok(Self {
            feature_names,
            rows,
            labels,
        })
    }

    /// Drains an extractor into memory, stopping at the first bad record.
    pub fn from_extractor<E: Extractor>(extractor: &E, schema: &Schema) -> Result<Self> {
        info!("Loading data into memory");
        let records = extractor.extract(schema)?;
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for record in records.rows {
            let (features, label) = record?;
            rows.push(features);
            labels.push(label);
        }
        debug!(
            samples = rows.len(),
            features = records.feature_names.len(),
            "records extracted"
        );
        Self::new(records.feature_names, rows, labels)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Column types, read from the first row. An empty dataset reports
    /// every column as continuous.
    pub fn column_types(&self) -> Vec<ColumnType> {
        match self.rows.first() {
            Some(row) => row.iter().map(Value::kind).collect(),
            None => vec![ColumnType::Continuous; self.num_features()],
        }
    }

    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Distinct labels in order of first appearance.
    pub fn classes(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for label in &self.labels {
            if !seen.contains(&label.as_str()) {
                seen.push(label.as_str());
            }
        }
        seen
    }

    /// Row indices per class, classes in order of first appearance.
    pub(crate) fn class_groups(&self) -> Vec<(&str, Vec<usize>)> {
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
        for (i, label) in self.labels.iter().enumerate() {
            let idx = *position.entry(label.as_str()).or_insert_with(|| {
                groups.push((label.as_str(), Vec::new()));
                groups.len() - 1
            });
            groups[idx].1.push(i);
        }
        groups
    }

    pub(crate) fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
        }
    }

    /// Shuffles rows and labels together.
    ///
    /// The same seed always produces the same order; without one the
    /// generator is seeded from system entropy.
    pub fn randomize(&mut self, seed: Option<u64>) -> &mut Self {
        let seed = seed.unwrap_or_else(rand::random);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(&mut rng);
        debug!(seed, samples = order.len(), "dataset shuffled");

        let mut rows: Vec<Option<Vec<Value>>> = self.rows.drain(..).map(Some).collect();
        let mut labels: Vec<Option<String>> = self.labels.drain(..).map(Some).collect();
        for i in order {
            if let (Some(row), Some(label)) = (rows[i].take(), labels[i].take()) {
                self.rows.push(row);
                self.labels.push(label);
            }
        }
        self
    }

    /// Removes the first `n` rows and returns them as a new dataset.
    pub fn take(&mut self, n: usize) -> Result<Self> {
        if n > self.len() {
            return Err(Error::Value(format!(
                "cannot take {} rows from a dataset of {}",
                n,
                self.len()
            )));
        }
        Ok(Self {
            feature_names: self.feature_names.clone(),
            rows: self.rows.drain(..n).collect(),
            labels: self.labels.drain(..n).collect(),
        })
    }

    /// Splits at `floor(ratio * len)`, keeping row order on both sides.
    pub fn split(&self, ratio: f64) -> Result<(Self, Self)> {
        check_ratio(ratio)?;
        let cut = (ratio * self.len() as f64).floor() as usize;
        let left: Vec<usize> = (0..cut).collect();
        let right: Vec<usize> = (cut..self.len()).collect();
        Ok((self.subset(&left), self.subset(&right)))
    }

    /// Splits every class separately so both sides keep the class
    /// proportions to within one row.
    pub fn stratified_split(&self, ratio: f64) -> Result<(Self, Self)> {
        check_ratio(ratio)?;
        let groups = self.class_groups();
        if let Some((label, rows)) = groups.iter().find(|(_, rows)| rows.len() < 2) {
            return Err(Error::Value(format!(
                "class '{}' has {} sample(s); stratified split needs at least 2 per class",
                label,
                rows.len()
            )));
        }
        let mut left = Vec::new();
        let mut right = Vec::new();
        for (_, rows) in &groups {
            let cut = (ratio * rows.len() as f64).floor() as usize;
            left.extend_from_slice(&rows[..cut]);
            right.extend_from_slice(&rows[cut..]);
        }
        Ok((self.subset(&left), self.subset(&right)))
    }

    /// Turns every categorical column whose values all parse as finite
    /// numbers into a continuous column. Returns how many columns changed.
    pub fn convert_numeric_strings(&mut self) -> usize {
        let mut converted = 0;
        for j in 0..self.num_features() {
            let parsed: Option<Vec<f64>> = self
                .column(j)
                .map(|value| match value {
                    Value::Categorical(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
                    Value::Continuous(_) => None,
                })
                .collect();
            if let Some(values) = parsed.filter(|v| !v.is_empty()) {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[j] = Value::Continuous(v);
                }
                converted += 1;
            }
        }
        debug!(columns = converted, "numeric strings converted");
        converted
    }

    fn ensure_continuous(&self) -> Result<()> {
        let types = self.column_types();
        match self
            .feature_names
            .iter()
            .zip(types)
            .find(|(_, t)| *t == ColumnType::Categorical)
        {
            Some((name, _)) => Err(Error::Value(format!(
                "column '{}' is categorical; convert it to numbers first",
                name
            ))),
            None => Ok(()),
        }
    }

    pub fn to_matrix(&self) -> Result<Array2<f64>> {
        self.ensure_continuous()?;
        let values: Vec<f64> = self
            .rows
            .iter()
            .flatten()
            .filter_map(Value::as_f64)
            .collect();
        Array2::from_shape_vec((self.len(), self.num_features()), values)
            .map_err(|e| Error::Value(e.to_string()))
    }

    pub fn to_data_points(&self) -> Result<Vec<DataPoint<String, f64>>> {
        self.ensure_continuous()?;
        Ok(self
            .rows
            .iter()
            .zip(&self.labels)
            .map(|(row, label)| {
                let features: Array1<f64> = row.iter().filter_map(Value::as_f64).collect();
                DataPoint::new(features, label.clone())
            })
            .collect())
    }

    /// Fits `transformer` if needed, then replaces the features with its
    /// output. Columns are renamed `<name>_<i>` when the width changes.
    pub fn apply<T: Transformer<f64>>(&mut self, transformer: &mut T) -> Result<()> {
        let samples = self.to_matrix()?;
        if !transformer.is_fitted() {
            info!(transformer = transformer.name(), "fitting transformer");
            transformer.fit(samples.view(), &self.labels)?;
        }
        let output = transformer.transform(samples.view())?;
        if output.nrows() != self.len() {
            return Err(Error::Value(format!(
                "{} returned {} rows for {} samples",
                transformer.name(),
                output.nrows(),
                self.len()
            )));
        }

        if output.ncols() != self.num_features() {
            self.feature_names = (0..output.ncols())
                .map(|i| format!("{}_{}", transformer.name(), i))
                .collect();
        }
        self.rows = output
            .rows()
            .into_iter()
            .map(|row| row.iter().copied().map(Value::Continuous).collect())
            .collect();
        debug!(
            transformer = transformer.name(),
            features = self.num_features(),
            "transform applied"
        );
        Ok(())
    }
}

fn check_ratio(ratio: f64) -> Result<()> {
    if ratio > 0.0 && ratio < 1.0 {
        Ok(())
    } else {
        Err(Error::Value(format!(
            "split ratio must be strictly between 0 and 1, got {}",
            ratio
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2 as Matrix, ArrayView2};
    use petal_helpers::TransformError;
    use std::fmt::Debug;
    use std::hash::Hash;

    fn numeric(rows: &[[f64; 2]], labels: &[&str]) -> LabeledDataset {
        LabeledDataset::new(
            vec!["x".into(), "y".into()],
            rows.iter()
                .map(|r| r.iter().map(|&v| Value::Continuous(v)).collect())
                .collect(),
            labels.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    fn ten_rows() -> LabeledDataset {
        let rows: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, -(i as f64)]).collect();
        let labels = ["a", "a", "a", "a", "a", "b", "b", "b", "b", "b"];
        numeric(&rows, &labels)
    }

    #[test]
    fn test_new_rejects_broken_shapes() {
        let err = LabeledDataset::new(vec!["x".into()], vec![vec![]], vec!["a".into()]);
        assert!(matches!(err, Err(Error::Schema(_))));

        let err = LabeledDataset::new(
            vec!["x".into()],
            vec![vec![Value::Continuous(1.0)]],
            vec![],
        );
        assert!(matches!(err, Err(Error::Schema(_))));

        let err = LabeledDataset::new(
            vec!["x".into()],
            vec![vec![Value::Continuous(1.0)], vec![Value::Categorical("1".into())]],
            vec!["a".into(), "b".into()],
        );
        assert!(matches!(err, Err(Error::Schema(_))));
    }

    #[test]
    fn test_randomize_is_seeded_and_keeps_alignment() {
        let mut a = ten_rows();
        let mut b = ten_rows();
        a.randomize(Some(42));
        b.randomize(Some(42));
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        for (row, label) in a.rows().iter().zip(a.labels()) {
            let x = row[0].as_f64().unwrap();
            assert_eq!(label, if x < 5.0 { "a" } else { "b" });
        }
    }

    #[test]
    fn test_take_removes_prefix() {
        let mut data = ten_rows();
        let head = data.take(3).unwrap();
        assert_eq!(head.len(), 3);
        assert_eq!(data.len(), 7);
        assert_eq!(head.rows()[0][0], Value::Continuous(0.0));
        assert_eq!(data.rows()[0][0], Value::Continuous(3.0));

        assert!(matches!(data.take(8), Err(Error::Value(_))));
        assert_eq!(data.len(), 7);
    }

    #[test]
    fn test_split_floor_and_bounds() {
        let data = ten_rows();
        let (left, right) = data.split(0.75).unwrap();
        assert_eq!((left.len(), right.len()), (7, 3));
        assert_eq!(right.rows()[0][0], Value::Continuous(7.0));

        for ratio in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(matches!(data.split(ratio), Err(Error::Value(_))));
        }
    }

    #[test]
    fn test_stratified_split_per_class() {
        let data = ten_rows();
        let (left, right) = data.stratified_split(0.6).unwrap();
        assert_eq!(left.labels(), &["a", "a", "a", "b", "b", "b"]);
        assert_eq!(right.labels(), &["a", "a", "b", "b"]);
    }

    #[test]
    fn test_stratified_split_rejects_singleton_class() {
        let data = numeric(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]], &["a", "a", "b"]);
        assert!(matches!(data.stratified_split(0.5), Err(Error::Value(_))));
    }

    #[test]
    fn test_convert_numeric_strings_is_all_or_nothing_per_column() {
        let mut data = LabeledDataset::new(
            vec!["n".into(), "mixed".into()],
            vec![
                vec![Value::Categorical("5.1".into()), Value::Categorical("1".into())],
                vec![Value::Categorical(" 4 ".into()), Value::Categorical("red".into())],
            ],
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        assert_eq!(data.convert_numeric_strings(), 1);
        assert_eq!(
            data.column_types(),
            vec![ColumnType::Continuous, ColumnType::Categorical]
        );
        assert_eq!(data.rows()[1][0], Value::Continuous(4.0));
        assert!(matches!(data.to_matrix(), Err(Error::Value(_))));
    }

    #[test]
    fn test_classes_in_first_appearance_order() {
        let data = numeric(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]], &["z", "a", "z"]);
        assert_eq!(data.classes(), vec!["z", "a"]);
    }

    struct Doubler {
        fitted: bool,
    }

    impl Transformer<f64> for Doubler {
        fn name(&self) -> &'static str {
            "double"
        }

        fn is_fitted(&self) -> bool {
            self.fitted
        }

        fn fit<L>(&mut self, _: ArrayView2<f64>, _: &[L]) -> std::result::Result<(), TransformError>
        where
            L: Clone + Eq + Hash + Debug,
        {
            self.fitted = true;
            Ok(())
        }

        fn transform(&self, samples: ArrayView2<f64>) -> std::result::Result<Matrix<f64>, TransformError> {
            if !self.fitted {
                return Err(TransformError::NotFitted);
            }
            let mut out = Matrix::zeros((samples.nrows(), 1));
            for (i, row) in samples.rows().into_iter().enumerate() {
                out[[i, 0]] = row.sum() * 2.0;
            }
            Ok(out)
        }
    }

    #[test]
    fn test_apply_fits_and_renames() {
        let mut data = numeric(&[[1.0, 2.0], [3.0, 4.0]], &["a", "b"]);
        let mut doubler = Doubler { fitted: false };
        data.apply(&mut doubler).unwrap();
        assert!(doubler.fitted);
        assert_eq!(data.feature_names(), &["double_0"]);
        assert_eq!(data.rows()[1], vec![Value::Continuous(14.0)]);
        assert_eq!(data.labels(), &["a", "b"]);
    }

    #[test]
    fn test_apply_leaves_categorical_dataset_untouched() {
        let mut data = LabeledDataset::new(
            vec!["c".into()],
            vec![vec![Value::Categorical("red".into())]],
            vec!["a".into()],
        )
        .unwrap();
        let before = data.clone();
        assert!(matches!(
            data.apply(&mut Doubler { fitted: false }),
            Err(Error::Value(_))
        ));
        assert_eq!(data, before);
    }
}
