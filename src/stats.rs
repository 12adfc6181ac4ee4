//! Descriptive statistics for a [`LabeledDataset`].

use std::fmt;

use ndarray::Array1;
use ndarray_stats::{QuantileExt, SummaryStatisticsExt};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::dataset::{LabeledDataset, Value};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuousStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    pub std_dev: f64,
    pub skewness: f64,
    /// Excess kurtosis.
    pub kurtosis: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q1: f64,
    pub median: f64,
    #[serde(rename = "75%")]
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalStats {
    pub name: String,
    pub count: usize,
    pub num_categories: usize,
    pub most_frequent: String,
    pub least_frequent: String,
    pub frequencies: Frequencies,
}

/// Category counts in order of first appearance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frequencies(pub Vec<(String, usize)>);

impl Frequencies {
    pub fn get(&self, category: &str) -> Option<usize> {
        self.0.iter().find(|(c, _)| c == category).map(|(_, n)| *n)
    }
}

impl Serialize for Frequencies {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (category, count) in &self.0 {
            map.serialize_entry(category, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnStats {
    Continuous(ContinuousStats),
    Categorical(CategoricalStats),
}

impl ColumnStats {
    pub fn name(&self) -> &str {
        match self {
            ColumnStats::Continuous(s) => &s.name,
            ColumnStats::Categorical(s) => &s.name,
        }
    }

    pub fn as_continuous(&self) -> Option<&ContinuousStats> {
        match self {
            ColumnStats::Continuous(s) => Some(s),
            ColumnStats::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&CategoricalStats> {
        match self {
            ColumnStats::Categorical(s) => Some(s),
            ColumnStats::Continuous(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub num_samples: usize,
    pub num_features: usize,
    pub columns: Vec<ColumnStats>,
}

impl DatasetStats {
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Per-class statistics, classes in order of first appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsByLabel(pub Vec<(String, DatasetStats)>);

impl Serialize for StatsByLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, stats) in &self.0 {
            map.serialize_entry(label, stats)?;
        }
        map.end()
    }
}

impl LabeledDataset {
    /// Summarises every feature column.
    pub fn describe(&self) -> Result<DatasetStats> {
        if self.is_empty() {
            return Err(Error::Value("cannot describe an empty dataset".into()));
        }
        let columns = self
            .feature_names()
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let continuous: Option<Vec<f64>> = self.column(j).map(Value::as_f64).collect();
                match continuous {
                    Some(values) => continuous_stats(name, Array1::from(values)),
                    None => Ok(categorical_stats(name, self.column(j))),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DatasetStats {
            num_samples: self.len(),
            num_features: self.num_features(),
            columns,
        })
    }

    /// Runs [`describe`](Self::describe) on each class subset.
    pub fn describe_by_label(&self) -> Result<StatsByLabel> {
        self.class_groups()
            .into_iter()
            .map(|(label, rows)| Ok((label.to_owned(), self.subset(&rows).describe()?)))
            .collect::<Result<Vec<_>>>()
            .map(StatsByLabel)
    }
}

fn continuous_stats(name: &str, column: Array1<f64>) -> Result<ColumnStats> {
    let empty = || Error::Value(format!("column '{}' is empty", name));
    let mean = column.mean().ok_or_else(empty)?;
    let variance = column.var(0.0);
    // Shape moments are 0/0 on a constant column; report them as zero.
    let (skewness, kurtosis) = if variance > 0.0 {
        (
            column.skewness().map_err(|_| empty())?,
            column.kurtosis().map_err(|_| empty())? - 3.0,
        )
    } else {
        (0.0, 0.0)
    };
    let min = *column
        .min()
        .map_err(|e| Error::Value(format!("column '{}': {}", name, e)))?;
    let max = *column
        .max()
        .map_err(|e| Error::Value(format!("column '{}': {}", name, e)))?;

    let mut sorted = column.to_vec();
    sorted.sort_by(f64::total_cmp);

    Ok(ColumnStats::Continuous(ContinuousStats {
        name: name.to_owned(),
        count: column.len(),
        mean,
        variance,
        std_dev: variance.sqrt(),
        skewness,
        kurtosis,
        min,
        q1: percentile(&sorted, 0.25),
        median: percentile(&sorted, 0.5),
        q3: percentile(&sorted, 0.75),
        max,
    }))
}

/// Linear interpolation between the closest ranks of a sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

fn categorical_stats<'a>(name: &str, values: impl Iterator<Item = &'a Value>) -> ColumnStats {
    let mut frequencies: Vec<(String, usize)> = Vec::new();
    let mut count = 0;
    for value in values {
        count += 1;
        let category = value.to_string();
        match frequencies.iter_mut().find(|(c, _)| *c == category) {
            Some((_, n)) => *n += 1,
            None => frequencies.push((category, 1)),
        }
    }

    // Ties resolve to the category seen first.
    let mut most = &frequencies[0];
    let mut least = &frequencies[0];
    for entry in &frequencies[1..] {
        if entry.1 > most.1 {
            most = entry;
        }
        if entry.1 < least.1 {
            least = entry;
        }
    }

    ColumnStats::Categorical(CategoricalStats {
        name: name.to_owned(),
        count,
        num_categories: frequencies.len(),
        most_frequent: most.0.clone(),
        least_frequent: least.0.clone(),
        frequencies: Frequencies(frequencies.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dataset(rows: Vec<Vec<Value>>, names: &[&str]) -> LabeledDataset {
        let labels = (0..rows.len()).map(|i| if i % 2 == 0 { "a" } else { "b" }.to_string()).collect();
        LabeledDataset::new(names.iter().map(|s| s.to_string()).collect(), rows, labels).unwrap()
    }

    fn grid() -> LabeledDataset {
        let rows = [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]]
            .iter()
            .map(|r| r.iter().map(|&v| Value::Continuous(v)).collect())
            .collect();
        dataset(rows, &["x", "y"])
    }

    #[test]
    fn test_describe_continuous_columns() {
        let stats = grid().describe().unwrap();
        assert_eq!(stats.num_samples, 4);
        let x = stats.column("x").and_then(ColumnStats::as_continuous).unwrap();
        let y = stats.column("y").and_then(ColumnStats::as_continuous).unwrap();
        assert_abs_diff_eq!(x.mean, 4.0);
        assert_abs_diff_eq!(y.mean, 5.0);
        assert_abs_diff_eq!(x.min, 1.0);
        assert_abs_diff_eq!(y.min, 2.0);
        assert_abs_diff_eq!(x.max, 7.0);
        assert_abs_diff_eq!(y.max, 8.0);
        assert_abs_diff_eq!(x.variance, 5.0);
        assert_abs_diff_eq!(x.median, 4.0);
        assert_abs_diff_eq!(x.q1, 2.5);
        assert_abs_diff_eq!(x.q3, 5.5);
        assert_abs_diff_eq!(x.skewness, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_column_has_zero_shape_moments() {
        let rows = vec![vec![Value::Continuous(2.5)], vec![Value::Continuous(2.5)]];
        let stats = dataset(rows, &["flat"]).describe().unwrap();
        let flat = stats.column("flat").and_then(ColumnStats::as_continuous).unwrap();
        assert_abs_diff_eq!(flat.variance, 0.0);
        assert_abs_diff_eq!(flat.skewness, 0.0);
        assert_abs_diff_eq!(flat.kurtosis, 0.0);

        let json: serde_json::Value = serde_json::from_str(&stats.to_string()).unwrap();
        assert_eq!(json["columns"][0]["skewness"], 0.0);
        assert_eq!(json["columns"][0]["kurtosis"], 0.0);
    }

    #[test]
    fn test_describe_categorical_column() {
        let rows = ["red", "blue", "red", "green", "blue", "red"]
            .iter()
            .map(|c| vec![Value::Categorical(c.to_string())])
            .collect();
        let stats = dataset(rows, &["colour"]).describe().unwrap();
        let colour = stats.columns[0].as_categorical().unwrap();
        assert_eq!(colour.count, 6);
        assert_eq!(colour.num_categories, 3);
        assert_eq!(colour.most_frequent, "red");
        assert_eq!(colour.least_frequent, "green");
        assert_eq!(colour.frequencies.get("blue"), Some(2));
    }

    #[test]
    fn test_describe_empty_dataset_fails() {
        let empty = LabeledDataset::new(vec!["x".into()], vec![], vec![]).unwrap();
        assert!(matches!(empty.describe(), Err(Error::Value(_))));
    }

    #[test]
    fn test_describe_by_label() {
        let by_label = grid().describe_by_label().unwrap();
        assert_eq!(by_label.0.len(), 2);
        assert_eq!(by_label.0[0].0, "a");
        let x = by_label.0[0].1.columns[0].as_continuous().unwrap();
        assert_abs_diff_eq!(x.mean, 3.0);
    }

    #[test]
    fn test_stats_serialize_in_column_order() {
        let json = serde_json::to_value(grid().describe().unwrap()).unwrap();
        assert_eq!(json["columns"][0]["type"], "continuous");
        assert_eq!(json["columns"][1]["name"], "y");
        assert_eq!(json["columns"][1]["25%"], 3.5);
    }
}
