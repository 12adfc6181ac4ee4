//! Run configuration, loadable from YAML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use petal_helpers::Metric;

use crate::dataset::LabeledDataset;
use crate::error::{Error, Result};
use crate::extract::{CsvExtractor, NdjsonExtractor, Schema};

pub const IRIS_FEATURES: [&str; 4] = ["sepal_length", "sepal_width", "petal_length", "petal_width"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Ndjson,
}

/// Where the dataset lives and how its columns are laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: PathBuf,
    /// Inferred from the file extension when absent.
    pub format: Option<DataFormat>,
    pub delimiter: char,
    pub quote: char,
    pub features: Option<Vec<String>>,
    pub label: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dataset.csv"),
            format: None,
            delimiter: ',',
            quote: '"',
            features: Some(IRIS_FEATURES.iter().map(|s| s.to_string()).collect()),
            label: "class".into(),
        }
    }
}

impl DataConfig {
    pub fn format(&self) -> DataFormat {
        self.format.unwrap_or_else(|| {
            match self.path.extension().and_then(|e| e.to_str()) {
                Some("ndjson" | "jsonl") => DataFormat::Ndjson,
                _ => DataFormat::Csv,
            }
        })
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.features.clone(), self.label.clone())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, c) in [("delimiter", self.delimiter), ("quote", self.quote)] {
            if !c.is_ascii() {
                return Err(Error::Value(format!("{} must be a single ASCII character", name)));
            }
        }
        if self.label.is_empty() {
            return Err(Error::Value("label column name must not be empty".into()));
        }
        Ok(())
    }

    pub fn load(&self) -> Result<LabeledDataset> {
        self.validate()?;
        let schema = self.schema();
        match self.format() {
            DataFormat::Csv => {
                let extractor = CsvExtractor::new(&self.path)
                    .delimiter(self.delimiter as u8)
                    .quote(self.quote as u8);
                LabeledDataset::from_extractor(&extractor, &schema)
            }
            DataFormat::Ndjson => {
                LabeledDataset::from_extractor(&NdjsonExtractor::new(&self.path), &schema)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    pub k: usize,
    pub metric: Metric,
    pub weighted: bool,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            k: 5,
            metric: Metric::Euclidean,
            weighted: false,
        }
    }
}

/// How the testing rows are held out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum Holdout {
    /// Shuffle, then remove the first `size` rows.
    Take { size: usize },
    /// Shuffle, then keep `ratio` of the rows for training.
    Split {
        ratio: f64,
        #[serde(default)]
        stratified: bool,
    },
}

impl Default for Holdout {
    fn default() -> Self {
        Holdout::Take { size: 10 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data: DataConfig,
    pub knn: KnnConfig,
    pub holdout: Holdout,
    pub seed: Option<u64>,
    /// Evaluation report as JSON.
    pub report: Option<PathBuf>,
    /// Testing rows with their predicted labels.
    pub predictions: Option<PathBuf>,
}

impl TrainConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        from_yaml_file(path.as_ref())
    }

    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        if self.knn.k == 0 {
            return Err(Error::Value("k must be at least 1".into()));
        }
        if let Metric::Minkowski(p) = self.knn.metric {
            if p.is_nan() || p < 1.0 {
                return Err(Error::Value(format!("Minkowski order must be at least 1, got {}", p)));
            }
        }
        match self.holdout {
            Holdout::Split { ratio, .. } if !(ratio > 0.0 && ratio < 1.0) => Err(Error::Value(
                format!("split ratio must be strictly between 0 and 1, got {}", ratio),
            )),
            Holdout::Take { size: 0 } => Err(Error::Value("holdout size must be at least 1".into())),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreConfig {
    pub data: DataConfig,
    pub components: usize,
    pub stats: PathBuf,
    /// Directory receiving `pca.csv`, `lda.csv` and `svd.csv`.
    pub out_dir: PathBuf,
    /// Per-class statistics, written only when set.
    pub by_label: Option<PathBuf>,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                path: PathBuf::from("dataset.ndjson"),
                features: None,
                ..DataConfig::default()
            },
            components: 2,
            stats: PathBuf::from("stats.json"),
            out_dir: PathBuf::from("."),
            by_label: None,
        }
    }
}

impl ExploreConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        from_yaml_file(path.as_ref())
    }

    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        if self.components == 0 {
            return Err(Error::Value("components must be at least 1".into()));
        }
        Ok(())
    }
}

fn from_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    let config = serde_yaml::from_str(&text)?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let train = TrainConfig::default();
        assert_eq!(train.knn.k, 5);
        assert_eq!(train.holdout, Holdout::Take { size: 10 });
        assert_eq!(train.data.format(), DataFormat::Csv);
        assert_eq!(train.data.features.as_ref().map(Vec::len), Some(4));

        let explore = ExploreConfig::default();
        assert_eq!(explore.data.format(), DataFormat::Ndjson);
        assert_eq!(explore.components, 2);
        assert!(explore.validate().is_ok());
    }

    #[test]
    fn test_yaml_overrides_and_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "data:\n  path: iris.tsv\n  delimiter: \"\\t\"\nknn:\n  k: 3\n  metric:\n    minkowski: 3.0\nholdout:\n  strategy: split\n  ratio: 0.8\n  stratified: true\nseed: 7\n"
        )
        .unwrap();
        let config = TrainConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.knn.k, 3);
        assert_eq!(config.knn.metric, Metric::Minkowski(3.0));
        assert_eq!(config.data.delimiter, '\t');
        assert_eq!(config.data.label, "class");
        assert_eq!(
            config.holdout,
            Holdout::Split {
                ratio: 0.8,
                stratified: true
            }
        );
        assert_eq!(config.seed, Some(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metric_serializes_in_config_friendly_forms() {
        let metrics = [
            Metric::Euclidean,
            Metric::Manhattan,
            Metric::Chebyshev,
            Metric::Minkowski(3.0),
        ];
        for metric in metrics {
            let json = serde_json::to_string(&metric).unwrap();
            assert_eq!(serde_json::from_str::<Metric>(&json).unwrap(), metric);
            let yaml = serde_yaml::to_string(&metric).unwrap();
            assert_eq!(serde_yaml::from_str::<Metric>(&yaml).unwrap(), metric);
        }
        assert_eq!(serde_json::to_string(&Metric::Manhattan).unwrap(), "\"manhattan\"");
        assert_eq!(
            serde_json::to_string(&Metric::Minkowski(1.5)).unwrap(),
            "{\"minkowski\":1.5}"
        );

        let knn: KnnConfig = serde_yaml::from_str("metric: chebyshev\n").unwrap();
        assert_eq!(knn.metric, Metric::Chebyshev);
        let knn: KnnConfig = serde_yaml::from_str("metric:\n  minkowski: 4\n").unwrap();
        assert_eq!(knn.metric, Metric::Minkowski(4.0));
    }

    #[test]
    fn test_unknown_or_incomplete_metric_is_rejected() {
        assert!(serde_yaml::from_str::<Metric>("cosine").is_err());
        assert!(serde_yaml::from_str::<Metric>("minkowski").is_err());
        assert!(serde_yaml::from_str::<Metric>("manhattan: 2.0").is_err());
        assert!(serde_json::from_str::<Metric>("{\"minkowski\": 2, \"p\": 3}").is_err());
    }

    #[test]
    fn test_invalid_yaml_is_value_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "knn:\n  k: many\n").unwrap();
        assert!(matches!(
            TrainConfig::from_yaml_file(file.path()),
            Err(Error::Value(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TrainConfig::default();
        config.knn.k = 0;
        assert!(config.validate().is_err());

        let mut config = TrainConfig::default();
        config.knn.metric = Metric::Minkowski(0.5);
        assert!(config.validate().is_err());

        let mut config = TrainConfig::default();
        config.holdout = Holdout::Split {
            ratio: 1.0,
            stratified: false,
        };
        assert!(config.validate().is_err());

        let mut config = ExploreConfig::default();
        config.components = 0;
        assert!(config.validate().is_err());
    }
}
