//! The two end-to-end runs: evaluate a k-NN classifier, or explore a dataset.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use k_nn::KnnClassifier;
use lda::Lda;
use pca::Pca;
use petal_helpers::{Metric, Transformer};
use truncated_svd::TruncatedSvd;

use crate::config::{ExploreConfig, Holdout, TrainConfig};
use crate::dataset::LabeledDataset;
use crate::error::{Error, Result};
use crate::metrics::{self, ConfusionMatrix, MulticlassBreakdown};
use crate::report::{CsvFile, JsonFile};
use crate::stats::DatasetStats;

/// Everything computed by [`train`].
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub training_size: usize,
    pub testing_size: usize,
    pub predictions: Vec<String>,
    pub labels: Vec<String>,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix<String>,
    pub breakdown: MulticlassBreakdown,
}

#[derive(Serialize)]
struct EvaluationReport<'a> {
    training_size: usize,
    testing_size: usize,
    k: usize,
    metric: Metric,
    weighted: bool,
    accuracy: f64,
    confusion_matrix: &'a ConfusionMatrix<String>,
    breakdown: &'a MulticlassBreakdown,
}

/// Loads the configured dataset and evaluates a k-NN classifier on it.
pub fn train(config: &TrainConfig) -> Result<TrainOutcome> {
    config.validate()?;
    let dataset = config.data.load()?;
    evaluate(dataset, config)
}

/// Holds out testing rows from `dataset`, trains on the rest and scores the
/// predictions. Writes the report and prediction exports when configured.
pub fn evaluate(mut dataset: LabeledDataset, config: &TrainConfig) -> Result<TrainOutcome> {
    config.validate()?;
    dataset.convert_numeric_strings();

    dataset.randomize(config.seed);
    let (training, testing) = match config.holdout {
        Holdout::Take { size } => {
            let testing = dataset.take(size)?;
            (dataset, testing)
        }
        Holdout::Split { ratio, stratified: true } => dataset.stratified_split(ratio)?,
        Holdout::Split { ratio, stratified: false } => dataset.split(ratio)?,
    };
    if training.is_empty() || testing.is_empty() {
        return Err(Error::Value(format!(
            "hold-out left {} training and {} testing samples",
            training.len(),
            testing.len()
        )));
    }
    debug!(
        training = training.len(),
        testing = testing.len(),
        "dataset split"
    );

    info!(k = config.knn.k, metric = %config.knn.metric, "Training k-NN classifier");
    let mut estimator =
        KnnClassifier::new(config.knn.k, config.knn.metric)?.weighted(config.knn.weighted);
    estimator.train(training.to_data_points()?)?;

    info!("Making predictions");
    let predictions = estimator.predict_batch(testing.to_matrix()?.view())?;
    let labels = testing.labels().to_vec();

    let accuracy = metrics::accuracy(&predictions, &labels)?;
    let confusion = ConfusionMatrix::new(&predictions, &labels)?;
    let breakdown = MulticlassBreakdown::from_confusion(&confusion);

    if let Some(path) = &config.report {
        JsonFile::new(path).write(&EvaluationReport {
            training_size: training.len(),
            testing_size: testing.len(),
            k: config.knn.k,
            metric: config.knn.metric,
            weighted: config.knn.weighted,
            accuracy,
            confusion_matrix: &confusion,
            breakdown: &breakdown,
        })?;
    }
    if let Some(path) = &config.predictions {
        CsvFile::new(path).export_with_column(&testing, "prediction", &predictions)?;
    }

    Ok(TrainOutcome {
        training_size: training.len(),
        testing_size: testing.len(),
        predictions,
        labels,
        accuracy,
        confusion,
        breakdown,
    })
}

/// Everything computed by [`explore`].
#[derive(Debug, Clone)]
pub struct ExploreOutcome {
    pub stats: DatasetStats,
    /// Embedding exports, in the order they were written.
    pub embeddings: Vec<PathBuf>,
}

/// Describes the configured dataset and writes its PCA, LDA and truncated
/// SVD embeddings.
pub fn explore(config: &ExploreConfig) -> Result<ExploreOutcome> {
    config.validate()?;
    let mut dataset = config.data.load()?;
    dataset.convert_numeric_strings();

    let stats = dataset.describe()?;
    JsonFile::new(&config.stats).write(&stats)?;
    if let Some(path) = &config.by_label {
        JsonFile::new(path).write(&dataset.describe_by_label()?)?;
    }

    let n = config.components;
    let embeddings = vec![
        embed(&dataset, Pca::new(n), &config.out_dir)?,
        embed(&dataset, Lda::new(n), &config.out_dir)?,
        embed(&dataset, TruncatedSvd::new(n), &config.out_dir)?,
    ];

    Ok(ExploreOutcome { stats, embeddings })
}

fn embed<T: Transformer<f64>>(
    dataset: &LabeledDataset,
    mut transformer: T,
    out_dir: &Path,
) -> Result<PathBuf> {
    info!(transformer = transformer.name(), "Embedding dataset");
    let mut embedded = dataset.clone();
    embedded.apply(&mut transformer)?;
    let path = out_dir.join(format!("{}.csv", transformer.name()));
    CsvFile::new(&path).export(&embedded, true)?;
    Ok(path)
}
