//! Supervised-learning evaluation over small tabular datasets.
//!
//! Records are read from delimited text or NDJSON into a [`LabeledDataset`],
//! split into training and testing sets, classified with
//! [`KnnClassifier`] and scored with the functions in [`metrics`]. The
//! [`pipeline`] module wires these together the way the `petal` binary runs
//! them.

pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use dataset::{ColumnType, LabeledDataset, Value};
pub use error::{Error, Result};
pub use extract::{CsvExtractor, Extractor, NdjsonExtractor, Schema};
pub use k_nn::{KnnClassifier, KnnError};
pub use petal_helpers::{
    DataPoint, Distance, Float, L1Dist, L2Dist, LInfDist, LpDist, Metric, TransformError,
    Transformer,
};
