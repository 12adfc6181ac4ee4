use ndarray::{Array2, ArrayView2};
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

use crate::Float;

/// Errors raised while fitting or applying a [`Transformer`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// `transform` was called before `fit`.
    #[error("transformer has not been fitted")]
    NotFitted,
    /// The input has no rows or no columns.
    #[error("input must have at least one sample and one feature")]
    EmptyInput,
    /// The requested number of output dimensions cannot be produced.
    #[error("cannot extract {requested} components, at most {max} are available")]
    InvalidComponents { requested: usize, max: usize },
    /// The input width differs from the width seen during fitting.
    #[error("expected {expected} features, found {found}")]
    MismatchedDimensions { expected: usize, found: usize },
    /// The labels do not line up with the samples.
    #[error("{samples} samples but {labels} labels")]
    MismatchedLabels { samples: usize, labels: usize },
    /// Supervised transformers need at least two classes.
    #[error("at least 2 classes are required, found {0}")]
    TooFewClasses(usize),
    /// A numerical routine failed (singular matrix, NaN input, ...).
    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// A fitted mapping from one feature space to another that keeps the row
/// count and row order intact.
///
/// Unsupervised transformers ignore `labels`.
pub trait Transformer<F: Float> {
    /// Short identifier used to name the output columns (`pca_0`, ...).
    fn name(&self) -> &'static str;

    fn is_fitted(&self) -> bool;

    fn fit<L>(&mut self, samples: ArrayView2<F>, labels: &[L]) -> Result<(), TransformError>
    where
        L: Clone + Eq + Hash + Debug;

    fn transform(&self, samples: ArrayView2<F>) -> Result<Array2<F>, TransformError>;

    fn fit_transform<L>(
        &mut self,
        samples: ArrayView2<F>,
        labels: &[L],
    ) -> Result<Array2<F>, TransformError>
    where
        L: Clone + Eq + Hash + Debug,
    {
        self.fit(samples, labels)?;
        self.transform(samples)
    }
}
