use ndarray::{Array1, Array2, ArrayView2, Axis, s};
use std::fmt::Debug;
use std::hash::Hash;

use petal_helpers::linalg::symmetric_eigen;
use petal_helpers::{Float, TransformError, Transformer};

/// Principal Component Analysis.
///
/// Projects centered samples onto the directions of largest variance, i.e. the
/// leading eigenvectors of the sample covariance matrix.
#[derive(Debug, Clone)]
pub struct Pca<F: Float> {
    n_components: usize,
    /// Principal axes, one per row, sorted by decreasing explained variance.
    pub components: Option<Array2<F>>,
    /// Per-feature mean removed before projecting.
    pub mean: Option<Array1<F>>,
    /// Variance captured by each component.
    pub explained_variance: Option<Array1<F>>,
    /// Share of the total variance captured by each component.
    pub explained_variance_ratio: Option<Array1<F>>,
}

impl<F: Float> Pca<F> {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            components: None,
            mean: None,
            explained_variance: None,
            explained_variance_ratio: None,
        }
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }
}

impl<F: Float> Transformer<F> for Pca<F> {
    fn name(&self) -> &'static str {
        "pca"
    }

    fn is_fitted(&self) -> bool {
        self.components.is_some()
    }

    fn fit<L>(&mut self, samples: ArrayView2<F>, _labels: &[L]) -> Result<(), TransformError>
    where
        L: Clone + Eq + Hash + Debug,
    {
        let (n_samples, n_features) = samples.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(TransformError::EmptyInput);
        }
        if self.n_components == 0 || self.n_components > n_features {
            return Err(TransformError::InvalidComponents {
                requested: self.n_components,
                max: n_features,
            });
        }

        let mean = samples
            .mean_axis(Axis(0))
            .ok_or(TransformError::EmptyInput)?;
        let centered = &samples - &mean.view().insert_axis(Axis(0));

        // Sample covariance (n - 1 denominator); a single row has zero spread.
        let dof = F::from_usize(n_samples.saturating_sub(1).max(1)).unwrap_or_else(F::one);
        let covariance = centered.t().dot(&centered) / dof;

        let (eigenvalues, eigenvectors) = symmetric_eigen(covariance.view())?;
        let eigenvalues = eigenvalues.mapv(|v| v.max(F::zero()));
        let total = eigenvalues.sum();

        let explained_variance = eigenvalues.slice(s![..self.n_components]).to_owned();
        let explained_variance_ratio = if total > F::zero() {
            &explained_variance / total
        } else {
            Array1::zeros(self.n_components)
        };
        let components = eigenvectors
            .slice(s![.., ..self.n_components])
            .t()
            .to_owned();

        tracing::debug!(
            components = self.n_components,
            ratio = ?explained_variance_ratio,
            "PCA fitted"
        );

        self.components = Some(components);
        self.mean = Some(mean);
        self.explained_variance = Some(explained_variance);
        self.explained_variance_ratio = Some(explained_variance_ratio);
        Ok(())
    }

    fn transform(&self, samples: ArrayView2<F>) -> Result<Array2<F>, TransformError> {
        let (Some(components), Some(mean)) = (&self.components, &self.mean) else {
            return Err(TransformError::NotFitted);
        };
        if samples.ncols() != mean.len() {
            return Err(TransformError::MismatchedDimensions {
                expected: mean.len(),
                found: samples.ncols(),
            });
        }

        let centered = &samples - &mean.view().insert_axis(Axis(0));
        Ok(centered.dot(&components.t()))
    }
}
