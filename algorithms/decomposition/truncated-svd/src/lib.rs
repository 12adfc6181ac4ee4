use ndarray::{Array1, Array2, ArrayView2, s};
use std::fmt::Debug;
use std::hash::Hash;

use petal_helpers::linalg::symmetric_eigen;
use petal_helpers::{Float, TransformError, Transformer};

/// Truncated Singular Value Decomposition.
///
/// Unlike PCA the samples are not centered, which makes it suitable for
/// sparse or count data. The right singular vectors are obtained from the
/// eigen-decomposition of `XᵀX`.
#[derive(Debug, Clone)]
pub struct TruncatedSvd<F: Float> {
    n_components: usize,
    /// Right singular vectors, one per row.
    pub components: Option<Array2<F>>,
    pub singular_values: Option<Array1<F>>,
    pub explained_variance_ratio: Option<Array1<F>>,
}

impl<F: Float> TruncatedSvd<F> {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            components: None,
            singular_values: None,
            explained_variance_ratio: None,
        }
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }
}

impl<F: Float> Transformer<F> for TruncatedSvd<F> {
    fn name(&self) -> &'static str {
        "svd"
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
        let max = n_samples.min(n_features);
        if self.n_components == 0 || self.n_components > max {
            return Err(TransformError::InvalidComponents {
                requested: self.n_components,
                max,
            });
        }

        let gram = samples.t().dot(&samples);
        let (eigenvalues, eigenvectors) = symmetric_eigen(gram.view())?;
        let squared = eigenvalues.mapv(|v| v.max(F::zero()));
        let total = squared.sum();

        let selected = squared.slice(s![..self.n_components]).to_owned();
        let explained_variance_ratio = if total > F::zero() {
            &selected / total
        } else {
            Array1::zeros(self.n_components)
        };
        let singular_values = selected.mapv(|v| v.sqrt());
        let components = eigenvectors
            .slice(s![.., ..self.n_components])
            .t()
            .to_owned();

        tracing::debug!(
            components = self.n_components,
            singular_values = ?singular_values,
            "truncated SVD fitted"
        );

        self.components = Some(components);
        self.singular_values = Some(singular_values);
        self.explained_variance_ratio = Some(explained_variance_ratio);
        Ok(())
    }

    fn transform(&self, samples: ArrayView2<F>) -> Result<Array2<F>, TransformError> {
        let components = self.components.as_ref().ok_or(TransformError::NotFitted)?;
        if samples.ncols() != components.ncols() {
            return Err(TransformError::MismatchedDimensions {
                expected: components.ncols(),
                found: samples.ncols(),
            });
        }
        Ok(samples.dot(&components.t()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    const NO_LABELS: &[()] = &[];

    #[test]
    fn test_singular_values_of_scaled_axes() {
        let x = array![[3.0, 0.0], [0.0, 4.0]];
        let mut svd = TruncatedSvd::new(2);
        svd.fit(x.view(), NO_LABELS).unwrap();

        let sv = svd.singular_values.as_ref().unwrap();
        assert_abs_diff_eq!(sv, &array![4.0, 3.0], epsilon = 1e-10);
        let ratio = svd.explained_variance_ratio.as_ref().unwrap();
        assert_abs_diff_eq!(ratio, &array![16.0 / 25.0, 9.0 / 25.0], epsilon = 1e-10);
    }

    #[test]
    fn test_full_rank_projection_preserves_norms() {
        let x = array![
            [1.0, 2.0, 3.0],
            [5.0, 6.0, 7.5],
            [9.0, 10.0, 11.0],
            [0.5, -1.0, 2.0]
        ];
        let mut svd = TruncatedSvd::new(3);
        let projected = svd.fit_transform(x.view(), NO_LABELS).unwrap();
        assert_eq!(projected.shape(), &[4, 3]);
        for (original, reduced) in x.rows().into_iter().zip(projected.rows()) {
            assert_abs_diff_eq!(original.dot(&original), reduced.dot(&reduced), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_truncation_shape() {
        let x = array![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0], [9.0, 10.0, 11.0, 12.0]];
        let mut svd = TruncatedSvd::new(2);
        let projected = svd.fit_transform(x.view(), NO_LABELS).unwrap();
        assert_eq!(projected.shape(), &[3, 2]);
    }

    #[test]
    fn test_invalid_components() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let mut svd = TruncatedSvd::new(3);
        assert_eq!(
            svd.fit(x.view(), NO_LABELS),
            Err(TransformError::InvalidComponents {
                requested: 3,
                max: 2
            })
        );
    }

    #[test]
    fn test_transform_without_fit() {
        let x = array![[1.0, 2.0]];
        let svd = TruncatedSvd::<f64>::new(1);
        assert_eq!(svd.transform(x.view()), Err(TransformError::NotFitted));
    }
}
