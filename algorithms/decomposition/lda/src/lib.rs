use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use petal_helpers::linalg::{inverse_sqrt, symmetric_eigen};
use petal_helpers::{Float, TransformError, Transformer};

/// Linear Discriminant Analysis.
///
/// Supervised projection onto the directions that maximise the ratio of
/// between-class to within-class scatter. At most `classes - 1` directions
/// carry discriminative information.
#[derive(Debug, Clone)]
pub struct Lda<F: Float> {
    n_components: usize,
    /// Discriminant directions, one unit-length vector per row.
    pub components: Option<Array2<F>>,
    /// Share of the discriminability captured by each component.
    pub explained_variance_ratio: Option<Array1<F>>,
}

impl<F: Float> Lda<F> {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            components: None,
            explained_variance_ratio: None,
        }
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }
}

/// Groups row indices by label, classes in first-appearance order.
fn group_by_class<L: Eq + Hash>(labels: &[L]) -> Vec<Vec<usize>> {
    let mut position: HashMap<&L, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, label) in labels.iter().enumerate() {
        let idx = *position.entry(label).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[idx].push(i);
    }
    groups
}

fn outer<F: Float>(v: &Array1<F>) -> Array2<F> {
    let col = v.view().insert_axis(Axis(1));
    let row = v.view().insert_axis(Axis(0));
    col.dot(&row)
}

impl<F: Float> Transformer<F> for Lda<F> {
    fn name(&self) -> &'static str {
        "lda"
    }

    fn is_fitted(&self) -> bool {
        self.components.is_some()
    }

    fn fit<L>(&mut self, samples: ArrayView2<F>, labels: &[L]) -> Result<(), TransformError>
    where
        L: Clone + Eq + Hash + Debug,
    {
        let (n_samples, n_features) = samples.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(TransformError::EmptyInput);
        }
        if labels.len() != n_samples {
            return Err(TransformError::MismatchedLabels {
                samples: n_samples,
                labels: labels.len(),
            });
        }

        let groups = group_by_class(labels);
        if groups.len() < 2 {
            return Err(TransformError::TooFewClasses(groups.len()));
        }
        let max = (groups.len() - 1).min(n_features);
        if self.n_components == 0 || self.n_components > max {
            return Err(TransformError::InvalidComponents {
                requested: self.n_components,
                max,
            });
        }

        let overall_mean = samples
            .mean_axis(Axis(0))
            .ok_or(TransformError::EmptyInput)?;

        let mut within = Array2::<F>::zeros((n_features, n_features));
        let mut between = Array2::<F>::zeros((n_features, n_features));
        for rows in &groups {
            let class_samples = samples.select(Axis(0), rows);
            let class_mean = class_samples
                .mean_axis(Axis(0))
                .ok_or(TransformError::EmptyInput)?;
            for row in class_samples.rows() {
                let diff = &row - &class_mean;
                within += &outer(&diff);
            }
            let count = F::from_usize(rows.len()).unwrap_or_else(F::one);
            let diff = &class_mean - &overall_mean;
            between += &(outer(&diff) * count);
        }

        // Sw^-1 Sb is not symmetric; whiten with Sw^-1/2 so the symmetric
        // solver applies, then map the eigenvectors back.
        let trace = within.diag().sum();
        let floor = (trace * F::from_f64(1e-10).unwrap_or_else(F::epsilon)).max(F::min_positive_value());
        let whitening = inverse_sqrt(within.view(), floor)?;
        let whitened = whitening.dot(&between).dot(&whitening);
        let (eigenvalues, eigenvectors) = symmetric_eigen(whitened.view())?;

        let mut components = Array2::zeros((self.n_components, n_features));
        for i in 0..self.n_components {
            let direction = whitening.dot(&eigenvectors.column(i));
            let norm = direction.dot(&direction).sqrt();
            if norm <= F::zero() || !norm.is_finite() {
                return Err(TransformError::Numerical(
                    "degenerate discriminant direction".into(),
                ));
            }
            components.row_mut(i).assign(&(direction / norm));
        }

        let eigenvalues = eigenvalues.mapv(|v| v.max(F::zero()));
        let total = eigenvalues.sum();
        let selected = eigenvalues.slice(ndarray::s![..self.n_components]).to_owned();
        let explained_variance_ratio = if total > F::zero() {
            &selected / total
        } else {
            Array1::zeros(self.n_components)
        };

        tracing::debug!(
            classes = groups.len(),
            components = self.n_components,
            ratio = ?explained_variance_ratio,
            "LDA fitted"
        );

        self.components = Some(components);
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
