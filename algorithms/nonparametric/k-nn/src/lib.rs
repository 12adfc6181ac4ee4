use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;
// These are the core components from our shared library.
use petal_helpers::{DataPoint, Distance};

// ndarray and petal_helpers are used in the public function signatures.
use ndarray::{ArrayView1, ArrayView2};
use petal_helpers::Float;
use thiserror::Error;

/// Errors that can occur when using the k-NN classifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KnnError {
    /// k cannot be zero for a k-NN classifier
    #[error("k cannot be zero for a k-NN classifier")]
    InvalidK,
    /// Cannot train on an empty training set
    #[error("cannot train on an empty training set")]
    EmptyTrainingSet,
    /// k must not exceed the number of training samples
    #[error("k={k} exceeds the training set size of {samples}")]
    KTooLarge { k: usize, samples: usize },
    /// Training vectors or a query do not share the same arity
    #[error("expected {expected} features, found {found}")]
    MismatchedDimensions { expected: usize, found: usize },
    /// `predict` was called before `train`
    #[error("the classifier must be trained before making predictions")]
    NotTrained,
    /// Invalid distance comparison (likely due to NaN values in data)
    #[error("invalid distance comparison (likely due to NaN values in data)")]
    InvalidDistance,
}

/// A k-Nearest Neighbors (k-NN) classifier.
///
/// This classifier predicts the label of a new data point by finding the `k`
/// most similar points in its training set and taking a vote among their labels.
///
/// Ranking is deterministic:
///
/// * neighbors at equal distance are ordered by their position in the training
///   data, earliest first;
/// * when two labels receive the same vote, the label whose first neighbor is
///   closest to the query wins.
///
/// # Type Parameters
///
/// * `L`: The type of the label (e.g., `String`, `i32`, or a custom `enum`).
/// * `F`: The float type for the features (e.g., `f32`, `f64`).
/// * `D`: The distance metric, which must implement the `petal_helpers::Distance` trait.
#[derive(Debug, Clone)]
pub struct KnnClassifier<L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    k: usize,
    weighted: bool,
    training_data: Option<Vec<DataPoint<L, F>>>,
    distance: D,
}

impl<L, F, D> KnnClassifier<L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    /// Creates a new, untrained k-NN classifier.
    ///
    /// # Arguments
    ///
    /// * `k`: The number of neighbors to consider for classification. Must be greater than 0.
    /// * `distance`: An instance of a struct that implements the `Distance` trait (e.g., `L2Dist`).
    ///
    /// # Errors
    ///
    /// Returns `KnnError::InvalidK` if `k` is 0, as this is not a valid configuration.
    pub fn new(k: usize, distance: D) -> Result<Self, KnnError> {
        if k == 0 {
            return Err(KnnError::InvalidK);
        }
        Ok(Self {
            k,
            weighted: false,
            training_data: None,
            distance,
        })
    }

    /// Weigh each neighbor's vote by the inverse of its distance to the query.
    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn is_trained(&self) -> bool {
        self.training_data.is_some()
    }

    /// Stores the training data. Any previously stored data is replaced.
    ///
    /// # Errors
    ///
    /// Returns `KnnError::EmptyTrainingSet` if `data` is empty,
    /// `KnnError::MismatchedDimensions` if the points do not share one arity and
    /// `KnnError::KTooLarge` if there are fewer than `k` points.
    pub fn train(&mut self, data: Vec<DataPoint<L, F>>) -> Result<(), KnnError> {
        let Some(first) = data.first() else {
            return Err(KnnError::EmptyTrainingSet);
        };
        let expected = first.arity();
        if let Some(dp) = data.iter().find(|dp| dp.arity() != expected) {
            return Err(KnnError::MismatchedDimensions {
                expected,
                found: dp.arity(),
            });
        }
        if self.k > data.len() {
            return Err(KnnError::KTooLarge {
                k: self.k,
                samples: data.len(),
            });
        }

        tracing::debug!(
            k = self.k,
            samples = data.len(),
            features = expected,
            weighted = self.weighted,
            "k-NN training data stored"
        );
        self.training_data = Some(data);
        Ok(())
    }

    /// Returns the `k` nearest training points as `(reduced distance, index)`
    /// pairs, closest first.
    fn neighbors(&self, features: ArrayView1<F>) -> Result<Vec<(F, usize)>, KnnError> {
        let training_data = self.training_data.as_ref().ok_or(KnnError::NotTrained)?;
        let expected = training_data[0].arity();
        if features.len() != expected {
            return Err(KnnError::MismatchedDimensions {
                expected,
                found: features.len(),
            });
        }

        // 1. Calculate the "relative distance" (e.g., squared Euclidean) from the new point
        //    to every point in the training set. This is faster than the true distance.
        let mut distances = Vec::with_capacity(training_data.len());
        for (i, dp) in training_data.iter().enumerate() {
            let dist = self.distance.rdistance(dp.features.view(), features);
            if dist.is_nan() {
                return Err(KnnError::InvalidDistance);
            }
            distances.push((dist, i));
        }

        // 2. Sort by distance, falling back to training order for equal distances.
        distances.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        // 3. Take the top `k` neighbors.
        distances.truncate(self.k);
        Ok(distances)
    }

    /// Tallies the neighbors' votes; labels keep the order in which they are
    /// first met among the neighbors, closest first.
    fn tally(&self, neighbors: &[(F, usize)]) -> Result<Vec<(&L, F)>, KnnError> {
        let training_data = self.training_data.as_ref().ok_or(KnnError::NotTrained)?;
        let smoothing = F::from_f64(1e-8).unwrap_or_else(F::epsilon);

        let mut votes: Vec<(&L, F)> = Vec::new();
        for &(rdist, i) in neighbors {
            let weight = if self.weighted {
                F::one() / (self.distance.rdist_to_dist(rdist) + smoothing)
            } else {
                F::one()
            };
            let label = &training_data[i].label;
            match votes.iter_mut().find(|(l, _)| *l == label) {
                Some((_, total)) => *total += weight,
                None => votes.push((label, weight)),
            }
        }
        Ok(votes)
    }

    /// Predicts the label for a new, unseen data point.
    ///
    /// # Errors
    ///
    /// Returns `KnnError::NotTrained` if `train` has not been called.
    /// Returns `KnnError::MismatchedDimensions` if the query arity differs from the training data.
    /// Returns `KnnError::InvalidDistance` if distance comparison fails (e.g., due to NaN values).
    pub fn predict(&self, features: ArrayView1<F>) -> Result<L, KnnError> {
        let neighbors = self.neighbors(features)?;
        let votes = self.tally(&neighbors)?;

        // Strictly greater keeps the earliest label on a tie.
        let mut best: Option<(&L, F)> = None;
        for (label, total) in votes {
            let replace = match best {
                Some((_, top)) => total > top,
                None => true,
            };
            if replace {
                best = Some((label, total));
            }
        }
        best.map(|(label, _)| label.clone())
            .ok_or(KnnError::EmptyTrainingSet)
    }

    /// Predicts a label for every row of `samples`, in row order.
    pub fn predict_batch(&self, samples: ArrayView2<F>) -> Result<Vec<L>, KnnError> {
        if !self.is_trained() {
            return Err(KnnError::NotTrained);
        }
        tracing::debug!(queries = samples.nrows(), "k-NN predicting");
        samples.rows().into_iter().map(|row| self.predict(row)).collect()
    }

    /// Returns the share of the (possibly weighted) vote received by each
    /// label present among the neighbors. Shares sum to one.
    pub fn proba(&self, features: ArrayView1<F>) -> Result<Vec<(L, F)>, KnnError> {
        let neighbors = self.neighbors(features)?;
        let votes = self.tally(&neighbors)?;
        let total: F = votes.iter().map(|(_, v)| *v).sum();
        Ok(votes
            .into_iter()
            .map(|(label, v)| (label.clone(), v / total))
            .collect())
    }
}
