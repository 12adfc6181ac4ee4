//! Scoring of predictions against ground-truth labels.

use std::collections::BTreeSet;
use std::fmt::Display;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::{Error, Result};

fn check_lengths<L>(predictions: &[L], labels: &[L]) -> Result<()> {
    if predictions.len() != labels.len() {
        return Err(Error::Value(format!(
            "{} predictions but {} labels",
            predictions.len(),
            labels.len()
        )));
    }
    if predictions.is_empty() {
        return Err(Error::Value("cannot score an empty set of predictions".into()));
    }
    Ok(())
}

/// Fraction of predictions equal to the label at the same index.
pub fn accuracy<L: PartialEq>(predictions: &[L], labels: &[L]) -> Result<f64> {
    check_lengths(predictions, labels)?;
    let correct = predictions
        .iter()
        .zip(labels)
        .filter(|(p, l)| p == l)
        .count();
    Ok(correct as f64 / predictions.len() as f64)
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Counts of (actual, predicted) label pairs.
///
/// Classes are the sorted union of both label sequences; rows are actual
/// classes and columns predicted ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix<L> {
    classes: Vec<L>,
    counts: Vec<Vec<usize>>,
}

impl<L: Ord + Clone> ConfusionMatrix<L> {
    pub fn new(predictions: &[L], labels: &[L]) -> Result<Self> {
        check_lengths(predictions, labels)?;
        let classes: Vec<L> = predictions
            .iter()
            .chain(labels)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut counts = vec![vec![0; classes.len()]; classes.len()];
        for (predicted, actual) in predictions.iter().zip(labels) {
            if let (Ok(i), Ok(j)) = (classes.binary_search(actual), classes.binary_search(predicted)) {
                counts[i][j] += 1;
            }
        }
        Ok(Self { classes, counts })
    }

    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn index_of(&self, class: &L) -> Option<usize> {
        self.classes.binary_search(class).ok()
    }

    /// Count for `actual` predicted as `predicted`; zero for unknown classes.
    pub fn get(&self, actual: &L, predicted: &L) -> usize {
        match (self.index_of(actual), self.index_of(predicted)) {
            (Some(i), Some(j)) => self.counts[i][j],
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Number of samples whose actual class is the `i`-th class.
    pub fn row_sum(&self, i: usize) -> usize {
        self.counts[i].iter().sum()
    }

    /// Number of samples predicted as the `j`-th class.
    pub fn column_sum(&self, j: usize) -> usize {
        self.counts.iter().map(|row| row[j]).sum()
    }

    pub fn true_positives(&self, i: usize) -> usize {
        self.counts[i][i]
    }

    pub fn false_positives(&self, i: usize) -> usize {
        self.column_sum(i) - self.counts[i][i]
    }

    pub fn false_negatives(&self, i: usize) -> usize {
        self.row_sum(i) - self.counts[i][i]
    }

    pub fn true_negatives(&self, i: usize) -> usize {
        self.total() + self.counts[i][i] - self.row_sum(i) - self.column_sum(i)
    }

    pub fn accuracy(&self) -> f64 {
        let correct = (0..self.classes.len()).map(|i| self.counts[i][i]).sum();
        ratio(correct, self.total())
    }
}

impl<L: Ord + Clone + Display> ConfusionMatrix<L> {
    /// Nested `actual -> predicted -> count` object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

struct Row<'a, L> {
    classes: &'a [L],
    counts: &'a [usize],
}

impl<L: Display> Serialize for Row<'_, L> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.classes.len()))?;
        for (class, count) in self.classes.iter().zip(self.counts) {
            map.serialize_entry(&class.to_string(), count)?;
        }
        map.end()
    }
}

impl<L: Display> Serialize for ConfusionMatrix<L> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.classes.len()))?;
        for (class, counts) in self.classes.iter().zip(&self.counts) {
            let row = Row {
                classes: &self.classes,
                counts,
            };
            map.serialize_entry(&class.to_string(), &row)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub specificity: f64,
    pub f1_score: f64,
    /// Number of samples whose actual class is this one.
    pub support: usize,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallMetrics {
    pub accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub micro_precision: f64,
    pub micro_recall: f64,
    pub micro_f1: f64,
    pub support: usize,
}

/// Per-class and averaged scores derived from a [`ConfusionMatrix`].
#[derive(Debug, Clone, PartialEq)]
pub struct MulticlassBreakdown {
    pub overall: OverallMetrics,
    pub classes: Vec<(String, ClassMetrics)>,
}

impl MulticlassBreakdown {
    pub fn new<L: Ord + Clone + Display>(predictions: &[L], labels: &[L]) -> Result<Self> {
        Ok(Self::from_confusion(&ConfusionMatrix::new(predictions, labels)?))
    }

    pub fn from_confusion<L: Ord + Clone + Display>(matrix: &ConfusionMatrix<L>) -> Self {
        let total = matrix.total();
        let n = matrix.classes().len();

        let classes: Vec<(String, ClassMetrics)> = matrix
            .classes()
            .iter()
            .enumerate()
            .map(|(i, class)| {
                let tp = matrix.true_positives(i);
                let fp = matrix.false_positives(i);
                let fn_ = matrix.false_negatives(i);
                let tn = matrix.true_negatives(i);
                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, tp + fn_);
                let support = matrix.row_sum(i);
                let metrics = ClassMetrics {
                    precision,
                    recall,
                    specificity: ratio(tn, tn + fp),
                    f1_score: f1(precision, recall),
                    support,
                    proportion: ratio(support, total),
                };
                (class.to_string(), metrics)
            })
            .collect();

        let mean = |f: fn(&ClassMetrics) -> f64| {
            if n == 0 {
                0.0
            } else {
                classes.iter().map(|(_, m)| f(m)).sum::<f64>() / n as f64
            }
        };
        let tp: usize = (0..n).map(|i| matrix.true_positives(i)).sum();
        let fp: usize = (0..n).map(|i| matrix.false_positives(i)).sum();
        let fn_: usize = (0..n).map(|i| matrix.false_negatives(i)).sum();
        let micro_precision = ratio(tp, tp + fp);
        let micro_recall = ratio(tp, tp + fn_);

        let overall = OverallMetrics {
            accuracy: matrix.accuracy(),
            macro_precision: mean(|m| m.precision),
            macro_recall: mean(|m| m.recall),
            macro_f1: mean(|m| m.f1_score),
            micro_precision,
            micro_recall,
            micro_f1: f1(micro_precision, micro_recall),
            support: total,
        };

        Self { overall, classes }
    }

    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|(c, _)| c == label).map(|(_, m)| m)
    }
}

struct ClassTable<'a>(&'a [(String, ClassMetrics)]);

impl Serialize for ClassTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (class, metrics) in self.0 {
            map.serialize_entry(class, metrics)?;
        }
        map.end()
    }
}

impl Serialize for MulticlassBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("overall", &self.overall)?;
        map.serialize_entry("classes", &ClassTable(&self.classes))?;
        map.end()
    }
}
