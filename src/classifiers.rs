// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Classifier seam for fairness evaluation
//!
//! A fairness-constrained optimizer plugs in through [`FairClassifier`]. The
//! reference classifiers here are deliberately simple:
//! - Constant (always predicts the training majority class)
//! - Random (seeded uniform scores)
//! - Centroid (projection onto the difference of class means)

use crate::error::FairnessError;
use crate::metrics::threshold;
use anyhow::{bail, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A binary classifier that may use the sensitive attribute during training
pub trait FairClassifier: Send + Sync {
    /// Fit on features, labels in {-1, +1} and the sensitive attribute
    fn fit(&mut self, features: &[Vec<f64>], labels: &[f64], sensitive: &[f64]) -> Result<()>;

    /// Real-valued scores, positive meaning class +1
    fn predict(&self, features: &[Vec<f64>]) -> Vec<f64>;

    /// Thresholded predictions in {-1, +1}
    fn predict_labels(&self, features: &[Vec<f64>]) -> Vec<f64> {
        threshold(&self.predict(features))
    }

    fn name(&self) -> &str;

    fn description(&self) -> &str;
}

fn check_training_set(features: &[Vec<f64>], labels: &[f64], sensitive: &[f64]) -> Result<()> {
    if features.is_empty() {
        bail!(FairnessError::InvalidInput("empty training set".to_string()));
    }
    if features.len() != labels.len() || labels.len() != sensitive.len() {
        bail!(FairnessError::InvalidInput(format!(
            "training set length mismatch: {} rows, {} labels, {} sensitive values",
            features.len(),
            labels.len(),
            sensitive.len()
        )));
    }
    Ok(())
}

/// Random classifier: scores drawn uniformly from [-1, 1]
#[derive(Debug, Clone)]
pub struct RandomClassifier {
    seed: u64,
    rng: ChaCha8Rng,
}

impl RandomClassifier {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl FairClassifier for RandomClassifier {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[f64], sensitive: &[f64]) -> Result<()> {
        check_training_set(features, labels, sensitive)?;
        // Reset RNG to ensure reproducibility
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
        let mut rng = self.rng.clone();
        features.iter().map(|_| rng.gen_range(-1.0..=1.0)).collect()
    }

    fn name(&self) -> &str {
        "Random"
    }

    fn description(&self) -> &str {
        "Uniform random scores, independent of features and group"
    }
}

/// Constant classifier: always predicts the majority training class
#[derive(Debug, Clone, Default)]
pub struct ConstantClassifier {
    majority: Option<f64>,
}

impl ConstantClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FairClassifier for ConstantClassifier {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[f64], sensitive: &[f64]) -> Result<()> {
        check_training_set(features, labels, sensitive)?;
        let positives = labels.iter().filter(|y| **y == 1.0).count();
        self.majority = Some(if positives * 2 > labels.len() { 1.0 } else { -1.0 });
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
        vec![self.majority.unwrap_or(-1.0); features.len()]
    }

    fn name(&self) -> &str {
        "Constant"
    }

    fn description(&self) -> &str {
        "Always predicts the majority class from training data"
    }
}

/// Centroid classifier: linear score `w . x + b` with `w = mu(+1) - mu(-1)`
///
/// Scores are divided by the largest absolute training score, so training
/// scores lie in [-1, 1].
#[derive(Debug, Clone, Default)]
pub struct CentroidClassifier {
    weights: Vec<f64>,
    bias: f64,
    scale: f64,
}

impl CentroidClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn raw_score(&self, row: &[f64]) -> f64 {
        row.iter().zip(&self.weights).map(|(x, w)| x * w).sum::<f64>() + self.bias
    }
}

fn centroid<'a>(rows: impl Iterator<Item = &'a Vec<f64>>, dim: usize) -> Option<Vec<f64>> {
    let mut sum = vec![0.0; dim];
    let mut count = 0usize;
    for row in rows {
        for (acc, x) in sum.iter_mut().zip(row) {
            *acc += x;
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(sum.into_iter().map(|s| s / count as f64).collect())
}

impl FairClassifier for CentroidClassifier {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[f64], sensitive: &[f64]) -> Result<()> {
        check_training_set(features, labels, sensitive)?;
        let dim = features[0].len();

        let rows_of = |class: f64| {
            features
                .iter()
                .zip(labels)
                .filter(move |(_, y)| **y == class)
                .map(|(row, _)| row)
        };
        let (Some(pos), Some(neg)) = (centroid(rows_of(1.0), dim), centroid(rows_of(-1.0), dim)) else {
            bail!(FairnessError::DegenerateInput(
                "centroid classifier needs both classes in the training set".to_string()
            ));
        };

        self.weights = pos.iter().zip(&neg).map(|(p, n)| p - n).collect();
        self.bias = -pos
            .iter()
            .zip(&neg)
            .zip(&self.weights)
            .map(|((p, n), w)| w * (p + n) / 2.0)
            .sum::<f64>();
        self.scale = 1.0;

        let max_abs = features
            .iter()
            .map(|row| self.raw_score(row).abs())
            .fold(0.0, f64::max);
        if max_abs == 0.0 {
            bail!(FairnessError::DegenerateInput(
                "class centroids coincide, all training scores are zero".to_string()
            ));
        }
        self.scale = max_abs;

        tracing::debug!(dim, scale = self.scale, "fitted centroid classifier");
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
        if self.scale == 0.0 {
            return vec![0.0; features.len()];
        }
        features.iter().map(|row| self.raw_score(row) / self.scale).collect()
    }

    fn name(&self) -> &str {
        "Centroid"
    }

    fn description(&self) -> &str {
        "Linear score from the difference of class centroids, ignores the sensitive attribute"
    }
}

/// Get all reference classifiers
pub fn all_classifiers(seed: u64) -> Vec<Box<dyn FairClassifier>> {
    vec![
        Box::new(RandomClassifier::new(seed)),
        Box::new(ConstantClassifier::new()),
        Box::new(CentroidClassifier::new()),
    ]
}
