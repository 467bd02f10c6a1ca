// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Fairness evaluation of binary classifiers on tabular data
//!
//! This crate provides:
//! - Fairness metrics (Accuracy, DDP, DEO and differentiable DDP relaxations)
//! - Dataset loading and preprocessing (CelebA, Adult, Credit, synthetic)
//! - A classifier seam for fairness-constrained models, with reference classifiers
//! - Reproducible evaluation pipeline with seeded randomness

pub mod classifiers;
pub mod datasets;
pub mod error;
pub mod metrics;
pub mod pipeline;

pub use classifiers::{all_classifiers, CentroidClassifier, ConstantClassifier, FairClassifier, RandomClassifier};
pub use datasets::{Dataset, DatasetConfig, GroupStats};
pub use error::{FairnessError, Result};
pub use metrics::{
    accuracy, convex_concave_relaxation, demographic_parity_difference, linear_relaxation,
    lower_bound_relaxation, normalize_by_max_abs, normalize_minmax, positive_rate, relaxation,
    true_positive_rate, upper_bound_relaxation, ConfusionMatrix, FairnessMetrics, FairnessReport, Relaxation,
};
pub use pipeline::{EvaluationConfig, EvaluationPipeline, EvaluationResults};
