// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Fairness metrics for binary classification
//!
//! All functions work on aligned `f64` slices where labels and the sensitive
//! attribute take values in {-1, +1}. For the sensitive attribute, `-1` marks
//! the protected group and `+1` the reference group.
//!
//! Implements:
//! - Confusion Matrix, Accuracy, Positive Rate, True Positive Rate
//! - Difference of Demographic Parity (DDP) and Equality of Opportunity (DEO)
//! - Differentiable relaxations of DDP (linear, convex-concave, upper, lower)
//! - Min-max and max-abs normalization

use crate::error::{FairnessError, Result};
use serde::{Deserialize, Serialize};

const POSITIVE: f64 = 1.0;
const NEGATIVE: f64 = -1.0;

fn check_same_len(what: &str, a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(FairnessError::invalid(format!(
            "{} length mismatch: {} vs {}",
            what,
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

fn check_binary(name: &str, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| *v != POSITIVE && *v != NEGATIVE) {
        Some(idx) => Err(FairnessError::invalid(format!(
            "{}[{}] = {} is not in {{-1, +1}}",
            name, idx, values[idx]
        ))),
        None => Ok(()),
    }
}

fn check_non_empty(name: &str, values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(FairnessError::invalid(format!("{} is empty", name)));
    }
    Ok(())
}

/// Confusion matrix for {-1, +1} labels, `+1` being the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    /// False negatives (`fn` is a keyword)
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    /// Build from ground truth and predicted labels
    pub fn from_labels(y_true: &[f64], y_pred: &[f64]) -> Result<Self> {
        check_same_len("y_true/y_pred", y_true, y_pred)?;
        check_binary("y_true", y_true)?;
        check_binary("y_pred", y_pred)?;

        let mut matrix = Self::default();
        for (truth, pred) in y_true.iter().zip(y_pred) {
            match (*truth == POSITIVE, *pred == POSITIVE) {
                (true, true) => matrix.tp += 1,
                (false, false) => matrix.tn += 1,
                (false, true) => matrix.fp += 1,
                (true, false) => matrix.fn_ += 1,
            }
        }
        Ok(matrix)
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// (TP + FP) / Total
    pub fn positive_rate(&self) -> Result<f64> {
        let total = self.total();
        if total == 0 {
            return Err(FairnessError::degenerate("positive rate of an empty subset"));
        }
        Ok((self.tp + self.fp) as f64 / total as f64)
    }

    /// TP / (TP + FN)
    pub fn true_positive_rate(&self) -> Result<f64> {
        let denom = self.tp + self.fn_;
        if denom == 0 {
            return Err(FairnessError::degenerate(
                "true positive rate of a subset without positive examples",
            ));
        }
        Ok(self.tp as f64 / denom as f64)
    }
}

/// Fraction of rows where the prediction equals the ground truth
pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_same_len("y_true/y_pred", y_true, y_pred)?;
    check_non_empty("y_true", y_true)?;

    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Share of rows predicted positive, on an already filtered subset
pub fn positive_rate(y_pred: &[f64], y_true: &[f64]) -> Result<f64> {
    ConfusionMatrix::from_labels(y_true, y_pred)?.positive_rate()
}

/// Share of positive rows predicted positive, on an already filtered subset
pub fn true_positive_rate(y_pred: &[f64], y_true: &[f64]) -> Result<f64> {
    ConfusionMatrix::from_labels(y_true, y_pred)?.true_positive_rate()
}

/// DDP and DEO between the reference and protected groups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairnessReport {
    /// Difference of demographic parity, positive when the reference group is favored
    pub ddp: f64,
    /// Difference of equality of opportunity
    pub deo: f64,
}

/// Split `(y_pred, y_true)` into (reference, protected) subsets.
fn split_by_group(
    y_pred: &[f64],
    y_true: &[f64],
    sens_attr: &[f64],
) -> ((Vec<f64>, Vec<f64>), (Vec<f64>, Vec<f64>)) {
    let mut reference = (Vec::new(), Vec::new());
    let mut protected = (Vec::new(), Vec::new());
    for ((pred, truth), s) in y_pred.iter().zip(y_true).zip(sens_attr) {
        let group = if *s == POSITIVE { &mut reference } else { &mut protected };
        group.0.push(*pred);
        group.1.push(*truth);
    }
    (reference, protected)
}

/// Compute DDP and DEO for thresholded predictions.
///
/// Fails with [`FairnessError::DegenerateInput`] when either group is empty
/// or has no positive ground-truth example.
pub fn demographic_parity_difference(
    y_pred: &[f64],
    y_true: &[f64],
    sens_attr: &[f64],
) -> Result<FairnessReport> {
    check_same_len("y_pred/y_true", y_pred, y_true)?;
    check_same_len("y_pred/sens_attr", y_pred, sens_attr)?;
    check_binary("sens_attr", sens_attr)?;

    let ((ref_pred, ref_true), (prot_pred, prot_true)) = split_by_group(y_pred, y_true, sens_attr);

    let reference = ConfusionMatrix::from_labels(&ref_true, &ref_pred)?;
    let protected = ConfusionMatrix::from_labels(&prot_true, &prot_pred)?;

    let ddp = reference
        .positive_rate()
        .map_err(|e| in_group("reference", e))?
        - protected
            .positive_rate()
            .map_err(|e| in_group("protected", e))?;
    let deo = reference
        .true_positive_rate()
        .map_err(|e| in_group("reference", e))?
        - protected
            .true_positive_rate()
            .map_err(|e| in_group("protected", e))?;

    tracing::debug!(ddp, deo, ?reference, ?protected, "computed fairness measures");
    Ok(FairnessReport { ddp, deo })
}

fn in_group(group: &str, err: FairnessError) -> FairnessError {
    match err {
        FairnessError::DegenerateInput(msg) => {
            FairnessError::degenerate(format!("{} group: {}", group, msg))
        }
        other => other,
    }
}

/// Differentiable surrogates of DDP, evaluated on raw real-valued scores.
///
/// Each one is `(1/n) * sum_i t(y_i, s_i)` where for the reference group
/// `t = f(y)/p1 - c` and for the protected group `t = g(y)/(1 - p1) - c`,
/// `p1` being the empirical share of the reference group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relaxation {
    /// Linear relaxation (Donini et al., 2018)
    Linear,
    /// Convex-concave relaxation (Zafar et al., 2017)
    ConvexConcave,
    /// Upper bound with kappa(x) = max(0, 1 + x) (Wu et al., 2019)
    UpperBound,
    /// Lower bound with delta(x) = min(1, x) (Wu et al., 2019)
    LowerBound,
}

impl Relaxation {
    pub const ALL: [Relaxation; 4] = [
        Relaxation::Linear,
        Relaxation::ConvexConcave,
        Relaxation::UpperBound,
        Relaxation::LowerBound,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Relaxation::Linear => "linear",
            Relaxation::ConvexConcave => "convex_concave",
            Relaxation::UpperBound => "upper_bound",
            Relaxation::LowerBound => "lower_bound",
        }
    }

    /// Per-row transform applied to the score of a reference-group row
    fn reference_term(&self, y: f64) -> f64 {
        match self {
            Relaxation::Linear => y,
            Relaxation::ConvexConcave => y.max(0.0),
            Relaxation::UpperBound => kappa(y),
            Relaxation::LowerBound => delta(y),
        }
    }

    /// Per-row transform applied to the score of a protected-group row
    fn protected_term(&self, y: f64) -> f64 {
        match self {
            Relaxation::Linear => -y,
            // the hinge is taken on the raw score, the group weight is negative
            Relaxation::ConvexConcave => -y.max(0.0),
            Relaxation::UpperBound => kappa(-y),
            Relaxation::LowerBound => delta(-y),
        }
    }

    fn offset(&self) -> f64 {
        match self {
            Relaxation::Linear | Relaxation::ConvexConcave => 0.0,
            Relaxation::UpperBound | Relaxation::LowerBound => 1.0,
        }
    }
}

fn kappa(x: f64) -> f64 {
    (1.0 + x).max(0.0)
}

fn delta(x: f64) -> f64 {
    x.min(1.0)
}

/// Evaluate a DDP relaxation on raw scores.
///
/// Fails with [`FairnessError::DegenerateInput`] if one group is empty.
pub fn relaxation(kind: Relaxation, y_reg: &[f64], sens_attr: &[f64]) -> Result<f64> {
    check_same_len("y_reg/sens_attr", y_reg, sens_attr)?;
    check_non_empty("y_reg", y_reg)?;
    check_finite("y_reg", y_reg)?;
    check_binary("sens_attr", sens_attr)?;

    let n = y_reg.len() as f64;
    let p1 = sens_attr.iter().filter(|s| **s == POSITIVE).count() as f64 / n;
    if p1 == 0.0 || p1 == 1.0 {
        return Err(FairnessError::degenerate(format!(
            "{} relaxation needs both groups, reference share is {}",
            kind.name(),
            p1
        )));
    }

    let offset = kind.offset();
    let sum: f64 = y_reg
        .iter()
        .zip(sens_attr)
        .map(|(y, s)| {
            let term = if *s == POSITIVE {
                kind.reference_term(*y) / p1
            } else {
                kind.protected_term(*y) / (1.0 - p1)
            };
            term - offset
        })
        .sum();

    Ok(sum / n)
}

pub fn linear_relaxation(y_reg: &[f64], sens_attr: &[f64]) -> Result<f64> {
    relaxation(Relaxation::Linear, y_reg, sens_attr)
}

pub fn convex_concave_relaxation(y_reg: &[f64], sens_attr: &[f64]) -> Result<f64> {
    relaxation(Relaxation::ConvexConcave, y_reg, sens_attr)
}

/// Upper bound on the DDP of the thresholded scores
pub fn upper_bound_relaxation(y_reg: &[f64], sens_attr: &[f64]) -> Result<f64> {
    relaxation(Relaxation::UpperBound, y_reg, sens_attr)
}

/// Lower bound on the DDP of the thresholded scores
pub fn lower_bound_relaxation(y_reg: &[f64], sens_attr: &[f64]) -> Result<f64> {
    relaxation(Relaxation::LowerBound, y_reg, sens_attr)
}

fn check_finite(name: &str, values: &[f64]) -> Result<()> {
    if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
        return Err(FairnessError::invalid(format!(
            "{}[{}] = {} is not finite",
            name, idx, values[idx]
        )));
    }
    Ok(())
}

fn finite_range(x: &[f64]) -> Result<(f64, f64)> {
    check_non_empty("x", x)?;
    check_finite("x", x)?;
    Ok(x.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v))))
}

/// Scale to [-1, 1] so that the minimum maps to -1 and the maximum to +1
pub fn normalize_minmax(x: &[f64]) -> Result<Vec<f64>> {
    let (min, max) = finite_range(x)?;
    // halved so that max - min cannot overflow for opposite-signed extremes
    let (min, max) = (min / 2.0, max / 2.0);
    let range = max - min;
    if range == 0.0 {
        return Err(FairnessError::degenerate("cannot min-max scale a constant array"));
    }
    Ok(x.iter().map(|v| (v / 2.0 - min) / range * 2.0 - 1.0).collect())
}

/// Divide by the largest absolute value
pub fn normalize_by_max_abs(x: &[f64]) -> Result<Vec<f64>> {
    let (min, max) = finite_range(x)?;
    let scale = min.abs().max(max.abs());
    if scale == 0.0 {
        return Err(FairnessError::degenerate("cannot scale an all-zero array"));
    }
    Ok(x.iter().map(|v| v / scale).collect())
}

/// Turn raw scores into {-1, +1} labels (`+1` when the score is positive)
pub fn threshold(y_reg: &[f64]) -> Vec<f64> {
    y_reg
        .iter()
        .map(|y| if *y > 0.0 { POSITIVE } else { NEGATIVE })
        .collect()
}

/// Complete fairness evaluation of one set of scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairnessMetrics {
    pub accuracy: f64,
    pub fairness: FairnessReport,
    pub confusion_matrix: ConfusionMatrix,
    pub linear: f64,
    pub convex_concave: f64,
    pub upper_bound: f64,
    pub lower_bound: f64,
    pub support: usize,
}

impl FairnessMetrics {
    /// Evaluate raw scores against ground truth and the sensitive attribute
    pub fn from_scores(y_reg: &[f64], y_true: &[f64], sens_attr: &[f64]) -> Result<Self> {
        check_same_len("y_reg/y_true", y_reg, y_true)?;
        check_finite("y_reg", y_reg)?;
        let y_pred = threshold(y_reg);

        Ok(Self {
            accuracy: accuracy(y_true, &y_pred)?,
            fairness: demographic_parity_difference(&y_pred, y_true, sens_attr)?,
            confusion_matrix: ConfusionMatrix::from_labels(y_true, &y_pred)?,
            linear: linear_relaxation(y_reg, sens_attr)?,
            convex_concave: convex_concave_relaxation(y_reg, sens_attr)?,
            upper_bound: upper_bound_relaxation(y_reg, sens_attr)?,
            lower_bound: lower_bound_relaxation(y_reg, sens_attr)?,
            support: y_true.len(),
        })
    }

    pub fn relaxation(&self, kind: Relaxation) -> f64 {
        match kind {
            Relaxation::Linear => self.linear,
            Relaxation::ConvexConcave => self.convex_concave,
            Relaxation::UpperBound => self.upper_bound,
            Relaxation::LowerBound => self.lower_bound,
        }
    }

    /// Format as a human-readable string
    pub fn format(&self) -> String {
        format!(
            r#"Fairness Report
===============
Accuracy:            {:.4} ({:.2}%)
DDP:                 {:+.4}
DEO:                 {:+.4}
DDP linear:          {:+.4}
DDP convex-concave:  {:+.4}
DDP upper bound:     {:+.4}
DDP lower bound:     {:+.4}
Support:             {}

Confusion Matrix:
                Predicted
                 +1      -1
Actual +1    {:>6}  {:>6}
       -1    {:>6}  {:>6}
"#,
            self.accuracy,
            self.accuracy * 100.0,
            self.fairness.ddp,
            self.fairness.deo,
            self.linear,
            self.convex_concave,
            self.upper_bound,
            self.lower_bound,
            self.support,
            self.confusion_matrix.tp,
            self.confusion_matrix.fn_,
            self.confusion_matrix.fp,
            self.confusion_matrix.tn,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_signs(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
        (0..n).map(|_| if rng.gen_bool(0.5) { 1.0 } else { -1.0 }).collect()
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let y_true = vec![1.0, 1.0, -1.0, -1.0, 1.0];
        let y_pred = vec![1.0, -1.0, 1.0, -1.0, 1.0];

        let cm = ConfusionMatrix::from_labels(&y_true, &y_pred).unwrap();
        assert_eq!(cm, ConfusionMatrix { tn: 1, fp: 1, fn_: 1, tp: 2 });
        assert_eq!(cm.total(), 5);
        assert!((cm.positive_rate().unwrap() - 0.6).abs() < 1e-12);
        assert!((cm.true_positive_rate().unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_confusion_matrix_rejects_non_binary() {
        let err = ConfusionMatrix::from_labels(&[1.0, 0.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, FairnessError::InvalidInput(_)));
    }

    #[test]
    fn test_accuracy_perfect_and_disjoint() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for n in [1, 5, 64] {
            let y = random_signs(&mut rng, n);
            assert_eq!(accuracy(&y, &y).unwrap(), 1.0);

            let flipped: Vec<f64> = y.iter().map(|v| -v).collect();
            assert_eq!(accuracy(&y, &flipped).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_accuracy_invalid_input() {
        assert!(matches!(accuracy(&[], &[]), Err(FairnessError::InvalidInput(_))));
        assert!(matches!(
            accuracy(&[1.0, -1.0], &[1.0]),
            Err(FairnessError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_group_metrics_invalid_input() {
        let err = demographic_parity_difference(&[1.0, -1.0], &[1.0, -1.0], &[1.0]).unwrap_err();
        assert!(matches!(err, FairnessError::InvalidInput(_)));
        let err = demographic_parity_difference(&[1.0, -1.0], &[1.0], &[1.0, -1.0]).unwrap_err();
        assert!(matches!(err, FairnessError::InvalidInput(_)));

        let err = demographic_parity_difference(&[1.0, -1.0, 1.0], &[1.0, 1.0, -1.0], &[1.0, 0.0, -1.0])
            .unwrap_err();
        assert!(matches!(err, FairnessError::InvalidInput(_)));

        for kind in Relaxation::ALL {
            let err = relaxation(kind, &[0.5, -0.5, 0.1], &[1.0, -1.0]).unwrap_err();
            assert!(matches!(err, FairnessError::InvalidInput(_)), "{:?}", kind);
        }
    }

    #[test]
    fn test_relaxation_rejects_non_finite_scores() {
        let sens = vec![1.0, 1.0, -1.0, -1.0, 1.0];
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let y_reg = vec![0.4, bad, -0.3, 0.8, -0.1];
            for kind in Relaxation::ALL {
                let err = relaxation(kind, &y_reg, &sens).unwrap_err();
                assert!(matches!(err, FairnessError::InvalidInput(_)), "{:?} with {}", kind, bad);
            }

            let y_true = vec![1.0, -1.0, 1.0, -1.0, 1.0];
            let err = FairnessMetrics::from_scores(&y_reg, &y_true, &sens).unwrap_err();
            assert!(matches!(err, FairnessError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_worked_example() {
        let y_true = vec![1.0, 1.0, -1.0, -1.0];
        let y_pred = vec![1.0, -1.0, -1.0, -1.0];
        let sens = vec![1.0, 1.0, -1.0, -1.0];

        assert!((accuracy(&y_true, &y_pred).unwrap() - 0.75).abs() < 1e-12);

        let pr_ref = positive_rate(&y_pred[..2], &y_true[..2]).unwrap();
        let pr_prot = positive_rate(&y_pred[2..], &y_true[2..]).unwrap();
        assert_eq!(pr_prot, 0.0);
        assert_eq!(pr_ref, 0.5);
        assert_eq!(pr_ref - pr_prot, 0.5);

        // the protected group has no positive example, so DEO is undefined
        let err = demographic_parity_difference(&y_pred, &y_true, &sens).unwrap_err();
        assert!(err.is_degenerate());
        assert!(err.to_string().contains("protected"));
    }

    #[test]
    fn test_demographic_parity_difference_values() {
        let y_true = vec![1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0];
        let y_pred = vec![1.0, 1.0, 1.0, -1.0, 1.0, -1.0, -1.0, -1.0];
        let sens = vec![1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0];

        let report = demographic_parity_difference(&y_pred, &y_true, &sens).unwrap();
        // reference: PR = 3/4, TPR = 1; protected: PR = 1/4, TPR = 1/2
        assert!((report.ddp - 0.5).abs() < 1e-12);
        assert!((report.deo - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_protected_group() {
        let y_true = vec![1.0, -1.0, 1.0];
        let y_pred = vec![1.0, 1.0, -1.0];
        let sens = vec![1.0, 1.0, 1.0];

        let err = demographic_parity_difference(&y_pred, &y_true, &sens).unwrap_err();
        assert!(matches!(err, FairnessError::DegenerateInput(_)));
    }

    #[test]
    fn test_true_positive_rate_without_positives() {
        let err = true_positive_rate(&[1.0, -1.0], &[-1.0, -1.0]).unwrap_err();
        assert!(err.is_degenerate());
        assert!(positive_rate(&[], &[]).unwrap_err().is_degenerate());
    }

    #[test]
    fn test_negating_sensitive_attribute_negates_measures() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let n = 200;
        let y_true = random_signs(&mut rng, n);
        let y_pred = random_signs(&mut rng, n);
        let sens = random_signs(&mut rng, n);
        let negated: Vec<f64> = sens.iter().map(|s| -s).collect();

        let a = demographic_parity_difference(&y_pred, &y_true, &sens).unwrap();
        let b = demographic_parity_difference(&y_pred, &y_true, &negated).unwrap();
        assert!((a.ddp + b.ddp).abs() < 1e-12);
        assert!((a.deo + b.deo).abs() < 1e-12);
    }

    #[test]
    fn test_independent_predictions_are_fair() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let n = 40_000;
        let y_true = random_signs(&mut rng, n);
        let y_pred = random_signs(&mut rng, n);
        let sens = random_signs(&mut rng, n);

        let report = demographic_parity_difference(&y_pred, &y_true, &sens).unwrap();
        assert!(report.ddp.abs() < 0.03, "ddp = {}", report.ddp);
        assert!(report.deo.abs() < 0.03, "deo = {}", report.deo);
    }

    #[test]
    fn test_relaxation_hand_computed() {
        // p1 = 0.5
        let y_reg = vec![0.5, -0.5, 2.0, -1.0];
        let sens = vec![1.0, 1.0, -1.0, -1.0];

        // (0.5 - 0.5) / 0.5 + (-(2.0) + 1.0) / 0.5 = -2 ; / 4
        assert!((linear_relaxation(&y_reg, &sens).unwrap() - (-0.5)).abs() < 1e-12);
        // (0.5 + 0) / 0.5 - (2.0 + 0) / 0.5 = -3 ; / 4
        assert!((convex_concave_relaxation(&y_reg, &sens).unwrap() - (-0.75)).abs() < 1e-12);
        // kappa: 1.5/0.5 + 0.5/0.5 + 0/0.5 + 2/0.5 - 4 = 4 ; / 4
        assert!((upper_bound_relaxation(&y_reg, &sens).unwrap() - 1.0).abs() < 1e-12);
        // delta: 0.5/0.5 - 0.5/0.5 - 2/0.5 + 1/0.5 - 4 = -6 ; / 4
        assert!((lower_bound_relaxation(&y_reg, &sens).unwrap() - (-1.5)).abs() < 1e-12);
    }

    #[test]
    fn test_relaxation_unbalanced_groups() {
        // p1 = 0.25, convex-concave weights are (1 - p1) and -p1
        let y_reg = vec![1.0, 1.0, 1.0, 1.0];
        let sens = vec![1.0, -1.0, -1.0, -1.0];
        let value = convex_concave_relaxation(&y_reg, &sens).unwrap();
        let expected = (0.75 * 1.0 - 3.0 * 0.25 * 1.0) / (0.25 * 0.75) / 4.0;
        assert!((value - expected).abs() < 1e-12);
        assert!(value.abs() < 1e-12);
    }

    #[test]
    fn test_relaxations_of_true_labels_on_independent_groups() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n = 40_000;
        let y_true = random_signs(&mut rng, n);
        let sens = random_signs(&mut rng, n);

        assert!(linear_relaxation(&y_true, &sens).unwrap().abs() < 0.05);
        assert!(convex_concave_relaxation(&y_true, &sens).unwrap().abs() < 0.05);

        // kappa(+-1) over-counts by the score magnitude, so the bounds sit at
        // +-1 around a DDP near zero
        let ddp = demographic_parity_difference(&threshold(&y_true), &y_true, &sens)
            .unwrap()
            .ddp;
        let upper = upper_bound_relaxation(&y_true, &sens).unwrap();
        let lower = lower_bound_relaxation(&y_true, &sens).unwrap();
        assert!(ddp.abs() < 0.03);
        assert!(lower <= ddp && ddp <= upper);
        assert!((upper + lower).abs() < 0.1);
    }

    #[test]
    fn test_bounds_bracket_ddp() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..20 {
            let n = 300;
            let sens = random_signs(&mut rng, n);
            let y_reg: Vec<f64> = sens
                .iter()
                .map(|s| rng.gen_range(-1.5..1.5) + 0.3 * s)
                .collect();
            let y_pred = threshold(&y_reg);

            let p1 = sens.iter().filter(|s| **s == 1.0).count() as f64 / n as f64;
            let pr_ref = y_pred.iter().zip(&sens).filter(|(p, s)| **p == 1.0 && **s == 1.0).count()
                as f64
                / (p1 * n as f64);
            let pr_prot = y_pred.iter().zip(&sens).filter(|(p, s)| **p == 1.0 && **s == -1.0).count()
                as f64
                / ((1.0 - p1) * n as f64);
            let ddp = pr_ref - pr_prot;

            assert!(upper_bound_relaxation(&y_reg, &sens).unwrap() >= ddp - 1e-9);
            assert!(lower_bound_relaxation(&y_reg, &sens).unwrap() <= ddp + 1e-9);
        }
    }

    #[test]
    fn test_relaxation_single_group_is_degenerate() {
        let y_reg = vec![0.3, -0.2, 0.9];
        for kind in Relaxation::ALL {
            let err = relaxation(kind, &y_reg, &[1.0, 1.0, 1.0]).unwrap_err();
            assert!(err.is_degenerate(), "{:?}", kind);
            let err = relaxation(kind, &y_reg, &[-1.0, -1.0, -1.0]).unwrap_err();
            assert!(err.is_degenerate(), "{:?}", kind);
        }
        assert!(matches!(
            linear_relaxation(&[], &[]),
            Err(FairnessError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_normalize_minmax() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..10 {
            let x: Vec<f64> = (0..50).map(|_| rng.gen_range(-100.0..100.0)).collect();
            let scaled = normalize_minmax(&x).unwrap();
            assert!(scaled.iter().all(|v| (-1.0..=1.0).contains(v)));
            let min = scaled.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = scaled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(min, -1.0);
            assert_eq!(max, 1.0);
        }

        assert_eq!(normalize_minmax(&[2.0, 4.0, 3.0]).unwrap(), vec![-1.0, 1.0, 0.0]);
        assert_eq!(
            normalize_minmax(&[-1e308, 0.0, 1e308]).unwrap(),
            vec![-1.0, 0.0, 1.0]
        );
        assert_eq!(
            normalize_minmax(&[f64::MAX, -f64::MAX]).unwrap(),
            vec![1.0, -1.0]
        );
        assert!(normalize_minmax(&[3.0, 3.0]).unwrap_err().is_degenerate());
        assert!(matches!(normalize_minmax(&[]), Err(FairnessError::InvalidInput(_))));
    }

    #[test]
    fn test_normalize_by_max_abs() {
        let scaled = normalize_by_max_abs(&[1.0, -4.0, 2.0]).unwrap();
        assert_eq!(scaled, vec![0.25, -1.0, 0.5]);
        assert!(scaled.iter().any(|v| v.abs() == 1.0));

        assert!(normalize_by_max_abs(&[0.0, 0.0]).unwrap_err().is_degenerate());
        assert!(matches!(
            normalize_by_max_abs(&[1.0, f64::NAN]),
            Err(FairnessError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fairness_metrics_format() {
        let y_reg = vec![0.8, -0.4, 0.3, -0.9, 0.6, 0.2, -0.1, -0.7];
        let y_true = vec![1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0];
        let sens = vec![1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0];

        let metrics = FairnessMetrics::from_scores(&y_reg, &y_true, &sens).unwrap();
        assert_eq!(metrics.support, 8);
        assert!((metrics.accuracy - 0.75).abs() < 1e-12);
        assert_eq!(metrics.relaxation(Relaxation::Linear), metrics.linear);

        let formatted = metrics.format();
        assert!(formatted.contains("Fairness Report"));
        assert!(formatted.contains("DDP"));
        assert!(formatted.contains("Confusion Matrix"));
    }
}
