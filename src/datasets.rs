// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Dataset loading and preprocessing for fairness evaluation
//!
//! Every loader produces the same triple: a feature matrix, labels in
//! {-1, +1} and a binary sensitive attribute in {-1, +1} (-1 = protected).

use crate::metrics::normalize_minmax;
use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;

/// Descriptive information about a dataset source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub source: String,
}

/// A loaded dataset: aligned features, labels and sensitive attribute
#[derive(Debug, Clone)]
pub struct Dataset {
    pub config: DatasetConfig,
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
    pub sensitive: Vec<f64>,
}

impl Dataset {
    /// Load a dataset by id ("synthetic", "celeba", "adult", "credit")
    pub fn load(id: &str, path: Option<&Path>, load_size: Option<usize>, seed: u64) -> Result<Self> {
        if id == "synthetic" {
            return Ok(Self::load_synthetic(load_size.unwrap_or(1000), seed));
        }
        let Some(path) = path else {
            bail!("dataset '{}' needs a path to its data file", id);
        };
        match id {
            "celeba" => Self::load_celeba(path, load_size, seed),
            "adult" => Self::load_adult(path, load_size, seed),
            "credit" => Self::load_credit(path),
            other => bail!("unknown dataset '{}'", other),
        }
    }

    /// Load the CelebA attribute table (`list_attr_celeba.csv`, `;`-separated).
    ///
    /// The sensitive attribute is the negated `Male` column and the label is
    /// `Smiling`; the remaining attribute columns are the features.
    pub fn load_celeba(path: &Path, load_size: Option<usize>, seed: u64) -> Result<Self> {
        let config = DatasetConfig {
            id: "celeba".to_string(),
            name: "CelebA Attributes".to_string(),
            description: "Binary face attributes, label Smiling, sensitive attribute sex".to_string(),
            source: "http://mmlab.ie.cuhk.edu.hk/projects/CelebA.html".to_string(),
        };

        let file = File::open(path)
            .with_context(|| format!("Failed to open CelebA file: {}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", path.display()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let sex_idx = column_index(&headers, "Male")?;
        let label_idx = column_index(&headers, "Smiling")?;
        let id_idx = column_index(&headers, "picture_ID")?;

        let feature_idx: Vec<usize> = (0..headers.len())
            .filter(|i| ![sex_idx, label_idx, id_idx].contains(i))
            .collect();
        let feature_names = feature_idx.iter().map(|i| headers[*i].clone()).collect();

        let mut features = Vec::new();
        let mut labels = Vec::new();
        let mut sensitive = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read record {} in {}", idx, path.display()))?;
            let value = |col: usize| -> Result<f64> {
                let raw = record.get(col).unwrap_or("").trim();
                raw.parse::<f64>()
                    .with_context(|| format!("Record {}: column '{}' is not numeric: '{}'", idx, headers[col], raw))
            };

            sensitive.push(-value(sex_idx)?);
            labels.push(value(label_idx)?);
            features.push(feature_idx.iter().map(|c| value(*c)).collect::<Result<Vec<_>>>()?);
        }

        let dataset = Self {
            config,
            feature_names,
            features,
            labels,
            sensitive,
        };
        Ok(dataset.finalize(load_size, seed))
    }

    /// Load the UCI Adult census table (`adult.csv` with a header row).
    ///
    /// The sensitive attribute is `sex` (Male = 1, Female = -1) and the label
    /// is `income` (>50K = 1). Categorical columns are one-hot encoded and
    /// numeric columns are scaled to [-1, 1].
    pub fn load_adult(path: &Path, load_size: Option<usize>, seed: u64) -> Result<Self> {
        const CATEGORICAL: [&str; 6] = [
            "workclass",
            "education",
            "marital-status",
            "occupation",
            "relationship",
            "native-country",
        ];
        const NUMERIC: [&str; 6] = [
            "age",
            "education-num",
            "capital-gain",
            "capital-loss",
            "hours-per-week",
            "fnlwgt",
        ];

        let config = DatasetConfig {
            id: "adult".to_string(),
            name: "UCI Adult".to_string(),
            description: "Census income prediction, sensitive attribute sex".to_string(),
            source: "https://archive.ics.uci.edu/ml/datasets/adult".to_string(),
        };

        let file = File::open(path)
            .with_context(|| format!("Failed to open Adult file: {}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", path.display()))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let race_idx = headers.iter().position(|h| h == "race");
        let sex_idx = column_index(&headers, "sex")?;
        let income_idx = column_index(&headers, "income")?;
        let cat_idx = CATEGORICAL
            .iter()
            .map(|c| column_index(&headers, c))
            .collect::<Result<Vec<_>>>()?;
        let num_idx = NUMERIC
            .iter()
            .map(|c| column_index(&headers, c))
            .collect::<Result<Vec<_>>>()?;

        let mut categories: Vec<Vec<String>> = Vec::new();
        let mut numeric: Vec<Vec<f64>> = vec![Vec::new(); NUMERIC.len()];
        let mut labels = Vec::new();
        let mut sensitive = Vec::new();
        let mut skipped = 0usize;

        for (idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read record {} in {}", idx, path.display()))?;

            let missing = record
                .iter()
                .enumerate()
                .any(|(col, field)| Some(col) != race_idx && (field == "?" || field.is_empty()));
            if missing {
                skipped += 1;
                continue;
            }

            let sex = &record[sex_idx];
            sensitive.push(match sex {
                "Male" => 1.0,
                "Female" => -1.0,
                other => bail!("Record {}: unknown sex '{}'", idx, other),
            });

            let income = record[income_idx].trim_end_matches('.');
            labels.push(match income {
                ">50K" => 1.0,
                "<=50K" => -1.0,
                other => bail!("Record {}: unknown income '{}'", idx, other),
            });

            categories.push(
                CATEGORICAL
                    .iter()
                    .zip(&cat_idx)
                    .map(|(name, col)| adult_category(name, &record[*col]))
                    .collect(),
            );

            for (values, col) in numeric.iter_mut().zip(&num_idx) {
                let raw = &record[*col];
                values.push(
                    raw.parse::<f64>()
                        .with_context(|| format!("Record {}: column '{}' is not numeric: '{}'", idx, headers[*col], raw))?,
                );
            }
        }

        if skipped > 0 {
            tracing::info!("Dropped {} Adult records with missing values", skipped);
        }

        let mut feature_names = Vec::new();
        let mut columns: Vec<Vec<f64>> = Vec::new();

        for (pos, name) in CATEGORICAL.iter().enumerate() {
            let levels: BTreeSet<&str> = categories.iter().map(|row| row[pos].as_str()).collect();
            for level in levels {
                feature_names.push(format!("{}_{}", name, level));
                columns.push(
                    categories
                        .iter()
                        .map(|row| if row[pos] == level { 1.0 } else { 0.0 })
                        .collect(),
                );
            }
        }
        for (name, values) in NUMERIC.iter().zip(&numeric) {
            feature_names.push(name.to_string());
            columns.push(normalize_minmax(values).with_context(|| format!("Failed to scale column '{}'", name))?);
        }

        let features = (0..labels.len())
            .map(|row| columns.iter().map(|col| col[row]).collect())
            .collect();

        let dataset = Self {
            config,
            feature_names,
            features,
            labels,
            sensitive,
        };
        Ok(dataset.finalize(load_size, seed))
    }

    /// Load the UCI Credit Approval data (`crx.data`, no header).
    ///
    /// Columns are named `A1`..`A16`. The label is `A1`, the features are
    /// `A9`, `A10` and `A12`, and the sensitive attribute is `A16`. Rows
    /// with a missing value (`?`) in any of these columns are dropped.
    pub fn load_credit(path: &Path) -> Result<Self> {
        const LABEL: usize = 0;
        const FEATURES: [usize; 3] = [8, 9, 11];
        const SENSITIVE: usize = 15;

        let config = DatasetConfig {
            id: "credit".to_string(),
            name: "UCI Credit Approval".to_string(),
            description: "Credit card applications with anonymised attributes".to_string(),
            source: "https://archive.ics.uci.edu/ml/machine-learning-databases/credit-screening/crx.data"
                .to_string(),
        };

        let file = File::open(path)
            .with_context(|| format!("Failed to open Credit file: {}", path.display()))?;
        // short lines are skipped below instead of failing the whole load
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut features = Vec::new();
        let mut labels = Vec::new();
        let mut sensitive = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read record {} in {}", idx, path.display()))?;
            if record.len() < 16 {
                tracing::warn!("Skipping malformed line {} in {}: {} fields", idx, path.display(), record.len());
                continue;
            }

            let decoded: Option<Vec<f64>> = std::iter::once(LABEL)
                .chain(FEATURES)
                .chain(std::iter::once(SENSITIVE))
                .map(|col| credit_flag(&record[col]))
                .collect();
            let Some(decoded) = decoded else {
                continue;
            };

            labels.push(decoded[0]);
            features.push(decoded[1..4].to_vec());
            sensitive.push(decoded[4]);
        }

        Ok(Self {
            config,
            feature_names: FEATURES.iter().map(|c| format!("A{}", c + 1)).collect(),
            features,
            labels,
            sensitive,
        })
    }

    /// Generate a seeded synthetic dataset.
    ///
    /// Labels and the sensitive attribute are drawn independently; three
    /// features carry label signal and one carries group signal.
    pub fn load_synthetic(size: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let config = DatasetConfig {
            id: "synthetic".to_string(),
            name: "Synthetic Test Dataset".to_string(),
            description: "Generated dataset for pipeline testing".to_string(),
            source: "generated".to_string(),
        };

        let mut features = Vec::with_capacity(size);
        let mut labels = Vec::with_capacity(size);
        let mut sensitive = Vec::with_capacity(size);

        for _ in 0..size {
            let y: f64 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let s: f64 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let mut row: Vec<f64> = (0..3).map(|_| 0.5 * y + rng.gen_range(-1.0..1.0)).collect();
            row.push(0.5 * s + rng.gen_range(-1.0..1.0));

            features.push(row);
            labels.push(y);
            sensitive.push(s);
        }

        Self {
            config,
            feature_names: vec!["signal_0", "signal_1", "signal_2", "group_proxy"]
                .into_iter()
                .map(String::from)
                .collect(),
            features,
            labels,
            sensitive,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Subsample, drop all-zero columns and remove duplicate rows
    fn finalize(self, load_size: Option<usize>, seed: u64) -> Self {
        let mut dataset = match load_size {
            Some(size) => {
                tracing::info!("Loading only {} examples from the data", size);
                self.shuffled(seed).truncated(size)
            }
            None => self,
        };
        dataset.drop_zero_columns();
        dataset.deduplicate();
        dataset
    }

    fn select(&self, rows: &[usize]) -> Self {
        Self {
            config: self.config.clone(),
            feature_names: self.feature_names.clone(),
            features: rows.iter().map(|i| self.features[*i].clone()).collect(),
            labels: rows.iter().map(|i| self.labels[*i]).collect(),
            sensitive: rows.iter().map(|i| self.sensitive[*i]).collect(),
        }
    }

    /// Return a copy with rows in a seeded random order
    pub fn shuffled(&self, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(&mut rng);
        self.select(&order)
    }

    /// Keep only the first `size` rows
    pub fn truncated(mut self, size: usize) -> Self {
        self.features.truncate(size);
        self.labels.truncate(size);
        self.sensitive.truncate(size);
        self
    }

    /// Remove feature columns that are zero in every row
    pub fn drop_zero_columns(&mut self) {
        let keep: Vec<bool> = (0..self.num_features())
            .map(|col| self.features.iter().any(|row| row[col] != 0.0))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }

        let mut kept = keep.iter();
        self.feature_names.retain(|_| *kept.next().unwrap_or(&true));
        for row in &mut self.features {
            let mut kept = keep.iter();
            row.retain(|_| *kept.next().unwrap_or(&true));
        }
    }

    /// Remove rows whose features duplicate an earlier row.
    ///
    /// The first occurrence of each distinct feature row is kept and the
    /// result is ordered lexicographically by feature row.
    pub fn deduplicate(&mut self) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|a, b| compare_rows(&self.features[*a], &self.features[*b]));
        order.dedup_by(|b, a| compare_rows(&self.features[*a], &self.features[*b]) == Ordering::Equal);

        let removed = self.len() - order.len();
        if removed > 0 {
            tracing::debug!("Removed {} duplicate rows from {}", removed, self.config.id);
        }
        *self = self.select(&order);
    }

    /// Split into (train, test) after a seeded shuffle
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            bail!("test fraction must be in (0, 1), got {}", test_fraction);
        }

        let mut train = self.shuffled(seed);
        let test_len = (self.len() as f64 * test_fraction).round() as usize;
        let train_len = self.len() - test_len;
        if test_len == 0 || train_len == 0 {
            bail!(
                "cannot split {} rows with test fraction {}",
                self.len(),
                test_fraction
            );
        }

        let test = Self {
            config: self.config.clone(),
            feature_names: self.feature_names.clone(),
            features: train.features.split_off(train_len),
            labels: train.labels.split_off(train_len),
            sensitive: train.sensitive.split_off(train_len),
        };

        Ok((train, test))
    }

    /// Counts of rows per group and per group within the positive class
    pub fn group_stats(&self) -> GroupStats {
        let mut stats = GroupStats {
            total: self.len(),
            ..GroupStats::default()
        };
        for (s, y) in self.sensitive.iter().zip(&self.labels) {
            let positive = *y == 1.0;
            if *s == 1.0 {
                stats.reference += 1;
                stats.reference_positive += usize::from(positive);
            } else {
                stats.protected += 1;
                stats.protected_positive += usize::from(positive);
            }
        }
        stats
    }

    /// Get label distribution
    pub fn label_distribution(&self) -> HashMap<String, usize> {
        let mut dist = HashMap::new();
        for y in &self.labels {
            *dist.entry(format!("{:+}", y)).or_insert(0) += 1;
        }
        dist
    }
}

fn column_index(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("Missing column '{}'", name))
}

fn compare_rows(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Coarsen Adult categories the way the census studies do
fn adult_category(column: &str, value: &str) -> String {
    match (column, value) {
        ("native-country", "United-States") => "US".to_string(),
        ("native-country", _) => "NonUS".to_string(),
        ("education", "Preschool" | "1st-4th" | "5th-6th" | "7th-8th") => "prim-middle-school".to_string(),
        ("education", "9th" | "10th" | "11th" | "12th") => "high-school".to_string(),
        _ => value.to_string(),
    }
}

/// Decode a Credit Approval flag; `None` for a missing value
fn credit_flag(value: &str) -> Option<f64> {
    match value {
        "a" | "t" | "+" => Some(1.0),
        "b" | "f" | "-" => Some(-1.0),
        _ => None,
    }
}

/// Group composition of a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub total: usize,
    /// Rows with sensitive attribute +1
    pub reference: usize,
    /// Rows with sensitive attribute -1
    pub protected: usize,
    pub reference_positive: usize,
    pub protected_positive: usize,
}

impl GroupStats {
    pub fn reference_positive_fraction(&self) -> crate::Result<f64> {
        fraction(self.reference_positive, self.reference, "reference")
    }

    pub fn protected_positive_fraction(&self) -> crate::Result<f64> {
        fraction(self.protected_positive, self.protected, "protected")
    }

    /// Format as a human-readable summary
    pub fn format(&self) -> String {
        let percent = |f: crate::Result<f64>| f.map_or("-".to_string(), |v| format!("{:.1}%", v * 100.0));

        let mut out = String::new();
        let _ = writeln!(out, "Total data points: {}", self.total);
        let _ = writeln!(out, "# non-protected examples: {}", self.reference);
        let _ = writeln!(out, "# protected examples: {}", self.protected);
        let _ = writeln!(
            out,
            "# non-protected examples in positive class: {} ({})",
            self.reference_positive,
            percent(self.reference_positive_fraction())
        );
        let _ = writeln!(
            out,
            "# protected examples in positive class: {} ({})",
            self.protected_positive,
            percent(self.protected_positive_fraction())
        );
        out
    }
}

fn fraction(count: usize, group: usize, name: &str) -> crate::Result<f64> {
    if group == 0 {
        return Err(crate::FairnessError::DegenerateInput(format!("{} group is empty", name)));
    }
    Ok(count as f64 / group as f64)
}
