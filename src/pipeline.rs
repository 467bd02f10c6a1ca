// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Reproducible fairness evaluation pipeline
//!
//! Orchestrates:
//! - Dataset loading and train/test splitting
//! - Classifier fitting and scoring
//! - Accuracy, DDP, DEO and relaxation metrics
//! - Results serialization and markdown reporting

use crate::classifiers::{all_classifiers, FairClassifier};
use crate::datasets::{Dataset, GroupStats};
use crate::metrics::{FairnessMetrics, Relaxation};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration for the evaluation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Dataset to evaluate on ("synthetic", "celeba", "adult", "credit")
    pub dataset_id: String,
    /// Path to the dataset file (required except for "synthetic")
    pub dataset_path: Option<String>,
    /// Number of rows to subsample before splitting
    pub load_size: Option<usize>,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// Specific classifiers to run (empty = all)
    pub classifier_names: Vec<String>,
    /// Output directory for results
    pub output_dir: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            dataset_id: "synthetic".to_string(),
            dataset_path: None,
            load_size: None,
            test_fraction: 0.2,
            classifier_names: vec![],
            output_dir: "results".to_string(),
        }
    }
}

/// Results from a single classifier evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResult {
    pub model_name: String,
    pub model_description: String,
    pub metrics: FairnessMetrics,
    pub training_samples: usize,
    pub eval_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
    pub total_samples: usize,
    pub num_features: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    pub group_stats: GroupStats,
    pub label_distribution: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// Most accurate classifier
    pub best_model: String,
    pub best_accuracy: f64,
    /// Classifier with the smallest absolute DDP
    pub fairest_model: String,
    pub fairest_ddp: f64,
}

/// Complete evaluation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub config: EvaluationConfig,
    pub dataset_info: DatasetInfo,
    pub model_results: Vec<ModelResult>,
    pub summary: EvaluationSummary,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Main evaluation pipeline
pub struct EvaluationPipeline {
    config: EvaluationConfig,
    dataset: Option<Dataset>,
}

impl EvaluationPipeline {
    pub fn new(config: EvaluationConfig) -> Self {
        Self {
            config,
            dataset: None,
        }
    }

    /// Use an already loaded dataset instead of loading from configuration
    pub fn with_dataset(config: EvaluationConfig, dataset: Dataset) -> Self {
        Self {
            config,
            dataset: Some(dataset),
        }
    }

    /// Load dataset based on configuration
    pub fn load_dataset(&mut self) -> Result<()> {
        let path = self.config.dataset_path.as_deref().map(Path::new);
        tracing::info!(
            "Loading {} dataset{}",
            self.config.dataset_id,
            path.map(|p| format!(" from {}", p.display())).unwrap_or_default()
        );

        let dataset = Dataset::load(&self.config.dataset_id, path, self.config.load_size, self.config.seed)
            .with_context(|| format!("Failed to load dataset '{}'", self.config.dataset_id))?;

        tracing::info!(
            "Dataset loaded: {} samples, {} features",
            dataset.len(),
            dataset.num_features()
        );

        self.dataset = Some(dataset);
        Ok(())
    }

    /// Fit one classifier on the train split and score it on the test split
    pub fn evaluate_model(classifier: &mut dyn FairClassifier, train: &Dataset, test: &Dataset) -> Result<ModelResult> {
        classifier
            .fit(&train.features, &train.labels, &train.sensitive)
            .with_context(|| format!("Failed to fit {}", classifier.name()))?;

        let scores = classifier.predict(&test.features);
        let metrics = FairnessMetrics::from_scores(&scores, &test.labels, &test.sensitive)
            .with_context(|| format!("Failed to evaluate {}", classifier.name()))?;

        Ok(ModelResult {
            model_name: classifier.name().to_string(),
            model_description: classifier.description().to_string(),
            metrics,
            training_samples: train.len(),
            eval_samples: test.len(),
        })
    }

    /// Run the full evaluation pipeline
    pub fn run(&mut self) -> Result<EvaluationResults> {
        if self.dataset.is_none() {
            self.load_dataset()?;
        }
        let Some(dataset) = self.dataset.as_ref() else {
            anyhow::bail!("no dataset loaded");
        };

        let (train, test) = dataset.train_test_split(self.config.test_fraction, self.config.seed)?;
        let group_stats = dataset.group_stats();
        tracing::info!("Group statistics:\n{}", group_stats.format());

        let dataset_info = DatasetInfo {
            id: dataset.config.id.clone(),
            name: dataset.config.name.clone(),
            total_samples: dataset.len(),
            num_features: dataset.num_features(),
            train_samples: train.len(),
            test_samples: test.len(),
            group_stats,
            label_distribution: dataset.label_distribution(),
        };

        let mut model_results = Vec::new();
        for mut classifier in all_classifiers(self.config.seed) {
            let name = classifier.name().to_string();

            // Filter if specific classifiers requested
            if !self.config.classifier_names.is_empty()
                && !self.config.classifier_names.iter().any(|n| n.eq_ignore_ascii_case(&name))
            {
                continue;
            }

            tracing::info!("Evaluating classifier: {}", name);
            let result = Self::evaluate_model(classifier.as_mut(), &train, &test)?;

            tracing::info!(
                "  {} - Accuracy: {:.4}, DDP: {:+.4}, DEO: {:+.4}",
                result.model_name,
                result.metrics.accuracy,
                result.metrics.fairness.ddp,
                result.metrics.fairness.deo
            );

            model_results.push(result);
        }

        if model_results.is_empty() {
            anyhow::bail!("no classifier matched {:?}", self.config.classifier_names);
        }

        let summary = Self::summarize(&model_results);

        Ok(EvaluationResults {
            config: self.config.clone(),
            dataset_info,
            model_results,
            summary,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    fn summarize(results: &[ModelResult]) -> EvaluationSummary {
        let mut summary = EvaluationSummary {
            best_model: "None".to_string(),
            best_accuracy: f64::NEG_INFINITY,
            fairest_model: "None".to_string(),
            fairest_ddp: f64::INFINITY,
        };

        for r in results {
            if r.metrics.accuracy > summary.best_accuracy {
                summary.best_accuracy = r.metrics.accuracy;
                summary.best_model = r.model_name.clone();
            }
            if r.metrics.fairness.ddp.abs() < summary.fairest_ddp.abs() {
                summary.fairest_ddp = r.metrics.fairness.ddp;
                summary.fairest_model = r.model_name.clone();
            }
        }

        summary
    }

    /// Save results to JSON file
    pub fn save_results(results: &EvaluationResults, output_path: &Path) -> Result<()> {
        std::fs::create_dir_all(output_path.parent().unwrap_or(Path::new(".")))?;
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        tracing::info!("Results saved to {}", output_path.display());
        Ok(())
    }

    /// Path of a results file for this run, e.g. `results/eval_adult_20240101_120000.json`
    pub fn output_path(results: &EvaluationResults, extension: &str) -> PathBuf {
        Path::new(&results.config.output_dir).join(format!(
            "eval_{}_{}.{}",
            results.dataset_info.id,
            results.timestamp.format("%Y%m%d_%H%M%S"),
            extension
        ))
    }

    /// Generate a markdown report
    pub fn generate_report(results: &EvaluationResults) -> String {
        let mut report = String::new();

        report.push_str("# Fairness Evaluation Report\n\n");
        report.push_str(&format!("**Generated:** {}\n\n", results.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
        report.push_str(&format!("**Version:** {}\n\n", results.version));

        let info = &results.dataset_info;
        report.push_str("## Dataset\n\n");
        report.push_str(&format!("- **ID:** {}\n", info.id));
        report.push_str(&format!("- **Name:** {}\n", info.name));
        report.push_str(&format!("- **Total Samples:** {}\n", info.total_samples));
        report.push_str(&format!("- **Features:** {}\n", info.num_features));
        report.push_str(&format!("- **Split Sizes:** Train={}, Test={}\n\n", info.train_samples, info.test_samples));
        report.push_str(&format!("```\n{}```\n\n", info.group_stats.format()));

        report.push_str("## Summary\n\n");
        report.push_str(&format!(
            "**Most Accurate:** {} (Accuracy={:.4})\n\n",
            results.summary.best_model, results.summary.best_accuracy
        ));
        report.push_str(&format!(
            "**Fairest:** {} (DDP={:+.4})\n\n",
            results.summary.fairest_model, results.summary.fairest_ddp
        ));

        report.push_str("### Classifier Comparison\n\n");
        report.push_str("| Model | Accuracy | DDP | DEO |");
        for kind in Relaxation::ALL {
            report.push_str(&format!(" {} |", kind.name()));
        }
        report.push_str("\n|-------|----------|-----|-----|");
        for _ in Relaxation::ALL {
            report.push_str("-----|");
        }
        report.push('\n');

        for result in &results.model_results {
            let m = &result.metrics;
            report.push_str(&format!(
                "| {} | {:.4} | {:+.4} | {:+.4} |",
                result.model_name, m.accuracy, m.fairness.ddp, m.fairness.deo
            ));
            for kind in Relaxation::ALL {
                report.push_str(&format!(" {:+.4} |", m.relaxation(kind)));
            }
            report.push('\n');
        }

        report.push_str("\n## Detailed Results\n\n");

        for result in &results.model_results {
            report.push_str(&format!("### {}\n\n", result.model_name));
            report.push_str(&format!("*{}*\n\n", result.model_description));
            report.push_str(&format!("- Training samples: {}\n", result.training_samples));
            report.push_str(&format!("- Evaluation samples: {}\n\n", result.eval_samples));
            report.push_str(&format!("```\n{}\n```\n\n", result.metrics.format()));
        }

        report.push_str("## Configuration\n\n");
        report.push_str(&format!(
            "```json\n{}\n```\n",
            serde_json::to_string_pretty(&results.config).unwrap_or_default()
        ));

        report
    }
}
