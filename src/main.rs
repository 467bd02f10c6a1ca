// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Fairness evaluation CLI
//!
//! Usage:
//!   fair-eval --dataset synthetic --seed 42
//!   fair-eval --dataset adult --path ./data/adult/adult.csv --load-size 5000

use anyhow::{bail, Result};
use clap::Parser;
use fair_eval::pipeline::{EvaluationConfig, EvaluationPipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fair-eval")]
#[command(about = "Evaluate accuracy and fairness of binary classifiers")]
#[command(version)]
struct Args {
    /// Dataset to evaluate on (synthetic, celeba, adult, credit)
    #[arg(short, long, default_value = "synthetic")]
    dataset: String,

    /// Path to the dataset file
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Number of rows to subsample (all rows if omitted)
    #[arg(short, long)]
    load_size: Option<usize>,

    /// Share of rows held out for evaluation
    #[arg(short, long, default_value_t = 0.2)]
    test_fraction: f64,

    /// Specific classifiers to run (comma-separated, empty = all)
    #[arg(short, long)]
    classifiers: Option<String>,

    /// Output directory for results
    #[arg(short, long, default_value = "results")]
    output: PathBuf,

    /// Output format (json, markdown, both)
    #[arg(short, long, default_value = "both")]
    format: String,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if !matches!(args.format.as_str(), "json" | "markdown" | "both") {
        bail!("unknown output format '{}'", args.format);
    }

    tracing::info!("Fairness Evaluation Pipeline");
    tracing::info!("============================");
    tracing::info!("Dataset: {}", args.dataset);
    tracing::info!("Seed: {}", args.seed);

    let classifier_names: Vec<String> = args
        .classifiers
        .map(|c| c.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();

    let config = EvaluationConfig {
        seed: args.seed,
        dataset_id: args.dataset.clone(),
        dataset_path: args.path.map(|p| p.to_string_lossy().to_string()),
        load_size: args.load_size,
        test_fraction: args.test_fraction,
        classifier_names,
        output_dir: args.output.to_string_lossy().to_string(),
    };

    let mut pipeline = EvaluationPipeline::new(config);
    let results = pipeline.run()?;

    // Print summary to console
    println!("\n{}", "=".repeat(70));
    println!("EVALUATION SUMMARY");
    println!("{}", "=".repeat(70));
    println!(
        "\nMost accurate: {} (Accuracy={:.4})",
        results.summary.best_model, results.summary.best_accuracy
    );
    println!(
        "Fairest:       {} (DDP={:+.4})",
        results.summary.fairest_model, results.summary.fairest_ddp
    );
    println!("\nClassifier Comparison:");
    println!("{:-<70}", "");
    println!("{:<12} {:>10} {:>10} {:>10} {:>12} {:>12}", "Model", "Accuracy", "DDP", "DEO", "DDP upper", "DDP lower");
    println!("{:-<70}", "");

    for result in &results.model_results {
        let m = &result.metrics;
        println!(
            "{:<12} {:>10.4} {:>+10.4} {:>+10.4} {:>+12.4} {:>+12.4}",
            result.model_name, m.accuracy, m.fairness.ddp, m.fairness.deo, m.upper_bound, m.lower_bound
        );
    }
    println!("{:-<70}", "");

    // Save outputs
    std::fs::create_dir_all(&args.output)?;

    if args.format == "json" || args.format == "both" {
        let json_path = EvaluationPipeline::output_path(&results, "json");
        EvaluationPipeline::save_results(&results, &json_path)?;
        println!("\nJSON results saved to: {}", json_path.display());
    }

    if args.format == "markdown" || args.format == "both" {
        let report = EvaluationPipeline::generate_report(&results);
        let md_path = EvaluationPipeline::output_path(&results, "md");
        std::fs::write(&md_path, report)?;
        println!("Markdown report saved to: {}", md_path.display());
    }

    println!("\nEvaluation complete!");

    Ok(())
}
