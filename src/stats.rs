// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Print group composition of a dataset
//!
//! Shows how many rows fall in each sensitive group and how many of them
//! belong to the positive class.

use anyhow::Result;
use clap::Parser;
use fair_eval::datasets::Dataset;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dataset-stats")]
#[command(about = "Show group statistics of a dataset")]
#[command(version)]
struct Args {
    /// Dataset to inspect (synthetic, celeba, adult, credit)
    #[arg(short, long, default_value = "synthetic")]
    dataset: String,

    /// Path to the dataset file
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Random seed used when subsampling
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Number of rows to subsample
    #[arg(short, long)]
    load_size: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let dataset = Dataset::load(&args.dataset, args.path.as_deref(), args.load_size, args.seed)?;

    println!("\nDataset: {}", dataset.config.name);
    println!("  Source: {}", dataset.config.source);
    println!("  Features: {}", dataset.num_features());
    println!();
    print!("{}", dataset.group_stats().format());

    println!("\nLabel distribution:");
    let mut dist: Vec<_> = dataset.label_distribution().into_iter().collect();
    dist.sort();
    for (label, count) in dist {
        println!("  {}: {} ({:.1}%)", label, count, count as f64 / dataset.len() as f64 * 100.0);
    }

    Ok(())
}
