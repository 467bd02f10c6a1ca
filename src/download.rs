// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Dataset download utility for the evaluation pipeline
//!
//! Downloads the UCI datasets:
//! - Adult: census income (written as `adult/adult.csv` with a header row)
//! - Credit: credit card approval (`credit/crx.data`)
//!
//! CelebA must be fetched by hand; instructions are printed.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "download-datasets")]
#[command(about = "Download evaluation datasets")]
#[command(version)]
struct Args {
    /// Datasets to download (comma-separated: adult,credit,celeba or 'all')
    #[arg(short, long, default_value = "all")]
    datasets: String,

    /// Output directory
    #[arg(short, long, default_value = "data")]
    output: PathBuf,

    /// Force re-download even if files exist
    #[arg(short, long)]
    force: bool,
}

struct DatasetDownload {
    id: &'static str,
    name: &'static str,
    url: &'static str,
    filename: &'static str,
    post_process: PostProcess,
}

#[derive(Clone, Copy)]
enum PostProcess {
    /// Trim `", "` separators and prepend a header row
    AddHeader(&'static str, &'static str),
    None,
}

const ADULT_HEADER: &str = "age,workclass,fnlwgt,education,education-num,marital-status,occupation,\
relationship,race,sex,capital-gain,capital-loss,hours-per-week,native-country,income";

const DATASETS: &[DatasetDownload] = &[
    DatasetDownload {
        id: "adult",
        name: "UCI Adult",
        url: "https://archive.ics.uci.edu/ml/machine-learning-databases/adult/adult.data",
        filename: "adult.data",
        post_process: PostProcess::AddHeader(ADULT_HEADER, "adult.csv"),
    },
    DatasetDownload {
        id: "credit",
        name: "UCI Credit Approval",
        url: "https://archive.ics.uci.edu/ml/machine-learning-databases/credit-screening/crx.data",
        filename: "crx.data",
        post_process: PostProcess::None,
    },
];

fn download_file(url: &str, output_path: &Path) -> Result<()> {
    tracing::info!("Downloading from: {}", url);

    let response = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(600))
        .build()?
        .get(url)
        .send()
        .context("Failed to send request")?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status: {}", response.status());
    }

    let total_size = response.content_length().unwrap_or(0);
    copy_with_progress(response, total_size, output_path)?;
    Ok(())
}

/// Stream `reader` into `output_path`, advancing a progress bar per chunk
fn copy_with_progress(reader: impl Read, total_size: u64, output_path: &Path) -> Result<u64> {
    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let mut file = File::create(output_path).context("Failed to create output file")?;
    let mut reader = pb.wrap_read(reader);
    let written = std::io::copy(&mut reader, &mut file).context("Failed to read response")?;

    pb.finish_with_message("Downloaded");
    Ok(written)
}

/// Rewrite a raw UCI file as CSV with a header; blank lines are dropped
fn add_header(raw_path: &Path, header: &str, output_path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(raw_path)
        .with_context(|| format!("Failed to read {}", raw_path.display()))?;

    let mut out = String::with_capacity(raw.len() + header.len() + 1);
    out.push_str(header);
    out.push('\n');
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    std::fs::write(output_path, out)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    Ok(())
}

fn download_dataset(dataset: &DatasetDownload, output_dir: &Path, force: bool) -> Result<()> {
    tracing::info!("Processing dataset: {} ({})", dataset.name, dataset.id);

    let dataset_dir = output_dir.join(dataset.id);
    let raw_path = dataset_dir.join(dataset.filename);

    if raw_path.exists() && !force {
        tracing::info!("Dataset already present: {}", raw_path.display());
        tracing::info!("Use --force to re-download");
        return Ok(());
    }

    std::fs::create_dir_all(&dataset_dir)?;
    download_file(dataset.url, &raw_path)?;

    match dataset.post_process {
        PostProcess::AddHeader(header, target) => add_header(&raw_path, header, &dataset_dir.join(target))?,
        PostProcess::None => {}
    }

    tracing::info!("Dataset ready: {}", dataset_dir.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!("Dataset Download Utility");
    tracing::info!("========================");

    std::fs::create_dir_all(&args.output)?;

    let requested: Vec<&str> = if args.datasets == "all" {
        DATASETS.iter().map(|d| d.id).chain(std::iter::once("celeba")).collect()
    } else {
        args.datasets.split(',').map(|s| s.trim()).collect()
    };

    for dataset in DATASETS {
        if requested.contains(&dataset.id) {
            if let Err(e) = download_dataset(dataset, &args.output, args.force) {
                tracing::error!("Failed to download {}: {:#}", dataset.id, e);
                tracing::info!("Manual download instructions for {}:", dataset.name);
                tracing::info!("  1. Visit: {}", dataset.url);
                tracing::info!("  2. Save to: {}/{}/{}", args.output.display(), dataset.id, dataset.filename);
            }
        }
    }

    // Print instructions for datasets requiring manual download
    if requested.iter().any(|&d| d == "celeba") {
        println!("\n{}", "=".repeat(60));
        println!("CelebA Dataset - Manual Download Required");
        println!("{}", "=".repeat(60));
        println!("\nThe CelebA attribute table requires manual download:");
        println!("  1. Visit: http://mmlab.ie.cuhk.edu.hk/projects/CelebA.html");
        println!("  2. Download 'list_attr_celeba' from the Anno folder");
        println!("  3. Convert it to ';'-separated CSV with a 'picture_ID' first column");
        println!("  4. Save to: {}/celebA/list_attr_celeba.csv\n", args.output.display());
    }

    println!("\n{}", "=".repeat(60));
    println!("Dataset Preparation Complete");
    println!("{}", "=".repeat(60));
    println!("\nAvailable datasets in {}:", args.output.display());

    for entry in std::fs::read_dir(&args.output)?.flatten() {
        if entry.path().is_dir() {
            println!("  - {}", entry.file_name().to_string_lossy());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_header_normalizes_separators() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("adult.data");
        let csv = dir.path().join("adult.csv");
        std::fs::write(&raw, "39, State-gov, 77516\n\n50, Private, 83311\n").unwrap();

        add_header(&raw, "age,workclass,fnlwgt", &csv).unwrap();
        let written = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(written, "age,workclass,fnlwgt\n39,State-gov,77516\n50,Private,83311\n");
    }

    #[test]
    fn test_copy_with_progress_streams_whole_body() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("crx.data");
        // larger than one copy buffer so the bar advances more than once
        let body: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

        let written = copy_with_progress(std::io::Cursor::new(body.clone()), body.len() as u64, &out).unwrap();
        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&out).unwrap(), body);
    }

    #[test]
    fn test_copy_with_progress_unknown_length() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("adult.data");

        let written = copy_with_progress(&b"39, State-gov\n"[..], 0, &out).unwrap();
        assert_eq!(written, 14);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "39, State-gov\n");
    }
}
