//! train_model - build the fingerprint model artifact
//!
//! Fetches identities and their reference images from the Identity
//! Directory Service, extracts one encoding per image through the oracle,
//! and writes the model artifact that sentryd loads and hot-reloads.
//! Can be invoked standalone or from an admin backend as a subprocess.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use gate_sentry::{save_artifact, train_from_profiles, DirectoryClient, StubOracle};

#[derive(Parser, Debug)]
#[command(name = "train_model", about = "Train the face fingerprint model")]
struct Args {
    /// Identity Directory Service base URL
    #[arg(long, env = "SENTRY_DIRECTORY_URL", default_value = "http://127.0.0.1:8000/api")]
    directory_url: String,

    /// Output path for the model artifact
    #[arg(long, env = "SENTRY_MODEL_PATH", default_value = "face_model.json")]
    model_path: PathBuf,

    /// Per-request timeout in seconds for directory and image fetches
    #[arg(long, default_value_t = 3)]
    timeout_secs: u64,

    /// Maximum thumbnail side for reference images before extraction
    #[arg(long, default_value_t = 512)]
    thumbnail_max: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    log::info!("fetching identities from {}", args.directory_url);
    let client = DirectoryClient::new(
        &args.directory_url,
        Duration::from_secs(args.timeout_secs),
        args.thumbnail_max,
    );
    let profiles = client.fetch_identities()?;
    if profiles.is_empty() {
        return Err(anyhow!("identity directory returned no identities"));
    }

    let mut oracle = StubOracle::new();
    let (artifact, report) = train_from_profiles(&profiles, &mut oracle)?;

    if report.successful_encodings == 0 {
        return Err(anyhow!(
            "training produced no encodings ({} images across {} identities)",
            report.total_images,
            report.identities
        ));
    }
    save_artifact(&artifact, &args.model_path)?;

    println!("{}", "=".repeat(60));
    println!("MODEL TRAINED");
    println!("{}", "=".repeat(60));
    println!(
        "Encoded:    {}/{} images",
        report.successful_encodings, report.total_images
    );
    println!("Identities: {}", report.identities);
    println!("Artifact:   {}", args.model_path.display());
    println!("{}", "=".repeat(60));

    Ok(())
}
