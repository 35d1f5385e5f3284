use std::{path::PathBuf, process::ExitCode};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{AdversarialSession, ClientError};
use tracing::{info, warn};

mod config;
mod render;

use config::{load_settings, Settings};
use render::{notice_text, report_text, status_line, write_adversarial_image, GenerationReport};

#[derive(Parser, Debug)]
#[command(about = "Request FGSM adversarial examples from a generation service")]
struct Cli {
    /// Settings file; `adversarial.toml` in the working directory is read when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    service_url: Option<String>,
    /// Per-request timeout in seconds, 0 to wait indefinitely.
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the service liveness endpoint.
    Status,
    /// Upload a digit image and compare predictions before and after the attack.
    Generate {
        #[arg(long)]
        image: PathBuf,
        /// Attack strength in [0, 0.5]; out-of-range values are clamped.
        #[arg(long)]
        epsilon: Option<f64>,
        /// Where to write the adversarial image.
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ClientError>() {
                Some(client_err) => eprintln!("{}", notice_text(&client_err.to_notice())),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(url) = cli.service_url {
        settings.service_url = url;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.request_timeout_secs = secs;
    }

    match cli.command {
        Command::Status => run_status(&settings).await,
        Command::Generate {
            image,
            epsilon,
            output,
            json,
        } => run_generate(&settings, image, epsilon, output, json).await,
    }
}

async fn run_status(settings: &Settings) -> Result<()> {
    let session = AdversarialSession::connect(&settings.service_url, settings.request_timeout())?;
    let status = session.initialize().await;
    println!("{}", status_line(&status));
    if !status.is_connected() {
        bail!("generation service at {} is unreachable", settings.service_url);
    }
    Ok(())
}

async fn run_generate(
    settings: &Settings,
    image: PathBuf,
    epsilon: Option<f64>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let session = AdversarialSession::connect(&settings.service_url, settings.request_timeout())?;
    let status = session.initialize().await;
    if !status.is_connected() {
        warn!(service_url = %settings.service_url, "service did not answer the liveness probe; trying anyway");
    }

    let uploaded = session.ingestor().ingest_path(&image).await?;
    let strength = session
        .parameters()
        .set_strength(epsilon.unwrap_or(settings.default_epsilon))
        .await;

    let result = session.generate().await?;

    let report = GenerationReport {
        service_status: &status,
        file_name: uploaded.file_name(),
        epsilon: strength,
        prediction_changed: result.label_flipped(),
        result: &result,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", status_line(&status));
        println!("{}", report_text(&report));
    }

    if let Some(path) = output {
        write_adversarial_image(&result, &path).await?;
        info!(path = %path.display(), "adversarial image written");
    }
    Ok(())
}
