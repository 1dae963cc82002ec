//! quark_transfer CLI - Save Quark share links into your own account.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quark_transfer::models::format_size;
use quark_transfer::{
    transfer_share, validate_share_url, Config, QuarkClient, QuarkError, TransferOptions,
};

/// CLI tool for transferring Quark drive share links.
#[derive(Parser)]
#[command(name = "quark_transfer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Session cookie of the destination account.
    #[arg(long, env = "QUARK_COOKIE", hide_env_values = true)]
    cookie: String,

    /// Optional JSON config file (base URLs, timeouts, retry policy).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the files behind a share link into this account.
    Transfer {
        /// Share URL, e.g. https://pan.quark.cn/s/abc123?pwd=xyz
        url: String,

        /// Destination folder path; defaults to the configured save path.
        #[arg(long, short = 'p')]
        save_path: Option<String>,

        /// Republish every saved file as a new share link.
        #[arg(long)]
        share: bool,
    },

    /// Parse a share link offline and report what it contains.
    Validate {
        /// Share URL to check.
        url: String,
    },

    /// Show the account identity behind the cookie.
    Account,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            // Caller-input problems exit 2 so scripts can tell them apart
            // from server or transport failures.
            let client_error = err
                .chain()
                .filter_map(|cause| cause.downcast_ref::<QuarkError>())
                .any(|quark_err| quark_err.is_client_error());
            if client_error {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Transfer {
            url,
            save_path,
            share,
        } => {
            let save_path = save_path.unwrap_or_else(|| config.default_save_path.clone());
            let client = QuarkClient::new(&cli.cookie, config)?;

            let account = client
                .account_info()
                .await
                .context("Cookie was rejected by the account endpoint")?;
            println!("Signed in as: {}", account.nickname);

            let options = TransferOptions::new(save_path).with_share_links(share);
            let summary = transfer_share(&client, &url, &options)
                .await
                .context("Transfer failed")?;

            println!("Saved {} file(s):", summary.file_count);
            for file in &summary.saved_files {
                println!(
                    "  {:<10} {:<10} {}",
                    format_size(file.size),
                    file.category,
                    file.name
                );
            }

            if share {
                for link in &summary.share_links {
                    println!("{} -> {}", link.name, link.share_url);
                }
                for failure in &summary.share_failures {
                    eprintln!("Share link failed for {}: {}", failure.name, failure.error);
                }
            }
        }

        Commands::Validate { url } => {
            let report = validate_share_url(&url);
            match report.data {
                Some(descriptor) => {
                    println!("Valid share link");
                    println!("  share id:  {}", descriptor.share_id);
                    if !descriptor.passcode.is_empty() {
                        println!("  passcode:  {}", descriptor.passcode);
                    }
                    println!("  folder id: {}", descriptor.target_dir_fid);
                    for crumb in &descriptor.breadcrumbs {
                        println!("  crumb:     {} ({})", crumb.name, crumb.fid);
                    }
                }
                None => anyhow::bail!(
                    "Invalid share link: {}",
                    report.error.unwrap_or_else(|| "unknown".to_string())
                ),
            }
        }

        Commands::Account => {
            let client = QuarkClient::new(&cli.cookie, config)?;
            let account = client
                .account_info()
                .await
                .context("Cookie was rejected by the account endpoint")?;
            println!("{}", account.nickname);
        }
    }

    Ok(())
}
