//! quark_transfer - Save Quark drive share links into your own account.
//!
//! This library provides functionality to:
//! - Parse and validate Quark share URLs
//! - Save the files behind a share into a destination folder, driving the
//!   vendor's asynchronous copy jobs to completion
//! - Republish the saved files as fresh share links
//!
//! # Example
//!
//! ```no_run
//! use quark_transfer::{Config, QuarkClient, TransferOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = QuarkClient::new("kps=...; sign=...; vcode=...", Config::default())?;
//!
//!     let options = TransferOptions::new("/incoming").with_share_links(true);
//!     let summary = quark_transfer::transfer_share(
//!         &client,
//!         "https://pan.quark.cn/s/abc123?pwd=xyz",
//!         &options,
//!     )
//!     .await?;
//!
//!     for link in &summary.share_links {
//!         println!("{} -> {}", link.name, link.share_url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod poller;
pub mod transfer;
pub mod url_parser;

// Re-exports for convenience
pub use client::QuarkClient;
pub use config::Config;
pub use error::{QuarkError, Result};
pub use models::{RemoteFile, ShareLink, TransferSummary};
pub use transfer::{transfer_share, TransferOptions};
pub use url_parser::{parse_share_url, validate_share_url, ShareDescriptor};
