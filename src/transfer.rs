//! Transfer orchestration: drive a share link through token exchange,
//! listing, batched saving, post-save lookup, and optional re-sharing.

use crate::client::{QuarkClient, SAVE_BATCH_SIZE};
use crate::error::{QuarkError, Result};
use crate::models::{SavedFile, ShareFailure, ShareLink, TaskData, TransferSummary};
use crate::url_parser;

/// Caller-tunable knobs for one transfer run.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Destination folder path inside the caller's account.
    pub save_path: String,
    /// Whether to republish every saved file as a fresh share link.
    pub create_share_links: bool,
}

impl TransferOptions {
    pub fn new(save_path: impl Into<String>) -> Self {
        Self {
            save_path: save_path.into(),
            create_share_links: false,
        }
    }

    pub fn with_share_links(mut self, create: bool) -> Self {
        self.create_share_links = create;
        self
    }
}

/// Save everything behind `share_url` into the caller's account.
///
/// Batches of at most [`SAVE_BATCH_SIZE`] files are submitted strictly in
/// sequence; each batch's copy job is polled to completion before the next
/// one is submitted, because the vendor serializes writes into one
/// destination folder. A failed batch aborts the run: batches that already
/// finished stay saved server-side, and the abort log says how many.
///
/// Re-sharing is best-effort per file; individual failures are collected in
/// the summary instead of aborting.
///
/// There is no cancellation token; dropping the returned future abandons
/// the run after the current request.
pub async fn transfer_share(
    client: &QuarkClient,
    share_url: &str,
    options: &TransferOptions,
) -> Result<TransferSummary> {
    let descriptor = url_parser::parse_share_url(share_url)?;
    tracing::info!(share_id = %descriptor.share_id, "share link resolved");

    let stoken = client
        .share_token(&descriptor.share_id, &descriptor.passcode)
        .await?;

    let files = client
        .list_share_contents(&descriptor.share_id, &stoken, &descriptor.target_dir_fid)
        .await?;
    if files.is_empty() {
        return Err(QuarkError::NoFilesFound);
    }
    tracing::info!(count = files.len(), "share contents listed");

    let to_dir_fid = client.save_dir_fid(&options.save_path).await?;
    tracing::info!(%to_dir_fid, save_path = %options.save_path, "destination folder ready");

    let fids: Vec<String> = files.iter().map(|f| f.fid.clone()).collect();
    let tokens: Vec<String> = files.iter().map(|f| f.share_fid_token.clone()).collect();

    let total_batches = fids.len().div_ceil(SAVE_BATCH_SIZE);
    let mut task_results: Vec<TaskData> = Vec::with_capacity(total_batches);

    for (index, (fid_batch, token_batch)) in fids
        .chunks(SAVE_BATCH_SIZE)
        .zip(tokens.chunks(SAVE_BATCH_SIZE))
        .enumerate()
    {
        let batch = index + 1;
        tracing::info!(batch, total_batches, files = fid_batch.len(), "submitting save batch");

        let outcome = async {
            let task_id = client
                .submit_save(
                    fid_batch,
                    token_batch,
                    &to_dir_fid,
                    &descriptor.share_id,
                    &stoken,
                )
                .await?;
            client.wait_for_save(&task_id).await
        }
        .await;

        match outcome {
            Ok(result) => task_results.push(result),
            Err(err) => {
                tracing::error!(
                    batch,
                    total_batches,
                    completed_batches = task_results.len(),
                    error = %err,
                    "save batch failed, aborting; earlier batches remain saved"
                );
                return Err(err);
            }
        }
        tracing::info!(batch, total_batches, "save batch finished");
    }

    let mut saved_files: Vec<SavedFile> = files
        .iter()
        .map(|f| SavedFile {
            name: f.file_name.clone(),
            size: f.size,
            category: f.category().to_string(),
            fid: None,
        })
        .collect();

    apply_saved_fids(client, &task_results, &mut saved_files).await;

    let (share_links, share_failures) = if options.create_share_links {
        share_saved_files(client, &saved_files, &options.save_path).await
    } else {
        (Vec::new(), Vec::new())
    };

    Ok(TransferSummary {
        file_count: files.len(),
        task_results,
        saved_files,
        share_links,
        share_failures,
    })
}

/// The save job reports the fids it created at the destination; pair them
/// with the saved files and recover the final names from the recent-files
/// listing (the vendor may rename on collision). A failed lookup keeps the
/// share-listed names; the transfer itself already succeeded.
async fn apply_saved_fids(
    client: &QuarkClient,
    task_results: &[TaskData],
    saved_files: &mut [SavedFile],
) {
    let saved_fids: Vec<String> = task_results
        .iter()
        .filter_map(|r| r.save_as.as_ref())
        .flat_map(|s| s.save_as_top_fids.iter().cloned())
        .collect();
    if saved_fids.is_empty() {
        return;
    }

    let recent = match client.list_recent_files().await {
        Ok(recent) => recent,
        Err(err) => {
            tracing::warn!(error = %err, "post-save lookup failed, keeping share-listed names");
            return;
        }
    };

    for (slot, fid) in saved_files.iter_mut().zip(saved_fids) {
        if let Some(entry) = recent.iter().find(|r| r.fid == fid) {
            slot.name = entry.file_name.clone();
        }
        slot.fid = Some(fid);
    }
}

/// Publish a share link for each saved file. Failures are recorded per
/// file and do not stop the remaining files.
async fn share_saved_files(
    client: &QuarkClient,
    saved_files: &[SavedFile],
    save_path: &str,
) -> (Vec<ShareLink>, Vec<ShareFailure>) {
    let mut links = Vec::new();
    let mut failures = Vec::new();

    for file in saved_files {
        match share_one_file(client, file, save_path).await {
            Ok(link) => links.push(link),
            Err(err) => {
                tracing::warn!(name = %file.name, error = %err, "share link failed for file");
                failures.push(ShareFailure {
                    name: file.name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    (links, failures)
}

async fn share_one_file(
    client: &QuarkClient,
    file: &SavedFile,
    save_path: &str,
) -> Result<ShareLink> {
    let file_path = if save_path == "/" || save_path.is_empty() {
        format!("/{}", file.name)
    } else {
        format!("{}/{}", save_path, file.name)
    };

    let resolved = client.resolve_paths(&[file_path.clone()]).await?;
    let fid = match resolved.into_iter().next() {
        Some(entry) => entry.fid,
        None => file.fid.clone().ok_or_else(|| {
            QuarkError::Transfer(format!("saved file not found at {file_path}"))
        })?,
    };

    let created = client.create_share_link(&fid, &file.name).await?;
    tracing::info!(name = %file.name, share_id = %created.share_id, "share link issued");

    Ok(ShareLink {
        name: file.name.clone(),
        size: file.size,
        share_url: created.url,
        share_id: created.share_id,
    })
}
