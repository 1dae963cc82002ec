//! Quark drive API client: account identity, share access, path
//! resolution, save submission, and share publishing.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use reqwest::header::HeaderMap;
use serde_json::json;

use crate::auth::SessionCredential;
use crate::config::Config;
use crate::error::{QuarkError, Result};
use crate::http::HttpClient;
use crate::models::{
    AccountEnvelope, AccountInfo, ApiEnvelope, CreatedShare, FolderData, ListEnvelope, PathFid,
    RemoteFile, SaveData, ShareInfo, ShareSubmitData, StokenData, TaskData, TASK_STATUS_DONE,
};
use crate::poller::{PollState, TaskPoller};
use crate::url_parser::ROOT_FID;

/// Share listings and path lookups are served in pages of at most 50; the
/// server rejects larger requests.
pub const LIST_PAGE_SIZE: u64 = 50;
pub const PATH_LOOKUP_BATCH: usize = 50;

/// A single save submission accepts at most 100 files.
pub const SAVE_BATCH_SIZE: usize = 100;

/// Fixed cadence the task endpoints are polled at.
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const SAVE_PROGRESS_EVERY: u32 = 5;
const SHARE_PROGRESS_EVERY: u32 = 3;

/// Client for one authenticated Quark session. Credential and config are
/// read-only after construction, so one instance serves a whole transfer
/// run; concurrent runs each get their own instance.
pub struct QuarkClient {
    config: Config,
    credential: SessionCredential,
    http: HttpClient,
    headers: HeaderMap,
}

impl QuarkClient {
    /// Create a client from a caller-supplied session cookie.
    pub fn new(cookie: &str, config: Config) -> Result<Self> {
        let credential = SessionCredential::new(cookie);
        let headers = credential.headers(&config.user_agent)?;
        let http = HttpClient::new(config.timeout(), config.retry_count, config.retry_delay())?;
        Ok(Self {
            config,
            credential,
            http,
            headers,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn credential(&self) -> &SessionCredential {
        &self.credential
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Query parameters every drive endpoint expects.
    fn base_query() -> Vec<(&'static str, String)> {
        vec![("pr", "ucpro".to_string()), ("fr", "pc".to_string())]
    }

    /// Fetch the account identity behind the cookie.
    pub async fn account_info(&self) -> Result<AccountInfo> {
        let url = format!("{}/account/info", self.config.portal_url);
        let query = vec![("fr", "pc".to_string()), ("platform", "pc".to_string())];
        let envelope: AccountEnvelope = self.http.get(&url, &query, &self.headers).await?;

        envelope.data.ok_or_else(|| {
            QuarkError::Authentication("account info missing from response".to_string())
        })
    }

    /// Exchange a share id and passcode for a share access token.
    pub async fn share_token(&self, share_id: &str, passcode: &str) -> Result<String> {
        let url = self.api_url("/1/clouddrive/share/sharepage/token");
        let body = json!({ "pwd_id": share_id, "passcode": passcode });
        let envelope: ApiEnvelope<StokenData> = self
            .http
            .post(&url, &Self::base_query(), &body, &self.headers)
            .await?;

        Ok(envelope.into_data("failed to fetch share token")?.stoken)
    }

    /// List everything under one folder of a share, in server order.
    ///
    /// Pages of [`LIST_PAGE_SIZE`] are fetched until a page comes back empty
    /// or the accumulated count reaches the server-reported total; `>=`
    /// tolerates the total drifting while we page.
    pub async fn list_share_contents(
        &self,
        share_id: &str,
        stoken: &str,
        dir_fid: &str,
    ) -> Result<Vec<RemoteFile>> {
        let url = self.api_url("/1/clouddrive/share/sharepage/detail");
        let mut merged: Vec<RemoteFile> = Vec::new();
        let mut page: u64 = 1;

        loop {
            let mut query = Self::base_query();
            query.extend([
                ("pwd_id", share_id.to_string()),
                ("stoken", stoken.to_string()),
                ("pdir_fid", dir_fid.to_string()),
                ("force", "0".to_string()),
                ("_page", page.to_string()),
                ("_size", LIST_PAGE_SIZE.to_string()),
                ("_fetch_banner", "0".to_string()),
                ("_fetch_share", "0".to_string()),
                ("_fetch_total", "1".to_string()),
                ("_sort", "file_type:asc,updated_at:desc".to_string()),
                ("ver", "2".to_string()),
                ("fetch_share_full_path", "0".to_string()),
            ]);

            let envelope: ListEnvelope = self.http.get(&url, &query, &self.headers).await?;
            if envelope.code != Some(0) {
                let message = envelope.message.as_deref().unwrap_or("unknown error");
                return Err(QuarkError::Transfer(format!(
                    "share listing failed: {message}"
                )));
            }

            let batch = envelope.data.unwrap_or_default().list;
            let total = envelope.metadata.map(|m| m.total).unwrap_or(0);

            if batch.is_empty() {
                break;
            }
            merged.extend(batch);

            if merged.len() as u64 >= total {
                break;
            }
            page += 1;
        }

        tracing::debug!(count = merged.len(), share_id, "share contents listed");
        Ok(merged)
    }

    /// Resolve absolute account paths to fids, batching the vendor's
    /// 50-path request limit and concatenating results in input order.
    pub async fn resolve_paths(&self, paths: &[String]) -> Result<Vec<PathFid>> {
        let url = self.api_url("/1/clouddrive/file/info/path_list");
        let mut resolved: Vec<PathFid> = Vec::new();

        for chunk in paths.chunks(PATH_LOOKUP_BATCH) {
            let body = json!({ "file_path": chunk, "namespace": "0" });
            let envelope: ApiEnvelope<Vec<PathFid>> = self
                .http
                .post(&url, &Self::base_query(), &body, &self.headers)
                .await?;
            resolved.extend(envelope.into_data("failed to resolve paths")?);
        }

        Ok(resolved)
    }

    /// Create a folder at an absolute path, returning its fresh fid.
    pub async fn create_folder(&self, dir_path: &str) -> Result<String> {
        let url = self.api_url("/1/clouddrive/file");
        let mut query = Self::base_query();
        query.push(("uc_param_str", String::new()));
        let body = json!({
            "pdir_fid": "0",
            "file_name": "",
            "dir_path": dir_path,
            "dir_init_lock": false,
        });
        let envelope: ApiEnvelope<FolderData> =
            self.http.post(&url, &query, &body, &self.headers).await?;

        Ok(envelope.into_data("failed to create folder")?.fid)
    }

    /// Resolve the destination save path to a folder fid, creating the
    /// folder when it does not exist yet. The root path needs no network
    /// call. If two runs race on the same missing path the vendor decides
    /// which create wins; this layer does not deduplicate.
    pub async fn save_dir_fid(&self, save_path: &str) -> Result<String> {
        if save_path.is_empty() || save_path == "/" {
            return Ok(ROOT_FID.to_string());
        }

        let resolved = self.resolve_paths(&[save_path.to_string()]).await?;
        if let Some(entry) = resolved.into_iter().next() {
            return Ok(entry.fid);
        }

        tracing::info!(save_path, "destination folder missing, creating it");
        self.create_folder(save_path).await
    }

    /// Submit one batch of files for server-side saving; returns the id of
    /// the asynchronous copy job.
    pub async fn submit_save(
        &self,
        fids: &[String],
        fid_tokens: &[String],
        to_dir_fid: &str,
        share_id: &str,
        stoken: &str,
    ) -> Result<String> {
        let url = self.api_url("/1/clouddrive/share/sharepage/save");
        let mut query = Self::base_query();
        query.extend([
            ("uc_param_str", String::new()),
            ("app", "clouddrive".to_string()),
            ("__dt", request_window_ms().to_string()),
            ("__t", epoch_millis().to_string()),
        ]);
        let body = json!({
            "fid_list": fids,
            "fid_token_list": fid_tokens,
            "to_pdir_fid": to_dir_fid,
            "pwd_id": share_id,
            "stoken": stoken,
            "pdir_fid": "0",
            "scene": "link",
        });
        let envelope: ApiEnvelope<SaveData> =
            self.http.post(&url, &query, &body, &self.headers).await?;

        Ok(envelope.into_data("failed to submit save")?.task_id)
    }

    /// Block until a save job is terminal, returning its payload.
    pub async fn wait_for_save(&self, task_id: &str) -> Result<TaskData> {
        let poller = TaskPoller::new(POLL_INTERVAL, SAVE_PROGRESS_EVERY);
        poller
            .poll_until_done(
                |tick| self.fetch_save_task(task_id, tick),
                |tick| {
                    if tick == 0 {
                        tracing::info!(task_id, "waiting for save to finish");
                    } else {
                        tracing::info!(task_id, elapsed_s = tick, "save still running");
                    }
                },
            )
            .await
    }

    async fn fetch_save_task(&self, task_id: &str, tick: u32) -> Result<PollState<TaskData>> {
        let url = self.api_url("/1/clouddrive/task");
        let mut query = Self::base_query();
        query.extend([
            ("uc_param_str", String::new()),
            ("task_id", task_id.to_string()),
            ("retry_index", tick.to_string()),
            ("__dt", request_window_ms().to_string()),
            ("__t", epoch_millis().to_string()),
        ]);

        let envelope: ApiEnvelope<TaskData> = self.http.get(&url, &query, &self.headers).await?;
        if envelope.status != Some(200) {
            return Err(QuarkError::Transfer(format!(
                "task status query failed: {}",
                envelope.vendor_message()
            )));
        }

        let ok = envelope.is_ok();
        let message = envelope.vendor_message().to_string();
        let data = envelope.data.unwrap_or_default();

        if data.status == TASK_STATUS_DONE {
            if ok {
                return Ok(PollState::Done(data));
            }
            return Err(QuarkError::JobFailed {
                task_id: task_id.to_string(),
                message,
            });
        }
        Ok(PollState::Pending)
    }

    /// Block until a share-publish job is terminal.
    pub async fn wait_for_share_task(&self, task_id: &str) -> Result<TaskData> {
        let poller = TaskPoller::new(POLL_INTERVAL, SHARE_PROGRESS_EVERY);
        poller
            .poll_until_done(
                |tick| self.fetch_share_task(task_id, tick),
                |tick| {
                    if tick == 0 {
                        tracing::info!(task_id, "waiting for share link");
                    } else {
                        tracing::info!(task_id, elapsed_s = tick, "share link still generating");
                    }
                },
            )
            .await
    }

    async fn fetch_share_task(&self, task_id: &str, _tick: u32) -> Result<PollState<TaskData>> {
        let url = self.api_url("/1/clouddrive/task");
        let mut query = Self::base_query();
        query.extend([
            ("uc_param_str", String::new()),
            ("app", "clouddrive".to_string()),
            ("task_id", task_id.to_string()),
            ("__t", epoch_millis().to_string()),
        ]);

        let envelope: ApiEnvelope<TaskData> = self.http.get(&url, &query, &self.headers).await?;
        let ok = envelope.is_ok();
        let message = envelope.vendor_message().to_string();

        if let Some(data) = envelope.data {
            if data.status == TASK_STATUS_DONE {
                if ok {
                    return Ok(PollState::Done(data));
                }
                return Err(QuarkError::JobFailed {
                    task_id: task_id.to_string(),
                    message,
                });
            }
        }
        Ok(PollState::Pending)
    }

    /// List the account root sorted by recency. Used after a save to map
    /// the vendor-reported new top-level fids back to file names.
    pub async fn list_recent_files(&self) -> Result<Vec<RemoteFile>> {
        let url = self.api_url("/1/clouddrive/file/sort");
        let mut query = Self::base_query();
        query.extend([
            ("pdir_fid", ROOT_FID.to_string()),
            ("_page", "1".to_string()),
            ("_size", LIST_PAGE_SIZE.to_string()),
            ("_fetch_total", "1".to_string()),
            ("_sort", "file_type:asc,updated_at:desc".to_string()),
        ]);

        let envelope: ListEnvelope = self.http.get(&url, &query, &self.headers).await?;
        if envelope.code != Some(0) {
            let message = envelope.message.as_deref().unwrap_or("unknown error");
            return Err(QuarkError::Transfer(format!(
                "recent files listing failed: {message}"
            )));
        }
        Ok(envelope.data.unwrap_or_default().list)
    }

    /// Publish one file as a new share link and resolve its public URL.
    ///
    /// The vendor answers with either an async job id to poll or, rarely, a
    /// directly issued share id; both are handled.
    pub async fn create_share_link(&self, fid: &str, title: &str) -> Result<CreatedShare> {
        let url = self.api_url("/1/clouddrive/share");
        let mut query = Self::base_query();
        query.push(("uc_param_str", String::new()));
        let body = json!({
            "fid_list": [fid],
            "expired_type": 1,
            "title": title,
            "url_type": 1,
        });
        let envelope: ApiEnvelope<ShareSubmitData> =
            self.http.post(&url, &query, &body, &self.headers).await?;
        let submit = envelope.into_data("failed to create share link")?;

        let (share_id, expire_time) = if let Some(task_id) = submit.task_id {
            tracing::debug!(%task_id, "share publish is asynchronous, polling");
            let task = self.wait_for_share_task(&task_id).await?;
            let share_id = task.share_id.ok_or_else(|| {
                QuarkError::Transfer("share task finished without a share id".to_string())
            })?;
            (share_id, task.expire_time)
        } else if let Some(share_id) = submit.share_id {
            (share_id, submit.expire_time)
        } else {
            return Err(QuarkError::Transfer(
                "share response carried neither task_id nor share_id".to_string(),
            ));
        };

        let info = self.share_info(&share_id).await?;
        let url = info
            .share_url
            .unwrap_or_else(|| format!("{}/s/{}", self.config.portal_url, share_id));

        Ok(CreatedShare {
            url,
            share_id,
            expire_time,
        })
    }

    /// Resolve a share id to its public URL and metadata.
    pub async fn share_info(&self, share_id: &str) -> Result<ShareInfo> {
        let url = self.api_url("/1/clouddrive/share/password");
        let mut query = Self::base_query();
        query.push(("uc_param_str", String::new()));
        let body = json!({ "share_id": share_id });
        let envelope: ApiEnvelope<ShareInfo> =
            self.http.post(&url, &query, &body, &self.headers).await?;

        envelope.into_data("failed to fetch share info")
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Cache-busting window stamp the desktop client sends: one to four
/// minutes, in milliseconds.
fn request_window_ms() -> u64 {
    rand::thread_rng().gen_range(1..=4) * 60 * 1000
}

#[cfg(test)]
mod tests {
    // Endpoint behavior is covered against a mock server in
    // tests/client_test.rs and tests/transfer_test.rs.

    #[test]
    fn test_request_window_bounds() {
        for _ in 0..50 {
            let window = super::request_window_ms();
            assert!(window >= 60_000 && window <= 240_000);
            assert_eq!(window % 60_000, 0);
        }
    }
}
