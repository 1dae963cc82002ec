//! Data models for Quark API requests, responses, and transfer results.

use serde::{Deserialize, Serialize};

use crate::error::{QuarkError, Result};

/// Task state value the vendor reports once a job is terminal.
pub const TASK_STATUS_DONE: i64 = 2;

/// Generic vendor response envelope: `code` 0 means success, `message`
/// carries the vendor error text otherwise.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_ok(&self) -> bool {
        self.code == Some(0)
    }

    pub fn vendor_message(&self) -> &str {
        self.message.as_deref().unwrap_or("unknown error")
    }

    /// Unwrap the `data` payload, mapping a non-zero vendor code or a
    /// missing payload to a transfer error with the given context.
    pub fn into_data(self, context: &str) -> Result<T> {
        if self.is_ok() {
            if let Some(data) = self.data {
                return Ok(data);
            }
        }
        let message = self.vendor_message().to_string();
        Err(QuarkError::Transfer(format!("{context}: {message}")))
    }
}

/// One entry of a share listing: a file or folder reachable through the
/// share, carrying the per-file token required to save it.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    pub fid: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub share_fid_token: String,
    #[serde(default)]
    pub obj_category: Option<String>,
    #[serde(default)]
    pub dir: bool,
}

impl RemoteFile {
    pub fn category(&self) -> &str {
        if let Some(category) = self.obj_category.as_deref() {
            return category;
        }
        if self.dir {
            "folder"
        } else {
            "file"
        }
    }
}

impl std::fmt::Display for RemoteFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.fid,
            format_size(self.size),
            self.category(),
            self.file_name
        )
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Response from the share listing endpoint; `metadata._total` drives
/// pagination termination.
#[derive(Debug, Deserialize)]
pub struct ListEnvelope {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<FileListData>,
    #[serde(default)]
    pub metadata: Option<ListMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileListData {
    #[serde(default)]
    pub list: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
pub struct ListMetadata {
    #[serde(default, rename = "_total")]
    pub total: u64,
}

/// `data` payload of the share-token exchange.
#[derive(Debug, Default, Deserialize)]
pub struct StokenData {
    pub stoken: String,
}

/// `data` payload of a save submission.
#[derive(Debug, Default, Deserialize)]
pub struct SaveData {
    pub task_id: String,
}

/// `data` payload of a folder creation.
#[derive(Debug, Default, Deserialize)]
pub struct FolderData {
    pub fid: String,
}

/// One resolved path from the path-list lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct PathFid {
    #[serde(default)]
    pub file_path: String,
    pub fid: String,
}

/// Polled task payload. `status` reaches [`TASK_STATUS_DONE`] exactly once;
/// the remaining fields are populated depending on the job kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskData {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub save_as: Option<SaveAs>,
    #[serde(default)]
    pub share_id: Option<String>,
    #[serde(default)]
    pub expire_time: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveAs {
    #[serde(default)]
    pub save_as_top_fids: Vec<String>,
}

/// `data` payload of a share submission: either an async task to poll or,
/// rarely, a directly issued share id.
#[derive(Debug, Default, Deserialize)]
pub struct ShareSubmitData {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub share_id: Option<String>,
    #[serde(default)]
    pub expire_time: Option<u64>,
}

/// `data` payload of the share-password/info lookup.
#[derive(Debug, Default, Deserialize)]
pub struct ShareInfo {
    #[serde(default)]
    pub share_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// A share link after publishing resolved to its public URL.
#[derive(Debug, Clone)]
pub struct CreatedShare {
    pub url: String,
    pub share_id: String,
    pub expire_time: Option<u64>,
}

/// Account identity returned by the portal.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountEnvelope {
    #[serde(default)]
    pub data: Option<AccountInfo>,
}

/// A fully issued share link for one saved file.
#[derive(Debug, Clone, Serialize)]
pub struct ShareLink {
    pub name: String,
    pub size: u64,
    pub share_url: String,
    pub share_id: String,
}

/// A share link request that failed for one file; the rest of the run
/// continues without it.
#[derive(Debug, Clone, Serialize)]
pub struct ShareFailure {
    pub name: String,
    pub error: String,
}

/// One file after the save phase. `fid` is filled in by the post-save
/// lookup when the vendor reports the newly created top-level ids.
#[derive(Debug, Clone, Serialize)]
pub struct SavedFile {
    pub name: String,
    pub size: u64,
    pub category: String,
    pub fid: Option<String>,
}

/// Final record of one transfer run.
#[derive(Debug)]
pub struct TransferSummary {
    pub file_count: usize,
    pub task_results: Vec<TaskData>,
    pub saved_files: Vec<SavedFile>,
    pub share_links: Vec<ShareLink>,
    pub share_failures: Vec<ShareFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
        assert_eq!(format_size(1073741824), "1.00 GB");
    }

    #[test]
    fn test_envelope_into_data_on_success() {
        let json = r#"{"status":200,"code":0,"message":"ok","data":{"stoken":"abc"}}"#;
        let envelope: ApiEnvelope<StokenData> = serde_json::from_str(json).unwrap();
        assert!(envelope.is_ok());
        assert_eq!(envelope.into_data("token").unwrap().stoken, "abc");
    }

    #[test]
    fn test_envelope_into_data_on_vendor_error() {
        let json = r#"{"status":200,"code":41009,"message":"share expired"}"#;
        let envelope: ApiEnvelope<StokenData> = serde_json::from_str(json).unwrap();
        let err = envelope.into_data("token").unwrap_err();
        let display = format!("{}", err);
        assert!(display.contains("token"));
        assert!(display.contains("share expired"));
    }

    #[test]
    fn test_envelope_missing_code_is_not_ok() {
        let json = r#"{"data":{"stoken":"abc"}}"#;
        let envelope: ApiEnvelope<StokenData> = serde_json::from_str(json).unwrap();
        assert!(!envelope.is_ok());
        assert!(envelope.into_data("token").is_err());
    }

    #[test]
    fn test_remote_file_deserialize() {
        let json = r#"{
            "fid": "7e25ddd87cf64443b637125478733295",
            "file_name": "notes.pdf",
            "size": 2048,
            "share_fid_token": "tok-1",
            "obj_category": "document"
        }"#;
        let file: RemoteFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.fid, "7e25ddd87cf64443b637125478733295");
        assert_eq!(file.file_name, "notes.pdf");
        assert_eq!(file.size, 2048);
        assert_eq!(file.category(), "document");
    }

    #[test]
    fn test_remote_file_category_fallback() {
        let json = r#"{"fid": "f1", "file_name": "stuff", "dir": true}"#;
        let file: RemoteFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.category(), "folder");

        let json = r#"{"fid": "f2", "file_name": "a.bin"}"#;
        let file: RemoteFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.category(), "file");
    }

    #[test]
    fn test_task_data_with_save_as() {
        let json = r#"{
            "status": 2,
            "task_id": "t-1",
            "save_as": {"save_as_top_fids": ["aa", "bb"]}
        }"#;
        let task: TaskData = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TASK_STATUS_DONE);
        assert_eq!(task.save_as.unwrap().save_as_top_fids, vec!["aa", "bb"]);
    }

    #[test]
    fn test_list_envelope_total() {
        let json = r#"{
            "code": 0,
            "data": {"list": [{"fid": "f1", "file_name": "a"}]},
            "metadata": {"_total": 107}
        }"#;
        let envelope: ListEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.metadata.unwrap().total, 107);
        assert_eq!(envelope.data.unwrap().list.len(), 1);
    }
}
