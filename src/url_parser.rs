//! URL parser for Quark share links.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

use crate::error::{QuarkError, Result};

/// Share id inside the `/s/<id>` path segment.
static SHARE_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/s/(\w+)").expect("Invalid share id regex"));

/// 32-hex folder fid, optionally followed by a `-label` display segment.
static CRUMB_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/([0-9a-fA-F]{32})(?:-([^/]+))?").expect("Invalid breadcrumb regex")
});

static FID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([0-9a-fA-F]{32})").expect("Invalid fid regex"));

/// Root folder sentinel used when a share URL carries no sub-folder.
pub const ROOT_FID: &str = "0";

/// One `<fid>-<label>` segment of a share URL's folder trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCrumb {
    pub fid: String,
    pub name: String,
}

/// Everything a share URL encodes. Parsing is pure; the same input always
/// yields the same descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareDescriptor {
    pub share_id: String,
    /// Access passcode from the `pwd` query parameter, empty if absent.
    pub passcode: String,
    /// Folder to list inside the share: the last breadcrumb, or the root.
    pub target_dir_fid: String,
    pub breadcrumbs: Vec<PathCrumb>,
}

/// Outcome of [`validate_share_url`], for callers that prefer a report
/// object over an error.
#[derive(Debug, Serialize)]
pub struct UrlValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ShareDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parse a Quark share URL into a [`ShareDescriptor`].
///
/// Fails with `InvalidLink` when the host is not a quark.cn domain or no
/// share id can be extracted from the path.
///
/// # Examples
///
/// ```
/// use quark_transfer::url_parser::parse_share_url;
///
/// let descriptor = parse_share_url("https://pan.quark.cn/s/123456?pwd=abc").unwrap();
/// assert_eq!(descriptor.share_id, "123456");
/// assert_eq!(descriptor.passcode, "abc");
/// assert_eq!(descriptor.target_dir_fid, "0");
/// ```
pub fn parse_share_url(url: &str) -> Result<ShareDescriptor> {
    let parsed = Url::parse(url)
        .map_err(|e| QuarkError::InvalidLink(format!("not a well-formed URL: {e}")))?;

    let host = parsed.host_str().unwrap_or("");
    if !host.contains("quark.cn") {
        return Err(QuarkError::InvalidLink(
            "host is not a quark.cn domain".to_string(),
        ));
    }

    let share_id = SHARE_ID_REGEX
        .captures(parsed.path())
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            QuarkError::InvalidLink("no share id found in URL path".to_string())
        })?;

    let passcode = parsed
        .query_pairs()
        .find(|(key, _)| key == "pwd")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    // Folder trail segments may live in the path or the fragment; scan the
    // whole input left to right.
    let breadcrumbs: Vec<PathCrumb> = CRUMB_REGEX
        .captures_iter(url)
        .map(|captures| {
            let fid = captures[1].to_string();
            let name = captures
                .get(2)
                .map(|m| decode_crumb_label(m.as_str()))
                .unwrap_or_default();
            PathCrumb { fid, name }
        })
        .collect();

    let target_dir_fid = breadcrumbs
        .last()
        .map(|crumb| crumb.fid.clone())
        .unwrap_or_else(|| ROOT_FID.to_string());

    Ok(ShareDescriptor {
        share_id,
        passcode,
        target_dir_fid,
        breadcrumbs,
    })
}

/// Validate a share URL without raising: returns a report with either the
/// parsed descriptor or the error message.
pub fn validate_share_url(url: &str) -> UrlValidation {
    match parse_share_url(url) {
        Ok(descriptor) => UrlValidation {
            valid: true,
            data: Some(descriptor),
            error: None,
        },
        Err(err) => UrlValidation {
            valid: false,
            data: None,
            error: Some(err.to_string()),
        },
    }
}

/// Extract the first 32-hex fid from a path segment, if any.
pub fn extract_fid_from_path(path: &str) -> Option<String> {
    FID_REGEX
        .captures(path)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Labels arrive percent-encoded with `*101` standing in for a dash.
fn decode_crumb_label(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    decoded.replace("*101", "-")
}
