//! Session credentials: the caller-supplied cookie and the signing
//! parameters derived from it.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE, USER_AGENT};

use crate::error::{QuarkError, Result};

static KPS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"kps=([a-zA-Z0-9%+/=]+)[;&]?").expect("Invalid kps regex"));
static SIGN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sign=([a-zA-Z0-9%+/=]+)[;&]?").expect("Invalid sign regex"));
static VCODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vcode=([a-zA-Z0-9%+/=]+)[;&]?").expect("Invalid vcode regex"));

/// Signing parameters some endpoints require, embedded in the cookie blob
/// by the mobile client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningParams {
    pub kps: String,
    pub sign: String,
    pub vcode: String,
}

/// Extract `kps`/`sign`/`vcode` from a cookie string. All three must be
/// present; otherwise the cookie carries no signing material. Doubly
/// percent-encoded values (`%25`) are collapsed one level.
pub fn extract_signing_params(cookie: &str) -> Option<SigningParams> {
    let kps = KPS_REGEX.captures(cookie)?.get(1)?.as_str();
    let sign = SIGN_REGEX.captures(cookie)?.get(1)?.as_str();
    let vcode = VCODE_REGEX.captures(cookie)?.get(1)?.as_str();

    Some(SigningParams {
        kps: kps.replace("%25", "%"),
        sign: sign.replace("%25", "%"),
        vcode: vcode.replace("%25", "%"),
    })
}

/// Authentication material for one client. Extracted once at construction
/// and read-only afterwards.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    cookie: String,
    signing: Option<SigningParams>,
}

impl SessionCredential {
    pub fn new(cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        let signing = extract_signing_params(&cookie);
        Self { cookie, signing }
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn signing(&self) -> Option<&SigningParams> {
        self.signing.as_ref()
    }

    /// Build the header set every API request carries.
    ///
    /// Fails with `Authentication` when the cookie contains bytes that are
    /// not legal in an HTTP header.
    pub fn headers(&self, user_agent: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&self.cookie).map_err(|_| {
                QuarkError::Authentication("cookie contains invalid header bytes".to_string())
            })?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|_| {
                QuarkError::Authentication("user agent contains invalid header bytes".to_string())
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}
