//! Classification of network traffic made by the hosted application.
//!
//! The interceptor is an observer: it never alters what the page sees. Each
//! request URL falls into exactly one [`TrafficClass`]; only list responses
//! and completion actions are forwarded to the bridge.

mod script;
mod surface;

pub use script::interceptor_script;
pub use surface::{inject_interceptor, BrowserSurface, SurfaceHandle};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::bridge::BridgeMessage;

/// Path (suffix) of the chore-list endpoint.
pub const DEFAULT_LIST_PATH: &str = "/api/v1/chores";

/// Trailing path segment of the "mark done" action.
pub const DEFAULT_COMPLETE_ACTION: &str = "do";

/// URL shapes the interceptor cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPatterns {
    /// The list endpoint path must end with exactly this, optionally followed
    /// by a single `/`.
    pub list_path: String,
    /// Completion URLs end with `/<numeric id>/<complete_action>`.
    pub complete_action: String,
}

impl Default for EndpointPatterns {
    fn default() -> Self {
        Self {
            list_path: DEFAULT_LIST_PATH.to_string(),
            complete_action: DEFAULT_COMPLETE_ACTION.to_string(),
        }
    }
}

/// Outcome of classifying one request URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficClass {
    List,
    Complete { id: i64 },
    Ignore,
}

impl std::fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrafficClass::List => write!(f, "LIST"),
            TrafficClass::Complete { id } => write!(f, "COMPLETE {id}"),
            TrafficClass::Ignore => write!(f, "IGNORE"),
        }
    }
}

impl EndpointPatterns {
    pub fn new(list_path: impl Into<String>, complete_action: impl Into<String>) -> Self {
        let list_path = list_path.into();
        let list_path = format!("/{}", list_path.trim_matches('/'));
        Self {
            list_path,
            complete_action: complete_action.into().trim_matches('/').to_string(),
        }
    }

    /// Classify a request URL. First match wins: list, completion, ignore.
    /// Relative URLs (as issued by `fetch("/api/...")`) are accepted.
    pub fn classify(&self, raw_url: &str) -> TrafficClass {
        let path = match request_path(raw_url) {
            Some(path) => path,
            None => {
                tracing::debug!(url = raw_url, "unparseable request url ignored");
                return TrafficClass::Ignore;
            }
        };

        if self.is_list_path(&path) {
            return TrafficClass::List;
        }
        if let Some(id) = self.completion_id(&path) {
            return TrafficClass::Complete { id };
        }
        TrafficClass::Ignore
    }

    /// Turn an observed response into the bridge message it implies, if any.
    /// Completion responses are never parsed: only the id travels.
    pub fn observe(&self, raw_url: &str, body: Option<&str>) -> Option<BridgeMessage> {
        match self.classify(raw_url) {
            TrafficClass::List => match body {
                Some(body) => Some(BridgeMessage::ListReceived(body.to_string())),
                None => {
                    tracing::debug!(url = raw_url, "list response without body ignored");
                    None
                }
            },
            TrafficClass::Complete { id } => Some(BridgeMessage::TaskCompleted(id)),
            TrafficClass::Ignore => None,
        }
    }

    fn is_list_path(&self, path: &str) -> bool {
        let path = path.strip_suffix('/').unwrap_or(path);
        path.ends_with(self.list_path.as_str())
    }

    fn completion_id(&self, path: &str) -> Option<i64> {
        let path = path.strip_suffix('/').unwrap_or(path);
        let mut segments = path.rsplit('/');
        if segments.next()? != self.complete_action {
            return None;
        }
        let id = segments.next()?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        id.parse().ok()
    }
}

fn request_path(raw_url: &str) -> Option<String> {
    let raw_url = raw_url.trim();
    if raw_url.is_empty() {
        return None;
    }
    let parsed = match Url::parse(raw_url) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse("http://relative.invalid/").ok()?;
            base.join(raw_url).ok()?
        }
        Err(_) => return None,
    };
    Some(parsed.path().to_string())
}
