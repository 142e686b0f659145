use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

pub mod client;

pub use client::CaseClient;

/// Multipart field carrying the recorded message on hangup.
pub const AUDIO_FIELD: &str = "files.message_vocal";
const PREVIEW_CHARS: usize = 400;

/// Fields of the case update sent on `PUT {base}/{case_id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseUpdate {
    #[serde(rename = "poste_appel")]
    pub station: Option<String>,
    #[serde(rename = "statut_appel")]
    pub status: String,
    #[serde(rename = "duree_appel")]
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseCreated {
    pub url: String,
    pub status: u16,
    pub case_id: Option<String>,
    pub caller_name: Option<String>,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseUpdated {
    pub url: String,
    pub status: u16,
    pub preview: String,
}

/// The three case transitions issued over a call's lifetime. Each call is a
/// single attempt; `Err` means the request never got an HTTP answer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaseBackend: Send + Sync {
    /// Not idempotent: every call opens a new case.
    async fn create_case(&self, caller_id: &str) -> Result<CaseCreated>;

    async fn update_case(&self, case_id: &str, update: &CaseUpdate) -> Result<CaseUpdated>;

    /// Like `update_case`, attaching the recorded audio when it can be read.
    async fn finalize_case(
        &self,
        case_id: &str,
        update: &CaseUpdate,
        audio: Option<PathBuf>,
    ) -> Result<CaseUpdated>;
}

/// First characters of a response body on one line, for logs and diagnostics.
pub fn body_preview(body: &str) -> String {
    body.chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Case id and caller name from a create response. Anything unexpected in the
/// body reads as "no case".
pub fn parse_created(body: &str) -> (Option<String>, Option<String>) {
    let Ok(Value::Object(data)) = serde_json::from_str::<Value>(body) else {
        return (None, None);
    };
    let case_id = match data.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };
    let caller_name = match data.get("nom") {
        Some(Value::String(name)) if !name.is_empty() => Some(name.clone()),
        _ => None,
    };
    (case_id, caller_name)
}
