use crate::agi::{AgiChannel, ChannelEnvironment};
use crate::backend::{CaseUpdate, CaseUpdated};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{info, warn};

pub mod enter;
pub mod hangup;
pub mod update;

pub const DEFAULT_UPDATE_STATUS: &str = "termine";
pub const DEFAULT_HANGUP_STATUS: &str = "aucune_reponse_hors_horaires";

/// How one script invocation ended. The process exit code is 0 whatever the
/// outcome; this only feeds logs and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleOutcome {
    CaseCreated { case_id: String },
    NoCase,
    Reported { case_id: String, status: u16 },
    MissingCallIdentifier,
    BackendFailed,
}

/// Dialplan arguments of the update and hangup scripts.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArguments {
    pub case_id: Option<String>,
    pub station: Option<String>,
    pub duration: Option<i64>,
    pub status: String,
    pub audio_path: Option<PathBuf>,
}

impl CallArguments {
    pub fn from_environment(env: &ChannelEnvironment, default_status: &str) -> Self {
        Self {
            case_id: env.argument(1).map(str::to_string),
            station: env.argument(2).map(str::to_string),
            duration: parse_duration(env.argument(3)),
            status: env.argument(4).unwrap_or(default_status).to_string(),
            audio_path: env.argument(5).map(PathBuf::from),
        }
    }

    pub fn case_update(&self) -> CaseUpdate {
        CaseUpdate {
            station: self.station.clone(),
            status: self.status.clone(),
            duration: self.duration,
        }
    }
}

/// Missing duration stays `None`; anything that is not an integer counts as 0.
pub fn parse_duration(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(raw.parse().unwrap_or(0))
}

/// The explicit argument wins over the stored call identifier.
pub(crate) async fn resolve_call_identifier<R, W>(
    channel: &mut AgiChannel<R, W>,
    args: &CallArguments,
) -> Option<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match &args.case_id {
        Some(case_id) => Some(case_id.clone()),
        None => channel.call_identifier().await,
    }
}

pub(crate) async fn report_missing_identifier<R, W>(
    channel: &mut AgiChannel<R, W>,
) -> LifecycleOutcome
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    warn!("Missing CALL_IDENTIFIER");
    channel.verbose("Missing CALL_IDENTIFIER").await;
    LifecycleOutcome::MissingCallIdentifier
}

/// Tells the dialplan how the case update went, through the diagnostic
/// channel and `UPDATE_STATUS`.
pub(crate) async fn report_update<R, W>(
    channel: &mut AgiChannel<R, W>,
    case_id: String,
    result: anyhow::Result<CaseUpdated>,
) -> LifecycleOutcome
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match result {
        Ok(updated) => {
            channel
                .verbose(&format!(
                    "PUT {} -> {}: {}",
                    updated.url, updated.status, updated.preview
                ))
                .await;
            let reply = channel.store_update_status(updated.status).await;
            info!(case_id, status = updated.status, reply, "UPDATE_STATUS stored");
            LifecycleOutcome::Reported {
                case_id,
                status: updated.status,
            }
        }
        Err(e) => {
            warn!(case_id, "case update failed: {:#}", e);
            channel.verbose(&format!("HTTP error: {:#}", e)).await;
            LifecycleOutcome::BackendFailed
        }
    }
}
