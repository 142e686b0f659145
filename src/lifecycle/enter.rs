use super::LifecycleOutcome;
use crate::agi::{AgiChannel, ChannelEnvironment};
use crate::backend::CaseBackend;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{info, warn};

/// Opens a case for an incoming call and leaves its id and the caller's
/// name on the channel for the later scripts.
pub async fn run<R, W, B>(
    channel: &mut AgiChannel<R, W>,
    env: &ChannelEnvironment,
    backend: &B,
) -> LifecycleOutcome
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    B: CaseBackend + ?Sized,
{
    let caller = env.caller_id().unwrap_or_default();
    info!(caller, "incoming call");

    let created = match backend.create_case(caller).await {
        Ok(created) => created,
        Err(e) => {
            warn!(caller, "case creation failed: {:#}", e);
            channel.verbose(&format!("HTTP error: {:#}", e)).await;
            return LifecycleOutcome::BackendFailed;
        }
    };
    channel
        .verbose(&format!(
            "POST {} -> {}: {}",
            created.url, created.status, created.preview
        ))
        .await;

    if let Some(name) = created.caller_name.as_deref() {
        channel.store_caller_name(name).await;
    }

    let Some(case_id) = created.case_id else {
        info!("CASE_ID None");
        channel.verbose("No caseId in response").await;
        return LifecycleOutcome::NoCase;
    };
    info!(case_id, "CASE_ID");
    let reply = channel.store_call_identifier(&case_id).await;
    channel
        .verbose(&format!("SET VARIABLE resp: {}", reply))
        .await;

    let (raw, value) = channel.confirm_call_identifier().await;
    if value != case_id {
        warn!(case_id, value, "call identifier did not read back");
    }
    channel
        .verbose(&format!(
            "GET VARIABLE CALL_IDENTIFIER -> {} | value={}",
            raw, value
        ))
        .await;
    LifecycleOutcome::CaseCreated { case_id }
}
