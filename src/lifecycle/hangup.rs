use super::{
    CallArguments, DEFAULT_HANGUP_STATUS, LifecycleOutcome, report_missing_identifier,
    report_update, resolve_call_identifier,
};
use crate::agi::{AgiChannel, ChannelEnvironment};
use crate::backend::CaseBackend;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::info;

/// Final update of the case once the call is over, with the recorded message
/// attached when the dialplan passed one.
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
    let args = CallArguments::from_environment(env, DEFAULT_HANGUP_STATUS);
    let Some(case_id) = resolve_call_identifier(channel, &args).await else {
        return report_missing_identifier(channel).await;
    };

    let update = args.case_update();
    info!(case_id, ?update, audio_path = ?args.audio_path, "finalizing case");
    let result = backend
        .finalize_case(&case_id, &update, args.audio_path.clone())
        .await;
    report_update(channel, case_id, result).await
}
