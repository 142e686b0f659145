use super::{
    CallArguments, DEFAULT_UPDATE_STATUS, LifecycleOutcome, report_missing_identifier,
    report_update, resolve_call_identifier,
};
use crate::agi::{AgiChannel, ChannelEnvironment};
use crate::backend::CaseBackend;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::info;

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
    let args = CallArguments::from_environment(env, DEFAULT_UPDATE_STATUS);
    info!(status = args.status, "statut is '{}'", args.status);

    let Some(case_id) = resolve_call_identifier(channel, &args).await else {
        return report_missing_identifier(channel).await;
    };
    let update = args.case_update();
    let result = backend.update_case(&case_id, &update).await;
    report_update(channel, case_id, result).await
}
