use casebridge::app::Invocation;
use casebridge::lifecycle::update;
use tracing::Instrument;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut invocation = Invocation::start("call_update").await;
    let span = invocation.span();
    async {
        let outcome = match invocation.backend().await {
            Some(backend) => Some(
                update::run(
                    &mut invocation.channel,
                    &invocation.environment,
                    &backend,
                )
                .await,
            ),
            None => None,
        };
        invocation.finish(outcome);
    }
    .instrument(span)
    .await;
}
