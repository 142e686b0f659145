use crate::agi::{self, ChannelEnvironment, StdioChannel};
use crate::backend::CaseClient;
use crate::config::{Cli, Config};
use crate::lifecycle::LifecycleOutcome;
use crate::logging;
use tracing::{Span, error, info, info_span, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// Everything one script invocation owns: configuration, the gateway session
/// on stdin/stdout and the channel environment read at start.
pub struct Invocation {
    pub script: &'static str,
    pub config: Config,
    pub channel: StdioChannel,
    pub environment: ChannelEnvironment,
    _log_guard: WorkerGuard,
}

impl Invocation {
    pub async fn start(script: &'static str) -> Self {
        let cli = Cli::parse_lenient();
        let (config, config_error) = Config::resolve(&cli);
        let log_guard = logging::init(&config);
        if let Some(e) = config_error {
            warn!(script, "failed to load config file, using defaults: {:#}", e);
        }
        rustls::crypto::ring::default_provider()
            .install_default()
            .ok();

        let mut channel = agi::stdio();
        let environment = channel.read_channel_environment().await;
        Self {
            script,
            config,
            channel,
            environment,
            _log_guard: log_guard,
        }
    }

    pub fn span(&self) -> Span {
        info_span!(
            "agi",
            script = self.script,
            uniqueid = self.environment.unique_id(),
            channel = self.environment.channel()
        )
    }

    /// Builds the backend client, reporting a bad configuration on the
    /// diagnostic channel instead of failing.
    pub async fn backend(&mut self) -> Option<CaseClient> {
        match CaseClient::new(&self.config) {
            Ok(client) => Some(client),
            Err(e) => {
                error!("failed to create backend client: {:#}", e);
                self.channel.verbose(&format!("HTTP error: {:#}", e)).await;
                None
            }
        }
    }

    pub fn finish(&self, outcome: Option<LifecycleOutcome>) {
        info!(script = self.script, ?outcome, hung_up = self.channel.hung_up(), "done");
    }
}
