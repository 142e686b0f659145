use anyhow::{Error, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

const USER_AGENT: &str = "asterisk-agi/1.0";
const DEFAULT_BACKEND_URL: &str = "https://2511-onde.positif.ma";
const CASE_RESOURCE: &str = "/backend/api/cas-entrants/incoming-call";

#[derive(Parser, Debug, Default)]
#[command(version, about = "Report gateway call events to the case backend")]
pub struct Cli {
    #[clap(long)]
    pub conf: Option<String>,
    /// Dialplan arguments; the scripts read them from the channel environment
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// The gateway decides what ends up on the command line, so a parse
    /// failure falls back to defaults instead of exiting.
    pub fn parse_lenient() -> Self {
        Self::try_parse().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub backend_token: Option<String>,
    pub timeout_ms: u64,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub useragent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_token: None,
            timeout_ms: 5000,
            log_level: Some("info".to_string()),
            log_file: None,
            useragent: Some(USER_AGENT.to_string()),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let config = toml::from_str(
            &std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("{}: {}", e, path))?,
        )?;
        Ok(config)
    }

    /// Defaults, then the optional config file, then the environment. A
    /// config file that cannot be loaded is returned as an error next to the
    /// config that was built without it.
    pub fn resolve(cli: &Cli) -> (Self, Option<Error>) {
        load_dotenv();
        let (config, error) = match cli.conf.as_deref() {
            Some(path) => match Self::load(path) {
                Ok(config) => (config, None),
                Err(e) => (Self::default(), Some(e)),
            },
            None => (Self::default(), None),
        };
        (config.with_env(|key| std::env::var(key).ok()), error)
    }

    pub fn with_env<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = var("BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(token) = var("BACKEND_TOKEN") {
            self.backend_token = Some(token);
        }
        if let Some(timeout) = var("BACKEND_TIMEOUT_MS").and_then(|v| v.trim().parse().ok()) {
            self.timeout_ms = timeout;
        }
        if let Some(file) = var("AGI_LOG_FILE") {
            self.log_file = Some(file);
        }
        if let Some(level) = var("AGI_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        self
    }

    /// URL of the incoming call case resource.
    pub fn api_base(&self) -> Result<Url> {
        let base = format!("{}{}", self.backend_url.trim_end_matches('/'), CASE_RESOURCE);
        Url::parse(&base).map_err(|e| anyhow::anyhow!("invalid backend url {}: {}", base, e))
    }

    pub fn useragent(&self) -> &str {
        self.useragent.as_deref().unwrap_or(USER_AGENT)
    }

    pub fn log_path(&self) -> PathBuf {
        match &self.log_file {
            Some(file) => PathBuf::from(file),
            None => script_dir().join("logs").join("app.log"),
        }
    }
}

/// Directory holding the running executable; `.env` and `logs/` live there.
fn script_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn load_dotenv() {
    dotenv::from_path(script_dir().join(".env")).ok();
    dotenv::dotenv().ok();
}
