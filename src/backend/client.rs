use super::{AUDIO_FIELD, CaseBackend, CaseCreated, CaseUpdate, CaseUpdated, body_preview, parse_created};
use crate::config::Config;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use url::Url;

pub struct CaseClient {
    api_base: Url,
    token: Option<String>,
    client: Client,
}

impl CaseClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.useragent())
            .build()?;
        if config.backend_token.is_none() {
            warn!("BACKEND_TOKEN is not set, requests go out without authorization");
        }
        Ok(Self {
            api_base: config.api_base()?,
            token: config.backend_token.clone(),
            client,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn case_url(&self, case_id: &str) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("backend url cannot take a path: {}", self.api_base))?
            .push(case_id);
        Ok(url)
    }

    async fn put_case(
        &self,
        case_id: &str,
        update: &CaseUpdate,
        audio: Option<&Path>,
    ) -> Result<CaseUpdated> {
        let url = self.case_url(case_id)?;
        let payload = serde_json::to_string(update)?;
        // Always multipart with a typed `data` part, recording or not. Older
        // callers posted `data` as a plain form field and only went multipart
        // with a recording; the backend accepts both.
        let mut form = Form::new().part("data", Part::text(payload).mime_str("application/json")?);
        if let Some(path) = audio {
            if let Some(part) = audio_part(path).await {
                form = form.part(AUDIO_FIELD, part);
            }
        }

        info!(%url, case_id, ?update, audio = ?audio, "updating case");
        let start = Instant::now();
        let response = self
            .authorize(self.client.put(url.clone()))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let preview = body_preview(&body);
        info!(
            %url,
            status = status.as_u16(),
            elapsed = start.elapsed().as_millis(),
            body_preview = %preview,
            "case update response"
        );
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "case update rejected");
        }
        Ok(CaseUpdated {
            url: url.to_string(),
            status: status.as_u16(),
            preview,
        })
    }
}

/// The recording as a multipart file part, or `None` when it cannot be read.
async fn audio_part(path: &Path) -> Option<Part> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Cannot open audio file {}: {}", path.display(), e);
            return None;
        }
    };
    let file_name = path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("message.wav"))
        .to_string_lossy()
        .to_string();
    Part::bytes(content)
        .file_name(file_name)
        .mime_str("audio/wav")
        .ok()
}

#[async_trait]
impl CaseBackend for CaseClient {
    async fn create_case(&self, caller_id: &str) -> Result<CaseCreated> {
        let url = self.api_base.clone();
        let payload = json!({ "data": { "tel": caller_id } });
        info!(%url, caller_id, "creating case");

        let start = Instant::now();
        let response = self
            .authorize(self.client.post(url.clone()))
            .header(ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let preview = body_preview(&body);
        info!(
            %url,
            status = status.as_u16(),
            elapsed = start.elapsed().as_millis(),
            body_preview = %preview,
            "create case response"
        );
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "case creation rejected");
        }

        let (case_id, caller_name) = parse_created(&body);
        Ok(CaseCreated {
            url: url.to_string(),
            status: status.as_u16(),
            case_id,
            caller_name,
            preview,
        })
    }

    async fn update_case(&self, case_id: &str, update: &CaseUpdate) -> Result<CaseUpdated> {
        self.put_case(case_id, update, None).await
    }

    async fn finalize_case(
        &self,
        case_id: &str,
        update: &CaseUpdate,
        audio: Option<PathBuf>,
    ) -> Result<CaseUpdated> {
        self.put_case(case_id, update, audio.as_deref()).await
    }
}
