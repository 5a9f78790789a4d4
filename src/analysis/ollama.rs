//! Ollama-compatible generative backend.
//!
//! Talks to the `/api/generate` endpoint with non-streaming requests:
//! - Screenshots are downscaled and sent base64-encoded in `images`
//! - Requests are bounded by a timeout and abort on cancellation
//! - Model output goes through fence stripping, object extraction and
//!   tolerant decoding; anything unparseable becomes an unstructured result
//!
//! # Configuration
//!
//! Defaults come from the process configuration (see [`crate::config`]):
//! - `OLLAMA_URL`: backend base URL
//! - `OLLAMA_MODEL`: model name (must be vision-capable for screenshots)
//! - `BUG_VISION_REQUEST_TIMEOUT`: analysis timeout (seconds)
//! - `BUG_VISION_PROBE_TIMEOUT`: reachability probe timeout (seconds)

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::Analyzer;
use super::decode::decode_bug_analysis;
use super::extract::extract_json_payload;
use super::image::prepare_image;
use super::normalize::{fallback_from_raw, normalize_decoded, truncate_chars};
use super::types::{AnalysisError, AnalysisResult, AnalysisSource, BugAnalysis};
use super::prompt::{build_image_prompt, build_text_prompt};
use crate::config;

/// Characters of model output included in logs
const LOG_PREVIEW_CHARS: usize = 500;

/// Characters of an error body kept in [`AnalysisError::BackendHttp`]
const ERROR_BODY_CHARS: usize = 500;

/// Configuration for the Ollama client
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL, e.g. `http://127.0.0.1:11434`
    pub base_url: String,
    /// Model name to use
    pub model: String,
    /// Timeout for a single analysis request (seconds)
    pub request_timeout: u64,
    /// Timeout for the reachability probe (seconds)
    pub probe_timeout: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            base_url: cfg.analysis.ollama_url.clone(),
            model: cfg.analysis.ollama_model.clone(),
            request_timeout: cfg.analysis.request_timeout,
            probe_timeout: cfg.analysis.probe_timeout,
        }
    }
}

impl OllamaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = seconds;
        self
    }

    pub fn probe_timeout(mut self, seconds: u64) -> Self {
        self.probe_timeout = seconds;
        self
    }

    /// Base URL without trailing slashes
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Analyzer backed by an Ollama-compatible `/api/generate` endpoint
#[derive(Debug, Clone)]
pub struct OllamaAnalyzer {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaAnalyzer {
    /// Build a client whose requests time out after `config.request_timeout`.
    pub fn new(config: OllamaConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Check that the backend answers `GET /api/tags` with 200.
    ///
    /// Meant for a one-shot startup check; callers log the error as a warning.
    pub async fn check_reachable(&self) -> AnalysisResult<()> {
        let url = format!("{}/api/tags", self.config.base());
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.config.probe_timeout))
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::BackendHttp {
                status: status.as_u16(),
                body: truncate_chars(body.trim(), ERROR_BODY_CHARS),
            });
        }
        Ok(())
    }

    /// Send one generate request and return the model's raw text.
    async fn generate(
        &self,
        prompt: &str,
        images: Option<Vec<String>>,
        cancel: &CancellationToken,
    ) -> AnalysisResult<String> {
        let url = format!("{}/api/generate", self.config.base());
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            images,
            stream: false,
        };

        let call = async {
            let response = self.client.post(&url).json(&request).send().await?;
            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                return Err(AnalysisError::BackendHttp {
                    status: status.as_u16(),
                    body: truncate_chars(body.trim(), ERROR_BODY_CHARS),
                });
            }

            let envelope: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
                AnalysisError::MalformedEnvelope(format!(
                    "{} (raw={})",
                    e,
                    truncate_chars(body.trim(), ERROR_BODY_CHARS)
                ))
            })?;

            if let Some(error) = envelope.error.filter(|e| !e.trim().is_empty()) {
                return Err(AnalysisError::BackendReported(error));
            }

            debug!(done = envelope.done, "generate response received");
            Ok(envelope.response)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
            result = call => result,
        }
    }
}

/// Turn raw model output into a normalized analysis.
///
/// Output without a JSON object, or with one that does not decode, becomes
/// the unstructured fallback wrapping the raw text.
pub fn parse_model_response(
    raw: &str,
    source: AnalysisSource,
    description: Option<&str>,
) -> BugAnalysis {
    let Some(json) = extract_json_payload(raw) else {
        warn!(%source, "no JSON object in model response, using raw fallback");
        return fallback_from_raw(raw);
    };

    match decode_bug_analysis(json) {
        Ok(decoded) => {
            info!(
                %source,
                bug_title = %decoded.bug_title,
                test_cases = decoded.test_cases.len(),
                "parsed model response"
            );
            normalize_decoded(decoded, source, description)
        }
        Err(e) => {
            warn!(
                %source,
                error = %e,
                snippet = %truncate_chars(json, 300),
                "model JSON did not decode, using raw fallback"
            );
            fallback_from_raw(raw)
        }
    }
}

fn log_response(source: AnalysisSource, raw: &str) {
    info!(
        %source,
        len = raw.len(),
        preview = %truncate_chars(raw.trim(), LOG_PREVIEW_CHARS),
        "model response"
    );
}

#[async_trait]
impl Analyzer for OllamaAnalyzer {
    async fn analyze_image(
        &self,
        image: &[u8],
        cancel: &CancellationToken,
    ) -> AnalysisResult<BugAnalysis> {
        if image.is_empty() {
            return Err(AnalysisError::EmptyInput("image"));
        }

        let original = image.to_vec();
        let prepared = match tokio::task::spawn_blocking(move || prepare_image(&original)).await {
            Ok(Ok(prepared)) => prepared,
            Ok(Err(e)) => {
                warn!(error = %e, "prepare image failed, sending original bytes");
                image.to_vec()
            }
            Err(e) => {
                warn!(error = %e, "image preparation task failed, sending original bytes");
                image.to_vec()
            }
        };
        info!(
            original = image.len(),
            prepared = prepared.len(),
            model = %self.config.model,
            "analyzing image"
        );

        let encoded = base64::engine::general_purpose::STANDARD.encode(&prepared);
        let raw = self
            .generate(&build_image_prompt(), Some(vec![encoded]), cancel)
            .await?;
        log_response(AnalysisSource::Image, &raw);

        Ok(parse_model_response(&raw, AnalysisSource::Image, None))
    }

    async fn analyze_text(
        &self,
        description: &str,
        cancel: &CancellationToken,
    ) -> AnalysisResult<BugAnalysis> {
        let desc = description.trim();
        if desc.is_empty() {
            return Err(AnalysisError::EmptyInput("description"));
        }

        info!(chars = desc.chars().count(), model = %self.config.model, "analyzing description");
        let raw = self.generate(&build_text_prompt(desc), None, cancel).await?;
        log_response(AnalysisSource::Text, &raw);

        Ok(parse_model_response(&raw, AnalysisSource::Text, Some(desc)))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
