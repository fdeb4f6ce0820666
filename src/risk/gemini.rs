//! Gemini adapter for risk analysis and projections.
//!
//! One `generateContent` call per request, JSON response mode with an
//! explicit schema. No retries and no caching.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::error::AnalysisError;
use super::prompt::{
    parse_projections, parse_risk_analysis, projection_prompt, projection_schema, risk_prompt,
    risk_schema,
};
use super::Analyst;
use crate::config::AnalysisConfig;
use crate::models::{BudgetEntry, Investment, Projection, RiskAnalysis};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Maximum accepted response body (1MB).
const MAX_RESPONSE_LEN: usize = 1_024 * 1_024;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Build from [`AnalysisConfig`]; fails when no credential is configured.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AnalysisError::config("GEMINI_API_KEY not set"))?;

        Self::with_config(api_key, &config.base_url, &config.model, config.timeout)
    }

    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key_value = HeaderValue::from_str(&api_key)
            .map_err(|_| AnalysisError::config("Invalid API key format"))?;
        headers.insert("x-goog-api-key", key_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| AnalysisError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send one prompt and return the concatenated candidate text.
    async fn generate_json(&self, prompt: String, schema: Value) -> Result<String, AnalysisError> {
        let start = Instant::now();

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        let mut response = self.client.post(self.generate_url()).json(&body).send().await?;
        let status = response.status();

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > MAX_RESPONSE_LEN {
                return Err(AnalysisError::TooLarge {
                    limit: MAX_RESPONSE_LEN,
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        let text = String::from_utf8_lossy(&bytes);

        if !status.is_success() {
            let message = serde_json::from_str::<GenerateResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

            return Err(AnalysisError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)?;

        let content: String = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            bytes = content.len(),
            "generateContent completed"
        );

        if content.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        Ok(content)
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

// =============================================================================
// ANALYST IMPL
// =============================================================================

#[async_trait]
impl Analyst for GeminiClient {
    async fn analyze(
        &self,
        budgets: &[BudgetEntry],
        investments: &[Investment],
    ) -> Result<RiskAnalysis, AnalysisError> {
        let prompt = risk_prompt(budgets, investments)?;
        let text = self.generate_json(prompt, risk_schema()).await?;
        let analysis = parse_risk_analysis(&text)?;

        info!(
            risk_score = analysis.risk_score,
            issues = analysis.critical_issues.len(),
            "risk analysis received"
        );
        Ok(analysis)
    }

    async fn project(&self, budgets: &[BudgetEntry]) -> Result<Vec<Projection>, AnalysisError> {
        let prompt = projection_prompt(budgets)?;
        let text = self.generate_json(prompt, projection_schema()).await?;
        let projections = parse_projections(&text)?;

        info!(months = projections.len(), "projections received");
        Ok(projections)
    }
}
