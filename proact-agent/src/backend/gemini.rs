//! Gemini backend.
//!
//! Talks to the `generateContent` REST endpoint. Function calling is driven
//! manually: tool declarations go out with every request and any
//! `functionCall` parts come back as [`Part::ToolCall`].

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Instant;
use tracing::{debug, error, info};

use super::traits::*;

/// Default Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Gemini `generateContent` backend.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LlmError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        let backend = Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        };
        info!(model = %backend.model, "Gemini client initialized");
        Ok(backend)
    }

    /// Point the backend at another endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the request URL.
    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<ToolDeclaration>,
}

#[derive(Debug, Serialize)]
struct WireGenerationConfig {
    temperature: f32,
}

/// `generateContent` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    usage_metadata: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        let parts = content
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart {
                    text: Some(text.clone()),
                    ..Default::default()
                },
                Part::ToolCall(call) => WirePart {
                    function_call: Some(WireFunctionCall {
                        name: call.name.clone(),
                        args: call.args.clone(),
                    }),
                    ..Default::default()
                },
                Part::ToolResult(result) => WirePart {
                    function_response: Some(WireFunctionResponse {
                        name: result.name.clone(),
                        response: json!({ "result": result.result }),
                    }),
                    ..Default::default()
                },
            })
            .collect();

        Self {
            role: Some(content.role.as_str().to_string()),
            parts,
        }
    }
}

fn is_tool_results(content: &Content) -> bool {
    content.role == Role::User
        && !content.parts.is_empty()
        && content
            .parts
            .iter()
            .all(|part| matches!(part, Part::ToolResult(_)))
}

/// Convert history to wire contents.
///
/// Gemini expects every `functionResponse` answering one model turn in a
/// single following content, so consecutive tool-result turns are merged.
fn wire_contents(contents: &[Content]) -> Vec<WireContent> {
    let mut wire: Vec<WireContent> = Vec::with_capacity(contents.len());
    let mut merging = false;

    for content in contents {
        let results = is_tool_results(content);
        let converted = WireContent::from(content);
        match wire.last_mut() {
            Some(last) if merging && results => last.parts.extend(converted.parts),
            _ => wire.push(converted),
        }
        merging = results;
    }

    wire
}

fn finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        None | Some("STOP") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Other,
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    fn id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let start = Instant::now();

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![WireTool {
                function_declarations: request.tools.clone(),
            }]
        };

        let body = WireRequest {
            contents: wire_contents(&request.contents),
            tools,
            system_instruction: request.system_instruction.as_ref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart {
                    text: Some(text.clone()),
                    ..Default::default()
                }],
            }),
            generation_config: request
                .temperature
                .map(|temperature| WireGenerationConfig { temperature }),
        };

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<WireErrorBody>(&text)
                .map(|b| format!("{}: {}", b.error.status, b.error.message))
                .unwrap_or(text);

            error!(%status, %detail, "Gemini request failed");

            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    LlmError::Rejected(detail)
                }
                StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
                    retry_after_ms: None,
                },
                s if s.is_server_error() => LlmError::Unavailable(format!("HTTP {s}: {detail}")),
                s => LlmError::RequestFailed(format!("HTTP {s}: {detail}")),
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let candidate = wire
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError("No candidates in response".to_string()))?;

        let parts = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| {
                if let Some(call) = part.function_call {
                    Some(Part::ToolCall(ToolCall::new(call.name, call.args)))
                } else {
                    part.text.map(Part::Text)
                }
            })
            .collect::<Vec<_>>();

        let usage = wire
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        debug!(
            model = %self.model,
            parts = parts.len(),
            total_tokens = usage.total(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Gemini turn received"
        );

        Ok(GenerateResponse {
            parts,
            finish_reason: finish_reason(candidate.finish_reason.as_deref()),
            usage,
        })
    }
}
