use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{GenAiError, GenAiResult, GenerateRequest, ModelClient, Part};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model endpoint configuration read from the environment.
#[derive(Clone, Debug)]
pub struct GenAiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl GenAiSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: std::env::var("GENAI_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("GENAI_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: std::env::var("GENAI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

/// Gemini client when a key is configured, otherwise [`DisabledClient`].
pub fn build_client(settings: &GenAiSettings) -> GenAiResult<Arc<dyn ModelClient>> {
    match &settings.api_key {
        Some(key) => Ok(Arc::new(GeminiClient::new(
            key.clone(),
            settings.model.clone(),
            settings.base_url.clone(),
            Duration::from_secs(settings.timeout_secs),
        )?)),
        None => {
            warn!("GENAI_API_KEY not set; AI flows are disabled");
            Ok(Arc::new(DisabledClient))
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
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
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GeminiResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Google Generative Language API client requesting JSON replies.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> GenAiResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> GenAiResult<String> {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => GeminiPart::Text { text },
                Part::Image(image) => GeminiPart::Inline {
                    inline_data: InlineData {
                        mime_type: image.mime_type(),
                        data: image.data(),
                    },
                },
            })
            .collect();
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: &request.system,
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!(flow = request.flow, status = status.as_u16(), "model call rejected");
            return Err(GenAiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: GeminiResponse = response.json().await?;
        debug!(flow = request.flow, model = %self.model, "model call succeeded");
        reply.text().ok_or(GenAiError::EmptyContent)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Used when no API key is configured; every call fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledClient;

#[async_trait]
impl ModelClient for DisabledClient {
    async fn generate(&self, _request: GenerateRequest) -> GenAiResult<String> {
        Err(GenAiError::Disabled)
    }

    fn model_name(&self) -> &str {
        "disabled"
    }
}

/// Returns fixed replies keyed by flow name. Flows without a reply fail as
/// if the model were unavailable.
#[derive(Debug, Default)]
pub struct CannedClient {
    replies: HashMap<&'static str, String>,
    calls: AtomicUsize,
}

impl CannedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, flow: &'static str, reply: impl Into<String>) -> Self {
        self.replies.insert(flow, reply.into());
        self
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ModelClient for CannedClient {
    async fn generate(&self, request: GenerateRequest) -> GenAiResult<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.replies
            .get(request.flow)
            .cloned()
            .ok_or_else(|| GenAiError::Api {
                status: 503,
                message: format!("no canned reply for {}", request.flow),
            })
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InlineImage;

    #[test]
    fn request_body_uses_gemini_field_names() {
        let image = InlineImage::parse_data_uri("data:image/jpeg;base64,aGk=").unwrap();
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text { text: "sys" }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![
                    GeminiPart::Text { text: "hello" },
                    GeminiPart::Inline {
                        inline_data: InlineData {
                            mime_type: image.mime_type(),
                            data: image.data(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.5,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/jpeg"
        );
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let reply: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(reply.text().as_deref(), Some("{\"a\":1}"));

        let empty: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.text().is_none());
    }

    #[tokio::test]
    async fn canned_client_replies_by_flow() {
        let client = CannedClient::new().with_reply("chatbotReply", r#"{"reply":"hi"}"#);
        let request = |flow| GenerateRequest {
            flow,
            system: String::new(),
            parts: vec![],
            temperature: 0.0,
        };
        assert_eq!(
            client.generate(request("chatbotReply")).await.unwrap(),
            r#"{"reply":"hi"}"#
        );
        assert!(client.generate(request("scoreResume")).await.is_err());
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn disabled_client_always_fails() {
        let err = DisabledClient
            .generate(GenerateRequest {
                flow: "any",
                system: String::new(),
                parts: vec![],
                temperature: 0.0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GenAiError::Disabled));
    }
}
