//! OpenAI client implementing the `EnrichmentService` port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use termical_core::EnrichmentService;
use termical_domain::{ActionItem, EnrichError, Enrichment};
use tracing::{debug, instrument};

use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, EnrichmentPayload, JsonSchema,
    ResponseFormat,
};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 600;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RATE_LIMIT_RETRY_SECS: u64 = 60;

/// OpenAI API client for activity enrichment.
///
/// An activity without a description never reaches the API: the summary is
/// derived from the title and the action item list is empty.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl OpenAiClient {
    /// Create a new client with the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Use a custom model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a custom API URL (for testing).
    #[cfg(test)]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn build_request(&self, title: &str, description: &str) -> ChatCompletionRequest {
        let prompt = format!(
            "Generate a concise 1-2 sentence prep summary for this activity and \
             extract any action items mentioned.\n\n\
             Activity Title: {title}\n\
             Description: {description}\n\n\
             The summary should help someone prepare: focus on the key topics, \
             goals, or decisions. For each action item give the task text and, \
             when stated, who is responsible."
        );

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a helpful assistant that creates concise activity \
                              summaries and extracts action items from activity notes."
                        .to_string(),
                },
                ChatMessage { role: "user".to_string(), content: prompt },
            ],
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: Some(JsonSchema {
                    name: "activity_enrichment".to_string(),
                    schema: json!({
                        "type": "object",
                        "properties": {
                            "summary": { "type": "string" },
                            "action_items": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "text": { "type": "string" },
                                        "assignee": { "type": ["string", "null"] }
                                    },
                                    "required": ["text"],
                                    "additionalProperties": false
                                }
                            }
                        },
                        "required": ["summary", "action_items"],
                        "additionalProperties": false
                    }),
                    strict: Some(true),
                }),
            },
        }
    }
}

#[async_trait]
impl EnrichmentService for OpenAiClient {
    #[instrument(skip(self, description), fields(title))]
    async fn enrich(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Enrichment, EnrichError> {
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let Some(description) = description else {
            // Nothing to summarize; mirror the title without an API call.
            return Ok(Enrichment {
                summary: format!("Activity: {title}"),
                action_items: vec![],
            });
        };

        let request = self.build_request(title, description);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EnrichError::Timeout(DEFAULT_HTTP_TIMEOUT)
                } else {
                    EnrichError::InvalidResponse(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        debug!(status = status.as_u16(), "received OpenAI response");

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

            return Err(match status.as_u16() {
                429 => EnrichError::RateLimited {
                    retry_after_secs: retry_after.unwrap_or(DEFAULT_RATE_LIMIT_RETRY_SECS),
                },
                _ => EnrichError::InvalidResponse(format!("API error ({status}): {body}")),
            });
        }

        let chat_response: ChatCompletionResponse = response.json().await.map_err(|e| {
            EnrichError::InvalidResponse(format!("failed to parse response: {e}"))
        })?;

        let choice = chat_response.choices.first().ok_or_else(|| {
            EnrichError::InvalidResponse("response contained no choices".to_string())
        })?;

        let payload: EnrichmentPayload =
            serde_json::from_str(&choice.message.content).map_err(|e| {
                EnrichError::InvalidResponse(format!(
                    "failed to parse enrichment: {e}. Content: {}",
                    choice.message.content
                ))
            })?;

        Ok(normalize(payload))
    }
}

/// Drop empty action items and placeholder assignees.
fn normalize(payload: EnrichmentPayload) -> Enrichment {
    let action_items = payload
        .action_items
        .into_iter()
        .filter(|item| !item.text.trim().is_empty())
        .map(|item| ActionItem {
            text: item.text.trim().to_string(),
            assignee: item
                .assignee
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty() && !a.eq_ignore_ascii_case("unassigned")),
        })
        .collect();

    Enrichment { summary: payload.summary.trim().to_string(), action_items }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client(api_url: String) -> OpenAiClient {
        OpenAiClient::new("test-api-key").with_api_url(api_url)
    }

    #[tokio::test]
    async fn enriches_activity_successfully() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "content": r#"{
                            "summary": "Daily sync to discuss blockers",
                            "action_items": [
                                { "text": "Send the agenda", "assignee": "a@example.com" },
                                { "text": "Book a room", "assignee": "Unassigned" }
                            ]
                        }"#
                    }
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = test_client(format!("{}/v1/chat/completions", mock_server.uri()));
        let enrichment =
            client.enrich("Standup", Some("Daily sync")).await.expect("should enrich");

        assert_eq!(enrichment.summary, "Daily sync to discuss blockers");
        assert_eq!(enrichment.action_items.len(), 2);
        assert_eq!(enrichment.action_items[0].assignee.as_deref(), Some("a@example.com"));
        // placeholder assignee is normalized away
        assert_eq!(enrichment.action_items[1].assignee, None);
    }

    #[tokio::test]
    async fn blank_description_short_circuits_without_api_call() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = test_client(format!("{}/v1/chat/completions", mock_server.uri()));

        let for_none = client.enrich("Standup", None).await.expect("should enrich");
        assert_eq!(for_none.summary, "Activity: Standup");
        assert!(for_none.action_items.is_empty());

        let for_blank = client.enrich("Standup", Some("   ")).await.expect("should enrich");
        assert_eq!(for_blank.summary, "Activity: Standup");
    }

    #[tokio::test]
    async fn handles_rate_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "15")
                    .set_body_string("Rate limit exceeded"),
            )
            .mount(&mock_server)
            .await;

        let client = test_client(format!("{}/v1/chat/completions", mock_server.uri()));
        let result = client.enrich("Standup", Some("Daily sync")).await;

        assert!(matches!(result, Err(EnrichError::RateLimited { retry_after_secs: 15 })));
    }

    #[tokio::test]
    async fn handles_invalid_response_schema() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "content": "not valid json"
                    }
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = test_client(format!("{}/v1/chat/completions", mock_server.uri()));
        let result = client.enrich("Standup", Some("Daily sync")).await;

        assert!(matches!(result, Err(EnrichError::InvalidResponse(_))));
    }
}
