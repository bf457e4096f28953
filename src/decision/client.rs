//! Chat-completion client
//!
//! The coordinator only needs "send this prompt to that model and give me the
//! status and text back". Status handling (429, non-200) is left to the caller.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DecisionConfig;
use crate::error::DecisionError;

/// HTTP status of a successful completion
pub const STATUS_OK: u16 = 200;
/// HTTP status the service uses when throttling
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Reply from the completion service. `content` is the trimmed completion text
/// on 200, the raw body otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReply {
    pub status: u16,
    pub content: String,
}

impl CompletionReply {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK,
            content: content.into(),
        }
    }
}

pub trait CompletionService: Send + Sync + 'static {
    fn complete(
        &self,
        model: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<CompletionReply, DecisionError>> + Send;
}

// Chat-completions request/response types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 1],
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Pull `choices[0].message.content` out of a 200 body
fn completion_text(body: &str) -> Result<String, DecisionError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| DecisionError::MalformedResponse(format!("undecodable completion body: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .ok_or_else(|| DecisionError::MalformedResponse("completion has no choices".to_string()))
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[cfg(feature = "http_completion")]
#[derive(Debug, Clone)]
pub struct ModelsClient {
    client: reqwest::Client,
    url: String,
    token: String,
}

#[cfg(feature = "http_completion")]
impl ModelsClient {
    pub fn new(endpoint: &str, token: String, timeout: std::time::Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
            token,
        })
    }
}

#[cfg(feature = "http_completion")]
impl CompletionService for ModelsClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<CompletionReply, DecisionError> {
        let request = ChatRequest {
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            model,
        };

        debug!("Requesting completion from {} ({})", model, self.url);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| DecisionError::Transport(format!("request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DecisionError::Transport(format!("reading body failed: {}", e)))?;

        if status != STATUS_OK {
            return Ok(CompletionReply { status, content: body });
        }

        Ok(CompletionReply::ok(completion_text(&body)?))
    }
}

/// The service the coordinator runs against
#[derive(Debug, Clone)]
pub enum CompletionBackend {
    #[cfg(feature = "http_completion")]
    Http(ModelsClient),
    /// No credentials: every call fails, so agents keep their heading
    Offline,
}

impl CompletionBackend {
    /// HTTP when a token is configured and the client builds, offline otherwise
    pub fn from_config(config: &DecisionConfig) -> Self {
        match &config.api_token {
            #[cfg(feature = "http_completion")]
            Some(token) => match ModelsClient::new(&config.endpoint, token.clone(), config.request_timeout) {
                Ok(client) => Self::Http(client),
                Err(e) => {
                    tracing::warn!("Failed to build completion client: {}", e);
                    Self::Offline
                }
            },
            _ => Self::Offline,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }
}

impl CompletionService for CompletionBackend {
    async fn complete(&self, model: &str, prompt: &str) -> Result<CompletionReply, DecisionError> {
        match self {
            #[cfg(feature = "http_completion")]
            Self::Http(client) => client.complete(model, prompt).await,
            Self::Offline => Err(DecisionError::Transport(
                "no completion credentials configured".to_string(),
            )),
        }
    }
}
