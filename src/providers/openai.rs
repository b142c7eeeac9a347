use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::TranslationConfig;
use crate::errors::ProviderError;
use crate::language_utils::get_language_name;
use crate::providers::{Provider, TranslationRequest, TranslationResponse};

/// Client for OpenAI-compatible chat-completions servers. With
/// `azure_deployment` configured it switches to Azure OpenAI URL addressing
/// and the `api-key` header; otherwise a plain bearer token is sent.
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    azure_deployment: Option<String>,
    azure_api_version: String,
    temperature: f32,
    timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("azure_deployment", &self.azure_deployment)
            .finish()
    }
}

/// Chat message format
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

impl OpenAiProvider {
    pub fn new(config: &TranslationConfig) -> Result<Self, ProviderError> {
        url::Url::parse(&config.endpoint).map_err(|e| {
            ProviderError::RequestFailed(format!(
                "Invalid translation endpoint '{}': {}",
                config.endpoint, e
            ))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            azure_deployment: config.azure_deployment.clone(),
            azure_api_version: config.azure_api_version.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    fn api_url(&self) -> String {
        match &self.azure_deployment {
            Some(deployment) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.endpoint, deployment, self.azure_api_version
            ),
            None => format!("{}/v1/chat/completions", self.endpoint),
        }
    }

    fn system_prompt(&self, request: &TranslationRequest) -> String {
        let source = get_language_name(&request.source_language)
            .unwrap_or_else(|_| request.source_language.clone());
        let target = get_language_name(&request.target_language)
            .unwrap_or_else(|_| request.target_language.clone());
        format!(
            "You are a professional translator. Translate the user's text from {source} to \
             {target}. Preserve placeholder markers like {{v1}} exactly as they appear. \
             Output only the translation, nothing else."
        )
    }

    fn user_prompt(request: &TranslationRequest) -> String {
        let mut prompt = String::new();
        if let Some(before) = &request.context_before {
            prompt.push_str(&format!("Preceding context (do not translate):\n{before}\n\n"));
        }
        if let Some(after) = &request.context_after {
            prompt.push_str(&format!("Following context (do not translate):\n{after}\n\n"));
        }
        prompt.push_str(&format!("Text to translate:\n{}", request.text));
        prompt
    }

    async fn send(&self, body: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut builder = self
            .client
            .post(self.api_url())
            .header("Content-Type", "application/json");
        builder = if self.azure_deployment.is_some() {
            builder.header("api-key", &self.api_key)
        } else {
            builder.bearer_auth(&self.api_key)
        };

        let response = builder.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_secs)
            } else {
                ProviderError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            error!("Translation API error ({}): {}", status, message);
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthenticationError(message),
                429 => ProviderError::RateLimitExceeded(message),
                code => ProviderError::ApiError {
                    status_code: code,
                    message,
                },
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResponse, ProviderError> {
        let body = ChatRequest {
            // Azure routes by deployment; the model field would be ignored
            model: if self.azure_deployment.is_some() {
                None
            } else {
                Some(self.model.clone())
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.system_prompt(request),
                },
                ChatMessage {
                    role: "user",
                    content: Self::user_prompt(request),
                },
            ],
            temperature: self.temperature,
        };

        let response = self.send(&body).await?;
        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::ParseError("Empty completion".to_string()))?;

        let (prompt_tokens, completion_tokens) = response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((None, None));

        Ok(TranslationResponse {
            text,
            prompt_tokens,
            completion_tokens,
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = TranslationRequest {
            text: "Hello".to_string(),
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            context_before: None,
            context_after: None,
        };
        self.complete(&request).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        if self.azure_deployment.is_some() {
            "azure-openai"
        } else {
            "openai"
        }
    }
}
