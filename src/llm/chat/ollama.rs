use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ http_stream_generate, ChatClient, CompletionResponse, FragmentStream, StreamLine };
use crate::llm::{ BoxError, LlmConfig, LlmType };
use crate::models::chat::ChatMessage;

#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    completion_model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
}

impl OllamaClient {
    pub fn new(
        base_url: Option<String>,
        completion_model: Option<String>,
        temperature: f32,
        max_tokens: Option<u32>
    ) -> Self {
        let model = completion_model.unwrap_or_else(|| LlmType::Ollama.default_model().to_string());
        let url = base_url.unwrap_or_else(|| LlmType::Ollama.default_base_url().into());

        Self {
            http: HttpClient::new(),
            base_url: url,
            completion_model: model,
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, BoxError> {
        if config.llm_type != LlmType::Ollama {
            return Err("Invalid config type for OllamaClient".into());
        }

        Ok(
            Self::new(
                config.base_url.clone(),
                config.completion_model.clone(),
                config.temperature,
                config.max_tokens
            )
        )
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    fn request(&self, messages: &[ChatMessage], stream: bool) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.completion_model.clone(),
            messages: messages.to_vec(),
            stream,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: if stream { self.max_tokens } else { None },
            },
        }
    }
}

/// Interprets one newline-delimited JSON object of a streamed Ollama chat.
pub(crate) fn parse_ndjson_line(line: &str) -> StreamLine {
    let line = line.trim();
    if line.is_empty() {
        return StreamLine::Skip;
    }
    match serde_json::from_str::<OllamaChatResponse>(line) {
        Ok(resp) => {
            let content = resp.message.map(|m| m.content).unwrap_or_default();
            if !content.is_empty() {
                StreamLine::Fragment(content)
            } else if resp.done {
                StreamLine::Done
            } else {
                StreamLine::Skip
            }
        }
        Err(e) => {
            debug!("Ollama stream parse error: {} for line: {}", e, line);
            StreamLine::Skip
        }
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResponse, BoxError> {
        let req = self.request(messages, false);
        let resp = self.http
            .post(self.chat_url())
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<OllamaChatResponse>().await?;

        let content = resp.message
            .map(|m| m.content)
            .ok_or_else(|| "No message in Ollama response".to_string())?;
        Ok(CompletionResponse { response: content })
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<FragmentStream, BoxError> {
        let req = self.request(messages, true);
        http_stream_generate(self.http.clone(), self.chat_url(), req, parse_ndjson_line, None).await
    }

    fn get_model(&self) -> String {
        self.completion_model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
