use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ http_stream_generate, ChatClient, CompletionResponse, FragmentStream, StreamLine };
use crate::llm::{ BoxError, LlmConfig, LlmType };
use crate::models::chat::ChatMessage;

/// Client for any provider exposing the OpenAI `/v1/chat/completions` dialect.
pub struct OpenAIChatClient {
    http: HttpClient,
    llm_type: LlmType,
    model: String,
    base_url: String,
    temperature: f32,
    // Only streamed (rendering) requests are capped.
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: String,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAIStreamRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIStreamResponse {
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    delta: OpenAIDelta,
    #[serde(rename = "finish_reason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(
        llm_type: LlmType,
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        temperature: f32,
        max_tokens: Option<u32>
    ) -> Result<Self, BoxError> {
        let chat_model = model.unwrap_or_else(|| llm_type.default_model().to_string());
        let api_url = base_url.unwrap_or_else(|| llm_type.default_base_url().to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                format!("Invalid API key format: {}", e)
            )?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as BoxError)?;

        Ok(Self {
            http,
            llm_type,
            model: chat_model,
            base_url: api_url,
            temperature,
            max_tokens,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, BoxError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| format!("{} API key is required", config.llm_type))?;

        Self::new(
            config.llm_type,
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.temperature,
            config.max_tokens
        )
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }
}

/// Interprets one server-sent-event line of a streamed chat completion.
pub(crate) fn parse_sse_line(line: &str) -> StreamLine {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return StreamLine::Skip;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return StreamLine::Skip;
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return StreamLine::Done;
    }
    match serde_json::from_str::<OpenAIStreamResponse>(data) {
        Ok(stream_resp) => {
            let mut content = String::new();
            let mut finished = false;
            for choice in stream_resp.choices {
                if let Some(delta) = choice.delta.content {
                    content.push_str(&delta);
                }
                if choice.finish_reason.as_deref() == Some("stop") {
                    finished = true;
                }
            }
            if !content.is_empty() {
                StreamLine::Fragment(content)
            } else if finished {
                StreamLine::Done
            } else {
                StreamLine::Skip
            }
        }
        Err(e) => {
            debug!("JSON parse error: {} for data: {}", e, data);
            StreamLine::Skip
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResponse, BoxError> {
        let req = OpenAIChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
        };

        let resp = self.http
            .post(self.completions_url())
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<OpenAIResponse>().await?;

        let content = resp.choices
            .into_iter()
            .next()
            .ok_or_else(|| format!("No response from {} API", self.llm_type))?
            .message.content.unwrap_or_default();

        Ok(CompletionResponse { response: content })
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<FragmentStream, BoxError> {
        let req = OpenAIStreamRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        http_stream_generate(self.http.clone(), self.completions_url(), req, parse_sse_line, None).await
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> OpenAIChatClient {
        OpenAIChatClient::new(
            LlmType::OpenAI,
            "sk-test".into(),
            None,
            Some(base_url.into()),
            0.7,
            Some(4000)
        ).unwrap()
    }

    #[test]
    fn completions_url_accepts_bare_and_versioned_bases() {
        assert_eq!(
            client("https://api.openai.com/").completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            client("https://proxy.local/v1").completions_url(),
            "https://proxy.local/v1/chat/completions"
        );
        assert_eq!(
            client("https://proxy.local/v1/chat/completions").completions_url(),
            "https://proxy.local/v1/chat/completions"
        );
    }

    #[test]
    fn sse_delta_becomes_fragment() {
        let line = r#"data: {"choices":[{"delta":{"content":"<h1>"},"finish_reason":null}]}"#;
        assert_eq!(parse_sse_line(line), StreamLine::Fragment("<h1>".into()));
    }

    #[test]
    fn sse_terminators_end_stream() {
        assert_eq!(parse_sse_line("data: [DONE]"), StreamLine::Done);
        let stop = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_sse_line(stop), StreamLine::Done);
    }

    #[test]
    fn sse_noise_is_skipped() {
        assert_eq!(parse_sse_line(""), StreamLine::Skip);
        assert_eq!(parse_sse_line(": keep-alive"), StreamLine::Skip);
        assert_eq!(parse_sse_line("data: not json"), StreamLine::Skip);
        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#;
        assert_eq!(parse_sse_line(role_only), StreamLine::Skip);
    }

    #[test]
    fn hosted_provider_requires_api_key() {
        let config = LlmConfig { api_key: Some("  ".into()), ..LlmConfig::default() };
        assert!(OpenAIChatClient::from_config(&config).is_err());
    }
}
