pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use futures::{ Future, Stream, StreamExt };
use log::debug;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::pin::Pin;
use std::sync::Arc;
use super::{ BoxError, LlmConfig };
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;
use crate::models::chat::ChatMessage;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Ordered, finite, non-restartable sequence of text fragments from a model.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, BoxError>> + Send>>;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResponse, BoxError>;

    /// Streams the reply as it is generated. Adapters without native streaming
    /// deliver the whole completion as one fragment.
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<FragmentStream, BoxError> {
        let response = self.complete(messages).await?.response;
        full_response_as_stream(move || async move { Ok(response) })
    }

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

/// What a single line of a streaming response body means.
#[derive(Debug, PartialEq, Eq)]
pub enum StreamLine {
    Fragment(String),
    Done,
    Skip,
}

pub fn create_streaming_response<F, Fut>(response_fn: F) -> Result<FragmentStream, BoxError>
    where
        F: FnOnce(mpsc::Sender<Result<String, BoxError>>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        response_fn(tx).await;
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}

pub fn full_response_as_stream<F, Fut>(response_fn: F) -> Result<FragmentStream, BoxError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, BoxError>> + Send + 'static
{
    create_streaming_response(move |tx| async move {
        match response_fn().await {
            Ok(response) => {
                let _ = tx.send(Ok(response)).await;
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
            }
        }
    })
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, BoxError> {
    let client: Arc<dyn ChatClient> = if config.llm_type.is_openai_compatible() {
        Arc::new(OpenAIChatClient::from_config(config)?)
    } else {
        Arc::new(OllamaClient::from_config(config)?)
    };
    Ok(client)
}

/// Splits complete lines off the front of `pending`, leaving any trailing
/// partial line in place for the next network chunk.
pub(crate) fn drain_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
        let raw: Vec<u8> = pending.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw);
        lines.push(line.trim_end_matches(['\r', '\n']).to_string());
    }
    lines
}

pub async fn http_stream_generate(
    http: HttpClient,
    url: String,
    payload: impl serde::Serialize + Send + 'static,
    line_parser: fn(&str) -> StreamLine,
    headers: Option<Vec<(String, String)>>
) -> Result<FragmentStream, BoxError> {
    create_streaming_response(move |tx| async move {
        let mut req = http.post(&url).json(&payload);

        if let Some(header_list) = headers {
            for (name, value) in header_list {
                req = req.header(name, value);
            }
        }

        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                let _ = tx.send(Err(Box::new(e) as _)).await;
                return;
            }
        };
        if let Err(e) = resp.error_for_status_ref() {
            let _ = tx.send(Err(Box::new(e) as _)).await;
            return;
        }

        let mut bytes = resp.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(buf) => {
                    pending.extend_from_slice(&buf);
                    for line in drain_lines(&mut pending) {
                        match line_parser(&line) {
                            StreamLine::Fragment(tok) => {
                                if tx.send(Ok(tok)).await.is_err() {
                                    return;
                                }
                            }
                            StreamLine::Done => {
                                return;
                            }
                            StreamLine::Skip => {}
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(Box::new(e) as _)).await;
                    return;
                }
            }
        }

        if !pending.is_empty() {
            let tail = String::from_utf8_lossy(&pending).trim().to_string();
            if let StreamLine::Fragment(tok) = line_parser(&tail) {
                let _ = tx.send(Ok(tok)).await;
            }
        }
        debug!("Stream from {} finished", url);
    })
}
