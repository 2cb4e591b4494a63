//! Scripted collaborators for exercising the pipeline without a network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Mutex;

use crate::llm::BoxError;
use crate::llm::chat::{ ChatClient, CompletionResponse, FragmentStream };
use crate::models::campaign::ProductRecord;
use crate::models::chat::ChatMessage;
use crate::scrape::{ normalize_url, MetadataExtractor };

#[derive(Default)]
pub struct ScriptedChatClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    streams: Mutex<VecDeque<Result<Vec<Result<String, String>>, String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn push_error(&self, message: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn push_stream(&self, fragments: &[&str]) -> &Self {
        let items = fragments.iter().map(|f| Ok(f.to_string())).collect();
        self.streams.lock().unwrap().push_back(Ok(items));
        self
    }

    pub fn push_stream_items(&self, items: Vec<Result<String, String>>) -> &Self {
        self.streams.lock().unwrap().push_back(Ok(items));
        self
    }

    pub fn push_stream_error(&self, message: &str) -> &Self {
        self.streams.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<CompletionResponse, BoxError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => Ok(CompletionResponse { response }),
            Some(Err(message)) => Err(message.into()),
            None => Err("no scripted reply left".into()),
        }
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<FragmentStream, BoxError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self.streams.lock().unwrap().pop_front();
        match next {
            Some(Ok(items)) => {
                let items: Vec<Result<String, BoxError>> = items
                    .into_iter()
                    .map(|item| item.map_err(BoxError::from))
                    .collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
            Some(Err(message)) => Err(message.into()),
            None => Err("no scripted stream left".into()),
        }
    }

    fn get_model(&self) -> String {
        "scripted".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}

/// Extractor that fabricates a record per call without touching the network.
#[derive(Default)]
pub struct StubExtractor {
    calls: AtomicUsize,
}

impl StubExtractor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataExtractor for StubExtractor {
    async fn extract(&self, url: &str) -> ProductRecord {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = normalize_url(url);
        ProductRecord {
            title: format!("Title of {}", url),
            url,
            image: "https://img.shop.example/p.png".to_string(),
            price: Some("$10.00".to_string()),
            error: None,
        }
    }
}
