use log::{ debug, info };
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::config::prompt::{ get_collector_turn_prompt, PromptConfig, COMPLETION_SENTINEL };
use crate::error::AgentError;
use crate::llm::chat::ChatClient;
use crate::models::chat::ChatMessage;
use crate::scrape::MetadataExtractor;
use crate::session::Session;

pub const DEFAULT_MAX_PRODUCTS: usize = 10;

static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

pub fn find_links(message: &str) -> Vec<&str> {
    LINK.find_iter(message).map(|m| m.as_str()).collect()
}

pub fn contains_sentinel(reply: &str) -> bool {
    reply.to_lowercase().contains(COMPLETION_SENTINEL)
}

/// Stage one: gathers product links and runs the guided interview.
pub struct InfoCollector {
    chat_client: Arc<dyn ChatClient>,
    extractor: Arc<dyn MetadataExtractor>,
    prompt_config: Arc<PromptConfig>,
    max_products: usize,
}

impl InfoCollector {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        extractor: Arc<dyn MetadataExtractor>,
        prompt_config: Arc<PromptConfig>,
        max_products: usize
    ) -> Self {
        Self { chat_client, extractor, prompt_config, max_products }
    }

    /// Records any product links, asks the model for the next interview turn
    /// and returns its reply.
    ///
    /// Products scraped before a failed model call are kept; the conversation
    /// memory is only written once the model has answered.
    pub async fn collect(&self, session: &mut Session, user_message: &str) -> Result<String, AgentError> {
        for link in find_links(user_message) {
            if session.state.products.len() >= self.max_products {
                debug!("Product limit {} reached, skipping {}", self.max_products, link);
                continue;
            }
            let record = self.extractor.extract(link.trim()).await;
            info!("Collected product '{}' from {}", record.title, record.url);
            session.state.products.push(record);
        }

        let products_json = serde_json::to_string_pretty(&session.state.products)?;
        let mut messages = vec![ChatMessage::system(self.prompt_config.collector_system.clone())];
        messages.extend(session.memory.as_prompt_messages());
        messages.push(
            ChatMessage::user(get_collector_turn_prompt(&self.prompt_config, &products_json, user_message))
        );

        let reply = self.chat_client.complete(&messages).await.map_err(AgentError::Llm)?.response;

        session.memory.add_user_message(user_message);
        session.memory.add_assistant_message(&reply);

        if contains_sentinel(&reply) && !session.state.campaign_info_complete {
            info!("Completion phrase detected, campaign info marked complete");
            session.state.mark_complete();
        }

        Ok(reply)
    }
}
