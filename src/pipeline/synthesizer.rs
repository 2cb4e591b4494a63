use log::{ error, info };
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::config::prompt::{ get_synthesis_prompt, PromptConfig };
use crate::error::AgentError;
use crate::history::ConversationMemory;
use crate::llm::chat::ChatClient;
use crate::models::campaign::CampaignDescription;
use crate::models::chat::ChatMessage;
use crate::session::SessionState;

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```(?i:json)?\s*").unwrap());
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

/// Removes a surrounding Markdown code fence, optionally tagged `json`.
pub fn strip_code_fence(raw: &str) -> String {
    let content = raw.trim();
    if !content.starts_with("```") {
        return content.to_string();
    }
    let opened = FENCE_OPEN.replace(content, "");
    FENCE_CLOSE.replace(&opened, "").into_owned()
}

/// Parses a model reply into a campaign. Anything that is not a JSON object
/// after fence stripping yields `None`.
pub fn parse_campaign(raw: &str) -> Option<CampaignDescription> {
    let content = strip_code_fence(raw);
    let parsed = serde_json::from_str::<JsonValue>(&content).and_then(|value| {
        if value.is_object() {
            serde_json::from_value::<CampaignDescription>(value)
        } else {
            Err(serde::de::Error::custom("expected a JSON object"))
        }
    });
    match parsed {
        Ok(campaign) => Some(campaign),
        Err(e) => {
            error!("Failed to parse JSON from LLM output ({}):\n{}", e, content);
            None
        }
    }
}

/// Stage two: turns the finished interview into a structured campaign.
pub struct CampaignSynthesizer {
    chat_client: Arc<dyn ChatClient>,
    prompt_config: Arc<PromptConfig>,
}

impl CampaignSynthesizer {
    pub fn new(chat_client: Arc<dyn ChatClient>, prompt_config: Arc<PromptConfig>) -> Self {
        Self { chat_client, prompt_config }
    }

    /// Returns `Ok(None)` when the model answered with something that is not
    /// a campaign object; `state.campaign_json` is then left untouched.
    pub async fn synthesize(
        &self,
        memory: &ConversationMemory,
        state: &mut SessionState
    ) -> Result<Option<CampaignDescription>, AgentError> {
        let transcript_json = serde_json::to_string_pretty(&memory.labeled_transcript())?;
        let products_json = serde_json::to_string_pretty(&state.products)?;
        let messages = vec![
            ChatMessage::system(self.prompt_config.synthesizer_system.clone()),
            ChatMessage::user(get_synthesis_prompt(&self.prompt_config, &transcript_json, &products_json))
        ];

        let raw = self.chat_client.complete(&messages).await.map_err(AgentError::Llm)?.response;

        let campaign = parse_campaign(&raw);
        if let Some(campaign) = &campaign {
            info!(
                "Campaign '{}' synthesized with {} product(s)",
                campaign.campaign_name,
                campaign.products.len()
            );
            state.campaign_json = Some(campaign.clone());
        }
        Ok(campaign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChatClient;

    const CAMPAIGN: &str =
        r#"{"campaign_name":"Winter Warmers","audience":"Hikers","tone":"Cozy","call_to_action":"Shop now","products":[{"title":"Wool Socks","url":"https://shop.example/socks","image":"https://shop.example/socks.jpg","price":"$12.00"}]}"#;

    #[test]
    fn fenced_and_bare_replies_parse_identically() {
        let fenced = format!("```json\n{}\n```", CAMPAIGN);
        let bare_fence = format!("```\n{}\n```", CAMPAIGN);
        let expected = parse_campaign(CAMPAIGN).unwrap();
        assert_eq!(parse_campaign(&fenced), Some(expected.clone()));
        assert_eq!(parse_campaign(&bare_fence), Some(expected.clone()));
        assert_eq!(expected.products[0].price.as_deref(), Some("$12.00"));
    }

    #[test]
    fn strip_leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fence("  {\"a\":1}\n"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```JSON\n{}\n```"), "{}");
    }

    #[test]
    fn prose_and_non_objects_are_rejected() {
        assert_eq!(parse_campaign("Sure! Here is your campaign: it is great."), None);
        assert_eq!(parse_campaign("[1, 2, 3]"), None);
        assert_eq!(parse_campaign("```json\n{\"campaign_name\": \n```"), None);
    }

    fn memory() -> ConversationMemory {
        let mut memory = ConversationMemory::new();
        memory.add_user_message("https://shop.example/socks");
        memory.add_assistant_message("all information collected");
        memory
    }

    #[tokio::test]
    async fn stores_parsed_campaign_in_state() {
        let client = Arc::new(ScriptedChatClient::new());
        client.push_reply(&format!("```json\n{}\n```", CAMPAIGN));
        let synthesizer = CampaignSynthesizer::new(client.clone(), Arc::new(PromptConfig::default()));
        let mut state = SessionState::default();

        let campaign = synthesizer.synthesize(&memory(), &mut state).await.unwrap().unwrap();

        assert_eq!(campaign.campaign_name, "Winter Warmers");
        assert_eq!(state.campaign_json, Some(campaign));
        let request = &client.requests()[0];
        assert_eq!(request[0].content, "You are a JSON generator.");
        assert!(request[1].content.contains("\"role\": \"assistant\""));
    }

    #[tokio::test]
    async fn unparsable_reply_keeps_previous_campaign() {
        let client = Arc::new(ScriptedChatClient::new());
        client.push_reply("I could not produce JSON, sorry.");
        let synthesizer = CampaignSynthesizer::new(client, Arc::new(PromptConfig::default()));
        let previous = parse_campaign(CAMPAIGN).unwrap();
        let mut state = SessionState { campaign_json: Some(previous.clone()), ..SessionState::default() };

        let result = synthesizer.synthesize(&memory(), &mut state).await.unwrap();

        assert!(result.is_none());
        assert_eq!(state.campaign_json, Some(previous));
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let client = Arc::new(ScriptedChatClient::new());
        client.push_error("503 Service Unavailable");
        let synthesizer = CampaignSynthesizer::new(client, Arc::new(PromptConfig::default()));
        let mut state = SessionState::default();

        let result = synthesizer.synthesize(&memory(), &mut state).await;
        assert!(matches!(result, Err(AgentError::Llm(_))));
    }
}
