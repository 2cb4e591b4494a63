use serde::Deserialize;
use thiserror::Error;
use std::fs;
use std::sync::Arc;
use log::info;

/// Phrase the collector is told to emit once the interview is finished.
pub const COMPLETION_SENTINEL: &str = "all information collected";

const COLLECTOR_SYSTEM: &str =
    r#"You are a friendly email marketing assistant. Your goal is:
1. Collect 1-10 product URLs from the user.
2. Collect campaign info step-by-step: campaign name, audience, tone, call-to-action. Give examples to help user decide.
3. Only confirm completion when all fields are collected.
4. Ask for missing info in a friendly manner, one question at a time.
5. Once you feel like you have all the information required, reply with "all information collected" ONLY."#;

const COLLECTOR_TURN: &str = r#"Products collected so far: {products}
User says: {message}"#;

const SYNTHESIZER_SYSTEM: &str = "You are a JSON generator.";

const SYNTHESIZER_REQUEST: &str =
    r#"You are an expert assistant that converts an email campaign conversation into structured JSON.
The conversation so far, as a list of role-tagged turns:

{transcript}

Products collected:

{products}

Requirements:
1. Output a valid JSON object with these fields:
   - campaign_name
   - audience
   - tone
   - call_to_action
   - products (each with title, url, image, price)
2. Return ONLY JSON, no explanations or extra text."#;

const RENDERER_SYSTEM: &str = "You are an expert email designer. Return ONLY HTML.";

const RENDERER_REQUEST: &str =
    r#"Create a complete HTML email campaign based on this JSON:

{campaign}

Requirements:
1. Complete HTML (DOCTYPE, head, body)
2. Inline CSS, responsive design
3. Include products with title, image, price
4. Include call-to-action and visually appealing layout

Return ONLY HTML code without explanations or any text. Strictly PURE Html."#;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt template '{template}' is missing placeholder '{placeholder}'")]
    MissingPlaceholder {
        template: &'static str,
        placeholder: &'static str,
    },
    #[error("Prompt file IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Prompt JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Prompt templates for the three pipeline stages. A JSON override file only
/// needs the fields it changes.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PromptConfig {
    pub collector_system: String,
    pub collector_turn: String,
    pub synthesizer_system: String,
    pub synthesizer_request: String,
    pub renderer_system: String,
    pub renderer_request: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            collector_system: COLLECTOR_SYSTEM.to_string(),
            collector_turn: COLLECTOR_TURN.to_string(),
            synthesizer_system: SYNTHESIZER_SYSTEM.to_string(),
            synthesizer_request: SYNTHESIZER_REQUEST.to_string(),
            renderer_system: RENDERER_SYSTEM.to_string(),
            renderer_request: RENDERER_REQUEST.to_string(),
        }
    }
}

impl PromptConfig {
    pub fn validate(&self) -> Result<(), PromptError> {
        let required: [(&'static str, &str, &'static str); 5] = [
            ("collector_turn", self.collector_turn.as_str(), "{products}"),
            ("collector_turn", self.collector_turn.as_str(), "{message}"),
            ("synthesizer_request", self.synthesizer_request.as_str(), "{transcript}"),
            ("synthesizer_request", self.synthesizer_request.as_str(), "{products}"),
            ("renderer_request", self.renderer_request.as_str(), "{campaign}"),
        ];
        for (template, text, placeholder) in required {
            if !text.contains(placeholder) {
                return Err(PromptError::MissingPlaceholder { template, placeholder });
            }
        }
        Ok(())
    }
}

pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, PromptError> {
    let config = match path {
        Some(path) => {
            let file_content = fs::read_to_string(path)?;
            let config: PromptConfig = serde_json::from_str(&file_content)?;
            info!("Loaded prompt overrides from '{}'", path);
            config
        }
        None => PromptConfig::default(),
    };
    config.validate()?;
    Ok(Arc::new(config))
}

pub fn get_collector_turn_prompt(config: &PromptConfig, products_json: &str, message: &str) -> String {
    config.collector_turn.replace("{products}", products_json).replace("{message}", message)
}

pub fn get_synthesis_prompt(config: &PromptConfig, transcript_json: &str, products_json: &str) -> String {
    config.synthesizer_request
        .replace("{transcript}", transcript_json)
        .replace("{products}", products_json)
}

pub fn get_render_prompt(config: &PromptConfig, campaign_json: &str) -> String {
    config.renderer_request.replace("{campaign}", campaign_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_prompts_are_valid() {
        let config = load_prompts(None).unwrap();
        assert!(config.collector_system.contains(COMPLETION_SENTINEL));
    }

    #[test]
    fn override_file_keeps_unset_defaults() {
        let path = std::env::temp_dir().join(format!("prompts-{}.json", std::process::id()));
        fs::write(&path, r#"{"renderer_system": "Return HTML only."}"#).unwrap();

        let config = load_prompts(path.to_str()).unwrap();
        assert_eq!(config.renderer_system, "Return HTML only.");
        assert_eq!(config.synthesizer_system, SYNTHESIZER_SYSTEM);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_placeholder_is_rejected() {
        let config = PromptConfig {
            renderer_request: "Make an email".into(),
            ..PromptConfig::default()
        };
        assert!(
            matches!(config.validate(), Err(PromptError::MissingPlaceholder { placeholder: "{campaign}", .. }))
        );
    }

    #[test]
    fn prompt_errors_describe_and_chain() {
        let missing = PromptError::MissingPlaceholder { template: "renderer_request", placeholder: "{campaign}" };
        assert_eq!(
            missing.to_string(),
            "Prompt template 'renderer_request' is missing placeholder '{campaign}'"
        );

        let err = load_prompts(Some("/nonexistent/campaign-prompts.json")).unwrap_err();
        assert!(matches!(err, PromptError::IoError(_)));
        assert!(err.to_string().starts_with("Prompt file IO error: "));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn fills_placeholders() {
        let config = PromptConfig::default();
        let turn = get_collector_turn_prompt(&config, "[]", "hello");
        assert_eq!(turn, "Products collected so far: []\nUser says: hello");
        assert!(get_render_prompt(&config, "{\"tone\":\"fun\"}").contains("{\"tone\":\"fun\"}"));
    }
}
