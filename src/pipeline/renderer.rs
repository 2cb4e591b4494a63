use futures::StreamExt;
use log::{ debug, info };
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::config::prompt::{ get_render_prompt, PromptConfig };
use crate::error::AgentError;
use crate::llm::chat::{ ChatClient, FragmentStream };
use crate::models::campaign::CampaignDescription;
use crate::models::chat::ChatMessage;

/// Watches fragments as they arrive. Purely observational.
pub trait FragmentObserver: Send + Sync {
    fn on_fragment(&self, fragment: &str);
}

/// Echoes fragments to stdout as they stream in.
pub struct StdoutEcho;

impl FragmentObserver for StdoutEcho {
    fn on_fragment(&self, fragment: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(fragment.as_bytes()).and_then(|_| stdout.flush()) {
            debug!("Failed to echo HTML fragment to stdout: {}", e);
        }
    }
}

/// Logs each fragment at debug level. Used when no observer is configured.
pub struct DebugLogEcho;

impl FragmentObserver for DebugLogEcho {
    fn on_fragment(&self, fragment: &str) {
        debug!("HTML fragment: {}", fragment);
    }
}

/// Concatenates fragments in arrival order until the stream ends. Without an
/// observer each fragment goes to the debug log.
pub async fn accumulate_fragments(
    mut stream: FragmentStream,
    observer: Option<&dyn FragmentObserver>,
    fragment_delay: Duration
) -> Result<String, AgentError> {
    let observer = observer.unwrap_or(&DebugLogEcho);
    let mut document = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment.map_err(AgentError::Stream)?;
        document.push_str(&fragment);
        observer.on_fragment(&fragment);
        if !fragment_delay.is_zero() {
            tokio::time::sleep(fragment_delay).await;
        }
    }
    Ok(document)
}

/// Checks that a rendered document is usable, returning the reason when not.
/// Leading whitespace is ignored, so an indented `Error` marker is rejected too.
pub fn check_rendered_html(html: &str) -> Result<(), String> {
    let trimmed = html.trim_start();
    if trimmed.is_empty() {
        Err("model returned an empty document".to_string())
    } else if trimmed.starts_with("Error") {
        Err(format!("model returned an error marker: {}", trimmed.lines().next().unwrap_or_default()))
    } else {
        Ok(())
    }
}

/// Stage three: streams an HTML email for a campaign.
pub struct EmailRenderer {
    chat_client: Arc<dyn ChatClient>,
    prompt_config: Arc<PromptConfig>,
    observer: Option<Arc<dyn FragmentObserver>>,
    fragment_delay: Duration,
}

impl EmailRenderer {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        prompt_config: Arc<PromptConfig>,
        observer: Option<Arc<dyn FragmentObserver>>,
        fragment_delay: Duration
    ) -> Self {
        Self { chat_client, prompt_config, observer, fragment_delay }
    }

    pub async fn render(&self, campaign: &CampaignDescription) -> Result<String, AgentError> {
        let campaign_json = serde_json::to_string_pretty(campaign)?;
        let messages = vec![
            ChatMessage::system(self.prompt_config.renderer_system.clone()),
            ChatMessage::user(get_render_prompt(&self.prompt_config, &campaign_json))
        ];

        info!("Starting HTML generation for campaign '{}'", campaign.campaign_name);
        let stream = self.chat_client.stream_chat(&messages).await.map_err(AgentError::Llm)?;
        let html = accumulate_fragments(stream, self.observer.as_deref(), self.fragment_delay).await?;
        info!("HTML generation finished ({} bytes)", html.len());
        Ok(html)
    }
}
