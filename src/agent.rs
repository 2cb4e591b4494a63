use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig };
use crate::error::AgentError;
use crate::llm::{ parse_llm_type, BoxError, LlmConfig };
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::models::api::ChatResponse;
use crate::pipeline::{ status_message, PipelineStage };
use crate::pipeline::collector::InfoCollector;
use crate::pipeline::renderer::{ check_rendered_html, EmailRenderer, FragmentObserver };
use crate::pipeline::synthesizer::CampaignSynthesizer;
use crate::scrape::{ HttpMetadataExtractor, MetadataExtractor };
use crate::pipeline::collector::DEFAULT_MAX_PRODUCTS;
use crate::session::{ SessionRegistry, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE_TTL };

use log::{ info, error };
use std::sync::Arc;
use std::time::Duration;

pub struct AgentSettings {
    pub max_products: usize,
    pub fragment_delay: Duration,
    pub observer: Option<Arc<dyn FragmentObserver>>,
    pub session_idle_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_products: DEFAULT_MAX_PRODUCTS,
            fragment_delay: Duration::ZERO,
            observer: None,
            session_idle_ttl: DEFAULT_SESSION_IDLE_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

/// Runs collect → synthesize → render for each inbound message.
pub struct CampaignAgent {
    sessions: SessionRegistry,
    collector: InfoCollector,
    synthesizer: CampaignSynthesizer,
    renderer: EmailRenderer,
}

impl CampaignAgent {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        extractor: Arc<dyn MetadataExtractor>,
        prompt_config: Arc<PromptConfig>,
        settings: AgentSettings
    ) -> Self {
        Self {
            sessions: SessionRegistry::with_limits(settings.session_idle_ttl, settings.max_sessions),
            collector: InfoCollector::new(
                Arc::clone(&chat_client),
                extractor,
                Arc::clone(&prompt_config),
                settings.max_products
            ),
            synthesizer: CampaignSynthesizer::new(Arc::clone(&chat_client), Arc::clone(&prompt_config)),
            renderer: EmailRenderer::new(
                chat_client,
                prompt_config,
                settings.observer,
                settings.fragment_delay
            ),
        }
    }

    fn initialize_chat_client(args: &Args) -> Result<Arc<dyn ChatClient>, BoxError> {
        let chat_config = LlmConfig {
            llm_type: parse_llm_type(&args.chat_llm_type)?,
            api_key: args.resolved_api_key(),
            completion_model: args.chat_model.clone(),
            base_url: args.chat_base_url.clone(),
            temperature: args.chat_temperature,
            max_tokens: Some(args.render_max_tokens),
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}, BaseURL={}",
            chat_config.llm_type,
            chat_client.get_model(),
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );
        Ok(chat_client)
    }

    pub fn from_args(
        args: &Args,
        observer: Option<Arc<dyn FragmentObserver>>
    ) -> Result<Self, BoxError> {
        let chat_client = Self::initialize_chat_client(args)?;
        let extractor = Arc::new(
            HttpMetadataExtractor::new(Duration::from_secs(args.scrape_timeout_secs))?
        );
        let prompt_config = prompt::load_prompts(args.prompts_path.as_deref())?;
        let settings = AgentSettings {
            max_products: args.max_products,
            fragment_delay: Duration::from_millis(args.render_fragment_delay_ms),
            observer,
            session_idle_ttl: Duration::from_secs(args.session_idle_secs),
            max_sessions: args.max_sessions,
        };
        Ok(Self::new(chat_client, extractor, prompt_config, settings))
    }

    /// Handles one chat message for `session_id`, running the later stages
    /// within the same call once the interview is complete.
    ///
    /// `Err` means the request failed outright. A stalled pipeline is an `Ok`
    /// response whose `stage` and `error` say where it stopped.
    pub async fn process_message(
        &self,
        session_id: &str,
        message: &str
    ) -> Result<ChatResponse, AgentError> {
        let session_lock = self.sessions.session(session_id).await;
        let mut guard = session_lock.lock().await;
        let session = &mut *guard;

        let reply = self.collector
            .collect(session, message).await
            .map_err(|e| {
                error!("Collector failed for session '{}': {}", session_id, e);
                e
            })?;

        let product_count = session.state.products.len();
        if !session.state.campaign_info_complete {
            return Ok(ChatResponse {
                reply,
                status: status_message(PipelineStage::Collecting, product_count),
                stage: PipelineStage::Collecting,
                campaign_json: None,
                html_output: None,
                error: None,
            });
        }

        info!(
            "Session '{}': {}",
            session_id,
            status_message(PipelineStage::InfoComplete, product_count)
        );
        let Some(campaign) = self.synthesizer.synthesize(&session.memory, &mut session.state).await? else {
            return Ok(ChatResponse {
                reply,
                status: status_message(PipelineStage::ErrorJson, product_count),
                stage: PipelineStage::ErrorJson,
                campaign_json: None,
                html_output: None,
                error: Some("Failed to generate campaign JSON".to_string()),
            });
        };

        info!(
            "Session '{}': {}",
            session_id,
            status_message(PipelineStage::JsonReady, product_count)
        );
        let rendered = self.renderer
            .render(&campaign).await
            .and_then(|html| check_rendered_html(&html).map(|_| html).map_err(AgentError::Render));

        match rendered {
            Ok(html) =>
                Ok(ChatResponse {
                    reply,
                    status: status_message(PipelineStage::HtmlReady, product_count),
                    stage: PipelineStage::HtmlReady,
                    campaign_json: Some(campaign),
                    html_output: Some(html),
                    error: None,
                }),
            Err(e) => {
                error!("HTML generation failed for session '{}': {}", session_id, e);
                Ok(ChatResponse {
                    reply,
                    status: status_message(PipelineStage::ErrorHtml, product_count),
                    stage: PipelineStage::ErrorHtml,
                    campaign_json: Some(campaign),
                    html_output: None,
                    error: Some("Failed to generate HTML".to_string()),
                })
            }
        }
    }

    pub async fn reset_session(&self, session_id: &str) {
        self.sessions.reset(session_id).await;
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}
