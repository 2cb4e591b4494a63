use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (openai, ollama, deepseek, xai, groq)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider. Falls back to OPENAI_API_KEY.
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-4o-mini, llama3.1)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Sampling temperature used for every stage.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.7")]
    pub chat_temperature: f32,

    /// Token cap for the streamed HTML rendering request.
    #[arg(long, env = "RENDER_MAX_TOKENS", default_value = "4000")]
    pub render_max_tokens: u32,

    /// Pause after each streamed HTML fragment, in milliseconds. 0 disables it.
    #[arg(long, env = "RENDER_FRAGMENT_DELAY_MS", default_value = "10")]
    pub render_fragment_delay_ms: u64,

    // --- Product Scraping Args ---
    /// Timeout in seconds for fetching a product page.
    #[arg(long, env = "SCRAPE_TIMEOUT_SECS", default_value = "10")]
    pub scrape_timeout_secs: u64,

    /// Maximum number of products collected per session.
    #[arg(long, env = "MAX_PRODUCTS", default_value = "10")]
    pub max_products: usize,

    // --- Session Args ---
    /// Seconds a session may sit idle before it is discarded. 0 keeps sessions forever.
    #[arg(long, env = "SESSION_IDLE_SECS", default_value = "3600")] // 1 hour
    pub session_idle_secs: u64,

    /// Maximum number of live sessions. 0 means unbounded.
    #[arg(long, env = "MAX_SESSIONS", default_value = "1000")]
    pub max_sessions: usize,

    // --- General App Args ---
    /// Path to a JSON file overriding the built-in prompt templates.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:5000")]
    pub server_addr: String,

    /// Page served at `/`.
    #[arg(long, env = "INDEX_PATH", default_value = "index.html")]
    pub index_path: String,

    /// Chat on the terminal instead of starting the HTTP server.
    #[arg(long, env = "INTERACTIVE", default_value = "false")]
    pub interactive: bool,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

impl Args {
    pub fn resolved_api_key(&self) -> Option<String> {
        Some(self.chat_api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()))
    }
}
