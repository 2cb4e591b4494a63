pub mod agent;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod scrape;
pub mod server;
pub mod session;
#[cfg(test)]
mod testing;

use agent::CampaignAgent;
use cli::Args;
use log::info;
use llm::BoxError;
use pipeline::renderer::{ FragmentObserver, StdoutEcho };
use server::Server;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), BoxError> {
    info!("--- Core Configuration ---");
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("adapter default"));
    info!("Temperature: {}", args.chat_temperature);
    info!("Render Max Tokens: {}", args.render_max_tokens);
    info!("Render Fragment Delay: {}ms", args.render_fragment_delay_ms);
    info!("Scrape Timeout: {}s", args.scrape_timeout_secs);
    info!("Max Products: {}", args.max_products);
    info!("Session Idle TTL: {}s, Max Sessions: {}", args.session_idle_secs, args.max_sessions);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("Mode: {}", if args.interactive { "interactive console" } else { "HTTP server" });
    if !args.interactive {
        info!("Server Address: {}", args.server_addr);
        info!("Index Page: {}", args.index_path);
    }
    info!("-------------------------");

    if args.interactive {
        let observer: Arc<dyn FragmentObserver> = Arc::new(StdoutEcho);
        let agent = Arc::new(CampaignAgent::from_args(&args, Some(observer))?);
        return console::run_console(agent).await;
    }

    let agent = Arc::new(CampaignAgent::from_args(&args, None)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
