pub mod api;

use crate::agent::CampaignAgent;
use crate::cli::Args;
use crate::llm::BoxError;
use std::sync::Arc;

pub struct Server {
    addr: String,
    agent: Arc<CampaignAgent>,
    args: Args,
}

impl Server {
    pub fn new(addr: String, agent: Arc<CampaignAgent>, args: Args) -> Self {
        Self { addr, agent, args }
    }

    pub async fn run(&self) -> Result<(), BoxError> {
        api::start_http_server(&self.addr, self.agent.clone(), self.args.clone()).await
    }
}
