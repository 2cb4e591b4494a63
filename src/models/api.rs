use serde::{ Deserialize, Serialize };

use crate::models::campaign::CampaignDescription;
use crate::pipeline::PipelineStage;

#[derive(Deserialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ResetRequest {
    pub session_id: Option<String>,
}

/// Outcome of one inbound chat message.
///
/// `error` is set when the pipeline stalled after the collector replied; the
/// reply and anything produced before the stall are still returned.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatResponse {
    pub reply: String,
    pub status: String,
    pub stage: PipelineStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_json: Option<CampaignDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ResetResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}
