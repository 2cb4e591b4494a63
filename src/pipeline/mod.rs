pub mod collector;
pub mod renderer;
pub mod synthesizer;

use serde::{ Deserialize, Serialize };

/// Where a conversation stands after a chat message has been processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Collecting,
    InfoComplete,
    JsonReady,
    HtmlReady,
    ErrorJson,
    ErrorHtml,
}

pub fn status_message(stage: PipelineStage, product_count: usize) -> String {
    match stage {
        PipelineStage::Collecting if product_count == 0 =>
            "Ready to start! Paste a product link to begin.".to_string(),
        PipelineStage::Collecting =>
            format!("Collected {} product(s). Continue providing campaign details.", product_count),
        PipelineStage::InfoComplete => "Campaign complete! Generating campaign JSON...".to_string(),
        PipelineStage::JsonReady => "Campaign JSON ready! Generating HTML email...".to_string(),
        PipelineStage::HtmlReady => "HTML email generated successfully".to_string(),
        PipelineStage::ErrorJson => "Error generating JSON".to_string(),
        PipelineStage::ErrorHtml => "Error generating HTML".to_string(),
    }
}
