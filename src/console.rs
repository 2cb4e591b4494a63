use crate::agent::CampaignAgent;
use crate::llm::BoxError;
use crate::pipeline::PipelineStage;
use crate::session::DEFAULT_SESSION_ID;
use log::error;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, BufReader };

pub async fn run_console(agent: Arc<CampaignAgent>) -> Result<(), BoxError> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_console_with(&agent, stdin, std::io::stdout()).await
}

/// Terminal chat loop. Ends on `exit`/`quit`, end of input, or once the
/// pipeline has gone past the collecting stage.
pub async fn run_console_with<R, W>(agent: &CampaignAgent, input: R, mut out: W) -> Result<(), BoxError>
    where R: AsyncBufRead + Unpin, W: Write
{
    writeln!(out, "Email Campaign Bot Started!\n")?;
    writeln!(out, "Bot: Hi! Let's start your email campaign. Please provide 1 to 10 product URLs.\n")?;

    let mut lines = input.lines();
    loop {
        write!(out, "You: ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let user_input = line.trim();
        if user_input.is_empty() {
            continue;
        }
        if matches!(user_input.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let response = match agent.process_message(DEFAULT_SESSION_ID, user_input).await {
            Ok(response) => response,
            Err(e) => {
                error!("Console request failed: {}", e);
                writeln!(out, "Bot: Sorry, something went wrong. Please try again.\n")?;
                continue;
            }
        };
        writeln!(out, "\nBot: {}\n", response.reply)?;

        match response.stage {
            PipelineStage::Collecting | PipelineStage::InfoComplete => {}
            PipelineStage::ErrorJson => {
                writeln!(out, "Bot: Failed to generate JSON via LLM.")?;
                break;
            }
            PipelineStage::JsonReady | PipelineStage::HtmlReady | PipelineStage::ErrorHtml => {
                if let Some(campaign) = &response.campaign_json {
                    writeln!(out, "Bot: JSON generated via LLM!\n")?;
                    writeln!(out, "{}", serde_json::to_string_pretty(campaign)?)?;
                }
                if response.stage == PipelineStage::HtmlReady {
                    writeln!(out, "\nHTML generation complete!")?;
                } else {
                    writeln!(out, "\nBot: Failed to generate HTML.")?;
                }
                break;
            }
        }
    }
    Ok(())
}
