//! Interactive `repolens chat` loop.

mod follow_up;
mod input;

use console::style;

use crate::state::AppState;

use follow_up::FollowUp;
use input::{ChatInput, InputEvent};

pub async fn run_chat(state: &AppState, session: Option<String>) -> anyhow::Result<()> {
    let session_id = session.unwrap_or_else(super::new_id);
    let primary = state.orchestrator.primary();

    println!();
    println!(
        "  {} {}",
        style("repolens").cyan().bold(),
        style(format!("{} / {}", primary.provider_name(), primary.model())).dim()
    );
    if let Some(fallback) = state.orchestrator.fallback() {
        println!(
            "  {}",
            style(format!("fallback {} / {}", fallback.provider_name(), fallback.model())).dim()
        );
    }
    println!("  {}", style(format!("session {session_id}")).dim());
    println!(
        "  {}",
        style("Paste a GitHub URL and ask away. Type 'quit' or press Ctrl+D to exit.").dim()
    );
    println!();

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;
    let mut follow_up = FollowUp::default();

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("  {}", style("Press Ctrl+D or type 'quit' to exit.").dim());
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) if text.eq_ignore_ascii_case("quit") => break,
            InputEvent::Message(text) => text,
        };

        let query = follow_up.rewrite(&text);
        if query != text {
            tracing::debug!(%query, "rewrote follow-up");
        }

        let request_id = super::new_id();
        match state.orchestrator.handle(&query, &session_id, &request_id).await {
            Ok(outcome) if outcome.success => {
                let answer = outcome.response_text.unwrap_or_default();
                println!("\n  {} {}\n", style("repolens >").cyan().bold(), answer.trim());
            }
            Ok(outcome) => {
                let message = outcome.error.unwrap_or_default();
                println!("\n  {} {}\n", style("!").yellow().bold(), message);
            }
            Err(e) => {
                println!("\n  {} {e}\n", style("!").red().bold());
            }
        }
    }

    chat_input.flush();
    println!("\n  {}", style("Session ended.").dim());
    Ok(())
}
