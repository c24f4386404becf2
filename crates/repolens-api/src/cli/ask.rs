//! One-shot `repolens ask`.

use console::style;

use crate::http::response::AgentResponse;
use crate::state::AppState;

pub async fn ask(state: &AppState, query: &str, session: Option<String>, json: bool) -> anyhow::Result<()> {
    let session_id = session.unwrap_or_else(super::new_id);
    let request_id = super::new_id();

    let outcome = state
        .orchestrator
        .handle(query, &session_id, &request_id)
        .await?;
    let provider = outcome.provider.clone();
    let response = AgentResponse::from(outcome);

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!();
    match (&response.response, &response.error) {
        (Some(answer), _) if response.success => println!("  {}", answer.trim()),
        (_, Some(error)) => println!("  {} {}", style("!").yellow().bold(), error),
        _ => {}
    }
    println!();
    println!(
        "  {}",
        style(format!(
            "{provider} | {:.1}s | session {session_id}",
            response.elapsed_time.unwrap_or_default()
        ))
        .dim()
    );
    println!();
    Ok(())
}
