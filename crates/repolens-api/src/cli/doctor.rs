//! `repolens doctor`: check the pieces a request depends on.

use console::style;
use secrecy::SecretString;
use serde::Serialize;

use repolens_core::conversation::store::ConversationStore;
use repolens_infra::config;
use repolens_infra::llm::{create_provider, test_provider_connection};
use repolens_infra::sqlite::conversation::SqliteConversationStore;
use repolens_infra::sqlite::pool::DatabasePool;
use repolens_types::config::ModelConfig;

use crate::state::Bootstrap;

#[derive(Debug, Serialize)]
struct Check {
    name: String,
    ok: bool,
    detail: String,
}

impl Check {
    fn new(name: impl Into<String>, result: Result<String, String>) -> Self {
        let (ok, detail) = match result {
            Ok(detail) => (true, detail),
            Err(detail) => (false, detail),
        };
        Self {
            name: name.into(),
            ok,
            detail,
        }
    }
}

pub async fn doctor(bootstrap: Bootstrap, json: bool) -> anyhow::Result<()> {
    let Bootstrap {
        data_dir,
        config: app_config,
        secrets,
    } = bootstrap;
    let mut checks = vec![Check::new("data_dir", Ok(data_dir.display().to_string()))];

    let database_url = config::database_url(&app_config, &data_dir);
    let store = match DatabasePool::new(&database_url).await {
        Ok(pool) => SqliteConversationStore::new(pool)
            .ping()
            .await
            .map(|()| database_url.clone())
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    checks.push(Check::new("store", store));

    let present = |name: &str, secret: &Option<SecretString>| {
        Check::new(
            name,
            if secret.is_some() { Ok("set".to_string()) } else { Err("not set".to_string()) },
        )
    };
    checks.push(present(config::API_BEARER_TOKEN_ENV, &secrets.api_bearer_token));
    checks.push(present(config::GITHUB_TOKEN_ENV, &secrets.github_token));

    checks.push(
        probe_model("primary", &app_config.primary, secrets.primary_api_key).await,
    );
    if let Some(fallback) = &app_config.fallback {
        checks.push(probe_model("fallback", fallback, secrets.fallback_api_key).await);
    }

    let healthy = checks.iter().all(|c| c.ok);
    if json {
        let report = serde_json::json!({ "healthy": healthy, "checks": checks });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("  {} repolens doctor", style("🔍").bold());
        println!();
        for check in &checks {
            let mark = if check.ok {
                style("✓").green()
            } else {
                style("✗").red()
            };
            println!("  {mark} {:<18} {}", check.name, style(&check.detail).dim());
        }
        println!();
    }

    if !healthy {
        anyhow::bail!("one or more checks failed");
    }
    Ok(())
}

async fn probe_model(label: &str, model: &ModelConfig, key: Option<SecretString>) -> Check {
    let name = format!("{label} model");
    let Some(key) = key else {
        return Check::new(name, Err(format!("{} not set", model.api_key_env)));
    };
    let result = match create_provider(model, key) {
        Ok(provider) => test_provider_connection(&provider)
            .await
            .map(|()| format!("{} / {}", provider.name(), provider.model()))
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    Check::new(name, result)
}
