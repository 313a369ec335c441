//! CLI command implementations

use super::output::OutputHandler;
use crate::config::ExplainConfig;
use crate::explain::Explainer;
use crate::history::HistoryStore;
use crate::service::{ExplainService, SlidingWindowLimiter};
use crate::upstream::{HttpTransport, Transport};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Rate-limit key for requests made from the command line
pub const CLI_CLIENT: &str = "cli";

/// Read a snippet from `path`, or from stdin when `path` is `-`
pub fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut code = String::new();
        std::io::stdin()
            .read_to_string(&mut code)
            .context("reading code from stdin")?;
        return Ok(code);
    }

    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// History database location for `config`
pub fn history_path(config: &ExplainConfig) -> Result<PathBuf> {
    match config.history.resolved_path() {
        Some(path) => Ok(path),
        None => HistoryStore::default_path(),
    }
}

/// Wire the service from configuration over a real HTTP transport
pub fn build_service(config: &ExplainConfig) -> Result<ExplainService> {
    let transport = HttpTransport::new(Duration::from_secs(config.provider.timeout_secs))?;
    build_service_with(config, Arc::new(transport))
}

pub fn build_service_with(
    config: &ExplainConfig,
    transport: Arc<dyn Transport>,
) -> Result<ExplainService> {
    let explainer = Explainer::from_config(config, transport);
    let limiter = Arc::new(SlidingWindowLimiter::from_settings(&config.rate_limit));
    let mut service = ExplainService::new(explainer, limiter).with_debug(config.debug);

    if config.history.enabled {
        let path = history_path(config)?;
        service = service.with_history(HistoryStore::open(&path)?);
    }

    Ok(service)
}

/// Explain `code`, returning the process exit code
///
/// Rejected input exits 2; configuration and upstream failures exit 1.
pub async fn explain(
    service: &ExplainService,
    language: &str,
    code: &str,
    handler: &dyn OutputHandler,
) -> i32 {
    match service
        .explain_for(CLI_CLIENT, Some(language), Some(code))
        .await
    {
        Ok(result) => {
            handler.explanation(&result);
            0
        }
        Err(e) => {
            let status = e.status();
            handler.failure(status, &e.to_string());
            if status == 400 { 2 } else { 1 }
        }
    }
}

/// Report the resolved provider with the key masked
pub fn show_provider(explainer: &Explainer, handler: &dyn OutputHandler) -> i32 {
    match explainer.provider() {
        Ok(provider) => {
            handler.info(&format!("provider: {}", provider.kind));
            handler.info(&format!("endpoint: {}", provider.endpoint_url));
            handler.info(&format!(
                "model: {}",
                provider.model_name().unwrap_or("(provider default)")
            ));
            handler.info(&format!("api key: {}", mask_key(&provider.api_key)));
            handler.info(&format!("temperature: {}", provider.temperature));
            handler.info(&format!("timeout: {}s", provider.timeout.as_secs()));
            0
        }
        Err(e) => {
            handler.failure(500, &e.to_string());
            if let Some(field) = e.missing_field() {
                handler.info(&format!(
                    "set {} in the environment, a .env file or the [provider] config section",
                    field
                ));
            }
            1
        }
    }
}

/// List recent explanations
pub fn show_history(store: &HistoryStore, limit: usize, handler: &dyn OutputHandler) -> Result<()> {
    let entries = store.recent(limit)?;
    handler.history(&entries);
    Ok(())
}

/// Keep only the last four characters of a secret
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::tests::MockHandler;
    use crate::upstream::testing::MockTransport;
    use serde_json::json;

    fn config_for(url: &str) -> ExplainConfig {
        let mut config = ExplainConfig::default();
        config.provider.url = Some(url.into());
        config.provider.api_key = Some("sk-test-1234567890".into());
        config
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-test-1234567890"), "**************7890");
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key(""), "");
    }

    #[test]
    fn test_read_source_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snippet.py");
        std::fs::write(&path, "print(1)\n").unwrap();
        assert_eq!(read_source(&path).unwrap(), "print(1)\n");
        assert!(read_source(&dir.path().join("missing.py")).is_err());
    }

    #[tokio::test]
    async fn test_explain_success_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for("https://api.openai.com/v1/chat/completions");
        config.history.enabled = true;
        config.history.path = Some(dir.path().join("history.db").to_string_lossy().into_owned());

        let reply = json!({"choices": [{"message": {"content": "### Explanation\nPrints."}}]});
        let transport = Arc::new(MockTransport::replying(200, &reply.to_string()));
        let service = build_service_with(&config, transport).unwrap();
        let handler = MockHandler::default();

        let code = explain(&service, "python", "print(1)", &handler).await;
        assert_eq!(code, 0);
        assert_eq!(
            handler.explanations.lock().unwrap()[0].explanation,
            "Prints."
        );

        let store = HistoryStore::open(&history_path(&config).unwrap()).unwrap();
        show_history(&store, 5, &handler).unwrap();
        assert_eq!(*handler.histories.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_explain_rejection_exit_code() {
        let config = config_for("https://api.openai.com/v1/chat/completions");
        let transport = Arc::new(MockTransport::replying(200, "{}"));
        let service = build_service_with(&config, transport.clone()).unwrap();
        let handler = MockHandler::default();

        let code = explain(&service, "ruby", "puts 1", &handler).await;
        assert_eq!(code, 2);
        assert_eq!(handler.failures.lock().unwrap()[0].0, 400);
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_explain_missing_config_exit_code() {
        let config = ExplainConfig::default();
        let transport = Arc::new(MockTransport::replying(200, "{}"));
        let service = build_service_with(&config, transport).unwrap();
        let handler = MockHandler::default();

        let code = explain(&service, "python", "print(1)", &handler).await;
        assert_eq!(code, 1);
        assert_eq!(
            handler.failures.lock().unwrap()[0],
            (500, "LLM_API_URL not configured".to_string())
        );
    }

    #[test]
    fn test_show_provider_masks_key() {
        let config = config_for("https://api.anthropic.com/v1/messages");
        let transport = Arc::new(MockTransport::new(vec![]));
        let explainer = Explainer::from_config(&config, transport);
        let handler = MockHandler::default();

        assert_eq!(show_provider(&explainer, &handler), 0);
        let infos = handler.infos.lock().unwrap();
        assert!(infos.contains(&"provider: anthropic".to_string()));
        assert!(infos.contains(&"model: claude-3-opus-20240229".to_string()));
        assert!(infos.iter().all(|line| !line.contains("sk-test-1234567890")));
    }

    #[test]
    fn test_show_provider_reports_missing_key() {
        let mut config = ExplainConfig::default();
        config.provider.url = Some("https://api.openai.com/v1".into());
        let explainer = Explainer::from_config(&config, Arc::new(MockTransport::new(vec![])));
        let handler = MockHandler::default();

        assert_eq!(show_provider(&explainer, &handler), 1);
        assert_eq!(
            handler.failures.lock().unwrap()[0].1,
            "LLM_API_KEY not configured"
        );
        let infos = handler.infos.lock().unwrap();
        assert_eq!(infos.len(), 1);
        assert!(infos[0].starts_with("set LLM_API_KEY in the environment"));
    }
}
