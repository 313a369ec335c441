//! Provider-specific request building and response extraction

use super::serper;
use super::types::{Extraction, UpstreamRequest};
use crate::config::{ProviderConfig, ProviderKind};
use crate::explain::ExplainRequest;
use serde_json::{Value, json};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Build the request `config.kind` expects
pub fn build_request(
    config: &ProviderConfig,
    prompt: &str,
    request: &ExplainRequest,
) -> UpstreamRequest {
    match config.kind {
        ProviderKind::Serper => serper::build_request(config, request),
        ProviderKind::Gemini => gemini_request(config, prompt),
        ProviderKind::OpenAi => openai_request(config, prompt),
        ProviderKind::Anthropic => anthropic_request(config, prompt),
        ProviderKind::Generic => generic_request(config, prompt),
    }
}

fn gemini_request(config: &ProviderConfig, prompt: &str) -> UpstreamRequest {
    let body = json!({
        "contents": [
            {
                "parts": [
                    { "text": prompt }
                ]
            }
        ],
        "generationConfig": {
            "temperature": config.temperature,
            "maxOutputTokens": config.max_tokens,
        }
    });

    UpstreamRequest::new(&config.endpoint_url, body).with_header("x-goog-api-key", &config.api_key)
}

fn openai_request(config: &ProviderConfig, prompt: &str) -> UpstreamRequest {
    let body = json!({
        "model": config.model_name(),
        "messages": [
            { "role": "user", "content": prompt }
        ],
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
    });

    UpstreamRequest::new(&config.endpoint_url, body)
        .with_header("Authorization", format!("Bearer {}", config.api_key))
}

fn anthropic_request(config: &ProviderConfig, prompt: &str) -> UpstreamRequest {
    let body = json!({
        "model": config.model_name(),
        "max_tokens": config.max_tokens,
        "messages": [
            { "role": "user", "content": prompt }
        ]
    });

    UpstreamRequest::new(&config.endpoint_url, body)
        .with_header("x-api-key", &config.api_key)
        .with_header("anthropic-version", ANTHROPIC_VERSION)
}

fn generic_request(config: &ProviderConfig, prompt: &str) -> UpstreamRequest {
    let mut body = json!({
        "prompt": prompt,
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
    });
    if let Some(model) = &config.model {
        body["model"] = Value::String(model.clone());
    }

    UpstreamRequest::new(&config.endpoint_url, body)
        .with_header("Authorization", format!("Bearer {}", config.api_key))
}

/// Pull the generated text (or, for search providers, a finished
/// explanation) out of a successful response body
pub fn extract(config: &ProviderConfig, body: &Value, request: &ExplainRequest) -> Extraction {
    match config.kind {
        ProviderKind::Serper => Extraction::Explanation(serper::synthesize(body, request)),
        ProviderKind::Gemini
        | ProviderKind::OpenAi
        | ProviderKind::Anthropic
        | ProviderKind::Generic => Extraction::Text(extract_text(body)),
    }
}

/// Find the generated text by response shape, whichever provider built the
/// request. Unrecognized shapes are serialized whole so nothing is dropped.
pub fn extract_text(body: &Value) -> String {
    if let Value::String(text) = body {
        return text.clone();
    }

    if non_empty_array(body, "candidates") {
        return body
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());
    }

    if non_empty_array(body, "choices") {
        let choice = &body["choices"][0];
        return choice
            .pointer("/message/content")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| choice.get("text").and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());
    }

    if let Some(text) = body.get("text").and_then(Value::as_str) {
        return text.to_string();
    }

    match body.get("content") {
        Some(Value::String(text)) => return text.clone(),
        Some(Value::Array(blocks)) => {
            let texts: Vec<&str> = blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect();
            if !texts.is_empty() {
                return texts.join("\n");
            }
        }
        _ => {}
    }

    body.to_string()
}

fn non_empty_array(body: &Value, key: &str) -> bool {
    body.get(key)
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty())
}
