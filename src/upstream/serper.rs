//! Serper search adapter
//!
//! Serper is a search API, not a text generator: the request is a search
//! query and the explanation is assembled from result snippets instead of
//! being parsed out of model prose.

use super::types::UpstreamRequest;
use crate::config::ProviderConfig;
use crate::explain::{ExplainRequest, ExplanationResult};
use serde::Deserialize;
use serde_json::{Value, json};

/// Code lines folded into the search query
const QUERY_LINES: usize = 3;

/// Results requested per search
const RESULT_COUNT: u32 = 5;

/// Snippets quoted in the explanation, and bullets in the error list
const MAX_PARTS: usize = 3;

const ERROR_KEYWORDS: [&str; 6] = ["error", "bug", "issue", "problem", "exception", "crash"];

/// Usable parts of a search response
#[derive(Debug)]
struct SearchResults {
    /// Organic entries as returned, including ones that failed to decode
    found: usize,
    organic: Vec<OrganicResult>,
    answer_box: Option<AnswerBox>,
}

impl SearchResults {
    /// Decode each entry on its own so one odd result doesn't hide the rest
    fn from_body(body: &Value) -> Self {
        let raw = body
            .get("organic")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let organic = raw
            .iter()
            .filter_map(|entry| match OrganicResult::deserialize(entry) {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed search result");
                    None
                }
            })
            .collect();

        let answer_box = body
            .get("answerBox")
            .and_then(|v| AnswerBox::deserialize(v).ok());

        Self {
            found: raw.len(),
            organic,
            answer_box,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrganicResult {
    title: Option<String>,
    snippet: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnswerBox {
    answer: Option<String>,
    snippet: Option<String>,
}

/// Search query for `request`: language plus the first few code lines
pub fn search_query(request: &ExplainRequest) -> String {
    let preview = request
        .code()
        .split('\n')
        .take(QUERY_LINES)
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} code explanation {}", request.language(), preview)
}

pub fn build_request(config: &ProviderConfig, request: &ExplainRequest) -> UpstreamRequest {
    UpstreamRequest::new(
        &config.endpoint_url,
        json!({
            "q": search_query(request),
            "num": RESULT_COUNT,
        }),
    )
    .with_header("X-API-KEY", &config.api_key)
}

/// Assemble an explanation from search results
///
/// Bodies that don't look like search results are treated as empty results.
pub fn synthesize(body: &Value, request: &ExplainRequest) -> ExplanationResult {
    let results = SearchResults::from_body(body);

    ExplanationResult {
        explanation: explanation_from(&results, request),
        errors: errors_from(&results),
        improved_code: request.code().to_string(),
    }
}

fn explanation_from(results: &SearchResults, request: &ExplainRequest) -> String {
    let mut parts = Vec::new();

    if let Some(answer_box) = &results.answer_box {
        let answer = answer_box
            .answer
            .as_deref()
            .filter(|a| !a.is_empty())
            .or(answer_box.snippet.as_deref())
            .filter(|a| !a.is_empty());
        if let Some(answer) = answer {
            parts.push(answer.to_string());
        }
    }

    for result in results.organic.iter().take(MAX_PARTS) {
        if let Some(snippet) = result.snippet.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!(
                "{}: {}",
                result.title.as_deref().unwrap_or_default(),
                snippet
            ));
        }
    }

    if parts.is_empty() {
        return format!(
            "Found {} search results for {} code. Review the code structure and common patterns.",
            results.found,
            request.language()
        );
    }

    parts.truncate(MAX_PARTS);
    format!("Based on search results:\n\n{}", parts.join("\n\n"))
}

fn errors_from(results: &SearchResults) -> String {
    let hits: Vec<&str> = results
        .organic
        .iter()
        .filter_map(|r| r.snippet.as_deref())
        .filter(|snippet| mentions_error(snippet))
        .take(MAX_PARTS)
        .collect();

    if hits.is_empty() {
        return "None identified from search results.".to_string();
    }

    format!("- {}", hits.join("\n- "))
}

fn mentions_error(snippet: &str) -> bool {
    let lower = snippet.to_lowercase();
    ERROR_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::InputValidator;

    fn request(code: &str) -> ExplainRequest {
        InputValidator::default()
            .validate(Some("python"), Some(code))
            .unwrap()
    }

    #[test]
    fn test_search_query_uses_first_three_lines() {
        let req = request("import os\nx = 1\ny = 2\nz = 3\nprint(x)");
        assert_eq!(
            search_query(&req),
            "python code explanation import os x = 1 y = 2"
        );
    }

    #[test]
    fn test_build_request() {
        let config = ProviderConfig::new("https://google.serper.dev/search", "serper-key", 0.7);
        let upstream = build_request(&config, &request("print(1)"));
        assert_eq!(upstream.url, "https://google.serper.dev/search");
        assert_eq!(upstream.body["num"], 5);
        assert_eq!(upstream.body["q"], "python code explanation print(1)");
        assert_eq!(upstream.header("X-API-KEY"), Some("serper-key"));
        assert_eq!(upstream.header("Authorization"), None);
    }

    #[test]
    fn test_prefers_answer_box() {
        let body = json!({
            "answerBox": {"answer": "It prints one."},
            "organic": [
                {"title": "Docs", "snippet": "print writes to stdout"},
                {"title": "Blog", "snippet": "A common bug is forgetting parentheses"}
            ]
        });
        let result = synthesize(&body, &request("print(1)"));
        assert_eq!(
            result.explanation,
            "Based on search results:\n\nIt prints one.\n\nDocs: print writes to stdout\n\nBlog: A common bug is forgetting parentheses"
        );
        assert_eq!(result.errors, "- A common bug is forgetting parentheses");
        assert_eq!(result.improved_code, "print(1)");
    }

    #[test]
    fn test_answer_box_snippet_fallback() {
        let body = json!({
            "answerBox": {"answer": "", "snippet": "From the box."},
            "organic": []
        });
        let result = synthesize(&body, &request("x = 1"));
        assert_eq!(result.explanation, "Based on search results:\n\nFrom the box.");
    }

    #[test]
    fn test_explanation_capped_at_three_parts() {
        let body = json!({
            "answerBox": {"answer": "Answer."},
            "organic": [
                {"title": "A", "snippet": "one"},
                {"title": "B", "snippet": "two"},
                {"title": "C", "snippet": "three"}
            ]
        });
        let result = synthesize(&body, &request("x = 1"));
        assert!(result.explanation.contains("Answer."));
        assert!(result.explanation.contains("B: two"));
        assert!(!result.explanation.contains("C: three"));
    }

    #[test]
    fn test_no_snippets() {
        let body = json!({"organic": [{"title": "Untitled"}, {"title": "Also untitled"}]});
        let result = synthesize(&body, &request("x = 1"));
        assert_eq!(
            result.explanation,
            "Found 2 search results for python code. Review the code structure and common patterns."
        );
        assert_eq!(result.errors, "None identified from search results.");
    }

    #[test]
    fn test_error_bullets_limited_to_three() {
        let body = json!({
            "organic": [
                {"title": "1", "snippet": "Segfault CRASH on exit"},
                {"title": "2", "snippet": "Nothing to see"},
                {"title": "3", "snippet": "KeyError Exception raised"},
                {"title": "4", "snippet": "Known issue with imports"},
                {"title": "5", "snippet": "Another problem here"}
            ]
        });
        let result = synthesize(&body, &request("x = 1"));
        assert_eq!(
            result.errors,
            "- Segfault CRASH on exit\n- KeyError Exception raised\n- Known issue with imports"
        );
    }

    #[test]
    fn test_improved_code_is_original_code() {
        let code = "def f():\n    return 1\n";
        let result = synthesize(&json!({}), &request(code));
        assert_eq!(result.improved_code, code);
    }

    #[test]
    fn test_malformed_entry_keeps_the_rest() {
        let body = json!({
            "answerBox": {"answer": 7},
            "organic": [
                {"title": "Broken", "snippet": 42},
                {"title": "Docs", "snippet": "print writes to stdout"},
                "not an object"
            ]
        });
        let result = synthesize(&body, &request("print(1)"));
        assert_eq!(
            result.explanation,
            "Based on search results:\n\nDocs: print writes to stdout"
        );
    }

    #[test]
    fn test_malformed_entries_still_counted() {
        let body = json!({"organic": [{"snippet": ["a"]}, {"title": "Untitled"}]});
        let result = synthesize(&body, &request("x = 1"));
        assert!(result.explanation.starts_with("Found 2 search results"));
    }

    #[test]
    fn test_malformed_body_degrades() {
        let result = synthesize(&json!("not search results"), &request("x = 1"));
        assert!(result.explanation.starts_with("Found 0 search results"));
        assert_eq!(result.errors, "None identified from search results.");
    }
}
