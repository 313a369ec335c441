//! Output handlers for CLI commands
//!
//! Supports console (readable sections) and JSON output modes.

use crate::explain::ExplanationResult;
use crate::history::HistoryEntry;
use serde::Serialize;

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Console }
    }
}

/// Where command results go
pub trait OutputHandler: Send + Sync {
    fn explanation(&self, result: &ExplanationResult);

    /// A failed command; `status` follows HTTP conventions
    fn failure(&self, status: u16, message: &str);

    fn history(&self, entries: &[HistoryEntry]);

    fn info(&self, message: &str);
}

/// Human-readable rendering of an explanation
pub fn format_explanation(result: &ExplanationResult) -> String {
    format!(
        "## Explanation\n\n{}\n\n## Errors\n\n{}\n\n## Improved Code\n\n{}\n",
        result.explanation, result.errors, result.improved_code
    )
}

/// One history line: id, timestamp, language and the first line of code
pub fn format_history_line(entry: &HistoryEntry) -> String {
    let first_line = entry.code.lines().next().unwrap_or_default();
    let preview: String = first_line.chars().take(60).collect();
    let ellipsis = if preview.len() < first_line.len() || entry.code.lines().count() > 1 {
        "..."
    } else {
        ""
    };
    format!(
        "#{} {} [{}] {}{}",
        entry.id, entry.created_at, entry.language, preview, ellipsis
    )
}

/// Console handler: results to stdout, failures to stderr
pub struct ConsoleHandler;

impl OutputHandler for ConsoleHandler {
    fn explanation(&self, result: &ExplanationResult) {
        print!("{}", format_explanation(result));
    }

    fn failure(&self, _status: u16, message: &str) {
        eprintln!("✗ {}", message);
    }

    fn history(&self, entries: &[HistoryEntry]) {
        if entries.is_empty() {
            println!("(no explanations recorded)");
            return;
        }
        for entry in entries {
            println!("{}", format_history_line(entry));
        }
    }

    fn info(&self, message: &str) {
        println!("{}", message);
    }
}

/// JSON handler: every result is one JSON document on stdout
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };

        if let Ok(s) = json {
            println!("{}", s);
        }
    }
}

impl OutputHandler for JsonHandler {
    fn explanation(&self, result: &ExplanationResult) {
        self.print_json(result);
    }

    fn failure(&self, status: u16, message: &str) {
        #[derive(Serialize)]
        struct Failure<'a> {
            status: u16,
            error: &'a str,
        }

        self.print_json(&Failure {
            status,
            error: message,
        });
    }

    fn history(&self, entries: &[HistoryEntry]) {
        #[derive(Serialize)]
        struct Entry<'a> {
            id: i64,
            language: &'a str,
            code: &'a str,
            created_at: &'a str,
            #[serde(flatten)]
            result: &'a ExplanationResult,
        }

        let entries: Vec<Entry<'_>> = entries
            .iter()
            .map(|e| Entry {
                id: e.id,
                language: &e.language,
                code: &e.code,
                created_at: &e.created_at,
                result: &e.result,
            })
            .collect();
        self.print_json(&entries);
    }

    fn info(&self, message: &str) {
        #[derive(Serialize)]
        struct Info<'a> {
            message: &'a str,
        }

        self.print_json(&Info { message });
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler),
        OutputMode::Json => Box::new(JsonHandler::new(true)),
    }
}
