//! Parse free-form model output into the three explanation sections
//!
//! Grammar: a section starts at a line matching
//! `^\s*#{1,3}\s*(Explanation|Errors?|Improved\s+Code)\s*:?\s*$` (any case)
//! and runs until the next such line, the next line starting with `###`,
//! or the end of input. The first occurrence of each section wins.

use super::types::ExplanationResult;
use regex::Regex;
use std::sync::LazyLock;

pub const EXPLANATION_FALLBACK: &str = "Explanation not available.";
pub const ERRORS_FALLBACK: &str = "Error analysis not available.";
pub const IMPROVED_CODE_FALLBACK: &str = "# Improved code not available.";

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*#{1,3}\s*(explanation|errors?|improved\s+code)\s*:?\s*$")
        .expect("section header pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Explanation,
    Errors,
    ImprovedCode,
}

impl Section {
    fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.starts_with("explanation") {
            Section::Explanation
        } else if name.starts_with("error") {
            Section::Errors
        } else {
            Section::ImprovedCode
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LineKind {
    Header(Section),
    /// A `###` heading we don't recognize; closes the open section
    Boundary,
    Body,
}

fn classify(line: &str) -> LineKind {
    if let Some(caps) = SECTION_HEADER.captures(line) {
        return LineKind::Header(Section::from_name(&caps[1]));
    }
    if line.trim_start().starts_with("###") {
        return LineKind::Boundary;
    }
    LineKind::Body
}

/// Extract the three sections from `text`, substituting fallbacks for any
/// section that is absent. Never fails.
pub fn parse(text: &str) -> ExplanationResult {
    let mut explanation = None;
    let mut errors = None;
    let mut improved_code = None;

    let mut open: Option<(Section, Vec<&str>)> = None;

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        let kind = classify(line);
        if let LineKind::Body = kind {
            if let Some((_, lines)) = open.as_mut() {
                lines.push(line);
            }
            continue;
        }

        if let Some((section, lines)) = open.take() {
            store(section, &lines, &mut explanation, &mut errors, &mut improved_code);
        }

        if let LineKind::Header(section) = kind {
            open = Some((section, Vec::new()));
        }
    }

    if let Some((section, lines)) = open.take() {
        store(section, &lines, &mut explanation, &mut errors, &mut improved_code);
    }

    ExplanationResult {
        explanation: explanation.unwrap_or_else(|| EXPLANATION_FALLBACK.to_string()),
        errors: errors.unwrap_or_else(|| ERRORS_FALLBACK.to_string()),
        improved_code: improved_code.unwrap_or_else(|| IMPROVED_CODE_FALLBACK.to_string()),
    }
}

fn store(
    section: Section,
    lines: &[&str],
    explanation: &mut Option<String>,
    errors: &mut Option<String>,
    improved_code: &mut Option<String>,
) {
    let slot = match section {
        Section::Explanation => explanation,
        Section::Errors => errors,
        Section::ImprovedCode => improved_code,
    };
    if slot.is_none() {
        *slot = Some(lines.join("\n").trim().to_string());
    }
}
