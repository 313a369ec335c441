//! code-explain: explain code snippets through pluggable LLM and search providers
//!
//! A snippet flows through validation, prompt rendering, a provider-specific
//! upstream call with bounded retries, and section parsing of the answer.

pub mod cli;
pub mod config;
pub mod explain;
pub mod history;
pub mod logging;
pub mod service;
pub mod upstream;
