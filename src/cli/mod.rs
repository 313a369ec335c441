//! CLI module for code-explain
//!
//! This module provides:
//! - Command implementations (explain, provider, history)
//! - Output handlers (console, JSON)
//!
//! # Example
//!
//! ```ignore
//! use code_explain::cli::{commands, output};
//!
//! let handler = output::create_handler(output::OutputMode::Console);
//! let service = commands::build_service(&config)?;
//! let exit_code = commands::explain(&service, "python", &code, &*handler).await;
//! ```

pub mod commands;
pub mod output;

pub use commands::{build_service, explain, history_path, read_source, show_history, show_provider};
pub use output::{OutputHandler, OutputMode, create_handler};
