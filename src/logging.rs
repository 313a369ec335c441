//! Tracing setup for the binary

use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive for the requested verbosity
pub fn filter_directive(debug: bool, quiet: bool) -> &'static str {
    if debug {
        "code_explain=debug"
    } else if quiet {
        "code_explain=error"
    } else {
        "code_explain=info"
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides the verbosity flags when set. Logs go to stderr so
/// stdout stays clean for explanations; `log_file` adds an append-mode copy.
pub fn init_logging(debug: bool, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(debug, quiet)));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_line_number(debug)
        .with_file(debug)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            let path = expand_path(path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(file)
                    .with_target(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Default log file location
pub fn default_log_path() -> anyhow::Result<PathBuf> {
    let log_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("code-explain")
        .join("logs");

    let timestamp = chrono::Local::now().format("%Y%m%d");
    Ok(log_dir.join(format!("code-explain-{}.log", timestamp)))
}

/// Resolve the `--log-file` flag: absent means no file, given without a
/// value means [`default_log_path`]
pub fn resolve_log_path(flag: Option<Option<PathBuf>>) -> anyhow::Result<Option<PathBuf>> {
    match flag {
        None => Ok(None),
        Some(Some(path)) => Ok(Some(path)),
        Some(None) => default_log_path().map(Some),
    }
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        None => path.to_path_buf(),
    }
}
