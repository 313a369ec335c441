use anyhow::Result;
use clap::{Parser, Subcommand};
use code_explain::cli::{self, OutputMode};
use code_explain::config::ExplainConfig;
use code_explain::history::HistoryStore;
use code_explain::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "code-explain")]
#[command(about = "Explain code snippets with an LLM - what it does, what may break, how to improve it")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to .code-explain/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write logs to a file (the dated default when no path is given)
    #[arg(long, global = true, num_args = 0..=1, value_name = "PATH")]
    log_file: Option<Option<PathBuf>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Explain a snippet
    Explain {
        /// Source file, or - for stdin
        file: PathBuf,

        /// Snippet language (python or cpp)
        #[arg(long, short)]
        language: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved provider
    Provider,

    /// List recent explanations
    History {
        /// Number of entries to show
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let log_file = logging::resolve_log_path(cli.log_file)?;
    logging::init_logging(cli.debug, cli.quiet, log_file.as_deref())?;

    let mut config = ExplainConfig::load(cli.config.as_deref())?;
    config.debug |= cli.debug;

    match cli.command {
        Commands::Explain {
            file,
            language,
            json,
        } => {
            let code = cli::read_source(&file)?;
            let service = cli::build_service(&config)?;
            let handler = cli::create_handler(OutputMode::from_flag(json));

            let exit_code = cli::explain(&service, &language, &code, &*handler).await;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }

        Commands::Provider => {
            let service = cli::build_service(&config)?;
            let handler = cli::create_handler(OutputMode::Console);

            let exit_code = cli::show_provider(service.explainer(), &*handler);
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }

        Commands::History { limit, json } => {
            let path = cli::history_path(&config)?;
            let handler = cli::create_handler(OutputMode::from_flag(json));

            if !path.exists() {
                handler.info("(no explanations recorded)");
                return Ok(());
            }
            let store = HistoryStore::open(&path)?;
            cli::show_history(&store, limit, &*handler)?;
        }
    }

    Ok(())
}
