//! Knowledge AI - terminal research companion
//!
//! Upload a PDF, read its axioms and question the document.

use std::path::PathBuf;

use clap::Parser;
use knowledge_ai::cli::{self, RunOptions};
use knowledge_ai::Language;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Knowledge AI - extract the axioms of a document and question it
#[derive(Parser, Debug)]
#[command(name = "knowledge")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// PDF document to upload at startup
    #[arg(long, value_name = "PATH")]
    pdf: Option<PathBuf>,

    /// Research language (en, ar)
    #[arg(short, long, value_name = "LANG")]
    lang: Option<Language>,

    /// Ask a single question about --pdf and exit
    #[arg(short, long, value_name = "QUESTION", requires = "pdf")]
    ask: Option<String>,

    /// Specify which model to use
    #[arg(short, long, env = "KNOWLEDGE_MODEL")]
    model: Option<String>,

    /// Write the session after --ask completes (HTML, or plain text for .txt/.md)
    #[arg(long, value_name = "PATH", requires = "ask")]
    export: Option<PathBuf>,

    /// Working directory (like git -C)
    #[arg(short = 'C', long, visible_alias = "directory")]
    cwd: Option<String>,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose logging (equivalent to RUST_LOG=trace)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Change working directory if specified (do this early)
    if let Some(cwd) = &args.cwd {
        std::env::set_current_dir(cwd)?;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        // Determine log level from args or env
        let default_filter = if args.verbose {
            "trace"
        } else if args.debug {
            "debug"
        } else {
            "warn" // Quiet by default for normal use
        };

        // Initialize tracing with stderr output
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();

        if args.debug || args.verbose {
            tracing::info!("Debug logging enabled");
        }

        cli::run(RunOptions {
            pdf: args.pdf,
            question: args.ask,
            export: args.export,
            language: args.lang,
            model: args.model,
        })
        .await
    })
}
