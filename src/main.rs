//! # Ask-RAG CLI (`askrag`)
//!
//! ## Usage
//!
//! ```bash
//! askrag --config ./config/askrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askrag serve` | Start the HTTP server |
//! | `askrag ingest <path> --user <email>` | Ingest a local file into a user's collection |
//! | `askrag ask "<query>" --user <email>` | Answer a question from a user's documents |
//! | `askrag fingerprint <email>` | Print the collection name for an identity |
//! | `askrag completions <shell>` | Print shell completions |

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use ask_rag::config;
use ask_rag::server;
use ask_rag::services::AppServices;
use ask_rag::tenant::TenantCollectionManager;
use ask_rag::validate::{FileKind, UploadRequest};

/// Ask-RAG: per-user PDF ingestion and retrieval-augmented question answering.
///
/// Commands other than `fingerprint` and `completions` read a TOML
/// configuration file. See `config/askrag.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "askrag", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Ingest a local file through the same checks as an upload.
    Ingest {
        path: PathBuf,

        /// Identity (e-mail) that owns the document.
        #[arg(long)]
        user: String,

        /// Content type to declare. Guessed from the extension if omitted.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Ask a question against a user's documents.
    Ask {
        query: String,

        #[arg(long)]
        user: String,
    },

    /// Print the tenant collection name for an identity.
    Fingerprint { email: String },

    /// Print shell completions to stdout.
    Completions { shell: Shell },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Fingerprint { email } => {
            println!("{}", TenantCollectionManager::fingerprint(email));
            return Ok(());
        }
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "askrag", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Serve => init_tracing("info,ask_rag=debug"),
        _ => init_tracing("warn"),
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ingest {
            path,
            user,
            content_type,
        } => {
            let services = AppServices::from_config(&cfg).await?;
            run_ingest(&services, &path, user, content_type).await?;
        }
        Commands::Ask { query, user } => {
            let services = AppServices::from_config(&cfg).await?;
            let answer = services.query.handle(&query, &user).await?;
            println!("{}", answer);
        }
        Commands::Fingerprint { .. } | Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

async fn run_ingest(
    services: &AppServices,
    path: &Path,
    user: String,
    content_type: Option<String>,
) -> anyhow::Result<()> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let len = file.metadata().await?.len();

    let content_type = match content_type.or_else(|| {
        path.extension()
            .and_then(|e| FileKind::from_extension(&e.to_string_lossy()))
            .map(|k| k.content_type().to_string())
    }) {
        Some(ct) => ct,
        None => anyhow::bail!(
            "Cannot guess the content type of {}; pass --content-type",
            path.display()
        ),
    };
    let request = UploadRequest {
        content_type: Some(content_type),
        declared_content_length: Some(len),
        filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        user_identity: user,
    };

    let outcome = services.intake.handle(request, &mut file).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&server::render_outcome(outcome))?
    );
    Ok(())
}
