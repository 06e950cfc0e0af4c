mod commands;
mod noninteractive;
mod output;
mod repl;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use studio_core::catalog::{BackendId, Resolution};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "studio", version, about = "AI photo editing with credit-gated undo/redo")]
struct Cli {
    /// Working directory
    #[arg(short = 'c', long = "cwd", global = true)]
    working_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Account to charge (overrides config)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single generation or edit and print the result
    Generate {
        /// What to generate, or how to change the input image
        #[arg(short, long)]
        prompt: String,

        /// Backend to use (nano_banana_edit, seedream, imagen4)
        #[arg(short, long)]
        backend: Option<BackendId>,

        /// Output resolution tier (1k, 2k, 4k)
        #[arg(short, long)]
        resolution: Option<Resolution>,

        /// Source image URL; selects the edit backend by default
        #[arg(short, long)]
        image: Option<String>,

        /// Aspect ratio such as 16:9
        #[arg(long)]
        aspect_ratio: Option<String>,

        /// Output format
        #[arg(short = 'f', long, default_value = "text")]
        output_format: OutputFormat,

        /// Suppress progress messages
        #[arg(short, long)]
        quiet: bool,
    },

    /// Interactive editing session with undo/redo
    Edit {
        /// Image to start from
        #[arg(short, long)]
        image: Option<String>,

        /// Resume a saved session by ID
        #[arg(long)]
        session: Option<String>,
    },

    /// Show the credit balance
    Credits {
        /// Add credits to the account
        #[arg(long)]
        grant: Option<u64>,
    },

    /// List past generations, newest first
    Gallery {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: u32,
    },

    /// List saved editing sessions
    Sessions {
        /// Delete a saved session by ID
        #[arg(long)]
        delete: Option<String>,
    },

    /// List backends, prices and key status
    Backends,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct App {
    pub db: studio_storage::Database,
    pub config: studio_core::config::AppConfig,
    pub account: Arc<studio_storage::SqliteAccountStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = studio_core::config::load_config(cli.working_dir.clone())
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    if let Some(user) = cli.user {
        config.user_id = user;
    }
    if cli.debug {
        config.debug = true;
    }

    let app = build_app(config).await?;

    match cli.command {
        Some(Command::Generate {
            prompt,
            backend,
            resolution,
            image,
            aspect_ratio,
            output_format,
            quiet,
        }) => {
            let args = noninteractive::GenerateArgs {
                prompt,
                backend,
                resolution,
                image,
                aspect_ratio,
            };
            noninteractive::run(app, args, output_format, quiet).await
        }
        Some(Command::Edit { image, session }) => repl::run(app, image, session).await,
        Some(Command::Credits { grant }) => commands::credits(&app, grant).await,
        Some(Command::Gallery { limit }) => commands::gallery(&app, limit).await,
        Some(Command::Sessions { delete }) => commands::sessions(&app, delete).await,
        Some(Command::Backends) => {
            commands::backends(&app);
            Ok(())
        }
        None => repl::run(app, None, None).await,
    }
}

async fn build_app(config: studio_core::config::AppConfig) -> Result<App> {
    let db = studio_storage::Database::open(&config)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    db.run_migrations()
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    db.accounts()
        .ensure(&config.user_id, config.starting_credits)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let account = Arc::new(db.account_store(config.user_id.clone()));

    Ok(App {
        db,
        config,
        account,
    })
}

impl App {
    /// Fresh session charging this app's account.
    pub fn new_session(
        &self,
        initial: Option<String>,
        notifier: Arc<dyn studio_core::notify::Notifier>,
    ) -> studio_session::GenerationSession {
        studio_session::GenerationSession::new(
            initial.map(studio_core::history::ResultRef),
            self.account.clone(),
            notifier,
        )
    }

    /// Backend for `id`, or the configured default for the kind of request.
    pub fn backend(
        &self,
        id: Option<BackendId>,
        editing: bool,
    ) -> Result<Arc<dyn studio_core::backend::GenerationBackend>> {
        let id = id.unwrap_or(if editing {
            self.config.generation.edit_backend
        } else {
            self.config.generation.generate_backend
        });
        studio_backends::create_backend(&self.config, id).map_err(|e| anyhow::anyhow!("{e}"))
    }

    /// Log a paid generation to the gallery. Failures are reported, not fatal.
    pub async fn record(
        &self,
        session_id: &str,
        backend: BackendId,
        prompt: &str,
        result: &studio_core::history::ResultRef,
        cost: u64,
    ) {
        let item = studio_core::history::GalleryItem::new(
            self.config.user_id.clone(),
            Some(session_id.to_string()),
            backend,
            prompt.to_string(),
            result.clone(),
            cost,
        );
        if let Err(e) = self.db.gallery().append(&item).await {
            tracing::warn!("failed to record generation in gallery: {e}");
        }
    }
}
