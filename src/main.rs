use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use readiness::auth::Role;
use readiness::cache::{CacheKey, EntityKind};
use readiness::cli::CommandContext;
use readiness::cli::commands;
use readiness::pricing::UsageRecord;
use readiness::types::{TeamId, UserId};

#[derive(Parser)]
#[command(name = "readiness")]
#[command(
    version,
    about = "Route guard, query cache and LLM cost tools for the AI-readiness dashboard"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, help = "Config file (defaults to global + project + env)")]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the route guard for a path
    Guard {
        #[arg(help = "Path being navigated to")]
        path: String,
        #[arg(long, short, help = "Signed-in role (member, admin); anonymous if omitted")]
        role: Option<Role>,
        #[arg(long, help = "Simulate a session that is still resolving")]
        loading: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// List dashboard routes
    Routes {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Estimate the cost of an LLM call
    Cost {
        #[arg(help = "Provider (openai, anthropic, google, ...)")]
        provider: String,
        #[arg(help = "Model name")]
        model: String,
        #[arg(long, short = 'p', default_value = "0")]
        prompt_tokens: u64,
        #[arg(long, short = 'c', default_value = "0")]
        completion_tokens: u64,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Fetch an entity or collection from the API through the cache
    Fetch {
        #[arg(help = "Entity kind (users, teams, surveys, questions, assessments, results, usage)")]
        kind: EntityKind,
        #[arg(help = "Entity id; the whole collection if omitted")]
        id: Option<String>,
        #[arg(long, help = "Scope to a team")]
        team: Option<String>,
        #[arg(long, help = "Scope to a user")]
        user: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mreadiness encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Config paths and init must work even when the current config is invalid
    if let Commands::Config { action } = &cli.command {
        match action {
            ConfigAction::Path => return Ok(commands::config::path()?),
            ConfigAction::Init { global, force } => {
                if *global {
                    commands::config::init_global(*force)?;
                } else {
                    commands::config::init_project(*force)?;
                }
                return Ok(());
            }
            ConfigAction::Show { .. } => {}
        }
    }

    let ctx = CommandContext::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Guard {
            path,
            role,
            loading,
            format,
        } => {
            commands::guard::run(&ctx, &path, role, loading, &format)?;
        }
        Commands::Routes { format } => {
            commands::routes::run(&ctx, &format)?;
        }
        Commands::Cost {
            provider,
            model,
            prompt_tokens,
            completion_tokens,
            format,
        } => {
            let record = UsageRecord::new(provider, model, prompt_tokens, completion_tokens);
            let rt = Runtime::new()?;
            rt.block_on(commands::cost::run(&ctx, record, &format))?;
        }
        Commands::Fetch {
            kind,
            id,
            team,
            user,
        } => {
            let mut key = match id {
                Some(id) => CacheKey::entity(kind, id),
                None => CacheKey::list(kind),
            };
            if let Some(team) = team {
                key = key.in_team(TeamId::new(team));
            }
            if let Some(user) = user {
                key = key.for_user(UserId::new(user));
            }
            let rt = Runtime::new()?;
            rt.block_on(commands::fetch::run(&ctx, key))?;
        }
        Commands::Config { action } => {
            if let ConfigAction::Show { format } = action {
                commands::config::show(&ctx, &format)?;
            }
        }
    }

    Ok(())
}
