#![forbid(unsafe_code)]

mod output;
mod repl;
mod schema;

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "docket: undoable console CRUD over an ordered record index",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding the snapshot files.
    #[arg(long, global = true, default_value = ".docket")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Run the event-management console",
        after_help = "EXAMPLES:\n    # Interactive session\n    dk events\n\n    # Scripted session\n    printf 'list\\nquit\\n' | dk events"
    )]
    Events,

    #[command(
        about = "Run the package-delivery console",
        after_help = "EXAMPLES:\n    # Interactive session\n    dk parcels\n\n    # Load and run the van non-interactively\n    printf 'load\\ndeliver\\nquit\\n' | dk parcels"
    )]
    Parcels,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DOCKET_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "docket=debug,info"
        } else {
            "docket=info,warn"
        })
    });

    let format = env::var("DOCKET_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("creating data dir {}", cli.data_dir.display()))?;

    let schema = match cli.command {
        Commands::Events => &schema::EVENTS,
        Commands::Parcels => &schema::PARCELS,
    };
    info!(console = schema.noun, data_dir = %cli.data_dir.display(), "starting console");

    let session = repl::Session::open(schema, &cli.data_dir)?;
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    session.run(stdin, stdout)
}
