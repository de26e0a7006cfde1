use addrdesk::config::Config;
use addrdesk::core::db::{Database, SqliteConnector};
use addrdesk::core::Result;
use addrdesk::records::RecordService;
use addrdesk::repl;
use addrdesk::results_grid::ResultsGrid;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// addrdesk - keyboard-driven address book desk
///
/// Keeps person/address records and their reference tables (surnames, names,
/// patronymics, streets) in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "addrdesk", version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to $ADDRDESK_CONFIG, then the platform config dir)
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Create the database file and any missing tables
    Init,
    /// Print every record
    List {
        /// Print the records as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Start the interactive shell (the default)
    Repl,
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;
    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Init => {
            let db = Database::with_connector(
                SqliteConnector::new(config.database.clone()).create_if_missing(true),
            );
            db.bootstrap()?;
            println!("Initialized {}", config.database.name);
        }
        Commands::List { json } => {
            let service = RecordService::new(config.database.clone());
            let views = service.list_record_views()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                print!("{}", ResultsGrid::from_records(&views, views.len().max(1)).render());
            }
        }
        Commands::Repl => {
            let service = RecordService::new(config.database.clone());
            service.database().ping()?;
            let stdin = io::stdin();
            repl::run_repl(&service, &config.ui, stdin.lock(), io::stdout())?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // Usage errors exit with status 2, --help and --version with 0
    let cli = Cli::try_parse().unwrap_or_else(|e| e.exit());

    info!("Starting addrdesk: {:?}", cli.command);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("addrdesk: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
