use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "chorebridge-cli", version, about = "Chorebridge headless host")]
struct Cli {
    /// Log at debug level (overrides CHOREBRIDGE_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a request URL as LIST, COMPLETE <id> or IGNORE
    Classify {
        /// Request URL, absolute or relative
        url: String,
    },
    /// Decode a chore-list payload
    Parse {
        /// Payload file, or "-" for stdin
        #[arg(default_value = "-")]
        input: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the interceptor script injected into the hosted page
    Script,
    /// Reconcile local reminders with a chore-list payload
    Sync {
        /// Payload file, or "-" for stdin
        #[arg(default_value = "-")]
        input: String,
        /// Run against an in-memory store; nothing is persisted
        #[arg(long)]
        dry_run: bool,
    },
    /// Cancel the reminder of a completed chore
    Complete {
        /// Chore id
        id: i64,
    },
    /// Stored reminders
    Reminders {
        #[command(subcommand)]
        action: commands::reminders::RemindersAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("CHOREBRIDGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Classify { url } => commands::classify::run(&url),
        Commands::Parse { input, json } => commands::parse::run(&input, json),
        Commands::Script => commands::script::run(),
        Commands::Sync { input, dry_run } => commands::sync::run(&input, dry_run),
        Commands::Complete { id } => commands::complete::run(id),
        Commands::Reminders { action } => commands::reminders::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
