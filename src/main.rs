use anyhow::Result;
use clap::{Parser, Subcommand};

use autoarch::archiver::ArchiverRegistry;
use autoarch::archiving::Archiving;
use autoarch::cli::{
    handle_create_command, handle_list_command, handle_purge_command, OptionArgs,
};
use autoarch::config::{AppPaths, Configuration, Settings, Verbosity};
use autoarch::logging::init_tracing;
use autoarch::storage::open_storage;
use autoarch::ui::ConsoleUi;

#[derive(Parser)]
#[command(
    name = "autoarch",
    version,
    about = "Incremental backup archiver",
    long_about = "autoarch creates tar backups of directory trees described by archive \
                  specification files. Backups can be incremental, with backup levels \
                  restarted automatically after count, age and size limits."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show more details about what is being done
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Process every configured archive specification
    #[arg(long, global = true)]
    all: bool,

    #[command(flatten)]
    options: OptionArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Create backups
    #[command(alias = "c")]
    Create {
        /// Archive names or paths to .aa files
        specs: Vec<String>,
    },

    /// List archives and their backup levels
    #[command(alias = "ls")]
    List {
        /// Archive names or paths to .aa files
        specs: Vec<String>,
    },

    /// Delete stored data of archives that no longer have a specification
    Purge {
        /// Archive names
        names: Vec<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let paths = AppPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    let mut config = Configuration::from_settings(&settings, &paths);
    if cli.verbose {
        config.verbosity = Verbosity::Verbose;
    } else if cli.quiet {
        config.verbosity = Verbosity::Quiet;
    }
    config.all = cli.all;
    cli.options.apply(&mut config)?;

    let storage = open_storage(&paths)?;
    let registry = ArchiverRegistry::new(paths.archiver_work_dir());
    let ui = ConsoleUi::new(config.verbosity);
    let archiving = Archiving::new(&config, &storage, registry, &ui);

    tracing::debug!(config_dir = %paths.base_dir().display(), "starting");

    let result = match &cli.command {
        Commands::Create { specs } => handle_create_command(&archiving, &ui, specs, config.all),
        Commands::List { specs } => handle_list_command(&archiving, &ui, specs, config.all),
        Commands::Purge { names } => handle_purge_command(&archiving, &ui, names, config.all),
    };

    tracing::debug!(?result, "action finished");
    std::process::exit(result.exit_code());
}
