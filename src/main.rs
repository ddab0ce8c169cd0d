use anyhow::Result;
use cambio::cli::favorites::FavoritesAction;
use cambio::core::CurrencyCode;
use cambio::core::log::init_logging;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Refresh and display the rate table
    Rates {
        /// Base currency, defaults to the configured one
        #[arg(short, long)]
        base: Option<CurrencyCode>,
    },
    /// Convert an amount between two currencies
    Convert {
        amount: Option<f64>,
        from: Option<CurrencyCode>,
        to: Option<CurrencyCode>,
        /// Take the currency pair from a saved favorite
        #[arg(short, long)]
        favorite: Option<String>,
        /// Do not record the conversion in the history
        #[arg(long)]
        no_save: bool,
    },
    /// Display past conversions, most recent first
    History {
        /// Only show the most recent entries
        #[arg(short, long)]
        limit: Option<usize>,
        /// Delete the whole history
        #[arg(long)]
        clear: bool,
    },
    /// Manage favorite currency pairs
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesCommand>,
    },
}

#[derive(Subcommand)]
enum FavoritesCommand {
    /// List favorites
    List,
    /// Save a currency pair as a favorite
    Add { from: CurrencyCode, to: CurrencyCode },
    /// Remove a favorite by id
    Remove { id: String },
}

impl From<Commands> for cambio::AppCommand {
    fn from(cmd: Commands) -> cambio::AppCommand {
        match cmd {
            Commands::Rates { base } => cambio::AppCommand::Rates { base },
            Commands::Convert {
                amount,
                from,
                to,
                favorite,
                no_save,
            } => cambio::AppCommand::Convert {
                amount,
                from,
                to,
                favorite,
                save: !no_save,
            },
            Commands::History { limit, clear } => cambio::AppCommand::History { limit, clear },
            Commands::Favorites { action } => {
                cambio::AppCommand::Favorites(match action.unwrap_or(FavoritesCommand::List) {
                    FavoritesCommand::List => FavoritesAction::List,
                    FavoritesCommand::Add { from, to } => FavoritesAction::Add { from, to },
                    FavoritesCommand::Remove { id } => FavoritesAction::Remove { id },
                })
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => cambio::cli::setup::setup(),
        Some(cmd) => cambio::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
