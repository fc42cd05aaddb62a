pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use bidwise_core::config::{AppConfig, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};

use commands::backtest::BacktestArgs;
use commands::matching::MatchArgs;
use commands::predict::PredictArgs;

#[derive(Debug, Parser)]
#[command(
    name = "bidwise",
    about = "Bid matching and bid-strategy prediction for public procurement",
    long_about = "Match announcements against a product catalog, predict the winning strategy \
                  for a bid, and backtest recommendations against awarded outcomes.",
    after_help = "Examples:\n  bidwise match --bid bid.json --catalog products.json\n  \
                  bidwise predict --bid bid.json --profile company.json --strategy threshold\n  \
                  bidwise backtest --records awarded.json --profile company.json --simulate\n  \
                  bidwise doctor --json"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Config file (defaults to bidwise.toml or config/bidwise.toml)"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Score a bid announcement against every product in a catalog")]
    Match {
        #[arg(long, help = "Bid announcement JSON")]
        bid: PathBuf,
        #[arg(long, help = "Product catalog JSON array")]
        catalog: PathBuf,
        #[arg(long, help = "Company profile JSON for agency delivery history")]
        profile: Option<PathBuf>,
    },
    #[command(about = "Predict base price, competition and the recommended bid ratio")]
    Predict {
        #[arg(long, help = "Bid announcement JSON")]
        bid: PathBuf,
        #[arg(long, help = "Company profile JSON")]
        profile: PathBuf,
        #[arg(long, help = "Historical observations JSON")]
        history: Option<PathBuf>,
        #[arg(long, help = "Win-probability model: price-rank or threshold")]
        strategy: Option<String>,
    },
    #[command(about = "Replay the engine over awarded bids and report BID/SKIP accuracy")]
    Backtest {
        #[arg(long, help = "JSON array of announcements with outcomes")]
        records: PathBuf,
        #[arg(long, help = "Company profile JSON")]
        profile: PathBuf,
        #[arg(long, help = "Historical observations JSON")]
        history: Option<PathBuf>,
        #[arg(long, help = "Accumulate simulated profit")]
        simulate: bool,
        #[arg(long, help = "Count REVIEW as participation (by default only BID participates)")]
        include_review: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and run a probe prediction through the engine")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config.clone(), ..LoadOptions::default() };

    // Commands report config failures themselves; logging just stays off.
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Match { bid, catalog, profile } => {
            commands::matching::run(&MatchArgs { bid, catalog, profile }, options)
        }
        Command::Predict { bid, profile, history, strategy } => {
            commands::predict::run(&PredictArgs { bid, profile, history, strategy }, options)
        }
        Command::Backtest { records, profile, history, simulate, include_review } => {
            let args = BacktestArgs { records, profile, history, simulate, include_review };
            commands::backtest::run(&args, options)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json, options) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
