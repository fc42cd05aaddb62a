use std::path::PathBuf;

use bidwise_core::backtest::{run_backtest, BacktestOptions, BacktestRecord};
use bidwise_core::config::LoadOptions;
use bidwise_core::domain::{AgencyHistory, CompanyProfile};
use bidwise_core::engine::BiddingEngine;

use crate::commands::{load_config, read_json, read_optional_json, CommandResult};

#[derive(Debug, Clone)]
pub struct BacktestArgs {
    pub records: PathBuf,
    pub profile: PathBuf,
    pub history: Option<PathBuf>,
    pub simulate: bool,
    /// Count REVIEW as participation too; by default only BID participates.
    pub include_review: bool,
}

pub fn run(args: &BacktestArgs, options: LoadOptions) -> CommandResult {
    let config = match load_config("backtest", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let inputs = (|| -> anyhow::Result<_> {
        let records: Vec<BacktestRecord> = read_json(&args.records, "records")?;
        let profile: CompanyProfile = read_json(&args.profile, "profile")?;
        let history: AgencyHistory = read_optional_json(args.history.as_deref(), "history")?;
        Ok((records, profile, history))
    })();
    let (records, profile, history) = match inputs {
        Ok(inputs) => inputs,
        Err(error) => return CommandResult::input_failure("backtest", &error),
    };

    let engine = match BiddingEngine::new(&config.policy) {
        Ok(engine) => engine,
        Err(error) => return CommandResult::engine_failure("backtest", &error),
    };
    let options = BacktestOptions {
        simulate_bidding: args.simulate,
        follow_recommendation: !args.include_review,
        ..BacktestOptions::default()
    };
    let report = run_backtest(&engine, &records, &profile, &history, &options);
    CommandResult::report("backtest", &report)
}
