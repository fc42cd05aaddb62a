use std::path::PathBuf;

use bidwise_core::config::LoadOptions;
use bidwise_core::domain::{AgencyHistory, BidAnnouncement, CompanyProfile};
use bidwise_core::engine::BiddingEngine;
use bidwise_core::optimizer::WinStrategy;

use crate::commands::{
    load_config, read_json, read_optional_json, CommandResult, EXIT_INPUT,
};

#[derive(Debug, Clone)]
pub struct PredictArgs {
    pub bid: PathBuf,
    pub profile: PathBuf,
    pub history: Option<PathBuf>,
    pub strategy: Option<String>,
}

pub fn run(args: &PredictArgs, mut options: LoadOptions) -> CommandResult {
    if let Some(name) = &args.strategy {
        let Some(strategy) = WinStrategy::from_name(name) else {
            return CommandResult::failure(
                "predict",
                "invalid_argument",
                format!("unknown strategy `{name}` (expected price-rank|threshold)"),
                EXIT_INPUT,
            );
        };
        options.overrides.strategy = Some(strategy);
    }
    let config = match load_config("predict", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let inputs = (|| -> anyhow::Result<_> {
        let bid: BidAnnouncement = read_json(&args.bid, "bid")?;
        let profile: CompanyProfile = read_json(&args.profile, "profile")?;
        let history: AgencyHistory = read_optional_json(args.history.as_deref(), "history")?;
        Ok((bid, profile, history))
    })();
    let (bid, profile, history) = match inputs {
        Ok(inputs) => inputs,
        Err(error) => return CommandResult::input_failure("predict", &error),
    };

    let prediction = BiddingEngine::new(&config.policy)
        .and_then(|engine| engine.predict(&bid, &profile, &history));
    match prediction {
        Ok(prediction) => CommandResult::report("predict", &prediction),
        Err(error) => CommandResult::engine_failure("predict", &error),
    }
}
