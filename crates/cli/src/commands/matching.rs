use std::path::PathBuf;

use bidwise_core::config::LoadOptions;
use bidwise_core::domain::{BidAnnouncement, CompanyProfile, Product};
use bidwise_core::matching::ProductMatcher;
use tracing::info;

use crate::commands::{load_config, read_json, CommandResult};

#[derive(Debug, Clone)]
pub struct MatchArgs {
    pub bid: PathBuf,
    pub catalog: PathBuf,
    pub profile: Option<PathBuf>,
}

pub fn run(args: &MatchArgs, options: LoadOptions) -> CommandResult {
    let config = match load_config("match", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let inputs = (|| -> anyhow::Result<_> {
        let bid: BidAnnouncement = read_json(&args.bid, "bid")?;
        let catalog: Vec<Product> = read_json(&args.catalog, "catalog")?;
        let profile = match &args.profile {
            Some(path) => Some(read_json::<CompanyProfile>(path, "profile")?),
            None => None,
        };
        Ok((bid, catalog, profile))
    })();
    let (bid, catalog, profile) = match inputs {
        Ok(inputs) => inputs,
        Err(error) => return CommandResult::input_failure("match", &error),
    };

    let matcher = ProductMatcher::new(config.policy.matcher);
    match matcher.match_bid_with_profile(&bid, &catalog, profile.as_ref()) {
        Ok(summary) => {
            info!(
                event_name = "cli.match.completed",
                bid_id = %bid.id,
                products = catalog.len(),
                recommendation = ?summary.recommendation,
                "match completed"
            );
            CommandResult::report("match", &summary)
        }
        Err(error) => CommandResult::engine_failure("match", &error),
    }
}
