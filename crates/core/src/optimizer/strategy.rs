use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::stats;

/// What the rank model needs to know about one candidate ratio.
#[derive(Clone, Debug, PartialEq)]
pub struct RankContext {
    pub competitor_mean: f64,
    pub competitor_std_dev: f64,
    pub bidders: u32,
    pub qualification_score: f64,
    pub pass_threshold: f64,
}

/// Probability that a bid at `ratio` is the one selected among valid bids.
pub trait RankModel {
    fn rank_probability(&self, ratio: f64, context: &RankContext) -> f64;
}

/// Every competitor treated as a draw from one distribution; passing qualification is enough
/// to be competitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    pub base_probability: f64,
    pub cap: f64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self { base_probability: 0.6, cap: 0.95 }
    }
}

impl RankModel for ThresholdParams {
    fn rank_probability(&self, ratio: f64, context: &RankContext) -> f64 {
        let undercut =
            stats::normal_cdf(ratio, context.competitor_mean, context.competitor_std_dev);
        let rivals = context.bidders.saturating_sub(1) as i32;
        let beat_all = (1.0 - undercut).powi(rivals);
        let qualification = 1.0 + (context.qualification_score - context.pass_threshold) / 100.0;
        (beat_all * self.base_probability * qualification).clamp(0.0, self.cap)
    }
}

/// Only a share of the field prices aggressively, and the lowest valid price is reviewed first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceRankParams {
    /// Share of bidders that actually compete on price.
    pub effective_share: f64,
    /// Qualification score at which no advantage or penalty applies.
    pub reference_score: f64,
    pub advantage_per_point: f64,
    pub penalty_per_point: f64,
    pub cap: f64,
}

impl Default for PriceRankParams {
    fn default() -> Self {
        Self {
            effective_share: 0.7,
            reference_score: 88.0,
            advantage_per_point: 0.02,
            penalty_per_point: 0.03,
            cap: 0.60,
        }
    }
}

impl PriceRankParams {
    fn qualification_factor(&self, score: f64) -> f64 {
        if score > self.reference_score {
            1.0 + (score - self.reference_score) * self.advantage_per_point
        } else {
            1.0 - (self.reference_score - score) * self.penalty_per_point
        }
    }
}

impl RankModel for PriceRankParams {
    fn rank_probability(&self, ratio: f64, context: &RankContext) -> f64 {
        let undercut =
            stats::normal_cdf(ratio, context.competitor_mean, context.competitor_std_dev);
        let effective = (self.effective_share * f64::from(context.bidders) - 1.0).max(0.0);
        let beat_all = (1.0 - undercut).powf(effective);
        (beat_all * self.qualification_factor(context.qualification_score)).clamp(0.0, self.cap)
    }
}

/// Win-determination rule used by the optimizer and the engine's action thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WinStrategy {
    Threshold(ThresholdParams),
    PriceRank(PriceRankParams),
}

impl Default for WinStrategy {
    fn default() -> Self {
        Self::PriceRank(PriceRankParams::default())
    }
}

impl WinStrategy {
    /// Parses `threshold`, `price_rank` or `price-rank` into the strategy with default parameters.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "threshold" | "balanced" => Some(Self::Threshold(ThresholdParams::default())),
            "price_rank" | "realistic" => Some(Self::PriceRank(PriceRankParams::default())),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Threshold(_) => "threshold",
            Self::PriceRank(_) => "price_rank",
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let (cap, positive) = match self {
            Self::Threshold(params) => (params.cap, params.base_probability > 0.0),
            Self::PriceRank(params) => (
                params.cap,
                params.effective_share > 0.0
                    && params.advantage_per_point >= 0.0
                    && params.penalty_per_point >= 0.0,
            ),
        };
        if !(cap > 0.0 && cap <= 1.0) || !positive {
            return Err(EngineError::configuration(format!(
                "strategy `{}` has out-of-range parameters",
                self.name()
            )));
        }
        Ok(())
    }
}

impl RankModel for WinStrategy {
    fn rank_probability(&self, ratio: f64, context: &RankContext) -> f64 {
        match self {
            Self::Threshold(params) => params.rank_probability(ratio, context),
            Self::PriceRank(params) => params.rank_probability(ratio, context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PriceRankParams, RankContext, RankModel, ThresholdParams, WinStrategy};

    fn context(bidders: u32, qualification_score: f64) -> RankContext {
        RankContext {
            competitor_mean: 0.86,
            competitor_std_dev: 0.015,
            bidders,
            qualification_score,
            pass_threshold: 85.0,
        }
    }

    #[test]
    fn price_rank_is_capped_and_decreases_with_ratio() {
        let model = PriceRankParams::default();
        let low = model.rank_probability(0.82, &context(10, 95.0));
        let high = model.rank_probability(0.90, &context(10, 95.0));
        assert!(low <= 0.60);
        assert!(low > high);
    }

    #[test]
    fn weak_qualification_lowers_price_rank_odds() {
        let model = PriceRankParams::default();
        let strong = model.rank_probability(0.85, &context(10, 92.0));
        let weak = model.rank_probability(0.85, &context(10, 80.0));
        assert!(strong > weak);
    }

    #[test]
    fn single_bidder_threshold_odds_are_the_base_rate() {
        let model = ThresholdParams::default();
        let probability = model.rank_probability(0.88, &context(1, 85.0));
        assert!((probability - 0.6).abs() < 1e-12);
    }

    #[test]
    fn strategies_parse_from_names() {
        assert_eq!(WinStrategy::from_name("price-rank"), Some(WinStrategy::default()));
        assert_eq!(
            WinStrategy::from_name("Threshold"),
            Some(WinStrategy::Threshold(ThresholdParams::default()))
        );
        assert_eq!(WinStrategy::from_name("monte_carlo"), None);
    }

    #[test]
    fn strategy_round_trips_through_tagged_toml() {
        let parsed: WinStrategy =
            toml::from_str("kind = \"threshold\"\ncap = 0.9\n").expect("tagged strategy");
        assert_eq!(
            parsed,
            WinStrategy::Threshold(ThresholdParams { base_probability: 0.6, cap: 0.9 })
        );
        assert!(parsed.validate().is_ok());
    }
}
