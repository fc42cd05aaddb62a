//! Competitor count and competitor bid-ratio distribution for an announcement.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    AgencyHistory, AgencyType, BidAnnouncement, BidCategory, BudgetBracket, Confidence,
    HistoricalObservation,
};
use crate::errors::EngineError;
use crate::lower_limit::LowerLimitPolicy;
use crate::stats::{self, DECILE_Z};
use crate::text;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryBaseline {
    pub category: BidCategory,
    pub bidders: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgencyPopularity {
    pub name: String,
    pub factor: f64,
}

/// Popularity used when the agency is not listed by name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypePopularity {
    pub central: f64,
    pub public_corp: f64,
    pub other: f64,
}

impl Default for TypePopularity {
    fn default() -> Self {
        Self { central: 1.2, public_corp: 1.1, other: 1.0 }
    }
}

/// Bid-ratio behavior of competitors at one competition level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelProfile {
    /// Bidder count at which this level starts.
    pub min_bidders: u32,
    pub ratio_std_dev: f64,
    /// Position of the mean between the floor and `reference_ratio`.
    pub ratio_position: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelProfiles {
    pub low: LevelProfile,
    pub medium: LevelProfile,
    pub high: LevelProfile,
    pub very_high: LevelProfile,
}

impl Default for LevelProfiles {
    fn default() -> Self {
        let profile = |min_bidders, ratio_std_dev, ratio_position| LevelProfile {
            min_bidders,
            ratio_std_dev,
            ratio_position,
        };
        Self {
            low: profile(0, 0.025, 0.7),
            medium: profile(8, 0.020, 0.5),
            high: profile(15, 0.015, 0.35),
            very_high: profile(25, 0.012, 0.2),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitionPolicy {
    /// Observations a history tier needs before it is trusted.
    pub min_samples: usize,
    pub min_bidders: u32,
    pub min_bidder_std_dev: f64,
    pub min_ratio_std_dev: f64,
    /// Ratio competitors drift towards when competition is thin.
    pub reference_ratio: f64,
    pub category_baselines: Vec<CategoryBaseline>,
    pub default_bidders: f64,
    pub agency_popularity: Vec<AgencyPopularity>,
    pub type_popularity: TypePopularity,
    pub monthly: [f64; 12],
    pub quarterly: [f64; 4],
    /// Multipliers by budget bracket, smallest bracket first.
    pub budget_multipliers: [f64; 6],
    /// Deadline weekday multipliers, Monday first.
    pub weekday: [f64; 7],
    pub urgency_factor: f64,
    /// Bidder-count deviation as a share of the expected count.
    pub spread_ratio: f64,
    pub levels: LevelProfiles,
    pub max_density: f64,
}

impl Default for CompetitionPolicy {
    fn default() -> Self {
        let baseline = |category, bidders| CategoryBaseline { category, bidders };
        let popular =
            |name: &str, factor| AgencyPopularity { name: name.to_owned(), factor };
        Self {
            min_samples: 3,
            min_bidders: 3,
            min_bidder_std_dev: 1.0,
            min_ratio_std_dev: 0.005,
            reference_ratio: 0.88,
            category_baselines: vec![
                baseline(BidCategory::FlowMeter, 12.0),
                baseline(BidCategory::HeatMeter, 8.0),
                baseline(BidCategory::WaterQuality, 10.0),
                baseline(BidCategory::PressureGauge, 15.0),
                baseline(BidCategory::LevelSensor, 11.0),
                baseline(BidCategory::Valve, 18.0),
                baseline(BidCategory::Pump, 16.0),
                baseline(BidCategory::PipeFitting, 22.0),
                baseline(BidCategory::Electrical, 20.0),
                baseline(BidCategory::Construction, 25.0),
                baseline(BidCategory::ItSoftware, 14.0),
                baseline(BidCategory::GeneralGoods, 18.0),
                baseline(BidCategory::Other, 15.0),
            ],
            default_bidders: 15.0,
            agency_popularity: vec![
                popular("조달청", 1.3),
                popular("서울시", 1.4),
                popular("한국수자원공사", 1.2),
                popular("한국지역난방공사", 1.1),
                popular("한국농어촌공사", 1.0),
                popular("한국환경공단", 1.1),
                popular("한국도로공사", 1.2),
                popular("한국철도공사", 1.2),
                popular("인천국제공항공사", 1.3),
            ],
            type_popularity: TypePopularity::default(),
            monthly: [0.90, 0.95, 1.0, 1.0, 1.0, 1.05, 1.0, 0.95, 1.05, 1.10, 1.0, 0.85],
            quarterly: [0.95, 1.0, 1.05, 0.90],
            budget_multipliers: [1.3, 1.15, 1.0, 0.9, 0.8, 0.7],
            weekday: [1.0, 1.0, 1.0, 0.95, 0.90, 1.0, 1.05],
            urgency_factor: 0.8,
            spread_ratio: 0.25,
            levels: LevelProfiles::default(),
            max_density: 0.95,
        }
    }
}

impl CompetitionPolicy {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_samples == 0 {
            return Err(EngineError::configuration("competition.min_samples must be >= 1"));
        }
        if !(self.reference_ratio > 0.0 && self.reference_ratio < 1.0) {
            return Err(EngineError::configuration(
                "competition.reference_ratio must lie in (0, 1)",
            ));
        }
        let factors = self
            .monthly
            .iter()
            .chain(&self.quarterly)
            .chain(&self.budget_multipliers)
            .chain(&self.weekday)
            .copied()
            .chain(self.category_baselines.iter().map(|baseline| baseline.bidders))
            .chain(self.agency_popularity.iter().map(|agency| agency.factor))
            .chain([self.default_bidders, self.urgency_factor, self.spread_ratio]);
        if factors.into_iter().any(|factor| !(factor > 0.0)) {
            return Err(EngineError::configuration("competition factors must be positive"));
        }
        let levels =
            [&self.levels.low, &self.levels.medium, &self.levels.high, &self.levels.very_high];
        if levels.windows(2).any(|pair| pair[0].min_bidders >= pair[1].min_bidders) {
            return Err(EngineError::configuration(
                "competition levels must start at ascending bidder counts",
            ));
        }
        if levels.iter().any(|level| !(level.ratio_std_dev > 0.0)) {
            return Err(EngineError::configuration(
                "competition level ratio deviations must be positive",
            ));
        }
        Ok(())
    }

    fn baseline(&self, category: BidCategory) -> f64 {
        self.category_baselines
            .iter()
            .find(|baseline| baseline.category == category)
            .map_or(self.default_bidders, |baseline| baseline.bidders)
    }

    fn popularity(&self, organization: &str) -> f64 {
        let listed = self
            .agency_popularity
            .iter()
            .find(|agency| text::names_overlap(&agency.name, organization));
        match listed {
            Some(agency) => agency.factor,
            None => match AgencyType::detect(organization) {
                AgencyType::Central => self.type_popularity.central,
                AgencyType::PublicCorp => self.type_popularity.public_corp,
                _ => self.type_popularity.other,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl CompetitionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

/// Which rung of the fallback ladder produced the estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionSource {
    AgencyCategorySeason,
    CategorySeason,
    Category,
    GlobalPrior,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidderDistribution {
    pub min: u32,
    pub p10: u32,
    pub likely: u32,
    pub p90: u32,
    pub max: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatioDistribution {
    pub mean: f64,
    pub std_dev: f64,
}

/// Multipliers applied by the prior model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompetitionFactors {
    pub base: f64,
    pub agency: f64,
    pub seasonal: f64,
    pub budget: f64,
    pub weekday: f64,
    pub urgency: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompetitionPrediction {
    pub expected_bidders: u32,
    pub bidder_std_dev: f64,
    pub distribution: BidderDistribution,
    pub level: CompetitionLevel,
    pub ratio_distribution: RatioDistribution,
    /// Share of competitors expected to bid close to the floor.
    pub density: f64,
    pub source: CompetitionSource,
    pub confidence: Confidence,
    pub sample_size: usize,
    #[serde(default)]
    pub factors: Option<CompetitionFactors>,
}

#[derive(Clone, Debug, Default)]
pub struct CompetitionPredictor {
    policy: CompetitionPolicy,
    lower_limits: LowerLimitPolicy,
}

impl CompetitionPredictor {
    pub fn new(policy: CompetitionPolicy, lower_limits: LowerLimitPolicy) -> Self {
        Self { policy, lower_limits }
    }

    pub fn policy(&self) -> &CompetitionPolicy {
        &self.policy
    }

    pub fn predict(&self, bid: &BidAnnouncement, history: &AgencyHistory) -> CompetitionPrediction {
        let prediction = self.from_history(bid, history).unwrap_or_else(|| self.from_prior(bid));
        debug!(
            event_name = "competition.predicted",
            bid_id = %bid.id,
            source = ?prediction.source,
            expected_bidders = prediction.expected_bidders,
            level = prediction.level.as_str(),
            "competition predicted"
        );
        prediction
    }

    pub fn level_for(&self, bidders: u32) -> CompetitionLevel {
        let levels = &self.policy.levels;
        if bidders >= levels.very_high.min_bidders {
            CompetitionLevel::VeryHigh
        } else if bidders >= levels.high.min_bidders {
            CompetitionLevel::High
        } else if bidders >= levels.medium.min_bidders {
            CompetitionLevel::Medium
        } else {
            CompetitionLevel::Low
        }
    }

    fn level_profile(&self, level: CompetitionLevel) -> &LevelProfile {
        let levels = &self.policy.levels;
        match level {
            CompetitionLevel::Low => &levels.low,
            CompetitionLevel::Medium => &levels.medium,
            CompetitionLevel::High => &levels.high,
            CompetitionLevel::VeryHigh => &levels.very_high,
        }
    }

    fn from_history(
        &self,
        bid: &BidAnnouncement,
        history: &AgencyHistory,
    ) -> Option<CompetitionPrediction> {
        let organization = text::normalize(&bid.organization);
        let category = bid.product_category();
        let quarter = quarter_of(bid.deadline.month());

        let counted: Vec<&HistoricalObservation> = history
            .observations
            .iter()
            .filter(|observation| observation.bidder_count.is_some())
            .filter(|observation| observation.product_category() == category)
            .collect();
        let same_season = |observation: &&HistoricalObservation| {
            quarter_of(observation.deadline.month()) == quarter
        };

        let tiers: [(CompetitionSource, Confidence, Vec<&HistoricalObservation>); 3] = [
            (
                CompetitionSource::AgencyCategorySeason,
                Confidence::High,
                counted
                    .iter()
                    .copied()
                    .filter(same_season)
                    .filter(|observation| {
                        text::normalize(&observation.organization) == organization
                    })
                    .collect(),
            ),
            (
                CompetitionSource::CategorySeason,
                Confidence::Medium,
                counted.iter().copied().filter(same_season).collect(),
            ),
            (CompetitionSource::Category, Confidence::Medium, counted.clone()),
        ];

        let (source, confidence, tier) = tiers
            .into_iter()
            .find(|(_, _, selected)| selected.len() >= self.policy.min_samples)?;

        // Same-bracket records speak for themselves; otherwise rescale by the bracket factors.
        let bracket = bid.budget_bracket();
        let same_bracket: Vec<&HistoricalObservation> = tier
            .iter()
            .copied()
            .filter(|observation| observation.budget_bracket() == Some(bracket))
            .collect();
        let (selected, budget_adjustment) = if same_bracket.len() >= self.policy.min_samples {
            (same_bracket, 1.0)
        } else {
            let adjustment = self.budget_adjustment(bracket, &tier);
            (tier, adjustment)
        };

        let counts: Vec<f64> = selected
            .iter()
            .filter_map(|observation| observation.bidder_count)
            .map(f64::from)
            .collect();
        let mean_count = stats::mean(&counts)? * budget_adjustment;
        let expected = mean_count.max(f64::from(self.policy.min_bidders)).round() as u32;
        let spread = (stats::std_dev(&counts).unwrap_or(0.0) * budget_adjustment)
            .max(self.policy.min_bidder_std_dev);

        let level = self.level_for(expected);
        let winning: Vec<f64> = selected
            .iter()
            .filter_map(|observation| observation.winning_ratio)
            .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
            .collect();
        let ratio_distribution = match (stats::mean(&winning), stats::std_dev(&winning)) {
            (Some(mean), Some(std_dev)) if winning.len() >= self.policy.min_samples => {
                RatioDistribution { mean, std_dev: std_dev.max(self.policy.min_ratio_std_dev) }
            }
            _ => self.level_ratio(bid, level),
        };

        Some(CompetitionPrediction {
            expected_bidders: expected,
            bidder_std_dev: spread,
            distribution: self.distribution(expected, spread),
            level,
            ratio_distribution,
            density: self.density(expected),
            source,
            confidence,
            sample_size: selected.len(),
            factors: None,
        })
    }

    /// Ratio of the bid's bracket multiplier to the average multiplier of the observations.
    fn budget_adjustment(
        &self,
        bracket: BudgetBracket,
        observed: &[&HistoricalObservation],
    ) -> f64 {
        let multipliers = &self.policy.budget_multipliers;
        let observed: Vec<f64> = observed
            .iter()
            .filter_map(|observation| observation.budget_bracket())
            .map(|bracket| multipliers[bracket.index()])
            .collect();
        match stats::mean(&observed) {
            Some(mean) if mean > 0.0 => multipliers[bracket.index()] / mean,
            _ => 1.0,
        }
    }

    fn from_prior(&self, bid: &BidAnnouncement) -> CompetitionPrediction {
        let policy = &self.policy;
        let month = bid.deadline.month();
        let month_index = month.clamp(1, 12) as usize - 1;
        let factors = CompetitionFactors {
            base: policy.baseline(bid.product_category()),
            agency: policy.popularity(&bid.organization),
            seasonal: (policy.monthly[month_index] + policy.quarterly[month_index / 3]) / 2.0,
            budget: policy.budget_multipliers[bid.budget_bracket().index()],
            weekday: policy.weekday[bid.deadline.weekday().num_days_from_monday() as usize],
            urgency: if bid.urgent { policy.urgency_factor } else { 1.0 },
        };
        let raw = factors.base
            * factors.agency
            * factors.seasonal
            * factors.budget
            * factors.weekday
            * factors.urgency;
        let expected = raw.max(f64::from(policy.min_bidders)).round() as u32;
        let spread = f64::from(expected) * policy.spread_ratio;
        let level = self.level_for(expected);

        CompetitionPrediction {
            expected_bidders: expected,
            bidder_std_dev: spread,
            distribution: self.distribution(expected, spread),
            level,
            ratio_distribution: self.level_ratio(bid, level),
            density: self.density(expected),
            source: CompetitionSource::GlobalPrior,
            confidence: Confidence::Low,
            sample_size: 0,
            factors: Some(factors),
        }
    }

    fn level_ratio(&self, bid: &BidAnnouncement, level: CompetitionLevel) -> RatioDistribution {
        let floor = self.lower_limits.rate_for(bid);
        let profile = self.level_profile(level);
        let headroom = (self.policy.reference_ratio - floor).max(0.0);
        RatioDistribution {
            mean: floor + headroom * profile.ratio_position,
            std_dev: profile.ratio_std_dev,
        }
    }

    fn distribution(&self, expected: u32, spread: f64) -> BidderDistribution {
        let expected_f = f64::from(expected);
        let at = |offset: f64| (expected_f + offset).round().max(0.0) as u32;
        BidderDistribution {
            min: at(-2.0 * spread).max(2),
            p10: at(-DECILE_Z * spread).max(self.policy.min_bidders),
            likely: expected,
            p90: at(DECILE_Z * spread),
            max: at(2.0 * spread),
        }
    }

    fn density(&self, expected: u32) -> f64 {
        (0.5 + f64::from(expected) / 50.0).min(self.policy.max_density)
    }
}

fn quarter_of(month: u32) -> u32 {
    (month.clamp(1, 12) - 1) / 3 + 1
}
