//! Assessment-ratio (사정률) predictor: the distribution of base price over budget estimate.
//!
//! Estimates come from the agency's own history when there is enough of it, then from the
//! category's history across agencies, then from a prior keyed by agency type. The predictor
//! never fails for lack of data; it lowers the reported confidence instead.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{AgencyHistory, AgencyType, BidAnnouncement, Confidence, HistoricalObservation};
use crate::errors::EngineError;
use crate::stats::{self, QUARTILE_Z};
use crate::text;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssessmentPrior {
    pub mean: f64,
    pub std_dev: f64,
    /// Seasonal multipliers, January first.
    pub monthly: [f64; 12],
    pub quarterly: [f64; 4],
}

impl AssessmentPrior {
    /// Average of the monthly and quarterly factors for a 1-based month.
    pub fn seasonal_factor(&self, month: u32) -> f64 {
        let month_index = month.clamp(1, 12) as usize - 1;
        (self.monthly[month_index] + self.quarterly[month_index / 3]) / 2.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypePriors {
    pub central: AssessmentPrior,
    pub local: AssessmentPrior,
    pub public_corp: AssessmentPrior,
    pub education: AssessmentPrior,
    pub military: AssessmentPrior,
}

impl TypePriors {
    pub fn get(&self, agency_type: AgencyType) -> &AssessmentPrior {
        match agency_type {
            AgencyType::Central => &self.central,
            AgencyType::Local => &self.local,
            AgencyType::PublicCorp => &self.public_corp,
            AgencyType::Education => &self.education,
            AgencyType::Military => &self.military,
        }
    }

    fn all(&self) -> [&AssessmentPrior; 5] {
        [&self.central, &self.local, &self.public_corp, &self.education, &self.military]
    }
}

impl Default for TypePriors {
    fn default() -> Self {
        Self {
            central: AssessmentPrior {
                mean: 1.0002,
                std_dev: 0.0012,
                monthly: [
                    1.001, 1.000, 0.999, 1.000, 1.001, 0.999, 1.000, 1.000, 1.001, 1.000, 0.999,
                    1.002,
                ],
                quarterly: [1.000, 0.999, 1.000, 1.001],
            },
            local: AssessmentPrior {
                mean: 1.0008,
                std_dev: 0.0018,
                monthly: [
                    1.001, 1.000, 1.002, 0.999, 1.000, 1.001, 0.999, 1.000, 1.001, 1.000, 1.001,
                    1.003,
                ],
                quarterly: [1.001, 0.999, 1.000, 1.002],
            },
            public_corp: AssessmentPrior {
                mean: 0.9998,
                std_dev: 0.0014,
                monthly: [
                    1.000, 0.999, 1.000, 1.000, 1.001, 0.999, 1.000, 0.999, 1.000, 1.001, 1.000,
                    1.001,
                ],
                quarterly: [1.000, 1.000, 0.999, 1.001],
            },
            education: AssessmentPrior {
                mean: 1.0005,
                std_dev: 0.0020,
                monthly: [
                    0.999, 1.002, 1.001, 1.000, 1.000, 1.001, 0.998, 0.999, 1.002, 1.001, 1.000,
                    1.002,
                ],
                quarterly: [1.001, 1.000, 0.999, 1.002],
            },
            military: AssessmentPrior {
                mean: 1.0,
                std_dev: 0.0010,
                monthly: [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.001],
                quarterly: [1.0, 1.0, 1.0, 1.001],
            },
        }
    }
}

/// Prior tuned for a specific agency; seasonality still comes from its type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnownAgencyPrior {
    pub name: String,
    pub agency_type: AgencyType,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentPolicy {
    /// Agency samples needed before agency history is used on its own.
    pub min_agency_samples: usize,
    /// Agency samples needed for `high` confidence.
    pub high_confidence_samples: usize,
    pub min_category_samples: usize,
    pub min_std_dev: f64,
    pub range_floor: f64,
    pub range_ceiling: f64,
    pub type_priors: TypePriors,
    pub known_agencies: Vec<KnownAgencyPrior>,
    /// Multipliers by budget bracket, smallest bracket first.
    pub budget_factors: [f64; 6],
}

impl Default for AssessmentPolicy {
    fn default() -> Self {
        let known = |name: &str, agency_type, mean, std_dev| KnownAgencyPrior {
            name: name.to_owned(),
            agency_type,
            mean,
            std_dev,
        };
        Self {
            min_agency_samples: 5,
            high_confidence_samples: 20,
            min_category_samples: 1,
            min_std_dev: 0.0005,
            range_floor: 0.97,
            range_ceiling: 1.03,
            type_priors: TypePriors::default(),
            known_agencies: vec![
                known("조달청", AgencyType::Central, 1.0001, 0.0010),
                known("서울시", AgencyType::Local, 1.0012, 0.0015),
                known("한국수자원공사", AgencyType::PublicCorp, 0.9995, 0.0012),
                known("한국지역난방공사", AgencyType::PublicCorp, 1.0003, 0.0014),
                known("한국농어촌공사", AgencyType::PublicCorp, 1.0, 0.0015),
            ],
            budget_factors: [1.002, 1.001, 1.0, 0.999, 0.998, 0.997],
        }
    }
}

impl AssessmentPolicy {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_agency_samples == 0 {
            return Err(EngineError::configuration("assessment.min_agency_samples must be >= 1"));
        }
        if self.high_confidence_samples < self.min_agency_samples {
            return Err(EngineError::configuration(
                "assessment.high_confidence_samples must be >= min_agency_samples",
            ));
        }
        if !(self.min_std_dev > 0.0) {
            return Err(EngineError::configuration("assessment.min_std_dev must be positive"));
        }
        if !(self.range_floor < 1.0 && self.range_ceiling > 1.0) {
            return Err(EngineError::configuration("assessment range must bracket 1.0"));
        }
        let priors = self.type_priors.all();
        let factors = priors
            .iter()
            .flat_map(|prior| prior.monthly.iter().chain(prior.quarterly.iter()))
            .chain(self.budget_factors.iter());
        if factors.copied().any(|factor| !(factor > 0.0)) {
            return Err(EngineError::configuration("assessment factors must be positive"));
        }
        let means = priors.iter().map(|prior| (prior.mean, prior.std_dev)).chain(
            self.known_agencies.iter().map(|known| (known.mean, known.std_dev)),
        );
        for (mean, std_dev) in means {
            if !(mean > 0.0 && std_dev > 0.0) {
                return Err(EngineError::configuration(
                    "assessment priors need a positive mean and deviation",
                ));
            }
        }
        Ok(())
    }
}

/// Which rung of the fallback ladder produced the estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    AgencyHistory,
    CategoryHistory,
    SparseAgencyHistory,
    SparseCategoryHistory,
    GlobalPrior,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatioRange {
    pub low: f64,
    pub high: f64,
    pub p25: f64,
    pub p75: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssessmentFactors {
    pub base_mean: f64,
    pub seasonal: f64,
    pub budget: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssessmentPrediction {
    pub mean_ratio: f64,
    pub std_dev: f64,
    pub sample_size: usize,
    pub confidence: Confidence,
    pub source: AssessmentSource,
    pub agency_type: AgencyType,
    pub range: RatioRange,
    pub factors: AssessmentFactors,
}

#[derive(Clone, Debug, Default)]
pub struct AssessmentPredictor {
    policy: AssessmentPolicy,
}

impl AssessmentPredictor {
    pub fn new(policy: AssessmentPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AssessmentPolicy {
        &self.policy
    }

    pub fn predict(&self, bid: &BidAnnouncement, history: &AgencyHistory) -> AssessmentPrediction {
        let policy = &self.policy;
        let agency_type = AgencyType::detect(&bid.organization);
        let organization = text::normalize(&bid.organization);
        let category = bid.product_category();

        let ratios = |filter: &dyn Fn(&HistoricalObservation) -> bool| -> Vec<f64> {
            history
                .observations
                .iter()
                .filter(|observation| filter(observation))
                .filter_map(|observation| observation.assessment_ratio)
                .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
                .collect()
        };
        let agency_ratios =
            ratios(&|observation| text::normalize(&observation.organization) == organization);
        let category_ratios = ratios(&|observation| observation.product_category() == category);

        let prediction = if agency_ratios.len() >= policy.min_agency_samples {
            let confidence = if agency_ratios.len() >= policy.high_confidence_samples {
                Confidence::High
            } else {
                Confidence::Medium
            };
            self.learned(&agency_ratios, AssessmentSource::AgencyHistory, confidence, agency_type)
        } else if category_ratios.len() >= policy.min_category_samples.max(1) {
            self.learned(
                &category_ratios,
                AssessmentSource::CategoryHistory,
                Confidence::Medium,
                agency_type,
            )
        } else if !agency_ratios.is_empty() {
            self.learned(
                &agency_ratios,
                AssessmentSource::SparseAgencyHistory,
                Confidence::Medium,
                agency_type,
            )
        } else if !category_ratios.is_empty() {
            // Any category evidence outranks the prior; only an empty category is low confidence.
            self.learned(
                &category_ratios,
                AssessmentSource::SparseCategoryHistory,
                Confidence::Medium,
                agency_type,
            )
        } else {
            self.prior(bid, agency_type)
        };

        debug!(
            event_name = "assessment.predicted",
            bid_id = %bid.id,
            source = ?prediction.source,
            sample_size = prediction.sample_size,
            mean_ratio = prediction.mean_ratio,
            "assessment ratio predicted"
        );
        prediction
    }

    fn learned(
        &self,
        ratios: &[f64],
        source: AssessmentSource,
        confidence: Confidence,
        agency_type: AgencyType,
    ) -> AssessmentPrediction {
        let prior = self.policy.type_priors.get(agency_type);
        let mean = stats::mean(ratios).unwrap_or(prior.mean);
        let std_dev = stats::std_dev(ratios).unwrap_or(prior.std_dev).max(self.policy.min_std_dev);
        AssessmentPrediction {
            mean_ratio: mean,
            std_dev,
            sample_size: ratios.len(),
            confidence,
            source,
            agency_type,
            range: self.range(mean, std_dev),
            factors: AssessmentFactors { base_mean: mean, seasonal: 1.0, budget: 1.0 },
        }
    }

    fn prior(&self, bid: &BidAnnouncement, detected: AgencyType) -> AssessmentPrediction {
        let policy = &self.policy;
        let known = policy
            .known_agencies
            .iter()
            .find(|known| text::normalize(&known.name) == text::normalize(&bid.organization))
            .or_else(|| {
                policy
                    .known_agencies
                    .iter()
                    .find(|known| text::names_overlap(&known.name, &bid.organization))
            });

        let agency_type = known.map_or(detected, |known| known.agency_type);
        let type_prior = policy.type_priors.get(agency_type);
        let (base_mean, std_dev) = known
            .map_or((type_prior.mean, type_prior.std_dev), |known| (known.mean, known.std_dev));

        let seasonal = type_prior.seasonal_factor(bid.deadline.month());
        let budget = policy.budget_factors[bid.budget_bracket().index()];
        let mean = base_mean * seasonal * budget;
        let std_dev = std_dev.max(policy.min_std_dev);

        AssessmentPrediction {
            mean_ratio: mean,
            std_dev,
            sample_size: 0,
            confidence: Confidence::Low,
            source: AssessmentSource::GlobalPrior,
            agency_type,
            range: self.range(mean, std_dev),
            factors: AssessmentFactors { base_mean, seasonal, budget },
        }
    }

    fn range(&self, mean: f64, std_dev: f64) -> RatioRange {
        RatioRange {
            low: (mean - 2.0 * std_dev).max(self.policy.range_floor),
            high: (mean + 2.0 * std_dev).min(self.policy.range_ceiling),
            p25: mean - QUARTILE_Z * std_dev,
            p75: mean + QUARTILE_Z * std_dev,
        }
    }
}
