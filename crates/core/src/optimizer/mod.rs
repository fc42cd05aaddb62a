//! Expected-value search over candidate bid ratios.
//!
//! A ratio `r` is relative to the predicted base price, so the submitted price is
//! `r × predicted assessment ratio × budget estimate`. A candidate wins when the bid survives the
//! realized base price (stays at or above the lower limit) and outranks the competitors under the
//! configured [`WinStrategy`].

pub mod strategy;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::EngineError;
use crate::stats;

pub use strategy::{PriceRankParams, RankContext, RankModel, ThresholdParams, WinStrategy};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerPolicy {
    pub grid_step: f64,
    pub max_ratio: f64,
    /// Delivery cost as a share of the base price.
    pub cost_ratio: f64,
    /// KRW spent preparing a bid that loses.
    pub participation_cost: f64,
    /// Expected-value margin (KRW) a higher ratio must beat to replace a lower one.
    pub ev_epsilon: f64,
    pub aggressive_offset: f64,
    pub conservative_ratio: f64,
}

impl Default for OptimizerPolicy {
    fn default() -> Self {
        Self {
            grid_step: 0.005,
            max_ratio: 0.95,
            cost_ratio: 0.76,
            participation_cost: 500_000.0,
            ev_epsilon: 1.0,
            aggressive_offset: 0.005,
            conservative_ratio: 0.88,
        }
    }
}

impl OptimizerPolicy {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.grid_step > 0.0 && self.grid_step <= 0.1) {
            return Err(EngineError::configuration("optimizer.grid_step must lie in (0, 0.1]"));
        }
        if !(self.max_ratio > 0.0 && self.max_ratio <= 1.2) {
            return Err(EngineError::configuration("optimizer.max_ratio must lie in (0, 1.2]"));
        }
        if !(self.cost_ratio >= 0.0 && self.cost_ratio < 1.0) {
            return Err(EngineError::configuration("optimizer.cost_ratio must lie in [0, 1)"));
        }
        if !(self.participation_cost >= 0.0 && self.ev_epsilon >= 0.0) {
            return Err(EngineError::configuration(
                "optimizer costs and epsilon must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Distributions and qualification outcome the search runs against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationInput {
    pub budget_estimate: u64,
    pub assessment_mean: f64,
    pub assessment_std_dev: f64,
    pub competitor_mean: f64,
    pub competitor_std_dev: f64,
    pub bidders: u32,
    /// Lower-limit rate; no candidate is generated below it.
    pub floor: f64,
    pub qualification_score: f64,
    pub pass_threshold: f64,
    pub qualification_passed: bool,
    pub qualification_required: bool,
}

impl OptimizationInput {
    pub fn base_price(&self) -> f64 {
        self.budget_estimate as f64 * self.assessment_mean
    }

    fn disqualified(&self) -> bool {
        self.qualification_required && !self.qualification_passed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    QualificationFailed,
    NoViableRatio,
    LowWinProbability,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QualificationFailed => "qualification_failed",
            Self::NoViableRatio => "no_viable_ratio",
            Self::LowWinProbability => "low_win_probability",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub ratio: f64,
    pub bid_price: u64,
    /// P(bid stays at or above the lower limit against the realized base price).
    pub valid_probability: f64,
    pub rank_probability: f64,
    pub win_probability: f64,
    pub expected_value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeKind {
    Aggressive,
    Balanced,
    Conservative,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub kind: AlternativeKind,
    pub point: SensitivityPoint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub recommended_ratio: Option<f64>,
    pub recommended_price: Option<u64>,
    /// Win probability at the recommended ratio, or at the best candidate when none is viable.
    pub win_probability: f64,
    pub expected_value: f64,
    pub reason: Option<ReasonCode>,
    pub best_candidate: Option<SensitivityPoint>,
    pub sensitivity: Vec<SensitivityPoint>,
    pub alternatives: Vec<Alternative>,
}

#[derive(Clone, Debug, Default)]
pub struct BidOptimizer {
    policy: OptimizerPolicy,
    strategy: WinStrategy,
}

impl BidOptimizer {
    pub fn new(policy: OptimizerPolicy, strategy: WinStrategy) -> Self {
        Self { policy, strategy }
    }

    pub fn policy(&self) -> &OptimizerPolicy {
        &self.policy
    }

    pub fn strategy(&self) -> &WinStrategy {
        &self.strategy
    }

    /// Candidate ratios from the floor upwards in `grid_step` increments.
    pub fn grid(&self, floor: f64) -> Vec<f64> {
        let step = self.policy.grid_step;
        if floor >= self.policy.max_ratio {
            return vec![floor];
        }
        let steps = ((self.policy.max_ratio - floor) / step + 1e-9).floor() as usize;
        (0..=steps).map(|index| (floor + step * index as f64).max(floor)).collect()
    }

    pub fn evaluate(&self, input: &OptimizationInput, ratio: f64) -> SensitivityPoint {
        let bid_price = (ratio * input.base_price()).round().max(0.0) as u64;
        if ratio < input.floor || input.disqualified() {
            return self.point(input, ratio, bid_price, 0.0, 0.0);
        }

        let survives_at = ratio * input.assessment_mean / input.floor;
        let valid_probability =
            stats::normal_cdf(survives_at, input.assessment_mean, input.assessment_std_dev);
        let context = RankContext {
            competitor_mean: input.competitor_mean,
            competitor_std_dev: input.competitor_std_dev,
            bidders: input.bidders,
            qualification_score: input.qualification_score,
            pass_threshold: input.pass_threshold,
        };
        let rank_probability = self.strategy.rank_probability(ratio, &context);
        self.point(input, ratio, bid_price, valid_probability, rank_probability)
    }

    fn point(
        &self,
        input: &OptimizationInput,
        ratio: f64,
        bid_price: u64,
        valid_probability: f64,
        rank_probability: f64,
    ) -> SensitivityPoint {
        let win_probability = (valid_probability * rank_probability).clamp(0.0, 1.0);
        let profit = input.base_price() * (ratio - self.policy.cost_ratio);
        let expected_value = win_probability * profit
            - (1.0 - win_probability) * self.policy.participation_cost;
        SensitivityPoint {
            ratio,
            bid_price,
            valid_probability,
            rank_probability,
            win_probability,
            expected_value,
        }
    }

    pub fn optimize(&self, input: &OptimizationInput) -> OptimizationResult {
        let sensitivity: Vec<SensitivityPoint> =
            self.grid(input.floor).into_iter().map(|ratio| self.evaluate(input, ratio)).collect();

        let mut recommended: Option<&SensitivityPoint> = None;
        for point in sensitivity.iter().filter(|point| point.expected_value > 0.0) {
            let replaces = recommended.map_or(true, |best| {
                point.expected_value > best.expected_value + self.policy.ev_epsilon
            });
            if replaces {
                recommended = Some(point);
            }
        }
        let best_candidate = sensitivity
            .iter()
            .fold(None::<&SensitivityPoint>, |best, point| match best {
                Some(best) if best.expected_value >= point.expected_value => Some(best),
                _ => Some(point),
            })
            .cloned();

        let reason = match recommended {
            Some(_) => None,
            None if input.disqualified() => Some(ReasonCode::QualificationFailed),
            None => Some(ReasonCode::NoViableRatio),
        };
        let chosen = recommended.cloned().or_else(|| best_candidate.clone());
        let result = OptimizationResult {
            recommended_ratio: recommended.map(|point| point.ratio),
            recommended_price: recommended.map(|point| point.bid_price),
            win_probability: chosen.as_ref().map_or(0.0, |point| point.win_probability),
            expected_value: chosen.as_ref().map_or(0.0, |point| point.expected_value),
            reason,
            alternatives: self.alternatives(input),
            best_candidate,
            sensitivity,
        };

        debug!(
            event_name = "optimizer.search.completed",
            strategy = self.strategy.name(),
            candidates = result.sensitivity.len(),
            recommended_ratio = ?result.recommended_ratio,
            reason = result.reason.map(ReasonCode::as_str),
            "bid ratio search completed"
        );
        result
    }

    fn alternatives(&self, input: &OptimizationInput) -> Vec<Alternative> {
        [
            (AlternativeKind::Aggressive, input.floor + self.policy.aggressive_offset),
            (AlternativeKind::Balanced, input.competitor_mean),
            (AlternativeKind::Conservative, self.policy.conservative_ratio),
        ]
        .into_iter()
        .map(|(kind, ratio)| Alternative {
            kind,
            point: self.evaluate(input, ratio.max(input.floor)),
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AlternativeKind, BidOptimizer, OptimizationInput, OptimizerPolicy, ReasonCode,
        ThresholdParams, WinStrategy,
    };

    fn input() -> OptimizationInput {
        OptimizationInput {
            budget_estimate: 150_000_000,
            assessment_mean: 1.0,
            assessment_std_dev: 0.0015,
            competitor_mean: 0.86,
            competitor_std_dev: 0.015,
            bidders: 10,
            floor: 0.84245,
            qualification_score: 92.0,
            pass_threshold: 85.0,
            qualification_passed: true,
            qualification_required: true,
        }
    }

    #[test]
    fn recommends_a_ratio_at_or_above_the_floor() {
        let result = BidOptimizer::default().optimize(&input());
        let ratio = result.recommended_ratio.expect("viable ratio");
        assert!(ratio >= 0.84245);
        assert!(result.reason.is_none());
        assert!(result.win_probability > 0.0 && result.win_probability <= 1.0);
        assert!(result.expected_value > 0.0);
        assert_eq!(result.sensitivity.first().map(|point| point.ratio), Some(0.84245));
        assert!(result.sensitivity.iter().all(|point| point.ratio >= 0.84245));
    }

    #[test]
    fn no_positive_expected_value_above_the_floor_means_no_ratio() {
        let policy = OptimizerPolicy { cost_ratio: 0.90, ..OptimizerPolicy::default() };
        let optimizer = BidOptimizer::new(policy, WinStrategy::default());
        let input = OptimizationInput {
            floor: 0.88,
            competitor_mean: 0.80,
            competitor_std_dev: 0.01,
            ..input()
        };

        let result = optimizer.optimize(&input);
        assert_eq!(result.recommended_ratio, None);
        assert_eq!(result.recommended_price, None);
        assert_eq!(result.reason, Some(ReasonCode::NoViableRatio));
        assert!(!result.sensitivity.is_empty());
        assert!(result.sensitivity.iter().all(|point| point.expected_value <= 0.0));
    }

    #[test]
    fn failed_required_qualification_zeroes_every_candidate() {
        let input = OptimizationInput { qualification_passed: false, ..input() };
        let result = BidOptimizer::default().optimize(&input);
        assert_eq!(result.recommended_ratio, None);
        assert_eq!(result.reason, Some(ReasonCode::QualificationFailed));
        assert!(result.sensitivity.iter().all(|point| point.win_probability == 0.0));
    }

    #[test]
    fn bid_at_the_floor_survives_half_of_the_base_price_draws() {
        let point = BidOptimizer::default().evaluate(&input(), 0.84245);
        assert!((point.valid_probability - 0.5).abs() < 1e-6);
        assert_eq!(point.bid_price, 126_367_500);
    }

    #[test]
    fn near_ties_resolve_to_the_lower_ratio() {
        // Higher ratios earn more here, but never by more than the epsilon.
        let policy = OptimizerPolicy {
            ev_epsilon: 1e12,
            participation_cost: 0.0,
            ..OptimizerPolicy::default()
        };
        let optimizer = BidOptimizer::new(
            policy,
            WinStrategy::Threshold(ThresholdParams { base_probability: 0.5, cap: 0.95 }),
        );
        let input = OptimizationInput { bidders: 1, ..input() };
        let result = optimizer.optimize(&input);
        assert_eq!(result.recommended_ratio, Some(0.84245));
    }

    #[test]
    fn alternatives_are_clamped_to_the_floor() {
        let input = OptimizationInput { competitor_mean: 0.80, ..input() };
        let result = BidOptimizer::default().optimize(&input);
        let balanced = result
            .alternatives
            .iter()
            .find(|alternative| alternative.kind == AlternativeKind::Balanced)
            .expect("balanced alternative");
        assert_eq!(balanced.point.ratio, 0.84245);
        assert_eq!(result.alternatives.len(), 3);
    }

    #[test]
    fn grid_collapses_to_the_floor_above_the_maximum() {
        let optimizer = BidOptimizer::default();
        assert_eq!(optimizer.grid(0.97), vec![0.97]);
        assert_eq!(optimizer.grid(0.94).len(), 3);
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let policy = OptimizerPolicy { grid_step: 0.0, ..OptimizerPolicy::default() };
        assert!(policy.validate().is_err());
        assert!(OptimizerPolicy::default().validate().is_ok());
    }
}
