//! Bidding engine: runs qualification, base-price, competition and optimizer stages through an
//! explicit state machine and composes a BID / REVIEW / SKIP recommendation.

pub mod states;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assessment::{AssessmentPrediction, AssessmentPredictor, AssessmentSource};
use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use crate::competition::{CompetitionPrediction, CompetitionPredictor, CompetitionSource};
use crate::domain::{
    AgencyHistory, BidAnnouncement, BidId, CompanyProfile, Confidence, Recommendation,
};
use crate::errors::EngineError;
use crate::lower_limit::LowerLimitPolicy;
use crate::optimizer::{
    BidOptimizer, OptimizationInput, OptimizationResult, OptimizerPolicy, ReasonCode,
    SensitivityPoint, WinStrategy,
};
use crate::policy::EnginePolicy;
use crate::qualification::{QualificationResult, QualificationScorer};

pub use states::{
    transition, PipelineAction, PipelineEvent, PipelineState, TransitionError, TransitionOutcome,
};

/// Win-probability cutoffs for BID and REVIEW.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionBand {
    pub bid: f64,
    pub review: f64,
}

/// Bands per strategy; the price-rank model produces lower probabilities by construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionThresholds {
    pub threshold: ActionBand,
    pub price_rank: ActionBand,
}

impl Default for ActionThresholds {
    fn default() -> Self {
        Self {
            threshold: ActionBand { bid: 0.25, review: 0.10 },
            price_rank: ActionBand { bid: 0.12, review: 0.05 },
        }
    }
}

/// Deductions from a 100-point confidence score, by how thin the backing data is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidencePenalties {
    pub low_assessment: f64,
    pub medium_assessment: f64,
    pub competition_prior: f64,
    pub thin_margin: f64,
    pub thin_margin_points: f64,
    pub weak_delivery: f64,
    pub weak_delivery_points: f64,
    pub high_at: f64,
    pub medium_at: f64,
}

impl Default for ConfidencePenalties {
    fn default() -> Self {
        Self {
            low_assessment: 30.0,
            medium_assessment: 15.0,
            competition_prior: 15.0,
            thin_margin: 15.0,
            thin_margin_points: 3.0,
            weak_delivery: 10.0,
            weak_delivery_points: 15.0,
            high_at: 70.0,
            medium_at: 45.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub strategy: WinStrategy,
    pub thresholds: ActionThresholds,
    pub confidence: ConfidencePenalties,
}

impl EngineSettings {
    pub fn band(&self) -> &ActionBand {
        match self.strategy {
            WinStrategy::Threshold(_) => &self.thresholds.threshold,
            WinStrategy::PriceRank(_) => &self.thresholds.price_rank,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.strategy.validate()?;
        for (name, band) in
            [("threshold", &self.thresholds.threshold), ("price_rank", &self.thresholds.price_rank)]
        {
            if !(0.0 <= band.review && band.review <= band.bid && band.bid <= 1.0) {
                return Err(EngineError::configuration(format!(
                    "engine.thresholds.{name} needs 0 <= review <= bid <= 1"
                )));
            }
        }
        let confidence = &self.confidence;
        if confidence.medium_at > confidence.high_at {
            return Err(EngineError::configuration(
                "engine.confidence.medium_at must not exceed high_at",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Optimistic,
    Base,
    Pessimistic,
}

/// The chosen ratio re-evaluated under a shifted base price and bidder count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub assessment_ratio: f64,
    pub bidders: u32,
    pub win_probability: f64,
    pub expected_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BidPrediction {
    pub bid_id: BidId,
    pub strategy: String,
    pub recommendation: Recommendation,
    pub reason: Option<ReasonCode>,
    pub confidence: Confidence,
    pub confidence_score: f64,
    pub lower_limit_rate: f64,
    pub qualification: QualificationResult,
    pub assessment: Option<AssessmentPrediction>,
    pub competition: Option<CompetitionPrediction>,
    pub optimization: Option<OptimizationResult>,
    pub recommended_ratio: Option<f64>,
    pub recommended_price: Option<u64>,
    pub win_probability: f64,
    pub expected_value: f64,
    pub scenarios: Vec<Scenario>,
    /// States visited, `Pending` first.
    pub trace: Vec<PipelineState>,
}

#[derive(Clone, Debug, Default)]
pub struct BiddingEngine {
    qualification: QualificationScorer,
    assessment: AssessmentPredictor,
    competition: CompetitionPredictor,
    optimizer: BidOptimizer,
    lower_limits: LowerLimitPolicy,
    settings: EngineSettings,
}

impl BiddingEngine {
    pub fn new(policy: &EnginePolicy) -> Result<Self, EngineError> {
        policy.validate()?;
        Ok(Self {
            qualification: QualificationScorer::new(
                policy.qualification.clone(),
                policy.lower_limits.clone(),
            ),
            assessment: AssessmentPredictor::new(policy.assessment.clone()),
            competition: CompetitionPredictor::new(
                policy.competition.clone(),
                policy.lower_limits.clone(),
            ),
            optimizer: BidOptimizer::new(policy.optimizer.clone(), policy.engine.strategy.clone()),
            lower_limits: policy.lower_limits.clone(),
            settings: policy.engine.clone(),
        })
    }

    pub fn strategy(&self) -> &WinStrategy {
        &self.settings.strategy
    }

    pub fn lower_limits(&self) -> &LowerLimitPolicy {
        &self.lower_limits
    }

    pub fn optimizer_policy(&self) -> &OptimizerPolicy {
        self.optimizer.policy()
    }

    pub fn predict(
        &self,
        bid: &BidAnnouncement,
        profile: &CompanyProfile,
        history: &AgencyHistory,
    ) -> Result<BidPrediction, EngineError> {
        let audit = AuditContext::generated(Some(bid.id.clone()), "bidding-engine");
        self.predict_with_audit(bid, profile, history, &NoopAuditSink, &audit)
    }

    pub fn predict_with_audit<S>(
        &self,
        bid: &BidAnnouncement,
        profile: &CompanyProfile,
        history: &AgencyHistory,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<BidPrediction, EngineError>
    where
        S: AuditSink,
    {
        let mut run = Run {
            state: PipelineState::Pending,
            trace: vec![PipelineState::Pending],
            sink,
            audit,
        };
        match self.run(&mut run, bid, profile, history) {
            Ok(prediction) => Ok(prediction),
            Err(error) => {
                if !run.state.is_terminal() {
                    // The original error is what the caller sees.
                    let _ = run.advance(PipelineEvent::Failed);
                }
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "engine.prediction_failed",
                        AuditCategory::Engine,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error_class", error.error_class())
                    .with_metadata("error", error.to_string()),
                );
                debug!(
                    event_name = "engine.prediction.failed",
                    bid_id = %bid.id,
                    error_class = error.error_class(),
                    "prediction failed"
                );
                Err(error)
            }
        }
    }

    fn run<S>(
        &self,
        run: &mut Run<'_, S>,
        bid: &BidAnnouncement,
        profile: &CompanyProfile,
        history: &AgencyHistory,
    ) -> Result<BidPrediction, EngineError>
    where
        S: AuditSink,
    {
        bid.validate()?;
        run.advance(PipelineEvent::InputAccepted)?;

        let qualification = self.qualification.score(bid, profile)?;
        run.advance(PipelineEvent::QualificationScored)?;
        let floor = self.lower_limits.rate_for(bid);

        if !qualification.passed && bid.contract_type.requires_qualification() {
            run.advance(PipelineEvent::QualificationGateClosed)?;
            debug!(
                event_name = "engine.qualification.short_circuit",
                bid_id = %bid.id,
                score = qualification.score,
                pass_threshold = qualification.pass_threshold,
                "qualification failed; skipping price prediction"
            );
            let confidence_score = self.confidence_score(&qualification, None, None);
            let prediction = BidPrediction {
                bid_id: bid.id.clone(),
                strategy: self.settings.strategy.name().to_owned(),
                recommendation: Recommendation::Skip,
                reason: Some(ReasonCode::QualificationFailed),
                confidence: self.confidence_tier(confidence_score),
                confidence_score,
                lower_limit_rate: floor,
                qualification,
                assessment: None,
                competition: None,
                optimization: None,
                recommended_ratio: None,
                recommended_price: None,
                win_probability: 0.0,
                expected_value: 0.0,
                scenarios: Vec::new(),
                trace: run.trace.clone(),
            };
            self.log_completed(&prediction);
            return Ok(prediction);
        }

        let assessment = self.assessment.predict(bid, history);
        run.advance(PipelineEvent::BasePricePredicted)?;

        let competition = self.competition.predict(bid, history);
        run.advance(PipelineEvent::CompetitionPredicted)?;

        let input = OptimizationInput {
            budget_estimate: bid.budget_estimate,
            assessment_mean: assessment.mean_ratio,
            assessment_std_dev: assessment.std_dev,
            competitor_mean: competition.ratio_distribution.mean,
            competitor_std_dev: competition.ratio_distribution.std_dev,
            bidders: competition.expected_bidders,
            floor,
            qualification_score: qualification.score,
            pass_threshold: qualification.pass_threshold,
            qualification_passed: qualification.passed,
            qualification_required: bid.contract_type.requires_qualification(),
        };
        let optimization = self.optimizer.optimize(&input);
        run.advance(PipelineEvent::BidOptimized)?;

        let (recommendation, reason) = self.decide(&qualification, &optimization);
        let scenarios = self.scenarios(&input, &assessment, &competition, &optimization);
        let confidence_score =
            self.confidence_score(&qualification, Some(&assessment), Some(&competition));
        run.advance(PipelineEvent::RecommendationComposed)?;

        let prediction = BidPrediction {
            bid_id: bid.id.clone(),
            strategy: self.settings.strategy.name().to_owned(),
            recommendation,
            reason,
            confidence: self.confidence_tier(confidence_score),
            confidence_score,
            lower_limit_rate: floor,
            recommended_ratio: optimization.recommended_ratio,
            recommended_price: optimization.recommended_price,
            win_probability: optimization.win_probability,
            expected_value: optimization.expected_value,
            qualification,
            assessment: Some(assessment),
            competition: Some(competition),
            optimization: Some(optimization),
            scenarios,
            trace: run.trace.clone(),
        };
        self.log_completed(&prediction);
        Ok(prediction)
    }

    fn decide(
        &self,
        qualification: &QualificationResult,
        optimization: &OptimizationResult,
    ) -> (Recommendation, Option<ReasonCode>) {
        if optimization.recommended_ratio.is_none() {
            return (
                Recommendation::Skip,
                optimization.reason.or(Some(ReasonCode::NoViableRatio)),
            );
        }
        let band = self.settings.band();
        let probability = optimization.win_probability;
        if probability >= band.bid && qualification.passed {
            (Recommendation::Bid, None)
        } else if probability >= band.review {
            let reason = if qualification.passed {
                ReasonCode::LowWinProbability
            } else {
                ReasonCode::QualificationFailed
            };
            (Recommendation::Review, Some(reason))
        } else {
            (Recommendation::Skip, Some(ReasonCode::LowWinProbability))
        }
    }

    fn scenarios(
        &self,
        input: &OptimizationInput,
        assessment: &AssessmentPrediction,
        competition: &CompetitionPrediction,
        optimization: &OptimizationResult,
    ) -> Vec<Scenario> {
        let Some(ratio) = optimization
            .recommended_ratio
            .or_else(|| optimization.best_candidate.as_ref().map(|point| point.ratio))
        else {
            return Vec::new();
        };
        let distribution = &competition.distribution;
        [
            (ScenarioKind::Optimistic, assessment.range.p75, distribution.p10),
            (ScenarioKind::Base, assessment.mean_ratio, competition.expected_bidders),
            (ScenarioKind::Pessimistic, assessment.range.p25, distribution.p90),
        ]
        .into_iter()
        .map(|(kind, assessment_ratio, bidders)| {
            let shifted =
                OptimizationInput { assessment_mean: assessment_ratio, bidders, ..input.clone() };
            let SensitivityPoint { win_probability, expected_value, .. } =
                self.optimizer.evaluate(&shifted, ratio);
            Scenario { kind, assessment_ratio, bidders, win_probability, expected_value }
        })
        .collect()
    }

    fn confidence_score(
        &self,
        qualification: &QualificationResult,
        assessment: Option<&AssessmentPrediction>,
        competition: Option<&CompetitionPrediction>,
    ) -> f64 {
        let penalties = &self.settings.confidence;
        let mut score: f64 = 100.0;
        match assessment.map(|assessment| assessment.confidence) {
            Some(Confidence::Low) => score -= penalties.low_assessment,
            Some(Confidence::Medium) => score -= penalties.medium_assessment,
            _ => {}
        }
        let competition_prior = competition
            .is_some_and(|competition| competition.source == CompetitionSource::GlobalPrior);
        if competition_prior {
            score -= penalties.competition_prior;
        }
        if qualification.margin.abs() < penalties.thin_margin_points {
            score -= penalties.thin_margin;
        }
        if qualification.breakdown.delivery < penalties.weak_delivery_points {
            score -= penalties.weak_delivery;
        }
        score.clamp(0.0, 100.0)
    }

    fn confidence_tier(&self, score: f64) -> Confidence {
        let penalties = &self.settings.confidence;
        if score >= penalties.high_at {
            Confidence::High
        } else if score >= penalties.medium_at {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    fn log_completed(&self, prediction: &BidPrediction) {
        info!(
            event_name = "engine.prediction.completed",
            bid_id = %prediction.bid_id,
            strategy = %prediction.strategy,
            recommendation = prediction.recommendation.as_str(),
            reason = prediction.reason.map(ReasonCode::as_str),
            win_probability = prediction.win_probability,
            assessment_from_prior = prediction
                .assessment
                .as_ref()
                .is_some_and(|assessment| assessment.source == AssessmentSource::GlobalPrior),
            "bid prediction completed"
        );
    }
}

/// Current state and trace of one prediction, with the audit sink transitions report to.
struct Run<'a, S> {
    state: PipelineState,
    trace: Vec<PipelineState>,
    sink: &'a S,
    audit: &'a AuditContext,
}

impl<S> Run<'_, S>
where
    S: AuditSink,
{
    fn advance(&mut self, event: PipelineEvent) -> Result<(), EngineError> {
        match transition(self.state, event) {
            Ok(outcome) => {
                self.sink.emit(
                    AuditEvent::new(
                        self.audit,
                        "engine.transition_applied",
                        AuditCategory::Engine,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
                self.state = outcome.to;
                self.trace.push(outcome.to);
                Ok(())
            }
            Err(error) => {
                self.sink.emit(
                    AuditEvent::new(
                        self.audit,
                        "engine.transition_rejected",
                        AuditCategory::Engine,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
                Err(error.into())
            }
        }
    }
}
