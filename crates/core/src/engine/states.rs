use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Pending,
    InputValidated,
    QualificationChecked,
    PricePredicted,
    CompetitionPredicted,
    Optimized,
    RecommendationReady,
    Error,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::RecommendationReady | Self::Error)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineEvent {
    InputAccepted,
    QualificationScored,
    /// Qualification failed on a contract type that requires it.
    QualificationGateClosed,
    BasePricePredicted,
    CompetitionPredicted,
    BidOptimized,
    RecommendationComposed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineAction {
    ScoreQualification,
    PredictBasePrice,
    PredictCompetition,
    OptimizeBid,
    ComposeRecommendation,
    ComposeSkip,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: PipelineState,
    pub to: PipelineState,
    pub event: PipelineEvent,
    pub actions: Vec<PipelineAction>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: PipelineState, event: PipelineEvent },
}

pub fn transition(
    current: PipelineState,
    event: PipelineEvent,
) -> Result<TransitionOutcome, TransitionError> {
    use PipelineAction::{
        ComposeRecommendation, ComposeSkip, OptimizeBid, PredictBasePrice, PredictCompetition,
        ScoreQualification,
    };
    use PipelineState::{
        CompetitionPredicted, InputValidated, Optimized, Pending, PricePredicted,
        QualificationChecked, RecommendationReady,
    };

    let (to, actions) = match (current, event) {
        (Pending, PipelineEvent::InputAccepted) => (InputValidated, vec![ScoreQualification]),
        (InputValidated, PipelineEvent::QualificationScored) => {
            (QualificationChecked, vec![PredictBasePrice])
        }
        (QualificationChecked, PipelineEvent::QualificationGateClosed) => {
            (RecommendationReady, vec![ComposeSkip])
        }
        (QualificationChecked, PipelineEvent::BasePricePredicted) => {
            (PricePredicted, vec![PredictCompetition])
        }
        (PricePredicted, PipelineEvent::CompetitionPredicted) => {
            (CompetitionPredicted, vec![OptimizeBid])
        }
        (CompetitionPredicted, PipelineEvent::BidOptimized) => {
            (Optimized, vec![ComposeRecommendation])
        }
        (Optimized, PipelineEvent::RecommendationComposed) => (RecommendationReady, Vec::new()),
        (state, PipelineEvent::Failed) if !state.is_terminal() => {
            (PipelineState::Error, Vec::new())
        }
        _ => return Err(TransitionError::InvalidTransition { state: current, event }),
    };

    Ok(TransitionOutcome { from: current, to, event, actions })
}
