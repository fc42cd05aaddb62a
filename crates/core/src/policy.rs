//! The single tunable policy object every component is built from.

use serde::{Deserialize, Serialize};

use crate::assessment::AssessmentPolicy;
use crate::competition::CompetitionPolicy;
use crate::engine::EngineSettings;
use crate::errors::EngineError;
use crate::lower_limit::LowerLimitPolicy;
use crate::matching::MatcherPolicy;
use crate::optimizer::OptimizerPolicy;
use crate::qualification::QualificationPolicy;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginePolicy {
    pub matcher: MatcherPolicy,
    pub qualification: QualificationPolicy,
    pub assessment: AssessmentPolicy,
    pub competition: CompetitionPolicy,
    pub optimizer: OptimizerPolicy,
    pub engine: EngineSettings,
    pub lower_limits: LowerLimitPolicy,
}

impl EnginePolicy {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.matcher.validate()?;
        self.qualification.validate()?;
        self.assessment.validate()?;
        self.competition.validate()?;
        self.optimizer.validate()?;
        self.engine.validate()?;
        self.lower_limits.validate()
    }
}
