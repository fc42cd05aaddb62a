pub mod assessment;
pub mod audit;
pub mod backtest;
pub mod competition;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod lower_limit;
pub mod matching;
pub mod optimizer;
pub mod parallel;
pub mod policy;
pub mod qualification;
pub mod stats;
pub mod text;

pub use assessment::{AssessmentPrediction, AssessmentPredictor};
pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink};
pub use backtest::{
    run_backtest, run_backtest_with_audit, BacktestOptions, BacktestRecord, BacktestReport,
};
pub use competition::{CompetitionLevel, CompetitionPrediction, CompetitionPredictor};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::{
    AgencyHistory, BidAnnouncement, BidId, CompanyProfile, Confidence, Product, Recommendation,
};
pub use engine::{BidPrediction, BiddingEngine, PipelineState};
pub use errors::{EngineError, InterfaceError};
pub use lower_limit::LowerLimitPolicy;
pub use matching::{MatchResult, MatchSummary, ProductMatcher};
pub use optimizer::{BidOptimizer, OptimizationResult, WinStrategy};
pub use policy::EnginePolicy;
pub use qualification::{QualificationResult, QualificationScorer};
