//! Replays the bidding engine over awarded announcements and scores its BID/SKIP calls.

pub mod metrics;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use crate::domain::{
    AgencyHistory, BidAnnouncement, BidCategory, BidId, BudgetBracket, CompanyProfile,
    Recommendation,
};
use crate::engine::{BidPrediction, BiddingEngine};
use crate::optimizer::ReasonCode;
use crate::parallel;
use crate::text;

pub use metrics::{
    mape, AccuracyMetrics, BreakdownRow, ConfusionCell, ConfusionMatrix, Profitability,
};

/// An announcement whose `outcome` was backfilled after award.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BacktestRecord {
    pub bid: BidAnnouncement,
}

impl From<BidAnnouncement> for BacktestRecord {
    fn from(bid: BidAnnouncement) -> Self {
        Self { bid }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestFilters {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Substring matches against the issuing organization.
    pub organizations: Vec<String>,
    pub categories: Vec<BidCategory>,
    pub min_budget: Option<u64>,
    pub max_budget: Option<u64>,
}

impl BacktestFilters {
    pub fn accepts(&self, bid: &BidAnnouncement) -> bool {
        let in_range = self.from.map_or(true, |from| bid.deadline >= from)
            && self.to.map_or(true, |to| bid.deadline <= to);
        let organization = self.organizations.is_empty()
            || self
                .organizations
                .iter()
                .any(|wanted| text::names_overlap(wanted, &bid.organization));
        let category =
            self.categories.is_empty() || self.categories.contains(&bid.product_category());
        let budget = self.min_budget.map_or(true, |min| bid.budget_estimate >= min)
            && self.max_budget.map_or(true, |max| bid.budget_estimate <= max);
        in_range && organization && category && budget
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestOptions {
    /// Accumulate profit as if every participation used the engine's ratio.
    pub simulate_bidding: bool,
    /// Participate only on BID; otherwise REVIEW counts as participation too.
    pub follow_recommendation: bool,
    /// Judge the bid against the realized base price as if it had been known in advance.
    pub use_actual_assessment_ratio: bool,
    /// Add the records' own outcomes to the history the predictors learn from.
    pub learn_from_records: bool,
    pub filters: BacktestFilters,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            simulate_bidding: false,
            follow_recommendation: true,
            use_actual_assessment_ratio: false,
            learn_from_records: true,
            filters: BacktestFilters::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Evaluated,
    InsufficientData,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
    pub bid_id: BidId,
    pub organization: String,
    pub budget_bracket: BudgetBracket,
    pub status: RecordStatus,
    /// Observations strictly before this record's deadline that fed the predictors.
    pub history_size: usize,
    pub recommendation: Option<Recommendation>,
    pub reason: Option<ReasonCode>,
    pub win_probability: Option<f64>,
    pub evaluated_ratio: Option<f64>,
    /// Bid price over the realized base price.
    pub realized_ratio: Option<f64>,
    pub actual_winning_ratio: Option<f64>,
    pub would_have_won: Option<bool>,
    pub participated: bool,
    pub cell: Option<ConfusionCell>,
    pub profit: Option<f64>,
    pub predicted_assessment: Option<f64>,
    pub actual_assessment: Option<f64>,
    pub predicted_bidders: Option<u32>,
    pub actual_bidders: Option<u32>,
    pub error: Option<String>,
}

impl RecordResult {
    fn new(bid: &BidAnnouncement, status: RecordStatus) -> Self {
        let outcome = bid.outcome.as_ref();
        Self {
            bid_id: bid.id.clone(),
            organization: bid.organization.clone(),
            budget_bracket: bid.budget_bracket(),
            status,
            history_size: 0,
            recommendation: None,
            reason: None,
            win_probability: None,
            evaluated_ratio: None,
            realized_ratio: None,
            actual_winning_ratio: outcome
                .and_then(|outcome| outcome.resolved_winning_ratio(bid.budget_estimate)),
            would_have_won: None,
            participated: false,
            cell: None,
            profit: None,
            predicted_assessment: None,
            actual_assessment: outcome.and_then(|outcome| outcome.assessment_ratio),
            predicted_bidders: None,
            actual_bidders: outcome.and_then(|outcome| outcome.bidder_count),
            error: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub total_records: usize,
    pub filtered_out: usize,
    pub evaluated: usize,
    pub insufficient_data: usize,
    pub failed: usize,
    pub confusion: ConfusionMatrix,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: AccuracyMetrics,
    pub profitability: Option<Profitability>,
    pub total_profit_simulated: Option<f64>,
    pub by_organization: Vec<BreakdownRow>,
    pub by_budget_bracket: Vec<BreakdownRow>,
    pub per_record_results: Vec<RecordResult>,
}

/// Whether a bid at `ratio` (relative to the predicted base price) would have won.
///
/// The submitted price is `ratio × predicted` times the budget, so against the realized base price
/// it sits at `ratio × predicted / actual`. It wins when that stays at or above the floor and at
/// or below the actual winning ratio.
pub fn would_have_won(
    ratio: f64,
    predicted_assessment: f64,
    actual_assessment: Option<f64>,
    floor: f64,
    actual_winning_ratio: f64,
    qualified: bool,
) -> (bool, f64) {
    let realized = match actual_assessment {
        Some(actual) if actual > 0.0 => ratio * predicted_assessment / actual,
        _ => ratio,
    };
    (qualified && realized >= floor && realized <= actual_winning_ratio, realized)
}

pub fn run_backtest(
    engine: &BiddingEngine,
    records: &[BacktestRecord],
    profile: &CompanyProfile,
    history: &AgencyHistory,
    options: &BacktestOptions,
) -> BacktestReport {
    let audit = AuditContext::generated(None, "backtest");
    run_backtest_with_audit(engine, records, profile, history, options, &NoopAuditSink, &audit)
}

/// Like [`run_backtest`], sending every record's engine transitions and a closing summary event
/// to `sink` under the context's run id.
pub fn run_backtest_with_audit<S>(
    engine: &BiddingEngine,
    records: &[BacktestRecord],
    profile: &CompanyProfile,
    history: &AgencyHistory,
    options: &BacktestOptions,
    sink: &S,
    audit: &AuditContext,
) -> BacktestReport
where
    S: AuditSink,
{
    let mut learned = history.clone();
    if options.learn_from_records {
        let outcomes = AgencyHistory::from_announcements(records.iter().map(|record| &record.bid));
        learned.observations.extend(outcomes.observations);
    }

    let selected: Vec<&BacktestRecord> =
        records.iter().filter(|record| options.filters.accepts(&record.bid)).collect();
    let per_record_results = parallel::map_bounded(&selected, |record| {
        let context = AuditContext::new(
            Some(record.bid.id.clone()),
            audit.run_id.clone(),
            audit.correlation_id.clone(),
            audit.actor.clone(),
        );
        evaluate_record(engine, &record.bid, profile, &learned, options, sink, &context)
    });

    let filtered_out = records.len() - selected.len();
    let report = summarize(records.len(), filtered_out, per_record_results, options);
    info!(
        event_name = "backtest.run.completed",
        total_records = report.total_records,
        evaluated = report.evaluated,
        insufficient_data = report.insufficient_data,
        failed = report.failed,
        precision = report.precision,
        recall = report.recall,
        f1 = report.f1,
        "backtest run completed"
    );
    sink.emit(
        AuditEvent::new(
            audit,
            "backtest.run_completed",
            AuditCategory::Backtest,
            AuditOutcome::Success,
        )
        .with_metadata("total_records", report.total_records.to_string())
        .with_metadata("evaluated", report.evaluated.to_string())
        .with_metadata("insufficient_data", report.insufficient_data.to_string())
        .with_metadata("failed", report.failed.to_string())
        .with_metadata("f1", format!("{:.4}", report.f1)),
    );
    report
}

fn evaluate_record<S: AuditSink>(
    engine: &BiddingEngine,
    bid: &BidAnnouncement,
    profile: &CompanyProfile,
    history: &AgencyHistory,
    options: &BacktestOptions,
    sink: &S,
    audit: &AuditContext,
) -> RecordResult {
    let mut result = RecordResult::new(bid, RecordStatus::Evaluated);
    let Some(actual_winning_ratio) = result.actual_winning_ratio else {
        result.status = RecordStatus::InsufficientData;
        return result;
    };

    let prior = history.before(bid.deadline);
    result.history_size = prior.len();
    let prediction = match engine.predict_with_audit(bid, profile, &prior, sink, audit) {
        Ok(prediction) => prediction,
        Err(error) => {
            result.status = RecordStatus::Failed;
            result.error = Some(error.to_string());
            return result;
        }
    };

    let predicted_assessment =
        prediction.assessment.as_ref().map(|assessment| assessment.mean_ratio);
    result.recommendation = Some(prediction.recommendation);
    result.reason = prediction.reason;
    result.win_probability = Some(prediction.win_probability);
    result.predicted_assessment = predicted_assessment;
    result.predicted_bidders =
        prediction.competition.as_ref().map(|competition| competition.expected_bidders);
    result.participated = if options.follow_recommendation {
        prediction.recommendation == Recommendation::Bid
    } else {
        prediction.recommendation != Recommendation::Skip
    };

    let qualified =
        prediction.qualification.passed || !bid.contract_type.requires_qualification();
    let evaluated_ratio = evaluated_ratio(&prediction);
    result.evaluated_ratio = evaluated_ratio;

    let won = match (evaluated_ratio, predicted_assessment) {
        (Some(ratio), Some(predicted)) => {
            let actual = if options.use_actual_assessment_ratio {
                None
            } else {
                result.actual_assessment
            };
            let (won, realized) = would_have_won(
                ratio,
                predicted,
                actual,
                prediction.lower_limit_rate,
                actual_winning_ratio,
                qualified,
            );
            result.realized_ratio = Some(realized);
            won
        }
        _ => false,
    };
    result.would_have_won = Some(won);
    result.cell = Some(ConfusionCell::classify(result.participated, won));

    if options.simulate_bidding && result.participated {
        let optimizer = engine.optimizer_policy();
        let profit = match (won, evaluated_ratio, predicted_assessment) {
            (true, Some(ratio), Some(predicted)) => {
                let budget = bid.budget_estimate as f64;
                let actual_base = budget * result.actual_assessment.unwrap_or(predicted);
                ratio * predicted * budget - optimizer.cost_ratio * actual_base
            }
            _ => -optimizer.participation_cost,
        };
        result.profit = Some(profit);
    }
    result
}

/// The ratio the vendor would have submitted: the recommendation, or the best candidate when
/// the optimizer found nothing viable.
fn evaluated_ratio(prediction: &BidPrediction) -> Option<f64> {
    prediction.recommended_ratio.or_else(|| {
        prediction
            .optimization
            .as_ref()
            .and_then(|optimization| optimization.best_candidate.as_ref())
            .map(|point| point.ratio)
    })
}

fn summarize(
    total_records: usize,
    filtered_out: usize,
    per_record_results: Vec<RecordResult>,
    options: &BacktestOptions,
) -> BacktestReport {
    let count = |status| per_record_results.iter().filter(|result| result.status == status).count();
    let confusion =
        ConfusionMatrix::from_cells(per_record_results.iter().filter_map(|result| result.cell));

    let assessment_pairs: Vec<(f64, f64)> = per_record_results
        .iter()
        .filter_map(|result| Some((result.predicted_assessment?, result.actual_assessment?)))
        .collect();
    let bidder_pairs: Vec<(f64, f64)> = per_record_results
        .iter()
        .filter_map(|result| {
            Some((f64::from(result.predicted_bidders?), f64::from(result.actual_bidders?)))
        })
        .collect();

    let profitability = options.simulate_bidding.then(|| {
        let participated = confusion.true_positive + confusion.false_positive;
        Profitability {
            participated,
            wins: confusion.true_positive,
            win_rate: if participated == 0 {
                0.0
            } else {
                f64::from(confusion.true_positive) / f64::from(participated)
            },
            total_profit: per_record_results.iter().filter_map(|result| result.profit).sum(),
        }
    });

    let breakdown = |key: &dyn Fn(&RecordResult) -> String| -> Vec<BreakdownRow> {
        let mut groups: BTreeMap<String, Vec<ConfusionCell>> = BTreeMap::new();
        for result in &per_record_results {
            if let Some(cell) = result.cell {
                groups.entry(key(result)).or_default().push(cell);
            }
        }
        groups.into_iter().map(|(key, cells)| BreakdownRow::new(key, &cells)).collect()
    };

    BacktestReport {
        total_records,
        filtered_out,
        evaluated: count(RecordStatus::Evaluated),
        insufficient_data: count(RecordStatus::InsufficientData),
        failed: count(RecordStatus::Failed),
        precision: confusion.precision(),
        recall: confusion.recall(),
        f1: confusion.f1(),
        accuracy: AccuracyMetrics::from_pairs(&assessment_pairs, &bidder_pairs),
        total_profit_simulated: profitability.as_ref().map(|profit| profit.total_profit),
        profitability,
        by_organization: breakdown(&|result| result.organization.clone()),
        by_budget_bracket: breakdown(&|result| result.budget_bracket.label().to_owned()),
        confusion,
        per_record_results,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::{
        run_backtest, run_backtest_with_audit, would_have_won, BacktestFilters, BacktestOptions,
        BacktestRecord, ConfusionMatrix, RecordStatus,
    };
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::{
        AgencyDelivery, AgencyHistory, BidAnnouncement, BidId, BidOutcome, BidType,
        CompanyProfile, ContractType, DeliveryRecord, DeliverySimilarity,
    };
    use crate::engine::BiddingEngine;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn record(
        id: &str,
        organization: &str,
        deadline: NaiveDate,
        outcome: Option<BidOutcome>,
    ) -> BacktestRecord {
        BacktestRecord::from(BidAnnouncement {
            id: BidId(id.to_owned()),
            title: "초음파유량계 구매".to_owned(),
            organization: organization.to_owned(),
            category: Some("유량계".to_owned()),
            budget_estimate: 120_000_000,
            deadline,
            contract_type: ContractType::QualificationReview,
            bid_type: BidType::Goods,
            description: None,
            source: None,
            urgent: false,
            required_certifications: Vec::new(),
            outcome,
        })
    }

    fn outcome(winning_ratio: f64, assessment_ratio: f64, bidder_count: u32) -> Option<BidOutcome> {
        Some(BidOutcome {
            winning_ratio: Some(winning_ratio),
            assessment_ratio: Some(assessment_ratio),
            bidder_count: Some(bidder_count),
            ..BidOutcome::default()
        })
    }

    fn profile() -> CompanyProfile {
        let mut agency_history = BTreeMap::new();
        agency_history.insert(
            "한국수자원공사".to_owned(),
            AgencyDelivery { count: 4, last_delivered: date(2025, 6, 30) },
        );
        CompanyProfile {
            name: "Vendor".to_owned(),
            credit_rating: "AA".to_owned(),
            years_in_business: 12,
            delivery_records: vec![DeliveryRecord {
                title: "초음파유량계 납품".to_owned(),
                organization: None,
                amount: 300_000_000,
                completed_at: date(2024, 5, 1),
                similarity: Some(DeliverySimilarity::Identical),
                keywords: Vec::new(),
            }],
            certifications: vec!["ISO9001".to_owned(), "발명특허".to_owned()],
            tech_staff_count: 8,
            agency_history,
            penalties: Vec::new(),
        }
    }

    fn records() -> Vec<BacktestRecord> {
        vec![
            record("r1", "한국수자원공사", date(2025, 2, 3), outcome(0.868, 1.0004, 11)),
            record("r2", "한국수자원공사", date(2025, 4, 7), outcome(0.851, 0.9991, 14)),
            record("r3", "조달청", date(2025, 5, 12), outcome(0.875, 1.0012, 9)),
            record("r4", "서울시 상수도사업본부", date(2025, 6, 2), None),
            record("r5", "조달청", date(2025, 8, 18), outcome(0.846, 0.9987, 17)),
        ]
    }

    #[test]
    fn realized_ratio_accounts_for_the_base_price_miss() {
        let (won, realized) = would_have_won(0.86, 1.0, Some(1.01), 0.84245, 0.87, true);
        assert!((realized - 0.86 / 1.01).abs() < 1e-12);
        assert!(won);

        let (won, _) = would_have_won(0.86, 1.0, Some(1.03), 0.84245, 0.87, true);
        assert!(!won, "base price rose enough to push the bid under the floor");

        let (won, realized) = would_have_won(0.86, 1.0, None, 0.84245, 0.85, true);
        assert_eq!(realized, 0.86);
        assert!(!won, "someone bid lower");

        assert!(!would_have_won(0.86, 1.0, None, 0.84245, 0.87, false).0);
    }

    #[test]
    fn records_without_outcome_are_insufficient_not_losses() {
        let report = run_backtest(
            &BiddingEngine::default(),
            &records(),
            &profile(),
            &AgencyHistory::default(),
            &BacktestOptions::default(),
        );

        assert_eq!(report.total_records, 5);
        assert_eq!(report.insufficient_data, 1);
        assert_eq!(report.evaluated + report.failed, 4);
        let skipped = report
            .per_record_results
            .iter()
            .find(|result| result.bid_id.0 == "r4")
            .expect("r4 reported");
        assert_eq!(skipped.status, RecordStatus::InsufficientData);
        assert_eq!(skipped.cell, None);
        assert_eq!(report.confusion.total() as usize, report.evaluated);
    }

    #[test]
    fn report_metrics_come_from_the_per_record_cells() {
        let options = BacktestOptions { simulate_bidding: true, ..BacktestOptions::default() };
        let report = run_backtest(
            &BiddingEngine::default(),
            &records(),
            &profile(),
            &AgencyHistory::default(),
            &options,
        );

        let recomputed = ConfusionMatrix::from_cells(
            report.per_record_results.iter().filter_map(|result| result.cell),
        );
        assert_eq!(recomputed, report.confusion);
        assert_eq!(report.precision, recomputed.precision());
        assert_eq!(report.recall, recomputed.recall());
        assert_eq!(report.f1, recomputed.f1());

        let profitability = report.profitability.as_ref().expect("simulated");
        let profit: f64 = report.per_record_results.iter().filter_map(|result| result.profit).sum();
        assert_eq!(report.total_profit_simulated, Some(profit));
        assert_eq!(
            profitability.participated,
            recomputed.true_positive + recomputed.false_positive
        );
        let ids: Vec<&str> =
            report.per_record_results.iter().map(|result| result.bid_id.0.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3", "r4", "r5"]);
    }

    #[test]
    fn predictors_only_see_earlier_outcomes() {
        let report = run_backtest(
            &BiddingEngine::default(),
            &records(),
            &profile(),
            &AgencyHistory::default(),
            &BacktestOptions::default(),
        );
        let sizes: Vec<usize> =
            report.per_record_results.iter().map(|result| result.history_size).collect();
        // r4 carries no outcome, so it neither learns nor teaches.
        assert_eq!(sizes, vec![0, 1, 2, 0, 3]);
    }

    #[test]
    fn filters_drop_records_before_evaluation() {
        let options = BacktestOptions {
            filters: BacktestFilters {
                organizations: vec!["조달청".to_owned()],
                from: Some(date(2025, 3, 1)),
                ..BacktestFilters::default()
            },
            ..BacktestOptions::default()
        };
        let report = run_backtest(
            &BiddingEngine::default(),
            &records(),
            &profile(),
            &AgencyHistory::default(),
            &options,
        );
        assert_eq!(report.filtered_out, 3);
        assert_eq!(report.per_record_results.len(), 2);
        assert!(report.by_organization.iter().all(|row| row.key == "조달청"));
    }

    #[test]
    fn audited_run_tags_every_event_with_the_run_id() {
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(None, Some("bt-2025".to_owned()), "corr-1", "backtest");
        let report = run_backtest_with_audit(
            &BiddingEngine::default(),
            &records(),
            &profile(),
            &AgencyHistory::default(),
            &BacktestOptions::default(),
            &sink,
            &audit,
        );

        let events = sink.events();
        assert!(events.iter().all(|event| event.run_id.as_deref() == Some("bt-2025")));
        let last = events.last().expect("summary event");
        assert_eq!(last.event_type, "backtest.run_completed");
        assert_eq!(last.metadata.get("evaluated"), Some(&report.evaluated.to_string()));
        assert!(events.iter().any(|event| event.event_type == "engine.transition_applied"));
    }
}
