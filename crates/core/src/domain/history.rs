use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::bid::{BidAnnouncement, BidCategory, BudgetBracket};

/// One awarded bid as seen by the predictors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalObservation {
    pub organization: String,
    #[serde(default)]
    pub category: Option<String>,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub budget_estimate: u64,
    #[serde(default)]
    pub assessment_ratio: Option<f64>,
    #[serde(default)]
    pub bidder_count: Option<u32>,
    #[serde(default)]
    pub winning_ratio: Option<f64>,
}

impl HistoricalObservation {
    pub fn product_category(&self) -> BidCategory {
        self.category.as_deref().map(BidCategory::normalize).unwrap_or(BidCategory::Other)
    }

    /// `None` when the record carries no budget.
    pub fn budget_bracket(&self) -> Option<BudgetBracket> {
        (self.budget_estimate > 0).then(|| BudgetBracket::from_amount(self.budget_estimate))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgencyHistory {
    #[serde(default)]
    pub observations: Vec<HistoricalObservation>,
}

impl AgencyHistory {
    pub fn new(observations: Vec<HistoricalObservation>) -> Self {
        Self { observations }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Observations from announcements that already carry an outcome.
    pub fn from_announcements<'a>(bids: impl IntoIterator<Item = &'a BidAnnouncement>) -> Self {
        let observations = bids
            .into_iter()
            .filter_map(|bid| {
                let outcome = bid.outcome.as_ref()?;
                Some(HistoricalObservation {
                    organization: bid.organization.clone(),
                    category: Some(
                        bid.category.clone().unwrap_or_else(|| bid.title.clone()),
                    ),
                    deadline: bid.deadline,
                    budget_estimate: bid.budget_estimate,
                    assessment_ratio: outcome.assessment_ratio,
                    bidder_count: outcome.bidder_count,
                    winning_ratio: outcome.resolved_winning_ratio(bid.budget_estimate),
                })
            })
            .collect();
        Self { observations }
    }

    /// History restricted to observations strictly before `date`.
    pub fn before(&self, date: NaiveDate) -> Self {
        Self {
            observations: self
                .observations
                .iter()
                .filter(|observation| observation.deadline < date)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{AgencyHistory, HistoricalObservation};
    use crate::domain::bid::{
        BidAnnouncement, BidCategory, BidId, BidOutcome, BidType, ContractType,
    };

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
    }

    #[test]
    fn before_excludes_same_day_and_later_observations() {
        let observation = |deadline| HistoricalObservation {
            organization: "조달청".to_owned(),
            category: Some("유량계".to_owned()),
            deadline,
            budget_estimate: 100_000_000,
            assessment_ratio: Some(1.001),
            bidder_count: Some(9),
            winning_ratio: Some(0.87),
        };
        let history =
            AgencyHistory::new(vec![observation(date(1, 5)), observation(date(3, 1))]);

        assert_eq!(history.before(date(3, 1)).len(), 1);
        assert_eq!(history.before(date(1, 5)).len(), 0);
        assert_eq!(history.observations[0].product_category(), BidCategory::FlowMeter);
    }

    #[test]
    fn announcements_without_outcome_are_skipped() {
        let bid = |id: &str, outcome| BidAnnouncement {
            id: BidId(id.to_owned()),
            title: "전자유량계 구매".to_owned(),
            organization: "서울시 상수도사업본부".to_owned(),
            category: None,
            budget_estimate: 80_000_000,
            deadline: date(4, 2),
            contract_type: ContractType::QualificationReview,
            bid_type: BidType::Goods,
            description: None,
            source: None,
            urgent: false,
            required_certifications: Vec::new(),
            outcome,
        };
        let bids = [
            bid("a", None),
            bid(
                "b",
                Some(BidOutcome {
                    winning_ratio: Some(0.868),
                    assessment_ratio: Some(0.9991),
                    bidder_count: Some(14),
                    ..BidOutcome::default()
                }),
            ),
        ];

        let history = AgencyHistory::from_announcements(&bids);
        assert_eq!(history.len(), 1);
        assert_eq!(history.observations[0].category.as_deref(), Some("전자유량계 구매"));
        assert_eq!(history.observations[0].bidder_count, Some(14));
    }
}
