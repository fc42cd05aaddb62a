//! Minimum acceptable bid ratio (lower-limit rate) by bid type, contract type and size.

use serde::{Deserialize, Serialize};

use crate::domain::{BidAnnouncement, BidType, ContractType};
use crate::errors::EngineError;

/// Construction contracts below `below` KRW use `rate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstructionTier {
    pub below: u64,
    pub rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowerLimitPolicy {
    /// Notified amount separating small and large goods contracts.
    pub goods_threshold_amount: u64,
    pub goods_qualification_under_threshold: f64,
    pub goods_qualification_over_threshold: f64,
    pub goods_sme: f64,
    pub service_qualification: f64,
    pub service_sme: f64,
    pub negotiation: f64,
    pub lowest_price: f64,
    /// Ascending by `below`.
    pub construction_tiers: Vec<ConstructionTier>,
    pub construction_over: f64,
}

impl Default for LowerLimitPolicy {
    fn default() -> Self {
        Self {
            goods_threshold_amount: 210_000_000,
            goods_qualification_under_threshold: 0.84245,
            goods_qualification_over_threshold: 0.80495,
            goods_sme: 0.87995,
            service_qualification: 0.87745,
            service_sme: 0.87995,
            negotiation: 0.80,
            lowest_price: 0.80,
            construction_tiers: vec![
                ConstructionTier { below: 1_000_000_000, rate: 0.89745 },
                ConstructionTier { below: 5_000_000_000, rate: 0.88745 },
                ConstructionTier { below: 10_000_000_000, rate: 0.87495 },
            ],
            construction_over: 0.81995,
        }
    }
}

impl LowerLimitPolicy {
    pub fn rate_for(&self, bid: &BidAnnouncement) -> f64 {
        self.rate(bid.bid_type, bid.contract_type, bid.budget_estimate)
    }

    pub fn rate(
        &self,
        bid_type: BidType,
        contract_type: ContractType,
        budget_estimate: u64,
    ) -> f64 {
        match bid_type {
            BidType::Construction => self
                .construction_tiers
                .iter()
                .find(|tier| budget_estimate < tier.below)
                .map_or(self.construction_over, |tier| tier.rate),
            BidType::Goods => match contract_type {
                ContractType::QualificationReview
                    if budget_estimate < self.goods_threshold_amount =>
                {
                    self.goods_qualification_under_threshold
                }
                ContractType::QualificationReview => self.goods_qualification_over_threshold,
                ContractType::SmeCompetition => self.goods_sme,
                ContractType::Negotiation => self.negotiation,
                ContractType::LowestPrice => self.lowest_price,
            },
            BidType::Service => match contract_type {
                ContractType::QualificationReview => self.service_qualification,
                ContractType::SmeCompetition => self.service_sme,
                ContractType::Negotiation => self.negotiation,
                ContractType::LowestPrice => self.lowest_price,
            },
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let rates = [
            self.goods_qualification_under_threshold,
            self.goods_qualification_over_threshold,
            self.goods_sme,
            self.service_qualification,
            self.service_sme,
            self.negotiation,
            self.lowest_price,
            self.construction_over,
        ];
        let tier_rates = self.construction_tiers.iter().map(|tier| tier.rate);
        if rates.into_iter().chain(tier_rates).any(|rate| !(rate > 0.0 && rate < 1.0)) {
            return Err(EngineError::configuration("lower-limit rates must lie in (0, 1)"));
        }
        if self.construction_tiers.windows(2).any(|pair| pair[0].below >= pair[1].below) {
            return Err(EngineError::configuration(
                "construction tiers must be sorted by ascending amount",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LowerLimitPolicy;
    use crate::domain::{BidType, ContractType};

    #[test]
    fn goods_qualification_review_depends_on_notified_amount() {
        let policy = LowerLimitPolicy::default();
        let rate = |amount| policy.rate(BidType::Goods, ContractType::QualificationReview, amount);
        assert_eq!(rate(209_999_999), 0.84245);
        assert_eq!(rate(210_000_000), 0.80495);
    }

    #[test]
    fn service_and_negotiation_rates() {
        let policy = LowerLimitPolicy::default();
        assert_eq!(policy.rate(BidType::Service, ContractType::QualificationReview, 0), 0.87745);
        assert_eq!(policy.rate(BidType::Service, ContractType::SmeCompetition, 0), 0.87995);
        assert_eq!(policy.rate(BidType::Goods, ContractType::Negotiation, 5), 0.80);
    }

    #[test]
    fn construction_uses_amount_tiers() {
        let policy = LowerLimitPolicy::default();
        let rate = |amount| policy.rate(BidType::Construction, ContractType::LowestPrice, amount);
        assert_eq!(rate(900_000_000), 0.89745);
        assert_eq!(rate(1_000_000_000), 0.88745);
        assert_eq!(rate(7_000_000_000), 0.87495);
        assert_eq!(rate(20_000_000_000), 0.81995);
    }

    #[test]
    fn unsorted_tiers_are_rejected() {
        let mut policy = LowerLimitPolicy::default();
        policy.construction_tiers.reverse();
        assert!(policy.validate().is_err());
        assert!(LowerLimitPolicy::default().validate().is_ok());
    }
}
