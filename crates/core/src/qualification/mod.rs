//! Eligibility review (적격심사) scoring.
//!
//! The score combines delivery track record, technical capability, credit rating, a price score
//! and a reliability adjustment. Every component is clamped to its maximum before summation and
//! the total is clamped to `[0, 100]`.

pub mod certification;

use std::collections::BTreeMap;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{BidAnnouncement, CompanyProfile, ContractType, DeliverySimilarity};
use crate::errors::EngineError;
use crate::lower_limit::LowerLimitPolicy;
use crate::stats::round_to;
use crate::text;

pub use certification::{CertificationKind, TechGroup};

/// Weighted delivery amount over the budget estimate at or above `min_ratio` earns `points`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStep {
    pub min_ratio: f64,
    pub points: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassThresholds {
    pub qualification_review: f64,
    pub sme_competition: f64,
    pub negotiation: f64,
    pub lowest_price: f64,
}

impl Default for PassThresholds {
    fn default() -> Self {
        Self {
            qualification_review: 85.0,
            sme_competition: 80.0,
            negotiation: 70.0,
            lowest_price: 60.0,
        }
    }
}

impl PassThresholds {
    pub fn for_contract(&self, contract_type: ContractType) -> f64 {
        match contract_type {
            ContractType::QualificationReview => self.qualification_review,
            ContractType::SmeCompetition => self.sme_competition,
            ContractType::Negotiation => self.negotiation,
            ContractType::LowestPrice => self.lowest_price,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationPolicy {
    pub delivery_max: f64,
    pub technical_max: f64,
    pub credit_max: f64,
    pub price_max: f64,
    /// Symmetric bound of the reliability adjustment.
    pub bonus_limit: f64,
    pub delivery_window_years: u32,
    pub penalty_window_years: u32,
    pub identical_overlap: f64,
    pub similar_overlap: f64,
    pub related_overlap: f64,
    pub identical_weight: f64,
    pub similar_weight: f64,
    pub related_weight: f64,
    /// Descending by `min_ratio`; smaller ratios score `ratio * delivery_linear_factor`.
    pub delivery_steps: Vec<DeliveryStep>,
    pub delivery_linear_factor: f64,
    pub iso_cap: f64,
    pub patent_cap: f64,
    pub product_certificate_cap: f64,
    pub credit_ratings: BTreeMap<String, f64>,
    /// Bid ratio at which `score` evaluates the price component.
    pub reference_ratio: f64,
    pub pass_thresholds: PassThresholds,
    pub relationship_strong: f64,
    pub relationship_moderate: f64,
    pub relationship_weak: f64,
    pub relationship_strong_min_count: u32,
    pub relationship_window_years: u32,
}

impl Default for QualificationPolicy {
    fn default() -> Self {
        let credit_ratings = [
            ("AAA", 15.0),
            ("AA+", 14.5),
            ("AA0", 14.0),
            ("AA-", 13.5),
            ("A+", 13.0),
            ("A0", 12.5),
            ("A-", 12.0),
            ("BBB+", 11.5),
            ("BBB0", 11.0),
            ("BBB-", 10.5),
            ("BB+", 10.0),
            ("BB0", 9.5),
            ("BB-", 9.0),
            ("B+", 8.0),
            ("B0", 7.0),
            ("B-", 6.0),
            ("CCC", 5.0),
            ("CC", 4.0),
            ("C", 3.0),
            ("D", 1.0),
        ]
        .into_iter()
        .map(|(grade, points)| (grade.to_owned(), points))
        .collect();

        let delivery_steps = [
            (2.0, 25.0),
            (1.5, 23.0),
            (1.2, 21.0),
            (1.0, 19.0),
            (0.8, 17.0),
            (0.6, 15.0),
            (0.4, 12.0),
            (0.2, 9.0),
            (0.1, 6.0),
        ]
        .into_iter()
        .map(|(min_ratio, points)| DeliveryStep { min_ratio, points })
        .collect();

        Self {
            delivery_max: 25.0,
            technical_max: 5.0,
            credit_max: 15.0,
            price_max: 50.0,
            bonus_limit: 5.0,
            delivery_window_years: 5,
            penalty_window_years: 2,
            identical_overlap: 0.7,
            similar_overlap: 0.4,
            related_overlap: 0.2,
            identical_weight: 1.0,
            similar_weight: 0.7,
            related_weight: 0.3,
            delivery_steps,
            delivery_linear_factor: 60.0,
            iso_cap: 1.5,
            patent_cap: 1.5,
            product_certificate_cap: 1.0,
            credit_ratings,
            reference_ratio: 0.88,
            pass_thresholds: PassThresholds::default(),
            relationship_strong: 1.5,
            relationship_moderate: 1.0,
            relationship_weak: 0.3,
            relationship_strong_min_count: 3,
            relationship_window_years: 3,
        }
    }
}

impl QualificationPolicy {
    /// Points for a credit rating. Bare grades (`AA`, `BBB`) resolve to their `0` notch.
    pub fn credit_points(&self, rating: &str) -> Result<f64, EngineError> {
        let grade = rating.trim().to_uppercase();
        self.credit_ratings
            .get(&grade)
            .or_else(|| self.credit_ratings.get(&format!("{grade}0")))
            .copied()
            .ok_or_else(|| {
                EngineError::configuration(format!(
                    "credit rating `{}` is not in the configured rating table",
                    rating.trim()
                ))
            })
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let maxima = self.delivery_max + self.technical_max + self.credit_max + self.price_max;
        if !(maxima.is_finite() && maxima > 0.0) {
            return Err(EngineError::configuration("qualification maxima must be positive"));
        }
        if self.credit_ratings.is_empty() {
            return Err(EngineError::configuration("credit rating table is empty"));
        }
        if self.credit_ratings.values().any(|points| *points < 0.0 || *points > self.credit_max) {
            return Err(EngineError::configuration(
                "credit rating points must lie within [0, credit_max]",
            ));
        }
        if self.delivery_steps.windows(2).any(|pair| pair[0].min_ratio <= pair[1].min_ratio) {
            return Err(EngineError::configuration(
                "delivery steps must be sorted by descending ratio",
            ));
        }
        if !(self.reference_ratio > 0.0 && self.reference_ratio <= 1.0) {
            return Err(EngineError::configuration(
                "qualification.reference_ratio must be in (0, 1]",
            ));
        }
        let thresholds = &self.pass_thresholds;
        let all = [
            thresholds.qualification_review,
            thresholds.sme_competition,
            thresholds.negotiation,
            thresholds.lowest_price,
        ];
        if all.iter().any(|threshold| !(0.0..=100.0).contains(threshold)) {
            return Err(EngineError::configuration("pass thresholds must lie within [0, 100]"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryBucket {
    pub count: u32,
    pub amount: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryBreakdown {
    pub identical: DeliveryBucket,
    pub similar: DeliveryBucket,
    pub related: DeliveryBucket,
    pub weighted_amount: f64,
    /// Weighted amount over the budget estimate.
    pub ratio: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TechBreakdown {
    pub iso: f64,
    pub patent: f64,
    pub product_certificates: f64,
    pub staff: f64,
    /// Share of the announcement's required certificates held; `None` when none are required.
    pub required_coverage: Option<f64>,
    pub missing_certifications: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BonusBreakdown {
    pub agency_relationship: f64,
    pub certificates: f64,
    pub penalties: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualificationBreakdown {
    pub delivery: f64,
    pub technical: f64,
    pub credit: f64,
    pub price: f64,
    pub bonus: f64,
    pub delivery_detail: DeliveryBreakdown,
    pub technical_detail: TechBreakdown,
    pub bonus_detail: BonusBreakdown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualificationResult {
    pub score: f64,
    pub passed: bool,
    pub pass_threshold: f64,
    /// Score minus the pass threshold; negative when failing.
    pub margin: f64,
    /// Bid ratio the price component was evaluated at.
    pub evaluated_ratio: f64,
    pub breakdown: QualificationBreakdown,
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct QualificationScorer {
    policy: QualificationPolicy,
    lower_limits: LowerLimitPolicy,
}

impl QualificationScorer {
    pub fn new(policy: QualificationPolicy, lower_limits: LowerLimitPolicy) -> Self {
        Self { policy, lower_limits }
    }

    pub fn policy(&self) -> &QualificationPolicy {
        &self.policy
    }

    /// Scores the profile with the price component at the reference ratio (or the floor if higher).
    pub fn score(
        &self,
        bid: &BidAnnouncement,
        profile: &CompanyProfile,
    ) -> Result<QualificationResult, EngineError> {
        let floor = self.lower_limits.rate_for(bid);
        self.score_at_ratio(bid, profile, self.policy.reference_ratio.max(floor))
    }

    pub fn score_at_ratio(
        &self,
        bid: &BidAnnouncement,
        profile: &CompanyProfile,
        bid_ratio: f64,
    ) -> Result<QualificationResult, EngineError> {
        bid.validate()?;
        if !(bid_ratio.is_finite() && bid_ratio > 0.0) {
            return Err(EngineError::invalid_input(format!(
                "bid ratio {bid_ratio} must be positive"
            )));
        }

        let policy = &self.policy;
        let credit = policy.credit_points(&profile.credit_rating)?.min(policy.credit_max);
        let (delivery, delivery_detail) = self.delivery_score(bid, profile);
        let (technical, technical_detail) = self.technical_score(bid, profile);
        let price = self.price_score(bid, bid_ratio);
        let (bonus, bonus_detail) = self.bonus_score(bid, profile);

        let score = (delivery + technical + credit + price + bonus).clamp(0.0, 100.0);
        let pass_threshold = policy.pass_thresholds.for_contract(bid.contract_type);
        let passed = score >= pass_threshold;
        let margin = round_to(score - pass_threshold, 1);

        let breakdown = QualificationBreakdown {
            delivery,
            technical,
            credit,
            price,
            bonus,
            delivery_detail,
            technical_detail,
            bonus_detail,
        };
        let recommendations =
            self.recommendations(profile, &breakdown, score, pass_threshold, bid_ratio);

        debug!(
            event_name = "qualification.scored",
            bid_id = %bid.id,
            score,
            pass_threshold,
            passed,
            "qualification scored"
        );

        Ok(QualificationResult {
            score,
            passed,
            pass_threshold,
            margin,
            evaluated_ratio: bid_ratio,
            breakdown,
            recommendations,
        })
    }

    fn delivery_score(
        &self,
        bid: &BidAnnouncement,
        profile: &CompanyProfile,
    ) -> (f64, DeliveryBreakdown) {
        let policy = &self.policy;
        let window_start = years_before(bid.deadline, policy.delivery_window_years);
        let bid_keywords = text::extract_keywords(&bid.title);

        let mut detail = DeliveryBreakdown::default();
        for record in &profile.delivery_records {
            if record.completed_at < window_start || record.completed_at > bid.deadline {
                continue;
            }
            let similarity = record.similarity.or_else(|| {
                let mut keywords = record.keywords.clone();
                keywords.extend(text::extract_keywords(&record.title));
                self.classify(text::keyword_overlap(&bid_keywords, &keywords))
            });
            let bucket = match similarity {
                Some(DeliverySimilarity::Identical) => &mut detail.identical,
                Some(DeliverySimilarity::Similar) => &mut detail.similar,
                Some(DeliverySimilarity::Related) => &mut detail.related,
                None => continue,
            };
            bucket.count += 1;
            bucket.amount = bucket.amount.saturating_add(record.amount);
        }

        detail.weighted_amount = detail.identical.amount as f64 * policy.identical_weight
            + detail.similar.amount as f64 * policy.similar_weight
            + detail.related.amount as f64 * policy.related_weight;

        let score = if bid.budget_estimate == 0 {
            if detail.weighted_amount > 0.0 {
                policy.delivery_max
            } else {
                0.0
            }
        } else {
            detail.ratio = detail.weighted_amount / bid.budget_estimate as f64;
            policy
                .delivery_steps
                .iter()
                .find(|step| detail.ratio >= step.min_ratio)
                .map_or(detail.ratio * policy.delivery_linear_factor, |step| step.points)
        };

        (score.clamp(0.0, policy.delivery_max), detail)
    }

    fn classify(&self, overlap: f64) -> Option<DeliverySimilarity> {
        let policy = &self.policy;
        if overlap >= policy.identical_overlap {
            Some(DeliverySimilarity::Identical)
        } else if overlap >= policy.similar_overlap {
            Some(DeliverySimilarity::Similar)
        } else if overlap >= policy.related_overlap && overlap > 0.0 {
            Some(DeliverySimilarity::Related)
        } else {
            None
        }
    }

    fn technical_score(
        &self,
        bid: &BidAnnouncement,
        profile: &CompanyProfile,
    ) -> (f64, TechBreakdown) {
        let policy = &self.policy;
        let mut detail = TechBreakdown::default();

        for kind in certification_kinds(profile) {
            match kind.tech_group() {
                Some(TechGroup::Iso) => detail.iso += kind.tech_points(),
                Some(TechGroup::Patent) => detail.patent += kind.tech_points(),
                Some(TechGroup::Product) => detail.product_certificates += kind.tech_points(),
                None => {}
            }
        }

        detail.iso = detail.iso.min(policy.iso_cap);
        detail.patent = detail.patent.min(policy.patent_cap);
        detail.product_certificates =
            detail.product_certificates.min(policy.product_certificate_cap);

        // Certificate points only count in proportion to the required ones actually held.
        let required: Vec<&String> = bid
            .required_certifications
            .iter()
            .filter(|name| !name.trim().is_empty())
            .collect();
        if !required.is_empty() {
            detail.missing_certifications = required
                .iter()
                .filter(|name| !profile.has_certification(name))
                .map(|name| (*name).clone())
                .collect();
            let held = required.len() - detail.missing_certifications.len();
            let coverage = held as f64 / required.len() as f64;
            detail.iso *= coverage;
            detail.patent *= coverage;
            detail.product_certificates *= coverage;
            detail.required_coverage = Some(coverage);
        }

        detail.staff = match profile.tech_staff_count {
            10.. => 1.0,
            5..=9 => 0.7,
            3..=4 => 0.5,
            1..=2 => 0.3,
            0 => 0.0,
        };

        let total = detail.iso + detail.patent + detail.product_certificates + detail.staff;
        (total.min(policy.technical_max), detail)
    }

    /// `price_max * floor / ratio`, zero below the floor.
    fn price_score(&self, bid: &BidAnnouncement, bid_ratio: f64) -> f64 {
        let floor = self.lower_limits.rate_for(bid);
        if bid_ratio < floor {
            return 0.0;
        }
        round_to(self.policy.price_max * floor / bid_ratio, 1).min(self.policy.price_max)
    }

    fn bonus_score(
        &self,
        bid: &BidAnnouncement,
        profile: &CompanyProfile,
    ) -> (f64, BonusBreakdown) {
        let policy = &self.policy;
        let mut detail = BonusBreakdown::default();

        if let Some(delivery) = profile.agency_delivery(&bid.organization) {
            let window_start = years_before(bid.deadline, policy.relationship_window_years);
            let recent = delivery.last_delivered >= window_start;
            detail.agency_relationship = if recent
                && delivery.count >= policy.relationship_strong_min_count
            {
                policy.relationship_strong
            } else if recent {
                policy.relationship_moderate
            } else {
                policy.relationship_weak
            };
        }

        detail.certificates =
            certification_kinds(profile).into_iter().map(CertificationKind::bonus_points).sum();

        let penalty_start = years_before(bid.deadline, policy.penalty_window_years);
        detail.penalties = profile
            .penalties
            .iter()
            .filter(|penalty| {
                penalty.imposed_at >= penalty_start && penalty.imposed_at <= bid.deadline
            })
            .map(|penalty| penalty.points.max(0.0))
            .sum();

        let net = detail.agency_relationship + detail.certificates - detail.penalties;
        (net.clamp(-policy.bonus_limit, policy.bonus_limit), detail)
    }

    fn recommendations(
        &self,
        profile: &CompanyProfile,
        breakdown: &QualificationBreakdown,
        score: f64,
        pass_threshold: f64,
        bid_ratio: f64,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();
        if score < pass_threshold {
            recommendations.push(format!(
                "{:.1} points short of the {pass_threshold} pass threshold",
                pass_threshold - score
            ));
        }
        if breakdown.delivery < 15.0 {
            recommendations.push(format!(
                "delivery record covers {:.0}% of the estimate; aim for 100%+ identical items",
                breakdown.delivery_detail.ratio * 100.0
            ));
        }
        for missing in &breakdown.technical_detail.missing_certifications {
            recommendations.push(format!("required certificate `{missing}` is missing"));
        }
        if breakdown.technical < 3.0 {
            if breakdown.technical_detail.iso < 1.0 {
                recommendations.push("ISO 9001 certification adds 1.0 point".to_owned());
            }
            if breakdown.technical_detail.patent < 0.5 {
                recommendations.push(
                    "registered patents add 0.8 (invention) or 0.4 (utility model)".to_owned(),
                );
            }
        }
        if breakdown.price < 40.0 {
            recommendations.push(format!(
                "price score {:.1} at ratio {:.3}; bidding nearer {:.3} raises it",
                breakdown.price, bid_ratio, self.policy.reference_ratio
            ));
        }
        if breakdown.credit < 12.0 {
            recommendations.push(format!(
                "credit rating {} limits the financial score",
                profile.credit_rating
            ));
        }
        recommendations
    }
}

/// Distinct certificate kinds in the order they are listed.
fn certification_kinds(profile: &CompanyProfile) -> Vec<CertificationKind> {
    let mut kinds = Vec::new();
    for kind in profile.certifications.iter().map(|name| CertificationKind::detect(name)) {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}

fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(years.saturating_mul(12))).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::{QualificationPolicy, QualificationScorer};
    use crate::domain::{
        AgencyDelivery, BidAnnouncement, BidId, BidType, CompanyProfile, ContractType,
        DeliveryRecord, DeliverySimilarity, Penalty,
    };
    use crate::errors::EngineError;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn bid(contract_type: ContractType) -> BidAnnouncement {
        BidAnnouncement {
            id: BidId("20260301-017".to_owned()),
            title: "초음파유량계 구매 설치".to_owned(),
            organization: "한국수자원공사".to_owned(),
            category: Some("유량계".to_owned()),
            budget_estimate: 100_000_000,
            deadline: date(2026, 3, 1),
            contract_type,
            bid_type: BidType::Goods,
            description: None,
            source: None,
            urgent: false,
            required_certifications: Vec::new(),
            outcome: None,
        }
    }

    fn strong_profile() -> CompanyProfile {
        let mut agency_history = BTreeMap::new();
        agency_history.insert(
            "한국수자원공사".to_owned(),
            AgencyDelivery { count: 4, last_delivered: date(2025, 6, 30) },
        );
        CompanyProfile {
            name: "Vendor".to_owned(),
            credit_rating: "AA".to_owned(),
            years_in_business: 15,
            delivery_records: vec![
                DeliveryRecord {
                    title: "초음파유량계 납품".to_owned(),
                    organization: Some("한국수자원공사".to_owned()),
                    amount: 150_000_000,
                    completed_at: date(2024, 8, 1),
                    similarity: None,
                    keywords: Vec::new(),
                },
                DeliveryRecord {
                    title: "정수장 계측기".to_owned(),
                    organization: None,
                    amount: 100_000_000,
                    completed_at: date(2023, 2, 1),
                    similarity: Some(DeliverySimilarity::Identical),
                    keywords: Vec::new(),
                },
            ],
            certifications: ["ISO9001", "iso14001", "발명특허", "KC", "이노비즈"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            tech_staff_count: 12,
            agency_history,
            penalties: Vec::new(),
        }
    }

    fn weak_profile() -> CompanyProfile {
        CompanyProfile {
            name: "Newcomer".to_owned(),
            credit_rating: "BB-".to_owned(),
            years_in_business: 1,
            delivery_records: Vec::new(),
            certifications: Vec::new(),
            tech_staff_count: 0,
            agency_history: BTreeMap::new(),
            penalties: Vec::new(),
        }
    }

    #[test]
    fn unmapped_credit_rating_is_a_configuration_error() {
        let mut profile = strong_profile();
        profile.credit_rating = "Z9".to_owned();
        let error = QualificationScorer::default()
            .score(&bid(ContractType::QualificationReview), &profile)
            .expect_err("unknown rating must not default");
        assert!(matches!(error, EngineError::Configuration(ref message) if message.contains("Z9")));
    }

    #[test]
    fn bare_grades_alias_their_zero_notch() {
        let policy = QualificationPolicy::default();
        assert_eq!(policy.credit_points("AA").ok(), Some(14.0));
        assert_eq!(policy.credit_points(" bbb ").ok(), Some(11.0));
        assert_eq!(policy.credit_points("A-").ok(), Some(12.0));
    }

    #[test]
    fn strong_profile_passes_qualification_review() {
        let result = QualificationScorer::default()
            .score(&bid(ContractType::QualificationReview), &strong_profile())
            .expect("score");
        let breakdown = &result.breakdown;

        assert_eq!(breakdown.delivery, 25.0);
        assert_eq!(breakdown.delivery_detail.identical.count, 2);
        assert!((breakdown.technical - 3.9).abs() < 1e-9);
        assert_eq!(breakdown.credit, 14.0);
        assert_eq!(breakdown.price, 47.9);
        assert!((breakdown.bonus - 2.0).abs() < 1e-9);
        assert!(result.passed);
        assert!(result.margin > 0.0);
        assert_eq!(result.evaluated_ratio, 0.88);
    }

    #[test]
    fn certificate_points_scale_with_required_coverage() {
        let scorer = QualificationScorer::default();
        let mut announcement = bid(ContractType::QualificationReview);
        announcement.required_certifications = vec!["ISO9001".to_owned(), "NEP".to_owned()];

        let result = scorer.score(&announcement, &strong_profile()).expect("score");
        let detail = &result.breakdown.technical_detail;
        assert_eq!(detail.required_coverage, Some(0.5));
        assert_eq!(detail.missing_certifications, vec!["NEP".to_owned()]);
        // Half of the 2.9 certificate points plus 1.0 for staff.
        assert!((result.breakdown.technical - 2.45).abs() < 1e-9);
        assert!(result.recommendations.iter().any(|line| line.contains("`NEP`")));

        announcement.required_certifications = vec!["iso 9001".to_owned()];
        let covered = scorer.score(&announcement, &strong_profile()).expect("score");
        assert_eq!(covered.breakdown.technical_detail.required_coverage, Some(1.0));
        assert!((covered.breakdown.technical - 3.9).abs() < 1e-9);
    }

    #[test]
    fn weak_profile_fails_with_recommendations() {
        let result = QualificationScorer::default()
            .score(&bid(ContractType::QualificationReview), &weak_profile())
            .expect("score");
        assert!(!result.passed);
        assert_eq!(result.pass_threshold, 85.0);
        assert!(result.margin < 0.0);
        assert!(result.recommendations.iter().any(|line| line.contains("points short")));
        assert!(result.recommendations.iter().any(|line| line.contains("ISO 9001")));
    }

    #[test]
    fn thresholds_depend_on_contract_type() {
        let scorer = QualificationScorer::default();
        let review = scorer.score(&bid(ContractType::QualificationReview), &weak_profile());
        let lowest = scorer.score(&bid(ContractType::LowestPrice), &weak_profile());
        let review = review.expect("score");
        let lowest = lowest.expect("score");
        assert!(review.pass_threshold > lowest.pass_threshold);
    }

    #[test]
    fn price_below_the_floor_scores_zero() {
        let scorer = QualificationScorer::default();
        let below = scorer
            .score_at_ratio(&bid(ContractType::QualificationReview), &strong_profile(), 0.83)
            .expect("score");
        let at_floor = scorer
            .score_at_ratio(&bid(ContractType::QualificationReview), &strong_profile(), 0.84245)
            .expect("score");
        assert_eq!(below.breakdown.price, 0.0);
        assert_eq!(at_floor.breakdown.price, 50.0);
    }

    #[test]
    fn recent_penalties_reduce_the_bonus_and_old_ones_do_not() {
        let scorer = QualificationScorer::default();
        let mut profile = weak_profile();
        profile.penalties = vec![
            Penalty { imposed_at: date(2025, 10, 1), points: 2.0, reason: None },
            Penalty { imposed_at: date(2021, 1, 1), points: 3.0, reason: None },
        ];
        let result =
            scorer.score(&bid(ContractType::QualificationReview), &profile).expect("score");
        assert_eq!(result.breakdown.bonus_detail.penalties, 2.0);
        assert_eq!(result.breakdown.bonus, -2.0);
    }

    #[test]
    fn scores_stay_within_bounds() {
        let mut policy = QualificationPolicy::default();
        policy.price_max = 90.0;
        let scorer = QualificationScorer::new(policy, Default::default());
        let result = scorer
            .score_at_ratio(&bid(ContractType::QualificationReview), &strong_profile(), 0.84245)
            .expect("score");
        assert!((0.0..=100.0).contains(&result.score));
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn blank_title_is_rejected_before_scoring() {
        let mut announcement = bid(ContractType::QualificationReview);
        announcement.title = String::new();
        let error = QualificationScorer::default()
            .score(&announcement, &strong_profile())
            .expect_err("blank title");
        assert!(matches!(error, EngineError::InvalidInput(_)));
    }
}
