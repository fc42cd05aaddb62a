//! Product matcher: ranks catalog products against a bid announcement.
//!
//! Each product earns three additive sub-scores (keyword, spec and agency) whose sum is the
//! total. Products are scored on a bounded worker pool and sorted afterwards on the caller's
//! thread, so the ranking does not depend on scheduling.

pub mod agency;
pub mod specs;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{BidAnnouncement, CompanyProfile, Product, ProductId, Recommendation};
use crate::errors::EngineError;
use crate::parallel;

pub use agency::{AgencyDirectory, AgencyEntry, NameMatch};
pub use specs::{BidSpecs, ExtractionConfidence, PipeSize};

/// Recent delivery to an agency worth `points` when it falls within `within_years`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecencyBucket {
    pub within_years: u32,
    pub points: f64,
}

/// Weights, caps and thresholds of the matcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherPolicy {
    pub strong_keyword_points: f64,
    pub weak_keyword_points: f64,
    /// Multiplier applied to a keyword found in the title.
    pub title_multiplier: f64,
    /// Ceiling on what any one keyword contributes after the title multiplier.
    pub per_keyword_cap: f64,
    pub keyword_cap: f64,
    pub spec_cap: f64,
    pub spec_contained_high: f64,
    pub spec_contained_medium: f64,
    pub spec_partial: f64,
    /// Awarded when the bid names a size but the product declares no range.
    pub spec_neutral: f64,
    pub accuracy_bonus: f64,
    pub agency_cap: f64,
    pub agency_related_base: f64,
    pub agency_exact_bonus: f64,
    pub agency_alias_bonus: f64,
    pub agency_unrelated: f64,
    pub delivery_recency: Vec<RecencyBucket>,
    pub bid_threshold: f64,
    pub review_threshold: f64,
    pub low_threshold: f64,
    pub agencies: AgencyDirectory,
}

impl Default for MatcherPolicy {
    fn default() -> Self {
        Self {
            strong_keyword_points: 10.0,
            weak_keyword_points: 3.0,
            title_multiplier: 3.0,
            per_keyword_cap: 25.0,
            keyword_cap: 100.0,
            spec_cap: 25.0,
            spec_contained_high: 25.0,
            spec_contained_medium: 15.0,
            spec_partial: 10.0,
            spec_neutral: 10.0,
            accuracy_bonus: 5.0,
            agency_cap: 50.0,
            agency_related_base: 30.0,
            agency_exact_bonus: 5.0,
            agency_alias_bonus: 3.0,
            agency_unrelated: 5.0,
            delivery_recency: vec![
                RecencyBucket { within_years: 1, points: 15.0 },
                RecencyBucket { within_years: 3, points: 10.0 },
                RecencyBucket { within_years: 5, points: 5.0 },
            ],
            bid_threshold: 60.0,
            review_threshold: 30.0,
            low_threshold: 15.0,
            agencies: AgencyDirectory::default(),
        }
    }
}

impl MatcherPolicy {
    /// Highest attainable total.
    pub fn max_total(&self) -> f64 {
        self.keyword_cap + self.spec_cap + self.agency_cap
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let weights = [
            ("strong_keyword_points", self.strong_keyword_points),
            ("weak_keyword_points", self.weak_keyword_points),
            ("title_multiplier", self.title_multiplier),
            ("per_keyword_cap", self.per_keyword_cap),
            ("keyword_cap", self.keyword_cap),
            ("spec_cap", self.spec_cap),
            ("agency_cap", self.agency_cap),
            ("low_threshold", self.low_threshold),
        ];
        if let Some((name, _)) =
            weights.iter().find(|(_, value)| !(value.is_finite() && *value >= 0.0))
        {
            return Err(EngineError::configuration(format!("matcher.{name} must be >= 0")));
        }
        if self.per_keyword_cap <= 0.0 || self.per_keyword_cap > self.keyword_cap {
            return Err(EngineError::configuration(
                "matcher.per_keyword_cap must be in (0, keyword_cap]",
            ));
        }
        if !(self.low_threshold <= self.review_threshold
            && self.review_threshold <= self.bid_threshold)
        {
            return Err(EngineError::configuration(
                "matcher thresholds must satisfy low <= review <= bid",
            ));
        }
        if self.bid_threshold > self.max_total() {
            return Err(EngineError::configuration(
                "matcher.bid_threshold exceeds the attainable total",
            ));
        }
        self.agencies.validate()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    None,
    Low,
    Medium,
    High,
}

/// How the bid's extracted specs relate to the product's declared ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecFit {
    NotFound,
    NotDeclared,
    Contained,
    Overlap,
    Mismatch,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub product_id: ProductId,
    pub product_name: String,
    pub total_score: f64,
    pub keyword_score: f64,
    pub spec_score: f64,
    pub agency_score: f64,
    pub matched_keywords: Vec<String>,
    pub confidence: MatchConfidence,
    pub action: Recommendation,
    pub spec_fit: SpecFit,
    pub excluded: bool,
    pub reasons: Vec<String>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.confidence >= MatchConfidence::Medium
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchRecommendation {
    Bid,
    Review,
    Skip,
    NoMatch,
}

impl From<Recommendation> for MatchRecommendation {
    fn from(value: Recommendation) -> Self {
        match value {
            Recommendation::Bid => Self::Bid,
            Recommendation::Review => Self::Review,
            Recommendation::Skip => Self::Skip,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub bid_id: String,
    pub all_matches: Vec<MatchResult>,
    pub best_match: Option<Product>,
    pub recommendation: MatchRecommendation,
    pub specs: BidSpecs,
}

#[derive(Clone, Debug, Default)]
pub struct ProductMatcher {
    policy: MatcherPolicy,
}

/// Per-bid values shared by every product evaluation.
struct BidContext<'a> {
    bid: &'a BidAnnouncement,
    profile: Option<&'a CompanyProfile>,
    title: String,
    text: String,
    specs: BidSpecs,
}

impl ProductMatcher {
    pub fn new(policy: MatcherPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MatcherPolicy {
        &self.policy
    }

    pub fn match_bid(
        &self,
        bid: &BidAnnouncement,
        catalog: &[Product],
    ) -> Result<MatchSummary, EngineError> {
        self.match_bid_with_profile(bid, catalog, None)
    }

    /// Like [`match_bid`](Self::match_bid), adding the company's delivery history with the agency.
    pub fn match_bid_with_profile(
        &self,
        bid: &BidAnnouncement,
        catalog: &[Product],
        profile: Option<&CompanyProfile>,
    ) -> Result<MatchSummary, EngineError> {
        bid.validate()?;

        let raw_text = [bid.title.as_str(), bid.description.as_deref().unwrap_or("")].join(" ");
        let context = BidContext {
            bid,
            profile,
            title: bid.title.to_lowercase(),
            text: bid.search_text(),
            specs: specs::extract(&raw_text),
        };

        let mut all_matches =
            parallel::map_bounded(catalog, |product| self.score_product(&context, product));
        all_matches.sort_by(|left, right| {
            right
                .total_score
                .total_cmp(&left.total_score)
                .then_with(|| right.keyword_score.total_cmp(&left.keyword_score))
                .then_with(|| left.product_id.cmp(&right.product_id))
        });

        let best_match = all_matches
            .first()
            .filter(|top| top.is_match())
            .and_then(|top| catalog.iter().find(|product| product.id == top.product_id))
            .cloned();
        let recommendation = all_matches
            .first()
            .map_or(MatchRecommendation::NoMatch, |top| MatchRecommendation::from(top.action));

        debug!(
            event_name = "matcher.bid.scored",
            bid_id = %bid.id,
            products = catalog.len(),
            best_match = best_match.as_ref().map(|product| product.id.0.as_str()),
            recommendation = ?recommendation,
            "bid matched against catalog"
        );

        Ok(MatchSummary {
            bid_id: bid.id.0.clone(),
            all_matches,
            best_match,
            recommendation,
            specs: context.specs,
        })
    }

    fn score_product(&self, context: &BidContext<'_>, product: &Product) -> MatchResult {
        let mut result = MatchResult {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            total_score: 0.0,
            keyword_score: 0.0,
            spec_score: 0.0,
            agency_score: 0.0,
            matched_keywords: Vec::new(),
            confidence: MatchConfidence::None,
            action: Recommendation::Skip,
            spec_fit: SpecFit::NotFound,
            excluded: false,
            reasons: Vec::new(),
        };

        if let Some(hit) = product
            .exclude_keywords
            .iter()
            .find(|keyword| contains_keyword(&context.text, keyword))
        {
            result.excluded = true;
            result.reasons.push(format!("excluded by keyword `{hit}`"));
            return result;
        }

        let (keyword_score, matched_strong) = self.keyword_score(context, product, &mut result);
        let spec_score = self.spec_score(context, product, &mut result);
        let agency_score = self.agency_score(context, product, &mut result);

        result.keyword_score = keyword_score;
        result.spec_score = spec_score;
        result.agency_score = agency_score;
        result.total_score = keyword_score + spec_score + agency_score;
        result.confidence = self.confidence(result.total_score, matched_strong);
        result.action = self.action(result.total_score, result.confidence);
        result
    }

    /// Returns the capped keyword score and whether a strong keyword matched.
    fn keyword_score(
        &self,
        context: &BidContext<'_>,
        product: &Product,
        result: &mut MatchResult,
    ) -> (f64, bool) {
        let policy = &self.policy;
        let weighted = product
            .strong_keywords
            .iter()
            .map(|keyword| (keyword, policy.strong_keyword_points, true))
            .chain(
                product
                    .weak_keywords
                    .iter()
                    .map(|keyword| (keyword, policy.weak_keyword_points, false)),
            );

        let mut seen = std::collections::BTreeSet::new();
        let mut score = 0.0;
        let mut matched_strong = false;
        for (keyword, points, strong) in weighted {
            let needle = keyword.trim().to_lowercase();
            if needle.is_empty() || !seen.insert(needle.clone()) {
                continue;
            }
            if !context.text.contains(&needle) {
                continue;
            }

            let in_title = context.title.contains(&needle);
            let weighted = if in_title { points * policy.title_multiplier } else { points };
            score += weighted.min(policy.per_keyword_cap);
            matched_strong |= strong;
            result.matched_keywords.push(keyword.clone());
        }

        if !result.matched_keywords.is_empty() {
            result.reasons.push(format!("keywords: {}", result.matched_keywords.join(", ")));
        }
        (score.min(policy.keyword_cap), matched_strong)
    }

    fn spec_score(
        &self,
        context: &BidContext<'_>,
        product: &Product,
        result: &mut MatchResult,
    ) -> f64 {
        let policy = &self.policy;
        let mut score = match (&context.specs.pipe_size, product.pipe_size) {
            (None, _) => 0.0,
            (Some(_), None) => {
                result.spec_fit = SpecFit::NotDeclared;
                policy.spec_neutral
            }
            (Some(size), Some(range)) => {
                if range.contains(size.min) && range.contains(size.max) {
                    result.spec_fit = SpecFit::Contained;
                    result.reasons.push(format!(
                        "DN{}-{} within product range DN{}-{}",
                        size.min, size.max, range.min, range.max
                    ));
                    match size.confidence {
                        ExtractionConfidence::High => policy.spec_contained_high,
                        ExtractionConfidence::Medium => policy.spec_contained_medium,
                    }
                } else if range.overlaps(size.min, size.max) {
                    result.spec_fit = SpecFit::Overlap;
                    result.reasons.push("pipe size partially overlaps product range".to_owned());
                    policy.spec_partial
                } else {
                    result.spec_fit = SpecFit::Mismatch;
                    result.reasons.push(format!(
                        "spec_mismatch: DN{}-{} outside product range DN{}-{}",
                        size.min, size.max, range.min, range.max
                    ));
                    0.0
                }
            }
        };

        let accuracy = (context.specs.accuracy_pct, product.accuracy_class);
        if let (Some(required), Some(class)) = accuracy {
            if class <= required {
                score += policy.accuracy_bonus;
                result.reasons.push(format!("accuracy ±{class}% meets ±{required}%"));
            }
        }

        score.min(policy.spec_cap)
    }

    fn agency_score(
        &self,
        context: &BidContext<'_>,
        product: &Product,
        result: &mut MatchResult,
    ) -> f64 {
        let policy = &self.policy;
        let organization = context.bid.organization.as_str();

        let directory_score = match policy.agencies.resolve(organization) {
            Some((entry, how)) if entry.is_related(product) => {
                let bonus = match how {
                    NameMatch::Exact => policy.agency_exact_bonus,
                    NameMatch::Alias | NameMatch::Partial => policy.agency_alias_bonus,
                };
                result.reasons.push(format!("{} regularly buys {}", entry.name, product.id));
                (policy.agency_related_base * entry.weight).round() + bonus
            }
            Some(_) => policy.agency_unrelated,
            None => 0.0,
        };

        let delivery_score = context
            .profile
            .and_then(|profile| profile.agency_delivery(organization))
            .map_or(0.0, |delivery| {
                let days = (context.bid.deadline - delivery.last_delivered).num_days().max(0);
                let points = policy
                    .delivery_recency
                    .iter()
                    .filter(|bucket| days <= i64::from(bucket.within_years) * 365)
                    .map(|bucket| bucket.points)
                    .fold(0.0, f64::max);
                if points > 0.0 {
                    result.reasons.push(format!("delivered to {organization} {days} days ago"));
                }
                points
            });

        (directory_score + delivery_score).min(policy.agency_cap)
    }

    fn confidence(&self, total: f64, matched_strong: bool) -> MatchConfidence {
        let policy = &self.policy;
        if total >= policy.bid_threshold && matched_strong {
            MatchConfidence::High
        } else if total >= policy.review_threshold {
            MatchConfidence::Medium
        } else if total >= policy.low_threshold {
            MatchConfidence::Low
        } else {
            MatchConfidence::None
        }
    }

    fn action(&self, total: f64, confidence: MatchConfidence) -> Recommendation {
        match confidence {
            MatchConfidence::High => Recommendation::Bid,
            _ if total >= self.policy.review_threshold => Recommendation::Review,
            _ => Recommendation::Skip,
        }
    }
}

fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    let needle = keyword.trim().to_lowercase();
    !needle.is_empty() && haystack.contains(&needle)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::{
        MatchConfidence, MatchRecommendation, MatcherPolicy, ProductMatcher, SpecFit,
    };
    use crate::domain::{
        AgencyDelivery, BidAnnouncement, BidId, BidType, CompanyProfile, ContractType, DnRange,
        Product, ProductId, Recommendation,
    };
    use crate::errors::EngineError;

    fn bid(title: &str, organization: &str, description: Option<&str>) -> BidAnnouncement {
        BidAnnouncement {
            id: BidId("R26BK00000001".to_owned()),
            title: title.to_owned(),
            organization: organization.to_owned(),
            category: None,
            budget_estimate: 120_000_000,
            deadline: NaiveDate::from_ymd_opt(2026, 3, 20).expect("valid date"),
            contract_type: ContractType::QualificationReview,
            bid_type: BidType::Goods,
            description: description.map(str::to_owned),
            source: None,
            urgent: false,
            required_certifications: Vec::new(),
            outcome: None,
        }
    }

    fn product(id: &str, strong: &[&str], weak: &[&str]) -> Product {
        Product {
            id: ProductId(id.to_owned()),
            name: id.to_owned(),
            category: Some("flow_meter".to_owned()),
            strong_keywords: strong.iter().map(|k| (*k).to_owned()).collect(),
            weak_keywords: weak.iter().map(|k| (*k).to_owned()).collect(),
            exclude_keywords: Vec::new(),
            pipe_size: None,
            accuracy_class: None,
            domain: None,
            description: None,
        }
    }

    fn catalog() -> Vec<Product> {
        let mut ultrasonic = product("UR-1000PLUS", &["초음파유량계", "초음파"], &["유량계"]);
        ultrasonic.pipe_size = Some(DnRange { min: 100, max: 4000 });
        ultrasonic.accuracy_class = Some(0.5);
        let mut magnetic = product("MF-1000C", &["전자유량계", "전자식"], &["유량계"]);
        magnetic.pipe_size = Some(DnRange { min: 15, max: 300 });
        let mut heat = product("EnerRay", &["열량계"], &["난방"]);
        heat.exclude_keywords = vec!["수도".to_owned()];
        vec![magnetic, heat, ultrasonic]
    }

    #[test]
    fn ultrasonic_flowmeter_purchase_ranks_the_ultrasonic_product_first() {
        let matcher = ProductMatcher::default();
        let summary = matcher
            .match_bid(&bid("초음파유량계 구매", "Acme Utility", None), &catalog())
            .expect("match");

        let top = &summary.all_matches[0];
        assert_eq!(top.product_id.0, "UR-1000PLUS");
        assert!(top.keyword_score > 0.0);
        assert!(matches!(top.action, Recommendation::Bid | Recommendation::Review));
        assert!(matches!(
            summary.recommendation,
            MatchRecommendation::Bid | MatchRecommendation::Review
        ));
        assert_eq!(summary.best_match.map(|product| product.id.0), Some("UR-1000PLUS".to_owned()));
    }

    #[test]
    fn empty_catalog_yields_no_match_sentinel() {
        let summary = ProductMatcher::default()
            .match_bid(&bid("초음파유량계 구매", "조달청", None), &[])
            .expect("empty catalog is not an error");
        assert!(summary.all_matches.is_empty());
        assert!(summary.best_match.is_none());
        assert_eq!(summary.recommendation, MatchRecommendation::NoMatch);
    }

    #[test]
    fn blank_title_fails_fast() {
        let error = ProductMatcher::default()
            .match_bid(&bid(" ", "조달청", None), &catalog())
            .expect_err("blank title");
        assert!(matches!(error, EngineError::InvalidInput(_)));
    }

    #[test]
    fn totals_are_the_exact_sum_of_components() {
        let summary = ProductMatcher::default()
            .match_bid(
                &bid(
                    "초음파유량계 구매 설치",
                    "한국수자원공사",
                    Some("DN300 유량계, 정확도 ±1.0%"),
                ),
                &catalog(),
            )
            .expect("match");

        for result in &summary.all_matches {
            assert_eq!(
                result.total_score,
                result.keyword_score + result.spec_score + result.agency_score
            );
            assert!(result.total_score <= MatcherPolicy::default().max_total());
        }
    }

    #[test]
    fn related_agency_and_contained_spec_reach_bid() {
        let summary = ProductMatcher::default()
            .match_bid(
                &bid("초음파유량계 구매 설치", "한국수자원공사", Some("DN300, 정확도 ±1.0%")),
                &catalog(),
            )
            .expect("match");
        let top = &summary.all_matches[0];

        assert_eq!(top.product_id.0, "UR-1000PLUS");
        assert_eq!(top.spec_fit, SpecFit::Contained);
        assert_eq!(top.spec_score, 25.0);
        // round(30 * 1.5) + exact-name bonus
        assert_eq!(top.agency_score, 50.0);
        assert_eq!(top.confidence, MatchConfidence::High);
        assert_eq!(summary.recommendation, MatchRecommendation::Bid);
    }

    #[test]
    fn out_of_range_pipe_size_is_flagged_without_penalty() {
        let summary = ProductMatcher::default()
            .match_bid(&bid("전자유량계 구매", "Acme Utility", Some("DN 1000 관로")), &catalog())
            .expect("match");
        let magnetic = summary
            .all_matches
            .iter()
            .find(|result| result.product_id.0 == "MF-1000C")
            .expect("scored");

        assert_eq!(magnetic.spec_fit, SpecFit::Mismatch);
        assert_eq!(magnetic.spec_score, 0.0);
        assert!(magnetic.reasons.iter().any(|reason| reason.starts_with("spec_mismatch")));
    }

    #[test]
    fn exclude_keywords_zero_the_product() {
        let summary = ProductMatcher::default()
            .match_bid(&bid("열량계 구매", "서울시 상수도사업본부", None), &catalog())
            .expect("match");
        let heat = summary
            .all_matches
            .iter()
            .find(|result| result.product_id.0 == "EnerRay")
            .expect("scored");

        assert!(heat.excluded);
        assert_eq!(heat.total_score, 0.0);
        assert_eq!(heat.confidence, MatchConfidence::None);
        assert_eq!(heat.action, Recommendation::Skip);
    }

    #[test]
    fn adding_a_matching_keyword_never_lowers_the_keyword_score() {
        let matcher = ProductMatcher::default();
        let announcement = bid("초음파 유량계 구매", "Acme Utility", Some("DN200"));
        let narrow = product("P-1", &["초음파"], &[]);
        let wide = product("P-1", &["초음파"], &["유량계"]);

        let before = matcher.match_bid(&announcement, &[narrow]).expect("match");
        let after = matcher.match_bid(&announcement, &[wide]).expect("match");
        assert!(after.all_matches[0].keyword_score >= before.all_matches[0].keyword_score);
    }

    #[test]
    fn equal_totals_prefer_higher_keyword_score() {
        let mut policy =
            MatcherPolicy { spec_neutral: 0.0, spec_partial: 5.0, ..MatcherPolicy::default() };
        policy.agencies.entries.clear();
        let matcher = ProductMatcher::new(policy);

        // 20 from description keywords + 5 partial overlap vs one capped title keyword.
        let mut spec_heavy = product("A-SPEC", &["계측", "배관"], &[]);
        spec_heavy.pipe_size = Some(DnRange { min: 200, max: 400 });
        let keyword_heavy = product("Z-KEY", &["초음파유량계"], &[]);

        let announcement = bid("초음파유량계 구매", "Acme Utility", Some("계측 배관 DN150~250"));
        let summary =
            matcher.match_bid(&announcement, &[spec_heavy, keyword_heavy]).expect("match");

        assert_eq!(summary.all_matches[0].total_score, 25.0);
        assert_eq!(summary.all_matches[1].total_score, 25.0);
        assert_eq!(summary.all_matches[0].product_id.0, "Z-KEY");
        assert_eq!(summary.all_matches[1].spec_fit, SpecFit::Overlap);
    }

    #[test]
    fn a_single_title_keyword_cannot_exceed_the_per_keyword_cap() {
        let policy = MatcherPolicy { title_multiplier: 10.0, ..MatcherPolicy::default() };
        let matcher = ProductMatcher::new(policy);
        let repeated = product("P-REP", &["유량계", "유량계", " 유량계 "], &["유량계"]);

        let summary = matcher
            .match_bid(&bid("유량계 유량계 유량계 구매", "Acme Utility", None), &[repeated])
            .expect("match");
        let result = &summary.all_matches[0];

        assert_eq!(result.keyword_score, 25.0);
        assert_eq!(result.matched_keywords.len(), 1);
    }

    #[test]
    fn per_keyword_cap_above_the_total_cap_fails_validation() {
        let policy = MatcherPolicy { per_keyword_cap: 150.0, ..MatcherPolicy::default() };
        assert!(matches!(policy.validate(), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn recent_delivery_to_the_agency_adds_points() {
        let mut history = BTreeMap::new();
        history.insert(
            "Acme Utility".to_owned(),
            AgencyDelivery {
                count: 2,
                last_delivered: NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date"),
            },
        );
        let profile = CompanyProfile {
            name: "Vendor".to_owned(),
            credit_rating: "A0".to_owned(),
            years_in_business: 12,
            delivery_records: Vec::new(),
            certifications: Vec::new(),
            tech_staff_count: 4,
            agency_history: history,
            penalties: Vec::new(),
        };

        let summary = ProductMatcher::default()
            .match_bid_with_profile(
                &bid("초음파유량계 구매", "Acme Utility", None),
                &catalog(),
                Some(&profile),
            )
            .expect("match");
        let top = &summary.all_matches[0];
        assert_eq!(top.agency_score, 15.0);
        assert_eq!(top.total_score, top.keyword_score + 15.0);
    }

    #[test]
    fn matching_is_deterministic() {
        let matcher = ProductMatcher::default();
        let announcement = bid("유량계 구매", "한국농어촌공사", Some("구경 200"));
        let first = matcher.match_bid(&announcement, &catalog()).expect("match");
        let second = matcher.match_bid(&announcement, &catalog()).expect("match");
        assert_eq!(first, second);
    }

    #[test]
    fn inverted_thresholds_fail_validation() {
        let policy = MatcherPolicy { review_threshold: 80.0, ..MatcherPolicy::default() };
        assert!(matches!(policy.validate(), Err(EngineError::Configuration(_))));
        assert!(MatcherPolicy::default().validate().is_ok());
    }
}
