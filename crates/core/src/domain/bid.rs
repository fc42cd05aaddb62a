use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BidId(pub String);

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    QualificationReview,
    Negotiation,
    SmeCompetition,
    LowestPrice,
}

impl ContractType {
    /// Contract types where a failed eligibility review disqualifies the bid outright.
    pub fn requires_qualification(self) -> bool {
        matches!(self, Self::QualificationReview | Self::SmeCompetition)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::QualificationReview => "qualification_review",
            Self::Negotiation => "negotiation",
            Self::SmeCompetition => "sme_competition",
            Self::LowestPrice => "lowest_price",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidType {
    Goods,
    Service,
    Construction,
}

/// Budget-size brackets shared by the assessment and competition priors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetBracket {
    Under50m,
    From50mTo100m,
    From100mTo500m,
    From500mTo1b,
    From1bTo5b,
    Over5b,
}

impl BudgetBracket {
    pub fn from_amount(amount: u64) -> Self {
        match amount {
            0..=49_999_999 => Self::Under50m,
            50_000_000..=99_999_999 => Self::From50mTo100m,
            100_000_000..=499_999_999 => Self::From100mTo500m,
            500_000_000..=999_999_999 => Self::From500mTo1b,
            1_000_000_000..=4_999_999_999 => Self::From1bTo5b,
            _ => Self::Over5b,
        }
    }

    /// Position from the smallest bracket, for per-bracket factor tables.
    pub fn index(self) -> usize {
        match self {
            Self::Under50m => 0,
            Self::From50mTo100m => 1,
            Self::From100mTo500m => 2,
            Self::From500mTo1b => 3,
            Self::From1bTo5b => 4,
            Self::Over5b => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Under50m => "under_50m",
            Self::From50mTo100m => "50m_100m",
            Self::From100mTo500m => "100m_500m",
            Self::From500mTo1b => "500m_1b",
            Self::From1bTo5b => "1b_5b",
            Self::Over5b => "over_5b",
        }
    }
}

/// Product families used to look up competition priors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidCategory {
    FlowMeter,
    HeatMeter,
    WaterQuality,
    PressureGauge,
    LevelSensor,
    Valve,
    Pump,
    PipeFitting,
    Electrical,
    Construction,
    ItSoftware,
    GeneralGoods,
    Other,
}

impl BidCategory {
    /// Maps a free-form category tag or title onto a product family.
    pub fn normalize(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

        if has(&["유량계", "flow meter", "flowmeter", "flow_meter"]) {
            Self::FlowMeter
        } else if has(&["열량계", "heat meter", "heat_meter", "btu"]) {
            Self::HeatMeter
        } else if has(&["수질", "water quality", "water_quality"]) {
            Self::WaterQuality
        } else if has(&["압력", "pressure"]) {
            Self::PressureGauge
        } else if has(&["레벨", "수위", "level"]) {
            Self::LevelSensor
        } else if has(&["밸브", "valve"]) {
            Self::Valve
        } else if has(&["펌프", "pump"]) {
            Self::Pump
        } else if has(&["배관", "pipe", "fitting"]) {
            Self::PipeFitting
        } else if has(&["전기", "전력", "electrical"]) {
            Self::Electrical
        } else if has(&["건설", "공사", "construction"]) {
            Self::Construction
        } else if has(&["소프트웨어", "software", "시스템", "system"])
            || lower.split(|c: char| !c.is_alphanumeric()).any(|word| word == "it")
        {
            Self::ItSoftware
        } else if has(&["물품", "general", "goods"]) {
            Self::GeneralGoods
        } else {
            Self::Other
        }
    }
}

/// Actual auction result, backfilled after award for backtesting only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BidOutcome {
    #[serde(default)]
    pub winning_price: Option<u64>,
    /// Winning bid divided by the realized base price.
    #[serde(default)]
    pub winning_ratio: Option<f64>,
    /// Realized base price divided by the published budget estimate.
    #[serde(default)]
    pub assessment_ratio: Option<f64>,
    #[serde(default)]
    pub bidder_count: Option<u32>,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub vendor_won: Option<bool>,
}

impl BidOutcome {
    /// Winning ratio either as reported or derived from the winning price and realized base price.
    pub fn resolved_winning_ratio(&self, budget_estimate: u64) -> Option<f64> {
        if let Some(ratio) = self.winning_ratio.filter(|ratio| ratio.is_finite() && *ratio > 0.0) {
            return Some(ratio);
        }
        let price = self.winning_price?;
        let assessment = self.assessment_ratio.filter(|ratio| *ratio > 0.0)?;
        let base_price = budget_estimate as f64 * assessment;
        (base_price > 0.0).then(|| price as f64 / base_price)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BidAnnouncement {
    pub id: BidId,
    pub title: String,
    pub organization: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Published budget estimate in KRW.
    pub budget_estimate: u64,
    pub deadline: NaiveDate,
    pub contract_type: ContractType,
    pub bid_type: BidType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub urgent: bool,
    /// Certificates the announcement asks bidders to hold.
    #[serde(default)]
    pub required_certifications: Vec<String>,
    #[serde(default)]
    pub outcome: Option<BidOutcome>,
}

impl BidAnnouncement {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.0.trim().is_empty() {
            return Err(EngineError::invalid_input("bid id is required"));
        }
        if self.title.trim().is_empty() {
            return Err(EngineError::invalid_input(format!("bid `{}` has no title", self.id)));
        }
        Ok(())
    }

    /// Lower-cased title, description and organization joined for lexical matching.
    pub fn search_text(&self) -> String {
        [self.title.as_str(), self.description.as_deref().unwrap_or(""), self.organization.as_str()]
            .join(" ")
            .trim()
            .to_lowercase()
    }

    pub fn budget_bracket(&self) -> BudgetBracket {
        BudgetBracket::from_amount(self.budget_estimate)
    }

    /// Product family from the category tag, falling back to the title.
    pub fn product_category(&self) -> BidCategory {
        let tagged = self.category.as_deref().map(BidCategory::normalize);
        match tagged {
            Some(category) if category != BidCategory::Other => category,
            _ => BidCategory::normalize(&self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        BidAnnouncement, BidCategory, BidId, BidOutcome, BidType, BudgetBracket, ContractType,
    };
    use crate::errors::EngineError;

    fn announcement(title: &str) -> BidAnnouncement {
        BidAnnouncement {
            id: BidId("20260115-001".to_owned()),
            title: title.to_owned(),
            organization: "한국수자원공사".to_owned(),
            category: None,
            budget_estimate: 150_000_000,
            deadline: NaiveDate::from_ymd_opt(2026, 1, 15).expect("valid date"),
            contract_type: ContractType::QualificationReview,
            bid_type: BidType::Goods,
            description: Some("DN300 초음파 유량계 설치".to_owned()),
            source: Some("g2b".to_owned()),
            urgent: false,
            required_certifications: Vec::new(),
            outcome: None,
        }
    }

    #[test]
    fn blank_title_is_invalid_input() {
        let error = announcement("   ").validate().expect_err("blank title must fail");
        assert!(
            matches!(error, EngineError::InvalidInput(ref message) if message.contains("title"))
        );
    }

    #[test]
    fn budget_brackets_use_lower_inclusive_bounds() {
        assert_eq!(BudgetBracket::from_amount(49_999_999), BudgetBracket::Under50m);
        assert_eq!(BudgetBracket::from_amount(50_000_000), BudgetBracket::From50mTo100m);
        assert_eq!(BudgetBracket::from_amount(1_000_000_000), BudgetBracket::From1bTo5b);
        assert_eq!(BudgetBracket::from_amount(9_000_000_000), BudgetBracket::Over5b);
    }

    #[test]
    fn category_falls_back_to_title_when_tag_is_generic() {
        let mut bid = announcement("초음파유량계 구매");
        bid.category = Some("물품".to_owned());
        assert_eq!(bid.product_category(), BidCategory::GeneralGoods);

        bid.category = Some("기타".to_owned());
        assert_eq!(bid.product_category(), BidCategory::FlowMeter);
    }

    #[test]
    fn it_category_requires_a_standalone_word() {
        assert_eq!(BidCategory::normalize("IT 유지보수 용역"), BidCategory::ItSoftware);
        assert_eq!(BidCategory::normalize("digital kit"), BidCategory::Other);
    }

    #[test]
    fn winning_ratio_is_derived_from_price_when_missing() {
        let outcome = BidOutcome {
            winning_price: Some(86_000_000),
            assessment_ratio: Some(1.0),
            ..BidOutcome::default()
        };
        let ratio = outcome.resolved_winning_ratio(100_000_000).expect("derivable ratio");
        assert!((ratio - 0.86).abs() < 1e-9);

        assert_eq!(BidOutcome::default().resolved_winning_ratio(100_000_000), None);
    }

    #[test]
    fn search_text_is_lowercased_and_joined() {
        let mut bid = announcement("Ultrasonic Flowmeter");
        bid.description = None;
        assert_eq!(bid.search_text(), "ultrasonic flowmeter 한국수자원공사");
    }
}
