use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::text;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverySimilarity {
    Identical,
    Similar,
    Related,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub title: String,
    #[serde(default)]
    pub organization: Option<String>,
    /// Contract amount in KRW.
    pub amount: u64,
    pub completed_at: NaiveDate,
    /// Pre-classified similarity; classified from keywords when absent.
    #[serde(default)]
    pub similarity: Option<DeliverySimilarity>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyDelivery {
    pub count: u32,
    pub last_delivered: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    pub imposed_at: NaiveDate,
    pub points: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(default)]
    pub name: String,
    /// Rating string resolved through the configured credit table (e.g. `AA-`, `BBB0`).
    pub credit_rating: String,
    #[serde(default)]
    pub years_in_business: u32,
    #[serde(default)]
    pub delivery_records: Vec<DeliveryRecord>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub tech_staff_count: u32,
    /// Prior deliveries keyed by issuing agency name.
    #[serde(default)]
    pub agency_history: BTreeMap<String, AgencyDelivery>,
    #[serde(default)]
    pub penalties: Vec<Penalty>,
}

impl CompanyProfile {
    /// Delivery history for the agency, matching exact names first and then containment.
    pub fn agency_delivery(&self, organization: &str) -> Option<&AgencyDelivery> {
        let wanted = text::normalize(organization);
        if wanted.is_empty() {
            return None;
        }

        self.agency_history
            .iter()
            .find(|(name, _)| text::normalize(name) == wanted)
            .or_else(|| {
                self.agency_history.iter().find(|(name, _)| text::names_overlap(name, organization))
            })
            .map(|(_, delivery)| delivery)
    }

    pub fn has_certification(&self, certification: &str) -> bool {
        let wanted = text::normalize(certification);
        self.certifications.iter().any(|held| text::normalize(held) == wanted)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::{AgencyDelivery, CompanyProfile};

    fn profile() -> CompanyProfile {
        let mut agency_history = BTreeMap::new();
        agency_history.insert(
            "한국수자원공사".to_owned(),
            AgencyDelivery {
                count: 4,
                last_delivered: NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
            },
        );
        CompanyProfile {
            name: "씨엠엔텍".to_owned(),
            credit_rating: "AA-".to_owned(),
            years_in_business: 18,
            delivery_records: Vec::new(),
            certifications: vec!["ISO9001".to_owned(), "inno_biz".to_owned()],
            tech_staff_count: 6,
            agency_history,
            penalties: Vec::new(),
        }
    }

    #[test]
    fn agency_lookup_accepts_branch_office_names() {
        let profile = profile();
        assert!(profile.agency_delivery("한국수자원공사").is_some());
        assert!(profile.agency_delivery("한국수자원공사 금강유역본부").is_some());
        assert!(profile.agency_delivery("서울특별시").is_none());
        assert!(profile.agency_delivery("").is_none());
    }

    #[test]
    fn certification_lookup_ignores_case_and_spacing() {
        let profile = profile();
        assert!(profile.has_certification("iso 9001"));
        assert!(profile.has_certification("INNO_BIZ"));
        assert!(!profile.has_certification("main_biz"));
    }
}
