use serde::{Deserialize, Serialize};

/// Kind of issuing agency, detected from its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgencyType {
    Central,
    Local,
    PublicCorp,
    Education,
    Military,
}

impl AgencyType {
    pub fn detect(organization: &str) -> Self {
        let lower = organization.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

        if has(&["조달청", "관세청", "국세청"]) {
            Self::Central
        } else if has(&["교육", "학교", "대학"]) {
            Self::Education
        } else if has(&["국방", "방위", "육군", "해군", "공군", "군부대"]) {
            Self::Military
        } else if has(&["공사", "공단", "진흥원"]) {
            Self::PublicCorp
        } else {
            Self::Local
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Central => "central",
            Self::Local => "local",
            Self::PublicCorp => "public_corp",
            Self::Education => "education",
            Self::Military => "military",
        }
    }
}
