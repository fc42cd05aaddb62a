use serde::{Deserialize, Serialize};

/// Certificate types recognised by the technical-capability and bonus tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationKind {
    Iso9001,
    Iso14001,
    Iso45001,
    Iso27001,
    PatentInvention,
    PatentUtility,
    PatentDesign,
    Kc,
    Ce,
    Ul,
    Ccc,
    Netp,
    Nep,
    InnoBiz,
    MainBiz,
    Venture,
    SocialEnterprise,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TechGroup {
    Iso,
    Patent,
    Product,
}

impl CertificationKind {
    /// Classifies a free-form certificate name such as `ISO 9001`, `발명특허` or `이노비즈`.
    pub fn detect(name: &str) -> Self {
        let lower: String = name
            .to_lowercase()
            .chars()
            .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
            .collect();
        let has = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

        if has(&["iso9001"]) {
            return Self::Iso9001;
        }
        if has(&["iso14001"]) {
            return Self::Iso14001;
        }
        if has(&["iso45001"]) {
            return Self::Iso45001;
        }
        if has(&["iso27001"]) {
            return Self::Iso27001;
        }
        if has(&["실용신안", "patentutility", "utilitypatent"]) {
            return Self::PatentUtility;
        }
        if has(&["디자인특허", "patentdesign", "designpatent"]) {
            return Self::PatentDesign;
        }
        if has(&["특허", "patent"]) {
            return Self::PatentInvention;
        }
        if has(&["이노비즈", "innobiz"]) {
            return Self::InnoBiz;
        }
        if has(&["메인비즈", "mainbiz"]) {
            return Self::MainBiz;
        }
        if has(&["벤처", "venture"]) {
            return Self::Venture;
        }
        if has(&["사회적기업", "socialenterprise"]) {
            return Self::SocialEnterprise;
        }
        if has(&["신기술", "netp"]) || lower == "net" {
            return Self::Netp;
        }
        if has(&["신제품", "nep"]) {
            return Self::Nep;
        }

        let core = lower.trim_end_matches("인증").trim_end_matches("마크").trim_end_matches("mark");
        match core {
            "kc" | "케이씨" => Self::Kc,
            "ce" => Self::Ce,
            "ul" => Self::Ul,
            "ccc" => Self::Ccc,
            _ => Self::Other,
        }
    }

    pub fn tech_group(self) -> Option<TechGroup> {
        match self {
            Self::Iso9001 | Self::Iso14001 | Self::Iso45001 | Self::Iso27001 => {
                Some(TechGroup::Iso)
            }
            Self::PatentInvention | Self::PatentUtility | Self::PatentDesign => {
                Some(TechGroup::Patent)
            }
            Self::Kc
            | Self::Ce
            | Self::Ul
            | Self::Ccc
            | Self::Netp
            | Self::Nep
            | Self::InnoBiz
            | Self::MainBiz => Some(TechGroup::Product),
            Self::Venture | Self::SocialEnterprise | Self::Other => None,
        }
    }

    /// Points toward the technical-capability score, before group caps.
    pub fn tech_points(self) -> f64 {
        match self {
            Self::Iso9001 => 1.0,
            Self::Iso14001 | Self::Iso27001 => 0.3,
            Self::Iso45001 => 0.2,
            Self::PatentInvention => 0.8,
            Self::PatentUtility => 0.4,
            Self::PatentDesign => 0.3,
            Self::Kc | Self::Ce | Self::Ul => 0.3,
            Self::Ccc => 0.2,
            Self::Netp | Self::Nep => 0.8,
            Self::InnoBiz => 0.5,
            Self::MainBiz => 0.4,
            Self::Venture | Self::SocialEnterprise | Self::Other => 0.0,
        }
    }

    /// Business-certificate bonus added to the reliability adjustment.
    pub fn bonus_points(self) -> f64 {
        match self {
            Self::InnoBiz => 0.5,
            Self::MainBiz | Self::SocialEnterprise => 0.3,
            Self::Venture => 0.2,
            _ => 0.0,
        }
    }
}
