//! Directory of issuing agencies and the products they historically buy.

use serde::{Deserialize, Serialize};

use crate::domain::Product;
use crate::errors::EngineError;
use crate::text;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgencyEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Product ids or names this agency regularly procures.
    #[serde(default)]
    pub related_products: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl AgencyEntry {
    fn new(name: &str, aliases: &[&str], related_products: &[&str], weight: f64) -> Self {
        Self {
            name: name.to_owned(),
            aliases: aliases.iter().map(|alias| (*alias).to_owned()).collect(),
            related_products: related_products.iter().map(|id| (*id).to_owned()).collect(),
            weight,
        }
    }

    pub fn is_related(&self, product: &Product) -> bool {
        let id = text::normalize(&product.id.0);
        let name = text::normalize(&product.name);
        self.related_products.iter().map(|related| text::normalize(related)).any(|related| {
            !related.is_empty() && (related == id || related == name)
        })
    }
}

/// How an organization name was resolved against the directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatch {
    Exact,
    Alias,
    Partial,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgencyDirectory {
    pub entries: Vec<AgencyEntry>,
}

impl Default for AgencyDirectory {
    fn default() -> Self {
        let entries = vec![
            AgencyEntry::new(
                "한국수자원공사",
                &["K-water", "Kwater", "수자원공사", "한국수자원", "케이워터"],
                &["UR-1000PLUS", "MF-1000C", "SL-3000PLUS"],
                1.5,
            ),
            AgencyEntry::new(
                "서울시 상수도사업본부",
                &["서울특별시 상수도사업본부", "서울상수도", "서울시상수도"],
                &["UR-1000PLUS", "MF-1000C"],
                1.5,
            ),
            AgencyEntry::new("부산시 상수도사업본부", &[], &["UR-1000PLUS", "MF-1000C"], 1.3),
            AgencyEntry::new("인천시 상수도사업본부", &[], &["UR-1000PLUS", "MF-1000C"], 1.3),
            AgencyEntry::new("한국환경공단", &["환경공단", "KECO"], &["UR-1010PLUS", "SL-3000PLUS"], 1.5),
            AgencyEntry::new("환경부", &[], &["UR-1010PLUS", "SL-3000PLUS", "UR-1000PLUS"], 1.3),
            AgencyEntry::new("부산환경공단", &[], &["UR-1010PLUS"], 1.4),
            AgencyEntry::new("서울시설공단", &[], &["UR-1010PLUS", "UR-1000PLUS"], 1.2),
            AgencyEntry::new("한국농어촌공사", &["농어촌공사", "KRC"], &["SL-3000PLUS", "MF-1000C"], 1.4),
            AgencyEntry::new("농림축산식품부", &[], &["SL-3000PLUS"], 1.2),
            AgencyEntry::new("한국지역난방공사", &["지역난방공사", "KDHC", "한난"], &["EnerRay"], 1.5),
            AgencyEntry::new("한국전력공사", &["한전", "KEPCO"], &["EnerRay", "UR-1000PLUS"], 1.3),
            AgencyEntry::new("한국가스공사", &[], &["EnerRay"], 1.2),
            AgencyEntry::new("한국동서발전", &[], &["EnerRay", "UR-1000PLUS"], 1.2),
            AgencyEntry::new("한국남동발전", &[], &["EnerRay", "UR-1000PLUS"], 1.2),
            AgencyEntry::new("한국도로공사", &[], &["MF-1000C"], 1.0),
            AgencyEntry::new("한국철도공사", &["코레일", "KORAIL"], &["MF-1000C"], 1.0),
            AgencyEntry::new("지방자치단체", &["지자체", "시청"], &[], 0.8),
        ];
        Self { entries }
    }
}

impl AgencyDirectory {
    /// Resolves an organization name: exact canonical name, then exact alias, then containment.
    pub fn resolve(&self, organization: &str) -> Option<(&AgencyEntry, NameMatch)> {
        let wanted = text::normalize(organization);
        if wanted.is_empty() {
            return None;
        }

        let exact = self.entries.iter().find(|entry| text::normalize(&entry.name) == wanted);
        if let Some(entry) = exact {
            return Some((entry, NameMatch::Exact));
        }

        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.aliases.iter().any(|alias| text::normalize(alias) == wanted))
        {
            return Some((entry, NameMatch::Alias));
        }

        self.entries
            .iter()
            .find(|entry| {
                text::names_overlap(&entry.name, organization)
                    || entry.aliases.iter().any(|alias| {
                        let alias = text::normalize(alias);
                        !alias.is_empty() && wanted.contains(&alias)
                    })
            })
            .map(|entry| (entry, NameMatch::Partial))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for entry in &self.entries {
            if entry.name.trim().is_empty() {
                return Err(EngineError::configuration("agency directory entry has a blank name"));
            }
            if !(entry.weight.is_finite() && entry.weight > 0.0) {
                return Err(EngineError::configuration(format!(
                    "agency `{}` must have a positive weight",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}
