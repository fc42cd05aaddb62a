use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Nominal pipe diameter range (DN, millimetres) a product can serve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnRange {
    pub min: u32,
    pub max: u32,
}

impl DnRange {
    pub fn contains(&self, dn: u32) -> bool {
        (self.min..=self.max).contains(&dn)
    }

    pub fn overlaps(&self, min: u32, max: u32) -> bool {
        self.min <= max && min <= self.max
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Keywords that identify the product on their own.
    #[serde(default)]
    pub strong_keywords: Vec<String>,
    /// Keywords that only support a match.
    #[serde(default)]
    pub weak_keywords: Vec<String>,
    /// Keywords that rule the product out entirely.
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub pipe_size: Option<DnRange>,
    /// Best achievable accuracy in percent of reading (e.g. `0.5` for ±0.5%).
    #[serde(default)]
    pub accuracy_class: Option<f64>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Product {
    pub fn has_keywords(&self) -> bool {
        !self.strong_keywords.is_empty() || !self.weak_keywords.is_empty()
    }
}
