//! Pattern rules that pull structured specs (pipe size, accuracy) out of announcement text.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Standard nominal diameters accepted even when they are not a multiple of 50.
const STANDARD_DN: &[u32] = &[
    15, 20, 25, 32, 40, 50, 65, 80, 100, 125, 150, 200, 250, 300, 350, 400, 450, 500, 600, 700, 800,
    900, 1000, 1100, 1200, 1350, 1400, 1500, 1600, 1800, 2000, 2200, 2400, 2600, 2800, 3000, 3200,
    3400, 3600, 3800, 4000,
];
const MIN_DN: u32 = 15;
const MAX_DN: u32 = 4000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionConfidence {
    Medium,
    High,
}

static SINGLE_DN_PATTERNS: Lazy<Vec<(Regex, ExtractionConfidence)>> = Lazy::new(|| {
    use ExtractionConfidence::{High, Medium};
    [
        (r"(?i)dn\s*-?\s*([0-9]{2,4})", High),
        (r"(?i)호칭(?:구)?경\s*[:=]?\s*([0-9]{2,4})", High),
        (r"(?:구경|관경)\s*[:=]?\s*([0-9]{2,4})", High),
        (r"([0-9]{2,4})\s*A(?:\s|,|$)", Medium),
        (r"[ØΦ∅øφ]\s*([0-9]{2,4})", Medium),
        (r"(?:직경|내경|외경|관로)\s*[:=]?\s*([0-9]{2,4})\s*(?:mm|㎜)", Medium),
    ]
    .into_iter()
    .map(|(pattern, confidence)| (Regex::new(pattern).expect("valid DN pattern"), confidence))
    .collect()
});

static DN_RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:dn)?\s*([0-9]{2,4})\s*[~\-—–]\s*(?:dn)?\s*([0-9]{2,4})")
        .expect("valid DN range pattern")
});

static ACCURACY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:정확도|accuracy)\s*[:=]?\s*[±+\-]?\s*(\d+(?:\.\d+)?)\s*%")
        .expect("valid accuracy pattern")
});

/// Pipe diameters found in the text, with the bounds used for containment checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeSize {
    pub values: Vec<u32>,
    pub min: u32,
    pub max: u32,
    pub is_range: bool,
    pub confidence: ExtractionConfidence,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BidSpecs {
    pub pipe_size: Option<PipeSize>,
    /// Required accuracy in percent of reading.
    pub accuracy_pct: Option<f64>,
}

impl BidSpecs {
    pub fn is_empty(&self) -> bool {
        self.pipe_size.is_none() && self.accuracy_pct.is_none()
    }
}

pub fn is_valid_dn(value: u32) -> bool {
    (MIN_DN..=MAX_DN).contains(&value) && (STANDARD_DN.contains(&value) || value % 50 == 0)
}

pub fn extract(text: &str) -> BidSpecs {
    BidSpecs { pipe_size: extract_pipe_size(text), accuracy_pct: extract_accuracy(text) }
}

fn parse_dn(raw: Option<regex::Match<'_>>) -> Option<u32> {
    raw?.as_str().parse::<u32>().ok().filter(|value| is_valid_dn(*value))
}

pub fn extract_pipe_size(text: &str) -> Option<PipeSize> {
    let mut values = BTreeSet::new();
    let mut confidence: Option<ExtractionConfidence> = None;
    let mut explicit_range = None;

    for captures in DN_RANGE_PATTERN.captures_iter(text) {
        let (Some(low), Some(high)) = (parse_dn(captures.get(1)), parse_dn(captures.get(2))) else {
            continue;
        };
        if low >= high {
            continue;
        }
        explicit_range.get_or_insert((low, high));
        values.insert(low);
        values.insert(high);
        confidence = Some(ExtractionConfidence::High);
    }

    for (pattern, level) in SINGLE_DN_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            if let Some(value) = parse_dn(captures.get(1)) {
                values.insert(value);
                confidence = confidence.max(Some(*level));
            }
        }
    }

    let confidence = confidence?;
    let values: Vec<u32> = values.into_iter().collect();
    let (min, max) = match explicit_range {
        Some(bounds) => bounds,
        None => (*values.first()?, *values.last()?),
    };

    let is_range = explicit_range.is_some() || values.len() > 1;
    Some(PipeSize { values, min, max, is_range, confidence })
}

pub fn extract_accuracy(text: &str) -> Option<f64> {
    let captures = ACCURACY_PATTERN.captures(text)?;
    captures.get(1)?.as_str().parse::<f64>().ok().filter(|value| *value > 0.0)
}

#[cfg(test)]
mod tests {
    use super::{
        extract, extract_accuracy, extract_pipe_size, is_valid_dn, ExtractionConfidence,
        ACCURACY_PATTERN, DN_RANGE_PATTERN, SINGLE_DN_PATTERNS,
    };

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(SINGLE_DN_PATTERNS.len(), 6);
        assert!(DN_RANGE_PATTERN.is_match("DN100~DN400"));
        assert!(ACCURACY_PATTERN.is_match("정확도 ±0.5%"));
    }

    #[test]
    fn dn_notation_is_high_confidence() {
        let size = extract_pipe_size("초음파유량계 DN 300 설치").expect("pipe size");
        assert_eq!(size.values, vec![300]);
        assert_eq!((size.min, size.max), (300, 300));
        assert!(!size.is_range);
        assert_eq!(size.confidence, ExtractionConfidence::High);
    }

    #[test]
    fn a_suffix_and_diameter_sign_are_medium_confidence() {
        let size = extract_pipe_size("전자유량계 200A, 부속 포함").expect("pipe size");
        assert_eq!(size.values, vec![200]);
        assert_eq!(size.confidence, ExtractionConfidence::Medium);

        let size = extract_pipe_size("관로 직경 150mm 구간").expect("pipe size");
        assert_eq!(size.values, vec![150]);
    }

    #[test]
    fn explicit_ranges_define_bounds() {
        let size = extract_pipe_size("DN100~DN400 유량계 일괄").expect("pipe size");
        assert!(size.is_range);
        assert_eq!((size.min, size.max), (100, 400));
        assert_eq!(size.confidence, ExtractionConfidence::High);
    }

    #[test]
    fn non_standard_sizes_are_rejected() {
        assert!(is_valid_dn(1350));
        assert!(is_valid_dn(2100));
        assert!(!is_valid_dn(333));
        assert!(!is_valid_dn(10));
        assert!(!is_valid_dn(5000));
        assert!(extract_pipe_size("DN 333 특수관").is_none());
    }

    #[test]
    fn text_without_specs_extracts_nothing() {
        let specs = extract("초음파유량계 구매");
        assert!(specs.is_empty());
    }

    #[test]
    fn accuracy_requirement_is_parsed() {
        assert_eq!(extract_accuracy("정확도 ±0.5% 이내"), Some(0.5));
        assert_eq!(extract_accuracy("Accuracy: 1.0 %"), Some(1.0));
        assert_eq!(extract_accuracy("정확도 기준 별도"), None);
    }
}
