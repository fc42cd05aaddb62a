//! Text helpers shared by the matcher and the qualification scorer.

use std::collections::BTreeSet;

/// Procurement boilerplate that carries no product meaning.
const STOPWORDS: &[&str] = &[
    "구매", "설치", "공급", "납품", "교체", "제작", "용역", "입찰", "공고", "긴급", "관련", "사업",
    "기타", "물품", "일괄", "단가", "연간", "계약", "위한", "and", "for", "the", "with",
];

/// Groups of terms treated as the same item when comparing delivery records to a bid.
const SYNONYM_GROUPS: &[&[&str]] = &[
    &["유량계", "flowmeter", "flow meter", "유량측정"],
    &["초음파", "ultrasonic"],
    &["전자식", "전자", "electromagnetic", "magnetic"],
    &["열량계", "heat meter", "btu"],
    &["수위계", "레벨계", "level"],
    &["수질", "water quality"],
    &["상수도", "정수장", "취수장", "배수지"],
    &["하수", "폐수", "오수", "하수처리"],
];

/// Lower-cases and strips whitespace so names compare regardless of spacing.
pub fn normalize(value: &str) -> String {
    value.chars().filter(|ch| !ch.is_whitespace()).flat_map(char::to_lowercase).collect()
}

/// True when one normalized name contains the other (branch offices, suffixes).
pub fn names_overlap(left: &str, right: &str) -> bool {
    let left = normalize(left);
    let right = normalize(right);
    if left.is_empty() || right.is_empty() {
        return false;
    }
    left.contains(&right) || right.contains(&left)
}

fn is_hangul(ch: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&ch)
}

/// Hangul runs of two or more syllables and ASCII words of three or more letters,
/// minus stopwords, in first-seen order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut keywords = Vec::new();
    let mut push = |token: String| {
        if !STOPWORDS.contains(&token.as_str()) && seen.insert(token.clone()) {
            keywords.push(token);
        }
    };

    let lower = text.to_lowercase();
    let mut hangul = String::new();
    let mut ascii = String::new();
    for ch in lower.chars().chain(std::iter::once(' ')) {
        if is_hangul(ch) {
            hangul.push(ch);
        } else if hangul.chars().count() >= 2 {
            push(std::mem::take(&mut hangul));
        } else {
            hangul.clear();
        }

        if ch.is_ascii_alphabetic() {
            ascii.push(ch);
        } else if ascii.len() >= 3 {
            push(std::mem::take(&mut ascii));
        } else {
            ascii.clear();
        }
    }

    keywords
}

/// Whether two keywords name the same thing, by containment or a shared synonym group.
pub fn keywords_match(left: &str, right: &str) -> bool {
    let left = normalize(left);
    let right = normalize(right);
    if left.is_empty() || right.is_empty() {
        return false;
    }
    if left.contains(&right) || right.contains(&left) {
        return true;
    }

    SYNONYM_GROUPS.iter().any(|group| {
        let hits = |word: &str| group.iter().any(|term| word.contains(&normalize(term)));
        hits(&left) && hits(&right)
    })
}

/// Share of `reference` keywords matched by at least one of `candidate`.
pub fn keyword_overlap(reference: &[String], candidate: &[String]) -> f64 {
    if reference.is_empty() {
        return 0.0;
    }
    let matched = reference
        .iter()
        .filter(|wanted| candidate.iter().any(|have| keywords_match(wanted, have)))
        .count();
    matched as f64 / reference.len() as f64
}

#[cfg(test)]
mod tests {
    use super::{extract_keywords, keyword_overlap, keywords_match, names_overlap, normalize};

    #[test]
    fn normalize_strips_spaces_and_case() {
        assert_eq!(normalize(" K-Water  본부 "), "k-water본부");
    }

    #[test]
    fn extraction_drops_stopwords_and_short_tokens() {
        let keywords = extract_keywords("초음파유량계 구매 및 설치 (DN300, UR-1000PLUS)");
        assert_eq!(keywords, vec!["초음파유량계".to_owned(), "plus".to_owned()]);
    }

    #[test]
    fn synonyms_bridge_languages() {
        assert!(keywords_match("유량계", "flowmeter"));
        assert!(keywords_match("초음파유량계", "유량계"));
        assert!(!keywords_match("밸브", "유량계"));
    }

    #[test]
    fn overlap_is_share_of_reference_keywords() {
        let reference = vec!["초음파유량계".to_owned(), "정수장".to_owned()];
        let candidate = vec!["유량계".to_owned()];
        assert!((keyword_overlap(&reference, &candidate) - 0.5).abs() < 1e-9);
        assert_eq!(keyword_overlap(&[], &candidate), 0.0);
    }

    #[test]
    fn names_overlap_requires_non_empty_names() {
        assert!(names_overlap("서울시 상수도사업본부", "서울시"));
        assert!(!names_overlap("", "서울시"));
    }
}
