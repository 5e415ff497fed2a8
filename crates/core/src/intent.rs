use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexicon::{CATEGORY_LEXICONS, KNOWN_REGIONS, PET_TYPES, TRANSPORT_LEXICON};
use crate::models::{Category, CategorySet, ParsedQuery, SmallTalk, TransportMode};

static NIGHTS_DAYS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*박\s*(\d+)\s*일").expect("valid nights-days regex"));
static NIGHTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*박").expect("valid nights regex"));
static DAYS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*일").expect("valid days regex"));

/// Longest trip the course builder plans for; larger counts are ignored.
pub const MAX_TRIP_DAYS: u32 = 30;

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

pub fn detect_small_talk(text: &str) -> Option<SmallTalk> {
    let lower = text.to_lowercase();

    if contains_any(&lower, &["안녕", "hello", "반가워", "하이"]) || is_bare_hi(&lower) {
        return Some(SmallTalk::Greeting);
    }

    if contains_any(&lower, &["감사", "고마워"]) {
        return Some(SmallTalk::Thanks);
    }

    if contains_any(&lower, &["도움", "어떻게 써", "무슨 기능", "설명해줘"]) {
        return Some(SmallTalk::Help);
    }

    None
}

// "hi" only as a standalone word, otherwise "this"/"chicken" would greet.
fn is_bare_hi(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "hi")
}

/// Keyword pass of the category classifier. May return an empty set; the
/// semantic classifier fills in what keywords miss.
pub fn classify_categories_rules(text: &str) -> CategorySet {
    let lower = text.to_lowercase();

    let mut categories = CATEGORY_LEXICONS
        .iter()
        .filter(|lexicon| lexicon.matches(&lower))
        .map(|lexicon| lexicon.category)
        .collect::<CategorySet>();

    // Overnight or day-trip phrasing is a course request. A bare "N일" is
    // left alone since it is usually a date.
    if NIGHTS.is_match(&lower) || lower.contains("당일치기") {
        categories.insert(Category::Attraction);
    }

    categories
}

pub fn detect_pet_type(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    PET_TYPES.iter().copied().find(|pet| lower.contains(pet))
}

pub fn detect_transport_mode(text: &str) -> Option<TransportMode> {
    let lower = text.to_lowercase();
    TRANSPORT_LEXICON
        .iter()
        .find(|(_, keywords)| contains_any(&lower, keywords))
        .map(|(mode, _)| *mode)
}

pub fn detect_region(text: &str) -> Option<&'static str> {
    KNOWN_REGIONS
        .iter()
        .copied()
        .find(|region| text.contains(region))
}

/// "N박" phrasing converted to days (N nights is N+1 days). Counts beyond
/// `MAX_TRIP_DAYS` yield `None`.
pub fn nights_to_days(text: &str) -> Option<u32> {
    NIGHTS
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|nights| nights.as_str().parse::<u32>().ok())
        .and_then(|nights| nights.checked_add(1))
        .and_then(plausible_days)
}

/// Trip length from "N박M일", "N박", "N일" or "당일", in that order. A day
/// count right after a month ("10월 3일") is a date, not a length.
pub fn trip_days(text: &str) -> Option<u32> {
    if let Some(days) = NIGHTS_DAYS
        .captures(text)
        .and_then(|captures| captures.get(2))
        .and_then(|days| days.as_str().parse::<u32>().ok())
    {
        return plausible_days(days);
    }

    if let Some(days) = nights_to_days(text) {
        return Some(days);
    }

    let day_count = DAYS
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .find(|days| !text[..days.start()].trim_end().ends_with('월'))
        .and_then(|days| days.as_str().parse::<u32>().ok());
    if let Some(days) = day_count {
        return plausible_days(days);
    }

    text.contains("당일").then_some(1)
}

fn plausible_days(days: u32) -> Option<u32> {
    Some(days).filter(|days| (1..=MAX_TRIP_DAYS).contains(days))
}

/// Rule-based field extraction. Total: anything not found stays `None`.
pub fn extract_fields_rules(text: &str) -> ParsedQuery {
    ParsedQuery {
        region: detect_region(text).map(ToString::to_string),
        pet_type: detect_pet_type(text).map(ToString::to_string),
        days: trip_days(text),
    }
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_greeting_and_help() {
        assert_eq!(detect_small_talk("안녕하세요!"), Some(SmallTalk::Greeting));
        assert_eq!(detect_small_talk("Hi there"), Some(SmallTalk::Greeting));
        assert_eq!(detect_small_talk("무슨 기능이 있어?"), Some(SmallTalk::Help));
        assert_eq!(detect_small_talk("속초 숙소 추천"), None);
    }

    #[test]
    fn hi_inside_a_word_is_not_a_greeting() {
        assert_eq!(detect_small_talk("this trip"), None);
    }

    #[test]
    fn classifies_transit_only_question() {
        let categories = classify_categories_rules("속초로 여행갈려고하는데 버스 규정이 어떻게돼?");
        assert_eq!(categories, CategorySet::from([Category::Transit]));
    }

    #[test]
    fn classifies_multiple_categories() {
        let categories = classify_categories_rules("속초 관광지랑 숙소, 날씨도 알려줘");
        assert_eq!(
            categories,
            CategorySet::from([Category::Attraction, Category::Lodging, Category::Weather])
        );
    }

    #[test]
    fn trip_length_implies_attraction() {
        let categories = classify_categories_rules("제주도에 강아지랑 2박 3일 가고 싶어");
        assert!(categories.contains(&Category::Attraction));
        assert!(classify_categories_rules("강릉 당일치기").contains(&Category::Attraction));
    }

    #[test]
    fn calendar_date_is_not_a_trip() {
        assert_eq!(
            classify_categories_rules("부산 10월 3일 날씨 어때"),
            CategorySet::from([Category::Weather])
        );
        assert_eq!(
            classify_categories_rules("3일에 KTX 타는데 강아지 돼?"),
            CategorySet::from([Category::Transit])
        );
        assert_eq!(trip_days("부산 10월 3일 날씨 어때"), None);
    }

    #[test]
    fn absurd_night_counts_are_ignored() {
        assert_eq!(nights_to_days("속초 4294967295박 여행 코스"), None);
        assert_eq!(nights_to_days("속초 99999999999박"), None);
        assert_eq!(trip_days("속초 100박 101일"), None);
        assert_eq!(nights_to_days("속초 29박"), Some(30));
    }

    #[test]
    fn converts_nights_to_days() {
        assert_eq!(nights_to_days("제주도 2박3일"), Some(3));
        assert_eq!(nights_to_days("속초 1박 여행"), Some(2));
        assert_eq!(nights_to_days("속초 여행"), None);
    }

    #[test]
    fn trip_days_prefers_explicit_day_count() {
        assert_eq!(trip_days("2박 3일"), Some(3));
        assert_eq!(trip_days("3일 일정"), Some(3));
        assert_eq!(trip_days("당일치기"), Some(1));
        assert_eq!(trip_days("0일"), None);
    }

    #[test]
    fn extracts_fields_with_rules() {
        let parsed = extract_fields_rules("제주도에 푸들이랑 2박3일");
        assert_eq!(parsed.region.as_deref(), Some("제주도"));
        assert_eq!(parsed.pet_type.as_deref(), Some("푸들"));
        assert_eq!(parsed.days, Some(3));
    }

    #[test]
    fn detects_transport_mode() {
        assert_eq!(detect_transport_mode("KTX에 강아지 태워도 돼?"), Some(TransportMode::Train));
        assert_eq!(detect_transport_mode("시외버스 규정"), Some(TransportMode::Bus));
        assert_eq!(detect_transport_mode("반려견 동반"), None);
    }
}
