//! Region extraction for weather questions. Trip phrasing ("제주도 2박3일")
//! is handled by the general extractor; weather phrasing ("서울 날씨",
//! "부산 지금") needs its own patterns.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::lexicon::is_weather_keyword;

/// Tried in order. Captures are lazy so a trailing "의" stays out of the
/// region ("서울의 날씨" yields "서울").
static WEATHER_REGION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"([가-힣]+?(?:시|구|군|도))\s*(?:의\s*)?(?:날씨|기온|온도|현재)",
        r"([가-힣]+?)\s*(?:의\s*)?(?:날씨|기온|온도)",
        r"([가-힣]+?)\s+(?:현재|지금|오늘)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid weather region regex"))
    .collect()
});

static HANGUL_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[가-힣]+").expect("valid hangul word regex"));

pub fn extract_weather_region(query: &str) -> Option<String> {
    for pattern in WEATHER_REGION_PATTERNS.iter() {
        let candidate = pattern
            .captures_iter(query)
            .filter_map(|captures| captures.get(1))
            .map(|region| region.as_str())
            .find(|region| !is_weather_keyword(region));

        if let Some(region) = candidate {
            return Some(region.to_string());
        }
    }

    HANGUL_WORD
        .find_iter(query)
        .map(|word| word.as_str())
        .find(|word| !is_weather_keyword(word) && word.graphemes(true).count() >= 2)
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_possessive_particle() {
        assert_eq!(extract_weather_region("서울의 날씨 어때").as_deref(), Some("서울"));
    }

    #[test]
    fn prefers_administrative_suffix() {
        assert_eq!(extract_weather_region("강남구 날씨 알려줘").as_deref(), Some("강남구"));
    }

    #[test]
    fn skips_weather_vocabulary_before_the_city() {
        assert_eq!(extract_weather_region("오늘 부산 날씨").as_deref(), Some("부산"));
    }

    #[test]
    fn matches_city_followed_by_now() {
        assert_eq!(extract_weather_region("속초 지금 어때?").as_deref(), Some("속초"));
    }

    #[test]
    fn falls_back_to_first_meaningful_word() {
        assert_eq!(extract_weather_region("강릉은 비 와?").as_deref(), Some("강릉은"));
    }

    #[test]
    fn returns_none_when_only_weather_words_remain() {
        assert_eq!(extract_weather_region("오늘 날씨 어때"), None);
    }
}
