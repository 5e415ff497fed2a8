//! Keyword tables. Every table is ordered: earlier entries win when a text
//! matches more than one of them.

use crate::models::{Category, TransportMode};

#[derive(Debug, Clone, Copy)]
pub struct Lexicon {
    pub category: Category,
    pub terms: &'static [&'static str],
}

impl Lexicon {
    pub fn first_match(&self, lowered: &str) -> Option<&'static str> {
        self.terms.iter().copied().find(|term| lowered.contains(term))
    }

    pub fn matches(&self, lowered: &str) -> bool {
        self.first_match(lowered).is_some()
    }
}

pub const CATEGORY_LEXICONS: &[Lexicon] = &[
    Lexicon {
        category: Category::Attraction,
        terms: &[
            "관광", "여행지", "여행 코스", "여행코스", "여행 추천", "여행추천", "코스", "명소", "가볼",
            "갈만한", "갈 만한", "볼거리", "놀거리", "일정", "산책", "해변", "해수욕장", "공원",
            "attraction", "sightseeing",
        ],
    },
    Lexicon {
        category: Category::Lodging,
        terms: &[
            "숙박", "숙소", "호텔", "펜션", "리조트", "게스트하우스", "민박", "캠핑", "글램핑",
            "묵을", "잘 곳", "잠잘", "hotel", "stay",
        ],
    },
    Lexicon {
        category: Category::Transit,
        terms: &[
            "대중교통", "버스", "기차", "ktx", "srt", "지하철", "전철", "택시", "열차", "코레일",
            "korail", "탑승", "교통",
        ],
    },
    Lexicon {
        category: Category::Weather,
        terms: &[
            "날씨", "기온", "온도", "비 와", "비와", "눈 와", "눈와", "습도", "바람", "우산",
            "weather",
        ],
    },
];

/// Bucketing for API titles that carry no label. Lodging is consulted first.
pub const BUCKET_LEXICONS: &[Lexicon] = &[
    Lexicon {
        category: Category::Lodging,
        terms: &[
            "리조트", "호텔", "숙소", "펜션", "게스트하우스", "민박", "콘도", "모텔", "숙박",
            "스테이", "레지던스", "하우스", "빌라", "룸", "스위트", "캠핑", "글램핑", "resort",
            "hotel", "camping", "park",
        ],
    },
    Lexicon {
        category: Category::Attraction,
        terms: &[
            "해변", "해수욕장", "항", "공원", "오름", "폭포", "계곡", "동굴", "산", "숲", "정",
            "농장", "박물관", "미술관", "성", "절", "사찰", "유적", "전망대", "단지", "거리",
            "마을", "릉", "궁", "길", "관광", "beach", "museum", "trail", "temple", "street",
        ],
    },
];

pub const DEFAULT_BUCKET: Category = Category::Attraction;

/// Words that look like place names to a naive Hangul scan but are weather
/// vocabulary or filler.
pub const WEATHER_KEYWORDS: &[&str] = &[
    "날씨", "기온", "온도", "비", "눈", "바람", "습도", "맑", "흐림", "현재", "지금", "오늘",
    "내일", "어때", "어때요", "알려줘", "궁금해",
];

pub const PET_TYPES: &[&str] = &[
    "리트리버", "푸들", "말티즈", "치와와", "포메라니안", "비숑", "시바", "웰시코기", "진돗개",
    "닥스훈트", "강아지", "반려견", "고양이", "반려묘",
];

pub const TRANSPORT_LEXICON: &[(TransportMode, &[&str])] = &[
    (
        TransportMode::Train,
        &["기차", "ktx", "srt", "열차", "철도", "korail", "코레일"],
    ),
    (
        TransportMode::Bus,
        &["버스", "시내버스", "시외버스", "고속버스"],
    ),
    (TransportMode::Subway, &["지하철", "전철", "metro"]),
    (TransportMode::Taxi, &["택시", "콜택시", "call"]),
];

pub const KNOWN_REGIONS: &[&str] = &[
    "서울", "부산", "제주도", "제주", "서귀포", "속초", "강릉", "양양", "춘천", "평창", "가평",
    "경주", "포항", "여수", "순천", "전주", "군산", "통영", "거제", "남해", "대구", "인천",
    "광주", "대전", "울산", "수원", "태안", "단양", "안동", "목포",
];

/// Files an unlabeled title into a bucket: lodging terms first, then
/// attraction terms, otherwise the default bucket. Never drops a title.
pub fn bucket_for_title(title: &str) -> Category {
    let lowered = title.to_lowercase();
    BUCKET_LEXICONS
        .iter()
        .find(|lexicon| lexicon.matches(&lowered))
        .map(|lexicon| lexicon.category)
        .unwrap_or(DEFAULT_BUCKET)
}

pub fn is_weather_keyword(token: &str) -> bool {
    WEATHER_KEYWORDS.contains(&token)
}
