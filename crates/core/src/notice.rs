//! Fixed user-facing texts substituted when a section cannot be produced.

use crate::models::SmallTalk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    InvalidCandidateCount,
    InvalidParsedQuery,
    NoValidPlaces,
    NoLodging,
    NoVerifiedPlaces,
    RegionRequired,
    WeatherUnavailable,
    TransitUnavailable,
    CourseUnavailable,
    Apology,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Self::InvalidCandidateCount => "요청된 결과 수가 올바르지 않습니다.",
            Self::InvalidParsedQuery => "입력 형식이 올바르지 않습니다.",
            Self::NoValidPlaces => "현재 유효한 장소를 찾을 수 없습니다.",
            Self::NoLodging => "현재 이용 가능한 숙박 시설 정보가 없습니다.",
            Self::NoVerifiedPlaces => "### 안내\n검증된 장소를 찾을 수 없습니다.\n\n",
            Self::RegionRequired => "### 날씨 정보\n지역을 명시해주세요. (예: 서울 날씨, 부산 날씨)\n",
            Self::WeatherUnavailable => "### 날씨 정보\n현재 날씨 정보를 조회할 수 없습니다.\n",
            Self::TransitUnavailable => "### 🚌 대중교통 이용 안내\n\n죄송합니다. 현재 대중교통 규정 정보를 조회할 수 없습니다.\n다시 시도해 주시거나 각 교통수단 운영기관에 직접 문의해주세요.",
            Self::CourseUnavailable => "### 🎯 추천 여행 코스\n\n죄송합니다. 현재 여행 코스 생성에 문제가 발생했습니다.\n다시 시도해 주시거나 다른 방식으로 안내해 드리겠습니다.",
            Self::Apology => "죄송합니다. 요청을 처리하는 중에 오류가 발생했습니다. 다시 시도해 주세요.",
        }
    }
}

pub fn small_talk_reply(kind: SmallTalk) -> &'static str {
    match kind {
        SmallTalk::Greeting => "안녕하세요! 여행 관련해서 궁금한 걸 물어보세요 😊",
        SmallTalk::Thanks => "언제든지 도와드릴게요! 또 궁금한 거 있으신가요?",
        SmallTalk::Help => "이 챗봇은 여행 코스 추천, 숙박 정보, 대중교통 규정 안내를 도와드려요. 예: '제주도 여행 추천해줘'",
    }
}

/// Greeting used when the generator is unavailable.
pub fn fallback_greeting(city: Option<&str>) -> String {
    match city {
        Some(city) => format!("{city} 여행 정보를 안내해드리겠습니다 🏖"),
        None => "여행 정보를 안내해드리겠습니다 🌟".to_string(),
    }
}
