//! Fixed prompt templates handed to the text generator. Placeholders are
//! `{name}`; unknown placeholders are left as-is.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Category, CategorySet, PlaceRecord, TransportMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Greeting,
    TransitRules,
    TravelCourse,
    QueryAnalysis,
}

impl PromptKind {
    pub fn template(self) -> &'static str {
        match self {
            Self::Greeting => GREETING_TEMPLATE,
            Self::TransitRules => TRANSIT_TEMPLATE,
            Self::TravelCourse => COURSE_TEMPLATE,
            Self::QueryAnalysis => ANALYSIS_TEMPLATE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptVars {
    values: BTreeMap<String, String>,
}

impl PromptVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub fn render_prompt(kind: PromptKind, vars: &PromptVars) -> String {
    vars.iter()
        .fold(kind.template().to_string(), |prompt, (key, value)| {
            prompt.replace(&format!("{{{key}}}"), value)
        })
}

pub fn greeting_vars(city: Option<&str>, categories: &CategorySet) -> PromptVars {
    let labels = categories
        .iter()
        .map(|category| format!("\"{}\"", category.label_ko()))
        .collect::<Vec<_>>()
        .join(", ");

    PromptVars::new()
        .with("city", city.unwrap_or("전국"))
        .with("categories", format!("[{labels}]"))
}

pub fn transit_vars(pet_type: Option<&str>, mode: Option<TransportMode>) -> PromptVars {
    PromptVars::new()
        .with("pet_type", pet_type.unwrap_or("반려동물"))
        .with(
            "transport_type",
            mode.map(TransportMode::label_ko).unwrap_or("대중교통"),
        )
        .with("format_guide", transit_format_guide(mode))
}

pub fn course_vars(city: Option<&str>, days: u32, places: &[PlaceRecord]) -> PromptVars {
    let spots = places
        .iter()
        .filter(|place| place.bucket == Category::Attraction)
        .map(|place| {
            format!(
                "{} (주소: {}, 반려동물: {})",
                place.title,
                place.address_text(),
                place.pet_info_text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    PromptVars::new()
        .with("city", city.unwrap_or("여행지"))
        .with("days", days.to_string())
        .with("spots", spots)
}

pub fn analysis_vars(query: &str) -> PromptVars {
    PromptVars::new().with("query", query)
}

pub fn transit_format_guide(mode: Option<TransportMode>) -> String {
    let (icon, title, rules_heading) = match mode {
        Some(TransportMode::Train) => ("🚄", "기차", "KTX/일반열차 이용 규정"),
        Some(TransportMode::Bus) => ("🚌", "버스", "버스 이용 규정"),
        Some(TransportMode::Subway) => ("🚇", "지하철", "지하철 이용 규정"),
        Some(TransportMode::Taxi) => ("🚕", "택시", "택시 이용 규정"),
        None => ("🚌", "대중교통", "이용 가능한 교통수단"),
    };

    format!(
        "응답 형식:\n### {icon} {title} 이용 안내\n\n#### {rules_heading}\n[구체적인 규정]\n\n#### 이용 시 주의사항\n[주의사항 목록]\n\n#### 준비물 안내\n[필요한 준비물 목록]"
    )
}

const GREETING_TEMPLATE: &str = r#"다음 정보를 바탕으로 여행 안내 인사말을 생성해주세요:
도시: {city}
카테고리: {categories}

규칙:
1. 친근하고 자연스러운 말투 사용
2. 이모지 적절히 활용
3. 한 문장으로 간단하게 작성
4. 카테고리가 여러 개면 자연스럽게 나열
5. "안내해드리겠습니다"로 끝나도록 작성

예시:
- 제주도의 숙박, 관광 및 날씨 정보를 상세히 안내해드리겠습니다 ✨
- 부산의 반려동물 동반 가능한 해수욕장 정보를 안내해드리겠습니다 🏖

응답:"#;

const TRANSIT_TEMPLATE: &str = r#"다음 정보를 바탕으로 반려동물 대중교통 이용 규정을 안내해주세요:
반려동물 종류: {pet_type}
교통수단: {transport_type}

규칙:
1. 친근하고 명확한 말투 사용
2. 이모지 적절히 활용
3. 해당 교통수단의 구체적인 규정만 설명
4. 반려동물 동반 시 주의사항 포함
5. 필요한 준비물 안내

{format_guide}"#;

const COURSE_TEMPLATE: &str = r#"다음 정보를 바탕으로 여행 코스를 생성해주세요:
도시: {city}
여행 일수: {days}일
방문 가능한 관광지 목록:
{spots}

규칙:
1. 각 일자별로 적절한 수의 관광지 배치
2. 이동 동선을 고려한 효율적인 코스 구성
3. 체크인/아웃 시간을 고려한 일정 배치
4. 반려동물 동반 특성을 고려한 코스 구성
5. 각 장소별 추천 포인트와 소요시간 포함
6. 관광지가 부족한 경우 주변 추천 활동 포함
7. 하루 최대 3-4곳 방문 권장

예시 입력:
도시: 속초
여행 일수: 1일
관광지: 외옹치해변, 대포항

예시 출력:
### 🎯 추천 여행 코스
여행의 즐거움을 더할 수 있는 코스를 추천해드립니다!

#### 🌅 당일 코스
##### 외옹치해변 (오전)
- 💡 추천 포인트: 아침 바다 산책과 일출 감상
- ⏰ 추천 소요시간: 1-2시간

##### 대포항 (점심~오후)
- 💡 추천 포인트: 반려동물과 함께하는 항구 산책
- ⏰ 추천 소요시간: 2-3시간

실제 응답 형식:
### 🎯 추천 여행 코스
여행의 즐거움을 더할 수 있는 코스를 추천해드립니다!

[일자별 코스 구성]"#;

const ANALYSIS_TEMPLATE: &str = r#"다음 반려동물 여행 질문을 분석해 JSON 한 개만 출력하세요.
질문: {query}

형식:
{"categories": ["관광지" | "숙박" | "대중교통" | "날씨"], "region": "지역명 또는 null", "pet_type": "반려동물 종류 또는 null", "days": 여행 일수 숫자 또는 null}

규칙:
1. categories에는 질문과 관련된 항목만 넣으세요.
2. "N박"은 N+1일로 계산하세요.
3. 알 수 없는 값은 null로 두세요."#;
