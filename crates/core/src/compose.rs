//! Markdown layout of the answer sections. Prose comes from the generator;
//! everything here is fixed framing around it.

use crate::models::{PlaceRecord, WeatherSnapshot};
use crate::notice::Notice;

pub const TRAVEL_TIPS_HEADER: &str = "\n#### ✨ 여행 팁";
pub const LODGING_HEADER: &str = "\n### 🏨 숙박 정보";
pub const LODGING_TIPS_HEADER: &str = "\n#### ✨ 숙박 팁";

const TRAVEL_TIPS: &[&str] = &[
    "- 🕐 각 관광지마다 추천 소요시간을 참고하여 여유있게 일정을 잡으세요.",
    "- 🐕 반려동물과 함께할 때는 목줄과 배변봉투를 필수로 준비해주세요.",
    "- 📸 인생샷 스팟이 많으니 카메라 준비 필수!",
    "- 🚗 주차 공간이 있는지 미리 확인하시면 좋습니다.",
];

const MULTI_DAY_TIPS: &[&str] = &[
    "- 🏨 체크인/체크아웃 시간을 고려하여 일정을 조율하세요.",
    "- 🌦️ 날씨를 미리 확인하고 일정을 유동적으로 조정하세요.",
];

const LODGING_TIPS: &[&str] = &[
    "- 🐕 반려동물 동반 시 미리 예약하시는 것을 추천드립니다.",
    "- 📞 체크인 시간을 미리 확인하세요.",
    "- 🧹 반려동물 용품(방석, 배변패드 등)을 준비하면 좋습니다.",
];

const LODGING_HIGHLIGHTS: &[(&str, &str)] = &[(
    "설악금호리조트",
    "반려동물 전용 용품이 구비되어 있으며, 주변 산책로가 잘 조성되어 있습니다. 8kg 이하 소형견 동반 가능합니다.",
)];

const DEFAULT_LODGING_HIGHLIGHT: &str = "반려동물과 함께 편안한 휴식을 취할 수 있는 숙소입니다.";

/// Link target used when no map link could be built.
pub const MISSING_LINK: &str = "#";

pub fn greeting_section(greeting: &str) -> String {
    format!("### {}\n", greeting.trim())
}

pub fn weather_section(snapshot: &WeatherSnapshot, observed_at: &str) -> String {
    format!(
        "### 날씨 정보\n- 관측 시각: {observed_at}\n- 도시: {}\n- 기온: {}°C\n- 습도: {}%\n- 강수형태: {}\n- 풍속: {} m/s\n",
        snapshot.city,
        snapshot.temperature,
        snapshot.humidity,
        snapshot.precipitation_kind,
        snapshot.wind_speed,
    )
}

pub fn travel_tips_section(days: u32) -> String {
    let extra: &[&str] = if days > 1 { MULTI_DAY_TIPS } else { &[] };
    std::iter::once(TRAVEL_TIPS_HEADER)
        .chain(TRAVEL_TIPS.iter().copied())
        .chain(extra.iter().copied())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn lodging_highlight(title: &str) -> &'static str {
    LODGING_HIGHLIGHTS
        .iter()
        .find(|(name, _)| *name == title.trim())
        .map(|(_, highlight)| *highlight)
        .unwrap_or(DEFAULT_LODGING_HIGHLIGHT)
}

pub fn lodging_entry(place: &PlaceRecord, map_link: &str) -> String {
    [
        format!("#### {}", place.title),
        format!("- 📍 [네이버 지도]({map_link})"),
        format!("- 🏠 주소: {}", place.address_text()),
        format!("- 🐕 반려동물: {}", place.pet_info_text()),
        format!("- 💡 숙소 특징: {}\n", lodging_highlight(&place.title)),
    ]
    .join("\n")
}

/// Lodging block for already-linked entries; an empty slice yields the
/// "no lodging" notice under the same header.
pub fn lodging_section(entries: &[(PlaceRecord, String)]) -> String {
    if entries.is_empty() {
        return format!("{LODGING_HEADER}\n{}", Notice::NoLodging.text());
    }

    std::iter::once(LODGING_HEADER.to_string())
        .chain(
            entries
                .iter()
                .map(|(place, link)| lodging_entry(place, link)),
        )
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn lodging_tips_section() -> String {
    std::iter::once(LODGING_TIPS_HEADER)
        .chain(LODGING_TIPS.iter().copied())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn assemble(sections: &[String]) -> String {
    sections.join("\n")
}
