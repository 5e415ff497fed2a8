use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::intent::{detect_small_talk, normalize_text};

/// Placeholder used wherever an extracted field is missing and the value
/// only feeds prompt text.
pub const UNSPECIFIED: &str = "정보 없음";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Attraction,
    Lodging,
    Transit,
    Weather,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Attraction,
        Category::Lodging,
        Category::Transit,
        Category::Weather,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "attraction" | "관광지" | "관광명소" | "관광" => Some(Self::Attraction),
            "lodging" | "숙박" | "숙소" => Some(Self::Lodging),
            "transit" | "대중교통" | "교통" => Some(Self::Transit),
            "weather" | "날씨" => Some(Self::Weather),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Attraction => "attraction",
            Self::Lodging => "lodging",
            Self::Transit => "transit",
            Self::Weather => "weather",
        }
    }

    pub fn label_ko(self) -> &'static str {
        match self {
            Self::Attraction => "관광지",
            Self::Lodging => "숙박",
            Self::Transit => "대중교통",
            Self::Weather => "날씨",
        }
    }

    /// Only attraction and lodging ever hold places.
    pub fn is_place_bucket(self) -> bool {
        matches!(self, Self::Attraction | Self::Lodging)
    }
}

pub type CategorySet = BTreeSet<Category>;

pub fn wants_places(categories: &CategorySet) -> bool {
    categories.iter().any(|category| category.is_place_bucket())
}

pub fn is_transit_only(categories: &CategorySet) -> bool {
    categories.len() == 1 && categories.contains(&Category::Transit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmallTalk {
    Greeting,
    Thanks,
    Help,
}

/// Normalized user input. The small-talk flag is resolved once, up front,
/// so the pipeline can answer without touching any collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    text: String,
    small_talk: Option<SmallTalk>,
}

impl Query {
    pub fn new(raw: &str) -> Self {
        let text = normalize_text(raw);
        let small_talk = detect_small_talk(&text);
        Self { text, small_talk }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn small_talk(&self) -> Option<SmallTalk> {
        self.small_talk
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub pet_type: Option<String>,
    #[serde(default)]
    pub days: Option<u32>,
}

impl ParsedQuery {
    /// Region with LLM-style placeholders ("", "null") treated as absent.
    pub fn region(&self) -> Option<&str> {
        meaningful(self.region.as_deref())
    }

    pub fn pet_type(&self) -> Option<&str> {
        meaningful(self.pet_type.as_deref())
    }

    pub fn region_text(&self) -> &str {
        self.region().unwrap_or(UNSPECIFIED)
    }

    pub fn pet_type_text(&self) -> &str {
        self.pet_type().unwrap_or(UNSPECIFIED)
    }

    pub fn days_text(&self) -> String {
        self.days
            .map(|days| days.to_string())
            .unwrap_or_else(|| UNSPECIFIED.to_string())
    }

    pub fn is_well_formed(&self) -> bool {
        let blank = |value: &Option<String>| value.as_deref().is_some_and(|v| v.trim().is_empty());
        !blank(&self.region) && !blank(&self.pet_type) && self.days != Some(0)
    }

    /// Fills fields this record is missing from `other`.
    pub fn or_fill(mut self, other: &ParsedQuery) -> Self {
        if self.region().is_none() {
            self.region = other.region().map(ToString::to_string);
        }
        if self.pet_type().is_none() {
            self.pet_type = other.pet_type().map(ToString::to_string);
        }
        if self.days.filter(|days| *days > 0).is_none() {
            self.days = other.days.filter(|days| *days > 0);
        }
        self
    }
}

fn meaningful(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null") && *v != UNSPECIFIED)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRank {
    Vector,
    Api,
}

/// Place candidate as returned by the places API, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlace {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "addr1")]
    pub address: Option<String>,
    #[serde(default)]
    pub pet_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub title: String,
    pub address: Option<String>,
    pub pet_info: Option<String>,
    pub bucket: Category,
    pub source: SourceRank,
}

impl PlaceRecord {
    pub fn from_raw(raw: RawPlace, bucket: Category) -> Option<Self> {
        let title = raw.title.trim().to_string();
        if title.is_empty() {
            return None;
        }

        Some(Self {
            title,
            address: raw.address.filter(|value| !value.trim().is_empty()),
            pet_info: raw.pet_info.filter(|value| !value.trim().is_empty()),
            bucket,
            source: SourceRank::Api,
        })
    }

    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }

    pub fn address_text(&self) -> &str {
        self.address.as_deref().unwrap_or(UNSPECIFIED)
    }

    pub fn pet_info_text(&self) -> &str {
        self.pet_info.as_deref().unwrap_or(UNSPECIFIED)
    }
}

/// Dedup key: whitespace-collapsed, lower-cased title.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketInsert {
    Inserted,
    Duplicate,
    NotRequested,
}

/// Per-query aggregation result. Keys exist only for requested place
/// buckets; each bucket keeps arrival order and unique normalized titles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultBundle {
    buckets: BTreeMap<Category, Vec<PlaceRecord>>,
}

impl ResultBundle {
    pub fn for_categories(categories: &CategorySet) -> Self {
        let mut bundle = Self::default();
        for category in categories {
            bundle.open_bucket(*category);
        }
        bundle
    }

    pub fn open_bucket(&mut self, category: Category) {
        if category.is_place_bucket() {
            self.buckets.entry(category).or_default();
        }
    }

    pub fn insert(&mut self, record: PlaceRecord) -> BucketInsert {
        let Some(bucket) = self.buckets.get_mut(&record.bucket) else {
            return BucketInsert::NotRequested;
        };

        let key = record.normalized_title();
        if bucket.iter().any(|existing| existing.normalized_title() == key) {
            return BucketInsert::Duplicate;
        }

        bucket.push(record);
        BucketInsert::Inserted
    }

    pub fn get(&self, category: Category) -> &[PlaceRecord] {
        self.buckets
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.buckets.contains_key(&category)
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.buckets.keys().copied()
    }

    pub fn total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub temperature: String,
    pub humidity: String,
    pub precipitation_kind: String,
    pub wind_speed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeatherOutcome {
    Observed(WeatherSnapshot),
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Train,
    Bus,
    Subway,
    Taxi,
}

impl TransportMode {
    pub fn label_ko(self) -> &'static str {
        match self {
            Self::Train => "기차",
            Self::Bus => "버스",
            Self::Subway => "지하철",
            Self::Taxi => "택시",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Greeting,
    TransitRules,
    Weather,
    TravelCourse,
    TravelTips,
    Lodging,
    LodgingTips,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    SmallTalk,
    FastPath,
    Composed,
    Apology,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInput {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConciergeReply {
    pub query_id: String,
    pub reply_text: String,
    pub outcome: ReplyOutcome,
    pub categories: Vec<Category>,
    pub parsed: Option<ParsedQuery>,
    pub sections: Vec<SectionKind>,
    pub degraded_sections: Vec<SectionKind>,
    pub retrieved_places: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(title: &str, bucket: Category, source: SourceRank) -> PlaceRecord {
        PlaceRecord {
            title: title.to_string(),
            address: None,
            pet_info: None,
            bucket,
            source,
        }
    }

    #[test]
    fn bundle_only_opens_place_buckets() {
        let categories = CategorySet::from([Category::Lodging, Category::Weather]);
        let bundle = ResultBundle::for_categories(&categories);
        assert!(bundle.contains(Category::Lodging));
        assert!(!bundle.contains(Category::Weather));
        assert!(!bundle.contains(Category::Attraction));
    }

    #[test]
    fn bundle_rejects_duplicate_titles_case_insensitively() {
        let mut bundle = ResultBundle::for_categories(&CategorySet::from([Category::Attraction]));
        assert_eq!(
            bundle.insert(place("Sokcho  Beach", Category::Attraction, SourceRank::Vector)),
            BucketInsert::Inserted
        );
        assert_eq!(
            bundle.insert(place("sokcho beach", Category::Attraction, SourceRank::Api)),
            BucketInsert::Duplicate
        );
        assert_eq!(
            bundle.insert(place("설악 리조트", Category::Lodging, SourceRank::Api)),
            BucketInsert::NotRequested
        );
        assert_eq!(bundle.get(Category::Attraction)[0].source, SourceRank::Vector);
        assert_eq!(bundle.total(), 1);
    }

    #[test]
    fn parsed_query_ignores_placeholder_region() {
        let parsed = ParsedQuery {
            region: Some("null".to_string()),
            pet_type: None,
            days: Some(3),
        };
        assert_eq!(parsed.region(), None);
        assert_eq!(parsed.region_text(), UNSPECIFIED);
        assert_eq!(parsed.days_text(), "3");
    }

    #[test]
    fn malformed_parsed_query_is_detected() {
        let zero_days = ParsedQuery {
            days: Some(0),
            ..ParsedQuery::default()
        };
        assert!(!zero_days.is_well_formed());
        assert!(ParsedQuery::default().is_well_formed());
    }

    #[test]
    fn raw_place_with_blank_title_is_discarded() {
        let raw = RawPlace {
            title: "   ".to_string(),
            ..RawPlace::default()
        };
        assert!(PlaceRecord::from_raw(raw, Category::Attraction).is_none());
    }

    #[test]
    fn category_parses_korean_labels() {
        assert_eq!(Category::parse("숙박"), Some(Category::Lodging));
        assert_eq!(Category::parse(" Weather "), Some(Category::Weather));
        assert_eq!(Category::parse("맛집"), None);
    }
}
