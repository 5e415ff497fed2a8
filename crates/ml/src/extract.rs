use async_trait::async_trait;
use pawtrip_core::{extract_fields_rules, FieldExtractor, ParsedQuery, ServiceError};

/// Lexicon and regex extraction. Total; never returns an error.
#[derive(Debug, Default)]
pub struct RuleFieldExtractor;

#[async_trait]
impl FieldExtractor for RuleFieldExtractor {
    async fn extract_fields(&self, query: &str) -> Result<ParsedQuery, ServiceError> {
        Ok(extract_fields_rules(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_region_and_trip_length() {
        let parsed = RuleFieldExtractor
            .extract_fields("속초로 말티즈랑 1박 여행")
            .await
            .expect("rules never fail");
        assert_eq!(parsed.region(), Some("속초"));
        assert_eq!(parsed.pet_type(), Some("말티즈"));
        assert_eq!(parsed.days, Some(2));
    }

    #[tokio::test]
    async fn missing_fields_stay_empty() {
        let parsed = RuleFieldExtractor
            .extract_fields("어디 가지?")
            .await
            .expect("rules never fail");
        assert_eq!(parsed, ParsedQuery::default());
    }
}
