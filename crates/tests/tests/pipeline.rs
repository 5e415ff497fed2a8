use pawtrip_core::{Category, ChatInput, Notice, ParsedQuery, PromptKind, ReplyOutcome, SectionKind};
use pawtrip_retrieval::PlacesFetch;
use pawtrip_tests::{place, raw_place, sokcho_weather, MockGenerator, MockWorld};

fn ask(text: &str) -> ChatInput {
    ChatInput {
        text: text.to_string(),
    }
}

fn sokcho() -> ParsedQuery {
    ParsedQuery {
        region: Some("속초".to_string()),
        pet_type: Some("강아지".to_string()),
        days: None,
    }
}

#[tokio::test]
async fn small_talk_touches_no_collaborator() {
    let world = MockWorld::default();
    let reply = world.agent().handle_query(ask("안녕하세요")).await;

    assert_eq!(reply.outcome, ReplyOutcome::SmallTalk);
    assert_eq!(reply.reply_text, "안녕하세요! 여행 관련해서 궁금한 걸 물어보세요 😊");
    assert_eq!(world.generation_calls(), 0);
    assert_eq!(world.vector_calls(), 0);
}

#[tokio::test]
async fn transit_only_skips_retrieval() {
    let world = MockWorld::default().with_categories([Category::Transit]);
    let reply = world
        .agent()
        .handle_query(ask("강아지랑 KTX 타도 되나요"))
        .await;

    assert_eq!(reply.outcome, ReplyOutcome::FastPath);
    assert_eq!(
        reply.sections,
        vec![SectionKind::Greeting, SectionKind::TransitRules]
    );
    assert_eq!(
        reply.reply_text,
        format!(
            "### {}\n\n{}",
            MockGenerator::marker(PromptKind::Greeting),
            MockGenerator::marker(PromptKind::TransitRules)
        )
    );
    assert_eq!(world.vector_calls(), 0);
    assert_eq!(world.fetch_calls(), 0);
    assert_eq!(world.generation_calls(), 2);
}

#[tokio::test]
async fn attraction_and_weather_sections_arrive_in_order() {
    let world = MockWorld::default()
        .with_categories([Category::Attraction, Category::Weather])
        .with_parsed(sokcho())
        .with_vector_hits(vec![
            place("외옹치해변", Category::Attraction),
            place("영금정", Category::Attraction),
        ])
        .with_weather(sokcho_weather());

    let reply = world
        .agent()
        .handle_query(ask("속초 관광지랑 날씨 알려줘"))
        .await;
    let text = &reply.reply_text;

    assert_eq!(reply.outcome, ReplyOutcome::Composed);
    assert_eq!(
        reply.sections,
        vec![
            SectionKind::Greeting,
            SectionKind::Weather,
            SectionKind::TravelCourse,
            SectionKind::TravelTips,
        ]
    );

    let greeting = text
        .find(MockGenerator::marker(PromptKind::Greeting))
        .expect("greeting present");
    let weather = text.find("### 날씨 정보").expect("weather present");
    let course = text
        .find(MockGenerator::marker(PromptKind::TravelCourse))
        .expect("course present");
    assert!(greeting < weather && weather < course);

    for field in ["18.5", "55", "맑음", "1.5"] {
        assert!(text[weather..course].contains(field), "weather is missing {field}");
    }
    assert!(!text.contains("숙박 정보"));
    assert_eq!(reply.retrieved_places, 2);
    assert!(reply.degraded_sections.is_empty());
}

#[tokio::test]
async fn vector_record_wins_over_api_duplicate() {
    let world = MockWorld::default()
        .with_categories([Category::Lodging])
        .with_parsed(sokcho())
        .with_vector_hits(vec![place("설악금호리조트", Category::Lodging)])
        .with_api_places(vec![raw_place("설악금호리조트"), raw_place("라마다 속초 호텔")]);

    let reply = world.agent().handle_query(ask("속초 숙소 추천")).await;

    assert_eq!(reply.retrieved_places, 2);
    assert_eq!(reply.reply_text.matches("#### 설악금호리조트").count(), 1);
    assert!(reply.reply_text.contains("#### 라마다 속초 호텔"));
    assert!(reply.reply_text.contains("https://maps.test/설악금호리조트"));
    assert!(reply.sections.contains(&SectionKind::LodgingTips));
}

#[tokio::test]
async fn validation_misses_are_dropped_silently() {
    let world = MockWorld::default()
        .with_categories([Category::Lodging])
        .with_parsed(sokcho())
        .with_api_places(vec![raw_place("없는 펜션"), raw_place("속초 오션 스테이")])
        .with_unknown_places(&["없는 펜션"]);

    let reply = world.agent().handle_query(ask("속초 펜션")).await;

    assert!(!reply.reply_text.contains("없는 펜션"));
    assert!(reply.reply_text.contains("속초 오션 스테이"));
    assert_eq!(world.metrics.snapshot().validation_drops_total, 1);
}

#[tokio::test]
async fn places_fetch_is_retried_three_times_then_reports_no_places() {
    let world = MockWorld::default()
        .with_categories([Category::Attraction])
        .with_parsed(sokcho())
        .with_failing_fetcher();

    let reply = world.agent().handle_query(ask("속초 가볼만한 곳")).await;

    assert_eq!(world.fetch_calls(), 3);
    assert_eq!(reply.outcome, ReplyOutcome::Composed);
    assert!(reply.reply_text.starts_with(Notice::NoVerifiedPlaces.text()));
    assert!(!reply.reply_text.trim().is_empty());
}

#[tokio::test]
async fn guarded_fetch_rejects_non_positive_counts_without_calling() {
    let world = MockWorld::default().with_api_places(vec![raw_place("영금정")]);
    let agent = world.agent();
    let parsed = sokcho();

    for n in [0, -1] {
        let outcome = agent.aggregator().fetch_places_guarded(Some(&parsed), n).await;
        assert_eq!(outcome, PlacesFetch::Rejected(Notice::InvalidCandidateCount));
    }
    assert_eq!(world.fetch_calls(), 0);

    let exhausted = MockWorld::default().with_failing_fetcher();
    let outcome = exhausted
        .agent()
        .aggregator()
        .fetch_places_guarded(Some(&parsed), 5)
        .await;
    assert_eq!(outcome, PlacesFetch::NoValidPlaces);
    assert_eq!(exhausted.fetch_calls(), 3);
}

#[tokio::test]
async fn weather_region_comes_from_weather_phrasing() {
    let world = MockWorld::default().with_weather(sokcho_weather());
    let agent = world.agent();

    let analysis = agent.analyze("원주의 날씨 어때").await;
    assert_eq!(analysis.parsed.region, None);
    assert_eq!(analysis.weather_region.as_deref(), Some("원주"));

    let reply = agent.handle_query(ask("원주의 날씨 어때")).await;
    assert_eq!(reply.sections, vec![SectionKind::Greeting, SectionKind::Weather]);
    assert_eq!(world.weather.requested_regions(), vec!["원주".to_string()]);
}

#[tokio::test]
async fn calendar_date_keeps_a_weather_question_weather_only() {
    let world = MockWorld::default()
        .with_categories([Category::Weather])
        .with_weather(sokcho_weather());

    let reply = world
        .agent()
        .handle_query(ask("부산 10월 3일 날씨 어때"))
        .await;

    assert_eq!(reply.categories, vec![Category::Weather]);
    assert_eq!(reply.sections, vec![SectionKind::Greeting, SectionKind::Weather]);
    assert!(!reply.reply_text.contains(Notice::NoVerifiedPlaces.text()));
    assert_eq!(world.fetch_calls(), 0);
    assert_eq!(world.vector_calls(), 0);
}

#[tokio::test]
async fn huge_night_count_still_plans_a_course() {
    let world = MockWorld::default()
        .with_categories([Category::Attraction])
        .with_vector_hits(vec![place("영금정", Category::Attraction)]);

    let reply = world
        .agent()
        .handle_query(ask("속초 4294967295박 여행 코스"))
        .await;

    assert_eq!(reply.outcome, ReplyOutcome::Composed);
    assert!(reply.sections.contains(&SectionKind::TravelCourse));
    assert_eq!(reply.parsed.and_then(|parsed| parsed.days), None);
    assert_eq!(world.fetch_calls(), 1);
}

#[tokio::test]
async fn failing_course_generation_does_not_hide_weather() {
    let world = MockWorld::default()
        .with_categories([Category::Attraction, Category::Weather])
        .with_parsed(sokcho())
        .with_vector_hits(vec![place("영금정", Category::Attraction)])
        .with_weather(sokcho_weather())
        .with_failing_generation(&[PromptKind::TravelCourse]);

    let reply = world.agent().handle_query(ask("속초 2박 여행 날씨")).await;

    assert_eq!(reply.degraded_sections, vec![SectionKind::TravelCourse]);
    assert!(reply.reply_text.contains(Notice::CourseUnavailable.text()));
    assert!(reply.reply_text.contains("- 기온: 18.5°C"));
    assert!(reply
        .reply_text
        .contains("체크인/체크아웃 시간을 고려하여 일정을 조율하세요"));
}

#[tokio::test]
async fn missing_lodging_shows_notice() {
    let world = MockWorld::default()
        .with_categories([Category::Lodging])
        .with_parsed(sokcho());

    let reply = world.agent().handle_query(ask("속초 숙소")).await;

    assert!(reply.reply_text.contains(Notice::NoLodging.text()));
    assert!(!reply.sections.contains(&SectionKind::LodgingTips));
}

#[tokio::test]
async fn panicking_collaborator_yields_apology() {
    let world = MockWorld::default().with_panicking_classifier();
    let reply = world.agent().handle_query(ask("속초 관광지")).await;

    assert_eq!(reply.outcome, ReplyOutcome::Apology);
    assert_eq!(reply.reply_text, Notice::Apology.text());
    assert_eq!(world.metrics.snapshot().apologies_total, 1);
}

#[tokio::test]
async fn unclassifiable_query_yields_apology() {
    let world = MockWorld::default();
    let reply = world.agent().handle_query(ask("음...")).await;

    assert_eq!(reply.outcome, ReplyOutcome::Apology);
    assert_eq!(reply.reply_text, Notice::Apology.text());
}
