//! Content dispatch: which sections to build for a set of categories, in
//! which order, and what each degrades to.

use std::sync::Arc;

use futures::future::join_all;
use pawtrip_core::compose::{
    assemble, greeting_section, lodging_section, lodging_tips_section,
    travel_tips_section, weather_section, MISSING_LINK,
};
use pawtrip_core::prompt::{course_vars, greeting_vars, transit_vars};
use pawtrip_core::{
    detect_pet_type, detect_transport_mode, fallback_greeting, is_transit_only, nights_to_days,
    retry_or_degrade, wants_places, Category, CategorySet, MapLinker, Notice, Outcome,
    ParsedQuery, PipelineSettings, PromptKind, PromptVars, ResultBundle, SectionKind,
    TextGenerator, WeatherOutcome, WeatherService,
};
use pawtrip_integrations::kst_now;
use tracing::{debug, warn};

use crate::analyze::resolve_weather_region;

type SectionPredicate = fn(&CategorySet, &ResultBundle) -> bool;

/// Fixed section order. A section is built when its predicate holds.
const SECTION_PLAN: &[(SectionKind, SectionPredicate)] = &[
    (SectionKind::Greeting, always),
    (SectionKind::TransitRules, wants_transit),
    (SectionKind::Weather, wants_weather),
    (SectionKind::TravelCourse, has_attractions),
    (SectionKind::TravelTips, has_attractions),
    (SectionKind::Lodging, wants_lodging),
    (SectionKind::LodgingTips, has_lodging),
];

fn always(_: &CategorySet, _: &ResultBundle) -> bool {
    true
}

fn wants_transit(categories: &CategorySet, _: &ResultBundle) -> bool {
    categories.contains(&Category::Transit)
}

fn wants_weather(categories: &CategorySet, _: &ResultBundle) -> bool {
    categories.contains(&Category::Weather)
}

fn wants_lodging(categories: &CategorySet, _: &ResultBundle) -> bool {
    categories.contains(&Category::Lodging)
}

fn has_attractions(categories: &CategorySet, bundle: &ResultBundle) -> bool {
    categories.contains(&Category::Attraction) && !bundle.get(Category::Attraction).is_empty()
}

fn has_lodging(categories: &CategorySet, bundle: &ResultBundle) -> bool {
    wants_lodging(categories, bundle) && !bundle.get(Category::Lodging).is_empty()
}

/// Sections selected for `categories`, in output order.
pub fn plan_sections(categories: &CategorySet, bundle: &ResultBundle) -> Vec<SectionKind> {
    if is_transit_only(categories) {
        return vec![SectionKind::Greeting, SectionKind::TransitRules];
    }

    SECTION_PLAN
        .iter()
        .filter(|(_, applies)| applies(categories, bundle))
        .map(|(kind, _)| *kind)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionOutput {
    pub kind: SectionKind,
    pub text: String,
    pub degraded: bool,
}

impl SectionOutput {
    fn fresh(kind: SectionKind, text: String) -> Self {
        Self {
            kind,
            text,
            degraded: false,
        }
    }

    fn from_outcome(kind: SectionKind, outcome: Outcome<String>) -> Self {
        Self {
            kind,
            degraded: outcome.is_degraded(),
            text: outcome.into_inner(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub text: String,
    pub sections: Vec<SectionOutput>,
    pub fast_path: bool,
    pub generation_calls: usize,
}

impl Dispatched {
    pub fn kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|section| section.kind).collect()
    }

    pub fn degraded(&self) -> Vec<SectionKind> {
        self.sections
            .iter()
            .filter(|section| section.degraded)
            .map(|section| section.kind)
            .collect()
    }
}

/// Per-request values every section builder reads.
struct SectionContext<'a> {
    query: &'a str,
    categories: &'a CategorySet,
    parsed: &'a ParsedQuery,
    bundle: &'a ResultBundle,
}

impl SectionContext<'_> {
    fn city(&self) -> Option<&str> {
        self.parsed.region()
    }

    fn trip_days(&self) -> u32 {
        nights_to_days(self.query)
            .or(self.parsed.days)
            .filter(|days| *days > 0)
            .unwrap_or(1)
    }
}

#[derive(Clone)]
pub struct ContentDispatcher {
    generator: Arc<dyn TextGenerator>,
    weather: Arc<dyn WeatherService>,
    linker: Arc<dyn MapLinker>,
    settings: PipelineSettings,
}

impl ContentDispatcher {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        weather: Arc<dyn WeatherService>,
        linker: Arc<dyn MapLinker>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator,
            weather,
            linker,
            settings,
        }
    }

    /// Assembles the answer. Every section degrades on its own, so this
    /// always yields non-empty text.
    pub async fn build_response(
        &self,
        query: &str,
        categories: &CategorySet,
        parsed: &ParsedQuery,
        bundle: &ResultBundle,
    ) -> Dispatched {
        let ctx = SectionContext {
            query,
            categories,
            parsed,
            bundle,
        };

        let plan = plan_sections(categories, bundle);
        debug!(sections = ?plan, "dispatch plan");

        let sections =
            join_all(plan.iter().map(|kind| self.build_section(*kind, &ctx))).await;

        let generation_calls = sections
            .iter()
            .filter(|section| {
                matches!(
                    section.kind,
                    SectionKind::Greeting | SectionKind::TransitRules | SectionKind::TravelCourse
                )
            })
            .count();

        let mut text = assemble(
            &sections
                .iter()
                .map(|section| section.text.clone())
                .collect::<Vec<_>>(),
        );

        if wants_places(categories) && bundle.is_empty() {
            text = format!("{}{text}", Notice::NoVerifiedPlaces.text());
        }

        for section in sections.iter().filter(|section| section.degraded) {
            warn!(section = ?section.kind, "section degraded");
        }

        Dispatched {
            text,
            sections,
            fast_path: is_transit_only(categories),
            generation_calls,
        }
    }

    async fn build_section(&self, kind: SectionKind, ctx: &SectionContext<'_>) -> SectionOutput {
        match kind {
            SectionKind::Greeting => self.greeting(ctx).await,
            SectionKind::TransitRules => self.transit_rules(ctx).await,
            SectionKind::Weather => self.weather(ctx).await,
            SectionKind::TravelCourse => self.travel_course(ctx).await,
            SectionKind::TravelTips => {
                SectionOutput::fresh(kind, travel_tips_section(ctx.trip_days()))
            }
            SectionKind::Lodging => self.lodging(ctx),
            SectionKind::LodgingTips => SectionOutput::fresh(kind, lodging_tips_section()),
        }
    }

    async fn generate(
        &self,
        label: &'static str,
        kind: PromptKind,
        vars: PromptVars,
        degraded: impl FnOnce() -> String,
    ) -> Outcome<String> {
        let policy = self.settings.generation_policy();
        retry_or_degrade(
            label,
            &policy,
            || self.generator.generate_text(kind, &vars),
            |_| degraded(),
        )
        .await
    }

    async fn greeting(&self, ctx: &SectionContext<'_>) -> SectionOutput {
        let city = ctx.city();
        let outcome = self
            .generate(
                "generate_greeting",
                PromptKind::Greeting,
                greeting_vars(city, ctx.categories),
                || fallback_greeting(city),
            )
            .await;

        let degraded = outcome.is_degraded();
        let greeting = outcome.into_inner();
        let greeting = if greeting.trim().is_empty() {
            fallback_greeting(city)
        } else {
            greeting
        };

        SectionOutput {
            kind: SectionKind::Greeting,
            text: greeting_section(&greeting),
            degraded,
        }
    }

    async fn transit_rules(&self, ctx: &SectionContext<'_>) -> SectionOutput {
        let pet_type = ctx.parsed.pet_type().or_else(|| detect_pet_type(ctx.query));
        let mode = detect_transport_mode(ctx.query);
        let outcome = self
            .generate(
                "generate_transit_rules",
                PromptKind::TransitRules,
                transit_vars(pet_type, mode),
                || Notice::TransitUnavailable.text().to_string(),
            )
            .await;
        SectionOutput::from_outcome(SectionKind::TransitRules, outcome)
    }

    async fn weather(&self, ctx: &SectionContext<'_>) -> SectionOutput {
        let Some(region) = resolve_weather_region(ctx.query, ctx.categories, ctx.parsed) else {
            return SectionOutput::fresh(
                SectionKind::Weather,
                Notice::RegionRequired.text().to_string(),
            );
        };

        let policy = self.settings.weather_policy();
        let outcome = retry_or_degrade(
            "get_weather",
            &policy,
            || self.weather.get_weather(&region),
            |error| WeatherOutcome::Unavailable {
                reason: error.to_string(),
            },
        )
        .await;
        let call_degraded = outcome.is_degraded();

        match outcome.into_inner() {
            WeatherOutcome::Observed(snapshot) => SectionOutput {
                kind: SectionKind::Weather,
                text: weather_section(&snapshot, &observed_at()),
                degraded: call_degraded,
            },
            WeatherOutcome::Unavailable { reason } => {
                warn!(%region, %reason, "weather unavailable");
                SectionOutput {
                    kind: SectionKind::Weather,
                    text: Notice::WeatherUnavailable.text().to_string(),
                    degraded: true,
                }
            }
        }
    }

    async fn travel_course(&self, ctx: &SectionContext<'_>) -> SectionOutput {
        let spots = ctx.bundle.get(Category::Attraction);
        let outcome = self
            .generate(
                "generate_travel_course",
                PromptKind::TravelCourse,
                course_vars(ctx.city(), ctx.trip_days(), spots),
                || Notice::CourseUnavailable.text().to_string(),
            )
            .await;
        SectionOutput::from_outcome(SectionKind::TravelCourse, outcome)
    }

    fn lodging(&self, ctx: &SectionContext<'_>) -> SectionOutput {
        let mut degraded = false;
        let entries = ctx
            .bundle
            .get(Category::Lodging)
            .iter()
            .map(|place| {
                let link = match self.linker.build_map_link(&place.title, ctx.city()) {
                    Ok(link) => link,
                    Err(error) => {
                        warn!(title = %place.title, error = %error, "map link unavailable");
                        degraded = true;
                        MISSING_LINK.to_string()
                    }
                };
                (place.clone(), link)
            })
            .collect::<Vec<_>>();

        SectionOutput {
            kind: SectionKind::Lodging,
            text: lodging_section(&entries),
            degraded,
        }
    }
}

fn observed_at() -> String {
    kst_now().format("%Y-%m-%d %H:%M").to_string()
}
