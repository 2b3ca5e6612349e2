//! Picks one handler per message in a fixed order: unit conversion,
//! arithmetic, weather, encyclopedia, then the help text.

use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;

use crate::calc;
use crate::lookup::{
    Encyclopedia, Geocoder, OpenMeteoClient, WeatherReport, WeatherSource, WikipediaClient,
    weather_now,
};
use crate::trace::SessionTrace;
use crate::units::{UnitConverter, UnitRegistry, match_conversion};

pub const HELP_MESSAGE: &str = "I can help with: math (e.g., 2*(3+4)^2), unit conversion (e.g., 10 km to mi), weather (e.g., weather in Delhi), and Wikipedia summaries (e.g., who is Ada Lovelace).";
pub const WEATHER_NOT_FOUND: &str = "I couldn't find the weather for that location.";
pub const WIKI_NOT_FOUND: &str = "I couldn't find a Wikipedia summary for that.";

const CALC_OPERATORS: [char; 6] = ['+', '-', '*', '/', '%', '^'];
const WEATHER_PREFIXES: [&str; 2] = ["weather", "forecast"];
const WIKI_PREFIXES: [&str; 5] = ["who is", "what is", "tell me about", "wiki", "wikipedia"];
const WIKI_PHRASES: [&str; 3] = ["who is", "what is", "tell me about"];

static CITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)weather(?: in)? ([a-zA-Z\s,]+)").expect("valid city regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Unit,
    Calc,
    Weather,
    Wiki,
    Chat,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Calc => "calc",
            Self::Weather => "weather",
            Self::Wiki => "wiki",
            Self::Chat => "chat",
        }
    }
}

impl Display for IntentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentResult {
    pub kind: IntentKind,
    pub message: String,
}

impl IntentResult {
    fn new(kind: IntentKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Routes free text to the first handler whose guard accepts it. Holds no
/// per-message state, so routing the same text twice gives the same answer
/// as long as the collaborators do.
pub struct IntentRouter<U, G, W, E> {
    units: U,
    geocoder: G,
    weather: W,
    encyclopedia: E,
    trace: Option<SessionTrace>,
}

pub type LiveRouter = IntentRouter<UnitRegistry, OpenMeteoClient, OpenMeteoClient, WikipediaClient>;

impl<U, G, W, E> IntentRouter<U, G, W, E>
where
    U: UnitConverter,
    G: Geocoder,
    W: WeatherSource,
    E: Encyclopedia,
{
    pub fn new(units: U, geocoder: G, weather: W, encyclopedia: E) -> Self {
        Self {
            units,
            geocoder,
            weather,
            encyclopedia,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: SessionTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Never fails: every input ends in some [`IntentResult`].
    pub async fn route(&self, text: &str) -> IntentResult {
        let text = text.trim();

        if let Some(result) = self.try_unit(text) {
            return self.finish(result);
        }
        if let Some(result) = self.try_calc(text) {
            return self.finish(result);
        }
        if is_weather_request(text) {
            let result = self.weather(text).await;
            return self.finish(result);
        }
        if is_wiki_request(text) {
            let result = self.wiki(text).await;
            return self.finish(result);
        }
        self.finish(IntentResult::new(IntentKind::Chat, HELP_MESSAGE))
    }

    fn try_unit(&self, text: &str) -> Option<IntentResult> {
        let message = match match_conversion(text, &self.units)? {
            Ok(conversion) => format!("{} = {}", conversion.original, conversion.converted),
            Err(err) => format!("Sorry, I couldn't convert those units ({err})."),
        };
        Some(IntentResult::new(IntentKind::Unit, message))
    }

    fn try_calc(&self, text: &str) -> Option<IntentResult> {
        if !text.contains(CALC_OPERATORS) {
            return None;
        }

        // `^` is power here, never xor.
        let expr = text.replace('^', "**");
        match calc::evaluate(&expr) {
            Ok(value) => Some(IntentResult::new(
                IntentKind::Calc,
                format!("{expr} = {value}"),
            )),
            Err(err) => {
                self.note_route(&format!("calc skipped: {err}"));
                None
            }
        }
    }

    async fn weather(&self, text: &str) -> IntentResult {
        let city = extract_city(text);
        match weather_now(&self.geocoder, &self.weather, city).await {
            Ok(Some(report)) => IntentResult::new(IntentKind::Weather, format_weather(&report)),
            Ok(None) => IntentResult::new(IntentKind::Weather, WEATHER_NOT_FOUND),
            Err(err) => {
                self.note_lookup_error(&format!("weather for '{city}': {err}"));
                IntentResult::new(IntentKind::Weather, WEATHER_NOT_FOUND)
            }
        }
    }

    async fn wiki(&self, text: &str) -> IntentResult {
        let topic = wiki_topic(text);
        match self.encyclopedia.summary(topic).await {
            Ok(Some(summary)) => IntentResult::new(
                IntentKind::Wiki,
                format!("{} — {}", summary.title, summary.extract),
            ),
            Ok(None) => IntentResult::new(IntentKind::Wiki, WIKI_NOT_FOUND),
            Err(err) => {
                self.note_lookup_error(&format!("summary for '{topic}': {err}"));
                IntentResult::new(IntentKind::Wiki, WIKI_NOT_FOUND)
            }
        }
    }

    fn finish(&self, result: IntentResult) -> IntentResult {
        self.note_route(result.kind.as_str());
        result
    }

    fn note_route(&self, text: &str) {
        if let Some(trace) = &self.trace {
            trace.log_route(text);
        }
    }

    fn note_lookup_error(&self, text: &str) {
        if let Some(trace) = &self.trace {
            trace.log_lookup_error(text);
        }
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn is_weather_request(text: &str) -> bool {
    WEATHER_PREFIXES
        .iter()
        .any(|prefix| starts_with_ignore_case(text, prefix))
        || text.to_lowercase().contains("weather in")
}

fn is_wiki_request(text: &str) -> bool {
    WIKI_PREFIXES
        .iter()
        .any(|prefix| starts_with_ignore_case(text, prefix))
}

fn extract_city(text: &str) -> &str {
    if let Some(city) = CITY_PATTERN.captures(text).and_then(|caps| caps.get(1)) {
        return city.as_str().trim();
    }
    text.split_whitespace().next_back().unwrap_or(text)
}

/// Drops the leading word, except that a multi-word trigger from
/// `WIKI_PHRASES` is dropped whole: `who is Ada Lovelace` looks up
/// `Ada Lovelace`, not `is Ada Lovelace`. A single word is looked up as-is.
fn wiki_topic(text: &str) -> &str {
    let Some((_, rest)) = text.split_once(char::is_whitespace) else {
        return text;
    };

    for phrase in WIKI_PHRASES {
        if !starts_with_ignore_case(text, phrase) {
            continue;
        }
        let Some(after) = text.get(phrase.len()..) else {
            continue;
        };
        if after.starts_with(char::is_whitespace) && !after.trim().is_empty() {
            return after.trim();
        }
    }
    rest.trim()
}

fn format_weather(report: &WeatherReport) -> String {
    let place = match &report.place.country {
        Some(country) => format!("{}, {country}", report.place.name),
        None => report.place.name.clone(),
    };
    format!(
        "Weather in {place}: {}°C, wind {} km/h (as of {}).",
        report.weather.temperature,
        report.weather.windspeed,
        report.weather.time
    )
}

#[cfg(test)]
mod tests {
    use super::{
        HELP_MESSAGE, IntentKind, IntentResult, IntentRouter, WEATHER_NOT_FOUND, WIKI_NOT_FOUND,
        extract_city, wiki_topic,
    };
    use crate::lookup::{
        CurrentWeather, Encyclopedia, Geocoder, LookupError, LookupResult, Place, Summary,
        WeatherSource,
    };
    use crate::trace::SessionTrace;
    use crate::units::UnitRegistry;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeGeocoder {
        queries: Mutex<Vec<String>>,
    }

    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, city: &str) -> LookupResult<Option<Place>> {
            if let Ok(mut queries) = self.queries.lock() {
                queries.push(city.to_string());
            }
            match city {
                "Delhi" => Ok(Some(Place {
                    name: "Delhi".to_string(),
                    latitude: 28.65,
                    longitude: 77.23,
                    country: Some("India".to_string()),
                })),
                "Atlantis" => Ok(Some(Place {
                    name: "Atlantis".to_string(),
                    latitude: 0.0,
                    longitude: 0.0,
                    country: None,
                })),
                "Offline" => Err(LookupError::Transport("connection refused".to_string())),
                _ => Ok(None),
            }
        }
    }

    struct FakeWeather;

    impl WeatherSource for FakeWeather {
        async fn current_weather(
            &self,
            _latitude: f64,
            _longitude: f64,
        ) -> LookupResult<Option<CurrentWeather>> {
            Ok(Some(CurrentWeather {
                temperature: serde_json::Number::from(31),
                windspeed: serde_json::Number::from_f64(9.4).expect("finite"),
                time: "2025-05-01T12:00".to_string(),
            }))
        }
    }

    #[derive(Default)]
    struct FakeEncyclopedia {
        topics: Mutex<Vec<String>>,
    }

    impl Encyclopedia for FakeEncyclopedia {
        async fn summary(&self, topic: &str) -> LookupResult<Option<Summary>> {
            if let Ok(mut topics) = self.topics.lock() {
                topics.push(topic.to_string());
            }
            match topic {
                "Ada Lovelace" => Ok(Some(Summary {
                    title: "Ada Lovelace".to_string(),
                    extract: "English mathematician and writer.".to_string(),
                })),
                "Broken" => Err(LookupError::Parse("expected value".to_string())),
                _ => Ok(None),
            }
        }
    }

    type TestRouter = IntentRouter<UnitRegistry, FakeGeocoder, FakeWeather, FakeEncyclopedia>;

    fn router() -> TestRouter {
        IntentRouter::new(
            UnitRegistry::new(),
            FakeGeocoder::default(),
            FakeWeather,
            FakeEncyclopedia::default(),
        )
    }

    #[tokio::test]
    async fn caret_is_power_in_calculations() {
        let result = router().route("2*(3+4)^2").await;
        assert_eq!(
            result,
            IntentResult {
                kind: IntentKind::Calc,
                message: "2*(3+4)**2 = 98".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn conversions_show_both_quantities() {
        let result = router().route("10 km to mi").await;
        assert_eq!(result.kind, IntentKind::Unit);
        assert_eq!(
            result.message,
            "10.0 kilometer = 6.2137119223733395 mile"
        );
    }

    #[tokio::test]
    async fn failed_conversions_still_stop_at_unit() {
        let result = router().route("convert 5 blorbs to kg").await;
        assert_eq!(result.kind, IntentKind::Unit);
        assert_eq!(
            result.message,
            "Sorry, I couldn't convert those units ('blorbs' is not defined in the unit registry)."
        );

        let result = router().route("3 kg to m").await;
        assert_eq!(result.kind, IntentKind::Unit);
        assert!(
            result
                .message
                .starts_with("Sorry, I couldn't convert those units (Cannot convert from 'kilogram'")
        );
    }

    #[tokio::test]
    async fn conversion_wins_over_arithmetic() {
        let result = router().route("convert 10 km to mi * 2").await;
        assert_eq!(result.kind, IntentKind::Unit);
    }

    #[tokio::test]
    async fn unsafe_arithmetic_falls_through_without_evaluating() {
        let result = router().route("__import__('os').system('ls') + 1").await;
        assert_eq!(
            result,
            IntentResult {
                kind: IntentKind::Chat,
                message: HELP_MESSAGE.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn hyphenated_text_is_not_a_calculation() {
        let router = router();
        let result = router.route("tell me about Jean-Paul Sartre").await;
        assert_eq!(result.kind, IntentKind::Wiki);
        assert_eq!(result.message, WIKI_NOT_FOUND);
        assert_eq!(
            *router.encyclopedia.topics.lock().expect("topics"),
            vec!["Jean-Paul Sartre".to_string()]
        );
    }

    #[tokio::test]
    async fn calculations_keep_integers_exact() {
        let router = router();
        for (input, message) in [
            ("2^128", "2**128 = 340282366920938463463374607431768211456"),
            (
                "factorial(35) * 1",
                "factorial(35) * 1 = 10333147966386144929666651337523200000000",
            ),
            ("10**40 // 10**30", "10**40 // 10**30 = 10000000000"),
        ] {
            let result = router.route(input).await;
            assert_eq!(result.kind, IntentKind::Calc, "input: {input}");
            assert_eq!(result.message, message);
        }
    }

    #[tokio::test]
    async fn division_by_zero_falls_through() {
        let result = router().route("1/0").await;
        assert_eq!(result.kind, IntentKind::Chat);
    }

    #[tokio::test]
    async fn weather_is_formatted_from_both_lookups() {
        let router = router();
        let result = router.route("  Weather in Delhi  ").await;
        insta::assert_snapshot!(result.message, @"Weather in Delhi, India: 31°C, wind 9.4 km/h (as of 2025-05-01T12:00).");
        assert_eq!(result.kind, IntentKind::Weather);

        let result = router.route("what's the weather in Atlantis?").await;
        assert_eq!(
            result.message,
            "Weather in Atlantis: 31°C, wind 9.4 km/h (as of 2025-05-01T12:00)."
        );
        assert_eq!(
            *router.geocoder.queries.lock().expect("queries"),
            vec!["Delhi".to_string(), "Atlantis".to_string()]
        );
    }

    #[tokio::test]
    async fn unknown_places_and_failed_lookups_are_not_found() {
        let router = router();
        let result = router.route("weather in Nowhereville12345").await;
        assert_eq!(result.kind, IntentKind::Weather);
        assert_eq!(result.message, WEATHER_NOT_FOUND);

        let result = router.route("forecast Offline").await;
        assert_eq!(result.kind, IntentKind::Weather);
        assert_eq!(result.message, WEATHER_NOT_FOUND);
    }

    #[tokio::test]
    async fn wiki_reply_starts_with_title() {
        let result = router().route("who is Ada Lovelace").await;
        assert_eq!(result.kind, IntentKind::Wiki);
        assert_eq!(
            result.message,
            "Ada Lovelace — English mathematician and writer."
        );
    }

    #[tokio::test]
    async fn anything_else_gets_help() {
        let result = router().route("hello there").await;
        assert_eq!(
            result,
            IntentResult {
                kind: IntentKind::Chat,
                message: HELP_MESSAGE.to_string(),
            }
        );
        assert_eq!(router().route("").await.kind, IntentKind::Chat);
    }

    #[tokio::test]
    async fn routing_is_repeatable() {
        let router = router();
        for input in ["2*(3+4)^2", "10 km to mi", "who is Ada Lovelace", "weather in Delhi", "hi"] {
            let first = router.route(input).await;
            let second = router.route(input).await;
            assert_eq!(first, second, "input: {input}");
        }
    }

    #[tokio::test]
    async fn trace_records_routes_and_lookup_failures() {
        let dir = tempdir().expect("tempdir");
        let trace = SessionTrace::create_in_temp_dir("router", dir.path()).expect("trace");
        let router = router().with_trace(trace.clone());

        router.route("1/0").await;
        router.route("wiki Broken").await;

        let text = fs::read_to_string(trace.file_path()).expect("read trace");
        assert!(text.contains("[route      ] calc skipped: division by zero"));
        assert!(text.contains("[route      ] chat"));
        assert!(text.contains("[lookup.err ] summary for 'Broken': lookup parse error: expected value"));
        assert!(text.contains("[route      ] wiki"));
    }

    #[test]
    fn city_comes_from_phrase_or_last_word() {
        assert_eq!(extract_city("weather in New York, US"), "New York, US");
        assert_eq!(extract_city("Weather Paris"), "Paris");
        assert_eq!(extract_city("forecast for Oslo"), "Oslo");
        assert_eq!(extract_city("forecast"), "forecast");
    }

    #[test]
    fn wiki_topic_strips_whole_trigger_phrase_not_just_first_word() {
        assert_eq!(wiki_topic("who is Ada Lovelace"), "Ada Lovelace");
        assert_ne!(wiki_topic("who is Ada Lovelace"), "is Ada Lovelace");
        assert_eq!(wiki_topic("What is the Rust language"), "the Rust language");
        assert_eq!(wiki_topic("tell me about Nikola Tesla"), "Nikola Tesla");
    }

    #[test]
    fn wiki_topic_drops_single_word_triggers() {
        assert_eq!(wiki_topic("wiki Alan Turing"), "Alan Turing");
        assert_eq!(wiki_topic("wikipedia"), "wikipedia");
        assert_eq!(wiki_topic("who is"), "is");
    }
}
