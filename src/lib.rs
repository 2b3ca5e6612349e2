pub mod calc;
pub mod cli;
pub mod config;
pub mod http;
pub mod lookup;
pub mod router;
pub mod trace;
pub mod units;

use anyhow::{Result, anyhow};
use cli::{AppState, CliArgs, Theme, run_repl};
use config::AppConfig;
use http::client::HttpClient;
use http::debug::HttpDebugConfig;
use lookup::{OpenMeteoClient, WikipediaClient};
use router::{IntentRouter, LiveRouter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use trace::SessionTrace;
use units::UnitRegistry;

const USER_AGENT: &str = concat!("askbox/", env!("CARGO_PKG_VERSION"));

pub async fn run(args: CliArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    let session_id = generate_session_id();
    let trace = SessionTrace::create(&session_id)?;
    let router = build_router(
        &config,
        HttpDebugConfig::from_verbose(args.verbose),
        trace.clone(),
    )?;

    if let Some(text) = args.once.as_deref() {
        trace.log_input(text);
        let result = router.route(text).await;
        trace.log_reply(result.kind.as_str(), &result.message);
        println!("{}", result.message);
        return Ok(());
    }

    let theme = Theme::new(config.color && !args.no_color);
    let mut app_state = AppState::new(router, trace, theme);
    run_repl(&mut app_state).await
}

fn build_router(
    config: &AppConfig,
    debug: HttpDebugConfig,
    trace: SessionTrace,
) -> Result<LiveRouter> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|err| anyhow!("Failed to build HTTP client: {err}"))?;
    let http = HttpClient::new(client, debug).with_trace(trace.clone());

    let open_meteo = OpenMeteoClient::new(
        http.clone(),
        &config.geocoding_base_url,
        &config.weather_base_url,
    );
    let wikipedia = WikipediaClient::new(http, &config.encyclopedia_base_url);

    Ok(IntentRouter::new(
        UnitRegistry::new(),
        open_meteo.clone(),
        open_meteo,
        wikipedia,
    )
    .with_trace(trace))
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::{build_router, generate_session_id};
    use crate::config::AppConfig;
    use crate::http::debug::HttpDebugConfig;
    use crate::router::IntentKind;
    use crate::trace::SessionTrace;
    use serde_json::json;
    use std::fs;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn generated_session_id_has_expected_shape() {
        let session_id = generate_session_id();
        let mut parts = session_id.split('-');
        let ts = parts.next().expect("timestamp segment");
        let pid = parts.next().expect("pid segment");
        assert!(
            parts.next().is_none(),
            "session id should contain one delimiter"
        );
        assert!(
            ts.chars().all(|ch| ch.is_ascii_hexdigit()),
            "timestamp segment should be hex"
        );
        assert!(
            pid.chars().all(|ch| ch.is_ascii_hexdigit()),
            "pid segment should be hex"
        );
    }

    #[tokio::test]
    async fn built_router_reaches_configured_services() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Oslo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"name": "Oslo", "latitude": 59.91, "longitude": 10.75, "country": "Norway"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current_weather": {"temperature": -3.5, "windspeed": 12.0, "time": "2025-01-10T08:00"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Nikola%20Tesla"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Nikola Tesla",
                "extract": "Serbian-American inventor."
            })))
            .mount(&server)
            .await;

        let config = AppConfig {
            geocoding_base_url: server.uri(),
            weather_base_url: server.uri(),
            encyclopedia_base_url: server.uri(),
            ..AppConfig::default()
        };
        let dir = tempfile::tempdir().expect("tempdir");
        let trace = SessionTrace::create_in_temp_dir("lib", dir.path()).expect("trace");
        let router =
            build_router(&config, HttpDebugConfig::disabled(), trace.clone()).expect("router");

        let weather = router.route("weather in Oslo").await;
        assert_eq!(weather.kind, IntentKind::Weather);
        assert_eq!(
            weather.message,
            "Weather in Oslo, Norway: -3.5°C, wind 12.0 km/h (as of 2025-01-10T08:00)."
        );

        let wiki = router.route("who is Nikola Tesla").await;
        assert_eq!(wiki.message, "Nikola Tesla — Serbian-American inventor.");

        let trace_text = fs::read_to_string(trace.file_path()).expect("read trace");
        assert!(trace_text.contains("[http.out   ] GET "));
        assert!(trace_text.contains("name=Oslo"));
        assert!(trace_text.contains("[route      ] weather"));
    }
}
