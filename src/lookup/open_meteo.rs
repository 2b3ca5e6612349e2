use serde::Deserialize;
use serde_json::{Number, Value};

use super::{CurrentWeather, Geocoder, LookupError, LookupResult, Place, WeatherSource};
use crate::http::client::HttpClient;

/// Open-Meteo geocoding and forecast APIs. Both are keyless.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: HttpClient,
    geocoding_base_url: String,
    weather_base_url: String,
}

impl OpenMeteoClient {
    pub fn new(http: HttpClient, geocoding_base_url: &str, weather_base_url: &str) -> Self {
        Self {
            http,
            geocoding_base_url: geocoding_base_url.trim_end_matches('/').to_string(),
            weather_base_url: weather_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> LookupResult<Option<String>> {
        let response = self
            .http
            .get(url, query)
            .await
            .map_err(|err| LookupError::Transport(err.to_string()))?;
        if !response.is_ok() {
            return Ok(None);
        }
        Ok(Some(response.body))
    }
}

impl Geocoder for OpenMeteoClient {
    async fn geocode(&self, city: &str) -> LookupResult<Option<Place>> {
        let url = format!("{}/v1/search", self.geocoding_base_url);
        let Some(body) = self.fetch(&url, &[("name", city), ("count", "1")]).await? else {
            return Ok(None);
        };

        let parsed = serde_json::from_str::<GeocodingResponse>(&body)
            .map_err(|err| LookupError::Parse(err.to_string()))?;
        let place = parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|top| Place {
                name: top.name,
                latitude: top.latitude,
                longitude: top.longitude,
                country: top.country,
            });
        Ok(place)
    }
}

impl WeatherSource for OpenMeteoClient {
    async fn current_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> LookupResult<Option<CurrentWeather>> {
        let url = format!("{}/v1/forecast", self.weather_base_url);
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();
        let query = [
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("current_weather", "true"),
        ];
        let Some(body) = self.fetch(&url, &query).await? else {
            return Ok(None);
        };

        let parsed = serde_json::from_str::<ForecastResponse>(&body)
            .map_err(|err| LookupError::Parse(err.to_string()))?;
        // An empty `current_weather` object counts as no data.
        let current = match parsed.current_weather {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(map)) if map.is_empty() => return Ok(None),
            Some(value) => value,
        };
        let current = serde_json::from_value::<CurrentWeatherBody>(current)
            .map_err(|err| LookupError::Parse(err.to_string()))?;
        Ok(Some(CurrentWeather {
            temperature: current.temperature,
            windspeed: current.windspeed,
            time: current.time,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current_weather: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherBody {
    temperature: Number,
    windspeed: Number,
    time: String,
}
