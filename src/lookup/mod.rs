//! Network-backed collaborators: geocoding, current weather and encyclopedia
//! summaries. A lookup that finds nothing returns `Ok(None)`; only transport
//! and decoding failures are errors.

pub mod open_meteo;
pub mod wikipedia;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;

pub use open_meteo::OpenMeteoClient;
pub use wikipedia::WikipediaClient;

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
}

/// Readings stay the JSON numbers the forecast API sent, so an integral
/// reading prints without a fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub temperature: serde_json::Number,
    pub windspeed: serde_json::Number,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub extract: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub place: Place,
    pub weather: CurrentWeather,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    InvalidUrl(String),
    Transport(String),
    Parse(String),
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(msg) => write!(f, "lookup url error: {msg}"),
            Self::Transport(msg) => write!(f, "lookup transport error: {msg}"),
            Self::Parse(msg) => write!(f, "lookup parse error: {msg}"),
        }
    }
}

impl Error for LookupError {}

pub type LookupResult<T> = std::result::Result<T, LookupError>;

pub trait Geocoder {
    fn geocode(&self, city: &str) -> impl Future<Output = LookupResult<Option<Place>>> + Send;
}

pub trait WeatherSource {
    fn current_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = LookupResult<Option<CurrentWeather>>> + Send;
}

pub trait Encyclopedia {
    fn summary(&self, topic: &str) -> impl Future<Output = LookupResult<Option<Summary>>> + Send;
}

/// Geocodes `city` and fetches its current weather.
pub async fn weather_now<G, W>(
    geocoder: &G,
    source: &W,
    city: &str,
) -> LookupResult<Option<WeatherReport>>
where
    G: Geocoder,
    W: WeatherSource,
{
    let Some(place) = geocoder.geocode(city).await? else {
        return Ok(None);
    };
    let Some(weather) = source
        .current_weather(place.latitude, place.longitude)
        .await?
    else {
        return Ok(None);
    };
    Ok(Some(WeatherReport { place, weather }))
}
