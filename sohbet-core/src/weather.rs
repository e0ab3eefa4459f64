//! Current-weather lookup against OpenWeather.
//!
//! Weather is an enrichment: any provider failure degrades to "no snapshot"
//! and is logged, never surfaced to the request.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::classify::fold;
use crate::errors::{PipelineError, PipelineResult};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherSource {
    PrimaryProvider,
    SearchFallback,
}

/// One observation, already converted to the units the context block prints.
#[derive(Debug, Clone)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: String,
    pub temperature_c: i32,
    pub feels_like_c: i32,
    pub humidity_pct: u8,
    pub description: String,
    pub wind_kph: i32,
    pub pressure_hpa: i32,
    pub source: WeatherSource,
}

/// Closed set of known city tokens, folded, mapped to a disambiguated
/// `City,CountryCode` query. Unknown tokens pass through unchanged.
const CITY_ALIASES: &[(&str, &str)] = &[
    ("istanbul", "Istanbul,TR"),
    ("ankara", "Ankara,TR"),
    ("izmir", "Izmir,TR"),
    ("bursa", "Bursa,TR"),
    ("antalya", "Antalya,TR"),
    ("erfurt", "Erfurt,DE"),
    ("berlin", "Berlin,DE"),
    ("munih", "Munich,DE"),
    ("frankfurt", "Frankfurt,DE"),
    ("hamburg", "Hamburg,DE"),
    ("koln", "Cologne,DE"),
];

/// Map a free-text city token to its disambiguated form, best effort.
#[must_use]
pub fn normalize_city(city: &str) -> String {
    let folded = fold(city.trim());
    CITY_ALIASES
        .iter()
        .find(|(token, _)| *token == folded)
        .map_or_else(|| city.trim().to_string(), |(_, alias)| (*alias).to_string())
}

/// Scan a prompt for any known city token.
#[must_use]
pub fn detect_city(prompt: &str) -> Option<&'static str> {
    let folded = fold(prompt);
    let words: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    CITY_ALIASES
        .iter()
        .find(|(token, _)| words.iter().any(|word| word == token))
        .map(|(token, _)| *token)
}

#[derive(Deserialize)]
struct OwmResponse {
    name: String,
    #[serde(default)]
    sys: OwmSys,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: OwmWind,
}

#[derive(Deserialize, Default)]
struct OwmSys {
    #[serde(default)]
    country: String,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Deserialize, Default)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

/// Meters per second to rounded kilometers per hour.
fn mps_to_kph(mps: f64) -> i32 {
    (mps * 3.6).round() as i32
}

impl OwmResponse {
    fn into_snapshot(self) -> WeatherSnapshot {
        WeatherSnapshot {
            city: self.name,
            country: self.sys.country,
            temperature_c: self.main.temp.round() as i32,
            feels_like_c: self.main.feels_like.round() as i32,
            humidity_pct: self.main.humidity.round().clamp(0.0, 100.0) as u8,
            description: self
                .weather
                .into_iter()
                .next()
                .map(|condition| condition.description)
                .unwrap_or_default(),
            wind_kph: mps_to_kph(self.wind.speed),
            pressure_hpa: self.main.pressure.round() as i32,
            source: WeatherSource::PrimaryProvider,
        }
    }
}

pub struct WeatherClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl WeatherClient {
    pub fn new(api_key: Option<String>) -> PipelineResult<Self> {
        let api_key = api_key.ok_or_else(|| {
            PipelineError::Configuration("OPENWEATHER_API_KEY is not set".to_string())
        })?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch the current snapshot for a free-text city name.
    ///
    /// Returns `None` on any provider failure.
    pub async fn fetch(&self, city: &str) -> Option<WeatherSnapshot> {
        let query = normalize_city(city);
        let url = format!("{}/data/2.5/weather", self.base_url);

        let response = match self
            .client
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "tr"),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(city = %query, %error, "weather request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(city = %query, %status, "weather provider returned non-success status");
            return None;
        }

        match response.json::<OwmResponse>().await {
            Ok(raw) => Some(raw.into_snapshot()),
            Err(error) => {
                warn!(city = %query, %error, "weather response body was malformed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wind_conversion_rounds_to_nearest_kph() {
        assert_eq!(mps_to_kph(10.0), 36);
        assert_eq!(mps_to_kph(3.2), 12);
        assert_eq!(mps_to_kph(0.0), 0);
    }

    #[test]
    fn known_cities_are_disambiguated() {
        assert_eq!(normalize_city("İstanbul"), "Istanbul,TR");
        assert_eq!(normalize_city("ERFURT"), "Erfurt,DE");
        assert_eq!(normalize_city("münih"), "Munich,DE");
    }

    #[test]
    fn unknown_cities_pass_through() {
        assert_eq!(normalize_city("Springfield"), "Springfield");
        assert_eq!(normalize_city("  Oslo "), "Oslo");
    }

    #[test]
    fn detects_city_token_inside_prompt() {
        assert_eq!(detect_city("İstanbul'da hava durumu nasıl?"), Some("istanbul"));
        assert_eq!(detect_city("bugün Berlin soğuk mu"), Some("berlin"));
        assert_eq!(detect_city("hava nasıl?"), None);
    }

    #[test]
    fn payload_converts_to_snapshot() {
        let raw: OwmResponse = serde_json::from_value(serde_json::json!({
            "name": "Istanbul",
            "sys": { "country": "TR" },
            "main": { "temp": 21.4, "feels_like": 20.6, "humidity": 55.0, "pressure": 1013.2 },
            "weather": [{ "description": "açık" }],
            "wind": { "speed": 3.2 }
        }))
        .unwrap();

        let snapshot = raw.into_snapshot();
        assert_eq!(snapshot.temperature_c, 21);
        assert_eq!(snapshot.feels_like_c, 21);
        assert_eq!(snapshot.humidity_pct, 55);
        assert_eq!(snapshot.description, "açık");
        assert_eq!(snapshot.wind_kph, 12);
        assert_eq!(snapshot.pressure_hpa, 1013);
        assert_eq!(snapshot.source, WeatherSource::PrimaryProvider);
    }
}
