//! Web search augmentation against the Google Custom Search JSON API.
//!
//! One user query fans out into a fixed set of reformulated variants to
//! broaden recall. Variants run sequentially with a pause between calls to
//! respect the provider's rate limit; an individual variant failing only
//! costs its own results.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{PipelineError, PipelineResult};
use crate::weather::{normalize_city, WeatherSnapshot, WeatherSource};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
const VARIANT_PAUSE: Duration = Duration::from_millis(300);
const RESULTS_PER_VARIANT: u8 = 3;

pub const DEFAULT_RESULT_CAP: usize = 8;
pub const MIN_RESULT_CAP: usize = 4;

/// One search hit, trimmed to what the context block prints.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: Option<String>,
}

#[derive(Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Deserialize)]
struct CseItem {
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: Option<String>,
}

fn query_variants(query: &str) -> Vec<String> {
    vec![
        query.to_string(),
        format!("{query} company information"),
        format!("{query} firma şirket"),
        format!("\"{query}\" official website"),
        format!("{query} hakkında nedir kimdir"),
    ]
}

/// Keep the first occurrence of each title, then truncate to the cap.
fn dedupe_by_title(results: Vec<SearchResult>, cap: usize) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut deduped: Vec<SearchResult> = results
        .into_iter()
        .filter(|result| seen.insert(result.title.clone()))
        .collect();
    deduped.truncate(cap);
    deduped
}

pub struct SearchClient {
    api_key: String,
    engine_id: String,
    base_url: String,
    result_cap: usize,
    pause: Duration,
    client: Client,
}

impl SearchClient {
    pub fn new(api_key: Option<String>, engine_id: Option<String>) -> PipelineResult<Self> {
        let api_key = api_key.ok_or_else(|| {
            PipelineError::Configuration("GOOGLE_SEARCH_API_KEY is not set".to_string())
        })?;
        let engine_id = engine_id.ok_or_else(|| {
            PipelineError::Configuration("SEARCH_ENGINE_ID is not set".to_string())
        })?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            api_key,
            engine_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            result_cap: DEFAULT_RESULT_CAP,
            pause: VARIANT_PAUSE,
            client,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_result_cap(mut self, cap: usize) -> Self {
        self.result_cap = cap.clamp(MIN_RESULT_CAP, DEFAULT_RESULT_CAP);
        self
    }

    /// Shorten the inter-variant pause. Tests use this to avoid real waits.
    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Run the full variant fan-out and merge the results.
    ///
    /// Empty output means no variant succeeded or nothing was found.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let variants = query_variants(query);
        let last = variants.len() - 1;
        let mut merged = Vec::new();

        for (index, variant) in variants.iter().enumerate() {
            match self.run_query(variant).await {
                Ok(results) => merged.extend(results),
                Err(error) => {
                    debug!(variant = %variant, %error, "search variant failed");
                }
            }
            if index < last {
                tokio::time::sleep(self.pause).await;
            }
        }

        dedupe_by_title(merged, self.result_cap)
    }

    /// Weather-flavored fallback: restrict to meteorological domains and
    /// accept only a hit that actually carries a temperature symbol.
    pub async fn search_weather(&self, city: &str) -> Option<WeatherSnapshot> {
        let place = normalize_city(city);
        let query =
            format!("{place} hava durumu site:mgm.gov.tr OR site:weather.com OR site:wetter.com");

        let results = match self.run_query(&query).await {
            Ok(results) => results,
            Err(error) => {
                debug!(%city, %error, "weather search fallback failed");
                return None;
            }
        };

        results
            .into_iter()
            .find(|result| result.title.contains('°') || result.snippet.contains('°'))
            .map(|result| snapshot_from_result(&place, &result))
    }

    async fn run_query(&self, query: &str) -> PipelineResult<Vec<SearchResult>> {
        let url = format!("{}/customsearch/v1", self.base_url);
        let num = RESULTS_PER_VARIANT.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("hl", "tr-TR"),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Status(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }

        let body: CseResponse = response.json().await?;
        Ok(body
            .items
            .into_iter()
            .map(|item| SearchResult {
                title: item.title,
                snippet: item.snippet,
                link: item.link,
            })
            .collect())
    }
}

/// Build a degraded snapshot out of an accepted search hit. Only the fields
/// the hit actually carries are meaningful; the description holds the full
/// snippet so nothing is lost in rendering.
fn snapshot_from_result(place: &str, result: &SearchResult) -> WeatherSnapshot {
    let (city, country) = place
        .split_once(',')
        .map_or((place, ""), |(city, country)| (city, country));
    let temperature = extract_temperature(&result.title)
        .or_else(|| extract_temperature(&result.snippet))
        .unwrap_or_default();

    WeatherSnapshot {
        city: city.to_string(),
        country: country.to_string(),
        temperature_c: temperature,
        feels_like_c: temperature,
        humidity_pct: 0,
        description: format!("{}: {}", result.title, result.snippet),
        wind_kph: 0,
        pressure_hpa: 0,
        source: WeatherSource::SearchFallback,
    }
}

/// Pull the integer immediately preceding the first `°` out of a snippet.
fn extract_temperature(text: &str) -> Option<i32> {
    let degree = text.find('°')?;
    let prefix = &text[..degree];
    let digits: String = prefix
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit() || *c == '-')
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}
