//! Environment-variable configuration.
//!
//! Read once at process startup. Credential parsing and key normalization
//! happen here, not per request; the key material cannot change without a
//! restart. Optional features (weather, search, speech) simply stay
//! unconfigured when their variables are absent.

use std::env;

use crate::classify::AugmentationPolicy;
use crate::context::default_persona;
use crate::credentials::ServiceCredential;
use crate::errors::{PipelineError, PipelineResult};
use crate::generate::{GeminiAuth, GenerationOptions, DEFAULT_MODEL};
use crate::search::{DEFAULT_RESULT_CAP, MIN_RESULT_CAP};

pub const SERVICE_ACCOUNT_VAR: &str = "GCP_SERVICE_ACCOUNT_JSON";
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Clone)]
pub struct PipelineConfig {
    /// Generation credential; `None` means the mandatory credential is
    /// missing and the pipeline cannot be constructed.
    pub generation: Option<GeminiAuth>,
    pub model_id: String,
    pub generation_options: GenerationOptions,
    pub weather_api_key: Option<String>,
    pub search_api_key: Option<String>,
    pub search_engine_id: Option<String>,
    pub tts_api_key: Option<String>,
    pub location_label: String,
    pub default_city: String,
    pub persona: String,
    pub search_result_cap: usize,
    pub policy: AugmentationPolicy,
}

impl PipelineConfig {
    pub fn from_env() -> PipelineResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary lookup so tests never touch the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PipelineResult<Self> {
        let generation = match lookup(SERVICE_ACCOUNT_VAR) {
            Some(blob) => Some(GeminiAuth::ServiceAccount(ServiceCredential::from_json(
                &blob,
            )?)),
            None => lookup(API_KEY_VAR).map(GeminiAuth::ApiKey),
        };

        let generation_options = GenerationOptions {
            max_output_tokens: parse_var(&lookup, "GENERATION_MAX_TOKENS")?,
            temperature: parse_var(&lookup, "GENERATION_TEMPERATURE")?,
            top_p: parse_var(&lookup, "GENERATION_TOP_P")?,
        };

        let policy = if lookup("SEARCH_ALWAYS")
            .is_some_and(|value| matches!(value.trim(), "true" | "1"))
        {
            AugmentationPolicy::Always
        } else {
            AugmentationPolicy::Classified
        };

        let search_result_cap = parse_var(&lookup, "SEARCH_RESULT_CAP")?
            .unwrap_or(DEFAULT_RESULT_CAP)
            .clamp(MIN_RESULT_CAP, DEFAULT_RESULT_CAP);

        Ok(Self {
            generation,
            model_id: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            generation_options,
            weather_api_key: lookup("OPENWEATHER_API_KEY"),
            search_api_key: lookup("GOOGLE_SEARCH_API_KEY"),
            search_engine_id: lookup("SEARCH_ENGINE_ID"),
            tts_api_key: lookup("GOOGLE_TTS_API_KEY"),
            location_label: lookup("ASSISTANT_LOCATION")
                .unwrap_or_else(|| "Türkiye/Almanya".to_string()),
            default_city: lookup("DEFAULT_WEATHER_CITY").unwrap_or_else(|| "erfurt".to_string()),
            persona: lookup("ASSISTANT_PERSONA").unwrap_or_else(default_persona),
            search_result_cap,
            policy,
        })
    }

    /// The error a request must surface when the generation credential is
    /// absent.
    #[must_use]
    pub fn missing_generation_credential() -> PipelineError {
        PipelineError::Configuration(format!(
            "set {SERVICE_ACCOUNT_VAR} or {API_KEY_VAR}"
        ))
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> PipelineResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|error| {
                PipelineError::Configuration(format!("{key} is not a valid value: {error}"))
            })
        })
        .transpose()
}
