use std::sync::Arc;

use serde::Serialize;
use sohbet_core::config::PipelineConfig;
use sohbet_core::pipeline::AssistPipeline;
use sohbet_core::speech::SpeechClient;
use sohbet_core::PipelineResult;
use tracing::warn;

/// Which optional enrichments are configured. Booleans only; no key
/// material ever leaves the process.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Features {
    pub weather: bool,
    pub search: bool,
    pub speech: bool,
}

/// Shared, read-only application state. Credentials are parsed and
/// normalized exactly once, here; requests only borrow the result.
#[derive(Clone)]
pub struct AppState {
    /// The answer pipeline, or the startup error to surface on every
    /// `/api/ask` call when the generation credential is missing.
    pub pipeline: Result<Arc<AssistPipeline>, String>,
    pub speech: Option<Arc<SpeechClient>>,
    pub features: Features,
}

impl AppState {
    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let pipeline = match AssistPipeline::from_config(config) {
            Ok(pipeline) => Ok(Arc::new(pipeline)),
            Err(error) => {
                warn!(%error, "answer pipeline unavailable");
                Err(error.to_string())
            }
        };

        let speech = match &config.tts_api_key {
            Some(key) => Some(Arc::new(SpeechClient::new(Some(key.clone()))?)),
            None => None,
        };

        let features = Features {
            weather: config.weather_api_key.is_some(),
            search: config.search_api_key.is_some() && config.search_engine_id.is_some(),
            speech: speech.is_some(),
        };

        Ok(Self {
            pipeline,
            speech,
            features,
        })
    }
}
