//! The request pipeline: classify, enrich, assemble, generate.
//!
//! Enrichment is strictly best-effort. Only the generation call itself can
//! fail a request.

use chrono::Local;
use tracing::debug;

use crate::classify::{classify, AugmentationPolicy, QueryIntent};
use crate::config::PipelineConfig;
use crate::context::{assemble_prompt, PromptContext};
use crate::errors::{PipelineError, PipelineResult};
use crate::generate::{GeminiGenerator, TextGenerator};
use crate::search::SearchClient;
use crate::weather::{detect_city, WeatherClient};

pub struct AssistPipeline {
    policy: AugmentationPolicy,
    weather: Option<WeatherClient>,
    search: Option<SearchClient>,
    location_label: String,
    default_city: String,
    persona: String,
    generator: Box<dyn TextGenerator>,
}

impl AssistPipeline {
    /// Build the full pipeline from configuration, including the Gemini
    /// generator. Fails when the mandatory generation credential is absent.
    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let auth = config
            .generation
            .clone()
            .ok_or_else(PipelineConfig::missing_generation_credential)?;
        let generator =
            GeminiGenerator::new(&config.model_id, auth, config.generation_options.clone())?;
        Self::with_generator(config, Box::new(generator))
    }

    /// Build the pipeline around an externally supplied generator.
    pub fn with_generator(
        config: &PipelineConfig,
        generator: Box<dyn TextGenerator>,
    ) -> PipelineResult<Self> {
        let weather = config
            .weather_api_key
            .clone()
            .map(|key| WeatherClient::new(Some(key)))
            .transpose()?;

        let search = match (
            config.search_api_key.clone(),
            config.search_engine_id.clone(),
        ) {
            (Some(key), Some(engine_id)) => Some(
                SearchClient::new(Some(key), Some(engine_id))?
                    .with_result_cap(config.search_result_cap),
            ),
            _ => None,
        };

        Ok(Self {
            policy: config.policy,
            weather,
            search,
            location_label: config.location_label.clone(),
            default_city: config.default_city.clone(),
            persona: config.persona.clone(),
            generator,
        })
    }

    /// Replace the weather client. Tests point it at a local mock.
    #[must_use]
    pub fn with_weather_client(mut self, client: Option<WeatherClient>) -> Self {
        self.weather = client;
        self
    }

    /// Replace the search client. Tests point it at a local mock.
    #[must_use]
    pub fn with_search_client(mut self, client: Option<SearchClient>) -> Self {
        self.search = client;
        self
    }

    /// Answer one prompt: classify, enrich, assemble, generate.
    pub async fn answer(&self, prompt: &str) -> PipelineResult<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(PipelineError::InvalidInput("prompt is empty".to_string()));
        }

        let intent = classify(prompt);
        debug!(?intent, "classified prompt");

        let mut context = PromptContext::new(Local::now().naive_local(), &self.location_label);
        self.enrich(&mut context, intent, prompt).await;

        let assembled = assemble_prompt(&self.persona, &context.render(), prompt);
        self.generator.generate(&assembled).await
    }

    async fn enrich(&self, context: &mut PromptContext, intent: QueryIntent, prompt: &str) {
        match intent {
            QueryIntent::Weather => {
                context.augmentation_attempted = true;
                let city = detect_city(prompt)
                    .map_or_else(|| self.default_city.clone(), str::to_string);

                if let Some(client) = &self.weather {
                    context.weather = client.fetch(&city).await;
                }
                if context.weather.is_none() {
                    if let Some(search) = &self.search {
                        context.weather = search.search_weather(&city).await;
                    }
                }
            }
            QueryIntent::Search => {
                context.augmentation_attempted = true;
                if let Some(search) = &self.search {
                    context.search_results = search.search(prompt).await;
                }
            }
            QueryIntent::NoAugmentation => {
                if self.policy == AugmentationPolicy::Always {
                    if let Some(search) = &self.search {
                        context.augmentation_attempted = true;
                        context.search_results = search.search(prompt).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::API_KEY_VAR;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingGenerator {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> PipelineResult<String> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok("tamam".to_string())
        }
    }

    fn bare_config() -> PipelineConfig {
        PipelineConfig::from_lookup(|key| {
            (key == API_KEY_VAR).then(|| "key-123".to_string())
        })
        .unwrap()
    }

    fn pipeline_with_recorder(config: &PipelineConfig) -> (AssistPipeline, RecordingGenerator) {
        let generator = RecordingGenerator::default();
        (
            AssistPipeline::with_generator(config, Box::new(generator.clone())).unwrap(),
            generator,
        )
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_any_call() {
        let (pipeline, generator) = pipeline_with_recorder(&bare_config());
        let error = pipeline.answer("   ").await.unwrap_err();
        assert!(matches!(error, PipelineError::InvalidInput(_)));
        assert!(generator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn weather_prompt_without_providers_still_carries_the_note() {
        let (pipeline, generator) = pipeline_with_recorder(&bare_config());
        pipeline.answer("İstanbul'da hava durumu nasıl?").await.unwrap();

        let seen = generator.seen.lock().unwrap();
        let submitted = &seen[0];
        assert!(submitted.contains("Güncel bilgi bulunamadı"), "{submitted}");
        assert!(submitted.contains("SORU: \"İstanbul'da hava durumu nasıl?\""));
    }

    #[tokio::test]
    async fn plain_prompt_under_classified_policy_is_not_augmented() {
        let (pipeline, generator) = pipeline_with_recorder(&bare_config());
        pipeline.answer("bana bir fıkra yazar mısın").await.unwrap();

        let seen = generator.seen.lock().unwrap();
        let submitted = &seen[0];
        assert!(!submitted.contains("Güncel bilgi bulunamadı"));
        assert!(!submitted.contains("ARAŞTIRMA SONUÇLARI"));
        assert!(submitted.contains("Tarih:"));
        assert!(submitted.contains("Mevsim:"));
    }

    #[tokio::test]
    async fn always_policy_without_search_client_stays_quiet() {
        let mut config = bare_config();
        config.policy = AugmentationPolicy::Always;
        let (pipeline, generator) = pipeline_with_recorder(&config);
        pipeline.answer("merhaba").await.unwrap();

        let seen = generator.seen.lock().unwrap();
        assert!(!seen[0].contains("Güncel bilgi bulunamadı"));
    }
}
