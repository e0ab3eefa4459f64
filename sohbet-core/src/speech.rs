//! Speech synthesis against the Google Cloud text-to-speech endpoint.
//!
//! The premium neural voice is tried first; if the provider rejects it the
//! call is retried once with the standard voice before giving up.

use std::time::Duration;

use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{PipelineError, PipelineResult};

const DEFAULT_BASE_URL: &str = "https://texttospeech.googleapis.com";

/// Named quality level offered by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTier {
    Premium,
    Standard,
}

struct VoiceProfile {
    name: &'static str,
    speaking_rate: f64,
    pitch: f64,
    volume_gain_db: f64,
}

impl VoiceTier {
    fn profile(self) -> VoiceProfile {
        match self {
            Self::Premium => VoiceProfile {
                name: "tr-TR-Wavenet-E",
                speaking_rate: 1.05,
                pitch: -1.0,
                volume_gain_db: 2.0,
            },
            Self::Standard => VoiceProfile {
                name: "tr-TR-Standard-A",
                speaking_rate: 1.0,
                pitch: 0.0,
                volume_gain_db: 0.0,
            },
        }
    }

    fn fallback(self) -> Option<Self> {
        match self {
            Self::Premium => Some(Self::Standard),
            Self::Standard => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection {
    language_code: &'static str,
    name: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f64,
    pitch: f64,
    volume_gain_db: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

/// Synthesized audio plus the voice that actually produced it.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub audio_content: String,
    pub voice_used: String,
}

impl SpeechAudio {
    /// Decode the base64 payload into raw audio bytes.
    pub fn audio_bytes(&self) -> PipelineResult<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.audio_content)
            .map_err(|error| {
                PipelineError::SynthesisFailed(format!("audio payload is not valid base64: {error}"))
            })
    }
}

pub struct SpeechClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl SpeechClient {
    pub fn new(api_key: Option<String>) -> PipelineResult<Self> {
        let api_key = api_key.ok_or_else(|| {
            PipelineError::Configuration("GOOGLE_TTS_API_KEY is not set".to_string())
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

    /// Synthesize text, falling back from the premium to the standard voice
    /// once before failing.
    pub async fn synthesize(&self, text: &str) -> PipelineResult<SpeechAudio> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidInput("text is empty".to_string()));
        }

        let mut tier = VoiceTier::Premium;
        loop {
            match self.attempt(text, tier).await {
                Ok(audio) => return Ok(audio),
                Err(error) => match tier.fallback() {
                    Some(next) => {
                        warn!(
                            voice = tier.profile().name,
                            %error,
                            "voice tier rejected, retrying with fallback"
                        );
                        tier = next;
                    }
                    None => {
                        return Err(PipelineError::SynthesisFailed(format!(
                            "both voice tiers rejected: {error}"
                        )));
                    }
                },
            }
        }
    }

    async fn attempt(&self, text: &str, tier: VoiceTier) -> PipelineResult<SpeechAudio> {
        let profile = tier.profile();
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: "tr-TR",
                name: profile.name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: profile.speaking_rate,
                pitch: profile.pitch,
                volume_gain_db: profile.volume_gain_db,
            },
        };

        let url = format!("{}/v1/text:synthesize", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Status(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }

        let body: SynthesizeResponse = response.json().await?;
        if body.audio_content.is_empty() {
            return Err(PipelineError::Status(
                status,
                "provider returned no audio content".to_string(),
            ));
        }

        Ok(SpeechAudio {
            audio_content: body.audio_content,
            voice_used: profile.name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_falls_back_to_standard_once() {
        assert_eq!(VoiceTier::Premium.fallback(), Some(VoiceTier::Standard));
        assert_eq!(VoiceTier::Standard.fallback(), None);
    }

    #[test]
    fn profiles_carry_tier_tuning() {
        let premium = VoiceTier::Premium.profile();
        assert_eq!(premium.name, "tr-TR-Wavenet-E");
        assert!(premium.speaking_rate > 1.0);

        let standard = VoiceTier::Standard.profile();
        assert_eq!(standard.name, "tr-TR-Standard-A");
        assert_eq!(standard.pitch, 0.0);
    }

    #[test]
    fn synthesize_request_shape() {
        let profile = VoiceTier::Standard.profile();
        let request = SynthesizeRequest {
            input: SynthesisInput { text: "merhaba" },
            voice: VoiceSelection {
                language_code: "tr-TR",
                name: profile.name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: profile.speaking_rate,
                pitch: profile.pitch,
                volume_gain_db: profile.volume_gain_db,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["input"]["text"], "merhaba");
        assert_eq!(value["voice"]["languageCode"], "tr-TR");
        assert_eq!(value["voice"]["name"], "tr-TR-Standard-A");
        assert_eq!(value["audioConfig"]["audioEncoding"], "MP3");
    }

    #[test]
    fn audio_bytes_round_trip() {
        let audio = SpeechAudio {
            audio_content: base64::engine::general_purpose::STANDARD.encode(b"mp3-bytes"),
            voice_used: "tr-TR-Standard-A".to_string(),
        };
        assert_eq!(audio.audio_bytes().unwrap(), b"mp3-bytes");

        let bad = SpeechAudio {
            audio_content: "not base64!!!".to_string(),
            voice_used: "tr-TR-Standard-A".to_string(),
        };
        assert!(bad.audio_bytes().is_err());
    }
}
