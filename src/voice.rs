use anyhow::{anyhow, Result};
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::{VoiceConfig, VoicePreset};

const API_BASE: &str = "https://api.elevenlabs.io";

/// Synthesis failures, split by whether another attempt can help
#[derive(thiserror::Error, Debug)]
pub enum VoiceError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("service error {status}: {body}")]
    Service { status: u16, body: String },

    #[error("voiceover file was not created properly")]
    EmptyOutput,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            VoiceError::Timeout | VoiceError::Network(_) | VoiceError::Service { .. }
        )
    }
}

impl From<reqwest::Error> for VoiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            VoiceError::Timeout
        } else {
            VoiceError::Network(e.to_string())
        }
    }
}

/// ElevenLabs text-to-speech client with retry handling
pub struct VoiceSynthesizer {
    config: VoiceConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TtsRequest {
    text: String,
    model_id: String,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    speaker_boost: bool,
}

impl VoiceSynthesizer {
    pub fn new(config: VoiceConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("ElevenLabs API key required"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn endpoint_url(voice_id: &str) -> String {
        format!("{}/v1/text-to-speech/{}", API_BASE, voice_id)
    }

    fn request_body(&self, text: &str) -> TtsRequest {
        // The service rejects oversized payloads; cap on a char boundary
        let capped: String = text.chars().take(self.config.max_text_chars).collect();

        TtsRequest {
            text: capped,
            model_id: self.config.model_id.clone(),
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
                style: self.config.style,
                speaker_boost: self.config.speaker_boost,
            },
        }
    }

    /// Synthesize narration for the text, streaming the mp3 to `output_path`.
    ///
    /// Timeouts and transport errors are retried with a fixed delay; an empty
    /// response body is treated as fatal.
    pub async fn synthesize(
        &self,
        text: &str,
        preset: VoicePreset,
        output_path: &Path,
    ) -> Result<PathBuf> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("ElevenLabs API key not configured"))?;

        let url = Self::endpoint_url(preset.voice_id());
        let body = self.request_body(text);
        let max_retries = self.config.max_retries.max(1);
        let delay = Duration::from_secs(self.config.retry_delay_seconds);

        let url = url.as_str();
        let body = &body;
        run_with_retries(max_retries, delay, move |attempt| {
            info!(
                "🎙️ Generating voiceover with {} (attempt {}/{})",
                preset.label(),
                attempt,
                max_retries
            );
            self.try_synthesize(api_key, url, body, output_path)
        })
        .await
    }

    async fn try_synthesize(
        &self,
        api_key: &str,
        url: &str,
        body: &TtsRequest,
        output_path: &Path,
    ) -> std::result::Result<PathBuf, VoiceError> {
        let response = self
            .client
            .post(url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Service { status, body });
        }

        let mut file = tokio::fs::File::create(output_path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if written == 0 {
            return Err(VoiceError::EmptyOutput);
        }

        info!(
            "✅ Voiceover written: {} ({} bytes)",
            output_path.display(),
            written
        );
        Ok(output_path.to_path_buf())
    }

    /// Probe the account endpoint for the connection check
    pub async fn is_available(&self) -> bool {
        let api_key = match &self.config.api_key {
            Some(key) => key,
            None => return false,
        };

        match self
            .client
            .get(format!("{}/v1/user", API_BASE))
            .header("xi-api-key", api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Run an attempt up to `max_retries` times. Retryable failures wait out the
/// delay and try again; fatal failures and the last attempt's error propagate.
async fn run_with_retries<T, F, Fut>(
    max_retries: u32,
    delay: Duration,
    mut attempt_fn: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, VoiceError>>,
{
    let mut last_error = None;
    for attempt in 1..=max_retries {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                warn!("Voiceover attempt {} failed: {}", attempt, e);
                last_error = Some(e);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                // Fatal errors (empty output, io) and the final attempt land here
                warn!("Voiceover attempt {} failed: {}", attempt, e);
                last_error = Some(e);
                break;
            }
        }
    }

    Err(anyhow!(
        "Voiceover generation failed after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> VoiceConfig {
        VoiceConfig {
            api_key: Some("test-key".to_string()),
            model_id: "eleven_multilingual_v2".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.3,
            speaker_boost: true,
            max_text_chars: 5000,
            max_retries: 3,
            retry_delay_seconds: 5,
            timeout_seconds: 60,
        }
    }

    #[test]
    fn test_requires_api_key() {
        let mut config = test_config();
        config.api_key = None;
        assert!(VoiceSynthesizer::new(config).is_err());
    }

    #[test]
    fn test_endpoint_url_includes_voice_id() {
        let url = VoiceSynthesizer::endpoint_url(VoicePreset::YoungMale.voice_id());
        assert_eq!(
            url,
            "https://api.elevenlabs.io/v1/text-to-speech/g5CIjZEefAph4nQFvHAz"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let synth = VoiceSynthesizer::new(test_config()).unwrap();
        let body = synth.request_body("hello world");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["text"], "hello world");
        assert_eq!(json["model_id"], "eleven_multilingual_v2");
        assert_eq!(json["voice_settings"]["speaker_boost"], true);
        assert!(json["voice_settings"]["stability"].is_number());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(VoiceError::Timeout.is_retryable());
        assert!(VoiceError::Network("reset".to_string()).is_retryable());
        assert!(VoiceError::Service {
            status: 500,
            body: String::new()
        }
        .is_retryable());
        assert!(!VoiceError::EmptyOutput.is_retryable());
    }

    #[tokio::test]
    async fn test_retryable_failures_exhaust_all_attempts() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<PathBuf> =
            run_with_retries(3, Duration::from_millis(0), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(VoiceError::Timeout) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("after 3 attempts"));
    }

    #[tokio::test]
    async fn test_fatal_failure_stops_retrying() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<PathBuf> =
            run_with_retries(3, Duration::from_millis(0), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(VoiceError::EmptyOutput) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_then_success_returns_value() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = run_with_retries(3, Duration::from_millis(0), move |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(VoiceError::Timeout)
                } else {
                    Ok(PathBuf::from("voiceover.mp3"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), PathBuf::from("voiceover.mp3"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_text_capped_on_char_boundary() {
        let mut config = test_config();
        config.max_text_chars = 3;
        let synth = VoiceSynthesizer::new(config).unwrap();

        let body = synth.request_body("héllo");
        assert_eq!(body.text, "hél");
    }
}
