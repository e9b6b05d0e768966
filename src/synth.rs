//! Speech synthesis — one blocking request to a cloud TTS endpoint.
//!
//! The service is reached through the [`SpeechSynthesizer`] trait so the job
//! worker can be driven by a fake in tests. [`OpenAiSpeech`] talks to an
//! OpenAI-compatible `POST /audio/speech` endpoint and streams the WAV reply
//! straight to disk.

use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::{debug, info};

use crate::{error::CallbenchError, request::Voice};

/// Default TTS model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-tts";

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Uncompressed format requested from the service.
const RESPONSE_FORMAT: &str = "wav";

/// A text-to-speech backend.
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice` and write the raw audio file to `dest`.
    ///
    /// Blocks until the whole response has been written. Any failure is
    /// reported as [`CallbenchError::Synthesis`]; there is no retry.
    fn synthesize(
        &self,
        text: &str,
        voice: Voice,
        api_key: &str,
        dest: &Path,
    ) -> Result<(), CallbenchError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible HTTP backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// HTTP client for `POST {api_base}/audio/speech`.
#[derive(Debug, Clone)]
pub struct OpenAiSpeech {
    api_base: String,
    model: String,
    agent: ureq::Agent,
}

impl OpenAiSpeech {
    pub fn new(api_base: impl Into<String>, model: impl Into<String>) -> Self {
        // Non-2xx replies are read so the service's own message reaches the user.
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { api_base: api_base.into(), model: model.into(), agent }
    }

    /// Full endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("{}/audio/speech", self.api_base.trim_end_matches('/'))
    }

    fn request(&self, text: &str, voice: Voice, api_key: &str, dest: &Path) -> anyhow::Result<u64> {
        let url = self.endpoint();
        let body = SpeechRequest {
            model: &self.model,
            voice: voice.id(),
            input: text,
            response_format: RESPONSE_FORMAT,
        };
        debug!(url = %url, model = %self.model, voice = %voice, chars = text.chars().count(), "speech request");

        let mut resp = self
            .agent
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .send_json(&body)
            .with_context(|| format!("Request to {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.body_mut().read_to_string().unwrap_or_default();
            bail!("Speech service answered {}: {}", status, detail.trim());
        }

        let file = File::create(dest)
            .with_context(|| format!("Cannot create {}", dest.display()))?;
        let mut writer = BufWriter::new(file);
        let mut reader = resp.into_body().into_reader();
        let written = std::io::copy(&mut reader, &mut writer)
            .context("Speech response stream interrupted")?;
        Ok(written)
    }
}

impl Default for OpenAiSpeech {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, DEFAULT_MODEL)
    }
}

impl SpeechSynthesizer for OpenAiSpeech {
    fn synthesize(
        &self,
        text: &str,
        voice: Voice,
        api_key: &str,
        dest: &Path,
    ) -> Result<(), CallbenchError> {
        let bytes = self
            .request(text, voice, api_key, dest)
            .map_err(CallbenchError::Synthesis)?;
        info!(bytes, path = %dest.display(), "voice audio received");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        let s = OpenAiSpeech::new("http://localhost:8000/v1/", "m");
        assert_eq!(s.endpoint(), "http://localhost:8000/v1/audio/speech");
        assert_eq!(OpenAiSpeech::default().endpoint(), "https://api.openai.com/v1/audio/speech");
    }

    #[test]
    fn test_request_body_shape() {
        let body = SpeechRequest {
            model: DEFAULT_MODEL,
            voice: Voice::Marin.id(),
            input: "Hallo",
            response_format: RESPONSE_FORMAT,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini-tts",
                "voice": "marin",
                "input": "Hallo",
                "response_format": "wav",
            })
        );
    }

    #[test]
    fn test_unreachable_service_is_synthesis_error() {
        let dir = tempfile::tempdir().unwrap();
        // Port 9 (discard) on localhost is closed on test machines.
        let s = OpenAiSpeech::new("http://127.0.0.1:9/v1", DEFAULT_MODEL);
        let err = s
            .synthesize("Hallo", Voice::Nova, "sk-test", &dir.path().join("v.wav"))
            .unwrap_err();
        assert!(matches!(err, CallbenchError::Synthesis(_)));
    }
}
