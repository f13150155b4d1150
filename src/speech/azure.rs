//! Azure speech service client over its REST endpoints.

use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::escape::escape;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::backend::{Credential, SpeechBackend, SynthesisRequest, SynthesizedAudio};
use super::catalog::VoiceDescriptor;
use super::error::TtsError;
use super::resolver::VoiceConfig;
use super::token::AuthToken;
use crate::audio::util::pcm16_to_f32;
use crate::config::SpeechSettings;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";

/// Raw little-endian PCM keeps decoding trivial.
const OUTPUT_FORMAT: &str = "raw-24khz-16bit-mono-pcm";
const OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Client for token issuance, voice listing and synthesis.
pub struct AzureSpeechClient {
    http: reqwest::Client,  // Shared connection pool with a request timeout
    token_url: String,      // Token issuance endpoint
    voices_url: String,     // Voice listing endpoint
    synthesis_url: String,  // Synthesis endpoint for catalog/default voices
    default_voice: String,  // Voice for `VoiceConfig::Default`
    default_locale: String, // Locale for `VoiceConfig::Default`
}

impl AzureSpeechClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &SpeechSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("chat-tts/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            token_url: settings.token_url.clone(),
            voices_url: settings.voices_url.clone(),
            synthesis_url: settings.synthesis_url.clone(),
            default_voice: settings.default_voice.clone(),
            default_locale: settings.default_locale.clone(),
        })
    }

    /// Target URL, language and voice name for a voice configuration.
    fn target<'a>(&'a self, voice: &'a VoiceConfig) -> (&'a str, &'a str, &'a str) {
        match voice {
            VoiceConfig::CustomEndpoint { endpoint_url, language, model_voice_name, .. } => (endpoint_url.as_str(), language.as_str(), model_voice_name.as_str()),
            VoiceConfig::CatalogVoice { locale, voice_name } => (self.synthesis_url.as_str(), locale.as_str(), voice_name.as_str()),
            VoiceConfig::Default => (self.synthesis_url.as_str(), self.default_locale.as_str(), self.default_voice.as_str()),
        }
    }
}

#[async_trait]
impl SpeechBackend for AzureSpeechClient {
    async fn issue_token(&self, subscription_key: &str) -> Result<String, TtsError> {
        let response = self
            .http
            .post(&self.token_url)
            .header(SUBSCRIPTION_KEY_HEADER, subscription_key)
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(|e| TtsError::AuthBackend(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TtsError::AuthBackend(format!("HTTP {} (expired subscription key or service outage)", status)));
        }

        response.text().await.map_err(|e| TtsError::AuthBackend(describe(&e)))
    }

    async fn list_voices(&self, token: &AuthToken) -> Result<Vec<VoiceDescriptor>, TtsError> {
        let response = self
            .http
            .get(&self.voices_url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| TtsError::BackendUnavailable(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TtsError::BackendUnavailable(format!("voice listing returned HTTP {}", status)));
        }

        response
            .json::<Vec<VoiceDescriptor>>()
            .await
            .map_err(|e| TtsError::BackendUnavailable(format!("malformed voice listing: {}", e)))
    }

    async fn synthesize(&self, request: &SynthesisRequest, credential: &Credential) -> Result<SynthesizedAudio, TtsError> {
        let (url, language, voice_name) = self.target(&request.voice);
        let ssml = build_ssml(language, voice_name, &request.text);

        debug!("POST {} ({} / {})", url, language, voice_name);

        let builder = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/ssml+xml")
            .header(OUTPUT_FORMAT_HEADER, OUTPUT_FORMAT)
            .body(ssml);

        let builder = match credential {
            Credential::Bearer(token) => builder.bearer_auth(token.as_str()),
            Credential::SubscriptionKey(key) => builder.header(SUBSCRIPTION_KEY_HEADER, key.as_str()),
        };

        let response = builder.send().await.map_err(|e| TtsError::Synthesis(describe(&e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TtsError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Synthesis(format!("HTTP {}: {}", status, body.trim())));
        }

        let bytes = response.bytes().await.map_err(|e| TtsError::Synthesis(describe(&e)))?;
        Ok(SynthesizedAudio { samples: pcm16_to_f32(&bytes), sample_rate: OUTPUT_SAMPLE_RATE })
    }
}

/// Wrap text in a single-voice SSML document.
pub fn build_ssml(language: &str, voice_name: &str, text: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{lang}'><voice xml:lang='{lang}' name='{voice}'>{text}</voice></speak>",
        lang = escape(language),
        voice = escape(voice_name),
        text = escape(text)
    )
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() { "request timed out".to_string() } else { e.to_string() }
}
