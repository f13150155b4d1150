//! Resolved settings handed to the speech components.
//!
//! Environment and CLI lookups happen once at startup; the token manager, resolver and
//! synthesizer only ever see these values.

use std::collections::HashMap;
use std::time::Duration;

/// Suffix of the configuration keys naming custom voice endpoints (`DUMP_TTS_ENDPOINT`).
pub const ENDPOINT_SUFFIX: &str = "_TTS_ENDPOINT";

/// Name of the configuration key holding the speech subscription key.
pub const SUBSCRIPTION_KEY_VAR: &str = "AZURE_TTS_SUBSCRIPTION_KEY";

/// Settings for the speech backend.
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub subscription_key: Option<String>, // Secret, never logged
    pub token_url: String,                // Token issuance endpoint
    pub voices_url: String,               // Voice listing endpoint
    pub synthesis_url: String,            // Synthesis endpoint for catalog/default voices
    pub default_voice: String,            // Voice used when no selector matches
    pub default_locale: String,           // Locale of the default voice
    pub request_timeout: Duration,        // Bound for every backend call
    pub endpoints: HashMap<String, String>, // `{SELECTOR}_TTS_ENDPOINT` -> URL
}

impl SpeechSettings {
    /// Build settings for a region using the public Azure endpoints.
    pub fn for_region(region: &str, subscription_key: Option<String>) -> Self {
        Self {
            subscription_key,
            token_url: format!("https://{region}.api.cognitive.microsoft.com/sts/v1.0/issuetoken"),
            voices_url: format!("https://{region}.tts.speech.microsoft.com/cognitiveservices/voices/list"),
            synthesis_url: format!("https://{region}.tts.speech.microsoft.com/cognitiveservices/v1"),
            default_voice: "Microsoft Server Speech Text to Speech Voice (en-GB, George)".to_string(),
            default_locale: "en-GB".to_string(),
            request_timeout: Duration::from_secs(15),
            endpoints: HashMap::new(),
        }
    }

    /// The subscription key, if present and non-empty.
    pub fn subscription_key(&self) -> Option<&str> {
        non_empty(self.subscription_key.as_deref())
    }

    /// The custom voice lookups needed by the resolver.
    pub fn custom_voices(&self) -> CustomVoiceSettings {
        self.endpoints
            .iter()
            .fold(CustomVoiceSettings::new(self.subscription_key.clone()), |custom, (key, url)| custom.with_endpoint(key.clone(), url.clone()))
    }
}

/// Configuration lookups for the custom-endpoint voices.
#[derive(Debug, Clone, Default)]
pub struct CustomVoiceSettings {
    endpoints: HashMap<String, String>,
    subscription_key: Option<String>,
}

impl CustomVoiceSettings {
    pub fn new(subscription_key: Option<String>) -> Self {
        Self { endpoints: HashMap::new(), subscription_key }
    }

    /// Register an endpoint under its full configuration key.
    pub fn with_endpoint(mut self, key: impl Into<String>, url: impl Into<String>) -> Self {
        self.endpoints.insert(key.into(), url.into());
        self
    }

    /// Configuration key for a selector, e.g. `dump` -> `DUMP_TTS_ENDPOINT`.
    pub fn endpoint_key(selector: &str) -> String {
        format!("{}{}", selector.to_uppercase(), ENDPOINT_SUFFIX)
    }

    /// Endpoint URL configured for a selector (case-sensitive key lookup).
    pub fn endpoint(&self, selector: &str) -> Option<&str> {
        non_empty(self.endpoints.get(&Self::endpoint_key(selector)).map(String::as_str))
    }

    pub fn subscription_key(&self) -> Option<&str> {
        non_empty(self.subscription_key.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
