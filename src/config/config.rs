//! Application configuration and CLI argument parsing.

use std::collections::HashMap;
use std::ffi::OsString;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use reqwest::Url;
use tracing::{debug, info, warn};

use super::settings::{ENDPOINT_SUFFIX, SpeechSettings};

/// Chat TTS dispatcher configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-tts")]
#[command(author, version, about = "Speak chat commands through the Azure speech service", long_about = None)]
pub struct AppConfig {
    /// List all voices offered by the speech backend and exit
    #[arg(long)]
    pub list_voices: bool,

    /// Show detailed information about a specific voice (by display name) and exit
    #[arg(long)]
    pub voice_info: Option<String>,

    /// Azure speech subscription key
    #[arg(long, env = "AZURE_TTS_SUBSCRIPTION_KEY", hide_env_values = true)]
    pub subscription_key: Option<String>,

    /// Azure region hosting the speech resource
    #[arg(long, short = 'r', env = "AZURE_TTS_REGION", default_value = "westeurope")]
    pub region: String,

    /// Token issuance URL (derived from the region if not set)
    #[arg(long)]
    pub token_url: Option<String>,

    /// Voice listing URL (derived from the region if not set)
    #[arg(long)]
    pub voices_url: Option<String>,

    /// Synthesis URL for catalog and default voices (derived from the region if not set)
    #[arg(long)]
    pub synthesis_url: Option<String>,

    /// Voice used when the first word matches no catalog voice
    #[arg(long, default_value = "Microsoft Server Speech Text to Speech Voice (en-GB, George)")]
    pub default_voice: String,

    /// Locale of the default voice
    #[arg(long, default_value = "en-GB")]
    pub default_locale: String,

    /// Custom voice endpoint as NAME=URL (repeatable). Merged with every *_TTS_ENDPOINT variable
    #[arg(long = "custom-endpoint", value_name = "NAME=URL", value_parser = parse_custom_endpoint)]
    pub custom_endpoints: Vec<(String, String)>,

    /// Timeout for each request to the speech backend, in seconds
    #[arg(long, default_value = "15")]
    pub request_timeout_secs: u64,

    /// Prefix that marks a chat line as a command
    #[arg(long, default_value = "!")]
    pub command_prefix: String,

    /// Do not open an audio device; synthesized audio is discarded
    #[arg(long)]
    pub no_playback: bool,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl AppConfig {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Resolve the settings handed to the speech components.
    ///
    /// Endpoint variables are read from the process environment once; `--custom-endpoint`
    /// entries take precedence over them. Call this once and pass the result around.
    pub fn settings(&self) -> SpeechSettings {
        self.settings_with_env(std::env::vars_os().filter_map(utf8_var))
    }

    fn settings_with_env(&self, vars: impl IntoIterator<Item = (String, String)>) -> SpeechSettings {
        let mut settings = SpeechSettings::for_region(&self.region, self.subscription_key.clone());

        if let Some(ref url) = self.token_url {
            settings.token_url = url.clone();
        }
        if let Some(ref url) = self.voices_url {
            settings.voices_url = url.clone();
        }
        if let Some(ref url) = self.synthesis_url {
            settings.synthesis_url = url.clone();
        }

        settings.default_voice = self.default_voice.clone();
        settings.default_locale = self.default_locale.clone();
        settings.request_timeout = Duration::from_secs(self.request_timeout_secs);
        settings.endpoints = collect_endpoints(vars, &self.custom_endpoints);
        settings
    }

    /// Validate the configuration against its resolved settings.
    ///
    /// Custom endpoints are not checked here: unusable ones were already dropped by
    /// [`AppConfig::settings`] and their selectors fall back to the catalog.
    pub fn validate(&self, settings: &SpeechSettings) -> Result<()> {
        if self.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be positive");
        }

        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("Command prefix must not be blank");
        }

        if self.region.trim().is_empty() {
            anyhow::bail!("Region must not be blank");
        }

        let urls = [("token", &settings.token_url), ("voices", &settings.voices_url), ("synthesis", &settings.synthesis_url)];
        for (label, url) in urls {
            Url::parse(url).map_err(|e| anyhow::anyhow!("Invalid {} URL '{}': {}", label, url, e))?;
        }

        Ok(())
    }

    /// Log the current configuration (secrets are never printed).
    pub fn log_config(&self, settings: &SpeechSettings) {
        info!("Configuration:");
        info!("  Region: {}", self.region);
        info!("  Token URL: {}", settings.token_url);
        info!("  Voices URL: {}", settings.voices_url);
        info!("  Synthesis URL: {}", settings.synthesis_url);
        info!("  Subscription key: {}", if settings.subscription_key().is_some() { "set" } else { "missing" });
        info!("  Default voice: {} ({})", settings.default_voice, settings.default_locale);
        info!("  Request timeout: {}s", self.request_timeout_secs);
        info!("  Command prefix: {}", self.command_prefix);
        let mut keys: Vec<_> = settings.endpoints.keys().collect();
        keys.sort();
        for key in keys {
            info!("  Custom endpoint: {}", key);
        }
        if self.no_playback {
            info!("  Playback: disabled");
        }
    }
}

/// Keep an environment variable only if both its name and value are UTF-8.
fn utf8_var((key, value): (OsString, OsString)) -> Option<(String, String)> {
    match (key.into_string(), value.into_string()) {
        (Ok(key), Ok(value)) => Some((key, value)),
        (key, _) => {
            debug!("Skipping non UTF-8 environment variable {:?}", key);
            None
        }
    }
}

/// Merge `*_TTS_ENDPOINT` variables with CLI entries (CLI wins).
///
/// Blank or unparsable endpoints are dropped with a warning, so their selectors resolve as
/// if nothing was configured.
fn collect_endpoints(vars: impl IntoIterator<Item = (String, String)>, overrides: &[(String, String)]) -> HashMap<String, String> {
    let mut endpoints: HashMap<String, String> = vars.into_iter().filter(|(key, _)| key.ends_with(ENDPOINT_SUFFIX)).collect();

    for (name, url) in overrides {
        endpoints.insert(format!("{}{}", name.to_uppercase(), ENDPOINT_SUFFIX), url.clone());
    }

    endpoints.retain(|key, url| {
        *url = url.trim().to_string();
        if url.is_empty() {
            warn!("⚠️  Ignoring custom endpoint {}: value is blank", key);
            return false;
        }
        match Url::parse(url) {
            Ok(_) => true,
            Err(e) => {
                warn!("⚠️  Ignoring custom endpoint {}='{}': {}", key, url, e);
                false
            }
        }
    });

    endpoints
}

/// Parse a `NAME=URL` custom endpoint argument.
fn parse_custom_endpoint(s: &str) -> Result<(String, String), String> {
    let (name, url) = s.split_once('=').ok_or_else(|| format!("'{}' is not in NAME=URL form", s))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(format!("'{}' is not a valid voice name", name));
    }
    Ok((name.to_string(), url.trim().to_string()))
}
