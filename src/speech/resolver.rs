//! Voice resolution: maps a command's words to a voice and the text to speak.
//!
//! Resolution is first-match-wins:
//! 1. a reserved selector (`dump`) routes to its custom model endpoint, if configured;
//! 2. a selector matching a catalog display name (ignoring case) picks that voice;
//! 3. anything else uses the default voice and speaks every word, selector included.
//!
//! Every call builds its own [`VoiceConfig`], so concurrent commands never share voice state.

use std::sync::Arc;

use tracing::{debug, warn};

use super::catalog::VoiceCatalog;
use super::error::TtsError;
use crate::config::{CustomVoiceSettings, SUBSCRIPTION_KEY_VAR};

/// A selector reserved for a dedicated custom model.
#[derive(Debug, Clone, Copy)]
pub struct CustomVoice {
    pub selector: &'static str,
    pub language: &'static str,
    pub model_voice_name: &'static str,
}

/// Reserved selectors, matched ignoring case.
const RESERVED_VOICES: &[CustomVoice] = &[CustomVoice { selector: "dump", language: "en-US", model_voice_name: "DumpModel02" }];

/// Look up a reserved selector.
pub fn reserved_voice(selector: &str) -> Option<&'static CustomVoice> {
    RESERVED_VOICES.iter().find(|voice| voice.selector.eq_ignore_ascii_case(selector))
}

/// Voice configuration for one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceConfig {
    /// A custom model hosted at its own endpoint.
    CustomEndpoint { endpoint_url: String, subscription_key: String, language: String, model_voice_name: String },
    /// A voice from the catalog.
    CatalogVoice { locale: String, voice_name: String },
    /// The configured default voice.
    Default,
}

impl VoiceConfig {
    /// Short description for logs (never includes credentials).
    pub fn label(&self) -> String {
        match self {
            VoiceConfig::CustomEndpoint { model_voice_name, language, .. } => format!("custom {} ({})", model_voice_name, language),
            VoiceConfig::CatalogVoice { voice_name, locale } => format!("{} ({})", voice_name, locale),
            VoiceConfig::Default => "default voice".to_string(),
        }
    }
}

/// Outcome of resolving a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub voice: VoiceConfig,
    pub text: String, // Residual text, may be empty
}

/// Decides which voice speaks a command.
pub struct VoiceResolver {
    catalog: Arc<VoiceCatalog>,   // Read-only, shared across commands
    custom: CustomVoiceSettings,  // Endpoint and key lookups for reserved selectors
}

impl VoiceResolver {
    pub fn new(catalog: Arc<VoiceCatalog>, custom: CustomVoiceSettings) -> Self {
        Self { catalog, custom }
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    /// Resolve a command's words. Never fails: a reserved selector that cannot be used falls
    /// through to the catalog lookup with the full word list.
    pub fn resolve(&self, tokens: &[String]) -> Resolution {
        match self.resolve_custom(tokens) {
            Ok(Some(resolution)) => return resolution,
            Ok(None) => {}
            Err(e) => warn!("{} ({}), falling back to catalog voices", e, e.kind()),
        }

        self.resolve_fallback(tokens)
    }

    /// Try the custom-endpoint path.
    ///
    /// # Returns
    /// `Ok(None)` when the first word is not a reserved selector.
    ///
    /// # Errors
    /// `CustomVoiceConfigMissing` when the endpoint or subscription key is not configured.
    pub fn resolve_custom(&self, tokens: &[String]) -> Result<Option<Resolution>, TtsError> {
        let Some(selector) = tokens.first() else {
            return Ok(None);
        };
        let Some(voice) = reserved_voice(selector) else {
            return Ok(None);
        };

        let missing = |what: String| TtsError::CustomVoiceConfigMissing { selector: selector.clone(), missing: what };
        let endpoint_url = self.custom.endpoint(selector).ok_or_else(|| missing(CustomVoiceSettings::endpoint_key(selector)))?;
        let subscription_key = self.custom.subscription_key().ok_or_else(|| missing(SUBSCRIPTION_KEY_VAR.to_string()))?;

        debug!("Selector '{}' routed to custom model {}", selector, voice.model_voice_name);

        Ok(Some(Resolution {
            voice: VoiceConfig::CustomEndpoint {
                endpoint_url: endpoint_url.to_string(),
                subscription_key: subscription_key.to_string(),
                language: voice.language.to_string(),
                model_voice_name: voice.model_voice_name.to_string(),
            },
            text: tokens[1..].join(" "),
        }))
    }

    /// Catalog lookup, then default voice.
    pub fn resolve_fallback(&self, tokens: &[String]) -> Resolution {
        let Some(selector) = tokens.first() else {
            return Resolution { voice: VoiceConfig::Default, text: String::new() };
        };

        match self.catalog.find(selector) {
            Some(descriptor) => {
                debug!("Selector '{}' matched catalog voice {}", selector, descriptor.name);
                Resolution {
                    voice: VoiceConfig::CatalogVoice { locale: descriptor.locale.clone(), voice_name: descriptor.name.clone() },
                    text: tokens[1..].join(" "),
                }
            }
            None => Resolution { voice: VoiceConfig::Default, text: tokens.join(" ") },
        }
    }
}
