//! Voice catalog fetched from the speech backend at startup.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::info;

use super::backend::SpeechBackend;
use super::error::TtsError;
use super::token::AuthToken;

/// Metadata for one selectable voice, as returned by the voice listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceDescriptor {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub local_name: String,
    #[serde(default)]
    pub gender: String,
    pub locale: String,
    #[serde(default)]
    pub sample_rate_hertz: String,
    #[serde(default)]
    pub voice_type: String,
    #[serde(default)]
    pub status: String,
}

/// Ordered, read-only list of voices.
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    voices: Vec<VoiceDescriptor>,
}

impl VoiceCatalog {
    pub fn new(voices: Vec<VoiceDescriptor>) -> Self {
        Self { voices }
    }

    /// Fetch the catalog from the backend.
    ///
    /// # Errors
    /// Returns `BackendUnavailable` if the listing call fails; an unreachable backend is never
    /// reported as an empty catalog.
    pub async fn load(backend: &dyn SpeechBackend, token: &AuthToken) -> Result<Self, TtsError> {
        let voices = backend.list_voices(token).await?;
        info!("Loaded {} voices from the speech backend", voices.len());
        Ok(Self::new(voices))
    }

    /// Find the first voice whose display name matches `selector`, ignoring case.
    pub fn find(&self, selector: &str) -> Option<&VoiceDescriptor> {
        let selector = selector.to_lowercase();
        self.voices.iter().find(|voice| voice.display_name.to_lowercase() == selector)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Print all voices grouped by locale.
    pub fn print_voices(&self) {
        println!("═══════════════════════════════════════════════════════════════════");
        println!("  Speech backend - {} voices", self.len());
        println!("═══════════════════════════════════════════════════════════════════");

        let mut by_locale: BTreeMap<&str, Vec<&VoiceDescriptor>> = BTreeMap::new();
        for voice in &self.voices {
            by_locale.entry(voice.locale.as_str()).or_default().push(voice);
        }

        for (locale, voices) in by_locale {
            println!("\n── {} ({} voices) ──", locale, voices.len());
            println!("{:<20} {:<8} {:<10} NAME", "SELECTOR", "GENDER", "TYPE");
            println!("{}", "─".repeat(70));

            for voice in voices {
                println!("{:<20} {:<8} {:<10} {}", voice.display_name.to_lowercase(), voice.gender, voice.voice_type, voice.name);
            }
        }

        println!("\n{}\n", "─".repeat(70));
        println!("Usage in chat:");
        println!("  !tts <selector> <text>     speak with a catalog voice");
        println!("  !tts <text>                speak with the default voice");
        println!();
    }

    /// Print detailed information about one voice.
    pub fn print_voice_info(&self, selector: &str) -> anyhow::Result<()> {
        let voice = self.find(selector).ok_or_else(|| anyhow::anyhow!("Voice '{}' not found. Run with --list-voices to see available voices", selector))?;

        println!();
        println!("Voice: {}", voice.display_name);
        println!("{}", "─".repeat(40));
        println!("Name:          {}", voice.name);
        println!("Local name:    {}", voice.local_name);
        println!("Locale:        {}", voice.locale);
        println!("Gender:        {}", voice.gender);
        println!("Sample rate:   {}", voice.sample_rate_hertz);
        println!("Voice type:    {}", voice.voice_type);
        println!("Status:        {}", voice.status);
        println!();
        println!("Usage:");
        println!("  !tts {} <text>", voice.display_name.to_lowercase());
        println!();

        Ok(())
    }
}
