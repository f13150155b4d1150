//! Configuration module for the TTS dispatcher.
//!
//! Provides CLI argument parsing and the resolved settings passed to the speech components.

#[allow(clippy::module_inception)]
mod config;
mod settings;

pub use config::AppConfig;
pub use settings::{CustomVoiceSettings, SUBSCRIPTION_KEY_VAR, SpeechSettings};
