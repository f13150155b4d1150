//! Error type shared by the speech components.

use thiserror::Error;

/// Failure kinds of token acquisition, catalog loading, resolution and synthesis.
#[derive(Debug, Error)]
pub enum TtsError {
    /// The subscription key is absent or empty.
    #[error("Azure TTS subscription key is missing")]
    CredentialMissing,

    /// A reserved selector was used but its endpoint or key is not configured.
    #[error("Cannot initialize custom voice '{selector}': {missing} is missing")]
    CustomVoiceConfigMissing { selector: String, missing: String },

    /// The token exchange did not succeed.
    #[error("Could not get access token: {0}")]
    AuthBackend(String),

    /// The voice listing could not be fetched or parsed.
    #[error("Speech backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend rejected the credential used for synthesis.
    #[error("Speech backend rejected the credential (HTTP {0})")]
    Unauthorized(u16),

    /// Synthesis failed for any other reason (including timeouts).
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// The synthesized audio could not be played.
    #[error("Audio playback failed: {0}")]
    Playback(String),
}

impl TtsError {
    /// Whether a fresh token may fix this failure.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, TtsError::Unauthorized(_))
    }

    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            TtsError::CredentialMissing => "CredentialMissing",
            TtsError::CustomVoiceConfigMissing { .. } => "CustomVoiceConfigMissing",
            TtsError::AuthBackend(_) => "AuthBackendError",
            TtsError::BackendUnavailable(_) => "BackendUnavailable",
            TtsError::Unauthorized(_) | TtsError::Synthesis(_) => "SynthesisFailure",
            TtsError::Playback(_) => "PlaybackFailure",
        }
    }
}
