//! Seam between the dispatcher and the speech service.

use async_trait::async_trait;

use super::catalog::VoiceDescriptor;
use super::error::TtsError;
use super::resolver::VoiceConfig;
use super::token::AuthToken;

/// One synthesis call: the voice to use and the text to speak.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub voice: VoiceConfig,
    pub text: String,
}

/// Credential attached to a synthesis call.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Bearer token for catalog and default voices.
    Bearer(AuthToken),
    /// Subscription key for custom model endpoints.
    SubscriptionKey(String),
}

/// Mono PCM audio produced by the backend.
#[derive(Debug, Clone, Default)]
pub struct SynthesizedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Operations the speech service offers to this application.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Exchange a subscription key for a bearer token.
    async fn issue_token(&self, subscription_key: &str) -> Result<String, TtsError>;

    /// List the voices available to the token holder, in backend order.
    async fn list_voices(&self, token: &AuthToken) -> Result<Vec<VoiceDescriptor>, TtsError>;

    /// Synthesize speech for one request.
    async fn synthesize(&self, request: &SynthesisRequest, credential: &Credential) -> Result<SynthesizedAudio, TtsError>;
}
