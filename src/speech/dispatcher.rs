//! Synthesis dispatch for one chat command.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::backend::{Credential, SpeechBackend, SynthesisRequest, SynthesizedAudio};
use super::catalog::VoiceCatalog;
use super::error::TtsError;
use super::resolver::{Resolution, VoiceConfig, VoiceResolver};
use super::token::TokenManager;
use crate::audio::AudioSink;
use crate::config::SpeechSettings;

/// Lifecycle of a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Resolving,
    Synthesizing,
    Done,
    Failed,
}

/// Turns `tts` commands into speech.
///
/// Shared by reference between concurrent command tasks: the catalog is read-only, every
/// command resolves its own `VoiceConfig`, and the token is only swapped under a lock.
pub struct SynthesisDispatcher {
    resolver: VoiceResolver,          // Voice selection
    tokens: TokenManager,             // Bearer token for catalog/default voices
    backend: Arc<dyn SpeechBackend>,  // Speech service
    sink: Arc<dyn AudioSink>,         // Audio output
    timeout: Duration,                // Bound for one synthesis call
}

impl SynthesisDispatcher {
    /// Acquire a token and load the voice catalog, then build the dispatcher.
    ///
    /// # Errors
    /// `CredentialMissing` / `AuthBackend` if no token can be acquired, `BackendUnavailable`
    /// if the catalog cannot be loaded. No dispatcher exists after a failure.
    pub async fn start(settings: &SpeechSettings, backend: Arc<dyn SpeechBackend>, sink: Arc<dyn AudioSink>) -> Result<Self, TtsError> {
        let tokens = TokenManager::new(settings, backend.clone());
        let token = tokens.acquire().await?;

        let catalog = VoiceCatalog::load(backend.as_ref(), &token).await?;
        if catalog.is_empty() {
            warn!("Voice catalog is empty, every command will use the default voice");
        }

        let resolver = VoiceResolver::new(Arc::new(catalog), settings.custom_voices());

        Ok(Self { resolver, tokens, backend, sink, timeout: settings.request_timeout })
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        self.resolver.catalog()
    }

    /// Handle the arguments of one `tts` command.
    ///
    /// Failures are logged and end the command; they never propagate to the chat layer.
    pub async fn handle(&self, tokens: &[String]) -> DispatchState {
        let mut state = DispatchState::Idle;
        advance(&mut state, DispatchState::Resolving);

        match self.dispatch(tokens, &mut state).await {
            Ok(()) => advance(&mut state, DispatchState::Done),
            Err(e) => {
                error!("❌ TTS command failed ({}): {}", e.kind(), e);
                advance(&mut state, DispatchState::Failed);
            }
        }

        state
    }

    async fn dispatch(&self, tokens: &[String], state: &mut DispatchState) -> Result<(), TtsError> {
        if tokens.is_empty() {
            info!("Ignoring tts command without arguments");
            return Ok(());
        }

        let resolution = self.resolver.resolve(tokens);
        if resolution.text.trim().is_empty() {
            info!("Nothing to say for {}, skipping", resolution.voice.label());
            return Ok(());
        }

        advance(state, DispatchState::Synthesizing);

        let audio = match self.synthesize(&resolution).await {
            Ok(audio) => audio,
            Err(e) if matches!(resolution.voice, VoiceConfig::CustomEndpoint { .. }) => {
                warn!("Custom voice failed ({}): {}, falling back to catalog voices", e.kind(), e);
                let fallback = self.resolver.resolve_fallback(tokens);
                self.synthesize(&fallback).await?
            }
            Err(e) => return Err(e),
        };

        self.play(audio).await
    }

    async fn synthesize(&self, resolution: &Resolution) -> Result<SynthesizedAudio, TtsError> {
        let credential = match &resolution.voice {
            VoiceConfig::CustomEndpoint { subscription_key, .. } => Credential::SubscriptionKey(subscription_key.clone()),
            _ => Credential::Bearer(self.tokens.current().ok_or(TtsError::CredentialMissing)?),
        };

        info!("🗣️  Speaking with {}: \"{}\"", resolution.voice.label(), resolution.text);

        let request = SynthesisRequest { voice: resolution.voice.clone(), text: resolution.text.clone() };
        let result = tokio::time::timeout(self.timeout, self.backend.synthesize(&request, &credential))
            .await
            .unwrap_or_else(|_| Err(TtsError::Synthesis(format!("timed out after {}s", self.timeout.as_secs_f32()))));

        if let Err(ref e) = result
            && e.is_credential_rejection()
            && matches!(credential, Credential::Bearer(_))
        {
            warn!("Speech token rejected, acquiring a new one for the next commands");
            if let Err(e) = self.tokens.acquire().await {
                error!("❌ Token renewal failed ({}): {}", e.kind(), e);
            }
        }

        result
    }

    async fn play(&self, audio: SynthesizedAudio) -> Result<(), TtsError> {
        debug!("Synthesized {} samples at {} Hz", audio.samples.len(), audio.sample_rate);

        let sink = self.sink.clone();
        tokio::task::spawn_blocking(move || sink.play(&audio.samples, audio.sample_rate))
            .await
            .map_err(|e| TtsError::Playback(e.to_string()))?
            .map_err(|e| TtsError::Playback(e.to_string()))
    }
}

fn advance(state: &mut DispatchState, next: DispatchState) {
    debug!("Dispatch state: {:?} -> {:?}", state, next);
    *state = next;
}
