//! In-process fakes for the speech backend and audio output.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::backend::{Credential, SpeechBackend, SynthesisRequest, SynthesizedAudio};
use super::catalog::VoiceDescriptor;
use super::error::TtsError;
use super::resolver::VoiceConfig;
use super::token::AuthToken;
use crate::audio::AudioSink;

/// Split a chat line into command words.
pub fn tokens(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

pub fn voice(display_name: &str, name: &str, locale: &str) -> VoiceDescriptor {
    VoiceDescriptor {
        name: name.to_string(),
        display_name: display_name.to_string(),
        local_name: display_name.to_string(),
        gender: "Male".to_string(),
        locale: locale.to_string(),
        sample_rate_hertz: "24000".to_string(),
        voice_type: "Neural".to_string(),
        status: "GA".to_string(),
    }
}

/// Scriptable backend. Tokens are issued as `token-1`, `token-2`, ...
#[derive(Default)]
pub struct FakeBackend {
    voices: Vec<VoiceDescriptor>,
    token_requests: AtomicUsize,
    voice_requests: AtomicUsize,
    last_key: Mutex<Option<String>>,
    fail_tokens: AtomicBool,
    fail_voices: AtomicBool,
    fail_custom: AtomicBool,
    fail_all: AtomicBool,
    rejected_token: Mutex<Option<String>>,
    delay: Mutex<Duration>,
    jitter: AtomicBool,
    calls: Mutex<Vec<(SynthesisRequest, String)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voices(voices: Vec<VoiceDescriptor>) -> Self {
        Self { voices, ..Self::default() }
    }

    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn voice_requests(&self) -> usize {
        self.voice_requests.load(Ordering::SeqCst)
    }

    pub fn last_subscription_key(&self) -> Option<String> {
        self.last_key.lock().clone()
    }

    pub fn fail_token_exchange(&self, fail: bool) {
        self.fail_tokens.store(fail, Ordering::SeqCst);
    }

    pub fn fail_voice_listing(&self, fail: bool) {
        self.fail_voices.store(fail, Ordering::SeqCst);
    }

    pub fn fail_custom_synthesis(&self, fail: bool) {
        self.fail_custom.store(fail, Ordering::SeqCst);
    }

    pub fn fail_all_synthesis(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Answer 401 to synthesis calls carrying this bearer token.
    pub fn reject_token(&self, token: &str) {
        *self.rejected_token.lock() = Some(token.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Vary the synthesis latency per request so concurrent calls interleave.
    pub fn set_jitter(&self, jitter: bool) {
        self.jitter.store(jitter, Ordering::SeqCst);
    }

    /// Every synthesis call with a `bearer:<token>` or `key:<key>` credential label.
    pub fn synthesis_calls(&self) -> Vec<(SynthesisRequest, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SpeechBackend for FakeBackend {
    async fn issue_token(&self, subscription_key: &str) -> Result<String, TtsError> {
        *self.last_key.lock() = Some(subscription_key.to_string());
        let n = self.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_tokens.load(Ordering::SeqCst) {
            return Err(TtsError::AuthBackend("HTTP 401 Unauthorized".to_string()));
        }
        Ok(format!("token-{}", n))
    }

    async fn list_voices(&self, _token: &AuthToken) -> Result<Vec<VoiceDescriptor>, TtsError> {
        self.voice_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_voices.load(Ordering::SeqCst) {
            return Err(TtsError::BackendUnavailable("voice listing returned HTTP 503".to_string()));
        }
        Ok(self.voices.clone())
    }

    async fn synthesize(&self, request: &SynthesisRequest, credential: &Credential) -> Result<SynthesizedAudio, TtsError> {
        let label = match credential {
            Credential::Bearer(token) => format!("bearer:{}", token.as_str()),
            Credential::SubscriptionKey(key) => format!("key:{}", key),
        };
        self.calls.lock().push((request.clone(), label));

        let mut delay = *self.delay.lock();
        if self.jitter.load(Ordering::SeqCst) {
            delay += Duration::from_millis((request.text.len() % 7) as u64);
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_all.load(Ordering::SeqCst) {
            return Err(TtsError::Synthesis("HTTP 500".to_string()));
        }
        if self.fail_custom.load(Ordering::SeqCst) && matches!(request.voice, VoiceConfig::CustomEndpoint { .. }) {
            return Err(TtsError::Synthesis("custom endpoint unreachable".to_string()));
        }
        if let Credential::Bearer(token) = credential
            && self.rejected_token.lock().as_deref() == Some(token.as_str())
        {
            return Err(TtsError::Unauthorized(401));
        }

        Ok(SynthesizedAudio { samples: vec![0.1; request.text.len()], sample_rate: 24000 })
    }
}

/// Audio sink that records the length of everything it plays.
#[derive(Default)]
pub struct RecordingSink {
    played: Mutex<Vec<usize>>,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn played(&self) -> Vec<usize> {
        self.played.lock().clone()
    }
}

impl AudioSink for RecordingSink {
    fn play(&self, samples: &[f32], _sample_rate: u32) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("no output device");
        }
        self.played.lock().push(samples.len());
        Ok(())
    }
}
