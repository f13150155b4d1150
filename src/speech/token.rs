//! Authorization token lifecycle for the speech backend.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use super::backend::SpeechBackend;
use super::error::TtsError;
use crate::config::SpeechSettings;

/// Opaque bearer token issued by the backend. Its expiry is unknown to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(<{} bytes>)", self.0.len())
    }
}

/// Owns the current authorization token.
///
/// There is no proactive refresh: callers invoke [`TokenManager::acquire`] again when a
/// request is rejected for credential reasons. Concurrent acquisitions are not coordinated,
/// the last one to finish wins.
pub struct TokenManager {
    backend: Arc<dyn SpeechBackend>,     // Performs the token exchange
    subscription_key: Option<String>,    // Credential exchanged for tokens
    current: RwLock<Option<AuthToken>>,  // Most recently issued token
}

impl TokenManager {
    pub fn new(settings: &SpeechSettings, backend: Arc<dyn SpeechBackend>) -> Self {
        Self { backend, subscription_key: settings.subscription_key().map(str::to_string), current: RwLock::new(None) }
    }

    /// Exchange the subscription key for a fresh token and make it current.
    ///
    /// # Errors
    /// `CredentialMissing` if no subscription key is configured (checked before any request),
    /// `AuthBackend` if the exchange does not succeed.
    pub async fn acquire(&self) -> Result<AuthToken, TtsError> {
        let Some(key) = self.subscription_key.as_deref() else {
            warn!("Cannot acquire token: subscription key is missing");
            return Err(TtsError::CredentialMissing);
        };

        let token = match self.backend.issue_token(key).await {
            Ok(value) if !value.trim().is_empty() => AuthToken::new(value.trim()),
            Ok(_) => {
                warn!("Token exchange returned an empty token");
                return Err(TtsError::AuthBackend("empty token in response".to_string()));
            }
            Err(e) => {
                warn!("Token acquisition failed: {}", e);
                return Err(e);
            }
        };

        *self.current.write() = Some(token.clone());
        info!("🔑 Acquired speech backend token");
        Ok(token)
    }

    /// The most recently acquired token, if any.
    pub fn current(&self) -> Option<AuthToken> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::testing::FakeBackend;

    fn settings(key: Option<&str>) -> SpeechSettings {
        SpeechSettings::for_region("westeurope", key.map(str::to_string))
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let backend = Arc::new(FakeBackend::new());
        let manager = TokenManager::new(&settings(None), backend.clone());

        let result = manager.acquire().await;
        assert!(matches!(result, Err(TtsError::CredentialMissing)));
        assert_eq!(backend.token_requests(), 0);
        assert!(manager.current().is_none());
    }

    #[tokio::test]
    async fn test_empty_key_is_missing() {
        let backend = Arc::new(FakeBackend::new());
        let manager = TokenManager::new(&settings(Some("")), backend.clone());
        assert!(matches!(manager.acquire().await, Err(TtsError::CredentialMissing)));
    }

    #[tokio::test]
    async fn test_acquire_stores_latest_token() {
        let backend = Arc::new(FakeBackend::new());
        let manager = TokenManager::new(&settings(Some("secret")), backend.clone());

        let first = manager.acquire().await.unwrap();
        let second = manager.acquire().await.unwrap();

        assert_ne!(first, second);
        assert_eq!(manager.current(), Some(second));
        assert_eq!(backend.token_requests(), 2);
        assert_eq!(backend.last_subscription_key().as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_previous_token() {
        let backend = Arc::new(FakeBackend::new());
        let manager = TokenManager::new(&settings(Some("secret")), backend.clone());
        let first = manager.acquire().await.unwrap();

        backend.fail_token_exchange(true);
        assert!(matches!(manager.acquire().await, Err(TtsError::AuthBackend(_))));
        assert_eq!(manager.current(), Some(first));
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = AuthToken::new("very-secret");
        assert!(!format!("{:?}", token).contains("very-secret"));
    }
}
