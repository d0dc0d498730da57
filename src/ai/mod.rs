//! AI provider gateway
//!
//! Uniform completion interface over interchangeable backends. The gateway is
//! a pure selection+call layer: it picks one configured provider (preferred
//! first, then a fixed priority order) and propagates that provider's failure
//! to the caller. Retry and fallback policy live in the callers, where a
//! cheaper deterministic answer is always available.

use crate::config::Settings;
use crate::error::{DevpulseError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Sampling temperature shared by all backends
pub(crate) const TEMPERATURE: f32 = 0.7;

/// Response token cap shared by all backends
pub(crate) const MAX_TOKENS: usize = 1000;

/// One interchangeable completion backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Stable identifier ("gemini", "openai", "anthropic")
    fn name(&self) -> &'static str;

    /// Run one completion request against the backend
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Ordered selection over the configured providers
pub struct AiGateway {
    providers: Vec<Arc<dyn CompletionProvider>>,
}

impl AiGateway {
    /// Build the gateway from environment settings
    ///
    /// Providers with a credential are kept in the fixed priority order
    /// gemini, openai, anthropic; a preferred provider (when configured and
    /// credentialed) is moved to the front. The order is the same for every
    /// caller, so selection is deterministic for a given configuration.
    pub fn from_settings(settings: &Settings) -> Self {
        let client = reqwest::Client::new();
        let mut providers: Vec<Arc<dyn CompletionProvider>> = Vec::new();

        if let Some(key) = &settings.gemini_api_key {
            providers.push(Arc::new(GeminiProvider::new(client.clone(), key.clone())));
        }
        if let Some(key) = &settings.openai_api_key {
            providers.push(Arc::new(OpenAiProvider::new(client.clone(), key.clone())));
        }
        if let Some(key) = &settings.anthropic_api_key {
            providers.push(Arc::new(AnthropicProvider::new(client.clone(), key.clone())));
        }

        if let Some(preferred) = &settings.preferred_provider {
            if let Some(pos) = providers.iter().position(|p| p.name() == preferred) {
                let provider = providers.remove(pos);
                providers.insert(0, provider);
            }
        }

        Self { providers }
    }

    /// Build a gateway from an explicit provider list (test injection point)
    pub fn with_providers(providers: Vec<Arc<dyn CompletionProvider>>) -> Self {
        Self { providers }
    }

    /// Whether any backend is configured
    pub fn is_configured(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Name of the backend that `complete` will call, "none" if unconfigured
    pub fn active_provider(&self) -> &'static str {
        self.providers.first().map_or("none", |p| p.name())
    }

    /// Run one completion against the selected backend
    ///
    /// A failure from the backend is propagated, not retried.
    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let provider = self.providers.first().ok_or_else(|| {
            DevpulseError::Provider(
                "No AI API key configured. Set GEMINI_API_KEY, OPENAI_API_KEY, \
                 or ANTHROPIC_API_KEY."
                    .to_string(),
            )
        })?;

        debug!("Dispatching completion to {} backend", provider.name());
        provider.complete(system_prompt, user_prompt).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider {
        name: &'static str,
        reply: std::result::Result<String, String>,
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.reply
                .clone()
                .map_err(DevpulseError::Provider)
        }
    }

    fn ok_provider(name: &'static str, reply: &str) -> Arc<dyn CompletionProvider> {
        Arc::new(FakeProvider {
            name,
            reply: Ok(reply.to_string()),
        })
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_fails() {
        let gateway = AiGateway::with_providers(vec![]);
        assert!(!gateway.is_configured());
        assert_eq!(gateway.active_provider(), "none");

        let err = gateway.complete("system", "user").await.unwrap_err();
        assert!(matches!(err, DevpulseError::Provider(_)));
    }

    #[tokio::test]
    async fn test_first_provider_is_called() {
        let gateway = AiGateway::with_providers(vec![
            ok_provider("first", "from first"),
            ok_provider("second", "from second"),
        ]);

        assert_eq!(gateway.active_provider(), "first");
        let reply = gateway.complete("system", "user").await.unwrap();
        assert_eq!(reply, "from first");
    }

    #[tokio::test]
    async fn test_failure_propagates_without_retry() {
        let gateway = AiGateway::with_providers(vec![
            Arc::new(FakeProvider {
                name: "broken",
                reply: Err("backend down".to_string()),
            }),
            ok_provider("healthy", "should not be reached"),
        ]);

        let err = gateway.complete("system", "user").await.unwrap_err();
        assert!(err.to_string().contains("backend down"));
    }

    #[test]
    fn test_preferred_provider_moves_to_front() {
        let settings = crate::config::Settings {
            openai_api_key: Some("ok".to_string()),
            anthropic_api_key: Some("ak".to_string()),
            gemini_api_key: Some("gk".to_string()),
            preferred_provider: Some("anthropic".to_string()),
            webhook_secret: None,
            port: 5000,
        };

        let gateway = AiGateway::from_settings(&settings);
        assert_eq!(gateway.active_provider(), "anthropic");
    }

    #[test]
    fn test_fixed_order_without_preference() {
        let settings = crate::config::Settings {
            openai_api_key: Some("ok".to_string()),
            anthropic_api_key: Some("ak".to_string()),
            gemini_api_key: Some("gk".to_string()),
            preferred_provider: None,
            webhook_secret: None,
            port: 5000,
        };

        let gateway = AiGateway::from_settings(&settings);
        assert_eq!(gateway.active_provider(), "gemini");
    }

    #[test]
    fn test_unconfigured_preference_falls_back() {
        let settings = crate::config::Settings {
            openai_api_key: Some("ok".to_string()),
            anthropic_api_key: None,
            gemini_api_key: None,
            preferred_provider: Some("anthropic".to_string()),
            webhook_secret: None,
            port: 5000,
        };

        let gateway = AiGateway::from_settings(&settings);
        assert_eq!(gateway.active_provider(), "openai");
    }
}
