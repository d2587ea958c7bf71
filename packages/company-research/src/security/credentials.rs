//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate to prevent accidental logging of sensitive values.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

use crate::error::{ResearchError, Result};

/// A secret string that won't be logged or displayed.
///
/// API keys for the completion service and the search provider are held in
/// this type and only exposed when building a request.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    /// Create a new secret string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret value for use in a request header or body.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the secret is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Credentials for an external provider (completion service or search API).
#[derive(Clone)]
pub struct ProviderCredentials {
    /// Provider name used in error messages
    pub provider: String,

    /// API key (secret)
    pub api_key: SecretString,

    /// API base URL override
    pub base_url: Option<String>,
}

impl ProviderCredentials {
    /// Create credentials, rejecting a blank key.
    pub fn new(provider: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let provider = provider.into();
        let api_key = SecretString::new(api_key);
        if api_key.is_blank() {
            return Err(ResearchError::Config(format!("{provider} API key is empty")));
        }

        Ok(Self {
            provider,
            api_key,
            base_url: None,
        })
    }

    /// Read the key from an environment variable.
    pub fn from_env(provider: impl Into<String>, var: &str) -> Result<Self> {
        let key = std::env::var(var)
            .map_err(|_| ResearchError::Config(format!("{var} environment variable not set")))?;
        Self::new(provider, key)
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}
