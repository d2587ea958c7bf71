use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub tavily_api_key: String,
    pub openai_model: String,
    pub search_requests_per_second: u32,
}

impl Config {
    /// Load configuration from environment variables, letting flags override
    /// the API keys.
    pub fn from_env(openai_api_key: Option<String>, tavily_api_key: Option<String>) -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            openai_api_key: required(openai_api_key, "OPENAI_API_KEY")?,
            tavily_api_key: required(tavily_api_key, "TAVILY_API_KEY")?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            search_requests_per_second: env::var("SEARCH_REQUESTS_PER_SECOND")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("SEARCH_REQUESTS_PER_SECOND must be a valid number")?,
        })
    }
}

fn required(flag: Option<String>, var: &str) -> Result<String> {
    let value = match flag {
        Some(value) => value,
        None => env::var(var).with_context(|| format!("{var} must be set"))?,
    };
    anyhow::ensure!(!value.trim().is_empty(), "{var} must not be empty");
    Ok(value)
}
