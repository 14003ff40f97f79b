use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_USER_ID: &str = "local-user";

/// Client configuration loaded from environment variables (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub user_id: String,
    /// Static bearer token. Ignored when `token_command` is set.
    pub id_token: Option<String>,
    /// Shell command that prints a fresh ID token on stdout.
    pub token_command: Option<String>,
    pub request_timeout: Option<Duration>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let request_timeout = optional_env("REQUEST_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>()
                    .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")
            })
            .transpose()?
            .map(Duration::from_secs);

        Ok(Config {
            api_base_url: optional_env("API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            user_id: optional_env("PLANNER_USER_ID").unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
            id_token: optional_env("PLANNER_ID_TOKEN"),
            token_command: optional_env("PLANNER_TOKEN_COMMAND"),
            request_timeout,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Reads an env var, treating unset and blank the same way.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_env_treats_blank_as_unset() {
        std::env::set_var("PLANNER_TEST_BLANK_VAR", "   ");
        assert_eq!(optional_env("PLANNER_TEST_BLANK_VAR"), None);
        std::env::set_var("PLANNER_TEST_SET_VAR", " value ");
        assert_eq!(optional_env("PLANNER_TEST_SET_VAR").as_deref(), Some("value"));
    }
}
