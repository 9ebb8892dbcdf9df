//! Secrets loaded from environment variables only.
//!
//! The bot token never touches the settings files; it is read from the
//! environment (optionally primed from a `.env` file during development).

use std::env;

/// Env var holding the Discord bot token.
pub const DISCORD_BOT_TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";

/// Secrets loaded exclusively from environment variables.
#[derive(Debug, Clone)]
pub struct Secrets {
    /// Discord bot token (env: DISCORD_BOT_TOKEN)
    pub discord_bot_token: String,
}

/// Errors that can occur when loading secrets
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Missing required secret: {0}")]
    MissingSecret(String),
}

impl Secrets {
    /// Load secrets from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self, SecretsError> {
        let _ = dotenvy::dotenv();
        Self::from_env_inner()
    }

    /// Load from the environment without touching `.env`.
    pub(crate) fn from_env_inner() -> Result<Self, SecretsError> {
        let discord_bot_token = env::var(DISCORD_BOT_TOKEN_ENV)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| SecretsError::MissingSecret(DISCORD_BOT_TOKEN_ENV.to_string()))?;

        Ok(Self { discord_bot_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_env() {
        let _lock = crate::ENV_MUTEX.lock().unwrap();
        unsafe { env::set_var(DISCORD_BOT_TOKEN_ENV, "  token-123 ") }

        let secrets = Secrets::from_env_inner().unwrap();
        assert_eq!(secrets.discord_bot_token, "token-123");

        unsafe { env::remove_var(DISCORD_BOT_TOKEN_ENV) }
    }

    #[test]
    fn test_missing_token() {
        let _lock = crate::ENV_MUTEX.lock().unwrap();
        unsafe { env::remove_var(DISCORD_BOT_TOKEN_ENV) }

        let result = Secrets::from_env_inner();
        assert!(matches!(result, Err(SecretsError::MissingSecret(name)) if name == DISCORD_BOT_TOKEN_ENV));
    }

    #[test]
    fn test_blank_token_is_missing() {
        let _lock = crate::ENV_MUTEX.lock().unwrap();
        unsafe { env::set_var(DISCORD_BOT_TOKEN_ENV, "   ") }

        assert!(Secrets::from_env_inner().is_err());

        unsafe { env::remove_var(DISCORD_BOT_TOKEN_ENV) }
    }
}
