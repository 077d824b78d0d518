//! Environment configuration.
//!
//! Three variables: the API key (required), the base currency (`USD` when
//! unset), and the force flag. The force flag is on only when the value is
//! exactly `"1"` — anything else, including absence, is off.

use crate::provider::FeedError;

pub const API_KEY_VAR: &str = "METALPRICE_API_KEY";
pub const BASE_CURRENCY_VAR: &str = "BASE_CURRENCY";
pub const FORCE_UPDATE_VAR: &str = "FORCE_UPDATE";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base: String,
    pub force: bool,
}

impl Config {
    /// Read configuration from the process environment. Fails before any
    /// network call when the API key is missing or empty.
    pub fn from_env() -> Result<Self, FeedError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, FeedError> {
        let api_key = get(API_KEY_VAR)
            .filter(|k| !k.is_empty())
            .ok_or(FeedError::MissingApiKey)?;
        let base = get(BASE_CURRENCY_VAR)
            .map(|b| b.to_uppercase())
            .unwrap_or_else(|| "USD".to_string());
        let force = get(FORCE_UPDATE_VAR).as_deref() == Some("1");

        Ok(Self { api_key, base, force })
    }
}
