//! Provider configuration from environment variables.
//!
//! A provider is active only when its credentials are present and its
//! disable flag is unset. Anything else degrades to the stub.

use tracing::{debug, info};

/// EOSDA connection settings (API key in query string).
#[derive(Debug, Clone)]
pub struct EosdaSettings {
    pub api_key: String,
    pub base_url: String,
}

/// Sentinel Hub connection settings (OAuth client credentials).
#[derive(Debug, Clone)]
pub struct SentinelSettings {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

/// Resolved provider toggles for one process.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub eosda: Option<EosdaSettings>,
    pub sentinel: Option<SentinelSettings>,
    pub weather_enabled: bool,
}

impl ProviderSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        let eosda = if flag_set("EOSDA_DISABLED") {
            debug!("EOSDA disabled via EOSDA_DISABLED");
            None
        } else {
            std::env::var("EOSDA_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .map(|api_key| EosdaSettings {
                    api_key,
                    base_url: std::env::var("EOSDA_BASE_URL")
                        .unwrap_or_else(|_| "https://api-connect.eos.com".to_string()),
                })
        };

        let sentinel = if flag_set("SENTINEL_DISABLED") {
            debug!("Sentinel Hub disabled via SENTINEL_DISABLED");
            None
        } else {
            match (
                std::env::var("SENTINEL_CLIENT_ID").ok().filter(|v| !v.is_empty()),
                std::env::var("SENTINEL_CLIENT_SECRET").ok().filter(|v| !v.is_empty()),
            ) {
                (Some(client_id), Some(client_secret)) => Some(SentinelSettings {
                    client_id,
                    client_secret,
                    base_url: std::env::var("SENTINEL_BASE_URL")
                        .unwrap_or_else(|_| "https://services.sentinel-hub.com".to_string()),
                }),
                _ => None,
            }
        };

        let weather_enabled = !flag_set("WEATHER_DISABLED");

        let settings = Self {
            eosda,
            sentinel,
            weather_enabled,
        };

        info!(
            eosda = settings.eosda.is_some(),
            sentinel = settings.sentinel.is_some(),
            weather = settings.weather_enabled,
            "Resolved provider settings"
        );

        settings
    }

    /// All-disabled settings: every index comes from the stub.
    pub fn disabled() -> Self {
        Self {
            eosda: None,
            sentinel: None,
            weather_enabled: false,
        }
    }
}

fn flag_set(name: &str) -> bool {
    std::env::var(name)
        .map(|v| {
            let v = v.to_lowercase();
            v == "1" || v == "true" || v == "yes"
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_settings() {
        let settings = ProviderSettings::disabled();
        assert!(settings.eosda.is_none());
        assert!(settings.sentinel.is_none());
        assert!(!settings.weather_enabled);
    }
}
