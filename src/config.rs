use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Clearbit API key; the Clearbit adapter is only built when present.
    pub clearbit_api_key: Option<String>,
    /// Hunter.io API key; the Hunter adapter is only built when present.
    pub hunter_api_key: Option<String>,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// Provider API keys are optional: a missing or empty key simply means
    /// that adapter is not instantiated, it never blocks startup.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            clearbit_api_key: std::env::var("CLEARBIT_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            hunter_api_key: std::env::var("HUNTER_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server port: {}", config.port);
        if config.clearbit_api_key.is_some() {
            tracing::info!("Clearbit API configured");
        } else {
            tracing::warn!("Clearbit API not configured (set CLEARBIT_API_KEY)");
        }
        if config.hunter_api_key.is_some() {
            tracing::info!("Hunter API configured");
        } else {
            tracing::warn!("Hunter API not configured (set HUNTER_API_KEY)");
        }

        Ok(config)
    }
}
