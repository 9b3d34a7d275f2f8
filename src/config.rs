use anyhow::Result;

/// Configuration loaded from environment variables. Constructed once at
/// startup and passed into the adapters that need it.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub access_token: String,
    pub history_file: String,
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<Config> {
    // Load `.env` file if present
    dotenv::dotenv().ok();
    let api_base_url = std::env::var("SPOTIFY_API_BASE_URL")
        .unwrap_or_else(|_| "https://api.spotify.com/v1".to_string());
    let access_token = std::env::var("SPOTIFY_ACCESS_TOKEN")?;
    let history_file =
        std::env::var("MOODLIST_HISTORY_FILE").unwrap_or_else(|_| "history.json".to_string());
    Ok(Config {
        api_base_url,
        access_token,
        history_file,
    })
}
