use std::env;
use std::path::PathBuf;

const DEFAULT_ADVISORY_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub advisory: AdvisoryConfig,
}

#[derive(Debug, Clone)]
pub struct AdvisoryConfig {
    pub base_url: String,
    /// Empty key means every advisory call fails and falls back; the rest
    /// of the app keeps working.
    pub api_key: String,
    pub model: String,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);
        let data_path = env::var("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/state.json"));

        Self {
            port,
            data_path,
            advisory: AdvisoryConfig {
                base_url: env::var("ADVISORY_API_URL")
                    .unwrap_or_else(|_| DEFAULT_ADVISORY_URL.to_string()),
                api_key: env::var("ADVISORY_API_KEY").unwrap_or_default(),
                model: env::var("ADVISORY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            },
        }
    }
}
