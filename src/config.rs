use std::env;
use std::time::Duration;

pub const DEFAULT_TICKERS: [&str; 8] = ["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "NFLX"];

/// Service configuration read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub port: u16,

    // Quote source
    pub massive_base_url: String,
    /// Empty key is allowed: every live fetch then falls back to synthetic data.
    pub massive_api_key: String,
    pub quote_timeout: Option<Duration>,

    // Chat endpoint
    pub chat_base_url: String,
    pub chat_api_key: String,
    pub chat_model: String,

    pub tickers: Vec<String>,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secs(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Splits a comma separated ticker list, upper-casing and dropping blanks.
/// Falls back to the default set when nothing usable remains.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    let tickers: Vec<String> = raw
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();

    if tickers.is_empty() {
        default_tickers()
    } else {
        tickers
    }
}

pub fn default_tickers() -> Vec<String> {
    DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect()
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind: env_str("BIND", "127.0.0.1"),
            port: env_u16("PORT", 3000),
            massive_base_url: env_str("MASSIVE_BASE_URL", "https://api.massive.com"),
            massive_api_key: env_str("MASSIVE_API_KEY", ""),
            quote_timeout: env_secs("QUOTE_TIMEOUT_SECS"),
            chat_base_url: env_str("CHAT_BASE_URL", "https://api.deepseek.com"),
            chat_api_key: env_str("DEEPSEEK_API_KEY", ""),
            chat_model: env_str("CHAT_MODEL", "deepseek-chat"),
            tickers: parse_tickers(&env_str("TICKERS", "")),
        }
    }

    /// Config pointing both upstreams at `base_url`, used by tests against a local mock.
    #[cfg(test)]
    pub fn for_upstream(base_url: &str) -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 0,
            massive_base_url: base_url.to_string(),
            massive_api_key: "test-key".to_string(),
            quote_timeout: None,
            chat_base_url: base_url.to_string(),
            chat_api_key: "test-key".to_string(),
            chat_model: "deepseek-chat".to_string(),
            tickers: default_tickers(),
        }
    }
}
