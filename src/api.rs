use log::{debug, error};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::PrevCloseResponse;

/// Builds the shared HTTP client, applying the optional quote timeout.
pub fn build_client(config: &AppConfig) -> Result<Client, ApiError> {
    let mut builder = Client::builder();
    if let Some(timeout) = config.quote_timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// GETs `url` and decodes the body, treating any non-2xx status as an error.
async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, ApiError> {
    let response: reqwest::Response = client.get(url).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        error!("Massive API Error: {} ({})", status, url_without_key(url));
        return Err(ApiError::Upstream { service: "Massive", status: status.as_u16() });
    }

    let response_text: String = response.text().await?;
    Ok(serde_json::from_str(&response_text)?)
}

/// Strips the query string so API keys never reach the log.
fn url_without_key(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Rejects anything but a plain symbol so path input cannot reshape the upstream URL.
pub fn checked_symbol(ticker: &str) -> Result<&str, ApiError> {
    let plain = !ticker.is_empty()
        && ticker.len() <= 16
        && ticker.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

    if plain {
        Ok(ticker)
    } else {
        Err(ApiError::BadRequest(format!("invalid ticker symbol: {:?}", ticker)))
    }
}

/// Fetches the previous-close aggregate for a ticker.
///
/// # Parameters
/// - `client`: HTTP client.
/// - `config`: Base URL and key for the quote source.
/// - `ticker`: Symbol to look up.
///
pub async fn fetch_stock_quote(client: &Client, config: &AppConfig, ticker: &str) -> Result<PrevCloseResponse, ApiError> {
    let url: String = format!(
        "{}/v2/aggs/ticker/{}/prevClose?apiKey={}",
        config.massive_base_url,
        checked_symbol(ticker)?,
        config.massive_api_key
    );

    let quote: PrevCloseResponse = get_json(client, &url).await?;
    debug!("Fetched prevClose for {}", ticker);

    Ok(quote)
}

/// Fetches reference details for a ticker, returned as-is.
pub async fn fetch_stock_details(client: &Client, config: &AppConfig, ticker: &str) -> Result<Value, ApiError> {
    let url: String = format!(
        "{}/v3/reference/tickers/{}?apiKey={}",
        config.massive_base_url,
        checked_symbol(ticker)?,
        config.massive_api_key
    );

    get_json(client, &url).await
}

/// Fetches the current market status, returned as-is.
pub async fn fetch_market_status(client: &Client, config: &AppConfig) -> Result<Value, ApiError> {
    let url: String = format!("{}/v1/marketstatus/now?apiKey={}", config.massive_base_url, config.massive_api_key);

    get_json(client, &url).await
}
