//! Quote normalization.
//!
//! Every ticker on the dashboard goes through [`load_quote`]: a live
//! `prevClose` lookup, or, when that yields nothing usable, a synthetic quote
//! derived from the ticker's characters. Both paths end in the same
//! [`Quote`] shape. Synthetic prices are stable across runs for a given
//! ticker; only the candle wicks carry random jitter.

use futures::future::join_all;
use log::{info, warn};
use rand::{thread_rng, Rng};
use rand_distr::{Distribution, Uniform};
use reqwest::Client;

use crate::api::fetch_stock_quote;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::{OhlcPoint, PrevCloseRecord, PrevCloseResponse, Quote};

pub const HISTORY_LEN: usize = 20;

/// Price used to anchor the live history when the record has no close.
const LIVE_FALLBACK_CLOSE: f64 = 100.0;
const LIVE_WAVE: f64 = 0.02;
const LIVE_ENVELOPE: f64 = 0.01;
const SYNTHETIC_WAVE: f64 = 0.05;
const MAX_WICK_JITTER: f64 = 0.01;

/// Sum of the ticker's UTF-16 code units.
pub fn ticker_seed(ticker: &str) -> u64 {
    ticker.encode_utf16().map(u64::from).sum()
}

/// Deterministic base price in `[50, 549]`.
pub fn base_price(seed: u64) -> f64 {
    (seed % 500 + 50) as f64
}

fn truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percent change from `reference` to `close`, two decimals.
/// `"0.00"` when either side is missing, zero or NaN.
pub fn format_change(close: Option<f64>, reference: Option<f64>) -> String {
    match (close, reference) {
        (Some(c), Some(p)) if truthy(c) && truthy(p) => format!("{:.2}", (c - p) / p * 100.0),
        _ => "0.00".to_string(),
    }
}

/// Synthetic quote for `ticker` using the thread RNG for wick jitter.
pub fn synthetic_quote(ticker: &str) -> Quote {
    synthetic_quote_with_rng(ticker, &mut thread_rng())
}

/// Synthetic quote for `ticker`. Price, change and the open/close sequence
/// depend only on the ticker; `rng` only widens highs and lows.
pub fn synthetic_quote_with_rng<R: Rng + ?Sized>(ticker: &str, rng: &mut R) -> Quote {
    let seed: u64 = ticker_seed(ticker);
    let base: f64 = base_price(seed);
    let seed_f: f64 = seed as f64;

    // Stand-in for a previous close, within +/-2.5% of the base price.
    let stable_random: f64 = seed_f.sin().abs();
    let reference: f64 = round_cents(base * (1.0 + (stable_random * 0.05 - 0.025)));

    let jitter: Uniform<f64> = Uniform::new(0.0, MAX_WICK_JITTER);
    let mut history: Vec<OhlcPoint> = Vec::with_capacity(HISTORY_LEN);
    let mut open: f64 = base;

    for i in 0..HISTORY_LEN {
        let close: f64 = base * (1.0 + (i as f64 + seed_f).sin() * SYNTHETIC_WAVE);
        let high: f64 = open.max(close) * (1.0 + jitter.sample(rng));
        let low: f64 = open.min(close) * (1.0 - jitter.sample(rng));

        history.push(OhlcPoint { o: open, h: high, l: low, c: close, time: i });
        open = close;
    }

    Quote {
        ticker: ticker.to_string(),
        price: base,
        change: format_change(Some(base), Some(reference)),
        history,
    }
}

/// Quote built from a live `prevClose` record.
///
/// The history is a flat sine wave around the close with a fixed 1%
/// envelope. `change` needs `p`, which `prevClose` does not send, so it is
/// `"0.00"` for real upstream data.
pub fn live_quote(ticker: &str, record: &PrevCloseRecord) -> Quote {
    let anchor: f64 = record.c.filter(|c| truthy(*c)).unwrap_or(LIVE_FALLBACK_CLOSE);

    let history: Vec<OhlcPoint> = (0..HISTORY_LEN)
        .map(|i| {
            let price: f64 = anchor * (1.0 + (i as f64).sin() * LIVE_WAVE);
            OhlcPoint {
                o: price,
                h: price * (1.0 + LIVE_ENVELOPE),
                l: price * (1.0 - LIVE_ENVELOPE),
                c: price,
                time: i,
            }
        })
        .collect();

    let price: f64 = record
        .c
        .filter(|c| truthy(*c))
        .or_else(|| record.o.filter(|o| truthy(*o)))
        .unwrap_or(0.0);

    Quote {
        ticker: ticker.to_string(),
        price,
        change: format_change(record.c, record.p),
        history,
    }
}

/// Turns the outcome of a quote fetch into a quote. Errors and empty
/// payloads both fall back to synthetic data; this never fails.
pub fn normalize(ticker: &str, fetched: Result<PrevCloseResponse, ApiError>) -> Quote {
    match fetched {
        Ok(response) => match response.first_result() {
            Some(record) => live_quote(ticker, record),
            None => {
                warn!("No prevClose result for {}, using synthetic quote", ticker);
                synthetic_quote(ticker)
            }
        },
        Err(err) => {
            warn!("Quote fetch for {} failed ({}), using synthetic quote", ticker, err);
            synthetic_quote(ticker)
        }
    }
}

pub async fn load_quote(client: &Client, config: &AppConfig, ticker: &str) -> Quote {
    normalize(ticker, fetch_stock_quote(client, config, ticker).await)
}

/// Loads every ticker concurrently and returns once all are done, in input order.
pub async fn load_quotes(client: &Client, config: &AppConfig, tickers: &[String]) -> Vec<Quote> {
    let quotes: Vec<Quote> = join_all(tickers.iter().map(|ticker| load_quote(client, config, ticker))).await;

    info!("Loaded {} quotes", quotes.len());

    quotes
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use actix_web::{web, HttpResponse};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    use super::*;
    use crate::api::build_client;
    use crate::config::default_tickers;
    use crate::test_support::spawn_upstream;

    fn open_close(quote: &Quote) -> Vec<(f64, f64)> {
        quote.history.iter().map(|p| (p.o, p.c)).collect()
    }

    fn assert_candles_hold(quote: &Quote) {
        assert_eq!(quote.history.len(), HISTORY_LEN);
        for (i, p) in quote.history.iter().enumerate() {
            assert_eq!(p.time, i);
            assert!(p.h >= p.o.max(p.c), "high below body at {}", i);
            assert!(p.l <= p.o.min(p.c), "low above body at {}", i);
            assert!(p.l >= 0.0);
        }
    }

    #[test]
    fn aapl_seed_and_base_price() {
        let seed = ticker_seed("AAPL");
        assert_eq!(seed, 286);
        assert_eq!(base_price(seed), 336.0);

        let quote = synthetic_quote("AAPL");
        assert_eq!(quote.price, 336.0);
        assert_eq!(quote.history[0].o, 336.0);
        assert_eq!(quote.history[0].c, 336.0 * (1.0 + 286f64.sin() * 0.05));
        assert_eq!(quote.history[1].o, quote.history[0].c);
    }

    #[test]
    fn aapl_change_against_stable_reference() {
        let reference = round_cents(336.0 * (1.0 + (286f64.sin().abs() * 0.05 - 0.025)));
        let expected = format!("{:.2}", (336.0 - reference) / reference * 100.0);
        assert_eq!(synthetic_quote("AAPL").change, expected);
    }

    #[test]
    fn synthetic_quote_is_stable_apart_from_wicks() {
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(2);
        let first = synthetic_quote_with_rng("NVDA", &mut a);
        let second = synthetic_quote_with_rng("NVDA", &mut b);

        assert_eq!(first.price, second.price);
        assert_eq!(first.change, second.change);
        assert_eq!(open_close(&first), open_close(&second));
    }

    #[test]
    fn synthetic_candles_cover_open_and_close() {
        for ticker in default_tickers() {
            assert_candles_hold(&synthetic_quote(&ticker));
        }
    }

    #[test]
    fn change_is_zero_when_either_side_missing() {
        assert_eq!(format_change(Some(10.0), None), "0.00");
        assert_eq!(format_change(None, Some(10.0)), "0.00");
        assert_eq!(format_change(Some(0.0), Some(10.0)), "0.00");
        assert_eq!(format_change(Some(10.0), Some(0.0)), "0.00");
        assert_eq!(format_change(Some(f64::NAN), Some(10.0)), "0.00");
        assert_eq!(format_change(Some(110.0), Some(100.0)), "10.00");
        assert_eq!(format_change(Some(95.0), Some(100.0)), "-5.00");
    }

    #[test]
    fn live_quote_uses_close_and_fixed_envelope() {
        let record = PrevCloseRecord { c: Some(200.0), o: Some(190.0), ..Default::default() };
        let quote = live_quote("MSFT", &record);

        assert_eq!(quote.price, 200.0);
        assert_eq!(quote.change, "0.00");
        assert_candles_hold(&quote);
        assert_eq!(quote.history[0].c, 200.0);
        let p = &quote.history[3];
        assert_eq!(p.o, p.c);
        assert_eq!(p.h, p.c * 1.01);
        assert_eq!(p.l, p.c * 0.99);
    }

    #[test]
    fn live_quote_without_close_falls_back_to_open() {
        let record = PrevCloseRecord { o: Some(42.0), ..Default::default() };
        let quote = live_quote("META", &record);

        assert_eq!(quote.price, 42.0);
        assert_eq!(quote.history[0].c, 100.0);
        assert_eq!(quote.change, "0.00");
    }

    #[test]
    fn live_quote_with_previous_close_reports_change() {
        let record = PrevCloseRecord { c: Some(102.0), p: Some(100.0), ..Default::default() };
        assert_eq!(live_quote("TSLA", &record).change, "2.00");
    }

    #[test]
    fn error_and_empty_payload_both_fall_back() {
        let from_error = normalize("AMZN", Err(ApiError::Upstream { service: "Massive", status: 500 }));
        let from_empty = normalize("AMZN", Ok(PrevCloseResponse::default()));
        let synthetic = synthetic_quote("AMZN");

        assert_eq!(from_error.price, synthetic.price);
        assert_eq!(from_error.change, synthetic.change);
        assert_eq!(open_close(&from_error), open_close(&synthetic));
        assert_eq!(open_close(&from_empty), open_close(&synthetic));
    }

    #[actix_rt::test]
    async fn load_quotes_returns_one_quote_per_ticker_when_upstream_fails() {
        let base = spawn_upstream(|cfg: &mut web::ServiceConfig| {
            cfg.default_service(web::to(|| async { HttpResponse::InternalServerError().finish() }));
        })
        .await;
        let config = AppConfig::for_upstream(&base);
        let client = build_client(&config).unwrap();

        let quotes = load_quotes(&client, &config, &config.tickers).await;

        assert_eq!(quotes.len(), config.tickers.len());
        for (quote, ticker) in quotes.iter().zip(&config.tickers) {
            assert_eq!(&quote.ticker, ticker);
            assert_eq!(quote.price, base_price(ticker_seed(ticker)));
            assert_candles_hold(quote);
        }
    }

    #[actix_rt::test]
    async fn load_quote_mixes_live_and_synthetic() {
        let base = spawn_upstream(|cfg: &mut web::ServiceConfig| {
            cfg.route(
                "/v2/aggs/ticker/{ticker}/prevClose",
                web::get().to(|path: web::Path<String>| async move {
                    if path.as_str() == "AAPL" {
                        HttpResponse::Ok().json(json!({ "results": [{ "T": "AAPL", "c": 190.0, "o": 185.0 }] }))
                    } else {
                        HttpResponse::Ok().json(json!({ "resultsCount": 0 }))
                    }
                }),
            );
        })
        .await;
        let config = AppConfig::for_upstream(&base);
        let client = build_client(&config).unwrap();

        let live = load_quote(&client, &config, "AAPL").await;
        assert_eq!(live.price, 190.0);
        assert_eq!(live.change, "0.00");

        let fallback = load_quote(&client, &config, "MSFT").await;
        assert_eq!(fallback.price, base_price(ticker_seed("MSFT")));
    }

    #[actix_rt::test]
    async fn load_quotes_fetches_tickers_concurrently() {
        let base = spawn_upstream(|cfg: &mut web::ServiceConfig| {
            cfg.route(
                "/v2/aggs/ticker/{ticker}/prevClose",
                web::get().to(|path: web::Path<String>| async move {
                    actix_rt::time::sleep(Duration::from_millis(300)).await;
                    let close = ticker_seed(path.as_str()) as f64;
                    HttpResponse::Ok().json(json!({ "results": [{ "T": path.into_inner(), "c": close }] }))
                }),
            );
        })
        .await;
        let config = AppConfig::for_upstream(&base);
        let client = build_client(&config).unwrap();

        let started = Instant::now();
        let quotes = load_quotes(&client, &config, &config.tickers).await;
        let elapsed = started.elapsed();

        // Eight sequential fetches would take at least 2.4s.
        assert!(elapsed < Duration::from_millis(1200), "load took {:?}", elapsed);
        assert_eq!(quotes.len(), config.tickers.len());
        for (quote, ticker) in quotes.iter().zip(&config.tickers) {
            assert_eq!(&quote.ticker, ticker);
            assert_eq!(quote.price, ticker_seed(ticker) as f64);
        }
    }

    proptest! {
        #[test]
        fn synthetic_invariants_hold_for_any_symbol(ticker in "[A-Z]{1,5}", rng_seed in any::<u64>()) {
            let quote = synthetic_quote_with_rng(&ticker, &mut StdRng::seed_from_u64(rng_seed));
            let base = base_price(ticker_seed(&ticker));

            prop_assert!((50.0..=549.0).contains(&base));
            prop_assert_eq!(quote.price, base);
            prop_assert_eq!(quote.history.len(), HISTORY_LEN);
            prop_assert_eq!(quote.history[0].o, base);
            for (i, p) in quote.history.iter().enumerate() {
                prop_assert_eq!(p.time, i);
                prop_assert!(p.h >= p.o.max(p.c));
                prop_assert!(p.l <= p.o.min(p.c));
                prop_assert!(p.l >= 0.0);
            }
            let change: f64 = quote.change.parse().unwrap();
            prop_assert!(change.abs() <= 2.6);
        }
    }
}
