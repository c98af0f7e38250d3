use serde::Serialize;

use crate::models::{OhlcPoint, Quote};

const SPARK_WIDTH: f64 = 100.0;
const SPARK_HEIGHT: f64 = 50.0;
const FLAT_SPARKLINE: &str = "M 0 25 L 100 25";

/// What a dashboard tile shows.
#[derive(Serialize, Debug, Clone)]
pub struct TileView {
    pub ticker: String,
    pub price: f64,
    pub change: String,
    pub positive: bool,
    pub sparkline: String,
}

/// One row of the candlestick chart.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CandleRow {
    pub name: String,
    #[serde(flatten)]
    pub point: OhlcPoint,
    pub body: [f64; 2],
    pub wick: [f64; 2],
    pub rising: bool,
}

/// The detailed analysis panel for one stock.
#[derive(Serialize, Debug, Clone)]
pub struct DetailView {
    #[serde(flatten)]
    pub tile: TileView,
    pub candles: Vec<CandleRow>,
    pub high: f64,
    pub low: f64,
}

fn is_positive(change: &str) -> bool {
    change.parse::<f64>().map(|c| c >= 0.0).unwrap_or(true)
}

/// SVG path through `values` scaled into a 100x50 box, highest value at the top.
pub fn sparkline_path(values: &[f64]) -> String {
    if values.len() < 2 {
        return FLAT_SPARKLINE.to_string();
    }

    let min: f64 = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max: f64 = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range: f64 = if max - min == 0.0 { 1.0 } else { max - min };
    let last: f64 = (values.len() - 1) as f64;

    let points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = i as f64 / last * SPARK_WIDTH;
            let y = SPARK_HEIGHT - (v - min) / range * SPARK_HEIGHT;
            format!("{} {}", x, y)
        })
        .collect();

    format!("M {}", points.join(" L "))
}

pub fn candle_rows(history: &[OhlcPoint]) -> Vec<CandleRow> {
    let len = history.len();
    history
        .iter()
        .enumerate()
        .map(|(i, p)| CandleRow {
            name: format!("T-{}", len - i),
            point: p.clone(),
            body: [p.o.min(p.c), p.o.max(p.c)],
            wick: [p.l, p.h],
            rising: p.c >= p.o,
        })
        .collect()
}

/// Highest high and lowest low across the history, `(0, 0)` when empty.
pub fn session_range(history: &[OhlcPoint]) -> (f64, f64) {
    if history.is_empty() {
        return (0.0, 0.0);
    }
    let high = history.iter().map(|p| p.h).fold(f64::NEG_INFINITY, f64::max);
    let low = history.iter().map(|p| p.l).fold(f64::INFINITY, f64::min);
    (high, low)
}

impl TileView {
    pub fn from_quote(quote: &Quote) -> Self {
        let closes: Vec<f64> = quote.history.iter().map(|p| p.c).collect();
        Self {
            ticker: quote.ticker.clone(),
            price: quote.price,
            change: quote.change.clone(),
            positive: is_positive(&quote.change),
            sparkline: sparkline_path(&closes),
        }
    }
}

impl DetailView {
    pub fn from_quote(quote: &Quote) -> Self {
        let (high, low) = session_range(&quote.history);
        Self {
            tile: TileView::from_quote(quote),
            candles: candle_rows(&quote.history),
            high,
            low,
        }
    }
}
