use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{MarketContext, Quote};

/// Owned dashboard state: the watched tickers, the quotes from the last
/// load cycle, the selected stock and the snapshot the chat reads.
#[derive(Debug)]
pub struct Dashboard {
    tickers: Vec<String>,
    stocks: Vec<Quote>,
    selected: Option<String>,
    context: Option<MarketContext>,
    loading: bool,
}

impl Dashboard {
    pub fn new(tickers: Vec<String>) -> Self {
        Self {
            tickers,
            stocks: Vec::new(),
            selected: None,
            context: None,
            loading: true,
        }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn stocks(&self) -> &[Quote] {
        &self.stocks
    }

    /// Installs the result of a load cycle and replaces the market context.
    pub fn replace(&mut self, quotes: Vec<Quote>) {
        self.context = Some(Arc::from(quotes.clone()));
        self.stocks = quotes;
        self.loading = false;

        if let Some(selected) = &self.selected {
            if !self.stocks.iter().any(|q| &q.ticker == selected) {
                self.selected = None;
            }
        }
    }

    /// Snapshot of the last load, shared with the chat without copying.
    pub fn context(&self) -> Option<MarketContext> {
        self.context.clone()
    }

    pub fn quote(&self, ticker: &str) -> Result<&Quote, ApiError> {
        self.stocks
            .iter()
            .find(|q| q.ticker.eq_ignore_ascii_case(ticker))
            .ok_or_else(|| ApiError::NotFound(ticker.to_string()))
    }

    pub fn select(&mut self, ticker: &str) -> Result<&Quote, ApiError> {
        let canonical = self.quote(ticker)?.ticker.clone();
        self.selected = Some(canonical);
        self.quote(ticker)
    }

    /// The selected stock, or the first loaded one when nothing is selected.
    pub fn selected_or_first(&self) -> Option<&Quote> {
        self.selected
            .as_deref()
            .and_then(|t| self.stocks.iter().find(|q| q.ticker == t))
            .or_else(|| self.stocks.first())
    }
}
