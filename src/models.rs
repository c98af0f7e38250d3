use std::sync::Arc;

use serde::{Deserialize, Serialize};

// Quote source payloads

/// One aggregate bar from the `prevClose` endpoint. Every field is optional
/// because the upstream omits them freely.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PrevCloseRecord {
    #[serde(rename = "T")]
    pub ticker: Option<String>,
    pub o: Option<f64>,
    pub h: Option<f64>,
    pub l: Option<f64>,
    pub c: Option<f64>,
    pub v: Option<f64>,
    /// Previous close. Not sent by `prevClose` itself.
    pub p: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PrevCloseResponse {
    #[serde(default)]
    pub results: Option<Vec<PrevCloseRecord>>,
}

impl PrevCloseResponse {
    /// The record the normalizer uses; `None` triggers the synthetic path.
    pub fn first_result(&self) -> Option<&PrevCloseRecord> {
        self.results.as_ref().and_then(|r| r.first())
    }
}

// Normalized dashboard data

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OhlcPoint {
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub time: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    /// Percent change, always formatted with two decimals.
    pub change: String,
    pub history: Vec<OhlcPoint>,
}

/// Snapshot of every loaded quote, handed to the chat prompt.
pub type MarketContext = Arc<[Quote]>;

// Chat payloads

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Serialize, Debug)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}
