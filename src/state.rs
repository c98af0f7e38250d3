use std::sync::{Mutex as SyncMutex, MutexGuard, PoisonError};

use log::{info, warn};
use reqwest::Client;
use tokio::sync::Mutex;

use crate::chat::{chat_with_model, ChatSession, CONNECTION_TROUBLE};
use crate::config::AppConfig;
use crate::dashboard::Dashboard;
use crate::error::ApiError;
use crate::models::{ChatMessage, Quote, Role};
use crate::normalizer::load_quotes;

/// Shared by every handler. Locks are never held across network calls.
pub struct AppState {
    pub client: Client,
    pub config: AppConfig,
    pub dashboard: Mutex<Dashboard>,
    /// Plain mutex so the in-flight guard can settle the session from `Drop`.
    pub chat: SyncMutex<ChatSession>,
}

/// Settles an in-flight chat request. If the request future is dropped
/// before a reply arrives, the session gets a failure reply and accepts
/// new input again.
struct InFlight<'a> {
    chat: &'a SyncMutex<ChatSession>,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, reply: ChatMessage) {
        self.settled = true;
        lock_chat(self.chat).finish(reply);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Chat request dropped before a reply arrived");
            lock_chat(self.chat).finish(ChatMessage::new(
                Role::Assistant,
                format!("{} Debug: request cancelled", CONNECTION_TROUBLE),
            ));
        }
    }
}

/// The session stays usable even if a holder panicked.
fn lock_chat(chat: &SyncMutex<ChatSession>) -> MutexGuard<'_, ChatSession> {
    chat.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AppState {
    pub fn new(config: AppConfig, client: Client) -> Self {
        let dashboard = Dashboard::new(config.tickers.clone());
        Self {
            client,
            config,
            dashboard: Mutex::new(dashboard),
            chat: SyncMutex::new(ChatSession::new()),
        }
    }

    pub fn chat(&self) -> MutexGuard<'_, ChatSession> {
        lock_chat(&self.chat)
    }

    /// Runs one load cycle and installs the result.
    pub async fn reload(&self) -> Vec<Quote> {
        let tickers: Vec<String> = self.dashboard.lock().await.tickers().to_vec();
        info!("Loading quotes for {} tickers", tickers.len());

        let quotes: Vec<Quote> = load_quotes(&self.client, &self.config, &tickers).await;
        self.dashboard.lock().await.replace(quotes.clone());

        quotes
    }

    /// Sends the user's message with the current market snapshot and
    /// records the reply. Chat failures come back as an assistant message.
    pub async fn ask(&self, input: &str) -> Result<ChatMessage, ApiError> {
        let outgoing: Vec<ChatMessage> = self.chat().begin(input)?;
        let in_flight = InFlight { chat: &self.chat, settled: false };
        let context = self.dashboard.lock().await.context();

        let reply: ChatMessage = chat_with_model(&self.client, &self.config, &outgoing, context.as_ref()).await;
        in_flight.settle(reply.clone());

        Ok(reply)
    }
}
