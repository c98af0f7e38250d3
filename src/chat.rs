//! Chat collaborator: wraps the user's conversation with a system prompt
//! that carries the current market snapshot and posts it to an
//! OpenAI-compatible `chat/completions` endpoint.

use log::{debug, error};
use reqwest::Client;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::{ChatMessage, ChatRequest, ChatResponse, MarketContext, Role};

pub const GREETING: &str =
    "# Hello! \nI can analyze the market data for you. Ask me anything about the stocks on your dashboard.";
pub const CONNECTION_TROUBLE: &str = "I'm having trouble connecting.";

/// System message with the market context serialized as JSON (`null` before the first load).
pub fn system_prompt(context: Option<&MarketContext>) -> Result<ChatMessage, ApiError> {
    let context_json: String = serde_json::to_string(&context.map(|c| &c[..]))?;

    Ok(ChatMessage::new(
        Role::System,
        format!(
            "You are a Stock Assessment AI Assistant.\n\
             You have access to real-time market data.\n\
             Current Stock Data Context: {}\n\n\
             Answer the user's questions about stocks using this data.\n\
             Be concise, professional, and insightful.\n",
            context_json
        ),
    ))
}

/// Sends the conversation and returns the first choice's message.
pub async fn request_completion(
    client: &Client,
    config: &AppConfig,
    messages: &[ChatMessage],
    context: Option<&MarketContext>,
) -> Result<ChatMessage, ApiError> {
    let mut outgoing: Vec<ChatMessage> = Vec::with_capacity(messages.len() + 1);
    outgoing.push(system_prompt(context)?);
    outgoing.extend_from_slice(messages);

    let request = ChatRequest { model: &config.chat_model, messages: outgoing, stream: false };

    let response: reqwest::Response = client
        .post(format!("{}/chat/completions", config.chat_base_url))
        .bearer_auth(&config.chat_api_key)
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body: Option<String> = response.text().await.ok();
        error!("Chat API Error: {} {:?}", status, body);
        return Err(ApiError::Upstream { service: "Chat", status: status.as_u16() });
    }

    let response_text: String = response.text().await?;
    let parsed: ChatResponse = serde_json::from_str(&response_text)?;
    debug!("Chat completion returned {} choice(s)", parsed.choices.len());

    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or(ApiError::MissingChoice)
}

/// Like [`request_completion`], but failures become an assistant message
/// for the transcript instead of an error.
pub async fn chat_with_model(
    client: &Client,
    config: &AppConfig,
    messages: &[ChatMessage],
    context: Option<&MarketContext>,
) -> ChatMessage {
    match request_completion(client, config, messages, context).await {
        Ok(message) => message,
        Err(err) => {
            error!("Chat error: {}", err);
            ChatMessage::new(Role::Assistant, format!("{} Debug: {}", CONNECTION_TROUBLE, err))
        }
    }
}

/// The chat transcript. One request may be in flight at a time.
#[derive(Debug)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    pending: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::new(Role::Assistant, GREETING)],
            pending: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Records the user's input and returns the conversation to send.
    pub fn begin(&mut self, input: &str) -> Result<Vec<ChatMessage>, ApiError> {
        if input.trim().is_empty() {
            return Err(ApiError::BadRequest("message is empty".to_string()));
        }
        if self.pending {
            return Err(ApiError::Busy);
        }

        self.messages.push(ChatMessage::new(Role::User, input));
        self.pending = true;

        Ok(self.messages.clone())
    }

    pub fn finish(&mut self, reply: ChatMessage) {
        self.messages.push(reply);
        self.pending = false;
    }
}
