//! Telegram Bot API client and chat command parsing.
//!
//! Only the two calls the service needs: `sendMessage` to deliver forecasts
//! and `getUpdates` to receive subscriber commands. Both go through the
//! blocking reqwest client, like the rest of the service's HTTP traffic.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

// ============================================================================
// Errors
// ============================================================================

/// Errors delivering or receiving bot messages.
#[derive(Debug, PartialEq)]
pub enum NotifyError {
    /// Non-2xx HTTP response without a usable API error body.
    Http(u16),
    /// The request never produced a response.
    Transport(String),
    /// The Bot API answered `ok: false`.
    Api { code: i64, description: String },
    /// The response body was not what the Bot API documents.
    Parse(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Http(code) => write!(f, "HTTP error: {}", code),
            NotifyError::Transport(msg) => write!(f, "Transport error: {}", msg),
            NotifyError::Api { code, description } => {
                write!(f, "Telegram API error {}: {}", code, description)
            }
            NotifyError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return NotifyError::Parse(err.to_string());
        }
        match err.status() {
            Some(status) => NotifyError::Http(status.as_u16()),
            None => NotifyError::Transport(err.to_string()),
        }
    }
}

// ============================================================================
// Delivery seam
// ============================================================================

/// Anything that can deliver a text message to a chat.
pub trait Notifier {
    fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;
}

// ============================================================================
// Bot API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, NotifyError> {
        if !self.ok {
            return Err(NotifyError::Api {
                code: self.error_code.unwrap_or_default(),
                description: self.description.unwrap_or_default(),
            });
        }
        self.result
            .ok_or_else(|| NotifyError::Parse("ok response without result".into()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

// ============================================================================
// Client
// ============================================================================

pub struct TelegramClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str, timeout_secs: u64) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(TelegramClient {
            client,
            base_url: format!("{}/bot{}", TELEGRAM_API_URL, token),
        })
    }

    fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, NotifyError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self.client.post(&url).json(&body).send()?;
        let status = response.status();

        // Error responses still carry a JSON body with a description
        match response.json::<ApiResponse<T>>() {
            Ok(parsed) => parsed.into_result(),
            Err(_) if !status.is_success() => Err(NotifyError::Http(status.as_u16())),
            Err(e) => Err(NotifyError::Parse(e.to_string())),
        }
    }

    /// Sends a plain-text message.
    pub fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let _: serde_json::Value = self.call(
            "sendMessage",
            json!({ "chat_id": chat_id, "text": text }),
        )?;
        Ok(())
    }

    /// Fetches pending updates after `offset`.
    ///
    /// Pass the last seen `update_id + 1` as the next offset; Telegram then
    /// forgets everything before it.
    pub fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>, NotifyError> {
        let mut body = json!({ "timeout": timeout_secs, "allowed_updates": ["message"] });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", body)
    }
}

impl Notifier for TelegramClient {
    fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        self.send_message(chat_id, text)
    }
}

// ============================================================================
// Commands
// ============================================================================

/// What a subscriber asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    /// `/point` with the requested key; empty when none was given.
    Point(String),
    /// Anything else: reply with the current forecast.
    Status,
}

/// Parses a chat message. Bot mentions (`/stop@somebot`) are accepted.
pub fn parse_command(text: &str) -> Command {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return Command::Status;
    };
    let name = first.split('@').next().unwrap_or(first);
    match name {
        "/start" => Command::Start,
        "/stop" => Command::Stop,
        "/point" => Command::Point(words.next().unwrap_or_default().to_string()),
        _ => Command::Status,
    }
}
