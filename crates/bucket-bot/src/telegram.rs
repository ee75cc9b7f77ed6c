//! Thin Telegram Bot API client.
//!
//! Long-polls `getUpdates` and delivers [`Reply`] values via `sendMessage`.
//! Update payloads stay as `serde_json::Value`; the helpers below extract
//! the two things the conversation core needs — a stable chat id and the
//! text of a plain or edited message.

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tracing::debug;

use bucket_core::{command, reply::Reply};

/// Telegram Bot API base URL. Method calls are POSTed to
/// `{BASE_URL}{bot_token}/{method}`.
const TELEGRAM_API_BASE: &str = "https://api.telegram.org/bot";

/// Client bound to one bot token.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
}

impl TelegramClient {
    /// Create a client for `token`.
    pub fn new(token: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("concept-bucket/0.1")
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: format!("{TELEGRAM_API_BASE}{token}"),
        }
    }

    /// Verify the token via `getMe` and return the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let response: Value = self
            .http
            .get(format!("{}/getMe", self.api_base))
            .send()
            .await
            .context("failed to reach Telegram API")?
            .json()
            .await
            .context("failed to parse getMe response")?;

        if response.get("ok").and_then(Value::as_bool) != Some(true) {
            bail!("Telegram getMe failed: {response}");
        }

        Ok(response
            .pointer("/result/username")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Value>> {
        let response: Value = self
            .http
            .post(format!("{}/getUpdates", self.api_base))
            .json(&json!({
                "offset": offset,
                "timeout": timeout,
                "allowed_updates": ["message", "edited_message"],
            }))
            .send()
            .await
            .context("Telegram poll failed")?
            .json()
            .await
            .context("failed to parse Telegram response")?;

        Ok(response
            .get("result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Deliver one reply to `chat_id`.
    pub async fn send_reply(&self, chat_id: i64, reply: &Reply) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": reply.text,
        });
        if reply.markdown {
            body["parse_mode"] = json!("Markdown");
        }
        if reply.keyboard {
            body["reply_markup"] = keyboard_markup();
        }

        debug!(chat_id, "sending reply");

        let response: Value = self
            .http
            .post(format!("{}/sendMessage", self.api_base))
            .json(&body)
            .send()
            .await
            .context("failed to send message")?
            .json()
            .await
            .context("failed to parse sendMessage response")?;

        if response.get("ok").and_then(Value::as_bool) != Some(true) {
            bail!("Telegram sendMessage failed: {response}");
        }

        Ok(())
    }
}

/// The persistent reply keyboard, rendered from the same labels the command
/// parser matches.
fn keyboard_markup() -> Value {
    let rows: Vec<Vec<Value>> = command::KEYBOARD_ROWS
        .iter()
        .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
        .collect();

    json!({
        "keyboard": rows,
        "resize_keyboard": true,
    })
}

// ── update parsing ───────────────────────────────────────────────────

/// The monotonically increasing update id, used to advance the poll offset.
pub fn update_id(update: &Value) -> i64 {
    update.get("update_id").and_then(Value::as_i64).unwrap_or(0)
}

/// Extract `(chat_id, text)` from an update.
///
/// The text of a plain or edited message; absence of both yields an empty
/// string, which matches no command and the machine treats as a no-op.
/// `None` only when the update carries no chat at all.
pub fn extract_event(update: &Value) -> Option<(i64, String)> {
    let chat_id = update
        .pointer("/message/chat/id")
        .or_else(|| update.pointer("/edited_message/chat/id"))
        .and_then(Value::as_i64)?;

    let text = update
        .pointer("/message/text")
        .or_else(|| update.pointer("/edited_message/text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some((chat_id, text))
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_message_text() {
        let update = json!({
            "update_id": 7,
            "message": { "chat": { "id": 42 }, "text": "hello" }
        });

        assert_eq!(update_id(&update), 7);
        assert_eq!(extract_event(&update), Some((42, "hello".to_string())));
    }

    #[test]
    fn extracts_edited_message_text() {
        let update = json!({
            "update_id": 8,
            "edited_message": { "chat": { "id": 42 }, "text": "fixed typo" }
        });

        assert_eq!(extract_event(&update), Some((42, "fixed typo".to_string())));
    }

    #[test]
    fn textless_message_yields_empty_string() {
        // A photo, sticker, etc.: there is a chat but no text.
        let update = json!({
            "update_id": 9,
            "message": { "chat": { "id": 42 } }
        });

        assert_eq!(extract_event(&update), Some((42, String::new())));
    }

    #[test]
    fn chatless_update_is_skipped() {
        let update = json!({ "update_id": 10 });
        assert_eq!(extract_event(&update), None);
    }

    #[test]
    fn keyboard_covers_every_command_row() {
        let markup = keyboard_markup();
        let rows = markup["keyboard"].as_array().unwrap();

        assert_eq!(rows.len(), command::KEYBOARD_ROWS.len());
        assert_eq!(rows[0][0]["text"], command::NEW_BUCKET);
        assert_eq!(rows[3][1]["text"], command::CANCEL);
    }
}
