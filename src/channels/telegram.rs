//! Telegram channel — long-polls the Bot API for updates.
//!
//! Text messages become `Payload::Text`; inline-keyboard taps arrive as
//! callback queries and become `Payload::Choice`, so constrained answers
//! never travel as free text.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::channels::{
    Channel, IncomingMessage, MessageStream, OutgoingResponse, Payload,
};
use crate::error::ChannelError;
use crate::wizard::Keyboard;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: String,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// Check if a username is in the allowed list.
    pub fn is_user_allowed(&self, username: &str) -> bool {
        self.allowed_users.iter().any(|u| u == "*" || u == username)
    }

    /// Check if any of the provided identities is allowed.
    pub fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        identities.into_iter().any(|id| self.is_user_allowed(id))
    }

    /// Send a text message, trying Markdown first with plain text fallback.
    /// Splits long messages that exceed Telegram's 4096 char limit.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            // The keyboard goes on the final chunk only.
            let markup = if i == last { keyboard } else { None };
            self.send_message_chunk(chat_id, chunk, markup).await?;
        }
        Ok(())
    }

    /// Send a single message chunk (≤4096 chars), Markdown-first with fallback.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let mut markdown_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });
        if let Some(keyboard) = keyboard {
            markdown_body["reply_markup"] = keyboard_markup(keyboard);
        }

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        tracing::warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let mut plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(keyboard) = keyboard {
            plain_body["reply_markup"] = keyboard_markup(keyboard);
        }
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (markdown: {}, plain: {})",
                    markdown_status, plain_err
                ),
            });
        }

        Ok(())
    }

    /// Send a document from bytes (in-memory).
    pub async fn send_document_bytes(
        &self,
        chat_id: &str,
        file_bytes: Vec<u8>,
        file_name: &str,
        caption: Option<&str>,
    ) -> anyhow::Result<()> {
        let part = Part::bytes(file_bytes).file_name(file_name.to_string());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        if let Some(cap) = caption {
            form = form.text("caption", cap.to_string());
        }

        let resp = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram sendDocument failed: {err}");
        }

        tracing::info!("Telegram document sent to {chat_id}: {file_name}");
        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let url = format!("https://api.telegram.org/bot{}/getUpdates", bot_token);
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(serde_json::Value::as_array) {
                    for update in results {
                        if let Some(uid) =
                            update.get("update_id").and_then(serde_json::Value::as_i64)
                        {
                            offset = uid + 1;
                        }

                        let Some(incoming) = parse_update(update, &allowed_users) else {
                            continue;
                        };

                        // Acknowledge button taps.
                        if let Some(callback_id) = incoming
                            .metadata
                            .get("callback_id")
                            .and_then(|v| v.as_str())
                        {
                            let body =
                                serde_json::json!({ "callback_query_id": callback_id });
                            let _ = client
                                .post(format!(
                                    "https://api.telegram.org/bot{}/answerCallbackQuery",
                                    bot_token
                                ))
                                .json(&body)
                                .send()
                                .await;
                        }

                        if tx.send(incoming).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        if !response.content.is_empty() {
            self.send_message(chat_id, &response.content, response.keyboard.as_ref())
                .await?;
        }

        if let Some(document) = response.document {
            self.send_document_bytes(
                chat_id,
                document.bytes,
                &document.file_name,
                document.caption.as_deref(),
            )
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Parse one update into an `IncomingMessage`, applying the allowlist.
/// Returns `None` for updates we don't handle or unauthorized senders.
fn parse_update(update: &serde_json::Value, allowed_users: &[String]) -> Option<IncomingMessage> {
    // Button tap: callback_query carries the choice value.
    if let Some(callback) = update.get("callback_query") {
        let data = callback.get("data")?.as_str()?;
        let from = callback.get("from")?;
        let (sender, username, first_name) = sender_identity(from)?;
        if !check_user_allowed(allowed_users, [username.as_str(), sender.as_str()]) {
            tracing::warn!(%username, "Telegram: ignoring callback from unauthorized user");
            return None;
        }
        let chat_id = callback
            .get("message")
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(serde_json::Value::as_i64)
            .map(|id| id.to_string())
            .unwrap_or_default();
        let callback_id = callback.get("id").and_then(|v| v.as_str()).unwrap_or("");

        let mut incoming =
            IncomingMessage::new("telegram", &sender, Payload::Choice(data.to_string()))
                .with_metadata(serde_json::json!({
                    "chat_id": chat_id,
                    "username": username,
                    "callback_id": callback_id,
                }));
        if let Some(name) = first_name {
            incoming = incoming.with_sender_name(name);
        }
        return Some(incoming);
    }

    // Plain message: free text.
    let message = update.get("message")?;
    let text = message.get("text").and_then(serde_json::Value::as_str)?;
    let from = message.get("from")?;
    let (sender, username, first_name) = sender_identity(from)?;
    if !check_user_allowed(allowed_users, [username.as_str(), sender.as_str()]) {
        tracing::warn!(%username, "Telegram: ignoring message from unauthorized user");
        return None;
    }
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_default();

    let mut incoming = IncomingMessage::new("telegram", &sender, Payload::Text(text.to_string()))
        .with_metadata(serde_json::json!({
            "chat_id": chat_id,
            "username": username,
        }));
    if let Some(name) = first_name {
        incoming = incoming.with_sender_name(name);
    }
    Some(incoming)
}

/// Extract (stable id, username, first name) from a `from` object.
/// The numeric user id is the stable identity; username is for allowlists.
fn sender_identity(from: &serde_json::Value) -> Option<(String, String, Option<String>)> {
    let user_id = from.get("id").and_then(serde_json::Value::as_i64)?;
    let username = from
        .get("username")
        .and_then(|u| u.as_str())
        .unwrap_or("unknown")
        .to_string();
    let first_name = from
        .get("first_name")
        .and_then(|n| n.as_str())
        .map(String::from);
    Some((user_id.to_string(), username, first_name))
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Render a wizard keyboard as Telegram inline-keyboard markup.
fn keyboard_markup(keyboard: &Keyboard) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| serde_json::json!({ "text": b.label, "callback_data": b.data }))
                .collect()
        })
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let chunk = &remaining[..max_len];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(max_len);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { max_len } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::Button;

    #[test]
    fn telegram_channel_name() {
        let ch = TelegramChannel::new("fake-token".into(), vec!["*".into()]);
        assert_eq!(ch.name(), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        let ch = TelegramChannel::new("123:ABC".into(), vec![]);
        assert_eq!(
            ch.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[test]
    fn telegram_user_allowed_wildcard() {
        let ch = TelegramChannel::new("t".into(), vec!["*".into()]);
        assert!(ch.is_user_allowed("anyone"));
    }

    #[test]
    fn telegram_user_allowed_specific() {
        let ch = TelegramChannel::new("t".into(), vec!["alice".into(), "bob".into()]);
        assert!(ch.is_user_allowed("alice"));
        assert!(!ch.is_user_allowed("eve"));
    }

    #[test]
    fn telegram_user_denied_empty() {
        let ch = TelegramChannel::new("t".into(), vec![]);
        assert!(!ch.is_user_allowed("anyone"));
    }

    #[test]
    fn telegram_user_exact_match_not_substring() {
        let ch = TelegramChannel::new("t".into(), vec!["alice".into()]);
        assert!(!ch.is_user_allowed("alice_bot"));
        assert!(!ch.is_user_allowed("alic"));
        assert!(!ch.is_user_allowed("malice"));
    }

    #[test]
    fn telegram_user_allowed_by_numeric_id_identity() {
        let ch = TelegramChannel::new("t".into(), vec!["123456789".into()]);
        assert!(ch.is_any_user_allowed(["unknown", "123456789"]));
    }

    #[test]
    fn parse_update_text_message() {
        let update = serde_json::json!({
            "update_id": 7,
            "message": {
                "text": "hello",
                "from": { "id": 42, "username": "ada", "first_name": "Ada" },
                "chat": { "id": 42 }
            }
        });
        let msg = parse_update(&update, &["*".to_string()]).unwrap();
        assert_eq!(msg.sender, "42");
        assert_eq!(msg.payload, Payload::Text("hello".into()));
        assert_eq!(msg.metadata["chat_id"], "42");
        assert_eq!(msg.sender_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn parse_update_callback_query() {
        let update = serde_json::json!({
            "update_id": 8,
            "callback_query": {
                "id": "cb1",
                "data": "payroll",
                "from": { "id": 42, "username": "ada" },
                "message": { "chat": { "id": 42 } }
            }
        });
        let msg = parse_update(&update, &["*".to_string()]).unwrap();
        assert_eq!(msg.payload, Payload::Choice("payroll".into()));
        assert_eq!(msg.metadata["callback_id"], "cb1");
    }

    #[test]
    fn parse_update_rejects_unauthorized() {
        let update = serde_json::json!({
            "message": {
                "text": "hello",
                "from": { "id": 42, "username": "eve" },
                "chat": { "id": 42 }
            }
        });
        assert!(parse_update(&update, &["alice".to_string()]).is_none());
    }

    #[test]
    fn parse_update_ignores_non_text() {
        let update = serde_json::json!({
            "message": {
                "sticker": {},
                "from": { "id": 42, "username": "ada" },
                "chat": { "id": 42 }
            }
        });
        assert!(parse_update(&update, &["*".to_string()]).is_none());
    }

    #[test]
    fn keyboard_markup_shape() {
        let keyboard = Keyboard {
            rows: vec![
                vec![Button::new("Weekly", "weekly"), Button::new("Monthly", "monthly")],
                vec![Button::new("⏭️ Skip", "skip")],
            ],
        };
        let markup = keyboard_markup(&keyboard);
        assert_eq!(markup["inline_keyboard"][0][1]["callback_data"], "monthly");
        assert_eq!(markup["inline_keyboard"][1][0]["text"], "⏭️ Skip");
    }

    #[test]
    fn split_message_short() {
        let chunks = split_message("Hello", 4096);
        assert_eq!(chunks, vec!["Hello"]);
    }

    #[test]
    fn split_message_exact_limit() {
        let msg = "a".repeat(4096);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4096);
    }

    #[test]
    fn split_message_over_limit_on_newline() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(2000));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn split_message_no_good_split_point() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }
}
