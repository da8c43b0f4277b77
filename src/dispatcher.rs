//! Message dispatch — routes inbound events to the wizard and carries out
//! its effects.
//!
//! One handler task is spawned per inbound message, in arrival order; the
//! per-identity session lock serializes transitions for the same identity
//! while different identities proceed in parallel. The assembler and the
//! store run only at the terminal transition, fire-and-forget: the session
//! is already complete when they start, so their latency or failure cannot
//! corrupt it.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;

use crate::channels::{Channel, IncomingMessage, OutgoingDocument, OutgoingResponse, Payload};
use crate::error::Result;
use crate::render::DocumentAssembler;
use crate::store::{DocumentStore, NewDocument};
use crate::wizard::{Effect, FinalizedDocument, SessionStore, WizardInput, WizardMachine};

/// A recognized slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Cancel,
    Help,
    History,
}

/// What to do with one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Command(Command),
    Wizard(WizardInput),
    Ignore,
}

fn classify(payload: &Payload) -> Action {
    match payload {
        Payload::Text(text) => {
            let trimmed = text.trim();
            if let Some(command) = trimmed.strip_prefix('/') {
                match command.split_whitespace().next().unwrap_or("") {
                    "start" => Action::Command(Command::Start),
                    "cancel" => Action::Command(Command::Cancel),
                    "help" => Action::Command(Command::Help),
                    "history" => Action::Command(Command::History),
                    _ => Action::Ignore,
                }
            } else {
                Action::Wizard(WizardInput::Text(trimmed.to_string()))
            }
        }
        Payload::Choice(value) => Action::Wizard(WizardInput::Choice(value.clone())),
    }
}

/// Routes messages between channels and the wizard.
pub struct Dispatcher {
    machine: WizardMachine,
    sessions: Arc<SessionStore>,
    assembler: Arc<dyn DocumentAssembler>,
    store: Arc<dyn DocumentStore>,
    history_limit: usize,
}

impl Dispatcher {
    pub fn new(
        machine: WizardMachine,
        sessions: Arc<SessionStore>,
        assembler: Arc<dyn DocumentAssembler>,
        store: Arc<dyn DocumentStore>,
        history_limit: usize,
    ) -> Self {
        Self {
            machine,
            sessions,
            assembler,
            store,
            history_limit,
        }
    }

    /// Start all channels and pump their merged message streams until they
    /// close.
    pub async fn run(self: Arc<Self>, channels: Vec<Arc<dyn Channel>>) -> Result<()> {
        let mut streams = Vec::new();
        for channel in &channels {
            let stream = channel.start().await?;
            let channel = Arc::clone(channel);
            streams.push(stream.map(move |msg| (Arc::clone(&channel), msg)).boxed());
        }

        let mut merged = futures::stream::select_all(streams);
        while let Some((channel, msg)) = merged.next().await {
            let this = Arc::clone(&self);
            // Spawned in arrival order; the fair session lock keeps
            // same-identity transitions in that order.
            tokio::spawn(async move {
                this.handle_message(&channel, msg).await;
            });
        }

        tracing::info!("All channel streams closed; dispatcher stopping");
        Ok(())
    }

    /// Process one inbound event end to end.
    pub async fn handle_message(&self, channel: &Arc<dyn Channel>, msg: IncomingMessage) {
        let action = classify(&msg.payload);
        tracing::debug!(
            channel = msg.channel,
            sender = msg.sender,
            ?action,
            "Inbound message"
        );

        let input = match action {
            Action::Ignore => {
                self.send(channel, &msg, OutgoingResponse::text(
                    "Unknown command. Try /start, /help, /history or /cancel.",
                ))
                .await;
                return;
            }
            Action::Command(Command::Help) => {
                self.send(channel, &msg, OutgoingResponse::text(help_text()))
                    .await;
                return;
            }
            Action::Command(Command::History) => {
                let response = self.history_response(&msg.sender).await;
                self.send(channel, &msg, response).await;
                return;
            }
            Action::Command(Command::Start) => WizardInput::Restart,
            Action::Command(Command::Cancel) => WizardInput::Cancel,
            Action::Wizard(input) => input,
        };

        let transition = {
            let handle = self.sessions.obtain(&msg.sender).await;
            let mut session = handle.lock().await;
            self.machine.handle(&mut session, input)
        };

        if let Some(reply) = transition.reply {
            let mut response = OutgoingResponse::text(reply.text);
            if let Some(keyboard) = reply.keyboard {
                response = response.with_keyboard(keyboard);
            }
            self.send(channel, &msg, response).await;
        }

        for effect in transition.effects {
            match effect {
                Effect::Finalize(document) => self.spawn_finalize(channel, &msg, document),
            }
        }
    }

    /// Render, deliver, and persist a finalized document off the dispatch
    /// path. The wizard has already reached its end state; nothing here
    /// rolls it back.
    fn spawn_finalize(
        &self,
        channel: &Arc<dyn Channel>,
        msg: &IncomingMessage,
        document: FinalizedDocument,
    ) {
        let assembler = Arc::clone(&self.assembler);
        let store = Arc::clone(&self.store);
        let channel = Arc::clone(channel);
        let msg = msg.clone();

        tokio::spawn(async move {
            let artifact = match assembler.render(&document, Utc::now()) {
                Ok(artifact) => artifact,
                Err(e) => {
                    tracing::error!("Document generation failed: {e}");
                    let response = OutgoingResponse::text(
                        "❌ An error occurred while generating the document.\nPlease try again with /start.",
                    );
                    if let Err(e) = channel.respond(&msg, response).await {
                        tracing::warn!("Failed to report render failure: {e}");
                    }
                    return;
                }
            };

            let file_name = artifact.file_name.clone();
            let response = OutgoingResponse::text(String::new()).with_document(OutgoingDocument {
                file_name: file_name.clone(),
                bytes: artifact.bytes.clone(),
                caption: Some(format!(
                    "✅ Your document has been generated!\n\n📄 {file_name}"
                )),
            });
            if let Err(e) = channel.respond(&msg, response).await {
                tracing::warn!("Failed to deliver document: {e}");
            }

            let stored = store
                .store_document(NewDocument {
                    user_id: document.user_id.clone(),
                    user_name: msg.sender_name.clone(),
                    category: document.category,
                    template_id: document.template_id.clone(),
                    fields: document.fields.clone(),
                    file_name,
                    artifact: artifact.bytes,
                })
                .await;

            let closing = match stored {
                Ok(id) => {
                    tracing::info!(record_id = %id, user_id = %document.user_id, "Document stored");
                    "🎉 Document saved!\n\nUse /start to create a new document\nUse /history to see your documents"
                        .to_string()
                }
                // Store failure is a non-fatal warning: the document was
                // already delivered and the wizard is not replayed.
                Err(e) => {
                    tracing::warn!("Document store failed: {e}");
                    "⚠️ Your document was generated but could not be saved; it won't appear in /history."
                        .to_string()
                }
            };
            if let Err(e) = channel.respond(&msg, OutgoingResponse::text(closing)).await {
                tracing::warn!("Failed to send closing message: {e}");
            }
        });
    }

    async fn history_response(&self, user_id: &str) -> OutgoingResponse {
        match self.store.recent_documents(user_id, self.history_limit).await {
            Ok(records) if records.is_empty() => {
                OutgoingResponse::text("📂 You have no saved documents.")
            }
            Ok(records) => {
                let mut text = String::from("📚 *YOUR RECENT DOCUMENTS:*\n\n");
                for (i, record) in records.iter().enumerate() {
                    text.push_str(&format!(
                        "{}. {} — {} — {}\n",
                        i + 1,
                        record.category.title(),
                        record.template_id,
                        record.created_at.format("%Y-%m-%d %H:%M"),
                    ));
                }
                OutgoingResponse::text(text)
            }
            Err(e) => {
                tracing::warn!("History query failed: {e}");
                OutgoingResponse::text("⚠️ Could not load your documents right now.")
            }
        }
    }

    async fn send(
        &self,
        channel: &Arc<dyn Channel>,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) {
        if let Err(e) = channel.respond(msg, response).await {
            tracing::warn!(channel = channel.name(), "Failed to respond: {e}");
        }
    }
}

fn help_text() -> String {
    "📚 *USER GUIDE*\n\n\
     *Available commands:*\n\
     • /start — show the main menu\n\
     • /help — show this guide\n\
     • /history — list your recent documents\n\
     • /cancel — cancel the current operation\n\n\
     *How it works:*\n\
     1️⃣ Choose a category\n\
     2️⃣ Select a template\n\
     3️⃣ Fill in the form step by step\n\
     4️⃣ Confirm and receive your document\n\n\
     *Tips:*\n\
     • Fields marked (optional) can be skipped\n\
     • Use /cancel to abort at any time\n\
     • Your documents are saved automatically"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_commands() {
        assert_eq!(
            classify(&Payload::Text("/start".into())),
            Action::Command(Command::Start)
        );
        assert_eq!(
            classify(&Payload::Text("  /cancel  ".into())),
            Action::Command(Command::Cancel)
        );
        assert_eq!(
            classify(&Payload::Text("/help".into())),
            Action::Command(Command::Help)
        );
        assert_eq!(
            classify(&Payload::Text("/history".into())),
            Action::Command(Command::History)
        );
    }

    #[test]
    fn classify_unknown_command_is_ignored() {
        assert_eq!(classify(&Payload::Text("/frobnicate".into())), Action::Ignore);
    }

    #[test]
    fn classify_text_goes_to_wizard_trimmed() {
        assert_eq!(
            classify(&Payload::Text("  Ada  ".into())),
            Action::Wizard(WizardInput::Text("Ada".into()))
        );
    }

    #[test]
    fn classify_choice_goes_to_wizard() {
        assert_eq!(
            classify(&Payload::Choice("payroll".into())),
            Action::Wizard(WizardInput::Choice("payroll".into()))
        );
    }

    #[test]
    fn help_text_lists_all_commands() {
        let help = help_text();
        for command in ["/start", "/help", "/history", "/cancel"] {
            assert!(help.contains(command), "help is missing {command}");
        }
    }
}
