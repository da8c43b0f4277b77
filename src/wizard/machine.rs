//! The wizard transition function.
//!
//! `WizardMachine::handle` takes the session's current state and one
//! incoming answer, validates it, mutates the session, and produces the
//! reply plus any side effects. All validation happens here, before any
//! field is written; answers that don't belong to the current node are
//! dropped without touching the session.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::catalog::{self, Category};
use crate::tax::{PayFrequency, PayrollResult, Province, TaxTables, compute_payroll};

use super::fields::{self, FieldKind, FieldSpec, field_plan, parse_amount, skip_value};
use super::session::Session;
use super::state::WizardState;

/// One incoming answer, already classified by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    /// Free-text answer.
    Text(String),
    /// Value from a constrained choice set.
    Choice(String),
    /// The distinguished skip signal for optional fields.
    Skip,
    /// Global cancel: discard the session, go to the end state.
    Cancel,
    /// Global restart: fresh session, back to the main menu.
    Restart,
}

/// An inline button: label shown to the user, value sent back on tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// A constrained-choice keyboard, rendered by the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

/// What to say back to the user after a transition.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// A completed session, ready for the assembler and the store.
#[derive(Debug, Clone)]
pub struct FinalizedDocument {
    pub user_id: String,
    pub category: Category,
    pub template_id: String,
    pub fields: BTreeMap<String, String>,
    pub payroll: Option<PayrollResult>,
}

/// Side effects requested by a transition. The machine never performs I/O
/// itself; effects are carried out by the dispatcher after the session
/// mutation is complete.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Hand the finalized session to the document assembler and the
    /// persistence gateway.
    Finalize(FinalizedDocument),
}

/// Result of one transition.
#[derive(Debug)]
pub struct Transition {
    pub reply: Option<Reply>,
    pub effects: Vec<Effect>,
}

impl Transition {
    /// Input dropped: no reply, no effects, session untouched.
    fn silent() -> Self {
        Self {
            reply: None,
            effects: Vec::new(),
        }
    }

    fn reply(reply: Reply) -> Self {
        Self {
            reply: Some(reply),
            effects: Vec::new(),
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// The wizard state machine. Holds the tax tables so payroll categories can
/// compute their breakdown at the terminal transition.
pub struct WizardMachine {
    tables: TaxTables,
}

impl WizardMachine {
    pub fn new(tables: TaxTables) -> Self {
        Self { tables }
    }

    /// Apply one answer to a session.
    pub fn handle(&self, session: &mut Session, input: WizardInput) -> Transition {
        // Optional-field skip arrives as a choice on the transport.
        let input = match input {
            WizardInput::Choice(v) if v == skip_value() => WizardInput::Skip,
            other => other,
        };

        // Global commands, legal from any state.
        match input {
            WizardInput::Restart => {
                session.reset();
                return Transition::reply(main_menu_reply());
            }
            WizardInput::Cancel => {
                if session.state.is_terminal() {
                    return Transition::reply(Reply::text(
                        "Nothing to cancel. Use /start to begin.",
                    ));
                }
                discard(session);
                return Transition::reply(Reply::text(
                    "❌ Operation cancelled.\n\nUse /start to begin again.",
                ));
            }
            _ => {}
        }

        match session.state {
            WizardState::MainMenu => self.on_main_menu(session, input),
            WizardState::SelectTemplate => self.on_select_template(session, input),
            WizardState::CollectField(index) => self.on_collect_field(session, index, input),
            WizardState::Confirm => self.on_confirm(session, input),
            WizardState::Done => match input {
                WizardInput::Text(_) => Transition::reply(Reply::text(
                    "Use /start to create a new document.",
                )),
                // Stale callbacks after completion are dropped.
                _ => Transition::silent(),
            },
        }
    }

    fn on_main_menu(&self, session: &mut Session, input: WizardInput) -> Transition {
        let WizardInput::Choice(value) = input else {
            tracing::debug!(state = %session.state, "Dropped non-choice input");
            return Transition::silent();
        };
        let Some(category) = Category::from_id(&value) else {
            tracing::debug!(%value, "Dropped unknown category choice");
            return Transition::silent();
        };
        if session.transition(WizardState::SelectTemplate).is_err() {
            return Transition::silent();
        }
        session.category = Some(category);
        Transition::reply(templates_reply(category))
    }

    fn on_select_template(&self, session: &mut Session, input: WizardInput) -> Transition {
        let WizardInput::Choice(value) = input else {
            return Transition::silent();
        };
        let Some(category) = session.category else {
            // No category without passing through the main menu; recover by
            // showing it again.
            session.reset();
            return Transition::reply(main_menu_reply());
        };

        if value == "back" {
            if session.transition(WizardState::MainMenu).is_err() {
                return Transition::silent();
            }
            session.category = None;
            return Transition::reply(main_menu_reply());
        }

        let Some(template) = catalog::find_template(category, &value) else {
            tracing::debug!(%value, %category, "Dropped unknown template choice");
            return Transition::silent();
        };
        if session.transition(WizardState::CollectField(0)).is_err() {
            return Transition::silent();
        }
        session.template_id = Some(template.id.to_string());

        let plan = field_plan(category);
        let text = format!(
            "✅ *Template selected:* {}\n\nI'll now ask a few questions to complete your document.\n\n{}",
            template.name,
            prompt_text(&plan, 0),
        );
        let mut reply = Reply::text(text);
        if let Some(keyboard) = prompt_keyboard(plan[0]) {
            reply = reply.with_keyboard(keyboard);
        }
        Transition::reply(reply)
    }

    fn on_collect_field(
        &self,
        session: &mut Session,
        index: usize,
        input: WizardInput,
    ) -> Transition {
        let Some(category) = session.category else {
            session.reset();
            return Transition::reply(main_menu_reply());
        };
        let plan = field_plan(category);
        let Some(spec) = plan.get(index).copied() else {
            tracing::warn!(index, %category, "Field index out of range");
            return Transition::silent();
        };

        let accepted: Option<String> = match (spec.kind, input) {
            (FieldKind::Text { .. }, WizardInput::Text(raw)) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return reprompt(&plan, index, spec, "This field can't be empty.");
                }
                Some(fields::normalize_value(spec.normalize, trimmed))
            }
            (FieldKind::Text { optional: true }, WizardInput::Skip) => Some(String::new()),
            (FieldKind::Amount, WizardInput::Text(raw)) => match parse_amount(&raw) {
                Some(value) => Some(value.to_string()),
                // The only back-edge: re-enter the same node.
                None => {
                    return reprompt(
                        &plan,
                        index,
                        spec,
                        "❌ Invalid amount. Enter a positive number (e.g. 150.00).",
                    );
                }
            },
            (FieldKind::Choice { options }, WizardInput::Choice(value)) => {
                if options.iter().any(|o| o.value == value) {
                    Some(value)
                } else {
                    tracing::debug!(field = spec.name, %value, "Dropped out-of-set choice");
                    None
                }
            }
            // Anything else is an answer for a different node: drop it.
            _ => {
                tracing::debug!(field = spec.name, "Dropped out-of-sequence input");
                None
            }
        };

        let Some(value) = accepted else {
            return Transition::silent();
        };

        let next = if index + 1 < plan.len() {
            WizardState::CollectField(index + 1)
        } else {
            WizardState::Confirm
        };
        if session.transition(next).is_err() {
            return Transition::silent();
        }
        session.fields.insert(spec.name.to_string(), value);

        match next {
            WizardState::CollectField(next_index) => {
                let mut reply = Reply::text(prompt_text(&plan, next_index));
                if let Some(keyboard) = prompt_keyboard(plan[next_index]) {
                    reply = reply.with_keyboard(keyboard);
                }
                Transition::reply(reply)
            }
            _ => Transition::reply(confirm_reply(session, &plan)),
        }
    }

    fn on_confirm(&self, session: &mut Session, input: WizardInput) -> Transition {
        let WizardInput::Choice(value) = input else {
            return Transition::silent();
        };
        match value.as_str() {
            "confirm_yes" => {
                let document = self.finalize(session);
                if session.transition(WizardState::Done).is_err() {
                    return Transition::silent();
                }
                Transition::reply(Reply::text("⏳ Generating your document..."))
                    .with_effect(Effect::Finalize(document))
            }
            "confirm_edit" => {
                if session.transition(WizardState::MainMenu).is_err() {
                    return Transition::silent();
                }
                session.category = None;
                session.template_id = None;
                session.fields.clear();
                Transition::reply(main_menu_reply())
            }
            "confirm_cancel" => {
                discard(session);
                Transition::reply(Reply::text("❌ Operation cancelled."))
            }
            _ => Transition::silent(),
        }
    }

    /// Snapshot the session for the assembler, computing the payroll
    /// breakdown for the categories that carry one.
    fn finalize(&self, session: &Session) -> FinalizedDocument {
        let category = session.category.unwrap_or(Category::Payroll);
        let payroll = category.needs_payroll().then(|| {
            let gross = session
                .fields
                .get("gross_pay")
                .and_then(|raw| raw.parse::<Decimal>().ok())
                .unwrap_or(Decimal::ZERO);
            let frequency = PayFrequency::from_value(
                session.fields.get("pay_frequency").map_or("", String::as_str),
            );
            let province =
                Province::from_code(session.fields.get("province").map_or("", String::as_str));
            compute_payroll(&self.tables, gross, frequency, province)
        });
        FinalizedDocument {
            user_id: session.user_id.clone(),
            category,
            template_id: session.template_id.clone().unwrap_or_default(),
            fields: session.fields.clone(),
            payroll,
        }
    }
}

/// Force the session to the end state, discarding everything collected.
fn discard(session: &mut Session) {
    if session.transition(WizardState::Done).is_err() {
        return;
    }
    session.category = None;
    session.template_id = None;
    session.fields.clear();
}

// ── Replies and keyboards ───────────────────────────────────────────

fn main_menu_reply() -> Reply {
    let mut text = String::from("📌 *Choose a category:*\n");
    for category in Category::ALL {
        text.push_str(&format!("\n{} — {}", category.title(), category.description()));
    }
    let rows = Category::ALL
        .iter()
        .map(|c| vec![Button::new(c.title(), c.id())])
        .collect();
    Reply::text(text).with_keyboard(Keyboard { rows })
}

fn templates_reply(category: Category) -> Reply {
    let text = format!(
        "{}\n\n{}\n\n📌 *Choose a template:*",
        category.title(),
        category.description()
    );
    let mut rows: Vec<Vec<Button>> = catalog::templates(category)
        .iter()
        .map(|t| vec![Button::new(t.name, t.id)])
        .collect();
    rows.push(vec![Button::new("⬅️ Back", "back")]);
    Reply::text(text).with_keyboard(Keyboard { rows })
}

fn prompt_text(plan: &[&FieldSpec], index: usize) -> String {
    format!("📝 *Step {}/{}*\n{}", index + 1, plan.len(), plan[index].prompt)
}

fn prompt_keyboard(spec: &FieldSpec) -> Option<Keyboard> {
    match spec.kind {
        FieldKind::Text { optional: true } => Some(Keyboard {
            rows: vec![vec![Button::new("⏭️ Skip", skip_value())]],
        }),
        FieldKind::Choice { options } => {
            let rows = options
                .chunks(3)
                .map(|chunk| {
                    chunk
                        .iter()
                        .map(|o| Button::new(o.label, o.value))
                        .collect()
                })
                .collect();
            Some(Keyboard { rows })
        }
        _ => None,
    }
}

fn reprompt(plan: &[&FieldSpec], index: usize, spec: &FieldSpec, error: &str) -> Transition {
    let mut reply = Reply::text(format!("{error}\n\n{}", prompt_text(plan, index)));
    if let Some(keyboard) = prompt_keyboard(spec) {
        reply = reply.with_keyboard(keyboard);
    }
    Transition::reply(reply)
}

fn confirm_reply(session: &Session, plan: &[&FieldSpec]) -> Reply {
    let template_name = session
        .template_id
        .as_deref()
        .and_then(catalog::template_name)
        .unwrap_or("N/A");

    let mut text = format!("📋 *SUMMARY*\n\n*Template:* {template_name}\n");
    for spec in plan {
        let value = session.fields.get(spec.name).map_or("", String::as_str);
        let shown = if value.is_empty() { "N/A" } else { value };
        text.push_str(&format!("• {}: {}\n", spec.label, shown));
    }
    text.push_str("\n*Generate the document?*");

    Reply::text(text).with_keyboard(Keyboard {
        rows: vec![
            vec![Button::new("✅ Confirm and generate", "confirm_yes")],
            vec![Button::new("✏️ Start over", "confirm_edit")],
            vec![Button::new("❌ Cancel", "confirm_cancel")],
        ],
    })
}
