//! The guided dialogue that collects document data step by step.
//!
//! `state` is the closed node enumeration with its legal edges; `fields` is
//! the table that drives branching (category → ordered field list);
//! `session` owns the per-identity mutable record and its concurrency
//! contract; `machine` is the transition function tying them together.

pub mod fields;
pub mod machine;
pub mod session;
pub mod state;

pub use fields::{ChoiceOption, FieldKind, FieldSpec, Normalize, field_plan, parse_amount};
pub use machine::{
    Button, Effect, FinalizedDocument, Keyboard, Reply, Transition, WizardInput, WizardMachine,
};
pub use session::{Session, SessionStore};
pub use state::WizardState;
