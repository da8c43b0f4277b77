//! Progressive payroll tax computation.
//!
//! `tables` holds the jurisdiction-keyed bracket/rate/cap data for one tax
//! year; `engine` is the pure computation over those tables. The engine has
//! no hidden state and no clock access: identical inputs always produce
//! identical output.

pub mod engine;
pub mod tables;

pub use engine::{PayFrequency, PayrollResult, annualize, bracket_tax, compute_payroll, deannualize};
pub use tables::{Bracket, BracketSchedule, PensionParams, Province, TaxTables};
