//! Field tables — the one piece of branching data the wizard owns.
//!
//! Each category maps to an ordered list of field specs; the state machine
//! is a single "advance through this list" loop over the table. Adding a
//! category means adding a table entry, not new states.

use rust_decimal::Decimal;

use crate::catalog::Category;

/// An option in a constrained choice set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceOption {
    /// Stable value stored in the session and sent as callback data.
    pub value: &'static str,
    /// Button label shown to the user.
    pub label: &'static str,
}

/// What class of answer a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text. Optional fields also accept the skip signal.
    Text { optional: bool },
    /// Positive decimal amount; invalid input re-enters the same node.
    Amount,
    /// Constrained choice; answers arrive via the transport's choice
    /// mechanism, never as free text.
    Choice { options: &'static [ChoiceOption] },
}

/// How an accepted raw value is normalized before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
    None,
    /// Upper-case the value (postal codes).
    Uppercase,
    /// Mask all but the supplied last digits of an account number.
    MaskAccount,
}

/// One collected field: storage key, display label, prompt, and validation
/// class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub prompt: &'static str,
    pub kind: FieldKind,
    pub normalize: Normalize,
}

const SKIP_VALUE: &str = "skip";

/// The distinguished skip value for optional fields.
pub fn skip_value() -> &'static str {
    SKIP_VALUE
}

const FREQUENCY_OPTIONS: &[ChoiceOption] = &[
    ChoiceOption {
        value: "weekly",
        label: "Weekly",
    },
    ChoiceOption {
        value: "biweekly",
        label: "Every 2 weeks",
    },
    ChoiceOption {
        value: "monthly",
        label: "Monthly",
    },
];

const PROVINCE_OPTIONS: &[ChoiceOption] = &[
    ChoiceOption {
        value: "QC",
        label: "QC",
    },
    ChoiceOption {
        value: "ON",
        label: "ON",
    },
    ChoiceOption {
        value: "BC",
        label: "BC",
    },
    ChoiceOption {
        value: "AB",
        label: "AB",
    },
    ChoiceOption {
        value: "MB",
        label: "MB",
    },
    ChoiceOption {
        value: "SK",
        label: "SK",
    },
    ChoiceOption {
        value: "NS",
        label: "NS",
    },
    ChoiceOption {
        value: "NB",
        label: "NB",
    },
    ChoiceOption {
        value: "OTHER",
        label: "Other",
    },
];

/// Personal fields collected for every category, in order.
const COMMON_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "first_name",
        label: "First name",
        prompt: "Enter your *first name*:",
        kind: FieldKind::Text { optional: false },
        normalize: Normalize::None,
    },
    FieldSpec {
        name: "last_name",
        label: "Last name",
        prompt: "Enter your *last name*:",
        kind: FieldKind::Text { optional: false },
        normalize: Normalize::None,
    },
    FieldSpec {
        name: "address",
        label: "Address",
        prompt: "Enter your *address* (number and street):",
        kind: FieldKind::Text { optional: false },
        normalize: Normalize::None,
    },
    FieldSpec {
        name: "city",
        label: "City",
        prompt: "Enter your *city*:",
        kind: FieldKind::Text { optional: false },
        normalize: Normalize::None,
    },
    FieldSpec {
        name: "postal_code",
        label: "Postal code",
        prompt: "Enter your *postal code*:",
        kind: FieldKind::Text { optional: false },
        normalize: Normalize::Uppercase,
    },
    FieldSpec {
        name: "unit",
        label: "Unit",
        prompt: "Enter your *unit/apartment number* _(optional)_:",
        kind: FieldKind::Text { optional: true },
        normalize: Normalize::None,
    },
    FieldSpec {
        name: "phone",
        label: "Phone",
        prompt: "Enter your *phone number* _(optional)_:",
        kind: FieldKind::Text { optional: true },
        normalize: Normalize::None,
    },
];

/// Category-specific fields, in order.
fn category_fields(category: Category) -> &'static [FieldSpec] {
    match category {
        Category::Payroll => &[
            FieldSpec {
                name: "employer",
                label: "Employer",
                prompt: "💼 Enter the *employer name*:",
                kind: FieldKind::Text { optional: false },
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "gross_pay",
                label: "Gross pay",
                prompt: "💰 Enter the *gross pay* for the period (e.g. 2500):",
                kind: FieldKind::Amount,
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "pay_frequency",
                label: "Pay frequency",
                prompt: "📅 Select the *pay frequency*:",
                kind: FieldKind::Choice {
                    options: FREQUENCY_OPTIONS,
                },
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "province",
                label: "Province",
                prompt: "🗺️ Select the *province*:",
                kind: FieldKind::Choice {
                    options: PROVINCE_OPTIONS,
                },
                normalize: Normalize::None,
            },
        ],
        Category::Bank => &[FieldSpec {
            name: "account",
            label: "Account number",
            prompt: "🏦 Enter the *last 4 digits* of your account:",
            kind: FieldKind::Text { optional: false },
            normalize: Normalize::MaskAccount,
        }],
        Category::Bill => &[
            FieldSpec {
                name: "company",
                label: "Company",
                prompt: "📃 Enter the *company/provider name*:",
                kind: FieldKind::Text { optional: false },
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "amount",
                label: "Amount",
                prompt: "💵 Enter the *bill amount* (e.g. 150.00):",
                kind: FieldKind::Amount,
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "due_date",
                label: "Due date",
                prompt: "📅 Enter the *due date* (e.g. 2025-01-15):",
                kind: FieldKind::Text { optional: false },
                normalize: Normalize::None,
            },
        ],
        Category::TaxSlip => &[
            FieldSpec {
                name: "employer",
                label: "Employer",
                prompt: "💼 Enter the *employer name*:",
                kind: FieldKind::Text { optional: false },
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "gross_pay",
                label: "Gross pay",
                prompt: "💰 Enter the *gross pay* per period (e.g. 2500):",
                kind: FieldKind::Amount,
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "pay_frequency",
                label: "Pay frequency",
                prompt: "📅 Select the *pay frequency*:",
                kind: FieldKind::Choice {
                    options: FREQUENCY_OPTIONS,
                },
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "province",
                label: "Province",
                prompt: "🗺️ Select the *province*:",
                kind: FieldKind::Choice {
                    options: PROVINCE_OPTIONS,
                },
                normalize: Normalize::None,
            },
        ],
        Category::EmploymentLetter => &[
            FieldSpec {
                name: "employer",
                label: "Employer",
                prompt: "💼 Enter the *employer name*:",
                kind: FieldKind::Text { optional: false },
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "job_title",
                label: "Job title",
                prompt: "🧑‍💼 Enter the *job title*:",
                kind: FieldKind::Text { optional: false },
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "start_date",
                label: "Start date",
                prompt: "📅 Enter the *employment start date* (e.g. 2023-04-01):",
                kind: FieldKind::Text { optional: false },
                normalize: Normalize::None,
            },
            FieldSpec {
                name: "annual_salary",
                label: "Annual salary",
                prompt: "💰 Enter the *annual salary* (e.g. 65000):",
                kind: FieldKind::Amount,
                normalize: Normalize::None,
            },
        ],
    }
}

/// The full ordered field plan for a category: the common tier followed by
/// the category-specific tier.
pub fn field_plan(category: Category) -> Vec<&'static FieldSpec> {
    COMMON_FIELDS
        .iter()
        .chain(category_fields(category))
        .collect()
}

/// Parse a currency amount: comma accepted as decimal point, currency
/// symbol and whitespace stripped. Returns `None` on parse failure or a
/// non-positive value.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let value: Decimal = cleaned.parse().ok()?;
    (value > Decimal::ZERO).then_some(value)
}

/// Apply a field's normalization to an accepted raw value.
pub fn normalize_value(normalize: Normalize, value: &str) -> String {
    match normalize {
        Normalize::None => value.to_string(),
        Normalize::Uppercase => value.to_uppercase(),
        Normalize::MaskAccount => format!("****-****-{value}"),
    }
}
