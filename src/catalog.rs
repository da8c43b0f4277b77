//! Document catalog — categories and their template variants.

use serde::{Deserialize, Serialize};

/// The closed set of document categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Payroll,
    Bank,
    Bill,
    TaxSlip,
    EmploymentLetter,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Payroll,
        Category::Bank,
        Category::Bill,
        Category::TaxSlip,
        Category::EmploymentLetter,
    ];

    /// Stable identifier used in callback data and stored records.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Payroll => "payroll",
            Self::Bank => "bank",
            Self::Bill => "bill",
            Self::TaxSlip => "tax_slip",
            Self::EmploymentLetter => "employment_letter",
        }
    }

    pub fn from_id(id: &str) -> Option<Category> {
        Self::ALL.iter().copied().find(|c| c.id() == id)
    }

    /// Display title for menus.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Payroll => "🧾 PAYROLL",
            Self::Bank => "🏦 BANK STATEMENT",
            Self::Bill => "📃 BILL STATEMENT",
            Self::TaxSlip => "📑 TAX SLIP",
            Self::EmploymentLetter => "✉️ EMPLOYMENT LETTER",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Payroll => "Pay stubs and compensation documents",
            Self::Bank => "Bank statements and financial records",
            Self::Bill => "Bills and payment statements",
            Self::TaxSlip => "Annual earnings and tax summaries",
            Self::EmploymentLetter => "Employment confirmation letters",
        }
    }

    /// Whether this category's documents carry a computed payroll breakdown.
    pub fn needs_payroll(&self) -> bool {
        matches!(self, Self::Payroll | Self::TaxSlip)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A template variant within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Templates available for a category.
pub fn templates(category: Category) -> &'static [Template] {
    match category {
        Category::Payroll => &[
            Template {
                id: "pay_standard",
                name: "📄 Standard pay stub",
                description: "Classic format with all deductions",
            },
            Template {
                id: "pay_detailed",
                name: "📊 Detailed pay stub",
                description: "Includes hours, overtime, bonus",
            },
            Template {
                id: "pay_simple",
                name: "📝 Simplified pay stub",
                description: "Minimalist format",
            },
            Template {
                id: "pay_annual",
                name: "📅 Annual statement",
                description: "Yearly income summary",
            },
        ],
        Category::Bank => &[
            Template {
                id: "bank_monthly",
                name: "📅 Monthly statement",
                description: "Standard account statement",
            },
            Template {
                id: "bank_detailed",
                name: "📊 Detailed statement",
                description: "With expense categorization",
            },
            Template {
                id: "bank_summary",
                name: "📈 Financial summary",
                description: "Overview of finances",
            },
            Template {
                id: "bank_proof",
                name: "✅ Proof of funds",
                description: "Balance attestation",
            },
        ],
        Category::Bill => &[
            Template {
                id: "bill_utility",
                name: "💡 Utility bill",
                description: "Hydro, gas, water",
            },
            Template {
                id: "bill_telecom",
                name: "📱 Telecom bill",
                description: "Phone, internet, cable",
            },
            Template {
                id: "bill_rent",
                name: "🏠 Rent receipt",
                description: "Rent payment confirmation",
            },
            Template {
                id: "bill_invoice",
                name: "🧾 Commercial invoice",
                description: "Professional invoice",
            },
        ],
        Category::TaxSlip => &[
            Template {
                id: "slip_t4",
                name: "📑 T4 earnings slip",
                description: "Statement of remuneration paid",
            },
            Template {
                id: "slip_summary",
                name: "📋 Deduction summary",
                description: "Annual deductions at a glance",
            },
        ],
        Category::EmploymentLetter => &[
            Template {
                id: "letter_confirmation",
                name: "✉️ Employment confirmation",
                description: "Confirms current employment",
            },
            Template {
                id: "letter_offer",
                name: "📜 Offer letter",
                description: "Employment offer with salary",
            },
        ],
    }
}

/// Look up a template by id within a category.
pub fn find_template(category: Category, template_id: &str) -> Option<&'static Template> {
    templates(category).iter().find(|t| t.id == template_id)
}

/// Look up a template's display name across all categories.
pub fn template_name(template_id: &str) -> Option<&'static str> {
    Category::ALL
        .iter()
        .flat_map(|c| templates(*c))
        .find(|t| t.id == template_id)
        .map(|t| t.name)
}
