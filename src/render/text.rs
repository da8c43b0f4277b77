//! Plain-text document renderer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::catalog::{self, Category};
use crate::error::RenderError;
use crate::tax::PayrollResult;
use crate::wizard::FinalizedDocument;

use super::{Artifact, DocumentAssembler};

/// Sales tax applied on bill documents (GST/QST combined).
const BILL_SALES_TAX_RATE: Decimal = dec!(0.15);

const DISCLAIMER: &str = "This document is generated for informational purposes only.";

/// Renders each category as a fixed-width text document.
#[derive(Default)]
pub struct TextAssembler;

impl TextAssembler {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentAssembler for TextAssembler {
    fn render(
        &self,
        document: &FinalizedDocument,
        generated_at: DateTime<Utc>,
    ) -> Result<Artifact, RenderError> {
        let template = catalog::find_template(document.category, &document.template_id)
            .ok_or_else(|| RenderError::UnknownTemplate {
                category: document.category.to_string(),
                template_id: document.template_id.clone(),
            })?;

        let body = match document.category {
            Category::Payroll | Category::TaxSlip => {
                let payroll = document
                    .payroll
                    .as_ref()
                    .ok_or_else(|| RenderError::MissingField("payroll result".into()))?;
                render_payroll(document, payroll, template.name, generated_at)
            }
            Category::Bank => render_bank(document, generated_at),
            Category::Bill => render_bill(document, template.name, generated_at),
            Category::EmploymentLetter => render_letter(document, generated_at),
        };

        let file_name = format!(
            "{}_{}.txt",
            document.template_id.replace('_', "-"),
            generated_at.format("%Y%m%d_%H%M%S")
        );

        Ok(Artifact {
            file_name,
            bytes: body.into_bytes(),
        })
    }
}

// ── Section helpers ─────────────────────────────────────────────────

fn field<'a>(document: &'a FinalizedDocument, name: &str) -> &'a str {
    match document.fields.get(name).map(String::as_str) {
        Some("") | None => "N/A",
        Some(value) => value,
    }
}

fn full_name(document: &FinalizedDocument) -> String {
    format!(
        "{} {}",
        field(document, "first_name"),
        field(document, "last_name")
    )
}

fn address_block(document: &FinalizedDocument) -> String {
    let mut lines = vec![field(document, "address").to_string()];
    if let Some(unit) = document.fields.get("unit")
        && !unit.is_empty()
    {
        lines.push(format!("Unit {unit}"));
    }
    lines.push(format!(
        "{}, {}",
        field(document, "city"),
        field(document, "postal_code")
    ));
    lines.join("\n")
}

fn heading(title: &str) -> String {
    format!("{}\n{}\n", title, "=".repeat(title.len()))
}

/// Format a money amount with thousands separators, e.g. `1,234.56 $`.
fn format_money(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2));
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}.{frac_part} $")
}

// ── Category renderers ──────────────────────────────────────────────

fn render_payroll(
    document: &FinalizedDocument,
    payroll: &PayrollResult,
    template_name: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = heading(template_name.trim_start_matches(|c: char| !c.is_alphanumeric()).trim());
    out.push('\n');

    out.push_str("EMPLOYEE\n--------\n");
    out.push_str(&format!("Name:    {}\n", full_name(document)));
    out.push_str(&format!("Address: {}\n", address_block(document).replace('\n', ", ")));
    if let Some(phone) = document.fields.get("phone")
        && !phone.is_empty()
    {
        out.push_str(&format!("Phone:   {phone}\n"));
    }
    out.push('\n');

    out.push_str("PAY DETAILS\n-----------\n");
    out.push_str(&format!("{:<28}{:>16}\n", "Gross pay", format_money(payroll.gross)));
    out.push_str(&format!(
        "{:<28}{:>16}\n",
        "Federal tax",
        format!("-{}", format_money(payroll.federal_tax))
    ));
    out.push_str(&format!(
        "{:<28}{:>16}\n",
        format!("Provincial tax ({})", payroll.province),
        format!("-{}", format_money(payroll.provincial_tax))
    ));
    out.push_str(&format!(
        "{:<28}{:>16}\n",
        "Employment insurance (EI)",
        format!("-{}", format_money(payroll.ei))
    ));
    out.push_str(&format!(
        "{:<28}{:>16}\n",
        "Pension plan (CPP/QPP)",
        format!("-{}", format_money(payroll.pension))
    ));
    out.push_str(&format!("{:<28}{:>16}\n", "NET PAY", format_money(payroll.net)));
    out.push('\n');

    out.push_str("ANNUALIZED\n----------\n");
    out.push_str(&format!(
        "{:<28}{:>16}\n",
        "Annual gross",
        format_money(payroll.annual_gross)
    ));
    out.push_str(&format!(
        "{:<28}{:>16}\n",
        "Annual federal tax",
        format_money(payroll.federal_tax_annual)
    ));
    out.push_str(&format!(
        "{:<28}{:>16}\n",
        "Annual provincial tax",
        format_money(payroll.provincial_tax_annual)
    ));
    out.push('\n');

    out.push_str(&format!("Employer: {}\n", field(document, "employer")));
    out.push_str(&format!("Pay frequency: {}\n", payroll.frequency.label()));
    out.push_str(&format!("Date: {}\n\n", generated_at.format("%Y-%m-%d")));
    out.push_str(DISCLAIMER);
    out
}

fn render_bank(document: &FinalizedDocument, generated_at: DateTime<Utc>) -> String {
    let mut out = heading("BANK STATEMENT");
    out.push('\n');

    out.push_str("ACCOUNT HOLDER\n--------------\n");
    out.push_str(&format!("Name:    {}\n", full_name(document)));
    out.push_str(&format!("Address: {}\n", address_block(document).replace('\n', ", ")));
    out.push('\n');

    out.push_str(&format!("Account number: {}\n", field(document, "account")));
    out.push_str(&format!(
        "Statement date: {}\n\n",
        generated_at.format("%Y-%m-%d")
    ));

    out.push_str("SUMMARY\n-------\n");
    out.push_str(&format!("{:<24}{:>16}\n", "Opening balance", format_money(dec!(1000))));
    out.push_str(&format!("{:<24}{:>16}\n", "Total deposits", format_money(dec!(2500))));
    out.push_str(&format!("{:<24}{:>16}\n", "Total withdrawals", format_money(dec!(-1200))));
    out.push_str(&format!("{:<24}{:>16}\n", "Closing balance", format_money(dec!(2300))));
    out.push('\n');
    out.push_str(DISCLAIMER);
    out
}

fn render_bill(
    document: &FinalizedDocument,
    template_name: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = heading(template_name.trim_start_matches(|c: char| !c.is_alphanumeric()).trim());
    out.push('\n');

    out.push_str(&format!("{}\n\n", field(document, "company")));
    out.push_str("BILLED TO\n---------\n");
    out.push_str(&format!("{}\n{}\n\n", full_name(document), address_block(document)));

    // Stored amounts are already validated decimals.
    let amount = document
        .fields
        .get("amount")
        .and_then(|raw| raw.parse::<Decimal>().ok())
        .unwrap_or(Decimal::ZERO);
    let tax = (amount * BILL_SALES_TAX_RATE).round_dp(2);
    let total = amount + tax;

    out.push_str(&format!("{:<24}{:>16}\n", "Services", format_money(amount)));
    out.push_str(&format!("{:<24}{:>16}\n", "Taxes (GST/QST)", format_money(tax)));
    out.push_str(&format!("{:<24}{:>16}\n", "TOTAL DUE", format_money(total)));
    out.push('\n');

    out.push_str(&format!("Due date: {}\n", field(document, "due_date")));
    out.push_str(&format!("Issued:   {}\n\n", generated_at.format("%Y-%m-%d")));
    out.push_str(DISCLAIMER);
    out
}

fn render_letter(document: &FinalizedDocument, generated_at: DateTime<Utc>) -> String {
    let salary = document
        .fields
        .get("annual_salary")
        .and_then(|raw| raw.parse::<Decimal>().ok())
        .unwrap_or(Decimal::ZERO);

    let mut out = heading("EMPLOYMENT CONFIRMATION");
    out.push('\n');
    out.push_str(&format!("{}\n\n", generated_at.format("%Y-%m-%d")));
    out.push_str("To whom it may concern,\n\n");
    out.push_str(&format!(
        "This letter confirms that {} holds the position of {} with {} \
         since {}, at an annual salary of {}.\n\n",
        full_name(document),
        field(document, "job_title"),
        field(document, "employer"),
        field(document, "start_date"),
        format_money(salary),
    ));
    out.push_str(&format!(
        "{}\n{}\n\n",
        full_name(document),
        address_block(document)
    ));
    out.push_str(DISCLAIMER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::{PayFrequency, Province, TaxTables, compute_payroll};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn base_fields() -> BTreeMap<String, String> {
        BTreeMap::from(
            [
                ("first_name", "Ada"),
                ("last_name", "Lovelace"),
                ("address", "12 Main St"),
                ("city", "Montreal"),
                ("postal_code", "H3Z 2Y7"),
                ("unit", ""),
                ("phone", ""),
            ]
            .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn format_money_grouping() {
        assert_eq!(format_money(dec!(0)), "0.00 $");
        assert_eq!(format_money(dec!(42.5)), "42.50 $");
        assert_eq!(format_money(dec!(1234.56)), "1,234.56 $");
        assert_eq!(format_money(dec!(1234567.891)), "1,234,567.89 $");
        assert_eq!(format_money(dec!(-1200)), "-1,200.00 $");
    }

    #[test]
    fn unknown_template_is_an_error() {
        let document = FinalizedDocument {
            user_id: "u1".into(),
            category: Category::Bill,
            template_id: "nope".into(),
            fields: base_fields(),
            payroll: None,
        };
        let err = TextAssembler::new().render(&document, at()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownTemplate { .. }));
    }

    #[test]
    fn bill_artifact_includes_tax_and_total() {
        let mut fields = base_fields();
        fields.insert("company".into(), "Hydro".into());
        fields.insert("amount".into(), "100".into());
        fields.insert("due_date".into(), "2025-02-01".into());
        let document = FinalizedDocument {
            user_id: "u1".into(),
            category: Category::Bill,
            template_id: "bill_utility".into(),
            fields,
            payroll: None,
        };

        let artifact = TextAssembler::new().render(&document, at()).unwrap();
        let body = String::from_utf8(artifact.bytes).unwrap();
        assert!(body.contains("100.00 $"));
        assert!(body.contains("15.00 $")); // 15% sales tax
        assert!(body.contains("115.00 $"));
        assert!(body.contains("2025-02-01"));
        assert!(artifact.file_name.starts_with("bill-utility_20250115"));
    }

    #[test]
    fn payroll_artifact_carries_breakdown() {
        let tables = TaxTables::year_2024();
        let payroll = compute_payroll(&tables, dec!(2000), PayFrequency::Biweekly, Province::On);
        let mut fields = base_fields();
        fields.insert("employer".into(), "Initech".into());
        fields.insert("gross_pay".into(), "2000".into());
        fields.insert("pay_frequency".into(), "biweekly".into());
        fields.insert("province".into(), "ON".into());
        let document = FinalizedDocument {
            user_id: "u1".into(),
            category: Category::Payroll,
            template_id: "pay_standard".into(),
            fields,
            payroll: Some(payroll),
        };

        let artifact = TextAssembler::new().render(&document, at()).unwrap();
        let body = String::from_utf8(artifact.bytes).unwrap();
        assert!(body.contains("2,000.00 $"));
        assert!(body.contains("209.39 $"));
        assert!(body.contains("1,568.63 $"));
        assert!(body.contains("Initech"));
        assert!(body.contains("52,000.00 $"));
    }

    #[test]
    fn payroll_without_breakdown_is_an_error() {
        let document = FinalizedDocument {
            user_id: "u1".into(),
            category: Category::Payroll,
            template_id: "pay_standard".into(),
            fields: base_fields(),
            payroll: None,
        };
        let err = TextAssembler::new().render(&document, at()).unwrap_err();
        assert!(matches!(err, RenderError::MissingField(_)));
    }

    #[test]
    fn bank_artifact_masks_account() {
        let mut fields = base_fields();
        fields.insert("account".into(), "****-****-6789".into());
        let document = FinalizedDocument {
            user_id: "u1".into(),
            category: Category::Bank,
            template_id: "bank_monthly".into(),
            fields,
            payroll: None,
        };
        let artifact = TextAssembler::new().render(&document, at()).unwrap();
        let body = String::from_utf8(artifact.bytes).unwrap();
        assert!(body.contains("****-****-6789"));
    }

    #[test]
    fn letter_mentions_position_and_salary() {
        let mut fields = base_fields();
        fields.insert("employer".into(), "Initech".into());
        fields.insert("job_title".into(), "Engineer".into());
        fields.insert("start_date".into(), "2023-04-01".into());
        fields.insert("annual_salary".into(), "65000".into());
        let document = FinalizedDocument {
            user_id: "u1".into(),
            category: Category::EmploymentLetter,
            template_id: "letter_confirmation".into(),
            fields,
            payroll: None,
        };
        let artifact = TextAssembler::new().render(&document, at()).unwrap();
        let body = String::from_utf8(artifact.bytes).unwrap();
        assert!(body.contains("Engineer"));
        assert!(body.contains("65,000.00 $"));
        assert!(body.contains("since 2023-04-01"));
    }

    #[test]
    fn unit_appears_in_address_when_set() {
        let mut fields = base_fields();
        fields.insert("unit".into(), "4B".into());
        fields.insert("account".into(), "****-****-1111".into());
        let document = FinalizedDocument {
            user_id: "u1".into(),
            category: Category::Bank,
            template_id: "bank_proof".into(),
            fields,
            payroll: None,
        };
        let artifact = TextAssembler::new().render(&document, at()).unwrap();
        let body = String::from_utf8(artifact.bytes).unwrap();
        assert!(body.contains("Unit 4B"));
    }
}
