//! The payroll computation: progressive bracket fold, annualization,
//! credits, and statutory deductions.
//!
//! All math runs on annualized `Decimal` figures with no intermediate
//! rounding; figures are rounded to cents exactly once, when the result
//! snapshot is assembled. Inputs are assumed well-formed and positive —
//! validation happens at the wizard boundary, never here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::tables::{Bracket, Province, TaxTables};

/// Pay frequency, with its annualization multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayFrequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl PayFrequency {
    pub const ALL: [PayFrequency; 3] = [
        PayFrequency::Weekly,
        PayFrequency::Biweekly,
        PayFrequency::Monthly,
    ];

    /// Parse a frequency value. Unrecognized values default to biweekly.
    pub fn from_value(value: &str) -> PayFrequency {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => PayFrequency::Weekly,
            "monthly" => PayFrequency::Monthly,
            _ => PayFrequency::Biweekly,
        }
    }

    pub fn value(&self) -> &'static str {
        match self {
            PayFrequency::Weekly => "weekly",
            PayFrequency::Biweekly => "biweekly",
            PayFrequency::Monthly => "monthly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PayFrequency::Weekly => "Weekly",
            PayFrequency::Biweekly => "Every 2 weeks",
            PayFrequency::Monthly => "Monthly",
        }
    }

    /// Number of pay periods per year.
    pub fn periods_per_year(&self) -> Decimal {
        match self {
            PayFrequency::Weekly => dec!(52),
            PayFrequency::Biweekly => dec!(26),
            PayFrequency::Monthly => dec!(12),
        }
    }
}

impl std::fmt::Display for PayFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Convert a per-period amount to its yearly equivalent.
pub fn annualize(amount: Decimal, frequency: PayFrequency) -> Decimal {
    amount * frequency.periods_per_year()
}

/// Convert a yearly amount back to a per-period figure.
pub fn deannualize(amount: Decimal, frequency: PayFrequency) -> Decimal {
    amount / frequency.periods_per_year()
}

/// Progressive tax over an ascending bracket list.
///
/// Income exactly on a bracket boundary is taxed entirely within the lower
/// bracket: the bound is the inclusive upper end of its slice.
pub fn bracket_tax(income: Decimal, brackets: &[Bracket]) -> Decimal {
    let mut tax = Decimal::ZERO;
    let mut prev_limit = Decimal::ZERO;
    for bracket in brackets {
        if income <= prev_limit {
            break;
        }
        match bracket.up_to {
            Some(limit) => {
                tax += (income.min(limit) - prev_limit) * bracket.rate;
                prev_limit = limit;
            }
            None => {
                tax += (income - prev_limit) * bracket.rate;
                break;
            }
        }
    }
    tax
}

/// Immutable deduction breakdown for one pay period.
///
/// Annual figures carry the full bracket math; per-period figures are the
/// de-annualized equivalents. Every field is rounded to cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollResult {
    pub gross: Decimal,
    pub annual_gross: Decimal,
    pub frequency: PayFrequency,
    pub province: Province,
    pub federal_tax_annual: Decimal,
    pub federal_tax: Decimal,
    pub provincial_tax_annual: Decimal,
    pub provincial_tax: Decimal,
    pub ei_annual: Decimal,
    pub ei: Decimal,
    pub pension_annual: Decimal,
    pub pension: Decimal,
    pub net: Decimal,
}

/// Compute the full deduction breakdown for one pay period.
pub fn compute_payroll(
    tables: &TaxTables,
    gross: Decimal,
    frequency: PayFrequency,
    province: Province,
) -> PayrollResult {
    let annual_gross = annualize(gross, frequency);

    let federal_annual = (bracket_tax(annual_gross, &tables.federal.brackets)
        - tables.federal.credit())
    .max(Decimal::ZERO);

    let provincial_annual = match tables.provincial(province) {
        Some(schedule) => {
            (bracket_tax(annual_gross, &schedule.brackets) - schedule.credit()).max(Decimal::ZERO)
        }
        // No schedule: flat rate on annual gross, no brackets, no credit.
        None => annual_gross * tables.default_provincial_rate,
    };

    let ei_annual = (annual_gross * tables.ei_rate).min(tables.ei_annual_max);

    let pension_params = tables.pension(province);
    let pensionable = (annual_gross - pension_params.annual_exemption).max(Decimal::ZERO);
    let pension_annual = (pensionable * pension_params.rate).min(pension_params.annual_max);

    let federal_tax = deannualize(federal_annual, frequency).round_dp(2);
    let provincial_tax = deannualize(provincial_annual, frequency).round_dp(2);
    let ei = deannualize(ei_annual, frequency).round_dp(2);
    let pension = deannualize(pension_annual, frequency).round_dp(2);

    PayrollResult {
        gross,
        annual_gross,
        frequency,
        province,
        federal_tax_annual: federal_annual.round_dp(2),
        federal_tax,
        provincial_tax_annual: provincial_annual.round_dp(2),
        provincial_tax,
        ei_annual: ei_annual.round_dp(2),
        ei,
        pension_annual: pension_annual.round_dp(2),
        pension,
        net: gross - federal_tax - provincial_tax - ei - pension,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> TaxTables {
        TaxTables::year_2024()
    }

    #[test]
    fn frequency_parse_defaults_to_biweekly() {
        assert_eq!(PayFrequency::from_value("weekly"), PayFrequency::Weekly);
        assert_eq!(PayFrequency::from_value("Monthly"), PayFrequency::Monthly);
        assert_eq!(PayFrequency::from_value("biweekly"), PayFrequency::Biweekly);
        assert_eq!(PayFrequency::from_value("fortnightly"), PayFrequency::Biweekly);
        assert_eq!(PayFrequency::from_value(""), PayFrequency::Biweekly);
    }

    #[test]
    fn annualize_roundtrip() {
        for frequency in PayFrequency::ALL {
            let x = dec!(1234.56);
            assert_eq!(deannualize(annualize(x, frequency), frequency), x);
        }
    }

    #[test]
    fn bracket_tax_zero_income() {
        assert_eq!(bracket_tax(Decimal::ZERO, &tables().federal.brackets), Decimal::ZERO);
    }

    #[test]
    fn bracket_tax_within_first_bracket() {
        // 40,000 all at 15%
        let tax = bracket_tax(dec!(40000), &tables().federal.brackets);
        assert_eq!(tax, dec!(6000));
    }

    #[test]
    fn bracket_tax_boundary_stays_in_lower_bracket() {
        let brackets = &tables().federal.brackets;
        // Exactly at the first bound: the whole amount is taxed at 15%.
        assert_eq!(bracket_tax(dec!(55867), brackets), dec!(55867) * dec!(0.15));
        // One dollar over: that dollar is taxed at 20.5%.
        assert_eq!(
            bracket_tax(dec!(55868), brackets),
            dec!(55867) * dec!(0.15) + dec!(0.205)
        );
    }

    #[test]
    fn bracket_tax_spans_multiple_brackets() {
        let brackets = &tables().federal.brackets;
        // 120,000: 55,867 @ 15% + 55,866 @ 20.5% + 8,267 @ 26%
        let expected = dec!(55867) * dec!(0.15)
            + (dec!(111733) - dec!(55867)) * dec!(0.205)
            + (dec!(120000) - dec!(111733)) * dec!(0.26);
        assert_eq!(bracket_tax(dec!(120000), brackets), expected);
    }

    #[test]
    fn bracket_tax_reaches_top_bracket() {
        let brackets = &tables().federal.brackets;
        let at_top = bracket_tax(dec!(246752), brackets);
        assert_eq!(bracket_tax(dec!(246753), brackets), at_top + dec!(0.33));
    }

    #[test]
    fn bracket_tax_non_decreasing() {
        let brackets = &tables().federal.brackets;
        let mut prev = Decimal::ZERO;
        let mut income = Decimal::ZERO;
        while income <= dec!(400000) {
            let tax = bracket_tax(income, brackets);
            assert!(tax >= prev, "tax decreased at income {income}");
            prev = tax;
            income += dec!(7001);
        }
    }

    #[test]
    fn scenario_biweekly_2000_ontario() {
        // annual gross = 52,000
        let result = compute_payroll(&tables(), dec!(2000), PayFrequency::Biweekly, Province::On);

        assert_eq!(result.annual_gross, dec!(52000));

        // Federal: 52,000 * 15% = 7,800, minus credit 15,705 * 15% = 2,355.75
        assert_eq!(result.federal_tax_annual, dec!(5444.25));
        assert_eq!(result.federal_tax, dec!(209.39));

        // Ontario: 51,446 * 5.05% + 554 * 9.15% = 2,648.714,
        // minus credit 12,399 * 5.05% = 626.1495 -> 2,022.5645
        assert_eq!(result.provincial_tax_annual, dec!(2022.56));
        assert_eq!(result.provincial_tax, dec!(77.79));

        // EI: 52,000 * 1.66% = 863.20, under the cap.
        assert_eq!(result.ei_annual, dec!(863.20));
        assert_eq!(result.ei, dec!(33.20));

        // CPP: (52,000 - 3,500) * 5.95% = 2,885.75
        assert_eq!(result.pension_annual, dec!(2885.75));
        assert_eq!(result.pension, dec!(110.99));

        assert_eq!(
            result.net,
            dec!(2000) - dec!(209.39) - dec!(77.79) - dec!(33.20) - dec!(110.99)
        );
        assert_eq!(result.net, dec!(1568.63));
    }

    #[test]
    fn unknown_province_takes_flat_rate() {
        let result =
            compute_payroll(&tables(), dec!(2000), PayFrequency::Biweekly, Province::Other);
        // 10% of annual gross, no brackets, no credit.
        assert_eq!(result.provincial_tax_annual, dec!(5200.00));
        assert_eq!(result.provincial_tax, dec!(200.00));
    }

    #[test]
    fn quebec_pension_uses_qpp_rate() {
        let qc = compute_payroll(&tables(), dec!(2000), PayFrequency::Biweekly, Province::Qc);
        // (52,000 - 3,500) * 6.40% = 3,104
        assert_eq!(qc.pension_annual, dec!(3104.00));
    }

    #[test]
    fn deductions_hit_their_caps_for_large_gross() {
        let t = tables();
        let result = compute_payroll(&t, dec!(20000), PayFrequency::Biweekly, Province::On);
        assert_eq!(result.ei_annual, t.ei_annual_max);
        assert_eq!(result.pension_annual, t.cpp.annual_max);
        assert_eq!(result.ei, (t.ei_annual_max / dec!(26)).round_dp(2));
        assert_eq!(result.pension, (t.cpp.annual_max / dec!(26)).round_dp(2));
    }

    #[test]
    fn credit_floors_tax_at_zero() {
        // Tiny income: bracket tax is below the credit, so tax is zero, not
        // negative.
        let result = compute_payroll(&tables(), dec!(100), PayFrequency::Monthly, Province::On);
        assert_eq!(result.federal_tax_annual, Decimal::ZERO);
        assert_eq!(result.provincial_tax_annual, Decimal::ZERO);
    }

    #[test]
    fn engine_is_deterministic() {
        let a = compute_payroll(&tables(), dec!(3173.21), PayFrequency::Weekly, Province::Bc);
        let b = compute_payroll(&tables(), dec!(3173.21), PayFrequency::Weekly, Province::Bc);
        assert_eq!(a, b);
    }

    #[test]
    fn net_is_gross_minus_deductions() {
        for province in Province::ALL {
            let r = compute_payroll(&tables(), dec!(4321.09), PayFrequency::Monthly, province);
            assert_eq!(
                r.net,
                r.gross - r.federal_tax - r.provincial_tax - r.ei - r.pension
            );
        }
    }
}
