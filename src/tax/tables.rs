//! Jurisdiction-keyed tax tables.
//!
//! Rates are a constructed value, not scattered constants: the engine takes
//! a `TaxTables` by reference, so a different tax year is just a different
//! constructor. Values here are for tax year 2024.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// One slice of progressive taxation: everything between the previous
/// bracket's bound and `up_to` is taxed at `rate`. `up_to = None` means the
/// bracket is unbounded and must come last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    pub up_to: Option<Decimal>,
    pub rate: Decimal,
}

/// A jurisdiction's bracket schedule plus its basic personal amount.
#[derive(Debug, Clone)]
pub struct BracketSchedule {
    pub brackets: Vec<Bracket>,
    pub basic_personal_amount: Decimal,
}

impl BracketSchedule {
    /// Build a schedule, checking the bracket invariants at construction:
    /// bounds strictly increasing, exactly one unbounded bracket, last.
    pub fn new(brackets: Vec<Bracket>, basic_personal_amount: Decimal) -> Self {
        debug_assert!(!brackets.is_empty());
        debug_assert!(brackets.last().is_some_and(|b| b.up_to.is_none()));
        debug_assert!(
            brackets[..brackets.len() - 1]
                .windows(2)
                .all(|w| match (w[0].up_to, w[1].up_to) {
                    (Some(a), Some(b)) => a < b,
                    _ => false,
                })
        );
        Self {
            brackets,
            basic_personal_amount,
        }
    }

    /// The non-refundable credit: basic personal amount at the lowest
    /// marginal rate.
    pub fn credit(&self) -> Decimal {
        self.basic_personal_amount * self.brackets[0].rate
    }
}

/// Pension-deduction parameters (rate, annual exemption, annual maximum).
#[derive(Debug, Clone, Copy)]
pub struct PensionParams {
    pub rate: Decimal,
    pub annual_exemption: Decimal,
    pub annual_max: Decimal,
}

/// Provincial jurisdictions known to the wizard. Anything else is `Other`
/// and takes the flat-rate fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Province {
    Qc,
    On,
    Bc,
    Ab,
    Mb,
    Sk,
    Ns,
    Nb,
    Other,
}

impl Province {
    pub const ALL: [Province; 9] = [
        Province::Qc,
        Province::On,
        Province::Bc,
        Province::Ab,
        Province::Mb,
        Province::Sk,
        Province::Ns,
        Province::Nb,
        Province::Other,
    ];

    /// Parse a province code. Unknown codes map to `Other`, which is not an
    /// error: it selects the flat-rate fallback.
    pub fn from_code(code: &str) -> Province {
        match code.trim().to_ascii_uppercase().as_str() {
            "QC" => Province::Qc,
            "ON" => Province::On,
            "BC" => Province::Bc,
            "AB" => Province::Ab,
            "MB" => Province::Mb,
            "SK" => Province::Sk,
            "NS" => Province::Ns,
            "NB" => Province::Nb,
            _ => Province::Other,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Province::Qc => "QC",
            Province::On => "ON",
            Province::Bc => "BC",
            Province::Ab => "AB",
            Province::Mb => "MB",
            Province::Sk => "SK",
            Province::Ns => "NS",
            Province::Nb => "NB",
            Province::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for Province {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Bracket/rate/cap data for one tax year.
#[derive(Debug, Clone)]
pub struct TaxTables {
    pub federal: BracketSchedule,
    provincial: Vec<(Province, BracketSchedule)>,
    /// Flat rate applied to annual gross when the province has no schedule.
    pub default_provincial_rate: Decimal,
    pub ei_rate: Decimal,
    pub ei_annual_max: Decimal,
    pub cpp: PensionParams,
    /// Quebec runs its own pension plan with a distinct rate/cap pair.
    pub qpp: PensionParams,
}

impl TaxTables {
    /// The bracket schedule for a province, if it has one.
    pub fn provincial(&self, province: Province) -> Option<&BracketSchedule> {
        self.provincial
            .iter()
            .find(|(p, _)| *p == province)
            .map(|(_, schedule)| schedule)
    }

    /// Pension parameters for a province (QPP for Quebec, CPP elsewhere).
    pub fn pension(&self, province: Province) -> &PensionParams {
        if province == Province::Qc { &self.qpp } else { &self.cpp }
    }

    /// Tax year 2024 tables.
    pub fn year_2024() -> Self {
        fn bracket(up_to: Decimal, rate: Decimal) -> Bracket {
            Bracket {
                up_to: Some(up_to),
                rate,
            }
        }
        fn top(rate: Decimal) -> Bracket {
            Bracket { up_to: None, rate }
        }

        let federal = BracketSchedule::new(
            vec![
                bracket(dec!(55867), dec!(0.15)),
                bracket(dec!(111733), dec!(0.205)),
                bracket(dec!(173205), dec!(0.26)),
                bracket(dec!(246752), dec!(0.29)),
                top(dec!(0.33)),
            ],
            dec!(15705),
        );

        let provincial = vec![
            (
                Province::Qc,
                BracketSchedule::new(
                    vec![
                        bracket(dec!(51780), dec!(0.14)),
                        bracket(dec!(103545), dec!(0.19)),
                        bracket(dec!(126000), dec!(0.24)),
                        top(dec!(0.2575)),
                    ],
                    dec!(18056),
                ),
            ),
            (
                Province::On,
                BracketSchedule::new(
                    vec![
                        bracket(dec!(51446), dec!(0.0505)),
                        bracket(dec!(102894), dec!(0.0915)),
                        bracket(dec!(150000), dec!(0.1116)),
                        bracket(dec!(220000), dec!(0.1216)),
                        top(dec!(0.1316)),
                    ],
                    dec!(12399),
                ),
            ),
            (
                Province::Bc,
                BracketSchedule::new(
                    vec![
                        bracket(dec!(47937), dec!(0.0506)),
                        bracket(dec!(95875), dec!(0.077)),
                        bracket(dec!(110076), dec!(0.105)),
                        bracket(dec!(133664), dec!(0.1229)),
                        bracket(dec!(181232), dec!(0.147)),
                        bracket(dec!(252752), dec!(0.168)),
                        top(dec!(0.205)),
                    ],
                    dec!(12580),
                ),
            ),
            (
                Province::Ab,
                BracketSchedule::new(
                    vec![
                        bracket(dec!(148269), dec!(0.10)),
                        bracket(dec!(177922), dec!(0.12)),
                        bracket(dec!(237230), dec!(0.13)),
                        bracket(dec!(355845), dec!(0.14)),
                        top(dec!(0.15)),
                    ],
                    dec!(21885),
                ),
            ),
            (
                Province::Mb,
                BracketSchedule::new(
                    vec![
                        bracket(dec!(47000), dec!(0.108)),
                        bracket(dec!(100000), dec!(0.1275)),
                        top(dec!(0.174)),
                    ],
                    dec!(15780),
                ),
            ),
            (
                Province::Sk,
                BracketSchedule::new(
                    vec![
                        bracket(dec!(52057), dec!(0.105)),
                        bracket(dec!(148734), dec!(0.125)),
                        top(dec!(0.145)),
                    ],
                    dec!(18491),
                ),
            ),
            (
                Province::Ns,
                BracketSchedule::new(
                    vec![
                        bracket(dec!(29590), dec!(0.0879)),
                        bracket(dec!(59180), dec!(0.1495)),
                        bracket(dec!(93000), dec!(0.1667)),
                        bracket(dec!(150000), dec!(0.175)),
                        top(dec!(0.21)),
                    ],
                    dec!(8481),
                ),
            ),
            (
                Province::Nb,
                BracketSchedule::new(
                    vec![
                        bracket(dec!(49958), dec!(0.094)),
                        bracket(dec!(99916), dec!(0.14)),
                        bracket(dec!(185064), dec!(0.16)),
                        top(dec!(0.195)),
                    ],
                    dec!(13044),
                ),
            ),
        ];

        Self {
            federal,
            provincial,
            default_provincial_rate: dec!(0.10),
            ei_rate: dec!(0.0166),
            ei_annual_max: dec!(1049.12),
            cpp: PensionParams {
                rate: dec!(0.0595),
                annual_exemption: dec!(3500),
                annual_max: dec!(3867.50),
            },
            qpp: PensionParams {
                rate: dec!(0.0640),
                annual_exemption: dec!(3500),
                annual_max: dec!(4160.00),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn province_code_roundtrip() {
        for province in Province::ALL {
            assert_eq!(Province::from_code(province.code()), province);
        }
    }

    #[test]
    fn unknown_code_maps_to_other() {
        assert_eq!(Province::from_code("YT"), Province::Other);
        assert_eq!(Province::from_code(""), Province::Other);
        assert_eq!(Province::from_code("ontario"), Province::Other);
    }

    #[test]
    fn code_parse_is_case_insensitive() {
        assert_eq!(Province::from_code("qc"), Province::Qc);
        assert_eq!(Province::from_code(" on "), Province::On);
    }

    #[test]
    fn year_2024_has_all_listed_provinces() {
        let tables = TaxTables::year_2024();
        for province in Province::ALL {
            if province == Province::Other {
                assert!(tables.provincial(province).is_none());
            } else {
                assert!(tables.provincial(province).is_some(), "{province} missing");
            }
        }
    }

    #[test]
    fn schedules_end_with_unbounded_bracket() {
        let tables = TaxTables::year_2024();
        assert!(tables.federal.brackets.last().unwrap().up_to.is_none());
        for (_, schedule) in &tables.provincial {
            assert!(schedule.brackets.last().unwrap().up_to.is_none());
        }
    }

    #[test]
    fn credit_uses_lowest_rate() {
        let tables = TaxTables::year_2024();
        assert_eq!(tables.federal.credit(), dec!(15705) * dec!(0.15));
        let on = tables.provincial(Province::On).unwrap();
        assert_eq!(on.credit(), dec!(12399) * dec!(0.0505));
    }

    #[test]
    fn quebec_uses_distinct_pension_pair() {
        let tables = TaxTables::year_2024();
        let qpp = tables.pension(Province::Qc);
        let cpp = tables.pension(Province::On);
        assert_eq!(qpp.rate, dec!(0.0640));
        assert_eq!(cpp.rate, dec!(0.0595));
        assert!(qpp.annual_max > cpp.annual_max);
        assert_eq!(qpp.annual_exemption, cpp.annual_exemption);
    }
}
