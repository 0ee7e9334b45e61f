use crate::core::fy::FinancialYear;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BracketError {
    #[error("bracket table has no brackets")]
    Empty,
    #[error("first bracket must start at 0, found {0}")]
    NonZeroFirstThreshold(Decimal),
    #[error("bracket {index} threshold {threshold} does not exceed previous threshold {previous}")]
    NotIncreasing {
        index: usize,
        threshold: Decimal,
        previous: Decimal,
    },
    #[error("bracket {index} has negative rate {rate}")]
    NegativeRate { index: usize, rate: Decimal },
    #[error("bracket {index} rate {rate} is above 1")]
    RateAboveOne { index: usize, rate: Decimal },
    #[error("bracket schedule has no years")]
    NoYears,
    #[error("invalid financial year in bracket schedule: {0}")]
    InvalidYear(String),
}

/// One marginal rate band: income above `threshold` is taxed at `rate`
/// until the next bracket's threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaxBracket {
    /// Lower bound of the band in AUD
    #[schemars(schema_with = "decimal_schema")]
    pub threshold: Decimal,
    /// Marginal rate as a fraction (0.45 = 45%)
    #[schemars(schema_with = "decimal_schema")]
    pub rate: Decimal,
}

/// Decimals serialize as strings and deserialize from strings or numbers
pub(crate) fn decimal_schema(_: &mut SchemaGenerator) -> Schema {
    SchemaObject {
        instance_type: Some(vec![InstanceType::String, InstanceType::Number].into()),
        ..Default::default()
    }
    .into()
}

impl TaxBracket {
    pub const fn new(threshold: Decimal, rate: Decimal) -> Self {
        TaxBracket { threshold, rate }
    }
}

/// Validated progressive bracket table, thresholds strictly increasing from 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketTable {
    brackets: Vec<TaxBracket>,
}

impl BracketTable {
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, BracketError> {
        let first = brackets.first().ok_or(BracketError::Empty)?;
        if !first.threshold.is_zero() {
            return Err(BracketError::NonZeroFirstThreshold(first.threshold));
        }
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO {
                return Err(BracketError::NegativeRate {
                    index,
                    rate: bracket.rate,
                });
            }
            if bracket.rate > Decimal::ONE {
                return Err(BracketError::RateAboveOne {
                    index,
                    rate: bracket.rate,
                });
            }
            if index > 0 && bracket.threshold <= brackets[index - 1].threshold {
                return Err(BracketError::NotIncreasing {
                    index,
                    threshold: bracket.threshold,
                    previous: brackets[index - 1].threshold,
                });
            }
        }
        Ok(BracketTable { brackets })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    pub fn tax(&self, income: Decimal) -> Decimal {
        income_tax(income, self)
    }

    /// Resident rates 2020-21 to 2023-24
    pub fn resident_2020_21() -> Self {
        Self::from_static(&[
            TaxBracket::new(dec!(0), dec!(0)),
            TaxBracket::new(dec!(18200), dec!(0.19)),
            TaxBracket::new(dec!(45000), dec!(0.325)),
            TaxBracket::new(dec!(120000), dec!(0.37)),
            TaxBracket::new(dec!(180000), dec!(0.45)),
        ])
    }

    /// Resident rates from 2024-25 (stage 3)
    pub fn resident_2024_25() -> Self {
        Self::stage_3(dec!(0.16))
    }

    pub fn resident_2026_27() -> Self {
        Self::stage_3(dec!(0.15))
    }

    pub fn resident_2027_28() -> Self {
        Self::stage_3(dec!(0.14))
    }

    fn stage_3(first_rate: Decimal) -> Self {
        Self::from_static(&[
            TaxBracket::new(dec!(0), dec!(0)),
            TaxBracket::new(dec!(18200), first_rate),
            TaxBracket::new(dec!(45000), dec!(0.30)),
            TaxBracket::new(dec!(135000), dec!(0.37)),
            TaxBracket::new(dec!(190000), dec!(0.45)),
        ])
    }

    // Built-in tables are known valid
    fn from_static(brackets: &[TaxBracket]) -> Self {
        BracketTable {
            brackets: brackets.to_vec(),
        }
    }
}

/// Progressive income tax on `income`.
///
/// Each bracket taxes the slice of income between its threshold and the next
/// bracket's threshold; the last bracket is uncapped. No rounding is applied.
pub fn income_tax(income: Decimal, table: &BracketTable) -> Decimal {
    let brackets = table.brackets();
    let mut tax = Decimal::ZERO;
    for (i, bracket) in brackets.iter().enumerate() {
        if income <= bracket.threshold {
            break;
        }
        let upper = brackets
            .get(i + 1)
            .map_or(income, |next| income.min(next.threshold));
        tax += (upper - bracket.threshold) * bracket.rate;
    }
    tax
}

/// Bracket tables by financial year.
///
/// Each table applies from its financial year until the next entry. Years
/// before the first entry use the first table; labels that are not a
/// financial year (e.g. "Unknown") use the default table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketSchedule {
    years: BTreeMap<FinancialYear, BracketTable>,
    default: BracketTable,
}

impl BracketSchedule {
    /// Australian resident individual rates
    pub fn australian_resident() -> Self {
        let years = BTreeMap::from([
            (FinancialYear(2020), BracketTable::resident_2020_21()),
            (FinancialYear(2024), BracketTable::resident_2024_25()),
            (FinancialYear(2026), BracketTable::resident_2026_27()),
            (FinancialYear(2027), BracketTable::resident_2027_28()),
        ]);
        BracketSchedule {
            years,
            default: BracketTable::resident_2024_25(),
        }
    }

    pub fn from_config(config: BracketConfig) -> Result<Self, BracketError> {
        let mut years = BTreeMap::new();
        for (label, brackets) in config.years {
            let year: FinancialYear = label
                .parse()
                .map_err(|_| BracketError::InvalidYear(label.clone()))?;
            years.insert(year, BracketTable::new(brackets)?);
        }
        let default = match config.default_year {
            Some(label) => {
                let year: FinancialYear = label
                    .parse()
                    .map_err(|_| BracketError::InvalidYear(label.clone()))?;
                Self::lookup(&years, year).cloned()
            }
            None => years.values().next_back().cloned(),
        }
        .ok_or(BracketError::NoYears)?;
        Ok(BracketSchedule { years, default })
    }

    fn lookup(
        years: &BTreeMap<FinancialYear, BracketTable>,
        year: FinancialYear,
    ) -> Option<&BracketTable> {
        years
            .range(..=year)
            .next_back()
            .or_else(|| years.iter().next())
            .map(|(_, table)| table)
    }

    pub fn for_year(&self, year: FinancialYear) -> &BracketTable {
        Self::lookup(&self.years, year).unwrap_or(&self.default)
    }

    /// Table for a financial year label, falling back to the default table
    pub fn for_label(&self, label: &str) -> &BracketTable {
        match label.parse::<FinancialYear>() {
            Ok(year) => self.for_year(year),
            Err(_) => {
                log::debug!("No financial year in '{}', using default brackets", label);
                &self.default
            }
        }
    }
}

impl Default for BracketSchedule {
    fn default() -> Self {
        Self::australian_resident()
    }
}

/// JSON configuration for a custom bracket schedule
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BracketConfig {
    /// Bracket tables keyed by the financial year they take effect (e.g. "2024-2025")
    pub years: BTreeMap<String, Vec<TaxBracket>>,
    /// Financial year whose table applies to rows with an unknown year.
    /// Defaults to the latest configured year.
    #[serde(default)]
    pub default_year: Option<String>,
}

/// Read a bracket schedule from JSON
pub fn read_bracket_config<R: std::io::Read>(reader: R) -> anyhow::Result<BracketSchedule> {
    let config: BracketConfig = serde_json::from_reader(reader)?;
    Ok(BracketSchedule::from_config(config)?)
}
