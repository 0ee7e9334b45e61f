pub mod brackets;
pub mod cgt;
pub mod fy;
pub mod process;
pub mod schedule;
pub mod schema;
pub mod summary;
pub mod table;

// Flat public surface for domain types and functions.
pub use brackets::{
    income_tax, read_bracket_config, BracketConfig, BracketError, BracketSchedule, BracketTable,
    TaxBracket,
};
pub use cgt::{calculate_capital_gain, is_long_term_holding, CapitalGain};
pub use fy::{days_to_next_fy, financial_year_label, FinancialYear, UNKNOWN_FINANCIAL_YEAR};
pub use process::{
    normalize_and_process_sales, normalize_and_process_sales_as_of,
    normalize_and_process_vesting, normalize_and_process_vesting_as_of, SaleLot, VestingEvent,
};
pub use schedule::generate_vesting_schedule;
pub use summary::{
    financial_years, summarize_all, summarize_financial_year, summarize_financial_year_with,
    AtoItem, FinancialYearTaxSummary, SummaryStatus,
};
pub use table::{Cell, Column, Table, TableError};
