//! Even monthly vesting schedules

use crate::core::cgt::amount_or_zero;
use crate::core::schema::{PRICE_AT_VESTING, RSUS_VESTED, VESTING_DATE};
use crate::core::table::{Cell, Table};
use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;

/// Gross value column of a generated schedule, a synonym of `Gross Value`
pub const SCHEDULE_GROSS_VALUE: &str = "Gross Value (AUD)";

/// Generate a schedule vesting `total_units` evenly over `months` monthly
/// events, the first on `start`, all at a constant `fmv`.
///
/// Later events fall on the same day of the month as `start`, clamped to the
/// month's last day.
pub fn generate_vesting_schedule(
    start: NaiveDate,
    total_units: Decimal,
    months: u32,
    fmv: Decimal,
) -> Table {
    let dates: Vec<NaiveDate> = (0..months)
        .map_while(|i| start.checked_add_months(Months::new(i)))
        .collect();
    let per_month = if months == 0 {
        Decimal::ZERO
    } else {
        total_units / Decimal::from(months)
    };
    let rows = dates.len();
    log::debug!("Generated {} vesting dates from {}", rows, start);

    let mut table = Table::new();
    table.set_column(
        VESTING_DATE.canonical,
        dates.into_iter().map(Cell::from).collect(),
    );
    table.set_column(RSUS_VESTED.canonical, vec![Cell::from(per_month); rows]);
    table.set_column(PRICE_AT_VESTING.canonical, vec![Cell::from(fmv); rows]);
    let gross = amount_or_zero(per_month.checked_mul(fmv), "Schedule gross value");
    table.set_column(SCHEDULE_GROSS_VALUE, vec![Cell::from(gross); rows]);
    table
}
