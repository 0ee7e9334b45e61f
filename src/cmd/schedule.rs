//! Schedule command - generate an even monthly vesting schedule as CSV

use chrono::NaiveDate;
use clap::Args;
use rsutax::core::generate_vesting_schedule;
use rust_decimal::Decimal;
use std::io;

#[derive(Args, Debug)]
pub struct ScheduleCommand {
    /// First vesting date, YYYY-MM-DD
    #[arg(long)]
    start: NaiveDate,

    /// Total units granted
    #[arg(long)]
    units: Decimal,

    /// Number of monthly vesting events
    #[arg(long, default_value_t = 48)]
    months: u32,

    /// Fair market value per unit in AUD
    #[arg(long)]
    fmv: Decimal,
}

impl ScheduleCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        if self.units < Decimal::ZERO || self.fmv < Decimal::ZERO {
            anyhow::bail!("units and fmv must not be negative");
        }
        let schedule = generate_vesting_schedule(self.start, self.units, self.months, self.fmv);
        schedule.write_csv(io::stdout())?;
        Ok(())
    }
}
