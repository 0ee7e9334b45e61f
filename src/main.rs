mod cmd;

use clap::{Parser, Subcommand};

/// Australian tax calculator for RSU vesting and share sales
#[derive(Parser, Debug)]
#[command(name = "rsutax", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add tax columns to a vesting or sales spreadsheet
    Process(cmd::process::ProcessCommand),
    /// Financial year summaries with estimated tax and ATO items
    Summary(cmd::summary::SummaryCommand),
    /// Financial year of a date and days until the next one
    Fy(cmd::fy::FyCommand),
    /// Generate an even monthly vesting schedule
    Schedule(cmd::schedule::ScheduleCommand),
    /// Print expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Process(process) => process.exec(),
        Command::Summary(summary) => summary.exec(),
        Command::Fy(fy) => fy.exec(),
        Command::Schedule(schedule) => schedule.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
