//! E2E tests for the rsutax commands

use rsutax::core::{Cell, Table};
use rust_decimal_macros::dec;
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn rsutax(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rsutax"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn summary_json(args: &[&str]) -> serde_json::Value {
    let output = rsutax(args);
    assert!(output.status.success(), "Command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("summary should be valid JSON")
}

/// Test the vesting table display with synonym columns
#[test]
fn process_vesting_table() {
    let output = rsutax(&["process", "-k", "vesting", "-i", "tests/data/vesting.csv"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("Vesting Date"));
    assert!(stdout.contains("Tax Payable"));
    assert!(stdout.contains("Financial Year"));
    assert!(stdout.contains("9000.00"));
    assert!(stdout.contains("2023-2024"));
}

/// Test full precision CSV output of processed vesting rows
#[test]
fn process_vesting_csv() {
    let output = rsutax(&[
        "process",
        "-k",
        "vesting",
        "-i",
        "tests/data/vesting.csv",
        "--csv",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let table = Table::read_csv(output.stdout.as_slice()).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.cell("Gross Value", 1), Some(&Cell::Number(dec!(25000))));
    assert_eq!(table.cell("Tax Payable", 0), Some(&Cell::Number(dec!(9000))));
    // Per-row rate of 32.5%
    assert_eq!(table.cell("Tax Payable", 2), Some(&Cell::Number(dec!(1625))));
    assert_eq!(table.cell("Net Value", 2), Some(&Cell::Number(dec!(3375))));
    assert_eq!(table.cell("Financial Year", 2), Some(&Cell::from("2023-2024")));
}

/// Test sales processing with the CGT discount
#[test]
fn process_sales_csv() {
    let output = rsutax(&[
        "process",
        "-k",
        "sales",
        "-i",
        "tests/data/sales.csv",
        "-r",
        "30",
        "--csv",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let table = Table::read_csv(output.stdout.as_slice()).unwrap();
    let sold = chrono::NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
    assert_eq!(table.cell("Sell Date", 0), Some(&Cell::Date(sold)));
    assert_eq!(table.cell("Capital Gain", 0), Some(&Cell::Number(dec!(500))));
    assert_eq!(table.cell("Capital Gain", 1), Some(&Cell::Number(dec!(1000))));
    assert_eq!(table.cell("Capital Gain", 2), Some(&Cell::Number(dec!(-100))));
    assert_eq!(table.cell("Tax on CG", 0), Some(&Cell::Number(dec!(150))));
}

/// Test reading the input table from stdin
#[test]
fn process_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_rsutax"))
        .args(["process", "-k", "vesting", "-i", "-", "--csv"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Vesting Date,RSUs Vested,FMV at Vesting\n2024-08-01,250,80.0\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "Command failed: {:?}", output);

    let table = Table::read_csv(output.stdout.as_slice()).unwrap();
    assert_eq!(table.cell("Net Value", 0), Some(&Cell::Number(dec!(11000))));
}

/// Test an invalid rate is rejected
#[test]
fn process_rejects_bad_rate() {
    let output = rsutax(&[
        "process",
        "-k",
        "vesting",
        "-i",
        "tests/data/vesting.csv",
        "-r",
        "150",
    ]);
    assert!(!output.status.success());
}

/// Test summary JSON output for one financial year
#[test]
fn summary_json_for_year() {
    let json = summary_json(&[
        "summary",
        "-v",
        "tests/data/vesting.csv",
        "-s",
        "tests/data/sales.csv",
        "-y",
        "2024-2025",
        "--json",
    ]);

    let summaries = json.as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary["financial_year"], "2024-2025");
    assert_eq!(summary["status"]["state"], "Complete");
    assert_eq!(summary["ordinary_income"], "45000.00");
    assert_eq!(summary["capital_gains"], "1900.00");
    assert_eq!(summary["cgt_discount"], "400.00");
    assert_eq!(summary["net_capital_gain"], "1400.00");
    assert_eq!(summary["tax_withheld"], "20250.00");
    assert_eq!(summary["estimated_tax"], "4708.00");
    assert_eq!(summary["remaining_tax_payable"], "-15542.00");
    assert_eq!(summary["ato_items"][0]["code"], "1-Salary");
    assert_eq!(summary["ato_items"][1]["code"], "18-CapitalGains");
    assert_eq!(summary["ato_items"][1]["amount"], "1400.00");
}

/// Test summary text output covers every year present
#[test]
fn summary_all_years() {
    let output = rsutax(&[
        "summary",
        "-v",
        "tests/data/vesting.csv",
        "-s",
        "tests/data/sales.csv",
        "-o",
        "100000",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("TAX SUMMARY (2023-2024)"));
    assert!(stdout.contains("TAX SUMMARY (2024-2025)"));
    assert!(stdout.contains("ATO ITEMS"));
    assert!(stdout.contains("1-Salary"));
    assert!(stdout.contains("18-CapitalGains"));
    assert!(stdout.contains("Remaining payable"));
}

/// Test the short financial year label selects the same year
#[test]
fn summary_short_year_label() {
    let args = |year| {
        vec![
            "summary",
            "-v",
            "tests/data/vesting.csv",
            "-s",
            "tests/data/sales.csv",
            "-y",
            year,
            "--json",
        ]
    };
    let short = summary_json(&args("2024-25"));
    assert_eq!(short, summary_json(&args("2024-2025")));
    assert_eq!(short[0]["financial_year"], "2024-2025");
    assert_eq!(short[0]["estimated_tax"], "4708.00");
}

/// Test an invalid financial year is rejected rather than summarized as zero
#[test]
fn summary_rejects_bad_year() {
    let output = rsutax(&["summary", "-v", "tests/data/vesting.csv", "-y", "FY25"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid financial year"));
}

/// Test a single table with thresholds at 18201, 45001, 120001 and 180001
#[test]
fn summary_with_single_bracket_table() {
    let json = summary_json(&[
        "summary",
        "-v",
        "tests/data/vesting.csv",
        "-y",
        "2024-2025",
        "-b",
        "tests/data/brackets_single_table.json",
        "--json",
    ]);
    // (45000 - 18201) * 19%
    assert_eq!(json[0]["estimated_tax"], "5091.81");
}

/// Test a year with no rows gives a zero summary
#[test]
fn summary_unmatched_year_is_zero() {
    let json = summary_json(&[
        "summary",
        "-v",
        "tests/data/vesting.csv",
        "-y",
        "2030-2031",
        "--json",
    ]);
    let summary = &json[0];
    assert_eq!(summary["ordinary_income"], "0.00");
    assert_eq!(summary["net_capital_gain"], "0.00");
    assert_eq!(summary["estimated_tax"], "0.00");
}

/// Test custom brackets from a JSON file
#[test]
fn summary_with_bracket_file() {
    let json = summary_json(&[
        "summary",
        "-v",
        "tests/data/vesting.csv",
        "-s",
        "tests/data/sales.csv",
        "-b",
        "tests/data/brackets.json",
        "--json",
    ]);

    let summaries = json.as_array().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0]["financial_year"], "2023-2024");
    // 10% flat from 2020-2021
    assert_eq!(summaries[0]["estimated_tax"], "500.00");
    // (46400 - 10000) * 20%
    assert_eq!(summaries[1]["estimated_tax"], "7280.00");
}

/// Test summary requires at least one input file
#[test]
fn summary_without_files_fails() {
    let output = rsutax(&["summary"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Provide a vesting file"));
}

/// Test financial year classification at the boundary
#[test]
fn fy_boundary() {
    let output = rsutax(&["fy", "-d", "2024-06-30"]);
    let out = stdout(&output);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(out.contains("Financial year: 2023-2024"));
    assert!(out.contains("Days to next financial year: 1"));

    let output = rsutax(&["fy", "-d", "2024-07-01"]);
    assert!(stdout(&output).contains("Financial year: 2024-2025"));
}

/// Test the generated schedule can be processed
#[test]
fn schedule_csv() {
    let output = rsutax(&[
        "schedule", "--start", "2024-01-01", "--units", "1200", "--months", "12", "--fmv", "100",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let table = Table::read_csv(output.stdout.as_slice()).unwrap();
    assert_eq!(table.len(), 12);
    assert_eq!(
        table.column_names().collect::<Vec<_>>(),
        vec!["Vesting Date", "RSUs Vested", "FMV at Vesting", "Gross Value (AUD)"]
    );
    assert_eq!(table.cell("Gross Value (AUD)", 11), Some(&Cell::Number(dec!(10000))));
}

/// Test the input format documentation
#[test]
fn schema_formats() {
    let output = rsutax(&["schema"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["title"], "BracketConfig");
    assert!(schema["properties"]["years"].is_object());

    let output = rsutax(&["schema", "csv-header", "--table", "sales"]);
    assert_eq!(
        stdout(&output).trim(),
        "Sell Date,Shares Sold,Sale Price,FMV at Vesting,Held > 12 Months,Marginal Tax Rate,Vesting Date"
    );

    let output = rsutax(&["schema", "csv-fields"]);
    let stdout = stdout(&output);
    assert!(stdout.contains("RSUs Vested"));
    assert!(stdout.contains("accepts: RSU Vested, RSUs Vested"));
    assert!(stdout.contains("accepts: Price at Vesting, FMV at Vesting, FMV at Vesting (AUD)"));
}

/// Test the bracket schema accepts the string amounts used in bracket files
#[test]
fn schema_allows_string_amounts() {
    let output = rsutax(&["schema"]);
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let bracket = &schema["definitions"]["TaxBracket"]["properties"];
    for field in ["threshold", "rate"] {
        let types = bracket[field]["type"].as_array().unwrap();
        assert!(types.contains(&"string".into()), "{}: {:?}", field, types);
        assert!(types.contains(&"number".into()), "{}: {:?}", field, types);
    }
}
