use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("column '{column}' has {found} cells, expected {expected}")]
    RaggedColumn {
        column: String,
        found: usize,
        expected: usize,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single spreadsheet value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Number(Decimal),
    Date(NaiveDate),
    Text(String),
}

impl Cell {
    /// Infer the type of a raw spreadsheet value
    pub fn parse(raw: &str) -> Cell {
        let s = raw.trim();
        if s.is_empty() {
            return Cell::Empty;
        }
        if let Some(b) = parse_bool(s) {
            return Cell::Bool(b);
        }
        if let Some(date) = parse_date(s) {
            return Cell::Date(date);
        }
        if let Some(number) = parse_number(s) {
            return Cell::Number(number);
        }
        Cell::Text(s.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Numeric value, accepting numeric text
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Date value, accepting date text
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => parse_date(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            Cell::Number(n) => Some(!n.is_zero()),
            Cell::Text(s) => parse_bool(s).or_else(|| match s.to_lowercase().as_str() {
                "y" => Some(true),
                "n" => Some(false),
                _ => None,
            }),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<Decimal> for Cell {
    fn from(n: Decimal) -> Self {
        Cell::Number(n)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parse a date that may be date-only, datetime, or RFC3339
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(date);
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Parse a spreadsheet number, tolerating currency symbols, thousands
/// separators and a trailing percent sign
fn parse_number(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let rest = rest
        .trim_start_matches("A$")
        .trim_start_matches('$')
        .trim_end_matches('%');
    let cleaned: String = rest.chars().filter(|c| *c != ',' && *c != ' ').collect();
    if cleaned.is_empty() {
        return None;
    }
    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;
    Some(if negative { -value } else { value })
}

/// A named column of cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

/// Column-major table of spreadsheet data.
///
/// All columns have the same length. Column lookups ignore surrounding
/// whitespace and ASCII case, so "rsus vested" finds "RSUs Vested".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (S, Vec<Cell>)>,
        S: Into<String>,
    {
        let mut table = Table::new();
        for (index, (name, cells)) in columns.into_iter().enumerate() {
            let name = name.into();
            if index > 0 && cells.len() != table.rows {
                return Err(TableError::RaggedColumn {
                    column: name,
                    found: cells.len(),
                    expected: table.rows,
                });
            }
            table.set_column(&name, cells);
        }
        Ok(table)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows
    }

    /// A table without rows is structurally empty, even if it has headers
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns
            .iter()
            .position(|c| c.name.trim().eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// The stored name of a column matching `name`
    pub fn column_name(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.columns[i].name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.position(name).map(|i| self.columns[i].cells.as_slice())
    }

    pub fn cell(&self, name: &str, row: usize) -> Option<&Cell> {
        self.column(name).and_then(|cells| cells.get(row))
    }

    /// Replace a column in place, or append it if absent.
    ///
    /// The first column of an empty table sets the row count; after that the
    /// cells are padded with `Empty` or truncated to the table length.
    pub fn set_column(&mut self, name: &str, mut cells: Vec<Cell>) {
        if self.columns.is_empty() {
            self.rows = cells.len();
        }
        cells.resize(self.rows, Cell::Empty);
        match self.position(name) {
            Some(i) => self.columns[i].cells = cells,
            None => self.columns.push(Column {
                name: name.to_string(),
                cells,
            }),
        }
    }

    /// Rename a column in place, keeping its position. Any other column
    /// already named `to` is removed. Returns false if `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        let Some(source) = self.position(from) else {
            return false;
        };
        if let Some(existing) = self.position(to).filter(|&i| i != source) {
            self.columns.remove(existing);
        }
        if let Some(source) = self.position(from) {
            self.columns[source].name = to.to_string();
        }
        true
    }

    /// Cells of one row, in column order
    pub fn row(&self, index: usize) -> Vec<&Cell> {
        self.columns.iter().map(|c| &c.cells[index]).collect()
    }

    /// New table holding only the rows for which `keep` returns true
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(usize) -> bool,
    {
        let kept: Vec<usize> = (0..self.rows).filter(|&i| keep(i)).collect();
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    cells: kept.iter().map(|&i| c.cells[i].clone()).collect(),
                })
                .collect(),
            rows: kept.len(),
        }
    }

    /// Read a table from CSV with a header row
    pub fn read_csv<R: Read>(reader: R) -> Result<Table, TableError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];

        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(TableError::RaggedRow {
                    row: row + 1,
                    found: record.len(),
                    expected: headers.len(),
                });
            }
            for (cells, raw) in columns.iter_mut().zip(record.iter()) {
                cells.push(Cell::parse(raw));
            }
        }

        let table = Table::from_columns(headers.into_iter().zip(columns))?;
        log::info!(
            "Read {} csv records with {} columns",
            table.len(),
            table.width()
        );
        Ok(table)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.column_names())?;
        for i in 0..self.rows {
            wtr.write_record(self.columns.iter().map(|c| c.cells[i].to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
