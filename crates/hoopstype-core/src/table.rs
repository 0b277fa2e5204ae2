// Tabular container for per-player-season statistics, with CSV read/write.
//
// Columns are addressed by name. Every row has exactly one cell per column;
// a table that cannot satisfy that shape is rejected at construction, so the
// pipeline stages never see non-rectangular input.

use std::collections::HashSet;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

// ---------------------------------------------------------------------------
// Domain column names
// ---------------------------------------------------------------------------

pub const PLAYER_ID: &str = "player_id";
pub const TEAM_ABBREVIATION: &str = "team_abbreviation";
pub const MINUTES_PLAYED: &str = "minutes_played";
pub const POINTS: &str = "points";
pub const ASSISTS: &str = "assists";
pub const TOTAL_REBOUNDS: &str = "total_rebounds";
pub const BLOCKS: &str = "blocks";
pub const STEALS: &str = "steals";
pub const TURNOVERS: &str = "turnovers";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("input is not tabular: {reason}")]
    NotTabular { reason: String },

    #[error("table does not contain column `{column}`")]
    MissingColumn { column: String },

    #[error("column `{column}` has a non-numeric value at row {row}")]
    NonNumeric { column: String, row: usize },

    #[error("column `{column}` expects {expected} values, got {found}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("failed to access file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// A single cell. Integers and floats are kept apart so counting stats
/// survive a read/write cycle without gaining a decimal point.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Parse a raw CSV cell: integer, then float, then text. Empty cells are
    /// `Missing`. Only plain decimal notation counts as a number, so spellings
    /// like `nan` or `inf` stay text.
    pub fn parse(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }
        let decimal = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
        if decimal {
            if let Ok(f) = trimmed.parse::<f64>() {
                if f.is_finite() {
                    return Value::Float(f);
                }
            }
        }
        Value::Text(trimmed.to_string())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view. Floats with no fractional part convert; anything else
    /// returns `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            // Keep the decimal point so a float reads back as a float
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

// ---------------------------------------------------------------------------
// PlayerTable
// ---------------------------------------------------------------------------

/// Named columns over rectangular rows. Row order is always dense and
/// zero-based; filtering produces a compacted table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl PlayerTable {
    /// Build a table, rejecting duplicate column names and ragged rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(TableError::NotTabular {
                    reason: format!("duplicate column name `{name}`"),
                });
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::NotTabular {
                    reason: format!(
                        "row {i} has {} cells but the header has {} columns",
                        row.len(),
                        columns.len()
                    ),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn {
                column: name.to_string(),
            })
    }

    /// Cell lookup by row position and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>, TableError> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Every cell of `name` as `f64`. Missing or text cells are an error.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, TableError> {
        let idx = self.require_column(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, r)| {
                r[idx].as_f64().ok_or_else(|| TableError::NonNumeric {
                    column: name.to_string(),
                    row,
                })
            })
            .collect()
    }

    /// Replace the column if it exists, otherwise append it on the right.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Remove the named columns. Every name must exist.
    pub fn drop_columns(&mut self, names: &[String]) -> Result<(), TableError> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            indices.push(self.require_column(name)?);
        }
        indices.sort_unstable();
        indices.dedup();
        for &idx in indices.iter().rev() {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        Ok(())
    }

    /// Keep rows for which `keep` returns true, given the row's position.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &[Value]) -> bool,
    {
        let mut i = 0;
        self.rows.retain(|row| {
            let kept = keep(i, row);
            i += 1;
            kept
        });
    }

    /// Replace every `Missing` cell with `fill`.
    pub fn fill_missing(&mut self, fill: &Value) {
        for cell in self.rows.iter_mut().flatten() {
            if cell.is_missing() {
                *cell = fill.clone();
            }
        }
    }

    // -----------------------------------------------------------------------
    // CSV
    // -----------------------------------------------------------------------

    /// Read a headered CSV. Ragged records are reported as `NotTabular`.
    pub fn from_csv_reader<R: Read>(rdr: R) -> Result<Self, TableError> {
        read_csv(rdr, "<reader>")
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|e| TableError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        read_csv(file, &path.display().to_string())
    }

    pub fn write_csv<W: Write>(&self, wtr: W) -> Result<(), TableError> {
        write_csv(self, wtr, "<writer>")
    }

    pub fn write_csv_path(&self, path: &Path) -> Result<(), TableError> {
        let file = std::fs::File::create(path).map_err(|e| TableError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        write_csv(self, file, &path.display().to_string())
    }
}

fn read_csv<R: Read>(rdr: R, label: &str) -> Result<PlayerTable, TableError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let csv_err = |e: csv::Error| {
        let ragged = match e.kind() {
            csv::ErrorKind::UnequalLengths {
                pos,
                expected_len,
                len,
            } => Some(format!(
                "record {} has {len} fields, expected {expected_len}",
                pos.as_ref().map_or(0, |p| p.record())
            )),
            _ => None,
        };
        match ragged {
            Some(reason) => TableError::NotTabular { reason },
            None => TableError::Csv {
                path: label.to_string(),
                source: e,
            },
        }
    };

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return Err(TableError::NotTabular {
            reason: format!("{label} has no header row"),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(Value::parse).collect());
    }
    PlayerTable::new(columns, rows)
}

fn write_csv<W: Write>(table: &PlayerTable, wtr: W, label: &str) -> Result<(), TableError> {
    let to_err = |e: csv::Error| TableError::Csv {
        path: label.to_string(),
        source: e,
    };
    let mut writer = csv::Writer::from_writer(wtr);
    writer.write_record(&table.columns).map_err(to_err)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(to_err)?;
    }
    writer.flush().map_err(|e| TableError::Io {
        path: label.to_string(),
        source: e,
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
