use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::csv::{parse_rows, split_header, to_csv_string};
use crate::error::ListenerError;

pub const DEFAULT_PENDING_COLUMN: &str = "is_future_fixture";

const TRUTHY: &[&str] = &["1", "true", "t", "yes", "y"];

/// Source representation of a pending flag before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagValue<'a> {
    Bool(bool),
    Int(i64),
    Text(&'a str),
}

impl From<bool> for FlagValue<'_> {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue<'_> {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl<'a> From<&'a str> for FlagValue<'a> {
    fn from(value: &'a str) -> Self {
        FlagValue::Text(value)
    }
}

/// Maps any flag representation onto the strict 0/1 domain.
pub fn normalize_flag<'a>(value: impl Into<FlagValue<'a>>) -> u8 {
    match value.into() {
        FlagValue::Bool(b) => u8::from(b),
        FlagValue::Int(n) => u8::from(n == 1),
        FlagValue::Text(raw) => {
            let lowered = raw.trim().to_ascii_lowercase();
            u8::from(TRUTHY.contains(&lowered.as_str()))
        }
    }
}

/// Borrowed view over one registry row.
#[derive(Debug, Clone, Copy)]
pub struct FixtureRow<'a> {
    header: &'a [String],
    cells: &'a [String],
}

impl<'a> FixtureRow<'a> {
    pub fn new(header: &'a [String], cells: &'a [String]) -> Self {
        Self { header, cells }
    }

    pub fn cells(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let header = self.header;
        self.cells.iter().enumerate().map(move |(idx, cell)| {
            let name = header.get(idx).map(String::as_str).unwrap_or_default();
            (name, cell.as_str())
        })
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.header.iter().position(|h| h == column)?;
        self.cells.get(idx).map(String::as_str)
    }
}

/// In-memory fixture table loaded from the registry CSV.
#[derive(Debug)]
pub struct FixtureRegistry {
    path: PathBuf,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    flag_col: usize,
    pending: Vec<usize>,
    changed: usize,
}

impl FixtureRegistry {
    pub fn load(path: &Path, pending_column: &str) -> Result<Self, ListenerError> {
        if !path.exists() {
            return Err(ListenerError::RegistryMissing(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path).map_err(|e| ListenerError::io(path, e))?;
        let (header, rows) = split_header(parse_rows(&raw));
        Self::from_table(path.to_path_buf(), header, rows, pending_column)
    }

    fn from_table(
        path: PathBuf,
        header: Vec<String>,
        mut rows: Vec<Vec<String>>,
        pending_column: &str,
    ) -> Result<Self, ListenerError> {
        let flag_col = header
            .iter()
            .position(|h| h.trim() == pending_column)
            .ok_or_else(|| ListenerError::SchemaInvalid {
                path: path.clone(),
                column: pending_column.to_string(),
            })?;

        let mut pending = Vec::new();
        for (idx, row) in rows.iter_mut().enumerate() {
            if row.len() < header.len() {
                row.resize(header.len(), String::new());
            }
            let flag = normalize_flag(row[flag_col].as_str());
            row[flag_col] = flag.to_string();
            if flag == 1 {
                pending.push(idx);
            }
        }

        debug!(
            path = %path.display(),
            rows = rows.len(),
            pending = pending.len(),
            "loaded fixture registry"
        );

        Ok(Self {
            path,
            header,
            rows,
            flag_col,
            pending,
            changed: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn row(&self, idx: usize) -> Option<FixtureRow<'_>> {
        self.rows.get(idx).map(|cells| FixtureRow::new(&self.header, cells))
    }

    pub fn is_pending(&self, idx: usize) -> bool {
        self.rows
            .get(idx)
            .is_some_and(|row| row[self.flag_col] == "1")
    }

    /// Row indices that were pending at load time.
    pub fn pending_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.pending.iter().copied()
    }

    pub fn mark_resolved(&mut self, idx: usize) -> bool {
        let flag_col = self.flag_col;
        let Some(row) = self.rows.get_mut(idx) else {
            return false;
        };
        if row[flag_col] != "1" {
            return false;
        }
        row[flag_col] = "0".to_string();
        self.changed += 1;
        true
    }

    pub fn has_changes(&self) -> bool {
        self.changed > 0
    }

    /// Rewrites the registry through a temp file + rename, only when a row was resolved.
    pub fn persist_if_changed(&mut self) -> Result<bool, ListenerError> {
        if self.changed == 0 {
            return Ok(false);
        }
        let body = to_csv_string(&self.header, &self.rows);
        let tmp = self.path.with_extension("csv.tmp");
        if let Err(err) = fs::write(&tmp, body) {
            let _ = fs::remove_file(&tmp);
            return Err(ListenerError::io(&tmp, err));
        }
        if let Err(err) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(ListenerError::io(&self.path, err));
        }
        info!(
            path = %self.path.display(),
            flipped = self.changed,
            "updated fixture registry"
        );
        self.changed = 0;
        Ok(true)
    }
}
