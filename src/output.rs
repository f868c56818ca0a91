//! Tabular output.
//!
//! The sink accumulates records in discovery order and serializes once at the
//! end of the run: header row in schema order, every value quoted, UTF-8.
//! Quoting is unconditional so sentinel strings, free text with commas, and
//! embedded newlines all survive round-trips through spreadsheet tooling.

use crate::core::types::TableRecord;
use std::fs;
use std::io;
use std::path::Path;

pub struct OutputSink<R> {
    records: Vec<R>,
}

impl<R: TableRecord> OutputSink<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Rows serialize in append order.
    pub fn append(&mut self, record: R) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_row(&mut out, R::columns().iter().copied());
        for record in &self.records {
            let cells = record.row();
            push_row(&mut out, cells.iter().map(String::as_str));
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_csv())
    }
}

impl<R: TableRecord> Default for OutputSink<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write one row with every cell quoted; embedded quotes are doubled.
fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for cell in cells {
        if !first {
            out.push(',');
        } else {
            first = false;
        }
        out.push('"');
        for ch in cell.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
    }
    out.push('\n');
}
