//! Row-oriented assembly of a [Table] from a header record and data
//! records, the shape spreadsheet and CSV readers produce.

use std::collections::HashMap;

use crate::table::{Cell, Table};

/// Accumulates rows under a fixed header and turns them into a
/// column-oriented [Table]. Duplicated header names are disambiguated
/// with a numeric suffix (`Score`, `Score.1`, `Score.2`) so no column
/// silently shadows another.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TableBuilder {
    pub fn new(headers: Vec<String>) -> TableBuilder {
        TableBuilder {
            headers: mangle_duplicates(headers),
            rows: Vec::new(),
        }
    }

    /// Appends a record, padding short rows with missing cells and
    /// dropping cells beyond the header width.
    pub fn add_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.headers.len(), Cell::Empty);
        self.rows.push(cells);
    }

    pub fn build(self) -> Table {
        let mut table = Table::new();
        for (idx, name) in self.headers.iter().enumerate() {
            let cells: Vec<Cell> = self.rows.iter().map(|row| row[idx].clone()).collect();
            table.insert(name, cells);
        }
        table
    }
}

fn mangle_duplicates(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for name in headers {
        let count = seen.entry(name.clone()).or_insert(0);
        if *count == 0 {
            *count += 1;
            out.push(name);
            continue;
        }
        let mut candidate = format!("{}.{}", name, *count);
        *count += 1;
        while out.iter().any(|existing| *existing == candidate) {
            let count = seen.entry(name.clone()).or_insert(0);
            candidate = format!("{}.{}", name, *count);
            *count += 1;
        }
        out.push(candidate);
    }
    out
}
