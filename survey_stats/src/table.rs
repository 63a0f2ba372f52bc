//! In-memory column-oriented table.
//!
//! The table is deliberately minimal: named columns of loosely typed
//! cells, one row per respondent. Readers fill it with raw spreadsheet
//! content; the pipeline rewrites it into the analysis-ready form.

use std::collections::HashMap;

/// A single cell value as loaded from the source spreadsheet.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Num(f64),
    Text(String),
    /// A missing value. Missingness propagates through every derived
    /// computation instead of raising.
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Best-effort numeric view: numbers pass through, text is trimmed
    /// and parsed, everything else is missing. NaN counts as missing,
    /// so `"NaN"` placeholder text never enters a computation.
    pub fn as_num(&self) -> Option<f64> {
        let x = match self {
            Cell::Num(x) => *x,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Empty => return None,
        };
        if x.is_nan() {
            None
        } else {
            Some(x)
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    /// A column is numeric when it holds at least one number and no
    /// text cell that fails to parse as one. `"NaN"` text parses, so a
    /// column of numbers with NaN placeholders stays numeric.
    pub fn is_numeric(&self) -> bool {
        let mut any = false;
        for c in self.cells.iter() {
            match c {
                Cell::Empty => {}
                Cell::Num(_) => any = true,
                Cell::Text(s) => {
                    if s.trim().parse::<f64>().is_err() {
                        return false;
                    }
                    any = true;
                }
            }
        }
        any
    }
}

/// An ordered collection of equally sized columns.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    nrows: usize,
}

impl Table {
    pub fn new() -> Table {
        Table::default()
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|idx| &self.columns[idx])
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Adds a column, padding or truncating to the current row count
    /// when the table is non-empty. Inserting under an existing name
    /// replaces the data at the existing position: duplicate names
    /// silently collide, the latest insertion wins.
    pub fn insert(&mut self, name: &str, mut cells: Vec<Cell>) {
        if self.columns.is_empty() {
            self.nrows = cells.len();
        } else {
            cells.resize(self.nrows, Cell::Empty);
        }
        match self.position(name) {
            Some(idx) => self.columns[idx].cells = cells,
            None => self.columns.push(Column {
                name: name.to_string(),
                cells,
            }),
        }
    }

    /// Renames a column in place. No-op when `old` is absent. When the
    /// target name already exists, the old holder of that name is
    /// dropped (same collision policy as [Table::insert]).
    pub fn rename(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        if !self.has_column(old) {
            return;
        }
        if let Some(clash) = self.position(new) {
            self.columns.remove(clash);
        }
        if let Some(idx) = self.position(old) {
            self.columns[idx].name = new.to_string();
        }
    }

    /// Coerces a column to numeric in place; cells that do not parse
    /// become missing. No-op when the column is absent.
    pub fn coerce_numeric(&mut self, name: &str) {
        if let Some(idx) = self.position(name) {
            for cell in self.columns[idx].cells.iter_mut() {
                *cell = match cell.as_num() {
                    Some(x) => Cell::Num(x),
                    None => Cell::Empty,
                };
            }
        }
    }

    /// Numeric view of a column, one entry per row.
    pub fn numeric(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.column(name)
            .map(|col| col.cells.iter().map(|c| c.as_num()).collect())
    }

    /// Removes the columns whose names do not satisfy the predicate,
    /// preserving order.
    pub fn retain_columns<F: Fn(&Column) -> bool>(&mut self, keep: F) {
        self.columns.retain(|c| keep(c));
        if self.columns.is_empty() {
            self.nrows = 0;
        }
    }

    /// Removes rows for which the predicate (given all cells of the
    /// row) returns false. The row index stays contiguous.
    pub fn retain_rows<F: Fn(&[&Cell]) -> bool>(&mut self, keep: F) {
        let mut keep_mask: Vec<bool> = Vec::with_capacity(self.nrows);
        for row in 0..self.nrows {
            let cells: Vec<&Cell> = self.columns.iter().map(|c| &c.cells[row]).collect();
            keep_mask.push(keep(&cells));
        }
        for col in self.columns.iter_mut() {
            let mut it = keep_mask.iter();
            col.cells.retain(|_| *it.next().unwrap());
        }
        self.nrows = keep_mask.iter().filter(|k| **k).count();
    }
}

// **** Numeric helpers shared by the statistics modules ****

/// Arithmetic mean over the non-missing entries, `None` when all are
/// missing.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Sample variance (denominator n-1) over fully present values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(ss / (n - 1) as f64)
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Linearly interpolated quantile over a sorted slice, 0 <= q <= 1.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        Some(sorted[lo])
    } else {
        let frac = pos - lo as f64;
        Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
    }
}

/// Most frequent value of a 0/1 column; ties resolve to the smaller
/// value. `None` when no value is present.
pub fn binary_mode(values: &[Option<f64>]) -> Option<f64> {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    let mut present = false;
    for v in values.iter().flatten() {
        present = true;
        *counts.entry(v.to_bits()).or_insert(0) += 1;
    }
    if !present {
        return None;
    }
    let mut items: Vec<(f64, usize)> = counts
        .iter()
        .map(|(bits, n)| (f64::from_bits(*bits), *n))
        .collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.partial_cmp(&b.0).unwrap()));
    items.first().map(|(v, _)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(values: &[f64]) -> Vec<Cell> {
        values.iter().map(|v| Cell::Num(*v)).collect()
    }

    #[test]
    fn insert_replaces_on_name_collision() {
        let mut t = Table::new();
        t.insert("A", num(&[1.0, 2.0]));
        t.insert("B", num(&[3.0, 4.0]));
        t.insert("A", num(&[9.0, 8.0]));
        assert_eq!(t.ncols(), 2);
        assert_eq!(t.numeric("A").unwrap(), vec![Some(9.0), Some(8.0)]);
        // Order is preserved: the collision does not move the column.
        assert_eq!(t.column_names(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn coercion_turns_bad_text_into_missing() {
        let mut t = Table::new();
        t.insert(
            "x",
            vec![
                Cell::Text(" 4.5 ".to_string()),
                Cell::Text("n/a".to_string()),
                Cell::Num(2.0),
                Cell::Empty,
            ],
        );
        t.coerce_numeric("x");
        assert_eq!(
            t.numeric("x").unwrap(),
            vec![Some(4.5), None, Some(2.0), None]
        );
    }

    #[test]
    fn nan_is_missing() {
        assert_eq!(Cell::Text("NaN".to_string()).as_num(), None);
        assert_eq!(Cell::Text("nan".to_string()).as_num(), None);
        assert_eq!(Cell::Num(f64::NAN).as_num(), None);
        assert_eq!(Cell::Text("-1.5".to_string()).as_num(), Some(-1.5));
    }

    #[test]
    fn rename_drops_clashing_target() {
        let mut t = Table::new();
        t.insert("age_years", num(&[30.0]));
        t.insert("Age", num(&[99.0]));
        t.rename("age_years", "Age");
        assert_eq!(t.ncols(), 1);
        assert_eq!(t.numeric("Age").unwrap(), vec![Some(30.0)]);
    }

    #[test]
    fn retain_rows_keeps_index_contiguous() {
        let mut t = Table::new();
        t.insert("x", vec![Cell::Num(1.0), Cell::Empty, Cell::Num(3.0)]);
        t.retain_rows(|cells| cells.iter().any(|c| !c.is_empty()));
        assert_eq!(t.nrows(), 2);
        assert_eq!(t.numeric("x").unwrap(), vec![Some(1.0), Some(3.0)]);
    }

    #[test]
    fn quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        assert_eq!(quantile(&v, 0.5), Some(2.5));
    }

    #[test]
    fn binary_mode_breaks_ties_low() {
        let v = vec![Some(1.0), Some(0.0), Some(1.0), Some(0.0)];
        assert_eq!(binary_mode(&v), Some(0.0));
        assert_eq!(binary_mode(&[None, Some(1.0), Some(1.0)]), Some(1.0));
        assert_eq!(binary_mode(&[None, None]), None);
    }
}
