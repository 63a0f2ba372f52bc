//! Internal-consistency reliability (Cronbach's alpha) per scale.

use log::debug;

use crate::config::{ReliabilityRow, CENTER_SUFFIX, SCALE_NAMES};
use crate::table::{sample_variance, Table};

/// The item columns considered for reliability: same matching rule as
/// the aggregator, with centered variants excluded.
fn item_columns(table: &Table, prefix: &str) -> Vec<String> {
    let upper = prefix.to_uppercase();
    table
        .column_names()
        .into_iter()
        .filter(|n| {
            n.to_uppercase().starts_with(&upper) && n != prefix && !n.ends_with(CENTER_SUFFIX)
        })
        .collect()
}

/// Cronbach's alpha over complete cases of the given item views.
///
/// alpha = (k / (k - 1)) * (1 - sum(item variances) / var(row sums))
///
/// with sample variance (n-1) everywhere. Returns `None` when the
/// statistic is undefined: fewer than 2 complete rows, or zero
/// variance in the row sums.
pub fn cronbach_alpha(views: &[Vec<Option<f64>>]) -> Option<f64> {
    let k = views.len();
    if k < 2 {
        return None;
    }
    let nrows = views[0].len();
    // Complete-case analysis: keep rows with every item present.
    let mut complete: Vec<Vec<f64>> = Vec::new();
    for row in 0..nrows {
        let vals: Vec<f64> = views.iter().filter_map(|v| v[row]).collect();
        if vals.len() == k {
            complete.push(vals);
        }
    }
    if complete.len() < 2 {
        return None;
    }
    let mut item_var_sum = 0.0;
    for item in 0..k {
        let col: Vec<f64> = complete.iter().map(|row| row[item]).collect();
        item_var_sum += sample_variance(&col)?;
    }
    let row_sums: Vec<f64> = complete.iter().map(|row| row.iter().sum()).collect();
    let total_var = sample_variance(&row_sums)?;
    if total_var == 0.0 {
        return None;
    }
    Some((k as f64 / (k as f64 - 1.0)) * (1.0 - item_var_sum / total_var))
}

/// Builds the reliability report: one row per named construct with at
/// least 2 item columns, in the fixed construct order. Constructs with
/// 0 or 1 items are omitted entirely.
pub fn reliability_table(table: &Table) -> Vec<ReliabilityRow> {
    let mut rows: Vec<ReliabilityRow> = Vec::new();
    for (name, prefix) in SCALE_NAMES {
        let items = item_columns(table, prefix);
        if items.len() < 2 {
            debug!(
                "reliability_table: skipping {} ({} item columns)",
                name,
                items.len()
            );
            continue;
        }
        let views: Vec<Vec<Option<f64>>> =
            items.iter().filter_map(|i| table.numeric(i)).collect();
        rows.push(ReliabilityRow {
            scale: name.to_string(),
            prefix: prefix.to_string(),
            items: items.len(),
            alpha: cronbach_alpha(&views),
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn num_col(values: &[f64]) -> Vec<Cell> {
        values.iter().map(|v| Cell::Num(*v)).collect()
    }

    #[test]
    fn alpha_known_value() {
        // Items x and 2x: var 1 and 4, row sums 3x with var 9.
        // alpha = 2 * (1 - 5/9) = 8/9.
        let mut t = Table::new();
        t.insert("EE1", num_col(&[1.0, 2.0, 3.0]));
        t.insert("EE2", num_col(&[2.0, 4.0, 6.0]));
        let rows = reliability_table(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].scale, "Emotional Exhaustion");
        assert_eq!(rows[0].items, 2);
        let alpha = rows[0].alpha.unwrap();
        assert!((alpha - 8.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn zero_row_sum_variance_is_not_computable() {
        // Identical row sums in every row: alpha is undefined.
        let mut t = Table::new();
        t.insert("DP1", num_col(&[3.0, 3.0, 3.0]));
        t.insert("DP2", num_col(&[3.0, 3.0, 3.0]));
        let rows = reliability_table(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].alpha, None);
    }

    #[test]
    fn single_item_scales_are_omitted() {
        let mut t = Table::new();
        t.insert("PA1", num_col(&[1.0, 2.0]));
        t.insert("EE1", num_col(&[1.0, 2.0]));
        t.insert("EE2", num_col(&[2.0, 1.0]));
        let rows = reliability_table(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].prefix, "EE");
    }

    #[test]
    fn centered_and_aggregate_columns_are_not_items() {
        let mut t = Table::new();
        t.insert("WKL1", num_col(&[1.0, 2.0, 4.0]));
        t.insert("WKL2", num_col(&[2.0, 3.0, 5.0]));
        t.insert("WKL", num_col(&[1.5, 2.5, 4.5]));
        t.insert("WKL_c", num_col(&[-1.3, -0.3, 1.7]));
        let rows = reliability_table(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].items, 2);
    }

    #[test]
    fn complete_case_rows_only() {
        // The middle row is dropped; remaining rows still yield alpha.
        let mut t = Table::new();
        t.insert(
            "AUT1",
            vec![Cell::Num(1.0), Cell::Empty, Cell::Num(3.0), Cell::Num(2.0)],
        );
        t.insert(
            "AUT2",
            vec![Cell::Num(2.0), Cell::Num(9.0), Cell::Num(5.0), Cell::Num(4.0)],
        );
        let rows = reliability_table(&t);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].alpha.is_some());
    }

    #[test]
    fn no_complete_rows_is_not_computable() {
        let mut t = Table::new();
        t.insert("NEU1", vec![Cell::Num(1.0), Cell::Empty]);
        t.insert("NEU2", vec![Cell::Empty, Cell::Num(2.0)]);
        let rows = reliability_table(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].alpha, None);
    }
}
