//! Descriptive summaries: per-column statistics, burnout risk shares
//! and the correlation matrix over the priority columns.

use crate::config::SCALE_PREFIXES;
use crate::table::{mean, quantile, sample_std, Table};

/// Eight-number summary of a numeric column, in the usual
/// count / mean / std / quartiles order.
#[derive(PartialEq, Debug, Clone)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Share of respondents beyond one standard deviation of the burnout
/// subscales, as percentages of all rows. A missing subscale column
/// leaves its share unset.
#[derive(PartialEq, Debug, Clone)]
pub struct BurnoutRisk {
    pub high_ee_pct: Option<f64>,
    pub high_dp_pct: Option<f64>,
    pub low_pa_pct: Option<f64>,
}

/// Pairwise-complete Pearson correlations over the priority columns
/// that exist in the table, row-major, `values[i][j]` for
/// (`names[i]`, `names[j]`).
#[derive(PartialEq, Debug, Clone)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

/// Summarizes every numeric column of the table, in column order.
pub fn describe(table: &Table) -> Vec<ColumnSummary> {
    let mut out = Vec::new();
    for col in table.columns() {
        if !col.is_numeric() {
            continue;
        }
        let view: Vec<Option<f64>> = col.cells.iter().map(|c| c.as_num()).collect();
        let mut present: Vec<f64> = view.iter().flatten().copied().collect();
        present.sort_by(|a, b| a.partial_cmp(b).unwrap());
        out.push(ColumnSummary {
            name: col.name.clone(),
            count: present.len(),
            mean: mean(&view),
            std: sample_std(&present),
            min: present.first().copied(),
            q25: quantile(&present, 0.25),
            median: quantile(&present, 0.5),
            q75: quantile(&present, 0.75),
            max: present.last().copied(),
        });
    }
    out
}

/// Percentage of all rows whose value lies beyond the threshold. The
/// threshold is mean + sd for `high`, mean - sd for low.
fn risk_share(table: &Table, name: &str, high: bool) -> Option<f64> {
    let view = table.numeric(name)?;
    let present: Vec<f64> = view.iter().flatten().copied().collect();
    let m = mean(&view)?;
    let sd = sample_std(&present)?;
    let beyond = present
        .iter()
        .filter(|v| if high { **v > m + sd } else { **v < m - sd })
        .count();
    Some(beyond as f64 / table.nrows() as f64 * 100.0)
}

pub fn burnout_risk(table: &Table) -> BurnoutRisk {
    BurnoutRisk {
        high_ee_pct: risk_share(table, "EE", true),
        high_dp_pct: risk_share(table, "DP", true),
        low_pa_pct: risk_share(table, "PA", false),
    }
}

/// The columns the correlation matrix covers, in display order: the
/// aggregated scales followed by the encoded demographics.
fn priority_columns(table: &Table) -> Vec<String> {
    SCALE_PREFIXES
        .iter()
        .chain(["HoursPerWeek", "ExperienceYears", "Age", "Gender_num"].iter())
        .filter(|name| table.has_column(name))
        .map(|name| name.to_string())
        .collect()
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some((*x, *y)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in pairs.iter() {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Correlation matrix over the priority columns present in the table,
/// or `None` when fewer than two of them exist.
pub fn correlation_matrix(table: &Table) -> Option<CorrelationMatrix> {
    let names = priority_columns(table);
    if names.len() < 2 {
        return None;
    }
    let views: Vec<Vec<Option<f64>>> = names
        .iter()
        .map(|name| table.numeric(name).unwrap_or_default())
        .collect();
    let mut values = vec![vec![None; names.len()]; names.len()];
    for i in 0..names.len() {
        for j in i..names.len() {
            let r = pearson(&views[i], &views[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    Some(CorrelationMatrix { names, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn num_col(values: &[f64]) -> Vec<Cell> {
        values.iter().map(|v| Cell::Num(*v)).collect()
    }

    #[test]
    fn describe_matches_quartiles() {
        let mut t = Table::new();
        t.insert("Age", num_col(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        t.insert(
            "Note",
            vec![Cell::Text("a".to_string()); 5],
        );
        let rows = describe(&t);
        assert_eq!(rows.len(), 1);
        let s = &rows[0];
        assert_eq!(s.name, "Age");
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, Some(3.0));
        assert_eq!(s.min, Some(1.0));
        assert_eq!(s.q25, Some(2.0));
        assert_eq!(s.median, Some(3.0));
        assert_eq!(s.q75, Some(4.0));
        assert_eq!(s.max, Some(5.0));
        let std = s.std.unwrap();
        assert!((std - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn describe_treats_nan_text_as_missing() {
        let mut t = Table::new();
        t.insert(
            "EE",
            vec![
                Cell::Num(2.0),
                Cell::Text("NaN".to_string()),
                Cell::Num(4.0),
            ],
        );
        let rows = describe(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].mean, Some(3.0));
        assert_eq!(rows[0].max, Some(4.0));
    }

    #[test]
    fn describe_skips_missing_cells() {
        let mut t = Table::new();
        t.insert(
            "EE",
            vec![Cell::Num(2.0), Cell::Empty, Cell::Num(4.0)],
        );
        let rows = describe(&t);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].mean, Some(3.0));
    }

    #[test]
    fn burnout_shares_use_all_rows_as_denominator() {
        let mut t = Table::new();
        // mean 3, sd sqrt(8); only 8.0 exceeds mean + sd.
        t.insert("EE", num_col(&[1.0, 2.0, 2.0, 2.0, 8.0]));
        let risk = burnout_risk(&t);
        assert_eq!(risk.high_ee_pct, Some(20.0));
        assert_eq!(risk.high_dp_pct, None);
        assert_eq!(risk.low_pa_pct, None);
    }

    #[test]
    fn low_pa_counts_below_threshold() {
        let mut t = Table::new();
        t.insert("PA", num_col(&[1.0, 5.0, 5.0, 5.0, 5.0]));
        let risk = burnout_risk(&t);
        assert_eq!(risk.low_pa_pct, Some(20.0));
    }

    #[test]
    fn correlations_are_symmetric_and_signed() {
        let mut t = Table::new();
        t.insert("EE", num_col(&[1.0, 2.0, 3.0, 4.0]));
        t.insert("WKL", num_col(&[2.0, 4.0, 6.0, 8.0]));
        t.insert("AUT", num_col(&[4.0, 3.0, 2.0, 1.0]));
        let m = correlation_matrix(&t).unwrap();
        assert_eq!(m.names, vec!["EE", "AUT", "WKL"]);
        let i_ee = 0;
        let i_aut = 1;
        let i_wkl = 2;
        assert!((m.values[i_ee][i_ee].unwrap() - 1.0).abs() < 1e-12);
        assert!((m.values[i_ee][i_wkl].unwrap() - 1.0).abs() < 1e-12);
        assert!((m.values[i_ee][i_aut].unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(m.values[i_ee][i_aut], m.values[i_aut][i_ee]);
    }

    #[test]
    fn pairwise_complete_correlation() {
        let mut t = Table::new();
        t.insert(
            "EE",
            vec![Cell::Num(1.0), Cell::Empty, Cell::Num(3.0), Cell::Num(4.0)],
        );
        t.insert("WKL", num_col(&[1.0, 99.0, 3.0, 4.0]));
        let m = correlation_matrix(&t).unwrap();
        let i_ee = m.names.iter().position(|n| n == "EE").unwrap();
        let i_wkl = m.names.iter().position(|n| n == "WKL").unwrap();
        assert!((m.values[i_ee][i_wkl].unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fewer_than_two_priority_columns_is_none() {
        let mut t = Table::new();
        t.insert("EE", num_col(&[1.0, 2.0]));
        assert!(correlation_matrix(&t).is_none());
    }
}
