//! The dataset preparation pipeline.
//!
//! Raw tabular input goes through four stages, always in this order:
//! header normalization, demographic field encoding, scale-score
//! aggregation and mean-centering. The output is the analysis-ready
//! table every downstream statistic reads. The pipeline runs as a
//! single function, so centering can never observe a half-built table.

use log::{debug, info};

use crate::config::{CENTERED_FIELDS, CENTER_SUFFIX, SCALE_PREFIXES};
use crate::table::{mean, Cell, Table};

/// Rewrites a raw header into the identifier-safe naming scheme:
/// every maximal run of characters outside `[0-9A-Za-z]` collapses to
/// a single underscore, and leading/trailing underscores are stripped.
/// Headers made of punctuation only normalize to the empty string.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// A demographic field recognized by name and coerced to numeric.
struct FieldRule {
    canonical: &'static str,
    /// A second column holding a copy of the encoded values, used
    /// later as a regression control.
    alias: Option<&'static str>,
    matches: fn(&str) -> bool,
}

fn matches_gender(name: &str) -> bool {
    name.to_lowercase().contains("gender")
}

fn matches_age(name: &str) -> bool {
    name.to_lowercase().starts_with("age")
}

fn matches_hours(name: &str) -> bool {
    name.to_lowercase().contains("hours_per_week")
}

fn matches_experience(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("experience") && lower.contains("year")
}

const FIELD_RULES: [FieldRule; 3] = [
    FieldRule {
        canonical: "Age",
        alias: None,
        matches: matches_age,
    },
    FieldRule {
        canonical: "HoursPerWeek",
        alias: None,
        matches: matches_hours,
    },
    FieldRule {
        canonical: "ExperienceYears",
        alias: Some("WorkExperienceYears"),
        matches: matches_experience,
    },
];

/// Runs the whole preparation pipeline over a raw table.
///
/// Each stage consumes its input and returns a fresh table, so the
/// ordering of the passes is explicit in this one chain and nothing
/// can observe a half-transformed table.
pub fn build_analysis_table(raw: Table) -> Table {
    let table = drop_empty(normalize_columns(raw));
    info!(
        "build_analysis_table: normalized table has {} rows, {} columns",
        table.nrows(),
        table.ncols()
    );
    let table = encode_numeric_fields(encode_gender(table));
    let (table, computed) = aggregate_scales(table);
    center_columns(table, &computed)
}

/// Rebuilds the table under normalized names. Columns that normalize
/// to the empty string are dropped. No uniqueness is enforced: when
/// two raw headers normalize identically, the later column silently
/// replaces the earlier one's data.
fn normalize_columns(raw: Table) -> Table {
    let mut table = Table::new();
    for col in raw.columns() {
        let name = normalize_header(&col.name);
        if name.is_empty() {
            debug!(
                "normalize_columns: dropping column with unusable header {:?}",
                col.name
            );
            continue;
        }
        table.insert(&name, col.cells.clone());
    }
    table
}

/// Drops fully-empty columns, then fully-empty rows; the row index is
/// contiguous afterwards by construction.
fn drop_empty(mut table: Table) -> Table {
    table.retain_columns(|col| col.cells.iter().any(|c| !c.is_empty()));
    table.retain_rows(|cells| cells.iter().any(|c| !c.is_empty()));
    table
}

fn find_column(table: &Table, pred: fn(&str) -> bool) -> Option<String> {
    table.column_names().into_iter().find(|n| pred(n))
}

/// Encodes the first gender-like column into a new numeric column
/// `Gender_num` (male/m -> 1, female/f -> 0). Values that are already
/// numeric pass through; anything else becomes missing. The source
/// column is left untouched.
fn encode_gender(mut table: Table) -> Table {
    let source = match find_column(&table, matches_gender) {
        Some(c) => c,
        None => return table,
    };
    let cells: Vec<Cell> = match table.column(&source) {
        Some(col) => col
            .cells
            .iter()
            .map(|cell| {
                let text = match cell {
                    Cell::Text(s) => s.trim().to_lowercase(),
                    Cell::Num(x) => return Cell::Num(*x),
                    Cell::Empty => return Cell::Empty,
                };
                match text.as_str() {
                    "male" | "m" => Cell::Num(1.0),
                    "female" | "f" => Cell::Num(0.0),
                    other => match other.parse::<f64>() {
                        Ok(x) if !x.is_nan() => Cell::Num(x),
                        _ => Cell::Empty,
                    },
                }
            })
            .collect(),
        None => return table,
    };
    debug!("encode_gender: encoding column {:?} into Gender_num", source);
    table.insert("Gender_num", cells);
    table
}

/// Applies the numeric field rules in order: the first matching column
/// is renamed to its canonical name and coerced to numeric. Each rule
/// is a no-op when nothing matches; rules do not interact.
fn encode_numeric_fields(mut table: Table) -> Table {
    for rule in FIELD_RULES.iter() {
        let source = match find_column(&table, rule.matches) {
            Some(c) => c,
            None => continue,
        };
        debug!(
            "encode_numeric_fields: {:?} -> {:?}",
            source, rule.canonical
        );
        table.rename(&source, rule.canonical);
        table.coerce_numeric(rule.canonical);
        if let Some(alias) = rule.alias {
            if let Some(col) = table.column(rule.canonical) {
                let copy = col.cells.clone();
                table.insert(alias, copy);
            }
        }
    }
    table
}

/// The item columns of a scale: names starting with the prefix
/// case-insensitively, excluding an exact match of the prefix itself.
pub fn scale_items(table: &Table, prefix: &str) -> Vec<String> {
    let upper = prefix.to_uppercase();
    table
        .column_names()
        .into_iter()
        .filter(|n| n.to_uppercase().starts_with(&upper) && n != prefix)
        .collect()
}

/// Computes the per-respondent mean score of every scale with at least
/// one item column. Item columns are coerced to numeric in place; a
/// row with all items missing gets a missing aggregate. Also returns
/// the prefixes that produced an aggregate, in processing order.
fn aggregate_scales(mut table: Table) -> (Table, Vec<String>) {
    let mut computed: Vec<String> = Vec::new();
    for prefix in SCALE_PREFIXES {
        let items = scale_items(&table, prefix);
        if items.is_empty() {
            debug!("aggregate_scales: no items for {}", prefix);
            continue;
        }
        for item in items.iter() {
            table.coerce_numeric(item);
        }
        let views: Vec<Vec<Option<f64>>> =
            items.iter().filter_map(|i| table.numeric(i)).collect();
        let mut agg: Vec<Cell> = Vec::with_capacity(table.nrows());
        for row in 0..table.nrows() {
            let present: Vec<f64> = views.iter().filter_map(|v| v[row]).collect();
            if present.is_empty() {
                agg.push(Cell::Empty);
            } else {
                agg.push(Cell::Num(present.iter().sum::<f64>() / present.len() as f64));
            }
        }
        debug!(
            "aggregate_scales: {} items -> aggregate {}",
            items.len(),
            prefix
        );
        table.insert(prefix, agg);
        computed.push(prefix.to_string());
    }
    (table, computed)
}

/// Appends a mean-centered variant of every computed scale aggregate
/// and every present demographic field. Missing inputs propagate; an
/// all-missing source yields an all-missing centered column.
fn center_columns(mut table: Table, computed: &[String]) -> Table {
    let mut targets: Vec<String> = computed.to_vec();
    targets.extend(CENTERED_FIELDS.iter().map(|s| s.to_string()));
    for name in targets {
        let values = match table.numeric(&name) {
            Some(v) => v,
            None => continue,
        };
        let center = mean(&values);
        let cells: Vec<Cell> = values
            .iter()
            .map(|v| match (v, center) {
                (Some(x), Some(m)) => Cell::Num(x - m),
                _ => Cell::Empty,
            })
            .collect();
        table.insert(&format!("{}{}", name, CENTER_SUFFIX), cells);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_col(values: &[&str]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(v.to_string())
                }
            })
            .collect()
    }

    fn num_col(values: &[f64]) -> Vec<Cell> {
        values.iter().map(|v| Cell::Num(*v)).collect()
    }

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header("  Hours_Per_Week!! "), "Hours_Per_Week");
        assert_eq!(normalize_header("EE1 (tired at work?)"), "EE1_tired_at_work");
        assert_eq!(normalize_header("???"), "");
        assert_eq!(normalize_header(""), "");
        assert_eq!(normalize_header("Age"), "Age");
    }

    #[test]
    fn punctuation_only_headers_are_dropped() {
        let mut raw = Table::new();
        raw.insert("!!!", num_col(&[1.0, 2.0]));
        raw.insert("Keep me", num_col(&[3.0, 4.0]));
        let table = build_analysis_table(raw);
        assert_eq!(table.column_names(), vec!["Keep_me".to_string()]);
    }

    #[test]
    fn duplicate_normalized_headers_second_wins() {
        let mut raw = Table::new();
        raw.insert("score!", num_col(&[1.0]));
        raw.insert("score?", num_col(&[2.0]));
        let table = build_analysis_table(raw);
        assert_eq!(table.numeric("score").unwrap(), vec![Some(2.0)]);
        assert_eq!(table.ncols(), 1);
    }

    #[test]
    fn empty_rows_and_columns_are_dropped() {
        let mut raw = Table::new();
        raw.insert(
            "a",
            vec![Cell::Num(1.0), Cell::Empty, Cell::Num(3.0)],
        );
        raw.insert("b", vec![Cell::Empty, Cell::Empty, Cell::Empty]);
        let table = build_analysis_table(raw);
        assert!(!table.has_column("b"));
        assert_eq!(table.nrows(), 2);
    }

    #[test]
    fn gender_mapping() {
        let mut raw = Table::new();
        raw.insert(
            "Gender",
            text_col(&["Male", "F", "female", "M", "other", "nan"]),
        );
        let table = build_analysis_table(raw);
        assert_eq!(
            table.numeric("Gender_num").unwrap(),
            vec![Some(1.0), Some(0.0), Some(0.0), Some(1.0), None, None]
        );
        // The source column is untouched.
        assert_eq!(
            table.column("Gender").unwrap().cells[0],
            Cell::Text("Male".to_string())
        );
    }

    #[test]
    fn age_is_renamed_and_coerced() {
        let mut raw = Table::new();
        raw.insert("Age (in years)", text_col(&["31", "abc", "45"]));
        let table = build_analysis_table(raw);
        assert!(!table.has_column("Age_in_years"));
        assert_eq!(
            table.numeric("Age").unwrap(),
            vec![Some(31.0), None, Some(45.0)]
        );
    }

    #[test]
    fn experience_gets_work_experience_alias() {
        let mut raw = Table::new();
        raw.insert("Experience in years", text_col(&["3", "10"]));
        raw.insert("Hours per week", text_col(&["38", "40"]));
        let table = build_analysis_table(raw);
        assert_eq!(
            table.numeric("ExperienceYears").unwrap(),
            table.numeric("WorkExperienceYears").unwrap()
        );
        assert_eq!(
            table.numeric("HoursPerWeek").unwrap(),
            vec![Some(38.0), Some(40.0)]
        );
    }

    #[test]
    fn scale_mean_skips_missing_items() {
        let mut raw = Table::new();
        raw.insert("EE1", vec![Cell::Num(4.0), Cell::Empty]);
        raw.insert("EE2", vec![Cell::Empty, Cell::Empty]);
        raw.insert("EE3", vec![Cell::Num(2.0), Cell::Empty]);
        raw.insert("marker", text_col(&["x", "y"]));
        let table = build_analysis_table(raw);
        assert_eq!(
            table.numeric("EE").unwrap(),
            vec![Some(3.0), None]
        );
    }

    #[test]
    fn centered_columns_have_zero_mean() {
        let mut raw = Table::new();
        raw.insert("WKL1", num_col(&[1.0, 2.0, 3.0, 4.0]));
        raw.insert("WKL2", num_col(&[2.0, 3.0, 4.0, 5.0]));
        raw.insert("Age", num_col(&[20.0, 30.0, 40.0, 50.0]));
        let table = build_analysis_table(raw);
        for col in ["WKL_c", "Age_c"] {
            let values = table.numeric(col).unwrap();
            let m = mean(&values).unwrap();
            assert!(m.abs() < 1e-12, "{} mean should be ~0, got {}", col, m);
        }
    }

    #[test]
    fn centering_propagates_missing() {
        let mut raw = Table::new();
        raw.insert("AUT1", vec![Cell::Num(2.0), Cell::Empty, Cell::Num(4.0)]);
        raw.insert("AUT2", vec![Cell::Num(2.0), Cell::Empty, Cell::Num(4.0)]);
        let table = build_analysis_table(raw);
        assert_eq!(
            table.numeric("AUT_c").unwrap(),
            vec![Some(-1.0), None, Some(1.0)]
        );
    }

    #[test]
    fn absent_fields_are_silently_omitted() {
        let mut raw = Table::new();
        raw.insert("unrelated", num_col(&[1.0, 2.0]));
        let table = build_analysis_table(raw);
        for name in ["Gender_num", "Age", "HoursPerWeek", "ExperienceYears", "EE"] {
            assert!(!table.has_column(name), "{} should be absent", name);
        }
    }
}
