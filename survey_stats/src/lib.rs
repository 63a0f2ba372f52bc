//! Statistical core for survey analytics: column normalization and
//! derived-variable construction, Cronbach's alpha reliability,
//! descriptive summaries and moderated OLS regression.
//!
//! The crate works on an in-memory [Table] of named columns. Callers
//! build one with [TableBuilder] from whatever source they read
//! (spreadsheet, CSV), run it through [build_analysis_table] and then
//! ask for the analyses they need:
//!
//! ```
//! use survey_stats::*;
//!
//! let mut builder = TableBuilder::new(vec![
//!     "Gender".to_string(),
//!     "EE1".to_string(),
//!     "EE2".to_string(),
//! ]);
//! builder.add_row(vec![
//!     Cell::Text("Female".to_string()),
//!     Cell::Num(3.0),
//!     Cell::Num(4.0),
//! ]);
//! builder.add_row(vec![
//!     Cell::Text("M".to_string()),
//!     Cell::Num(2.0),
//!     Cell::Num(2.0),
//! ]);
//! let table = build_analysis_table(builder.build());
//! assert!(table.has_column("EE"));
//! assert!(table.has_column("EE_c"));
//! assert!(table.has_column("Gender_num"));
//! ```
//!
//! All analyses treat missing data the same way: a cell that is empty
//! or non-numeric is excluded from the computation it would feed, and
//! never aborts it.

mod builder;
mod config;
mod descriptives;
mod pipeline;
mod regression;
mod reliability;
mod table;

pub use builder::TableBuilder;
pub use config::*;
pub use descriptives::{
    burnout_risk, correlation_matrix, describe, BurnoutRisk, ColumnSummary, CorrelationMatrix,
};
pub use pipeline::{build_analysis_table, normalize_header, scale_items};
pub use regression::{binned_moderation, fit_moderated};
pub use reliability::{cronbach_alpha, reliability_table};
pub use table::{mean, sample_std, Cell, Column, Table};
