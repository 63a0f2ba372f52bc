use log::{debug, info, warn};

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use snafu::{prelude::*, Snafu};

use calamine::{open_workbook, Reader, Xlsx};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use survey_stats::*;

use crate::args::Args;
use crate::session::config_reader::*;

pub mod config_reader;
pub mod io_csv;
pub mod io_excel;

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("No survey file found at {path}: the session needs a dataset to run"))]
    MissingDataset { path: String },
    #[snafu(display("Error reading file {path}"))]
    ReadingDataset {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening workbook {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No usable worksheet in {path}"))]
    EmptyWorkbook { path: String },
    #[snafu(display(""))]
    CsvOpen { source: csv::Error },
    #[snafu(display(""))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Analysis tables keyed by source path, fingerprinted by the sha256
/// digest of the file bytes. A re-load after the file changed on disk
/// replaces the entry; an unchanged file is served from memory.
pub struct DatasetCache {
    entries: HashMap<String, (String, Arc<Table>)>,
}

impl Default for DatasetCache {
    fn default() -> Self {
        DatasetCache::new()
    }
}

impl DatasetCache {
    pub fn new() -> DatasetCache {
        DatasetCache {
            entries: HashMap::new(),
        }
    }

    pub fn load(&mut self, source: &DataSource) -> SessionResult<Arc<Table>> {
        let path = source.file_path.clone();
        if !Path::new(path.as_str()).is_file() {
            return MissingDatasetSnafu { path }.fail();
        }
        let bytes = fs::read(path.as_str()).context(ReadingDatasetSnafu { path: path.clone() })?;
        let fingerprint = sha256::digest(bytes.as_slice());
        if let Some((cached_fp, table)) = self.entries.get(&path) {
            if *cached_fp == fingerprint {
                debug!("DatasetCache: hit for {path}");
                return Ok(table.clone());
            }
            info!("DatasetCache: {path} changed on disk, reloading");
        }
        let raw = read_raw_table(source)?;
        info!(
            "DatasetCache: read {} rows x {} columns from {path}",
            raw.nrows(),
            raw.ncols()
        );
        let table = Arc::new(build_analysis_table(raw));
        self.entries
            .insert(path, (fingerprint, table.clone()));
        Ok(table)
    }
}

fn read_raw_table(source: &DataSource) -> SessionResult<Table> {
    let path = source.file_path.clone();
    let provider = match source.provider.clone() {
        Some(p) => p,
        None => match Path::new(path.as_str())
            .extension()
            .and_then(|e| e.to_str())
        {
            Some("xlsx") => "excel".to_string(),
            _ => "csv".to_string(),
        },
    };
    match provider.as_str() {
        "excel" | "xlsx" => io_excel::read_excel_table(path, source.excel_worksheet_name.clone()),
        "csv" => io_csv::read_csv_table(path),
        x => whatever!("Unknown input type {:?}", x),
    }
}

fn reliability_to_json(rows: &[ReliabilityRow]) -> Vec<JSValue> {
    rows.iter()
        .map(|r| {
            json!({
                "scale": r.scale,
                "prefix": r.prefix,
                "items": r.items,
                "alpha": r.alpha,
            })
        })
        .collect()
}

fn descriptives_to_json(rows: &[ColumnSummary]) -> Vec<JSValue> {
    rows.iter()
        .map(|s| {
            json!({
                "column": s.name,
                "count": s.count,
                "mean": s.mean,
                "std": s.std,
                "min": s.min,
                "q25": s.q25,
                "median": s.median,
                "q75": s.q75,
                "max": s.max,
            })
        })
        .collect()
}

fn correlations_to_json(matrix: &Option<CorrelationMatrix>) -> JSValue {
    match matrix {
        None => JSValue::Null,
        Some(m) => json!({
            "columns": m.names,
            "values": m.values,
        }),
    }
}

fn model_to_json(result: &Result<RegressionResult, StatsError>) -> JSValue {
    match result {
        Err(e) => json!({ "error": e.to_string() }),
        Result::Ok(r) => {
            let coefficients: Vec<JSValue> = r
                .coefficients
                .iter()
                .map(|(name, value)| json!({"name": name, "value": value}))
                .collect();
            let curves: Vec<JSValue> = r
                .grid
                .iter()
                .map(|p| json!({"x": p.x, "level": p.level.label(), "predicted": p.predicted}))
                .collect();
            json!({
                "completeRows": r.complete_rows,
                "coefficients": coefficients,
                "curves": curves,
            })
        }
    }
}

fn binned_to_json(view: &Result<BinnedView, StatsError>) -> JSValue {
    match view {
        Err(e) => json!({ "error": e.to_string() }),
        Result::Ok(BinnedView::Scatter(points)) => json!({
            "kind": "scatter",
            "points": points,
        }),
        Result::Ok(BinnedView::Grouped(groups)) => {
            let groups_js: Vec<JSValue> = groups
                .iter()
                .map(|g| json!({"label": g.label, "points": g.points}))
                .collect();
            json!({
                "kind": "grouped",
                "groups": groups_js,
            })
        }
    }
}

fn moderation_to_json(table: &Table, specs: &[RegressionSpec]) -> Vec<JSValue> {
    let mut out: Vec<JSValue> = Vec::new();
    for spec in specs {
        debug!("moderation_to_json: running {:?}", spec);
        let model = fit_moderated(table, spec);
        if let Err(e) = &model {
            warn!("Moderation model for {} failed: {}", spec.moderator, e);
        }
        let binned = binned_moderation(table, spec);
        out.push(json!({
            "dependent": spec.dependent,
            "predictor": spec.predictor,
            "moderator": spec.moderator,
            "model": model_to_json(&model),
            "binnedView": binned_to_json(&binned),
        }));
    }
    out
}

/// Assembles the whole summary for one dataset.
pub fn build_summary(config: &AnalysisConfig, table: &Table) -> JSValue {
    let risk = burnout_risk(table);
    json!({
        "config": {
            "dataset": config.output_settings.dataset_name,
        },
        "shape": {
            "rows": table.nrows(),
            "columns": table.ncols(),
        },
        "reliability": reliability_to_json(&reliability_table(table)),
        "descriptives": descriptives_to_json(&describe(table)),
        "burnoutRisk": {
            "highEmotionalExhaustionPct": risk.high_ee_pct,
            "highDepersonalizationPct": risk.high_dp_pct,
            "lowPersonalAccomplishmentPct": risk.low_pa_pct,
        },
        "correlations": correlations_to_json(&correlation_matrix(table)),
        "moderation": moderation_to_json(table, &config.regression_specs()),
    })
}

/// Folds the command line flags into the (optional) JSON config.
fn effective_config(args: &Args) -> SessionResult<AnalysisConfig> {
    let mut config = match args.config.clone() {
        Some(path) => read_config(path.as_str())?,
        None => {
            let input = match args.input.clone() {
                Some(p) => p,
                None => whatever!("No input found: use --config or --input"),
            };
            AnalysisConfig {
                output_settings: OutputSettings {
                    dataset_name: dataset_name_from_path(input.as_str()),
                    output_directory: None,
                },
                data_source: DataSource {
                    provider: None,
                    file_path: input,
                    excel_worksheet_name: None,
                },
                moderation: None,
            }
        }
    };
    if let Some(input) = args.input.clone() {
        config.data_source.file_path = input;
    }
    if let Some(input_type) = args.input_type.clone() {
        config.data_source.provider = Some(input_type);
    }
    if let Some(name) = args.excel_worksheet_name.clone() {
        config.data_source.excel_worksheet_name = Some(name);
    }
    Ok(config)
}

fn dataset_name_from_path(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn run_analysis(args: &Args) -> SessionResult<()> {
    let config = effective_config(args)?;
    info!("config: {:?}", config);

    let mut cache = DatasetCache::new();
    let table = cache.load(&config.data_source)?;

    let summary = build_summary(&config, &table);
    let pretty_js_stats = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;

    match args.out.clone() {
        None => println!("stats:{}", pretty_js_stats),
        Some(out) if out == "stdout" => println!("stats:{}", pretty_js_stats),
        Some(out) => {
            fs::write(out.clone(), pretty_js_stats.as_str())
                .context(WritingSummarySnafu { path: out })?;
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = args.reference.clone() {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}
