// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The suffix appended to mean-centered variants of a column.
pub const CENTER_SUFFIX: &str = "_c";

/// The scale prefixes recognized by the aggregation pipeline, in
/// processing order. Every column whose name starts with one of these
/// (case-insensitively, and is not the prefix itself) is treated as an
/// item of that scale.
pub const SCALE_PREFIXES: [&str; 12] = [
    "ADT", "EXT", "AGR", "CST", "NEU", "OPE", "EE", "DP", "PA", "AUT", "WKL", "POS",
];

/// Human-readable construct names for the reliability report, paired
/// with their scale prefix. Same order as [SCALE_PREFIXES].
pub const SCALE_NAMES: [(&str, &str); 12] = [
    ("Adaptability", "ADT"),
    ("Extraversion", "EXT"),
    ("Agreeableness", "AGR"),
    ("Conscientiousness", "CST"),
    ("Neuroticism", "NEU"),
    ("Openness", "OPE"),
    ("Emotional Exhaustion", "EE"),
    ("Depersonalisation", "DP"),
    ("Personal Accomplishment", "PA"),
    ("Autonomy", "AUT"),
    ("Workload", "WKL"),
    ("Perceived Organizational Support", "POS"),
];

/// Demographic fields that receive a centered variant after encoding,
/// in the order they are centered (after the scale aggregates).
pub const CENTERED_FIELDS: [&str; 4] = [
    "HoursPerWeek",
    "ExperienceYears",
    "WorkExperienceYears",
    "Age",
];

/// Control variables offered to the moderated regression. A control is
/// included when the column exists and is not the moderator itself.
pub const REGRESSION_CONTROLS: [&str; 3] = ["Age_c", "WorkExperienceYears_c", "Gender_num"];

// ******** Output data structures *********

/// One row of the reliability report.
///
/// `alpha` is `None` when the statistic is not computable for this
/// scale (no complete rows, or zero variance in the row sums).
#[derive(PartialEq, Debug, Clone)]
pub struct ReliabilityRow {
    pub scale: String,
    pub prefix: String,
    pub items: usize,
    pub alpha: Option<f64>,
}

/// A moderated regression request: dependent ~ predictor * moderator,
/// plus whichever of [REGRESSION_CONTROLS] the table carries.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegressionSpec {
    pub dependent: String,
    pub predictor: String,
    pub moderator: String,
}

/// The representative moderator levels used for prediction curves.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ModeratorLevel {
    /// mean - 1 standard deviation
    Low,
    /// mean
    Mean,
    /// mean + 1 standard deviation
    High,
}

impl ModeratorLevel {
    pub const ALL: [ModeratorLevel; 3] = [
        ModeratorLevel::Low,
        ModeratorLevel::Mean,
        ModeratorLevel::High,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ModeratorLevel::Low => "Low",
            ModeratorLevel::Mean => "Mean",
            ModeratorLevel::High => "High",
        }
    }
}

/// One point of a prediction curve.
#[derive(PartialEq, Debug, Clone)]
pub struct PredictedPoint {
    pub x: f64,
    pub level: ModeratorLevel,
    pub predicted: f64,
}

/// A fitted moderated regression together with its prediction grid.
///
/// The coefficients are named (intercept, predictor, moderator,
/// interaction, controls) but callers should treat them as opaque; the
/// grid is the intended consumption surface.
#[derive(PartialEq, Debug, Clone)]
pub struct RegressionResult {
    pub coefficients: Vec<(String, f64)>,
    /// Number of complete-case rows used for the fit.
    pub complete_rows: usize,
    /// 100 points per moderator level, 300 in total.
    pub grid: Vec<PredictedPoint>,
}

/// One group of the binned moderation view.
#[derive(PartialEq, Debug, Clone)]
pub struct ModerationGroup {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// The binning-based companion to the full regression model.
///
/// When the tertile split collapses to a single bin, the view degrades
/// to a raw predictor/dependent scatter instead of failing.
#[derive(PartialEq, Debug, Clone)]
pub enum BinnedView {
    Grouped(Vec<ModerationGroup>),
    Scatter(Vec<(f64, f64)>),
}

/// Errors that prevent a statistic from being computed.
///
/// These stay local to the requesting component: a failed regression
/// or a degenerate moderator is reported, never propagated as a crash.
#[derive(PartialEq, Debug, Clone)]
pub enum StatsError {
    /// A model variable is absent from the table.
    MissingColumn(String),
    /// Not enough usable observations (fewer complete rows than
    /// parameters, or fewer than 2 distinct moderator values).
    NotEnoughData(String),
    /// The design matrix is singular; the fit has no unique solution.
    SingularFit(String),
}

impl Error for StatsError {}

impl Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::MissingColumn(c) => write!(f, "column not found in table: {}", c),
            StatsError::NotEnoughData(m) => write!(f, "not enough data: {}", m),
            StatsError::SingularFit(m) => write!(f, "singular model fit: {}", m),
        }
    }
}
