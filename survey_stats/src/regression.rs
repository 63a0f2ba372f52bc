//! Moderated OLS regression and its binning-based companion view.
//!
//! The model is dependent ~ predictor * moderator plus whichever
//! fixed controls the table carries. The fit runs on complete cases
//! only; the prediction grid holds controls at representative values
//! and sweeps the predictor across its observed range at three
//! moderator levels.

use log::debug;

use crate::config::{
    BinnedView, ModerationGroup, ModeratorLevel, PredictedPoint, RegressionResult, RegressionSpec,
    StatsError, REGRESSION_CONTROLS,
};
use crate::table::{binary_mode, mean, quantile, sample_std, Table};

/// Number of predictor points per moderator level.
const GRID_POINTS: usize = 100;

/// Positional labels for the binned moderation groups.
const BIN_LABELS: [&str; 3] = ["Low", "Medium", "High"];

fn numeric_or_missing(table: &Table, name: &str) -> Result<Vec<Option<f64>>, StatsError> {
    table
        .numeric(name)
        .ok_or_else(|| StatsError::MissingColumn(name.to_string()))
}

/// Fits the moderated model and builds the prediction grid.
///
/// Controls are the members of [REGRESSION_CONTROLS] that exist in the
/// table and are not the moderator itself. Rows missing any model
/// variable are excluded from the fit. Fitting failures (singular
/// design, too few rows) are reported as errors, never panics.
pub fn fit_moderated(
    table: &Table,
    spec: &RegressionSpec,
) -> Result<RegressionResult, StatsError> {
    let dependent = numeric_or_missing(table, &spec.dependent)?;
    let predictor = numeric_or_missing(table, &spec.predictor)?;
    let moderator = numeric_or_missing(table, &spec.moderator)?;

    let controls: Vec<String> = REGRESSION_CONTROLS
        .iter()
        .filter(|c| **c != spec.moderator && table.has_column(c))
        .map(|c| c.to_string())
        .collect();
    let control_views: Vec<Vec<Option<f64>>> = controls
        .iter()
        .map(|c| numeric_or_missing(table, c))
        .collect::<Result<_, _>>()?;

    // Assemble the complete-case design matrix:
    // intercept, predictor, moderator, interaction, controls.
    let n_params = 4 + controls.len();
    let mut design: Vec<Vec<f64>> = Vec::new();
    let mut response: Vec<f64> = Vec::new();
    for row in 0..table.nrows() {
        let (y, x, m) = match (dependent[row], predictor[row], moderator[row]) {
            (Some(y), Some(x), Some(m)) => (y, x, m),
            _ => continue,
        };
        let mut r = vec![1.0, x, m, x * m];
        let mut complete = true;
        for view in control_views.iter() {
            match view[row] {
                Some(v) => r.push(v),
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            design.push(r);
            response.push(y);
        }
    }
    debug!(
        "fit_moderated: {} complete rows, {} parameters, controls {:?}",
        design.len(),
        n_params,
        controls
    );
    if design.len() < n_params {
        return Err(StatsError::NotEnoughData(format!(
            "{} complete rows for {} parameters",
            design.len(),
            n_params
        )));
    }

    let beta = ols_solve(&design, &response)?;

    let mut names = vec![
        "Intercept".to_string(),
        spec.predictor.clone(),
        spec.moderator.clone(),
        format!("{}:{}", spec.predictor, spec.moderator),
    ];
    names.extend(controls.iter().cloned());

    // Representative moderator levels over all non-missing moderator
    // values of the table (not only the complete cases).
    let mod_values: Vec<f64> = moderator.iter().flatten().copied().collect();
    let mod_mean = mod_values.iter().sum::<f64>() / mod_values.len() as f64;
    let mod_sd = sample_std(&mod_values).unwrap_or(0.0);

    // Predictor grid spanning [min, max] of the non-missing values.
    let pred_values: Vec<f64> = predictor.iter().flatten().copied().collect();
    let x_min = pred_values.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = pred_values
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    // Controls held constant: sample mean, except the binary
    // Gender_num held at its mode (0.5 when the column has no data).
    let fixed: Vec<f64> = controls
        .iter()
        .zip(control_views.iter())
        .map(|(name, view)| {
            if name == "Gender_num" {
                binary_mode(view).unwrap_or(0.5)
            } else {
                mean(view).unwrap_or(0.0)
            }
        })
        .collect();

    let mut grid: Vec<PredictedPoint> = Vec::with_capacity(3 * GRID_POINTS);
    for level in ModeratorLevel::ALL {
        let m = match level {
            ModeratorLevel::Low => mod_mean - mod_sd,
            ModeratorLevel::Mean => mod_mean,
            ModeratorLevel::High => mod_mean + mod_sd,
        };
        for step in 0..GRID_POINTS {
            let x = x_min + (x_max - x_min) * step as f64 / (GRID_POINTS - 1) as f64;
            let mut predicted = beta[0] + beta[1] * x + beta[2] * m + beta[3] * x * m;
            for (c, value) in fixed.iter().enumerate() {
                predicted += beta[4 + c] * value;
            }
            grid.push(PredictedPoint {
                x,
                level,
                predicted,
            });
        }
    }

    Ok(RegressionResult {
        coefficients: names.into_iter().zip(beta).collect(),
        complete_rows: design.len(),
        grid,
    })
}

/// Ordinary least squares through the normal equations, solved by
/// Cholesky decomposition. A non-positive-definite X'X (collinear or
/// degenerate design) is reported as a singular fit.
fn ols_solve(design: &[Vec<f64>], response: &[f64]) -> Result<Vec<f64>, StatsError> {
    let p = design[0].len();
    let mut xtx = vec![vec![0.0f64; p]; p];
    for row in design {
        for j in 0..p {
            for k in j..p {
                xtx[j][k] += row[j] * row[k];
            }
        }
    }
    for j in 0..p {
        for k in (j + 1)..p {
            xtx[k][j] = xtx[j][k];
        }
    }
    let mut xty = vec![0.0f64; p];
    for (row, y) in design.iter().zip(response.iter()) {
        for j in 0..p {
            xty[j] += row[j] * y;
        }
    }
    let l = cholesky(&xtx)
        .ok_or_else(|| StatsError::SingularFit("design matrix is not full rank".to_string()))?;
    Ok(cholesky_solve(&l, &xty))
}

/// Lower-triangular Cholesky factor of a symmetric matrix, or `None`
/// when the matrix is not positive definite.
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 1e-12 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solves L L' x = b by forward then backward substitution.
fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = l.len();
    let mut y = vec![0.0f64; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i][k] * y[k];
        }
        y[i] = sum / l[i][i];
    }
    let mut x = vec![0.0f64; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[k][i] * x[k];
        }
        x[i] = sum / l[i][i];
    }
    x
}

/// Tertile split of the moderator with pandas-style duplicate
/// cut-point dropping. Falls back to a raw predictor/dependent scatter
/// when the cut collapses to a single bin; errors only when the
/// moderator has fewer than 2 distinct non-missing values.
pub fn binned_moderation(
    table: &Table,
    spec: &RegressionSpec,
) -> Result<BinnedView, StatsError> {
    let dependent = numeric_or_missing(table, &spec.dependent)?;
    let predictor = numeric_or_missing(table, &spec.predictor)?;
    let moderator = numeric_or_missing(table, &spec.moderator)?;

    let mut values: Vec<f64> = moderator.iter().flatten().copied().collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mut distinct = values.clone();
    distinct.dedup();
    if distinct.len() < 2 {
        return Err(StatsError::NotEnoughData(format!(
            "moderator {} has fewer than 2 distinct values",
            spec.moderator
        )));
    }

    // Quantile edges at 0, 1/3, 2/3, 1 with duplicates dropped.
    let mut edges: Vec<f64> = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]
        .iter()
        .filter_map(|q| quantile(&values, *q))
        .collect();
    edges.dedup();
    let n_bins = edges.len() - 1;
    if n_bins < 2 {
        debug!(
            "binned_moderation: cut collapsed for {}, falling back to scatter",
            spec.moderator
        );
        return Ok(BinnedView::Scatter(scatter_points(&predictor, &dependent)));
    }

    // Assign rows to right-closed bins; the lowest edge is inclusive.
    let mut assigned: Vec<Option<usize>> = Vec::with_capacity(moderator.len());
    for v in moderator.iter() {
        let bin = v.map(|value| {
            let mut b = n_bins - 1;
            for idx in 0..n_bins {
                if value <= edges[idx + 1] {
                    b = idx;
                    break;
                }
            }
            b
        });
        assigned.push(bin);
    }
    let mut occupied: Vec<usize> = assigned.iter().flatten().copied().collect();
    occupied.sort_unstable();
    occupied.dedup();
    if occupied.len() < 2 {
        return Ok(BinnedView::Scatter(scatter_points(&predictor, &dependent)));
    }

    let mut groups: Vec<ModerationGroup> = Vec::new();
    for (pos, bin) in occupied.iter().enumerate() {
        let mut points: Vec<(f64, f64)> = Vec::new();
        for row in 0..assigned.len() {
            if assigned[row] != Some(*bin) {
                continue;
            }
            if let (Some(x), Some(y)) = (predictor[row], dependent[row]) {
                points.push((x, y));
            }
        }
        groups.push(ModerationGroup {
            label: BIN_LABELS[pos.min(BIN_LABELS.len() - 1)].to_string(),
            points,
        });
    }
    Ok(BinnedView::Grouped(groups))
}

fn scatter_points(predictor: &[Option<f64>], dependent: &[Option<f64>]) -> Vec<(f64, f64)> {
    predictor
        .iter()
        .zip(dependent.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some((*x, *y)),
            _ => None,
        })
        .collect()
}
