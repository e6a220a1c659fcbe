//! Forecast normalization and cap-constrained weight redistribution.
//!
//! Satellite utilities for turning a signed forecast vector into target
//! weights and for redistributing weight mass that exceeds a per-asset cap.
//! The redistribution is a small quadratic program (closest vector in
//! squared deviation with the total preserved and every element within
//! `[0, max_weight]`) and is isolated behind a private helper so the
//! engine's core loop never touches the solver.

use crate::error::{Result, SimError};

/// Normalize a signed forecast so absolute weights sum to 1.
///
/// Signs are preserved; an all-zero forecast maps to all zeros.
pub fn to_weights(forecast: &[f64]) -> Vec<f64> {
    let abs_sum: f64 = forecast.iter().map(|x| x.abs()).sum();
    if abs_sum == 0.0 {
        return vec![0.0; forecast.len()];
    }
    forecast.iter().map(|x| x / abs_sum).collect()
}

/// Redistribute nonnegative weights under a maximum-weight cap.
///
/// Input weights must be nonnegative and finite. The output preserves the
/// input sum, keeps every element within `[0, max_weight]`, and minimizes
/// the squared deviation from the input, so excess mass flows toward the
/// elements closest to absorbing it.
pub fn distribute(weights: &[f64], max_weight: f64) -> Result<Vec<f64>> {
    if weights.is_empty() {
        return Err(SimError::EmptyInput("weights must be non-empty".to_string()));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(SimError::InvalidInput(
            "weights must be finite and non-negative".to_string(),
        ));
    }
    if max_weight <= 0.0 {
        return Err(SimError::InvalidInput(
            "max_weight must be positive".to_string(),
        ));
    }

    let total: f64 = weights.iter().sum();
    if max_weight * weights.len() as f64 + 1e-9 < total {
        return Err(SimError::OptimizationError(format!(
            "cap {:.4} x {} assets cannot hold total weight {:.4}",
            max_weight,
            weights.len(),
            total
        )));
    }

    // Already feasible: the closest vector is the input itself.
    if weights.iter().all(|w| *w <= max_weight) {
        return Ok(weights.to_vec());
    }

    minimize_l2_with_caps(weights, max_weight, total)
}

/// Redistribute long and short weights under a cap on absolute weight.
///
/// Applies [`distribute`] to the absolute values and re-applies the input
/// signs. The absolute sum of the input should equal 1.
pub fn distribute_longshort(weights: &[f64], max_weight: f64) -> Result<Vec<f64>> {
    let abs_weights: Vec<f64> = weights.iter().map(|w| w.abs()).collect();
    let capped = distribute(&abs_weights, max_weight)?;
    Ok(capped
        .iter()
        .zip(weights.iter())
        .map(|(c, w)| c.copysign(*w))
        .collect())
}

/// Solve `min ||x - target||^2` s.t. `sum(x) = total`, `0 <= x <= cap`.
///
/// The narrow seam around the QP solver: callers never see clarabel types.
fn minimize_l2_with_caps(target: &[f64], cap: f64, total: f64) -> Result<Vec<f64>> {
    use clarabel::algebra::*;
    use clarabel::solver::*;

    let n = target.len();

    // P = identity, q = -target: minimizes 1/2 x'x - target'x, which shares
    // its minimizer with ||x - target||^2.
    let p = CscMatrix::new(
        n,
        n,
        (0..=n).collect(),
        (0..n).collect(),
        vec![1.0; n],
    );
    let q: Vec<f64> = target.iter().map(|t| -t).collect();

    // Constraint rows: [sum(x) = total; -x <= 0; x <= cap], built in CSC
    // column order.
    let mut a_data = Vec::with_capacity(3 * n);
    let mut a_indices = Vec::with_capacity(3 * n);
    let mut a_indptr = vec![0];
    for j in 0..n {
        a_data.push(1.0);
        a_indices.push(0);

        a_data.push(-1.0);
        a_indices.push(1 + j);

        a_data.push(1.0);
        a_indices.push(1 + n + j);

        a_indptr.push(a_data.len());
    }
    let a = CscMatrix::new(1 + 2 * n, n, a_indptr, a_indices, a_data);

    let mut b = vec![total];
    b.extend(vec![0.0; n]);
    b.extend(vec![cap; n]);

    let cones = [ZeroConeT(1), NonnegativeConeT(2 * n)];

    let settings = DefaultSettingsBuilder::default()
        .max_iter(200)
        .verbose(false)
        .build()
        .map_err(|e| SimError::OptimizationError(format!("Failed to build settings: {}", e)))?;

    let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings)
        .map_err(|e| SimError::OptimizationError(format!("Failed to create solver: {:?}", e)))?;

    solver.solve();

    if !matches!(solver.solution.status, SolverStatus::Solved) {
        return Err(SimError::OptimizationError(format!(
            "Redistribution failed with status: {:?}",
            solver.solution.status
        )));
    }

    // Clamp residual numerical drift back into the box.
    Ok(solver
        .solution
        .x
        .iter()
        .map(|&x| x.clamp(0.0, cap))
        .collect())
}
