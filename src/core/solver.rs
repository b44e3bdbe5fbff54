use serde::Serialize;

use super::engine::simulate;
use super::types::{ConfigError, Inputs};

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    /// Month by which the portfolio must be debt-free.
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_extra: f64,
    pub payoff_months: u32,
    pub debt_free: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_extra: Option<f64>,
    pub achieved_months: Option<u32>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Finds the smallest extra monthly payment that clears every debt by
/// `target_months`. Payoff time is monotone non-increasing in the extra
/// payment, so a plain bisection over the search interval is sound.
pub fn solve_required_extra(
    inputs: &Inputs,
    config: GoalSolveConfig,
) -> Result<GoalSolveResult, ConfigError> {
    validate_config(inputs, config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_eval = evaluate_candidate(inputs, config, config.search_min)?;
    let high_eval = evaluate_candidate(inputs, config, config.search_max)?;

    let mut solved_extra = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_eval.meets_target {
        solved_extra = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already debt-free by the target month at the lower search bound.".to_string();
    } else if !high_eval.meets_target {
        feasible = false;
        message = "No extra payment within the search bounds reaches the target month.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let eval = evaluate_candidate(inputs, config, mid)?;
            iterations.push(GoalSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_extra: mid,
                payoff_months: eval.payoff_months,
                debt_free: eval.meets_target,
            });

            if eval.meets_target {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                solved_extra = Some(hi);
                break;
            }
        }
        if solved_extra.is_none() {
            solved_extra = Some(hi);
        }
        feasible = true;
        message = if converged {
            "Solved required extra monthly payment.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    let mut achieved_months = None;
    if let Some(extra) = solved_extra {
        let final_eval = evaluate_candidate(inputs, config, extra)?;
        achieved_months = Some(final_eval.payoff_months);
    }

    Ok(GoalSolveResult {
        target_months: config.target_months,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_extra,
        achieved_months,
        iterations,
        converged,
        feasible,
        message,
    })
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    payoff_months: u32,
    meets_target: bool,
}

fn evaluate_candidate(
    base_inputs: &Inputs,
    config: GoalSolveConfig,
    candidate_extra: f64,
) -> Result<CandidateEval, ConfigError> {
    let mut inputs = base_inputs.clone();
    inputs.extra_monthly_payment = candidate_extra.max(0.0);

    let indebted = inputs.debts.iter().filter(|d| !d.is_paid_off()).count();
    let result = simulate(&inputs)?;
    let debt_free = result.payoff_order.len() == indebted;

    Ok(CandidateEval {
        payoff_months: result.payoff_months,
        meets_target: debt_free && result.payoff_months <= config.target_months,
    })
}

fn validate_config(inputs: &Inputs, config: GoalSolveConfig) -> Result<(), ConfigError> {
    if config.target_months == 0 || config.target_months > inputs.max_months {
        return Err(ConfigError::InvalidTargetMonths);
    }
    if !config.search_min.is_finite()
        || !config.search_max.is_finite()
        || config.search_min < 0.0
        || config.search_max <= config.search_min
    {
        return Err(ConfigError::InvalidSearchBounds);
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(ConfigError::InvalidTolerance);
    }
    if config.max_iterations == 0 {
        return Err(ConfigError::InvalidIterations);
    }
    Ok(())
}
