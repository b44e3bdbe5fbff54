use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    Router,
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::core::{
    DEFAULT_MAX_MONTHS, DebtCategory, DebtItem, DebtKind, DebtPayoffEvent, FocusMode,
    GoalSolveConfig, GoalSolveResult, Inputs, MinPaymentRule, MonthResult, PaymentSource,
    PlanSettings, PromoRate, Strategy, compare_strategies, rank_active, simulate,
    solve_required_extra, velocity_score,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliStrategy {
    Velocity,
    Snowball,
    Avalanche,
}

impl From<CliStrategy> for Strategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::Velocity => Strategy::Velocity,
            CliStrategy::Snowball => Strategy::Snowball,
            CliStrategy::Avalanche => Strategy::Avalanche,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFocusMode {
    Single,
    Split,
}

impl From<CliFocusMode> for FocusMode {
    fn from(value: CliFocusMode) -> Self {
        match value {
            CliFocusMode::Single => FocusMode::Single,
            CliFocusMode::Split => FocusMode::Split,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStrategy {
    #[serde(alias = "velocity-banking", alias = "velocityBanking")]
    Velocity,
    Snowball,
    Avalanche,
}

impl From<ApiStrategy> for CliStrategy {
    fn from(value: ApiStrategy) -> Self {
        match value {
            ApiStrategy::Velocity => CliStrategy::Velocity,
            ApiStrategy::Snowball => CliStrategy::Snowball,
            ApiStrategy::Avalanche => CliStrategy::Avalanche,
        }
    }
}

impl From<Strategy> for ApiStrategy {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::Velocity => ApiStrategy::Velocity,
            Strategy::Snowball => ApiStrategy::Snowball,
            Strategy::Avalanche => ApiStrategy::Avalanche,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiFocusMode {
    Single,
    Split,
}

impl From<ApiFocusMode> for CliFocusMode {
    fn from(value: ApiFocusMode) -> Self {
        match value {
            ApiFocusMode::Single => CliFocusMode::Single,
            ApiFocusMode::Split => CliFocusMode::Split,
        }
    }
}

impl From<FocusMode> for ApiFocusMode {
    fn from(value: FocusMode) -> Self {
        match value {
            FocusMode::Single => ApiFocusMode::Single,
            FocusMode::Split => ApiFocusMode::Split,
        }
    }
}

/// One debt record as accepted over the wire. Only `id`, `balance`, `apr`
/// and `minPayment` are required; everything else has a neutral default.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DebtPayload {
    id: Option<String>,
    name: Option<String>,
    category: Option<DebtCategory>,
    kind: Option<DebtKind>,
    balance: Option<f64>,
    apr: Option<f64>,
    min_payment: Option<MinPaymentRule>,
    term_months: Option<u32>,
    payment_source: Option<PaymentSource>,
    promo: Option<PromoRate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    monthly_income: Option<f64>,
    monthly_expenses: Option<f64>,
    extra_monthly_payment: Option<f64>,
    strategy: Option<ApiStrategy>,
    focus_mode: Option<ApiFocusMode>,
    split_ratio_primary: Option<f64>,
    max_months: Option<u32>,
    debts: Vec<DebtPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    #[serde(flatten)]
    simulation: SimulatePayload,
    target_months: Option<u32>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "paydown",
    about = "Multi-debt payoff simulator (velocity / snowball / avalanche strategies)"
)]
struct Cli {
    #[arg(long, help = "Path to a JSON file holding the debt list")]
    debts_file: Option<PathBuf>,
    #[arg(long, default_value_t = 0.0)]
    monthly_income: f64,
    #[arg(long, default_value_t = 0.0)]
    monthly_expenses: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Extra cash committed to the month's target debt on top of the surplus"
    )]
    extra_monthly_payment: f64,
    #[arg(long, value_enum, default_value_t = CliStrategy::Velocity)]
    strategy: CliStrategy,
    #[arg(long, value_enum, default_value_t = CliFocusMode::Single)]
    focus_mode: CliFocusMode,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Fraction of extra cash given to the primary target when splitting"
    )]
    split_ratio_primary: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_MONTHS,
        help = "Safety bound on the simulated horizon"
    )]
    max_months: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    strategy: ApiStrategy,
    focus_mode: ApiFocusMode,
    split_ratio_primary: f64,
    payoff_months: u32,
    total_interest: f64,
    payoff_order: Vec<DebtPayoffEvent>,
    month_results: Vec<MonthResult>,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RankedDebt {
    id: String,
    name: String,
    balance: f64,
    effective_apr: f64,
    min_payment: f64,
    velocity_score: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RankResponse {
    strategy: ApiStrategy,
    ranked: Vec<RankedDebt>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    results: Vec<crate::core::StrategySummary>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_debt(index: usize, payload: DebtPayload) -> Result<DebtItem, String> {
    let id = payload
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| format!("debts[{index}] is missing an id"))?;
    let balance = payload
        .balance
        .ok_or_else(|| format!("debt `{id}` is missing a balance"))?;
    let apr = payload
        .apr
        .ok_or_else(|| format!("debt `{id}` is missing an apr"))?;
    let min_payment = payload
        .min_payment
        .ok_or_else(|| format!("debt `{id}` is missing a minPayment rule"))?;

    Ok(DebtItem {
        name: payload.name.unwrap_or_else(|| id.clone()),
        id,
        category: payload.category.unwrap_or(DebtCategory::Other),
        kind: payload.kind.unwrap_or(DebtKind::Amortized),
        balance,
        apr,
        min_payment,
        term_months: payload.term_months,
        payment_source: payload.payment_source.unwrap_or(PaymentSource::Checking),
        promo: payload.promo,
    })
}

fn build_inputs(cli: Cli, debts: Vec<DebtItem>) -> Result<Inputs, String> {
    for (name, value) in [
        ("--monthly-income", cli.monthly_income),
        ("--monthly-expenses", cli.monthly_expenses),
        ("--extra-monthly-payment", cli.extra_monthly_payment),
        ("--split-ratio-primary", cli.split_ratio_primary),
    ] {
        if !value.is_finite() {
            return Err(format!("{name} must be a finite number"));
        }
    }

    if cli.max_months == 0 {
        return Err("--max-months must be > 0".to_string());
    }

    Ok(Inputs {
        monthly_income: cli.monthly_income,
        monthly_expenses: cli.monthly_expenses,
        extra_monthly_payment: cli.extra_monthly_payment,
        debts,
        settings: PlanSettings {
            strategy: cli.strategy.into(),
            focus_mode: cli.focus_mode.into(),
            split_ratio_primary: cli.split_ratio_primary,
        },
        max_months: cli.max_months,
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        debts_file: None,
        monthly_income: 0.0,
        monthly_expenses: 0.0,
        extra_monthly_payment: 0.0,
        strategy: CliStrategy::Velocity,
        focus_mode: CliFocusMode::Single,
        split_ratio_primary: 1.0,
        max_months: DEFAULT_MAX_MONTHS,
    }
}

fn inputs_from_payload(payload: SimulatePayload) -> Result<Inputs, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.monthly_income {
        cli.monthly_income = v;
    }
    if let Some(v) = payload.monthly_expenses {
        cli.monthly_expenses = v;
    }
    if let Some(v) = payload.extra_monthly_payment {
        cli.extra_monthly_payment = v;
    }
    if let Some(v) = payload.strategy {
        cli.strategy = v.into();
    }
    if let Some(v) = payload.focus_mode {
        cli.focus_mode = v.into();
    }
    if let Some(v) = payload.split_ratio_primary {
        cli.split_ratio_primary = v;
    }
    if let Some(v) = payload.max_months {
        cli.max_months = v;
    }

    let debts = payload
        .debts
        .into_iter()
        .enumerate()
        .map(|(index, debt)| build_debt(index, debt))
        .collect::<Result<Vec<_>, String>>()?;

    build_inputs(cli, debts)
}

/// One-shot run from the command line: load the debt list from
/// `--debts-file`, simulate, print the result as JSON.
pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let Some(path) = cli.debts_file.clone() else {
        return Err("--debts-file is required (a JSON array of debt records)".to_string());
    };

    let raw = fs::read_to_string(&path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let payloads: Vec<DebtPayload> =
        serde_json::from_str(&raw).map_err(|e| format!("invalid debts JSON: {e}"))?;
    let debts = payloads
        .into_iter()
        .enumerate()
        .map(|(index, debt)| build_debt(index, debt))
        .collect::<Result<Vec<_>, String>>()?;

    let inputs = build_inputs(cli, debts)?;
    let result = simulate(&inputs).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/simulate", post(simulate_handler))
        .route("/api/rank", post(rank_handler))
        .route("/api/compare", post(compare_handler))
        .route("/api/solve", post(solve_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("paydown HTTP API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(Json(payload): Json<SimulatePayload>) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match simulate(&inputs) {
        Ok(result) => {
            log::info!(
                "simulated {} debts: {} months, {:.2} interest",
                inputs.debts.len(),
                result.payoff_months,
                result.total_interest
            );
            json_response(StatusCode::OK, build_simulate_response(&inputs, result))
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn rank_handler(Json(payload): Json<SimulatePayload>) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let ranked = rank_active(inputs.settings.strategy, &inputs.debts)
        .into_iter()
        .map(|i| {
            let debt = &inputs.debts[i];
            RankedDebt {
                id: debt.id.clone(),
                name: debt.name.clone(),
                balance: debt.balance,
                effective_apr: debt.effective_apr(),
                min_payment: debt.min_payment(),
                velocity_score: velocity_score(debt),
            }
        })
        .collect();

    json_response(
        StatusCode::OK,
        RankResponse {
            strategy: inputs.settings.strategy.into(),
            ranked,
        },
    )
}

async fn compare_handler(Json(payload): Json<SimulatePayload>) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match compare_strategies(&inputs) {
        Ok(results) => json_response(StatusCode::OK, CompareResponse { results }),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn solve_handler(Json(payload): Json<SolvePayload>) -> Response {
    let config = match goal_config_from_payload(&payload) {
        Ok(config) => config,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    let inputs = match inputs_from_payload(payload.simulation) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match solve_required_extra(&inputs, config) {
        Ok(result) => json_response::<GoalSolveResult>(StatusCode::OK, result),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn goal_config_from_payload(payload: &SolvePayload) -> Result<GoalSolveConfig, String> {
    let target_months = payload
        .target_months
        .ok_or_else(|| "targetMonths is required".to_string())?;
    Ok(GoalSolveConfig {
        target_months,
        search_min: payload.search_min.unwrap_or(0.0),
        search_max: payload.search_max.unwrap_or(5_000.0),
        tolerance: payload.tolerance.unwrap_or(1.0),
        max_iterations: payload.max_iterations.unwrap_or(32),
    })
}

fn build_simulate_response(inputs: &Inputs, result: crate::core::SimulationResult) -> SimulateResponse {
    SimulateResponse {
        strategy: inputs.settings.strategy.into(),
        focus_mode: inputs.settings.focus_mode.into(),
        split_ratio_primary: inputs.settings.split_ratio_primary.clamp(0.0, 1.0),
        payoff_months: result.payoff_months,
        total_interest: result.total_interest,
        payoff_order: result.payoff_order,
        month_results: result.month_results,
        warnings: result.warnings,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, Json(body)).into_response()
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn inputs_from_json(json: &str) -> Result<Inputs, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    inputs_from_payload(payload)
}
