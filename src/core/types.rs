use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Balances at or below this are treated as paid off.
pub const PAID_OFF_EPSILON: f64 = 0.01;

pub const DEFAULT_MAX_MONTHS: u32 = 600;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebtCategory {
    Mortgage,
    Auto,
    CreditCard,
    StudentLoan,
    Personal,
    Medical,
    Land,
    Other,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebtKind {
    Amortized,
    Revolving,
    Simple,
}

/// Where the payment is drawn from. Informational only; does not alter
/// any of the payoff arithmetic.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentSource {
    Checking,
    LineOfCredit,
    Either,
}

/// Minimum payment rule for one debt: a flat dollar amount, or a
/// percentage of the current balance with a dollar floor.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum MinPaymentRule {
    Fixed { amount: f64 },
    PercentWithFloor { percent: f64, floor: f64 },
}

/// Promotional-rate window. `months_remaining` counts down inside the
/// engine's internal copy of the debt; once exhausted the post-intro APR
/// applies permanently.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoRate {
    pub intro_apr: f64,
    pub months_remaining: u32,
    pub post_intro_apr: f64,
}

/// One obligation being tracked. This is the externally persisted shape:
/// the surrounding application imports/exports debts as a flat collection
/// of these records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtItem {
    pub id: String,
    pub name: String,
    pub category: DebtCategory,
    pub kind: DebtKind,
    pub balance: f64,
    pub apr: f64,
    pub min_payment: MinPaymentRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u32>,
    pub payment_source: PaymentSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo: Option<PromoRate>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Velocity,
    Snowball,
    Avalanche,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    Single,
    Split,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlanSettings {
    pub strategy: Strategy,
    pub focus_mode: FocusMode,
    /// Fraction of extra cash given to the first target when splitting.
    /// Clamped to [0, 1] on entry to the engine.
    pub split_ratio_primary: f64,
}

/// Full configuration snapshot for one simulation run. The engine treats
/// the debt list as read-only input and clones it internally.
#[derive(Clone, Debug)]
pub struct Inputs {
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub extra_monthly_payment: f64,
    pub debts: Vec<DebtItem>,
    pub settings: PlanSettings,
    pub max_months: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtPayoffEvent {
    pub id: String,
    pub name: String,
    pub month_paid_off: u32,
}

/// Per-month snapshot. The vectors are aligned with the input debt order;
/// a paid-off debt keeps a zero entry in each.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthResult {
    pub month: u32,
    pub balances: Vec<f64>,
    pub interest_charges: Vec<f64>,
    pub payments: Vec<f64>,
    pub target_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub payoff_months: u32,
    pub total_interest: f64,
    pub payoff_order: Vec<DebtPayoffEvent>,
    pub month_results: Vec<MonthResult>,
    pub warnings: Vec<String>,
}

/// Rejected configuration. The engine fails fast on structurally invalid
/// input instead of projecting nonsense; numerically hopeless-but-valid
/// input (e.g. a minimum that never covers interest) runs to the
/// `max_months` bound and is reported through warnings instead.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("debt `{id}` has a negative balance")]
    NegativeBalance { id: String },
    #[error("debt `{id}` has a negative apr")]
    NegativeApr { id: String },
    #[error("debt `{id}` has a non-finite balance or rate")]
    NonFiniteDebtField { id: String },
    #[error("debt `{id}` has a negative minimum payment rule")]
    NegativeMinPayment { id: String },
    #[error("duplicate debt id `{id}`")]
    DuplicateDebtId { id: String },
    #[error("{field} must be a finite number")]
    NonFiniteAmount { field: &'static str },
    #[error("maxMonths must be > 0")]
    ZeroMaxMonths,
    #[error("targetMonths must be between 1 and maxMonths")]
    InvalidTargetMonths,
    #[error("search bounds must be finite with searchMax > searchMin >= 0")]
    InvalidSearchBounds,
    #[error("tolerance must be finite and > 0")]
    InvalidTolerance,
    #[error("maxIterations must be > 0")]
    InvalidIterations,
}
