mod engine;
mod ledger;
mod solver;
mod strategy;
mod types;

pub use engine::{StrategySummary, compare_strategies, simulate};
pub use solver::{GoalSolveConfig, GoalSolveIteration, GoalSolveResult, solve_required_extra};
pub use strategy::{promo_risk_factor, rank_active, velocity_score};
pub use types::{
    ConfigError, DEFAULT_MAX_MONTHS, DebtCategory, DebtItem, DebtKind, DebtPayoffEvent, FocusMode,
    Inputs, MinPaymentRule, MonthResult, PAID_OFF_EPSILON, PaymentSource, PlanSettings, PromoRate,
    SimulationResult, Strategy,
};
