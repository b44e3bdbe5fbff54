use std::cmp::Ordering;

use super::types::{DebtItem, Strategy};

/// Step function of a promo's remaining months: the closer the intro rate
/// is to expiring, the more urgent the debt.
pub fn promo_risk_factor(debt: &DebtItem) -> f64 {
    let Some(promo) = &debt.promo else {
        return 0.0;
    };
    match promo.months_remaining {
        0..=3 => 1.0,
        4..=6 => 0.7,
        7..=9 => 0.4,
        _ => 0.15,
    }
}

/// Velocity composite: weight debts that free the most monthly cash flow
/// when eliminated, then debts burning the most interest per day, then
/// debts about to lose a promotional rate.
pub fn velocity_score(debt: &DebtItem) -> f64 {
    let daily_interest = debt.balance * debt.apr / 365.0;
    0.55 * debt.min_payment() + 0.35 * (daily_interest * 30.0) + 0.10 * (promo_risk_factor(debt) * 200.0)
}

/// Orders the active debts (balance above the paid-off epsilon) for one
/// month and returns their indices into `debts`. Used by both the
/// simulation engine and the ranking preview so the two can never drift.
/// Ties break ascending by id to keep results reproducible.
pub fn rank_active(strategy: Strategy, debts: &[DebtItem]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..debts.len())
        .filter(|&i| !debts[i].is_paid_off())
        .collect();

    order.sort_by(|&a, &b| {
        let primary = match strategy {
            Strategy::Snowball => debts[a].balance.total_cmp(&debts[b].balance),
            Strategy::Avalanche => debts[b].apr.total_cmp(&debts[a].apr),
            Strategy::Velocity => velocity_score(&debts[b]).total_cmp(&velocity_score(&debts[a])),
        };
        match primary {
            Ordering::Equal => debts[a].id.cmp(&debts[b].id),
            other => other,
        }
    });

    order
}
