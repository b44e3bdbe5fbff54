use std::collections::HashSet;

use serde::Serialize;

use super::strategy::rank_active;
use super::types::{
    ConfigError, DebtItem, DebtPayoffEvent, FocusMode, Inputs, MinPaymentRule, MonthResult,
    SimulationResult, Strategy,
};

/// Summary row produced by [`compare_strategies`], one per strategy.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySummary {
    pub strategy: Strategy,
    pub payoff_months: u32,
    pub total_interest: f64,
    pub debt_free: bool,
    pub payoff_order: Vec<DebtPayoffEvent>,
}

/// Runs the month-stepped payoff projection.
///
/// The caller's debts are cloned on entry; promo countdowns tick on the
/// internal copies only, so calling this twice with the same inputs yields
/// identical results. The combined minimum-payment figure used to size the
/// monthly surplus is snapshotted from the initial balances and is not
/// recomputed as percent-based minimums shrink; this keeps the surplus
/// estimate conservative for percent-rule debts.
pub fn simulate(inputs: &Inputs) -> Result<SimulationResult, ConfigError> {
    validate_inputs(inputs)?;

    let split_ratio = inputs.settings.split_ratio_primary.clamp(0.0, 1.0);
    let cash_flow = inputs.monthly_income - inputs.monthly_expenses;

    let mut debts: Vec<DebtItem> = inputs.debts.clone();
    let initial_minimums: Vec<f64> = debts.iter().map(DebtItem::min_payment).collect();
    let total_minimums: f64 = initial_minimums.iter().sum();
    let warnings = collect_warnings(cash_flow, total_minimums);

    let mut paid_off_month: Vec<Option<u32>> = vec![None; debts.len()];
    let mut payoff_order = Vec::new();
    let mut month_results = Vec::new();
    let mut total_interest = 0.0;
    let mut month = 0;

    while month < inputs.max_months && debts.iter().any(|d| !d.is_paid_off()) {
        month += 1;

        let freed_minimums: f64 = paid_off_month
            .iter()
            .zip(initial_minimums.iter())
            .filter(|(paid, _)| paid.is_some())
            .map(|(_, min)| min)
            .sum();
        let available_extra =
            (cash_flow - total_minimums).max(0.0) + inputs.extra_monthly_payment + freed_minimums;

        let ranked = rank_active(inputs.settings.strategy, &debts);
        let targets: &[usize] = match inputs.settings.focus_mode {
            FocusMode::Single => &ranked[..ranked.len().min(1)],
            FocusMode::Split => &ranked[..ranked.len().min(2)],
        };
        let target_ids: Vec<String> = targets.iter().map(|&i| debts[i].id.clone()).collect();

        let mut extras = vec![0.0; debts.len()];
        for (slot, &i) in targets.iter().enumerate() {
            let share = match inputs.settings.focus_mode {
                FocusMode::Single => available_extra,
                FocusMode::Split if slot == 0 => available_extra * split_ratio,
                FocusMode::Split => available_extra * (1.0 - split_ratio),
            };
            let interest = debts[i].balance * debts[i].effective_apr() / 12.0;
            let needed = (debts[i].balance + interest - debts[i].min_payment()).max(0.0);
            extras[i] = share.min(needed);
        }

        let mut balances = vec![0.0; debts.len()];
        let mut interest_charges = vec![0.0; debts.len()];
        let mut payments = vec![0.0; debts.len()];

        for i in 0..debts.len() {
            if debts[i].is_paid_off() {
                continue;
            }

            let interest = debts[i].balance * debts[i].effective_apr() / 12.0;
            let payment =
                (debts[i].min_payment() + extras[i]).min(debts[i].balance + interest);
            let principal = (payment - interest).max(0.0);
            debts[i].balance = (debts[i].balance - principal).max(0.0);
            total_interest += interest;

            balances[i] = debts[i].balance;
            interest_charges[i] = interest;
            payments[i] = payment;

            if debts[i].is_paid_off() && paid_off_month[i].is_none() {
                paid_off_month[i] = Some(month);
                payoff_order.push(DebtPayoffEvent {
                    id: debts[i].id.clone(),
                    name: debts[i].name.clone(),
                    month_paid_off: month,
                });
            }

            // The promo window elapses with the calendar, whether or not
            // this debt was targeted this month.
            if let Some(promo) = debts[i].promo.as_mut() {
                if promo.months_remaining > 0 {
                    promo.months_remaining -= 1;
                }
            }
        }

        month_results.push(MonthResult {
            month,
            balances,
            interest_charges,
            payments,
            target_ids,
        });
    }

    Ok(SimulationResult {
        payoff_months: month,
        total_interest,
        payoff_order,
        month_results,
        warnings,
    })
}

/// Runs the same inputs once per strategy and summarizes each run, for
/// side-by-side comparison of velocity, snowball and avalanche plans.
pub fn compare_strategies(inputs: &Inputs) -> Result<Vec<StrategySummary>, ConfigError> {
    let indebted = inputs.debts.iter().filter(|d| !d.is_paid_off()).count();
    let mut summaries = Vec::with_capacity(3);

    for strategy in [Strategy::Velocity, Strategy::Snowball, Strategy::Avalanche] {
        let mut candidate = inputs.clone();
        candidate.settings.strategy = strategy;
        let result = simulate(&candidate)?;
        summaries.push(StrategySummary {
            strategy,
            payoff_months: result.payoff_months,
            total_interest: result.total_interest,
            debt_free: result.payoff_order.len() == indebted,
            payoff_order: result.payoff_order,
        });
    }

    Ok(summaries)
}

fn collect_warnings(cash_flow: f64, total_minimums: f64) -> Vec<String> {
    let mut warnings = Vec::new();
    if cash_flow <= 0.0 {
        warnings.push(
            "Monthly cash flow is zero or negative; income does not exceed expenses.".to_string(),
        );
    }
    if cash_flow < total_minimums {
        warnings.push(format!(
            "Monthly cash flow ({cash_flow:.2}) does not cover the combined minimum payments ({total_minimums:.2})."
        ));
    }
    warnings
}

fn validate_inputs(inputs: &Inputs) -> Result<(), ConfigError> {
    for (field, value) in [
        ("monthlyIncome", inputs.monthly_income),
        ("monthlyExpenses", inputs.monthly_expenses),
        ("extraMonthlyPayment", inputs.extra_monthly_payment),
        ("splitRatioPrimary", inputs.settings.split_ratio_primary),
    ] {
        if !value.is_finite() {
            return Err(ConfigError::NonFiniteAmount { field });
        }
    }

    if inputs.max_months == 0 {
        return Err(ConfigError::ZeroMaxMonths);
    }

    let mut seen_ids = HashSet::new();
    for debt in &inputs.debts {
        if !seen_ids.insert(debt.id.as_str()) {
            return Err(ConfigError::DuplicateDebtId {
                id: debt.id.clone(),
            });
        }

        let mut rates = vec![debt.apr];
        if let Some(promo) = &debt.promo {
            rates.push(promo.intro_apr);
            rates.push(promo.post_intro_apr);
        }

        if !debt.balance.is_finite() || rates.iter().any(|r| !r.is_finite()) {
            return Err(ConfigError::NonFiniteDebtField {
                id: debt.id.clone(),
            });
        }
        if debt.balance < 0.0 {
            return Err(ConfigError::NegativeBalance {
                id: debt.id.clone(),
            });
        }
        if rates.iter().any(|r| *r < 0.0) {
            return Err(ConfigError::NegativeApr {
                id: debt.id.clone(),
            });
        }

        let rule_ok = match debt.min_payment {
            MinPaymentRule::Fixed { amount } => amount.is_finite() && amount >= 0.0,
            MinPaymentRule::PercentWithFloor { percent, floor } => {
                percent.is_finite() && floor.is_finite() && percent >= 0.0 && floor >= 0.0
            }
        };
        if !rule_ok {
            return Err(ConfigError::NegativeMinPayment {
                id: debt.id.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        DebtCategory, DebtKind, PAID_OFF_EPSILON, PaymentSource, PlanSettings, PromoRate,
    };
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn debt(id: &str, balance: f64, apr: f64, min_fixed: f64) -> DebtItem {
        DebtItem {
            id: id.to_string(),
            name: id.to_string(),
            category: DebtCategory::CreditCard,
            kind: DebtKind::Revolving,
            balance,
            apr,
            min_payment: MinPaymentRule::Fixed { amount: min_fixed },
            term_months: None,
            payment_source: PaymentSource::Checking,
            promo: None,
        }
    }

    fn inputs(debts: Vec<DebtItem>, monthly_income: f64) -> Inputs {
        Inputs {
            monthly_income,
            monthly_expenses: 0.0,
            extra_monthly_payment: 0.0,
            debts,
            settings: PlanSettings {
                strategy: Strategy::Avalanche,
                focus_mode: FocusMode::Single,
                split_ratio_primary: 1.0,
            },
            max_months: 600,
        }
    }

    #[test]
    fn golden_single_debt_payoff() {
        // 1000 at 12% APR, fixed minimum 100, cash flow 50: the minimum is
        // underfunded so no extra ever flows, and the balance amortizes to
        // zero on the regular payment alone.
        let result = simulate(&inputs(vec![debt("d", 1_000.0, 0.12, 100.0)], 50.0))
            .expect("valid inputs");

        assert_eq!(result.payoff_months, 11);
        assert_approx(result.total_interest, 58.98488001215102);
        assert_eq!(result.payoff_order.len(), 1);
        assert_eq!(result.payoff_order[0].month_paid_off, 11);
        assert_eq!(result.month_results.len(), 11);
    }

    #[test]
    fn zero_debts_returns_zero_month_result() {
        let result = simulate(&inputs(Vec::new(), 1_000.0)).expect("valid inputs");
        assert_eq!(result.payoff_months, 0);
        assert_approx(result.total_interest, 0.0);
        assert!(result.payoff_order.is_empty());
        assert!(result.month_results.is_empty());
    }

    #[test]
    fn negative_cash_flow_warning_is_present() {
        let mut i = inputs(vec![debt("d", 500.0, 0.10, 25.0)], 0.0);
        i.monthly_expenses = 100.0;
        let result = simulate(&i).expect("valid inputs");
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.contains("zero or negative")),
            "warnings: {:?}",
            result.warnings
        );
    }

    #[test]
    fn insufficient_cash_flow_warning_is_present() {
        // Cash flow of exactly totalMinimums - 1.
        let result =
            simulate(&inputs(vec![debt("d", 500.0, 0.10, 25.0)], 24.0)).expect("valid inputs");
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.contains("minimum payments")),
            "warnings: {:?}",
            result.warnings
        );
    }

    #[test]
    fn adequate_cash_flow_produces_no_warnings() {
        let result =
            simulate(&inputs(vec![debt("d", 500.0, 0.10, 25.0)], 500.0)).expect("valid inputs");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn avalanche_targets_credit_card_until_paid_then_loan() {
        let i = inputs(
            vec![
                debt("cc", 5_000.0, 0.20, 150.0),
                debt("loan", 5_000.0, 0.05, 150.0),
            ],
            500.0,
        );
        let result = simulate(&i).expect("valid inputs");

        assert_eq!(result.payoff_months, 23);
        assert_approx(result.total_interest, 1075.7329703806588);
        assert_eq!(result.payoff_order[0].id, "cc");
        assert_eq!(result.payoff_order[0].month_paid_off, 17);
        assert_eq!(result.payoff_order[1].id, "loan");
        assert_eq!(result.payoff_order[1].month_paid_off, 23);

        for row in &result.month_results {
            if row.month <= 17 {
                assert_eq!(row.target_ids, vec!["cc".to_string()], "month {}", row.month);
            } else {
                assert_eq!(
                    row.target_ids,
                    vec!["loan".to_string()],
                    "month {}",
                    row.month
                );
            }
        }
    }

    #[test]
    fn freed_minimum_rolls_into_extra_when_cash_flow_is_short() {
        // Cash flow 200 against 300 of minimums: no surplus exists until the
        // low-rate loan amortizes away, at which point its freed 150 starts
        // accelerating the card.
        let i = inputs(
            vec![
                debt("cc", 5_000.0, 0.20, 150.0),
                debt("loan", 5_000.0, 0.05, 150.0),
            ],
            200.0,
        );
        let result = simulate(&i).expect("valid inputs");

        assert_eq!(result.payoff_months, 43);
        assert_approx(result.total_interest, 2648.227358161061);
        assert_eq!(result.payoff_order[0].id, "loan");
        assert_eq!(result.payoff_order[0].month_paid_off, 36);
        assert_eq!(result.payoff_order[1].id, "cc");
        assert_eq!(result.payoff_order[1].month_paid_off, 43);

        // The card stays the avalanche target for its whole lifetime.
        for row in result.month_results.iter().take(43) {
            assert_eq!(row.target_ids[0], "cc");
        }
    }

    #[test]
    fn promo_rate_reverts_after_countdown() {
        let mut promo_debt = debt("p", 3_000.0, 0.18, 60.0);
        promo_debt.promo = Some(PromoRate {
            intro_apr: 0.0,
            months_remaining: 3,
            post_intro_apr: 0.24,
        });
        let result = simulate(&inputs(vec![promo_debt], 300.0)).expect("valid inputs");

        assert_eq!(result.payoff_months, 11);
        assert_approx(result.total_interest, 185.59398507077373);
        // Intro months accrue nothing; the first post-intro month does.
        assert_approx(result.month_results[0].interest_charges[0], 0.0);
        assert_approx(result.month_results[2].interest_charges[0], 0.0);
        assert!(result.month_results[3].interest_charges[0] > 0.0);
    }

    #[test]
    fn simulate_does_not_mutate_caller_debts() {
        let mut promo_debt = debt("p", 3_000.0, 0.18, 60.0);
        promo_debt.promo = Some(PromoRate {
            intro_apr: 0.0,
            months_remaining: 6,
            post_intro_apr: 0.24,
        });
        let i = inputs(vec![promo_debt.clone()], 300.0);

        simulate(&i).expect("valid inputs");
        assert_eq!(i.debts[0], promo_debt);
        assert_eq!(i.debts[0].promo.unwrap().months_remaining, 6);
    }

    #[test]
    fn simulate_is_idempotent_across_repeated_runs() {
        let mut promo_debt = debt("p", 3_000.0, 0.18, 60.0);
        promo_debt.promo = Some(PromoRate {
            intro_apr: 0.0,
            months_remaining: 6,
            post_intro_apr: 0.24,
        });
        let i = inputs(
            vec![promo_debt, debt("cc", 2_000.0, 0.22, 40.0)],
            400.0,
        );

        let first = simulate(&i).expect("valid inputs");
        let second = simulate(&i).expect("valid inputs");
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).expect("serializable"),
            serde_json::to_string(&second).expect("serializable"),
        );
    }

    #[test]
    fn split_mode_divides_extra_by_ratio() {
        let mut i = inputs(
            vec![debt("a", 1_000.0, 0.12, 10.0), debt("b", 1_000.0, 0.12, 10.0)],
            120.0,
        );
        i.settings.focus_mode = FocusMode::Split;
        i.settings.split_ratio_primary = 0.75;

        let result = simulate(&i).expect("valid inputs");
        let first = &result.month_results[0];
        // available extra = 120 - 20 = 100, split 75/25 on top of the 10
        // minimums; equal scores tie-break to `a` as primary.
        assert_eq!(first.target_ids, vec!["a".to_string(), "b".to_string()]);
        assert_approx(first.payments[0], 85.0);
        assert_approx(first.payments[1], 35.0);
    }

    #[test]
    fn split_share_clamps_to_payoff_need_without_redistribution() {
        let mut i = inputs(
            vec![debt("a", 50.0, 0.0, 10.0), debt("b", 1_000.0, 0.0, 10.0)],
            120.0,
        );
        i.settings.strategy = Strategy::Snowball;
        i.settings.focus_mode = FocusMode::Split;
        i.settings.split_ratio_primary = 0.75;

        let result = simulate(&i).expect("valid inputs");
        let first = &result.month_results[0];
        // Primary needs only 40 beyond its minimum; the unused 35 of its
        // share is not handed to the secondary.
        assert_approx(first.payments[0], 50.0);
        assert_approx(first.payments[1], 35.0);
        assert_approx(first.balances[0], 0.0);
    }

    #[test]
    fn split_ratio_is_clamped_into_unit_range() {
        let mut i = inputs(
            vec![debt("a", 1_000.0, 0.0, 10.0), debt("b", 1_000.0, 0.0, 10.0)],
            120.0,
        );
        i.settings.focus_mode = FocusMode::Split;
        i.settings.split_ratio_primary = 1.5;

        let result = simulate(&i).expect("valid inputs");
        let first = &result.month_results[0];
        assert_approx(first.payments[0], 110.0);
        assert_approx(first.payments[1], 10.0);
    }

    #[test]
    fn hopeless_minimum_forces_termination_at_max_months() {
        let mut i = inputs(vec![debt("d", 1_000.0, 0.30, 0.0)], 0.0);
        i.max_months = 120;
        let result = simulate(&i).expect("valid inputs");

        assert_eq!(result.payoff_months, 120);
        assert!(result.payoff_order.is_empty());
        let last = result.month_results.last().expect("months recorded");
        assert!(last.balances[0] > PAID_OFF_EPSILON);
    }

    #[test]
    fn payoff_accounting_is_exact() {
        let i = inputs(
            vec![
                debt("a", 3_000.0, 0.10, 50.0),
                debt("b", 1_000.0, 0.15, 50.0),
                debt("c", 2_000.0, 0.20, 50.0),
                debt("already-paid", 0.0, 0.10, 50.0),
            ],
            400.0,
        );
        let result = simulate(&i).expect("valid inputs");

        assert_eq!(result.payoff_order.len(), 3);
        let mut ids: Vec<&str> = result.payoff_order.iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&"already-paid"));
        for event in &result.payoff_order {
            assert!(event.month_paid_off >= 1);
            assert!(event.month_paid_off <= result.payoff_months);
        }
    }

    #[test]
    fn compare_strategies_reports_all_three() {
        let i = inputs(
            vec![
                debt("a", 3_000.0, 0.10, 50.0),
                debt("b", 1_000.0, 0.15, 50.0),
                debt("c", 2_000.0, 0.20, 50.0),
            ],
            400.0,
        );
        let summaries = compare_strategies(&i).expect("valid inputs");

        assert_eq!(summaries.len(), 3);
        assert!(summaries.iter().all(|s| s.debt_free));
        let snowball = summaries
            .iter()
            .find(|s| s.strategy == Strategy::Snowball)
            .expect("snowball summary");
        let avalanche = summaries
            .iter()
            .find(|s| s.strategy == Strategy::Avalanche)
            .expect("avalanche summary");
        assert_eq!(snowball.payoff_months, 18);
        assert_approx(snowball.total_interest, 605.4518168160288);
        assert_eq!(avalanche.payoff_months, 18);
        assert_approx(avalanche.total_interest, 571.0449630751489);
        assert!(avalanche.total_interest < snowball.total_interest);
        assert_eq!(snowball.payoff_order[0].id, "b");
        assert_eq!(avalanche.payoff_order[0].id, "c");
    }

    #[test]
    fn rejects_negative_balance() {
        let err = simulate(&inputs(vec![debt("d", -5.0, 0.10, 25.0)], 100.0))
            .expect_err("must reject");
        assert_eq!(err, ConfigError::NegativeBalance { id: "d".to_string() });
    }

    #[test]
    fn rejects_negative_apr() {
        let err = simulate(&inputs(vec![debt("d", 100.0, -0.10, 25.0)], 100.0))
            .expect_err("must reject");
        assert_eq!(err, ConfigError::NegativeApr { id: "d".to_string() });
    }

    #[test]
    fn rejects_duplicate_debt_ids() {
        let err = simulate(&inputs(
            vec![debt("d", 100.0, 0.10, 25.0), debt("d", 200.0, 0.12, 25.0)],
            100.0,
        ))
        .expect_err("must reject");
        assert_eq!(err, ConfigError::DuplicateDebtId { id: "d".to_string() });
    }

    #[test]
    fn rejects_non_finite_income() {
        let mut i = inputs(vec![debt("d", 100.0, 0.10, 25.0)], f64::NAN);
        i.monthly_income = f64::NAN;
        let err = simulate(&i).expect_err("must reject");
        assert_eq!(
            err,
            ConfigError::NonFiniteAmount {
                field: "monthlyIncome"
            }
        );
    }

    #[test]
    fn rejects_zero_max_months() {
        let mut i = inputs(vec![debt("d", 100.0, 0.10, 25.0)], 100.0);
        i.max_months = 0;
        let err = simulate(&i).expect_err("must reject");
        assert_eq!(err, ConfigError::ZeroMaxMonths);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_balances_are_monotone_and_reach_zero_with_adequate_cash(
            balances in proptest::collection::vec(100u32..10_000, 1..5),
            apr_bp in 0u32..3_000,
            extra in 0u32..500,
        ) {
            let apr = apr_bp as f64 / 10_000.0;
            let debts: Vec<DebtItem> = balances
                .iter()
                .enumerate()
                .map(|(idx, &b)| {
                    // Minimum always covers interest plus some principal, so
                    // every balance shrinks every month.
                    let min = b as f64 * apr / 12.0 + 25.0;
                    debt(&format!("d{idx}"), b as f64, apr, min)
                })
                .collect();
            let total_min: f64 = debts.iter().map(DebtItem::min_payment).sum();
            let mut i = inputs(debts, total_min + extra as f64);
            i.settings.strategy = Strategy::Velocity;

            let result = simulate(&i).expect("valid inputs");
            prop_assert!(result.payoff_months < i.max_months);
            prop_assert!(result.payoff_order.len() == balances.len());

            for idx in 0..balances.len() {
                let mut prev = balances[idx] as f64;
                for row in &result.month_results {
                    prop_assert!(row.balances[idx] <= prev + 1e-9);
                    prev = row.balances[idx];
                }
                prop_assert!(prev <= PAID_OFF_EPSILON);
            }
        }

        #[test]
        fn prop_simulation_always_terminates(
            balances in proptest::collection::vec(0u32..50_000, 0..5),
            apr_bp in 0u32..5_000,
            min_pay in 0u32..200,
            income in 0u32..2_000,
            expenses in 0u32..2_000,
            max_months in 1u32..240,
        ) {
            let debts: Vec<DebtItem> = balances
                .iter()
                .enumerate()
                .map(|(idx, &b)| {
                    debt(
                        &format!("d{idx}"),
                        b as f64,
                        apr_bp as f64 / 10_000.0,
                        min_pay as f64,
                    )
                })
                .collect();
            let mut i = inputs(debts, income as f64);
            i.monthly_expenses = expenses as f64;
            i.max_months = max_months;

            let result = simulate(&i).expect("valid inputs");
            prop_assert!(result.payoff_months <= max_months);
            prop_assert!(result.month_results.len() == result.payoff_months as usize);
            prop_assert!(result.total_interest.is_finite());
        }
    }
}
