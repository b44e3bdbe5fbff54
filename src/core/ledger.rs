use super::types::{DebtItem, MinPaymentRule, PAID_OFF_EPSILON};

impl MinPaymentRule {
    /// Minimum payment owed this month against the given balance.
    pub fn amount_for(&self, balance: f64) -> f64 {
        match *self {
            MinPaymentRule::Fixed { amount } => amount,
            MinPaymentRule::PercentWithFloor { percent, floor } => {
                (balance * percent).max(floor)
            }
        }
    }
}

impl DebtItem {
    pub fn min_payment(&self) -> f64 {
        self.min_payment.amount_for(self.balance)
    }

    /// The rate that accrues this month. A promo whose countdown is still
    /// positive charges the intro APR; an exhausted promo charges the
    /// post-intro APR permanently; debts without a promo use the base APR.
    pub fn effective_apr(&self) -> f64 {
        match &self.promo {
            Some(promo) if promo.months_remaining > 0 => promo.intro_apr,
            Some(promo) => promo.post_intro_apr,
            None => self.apr,
        }
    }

    pub fn is_paid_off(&self) -> bool {
        self.balance <= PAID_OFF_EPSILON
    }
}
