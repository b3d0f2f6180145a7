use crate::util::lifo::Lifo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discrete acquisition tranche, tracked until fully disposed.
///
/// Lots are created by buys (at the fiat cost actually paid) and by external
/// deposits (zero cost basis), and are consumed from the top of the stack in
/// LIFO order. A lot is never merged with or re-created from another.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PurchaseLot {
    pub acquired_at: Option<DateTime<Utc>>,

    /// Asset units not yet disposed from this lot. Only ever decreases.
    pub remaining_quantity: f64,

    /// Fiat cost per unit at acquisition. 0 for deposited lots.
    pub unit_cost: f64,
}

impl PurchaseLot {
    /// Fiat cost still carried by this lot.
    ///
    /// Recomputed from quantity and unit cost rather than stored, so partial
    /// consumption cannot let the two drift apart.
    pub fn remaining_cost(&self) -> f64 {
        self.remaining_quantity * self.unit_cost
    }
}

/// Outcome of a disposal walk over the lot stack.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Disposal {
    /// Fiat cost basis removed from the stack.
    pub cost_consumed: f64,

    /// Asset units the stack could not cover. Non-zero means the disposal
    /// exceeded recorded holdings and the uncovered remainder carries zero
    /// cost basis.
    pub uncovered: f64,
}

impl Lifo<PurchaseLot> {
    /// Consume `quantity` asset units from the stack, newest lot first.
    ///
    /// Whole lots are popped; a lot larger than the remaining disposal is
    /// shrunk in place and the walk stops. An empty stack before the
    /// disposal is covered ends the walk with the shortfall reported in
    /// [`Disposal::uncovered`], never an error.
    pub fn consume(&mut self, quantity: f64) -> Disposal {
        let mut remaining = quantity;
        let mut cost_consumed = 0.0;

        while remaining > 0.0 {
            let Some(lot) = self.peek_mut() else {
                break;
            };

            if lot.remaining_quantity <= remaining {
                cost_consumed += lot.remaining_cost();
                remaining -= lot.remaining_quantity;
                self.pop();
            } else {
                cost_consumed += remaining * lot.unit_cost;
                lot.remaining_quantity -= remaining;
                remaining = 0.0;
            }
        }

        Disposal {
            cost_consumed,
            uncovered: remaining,
        }
    }

    /// Sum of units across all residual lots.
    pub fn total_quantity(&self) -> f64 {
        self.iter().map(|lot| lot.remaining_quantity).sum()
    }

    /// Sum of fiat cost across all residual lots.
    pub fn total_cost(&self) -> f64 {
        self.iter().map(|lot| lot.remaining_cost()).sum()
    }
}
