use crate::basis::lot::PurchaseLot;
use crate::model::transaction::{Transaction, TxKind};
use crate::util::lifo::Lifo;
use serde::{Deserialize, Serialize};
use tracing::warn;


/// Per-asset accounting state produced by replaying a transaction sequence.
///
/// The replay owns and mutates the lot stack for exactly one pass; afterwards
/// the ledger is read-only and exposed through the derived summary methods.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AssetLedger {
    transactions: Vec<Transaction>,
    lots: Lifo<PurchaseLot>,

    /// Asset units acquired through buys, fee-inclusive.
    pub total_bought: f64,

    /// Asset units disposed through sells, fee-exclusive.
    pub total_sold: f64,

    /// Asset units received from external deposits.
    pub total_deposited: f64,

    /// Asset units sent to external addresses, fee-exclusive.
    pub total_sent: f64,

    /// Fiat paid across all buys.
    pub total_cost: f64,

    /// Fiat received across all sells.
    pub total_revenue: f64,

    /// Fiat profit recognized on sells: proceeds minus consumed cost basis.
    pub realized_pnl: f64,

    /// Most recent positive trade price, in replay (time) order. Used as the
    /// fallback when no live price is available for this asset.
    pub last_price: f64,

    /// Asset units disposed with no lot coverage. Non-zero means a sell or
    /// send exceeded recorded holdings and the realized figures understate
    /// the cost basis for the uncovered remainder.
    pub uncovered_disposal: f64,
}

impl AssetLedger {
    /// Replay an unsorted transaction sequence into a settled ledger.
    ///
    /// Transactions are stable-sorted ascending by timestamp first, so input
    /// order is only observable between rows sharing an exact timestamp (and
    /// rows with no parseable timestamp, which sort before all dated rows).
    pub fn replay(symbol: &str, mut transactions: Vec<Transaction>) -> Self {
        transactions.sort_by_key(|tx| tx.time);

        let mut ledger = Self::default();
        for tx in &transactions {
            ledger.apply(symbol, tx);
        }
        ledger.transactions = transactions;
        ledger
    }

    fn apply(&mut self, symbol: &str, tx: &Transaction) {
        match tx.kind {
            TxKind::Buy => {
                // The fee is paid out of the purchased units, so the lot
                // holds less than the gross quantity but carries the full
                // fiat cost.
                let net_quantity = tx.quantity - tx.fee;
                if net_quantity > 0.0 {
                    let unit_cost = tx.fiat_amount / net_quantity;
                    self.lots.push(PurchaseLot {
                        acquired_at: tx.time,
                        remaining_quantity: net_quantity,
                        unit_cost: if unit_cost.is_finite() { unit_cost } else { 0.0 },
                    });
                } else {
                    warn!(
                        "{symbol}: buy of {} with fee {} leaves no net quantity, no lot recorded",
                        tx.quantity, tx.fee
                    );
                }

                self.total_bought += tx.quantity;
                self.total_cost += tx.fiat_amount;
                if tx.unit_price > 0.0 {
                    self.last_price = tx.unit_price;
                }
            }
            TxKind::Sell => {
                // The fee leaves custody along with the sold units.
                let disposal_quantity = tx.quantity + tx.fee;
                let disposal = self.lots.consume(disposal_quantity);
                if disposal.uncovered > 0.0 {
                    self.uncovered_disposal += disposal.uncovered;
                    warn!(
                        "{symbol}: sell of {disposal_quantity} exceeds holdings by {}; \
                         uncovered units carry zero cost basis",
                        disposal.uncovered
                    );
                }

                // Cost basis attributable to the fee is not part of the
                // gain: pro-rate the consumed cost down to the net quantity
                // actually sold.
                let net_ratio = if disposal_quantity > 0.0 {
                    tx.quantity / disposal_quantity
                } else {
                    0.0
                };
                let profit = tx.fiat_amount - disposal.cost_consumed * net_ratio;

                self.total_sold += tx.quantity;
                self.total_revenue += tx.fiat_amount;
                self.realized_pnl += profit;
                if tx.unit_price > 0.0 {
                    self.last_price = tx.unit_price;
                }
            }
            TxKind::Deposit => {
                // Deposits arrive with no cost basis and no fee subtraction.
                self.lots.push(PurchaseLot {
                    acquired_at: tx.time,
                    remaining_quantity: tx.quantity,
                    unit_cost: 0.0,
                });
                self.total_deposited += tx.quantity;
            }
            TxKind::WithdrawExternal => {
                // Same stack walk as a sell, but nothing is realized: the
                // units and their cost basis simply leave the ledger.
                let disposal_quantity = tx.quantity + tx.fee;
                let disposal = self.lots.consume(disposal_quantity);
                if disposal.uncovered > 0.0 {
                    self.uncovered_disposal += disposal.uncovered;
                    warn!(
                        "{symbol}: send of {disposal_quantity} exceeds holdings by {}; \
                         uncovered units carry zero cost basis",
                        disposal.uncovered
                    );
                }

                self.total_sent += tx.quantity;
            }
        }
    }

    /// Units still held, summed over the residual lot stack.
    pub fn current_holdings(&self) -> f64 {
        self.lots.total_quantity()
    }

    /// Fiat cost basis of the units still held.
    pub fn current_cost(&self) -> f64 {
        self.lots.total_cost()
    }

    /// Average acquisition price of the residual lots, 0 with no holdings.
    ///
    /// Holdings can carry float dust after many partial disposals, so the
    /// divide is guarded rather than assumed.
    pub fn average_price(&self) -> f64 {
        let holdings = self.current_holdings();
        if holdings > 0.0 {
            self.current_cost() / holdings
        } else {
            0.0
        }
    }

    /// Paper gain on current holdings against a current market price.
    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.current_holdings() * current_price - self.current_cost()
    }

    /// Fiat cost of all fees paid on this asset.
    ///
    /// Trade fees are valued at their execution price; send fees have no
    /// execution price and are valued at `current_price`.
    pub fn fee_cost(&self, current_price: f64) -> f64 {
        self.transactions
            .iter()
            .map(|tx| match tx.kind {
                TxKind::Buy | TxKind::Sell => tx.fee * tx.unit_price,
                TxKind::WithdrawExternal => tx.fee * current_price,
                TxKind::Deposit => 0.0,
            })
            .sum()
    }

    /// Whether this asset saw any trading activity or still holds units.
    pub fn has_activity(&self) -> bool {
        self.total_bought > 0.0 || self.total_sold > 0.0 || self.current_holdings() > 0.0
    }

    /// Residual, unsold acquisition lots. Newest last.
    pub fn lots(&self) -> &Lifo<PurchaseLot> {
        &self.lots
    }

    /// The replayed transactions, in the order they were applied.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use similar_asserts::assert_eq;

    fn at(hour: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap())
    }

    fn tx(
        time: Option<DateTime<Utc>>,
        kind: TxKind,
        quantity: f64,
        unit_price: f64,
        fee: f64,
        fiat_amount: f64,
    ) -> Transaction {
        Transaction {
            time,
            kind,
            quantity,
            unit_price,
            fee,
            fiat_amount,
        }
    }

    #[test]
    fn buy_then_partial_sell() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![
                tx(at(0), TxKind::Buy, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
                tx(at(1), TxKind::Sell, 0.5, 1_200_000.0, 0.0, 600_000.0),
            ],
        );

        assert_eq!(ledger.realized_pnl, 100_000.0);
        assert_eq!(ledger.current_holdings(), 0.5);
        assert_eq!(ledger.current_cost(), 500_000.0);
        assert_eq!(ledger.average_price(), 1_000_000.0);
        assert_eq!(ledger.lots().len(), 1);
        assert_eq!(ledger.lots()[0].unit_cost, 1_000_000.0);
    }

    #[test]
    fn lifo_consumes_newest_buy_first() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![
                tx(at(0), TxKind::Buy, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
                tx(at(1), TxKind::Buy, 1.0, 2_000_000.0, 0.0, 2_000_000.0),
                tx(at(2), TxKind::Sell, 1.0, 2_500_000.0, 0.0, 2_500_000.0),
            ],
        );

        // The second lot (¥2,000,000 cost) is consumed entirely; the first
        // lot must survive untouched.
        assert_eq!(ledger.realized_pnl, 500_000.0);
        assert_eq!(ledger.lots().len(), 1);
        assert_eq!(ledger.lots()[0].remaining_quantity, 1.0);
        assert_eq!(ledger.lots()[0].unit_cost, 1_000_000.0);
    }

    #[test]
    fn deposit_only_asset() {
        let ledger = AssetLedger::replay(
            "XRP",
            vec![
                tx(at(0), TxKind::Deposit, 100.0, 0.0, 0.0, 0.0),
                tx(at(1), TxKind::Deposit, 50.0, 0.0, 0.0, 0.0),
            ],
        );

        assert_eq!(ledger.current_holdings(), 150.0);
        assert_eq!(ledger.average_price(), 0.0);
        assert_eq!(ledger.realized_pnl, 0.0);
        assert_eq!(ledger.total_deposited, 150.0);
    }

    #[test]
    fn selling_the_full_lot_empties_the_stack() {
        let ledger = AssetLedger::replay(
            "ETH",
            vec![
                tx(at(0), TxKind::Buy, 2.0, 300_000.0, 0.0, 600_000.0),
                tx(at(1), TxKind::Sell, 2.0, 350_000.0, 0.0, 700_000.0),
            ],
        );

        assert_eq!(ledger.current_holdings(), 0.0);
        assert_eq!(ledger.current_cost(), 0.0);
        assert_eq!(ledger.average_price(), 0.0);
        assert_eq!(ledger.realized_pnl, 100_000.0);
        assert!(ledger.lots().is_empty());
    }

    #[test]
    fn buy_fee_reduces_the_lot_but_not_total_bought() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![tx(at(0), TxKind::Buy, 1.0, 1_000_000.0, 0.1, 1_000_000.0)],
        );

        assert_eq!(ledger.total_bought, 1.0);
        assert!((ledger.current_holdings() - 0.9).abs() < 1e-12);
        // The full fiat cost lands on the smaller net quantity.
        assert!((ledger.lots()[0].unit_cost - 1_000_000.0 / 0.9).abs() < 1e-6);
    }

    #[test]
    fn sell_fee_disposes_extra_units_and_prorates_cost() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![
                tx(at(0), TxKind::Buy, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
                tx(at(1), TxKind::Sell, 0.5, 1_200_000.0, 0.1, 600_000.0),
            ],
        );

        // 0.6 units leave custody; cost consumed is 600,000, of which only
        // the 0.5/0.6 net share counts against the proceeds.
        assert!((ledger.current_holdings() - 0.4).abs() < 1e-12);
        let expected_profit = 600_000.0 - 600_000.0 * 0.5 / 0.6;
        assert!((ledger.realized_pnl - expected_profit).abs() < 1e-6);
    }

    #[test]
    fn withdraw_reduces_holdings_without_realizing() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![
                tx(at(0), TxKind::Buy, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
                tx(at(1), TxKind::WithdrawExternal, 0.4, 0.0, 0.0, 0.0),
            ],
        );

        assert!((ledger.current_holdings() - 0.6).abs() < 1e-12);
        assert!((ledger.current_cost() - 600_000.0).abs() < 1e-6);
        assert_eq!(ledger.realized_pnl, 0.0);
        assert_eq!(ledger.total_sent, 0.4);
    }

    #[test]
    fn over_disposal_is_flagged_not_fatal() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![
                tx(at(0), TxKind::Buy, 0.5, 1_000_000.0, 0.0, 500_000.0),
                tx(at(1), TxKind::Sell, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
            ],
        );

        assert_eq!(ledger.current_holdings(), 0.0);
        assert!((ledger.uncovered_disposal - 0.5).abs() < 1e-12);
        // Uncovered half carries zero cost basis, so the whole 500,000 of
        // consumed cost counts and the rest of the proceeds is profit.
        assert_eq!(ledger.realized_pnl, 500_000.0);
    }

    #[test]
    fn degenerate_buy_records_no_lot() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![tx(at(0), TxKind::Buy, 0.1, 1_000_000.0, 0.1, 100_000.0)],
        );

        assert!(ledger.lots().is_empty());
        assert_eq!(ledger.total_bought, 0.1);
        assert_eq!(ledger.total_cost, 100_000.0);
    }

    #[test]
    fn last_price_follows_time_order_not_input_order() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![
                // Later trade appears first in the input.
                tx(at(5), TxKind::Sell, 0.1, 1_500_000.0, 0.0, 150_000.0),
                tx(at(0), TxKind::Buy, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
            ],
        );

        assert_eq!(ledger.last_price, 1_500_000.0);
    }

    #[test]
    fn zero_price_trade_keeps_last_price() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![
                tx(at(0), TxKind::Buy, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
                tx(at(1), TxKind::Sell, 0.1, 0.0, 0.0, 0.0),
            ],
        );

        assert_eq!(ledger.last_price, 1_000_000.0);
    }

    #[test]
    fn same_timestamp_keeps_input_order() {
        // Sell-before-buy at the same instant over-disposes; buy-before-sell
        // does not. The stable sort must preserve the source row order.
        let sell_first = AssetLedger::replay(
            "BTC",
            vec![
                tx(at(0), TxKind::Sell, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
                tx(at(0), TxKind::Buy, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
            ],
        );
        let buy_first = AssetLedger::replay(
            "BTC",
            vec![
                tx(at(0), TxKind::Buy, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
                tx(at(0), TxKind::Sell, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
            ],
        );

        assert!((sell_first.uncovered_disposal - 1.0).abs() < 1e-12);
        assert_eq!(sell_first.current_holdings(), 1.0);
        assert_eq!(buy_first.uncovered_disposal, 0.0);
        assert_eq!(buy_first.current_holdings(), 0.0);
    }

    #[test]
    fn undated_rows_replay_before_dated_rows() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![
                tx(at(0), TxKind::Sell, 1.0, 1_200_000.0, 0.0, 1_200_000.0),
                tx(None, TxKind::Buy, 1.0, 1_000_000.0, 0.0, 1_000_000.0),
            ],
        );

        // The undated buy sorts first, so the sell is fully covered.
        assert_eq!(ledger.uncovered_disposal, 0.0);
        assert_eq!(ledger.realized_pnl, 200_000.0);
    }

    #[test]
    fn replay_is_idempotent() {
        let transactions = vec![
            tx(at(0), TxKind::Deposit, 2.0, 0.0, 0.0, 0.0),
            tx(at(1), TxKind::Buy, 1.0, 900_000.0, 0.01, 900_000.0),
            tx(at(2), TxKind::Sell, 0.7, 1_100_000.0, 0.005, 770_000.0),
            tx(at(3), TxKind::WithdrawExternal, 0.3, 0.0, 0.001, 0.0),
        ];

        let first = AssetLedger::replay("BTC", transactions.clone());
        let second = AssetLedger::replay("BTC", transactions);

        assert_eq!(first, second);
    }

    #[test]
    fn fee_cost_values_trade_fees_at_trade_price() {
        let ledger = AssetLedger::replay(
            "BTC",
            vec![
                tx(at(0), TxKind::Buy, 1.0, 1_000_000.0, 0.01, 1_000_000.0),
                tx(at(1), TxKind::WithdrawExternal, 0.5, 0.0, 0.002, 0.0),
            ],
        );

        let expected = 0.01 * 1_000_000.0 + 0.002 * 2_000_000.0;
        assert!((ledger.fee_cost(2_000_000.0) - expected).abs() < 1e-6);
    }
}
