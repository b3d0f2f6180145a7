use crate::basis::AssetLedger;
use crate::model::transaction::Transaction;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Earliest and latest parseable timestamps across an import.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Widen `range` to cover `time`, initializing it on first use.
    pub(crate) fn extend(range: &mut Option<DateRange>, time: DateTime<Utc>) {
        match range {
            Some(range) => {
                range.start = range.start.min(time);
                range.end = range.end.max(time);
            }
            None => {
                *range = Some(DateRange {
                    start: time,
                    end: time,
                });
            }
        }
    }
}

/// Normalizer output: typed transactions grouped by asset symbol, the fiat
/// deposit total, and the observed date range. Transactions are unsorted;
/// the engine sorts during replay.
#[derive(Debug, Default)]
pub struct NormalizedImport {
    pub transactions: BTreeMap<String, Vec<Transaction>>,
    pub fiat_deposited: f64,
    pub date_range: Option<DateRange>,
}

impl NormalizedImport {
    /// Fold another import into this one, for multi-file runs.
    pub fn merge(&mut self, other: NormalizedImport) {
        for (symbol, transactions) in other.transactions {
            self.transactions.entry(symbol).or_default().extend(transactions);
        }
        self.fiat_deposited += other.fiat_deposited;
        if let Some(range) = other.date_range {
            DateRange::extend(&mut self.date_range, range.start);
            DateRange::extend(&mut self.date_range, range.end);
        }
    }
}

/// The whole-import result: one settled ledger per asset plus the
/// portfolio-level figures. Immutable once built; live prices are overlaid
/// by the caller, never written back.
#[derive(Debug)]
pub struct Portfolio {
    pub assets: BTreeMap<String, AssetLedger>,
    pub fiat_deposited: f64,
    pub date_range: Option<DateRange>,
}

impl From<NormalizedImport> for Portfolio {
    fn from(import: NormalizedImport) -> Self {
        let assets = import
            .transactions
            .into_iter()
            .map(|(symbol, transactions)| {
                let ledger = AssetLedger::replay(&symbol, transactions);
                (symbol, ledger)
            })
            .collect();

        Self {
            assets,
            fiat_deposited: import.fiat_deposited,
            date_range: import.date_range,
        }
    }
}

impl Portfolio {
    /// Profit recognized through sells, across all assets.
    pub fn realized_pnl(&self) -> f64 {
        self.assets.values().map(|ledger| ledger.realized_pnl).sum()
    }

    /// Paper gain on current holdings at the given prices. Assets with no
    /// resolved price are valued at 0, matching their missing-price display.
    pub fn unrealized_pnl(&self, prices: &BTreeMap<String, f64>) -> f64 {
        self.assets
            .iter()
            .map(|(symbol, ledger)| {
                ledger.unrealized_pnl(prices.get(symbol).copied().unwrap_or(0.0))
            })
            .sum()
    }

    /// Current valuation of all holdings at the given prices.
    pub fn asset_value(&self, prices: &BTreeMap<String, f64>) -> f64 {
        self.assets
            .iter()
            .map(|(symbol, ledger)| {
                ledger.current_holdings() * prices.get(symbol).copied().unwrap_or(0.0)
            })
            .sum()
    }

    /// JPY remaining on the exchange: deposits plus sale proceeds, minus
    /// everything spent on buys.
    pub fn cash_balance(&self) -> f64 {
        let revenue: f64 = self.assets.values().map(|ledger| ledger.total_revenue).sum();
        let cost: f64 = self.assets.values().map(|ledger| ledger.total_cost).sum();
        self.fiat_deposited + revenue - cost
    }

    /// Total fee cost in JPY across all assets.
    pub fn fee_cost(&self, prices: &BTreeMap<String, f64>) -> f64 {
        self.assets
            .iter()
            .map(|(symbol, ledger)| ledger.fee_cost(prices.get(symbol).copied().unwrap_or(0.0)))
            .sum()
    }

    /// Income subject to the progressive schedule: realized plus unrealized.
    pub fn taxable_income(&self, prices: &BTreeMap<String, f64>) -> f64 {
        self.realized_pnl() + self.unrealized_pnl(prices)
    }

    /// Per-asset current prices: each asset's last trade price, overlaid
    /// with whatever the live refresh managed to fetch. Assets with neither
    /// are absent.
    pub fn resolve_prices(
        &self,
        fetched: Option<&BTreeMap<String, f64>>,
    ) -> BTreeMap<String, f64> {
        let mut prices = BTreeMap::new();
        for (symbol, ledger) in &self.assets {
            if let Some(&price) = fetched.and_then(|fetched| fetched.get(symbol)) {
                prices.insert(symbol.clone(), price);
            } else if ledger.last_price > 0.0 {
                prices.insert(symbol.clone(), ledger.last_price);
            }
        }
        prices
    }

    /// Asset symbols held or traded, for the price refresh request.
    pub fn symbols(&self) -> Vec<String> {
        self.assets.keys().cloned().collect()
    }
}
