//! Stdout rendering of a settled portfolio.

use crate::model::portfolio::Portfolio;
use crate::model::tax;
use std::collections::BTreeMap;
use std::fmt::Display;

/// A portfolio paired with resolved current prices, ready to render.
///
/// The price overlay happens here, after the engine has finished; the
/// ledgers themselves are never touched by a price refresh.
pub struct Report<'a> {
    portfolio: &'a Portfolio,
    prices: &'a BTreeMap<String, f64>,
}

impl<'a> Report<'a> {
    pub fn new(portfolio: &'a Portfolio, prices: &'a BTreeMap<String, f64>) -> Self {
        Self { portfolio, prices }
    }
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let portfolio = self.portfolio;
        let prices = self.prices;

        writeln!(f, "Portfolio Summary (LIFO)")?;
        writeln!(f, "========= ======= ======")?;
        writeln!(f)?;

        if let Some(range) = &portfolio.date_range {
            writeln!(
                f,
                "Period:            {} .. {}",
                range.start.format("%Y-%m-%d"),
                range.end.format("%Y-%m-%d")
            )?;
        }

        let realized = portfolio.realized_pnl();
        let unrealized = portfolio.unrealized_pnl(prices);
        let income = realized + unrealized;
        let rate_percent = tax::marginal_rate(income) * 100.0;

        writeln!(f, "Fiat deposited:    {}", format_jpy(portfolio.fiat_deposited))?;
        writeln!(f, "Cash balance:      {}", format_jpy(portfolio.cash_balance()))?;
        writeln!(f, "Asset valuation:   {}", format_jpy(portfolio.asset_value(prices)))?;
        writeln!(f, "Fee cost:          {}", format_jpy(portfolio.fee_cost(prices)))?;
        writeln!(f, "Realized P&L:      {}", format_jpy(realized))?;
        writeln!(f, "Unrealized P&L:    {}", format_jpy(unrealized))?;
        writeln!(f, "Total P&L:         {}", format_jpy(income))?;
        writeln!(
            f,
            "Estimated tax:     {} ({rate_percent:.0}% bracket)",
            format_jpy(tax::estimate_tax(income))
        )?;
        writeln!(f)?;

        writeln!(
            f,
            "{:<8} {:>14} {:>14} {:>14} {:>16} {:>16} {:>16} {:>16}",
            "Asset", "Bought", "Sold", "Holdings", "Avg Price", "Price", "Realized", "Unrealized"
        )?;

        // Most interesting assets first: descending absolute realized P&L.
        let mut assets: Vec<_> = portfolio
            .assets
            .iter()
            .filter(|(_, ledger)| ledger.has_activity())
            .collect();
        assets.sort_by(|a, b| {
            b.1.realized_pnl
                .abs()
                .total_cmp(&a.1.realized_pnl.abs())
        });

        for (symbol, ledger) in &assets {
            let price = prices.get(*symbol).copied().unwrap_or(0.0);
            let unrealized = if ledger.current_holdings() > 0.0 {
                format_jpy(ledger.unrealized_pnl(price))
            } else {
                "-".to_string()
            };
            let average = if ledger.average_price() > 0.0 {
                format_jpy(ledger.average_price())
            } else {
                "-".to_string()
            };

            writeln!(
                f,
                "{:<8} {:>14} {:>14} {:>14} {:>16} {:>16} {:>16} {:>16}",
                symbol,
                format_quantity(ledger.total_bought),
                format_quantity(ledger.total_sold),
                format_quantity(ledger.current_holdings()),
                average,
                if price > 0.0 { format_jpy(price) } else { "-".to_string() },
                format_jpy(ledger.realized_pnl),
                unrealized,
            )?;
        }

        // Flags come from the full asset map: an over-disposed asset can end
        // with no activity at all and still needs its warning.
        let flagged: Vec<_> = portfolio
            .assets
            .iter()
            .filter(|(_, ledger)| ledger.uncovered_disposal > 0.0)
            .collect();
        if !flagged.is_empty() {
            writeln!(f)?;
            for (symbol, ledger) in flagged {
                writeln!(
                    f,
                    "⚠ {symbol}: disposals exceeded recorded holdings by {}; \
                     realized cost basis is understated",
                    format_quantity(ledger.uncovered_disposal)
                )?;
            }
        }

        Ok(())
    }
}

/// Format a JPY amount: rounded to whole yen, thousands-separated, with a
/// leading sign for losses.
pub(crate) fn format_jpy(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let negative = rounded < 0;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-¥{grouped}")
    } else {
        format!("¥{grouped}")
    }
}

/// Format an asset quantity: tiny dust amounts keep full precision so they
/// do not render as zero.
pub(crate) fn format_quantity(quantity: f64) -> String {
    if quantity != 0.0 && quantity.abs() < 0.01 {
        format!("{quantity:.8}")
    } else {
        format!("{quantity:.4}")
    }
}
