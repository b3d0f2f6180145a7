use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxKindError {
    #[error("Unrecognized transaction kind")]
    Parse,
}

/// Closed set of transaction categories understood by the cost-basis engine.
///
/// Exchange exports label rows in Japanese; the English aliases cover
/// localized variants of the same export format.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum TxKind {
    Buy,
    Sell,
    Deposit,
    WithdrawExternal,
}

impl FromStr for TxKind {
    type Err = TxKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "買い" | "buy" | "Buy" => Ok(TxKind::Buy),
            "売り" | "sell" | "Sell" => Ok(TxKind::Sell),
            "入金" | "deposit" | "Deposit" => Ok(TxKind::Deposit),
            "外部送付" | "send" | "Send" | "withdrawal" | "Withdrawal" => {
                Ok(TxKind::WithdrawExternal)
            }
            _ => Err(TxKindError::Parse),
        }
    }
}

/// One normalized export row, scoped to a single asset.
///
/// All amounts are stored as absolute values; the sign of the original cell
/// carries no information beyond what `kind` already encodes. `time` is
/// `None` when the export's timestamp cell failed to parse. Such rows are
/// still replayed for accounting, they are only excluded from date-range
/// tracking.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Transaction {
    pub time: Option<DateTime<Utc>>,
    pub kind: TxKind,

    /// Asset units moved, excluding any fee semantics.
    pub quantity: f64,

    /// Execution price per unit in JPY. 0 for deposits and transfers.
    pub unit_price: f64,

    /// Fee denominated in asset units.
    pub fee: f64,

    /// Total JPY exchanged, when applicable.
    pub fiat_amount: f64,
}
