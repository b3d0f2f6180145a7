//! Exchange transaction export (CSV) reader and normalizer.
//!
//! The import is deliberately best-effort: a malformed cell defaults to
//! 0/unset and the row is still processed, because broker exports are messy
//! in practice. Only a file that cannot be read as CSV at all fails the run.

use crate::model::portfolio::{DateRange, NormalizedImport};
use crate::model::transaction::{Transaction, TxKind};
use crate::model::Stats;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// The fiat currency code. Rows for this symbol are cash movements, not
/// asset activity, and are excluded from the per-asset ledgers.
pub const FIAT_SYMBOL: &str = "JPY";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV Error")]
    Csv(#[from] csv::Error),

    #[error("FS Error")]
    Fs(#[from] std::io::Error),
}

/// Raw export row. Column names are the exchange's Japanese headers; the
/// English aliases cover localized exports of the same format. Every field
/// is kept as a string and parsed defensively afterwards.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ExportCsvRow {
    #[serde(rename = "通貨1", alias = "currency")]
    pub(crate) asset: String,

    #[serde(rename = "取引種別", alias = "type")]
    pub(crate) kind: String,

    #[serde(rename = "通貨1数量", alias = "amount", default)]
    pub(crate) quantity: String,

    #[serde(rename = "取引価格", alias = "price", default)]
    pub(crate) price: String,

    #[serde(rename = "手数料", alias = "fee", default)]
    pub(crate) fee: String,

    #[serde(rename = "通貨2数量", alias = "jpy_amount", default)]
    pub(crate) fiat_amount: String,

    #[serde(rename = "取引日時", alias = "date", default)]
    pub(crate) time: String,
}

/// Read one export CSV and normalize it into asset-grouped transactions.
pub fn read_export(s: &mut Stats, path: impl AsRef<Path>) -> Result<NormalizedImport, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .from_path(path)?;

    debug!("Parsing export rows");
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let record: ExportCsvRow = result?;
        debug!("Deserialized: {record:?}");
        rows.push(record);
    }

    Ok(normalize(s, rows))
}

/// Parse a numeric cell: thousands separators stripped, then the longest
/// numeric prefix wins, so a stray unit suffix like `1.5 BTC` keeps its
/// amount. A cell with no numeric prefix (or a non-finite one) becomes 0.
pub(crate) fn parse_number(cell: &str) -> f64 {
    let cleaned: String = cell.trim().replace(',', "");
    (0..=cleaned.len())
        .rev()
        .filter(|&end| cleaned.is_char_boundary(end))
        .find_map(|end| cleaned[..end].parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Parse a timestamp cell against the formats seen in real exports. `None`
/// excludes the row from date-range tracking only; it is still replayed.
pub(crate) fn parse_time(cell: &str) -> Option<DateTime<Utc>> {
    let cell = cell.trim();

    for format in ["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(cell, format) {
            return Some(naive.and_utc());
        }
    }

    DateTime::parse_from_rfc3339(cell)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn normalize(s: &mut Stats, rows: Vec<ExportCsvRow>) -> NormalizedImport {
    let mut import = NormalizedImport::default();

    for row in rows {
        s.inc_rows();

        let quantity = parse_number(&row.quantity);
        let unit_price = parse_number(&row.price);
        let fee = parse_number(&row.fee);
        let fiat_amount = parse_number(&row.fiat_amount);

        let time = parse_time(&row.time);
        match time {
            Some(time) => DateRange::extend(&mut import.date_range, time),
            None => s.inc_undated(),
        }

        if row.asset == FIAT_SYMBOL {
            // Only cash deposits matter here; withdrawals and transfers of
            // fiat have no cost-basis consequences.
            s.inc_fiat();
            if matches!(row.kind.parse::<TxKind>(), Ok(TxKind::Deposit)) {
                let amount = if fiat_amount != 0.0 { fiat_amount } else { quantity };
                import.fiat_deposited += amount.abs();
            }
            continue;
        }

        let Ok(kind) = row.kind.parse::<TxKind>() else {
            debug!("Skipping row with unhandled kind {:?}", row.kind);
            s.inc_skipped();
            continue;
        };

        import
            .transactions
            .entry(row.asset)
            .or_default()
            .push(Transaction {
                time,
                kind,
                quantity: quantity.abs(),
                unit_price,
                fee: fee.abs(),
                fiat_amount: fiat_amount.abs(),
            });
    }

    import
}
