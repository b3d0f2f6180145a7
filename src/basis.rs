//! The LIFO cost-basis engine: purchase lots and the per-asset replay.

pub use self::ledger::AssetLedger;
pub use self::lot::{Disposal, PurchaseLot};

mod ledger;
mod lot;
