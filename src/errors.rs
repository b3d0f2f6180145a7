//! One-stop shop for every error type in the crate.

pub use crate::client::ClientError;
pub use crate::imports::exchange::ImportError;
pub use crate::model::transaction::TxKindError;
