pub use self::stats::*;

pub mod portfolio;
pub mod report;
mod stats;
pub mod tax;
pub mod transaction;
