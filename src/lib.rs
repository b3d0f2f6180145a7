#![forbid(unsafe_code)]

pub mod basis;
pub mod client;
pub mod errors;
pub mod imports;
pub mod model;
pub mod util;
