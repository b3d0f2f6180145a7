#![forbid(unsafe_code)]

use error_iter::ErrorIter as _;
use is_terminal::IsTerminal as _;
use lifotax::client::{self, Client};
use lifotax::errors::ImportError;
use lifotax::imports::exchange::read_export;
use lifotax::model::portfolio::{NormalizedImport, Portfolio};
use lifotax::model::report::Report;
use lifotax::model::Stats;
use onlyargs::CliError;
use onlyargs_derive::OnlyArgs;
use std::path::PathBuf;
use std::{env, process::ExitCode};
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

#[derive(Debug, OnlyArgs)]
#[footer = "Additional environment variables:"]
#[footer = "  - BINANCE_URL accepts a http: or https: URL for the spot ticker API"]
#[footer = "      default is \"https://api.binance.com\""]
#[footer = "  - YAHOO_URL accepts a http: or https: URL for the USD/JPY rate API"]
#[footer = "      default is \"https://query1.finance.yahoo.com\""]
#[footer = "  - TERM_COLOR accepts \"always\" to override automatic terminal sensing"]
struct Args {
    /// Read an exchange transaction history CSV from a file.
    ///   May be given multiple times to combine exports.
    ///
    #[long]
    input: Vec<PathBuf>,

    /// Skip the live price refresh and use last trade prices only.
    offline: bool,

    /// Override the current price for one asset, as `SYMBOL=JPY`.
    ///   E.g. `--price BTC=15000000`. May be given multiple times.
    ///   Takes precedence over fetched and last trade prices.
    ///
    #[long]
    price: Vec<String>,

    /// Enable verbose output.
    /// Prints row counting statistics after the report.
    verbose: bool,
}

#[derive(Debug, Error)]
enum Error {
    #[error("Failed to import {0:?}")]
    Import(PathBuf, #[source] ImportError),

    #[error("Argument parsing error")]
    Args(#[from] CliError),

    #[error("No input files. Provide at least one CSV with --input")]
    NoInput,

    #[error("Invalid price override `{0}`. Expected `SYMBOL=JPY`, e.g. `BTC=15000000`")]
    PriceOverride(String),
}

fn main() -> ExitCode {
    // Initialize the tracing subscriber for instrumentation.
    // Uses the `RUST_LOG` environment var for configuration. E.g. `RUST_LOG=debug cargo run`
    // This is very useful to see the input CSV row that caused a panic.
    //
    // See: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/struct.EnvFilter.html#directives
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let term_color = env::var("TERM_COLOR")
        .map(|color| color == "always")
        .unwrap_or_else(|_| std::io::stdout().is_terminal());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(term_color))
        .with(env_filter)
        .init();

    match run(onlyargs::parse()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            for source in err.sources().skip(1) {
                eprintln!("  Caused by: {source}");
            }

            ExitCode::FAILURE
        }
    }
}

fn run(args: Result<Args, CliError>) -> Result<(), Error> {
    let args = args?;

    if args.input.is_empty() {
        return Err(Error::NoInput);
    }

    let mut stats = Stats::default();
    let mut import = NormalizedImport::default();
    for path in args.input {
        import.merge(read_export(&mut stats, &path).map_err(|e| Error::Import(path, e))?);
    }

    let portfolio = Portfolio::from(import);

    // Refresh current prices unless running offline. A failed refresh is not
    // fatal; each asset falls back to its last trade price.
    let fetched = if args.offline {
        None
    } else {
        match client::refresh_prices(&Client::from_env(), &portfolio.symbols()) {
            Ok(prices) => Some(prices),
            Err(err) => {
                warn!("Price refresh failed, falling back to last trade prices: {err}");
                None
            }
        }
    };

    let mut prices = portfolio.resolve_prices(fetched.as_ref());
    for arg in &args.price {
        let (symbol, price) = parse_price_override(arg)?;
        prices.insert(symbol, price);
    }

    println!("{}", Report::new(&portfolio, &prices));

    if args.verbose {
        stats.pretty_print();
    }

    Ok(())
}

fn parse_price_override(arg: &str) -> Result<(String, f64), Error> {
    let (symbol, price) = arg
        .split_once('=')
        .ok_or_else(|| Error::PriceOverride(arg.to_string()))?;
    let price = price
        .trim()
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| Error::PriceOverride(arg.to_string()))?;
    if !price.is_finite() || price < 0.0 || symbol.trim().is_empty() {
        return Err(Error::PriceOverride(arg.to_string()));
    }

    Ok((symbol.trim().to_uppercase(), price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn price_overrides() {
        assert_eq!(
            parse_price_override("BTC=15000000").unwrap(),
            ("BTC".to_string(), 15_000_000.0)
        );
        assert_eq!(
            parse_price_override("eth = 450,000").unwrap(),
            ("ETH".to_string(), 450_000.0)
        );

        assert!(parse_price_override("BTC").is_err());
        assert!(parse_price_override("=100").is_err());
        assert!(parse_price_override("BTC=abc").is_err());
        assert!(parse_price_override("BTC=-1").is_err());
    }
}
