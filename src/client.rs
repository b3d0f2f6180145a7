use std::collections::{BTreeMap, HashMap};
use std::env;
use thiserror::Error;
use ureq::tls::{TlsConfig, TlsProvider};
use ureq::Agent;

pub mod binance;
pub mod yahoo;

pub use binance::BinanceClient;
pub use yahoo::YahooClient;

const DEFAULT_BINANCE_URL: &str = "https://api.binance.com";
const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request error")]
    Http(#[from] ureq::Error),

    #[error("Malformed price in response: `{0}`")]
    MalformedPrice(String),

    #[error("Rate response is missing a usable price")]
    MissingRate,
}

/// The public interface for the price feeds.
///
/// Exists as a trait so that unit tests can mock the feed responses.
pub trait PriceApi {
    /// Best-effort current USD prices for the requested symbols. Symbols the
    /// feed cannot price are absent from the result, never an error.
    fn usd_prices(&self, symbols: &[String]) -> HashMap<String, f64>;

    /// Current USD/JPY conversion rate.
    fn usd_jpy(&self) -> Result<f64, ClientError>;
}

/// Live price client backed by the Binance ticker API and the Yahoo Finance
/// USD/JPY chart.
pub struct Client {
    binance: BinanceClient,
    yahoo: YahooClient,
}

impl Client {
    /// Create a client with endpoints from `BINANCE_URL` / `YAHOO_URL`, or
    /// the public API servers by default.
    pub fn from_env() -> Self {
        let binance_url = env::var("BINANCE_URL").unwrap_or_else(|_| DEFAULT_BINANCE_URL.to_string());
        let yahoo_url = env::var("YAHOO_URL").unwrap_or_else(|_| DEFAULT_YAHOO_URL.to_string());

        Self {
            binance: BinanceClient::new(binance_url),
            yahoo: YahooClient::new(yahoo_url),
        }
    }
}

impl PriceApi for Client {
    fn usd_prices(&self, symbols: &[String]) -> HashMap<String, f64> {
        self.binance.usd_prices(symbols)
    }

    fn usd_jpy(&self) -> Result<f64, ClientError> {
        self.yahoo.usd_jpy()
    }
}

/// Fetch current JPY prices for the requested symbols.
///
/// The conversion rate is all-or-nothing: if it cannot be fetched, the whole
/// refresh fails and the caller keeps its fallback prices. Individual symbol
/// misses just leave that symbol out of the returned map.
pub fn refresh_prices(
    api: &impl PriceApi,
    symbols: &[String],
) -> Result<BTreeMap<String, f64>, ClientError> {
    let usd_jpy = api.usd_jpy()?;
    let prices = api
        .usd_prices(symbols)
        .into_iter()
        .map(|(symbol, usd)| (symbol, usd * usd_jpy))
        .collect();

    Ok(prices)
}

pub(crate) fn create_agent() -> Agent {
    Agent::from(
        Agent::config_builder()
            .tls_config(
                TlsConfig::builder()
                    .provider(TlsProvider::NativeTls)
                    .build(),
            )
            .build(),
    )
}
