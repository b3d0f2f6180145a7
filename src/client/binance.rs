use super::ClientError;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, trace, warn};
use ureq::Agent;

/// Ticker response, e.g. `{"symbol":"BTCUSDT","price":"97012.34000000"}`.
/// The price is a decimal string, not a JSON number.
#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

/// Spot-price client for the Binance public ticker API.
pub struct BinanceClient {
    agent: Agent,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            agent: super::create_agent(),
            base_url: base_url.into(),
        }
    }

    /// Current price of `symbol` against USDT.
    pub fn ticker_price(&self, symbol: &str) -> Result<f64, ClientError> {
        let url = format!(
            "{base}/api/v3/ticker/price?symbol={symbol}USDT",
            base = self.base_url
        );

        let start = Instant::now();
        let mut resp = self.agent.get(&url).call()?;
        let ticker: TickerPrice = resp.body_mut().read_json()?;
        let dur = start.elapsed();

        info!("Ticker `{symbol}USDT` received in {dur:?}");
        trace!("{ticker:#?}");

        ticker
            .price
            .parse::<f64>()
            .map_err(|_| ClientError::MalformedPrice(ticker.price))
    }

    /// Best-effort prices for a list of symbols. Feed misses (unknown pair,
    /// network hiccup) are logged and skipped so the caller can fall back to
    /// last trade prices per asset.
    pub(crate) fn usd_prices(&self, symbols: &[String]) -> HashMap<String, f64> {
        symbols
            .iter()
            .filter_map(|symbol| match self.ticker_price(symbol) {
                Ok(price) => Some((symbol.clone(), price)),
                Err(err) => {
                    warn!("No Binance price for `{symbol}`: {err}");
                    None
                }
            })
            .collect()
    }
}
