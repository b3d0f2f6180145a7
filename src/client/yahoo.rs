use super::ClientError;
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, trace};
use ureq::Agent;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Vec<ChartResult>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
}

/// USD/JPY rate client for the Yahoo Finance chart API.
pub struct YahooClient {
    agent: Agent,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            agent: super::create_agent(),
            base_url: base_url.into(),
        }
    }

    /// Current USD/JPY conversion rate, preferring the live market price and
    /// falling back to the previous close.
    pub fn usd_jpy(&self) -> Result<f64, ClientError> {
        let url = format!(
            "{base}/v8/finance/chart/USDJPY=X?interval=1d&range=1d",
            base = self.base_url
        );

        let start = Instant::now();
        let mut resp = self.agent.get(&url).call()?;
        let chart: ChartResponse = resp.body_mut().read_json()?;
        let dur = start.elapsed();

        info!("USD/JPY rate received in {dur:?}");
        trace!("{chart:#?}");

        let meta = &chart
            .chart
            .result
            .first()
            .ok_or(ClientError::MissingRate)?
            .meta;

        meta.regular_market_price
            .or(meta.previous_close)
            .filter(|rate| *rate > 0.0)
            .ok_or(ClientError::MissingRate)
    }
}
