use crate::core::{Error, RateProvider, RateReading};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Layout of the upstream JSON body.
///
/// The two public APIs disagree on where the bid lives; each gets its own
/// decode type rather than a lenient union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteShape {
    /// `{"bid": "5.25"}`
    Flat,
    /// `{"USDBRL": {"bid": "5.25"}}`
    UsdBrl,
}

#[derive(Debug, Deserialize)]
struct FlatQuote {
    bid: String,
}

#[derive(Debug, Deserialize)]
struct UsdBrlQuote {
    #[serde(rename = "USDBRL")]
    usd_brl: FlatQuote,
}

impl QuoteShape {
    fn decode(self, body: &[u8]) -> Result<RateReading, Error> {
        let bid = match self {
            QuoteShape::Flat => serde_json::from_slice::<FlatQuote>(body)?.bid,
            QuoteShape::UsdBrl => serde_json::from_slice::<UsdBrlQuote>(body)?.usd_brl.bid,
        };
        Ok(RateReading::new(bid))
    }
}

/// Fetches the current rate from a fixed URL with a reusable client.
pub struct HttpRateFetcher {
    client: reqwest::Client,
    url: String,
    shape: QuoteShape,
}

impl HttpRateFetcher {
    /// `env_name` names the setting the URL came from, for the error raised
    /// when it is blank.
    pub fn new(url: &str, shape: QuoteShape, env_name: &'static str) -> Result<Self, Error> {
        if url.trim().is_empty() {
            return Err(Error::ConfigMissing(env_name));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("xrate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::RequestBuild)?;

        Ok(Self {
            client,
            url: url.to_string(),
            shape,
        })
    }

    pub async fn fetch(&self, timeout: Duration) -> Result<RateReading, Error> {
        let request = self
            .client
            .get(&self.url)
            .timeout(timeout)
            .build()
            .map_err(Error::RequestBuild)?;

        debug!("Requesting exchange rate from {}", self.url);
        let response = self
            .client
            .execute(request)
            .await
            .map_err(Error::Transport)?;

        if !response.status().is_success() {
            return Err(Error::Status(response.status()));
        }

        // The request timeout also bounds reading the body.
        let body = response.bytes().await.map_err(Error::Transport)?;
        let reading = self.shape.decode(&body)?;
        debug!(bid = %reading, "Received exchange rate");
        Ok(reading)
    }
}

#[async_trait]
impl RateProvider for HttpRateFetcher {
    #[instrument(name = "RateFetch", skip(self), fields(url = %self.url))]
    async fn fetch_rate(&self, timeout: Duration) -> Result<RateReading, Error> {
        self.fetch(timeout).await
    }
}
