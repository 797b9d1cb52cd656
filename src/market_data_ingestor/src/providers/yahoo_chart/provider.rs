use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::{Client, header};
use snafu::ResultExt;
use tracing::{debug, warn};

use crate::models::{bar::Bar, request_params::FetchWindow};
use crate::providers::{
    ApiSnafu, ClientBuildSnafu, DataProvider, DecodeSnafu, InvalidHeaderSnafu, ProviderError,
    ProviderInitError, ReqwestSnafu,
    yahoo_chart::{
        params::{construct_params, validate_window},
        response::ChartEnvelope,
    },
};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) series-sync";

/// Connection settings for [`YahooChartProvider`].
#[derive(Debug, Clone)]
pub struct YahooChartConfig {
    /// Scheme and host, without a trailing slash.
    pub base_url: String,
    pub user_agent: String,
    pub timeout: StdDuration,
}

impl Default for YahooChartConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: StdDuration::from_secs(30),
        }
    }
}

pub struct YahooChartProvider {
    client: Client,
    base_url: String,
}

impl YahooChartProvider {
    /// Creates a new Yahoo chart provider.
    pub fn new(config: YahooChartConfig) -> Result<Self, ProviderInitError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&config.user_agent).context(InvalidHeaderSnafu {
                header: "User-Agent",
            })?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }
}

#[async_trait]
impl DataProvider for YahooChartProvider {
    async fn fetch_bars(&self, window: &FetchWindow) -> Result<Vec<Bar>, ProviderError> {
        validate_window(window)?;

        let response = self
            .client
            .get(self.chart_url(&window.symbol))
            .query(&construct_params(window))
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        let body = response.text().await.context(ReqwestSnafu)?;

        // Yahoo reports errors inside the JSON envelope, often with a 4xx status,
        // so the body is decoded before the status is judged.
        let envelope = match serde_json::from_str::<ChartEnvelope>(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return ApiSnafu {
                    message: format!("HTTP {status}: {}", truncate(&body, 200)),
                }
                .fail();
            }
            Err(e) => return Err(e).context(DecodeSnafu),
        };

        if let Some(err) = envelope.chart.error {
            if err.is_no_data() {
                debug!(symbol = %window.symbol, granularity = %window.granularity, "provider has no rows for window");
                return Ok(Vec::new());
            }
            return ApiSnafu {
                message: format!(
                    "{}: {}",
                    err.code,
                    err.description.unwrap_or_default()
                ),
            }
            .fail();
        }

        if !status.is_success() {
            return ApiSnafu {
                message: format!("HTTP {status}"),
            }
            .fail();
        }

        let bars: Vec<Bar> = envelope
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .flat_map(|r| r.into_bars())
            .collect();

        if bars.is_empty() {
            warn!(symbol = %window.symbol, granularity = %window.granularity, start = %window.start, end = %window.end, "empty chart result");
        }
        Ok(bars)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let provider = YahooChartProvider::new(YahooChartConfig {
            base_url: "http://localhost:9999/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            provider.chart_url("BTC-USD"),
            "http://localhost:9999/v8/finance/chart/BTC-USD"
        );
    }

    #[test]
    fn invalid_user_agent_is_rejected() {
        let res = YahooChartProvider::new(YahooChartConfig {
            user_agent: "bad\nagent".to_string(),
            ..Default::default()
        });
        assert!(matches!(res, Err(ProviderInitError::InvalidHeader { .. })));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
