//! BLS public data API integration.
//!
//! One call to [`BlsClient::fetch_series`] issues exactly one POST and turns
//! `Results.series[0].data` into monthly [`Observation`]s. Retries are left to
//! the caller.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{Observation, month_start};
use crate::error::{AppError, ErrorKind};

pub const DEFAULT_API_URL: &str = "https://api.bls.gov/publicAPI/v2/timeseries/data/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const STATUS_NOT_PROCESSED: &str = "REQUEST_NOT_PROCESSED";

/// Connection settings for the statistics API.
#[derive(Debug, Clone)]
pub struct BlsConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for BlsConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl BlsConfig {
    /// Read `BLS_API_URL` / `BLS_API_KEY` (including from `.env`), falling back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let api_url = std::env::var("BLS_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_key = std::env::var("BLS_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());
        Self {
            api_url,
            api_key,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Raw HTTP reply: status code plus body text.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Blocking JSON POST. Implementations map transport failures (including
/// timeouts) to `RemoteUnavailable`; status handling is left to the caller.
pub trait Transport {
    fn post_json(&self, url: &str, body: String) -> Result<HttpReply, AppError>;
}

/// `reqwest` blocking transport with an explicit request timeout.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::new(
                ErrorKind::RemoteUnavailable,
                format!("Failed to build HTTP client: {e}"),
            )
        })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, body: String) -> Result<HttpReply, AppError> {
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| {
                let what = if e.is_timeout() { "timed out" } else { "failed" };
                AppError::new(ErrorKind::RemoteUnavailable, format!("BLS request {what}: {e}"))
            })?;

        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| {
            AppError::new(
                ErrorKind::RemoteUnavailable,
                format!("Failed to read BLS response body: {e}"),
            )
        })?;
        Ok(HttpReply { status, body })
    }
}

pub struct BlsClient<T: Transport = HttpTransport> {
    transport: T,
    config: BlsConfig,
}

impl BlsClient<HttpTransport> {
    pub fn new(config: BlsConfig) -> Result<Self, AppError> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self { transport, config })
    }
}

impl<T: Transport> BlsClient<T> {
    pub fn with_transport(transport: T, config: BlsConfig) -> Self {
        Self { transport, config }
    }

    /// Fetch one series for `start_year..=end_year`.
    ///
    /// Observations come back in the order the API reports them (BLS sends
    /// newest first); sort before relying on order.
    pub fn fetch_series(
        &self,
        series_id: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<Observation>, AppError> {
        let series_id = series_id.trim();
        if series_id.is_empty() {
            return Err(AppError::new(ErrorKind::InvalidInput, "Series id must not be empty."));
        }
        if start_year > end_year {
            return Err(AppError::new(
                ErrorKind::InvalidInput,
                format!("Invalid year range: start {start_year} is after end {end_year}."),
            ));
        }

        let request = SeriesRequest {
            seriesid: [series_id],
            startyear: start_year.to_string(),
            endyear: end_year.to_string(),
            registrationkey: self.config.api_key.as_deref(),
        };
        let body = serde_json::to_string(&request).map_err(|e| {
            AppError::new(ErrorKind::InvalidInput, format!("Failed to encode BLS request: {e}"))
        })?;

        info!(series_id, start_year, end_year, url = %self.config.api_url, "requesting series");
        let reply = self.transport.post_json(&self.config.api_url, body)?;

        if !(200..300).contains(&reply.status) {
            return Err(AppError::new(
                ErrorKind::RemoteUnavailable,
                format!("BLS request failed with status {}.", reply.status),
            ));
        }

        let observations = parse_response(&reply.body)?;
        debug!(series_id, n = observations.len(), "parsed series");
        Ok(observations)
    }
}

#[derive(Debug, Serialize)]
struct SeriesRequest<'a> {
    seriesid: [&'a str; 1],
    startyear: String,
    endyear: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    registrationkey: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    status: Option<String>,
    #[serde(default)]
    message: Vec<String>,
    #[serde(rename = "Results")]
    results: Option<ResultsBlock>,
}

#[derive(Debug, Deserialize)]
struct ResultsBlock {
    series: Option<Vec<SeriesBlock>>,
}

#[derive(Debug, Deserialize)]
struct SeriesBlock {
    data: Option<Vec<Datum>>,
}

#[derive(Debug, Deserialize)]
struct Datum {
    year: String,
    period: String,
    value: String,
}

/// Parse a BLS timeseries response body into observations.
pub fn parse_response(body: &str) -> Result<Vec<Observation>, AppError> {
    let malformed = |msg: String| AppError::new(ErrorKind::MalformedResponse, msg);

    let resp: SeriesResponse = serde_json::from_str(body)
        .map_err(|e| malformed(format!("Failed to parse BLS response: {e}")))?;

    if resp.status.as_deref() == Some(STATUS_NOT_PROCESSED) {
        return Err(AppError::new(
            ErrorKind::RemoteUnavailable,
            format!("BLS did not process the request: {}", resp.message.join("; ")),
        ));
    }
    for msg in &resp.message {
        warn!("BLS: {msg}");
    }

    let data = resp
        .results
        .ok_or_else(|| malformed("BLS response has no `Results` block.".to_string()))?
        .series
        .ok_or_else(|| malformed("BLS response has no `Results.series` list.".to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| malformed("BLS response `Results.series` is empty.".to_string()))?
        .data
        .ok_or_else(|| malformed("BLS series entry has no `data` list.".to_string()))?;

    let mut out = Vec::with_capacity(data.len());
    for datum in data {
        if let Some(obs) = parse_datum(&datum).map_err(malformed)? {
            out.push(obs);
        }
    }
    Ok(out)
}

/// `Ok(None)` for entries that are not monthly readings (annual averages)
/// or that BLS marks as unavailable.
fn parse_datum(datum: &Datum) -> Result<Option<Observation>, String> {
    let year: i32 = datum
        .year
        .trim()
        .parse()
        .map_err(|_| format!("Invalid year '{}' in BLS data.", datum.year))?;

    let Some(month) = parse_period(&datum.period)? else {
        return Ok(None);
    };

    let Some(value) = parse_value(&datum.value) else {
        debug!(year, month, raw = %datum.value, "skipping unavailable value");
        return Ok(None);
    };
    if !value.is_finite() || value < 0.0 {
        return Err(format!("Invalid value '{}' for {year}-{month:02}.", datum.value));
    }

    let date = month_start(year, month)
        .ok_or_else(|| format!("Invalid date {year}-{month:02} in BLS data."))?;
    Ok(Some(Observation { date, value }))
}

/// `M01`..`M12` map to a month; `M13` (annual average) maps to `None`.
fn parse_period(raw: &str) -> Result<Option<u32>, String> {
    let raw = raw.trim();
    let month = raw
        .strip_prefix('M')
        .and_then(|m| m.parse::<u32>().ok())
        .ok_or_else(|| format!("Unsupported period code '{raw}' (expected monthly M01..M12)."))?;
    match month {
        1..=12 => Ok(Some(month)),
        13 => Ok(None),
        _ => Err(format!("Unsupported period code '{raw}'.")),
    }
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    trimmed.parse::<f64>().ok()
}
