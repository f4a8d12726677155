//! Timeo realtime API HTTP client.
//!
//! One client per bus network. Endpoints are distinguished by query
//! parameters against a single per-network URL; the slow-moving listing
//! calls (lines, stops) go through a short-lived cache while realtime
//! schedule calls always hit the network. The most recent raw body is
//! retained for diagnostics. The client never retries: a failed call is the
//! caller's to re-issue.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use moka::future::Cache;
use tracing::debug;

use crate::domain::{Line, Stop, StopSchedule, TrafficAlert};

use super::convert;
use super::error::TimeoError;
use super::provider::BusDataProvider;
use super::types::PreHome;
use super::xml;

/// Default base URL of the realtime relay; the endpoint for a network is
/// `{base}{network}.php`.
const DEFAULT_BASE_URL: &str = "http://timeo3.keolis.com/relais/";

/// Default URL of the pre-home payload carrying the global traffic alert.
const DEFAULT_PRE_HOME_URL: &str =
    "http://twisto.fr/module/mobile/App2014/utils/getPreHome.php";

/// Caen (Twisto), the network this started on.
const DEFAULT_NETWORK_CODE: u32 = 147;

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the Timeo client.
#[derive(Debug, Clone)]
pub struct TimeoConfig {
    /// Code of the city's bus network.
    pub network_code: u32,
    /// Base URL for the realtime relay.
    pub base_url: String,
    /// URL of the pre-home payload.
    pub pre_home_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// TTL for cached listing responses.
    pub cache_ttl: Duration,
    /// Maximum number of cached listing responses.
    pub cache_capacity: u64,
}

impl TimeoConfig {
    pub fn new() -> Self {
        Self {
            network_code: DEFAULT_NETWORK_CODE,
            base_url: DEFAULT_BASE_URL.to_string(),
            pre_home_url: DEFAULT_PRE_HOME_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_ttl: Duration::from_secs(600),
            cache_capacity: 64,
        }
    }

    /// Target a different bus network.
    pub fn with_network_code(mut self, code: u32) -> Self {
        self.network_code = code;
        self
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set a custom pre-home URL (for testing).
    pub fn with_pre_home_url(mut self, url: impl Into<String>) -> Self {
        self.pre_home_url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for TimeoConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client for the Timeo realtime API.
#[derive(Clone)]
pub struct TimeoClient {
    http: reqwest::Client,
    endpoint: String,
    pre_home_url: String,
    /// Raw bodies of cacheable listing calls, keyed by query string.
    listings: Cache<String, Arc<String>>,
    /// Most recent raw body received from the network.
    last_response: Arc<Mutex<Option<String>>>,
}

impl TimeoClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TimeoConfig) -> Result<Self, TimeoError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let listings = Cache::builder()
            .time_to_live(config.cache_ttl)
            .max_capacity(config.cache_capacity)
            .build();

        Ok(Self {
            http,
            endpoint: format!("{}{}.php", config.base_url, config.network_code),
            pre_home_url: config.pre_home_url,
            listings,
            last_response: Arc::new(Mutex::new(None)),
        })
    }

    /// The per-network endpoint URL this client talks to.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint
    }

    /// The raw body of the most recent network response, for diagnostics.
    pub fn last_response(&self) -> Option<String> {
        self.last_response.lock().ok().and_then(|g| g.clone())
    }

    /// Enumerate every line variant on the network.
    pub async fn get_lines(&self) -> Result<Vec<Line>, TimeoError> {
        let body = self.cached_request("xml=1".to_string()).await?;
        let doc = xml::decode_listing(&body)?;
        convert::lines_from_listing(&doc)
    }

    /// Enumerate the stops of one line variant.
    pub async fn get_stops(&self, line: &Line) -> Result<Vec<Stop>, TimeoError> {
        let params = format!("xml=1&ligne={}&sens={}", line.details.id, line.direction.id);
        let body = self.cached_request(params).await?;
        let doc = xml::decode_listing(&body)?;
        convert::stops_from_listing(&doc)
    }

    /// Look stops up by their codes, for when that is all we know about
    /// them. Zero codes are meaningless to the upstream and filtered out.
    pub async fn get_stops_by_code(&self, codes: &[i32]) -> Result<Vec<Stop>, TimeoError> {
        let joined = codes
            .iter()
            .filter(|&&code| code != 0)
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let body = self.cached_request(format!("xml=1&code={joined}")).await?;
        let doc = xml::decode_listing(&body)?;
        convert::stops_from_listing(&doc)
    }

    /// Fetch the upcoming schedule for a single stop.
    pub async fn get_single_schedule(&self, stop: &Stop) -> Result<StopSchedule, TimeoError> {
        let mut schedules = self.get_schedules(std::slice::from_ref(stop)).await?;

        if schedules.is_empty() {
            return Err(TimeoError::Parse(
                "no schedule returned for the requested stop".to_string(),
            ));
        }

        Ok(schedules.remove(0))
    }

    /// Fetch schedules for a batch of stops in one request.
    ///
    /// Stops without a usable reference are skipped; if none remain, the
    /// call short-circuits to an empty result without touching the network.
    /// Realtime data, never cached.
    pub async fn get_schedules(&self, stops: &[Stop]) -> Result<Vec<StopSchedule>, TimeoError> {
        let Some(refs) = join_references(stops) else {
            return Ok(Vec::new());
        };

        let params = format!("xml=3&refs={}&ran=1", urlencoding::encode(&refs));
        let body = self.request(&params).await?;
        let doc = xml::decode_schedules(&body)?;
        convert::schedules_from_doc(&doc, stops, Local::now().naive_local())
    }

    /// Fetch the current network-wide traffic alert, if any.
    ///
    /// Best-effort: transport and decode failures are logged and reported
    /// as "no alert" rather than propagated; the alert is decoration, not
    /// data anyone depends on.
    pub async fn global_traffic_alert(&self) -> Option<TrafficAlert> {
        match self.fetch_pre_home().await {
            Ok(alert) => alert,
            Err(e) => {
                debug!(error = %e, "pre-home fetch failed");
                None
            }
        }
    }

    async fn fetch_pre_home(&self) -> Result<Option<TrafficAlert>, TimeoError> {
        let response = self.http.get(&self.pre_home_url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(TimeoError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        self.retain(&body);

        if body.trim().is_empty() {
            return Ok(None);
        }

        let prehome: PreHome =
            serde_json::from_str(&body).map_err(|e| TimeoError::Parse(e.to_string()))?;

        Ok(convert::alert_from_prehome(prehome))
    }

    /// One GET against the per-network endpoint.
    async fn request(&self, params: &str) -> Result<String, TimeoError> {
        let url = format!("{}?{}", self.endpoint, params);
        debug!(%url, "requesting upstream");

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(TimeoError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        self.retain(&body);
        Ok(body)
    }

    async fn cached_request(&self, params: String) -> Result<String, TimeoError> {
        if let Some(body) = self.listings.get(&params).await {
            return Ok((*body).clone());
        }

        let body = self.request(&params).await?;
        self.listings
            .insert(params, Arc::new(body.clone()))
            .await;
        Ok(body)
    }

    fn retain(&self, body: &str) {
        if let Ok(mut guard) = self.last_response.lock() {
            *guard = Some(body.to_string());
        }
    }
}

impl BusDataProvider for TimeoClient {
    async fn get_lines(&self) -> Result<Vec<Line>, TimeoError> {
        TimeoClient::get_lines(self).await
    }

    async fn get_stops(&self, line: &Line) -> Result<Vec<Stop>, TimeoError> {
        TimeoClient::get_stops(self, line).await
    }

    async fn get_single_schedule(&self, stop: &Stop) -> Result<StopSchedule, TimeoError> {
        TimeoClient::get_single_schedule(self, stop).await
    }

    async fn get_schedules(&self, stops: &[Stop]) -> Result<Vec<StopSchedule>, TimeoError> {
        TimeoClient::get_schedules(self, stops).await
    }
}

/// Join the usable references of a batch, `;`-separated.
fn join_references(stops: &[Stop]) -> Option<String> {
    let refs = stops
        .iter()
        .map(|s| s.reference.as_str())
        .filter(|r| !r.is_empty())
        .collect::<Vec<_>>()
        .join(";");

    (!refs.is_empty()).then_some(refs)
}
