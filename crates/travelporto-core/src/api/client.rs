//! API client for communicating with the STCP REST API.
//!
//! This module provides the `ApiClient` struct for making keyed requests to
//! the stop, route and arrival endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{Envelope, RealtimeArrival, Route, RouteStops, ScheduledArrival, Stop};

use super::{ApiError, TransitApi};

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the API key on every request
const API_KEY_HEADER: &str = "x-api-key";

/// Agency prefix shared by every endpoint path
const AGENCY_PATH: &str = "stcp";

/// API client for the transit backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client for `base_url`, authenticating with `api_key`.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot be used as a base: {}", base_url);
        }

        let mut key = header::HeaderValue::from_str(api_key).context("API key is not a valid header value")?;
        key.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Build an endpoint URL below the agency prefix, percent-encoding every
    /// segment. An empty final segment yields a trailing slash.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(AGENCY_PATH).extend(segments);
        }
        url
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    fn decode_envelope<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T, ApiError> {
        serde_json::from_str::<Envelope<T>>(body)
            .map(|envelope| envelope.data)
            .map_err(|e| ApiError::decode(url.as_str(), &e))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> Result<T, ApiError> {
        debug!(url = %url, "GET");
        let response = self.client.get(url.clone()).query(query).send().await?;
        let response = Self::check_response(response).await?;
        let body = response.text().await?;
        Self::decode_envelope(&url, &body)
    }
}

#[async_trait]
impl TransitApi for ApiClient {
    async fn fetch_stops(&self) -> Result<Vec<Stop>, ApiError> {
        self.get(self.endpoint(&["stops", ""]), &[]).await
    }

    async fn fetch_routes(&self) -> Result<Vec<Route>, ApiError> {
        self.get(self.endpoint(&["routes", ""]), &[]).await
    }

    async fn fetch_route_stops(&self, route_id: &str) -> Result<RouteStops, ApiError> {
        self.get(self.endpoint(&["routes", route_id, "stops"]), &[]).await
    }

    async fn fetch_route_direction_stops(
        &self,
        route_id: &str,
        direction_id: u32,
        headsign: &str,
    ) -> Result<RouteStops, ApiError> {
        let query = [
            ("direction_id", direction_id.to_string()),
            ("headsign", headsign.to_string()),
        ];
        self.get(self.endpoint(&["routes", route_id, "stops"]), &query).await
    }

    async fn fetch_scheduled_arrivals(&self, stop_id: &str) -> Result<Vec<ScheduledArrival>, ApiError> {
        let query = [("all", "false".to_string())];
        self.get(self.endpoint(&["stops", stop_id, "scheduled"]), &query).await
    }

    async fn fetch_realtime_arrivals(&self, stop_id: &str) -> Result<Vec<RealtimeArrival>, ApiError> {
        self.get(self.endpoint(&["stops", stop_id, "realtime"]), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, "test-key", Duration::from_secs(5)).expect("Failed to build client")
    }

    #[test]
    fn test_endpoint_paths() {
        let api = client("https://api.example.pt/v1");
        assert_eq!(api.endpoint(&["stops", ""]).as_str(), "https://api.example.pt/v1/stcp/stops/");
        assert_eq!(
            api.endpoint(&["routes", "200", "stops"]).as_str(),
            "https://api.example.pt/v1/stcp/routes/200/stops"
        );

        // Trailing slash on the base does not double up
        let api = client("https://api.example.pt/v1/");
        assert_eq!(api.endpoint(&["routes", ""]).as_str(), "https://api.example.pt/v1/stcp/routes/");
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let api = client("https://api.example.pt");
        assert_eq!(
            api.endpoint(&["routes", "1M/2", "stops"]).as_str(),
            "https://api.example.pt/stcp/routes/1M%2F2/stops"
        );
    }

    #[test]
    fn test_new_rejects_bad_config() {
        assert!(ApiClient::new("not a url", "key", Duration::from_secs(5)).is_err());
        assert!(ApiClient::new("mailto:someone@example.pt", "key", Duration::from_secs(5)).is_err());
        assert!(ApiClient::new("https://api.example.pt", "bad\nkey", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_decode_envelope() {
        let url = Url::parse("https://api.example.pt/stcp/stops/").expect("valid url");
        let body = r#"{"data":[{"id":"S1","name":"One","coordinates":{"latitude":41.1,"longitude":-8.6},"zone_id":"PRT1"}]}"#;
        let stops: Vec<Stop> = ApiClient::decode_envelope(&url, body).expect("Failed to decode stops");
        assert_eq!(stops.len(), 1);

        // Payload without the envelope is a decode failure, not an empty list
        let err = ApiClient::decode_envelope::<Vec<Stop>>(&url, "[]").unwrap_err();
        assert!(matches!(err, ApiError::Decode { ref url, .. } if url.ends_with("/stops/")));
    }
}
