//! Thin client for the Circonus v2 REST API.
//!
//! Each resource module adds typed fetch/create/update/delete/search calls on
//! top of the raw verbs defined here.

pub mod broker;
pub mod check;
pub mod check_bundle;
pub mod metric_cluster;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::config::ApiConfig;
use crate::constants;
use crate::error::{CheckError, Result};
use crate::telemetry;

pub use broker::{Broker, BrokerDetail};
pub use check::Check;
pub use check_bundle::{CheckBundle, CheckBundleConfig, CheckBundleMetric};
pub use metric_cluster::{MetricCluster, MetricClusterExtras, MetricQuery};

static CHECK_CID: Lazy<Regex> = Lazy::new(|| Regex::new(constants::CHECK_CID_REGEX).expect("valid check CID regex"));
static CHECK_BUNDLE_CID: Lazy<Regex> =
    Lazy::new(|| Regex::new(constants::CHECK_BUNDLE_CID_REGEX).expect("valid check bundle CID regex"));
static BROKER_CID: Lazy<Regex> = Lazy::new(|| Regex::new(constants::BROKER_CID_REGEX).expect("valid broker CID regex"));
static METRIC_CLUSTER_CID: Lazy<Regex> =
    Lazy::new(|| Regex::new(constants::METRIC_CLUSTER_CID_REGEX).expect("valid metric cluster CID regex"));

/// Resource kinds addressable by CID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CidKind {
    Check,
    CheckBundle,
    Broker,
    MetricCluster,
}

impl CidKind {
    pub fn name(&self) -> &'static str {
        match self {
            CidKind::Check => "check",
            CidKind::CheckBundle => "check bundle",
            CidKind::Broker => "broker",
            CidKind::MetricCluster => "metric cluster",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            CidKind::Check => &CHECK_CID,
            CidKind::CheckBundle => &CHECK_BUNDLE_CID,
            CidKind::Broker => &BROKER_CID,
            CidKind::MetricCluster => &METRIC_CLUSTER_CID,
        }
    }
}

/// Reject empty or malformed CIDs before they reach the network.
pub fn validate_cid(kind: CidKind, cid: &str) -> Result<()> {
    if cid.is_empty() {
        return Err(CheckError::InvalidCid {
            kind: kind.name(),
            cid: "none".to_string(),
        });
    }
    if !kind.pattern().is_match(cid) {
        return Err(CheckError::InvalidCid {
            kind: kind.name(),
            cid: cid.to_string(),
        });
    }
    Ok(())
}

/// Numeric id portion of a CID such as `/check/1234`.
pub fn cid_to_id(cid: &str) -> Option<u64> {
    cid.rsplit('/').next().and_then(|s| s.parse().ok())
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    debug: bool,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(CheckError::Config("API token is required".to_string()));
        }

        // Validate early so every request can assume a well-formed base
        Url::parse(&config.url)
            .map_err(|e| CheckError::Config(format!("Invalid API URL '{}': {}", config.url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            constants::AUTH_TOKEN_HEADER,
            HeaderValue::from_str(&config.token)
                .map_err(|e| CheckError::Config(format!("Invalid API token: {}", e)))?,
        );
        headers.insert(
            constants::APP_NAME_HEADER,
            HeaderValue::from_str(&config.app)
                .map_err(|e| CheckError::Config(format!("Invalid API app name: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            debug: config.debug,
        })
    }

    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| CheckError::Config(format!("Invalid request path '{}': {}", path, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        let method_name = method_label(&method);
        telemetry::api_request(method_name);
        debug!(method = method_name, url = %url, "API request");

        let mut req = self.client.request(method, url.clone());
        if let Some(body) = body {
            req = req.header(CONTENT_TYPE, "application/json").body(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?.to_vec();

        if !status.is_success() {
            telemetry::api_error(method_name, status.as_u16());
            let message = String::from_utf8_lossy(&bytes).trim().to_string();
            return Err(CheckError::Api {
                status: status.as_u16(),
                message: format!("{} {} - {}", method_name, url.path(), message),
            });
        }

        if self.debug {
            debug!(method = method_name, url = %url, "received JSON: {}", String::from_utf8_lossy(&bytes));
        }
        Ok(bytes)
    }

    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(path, &[])?;
        self.request(Method::GET, url, None).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<u8>> {
        let url = self.endpoint(path, query)?;
        self.request(Method::GET, url, None).await
    }

    pub async fn put(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let url = self.endpoint(path, &[])?;
        self.request(Method::PUT, url, Some(body)).await
    }

    pub async fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let url = self.endpoint(path, &[])?;
        self.request(Method::POST, url, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(path, &[])?;
        self.request(Method::DELETE, url, None).await
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let body = self.get_with_query(path, query).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub(crate) async fn send_json<B, T>(&self, method: Method, path: &str, payload: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(payload)?;
        if self.debug {
            debug!(path, "sending JSON: {}", String::from_utf8_lossy(&body));
        }
        let url = self.endpoint(path, &[])?;
        let result = self.request(method, url, Some(body)).await?;
        Ok(serde_json::from_slice(&result)?)
    }
}

fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::PUT => "PUT",
        Method::POST => "POST",
        Method::DELETE => "DELETE",
        _ => "OTHER",
    }
}

/// The API is inconsistent about encoding booleans; accept `true`, `"true"` and `"1"`.
pub(crate) fn bool_or_string<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => matches!(s.as_str(), "true" | "1"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ApiConfig {
        ApiConfig {
            token: "token".to_string(),
            url: "https://api.example.com/v2/".to_string(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_validate_cid() {
        assert!(validate_cid(CidKind::Check, "/check/123").is_ok());
        assert!(validate_cid(CidKind::CheckBundle, "/check_bundle/9").is_ok());
        assert!(validate_cid(CidKind::Broker, "/broker/35").is_ok());
        assert!(validate_cid(CidKind::MetricCluster, "/metric_cluster/1").is_ok());

        assert!(validate_cid(CidKind::Check, "/check_bundle/123").is_err());
        assert!(validate_cid(CidKind::Broker, "/broker/abc").is_err());

        match validate_cid(CidKind::Check, "") {
            Err(CheckError::InvalidCid { cid, .. }) => assert_eq!(cid, "none"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_cid_to_id() {
        assert_eq!(cid_to_id("/check/1234"), Some(1234));
        assert_eq!(cid_to_id("/check/abc"), None);
        assert_eq!(cid_to_id(""), None);
    }

    #[test]
    fn test_new_requires_token() {
        let err = ApiClient::new(&ApiConfig::default()).err().unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes_query() {
        let client = ApiClient::new(&test_config()).unwrap();
        let url = client
            .endpoint("/check_bundle", &[("search", "(active:1)(tags:service:x)")])
            .unwrap();
        assert_eq!(url.path(), "/v2/check_bundle");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("search".to_string(), "(active:1)(tags:service:x)".to_string())]);
    }

    #[test]
    fn test_bool_or_string() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "bool_or_string")]
            flag: bool,
        }

        let a: Holder = serde_json::from_str(r#"{"flag": true}"#).unwrap();
        let b: Holder = serde_json::from_str(r#"{"flag": "true"}"#).unwrap();
        let c: Holder = serde_json::from_str(r#"{"flag": "false"}"#).unwrap();
        assert!(a.flag && b.flag && !c.flag);
    }
}
