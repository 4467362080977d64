//! Check bundle API support - fetch, create, update, delete, and search

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{bool_or_string, validate_cid, ApiClient, CidKind};
use crate::constants;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckBundleConfig {
    #[serde(default, deserialize_with = "bool_or_string")]
    pub async_metrics: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub submission_url: String,
    #[serde(rename = "reverse:secret_key", default, skip_serializing_if = "String::is_empty")]
    pub reverse_secret_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckBundleMetric {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CheckBundleMetric {
    pub fn is_active(&self) -> bool {
        self.status == constants::STATUS_ACTIVE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckBundle {
    #[serde(rename = "_cid", default, skip_serializing_if = "String::is_empty")]
    pub cid: String,
    #[serde(rename = "_checks", default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<String>,
    #[serde(rename = "_check_uuids", default, skip_serializing_if = "Vec::is_empty")]
    pub check_uuids: Vec<String>,
    #[serde(rename = "_created", default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(rename = "_last_modified", default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
    #[serde(rename = "_last_modified_by", default, skip_serializing_if = "String::is_empty")]
    pub last_modified_by: String,
    #[serde(rename = "_reverse_connection_urls", default, skip_serializing_if = "Vec::is_empty")]
    pub reverse_connection_urls: Vec<String>,
    #[serde(default)]
    pub brokers: Vec<String>,
    #[serde(default)]
    pub config: CheckBundleConfig,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub metrics: Vec<CheckBundleMetric>,
    #[serde(default)]
    pub metric_limit: i32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub period: u32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub timeout: f32,
    #[serde(rename = "type", default)]
    pub check_type: String,
}

impl CheckBundle {
    pub fn is_active(&self) -> bool {
        self.status == constants::STATUS_ACTIVE
    }
}

impl ApiClient {
    pub async fn fetch_check_bundle_by_cid(&self, cid: &str) -> Result<CheckBundle> {
        validate_cid(CidKind::CheckBundle, cid)?;
        self.get_json(cid, &[]).await
    }

    pub async fn fetch_check_bundles(&self) -> Result<Vec<CheckBundle>> {
        self.get_json(constants::CHECK_BUNDLE_PREFIX, &[]).await
    }

    /// Search check bundles, e.g. `(active:1)(type:"httptrap")(tags:service:app)`.
    pub async fn search_check_bundles(&self, criteria: &str) -> Result<Vec<CheckBundle>> {
        let bundles: Vec<CheckBundle> = self
            .get_json(constants::CHECK_BUNDLE_PREFIX, &[("search", criteria)])
            .await?;
        debug!(criteria, matches = bundles.len(), "check bundle search");
        Ok(bundles)
    }

    pub async fn create_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle> {
        self.send_json(Method::POST, constants::CHECK_BUNDLE_PREFIX, bundle)
            .await
    }

    pub async fn update_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle> {
        validate_cid(CidKind::CheckBundle, &bundle.cid)?;
        self.send_json(Method::PUT, &bundle.cid, bundle).await
    }

    pub async fn delete_check_bundle_by_cid(&self, cid: &str) -> Result<bool> {
        validate_cid(CidKind::CheckBundle, cid)?;
        self.delete(cid).await?;
        Ok(true)
    }
}
