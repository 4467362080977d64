//! Metric cluster API support - fetch, create, update, delete, and search

use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{validate_cid, ApiClient, CidKind};
use crate::constants;
use crate::error::{CheckError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub query: String,
    #[serde(rename = "type")]
    pub query_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricCluster {
    #[serde(rename = "_cid", default, skip_serializing_if = "String::is_empty")]
    pub cid: String,
    #[serde(rename = "_matching_metrics", default, skip_serializing_if = "Option::is_none")]
    pub matching_metrics: Option<Vec<String>>,
    #[serde(rename = "_matching_uuid_metrics", default, skip_serializing_if = "Option::is_none")]
    pub matching_uuid_metrics: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub description: String,
    pub name: String,
    #[serde(default)]
    pub queries: Vec<MetricQuery>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Optional expansion of the metrics a cluster currently matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricClusterExtras {
    None,
    Metrics,
    Uuids,
}

impl MetricClusterExtras {
    fn query_value(&self) -> Option<&'static str> {
        match self {
            MetricClusterExtras::None => None,
            MetricClusterExtras::Metrics => Some("_matching_metrics"),
            MetricClusterExtras::Uuids => Some("_matching_uuid_metrics"),
        }
    }
}

impl ApiClient {
    pub async fn fetch_metric_cluster(&self, cid: &str, extras: MetricClusterExtras) -> Result<MetricCluster> {
        validate_cid(CidKind::MetricCluster, cid)?;
        match extras.query_value() {
            Some(extra) => self.get_json(cid, &[("extra", extra)]).await,
            None => self.get_json(cid, &[]).await,
        }
    }

    pub async fn fetch_metric_clusters(&self, extras: MetricClusterExtras) -> Result<Vec<MetricCluster>> {
        match extras.query_value() {
            Some(extra) => {
                self.get_json(constants::METRIC_CLUSTER_PREFIX, &[("extra", extra)])
                    .await
            }
            None => self.get_json(constants::METRIC_CLUSTER_PREFIX, &[]).await,
        }
    }

    pub async fn create_metric_cluster(&self, cluster: &MetricCluster) -> Result<MetricCluster> {
        self.send_json(Method::POST, constants::METRIC_CLUSTER_PREFIX, cluster)
            .await
    }

    pub async fn update_metric_cluster(&self, cluster: &MetricCluster) -> Result<MetricCluster> {
        validate_cid(CidKind::MetricCluster, &cluster.cid)?;
        self.send_json(Method::PUT, &cluster.cid, cluster).await
    }

    pub async fn delete_metric_cluster_by_cid(&self, cid: &str) -> Result<bool> {
        validate_cid(CidKind::MetricCluster, cid)?;
        self.delete(cid).await?;
        Ok(true)
    }

    /// Search metric clusters by query and/or filters; with neither, all clusters are returned.
    pub async fn search_metric_clusters(
        &self,
        query: Option<&str>,
        filters: &HashMap<String, Vec<String>>,
    ) -> Result<Vec<MetricCluster>> {
        let params = search_params(query, filters);
        if params.is_empty() {
            return self.fetch_metric_clusters(MetricClusterExtras::None).await;
        }

        let borrowed: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        self.get_json(constants::METRIC_CLUSTER_PREFIX, &borrowed)
            .await
            .map_err(|e| match e {
                CheckError::Api { status, message } => CheckError::Api {
                    status,
                    message: format!("metric cluster search: {}", message),
                },
                other => other,
            })
    }
}

fn search_params(query: Option<&str>, filters: &HashMap<String, Vec<String>>) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        params.push(("search".to_string(), q.to_string()));
    }

    let mut keys: Vec<&String> = filters.keys().collect();
    keys.sort();
    for key in keys {
        for value in &filters[key] {
            params.push((key.clone(), value.clone()));
        }
    }
    params
}
