//! Broker API support - fetch and search

use serde::{Deserialize, Serialize};

use super::{validate_cid, ApiClient, CidKind};
use crate::constants;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerDetail {
    #[serde(default)]
    pub cn: String,
    #[serde(default)]
    pub external_host: Option<String>,
    #[serde(default)]
    pub external_port: Option<u16>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub minimum_version_required: Option<u64>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub skew: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<u64>,
}

impl BrokerDetail {
    /// Address a client should connect to, preferring the externally advertised one.
    pub fn connect_address(&self) -> Option<(String, u16)> {
        let host = self
            .external_host
            .as_ref()
            .filter(|h| !h.is_empty())
            .or(self.ip.as_ref().filter(|ip| !ip.is_empty()))?;
        let port = self
            .external_port
            .filter(|p| *p != 0)
            .or(self.port.filter(|p| *p != 0))
            .unwrap_or(constants::DEFAULT_BROKER_PORT);
        Some((host.clone(), port))
    }

    pub fn supports(&self, check_type: &str) -> bool {
        // "json:nad" style types are served by the base module
        let module = check_type.split(':').next().unwrap_or(check_type);
        self.modules.iter().any(|m| m == module)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Broker {
    #[serde(rename = "_cid")]
    pub cid: String,
    #[serde(rename = "_details", default)]
    pub details: Vec<BrokerDetail>,
    #[serde(rename = "_latitude", default)]
    pub latitude: Option<String>,
    #[serde(rename = "_longitude", default)]
    pub longitude: Option<String>,
    #[serde(rename = "_name", default)]
    pub name: String,
    #[serde(rename = "_tags", default)]
    pub tags: Vec<String>,
    #[serde(rename = "_type", default)]
    pub broker_type: String,
}

impl ApiClient {
    pub async fn fetch_broker_by_cid(&self, cid: &str) -> Result<Broker> {
        validate_cid(CidKind::Broker, cid)?;
        self.get_json(cid, &[]).await
    }

    pub async fn fetch_broker_by_id(&self, id: u64) -> Result<Broker> {
        self.fetch_broker_by_cid(&format!("{}/{}", constants::BROKER_PREFIX, id))
            .await
    }

    pub async fn fetch_brokers(&self) -> Result<Vec<Broker>> {
        self.get_json(constants::BROKER_PREFIX, &[]).await
    }

    pub async fn fetch_brokers_by_tag(&self, tag: &str) -> Result<Vec<Broker>> {
        let criteria = format!("(tags:{})", tag);
        self.get_json(constants::BROKER_PREFIX, &[("search", criteria.as_str())])
            .await
    }
}
