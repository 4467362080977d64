use rand::Rng;
use reqwest::Url;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::Broker;
use crate::app::ports::{BrokerProbe, CheckApi};
use crate::constants::STATUS_ACTIVE;
use crate::error::{CheckError, Result};

const ENTERPRISE_BROKER: &str = "enterprise";

/// How a broker is chosen for a new check
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Use exactly this broker
    pub id: Option<u64>,
    /// Restrict candidates to brokers carrying this tag
    pub select_tag: Option<String>,
    pub max_response_time: Duration,
}

/// A broker is usable when one of its active instances serves the check type
/// and accepts a connection within `max_response_time`.
pub async fn is_valid_broker(
    probe: &dyn BrokerProbe,
    broker: &Broker,
    check_type: &str,
    max_response_time: Duration,
) -> bool {
    for detail in &broker.details {
        if detail.status != STATUS_ACTIVE {
            debug!(broker = %broker.name, cn = %detail.cn, "broker instance not active");
            continue;
        }
        if !detail.supports(check_type) {
            debug!(broker = %broker.name, cn = %detail.cn, check_type, "broker instance lacks module");
            continue;
        }
        let Some((host, port)) = detail.connect_address() else {
            continue;
        };
        if probe.reachable(&host, port, max_response_time).await {
            return true;
        }
        debug!(broker = %broker.name, host = %host, port, "broker instance unreachable");
    }
    false
}

/// Pick the broker a new check should be created on.
pub async fn select_broker(
    api: &dyn CheckApi,
    probe: &dyn BrokerProbe,
    settings: &BrokerSettings,
    check_type: &str,
) -> Result<Broker> {
    if let Some(id) = settings.id {
        let broker = api.fetch_broker_by_id(id).await?;
        if !is_valid_broker(probe, &broker, check_type, settings.max_response_time).await {
            return Err(CheckError::Config(format!(
                "designated broker {} ({}) is not valid for check type {}",
                id, broker.name, check_type
            )));
        }
        return Ok(broker);
    }

    let brokers = match &settings.select_tag {
        Some(tag) => api.fetch_brokers_by_tag(tag).await?,
        None => api.fetch_brokers().await?,
    };
    if brokers.is_empty() {
        return Err(CheckError::NoBrokers("broker list is empty".to_string()));
    }

    let mut valid = Vec::new();
    for broker in brokers {
        if is_valid_broker(probe, &broker, check_type, settings.max_response_time).await {
            valid.push(broker);
        } else {
            warn!(broker = %broker.name, cid = %broker.cid, "skipping invalid broker");
        }
    }

    // Enterprise brokers belong to the account; prefer them over public ones
    if valid.iter().any(|b| b.broker_type == ENTERPRISE_BROKER) {
        valid.retain(|b| b.broker_type == ENTERPRISE_BROKER);
    }

    if valid.is_empty() {
        return Err(CheckError::NoBrokers(format!(
            "no reachable brokers support check type {}",
            check_type
        )));
    }

    let idx = rand::thread_rng().gen_range(0..valid.len());
    let broker = valid.swap_remove(idx);
    info!(broker = %broker.name, cid = %broker.cid, "selected broker");
    Ok(broker)
}

/// Common name to validate the broker's certificate against for `trap_url`.
///
/// Certificates carry the broker CN rather than IP SANs, so an IP host is
/// mapped back to the CN of the matching broker instance.
pub fn broker_cn(broker: &Broker, trap_url: &str) -> Result<String> {
    let url = Url::parse(trap_url).map_err(|e| CheckError::InvalidSubmissionUrl {
        url: trap_url.to_string(),
        reason: e.to_string(),
    })?;
    let host = url.host_str().ok_or_else(|| CheckError::InvalidSubmissionUrl {
        url: trap_url.to_string(),
        reason: "missing host".to_string(),
    })?;

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_err() {
        return Ok(url_authority(&url));
    }

    broker
        .details
        .iter()
        .find(|d| d.ip.as_deref() == Some(bare))
        .map(|d| d.cn.clone())
        .filter(|cn| !cn.is_empty())
        .ok_or_else(|| CheckError::BrokerMismatch {
            host: url_authority(&url),
            broker: broker.cid.clone(),
        })
}

/// `host[:port]` as written in the URL.
pub(crate) fn url_authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
