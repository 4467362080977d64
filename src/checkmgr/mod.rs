//! Check management: resolves the trap (submission) URL for this process.
//!
//! Resolution tries, in order, the configured submission URL, the configured
//! check id, and a search on instance id / check type / search tag, creating a
//! new check bundle when the search finds nothing. The result is cached on the
//! manager until explicitly reset.

pub mod broker;
pub mod create;
pub mod secret;
pub mod search;

use chrono::{DateTime, Utc};
use reqwest::Url;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, info_span, warn, Instrument};

use crate::api::{ApiClient, Broker, Check, CheckBundle, CheckBundleMetric};
use crate::app::ports::{BrokerProbe, CheckApi};
use crate::config::Config;
use crate::constants::{CHECK_PREFIX, STATUS_ACTIVE};
use crate::error::{CheckError, Result};
use crate::infra::tcp_probe::TcpProbe;
use crate::telemetry;

use self::broker::{broker_cn, url_authority, BrokerSettings};
use self::create::create_new_check;
use self::search::{check_bundle_search, search_criteria};

/// Effective check settings with defaults filled in.
#[derive(Debug, Clone)]
pub struct CheckSettings {
    pub enabled: bool,
    pub submission_url: Option<String>,
    pub check_id: u64,
    pub instance_id: String,
    pub search_tag: String,
    pub secret: Option<String>,
    pub tags: Vec<String>,
    pub display_name: String,
    pub check_type: String,
    pub broker: BrokerSettings,
}

impl CheckSettings {
    pub fn from_config(config: &Config) -> Self {
        let app = config.api.app.as_str();
        let check = &config.check;

        let instance_id = check
            .instance_id
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}:{}", hostname(), app));
        let search_tag = check
            .search_tag
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("service:{}", app));
        let display_name = check
            .display_name
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{} /{}", instance_id, app));

        Self {
            enabled: check.enabled,
            submission_url: check.submission_url.clone().filter(|s| !s.is_empty()),
            check_id: check.id,
            instance_id,
            search_tag,
            secret: check.secret.clone(),
            tags: check.tags.clone(),
            display_name,
            check_type: check.check_type.clone(),
            broker: BrokerSettings {
                id: config.broker.id,
                select_tag: config.broker.select_tag.clone(),
                max_response_time: config.broker.max_response_time(),
            },
        }
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Which lookup produced the trap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Disabled manager using the configured submission URL as-is
    Override,
    SubmissionUrl,
    CheckId,
    Search,
    Created,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Override => "override",
            Strategy::SubmissionUrl => "submission_url",
            Strategy::CheckId => "check_id",
            Strategy::Search => "search",
            Strategy::Created => "created",
        }
    }
}

/// A resolved submission endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Trap {
    pub url: String,
    /// Name to verify the broker certificate against
    pub cn: String,
    pub last_update: DateTime<Utc>,
    /// Absent when the manager is disabled
    pub check_bundle: Option<CheckBundle>,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrapStatus {
    Unresolved,
    Resolved(Trap),
    /// Last attempt failed; the next call retries.
    Failed { error: String, at: DateTime<Utc> },
}

/// How the manager currently identifies its check. A successful lookup by
/// submission URL swaps the URL for the check id so a later broker move does
/// not strand the process on a stale URL.
#[derive(Debug, Clone, Default)]
struct Identity {
    submission_url: Option<String>,
    check_id: u64,
}

/// What readers see: only ever replaced as a whole after a resolution or
/// bundle update finishes.
struct Snapshot {
    status: TrapStatus,
    inventory: HashMap<String, bool>,
    check_id: u64,
}

struct Resolution {
    trap: Trap,
    identity: Identity,
}

pub struct CheckManager {
    settings: CheckSettings,
    api: Option<Arc<dyn CheckApi>>,
    probe: Arc<dyn BrokerProbe>,
    /// Held across the cached check and all remote calls of a resolution.
    resolving: Mutex<Identity>,
    snapshot: RwLock<Snapshot>,
}

impl CheckManager {
    pub fn new(settings: CheckSettings, api: Option<Arc<dyn CheckApi>>) -> Self {
        Self::with_probe(settings, api, Arc::new(TcpProbe))
    }

    pub fn with_probe(settings: CheckSettings, api: Option<Arc<dyn CheckApi>>, probe: Arc<dyn BrokerProbe>) -> Self {
        let identity = Identity {
            submission_url: settings.submission_url.clone(),
            check_id: settings.check_id,
        };
        let snapshot = Snapshot {
            status: TrapStatus::Unresolved,
            inventory: HashMap::new(),
            check_id: identity.check_id,
        };
        Self {
            settings,
            api,
            probe,
            resolving: Mutex::new(identity),
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Build a manager talking to the real API. Disabled managers get no client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = CheckSettings::from_config(config);
        let api: Option<Arc<dyn CheckApi>> = if settings.enabled {
            Some(Arc::new(ApiClient::new(&config.api)?))
        } else {
            None
        };
        Ok(Self::new(settings, api))
    }

    pub fn settings(&self) -> &CheckSettings {
        &self.settings
    }

    pub async fn status(&self) -> TrapStatus {
        self.snapshot.read().await.status.clone()
    }

    pub async fn trap(&self) -> Option<Trap> {
        match &self.snapshot.read().await.status {
            TrapStatus::Resolved(trap) => Some(trap.clone()),
            _ => None,
        }
    }

    pub async fn is_resolved(&self) -> bool {
        matches!(self.snapshot.read().await.status, TrapStatus::Resolved(_))
    }

    /// Current check id, including one learned from a submission URL lookup.
    pub async fn check_id(&self) -> u64 {
        self.snapshot.read().await.check_id
    }

    /// Resolve the trap URL once; later calls return the cached trap.
    ///
    /// The resolution lock is held across the cached check and the
    /// resolution, so concurrent callers wait for the first and observe its
    /// result. Readers only touch the snapshot and never wait on remote calls.
    pub async fn initialize_trap_url(&self) -> Result<Trap> {
        let mut identity = self.resolving.lock().await;
        if let Some(trap) = self.trap().await {
            return Ok(trap);
        }
        self.resolve_locked(&mut identity).await
    }

    /// Forget the resolved trap; the next `initialize_trap_url` resolves again.
    pub async fn reset_trap(&self) {
        let _resolving = self.resolving.lock().await;
        let mut snapshot = self.snapshot.write().await;
        snapshot.status = TrapStatus::Unresolved;
        snapshot.inventory.clear();
        info!("trap reset");
    }

    /// Re-resolve when the cached trap is older than `max_age` (or missing).
    ///
    /// A failed refresh keeps the previous trap and returns the error.
    pub async fn refresh_trap(&self, max_age: Duration) -> Result<Trap> {
        let mut identity = self.resolving.lock().await;
        if let Some(trap) = self.trap().await {
            let age = Utc::now().signed_duration_since(trap.last_update);
            if age.to_std().map(|a| a < max_age).unwrap_or(true) {
                return Ok(trap);
            }
            info!(age_secs = age.num_seconds(), "trap is stale, refreshing");
        }
        self.resolve_locked(&mut identity).await
    }

    /// Caller holds the resolution lock; `identity` is its guarded value.
    async fn resolve_locked(&self, identity: &mut Identity) -> Result<Trap> {
        let _timing = telemetry::time_operation(telemetry::RESOLUTION_DURATION);
        let span = info_span!("initialize_trap_url", instance = %self.settings.instance_id);

        let outcome = self.resolve(identity).instrument(span).await;
        match outcome {
            Ok(resolution) => {
                let trap = resolution.trap;
                *identity = resolution.identity;

                let mut snapshot = self.snapshot.write().await;
                snapshot.inventory = trap
                    .check_bundle
                    .as_ref()
                    .map(inventory_of)
                    .unwrap_or_default();
                snapshot.check_id = identity.check_id;
                snapshot.status = TrapStatus::Resolved(trap.clone());

                telemetry::resolution(trap.strategy.as_str());
                info!(url = %trap.url, cn = %trap.cn, strategy = trap.strategy.as_str(), "trap resolved");
                Ok(trap)
            }
            Err(e) => {
                telemetry::resolution_failed();
                let mut snapshot = self.snapshot.write().await;
                let previous = match &snapshot.status {
                    TrapStatus::Resolved(trap) => Some(trap.url.clone()),
                    _ => None,
                };
                match previous {
                    Some(url) => warn!(error = %e, url = %url, "trap refresh failed, keeping previous trap"),
                    None => {
                        warn!(error = %e, "trap resolution failed");
                        snapshot.status = TrapStatus::Failed {
                            error: e.to_string(),
                            at: Utc::now(),
                        };
                    }
                }
                Err(e)
            }
        }
    }

    async fn resolve(&self, current: &Identity) -> Result<Resolution> {
        if !self.settings.enabled {
            // Disabled: the configured URL is used verbatim, no API calls
            let url = current.submission_url.clone().ok_or(CheckError::Disabled)?;
            let cn = override_cn(&url);
            return Ok(Resolution {
                trap: Trap {
                    url,
                    cn,
                    last_update: Utc::now(),
                    check_bundle: None,
                    strategy: Strategy::Override,
                },
                identity: current.clone(),
            });
        }

        let api = self
            .api
            .as_deref()
            .ok_or_else(|| CheckError::Config("check manager is enabled but has no API client".to_string()))?;

        let mut identity = current.clone();
        let mut check: Option<Check> = None;
        let mut bundle: Option<CheckBundle> = None;
        let mut broker: Option<Broker> = None;
        let strategy;

        if let Some(submission_url) = current.submission_url.as_deref() {
            let found = api.fetch_check_by_submission_url(submission_url).await?;
            match check_id_from_cid(&found.cid) {
                Some(id) => {
                    identity.check_id = id;
                    identity.submission_url = None;
                }
                None => warn!(cid = %found.cid, "unable to convert check CID to a check id"),
            }
            check = Some(found);
            strategy = Strategy::SubmissionUrl;
        } else if current.check_id > 0 {
            check = Some(api.fetch_check_by_id(current.check_id).await?);
            strategy = Strategy::CheckId;
        } else {
            let criteria = search_criteria(
                &self.settings.instance_id,
                &self.settings.check_type,
                &self.settings.search_tag,
            );
            match check_bundle_search(api, &criteria).await? {
                Some(found) => {
                    bundle = Some(found);
                    strategy = Strategy::Search;
                }
                None => {
                    info!(criteria = %criteria, "no matching check bundle, creating one");
                    let (created, used_broker) = create_new_check(api, self.probe.as_ref(), &self.settings).await?;
                    bundle = Some(created);
                    broker = Some(used_broker);
                    strategy = Strategy::Created;
                }
            }
        }

        let bundle = match (bundle, check) {
            (Some(bundle), _) => bundle,
            (None, Some(check)) => api.fetch_check_bundle_by_cid(&check.check_bundle_cid).await?,
            (None, None) => {
                return Err(CheckError::NotFound("unable to retrieve, find, or create check".to_string()))
            }
        };

        let broker = match broker {
            Some(broker) => broker,
            None => {
                let cid = bundle
                    .brokers
                    .first()
                    .ok_or_else(|| CheckError::NoBrokers(format!("check bundle {} lists no brokers", bundle.cid)))?;
                api.fetch_broker_by_cid(cid).await?
            }
        };

        let url = bundle.config.submission_url.clone();
        if url.is_empty() {
            return Err(CheckError::NotFound(format!(
                "check bundle {} has no submission URL",
                bundle.cid
            )));
        }
        let cn = broker_cn(&broker, &url)?;

        Ok(Resolution {
            trap: Trap {
                url,
                cn,
                last_update: Utc::now(),
                check_bundle: Some(bundle),
                strategy,
            },
            identity,
        })
    }

    /// Whether `name` is a known, active metric on the resolved check bundle.
    pub async fn is_metric_active(&self, name: &str) -> bool {
        self.snapshot.read().await.inventory.get(name).copied().unwrap_or(false)
    }

    pub async fn metric_inventory(&self) -> HashMap<String, bool> {
        self.snapshot.read().await.inventory.clone()
    }

    /// Add metrics the check bundle does not know about yet, enabled.
    ///
    /// Returns whether the bundle was updated.
    pub async fn add_new_metrics(&self, metrics: Vec<CheckBundleMetric>) -> Result<bool> {
        let api = self.api.as_deref().ok_or(CheckError::Disabled)?;
        // Serializes with resolutions so an update never races a new trap
        let _resolving = self.resolving.lock().await;

        let (mut trap, inventory) = {
            let snapshot = self.snapshot.read().await;
            match &snapshot.status {
                TrapStatus::Resolved(trap) => (trap.clone(), snapshot.inventory.clone()),
                _ => return Err(CheckError::Unresolved),
            }
        };
        let mut bundle = trap.check_bundle.clone().ok_or(CheckError::Disabled)?;

        let mut added = 0;
        for mut metric in metrics {
            if inventory.contains_key(&metric.name)
                || bundle.metrics.iter().any(|m| m.name == metric.name)
            {
                continue;
            }
            metric.status = STATUS_ACTIVE.to_string();
            bundle.metrics.push(metric);
            added += 1;
        }
        if added == 0 {
            return Ok(false);
        }

        let updated = api.update_check_bundle(&bundle).await?;
        info!(cid = %updated.cid, added, "added metrics to check bundle");

        let mut snapshot = self.snapshot.write().await;
        snapshot.inventory = inventory_of(&updated);
        trap.check_bundle = Some(updated);
        snapshot.status = TrapStatus::Resolved(trap);
        Ok(true)
    }
}

fn inventory_of(bundle: &CheckBundle) -> HashMap<String, bool> {
    bundle
        .metrics
        .iter()
        .map(|m| (m.name.clone(), m.is_active()))
        .collect()
}

fn check_id_from_cid(cid: &str) -> Option<u64> {
    cid.strip_prefix(CHECK_PREFIX)?.strip_prefix('/')?.parse().ok()
}

/// CN for a disabled manager: the URL authority for hostnames, nothing for IPs
/// since there is no broker to map them through.
fn override_cn(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    let host = parsed.host_str().unwrap_or_default();
    if host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>().is_ok() {
        String::new()
    } else {
        url_authority(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_id_from_cid() {
        assert_eq!(check_id_from_cid("/check/1234"), Some(1234));
        assert_eq!(check_id_from_cid("/check_bundle/1234"), None);
        assert_eq!(check_id_from_cid("/check/abc"), None);
    }

    #[test]
    fn test_override_cn() {
        assert_eq!(override_cn("https://trap.example.com/module/httptrap/x/y"), "trap.example.com");
        assert_eq!(override_cn("https://10.0.0.5:43191/module/httptrap/x/y"), "");
        assert_eq!(override_cn("garbage"), "");
    }

    #[test]
    fn test_settings_defaults_from_app_name() {
        let mut config = Config::default();
        config.api.app = "billing".to_string();
        config.check.instance_id = Some("web01:billing".to_string());

        let settings = CheckSettings::from_config(&config);
        assert_eq!(settings.instance_id, "web01:billing");
        assert_eq!(settings.search_tag, "service:billing");
        assert_eq!(settings.display_name, "web01:billing /billing");
        assert_eq!(settings.check_type, "httptrap");
        assert_eq!(settings.broker.max_response_time, Duration::from_millis(500));
    }

    #[test]
    fn test_settings_default_instance_includes_app() {
        let settings = CheckSettings::from_config(&Config::default());
        assert!(settings.instance_id.ends_with(":check_manager"));
    }

    #[test]
    fn test_inventory_of() {
        let bundle = CheckBundle {
            metrics: vec![
                CheckBundleMetric {
                    name: "requests".to_string(),
                    metric_type: "numeric".to_string(),
                    status: "active".to_string(),
                    ..CheckBundleMetric::default()
                },
                CheckBundleMetric {
                    name: "latency".to_string(),
                    metric_type: "histogram".to_string(),
                    status: "available".to_string(),
                    ..CheckBundleMetric::default()
                },
            ],
            ..CheckBundle::default()
        };
        let inventory = inventory_of(&bundle);
        assert_eq!(inventory.get("requests"), Some(&true));
        assert_eq!(inventory.get("latency"), Some(&false));
    }

    #[tokio::test]
    async fn test_disabled_without_url_is_error() {
        let mut settings = CheckSettings::from_config(&Config::default());
        settings.enabled = false;
        settings.submission_url = None;

        let manager = CheckManager::new(settings, None);
        let err = manager.initialize_trap_url().await.unwrap_err();
        assert!(matches!(err, CheckError::Disabled));
        assert!(matches!(manager.status().await, TrapStatus::Failed { .. }));
    }
}
