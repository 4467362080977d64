#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

use check_manager::api::{Broker, BrokerDetail, Check, CheckBundle, CheckBundleConfig};
use check_manager::app::ports::{BrokerProbe, CheckApi};
use check_manager::checkmgr::broker::BrokerSettings;
use check_manager::{CheckError, CheckSettings, Result};

pub const CHECK_UUID: &str = "a1b2c3d4-0000-4000-8000-1234567890ab";
pub const BROKER_IP: &str = "10.0.0.5";
pub const BROKER_CN: &str = "broker-5.example.net";

pub fn trap_url(secret: &str) -> String {
    format!("https://{}:43191/module/httptrap/{}/{}", BROKER_IP, CHECK_UUID, secret)
}

pub fn broker(id: u64) -> Broker {
    Broker {
        cid: format!("/broker/{}", id),
        name: format!("broker-{}", id),
        details: vec![BrokerDetail {
            cn: BROKER_CN.to_string(),
            ip: Some(BROKER_IP.to_string()),
            status: "active".to_string(),
            modules: vec!["httptrap".to_string(), "json".to_string()],
            ..BrokerDetail::default()
        }],
        broker_type: "circonus".to_string(),
        ..Broker::default()
    }
}

pub fn bundle(id: u64, status: &str) -> CheckBundle {
    CheckBundle {
        cid: format!("/check_bundle/{}", id),
        brokers: vec!["/broker/35".to_string()],
        config: CheckBundleConfig {
            async_metrics: true,
            secret: "s3cr3t".to_string(),
            submission_url: trap_url("s3cr3t"),
            ..CheckBundleConfig::default()
        },
        status: status.to_string(),
        check_type: "httptrap".to_string(),
        ..CheckBundle::default()
    }
}

pub fn check(id: u64, bundle_id: u64) -> Check {
    Check {
        cid: format!("/check/{}", id),
        active: true,
        check_bundle_cid: format!("/check_bundle/{}", bundle_id),
        check_uuid: CHECK_UUID.to_string(),
        ..Check::default()
    }
}

pub fn settings() -> CheckSettings {
    CheckSettings {
        enabled: true,
        submission_url: None,
        check_id: 0,
        instance_id: "web01:billing".to_string(),
        search_tag: "service:billing".to_string(),
        secret: None,
        tags: vec!["env:test".to_string()],
        display_name: "web01:billing /billing".to_string(),
        check_type: "httptrap".to_string(),
        broker: BrokerSettings {
            id: None,
            select_tag: None,
            max_response_time: Duration::from_millis(100),
        },
    }
}

pub struct StaticProbe(pub bool);

#[async_trait]
impl BrokerProbe for StaticProbe {
    async fn reachable(&self, _host: &str, _port: u16, _within: Duration) -> bool {
        self.0
    }
}

/// In-memory API that records every call it receives.
#[derive(Default)]
pub struct MockApi {
    pub calls: Mutex<Vec<String>>,
    pub checks_by_url: HashMap<String, Check>,
    pub checks_by_id: HashMap<u64, Check>,
    pub bundles: HashMap<String, CheckBundle>,
    pub brokers: Vec<Broker>,
    pub search_results: Vec<CheckBundle>,
    pub created: Mutex<Vec<CheckBundle>>,
    pub updated: Mutex<Vec<CheckBundle>>,
    pub fail_search: AtomicBool,
    /// When set, searches wait for a notification after being recorded
    pub search_gate: Option<Arc<Notify>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_broker(mut self, broker: Broker) -> Self {
        self.brokers.push(broker);
        self
    }

    pub fn with_bundle(mut self, bundle: CheckBundle) -> Self {
        self.bundles.insert(bundle.cid.clone(), bundle);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.split(':').next() == Some(method))
            .count()
    }
}

#[async_trait]
impl CheckApi for MockApi {
    async fn fetch_check_by_submission_url(&self, submission_url: &str) -> Result<Check> {
        self.record(format!("fetch_check_by_submission_url:{}", submission_url)).await;
        self.checks_by_url
            .get(submission_url)
            .cloned()
            .ok_or_else(|| CheckError::NotFound(submission_url.to_string()))
    }

    async fn fetch_check_by_id(&self, id: u64) -> Result<Check> {
        self.record(format!("fetch_check_by_id:{}", id)).await;
        self.checks_by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| CheckError::Api { status: 404, message: format!("/check/{}", id) })
    }

    async fn fetch_check_bundle_by_cid(&self, cid: &str) -> Result<CheckBundle> {
        self.record(format!("fetch_check_bundle_by_cid:{}", cid)).await;
        self.bundles
            .get(cid)
            .cloned()
            .ok_or_else(|| CheckError::Api { status: 404, message: cid.to_string() })
    }

    async fn fetch_broker_by_cid(&self, cid: &str) -> Result<Broker> {
        self.record(format!("fetch_broker_by_cid:{}", cid)).await;
        self.brokers
            .iter()
            .find(|b| b.cid == cid)
            .cloned()
            .ok_or_else(|| CheckError::Api { status: 404, message: cid.to_string() })
    }

    async fn fetch_broker_by_id(&self, id: u64) -> Result<Broker> {
        self.record(format!("fetch_broker_by_id:{}", id)).await;
        let cid = format!("/broker/{}", id);
        self.brokers
            .iter()
            .find(|b| b.cid == cid)
            .cloned()
            .ok_or_else(|| CheckError::Api { status: 404, message: cid })
    }

    async fn fetch_brokers(&self) -> Result<Vec<Broker>> {
        self.record("fetch_brokers".to_string()).await;
        Ok(self.brokers.clone())
    }

    async fn fetch_brokers_by_tag(&self, tag: &str) -> Result<Vec<Broker>> {
        self.record(format!("fetch_brokers_by_tag:{}", tag)).await;
        Ok(self
            .brokers
            .iter()
            .filter(|b| b.tags.iter().any(|t| t == tag))
            .cloned()
            .collect())
    }

    async fn search_check_bundles(&self, criteria: &str) -> Result<Vec<CheckBundle>> {
        self.record(format!("search_check_bundles:{}", criteria)).await;
        if let Some(gate) = &self.search_gate {
            gate.notified().await;
        }
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(CheckError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(self.search_results.clone())
    }

    async fn create_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle> {
        self.record("create_check_bundle".to_string()).await;
        let mut created = bundle.clone();
        created.cid = "/check_bundle/900".to_string();
        created.checks = vec!["/check/9000".to_string()];
        created.config.submission_url = trap_url(&bundle.config.secret);
        self.created.lock().await.push(created.clone());
        Ok(created)
    }

    async fn update_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle> {
        self.record(format!("update_check_bundle:{}", bundle.cid)).await;
        self.updated.lock().await.push(bundle.clone());
        Ok(bundle.clone())
    }
}
