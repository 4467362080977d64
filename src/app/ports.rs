use async_trait::async_trait;
use std::time::Duration;

use crate::api::{Broker, Check, CheckBundle};
use crate::error::Result;

/// Remote calls the check manager depends on.
///
/// `ApiClient` is the production implementation; tests substitute recording mocks.
#[async_trait]
pub trait CheckApi: Send + Sync {
    async fn fetch_check_by_submission_url(&self, submission_url: &str) -> Result<Check>;
    async fn fetch_check_by_id(&self, id: u64) -> Result<Check>;
    async fn fetch_check_bundle_by_cid(&self, cid: &str) -> Result<CheckBundle>;
    async fn fetch_broker_by_cid(&self, cid: &str) -> Result<Broker>;
    async fn fetch_broker_by_id(&self, id: u64) -> Result<Broker>;
    async fn fetch_brokers(&self) -> Result<Vec<Broker>>;
    async fn fetch_brokers_by_tag(&self, tag: &str) -> Result<Vec<Broker>>;
    async fn search_check_bundles(&self, criteria: &str) -> Result<Vec<CheckBundle>>;
    async fn create_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle>;
    async fn update_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle>;
}

/// Answers whether a broker endpoint accepts connections quickly enough to be used.
#[async_trait]
pub trait BrokerProbe: Send + Sync {
    async fn reachable(&self, host: &str, port: u16, within: Duration) -> bool;
}
