use async_trait::async_trait;

use crate::api::{ApiClient, Broker, Check, CheckBundle};
use crate::app::ports::CheckApi;
use crate::error::Result;

#[async_trait]
impl CheckApi for ApiClient {
    async fn fetch_check_by_submission_url(&self, submission_url: &str) -> Result<Check> {
        ApiClient::fetch_check_by_submission_url(self, submission_url).await
    }

    async fn fetch_check_by_id(&self, id: u64) -> Result<Check> {
        ApiClient::fetch_check_by_id(self, id).await
    }

    async fn fetch_check_bundle_by_cid(&self, cid: &str) -> Result<CheckBundle> {
        ApiClient::fetch_check_bundle_by_cid(self, cid).await
    }

    async fn fetch_broker_by_cid(&self, cid: &str) -> Result<Broker> {
        ApiClient::fetch_broker_by_cid(self, cid).await
    }

    async fn fetch_broker_by_id(&self, id: u64) -> Result<Broker> {
        ApiClient::fetch_broker_by_id(self, id).await
    }

    async fn fetch_brokers(&self) -> Result<Vec<Broker>> {
        ApiClient::fetch_brokers(self).await
    }

    async fn fetch_brokers_by_tag(&self, tag: &str) -> Result<Vec<Broker>> {
        ApiClient::fetch_brokers_by_tag(self, tag).await
    }

    async fn search_check_bundles(&self, criteria: &str) -> Result<Vec<CheckBundle>> {
        ApiClient::search_check_bundles(self, criteria).await
    }

    async fn create_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle> {
        ApiClient::create_check_bundle(self, bundle).await
    }

    async fn update_check_bundle(&self, bundle: &CheckBundle) -> Result<CheckBundle> {
        ApiClient::update_check_bundle(self, bundle).await
    }
}
