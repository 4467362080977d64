use rand::rngs::OsRng;
use tracing::{info, warn};

use super::broker::select_broker;
use super::secret::check_secret;
use super::CheckSettings;
use crate::api::{Broker, CheckBundle, CheckBundleConfig};
use crate::app::ports::{BrokerProbe, CheckApi};
use crate::constants::{DEFAULT_CHECK_PERIOD, DEFAULT_CHECK_TIMEOUT, STATUS_ACTIVE};
use crate::error::Result;
use crate::telemetry;

/// Bundle definition for a new check on `broker`.
pub fn new_check_bundle(settings: &CheckSettings, broker: &Broker, secret: &str) -> CheckBundle {
    let mut tags = Vec::with_capacity(settings.tags.len() + 1);
    tags.push(settings.search_tag.clone());
    tags.extend(settings.tags.iter().cloned());

    CheckBundle {
        brokers: vec![broker.cid.clone()],
        config: CheckBundleConfig {
            async_metrics: true,
            secret: secret.to_string(),
            ..CheckBundleConfig::default()
        },
        display_name: settings.display_name.clone(),
        metrics: Vec::new(),
        metric_limit: 0,
        notes: String::new(),
        period: DEFAULT_CHECK_PERIOD,
        status: STATUS_ACTIVE.to_string(),
        tags,
        target: settings.instance_id.clone(),
        timeout: DEFAULT_CHECK_TIMEOUT,
        check_type: settings.check_type.clone(),
        ..CheckBundle::default()
    }
}

/// Create a check bundle to receive metrics, returning it with the broker it was placed on.
pub async fn create_new_check(
    api: &dyn CheckApi,
    probe: &dyn BrokerProbe,
    settings: &CheckSettings,
) -> Result<(CheckBundle, Broker)> {
    let secret = check_secret(settings.secret.as_deref(), &mut OsRng);
    if secret.is_insecure() {
        warn!("new check will use the insecure fallback secret");
    }

    let broker = select_broker(api, probe, &settings.broker, &settings.check_type).await?;

    let request = new_check_bundle(settings, &broker, secret.as_str());
    let bundle = api.create_check_bundle(&request).await?;

    telemetry::check_created();
    info!(
        cid = %bundle.cid,
        broker = %broker.cid,
        target = %bundle.target,
        "created check bundle"
    );
    Ok((bundle, broker))
}
