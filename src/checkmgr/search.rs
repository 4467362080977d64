use tracing::debug;

use crate::api::CheckBundle;
use crate::app::ports::CheckApi;
use crate::error::{CheckError, Result};

/// Search expression matching active checks for this instance.
pub fn search_criteria(instance_id: &str, check_type: &str, search_tag: &str) -> String {
    format!(
        "(active:1)(host:\"{}\")(type:\"{}\")(tags:{})",
        instance_id, check_type, search_tag
    )
}

/// Find the single active check bundle matching `criteria`.
///
/// `Ok(None)` means nothing usable matched and a new check should be created.
/// Bundles that are not active are never selected.
pub async fn check_bundle_search(api: &dyn CheckApi, criteria: &str) -> Result<Option<CheckBundle>> {
    let bundles = api.search_check_bundles(criteria).await?;
    select_active_bundle(bundles, criteria)
}

fn select_active_bundle(bundles: Vec<CheckBundle>, criteria: &str) -> Result<Option<CheckBundle>> {
    if bundles.is_empty() {
        return Ok(None);
    }

    let total = bundles.len();
    let mut active: Vec<CheckBundle> = bundles.into_iter().filter(|b| b.is_active()).collect();
    debug!(criteria, total, active = active.len(), "check bundle search results");

    match active.len() {
        0 => Ok(None),
        1 => Ok(active.pop()),
        n => Err(CheckError::AmbiguousSearch {
            criteria: criteria.to_string(),
            active: n,
        }),
    }
}
