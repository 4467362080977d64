//! Check API support - fetch by CID, by id, by submission URL, and search

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::{bool_or_string, validate_cid, ApiClient, CidKind};
use crate::constants;
use crate::error::{CheckError, Result};

/// A check as returned by `/check`. Checks are derived from check bundles and are read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Check {
    #[serde(rename = "_cid")]
    pub cid: String,
    #[serde(rename = "_active", default, deserialize_with = "bool_or_string")]
    pub active: bool,
    #[serde(rename = "_broker", default)]
    pub broker_cid: String,
    #[serde(rename = "_check_bundle", default)]
    pub check_bundle_cid: String,
    #[serde(rename = "_check_uuid", default)]
    pub check_uuid: String,
    #[serde(rename = "_details", default)]
    pub details: HashMap<String, String>,
}

/// Check UUID embedded in an httptrap submission URL
/// (`https://host:port/module/httptrap/<uuid>/<secret>`).
pub fn submission_url_uuid(submission_url: &str) -> Result<Uuid> {
    let invalid = |reason: &str| CheckError::InvalidSubmissionUrl {
        url: submission_url.to_string(),
        reason: reason.to_string(),
    };

    let url = reqwest::Url::parse(submission_url).map_err(|e| invalid(&e.to_string()))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default();

    match segments.as_slice() {
        ["module", "httptrap", uuid, _secret] => {
            Uuid::parse_str(uuid).map_err(|e| invalid(&format!("bad check UUID: {}", e)))
        }
        _ => Err(invalid("expected /module/httptrap/<uuid>/<secret>")),
    }
}

impl ApiClient {
    pub async fn fetch_check_by_cid(&self, cid: &str) -> Result<Check> {
        validate_cid(CidKind::Check, cid)?;
        self.get_json(cid, &[]).await
    }

    pub async fn fetch_check_by_id(&self, id: u64) -> Result<Check> {
        self.fetch_check_by_cid(&format!("{}/{}", constants::CHECK_PREFIX, id))
            .await
    }

    /// Look up the check that owns a submission URL, via its check UUID.
    pub async fn fetch_check_by_submission_url(&self, submission_url: &str) -> Result<Check> {
        let uuid = submission_url_uuid(submission_url)?.to_string();
        let checks: Vec<Check> = self
            .get_json(constants::CHECK_PREFIX, &[("f__check_uuid", uuid.as_str())])
            .await?;
        debug!(uuid = %uuid, matches = checks.len(), "checks by submission URL");

        select_active_check(checks, &uuid)
    }

    pub async fn fetch_checks(&self) -> Result<Vec<Check>> {
        self.get_json(constants::CHECK_PREFIX, &[]).await
    }
}

fn select_active_check(checks: Vec<Check>, uuid: &str) -> Result<Check> {
    if checks.is_empty() {
        return Err(CheckError::NotFound(format!("no checks found with UUID {}", uuid)));
    }

    let mut active: Vec<Check> = checks.into_iter().filter(|c| c.active).collect();
    match active.len() {
        0 => Err(CheckError::NotFound(format!("no active checks found with UUID {}", uuid))),
        1 => Ok(active.remove(0)),
        n => Err(CheckError::AmbiguousSearch {
            criteria: format!("f__check_uuid={}", uuid),
            active: n,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "a1b2c3d4-0000-4000-8000-1234567890ab";

    #[test]
    fn test_submission_url_uuid() {
        let url = format!("https://10.0.0.5:43191/module/httptrap/{}/s3cr3t", UUID);
        assert_eq!(submission_url_uuid(&url).unwrap().to_string(), UUID);
    }

    #[test]
    fn test_submission_url_uuid_rejects_other_paths() {
        assert!(submission_url_uuid("https://10.0.0.5:43191/module/json/x").is_err());
        assert!(submission_url_uuid("https://10.0.0.5/module/httptrap/not-a-uuid/secret").is_err());
        assert!(submission_url_uuid("not a url").is_err());
    }

    #[test]
    fn test_check_deserializes_api_shape() {
        let check: Check = serde_json::from_str(
            r#"{
                "_active": true,
                "_broker": "/broker/35",
                "_check_bundle": "/check_bundle/77",
                "_check_uuid": "a1b2c3d4-0000-4000-8000-1234567890ab",
                "_cid": "/check/1234",
                "_details": {"submission_url": "https://10.0.0.5:43191/module/httptrap/a1b2/s"}
            }"#,
        )
        .unwrap();
        assert_eq!(check.cid, "/check/1234");
        assert!(check.active);
        assert_eq!(check.check_bundle_cid, "/check_bundle/77");
        assert!(check.details.contains_key("submission_url"));
    }

    #[test]
    fn test_select_active_check() {
        let inactive = Check { cid: "/check/1".into(), ..Check::default() };
        let active = Check { cid: "/check/2".into(), active: true, ..Check::default() };

        let chosen = select_active_check(vec![inactive.clone(), active.clone()], UUID).unwrap();
        assert_eq!(chosen.cid, "/check/2");

        assert!(matches!(select_active_check(vec![], UUID), Err(CheckError::NotFound(_))));
        assert!(matches!(
            select_active_check(vec![inactive], UUID),
            Err(CheckError::NotFound(_))
        ));
        assert!(matches!(
            select_active_check(vec![active.clone(), active], UUID),
            Err(CheckError::AmbiguousSearch { active: 2, .. })
        ));
    }
}
