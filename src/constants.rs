/// Resource path prefixes and CID patterns for the Circonus v2 API

pub const CHECK_PREFIX: &str = "/check";
pub const CHECK_BUNDLE_PREFIX: &str = "/check_bundle";
pub const BROKER_PREFIX: &str = "/broker";
pub const METRIC_CLUSTER_PREFIX: &str = "/metric_cluster";

pub const CHECK_CID_REGEX: &str = r"^/check/[0-9]+$";
pub const CHECK_BUNDLE_CID_REGEX: &str = r"^/check_bundle/[0-9]+$";
pub const BROKER_CID_REGEX: &str = r"^/broker/[0-9]+$";
pub const METRIC_CLUSTER_CID_REGEX: &str = r"^/metric_cluster/[0-9]+$";

// API defaults
pub const DEFAULT_API_URL: &str = "https://api.circonus.com/v2";
pub const DEFAULT_API_APP: &str = "check_manager";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;

pub const AUTH_TOKEN_HEADER: &str = "X-Circonus-Auth-Token";
pub const APP_NAME_HEADER: &str = "X-Circonus-App-Name";

// Env overrides applied on top of the config file
pub const ENV_API_TOKEN: &str = "CIRCONUS_API_TOKEN";
pub const ENV_API_URL: &str = "CIRCONUS_API_URL";
pub const ENV_API_APP: &str = "CIRCONUS_API_APP";

// Check bundle defaults used when creating a new check
pub const DEFAULT_CHECK_TYPE: &str = "httptrap";
pub const DEFAULT_CHECK_PERIOD: u32 = 60;
pub const DEFAULT_CHECK_TIMEOUT: f32 = 10.0;
pub const STATUS_ACTIVE: &str = "active";

// Brokers
pub const DEFAULT_BROKER_PORT: u16 = 43191;
pub const DEFAULT_BROKER_MAX_RESPONSE_MS: u64 = 500;

// Secrets
pub const SECRET_SOURCE_BYTES: usize = 2048;
pub const SECRET_LENGTH: usize = 16;
/// Used only when the OS random source fails. Callers can detect it via `Secret::is_insecure`.
pub const INSECURE_FALLBACK_SECRET: &str = "myS3cr3t";

pub const DEFAULT_CONFIG_PATH: &str = "checkmgr.toml";
pub const DEFAULT_LOG_DIR: &str = "logs";
