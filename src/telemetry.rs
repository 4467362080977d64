//! Internal instrumentation for API traffic and trap resolution.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the host
//! process installs a recorder.

use std::time::Instant;

pub const API_REQUESTS: &str = "checkmgr_api_requests_total";
pub const API_ERRORS: &str = "checkmgr_api_errors_total";
pub const RESOLUTIONS: &str = "checkmgr_trap_resolutions_total";
pub const RESOLUTION_FAILURES: &str = "checkmgr_trap_resolution_failures_total";
pub const CHECKS_CREATED: &str = "checkmgr_checks_created_total";
pub const RESOLUTION_DURATION: &str = "checkmgr_trap_resolution_duration_seconds";

/// Records elapsed time into a histogram when dropped
pub struct TimingGuard {
    start: Instant,
    histogram_name: &'static str,
}

impl TimingGuard {
    pub fn new(histogram_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            histogram_name,
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        ::metrics::histogram!(self.histogram_name).record(duration);
    }
}

pub fn time_operation(histogram_name: &'static str) -> TimingGuard {
    TimingGuard::new(histogram_name)
}

pub fn api_request(method: &'static str) {
    ::metrics::counter!(API_REQUESTS, "method" => method).increment(1);
}

pub fn api_error(method: &'static str, status: u16) {
    ::metrics::counter!(API_ERRORS, "method" => method, "status" => status.to_string()).increment(1);
}

pub fn resolution(strategy: &'static str) {
    ::metrics::counter!(RESOLUTIONS, "strategy" => strategy).increment(1);
}

pub fn resolution_failed() {
    ::metrics::counter!(RESOLUTION_FAILURES).increment(1);
}

pub fn check_created() {
    ::metrics::counter!(CHECKS_CREATED).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_timing_guard_without_recorder() {
        let _timing = time_operation(RESOLUTION_DURATION);
        thread::sleep(Duration::from_millis(1));
    }

    #[test]
    fn test_counters_without_recorder() {
        api_request("GET");
        api_error("GET", 404);
        resolution("search");
        resolution_failed();
        check_created();
    }
}
