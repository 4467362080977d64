use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

use crate::app::ports::BrokerProbe;

/// Probes brokers with a plain TCP connect bounded by the configured response time.
pub struct TcpProbe;

#[async_trait]
impl BrokerProbe for TcpProbe {
    async fn reachable(&self, host: &str, port: u16, within: Duration) -> bool {
        let addr = format!("{}:{}", host, port);
        match tokio::time::timeout(within, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(addr = %addr, error = %e, "broker connect failed");
                false
            }
            Err(_) => {
                debug!(addr = %addr, timeout_ms = within.as_millis() as u64, "broker connect timed out");
                false
            }
        }
    }
}
