//! Fixed pauses between probes, tools and servers

use std::time::Duration;

use tracing::debug;

/// Pauses inserted between sequential calibration steps
///
/// Calibration is strictly sequential either way; pacing only spaces out
/// requests so provider rate limits are not tripped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pacing {
    pub between_probes: Duration,
    pub between_tools: Duration,
    pub between_servers: Duration,
}

impl Pacing {
    /// No pauses at all
    pub fn none() -> Self {
        Self::default()
    }

    pub async fn after_probe(&self) {
        pause("probe", self.between_probes).await;
    }

    pub async fn after_tool(&self) {
        pause("tool", self.between_tools).await;
    }

    pub async fn after_server(&self) {
        pause("server", self.between_servers).await;
    }
}

async fn pause(what: &str, duration: Duration) {
    if duration.is_zero() {
        return;
    }
    debug!(%what, ?duration, "pause: sleeping");
    tokio::time::sleep(duration).await;
}
