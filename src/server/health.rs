//! Health reporting
//!
//! Features:
//! - Liveness (is the process answering?)
//! - Table density (which tables a failed compaction left with gaps)

use serde::Serialize;
use std::time::Instant;

use crate::catalog::Catalog;

/// Health status
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// "healthy", or "degraded" while any table needs repair
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub tables: usize,
    pub tables_needing_repair: Vec<String>,
}

/// Health check manager
#[derive(Debug, Clone)]
pub struct HealthChecker {
    start_time: Instant,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn status(&self, catalog: &Catalog) -> HealthStatus {
        let flagged = catalog.tables_needing_repair();
        HealthStatus {
            status: if flagged.is_empty() { "healthy" } else { "degraded" }.to_string(),
            version: crate::VERSION.to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            tables: catalog.tables().len(),
            tables_needing_repair: flagged,
        }
    }
}
