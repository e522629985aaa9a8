use crate::message::BulkSendReport;
use crate::metrics::MessageStats;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Final outcome of one harness run.
///
/// Written as pretty-printed JSON when the demo is given an output file, so
/// external tooling can pick the figures up without scraping logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub version: String,
    pub bulk_report: BulkSendReport,
    pub stats: MessageStats,
    /// Envelopes still held in the delivery log at the end of the run
    pub retained_deliveries: usize,
}

impl RunSummary {
    pub fn new(bulk_report: BulkSendReport, stats: MessageStats, retained_deliveries: usize) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            bulk_report,
            stats,
            retained_deliveries,
        }
    }

    /// Write the summary to a JSON file, replacing any existing content
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Results written to: {:?}", path);
        Ok(())
    }
}
