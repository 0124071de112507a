//! Bundled chart backend

use crate::chart::ChartSpecification;
use crate::services::{BackendError, ChartBackend};
use async_trait::async_trait;
use wm_cache::ChartArtifact;

/// Backend that emits the chart specification as JSON
///
/// Stands in for a pixel renderer wherever the drawing itself is not
/// needed (CLI inspection, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonChartBackend;

impl JsonChartBackend {
    /// MIME type of produced artifacts
    pub const CONTENT_TYPE: &'static str = "application/json";
}

#[async_trait]
impl ChartBackend for JsonChartBackend {
    async fn render(
        &self,
        chart_type: &str,
        spec: &ChartSpecification,
    ) -> Result<ChartArtifact, BackendError> {
        let bytes = serde_json::to_vec_pretty(spec)
            .map_err(|e| BackendError::new(format!("cannot encode {chart_type}: {e}")))?;
        Ok(ChartArtifact::new(Self::CONTENT_TYPE, bytes))
    }
}
