/*!
 * Layout analysis.
 *
 * Classifies each page into typed regions. Detection is pluggable behind
 * [`RegionDetector`]: the default [`HeuristicDetector`] needs nothing but the
 * primitives, while [`RemoteDetector`] calls an external layout model over
 * HTTP. A remote failure never fails the job; the pipeline falls back to the
 * heuristic and records the degradation.
 */

use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::document::Page;
use crate::errors::LayoutError;
use crate::geometry::Rect;
use crate::report::JobWarning;

mod heuristic;
mod remote;

pub use heuristic::HeuristicDetector;
pub use remote::RemoteDetector;

/// Classification of a page region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionClass {
    /// Body text
    Text,
    /// Heading or title
    Title,
    /// Figure or image area
    Figure,
    /// Caption attached to a figure or table
    Caption,
    /// Tabular content
    Table,
    /// Mathematical formula
    Formula,
}

impl RegionClass {
    /// Whether text inside this region is sent for translation. Formula and
    /// table content passes through verbatim; figures carry no flowing text.
    pub fn is_translatable(self) -> bool {
        matches!(self, RegionClass::Text | RegionClass::Title | RegionClass::Caption)
    }
}

/// A classified page region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// Region box in page coordinates
    pub bbox: Rect,
    /// Region class
    pub class: RegionClass,
    /// Detector confidence in [0, 1]
    pub confidence: f32,
}

/// A pluggable region detector.
#[async_trait]
pub trait RegionDetector: Send + Sync {
    /// Detect regions on one page. Regions may overlap; assignment picks the
    /// best match per primitive.
    async fn detect(&self, page: &Page) -> Result<Vec<Region>, LayoutError>;

    /// Detector name for logs and reports.
    fn name(&self) -> &str;
}

/// Run the configured detector with heuristic fallback. Returns the regions
/// plus a warning when the primary detector degraded.
pub async fn detect_with_fallback(
    detector: &dyn RegionDetector,
    page: &Page,
) -> (Vec<Region>, Option<JobWarning>) {
    match detector.detect(page).await {
        Ok(regions) => (regions, None),
        Err(e) => {
            warn!(
                "Detector '{}' failed on page {}: {}. Falling back to heuristic",
                detector.name(),
                page.index,
                e
            );
            let fallback = HeuristicDetector::new();
            // The heuristic cannot fail
            let regions = fallback.detect(page).await.unwrap_or_default();
            let warning = JobWarning::LayoutDegraded {
                page: page.index,
                reason: e.to_string(),
            };
            (regions, Some(warning))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_class_is_translatable_shouldMatchClass() {
        assert!(RegionClass::Text.is_translatable());
        assert!(RegionClass::Title.is_translatable());
        assert!(RegionClass::Caption.is_translatable());
        assert!(!RegionClass::Formula.is_translatable());
        assert!(!RegionClass::Table.is_translatable());
        assert!(!RegionClass::Figure.is_translatable());
    }
}
