use async_trait::async_trait;

use crate::document::{Page, Primitive};
use crate::errors::LayoutError;
use crate::layout::{Region, RegionClass, RegionDetector};

/// Primitive-driven detector that needs no external model. It marks every
/// placed image as a figure and covers the rest of the page with a single
/// low-confidence text region, so every text run still gets translated.
pub struct HeuristicDetector;

impl HeuristicDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegionDetector for HeuristicDetector {
    async fn detect(&self, page: &Page) -> Result<Vec<Region>, LayoutError> {
        let mut regions = Vec::new();

        for primitive in &page.primitives {
            if let Primitive::Image(g) = primitive {
                regions.push(Region {
                    bbox: g.bbox,
                    class: RegionClass::Figure,
                    confidence: 0.5,
                });
            }
        }

        regions.push(Region {
            bbox: page.bounds(),
            class: RegionClass::Text,
            confidence: 0.3,
        });

        Ok(regions)
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_detect_withEmptyPage_shouldCoverPage() {
        let page = Page {
            index: 0,
            id: (1, 0),
            width: 612.0,
            height: 792.0,
            primitives: vec![],
            op_count: 0,
        };
        let regions = tokio_test::block_on(HeuristicDetector::new().detect(&page)).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].class, RegionClass::Text);
        assert!((regions[0].bbox.width() - 612.0).abs() < f32::EPSILON);
    }
}
