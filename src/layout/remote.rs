use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::document::{Page, PageRaster};
use crate::errors::LayoutError;
use crate::layout::{Region, RegionClass, RegionDetector};
use crate::geometry::Rect;

/// Rendering scale sent to the detector, in pixels per point.
const DETECTOR_SCALE: f32 = 2.0;

/// Detector backed by an external layout-analysis service. The page is
/// rendered to a coarse grayscale image and posted to the service, which
/// answers with classified boxes in image coordinates.
pub struct RemoteDetector {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

/// One detection in the service's response, boxes in image pixels with the
/// origin at the top-left.
#[derive(Debug, Deserialize)]
struct Detection {
    bbox: [f32; 4],
    class: RegionClass,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    regions: Vec<Detection>,
}

impl RemoteDetector {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, LayoutError> {
        url::Url::parse(endpoint)
            .map_err(|e| LayoutError::Unavailable(format!("Invalid endpoint '{endpoint}': {e}")))?;
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LayoutError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Map a detection from image pixels (top-down) to page points
    /// (bottom-up).
    fn to_page_region(&self, det: &Detection, page: &Page) -> Region {
        let [px0, py0, px1, py1] = det.bbox;
        let x0 = px0 / DETECTOR_SCALE;
        let x1 = px1 / DETECTOR_SCALE;
        let y0 = page.height - py1 / DETECTOR_SCALE;
        let y1 = page.height - py0 / DETECTOR_SCALE;
        Region {
            bbox: Rect::new(x0, y0, x1, y1),
            class: det.class,
            confidence: det.confidence.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl RegionDetector for RemoteDetector {
    async fn detect(&self, page: &Page) -> Result<Vec<Region>, LayoutError> {
        let raster = PageRaster::render(page, DETECTOR_SCALE);
        let body = raster.to_pgm();
        debug!(
            "Posting page {} raster ({}x{}) to {}",
            page.index, raster.width, raster.height, self.endpoint
        );

        let url = format!("{}/detect", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "image/x-portable-graymap")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LayoutError::Timeout(self.timeout.as_secs())
                } else {
                    LayoutError::Unavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(LayoutError::Unavailable(format!(
                "Detector returned status {}",
                response.status()
            )));
        }

        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| LayoutError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .regions
            .iter()
            .map(|d| self.to_page_region(d, page))
            .collect())
    }

    fn name(&self) -> &str {
        "remote"
    }
}
