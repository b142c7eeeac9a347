/*!
 * Coarse page rasterization for layout detection.
 *
 * Region detectors consume an image of the page, not the primitive list. The
 * raster here is deliberately coarse: a grayscale buffer where text runs,
 * images and vector paths are stamped as filled rectangles at distinct
 * intensities. That is enough signal for block-level layout models, which
 * look at mass and whitespace rather than glyph shapes.
 */

use crate::document::{Page, Primitive};
use crate::geometry::Rect;

const BACKGROUND: u8 = 255;
const TEXT_INK: u8 = 40;
const GRAPHIC_INK: u8 = 150;

/// Grayscale raster of a page, row-major, top row first.
pub struct PageRaster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PageRaster {
    /// Render a page at the given resolution in pixels per point.
    pub fn render(page: &Page, scale: f32) -> Self {
        let width = ((page.width * scale).ceil() as u32).max(1);
        let height = ((page.height * scale).ceil() as u32).max(1);
        let mut raster = Self {
            width,
            height,
            pixels: vec![BACKGROUND; (width as usize) * (height as usize)],
        };

        for primitive in &page.primitives {
            let ink = match primitive {
                Primitive::Text(_) => TEXT_INK,
                Primitive::Image(_) | Primitive::VectorPath(_) => GRAPHIC_INK,
            };
            raster.stamp(&primitive.bbox(), page.height, scale, ink);
        }
        raster
    }

    fn stamp(&mut self, bbox: &Rect, page_height: f32, scale: f32, ink: u8) {
        if bbox.is_empty() && bbox.area() == 0.0 {
            return;
        }
        // Page space is bottom-up; raster rows are top-down
        let x0 = ((bbox.x0 * scale).floor().max(0.0) as u32).min(self.width);
        let x1 = ((bbox.x1 * scale).ceil().max(0.0) as u32).min(self.width);
        let y0 = (((page_height - bbox.y1) * scale).floor().max(0.0) as u32).min(self.height);
        let y1 = (((page_height - bbox.y0) * scale).ceil().max(0.0) as u32).min(self.height);

        for row in y0..y1 {
            let base = (row as usize) * (self.width as usize);
            for col in x0..x1 {
                let px = &mut self.pixels[base + col as usize];
                // Darker ink wins where primitives overlap
                if ink < *px {
                    *px = ink;
                }
            }
        }
    }

    /// Encode as a binary PGM (P5) image, the wire format sent to remote
    /// detectors.
    pub fn to_pgm(&self) -> Vec<u8> {
        let header = format!("P5\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }
}
