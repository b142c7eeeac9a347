/*!
 * In-memory content model of a paginated document.
 *
 * The parser decodes raw PDF bytes into a [`Document`] of [`Page`]s, each an
 * ordered sequence of [`Primitive`]s. Sequence order is paint order (z-order)
 * and is load-bearing: reconstruction re-emits passthrough content in exactly
 * this order. The model is immutable once parsed; translation state lives in
 * [`crate::segment::TranslationUnit`], not here.
 */

use crate::fonts::StyleClass;
use crate::geometry::Rect;

pub mod parser;
pub mod raster;

pub use parser::DocumentParser;
pub use raster::PageRaster;

/// A parsed document: ordered pages plus the underlying PDF structure, which
/// reconstruction reuses for byte-identical passthrough of non-text content.
pub struct Document {
    /// Pages in document order
    pub pages: Vec<Page>,
    pub(crate) pdf: lopdf::Document,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The underlying PDF, for reconstruction.
    pub(crate) fn pdf(&self) -> &lopdf::Document {
        &self.pdf
    }
}

/// A single page: raster dimensions plus primitives in paint order.
pub struct Page {
    /// Zero-based page index
    pub index: usize,
    /// lopdf object id of the page dictionary
    pub(crate) id: (u32, u16),
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Primitives in paint order
    pub primitives: Vec<Primitive>,
    /// Total number of content-stream operations on this page
    pub(crate) op_count: usize,
}

impl Page {
    /// Iterate text runs with their primitive index.
    pub fn text_runs(&self) -> impl Iterator<Item = (usize, &TextRun)> {
        self.primitives
            .iter()
            .enumerate()
            .filter_map(|(i, p)| match p {
                Primitive::Text(run) => Some((i, run)),
                _ => None,
            })
    }

    /// Concatenated text content in paint order, for tests and diagnostics.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for (_, run) in self.text_runs() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&run.text);
        }
        out
    }

    /// Full-page rect.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// A positioned page primitive. Closed set; consumers match exhaustively.
pub enum Primitive {
    /// A run of text painted with one font at one baseline position
    Text(TextRun),
    /// A placed image (XObject invocation)
    Image(GraphicPrimitive),
    /// A painted vector path
    VectorPath(GraphicPrimitive),
}

impl Primitive {
    pub fn bbox(&self) -> Rect {
        match self {
            Primitive::Text(run) => run.bbox,
            Primitive::Image(g) | Primitive::VectorPath(g) => g.bbox,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Primitive::Text(_))
    }
}

/// The font a text run was painted with.
#[derive(Debug, Clone)]
pub struct FontRef {
    /// Resource name in the page's font dictionary (e.g. `F1`)
    pub resource_name: String,
    /// BaseFont name (e.g. `ABCDEF+Times-Bold`)
    pub base_font: String,
    /// Style classification derived from the BaseFont name
    pub style: StyleClass,
}

/// A run of text: decoded characters plus the geometry they were painted at.
#[derive(Debug, Clone)]
pub struct TextRun {
    /// Decoded text
    pub text: String,
    /// Source font
    pub font: FontRef,
    /// Effective font size in page space (Tf size times text/CTM scale)
    pub size: f32,
    /// Baseline origin in page coordinates
    pub origin: (f32, f32),
    /// Bounding box in page coordinates (width is a metric estimate)
    pub bbox: Rect,
    /// Fill color as RGB in [0, 1]
    pub fill_color: [f32; 3],
    /// Indices of the text-showing operations in the page's content stream
    /// that painted this run. Reconstruction drops exactly these when the
    /// run is translated.
    pub(crate) show_ops: Vec<usize>,
}

/// A non-text primitive: geometry plus the content-stream span that painted
/// it. Always passed through unchanged.
#[derive(Debug, Clone)]
pub struct GraphicPrimitive {
    /// Bounding box in page coordinates
    pub bbox: Rect,
    /// Index of the painting operation
    pub(crate) op_index: usize,
}
