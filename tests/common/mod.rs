/*!
 * Shared test utilities: synthetic PDF builders and scripted collaborators.
 */

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, Stream};

use pdflate::errors::LayoutError;
use pdflate::layout::{Region, RegionClass, RegionDetector};
use pdflate::Page;

/// Route `log` output through env_logger so RUST_LOG works in tests.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A text run to place on a synthetic page.
pub struct TestText {
    pub text: &'static str,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

impl TestText {
    pub fn new(text: &'static str, x: f32, y: f32, size: f32) -> Self {
        Self { text, x, y, size }
    }
}

/// One synthetic page: text runs plus optional graphics.
#[derive(Default)]
pub struct TestPage {
    pub texts: Vec<TestText>,
    pub with_image: bool,
    pub with_rect: bool,
}

impl TestPage {
    pub fn with_texts(texts: Vec<TestText>) -> Self {
        Self {
            texts,
            ..Default::default()
        }
    }
}

/// Builder for small in-memory PDFs used across the suite.
pub struct TestPdf {
    pages: Vec<TestPage>,
}

impl TestPdf {
    pub fn new() -> Self {
        Self { pages: Vec::new() }
    }

    pub fn page(mut self, page: TestPage) -> Self {
        self.pages.push(page);
        self
    }

    /// One page with a single text run, the most common fixture.
    pub fn single_text(text: &'static str, x: f32, y: f32, size: f32) -> Vec<u8> {
        Self::new()
            .page(TestPage::with_texts(vec![TestText::new(text, x, y, size)]))
            .build()
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids: Vec<Object> = Vec::new();
        for page in &self.pages {
            let mut resources = dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            };

            let mut operations: Vec<Operation> = Vec::new();
            for t in &page.texts {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Real(t.size)],
                ));
                operations.push(Operation::new(
                    "Td",
                    vec![Object::Real(t.x), Object::Real(t.y)],
                ));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(t.text)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }

            if page.with_image {
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 1,
                        "Height" => 1,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    vec![0x80],
                ));
                resources.set("XObject", dictionary! { "Im0" => image_id });
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        Object::Real(100.0),
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(50.0),
                        Object::Real(100.0),
                        Object::Real(300.0),
                    ],
                ));
                operations.push(Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]));
                operations.push(Operation::new("Q", vec![]));
            }

            if page.with_rect {
                operations.push(Operation::new(
                    "re",
                    vec![
                        Object::Real(50.0),
                        Object::Real(50.0),
                        Object::Real(200.0),
                        Object::Real(10.0),
                    ],
                ));
                operations.push(Operation::new("f", vec![]));
            }

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                content.encode().expect("encode test content"),
            ));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![
                    Object::Integer(0), Object::Integer(0),
                    Object::Integer(612), Object::Integer(792),
                ],
                "Resources" => resources,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("save test pdf");
        buffer
    }
}

/// Scripted detector for tests: a fixed region list per page, or failure.
pub enum ScriptedDetector {
    /// Same regions for every page
    Regions(Vec<Region>),
    /// Always fails, forcing the heuristic fallback
    Failing,
}

#[async_trait]
impl RegionDetector for ScriptedDetector {
    async fn detect(&self, _page: &Page) -> Result<Vec<Region>, LayoutError> {
        match self {
            ScriptedDetector::Regions(regions) => Ok(regions.clone()),
            ScriptedDetector::Failing => {
                Err(LayoutError::Unavailable("scripted failure".to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Convenience: a full-page text region.
pub fn full_page_text_region() -> Region {
    Region {
        bbox: pdflate::geometry::Rect::new(0.0, 0.0, 612.0, 792.0),
        class: RegionClass::Text,
        confidence: 0.9,
    }
}
