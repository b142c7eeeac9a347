use pdflate::document::DocumentParser;
use pdflate::errors::ParseError;
use pdflate::Primitive;

use crate::common::{TestPage, TestPdf, TestText};

#[test]
fn test_parse_withSingleTextRun_shouldDecodeTextAndGeometry() {
    let bytes = TestPdf::single_text("Hello World", 100.0, 700.0, 12.0);
    let document = DocumentParser::parse(&bytes).unwrap();

    assert_eq!(document.page_count(), 1);
    let page = &document.pages[0];
    assert!((page.width - 612.0).abs() < 0.01);
    assert!((page.height - 792.0).abs() < 0.01);

    let runs: Vec<_> = page.text_runs().collect();
    assert_eq!(runs.len(), 1);
    let (_, run) = runs[0];
    assert_eq!(run.text, "Hello World");
    assert!((run.origin.0 - 100.0).abs() < 0.01);
    assert!((run.origin.1 - 700.0).abs() < 0.01);
    assert!((run.size - 12.0).abs() < 0.01);
    assert_eq!(run.font.base_font, "Helvetica");
}

#[test]
fn test_parse_withImage_shouldProduceImagePrimitiveWithCtmBox() {
    let bytes = TestPdf::new()
        .page(TestPage {
            texts: vec![],
            with_image: true,
            with_rect: false,
        })
        .build();
    let document = DocumentParser::parse(&bytes).unwrap();
    let page = &document.pages[0];

    let images: Vec<_> = page
        .primitives
        .iter()
        .filter(|p| matches!(p, Primitive::Image(_)))
        .collect();
    assert_eq!(images.len(), 1);
    let bbox = images[0].bbox();
    assert!((bbox.x0 - 100.0).abs() < 0.01);
    assert!((bbox.y0 - 300.0).abs() < 0.01);
    assert!((bbox.x1 - 200.0).abs() < 0.01);
    assert!((bbox.y1 - 350.0).abs() < 0.01);
}

#[test]
fn test_parse_withFilledRect_shouldProduceVectorPath() {
    let bytes = TestPdf::new()
        .page(TestPage {
            texts: vec![],
            with_image: false,
            with_rect: true,
        })
        .build();
    let document = DocumentParser::parse(&bytes).unwrap();
    let page = &document.pages[0];

    let paths: Vec<_> = page
        .primitives
        .iter()
        .filter(|p| matches!(p, Primitive::VectorPath(_)))
        .collect();
    assert_eq!(paths.len(), 1);
    let bbox = paths[0].bbox();
    assert!((bbox.x0 - 50.0).abs() < 0.01);
    assert!((bbox.x1 - 250.0).abs() < 0.01);
}

#[test]
fn test_parse_withMultiplePages_shouldKeepPageOrder() {
    let bytes = TestPdf::new()
        .page(TestPage::with_texts(vec![TestText::new(
            "First", 72.0, 700.0, 12.0,
        )]))
        .page(TestPage::with_texts(vec![TestText::new(
            "Second", 72.0, 700.0, 12.0,
        )]))
        .build();
    let document = DocumentParser::parse(&bytes).unwrap();
    assert_eq!(document.page_count(), 2);
    assert_eq!(document.pages[0].plain_text(), "First");
    assert_eq!(document.pages[1].plain_text(), "Second");
    assert_eq!(document.pages[0].index, 0);
    assert_eq!(document.pages[1].index, 1);
}

#[test]
fn test_parse_withUncompressedContentStream_shouldNotBeFatal() {
    // Content streams without a Filter entry are legal and common; parsing
    // must read their bytes as-is instead of failing on decompression.
    let bytes = TestPdf::single_text("Plain stream", 72.0, 700.0, 12.0);
    let pdf = lopdf::Document::load_mem(&bytes).unwrap();
    let (_, &page_id) = pdf.get_pages().iter().next().unwrap();
    let contents = pdf.get_dictionary(page_id).unwrap().get(b"Contents").unwrap();
    let stream_id = contents.as_reference().unwrap();
    if let lopdf::Object::Stream(stream) = pdf.get_object(stream_id).unwrap() {
        assert!(stream.dict.get(b"Filter").is_err());
    } else {
        panic!("expected a content stream");
    }

    let document = DocumentParser::parse(&bytes).unwrap();
    assert_eq!(document.pages[0].plain_text(), "Plain stream");
}

#[test]
fn test_parse_withGarbage_shouldFailWithMalformed() {
    let result = DocumentParser::parse(b"definitely not a pdf");
    assert!(matches!(result, Err(ParseError::Malformed(_))));
}

#[test]
fn test_parse_withTextRunsOnSameBaseline_shouldKeepPaintOrder() {
    let bytes = TestPdf::new()
        .page(TestPage::with_texts(vec![
            TestText::new("left", 72.0, 700.0, 12.0),
            TestText::new("right", 200.0, 700.0, 12.0),
        ]))
        .build();
    let document = DocumentParser::parse(&bytes).unwrap();
    assert_eq!(document.pages[0].plain_text(), "left right");
}
