use pdflate::document::DocumentParser;
use pdflate::geometry::Rect;
use pdflate::layout::{Region, RegionClass};
use pdflate::segment::build_units;

use crate::common::{full_page_text_region, TestPage, TestPdf, TestText};

#[test]
fn test_build_units_fromParsedPage_shouldMergeAdjacentLines() {
    let bytes = TestPdf::new()
        .page(TestPage::with_texts(vec![
            TestText::new("The quick brown fox", 72.0, 700.0, 12.0),
            TestText::new("jumps over the lazy dog", 72.0, 686.0, 12.0),
        ]))
        .build();
    let document = DocumentParser::parse(&bytes).unwrap();
    let units = build_units(&document.pages[0], &[full_page_text_region()]);

    assert_eq!(units.len(), 1);
    assert_eq!(
        units[0].source_text,
        "The quick brown fox jumps over the lazy dog"
    );
    assert_eq!(units[0].primitive_indices.len(), 2);
}

#[test]
fn test_build_units_withTitleAndBodyRegions_shouldAssignByOverlap() {
    let bytes = TestPdf::new()
        .page(TestPage::with_texts(vec![
            TestText::new("Document Title", 72.0, 750.0, 18.0),
            TestText::new("Body paragraph text", 72.0, 400.0, 12.0),
        ]))
        .build();
    let document = DocumentParser::parse(&bytes).unwrap();

    let regions = vec![
        Region {
            bbox: Rect::new(0.0, 730.0, 612.0, 792.0),
            class: RegionClass::Title,
            confidence: 0.9,
        },
        Region {
            bbox: Rect::new(0.0, 0.0, 612.0, 730.0),
            class: RegionClass::Text,
            confidence: 0.9,
        },
    ];
    let units = build_units(&document.pages[0], &regions);

    assert_eq!(units.len(), 2);
    let title = units.iter().find(|u| u.class == RegionClass::Title).unwrap();
    let body = units.iter().find(|u| u.class == RegionClass::Text).unwrap();
    assert_eq!(title.source_text, "Document Title");
    assert_eq!(body.source_text, "Body paragraph text");
}

#[test]
fn test_build_units_withFigureRegion_shouldExcludeItsText() {
    let bytes = TestPdf::new()
        .page(TestPage::with_texts(vec![
            TestText::new("axis label", 100.0, 400.0, 8.0),
            TestText::new("Running prose", 72.0, 700.0, 12.0),
        ]))
        .build();
    let document = DocumentParser::parse(&bytes).unwrap();

    let regions = vec![
        Region {
            bbox: Rect::new(80.0, 350.0, 300.0, 450.0),
            class: RegionClass::Figure,
            confidence: 0.95,
        },
        full_page_text_region(),
    ];
    let units = build_units(&document.pages[0], &regions);

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].source_text, "Running prose");
}

#[test]
fn test_build_units_withNoRegions_shouldStillCoverAllText() {
    let bytes = TestPdf::single_text("Nothing detected here", 72.0, 400.0, 12.0);
    let document = DocumentParser::parse(&bytes).unwrap();
    let units = build_units(&document.pages[0], &[]);

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].source_text, "Nothing detected here");
}
