use pdflate::app_config::DualLayout;
use pdflate::document::DocumentParser;
use pdflate::fonts::FontResolver;
use pdflate::reconstruct::Reconstructor;
use pdflate::segment::{build_units, TranslationUnit};
use pdflate::Primitive;

use crate::common::{full_page_text_region, TestPage, TestPdf, TestText};

fn translated_units(bytes: &[u8], translation: &str) -> (pdflate::Document, Vec<TranslationUnit>) {
    let document = DocumentParser::parse(bytes).unwrap();
    let mut units = build_units(&document.pages[0], &[full_page_text_region()]);
    assert!(!units.is_empty());
    units[0].translation = Some(translation.to_string());
    (document, units)
}

fn save(doc: &mut lopdf::Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

#[test]
fn test_rebuild_mono_withLatinTranslation_shouldReplaceText() {
    let bytes = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    let (document, units) = translated_units(&bytes, "Bonjour le monde");

    let resolver = FontResolver::builtin(true);
    let reconstructor = Reconstructor::new(&resolver, 0.6);
    let (mut out, warnings) = reconstructor.rebuild_mono(&document, &units);
    assert!(warnings.is_empty());

    let reparsed = DocumentParser::parse(&save(&mut out)).unwrap();
    let text = reparsed.pages[0].plain_text();
    assert!(text.contains("Bonjour le monde"), "got: {text}");
    assert!(!text.contains("Hello World"));
}

#[test]
fn test_rebuild_mono_withoutTranslation_shouldLeaveTextIntact() {
    let bytes = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    let document = DocumentParser::parse(&bytes).unwrap();
    let units = build_units(&document.pages[0], &[full_page_text_region()]);
    // No unit carries a translation; the page passes through.

    let resolver = FontResolver::builtin(true);
    let reconstructor = Reconstructor::new(&resolver, 0.6);
    let (mut out, _) = reconstructor.rebuild_mono(&document, &units);

    let reparsed = DocumentParser::parse(&save(&mut out)).unwrap();
    assert_eq!(reparsed.pages[0].plain_text(), "Hello World");
}

#[test]
fn test_rebuild_mono_withGraphics_shouldPreserveNonText() {
    let bytes = TestPdf::new()
        .page(TestPage {
            texts: vec![TestText::new("Caption text", 100.0, 260.0, 10.0)],
            with_image: true,
            with_rect: true,
        })
        .build();
    let (document, units) = translated_units(&bytes, "Texte de legende");

    let resolver = FontResolver::builtin(true);
    let reconstructor = Reconstructor::new(&resolver, 0.6);
    let (mut out, _) = reconstructor.rebuild_mono(&document, &units);

    let reparsed = DocumentParser::parse(&save(&mut out)).unwrap();
    let page = &reparsed.pages[0];

    let images: Vec<_> = page
        .primitives
        .iter()
        .filter(|p| matches!(p, Primitive::Image(_)))
        .collect();
    assert_eq!(images.len(), 1);
    let bbox = images[0].bbox();
    assert!((bbox.x0 - 100.0).abs() < 0.01);
    assert!((bbox.y1 - 350.0).abs() < 0.01);

    let paths: Vec<_> = page
        .primitives
        .iter()
        .filter(|p| matches!(p, Primitive::VectorPath(_)))
        .collect();
    assert_eq!(paths.len(), 1);
}

#[test]
fn test_rebuild_dual_alternate_shouldInterleavePages() {
    let bytes = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    let (document, units) = translated_units(&bytes, "Bonjour le monde");

    let resolver = FontResolver::builtin(true);
    let reconstructor = Reconstructor::new(&resolver, 0.6);
    let (mut out, _) = reconstructor
        .rebuild_dual(&document, &units, DualLayout::Alternate)
        .unwrap();

    let reparsed = DocumentParser::parse(&save(&mut out)).unwrap();
    assert_eq!(reparsed.page_count(), 2);
    assert_eq!(reparsed.pages[0].plain_text(), "Hello World");
    assert!(reparsed.pages[1].plain_text().contains("Bonjour le monde"));
}

#[test]
fn test_rebuild_dual_sideBySide_shouldDoubleThePageWidth() {
    let bytes = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    let (document, units) = translated_units(&bytes, "Bonjour le monde");

    let resolver = FontResolver::builtin(true);
    let reconstructor = Reconstructor::new(&resolver, 0.6);
    let (mut out, _) = reconstructor
        .rebuild_dual(&document, &units, DualLayout::SideBySide)
        .unwrap();

    let reparsed = DocumentParser::parse(&save(&mut out)).unwrap();
    assert_eq!(reparsed.page_count(), 1);
    let page = &reparsed.pages[0];
    assert!((page.width - 1224.0).abs() < 0.01);

    let text = page.plain_text();
    assert!(text.contains("Hello World"));
    assert!(text.contains("Bonjour le monde"));
}
