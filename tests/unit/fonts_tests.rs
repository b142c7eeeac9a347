use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use pdflate::fonts::{
    dominant_script, glyph_subset_of, BuiltinFontProvider, BundledFontProvider,
    ChainedFontProvider, FontFamily, FontKey, FontProvider, FontResolver, Script, StyleClass,
};

#[test]
fn test_resolver_withSameKeyAcrossUnits_shouldShareOneResource() {
    let resolver = FontResolver::builtin(true);
    let key = FontKey::new("ABCDEF+Helvetica-Bold", Script::Latin);
    let style = StyleClass::from_base_font("Helvetica-Bold");
    let glyphs = glyph_subset_of(["First unit", "Second unit"]);

    let (first, _) = resolver.resolve(&key, &style, &glyphs);
    let (second, _) = resolver.resolve(&key, &style, &glyphs);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(resolver.resources().len(), 1);
    assert_eq!(first.family_name, "Helvetica-Bold");
}

#[test]
fn test_resolver_glyphSubset_shouldBeUnionOfTranslatedText() {
    let resolver = FontResolver::builtin(true);
    let key = FontKey::new("Helvetica", Script::Latin);
    let glyphs = glyph_subset_of(["abc", "bcd"]);

    let (resource, _) = resolver.resolve(&key, &StyleClass::default(), &glyphs);
    let subset = resource.glyph_subset.as_ref().unwrap();
    let expected: Vec<char> = vec!['a', 'b', 'c', 'd'];
    assert_eq!(subset.iter().copied().collect::<Vec<_>>(), expected);
}

#[test]
fn test_bundled_provider_withFontFile_shouldLoadAndNameFromStem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("NotoSansSC.ttf");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"\x00\x01\x00\x00fake font program").unwrap();

    let mut fonts = HashMap::new();
    fonts.insert((Script::Han, FontFamily::Sans), path);
    let provider = BundledFontProvider::new(fonts, None);

    let asset = provider
        .font_for(Script::Han, &StyleClass::default())
        .unwrap();
    assert_eq!(asset.family_name, "NotoSansSC");
    assert!(!asset.is_builtin());

    // Serif requests for the same script reuse the only bundled family.
    let serif = StyleClass::new(FontFamily::Serif, false, false);
    assert!(provider.font_for(Script::Han, &serif).is_some());
}

#[test]
fn test_bundled_provider_withMissingFile_shouldBeUnavailable() {
    let mut fonts = HashMap::new();
    fonts.insert(
        (Script::Han, FontFamily::Sans),
        std::path::PathBuf::from("/nonexistent/font.ttf"),
    );
    let provider = BundledFontProvider::new(fonts, None);
    assert!(provider.font_for(Script::Han, &StyleClass::default()).is_none());
}

#[test]
fn test_chained_provider_shouldPreferEarlierProviders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("BundledLatin.ttf");
    std::fs::write(&path, b"font bytes").unwrap();
    let mut fonts = HashMap::new();
    fonts.insert((Script::Latin, FontFamily::Sans), path);

    let chain = ChainedFontProvider::new(vec![
        Arc::new(BuiltinFontProvider),
        Arc::new(BundledFontProvider::new(fonts, None)),
    ]);

    // Builtin answers Latin first, so the bundled file is never consulted.
    let asset = chain.font_for(Script::Latin, &StyleClass::default()).unwrap();
    assert_eq!(asset.family_name, "Helvetica");
    assert!(asset.is_builtin());
}

#[test]
fn test_dominant_script_withMixedText_shouldPickMajority() {
    assert_eq!(dominant_script("你好世界 (hello)"), Script::Han);
    assert_eq!(dominant_script("mostly english 好"), Script::Latin);
    assert_eq!(dominant_script("Привет мир"), Script::Cyrillic);
}
