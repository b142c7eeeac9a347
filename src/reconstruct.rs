/*!
 * Page reconstruction.
 *
 * Rewrites each page's content stream so translated text occupies the
 * original region geometry while every other operation passes through
 * byte-identically. Only the text-showing operations of replaced runs are
 * dropped; images, paths, state changes and untouched runs keep their exact
 * operator sequence and therefore their z-order.
 *
 * Translated text is fitted with a shrink-then-overflow policy: the font
 * size steps down until the wrapped lines fit the region box, never below a
 * configured floor of the original size. Text still overflowing at the floor
 * is painted anyway and recorded as an [`JobWarning::Overflow`].
 */

use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream, StringFormat};

use crate::app_config::DualLayout;
use crate::document::parser::{char_advance_em, page_content};
use crate::document::{Document, Page, Primitive, TextRun};
use crate::errors::ReconstructionError;
use crate::fonts::{dominant_script, glyph_subset_of, FontKey, FontResolver, FontResource};
use crate::geometry::Rect;
use crate::report::JobWarning;
use crate::segment::TranslationUnit;

/// Line height as a multiple of the font size.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Shrink step applied while text does not fit.
const SHRINK_STEP: f32 = 0.9;

/// Fitted layout of one unit's output text.
struct FittedText {
    lines: Vec<String>,
    size: f32,
    overflow: bool,
}

/// Greedy line wrap at an assumed font size. Full-width characters break
/// anywhere; Latin-like text breaks at whitespace. A single token wider than
/// the box overflows horizontally rather than being cut.
fn wrap_lines(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0f32;

    let mut push_token = |token: &str, width: f32, lines: &mut Vec<String>,
                          line: &mut String, line_width: &mut f32, space: bool| {
        let sep = if space && !line.is_empty() { 0.5 * size } else { 0.0 };
        if !line.is_empty() && *line_width + sep + width > max_width {
            lines.push(std::mem::take(line));
            *line_width = 0.0;
        }
        if !line.is_empty() && space {
            line.push(' ');
            *line_width += 0.5 * size;
        }
        line.push_str(token);
        *line_width += width;
    };

    let mut word = String::new();
    let mut word_width = 0.0f32;
    for ch in text.chars() {
        if ch == '\n' {
            if !word.is_empty() {
                push_token(&word, word_width, &mut lines, &mut line, &mut line_width, true);
                word.clear();
                word_width = 0.0;
            }
            lines.push(std::mem::take(&mut line));
            line_width = 0.0;
        } else if ch.is_whitespace() {
            if !word.is_empty() {
                push_token(&word, word_width, &mut lines, &mut line, &mut line_width, true);
                word.clear();
                word_width = 0.0;
            }
        } else if char_advance_em(ch) >= 1.0 {
            if !word.is_empty() {
                push_token(&word, word_width, &mut lines, &mut line, &mut line_width, true);
                word.clear();
                word_width = 0.0;
            }
            let width = char_advance_em(ch) * size;
            push_token(&ch.to_string(), width, &mut lines, &mut line, &mut line_width, false);
        } else {
            word.push(ch);
            word_width += char_advance_em(ch) * size;
        }
    }
    if !word.is_empty() {
        push_token(&word, word_width, &mut lines, &mut line, &mut line_width, true);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn line_width(line: &str, size: f32) -> f32 {
    line.chars().map(|c| char_advance_em(c) * size).sum()
}

/// Fit text into a box, shrinking down to `floor_ratio` of the original size
/// before conceding overflow.
fn fit_text(text: &str, bbox: &Rect, original_size: f32, floor_ratio: f32) -> FittedText {
    let floor = (original_size * floor_ratio).max(1.0);
    let mut size = original_size.max(1.0);

    loop {
        let lines = wrap_lines(text, size, bbox.width());
        // Run boxes are one em tall, so the first line counts at the bare
        // size; the leading factor applies only between lines.
        let height = size + (lines.len() - 1) as f32 * size * LINE_HEIGHT_FACTOR;
        let widest = lines
            .iter()
            .map(|l| line_width(l, size))
            .fold(0.0f32, f32::max);
        let fits = height <= bbox.height() + 0.01 && widest <= bbox.width() + 0.01;

        if fits {
            return FittedText {
                lines,
                size,
                overflow: false,
            };
        }
        let next = size * SHRINK_STEP;
        if next < floor {
            return FittedText {
                lines,
                size,
                overflow: true,
            };
        }
        size = next;
    }
}

/// Registry of substitute fonts added to one output document. A resource is
/// registered once and shared by every page that uses it.
struct FontRegistry {
    /// family name -> (resource name, font object id, needs CID encoding)
    entries: HashMap<String, (String, ObjectId, bool)>,
    next_index: usize,
}

impl FontRegistry {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_index: 0,
        }
    }

    fn register(
        &mut self,
        doc: &mut lopdf::Document,
        resource: &FontResource,
    ) -> (String, ObjectId, bool) {
        if let Some(entry) = self.entries.get(&resource.family_name) {
            return entry.clone();
        }
        let res_name = format!("TF{}", self.next_index);
        self.next_index += 1;

        let (font_id, is_cid) = if resource.is_builtin() {
            (add_simple_font(doc, &resource.family_name), false)
        } else {
            (add_cid_font(doc, resource), true)
        };

        let entry = (res_name, font_id, is_cid);
        self.entries
            .insert(resource.family_name.clone(), entry.clone());
        entry
    }
}

/// Base-14 style simple font with WinAnsi encoding.
fn add_simple_font(doc: &mut lopdf::Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Embedded composite font: Type0 over CIDFontType2 with Identity-H, where
/// the CID of a character is its Unicode code point. The width array covers
/// the glyph subset; everything else defaults to full width.
fn add_cid_font(doc: &mut lopdf::Document, resource: &FontResource) -> ObjectId {
    let font_file_id = doc.add_object(Stream::new(
        dictionary! { "Length1" => resource.data.len() as i64 },
        resource.data.as_ref().clone(),
    ));

    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => resource.family_name.as_str(),
        "Flags" => 4,
        "FontBBox" => vec![
            Object::Integer(-200), Object::Integer(-300),
            Object::Integer(1200), Object::Integer(1000),
        ],
        "ItalicAngle" => 0,
        "Ascent" => 880,
        "Descent" => -120,
        "CapHeight" => 700,
        "StemV" => 80,
        "FontFile2" => font_file_id,
    });

    let widths = subset_widths(resource.glyph_subset.as_ref());
    let descendant_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => resource.family_name.as_str(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode_id = doc.add_object(Stream::new(
        Dictionary::new(),
        to_unicode_cmap(resource.glyph_subset.as_ref()),
    ));

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => resource.family_name.as_str(),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(descendant_id)],
        "ToUnicode" => to_unicode_id,
    })
}

/// W array entries for the glyph subset: half-width code points get 500,
/// the DW default of 1000 covers the rest.
fn subset_widths(subset: Option<&BTreeSet<char>>) -> Vec<Object> {
    let mut widths = Vec::new();
    if let Some(subset) = subset {
        for &ch in subset {
            if (ch as u32) <= 0xFFFF && char_advance_em(ch) < 1.0 {
                widths.push(Object::Integer(ch as i64));
                widths.push(Object::Array(vec![Object::Integer(500)]));
            }
        }
    }
    widths
}

/// Identity ToUnicode CMap over the BMP code points of the subset.
fn to_unicode_cmap(subset: Option<&BTreeSet<char>>) -> Vec<u8> {
    let mut bfchar = String::new();
    let mut count = 0usize;
    if let Some(subset) = subset {
        for &ch in subset {
            let code = ch as u32;
            if code <= 0xFFFF {
                bfchar.push_str(&format!("<{code:04X}> <{code:04X}>\n"));
                count += 1;
            }
        }
    }
    let cmap = format!(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
         {count} beginbfchar\n{bfchar}endbfchar\n\
         endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n"
    );
    cmap.into_bytes()
}

/// Encode a line of text for the given font kind.
fn encode_line(line: &str, is_cid: bool) -> Object {
    if is_cid {
        let mut bytes = Vec::with_capacity(line.len() * 2);
        for unit in line.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    } else {
        // WinAnsi is a Latin-1 superset for the range we emit
        let bytes = line
            .chars()
            .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
            .collect();
        Object::String(bytes, StringFormat::Literal)
    }
}

/// Add a font reference to a page's resource dictionary, creating the
/// dictionaries along the way when absent.
fn add_page_font(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    res_name: &str,
    font_id: ObjectId,
) -> Result<(), ReconstructionError> {
    // Resources may be inline or referenced; normalize to an inline dict on
    // this page so sibling pages sharing the parent's dict are unaffected.
    let resources = {
        let page_dict = doc.get_dictionary(page_id)?;
        match page_dict.get(b"Resources") {
            Ok(Object::Reference(r)) => doc.get_dictionary(*r)?.clone(),
            Ok(Object::Dictionary(d)) => d.clone(),
            _ => Dictionary::new(),
        }
    };

    let mut resources = resources;
    let mut font_dict = match resources.get(b"Font") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(r)) => doc.get_dictionary(*r)?.clone(),
        _ => Dictionary::new(),
    };
    font_dict.set(res_name.as_bytes(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(font_dict));

    let page_dict = doc.get_dictionary_mut(page_id)?;
    page_dict.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Operations painting one fitted unit.
fn unit_operations(
    unit: &TranslationUnit,
    fitted: &FittedText,
    res_name: &str,
    is_cid: bool,
) -> Vec<Operation> {
    let [r, g, b] = unit.fill_color;
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ),
        Operation::new(
            "Tf",
            vec![Object::Name(res_name.into()), Object::Real(fitted.size)],
        ),
    ];

    let mut baseline = unit.bbox.y1 - fitted.size;
    for line in &fitted.lines {
        ops.push(Operation::new(
            "Tm",
            vec![
                Object::Real(1.0),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(1.0),
                Object::Real(unit.bbox.x0),
                Object::Real(baseline),
            ],
        ));
        ops.push(Operation::new("Tj", vec![encode_line(line, is_cid)]));
        baseline -= fitted.size * LINE_HEIGHT_FACTOR;
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

/// Rebuilds output documents from a parsed document and its translated
/// units. Holds the shared font resolver; pages are otherwise independent.
pub struct Reconstructor<'a> {
    resolver: &'a FontResolver,
    floor_ratio: f32,
}

/// First text run of a unit, for its source font name.
pub(crate) fn unit_source_run<'p>(page: &'p Page, unit: &TranslationUnit) -> Option<&'p TextRun> {
    unit.primitive_indices
        .iter()
        .find_map(|&i| match page.primitives.get(i) {
            Some(Primitive::Text(run)) => Some(run),
            _ => None,
        })
}

impl<'a> Reconstructor<'a> {
    pub fn new(resolver: &'a FontResolver, floor_ratio: f32) -> Self {
        Self {
            resolver,
            floor_ratio,
        }
    }

    /// Rewrite one page's content in `out`. Returns overflow warnings; any
    /// error leaves the page untouched for the caller to fall back on.
    fn rewrite_page(
        &self,
        source: &Document,
        out: &mut lopdf::Document,
        registry: &mut FontRegistry,
        out_page_id: ObjectId,
        page: &Page,
        units: &[&TranslationUnit],
    ) -> Result<Vec<JobWarning>, ReconstructionError> {
        let mut warnings = Vec::new();

        // Units that actually carry a translation are re-typeset; failed
        // units keep their original operations untouched.
        let replaced: Vec<&&TranslationUnit> =
            units.iter().filter(|u| u.translation.is_some()).collect();

        let mut dropped_ops: HashSet<usize> = HashSet::new();
        for unit in &replaced {
            for &prim_index in &unit.primitive_indices {
                if let Some(Primitive::Text(run)) = page.primitives.get(prim_index) {
                    dropped_ops.extend(run.show_ops.iter().copied());
                }
            }
        }

        let content_bytes = page_content(source.pdf(), page.id)?;
        let content = Content::decode(&content_bytes)?;

        let mut operations: Vec<Operation> = content
            .operations
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !dropped_ops.contains(i))
            .map(|(_, op)| op)
            .collect();

        for unit in &replaced {
            let text = unit.output_text();
            if text.trim().is_empty() {
                continue;
            }
            let script = dominant_script(&text);
            let source_font = unit_source_run(page, unit)
                .map(|run| run.font.base_font.clone())
                .ok_or_else(|| {
                    ReconstructionError::MissingResource(format!(
                        "Unit {} has no text run",
                        unit.unit_index
                    ))
                })?;
            let key = FontKey::new(source_font, script);
            let (resource, warning) =
                self.resolver
                    .resolve(&key, &unit.style, &glyph_subset_of([text.as_str()]));
            warnings.extend(warning);

            let (res_name, font_id, is_cid) = registry.register(out, &resource);
            add_page_font(out, out_page_id, &res_name, font_id)?;

            let fitted = fit_text(&text, &unit.bbox, unit.size, self.floor_ratio);
            if fitted.overflow {
                debug!(
                    "Unit {} on page {} overflows at floor size {:.1}",
                    unit.unit_index, page.index, fitted.size
                );
                warnings.push(JobWarning::Overflow {
                    page: page.index,
                    unit: unit.unit_index,
                    floor_size: fitted.size,
                });
            }
            operations.extend(unit_operations(unit, &fitted, &res_name, is_cid));
        }

        let encoded = Content { operations }.encode()?;
        out.change_page_content(out_page_id, encoded)?;
        Ok(warnings)
    }

    /// Monolingual output: every page rebuilt in place. A page that fails to
    /// rewrite keeps its original content and is reported.
    pub fn rebuild_mono(
        &self,
        document: &Document,
        units: &[TranslationUnit],
    ) -> (lopdf::Document, Vec<JobWarning>) {
        let mut out = document.pdf().clone();
        let mut registry = FontRegistry::new();
        let mut warnings = Vec::new();

        for page in &document.pages {
            let page_units: Vec<&TranslationUnit> = units
                .iter()
                .filter(|u| u.page_index == page.index)
                .collect();
            match self.rewrite_page(document, &mut out, &mut registry, page.id, page, &page_units)
            {
                Ok(mut w) => warnings.append(&mut w),
                Err(e) => {
                    warn!("Page {} failed to rebuild: {}. Emitting original", page.index, e);
                    warnings.push(JobWarning::PageFallback {
                        page: page.index,
                        error: e.to_string(),
                    });
                }
            }
        }
        (out, warnings)
    }

    /// Bilingual output. `Alternate` interleaves each source page with its
    /// translated counterpart; `SideBySide` composites both onto one
    /// double-width page.
    pub fn rebuild_dual(
        &self,
        document: &Document,
        units: &[TranslationUnit],
        layout: DualLayout,
    ) -> Result<(lopdf::Document, Vec<JobWarning>), ReconstructionError> {
        match layout {
            DualLayout::Alternate => self.rebuild_dual_alternate(document, units),
            DualLayout::SideBySide => self.rebuild_dual_side_by_side(document, units),
        }
    }

    fn rebuild_dual_alternate(
        &self,
        document: &Document,
        units: &[TranslationUnit],
    ) -> Result<(lopdf::Document, Vec<JobWarning>), ReconstructionError> {
        let mut out = document.pdf().clone();
        let mut registry = FontRegistry::new();
        let mut warnings = Vec::new();

        let pages_id = root_pages_id(&out)?;
        let mut kids: Vec<Object> = Vec::with_capacity(document.pages.len() * 2);

        for page in &document.pages {
            // Duplicate the page dict with its own content stream; rewriting
            // through a shared stream reference would mutate the source page
            // as well.
            let original_content = page_content(document.pdf(), page.id)?;
            let mut copy = out.get_dictionary(page.id)?.clone();
            let content_id = out.add_object(Stream::new(Dictionary::new(), original_content));
            copy.set("Contents", Object::Reference(content_id));
            let copy_id = out.add_object(copy);

            let page_units: Vec<&TranslationUnit> = units
                .iter()
                .filter(|u| u.page_index == page.index)
                .collect();
            match self.rewrite_page(document, &mut out, &mut registry, copy_id, page, &page_units)
            {
                Ok(mut w) => warnings.append(&mut w),
                Err(e) => {
                    warn!("Page {} failed to rebuild: {}. Emitting original", page.index, e);
                    warnings.push(JobWarning::PageFallback {
                        page: page.index,
                        error: e.to_string(),
                    });
                }
            }

            for id in [page.id, copy_id] {
                let dict = out.get_dictionary_mut(id)?;
                dict.set("Parent", Object::Reference(pages_id));
                kids.push(Object::Reference(id));
            }
        }

        let count = kids.len() as i64;
        let pages_dict = out.get_dictionary_mut(pages_id)?;
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(count));
        Ok((out, warnings))
    }

    fn rebuild_dual_side_by_side(
        &self,
        document: &Document,
        units: &[TranslationUnit],
    ) -> Result<(lopdf::Document, Vec<JobWarning>), ReconstructionError> {
        let mut out = document.pdf().clone();
        let mut registry = FontRegistry::new();
        let mut warnings = Vec::new();

        let pages_id = root_pages_id(&out)?;
        let mut kids: Vec<Object> = Vec::with_capacity(document.pages.len());

        for page in &document.pages {
            // Right half: rewritten copy of the page, shifted one width over.
            // The copy gets its own content stream so the rewrite cannot
            // reach the stream the source page references.
            let original_content = page_content(document.pdf(), page.id)?;
            let mut copy = out.get_dictionary(page.id)?.clone();
            let content_id =
                out.add_object(Stream::new(Dictionary::new(), original_content.clone()));
            copy.set("Contents", Object::Reference(content_id));
            let copy_id = out.add_object(copy);

            let page_units: Vec<&TranslationUnit> = units
                .iter()
                .filter(|u| u.page_index == page.index)
                .collect();
            let rewrite_failed = match self.rewrite_page(
                document,
                &mut out,
                &mut registry,
                copy_id,
                page,
                &page_units,
            ) {
                Ok(mut w) => {
                    warnings.append(&mut w);
                    false
                }
                Err(e) => {
                    warn!("Page {} failed to rebuild: {}. Emitting original", page.index, e);
                    warnings.push(JobWarning::PageFallback {
                        page: page.index,
                        error: e.to_string(),
                    });
                    true
                }
            };

            let translated_content = if rewrite_failed {
                original_content.clone()
            } else {
                page_content(&out, copy_id)?
            };

            // Composite stream: original on the left, translation shifted to
            // the right half.
            let mut composite = Vec::new();
            composite.extend_from_slice(b"q\n");
            composite.extend_from_slice(&original_content);
            composite.extend_from_slice(b"\nQ\nq\n");
            composite.extend_from_slice(format!("1 0 0 1 {} 0 cm\n", page.width).as_bytes());
            composite.extend_from_slice(&translated_content);
            composite.extend_from_slice(b"\nQ\n");

            out.change_page_content(copy_id, composite)?;
            let media_box = vec![
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(page.width * 2.0),
                Object::Real(page.height),
            ];
            let dict = out.get_dictionary_mut(copy_id)?;
            dict.set("MediaBox", Object::Array(media_box));
            dict.set("Parent", Object::Reference(pages_id));
            kids.push(Object::Reference(copy_id));
        }

        let count = kids.len() as i64;
        let pages_dict = out.get_dictionary_mut(pages_id)?;
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(count));
        Ok((out, warnings))
    }
}

/// Object id of the catalog's root Pages node.
fn root_pages_id(doc: &lopdf::Document) -> Result<ObjectId, ReconstructionError> {
    let catalog = doc.catalog()?;
    catalog
        .get(b"Pages")
        .ok()
        .and_then(|o| o.as_reference().ok())
        .ok_or_else(|| ReconstructionError::MissingResource("Catalog has no Pages".to_string()))
}
