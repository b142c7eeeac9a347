/*!
 * Geometry and primitive parser.
 *
 * Decodes raw PDF bytes into the [`Document`] model: every page's content
 * stream is walked with a graphics-state machine, producing positioned
 * primitives with transforms resolved into page coordinates. Parsing is a
 * pure transform of bytes to the in-memory model; any structural failure is
 * fatal to the job.
 */

use std::collections::BTreeMap;

use log::{debug, warn};
use lopdf::{Document as LopdfDocument, Object};

use crate::document::{Document, FontRef, GraphicPrimitive, Page, Primitive, TextRun};
use crate::errors::ParseError;
use crate::fonts::{script_of_char, StyleClass};
use crate::geometry::{Matrix, Rect};

/// Operators that paint the current path.
const PATH_PAINT_OPS: &[&str] = &["S", "s", "f", "F", "f*", "B", "B*", "b", "b*"];

/// Parser for raw document bytes.
pub struct DocumentParser;

impl DocumentParser {
    /// Parse a complete document. Fails fatally on malformed structure;
    /// never returns a partial model.
    pub fn parse(bytes: &[u8]) -> Result<Document, ParseError> {
        let pdf = LopdfDocument::load_mem(bytes)?;
        if pdf.is_encrypted() {
            return Err(ParseError::Encrypted);
        }

        let page_ids: BTreeMap<u32, (u32, u16)> = pdf.get_pages();
        if page_ids.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut pages = Vec::with_capacity(page_ids.len());
        for (index, (_page_num, page_id)) in page_ids.iter().enumerate() {
            let page = parse_page(&pdf, index, *page_id)?;
            debug!(
                "Parsed page {}: {} primitives ({} text runs)",
                index,
                page.primitives.len(),
                page.text_runs().count()
            );
            pages.push(page);
        }

        Ok(Document { pages, pdf })
    }
}

/// Font info gathered from the page's resource dictionary.
struct PageFont {
    base_font: String,
    style: StyleClass,
    encoding_available: bool,
}

fn collect_page_fonts(pdf: &LopdfDocument, page_id: (u32, u16)) -> BTreeMap<Vec<u8>, PageFont> {
    let mut fonts = BTreeMap::new();
    if let Ok(page_fonts) = pdf.get_page_fonts(page_id) {
        for (name, font_dict) in page_fonts {
            let base_font = font_dict
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            let style = StyleClass::from_base_font(&base_font);
            let encoding_available = font_dict.get_font_encoding(pdf).is_ok();
            fonts.insert(
                name,
                PageFont {
                    base_font,
                    style,
                    encoding_available,
                },
            );
        }
    }
    fonts
}

/// Decompressed, concatenated content stream bytes for a page.
pub(crate) fn page_content(pdf: &LopdfDocument, page_id: (u32, u16)) -> Result<Vec<u8>, ParseError> {
    let page_dict = pdf
        .get_dictionary(page_id)
        .map_err(|e| ParseError::Malformed(e.to_string()))?;

    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        // A page with no content stream is legal; it just has no primitives.
        Err(_) => return Ok(Vec::new()),
    };

    let mut out = Vec::new();
    collect_stream_bytes(pdf, contents, &mut out)?;
    Ok(out)
}

fn collect_stream_bytes(
    pdf: &LopdfDocument,
    obj: &Object,
    out: &mut Vec<u8>,
) -> Result<(), ParseError> {
    match obj {
        Object::Reference(r) => {
            let resolved = pdf
                .get_object(*r)
                .map_err(|e| ParseError::Malformed(e.to_string()))?;
            collect_stream_bytes(pdf, resolved, out)
        }
        Object::Stream(s) => {
            // Streams with no Filter entry carry their bytes as-is
            let data = s
                .decompressed_content()
                .unwrap_or_else(|_| s.content.clone());
            out.extend_from_slice(&data);
            out.push(b' ');
            Ok(())
        }
        Object::Array(arr) => {
            for item in arr {
                collect_stream_bytes(pdf, item, out)?;
            }
            Ok(())
        }
        _ => Err(ParseError::Malformed(
            "Invalid Contents entry on page".to_string(),
        )),
    }
}

/// MediaBox for a page, walking up the page tree for inherited values.
fn media_box(pdf: &LopdfDocument, page_id: (u32, u16)) -> (f32, f32) {
    let mut current = page_id;
    for _ in 0..16 {
        let Ok(dict) = pdf.get_dictionary(current) else {
            break;
        };
        if let Ok(Object::Array(arr)) = dict
            .get(b"MediaBox")
            .and_then(|o| pdf.dereference(o).map(|(_, obj)| obj.clone()))
        {
            let nums: Vec<f32> = arr.iter().filter_map(as_number).collect();
            if nums.len() == 4 {
                return ((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs());
            }
        }
        match dict.get(b"Parent").ok().and_then(|o| o.as_reference().ok()) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    // US Letter default
    (612.0, 792.0)
}

fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Graphics state tracked while walking a content stream.
#[derive(Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill_color: [f32; 3],
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill_color: [0.0, 0.0, 0.0],
        }
    }
}

/// Accumulates one text run across consecutive show operations.
struct RunBuilder {
    text: String,
    font: FontRef,
    size: f32,
    origin: (f32, f32),
    width: f32,
    fill_color: [f32; 3],
    show_ops: Vec<usize>,
}

impl RunBuilder {
    fn finish(self) -> Option<Primitive> {
        if self.text.is_empty() {
            return None;
        }
        let (x, y) = self.origin;
        // Ascent/descent estimated at 0.8/0.2 em
        let bbox = Rect::new(x, y - 0.2 * self.size, x + self.width, y + 0.8 * self.size);
        Some(Primitive::Text(TextRun {
            text: self.text,
            font: self.font,
            size: self.size,
            origin: self.origin,
            bbox,
            fill_color: self.fill_color,
            show_ops: self.show_ops,
        }))
    }
}

/// Estimated advance of one character in text-space units of one em.
pub(crate) fn char_advance_em(ch: char) -> f32 {
    match script_of_char(ch) {
        Some(s) if s.is_full_width() => 1.0,
        _ => 0.5,
    }
}

fn parse_page(
    pdf: &LopdfDocument,
    index: usize,
    page_id: (u32, u16),
) -> Result<Page, ParseError> {
    let (width, height) = media_box(pdf, page_id);
    let fonts = collect_page_fonts(pdf, page_id);
    let content_bytes = page_content(pdf, page_id)?;

    let content = lopdf::content::Content::decode(&content_bytes)
        .map_err(|e| ParseError::Malformed(e.to_string()))?;
    let op_count = content.operations.len();

    let mut primitives = Vec::new();
    let mut state = GraphicsState::default();
    let mut state_stack: Vec<GraphicsState> = Vec::new();

    // Text state
    let mut tm = Matrix::IDENTITY;
    let mut tlm = Matrix::IDENTITY;
    let mut leading: f32 = 0.0;
    let mut font_name = String::new();
    let mut font_size: f32 = 0.0;
    let mut current_run: Option<RunBuilder> = None;

    // Path state: extremes in page space
    let mut path_bbox: Option<Rect> = None;

    let mut flush_run = |run: &mut Option<RunBuilder>, primitives: &mut Vec<Primitive>| {
        if let Some(builder) = run.take() {
            if let Some(p) = builder.finish() {
                primitives.push(p);
            }
        }
    };

    for (op_index, op) in content.operations.iter().enumerate() {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => state_stack.push(state.clone()),
            "Q" => {
                if let Some(prev) = state_stack.pop() {
                    state = prev;
                }
            }
            "cm" => {
                if let Some(m) = matrix_from_operands(operands) {
                    state.ctm = m.concat(&state.ctm);
                }
            }
            "rg" => {
                if let [Some(r), Some(g), Some(b)] = three_numbers(operands) {
                    state.fill_color = [r, g, b];
                }
            }
            "g" => {
                if let Some(v) = operands.first().and_then(as_number) {
                    state.fill_color = [v, v, v];
                }
            }
            "k" => {
                // Naive CMYK to RGB, good enough for style carry-over
                if operands.len() == 4 {
                    let vals: Vec<f32> = operands.iter().filter_map(as_number).collect();
                    if vals.len() == 4 {
                        let (c, m, y, k) = (vals[0], vals[1], vals[2], vals[3]);
                        state.fill_color =
                            [(1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k)];
                    }
                }
            }
            "BT" => {
                flush_run(&mut current_run, &mut primitives);
                tm = Matrix::IDENTITY;
                tlm = Matrix::IDENTITY;
            }
            "ET" => flush_run(&mut current_run, &mut primitives),
            "Tf" => {
                flush_run(&mut current_run, &mut primitives);
                if let (Some(Object::Name(name)), Some(size)) =
                    (operands.first(), operands.get(1).and_then(as_number))
                {
                    font_name = String::from_utf8_lossy(name).to_string();
                    font_size = size;
                }
            }
            "TL" => {
                if let Some(l) = operands.first().and_then(as_number) {
                    leading = l;
                }
            }
            "Td" => {
                flush_run(&mut current_run, &mut primitives);
                if let [Some(tx), Some(ty), _] = three_numbers_or_two(operands) {
                    tlm = Matrix::translation(tx, ty).concat(&tlm);
                    tm = tlm;
                }
            }
            "TD" => {
                flush_run(&mut current_run, &mut primitives);
                if let [Some(tx), Some(ty), _] = three_numbers_or_two(operands) {
                    leading = -ty;
                    tlm = Matrix::translation(tx, ty).concat(&tlm);
                    tm = tlm;
                }
            }
            "Tm" => {
                flush_run(&mut current_run, &mut primitives);
                if let Some(m) = matrix_from_operands(operands) {
                    tm = m;
                    tlm = m;
                }
            }
            "T*" => {
                flush_run(&mut current_run, &mut primitives);
                tlm = Matrix::translation(0.0, -leading).concat(&tlm);
                tm = tlm;
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    show_text(
                        pdf, page_id, &fonts, bytes, op_index, &state, &mut tm, &font_name,
                        font_size, &mut current_run,
                    );
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => show_text(
                                pdf, page_id, &fonts, bytes, op_index, &state, &mut tm,
                                &font_name, font_size, &mut current_run,
                            ),
                            // Kerning adjustments shift the pen slightly;
                            // immaterial to the bbox estimate
                            _ => {}
                        }
                    }
                }
            }
            "'" => {
                flush_run(&mut current_run, &mut primitives);
                tlm = Matrix::translation(0.0, -leading).concat(&tlm);
                tm = tlm;
                if let Some(Object::String(bytes, _)) = operands.first() {
                    show_text(
                        pdf, page_id, &fonts, bytes, op_index, &state, &mut tm, &font_name,
                        font_size, &mut current_run,
                    );
                }
            }
            "\"" => {
                flush_run(&mut current_run, &mut primitives);
                tlm = Matrix::translation(0.0, -leading).concat(&tlm);
                tm = tlm;
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    show_text(
                        pdf, page_id, &fonts, bytes, op_index, &state, &mut tm, &font_name,
                        font_size, &mut current_run,
                    );
                }
            }
            "Do" => {
                let bbox = state.ctm.unit_rect();
                primitives.push(Primitive::Image(GraphicPrimitive {
                    bbox,
                    op_index,
                }));
            }
            "m" | "l" => {
                if let [Some(x), Some(y), _] = three_numbers_or_two(operands) {
                    extend_path(&mut path_bbox, state.ctm.apply(x, y));
                }
            }
            "c" | "v" | "y" => {
                for chunk in operands.chunks(2) {
                    if let (Some(x), Some(y)) =
                        (chunk.first().and_then(as_number), chunk.get(1).and_then(as_number))
                    {
                        extend_path(&mut path_bbox, state.ctm.apply(x, y));
                    }
                }
            }
            "re" => {
                let nums: Vec<f32> = operands.iter().filter_map(as_number).collect();
                if nums.len() == 4 {
                    extend_path(&mut path_bbox, state.ctm.apply(nums[0], nums[1]));
                    extend_path(
                        &mut path_bbox,
                        state.ctm.apply(nums[0] + nums[2], nums[1] + nums[3]),
                    );
                }
            }
            op_name if PATH_PAINT_OPS.contains(&op_name) => {
                if let Some(bbox) = path_bbox.take() {
                    primitives.push(Primitive::VectorPath(GraphicPrimitive {
                        bbox,
                        op_index,
                    }));
                }
            }
            "n" => {
                // Path discarded (clipping no-op)
                path_bbox = None;
            }
            _ => {}
        }
    }
    flush_run(&mut current_run, &mut primitives);

    Ok(Page {
        index,
        id: page_id,
        width,
        height,
        primitives,
        op_count,
    })
}

#[allow(clippy::too_many_arguments)]
fn show_text(
    pdf: &LopdfDocument,
    page_id: (u32, u16),
    fonts: &BTreeMap<Vec<u8>, PageFont>,
    bytes: &[u8],
    op_index: usize,
    state: &GraphicsState,
    tm: &mut Matrix,
    font_name: &str,
    font_size: f32,
    current_run: &mut Option<RunBuilder>,
) {
    let text = decode_text(pdf, page_id, fonts, font_name, bytes);
    if text.is_empty() {
        return;
    }

    let trm = tm.concat(&state.ctm);
    let scale = trm.scale_factor().max(f32::EPSILON);
    let size = font_size * scale;
    let origin = trm.apply(0.0, 0.0);

    // Advance estimate in text space, before scaling
    let advance_em: f32 = text.chars().map(char_advance_em).sum();
    let advance_text = advance_em * font_size;
    let advance_page = advance_em * size;

    match current_run {
        Some(run) => {
            run.text.push_str(&text);
            run.width += advance_page;
            if run.show_ops.last() != Some(&op_index) {
                run.show_ops.push(op_index);
            }
        }
        None => {
            let font = fonts.get(font_name.as_bytes());
            let (base_font, style) = match font {
                Some(f) => (f.base_font.clone(), f.style),
                None => {
                    warn!("Text shown with unknown font resource {}", font_name);
                    ("Unknown".to_string(), StyleClass::default())
                }
            };
            *current_run = Some(RunBuilder {
                text,
                font: FontRef {
                    resource_name: font_name.to_string(),
                    base_font,
                    style,
                },
                size,
                origin,
                width: advance_page,
                fill_color: state.fill_color,
                show_ops: vec![op_index],
            });
        }
    }

    // Move the pen so the next show op in the same run chains positions
    *tm = Matrix::translation(advance_text, 0.0).concat(tm);
}

fn decode_text(
    pdf: &LopdfDocument,
    page_id: (u32, u16),
    fonts: &BTreeMap<Vec<u8>, PageFont>,
    font_name: &str,
    bytes: &[u8],
) -> String {
    if fonts
        .get(font_name.as_bytes())
        .map(|f| f.encoding_available)
        .unwrap_or(false)
    {
        if let Ok(page_fonts) = pdf.get_page_fonts(page_id) {
            if let Some(font_dict) = page_fonts.get(font_name.as_bytes()) {
                if let Ok(enc) = font_dict.get_font_encoding(pdf) {
                    if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                        return text;
                    }
                }
            }
        }
    }
    decode_text_simple(bytes)
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter(|c| c.len() == 2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1 fallback
    bytes.iter().map(|&b| b as char).collect()
}

fn matrix_from_operands(operands: &[Object]) -> Option<Matrix> {
    let nums: Vec<f32> = operands.iter().filter_map(as_number).collect();
    if nums.len() == 6 {
        Some(Matrix::new(nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]))
    } else {
        None
    }
}

fn three_numbers(operands: &[Object]) -> [Option<f32>; 3] {
    [
        operands.first().and_then(as_number),
        operands.get(1).and_then(as_number),
        operands.get(2).and_then(as_number),
    ]
}

fn three_numbers_or_two(operands: &[Object]) -> [Option<f32>; 3] {
    three_numbers(operands)
}

fn extend_path(path_bbox: &mut Option<Rect>, (x, y): (f32, f32)) {
    let point = Rect::new(x, y, x, y);
    *path_bbox = Some(match path_bbox {
        Some(b) => b.union(&point),
        None => point,
    });
}
