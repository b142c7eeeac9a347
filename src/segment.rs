/*!
 * Segmentation: turning classified regions into translation units.
 *
 * A translation unit is the text of one contiguous block in reading order,
 * with inline non-translatable spans replaced by `{v1}`-style markers. The
 * whole module is pure: the same page and regions always produce the same
 * units in the same order, which is what makes job output deterministic
 * regardless of worker count.
 */

use log::debug;

use crate::document::{Page, TextRun};
use crate::fonts::StyleClass;
use crate::geometry::Rect;
use crate::layout::{Region, RegionClass};

/// Vertical gap, in multiples of the font size, beyond which consecutive
/// lines no longer merge into one unit.
const MERGE_GAP_FACTOR: f32 = 2.0;

/// Inline spans longer than this are never treated as placeholders even when
/// their style diverges.
const MAX_PLACEHOLDER_CHARS: usize = 16;

/// An inline span protected from translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    /// Marker as it appears in the unit text, e.g. `{v1}`
    pub marker: String,
    /// Original span text to restore after translation
    pub text: String,
}

/// One block of text sent to the translator as a whole.
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    /// Page the unit belongs to
    pub page_index: usize,
    /// Position of the unit in the page's reading order
    pub unit_index: usize,
    /// Union of the member runs' boxes
    pub bbox: Rect,
    /// Class of the region the unit was cut from
    pub class: RegionClass,
    /// Source text with placeholder markers inlined
    pub source_text: String,
    /// Protected spans, in marker order
    pub placeholders: Vec<Placeholder>,
    /// Dominant style of the unit
    pub style: StyleClass,
    /// Dominant font size in points
    pub size: f32,
    /// Fill color of the first member run
    pub fill_color: [f32; 3],
    /// Indices into the page's primitive list, in reading order
    pub primitive_indices: Vec<usize>,
    /// Translated text, filled in by the orchestrator. `None` means the unit
    /// passes through with its source text.
    pub translation: Option<String>,
}

impl TranslationUnit {
    /// The text reconstruction should paint: the translation with
    /// placeholders restored, or the source text as-is.
    pub fn output_text(&self) -> String {
        match &self.translation {
            Some(t) => restore_placeholders(t, &self.placeholders),
            None => restore_placeholders(&self.source_text, &self.placeholders),
        }
    }
}

/// Replace `{vN}` markers with their protected spans. Markers missing from
/// the text are dropped silently; a model that ate a marker loses that span.
pub fn restore_placeholders(text: &str, placeholders: &[Placeholder]) -> String {
    let mut out = text.to_string();
    for p in placeholders {
        out = out.replace(&p.marker, &p.text);
    }
    out
}

/// Assignment of one text run to its best region.
fn best_region(bbox: &Rect, regions: &[Region]) -> Option<usize> {
    let mut best: Option<(usize, f32, f32)> = None;
    for (i, region) in regions.iter().enumerate() {
        let overlap = region.bbox.overlap_ratio(bbox);
        if overlap <= 0.0 {
            continue;
        }
        let area = region.bbox.area();
        let better = match best {
            None => true,
            // Higher overlap wins; on a tie the smaller (more specific)
            // region wins
            Some((_, best_overlap, best_area)) => {
                overlap > best_overlap + f32::EPSILON
                    || ((overlap - best_overlap).abs() <= f32::EPSILON && area < best_area)
            }
        };
        if better {
            best = Some((i, overlap, area));
        }
    }
    best.map(|(i, _, _)| i)
}

/// Reading-order comparison: top line first, left to right within a line.
/// Two baselines within half the smaller font size count as one line.
fn reading_order(a: &TextRun, b: &TextRun) -> std::cmp::Ordering {
    let tolerance = 0.5 * a.size.min(b.size).max(1.0);
    let (_, ay) = a.origin;
    let (_, by) = b.origin;
    if (ay - by).abs() < tolerance {
        a.origin
            .0
            .partial_cmp(&b.origin.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    } else {
        by.partial_cmp(&ay).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Whether a short span is protected instead of opening a new unit.
fn is_protected_span(run: &TextRun, unit_style: &StyleClass) -> bool {
    if run.text.chars().count() > MAX_PLACEHOLDER_CHARS {
        return false;
    }
    // Symbol-only spans (numbers, operators) are never worth translating
    if !run.text.chars().any(|c| c.is_alphabetic()) {
        return true;
    }
    // A style break inside a line is usually inline math or an identifier
    !run.style_compatible(unit_style)
}

impl TextRun {
    fn style_compatible(&self, other: &StyleClass) -> bool {
        self.font.style.is_compatible(other)
    }
}

struct UnitBuilder {
    text: String,
    placeholders: Vec<Placeholder>,
    bbox: Rect,
    style: StyleClass,
    size: f32,
    fill_color: [f32; 3],
    primitive_indices: Vec<usize>,
    last_baseline: f32,
}

impl UnitBuilder {
    fn start(index: usize, run: &TextRun) -> Self {
        Self {
            text: run.text.clone(),
            placeholders: Vec::new(),
            bbox: run.bbox,
            style: run.font.style,
            size: run.size,
            fill_color: run.fill_color,
            primitive_indices: vec![index],
            last_baseline: run.origin.1,
        }
    }

    fn push_text(&mut self, index: usize, run: &TextRun) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(&run.text);
        self.bbox = self.bbox.union(&run.bbox);
        self.primitive_indices.push(index);
        self.last_baseline = run.origin.1;
    }

    fn push_placeholder(&mut self, index: usize, run: &TextRun) {
        let marker = format!("{{v{}}}", self.placeholders.len() + 1);
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(&marker);
        self.placeholders.push(Placeholder {
            marker,
            text: run.text.clone(),
        });
        self.bbox = self.bbox.union(&run.bbox);
        self.primitive_indices.push(index);
        self.last_baseline = run.origin.1;
    }

    fn finish(self, page_index: usize, unit_index: usize, class: RegionClass) -> TranslationUnit {
        TranslationUnit {
            page_index,
            unit_index,
            bbox: self.bbox,
            class,
            source_text: self.text,
            placeholders: self.placeholders,
            style: self.style,
            size: self.size,
            fill_color: self.fill_color,
            primitive_indices: self.primitive_indices,
            translation: None,
        }
    }
}

/// Cut a page's text runs into translation units given its regions.
///
/// Runs falling inside non-translatable regions produce no units and pass
/// through untouched. Runs matched by no region are gathered into an
/// implicit whole-page text region so no text is ever dropped.
pub fn build_units(page: &Page, regions: &[Region]) -> Vec<TranslationUnit> {
    let implicit = Region {
        bbox: page.bounds(),
        class: RegionClass::Text,
        confidence: 0.0,
    };

    // region index -> member runs; the implicit region sits at regions.len()
    let mut members: Vec<Vec<(usize, &TextRun)>> = vec![Vec::new(); regions.len() + 1];
    for (prim_index, run) in page.text_runs() {
        if run.text.trim().is_empty() {
            continue;
        }
        let slot = best_region(&run.bbox, regions).unwrap_or(regions.len());
        members[slot].push((prim_index, run));
    }

    let mut units = Vec::new();
    let mut unit_index = 0;
    for (slot, mut runs) in members.into_iter().enumerate() {
        if runs.is_empty() {
            continue;
        }
        let region = regions.get(slot).unwrap_or(&implicit);
        if !region.class.is_translatable() {
            continue;
        }
        runs.sort_by(|(_, a), (_, b)| reading_order(a, b));

        let mut builder: Option<UnitBuilder> = None;
        for (prim_index, run) in runs {
            match builder.as_mut() {
                None => builder = Some(UnitBuilder::start(prim_index, run)),
                Some(b) => {
                    let gap = (b.last_baseline - run.origin.1).abs();
                    let same_block = gap <= MERGE_GAP_FACTOR * b.size.max(run.size);
                    if !same_block {
                        let finished = builder
                            .take()
                            .map(|b| b.finish(page.index, unit_index, region.class));
                        if let Some(u) = finished {
                            units.push(u);
                            unit_index += 1;
                        }
                        builder = Some(UnitBuilder::start(prim_index, run));
                    } else if run.style_compatible(&b.style) {
                        b.push_text(prim_index, run);
                    } else if is_protected_span(run, &b.style) {
                        b.push_placeholder(prim_index, run);
                    } else {
                        let finished = builder
                            .take()
                            .map(|b| b.finish(page.index, unit_index, region.class));
                        if let Some(u) = finished {
                            units.push(u);
                            unit_index += 1;
                        }
                        builder = Some(UnitBuilder::start(prim_index, run));
                    }
                }
            }
        }
        if let Some(b) = builder {
            units.push(b.finish(page.index, unit_index, region.class));
            unit_index += 1;
        }
    }

    debug!(
        "Page {}: {} translation units from {} regions",
        page.index,
        units.len(),
        regions.len()
    );
    units
}
