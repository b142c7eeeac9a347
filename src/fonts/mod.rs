/*!
 * Font and glyph resolution.
 *
 * Given a translation unit's translated text and its source font's style
 * class, the resolver picks a target-script-capable substitute font and
 * computes the glyph subset actually used. Resolution is memoized per
 * (source font, target script) pair for the lifetime of a document: the
 * cache permits concurrent reads once an entry exists and serializes
 * first-writer creation per key.
 */

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::report::JobWarning;

pub mod provider;
pub mod script;

pub use provider::{
    BuiltinFontProvider, BundledFontProvider, ChainedFontProvider, FontAsset, FontProvider,
};
pub use script::{dominant_script, script_of_char, Script};

/// Broad font family classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    Serif,
    Sans,
    Mono,
}

/// Style class of a font: family plus weight and slant flags.
///
/// Derived from PDF BaseFont names; exact sizes deliberately excluded, two
/// runs of different size can still share a style class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleClass {
    pub family: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

impl StyleClass {
    pub fn new(family: FontFamily, bold: bool, italic: bool) -> Self {
        Self { family, bold, italic }
    }

    /// Classify a PDF BaseFont name such as `ABCDEF+Times-BoldItalic`.
    pub fn from_base_font(base_font: &str) -> Self {
        // Strip the subset tag prefix if present
        let name = match base_font.split_once('+') {
            Some((tag, rest)) if tag.len() == 6 => rest,
            _ => base_font,
        };
        let lower = name.to_lowercase();

        let family = if lower.contains("courier") || lower.contains("mono") {
            FontFamily::Mono
        } else if lower.contains("times")
            || lower.contains("serif") && !lower.contains("sans-serif")
            || lower.contains("georgia")
            || lower.contains("garamond")
            || lower.contains("roman")
            || lower.contains("song")
            || lower.contains("ming")
        {
            FontFamily::Serif
        } else {
            FontFamily::Sans
        };

        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let italic = lower.contains("italic") || lower.contains("oblique");

        Self { family, bold, italic }
    }

    /// Whether two runs are close enough in style to merge into one unit.
    pub fn is_compatible(&self, other: &StyleClass) -> bool {
        self.family == other.family
    }
}

impl fmt::Display for StyleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = match self.family {
            FontFamily::Serif => "serif",
            FontFamily::Sans => "sans",
            FontFamily::Mono => "mono",
        };
        write!(f, "{}", family)?;
        if self.bold {
            write!(f, "-bold")?;
        }
        if self.italic {
            write!(f, "-italic")?;
        }
        Ok(())
    }
}

impl Default for StyleClass {
    fn default() -> Self {
        Self::new(FontFamily::Sans, false, false)
    }
}

/// Memoization key: one resource per (source font, target script) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    /// Source BaseFont name, subset tag stripped
    pub source_font: String,
    /// Target script
    pub script: Script,
}

impl FontKey {
    pub fn new(source_font: impl Into<String>, script: Script) -> Self {
        let name = source_font.into();
        let source_font = match name.split_once('+') {
            Some((tag, rest)) if tag.len() == 6 => rest.to_string(),
            _ => name,
        };
        Self { source_font, script }
    }
}

/// A resolved substitute font shared by every unit with the same key.
///
/// Immutable once built; the glyph subset is computed up front from all
/// translated text assigned to the key.
#[derive(Debug, Clone)]
pub struct FontResource {
    pub key: FontKey,
    /// Style class carried over from the source font
    pub style: StyleClass,
    /// Substitute family name (PDF BaseFont of the rebuilt runs)
    pub family_name: String,
    /// Raw font program; empty for builtin fonts
    pub data: Arc<Vec<u8>>,
    /// Code points to embed; `None` means subsetting is disabled and the
    /// full font is embedded
    pub glyph_subset: Option<BTreeSet<char>>,
    /// True when the universal fallback stood in for a missing font
    pub is_fallback: bool,
}

impl FontResource {
    pub fn is_builtin(&self) -> bool {
        self.data.is_empty()
    }
}

/// Document-lifetime font resolver with a synchronized memo cache.
pub struct FontResolver {
    provider: Arc<dyn FontProvider>,
    subsetting_enabled: bool,
    cache: RwLock<HashMap<FontKey, Arc<FontResource>>>,
}

impl FontResolver {
    pub fn new(provider: Arc<dyn FontProvider>, subsetting_enabled: bool) -> Self {
        Self {
            provider,
            subsetting_enabled,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolver backed by the builtin Latin fonts only; useful for tests and
    /// identity jobs.
    pub fn builtin(subsetting_enabled: bool) -> Self {
        Self::new(Arc::new(BuiltinFontProvider), subsetting_enabled)
    }

    /// Resolve the substitute font for `key`, building it at most once.
    ///
    /// `glyphs` is the full set of code points appearing in translated text
    /// assigned to this key (the pipeline aggregates across units before
    /// calling). Returns the shared resource and, on first creation only, a
    /// degradation warning if the fallback font had to stand in.
    pub fn resolve(
        &self,
        key: &FontKey,
        style: &StyleClass,
        glyphs: &BTreeSet<char>,
    ) -> (Arc<FontResource>, Option<JobWarning>) {
        // Fast path: concurrent reads once the entry exists.
        if let Some(resource) = self.cache.read().get(key) {
            return (Arc::clone(resource), None);
        }

        // Slow path: take the write lock and re-check, so at most one caller
        // builds a given key.
        let mut cache = self.cache.write();
        if let Some(resource) = cache.get(key) {
            return (Arc::clone(resource), None);
        }

        let (resource, warning) = self.build(key, style, glyphs);
        let resource = Arc::new(resource);
        cache.insert(key.clone(), Arc::clone(&resource));
        (resource, warning)
    }

    fn build(
        &self,
        key: &FontKey,
        style: &StyleClass,
        glyphs: &BTreeSet<char>,
    ) -> (FontResource, Option<JobWarning>) {
        let subset = if self.subsetting_enabled {
            Some(glyphs.clone())
        } else {
            None
        };

        if let Some(asset) = self.provider.font_for(key.script, style) {
            debug!(
                "Resolved {} ({}) -> {} [{} glyphs]",
                key.source_font,
                key.script,
                asset.family_name,
                glyphs.len()
            );
            let resource = FontResource {
                key: key.clone(),
                style: *style,
                family_name: asset.family_name,
                data: asset.data,
                glyph_subset: subset,
                is_fallback: false,
            };
            return (resource, None);
        }

        // No substitute available: use the universal fallback and degrade.
        warn!(
            "No substitute font for script {} ({}), using fallback",
            key.script, style
        );
        let asset = self
            .provider
            .fallback_font()
            .unwrap_or_else(|| FontAsset::builtin(BuiltinFontProvider::base14_name(style)));
        let warning = JobWarning::FontSubstitutionDegraded {
            script: key.script.to_string(),
            style: style.to_string(),
            fallback: asset.family_name.clone(),
        };
        let resource = FontResource {
            key: key.clone(),
            style: *style,
            family_name: asset.family_name,
            data: asset.data,
            glyph_subset: subset,
            is_fallback: true,
        };
        (resource, Some(warning))
    }

    /// Snapshot of every resolved resource, for assembly and reporting.
    pub fn resources(&self) -> Vec<Arc<FontResource>> {
        let cache = self.cache.read();
        let mut resources: Vec<_> = cache.values().cloned().collect();
        resources.sort_by(|a, b| {
            (a.key.source_font.as_str(), a.key.script.to_string())
                .cmp(&(b.key.source_font.as_str(), b.key.script.to_string()))
        });
        resources
    }
}

/// Collect the distinct code points of a set of translated strings.
///
/// This is exactly the glyph subset embedded for the shared font resource:
/// no extra, no missing glyphs.
pub fn glyph_subset_of<'a>(texts: impl IntoIterator<Item = &'a str>) -> BTreeSet<char> {
    let mut subset = BTreeSet::new();
    for text in texts {
        subset.extend(text.chars());
    }
    subset
}
