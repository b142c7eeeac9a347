/*!
 * Font asset providers.
 *
 * A [`FontProvider`] is the external collaborator that hands the resolver a
 * concrete font for a (script, style class) request, or reports it
 * unavailable. Two implementations ship with the crate:
 *
 * - [`BuiltinFontProvider`]: the fourteen standard PDF Type1 fonts, by name
 *   only (no embedded data). Covers Latin.
 * - [`BundledFontProvider`]: font files on disk, configured per script, with
 *   an optional universal fallback file. Covers everything else.
 */

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::errors::FontError;
use crate::fonts::{FontFamily, Script, StyleClass};

/// A concrete font handed out by a provider.
#[derive(Debug, Clone)]
pub struct FontAsset {
    /// Family name, also used as the PDF BaseFont name
    pub family_name: String,
    /// Raw font program bytes; empty for builtin (non-embedded) fonts
    pub data: Arc<Vec<u8>>,
}

impl FontAsset {
    /// A builtin font referenced by name, with no embedded program.
    pub fn builtin(family_name: impl Into<String>) -> Self {
        Self {
            family_name: family_name.into(),
            data: Arc::new(Vec::new()),
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.data.is_empty()
    }
}

/// Capability interface: map (script, style) to a font, or report "unavailable".
pub trait FontProvider: Send + Sync {
    /// A font covering `script` in the given style, or `None` if unavailable.
    fn font_for(&self, script: Script, style: &StyleClass) -> Option<FontAsset>;

    /// The universal fallback font, used when `font_for` comes up empty.
    /// `None` means the provider has no fallback either; the resolver then
    /// falls back to a builtin Latin font and degrades.
    fn fallback_font(&self) -> Option<FontAsset>;

    /// Provider name for logging and the job report.
    fn name(&self) -> &str;
}

/// The standard PDF Type1 fonts. Latin-only, never embedded.
pub struct BuiltinFontProvider;

impl BuiltinFontProvider {
    /// BaseFont name for a Latin style class.
    pub fn base14_name(style: &StyleClass) -> &'static str {
        match (style.family, style.bold, style.italic) {
            (FontFamily::Serif, false, false) => "Times-Roman",
            (FontFamily::Serif, true, false) => "Times-Bold",
            (FontFamily::Serif, false, true) => "Times-Italic",
            (FontFamily::Serif, true, true) => "Times-BoldItalic",
            (FontFamily::Mono, false, false) => "Courier",
            (FontFamily::Mono, true, false) => "Courier-Bold",
            (FontFamily::Mono, false, true) => "Courier-Oblique",
            (FontFamily::Mono, true, true) => "Courier-BoldOblique",
            (FontFamily::Sans, false, false) => "Helvetica",
            (FontFamily::Sans, true, false) => "Helvetica-Bold",
            (FontFamily::Sans, false, true) => "Helvetica-Oblique",
            (FontFamily::Sans, true, true) => "Helvetica-BoldOblique",
        }
    }
}

impl FontProvider for BuiltinFontProvider {
    fn font_for(&self, script: Script, style: &StyleClass) -> Option<FontAsset> {
        if script == Script::Latin {
            Some(FontAsset::builtin(Self::base14_name(style)))
        } else {
            None
        }
    }

    fn fallback_font(&self) -> Option<FontAsset> {
        None
    }

    fn name(&self) -> &str {
        "builtin"
    }
}

/// Font files on disk, configured per script.
///
/// Keys are `(script, family)`; the provider refines by family class but not
/// by weight — bold/italic synthesis is left to the viewer. Latin requests
/// are answered by the builtin provider first, so bundled Latin fonts are
/// optional.
pub struct BundledFontProvider {
    fonts: HashMap<(Script, FontFamily), PathBuf>,
    fallback: Option<PathBuf>,
    loaded: parking_lot::Mutex<HashMap<PathBuf, Arc<Vec<u8>>>>,
}

impl BundledFontProvider {
    pub fn new(fonts: HashMap<(Script, FontFamily), PathBuf>, fallback: Option<PathBuf>) -> Self {
        Self {
            fonts,
            fallback,
            loaded: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// An empty provider: everything is unavailable.
    pub fn empty() -> Self {
        Self::new(HashMap::new(), None)
    }

    fn load(&self, path: &PathBuf) -> Result<Arc<Vec<u8>>, FontError> {
        let mut loaded = self.loaded.lock();
        if let Some(data) = loaded.get(path) {
            return Ok(Arc::clone(data));
        }
        debug!("Loading font file {:?}", path);
        let data = Arc::new(std::fs::read(path)?);
        loaded.insert(path.clone(), Arc::clone(&data));
        Ok(data)
    }

    fn asset_from(&self, path: &PathBuf) -> Option<FontAsset> {
        let family_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "EmbeddedFont".to_string());
        match self.load(path) {
            Ok(data) => Some(FontAsset { family_name, data }),
            Err(e) => {
                log::warn!("Failed to load font {:?}: {}", path, e);
                None
            }
        }
    }
}

impl FontProvider for BundledFontProvider {
    fn font_for(&self, script: Script, style: &StyleClass) -> Option<FontAsset> {
        // Exact family match first, then any family covering the script.
        if let Some(path) = self.fonts.get(&(script, style.family)) {
            if let Some(asset) = self.asset_from(path) {
                return Some(asset);
            }
        }
        for family in [FontFamily::Sans, FontFamily::Serif, FontFamily::Mono] {
            if family == style.family {
                continue;
            }
            if let Some(path) = self.fonts.get(&(script, family)) {
                if let Some(asset) = self.asset_from(path) {
                    return Some(asset);
                }
            }
        }
        None
    }

    fn fallback_font(&self) -> Option<FontAsset> {
        self.fallback.as_ref().and_then(|p| self.asset_from(p))
    }

    fn name(&self) -> &str {
        "bundled"
    }
}

/// Chain of providers, tried in order.
pub struct ChainedFontProvider {
    providers: Vec<Arc<dyn FontProvider>>,
}

impl ChainedFontProvider {
    pub fn new(providers: Vec<Arc<dyn FontProvider>>) -> Self {
        Self { providers }
    }
}

impl FontProvider for ChainedFontProvider {
    fn font_for(&self, script: Script, style: &StyleClass) -> Option<FontAsset> {
        self.providers.iter().find_map(|p| p.font_for(script, style))
    }

    fn fallback_font(&self) -> Option<FontAsset> {
        self.providers.iter().find_map(|p| p.fallback_font())
    }

    fn name(&self) -> &str {
        "chained"
    }
}
