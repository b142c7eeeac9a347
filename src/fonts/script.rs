/*!
 * Writing-script classification.
 *
 * The resolver needs to know which script a translated string is typeset in
 * to pick a substitute font. Classification is by Unicode block; a string is
 * tagged with its dominant script, ignoring characters common to all scripts
 * (digits, punctuation, whitespace).
 */

use std::fmt;

use serde::{Deserialize, Serialize};

/// Writing scripts the font resolver distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Cyrillic,
    Greek,
    Arabic,
    Hebrew,
    Devanagari,
    Han,
    Japanese,
    Hangul,
    Thai,
}

impl Script {
    /// Whether glyphs of this script are typically full-width.
    ///
    /// Used by the reconstruction engine's width estimate.
    pub fn is_full_width(&self) -> bool {
        matches!(self, Script::Han | Script::Japanese | Script::Hangul)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Script::Latin => "latin",
            Script::Cyrillic => "cyrillic",
            Script::Greek => "greek",
            Script::Arabic => "arabic",
            Script::Hebrew => "hebrew",
            Script::Devanagari => "devanagari",
            Script::Han => "han",
            Script::Japanese => "japanese",
            Script::Hangul => "hangul",
            Script::Thai => "thai",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Script {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latin" => Ok(Script::Latin),
            "cyrillic" => Ok(Script::Cyrillic),
            "greek" => Ok(Script::Greek),
            "arabic" => Ok(Script::Arabic),
            "hebrew" => Ok(Script::Hebrew),
            "devanagari" => Ok(Script::Devanagari),
            "han" => Ok(Script::Han),
            "japanese" => Ok(Script::Japanese),
            "hangul" => Ok(Script::Hangul),
            "thai" => Ok(Script::Thai),
            other => Err(format!("Unknown script: {other}")),
        }
    }
}

/// Classify a single character, or `None` for script-neutral characters.
pub fn script_of_char(ch: char) -> Option<Script> {
    let cp = ch as u32;
    match cp {
        0x0041..=0x024F => Some(Script::Latin),
        0x0370..=0x03FF => Some(Script::Greek),
        0x0400..=0x04FF => Some(Script::Cyrillic),
        0x0590..=0x05FF => Some(Script::Hebrew),
        0x0600..=0x06FF | 0x0750..=0x077F => Some(Script::Arabic),
        0x0900..=0x097F => Some(Script::Devanagari),
        0x0E00..=0x0E7F => Some(Script::Thai),
        0x1100..=0x11FF | 0xAC00..=0xD7AF => Some(Script::Hangul),
        // Hiragana and Katakana
        0x3040..=0x30FF => Some(Script::Japanese),
        // CJK unified ideographs and extensions
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2A6DF => {
            Some(Script::Han)
        }
        _ => None,
    }
}

/// Dominant script of a string, by weighted character count.
///
/// Full-width characters weigh double, so CJK text with an embedded Latin
/// word (a product name, an abbreviation) still resolves to a CJK-capable
/// font. Kana anywhere in the text forces `Japanese` (Japanese text is
/// mostly Han ideographs with interspersed kana). Strings with no
/// script-bearing characters report Latin.
pub fn dominant_script(text: &str) -> Script {
    let mut counts: [(Script, usize); 10] = [
        (Script::Latin, 0),
        (Script::Cyrillic, 0),
        (Script::Greek, 0),
        (Script::Arabic, 0),
        (Script::Hebrew, 0),
        (Script::Devanagari, 0),
        (Script::Han, 0),
        (Script::Japanese, 0),
        (Script::Hangul, 0),
        (Script::Thai, 0),
    ];

    for ch in text.chars() {
        if let Some(script) = script_of_char(ch) {
            let weight = if script.is_full_width() { 2 } else { 1 };
            for entry in counts.iter_mut() {
                if entry.0 == script {
                    entry.1 += weight;
                }
            }
        }
    }

    if counts.iter().find(|(s, _)| *s == Script::Japanese).map(|(_, n)| *n).unwrap_or(0) > 0 {
        return Script::Japanese;
    }

    counts
        .iter()
        .max_by_key(|(_, n)| *n)
        .filter(|(_, n)| *n > 0)
        .map(|(s, _)| *s)
        .unwrap_or(Script::Latin)
}
