use anyhow::{anyhow, Result};
use isolang::Language;

use crate::fonts::Script;

/// Language utilities for ISO language code handling
///
/// This module provides functions for validating and normalizing ISO 639-1
/// (2-letter) and ISO 639-3 (3-letter) language codes, and the mapping from a
/// target language to the writing script the font resolver has to cover.

/// Normalize a language code to ISO 639-3 (3-letter) format
pub fn normalize_to_part3(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 && Language::from_639_3(&normalized_code).is_some() {
        return Ok(normalized_code);
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Validate that a code names a real language
pub fn validate_language_code(code: &str) -> Result<()> {
    normalize_to_part3(code).map(|_| ())
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part3(code1), normalize_to_part3(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code, for prompt building
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part3(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Writing script a language is typeset in.
///
/// Drives substitute-font selection; languages not listed fall back to Latin,
/// which the universal fallback font covers.
pub fn script_for_language(code: &str) -> Script {
    let part3 = match normalize_to_part3(code) {
        Ok(p) => p,
        Err(_) => return Script::Latin,
    };

    match part3.as_str() {
        "zho" | "cmn" | "yue" | "wuu" => Script::Han,
        "jpn" => Script::Japanese,
        "kor" => Script::Hangul,
        "rus" | "ukr" | "bul" | "srp" | "mkd" | "bel" | "kaz" => Script::Cyrillic,
        "ell" => Script::Greek,
        "ara" | "fas" | "urd" => Script::Arabic,
        "heb" | "yid" => Script::Hebrew,
        "hin" | "mar" | "nep" | "san" => Script::Devanagari,
        "tha" => Script::Thai,
        _ => Script::Latin,
    }
}
