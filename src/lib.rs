/*!
 * # pdflate - Layout-preserving PDF translation
 *
 * A Rust library for translating the text of PDF documents while leaving
 * every non-text element byte-for-byte unchanged.
 *
 * ## Features
 *
 * - Parse a PDF into positioned text and graphic primitives
 * - Classify page regions (text, title, formula, table, figure) with a
 *   pluggable detector and a heuristic fallback
 * - Group text into context-preserving translation units
 * - Translate concurrently against any OpenAI-compatible backend, with
 *   caching, rate limiting and retries, collated back into document order
 * - Resolve substitute fonts per script with minimal glyph subsets
 * - Rebuild pages so translated text occupies the original geometry
 * - Monolingual and bilingual (interleaved or side-by-side) output
 * - A structured job report of every non-fatal degradation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Content model, parser and page rasterizer
 * - `layout`: Region detection
 * - `segment`: Translation-unit construction
 * - `translation`: Translation service:
 *   - `translation::core`: Per-unit translation with retry
 *   - `translation::orchestrator`: Ordered concurrent dispatch
 *   - `translation::cache`: In-memory and SQLite caching
 *   - `translation::rate_limit`: Request pacing
 * - `providers`: Client implementations for translation backends
 * - `fonts`: Script classification and substitute-font resolution
 * - `reconstruct`: Content-stream rewriting and output assembly
 * - `pipeline`: End-to-end job execution
 * - `report`: Job reporting
 * - `errors`: Custom error types for the application
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod document;
pub mod errors;
pub mod fonts;
pub mod geometry;
pub mod language_utils;
pub mod layout;
pub mod pipeline;
pub mod providers;
pub mod reconstruct;
pub mod report;
pub mod segment;
pub mod translation;

pub use app_config::{Config, DualLayout, OutputMode};
pub use document::{Document, DocumentParser, Page, Primitive, TextRun};
pub use pipeline::{JobOutput, Pipeline};
pub use report::{JobReport, JobWarning};
pub use segment::TranslationUnit;
