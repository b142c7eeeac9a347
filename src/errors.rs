/*!
 * Error types for the pdflate pipeline.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions. Only `ParseError`
 * is fatal to a job; everything else degrades and ends up in the job report.
 */

use thiserror::Error;

/// Errors raised while decoding a PDF into the in-memory content model.
///
/// These are the only errors that abort a whole translation job.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The input bytes are not a well-formed PDF
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// The document is encrypted and cannot be read
    #[error("Document is encrypted")]
    Encrypted,

    /// The document contains no pages
    #[error("Document has no pages")]
    Empty,

    /// I/O failure while reading input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for ParseError {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => ParseError::Io(e),
            lopdf::Error::Decryption(_) => ParseError::Encrypted,
            _ => ParseError::Malformed(err.to_string()),
        }
    }
}

/// Errors that can occur when talking to a translation backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails (network level)
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

impl ProviderError {
    /// Whether this error is worth retrying with backoff.
    ///
    /// Network failures, rate limits, timeouts and 5xx responses are
    /// transient. Authentication problems, malformed responses and other
    /// 4xx responses are permanent and retrying them is pointless.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RequestFailed(_) => true,
            ProviderError::RateLimitExceeded(_) => true,
            ProviderError::Timeout(_) => true,
            ProviderError::ApiError { status_code, .. } => {
                *status_code >= 500 || *status_code == 429
            }
            ProviderError::ParseError(_) => false,
            ProviderError::AuthenticationError(_) => false,
        }
    }
}

/// Errors that can occur during translation of a single unit
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API, after retries were exhausted
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The language pair is not usable
    #[error("Invalid language pair: {source_language} -> {target_language}")]
    InvalidLanguagePair {
        /// Source language code
        source_language: String,
        /// Target language code
        target_language: String,
    },

    /// The job was cancelled while this unit was in flight
    #[error("Translation cancelled")]
    Cancelled,
}

/// Errors from the layout detector capability
#[derive(Error, Debug)]
pub enum LayoutError {
    /// The detector is not reachable or not loaded
    #[error("Region detector unavailable: {0}")]
    Unavailable(String),

    /// The detector did not answer within its timeout
    #[error("Region detector timed out after {0} seconds")]
    Timeout(u64),

    /// The detector answered with something we could not use
    #[error("Region detector returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from font resolution
#[derive(Error, Debug)]
pub enum FontError {
    /// No substitute font is available for the script/style combination
    #[error("No font available for script {script} ({style})")]
    Unavailable {
        /// Target script name
        script: String,
        /// Requested style class
        style: String,
    },

    /// Font asset could not be read
    #[error("Failed to read font asset: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while rewriting a page's content stream
#[derive(Error, Debug)]
pub enum ReconstructionError {
    /// The underlying PDF structure refused the rewrite
    #[error("PDF rewrite failed: {0}")]
    Pdf(String),

    /// A resource the rebuilt page needs is missing
    #[error("Missing resource: {0}")]
    MissingResource(String),
}

impl From<lopdf::Error> for ReconstructionError {
    fn from(err: lopdf::Error) -> Self {
        ReconstructionError::Pdf(err.to_string())
    }
}

impl From<ParseError> for ReconstructionError {
    fn from(err: ParseError) -> Self {
        ReconstructionError::Pdf(err.to_string())
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Fatal parse failure; the job produced no output
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from font handling
    #[error("Font error: {0}")]
    Font(#[from] FontError),

    /// Error assembling output documents
    #[error("Reconstruction error: {0}")]
    Reconstruction(#[from] ReconstructionError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The job was cancelled before producing output
    #[error("Job cancelled")]
    Cancelled,

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
