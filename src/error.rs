//! Error types for the batchconv library.
//!
//! A single [`ConvertError`] enum covers every failure a batch entry can hit:
//! pre-flight validation, transport errors from the conversion service,
//! malformed remote responses, and local disk I/O. None of these abort the
//! batch — each is absorbed at the owning entry's execution boundary and
//! rendered into the entry's `message` field via [`user_message`].
//!
//! [`ApiFailure`] carries the structured error payload the conversion service
//! returns on non-2xx responses (HTTP status, service error code, message,
//! field-level details). Keeping it as its own type lets [`user_message`]
//! find it anywhere in a cause chain and render all the detail the service
//! gave us, instead of a bare "request failed".

use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Maximum cause-chain depth walked when normalizing an error.
///
/// Wrapper errors rarely nest more than two or three levels; the bound only
/// guards against a pathological self-referential chain.
const MAX_CAUSE_DEPTH: usize = 12;

/// All errors produced by the batchconv library.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Pre-flight validation rejected the entry.
    #[error("{0}")]
    Validation(String),

    /// The conversion service returned a structured error payload.
    #[error(transparent)]
    Api(#[from] ApiFailure),

    /// Transport-level HTTP failure (connect, TLS, decode, timeout).
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// Local disk I/O failed (reading the input, writing the part-file,
    /// the final rename).
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The finished job's task list contains no task matching the export
    /// task name nor any `export/url` task.
    #[error("Export task not found in finished job")]
    MissingExportTask,

    /// The export task's result carries no downloadable file URL.
    #[error("No export URL in task result")]
    MissingExportUrl,

    /// The import task response carries no upload form to post the file to.
    #[error("No upload form in import task")]
    MissingUploadForm,

    /// The remote job reported `error` status.
    #[error("Job failed")]
    JobFailed,

    /// The poll attempt budget was exhausted without the job finishing.
    #[error("Job timed out")]
    JobTimedOut,

    /// Configuration rejected by a builder or constructor.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured error payload from the conversion service.
///
/// Every field is optional — the service does not guarantee any of them, and
/// a transport error can leave us with only the HTTP status line.
#[derive(Debug, Clone, Default)]
pub struct ApiFailure {
    /// HTTP status code of the failed response.
    pub http_status: Option<u16>,
    /// Canonical reason phrase for the status, e.g. "Unprocessable Entity".
    pub http_reason: Option<String>,
    /// Service-level error code, e.g. "INVALID_DATA".
    pub code: Option<String>,
    /// Service-level human-readable message.
    pub message: Option<String>,
    /// Field-level error details, passed through as JSON.
    pub errors: Option<Map<String, Value>>,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut details: Vec<String> = Vec::new();
        if let Some(status) = self.http_status {
            match self.http_reason.as_deref().and_then(non_blank) {
                Some(reason) => details.push(format!("HTTP {status} {reason}")),
                None => details.push(format!("HTTP {status}")),
            }
        }
        if let Some(code) = self.code.as_deref().and_then(non_blank) {
            details.push(format!("code={code}"));
        }
        if let Some(message) = self.message.as_deref().and_then(non_blank) {
            details.push(message.to_string());
        }
        if let Some(errors) = &self.errors {
            if !errors.is_empty() {
                let rendered = serde_json::to_string(errors).unwrap_or_default();
                details.push(format!("details={rendered}"));
            }
        }
        if details.is_empty() {
            write!(f, "Conversion service request failed")
        } else {
            write!(f, "Conversion service request failed: {}", details.join(" | "))
        }
    }
}

impl StdError for ApiFailure {}

/// Render any error into a concise, non-empty, single-line user message.
///
/// Policy, in order:
/// 1. If the error (at any depth of its cause chain) carries an
///    [`ApiFailure`], render that — it has the most detail.
/// 2. Otherwise the error's own message, if non-blank.
/// 3. Otherwise the first non-blank message walking the cause chain.
/// 4. Otherwise "Unknown error".
///
/// The chain walk is bounded by [`MAX_CAUSE_DEPTH`].
pub fn user_message(err: &(dyn StdError + 'static)) -> String {
    if let Some(api) = find_api_failure(err) {
        return api.to_string();
    }
    let own = err.to_string();
    if non_blank(&own).is_some() {
        return own;
    }
    let mut current = err.source();
    for _ in 0..MAX_CAUSE_DEPTH {
        match current {
            Some(cause) => {
                let msg = cause.to_string();
                if non_blank(&msg).is_some() {
                    return msg;
                }
                current = cause.source();
            }
            None => break,
        }
    }
    "Unknown error".to_string()
}

fn find_api_failure(err: &(dyn StdError + 'static)) -> Option<&ApiFailure> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    for _ in 0..MAX_CAUSE_DEPTH {
        let cause = current?;
        if let Some(api) = cause.downcast_ref::<ApiFailure>() {
            return Some(api);
        }
        if let Some(ConvertError::Api(api)) = cause.downcast_ref::<ConvertError>() {
            return Some(api);
        }
        current = cause.source();
    }
    None
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
