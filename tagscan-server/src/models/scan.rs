//! Per-request and per-image scan types
//!
//! Error categorization for a batch:
//! - Request-level failures (no images, bad credentials) abort the request
//! - Per-image failures are recorded on that image's [`ExtractionOutcome`]

use serde::{Deserialize, Serialize};
use tagscan_common::UserId;

/// One uploaded image, owned by a single batch invocation
#[derive(Debug, Clone)]
pub struct ImageItem {
    /// Raw file contents
    pub bytes: Vec<u8>,
    /// Declared media type (e.g. `image/jpeg`)
    pub mime_type: String,
    /// Original filename, if the client sent one
    pub filename: Option<String>,
}

impl ImageItem {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, filename: Option<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            filename,
        }
    }
}

/// Image fidelity requested from the vision model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Low,
    High,
    #[default]
    Auto,
}

impl DetailLevel {
    /// Parse a client hint; anything other than `low`/`high` means `auto`
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.map(|h| h.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => DetailLevel::Low,
            Some("high") => DetailLevel::High,
            _ => DetailLevel::Auto,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Low => "low",
            DetailLevel::High => "high",
            DetailLevel::Auto => "auto",
        }
    }
}

/// Who submitted the batch and the hints that apply to every image in it
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub user_id: UserId,
    pub user_email: String,
    pub room_number: Option<String>,
    pub detail: DetailLevel,
}

/// Category of a per-image failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The vision capability call failed; raw text is empty
    Extraction,
    /// The tag was extracted but could not be stored
    Persistence,
}

/// Error attached to one image's outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeError {
    pub kind: ErrorKind,
    /// Machine-readable code (e.g. `TIMEOUT`, `HTTP_STATUS`)
    pub code: String,
    pub message: String,
}

impl OutcomeError {
    pub fn extraction(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Extraction,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn persistence(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Persistence,
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result for a single image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    /// Model output as returned (empty when extraction failed)
    pub raw_text: String,
    pub normalized_tag: Option<String>,
    pub asset_url: Option<String>,
    pub persisted: bool,
    pub error: Option<OutcomeError>,
}

impl ExtractionOutcome {
    /// Outcome for an image whose capability call failed
    pub fn extraction_failed(error: OutcomeError) -> Self {
        Self {
            raw_text: String::new(),
            normalized_tag: None,
            asset_url: None,
            persisted: false,
            error: Some(error),
        }
    }

    /// Whether the capability returned non-blank text for this image
    ///
    /// A storage failure after a good extraction still counts: the caller got
    /// the text back even though no record exists.
    pub fn succeeded(&self) -> bool {
        self.persisted || !self.raw_text.trim().is_empty()
    }

    pub fn is_hard_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregated batch result, in input order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Raw text per image; empty string where extraction failed
    pub texts: Vec<String>,
    pub outcomes: Vec<ExtractionOutcome>,
    /// True only when nothing succeeded and at least one image hit an error
    #[serde(skip)]
    pub had_error: bool,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<ExtractionOutcome>) -> Self {
        let any_hard_error = outcomes.iter().any(ExtractionOutcome::is_hard_error);
        let any_success = outcomes.iter().any(ExtractionOutcome::succeeded);
        let texts = outcomes.iter().map(|o| o.raw_text.clone()).collect();

        Self {
            texts,
            had_error: any_hard_error && !any_success,
            outcomes,
        }
    }

    /// Number of tags that reached storage
    pub fn persisted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.persisted).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(raw: &str) -> ExtractionOutcome {
        ExtractionOutcome {
            raw_text: raw.to_string(),
            normalized_tag: None,
            asset_url: None,
            persisted: false,
            error: None,
        }
    }

    fn failed() -> ExtractionOutcome {
        ExtractionOutcome::extraction_failed(OutcomeError::extraction("NETWORK", "down"))
    }

    #[test]
    fn test_detail_level_hint_parsing() {
        assert_eq!(DetailLevel::from_hint(Some("low")), DetailLevel::Low);
        assert_eq!(DetailLevel::from_hint(Some("HIGH")), DetailLevel::High);
        assert_eq!(DetailLevel::from_hint(Some("ultra")), DetailLevel::Auto);
        assert_eq!(DetailLevel::from_hint(None), DetailLevel::Auto);
    }

    #[test]
    fn test_partial_success_is_not_failure() {
        let result = BatchResult::from_outcomes(vec![ok("123"), failed(), ok("456")]);
        assert!(!result.had_error);
        assert_eq!(result.texts, vec!["123", "", "456"]);
    }

    #[test]
    fn test_single_failure_is_failure() {
        let result = BatchResult::from_outcomes(vec![failed()]);
        assert!(result.had_error);
        assert_eq!(result.texts, vec![""]);
    }

    #[test]
    fn test_blank_results_without_errors_are_not_failure() {
        let result = BatchResult::from_outcomes(vec![ok(""), ok("  ")]);
        assert!(!result.had_error);
    }

    #[test]
    fn test_blank_plus_error_is_failure() {
        let result = BatchResult::from_outcomes(vec![ok(""), failed()]);
        assert!(result.had_error);
    }

    #[test]
    fn test_persistence_failure_still_counts_as_extracted() {
        let outcome = ExtractionOutcome {
            raw_text: "00123".to_string(),
            normalized_tag: Some("00123".to_string()),
            asset_url: Some("u".to_string()),
            persisted: false,
            error: Some(OutcomeError::persistence("DATABASE", "locked")),
        };
        let result = BatchResult::from_outcomes(vec![outcome.clone(), failed()]);
        assert!(outcome.is_hard_error());
        assert!(outcome.succeeded());
        assert_eq!(result.persisted_count(), 0);
        assert!(!result.had_error);
        assert_eq!(result.texts, vec!["00123", ""]);
    }
}
