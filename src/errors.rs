//! Error types for rpki-certs
//!
//! This module defines structured error types using `thiserror`. Variants are
//! grouped by failure cause rather than by the type that raised them, so a
//! caller can decide between "skip this object" (parse-time failures) and
//! "reject this child" (validation verdicts) without string matching.

use thiserror::Error;

/// Main error type for rpki-certs operations
#[derive(Error, Debug)]
pub enum RpkiCertsError {
    /// ASN.1 shape mismatch or truncated DER input
    #[error("{filename}: {detail}")]
    StructuralDecode { filename: String, detail: String },

    /// The DER parsed, but the RPKI profile forbids the content
    #[error("{filename}: {citation}: {reason}")]
    ProfileViolation {
        filename: String,
        citation: &'static str,
        reason: String,
    },

    /// Two resource entries overlap within one certificate
    #[error("{filename}: {citation}: {reason}")]
    ResourceOverlap {
        filename: String,
        citation: &'static str,
        reason: String,
    },

    /// A child resource is not covered by the ancestor chain
    #[error("{filename}: RFC 6487: uncovered {what}: {detail}")]
    Coverage {
        filename: String,
        what: &'static str,
        detail: String,
    },

    /// A certificate with this SKI has already been installed
    #[error("{filename}: RFC 6487: duplicate SKI")]
    DuplicateSki { filename: String },

    /// File digest does not match the caller-supplied hash
    #[error("{filename}: file hash does not match expected digest")]
    HashMismatch { filename: String },

    /// I/O errors from the file-hash helper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RpkiCertsError {
    /// Create a structural decode error from anything that displays
    pub fn structural(filename: impl Into<String>, detail: impl ToString) -> Self {
        Self::StructuralDecode {
            filename: filename.into(),
            detail: detail.to_string(),
        }
    }

    /// Create a profile violation carrying its RFC citation
    pub fn profile(
        filename: impl Into<String>,
        citation: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::ProfileViolation {
            filename: filename.into(),
            citation,
            reason: reason.into(),
        }
    }

    /// Create a resource overlap error carrying its RFC citation
    pub fn overlap(
        filename: impl Into<String>,
        citation: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::ResourceOverlap {
            filename: filename.into(),
            citation,
            reason: reason.into(),
        }
    }

    /// Create a coverage rejection for an AS or IP delegation
    pub fn uncovered(
        filename: impl Into<String>,
        what: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self::Coverage {
            filename: filename.into(),
            what,
            detail: detail.into(),
        }
    }

    /// Create a duplicate-SKI rejection
    pub fn duplicate_ski(filename: impl Into<String>) -> Self {
        Self::DuplicateSki {
            filename: filename.into(),
        }
    }
}

/// Result type alias for rpki-certs operations
pub type Result<T> = std::result::Result<T, RpkiCertsError>;
