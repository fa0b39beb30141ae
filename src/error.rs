//! Error type for reading and writing LDIF.

use thiserror::Error;

/// Boxed error returned by a [`ResourceFetcher`](crate::fetch::ResourceFetcher).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of [`LdifError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A `dn:` value does not match the DN grammar.
    Grammar,
    /// Record layout violation: ordering, duplicates, changetype, modlist shape.
    Structural,
    /// A URL-referenced value could not be retrieved.
    Fetch,
    /// A value could not be decoded (bad base64, non UTF-8 DN).
    Encoding,
    Io,
}

#[derive(Debug, Error)]
pub enum LdifError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("No valid string-representation of distinguished name {0:?}")]
    InvalidDn(String),
    #[error("Two lines starting with dn: in one record (first dn {dn:?})")]
    DuplicateDn { dn: String },
    #[error("Read {attr_type}: before getting valid dn: line")]
    MissingDn { attr_type: String },
    #[error("Two lines starting with changetype: in one record (dn {dn:?})")]
    DuplicateChangetype { dn: String },
    #[error("changetype value {0:?} is invalid")]
    InvalidChangetype(String),
    #[error("Modlist shape: {0}")]
    Shape(String),
    #[error("Attribute {attr_type} has no values")]
    NoValues { attr_type: String },
    #[error("Invalid modification in record {dn:?}: {reason}")]
    InvalidModification { dn: String, reason: String },
    #[error("Invalid base64 value for attribute {attr_type}: {source}")]
    InvalidBase64 {
        attr_type: String,
        #[source]
        source: base64::DecodeError,
    },
    #[error("DN value is not valid UTF-8")]
    DnNotUtf8,
    #[error("Fetching {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("Value of {attr_type} references {url} which was not fetched: {reason}")]
    UnresolvedUrl {
        attr_type: String,
        url: String,
        reason: String,
    },
}

impl LdifError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LdifError::Io(_) => ErrorCategory::Io,
            LdifError::InvalidDn(_) => ErrorCategory::Grammar,
            LdifError::DuplicateDn { .. }
            | LdifError::MissingDn { .. }
            | LdifError::DuplicateChangetype { .. }
            | LdifError::InvalidChangetype(_)
            | LdifError::Shape(_)
            | LdifError::NoValues { .. }
            | LdifError::InvalidModification { .. } => ErrorCategory::Structural,
            LdifError::InvalidBase64 { .. } | LdifError::DnNotUtf8 => ErrorCategory::Encoding,
            LdifError::Fetch { .. } | LdifError::UnresolvedUrl { .. } => ErrorCategory::Fetch,
        }
    }
}

pub type Result<T> = std::result::Result<T, LdifError>;
