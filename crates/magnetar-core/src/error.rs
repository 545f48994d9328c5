use std::fmt;
use thiserror::Error;

/// Dotted, indexed path to a field inside a configuration object,
/// e.g. `nodeSelectorTerms[0].matchFields[0].values`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    /// The empty root path.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// A path starting at the given field name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Append a child field.
    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{}", self.0, name))
        }
    }

    /// Append a list index.
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Violation category for a field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The value is syntactically or semantically invalid.
    Invalid,
    /// The value is outside a closed set of supported values.
    NotSupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Invalid => write!(f, "Invalid value"),
            ErrorKind::NotSupported => write!(f, "Unsupported value"),
        }
    }
}

/// A single validation defect attributed to a field path.
///
/// Validators collect every defect they find into an ordered list
/// instead of stopping at the first one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {kind}: {detail}")]
pub struct FieldError {
    /// Where the defect was found.
    pub path: FieldPath,
    /// Violation category.
    pub kind: ErrorKind,
    /// Human-readable description of the violated rule.
    pub detail: String,
}

impl FieldError {
    /// Create an `Invalid` error at the given path.
    pub fn invalid(path: &FieldPath, detail: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            kind: ErrorKind::Invalid,
            detail: detail.into(),
        }
    }

    /// Create a `NotSupported` error listing the supported values.
    pub fn not_supported(path: &FieldPath, value: &str, supported: &[&str]) -> Self {
        Self {
            path: path.clone(),
            kind: ErrorKind::NotSupported,
            detail: format!("{:?}: supported values: {}", value, supported.join(", ")),
        }
    }
}
