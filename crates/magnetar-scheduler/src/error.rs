use magnetar_core::FieldError;
use miette::Diagnostic;
use thiserror::Error;

/// Aggregated validation defects found while compiling a selector.
///
/// Construction walks every term and requirement and reports the full
/// defect list in field-path order instead of stopping at the first
/// failure. A selector that produced this error must not be queried.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[error("invalid node selector: [{}]", join(.errors))]
#[diagnostic(
    code(scheduler::invalid_node_selector),
    help("Every defective field is listed; fix them all and rebuild the selector")
)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub(crate) fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// The individual defects, in field-path order.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for selector construction.
pub type Result<T> = std::result::Result<T, ValidationErrors>;
