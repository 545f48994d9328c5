//! Magnetar Scheduler - node affinity evaluation
//!
//! This crate provides:
//! - Required node selector matching (filter)
//! - Preferred scheduling term scoring
//! - Conversion from raw selector requirements to evaluable predicates
//!
//! Selectors are validated exhaustively at construction time; every
//! defect is reported, and a compiled matcher or scorer can then be
//! queried concurrently without further error handling.

pub mod error;
pub mod filter;
pub mod score;
pub mod term;

// Re-export commonly used types
pub use error::{Result, ValidationErrors};
pub use filter::{NodeSelector, RequiredNodeAffinity};
pub use score::PreferredSchedulingTerms;
pub use term::{requirements_as_field_selector, requirements_as_label_selector, NODE_FIELD_NAME};
