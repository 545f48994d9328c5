//! Magnetar Core - Fundamental types for the Magnetar control plane
//!
//! This crate provides:
//! - Label-selector requirements and evaluation
//! - Structured-field selector evaluation
//! - Field-path-attributed validation errors

pub mod error;
pub mod fields;
pub mod labels;

// Re-export commonly used types
pub use error::{ErrorKind, FieldError, FieldPath};
pub use fields::{FieldOperator, FieldRequirement, FieldSelector};
pub use labels::{validate_label_key, Operator, Requirement, Selector};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::{Node, Pod};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
