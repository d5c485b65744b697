//! dirsvc-core: domain types, configuration, and error taxonomy shared
//! across the directory service's event distribution crates.
//!
//! This crate defines the event model (`Event`, `EventKind`), the
//! server-side configuration surface, the shared error enum, and a small
//! validation-error aggregation framework used by config validation.

pub mod config;
pub mod error;
pub mod event;
pub mod validation;

/// Crate identity label used for parity verification.
pub fn crate_label() -> &'static str {
    "dirsvc-core"
}
