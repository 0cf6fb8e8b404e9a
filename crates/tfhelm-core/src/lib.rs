//! tfhelm Core - chart value overrides for Helm releases
//!
//! This crate merges the layered value attributes of a release into the
//! single values tree passed to chart installation, and masks sensitive
//! entries wherever that tree or the rendered output is shown:
//! - `Values`: Settings tree with deep merge support
//! - `strvals`: Parser for `key=value` and `key={a,b}` overrides
//! - `overrides`: Override kinds, `merge` and `ValueSources`
//! - `redact`: Path redaction, hashed text redaction and value logging

pub mod error;
pub mod overrides;
pub mod redact;
pub mod strvals;
pub mod values;

pub use error::{CoreError, Result};
pub use overrides::{
    ListOverride, ScalarOverride, SetListValue, SetValue, ValueKind, ValueSources, merge,
};
pub use redact::{SENSITIVE_VALUE, hash_sensitive_value, log_values, redact, redact_text};
pub use values::Values;
