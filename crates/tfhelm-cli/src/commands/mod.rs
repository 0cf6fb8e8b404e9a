//! CLI commands

pub mod diff;
pub mod redact;
pub mod values;

use std::path::Path;

use crate::error::{CliError, Result};

/// Read a file, naming it in the error
pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CliError::io_at(path, e))
}

/// Split a `key=value` argument at the first `=`
pub(crate) fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(CliError::validation_with_help(
            format!("invalid override {:?}", arg),
            "Overrides take the form key=value",
        )),
    }
}
