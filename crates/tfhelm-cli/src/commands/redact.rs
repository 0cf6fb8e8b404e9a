//! Redact command - mask sensitive values in text or a rendered manifest

use std::path::Path;
use tfhelm_core::redact_text;
use tfhelm_release::redact_manifest;

use super::read_file;
use crate::error::Result;

pub fn run(file: &Path, sensitive: &[String], manifest: bool) -> Result<()> {
    let content = read_file(file)?;

    if manifest {
        println!("{}", redact_manifest(&content, sensitive)?);
    } else {
        print!("{}", redact_text(&content, sensitive));
    }

    Ok(())
}
