//! Diff command - compare two rendered manifests with sensitive values masked

use console::style;
use std::path::Path;
use tfhelm_release::{ChangeType, DiffEngine, redact_manifest};

use super::read_file;
use crate::error::Result;

pub fn run(old: &Path, new: &Path, sensitive: &[String], context: usize) -> Result<()> {
    let old_manifest = redact_manifest(&read_file(old)?, sensitive)?;
    let new_manifest = redact_manifest(&read_file(new)?, sensitive)?;

    let engine = DiffEngine::new().with_context(context);
    let result = engine.diff_stored(&old_manifest, &new_manifest)?;

    for change in &result.changes {
        let (icon, label) = match change.change_type {
            ChangeType::Added => (style("+").green(), style(&change.key).green()),
            ChangeType::Modified => (style("~").yellow(), style(&change.key).yellow()),
            ChangeType::Removed => (style("-").red(), style(&change.key).red()),
        };
        let (added, removed) = change.diff.stats();
        println!(
            "{} {} ({}, {} {})",
            icon,
            label.bold(),
            change.change_type,
            style(format!("+{}", added)).green(),
            style(format!("-{}", removed)).red()
        );

        for line in change.diff.to_unified_diff().lines() {
            let styled = match line.chars().next() {
                Some('+') => style(line).green(),
                Some('-') => style(line).red(),
                _ => style(line).dim(),
            };
            println!("    {}", styled);
        }
    }

    if result.has_changes() {
        println!();
    }
    println!("{} {}", style("Summary:").bold(), engine.summary(&result));
    Ok(())
}
