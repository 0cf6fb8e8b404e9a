//! Values command - print the merged values of a release

use console::style;
use std::path::PathBuf;
use tfhelm_core::{SetListValue, SetValue, ValueKind, ValueSources, log_values, redact};

use super::{read_file, split_assignment};
use crate::error::Result;

/// Value attributes as given on the command line
#[derive(Debug, Default)]
pub struct ValuesArgs {
    pub files: Vec<PathBuf>,
    pub set: Vec<String>,
    pub set_string: Vec<String>,
    pub set_literal: Vec<String>,
    pub set_list: Vec<String>,
    pub set_sensitive: Vec<String>,
}

impl ValuesArgs {
    /// Collect the arguments into release value sources
    pub fn to_sources(&self) -> Result<ValueSources> {
        let mut sources = ValueSources::default();

        for file in &self.files {
            sources.values.push(read_file(file)?);
        }

        let scalars = [
            (&self.set, ValueKind::Auto),
            (&self.set_string, ValueKind::String),
            (&self.set_literal, ValueKind::Literal),
        ];
        for (args, kind) in scalars {
            for arg in args {
                let (name, value) = split_assignment(arg)?;
                sources
                    .set
                    .push(SetValue::new(name, value).with_kind(kind.to_string()));
            }
        }

        for arg in &self.set_list {
            let (name, value) = split_assignment(arg)?;
            sources.set_list.push(SetListValue {
                name: name.to_string(),
                value: value.split(',').map(str::to_string).collect(),
            });
        }

        for arg in &self.set_sensitive {
            let (name, value) = split_assignment(arg)?;
            sources.set_sensitive.push(SetValue::new(name, value));
        }

        Ok(sources)
    }
}

pub fn run(args: &ValuesArgs, show_sensitive: bool, json_output: bool) -> Result<()> {
    let sources = args.to_sources()?;
    let values = sources.merge()?;
    let sensitive_paths = sources.sensitive_paths();
    log_values(&values, &sensitive_paths);

    let shown = if show_sensitive {
        values
    } else {
        redact(&values, &sensitive_paths)
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(shown.inner())?);
    } else {
        print!("{}", shown.to_yaml()?);
    }

    if show_sensitive && !sensitive_paths.is_empty() {
        eprintln!(
            "{} output includes {} sensitive value(s)",
            style("⚠").yellow(),
            sensitive_paths.len()
        );
    }

    Ok(())
}
