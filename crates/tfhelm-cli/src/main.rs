//! tfhelm CLI - inspect merged and redacted Helm release values

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod error;
mod exit_codes;
mod logging;

use commands::values::ValuesArgs;

#[derive(Parser)]
#[command(name = "tfhelm")]
#[command(author = "tfhelm Contributors")]
#[command(version)]
#[command(about = "Merge, redact and diff Helm release values", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output on stderr
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the values a release would be installed with
    Values {
        /// Values file(s) to merge, in order
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values with type inference (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Set values that are always strings (key=value)
        #[arg(long = "set-string")]
        set_string: Vec<String>,

        /// Set values parsed as YAML (key=value)
        #[arg(long = "set-literal")]
        set_literal: Vec<String>,

        /// Set lists from comma separated items (key=a,b)
        #[arg(long = "set-list")]
        set_list: Vec<String>,

        /// Set values that are masked in output (key=value)
        #[arg(long = "set-sensitive")]
        set_sensitive: Vec<String>,

        /// Print sensitive values instead of masking them
        #[arg(long)]
        show_sensitive: bool,

        /// Output as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Replace sensitive values in a file with hashed tokens
    Redact {
        /// File to redact
        file: PathBuf,

        /// Value to mask (repeatable)
        #[arg(short, long = "sensitive")]
        sensitive: Vec<String>,

        /// Treat the file as a rendered manifest and print its stored JSON form
        #[arg(long)]
        manifest: bool,
    },

    /// Compare two rendered manifests per resource
    Diff {
        /// Previous manifest
        old: PathBuf,

        /// New manifest
        new: PathBuf,

        /// Value to mask (repeatable)
        #[arg(short, long = "sensitive")]
        sensitive: Vec<String>,

        /// Unchanged lines shown around each change
        #[arg(long, default_value_t = 3)]
        context: usize,
    },
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    logging::initialize_logging(cli.debug);

    let result = match cli.command {
        Commands::Values {
            values,
            set,
            set_string,
            set_literal,
            set_list,
            set_sensitive,
            show_sensitive,
            json,
        } => commands::values::run(
            &ValuesArgs {
                files: values,
                set,
                set_string,
                set_literal,
                set_list,
                set_sensitive,
            },
            show_sensitive,
            json,
        ),

        Commands::Redact {
            file,
            sensitive,
            manifest,
        } => commands::redact::run(&file, &sensitive, manifest),

        Commands::Diff {
            old,
            new,
            sensitive,
            context,
        } => commands::diff::run(&old, &new, &sensitive, context),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
