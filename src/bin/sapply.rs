//! sapply - structured apply CLI tool
//!
//! Runs the library operations over YAML/JSON files. The managed fields
//! ledger of `apply` and `update` lives in a JSON file that is read before
//! the operation and rewritten after it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use structured_apply::typed::ParseableType;
use structured_apply::{value, ApiVersion, ManagedFields, MergeError, Merged, Schema, TypedValue, Updater};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "sapply", version)]
#[command(about = "Ownership-aware structured merges of YAML/JSON documents")]
struct Cli {
    /// Path to the schema file
    #[arg(short, long)]
    schema: PathBuf,

    /// Name of the type in the schema to use (default: the alphabetically first type)
    #[arg(short, long)]
    type_name: Option<String>,

    /// Output location, '-' for stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all types in the schema
    ListTypes,

    /// Validate a document against the type
    Validate { file: PathBuf },

    /// Print the field set of a document
    Fieldset {
        file: PathBuf,

        /// Print the managed fields wire format instead of paths
        #[arg(long)]
        json: bool,
    },

    /// Compare two documents
    Compare {
        #[arg(long)]
        lhs: PathBuf,
        #[arg(long)]
        rhs: PathBuf,
    },

    /// Apply a partial document on behalf of a manager
    Apply {
        #[command(flatten)]
        call: Call,

        /// The partial document the manager declares
        #[arg(long)]
        config: PathBuf,

        /// Take over conflicting fields
        #[arg(long)]
        force: bool,
    },

    /// Record a full new document written by a manager
    Update {
        #[command(flatten)]
        call: Call,

        /// The next document
        #[arg(long)]
        new: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct Call {
    /// The current document
    #[arg(long)]
    live: PathBuf,

    /// Who makes the change
    #[arg(long)]
    manager: String,

    /// API version of the documents
    #[arg(long, default_value = "v1")]
    api_version: String,

    /// Managed fields ledger; a missing file is an empty ledger
    #[arg(long)]
    managed_fields: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let schema = Schema::from_yaml(&read(&cli.schema)?)
        .map_err(|e| format!("failed to parse schema {:?}: {}", cli.schema, e))?;

    let type_name = match cli.type_name {
        Some(name) => name,
        None => default_type(&schema).ok_or("no types found in schema")?,
    };
    let parser = ParseableType::new(&schema, &type_name);
    if !parser.is_valid() {
        return Err(format!("type {:?} not found in schema", type_name).into());
    }
    debug!(type_name = %type_name, "schema loaded");

    let mut output: Box<dyn Write> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(
            fs::File::create(&cli.output)
                .map_err(|e| format!("failed to create output file {:?}: {}", cli.output, e))?,
        )
    };

    match cli.command {
        Command::ListTypes => {
            for name in schema.type_names() {
                writeln!(output, "{}", name)?;
            }
        }
        Command::Validate { file } => {
            load(&parser, &file)?;
            writeln!(output, "{}: valid", file.display())?;
        }
        Command::Fieldset { file, json } => {
            let fields = load(&parser, &file)?.field_set();
            if json {
                writeln!(output, "{}", fields.to_json()?)?;
            } else {
                writeln!(output, "{}", fields)?;
            }
        }
        Command::Compare { lhs, rhs } => {
            let comparison = load(&parser, &lhs)?.compare(&load(&parser, &rhs)?)?;
            if comparison.is_same() {
                writeln!(output, "no differences")?;
            } else {
                writeln!(output, "{}", comparison)?;
            }
        }
        Command::Apply { call, config, force } => {
            let config = load(&parser, &config)?;
            let updater = Updater::builder().build();
            run_call(&parser, &call, &mut output, |live, version, managers| {
                updater.apply(live, &config, version, managers, &call.manager, force)
            })?;
        }
        Command::Update { call, new } => {
            let new = load(&parser, &new)?;
            let updater = Updater::builder().build();
            run_call(&parser, &call, &mut output, |live, version, managers| {
                updater.update(live, &new, version, managers, &call.manager)
            })?;
        }
    }

    Ok(())
}

/// Loads the live object and ledger, runs `op`, then writes the merged
/// object to `output` and the ledger back to its file.
fn run_call<F>(parser: &ParseableType, call: &Call, output: &mut dyn Write, op: F) -> CliResult<()>
where
    F: FnOnce(&TypedValue, &ApiVersion, &ManagedFields) -> Result<Merged, MergeError>,
{
    let live = load(parser, &call.live)?;
    let version = ApiVersion::new(call.api_version.as_str());
    let managers = match &call.managed_fields {
        Some(path) if path.exists() => ManagedFields::from_json(&read(path)?)?,
        _ => ManagedFields::new(),
    };

    let merged = op(&live, &version, &managers)?;

    write!(output, "{}", value::to_yaml(merged.object.value())?)?;
    if let Some(path) = &call.managed_fields {
        fs::write(path, merged.managers.to_json()?)
            .map_err(|e| format!("failed to write managed fields {:?}: {}", path, e))?;
    }
    Ok(())
}

/// The type used when none is named: the first one in alphabetical order,
/// whatever order the schema file lists them in.
fn default_type(schema: &Schema) -> Option<String> {
    schema.type_names().next().map(str::to_string)
}

fn read(path: &Path) -> CliResult<String> {
    Ok(fs::read_to_string(path).map_err(|e| format!("failed to read {:?}: {}", path, e))?)
}

fn load(parser: &ParseableType, path: &Path) -> CliResult<TypedValue> {
    Ok(parser
        .from_yaml(&read(path)?)
        .map_err(|e| format!("{}: {}", path.display(), e))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_type_is_alphabetical() {
        let schema = Schema::from_yaml(
            "types:\n- name: zeta\n  scalar: string\n- name: alpha\n  scalar: numeric\n",
        )
        .unwrap();
        assert_eq!(default_type(&schema), Some("alpha".to_string()));
        assert_eq!(default_type(&Schema::from_yaml("types: []\n").unwrap()), None);
    }
}
