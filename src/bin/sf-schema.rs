//! Schema Form CLI
//!
//! Command-line interface for resolving form schemas and validating form data.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use sf_schema::{
    load_schema, load_schema_auto, load_typed, resolve_with, validate_with, FormOptions, Layout,
    ResolveError, ResolveOptions, Services, ValidateError,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sf-schema")]
#[command(about = "Resolve form schemas and UI overlays into renderable descriptors")]
#[command(version)]
struct Cli {
    /// Log resolution steps to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every command besides the schema itself.
#[derive(clap::Args)]
struct FormArgs {
    /// UI overlay file or URL
    #[arg(long)]
    ui: Option<String>,

    /// Global form options file or URL
    #[arg(long)]
    options: Option<String>,

    /// Layout mode: horizontal, vertical or inline
    #[arg(long, default_value = "horizontal")]
    layout: Layout,

    /// Translation dictionary (JSON object of key to text)
    #[arg(long)]
    i18n: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a schema and overlay into a pruned schema and descriptor tree
    Resolve {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        #[command(flatten)]
        form: FormArgs,

        /// Form data conditionals are evaluated against
        #[arg(long)]
        data: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Print only the resolved schema, without the descriptor tree
        #[arg(long)]
        schema_only: bool,
    },

    /// Validate form data against a resolved schema
    Validate {
        /// Form data file to validate
        data: PathBuf,

        /// Schema source: file path or URL
        #[arg(long)]
        schema: String,

        #[command(flatten)]
        form: FormArgs,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Resolve {
            schema,
            form,
            data,
            output,
            pretty,
            schema_only,
        } => run_resolve(ResolveArgs {
            schema,
            form,
            data,
            output,
            pretty,
            schema_only,
        }),
        Commands::Validate {
            data,
            schema,
            form,
            json,
        } => run_validate(&data, &schema, &form, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sf_schema=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Everything a resolution needs besides the collaborators.
struct Inputs {
    schema: Value,
    overlay: Value,
    options: ResolveOptions,
    dictionary: Option<HashMap<String, String>>,
}

fn load_inputs(schema_source: &str, form: &FormArgs) -> Result<Inputs, ResolveError> {
    let schema = load_schema_auto(schema_source)?;
    let overlay = match &form.ui {
        Some(source) => load_schema_auto(source)?,
        None => Value::Null,
    };
    let form_options: FormOptions = match &form.options {
        Some(source) => load_typed(source)?,
        None => FormOptions::default(),
    };
    let dictionary = form.i18n.as_deref().map(load_typed).transpose()?;

    Ok(Inputs {
        schema,
        overlay,
        options: ResolveOptions::new(form.layout).form_options(form_options),
        dictionary,
    })
}

fn services(dictionary: Option<&HashMap<String, String>>) -> Services<'_> {
    match dictionary {
        Some(dictionary) => Services::default().with_translator(dictionary),
        None => Services::default(),
    }
}

struct ResolveArgs {
    schema: String,
    form: FormArgs,
    data: Option<PathBuf>,
    output: Option<PathBuf>,
    pretty: bool,
    schema_only: bool,
}

fn run_resolve(args: ResolveArgs) -> Result<(), u8> {
    let fail = |e: ResolveError| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    };

    let mut inputs = load_inputs(&args.schema, &args.form).map_err(fail)?;
    if let Some(path) = &args.data {
        let data = load_schema(path).map_err(fail)?;
        inputs.options = inputs.options.form_data(data);
    }

    let resolved = resolve_with(
        &inputs.schema,
        &inputs.overlay,
        &inputs.options,
        &services(inputs.dictionary.as_ref()),
    )
    .map_err(fail)?;

    let serialized = match (args.schema_only, args.pretty) {
        (true, true) => serde_json::to_string_pretty(&resolved.schema),
        (true, false) => serde_json::to_string(&resolved.schema),
        (false, true) => serde_json::to_string_pretty(&resolved),
        (false, false) => serde_json::to_string(&resolved),
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &serialized).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", serialized);
        }
    }

    Ok(())
}

fn run_validate(
    data_path: &Path,
    schema_source: &str,
    form: &FormArgs,
    json_output: bool,
) -> Result<(), u8> {
    let data = load_schema(data_path).map_err(|e| {
        report_error(json_output, &format!("loading data: {}", e));
        e.exit_code() as u8
    })?;
    let inputs = load_inputs(schema_source, form).map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;

    let outcome = validate_with(
        &inputs.schema,
        &inputs.overlay,
        &data,
        &inputs.options,
        &services(inputs.dictionary.as_ref()),
    );

    match outcome {
        Ok(_) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(ValidateError::Resolve(e)) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
