mod scenario_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use vpl::language::Language;
use vpl::schema::{SchemaError, SchemaFormat, SchemaLoader};
use vpl_editor::{AddableContext, compute_addable_statements};

#[derive(Parser)]
#[command(name = "vpl", version, about = "Visual programming language block editor tools")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log editor operations (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a language schema and report structural problems
    Check(CheckArgs),

    /// List the statements addable in a context
    Addable(AddableArgs),

    /// Run .scenario.toml files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Schema file (.toml or .json)
    schema: String,
}

#[derive(clap::Args)]
struct AddableArgs {
    /// Schema file (.toml or .json)
    schema: String,

    /// Id of the compound statement owning the target block
    #[arg(short, long)]
    parent: Option<String>,

    /// The target block lies inside a user procedure body
    #[arg(long)]
    procedure_body: bool,

    /// Case-insensitive label filter
    #[arg(short, long, default_value = "")]
    query: String,

    /// Show the device tab of this device instead of the basic tab
    #[arg(short, long)]
    device: Option<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .scenario.toml file or directory containing them
    path: String,

    /// Run only scenarios in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Check(args) => do_check(args, cli.no_color),
        Command::Addable(args) => do_addable(args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                scenario_runner::list_categories(path);
                return;
            }
            let exit_code = scenario_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn color_choice(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Read and load a schema, rendering diagnostics. Exits on errors.
fn load_schema(path: &str, no_color: bool) -> (Language, usize) {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path, e);
            process::exit(1);
        }
    };
    let Some(format) = SchemaFormat::from_path(Path::new(path)) else {
        eprintln!("error: '{}' is neither a .toml nor a .json schema", path);
        process::exit(1);
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(path.to_string(), source.clone());

    let loader = SchemaLoader::new(source, file_id, format);
    match loader.load_checked() {
        Ok((language, warnings)) => {
            emit_diagnostics(&files, &warnings, no_color);
            (language, warnings.len())
        }
        Err(errors) => {
            emit_diagnostics(&files, &errors, no_color);
            process::exit(1);
        }
    }
}

fn emit_diagnostics(files: &SimpleFiles<String, String>, errors: &[SchemaError], no_color: bool) {
    let writer = StandardStream::stderr(color_choice(no_color));
    let config = term::Config::default();
    for error in errors {
        let diagnostic = error.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
    }
}

fn do_check(args: CheckArgs, no_color: bool) {
    let (language, warnings) = load_schema(&args.schema, no_color);
    if warnings == 0 {
        eprintln!(
            "ok: {} statement(s), {} device(s)",
            language.statements.len(),
            language.device_list.len()
        );
    } else {
        eprintln!("{}: {} warning(s)", args.schema, warnings);
    }
}

fn do_addable(args: AddableArgs, no_color: bool) {
    let (language, _) = load_schema(&args.schema, no_color);

    let mut context = match args.parent {
        Some(parent) => AddableContext::nested_in(parent),
        None => AddableContext::root(),
    }
    .matching(args.query);
    if args.procedure_body {
        context = context.in_procedure_body();
    }

    let addable = match compute_addable_statements(&language, &context) {
        Ok(addable) => addable,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let tab = match &args.device {
        Some(device) => addable.for_device(device),
        None => addable.basic(),
    };

    for (id, def) in tab.iter() {
        let marker = if def.is_user_procedure { " (procedure)" } else { "" };
        println!("{}\t{}{}", id, def.label, marker);
    }
}
