use clap::{Parser, ValueEnum};
use docfill::fs_utils::{load_context, parse_context};
use docfill::{Result, find_directives, parse};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r#"
Directives:
  {{path.to.value}}                 - Insert a value from the context
  {{#each items}} ... {{/each}}     - Repeat the body for every element of an array
  {{#if flag}} ... {{/if}}          - Emit the body only when the value is truthy
  {{@index}} / {{this}}             - Loop index and current element inside {{#each}}

Missing values render as empty text. Falsy values: false, null, 0, "", [].

Examples:
  # Render a quote from sale data
  docfill -t quote.txt -c sale.json
  # Read the template from stdin
  echo "Hi {{customer.name}}" | docfill -t - -c sale.json
  # Validate a template without rendering
  docfill -t quote.txt --check
  # List all directives in a template
  docfill -t quote.txt --list
  # Output the directive list as JSON for scripting
  docfill -t quote.txt --list=json
  # Save output to file
  docfill -t quote.txt -c sale.json -o quote.out.txt
"#;

/// Render document templates against JSON data.
#[derive(Parser, Debug)]
#[command(
    name = "docfill",
    version,
    about = "Render document templates against JSON data.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Template file to render. Use '-' for stdin.
    #[arg(long, short, value_name = "TEMPLATE")]
    template: PathBuf,

    /// JSON file with the render context. Use '-' for stdin. Defaults to an empty object.
    #[arg(long, short, value_name = "FILE", env = "DOCFILL_CONTEXT")]
    context: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Parse the template and report errors without rendering
    #[arg(long, conflicts_with = "list")]
    check: bool,

    /// List directives in the template (optionally with format: plain, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain", conflicts_with = "check")]
    list: Option<ListFormat>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// One directive per line
    Plain,
    /// JSON output for scripting
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    if let Err(e) = run(&cli) {
        tracing::debug!(error = ?e, "run failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    if cli.context.as_deref() == Some(Path::new("-")) && cli.template == Path::new("-") {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "template and context cannot both be read from stdin",
        )
        .into());
    }

    let template = read_input(&cli.template, "template")?;

    if cli.check {
        let parsed = parse(&template)?;
        tracing::info!(nodes = parsed.nodes().len(), "template parsed");
        if !cli.quiet {
            println!("OK: {}", cli.template.display());
        }
        return Ok(());
    }

    if let Some(format) = cli.list {
        return list_directives(&template, format);
    }

    let context = match &cli.context {
        Some(path) if path.as_path() == Path::new("-") => {
            parse_context(&read_input(path, "context")?)?
        }
        Some(path) => {
            tracing::info!(path = %path.display(), "loading context");
            load_context(path)?
        }
        None => {
            tracing::warn!("no context given, rendering against an empty object");
            Value::Object(serde_json::Map::new())
        }
    };

    tracing::debug!("rendering template");
    let rendered = docfill::render(&template, &context)?;

    if let Some(output_path) = &cli.output {
        tracing::info!(path = %output_path.display(), "writing output");
        std::fs::write(output_path, rendered)?;
    } else {
        print!("{rendered}");
        io::stdout().flush()?;
    }

    tracing::info!("rendering complete");
    Ok(())
}

fn read_input(path: &Path, what: &str) -> Result<String> {
    if path == Path::new("-") {
        tracing::info!("reading {what} from stdin");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        tracing::info!(path = %path.display(), "reading {what}");
        docfill::fs_utils::read_file_contents(path)
    }
}

fn list_directives(template: &str, format: ListFormat) -> Result<()> {
    let directives = find_directives(template)?;
    tracing::debug!(count = directives.len(), "directives found");

    match format {
        ListFormat::Plain => {
            for directive in &directives {
                println!("{}..{}\t{}", directive.start, directive.end, directive.full_match);
            }
        }
        ListFormat::Json => {
            let json = serde_json::to_string_pretty(&directives)?;
            println!("{json}");
        }
    }

    Ok(())
}
