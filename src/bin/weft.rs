//! # WEFT Command Line Interface
//!
//! A thin wrapper around the action API: it parses arguments, configures
//! logging, builds the shared options record, and delegates to
//! `weft::actions::process`. All processing logic lives in the library; the
//! binary only validates inputs and reports outcomes.
//!
//! ```bash
//! # tangle and weave doc.w into the current directory
//! weft doc.w
//!
//! # tangle only, into build/, tolerating missing includes
//! weft --no-weave --output build --permit i doc.w
//!
//! # weave to HTML with the transitive reference style
//! weft --no-tangle --templates html --reference-style transitive doc.w
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing_subscriber::EnvFilter;

use weft::actions::{process, Options};
use weft::weave::{ReferenceStyle, TemplateSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReferenceStyleArg {
    Simple,
    Transitive,
}

#[derive(Parser, Debug)]
#[command(version, about = "Weave documentation and tangle source from WEB files")]
struct Args {
    /// Path to the WEB file to process
    path: PathBuf,

    /// Output directory for tangled files and the woven document
    #[arg(long, short, default_value = ".")]
    output: PathBuf,

    /// Skip tangling
    #[arg(long)]
    no_tangle: bool,

    /// Skip weaving
    #[arg(long)]
    no_weave: bool,

    /// Template set: a builtin name (rst, html, md) or a path to a JSON file
    #[arg(long, short, default_value = "rst")]
    templates: String,

    /// Command lead character
    #[arg(long, default_value_t = '@')]
    command_char: char,

    /// Commands permitted to fail softly on a missing file, e.g. `i`
    #[arg(long, value_delimiter = ',')]
    permit: Vec<char>,

    /// Reject unknown markers in prose instead of passing them through
    #[arg(long)]
    strict: bool,

    /// How the "used by" lists are assembled
    #[arg(long, value_enum, default_value_t = ReferenceStyleArg::Simple)]
    reference_style: ReferenceStyleArg,

    /// Start delimiter for source line-number comments in tangled output
    #[arg(long, requires = "comment_stop")]
    comment_start: Option<String>,

    /// Stop delimiter for source line-number comments in tangled output
    #[arg(long, requires = "comment_start")]
    comment_stop: Option<String>,

    /// Print web statistics as JSON after loading
    #[arg(long)]
    stats: bool,

    /// Increase verbosity (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn report_error(message: &str) {
    let choice = if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stderr = StandardStream::stderr(choice);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = write!(stderr, "error");
    let _ = stderr.reset();
    let _ = writeln!(stderr, ": {}", message);
}

fn load_template_set(spec: &str) -> Result<TemplateSet, String> {
    if let Some(set) = TemplateSet::builtin(spec) {
        return Ok(set);
    }
    let path = PathBuf::from(spec);
    if path.exists() {
        return TemplateSet::from_json_file(&path)
            .map_err(|err| format!("cannot load template set '{}': {}", spec, err));
    }
    Err(format!(
        "unknown template set '{}' (builtin sets: rst, html, md)",
        spec
    ))
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.path.exists() {
        report_error(&format!("input file '{}' does not exist", args.path.display()));
        return ExitCode::FAILURE;
    }

    let template_set = match load_template_set(&args.templates) {
        Ok(set) => set,
        Err(message) => {
            report_error(&message);
            return ExitCode::FAILURE;
        }
    };

    let comment_style = match (args.comment_start, args.comment_stop) {
        (Some(start), Some(stop)) => Some((start, stop)),
        _ => None,
    };

    let options = Options {
        web_path: args.path,
        output_dir: args.output,
        verbosity: args.verbose,
        command_char: args.command_char,
        permitted: args.permit,
        strict: args.strict,
        comment_style,
        reference_style: match args.reference_style {
            ReferenceStyleArg::Simple => ReferenceStyle::Simple,
            ReferenceStyleArg::Transitive => ReferenceStyle::Transitive,
        },
        template_set,
    };

    if args.stats {
        match weft::actions::load(&options) {
            Ok((web, _)) => match serde_json::to_string_pretty(&web.stats()) {
                Ok(json) => println!("{}", json),
                Err(err) => {
                    report_error(&err.to_string());
                    return ExitCode::FAILURE;
                }
            },
            Err(err) => {
                report_error(&err.to_string());
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    match process(&options, !args.no_tangle, !args.no_weave) {
        Ok(summaries) => {
            for summary in summaries {
                println!("{}", summary);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}
