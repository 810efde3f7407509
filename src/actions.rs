//! Action driver
//!
//! Three composable actions: **Load** parses the web file into a [`Web`],
//! **Tangle** writes the output files, **Weave** writes the woven document.
//! All three read one shared [`Options`] record and return a one-line human
//! summary. The web is built once by Load and read-only afterwards, so
//! running Tangle and Weave in either order against it is safe.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::info;

use crate::model::Web;
use crate::parser::{ParseErrorList, ReaderConfig, WebReader};
use crate::tangle::{TangleError, Tangler};
use crate::weave::{ReferenceStyle, TemplateSet, WeaveError, Weaver};
use crate::writer::WriteOutcome;

/// The shared options record every action reads.
#[derive(Debug, Clone)]
pub struct Options {
    /// The web file to load
    pub web_path: PathBuf,
    /// Where tangled files and the woven document land
    pub output_dir: PathBuf,
    /// 0 = warnings, 1 = info, 2 = debug; the CLI maps this onto the
    /// tracing filter
    pub verbosity: u8,
    /// Command lead character, default `@`
    pub command_char: char,
    /// Command characters whose missing file argument is non-fatal
    pub permitted: Vec<char>,
    /// Reject unknown markers in prose
    pub strict: bool,
    /// `(start, stop)` delimiters for source line-number comments in tangled
    /// output; `None` disables them
    pub comment_style: Option<(String, String)>,
    pub reference_style: ReferenceStyle,
    pub template_set: TemplateSet,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            web_path: PathBuf::new(),
            output_dir: PathBuf::from("."),
            verbosity: 0,
            command_char: '@',
            permitted: Vec::new(),
            strict: false,
            comment_style: None,
            reference_style: ReferenceStyle::default(),
            template_set: TemplateSet::rst(),
        }
    }
}

#[derive(Debug)]
pub enum ActionError {
    Parse(ParseErrorList),
    Tangle(TangleError),
    Weave(WeaveError),
    Io(io::Error),
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::Parse(errors) => write!(f, "{}", errors),
            ActionError::Tangle(err) => write!(f, "{}", err),
            ActionError::Weave(err) => write!(f, "{}", err),
            ActionError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for ActionError {}

impl From<ParseErrorList> for ActionError {
    fn from(errors: ParseErrorList) -> Self {
        ActionError::Parse(errors)
    }
}

impl From<TangleError> for ActionError {
    fn from(err: TangleError) -> Self {
        ActionError::Tangle(err)
    }
}

impl From<WeaveError> for ActionError {
    fn from(err: WeaveError) -> Self {
        ActionError::Weave(err)
    }
}

impl From<io::Error> for ActionError {
    fn from(err: io::Error) -> Self {
        ActionError::Io(err)
    }
}

/// Load: read and parse the web file.
pub fn load(options: &Options) -> Result<(Web, String), ActionError> {
    let text = fs::read_to_string(&options.web_path)?;
    let file_name = options.web_path.display().to_string();
    let config = ReaderConfig {
        command_char: options.command_char,
        permitted: options.permitted.clone(),
        strict: options.strict,
    };
    let web = WebReader::new(config).read(&text, &file_name)?;
    let stats = web.stats();
    let summary = format!(
        "loaded {}: {} chunks, {} definitions of {} names, {} output files",
        file_name, stats.chunks, stats.named_definitions, stats.distinct_names, stats.output_files
    );
    info!("{}", summary);
    Ok((web, summary))
}

/// Tangle: write every output file of a loaded web.
pub fn tangle(web: &Web, options: &Options) -> Result<String, ActionError> {
    let mut tangler = Tangler::new(web);
    if let Some((start, stop)) = &options.comment_style {
        tangler = tangler.with_comment_style(start, stop);
    }
    let summary = tangler.tangle_to(&options.output_dir)?;
    let line = format!(
        "tangled {} files ({} written, {} unchanged)",
        summary.written + summary.unchanged,
        summary.written,
        summary.unchanged
    );
    info!("{}", line);
    Ok(line)
}

/// Weave: write the woven document of a loaded web.
pub fn weave(web: &Web, options: &Options) -> Result<String, ActionError> {
    let web_name = options.web_path.display().to_string();
    let weaver = Weaver::new(web, &options.template_set)
        .with_reference_style(options.reference_style);
    let (path, outcome) = weaver.weave_to(&options.output_dir, &web_name)?;
    let line = match outcome {
        WriteOutcome::Written => format!("wove {}", path.display()),
        WriteOutcome::Unchanged => format!("wove {} (unchanged)", path.display()),
    };
    info!("{}", line);
    Ok(line)
}

/// Compose Load with the requested downstream actions. Returns the collected
/// summaries.
pub fn process(
    options: &Options,
    do_tangle: bool,
    do_weave: bool,
) -> Result<Vec<String>, ActionError> {
    let (web, load_summary) = load(options)?;
    let mut summaries = vec![load_summary];
    if do_tangle {
        summaries.push(tangle(&web, options)?);
    }
    if do_weave {
        summaries.push(weave(&web, options)?);
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn options_for(dir: &std::path::Path, web: &str) -> Options {
        let web_path = dir.join("doc.w");
        fs::write(&web_path, web).unwrap();
        Options {
            web_path,
            output_dir: dir.join("out"),
            template_set: TemplateSet::md(),
            ..Options::default()
        }
    }

    #[test]
    fn process_tangles_and_weaves() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_for(
            dir.path(),
            "Intro prose.\n@o hello.txt @{hi@}\n",
        );
        let summaries = process(&options, true, true).unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(
            fs::read_to_string(dir.path().join("out/hello.txt")).unwrap(),
            "hi"
        );
        assert!(dir.path().join("out/doc.md").exists());
    }

    #[test]
    fn load_failure_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_for(dir.path(), "@o broken @{never closed\n");
        match process(&options, true, false) {
            Err(ActionError::Parse(errors)) => assert!(!errors.is_empty()),
            other => panic!("expected parse failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn missing_web_file_is_io_error() {
        let options = Options {
            web_path: PathBuf::from("/nonexistent/input.w"),
            ..Options::default()
        };
        assert!(matches!(load(&options), Err(ActionError::Io(_))));
    }
}
