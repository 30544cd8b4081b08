use std::ops::Range;
use std::path::Path;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use assembler::{StructuralError, ValidationError};

/// Renders diagnostics to stderr.
pub struct Reporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl Reporter {
    pub fn new(no_color: bool) -> Self {
        let color_choice = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Reporter {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(color_choice),
            config: term::Config::default(),
        }
    }

    fn emit(&self, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(&mut self.writer.lock(), &self.config, &self.files, diagnostic);
    }

    /// A JSON syntax or shape error, labelled at the position serde reports.
    pub fn json_error(&mut self, path: &Path, source: String, error: &serde_json::Error) {
        let span = line_column_span(&source, error.line(), error.column());
        let file_id = self.files.add(path.display().to_string(), source);
        let diagnostic = Diagnostic::error()
            .with_message(format!("cannot parse {}", path.display()))
            .with_labels(vec![Label::primary(file_id, span).with_message(error.to_string())]);
        self.emit(&diagnostic);
    }

    pub fn validation_errors(&self, errors: &[ValidationError]) {
        for error in errors {
            self.emit(&error.to_diagnostic());
        }
        eprintln!("error: block tree has {} validation error(s)", errors.len());
    }

    pub fn structural_error(&self, error: &StructuralError) {
        self.emit(&Diagnostic::error().with_message(error.to_string()));
    }

    pub fn unsupported_block(&self, block_type: &str) {
        self.emit(
            &Diagnostic::error()
                .with_message(format!("unsupported block detected: {}", block_type))
                .with_notes(vec!["the type is not in the schema registry".to_string()]),
        );
    }
}

/// Byte span of the character at a 1-based line and column. serde reports
/// column 0 when the error is at the end of a line.
fn line_column_span(source: &str, line: usize, column: usize) -> Range<usize> {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    let line_text = source[line_start..].split('\n').next().unwrap_or("");

    let mut start = line_start + column.saturating_sub(1).min(line_text.len());
    while !source.is_char_boundary(start) {
        start -= 1;
    }
    let end = source[start..]
        .chars()
        .next()
        .map_or(start, |c| start + c.len_utf8());
    start..end
}
