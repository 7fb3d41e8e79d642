//! Human-readable parse diagnostics

use crate::parser::ParseError;
use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};

/// Render `error` against the text it came from, naming the file `name`
///
/// Output has no colors so it can be logged or compared as-is.
pub fn render(error: &ParseError, name: &str, source: &str) -> String {
    let span = widen(error.span(), source.len());
    let label = match error {
        // The source never decoded, so there is nothing to point into
        ParseError::Encoding { .. } => return format!("{}: {}", name, error),
        ParseError::Lex { .. } => "quote is never closed",
        ParseError::Unterminated { .. } => "block opened here",
        ParseError::MissingField { .. } => "required directive missing in this block",
        ParseError::InvalidValue { .. } => "cannot parse this value",
        ParseError::UnexpectedLine { .. } => "no place to keep this line",
        ParseError::NonCanonical { .. } => "this line would not be written back as is",
    };

    let mut out = Vec::new();
    let written = Report::build(ReportKind::Error, (name, span.clone()))
        .with_config(
            Config::default()
                .with_color(false)
                .with_index_type(IndexType::Byte),
        )
        .with_message(error.to_string())
        .with_label(Label::new((name, span)).with_message(label))
        .finish()
        .write((name, Source::from(source)), &mut out);

    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        // Fall back to the plain message if the report cannot be laid out
        Err(_) => error.to_string(),
    }
}

/// Keep the span inside the source and at least one byte wide when possible
fn widen(span: std::ops::Range<usize>, len: usize) -> std::ops::Range<usize> {
    let start = span.start.min(len);
    let end = span.end.min(len);
    if start == end && end < len {
        start..end + 1
    } else {
        start..end
    }
}
