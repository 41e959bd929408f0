//! Rendering errors against the source they came from.
//!
//! Every error becomes an `ariadne` report. Errors that carry a span are
//! labelled in a source snippet; violations and other span-less errors are
//! rendered as a message with a note. Output is uncoloured so it can be
//! logged or compared in tests.

use std::ops::Range;

use agreement_lexer::Span;
use agreement_parser::ParseError;
use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::{LoadError, RuntimeError};

/// Render a load failure. Parse failures produce one report per error.
pub fn render_error(filename: &str, source: &str, error: &LoadError) -> String {
    match error {
        LoadError::Parse(errors) => errors
            .iter()
            .map(|e| render_parse_error(filename, source, e))
            .collect(),
        LoadError::Contract(e) => render(
            filename,
            source,
            Diagnostic {
                code: "E2001",
                message: "malformed contract",
                span: Some(e.span()),
                detail: e.to_string(),
            },
        ),
        LoadError::Runtime(e) => render_runtime_error(filename, source, e),
    }
}

/// Render an error raised while a function was running.
pub fn render_runtime_error(filename: &str, source: &str, error: &RuntimeError) -> String {
    let (code, message) = match error {
        RuntimeError::Violation(_) => ("E3001", "contract violated"),
        _ => ("E3002", "runtime error"),
    };
    render(
        filename,
        source,
        Diagnostic {
            code,
            message,
            span: error.span(),
            detail: error.to_string(),
        },
    )
}

fn render_parse_error(filename: &str, source: &str, error: &ParseError) -> String {
    let (code, message) = match error {
        ParseError::UnexpectedToken { .. } => ("E1001", "unexpected token"),
        ParseError::UnexpectedEof { .. } => ("E1002", "unexpected end of file"),
        ParseError::UnexpectedCharacter { .. } => ("E1003", "unexpected character"),
        ParseError::InvalidExpression { .. } => ("E1004", "invalid expression"),
        ParseError::InvalidAssignmentTarget { .. } => ("E1005", "invalid assignment target"),
        ParseError::MisplacedInvariant { .. } => ("E1006", "misplaced invariant"),
        ParseError::MissingEnd { .. } => ("E1007", "missing `end`"),
    };
    // End of file has no token to point at
    let span = error
        .span()
        .unwrap_or_else(|| Span::new(source.len(), source.len()));
    render(
        filename,
        source,
        Diagnostic {
            code,
            message,
            span: Some(span),
            detail: error.to_string(),
        },
    )
}

struct Diagnostic {
    code: &'static str,
    message: &'static str,
    span: Option<Span>,
    detail: String,
}

fn render(filename: &str, source: &str, diagnostic: Diagnostic) -> String {
    let offset = diagnostic.span.map_or(0, |s| s.start.min(source.len()));
    let mut report = Report::build(ReportKind::Error, filename, offset)
        .with_code(diagnostic.code)
        .with_message(diagnostic.message)
        .with_config(Config::default().with_color(false));

    match diagnostic.span {
        Some(span) => {
            report = report.with_label(
                Label::new((filename, clamp(span, source)))
                    .with_message(diagnostic.detail)
                    .with_color(Color::Red),
            );
        }
        None => report = report.with_note(diagnostic.detail),
    }

    let mut out = Vec::new();
    if let Err(e) = report
        .finish()
        .write((filename, Source::from(source)), &mut out)
    {
        return format!("error[{}]: {} ({})\n", diagnostic.code, diagnostic.message, e);
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn clamp(span: Span, source: &str) -> Range<usize> {
    let end = span.end.min(source.len());
    span.start.min(end)..end
}
