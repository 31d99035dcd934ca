//! Error formatting for signature parsing
//!
//! Provides user-friendly messages using ariadne for nice formatting.

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::prelude::Simple;
use std::ops::Range;

use crate::lexer::Token;

/// Format lexer errors into a user-friendly string
pub fn format_lexer_errors(source: &str, errors: Vec<Simple<char>>) -> String {
    let mut output = Vec::new();

    for error in errors {
        let span = error.span();
        let report = Report::build(ReportKind::Error, (), span.start)
            .with_message("Lexical error")
            .with_label(
                Label::new(span.clone())
                    .with_message(format_lexer_error(&error))
                    .with_color(Color::Red),
            );

        report
            .finish()
            .write(Source::from(source), &mut output)
            .expect("Failed to write error report");
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

fn format_lexer_error(error: &Simple<char>) -> String {
    let found = error
        .found()
        .map(|c| format!("'{}'", c))
        .unwrap_or_else(|| "end of input".to_string());
    format!("Unexpected character {}", found)
}

/// Format parser errors into a user-friendly string
pub fn format_parser_errors(
    source: &str,
    errors: Vec<Simple<Token>>,
    token_spans: &[(Token, Range<usize>)],
) -> String {
    let mut output = Vec::new();

    for error in errors {
        let span = error.span();

        // Parser spans are token indices; map them back to character
        // positions via the recorded token spans. The end-of-input marker
        // points one past the last token.
        let char_span = if span.start < token_spans.len() {
            token_spans[span.start].1.clone()
        } else if let Some((_, last_range)) = token_spans.last() {
            last_range.end..last_range.end
        } else {
            0..0
        };

        let report = Report::build(ReportKind::Error, (), char_span.start)
            .with_message("Parse error")
            .with_label(
                Label::new(char_span.clone())
                    .with_message(format_parser_error(&error))
                    .with_color(Color::Red),
            );

        report
            .finish()
            .write(Source::from(source), &mut output)
            .expect("Failed to write error report");
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

fn format_parser_error(error: &Simple<Token>) -> String {
    let found = error
        .found()
        .map(|t| format!("'{}'", t))
        .unwrap_or_else(|| "end of input".to_string());

    let expected: Vec<String> = error
        .expected()
        .filter_map(|opt| opt.as_ref())
        .map(|t| format!("'{}'", t))
        .collect();

    if expected.is_empty() {
        format!("Unexpected token {}", found)
    } else {
        format!("Unexpected {}, expected one of: {}", found, expected.join(", "))
    }
}
