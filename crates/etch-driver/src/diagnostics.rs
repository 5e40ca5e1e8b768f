//! Renders a [`DriverError`] as a source-annotated diagnostic (spec.md §7
//! ambient addition: `codespan_reporting` + `termcolor`, the donor CLI's
//! diagnostic stack).
//!
//! Every pipeline-stage error already carries an `etch_ast::Pos`
//! (line/column), folded into its `Display` message by each crate's
//! `thiserror` derive. Since there is no lexer/parser in this workspace
//! (spec.md §1), there are no byte spans to hand `codespan_reporting`
//! directly — this module recovers an approximate one by walking the demo's
//! literal source text line by line, so the rendered snippet still points
//! at the right line even though the column highlight is a single-line
//! estimate rather than a true token span.

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::{self, termcolor::{ColorChoice, StandardStream}};

use etch_driver::DriverError;

/// Print `error` to stderr, with a source snippet if `source` is available
/// and the error's position can be recovered from its message.
pub fn report(name: &str, source: Option<&str>, error: &DriverError) {
    let message = error.to_string();
    let Some(source) = source else {
        eprintln!("error: {message}");
        return;
    };

    let file = SimpleFile::new(name, source);
    let range = pos_from_message(&message).map(|p| byte_range(source, &p)).unwrap_or(0..0);

    let diagnostic = Diagnostic::error().with_message(message).with_labels(vec![Label::primary((), range)]);

    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();
    let _ = term::emit(&mut writer.lock(), &config, &file, &diagnostic);
}

/// Every stage's error message embeds `Pos::Display`'s `file:line:col`
/// somewhere after a stage-name prefix (`DriverError`'s own `#[error(...)]`
/// adds that prefix) — scan adjacent colon-separated parts for the first
/// pair that both parse as integers, rather than assume a fixed offset.
fn pos_from_message(message: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = message.split(':').collect();
    for window in parts.windows(2) {
        let line = window[0].trim().parse::<u32>();
        let col = window[1].trim().split(' ').next().unwrap_or("").parse::<u32>();
        if let (Ok(line), Ok(col)) = (line, col) {
            return Some((line, col));
        }
    }
    None
}

fn byte_range(source: &str, (line, col): &(u32, u32)) -> std::ops::Range<usize> {
    let mut offset = 0usize;
    for (i, l) in source.lines().enumerate() {
        if i as u32 + 1 == *line {
            let start = offset + (*col as usize).saturating_sub(1).min(l.len());
            return start..(start + 1).min(offset + l.len() + 1);
        }
        offset += l.len() + 1;
    }
    0..0
}
