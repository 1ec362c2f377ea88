//! Diagnostics for listings.

use pest::error::{Error as PestError, InputLocation};

use super::Span;
use super::parser::Rule;
use crate::api::Diagnostic;
use crate::error::{EmitError, ErrorKind, InvalidOperationError, VerifyError};
use crate::{String, ToString, format};

/// Syntax errors.
pub const PARSE: &str = "L001";
/// Unknown or misused names: types, locals, exception blocks, instructions.
pub const RESOLVE: &str = "L002";

fn rule_name(rule: &Rule) -> String {
    let name = match rule {
        Rule::ident | Rule::dotted_name => "a name",
        Rule::ty | Rule::return_ty => "a type",
        Rule::params => "a parameter list",
        Rule::mnemonic | Rule::instruction => "an instruction",
        Rule::integer => "an integer",
        Rule::float => "a float",
        Rule::string_lit => "a string",
        Rule::field_ref | Rule::method_ref | Rule::ctor_ref => "a member reference",
        Rule::ty_suffix => "'[]', '*' or '&'",
        Rule::EOI => "end of input",
        other => return format!("{other:?}"),
    };
    name.to_string()
}

/// Converts a pest error into a diagnostic.
pub fn parse_diagnostic(err: PestError<Rule>) -> Diagnostic {
    let span = match err.location {
        InputLocation::Pos(pos) => Span(pos..pos),
        InputLocation::Span((start, end)) => Span(start..end),
    };
    let err = err.renamed_rules(rule_name);
    Diagnostic::error(err.variant.message().into_owned(), span).with_code(PARSE)
}

pub fn resolve_diagnostic(message: impl Into<String>, span: Span) -> Diagnostic {
    Diagnostic::error(message, span).with_code(RESOLVE)
}

/// Error code for an emitter error kind.
pub fn emit_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Verification => "V001",
        ErrorKind::InvalidOperation => "V002",
        ErrorKind::Argument => "V003",
    }
}

/// Converts an emitter error raised by the line at `span`.
///
/// Related locations are attached by the driver, which knows where labels
/// and blocks were introduced.
pub fn emit_diagnostic(err: &EmitError, span: Span) -> Diagnostic {
    let diagnostic = Diagnostic::error(err.to_string(), span).with_code(emit_code(err.kind()));
    match help(err) {
        Some(help) => diagnostic.with_help(help),
        None => diagnostic,
    }
}

fn help(err: &EmitError) -> Option<&'static str> {
    match err {
        EmitError::InvalidOperation(
            InvalidOperationError::BranchOutOfRegion { .. }
            | InvalidOperationError::ExitInsideRegion { .. },
        ) => Some("use 'leave' to exit an exception block"),
        EmitError::InvalidOperation(InvalidOperationError::RegionWithoutHandlers { .. }) => {
            Some("add a 'catch', 'catch_all' or 'finally' block before 'end_try'")
        }
        EmitError::Verification(VerifyError::StackNotEmpty { .. }) => {
            Some("pop the remaining values first")
        }
        EmitError::Verification(VerifyError::FallsOffEnd { .. }) => {
            Some("end the method with 'ret', 'throw' or an unconditional branch")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::parser::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_diagnostic_names_rules() {
        let err = parse("ldc.i4 5 )").unwrap_err();
        let diagnostic = parse_diagnostic(err);
        assert_eq!(diagnostic.code.as_deref(), Some(PARSE));
        assert_eq!(diagnostic.span, Span(9..9));
        assert!(
            diagnostic.message.starts_with("expected"),
            "message: {}",
            diagnostic.message
        );
    }

    #[test]
    fn test_emit_codes_and_help() {
        let err: EmitError = VerifyError::StackNotEmpty {
            operation: "EndCatchBlock",
            depth: 1,
        }
        .into();
        let diagnostic = emit_diagnostic(&err, Span(3..9));
        assert_eq!(diagnostic.code.as_deref(), Some("V001"));
        assert_eq!(diagnostic.help, vec!["pop the remaining values first".to_string()]);

        let err: EmitError = InvalidOperationError::RethrowOutsideCatch.into();
        let diagnostic = emit_diagnostic(&err, Span(0..7));
        assert_eq!(diagnostic.code.as_deref(), Some("V002"));
        assert!(diagnostic.help.is_empty());
    }
}
