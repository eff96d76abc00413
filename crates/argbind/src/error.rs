use std::fmt;
use std::ops::ControlFlow;

use thiserror::Error;

use crate::arity::Arity;
use crate::result::ParseResult;

/// One problem found while matching or binding arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown option: '{token}'")]
    UnknownOption { token: String, arg_index: usize },

    #[error("option '{option}' requires {arity} value(s), got {found}")]
    MissingRequiredValue {
        option: String,
        arity: Arity,
        found: usize,
    },

    #[error("missing required parameter {parameter}: expected {arity} value(s), got {found}")]
    MissingRequiredParameter {
        parameter: String,
        arity: Arity,
        found: usize,
    },

    #[error("missing required option '{option}'")]
    MissingRequiredOption { option: String },

    #[error("invalid value for {target}: cannot convert '{raw}' to {type_name}: {reason}")]
    TypeConversion {
        target: String,
        raw: String,
        type_name: String,
        reason: String,
    },

    #[error("cannot expand '{token}': '-{at}' is not an option")]
    AmbiguousClusterExpansion {
        token: String,
        arg_index: usize,
        at: char,
    },

    #[error("option '{option}' does not take a value (got '{value}')")]
    UnexpectedValue { option: String, value: String },

    #[error("unmatched argument: '{token}'")]
    UnmatchedArgument { token: String, arg_index: usize },
}

impl ParseError {
    /// Index into the original argument list, when the error is tied to one argument.
    pub fn arg_index(&self) -> Option<usize> {
        match self {
            Self::UnknownOption { arg_index, .. }
            | Self::AmbiguousClusterExpansion { arg_index, .. }
            | Self::UnmatchedArgument { arg_index, .. } => Some(*arg_index),
            _ => None,
        }
    }
}

/// A failed parse: every collected error plus whatever was bound before failing.
///
/// In fail-fast mode `errors` holds exactly one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    errors: Vec<ParseError>,
    partial: Box<ParseResult>,
}

impl ParseFailure {
    pub(crate) fn new(partial: ParseResult) -> Self {
        Self {
            errors: partial.errors().to_vec(),
            partial: Box::new(partial),
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn first(&self) -> &ParseError {
        &self.errors[0]
    }

    /// Bindings as they stood when parsing stopped; errored specs keep their defaults.
    pub fn partial(&self) -> &ParseResult {
        &self.partial
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first())?;
        match self.errors.len() {
            0 | 1 => Ok(()),
            2 => f.write_str(" (and 1 more error)"),
            n => write!(f, " (and {} more errors)", n - 1),
        }
    }
}

impl std::error::Error for ParseFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.first())
    }
}

/// Shared error accumulator for the matcher and binder.
///
/// Fail-fast mode is the same sink that asks its caller to stop after the
/// first push.
#[derive(Debug)]
pub(crate) struct ErrorSink {
    collect_all: bool,
    errors: Vec<ParseError>,
}

impl ErrorSink {
    pub(crate) fn new(collect_all: bool) -> Self {
        Self {
            collect_all,
            errors: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, error: ParseError) -> ControlFlow<()> {
        tracing::debug!(%error, "parse error");
        self.errors.push(error);
        if self.collect_all {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }

    pub(crate) fn stopped(&self) -> bool {
        !self.collect_all && !self.errors.is_empty()
    }

    pub(crate) fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_fast_sink_breaks_on_first_error() {
        let mut sink = ErrorSink::new(false);
        assert!(!sink.stopped());
        let flow = sink.push(ParseError::MissingRequiredOption {
            option: "--x".into(),
        });
        assert!(flow.is_break());
        assert!(sink.stopped());
    }

    #[test]
    fn collecting_sink_keeps_going() {
        let mut sink = ErrorSink::new(true);
        for token in ["-a", "-b"] {
            let flow = sink.push(ParseError::UnknownOption {
                token: token.into(),
                arg_index: 0,
            });
            assert!(flow.is_continue());
        }
        assert!(!sink.stopped());
        assert_eq!(sink.into_errors().len(), 2);
    }

    #[test]
    fn messages_name_the_offender() {
        let err = ParseError::TypeConversion {
            target: "--count".into(),
            raw: "ten".into(),
            type_name: "int".into(),
            reason: "invalid digit found in string".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("--count") && msg.contains("'ten'") && msg.contains("int"));
    }
}
