use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Errors that abort emission of one compilation unit.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmitError {
    #[error("`{name}` is already defined in this scope")]
    DuplicateSymbol { name: String, span: Span },

    #[error("unknown {kind} `{name}`")]
    UnknownSymbol {
        name: String,
        kind: &'static str,
        span: Span,
    },

    #[error("`{name}` takes {expected} argument(s) but {found} were supplied")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("internal compiler error: {message}")]
    Internal { message: String, span: Span },
}

impl EmitError {
    pub fn internal(message: impl Into<String>) -> Self {
        EmitError::Internal {
            message: message.into(),
            span: Span::dummy(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            EmitError::DuplicateSymbol { span, .. }
            | EmitError::UnknownSymbol { span, .. }
            | EmitError::ArityMismatch { span, .. }
            | EmitError::Internal { span, .. } => *span,
        }
    }

    /// Attach `span` if the error was raised without a source position.
    pub fn at(mut self, at: Span) -> Self {
        let slot = match &mut self {
            EmitError::DuplicateSymbol { span, .. }
            | EmitError::UnknownSymbol { span, .. }
            | EmitError::ArityMismatch { span, .. }
            | EmitError::Internal { span, .. } => span,
        };
        if *slot == Span::dummy() {
            *slot = at;
        }
        self
    }
}

impl From<EmitError> for Diagnostic {
    fn from(err: EmitError) -> Self {
        let diag = Diagnostic::error(err.to_string(), err.span());
        match &err {
            EmitError::DuplicateSymbol { .. } => {
                diag.with_help("rename one of the definitions".to_string())
            }
            EmitError::UnknownSymbol { kind: "variable", name, .. } => {
                diag.with_help(format!("introduce it first with `let {} = ...`", name))
            }
            EmitError::UnknownSymbol { kind: "function", .. } => {
                diag.with_note("functions must be defined before they are called".to_string())
            }
            EmitError::Internal { .. } => {
                diag.with_note("this is a bug in the compiler, not in the program".to_string())
            }
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_fills_only_missing_spans() {
        let here = Span::new(4, 5, 2, 1);
        let there = Span::new(9, 10, 3, 2);
        let err = EmitError::internal("boom").at(here).at(there);
        assert_eq!(err.span(), here);
    }

    #[test]
    fn converts_to_diagnostic_with_help() {
        let err = EmitError::UnknownSymbol {
            name: "x".to_string(),
            kind: "variable",
            span: Span::new(0, 1, 1, 1),
        };
        let diag: Diagnostic = err.into();
        assert_eq!(diag.message, "unknown variable `x`");
        assert_eq!(diag.help.as_deref(), Some("introduce it first with `let x = ...`"));
    }
}
