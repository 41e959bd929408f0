//! Tree-walking evaluator for agreement programs.
//!
//! Contract blocks are woven when they are defined: the interpreter hands
//! each block to `agreement-contracts` and registers the instrumented
//! function under the declared name. Running a woven function executes its
//! injected checks, and a check that evaluates to `false` aborts the call
//! with [`RuntimeError::Violation`].
//!
//! ```text
//! contract
//!   require(length(xs) > 0)
//!   ensure(result >= 0)
//!   fn total(xs)
//!     sum(xs)
//!   end
//! end
//! ```

use agreement_contracts::{ContractError, Violation};
use agreement_lexer::Span;
use agreement_parser::ParseError;
use smol_str::SmolStr;
use thiserror::Error;

mod builtins;
mod environment;
mod eval;
pub mod report;
mod value;

pub use environment::Environment;
pub use eval::Interpreter;
pub use value::{BuiltinFn, UserFunction, Value};

/// Runtime errors that can occur during interpretation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// A requirement, ensure or invariant check evaluated to `false`
    #[error(transparent)]
    Violation(#[from] Violation),

    #[error("undefined variable: {name}")]
    UndefinedVariable { name: SmolStr, span: Span },

    #[error("undefined function: {name}")]
    UndefinedFunction { name: SmolStr },

    #[error("type error: {message}")]
    TypeError { message: String, span: Span },

    #[error("division by zero")]
    DivisionByZero { span: Span },

    #[error("index out of bounds: {index} (length {length})")]
    IndexOutOfBounds {
        index: i64,
        length: usize,
        span: Span,
    },

    #[error("invalid key: {key}")]
    InvalidKey { key: String, span: Span },

    #[error("not callable: {value_type}")]
    NotCallable { value_type: String, span: Span },

    #[error("arity mismatch: expected {expected}, got {got}")]
    ArityMismatch {
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("contract condition `{expression}` evaluated to {found}, expected a Bool")]
    NonBooleanCheck {
        expression: SmolStr,
        found: &'static str,
        span: Span,
    },

    #[error("break outside loop")]
    BreakOutsideLoop { span: Span },

    #[error("continue outside loop")]
    ContinueOutsideLoop { span: Span },

    #[error("return outside function")]
    ReturnOutsideFunction { span: Span },

    #[error("runtime error: {message}")]
    General { message: String, span: Span },
}

impl RuntimeError {
    /// Source location, when the error is tied to one
    pub fn span(&self) -> Option<Span> {
        match self {
            RuntimeError::Violation(_) | RuntimeError::UndefinedFunction { .. } => None,
            RuntimeError::UndefinedVariable { span, .. }
            | RuntimeError::TypeError { span, .. }
            | RuntimeError::DivisionByZero { span }
            | RuntimeError::IndexOutOfBounds { span, .. }
            | RuntimeError::InvalidKey { span, .. }
            | RuntimeError::NotCallable { span, .. }
            | RuntimeError::ArityMismatch { span, .. }
            | RuntimeError::NonBooleanCheck { span, .. }
            | RuntimeError::BreakOutsideLoop { span }
            | RuntimeError::ContinueOutsideLoop { span }
            | RuntimeError::ReturnOutsideFunction { span }
            | RuntimeError::General { span, .. } => Some(*span),
        }
    }

    /// The violation carried by this error, if it is one
    pub fn as_violation(&self) -> Option<&Violation> {
        match self {
            RuntimeError::Violation(violation) => Some(violation),
            _ => None,
        }
    }
}

/// Failure to bring a source file into an interpreter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("failed to parse source ({} errors)", .0.len())]
    Parse(Vec<ParseError>),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Result type for interpreter operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Non-local exits travelling up through statement execution.
#[derive(Debug)]
pub(crate) enum ControlFlow {
    Break,
    Continue,
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for ControlFlow {
    fn from(error: RuntimeError) -> Self {
        ControlFlow::Error(error)
    }
}

impl From<Violation> for ControlFlow {
    fn from(violation: Violation) -> Self {
        ControlFlow::Error(RuntimeError::Violation(violation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agreement_contracts::ViolationKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_violation_displays_unchanged() {
        let error = RuntimeError::from(Violation::new(
            ViolationKind::Ensure,
            "sum(result) > 5",
            "sum_all",
        ));
        assert_eq!(
            error.to_string(),
            "Breach on Ensure Expression 'sum(result) > 5' in function 'sum_all'"
        );
        assert!(error.as_violation().is_some());
        assert_eq!(error.span(), None);
    }

    #[test]
    fn test_load_error_counts_parse_errors() {
        let error = LoadError::Parse(vec![
            ParseError::UnexpectedEof {
                expected: "end".into(),
            },
            ParseError::MisplacedInvariant {
                span: Span::new(0, 9),
            },
        ]);
        assert_eq!(error.to_string(), "failed to parse source (2 errors)");
    }
}
