//! Agreement Contract Weaving
//!
//! Turns annotated functions into instrumented ones by rewriting their
//! syntax trees. Nothing here evaluates code; the output is an ordinary
//! `FunctionDecl` whose body carries `Check` statements and `Ensured`
//! exit values for an evaluator to execute.
//!
//! # Pipeline
//!
//! | Stage | Entry point | Input | Output |
//! |-------|-------------|-------|--------|
//! | Annotation parsing | [`ContractDeclaration::from_block`] | `ContractBlock` | `ContractDeclaration` |
//! | Exit location | [`locate_exits`] | function body | ordered `ExitPoint`s |
//! | Weaving | [`Weaver::weave`] | `ContractDeclaration` | instrumented `FunctionDecl` |
//! | Invariant injection | [`expand_invariants`] | `FunctionDecl` | `FunctionDecl` without annotations |
//!
//! # Instrumentation toggle
//!
//! Requirement and ensure checks are emitted only while the process-wide
//! toggle ([`set_agreement_enabling`]) is on at the moment a contract is
//! woven. Loop invariant checks are always emitted.

pub mod declaration;
pub mod invariant;
pub mod locator;
pub mod toggle;
pub mod violation;
pub mod weaver;

pub use declaration::ContractDeclaration;
pub use invariant::{expand_invariants, inject_invariant};
pub use locator::{locate_exits, ExitKind, ExitPoint, Step};
pub use toggle::{agreement_enabled, set_agreement_enabling};
pub use violation::{raise, Violation, ViolationKind};
pub use weaver::{Weaver, WeaverConfig};

use agreement_ast::{ContractBlock, FunctionDecl, Span};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// A structurally invalid contract block.
///
/// Raised while a block is being transformed; the function it declares is
/// never registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("Malformed contract at position {span:?}: no function definition in contract block")]
    MissingFunction { span: Span },

    #[error("Malformed contract at position {span:?}: a contract block may define only one function")]
    MultipleFunctions { span: Span },

    #[error("Malformed contract at position {span:?}: the function definition must be the last item of the contract block")]
    FunctionNotLast { span: Span },

    #[error("Malformed contract at position {span:?}: the return alias is assigned more than once")]
    DuplicateReturnAlias { span: Span },

    #[error("Malformed contract at position {span:?}: {keyword}() declares no expressions")]
    EmptyClauseList { keyword: &'static str, span: Span },

    #[error("Malformed contract at position {span:?}: a return alias is written as `result = <name>`")]
    InvalidReturnAlias { span: Span },

    #[error("Malformed contract at position {span:?}: only require, ensure, a return alias and the function may appear in a contract block")]
    UnexpectedStatement { span: Span },

    #[error("Invariant annotation at position {span:?} does not wrap a loop")]
    InvariantWithoutLoop { span: Span },
}

impl ContractError {
    pub fn span(&self) -> Span {
        match self {
            ContractError::MissingFunction { span }
            | ContractError::MultipleFunctions { span }
            | ContractError::FunctionNotLast { span }
            | ContractError::DuplicateReturnAlias { span }
            | ContractError::EmptyClauseList { span, .. }
            | ContractError::InvalidReturnAlias { span }
            | ContractError::UnexpectedStatement { span }
            | ContractError::InvariantWithoutLoop { span } => *span,
        }
    }
}

// ============================================================================
// Whole-block transformation
// ============================================================================

/// Normalize, weave and expand a contract block in one go.
///
/// This is what a host runs at the point a contract block is defined:
/// the returned function replaces the declared one under the same name.
pub fn instrument(block: &ContractBlock, weaver: &Weaver) -> Result<FunctionDecl, ContractError> {
    let declaration = ContractDeclaration::from_block(block)?;
    let woven = weaver.weave(&declaration);
    expand_invariants(&woven)
}
