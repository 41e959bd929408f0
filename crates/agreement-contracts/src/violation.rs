//! Contract violations.

use agreement_ast::{Check, CheckKind, SmolStr};
use thiserror::Error;
use tracing::debug;

/// Which contract a violation breaches
pub type ViolationKind = CheckKind;

/// A check that evaluated to `false`.
///
/// Built at the moment of failure and returned as an error straight away;
/// the call that raised it does not continue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Breach on {kind} Expression '{expression}' in function '{function}'")]
pub struct Violation {
    pub kind: ViolationKind,
    /// Literal source text of the failed condition
    pub expression: SmolStr,
    pub function: SmolStr,
}

impl Violation {
    pub fn new(
        kind: ViolationKind,
        expression: impl Into<SmolStr>,
        function: impl Into<SmolStr>,
    ) -> Self {
        Self {
            kind,
            expression: expression.into(),
            function: function.into(),
        }
    }

    pub fn from_check(check: &Check) -> Self {
        Self::new(check.kind, check.clause.source.clone(), check.function.clone())
    }
}

/// Report a failed check.
pub fn raise<T>(check: &Check) -> Result<T, Violation> {
    let violation = Violation::from_check(check);
    debug!(
        kind = %violation.kind,
        expression = %violation.expression,
        function = %violation.function,
        "contract breached"
    );
    Err(violation)
}
