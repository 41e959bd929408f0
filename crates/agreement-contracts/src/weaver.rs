//! Weaving requirement and ensure checks into a contracted function.

use agreement_ast::{
    Block, Check, CheckKind, ContractClause, Expr, ExprKind, FunctionDecl, Postcondition, SmolStr,
    Stmt, StmtKind,
};
use tracing::{debug, warn};

use crate::declaration::ContractDeclaration;
use crate::locator::{locate_exits, stmt_at_mut, ExitKind};
use crate::toggle::agreement_enabled;

// ============================================================================
// Weaver Configuration
// ============================================================================

/// Configuration for contract weaving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaverConfig {
    /// Emit requirement and ensure checks. Loop invariants are not affected.
    pub instrument_contracts: bool,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            instrument_contracts: true,
        }
    }
}

impl WeaverConfig {
    /// Snapshot of the process-wide toggle
    pub fn from_global() -> Self {
        Self {
            instrument_contracts: agreement_enabled(),
        }
    }

    /// Weave nothing; contracted functions keep their original bodies
    pub fn disabled() -> Self {
        Self {
            instrument_contracts: false,
        }
    }
}

// ============================================================================
// Weaver
// ============================================================================

pub struct Weaver {
    config: WeaverConfig,
}

impl Weaver {
    pub fn new(config: WeaverConfig) -> Self {
        Self { config }
    }

    /// A weaver reading the process-wide toggle now. The value is fixed for
    /// the lifetime of the weaver.
    pub fn from_global() -> Self {
        Self::new(WeaverConfig::from_global())
    }

    pub fn config(&self) -> &WeaverConfig {
        &self.config
    }

    /// Produce the instrumented version of a contracted function.
    ///
    /// With instrumentation on, the body starts with one requirement check
    /// per precondition and every exit value passes through the ensure checks
    /// before it leaves the function. With instrumentation off the function
    /// is returned untouched. Invariant annotations are left in place for
    /// [`expand_invariants`](crate::expand_invariants).
    pub fn weave(&self, decl: &ContractDeclaration) -> FunctionDecl {
        let name = decl.name();

        if !self.config.instrument_contracts {
            if decl.has_checks() {
                warn!(
                    function = %name,
                    requirements = decl.requirements.len(),
                    ensures = decl.ensures.len(),
                    "contract instrumentation disabled; function registered without checks"
                );
            }
            return decl.function.clone();
        }

        let mut body = decl.function.body.clone();
        let mut exits = 0;

        // Return statements are rewritten in place first; their paths are only
        // valid against the unmodified statement layout.
        if !decl.ensures.is_empty() {
            let checks = make_checks(CheckKind::Ensure, &decl.ensures, name);
            for exit in locate_exits(&body) {
                exits += 1;
                if exit.kind == ExitKind::FallThrough {
                    continue;
                }
                if let Some(stmt) = stmt_at_mut(&mut body, &exit.path) {
                    let value = exit.returned.unwrap_or_else(|| Expr::nil(stmt.span));
                    let span = value.span;
                    let ensured = ensured(value, &decl.return_alias, checks.clone());
                    stmt.kind = StmtKind::Return(Some(Expr::new(ensured, span)));
                }
            }

            let span = body.span;
            let value = Expr::new(ExprKind::Block(body), span);
            let ensured = ensured(value, &decl.return_alias, checks);
            body = Block::new(
                vec![Stmt::new(StmtKind::Expr(Expr::new(ensured, span)), span)],
                span,
            );
        }

        if !decl.requirements.is_empty() {
            let mut stmts: Vec<Stmt> = make_checks(CheckKind::Requirement, &decl.requirements, name)
                .into_iter()
                .map(|check| {
                    let span = check.clause.span;
                    Stmt::new(StmtKind::Check(check), span)
                })
                .collect();
            stmts.append(&mut body.stmts);
            body.stmts = stmts;
        }

        debug!(
            function = %name,
            requirements = decl.requirements.len(),
            ensures = decl.ensures.len(),
            exits,
            alias = %decl.return_alias,
            "contract woven"
        );

        FunctionDecl {
            body,
            ..decl.function.clone()
        }
    }
}

fn make_checks(kind: CheckKind, clauses: &[ContractClause], function: &SmolStr) -> Vec<Check> {
    clauses
        .iter()
        .map(|clause| Check {
            kind,
            clause: clause.clone(),
            function: function.clone(),
        })
        .collect()
}

fn ensured(value: Expr, alias: &SmolStr, checks: Vec<Check>) -> ExprKind {
    ExprKind::Ensured(Box::new(Postcondition {
        value,
        alias: alias.clone(),
        checks,
    }))
}
