//! Loop invariant injection.
//!
//! An `invariant(cond)` annotation becomes a check in front of the loop plus
//! a check on either side of each statement directly inside the loop body.
//! Adjacent statements therefore share two identical checks; both are kept.
//! Statements inside nested conditionals or loops get no checks of their own.
//! Injection ignores the instrumentation toggle.

use agreement_ast::{
    Block, Check, CheckKind, ContractClause, Expr, ExprKind, FunctionDecl, Postcondition, SmolStr,
    Stmt, StmtKind,
};
use tracing::debug;

use crate::ContractError;

/// Expand one annotation: returns the entry check followed by the loop with
/// its body instrumented.
pub fn inject_invariant(
    clause: &ContractClause,
    loop_stmt: &Stmt,
    function: &str,
) -> Result<Vec<Stmt>, ContractError> {
    let check = |span| {
        Stmt::new(
            StmtKind::Check(Check {
                kind: CheckKind::Invariant,
                clause: clause.clone(),
                function: SmolStr::new(function),
            }),
            span,
        )
    };

    let mut instrumented = loop_stmt.clone();
    let body = match &mut instrumented.kind {
        StmtKind::While { body, .. } | StmtKind::For { body, .. } => body,
        _ => {
            return Err(ContractError::InvariantWithoutLoop {
                span: loop_stmt.span,
            })
        }
    };

    let original = std::mem::take(&mut body.stmts);
    let statements = original.len();
    let mut stmts = Vec::with_capacity(statements * 3);
    for stmt in original {
        let span = stmt.span;
        stmts.push(check(span));
        stmts.push(stmt);
        stmts.push(check(span));
    }
    body.stmts = stmts;

    debug!(
        function,
        invariant = %clause.source,
        statements,
        checks = statements * 2 + 1,
        "loop invariant injected"
    );

    Ok(vec![check(clause.span), instrumented])
}

/// Replace every invariant annotation in a function, including those in
/// nested function definitions, which are attributed to the nested function.
pub fn expand_invariants(func: &FunctionDecl) -> Result<FunctionDecl, ContractError> {
    let body = expand_block(&func.body, &func.name.node)?;
    Ok(FunctionDecl {
        body,
        ..func.clone()
    })
}

fn expand_block(block: &Block, function: &SmolStr) -> Result<Block, ContractError> {
    let mut stmts = Vec::with_capacity(block.stmts.len());
    for stmt in &block.stmts {
        match &stmt.kind {
            // The annotated loop counts as one statement of the enclosing
            // block; annotations inside it are expanded afterwards.
            StmtKind::Invariant { clause, body } => {
                for injected in inject_invariant(clause, body, function)? {
                    stmts.push(expand_stmt(&injected, function)?);
                }
            }
            _ => stmts.push(expand_stmt(stmt, function)?),
        }
    }
    Ok(Block::new(stmts, block.span))
}

fn expand_stmt(stmt: &Stmt, function: &SmolStr) -> Result<Stmt, ContractError> {
    let kind = match &stmt.kind {
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => StmtKind::If {
            condition: condition.clone(),
            then_branch: expand_block(then_branch, function)?,
            else_branch: else_branch
                .as_ref()
                .map(|b| expand_block(b, function))
                .transpose()?,
        },
        StmtKind::While { condition, body } => StmtKind::While {
            condition: condition.clone(),
            body: expand_block(body, function)?,
        },
        StmtKind::For {
            var,
            iterable,
            body,
        } => StmtKind::For {
            var: var.clone(),
            iterable: iterable.clone(),
            body: expand_block(body, function)?,
        },
        StmtKind::Function(inner) => StmtKind::Function(expand_invariants(inner)?),
        StmtKind::Expr(expr) => StmtKind::Expr(expand_expr(expr, function)?),
        StmtKind::Return(Some(expr)) => StmtKind::Return(Some(expand_expr(expr, function)?)),
        StmtKind::Invariant { .. } => {
            // Only reachable when an annotation wraps another annotation
            return Err(ContractError::InvariantWithoutLoop { span: stmt.span });
        }
        other => other.clone(),
    };
    Ok(Stmt::new(kind, stmt.span))
}

/// Woven bodies carry statements inside `Block` and `Ensured` expressions
fn expand_expr(expr: &Expr, function: &SmolStr) -> Result<Expr, ContractError> {
    let kind = match &expr.kind {
        ExprKind::Block(block) => ExprKind::Block(expand_block(block, function)?),
        ExprKind::Ensured(post) => ExprKind::Ensured(Box::new(Postcondition {
            value: expand_expr(&post.value, function)?,
            alias: post.alias.clone(),
            checks: post.checks.clone(),
        })),
        other => other.clone(),
    };
    Ok(Expr::new(kind, expr.span))
}
