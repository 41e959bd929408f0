//! Finding every place a function body can hand a value back to its caller.
//!
//! The search is structural: it walks blocks, both branches of conditionals,
//! loop bodies and annotated loops, and reports each `return` statement it
//! finds in depth-first, left-to-right order, followed by the implicit exit
//! at the end of the body. Reachability is not considered, so a `return`
//! after another `return` is still an exit. Nested function definitions are
//! skipped since their returns belong to them.

use agreement_ast::{Block, Expr, Span, Stmt, StmtKind};

/// One step from a block down to a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The statement at this index of the current block
    Stmt(usize),
    /// The `then` block of a conditional
    Then,
    /// The `else` block of a conditional
    Else,
    /// The body of a `while` or `for` loop
    Body,
    /// The loop wrapped by an `invariant(...)` annotation
    Annotated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// An explicit `return` statement
    Return,
    /// Falling off the end of the body
    FallThrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitPoint {
    pub kind: ExitKind,
    /// Expression handed back, `None` for a bare `return` and for fall-through
    pub returned: Option<Expr>,
    /// Route from the function body to the `return` statement; empty for
    /// fall-through
    pub path: Vec<Step>,
    pub span: Span,
}

impl ExitPoint {
    pub fn is_fall_through(&self) -> bool {
        self.kind == ExitKind::FallThrough
    }
}

/// Collect the exit points of a function body.
///
/// The last entry is always the fall-through exit.
pub fn locate_exits(body: &Block) -> Vec<ExitPoint> {
    let mut exits = Vec::new();
    let mut path = Vec::new();
    collect_block(body, &mut path, &mut exits);

    exits.push(ExitPoint {
        kind: ExitKind::FallThrough,
        returned: None,
        path: Vec::new(),
        span: body.span,
    });
    exits
}

fn collect_block(block: &Block, path: &mut Vec<Step>, exits: &mut Vec<ExitPoint>) {
    for (i, stmt) in block.stmts.iter().enumerate() {
        path.push(Step::Stmt(i));
        collect_stmt(stmt, path, exits);
        path.pop();
    }
}

fn collect_stmt(stmt: &Stmt, path: &mut Vec<Step>, exits: &mut Vec<ExitPoint>) {
    match &stmt.kind {
        StmtKind::Return(value) => exits.push(ExitPoint {
            kind: ExitKind::Return,
            returned: value.clone(),
            path: path.clone(),
            span: stmt.span,
        }),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            path.push(Step::Then);
            collect_block(then_branch, path, exits);
            path.pop();
            if let Some(else_branch) = else_branch {
                path.push(Step::Else);
                collect_block(else_branch, path, exits);
                path.pop();
            }
        }
        StmtKind::While { body, .. } | StmtKind::For { body, .. } => {
            path.push(Step::Body);
            collect_block(body, path, exits);
            path.pop();
        }
        StmtKind::Invariant { body, .. } => {
            path.push(Step::Annotated);
            collect_stmt(body, path, exits);
            path.pop();
        }
        StmtKind::Function(_)
        | StmtKind::Expr(_)
        | StmtKind::Let { .. }
        | StmtKind::Assign { .. }
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Check(_) => {}
    }
}

/// Follow `path` from `block` to the statement it names.
pub fn stmt_at_mut<'a>(block: &'a mut Block, path: &[Step]) -> Option<&'a mut Stmt> {
    let (first, rest) = path.split_first()?;
    let Step::Stmt(index) = first else {
        return None;
    };
    let stmt = block.stmts.get_mut(*index)?;
    descend(stmt, rest)
}

fn descend<'a>(stmt: &'a mut Stmt, path: &[Step]) -> Option<&'a mut Stmt> {
    let Some((step, rest)) = path.split_first() else {
        return Some(stmt);
    };
    match (step, &mut stmt.kind) {
        (Step::Then, StmtKind::If { then_branch, .. }) => stmt_at_mut(then_branch, rest),
        (
            Step::Else,
            StmtKind::If {
                else_branch: Some(else_branch),
                ..
            },
        ) => stmt_at_mut(else_branch, rest),
        (Step::Body, StmtKind::While { body, .. } | StmtKind::For { body, .. }) => {
            stmt_at_mut(body, rest)
        }
        (Step::Annotated, StmtKind::Invariant { body, .. }) => descend(body, rest),
        _ => None,
    }
}
