//! Agreement Abstract Syntax Tree
//!
//! A single tree of tagged nodes represents both function bodies and the
//! boolean conditions of contracts. Trees are immutable once built: the
//! weaving passes in `agreement-contracts` produce new trees and clone check
//! conditions into every place they are injected, so no two checks share a
//! node.

// Re-export common types for use by other crates
pub use agreement_lexer::Span;
pub use smol_str::SmolStr;

use std::fmt;

pub mod pretty;

/// The identifier ensure expressions use for the returned value unless a
/// contract block reassigns it.
pub const DEFAULT_RETURN_ALIAS: &str = "result";

/// A spanned value - wraps any value with source location info
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self {
            node,
            span: Span::dummy(),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

/// Identifier (variable names, function names, parameters)
pub type Ident = Spanned<SmolStr>;

// ============================================================================
// Program Structure
// ============================================================================

/// A complete source file
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

/// Top-level declarations
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Function(FunctionDecl),
    Contract(ContractBlock),
}

// ============================================================================
// Functions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

// ============================================================================
// Contracts
// ============================================================================

/// A `contract ... end` block exactly as written: declarations in source
/// order, not yet validated. `agreement-contracts` normalizes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractBlock {
    pub items: Vec<ContractItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContractItem {
    /// `require(expr, expr, ...)`
    Require(ClauseList),
    /// `ensure(expr, expr, ...)`
    Ensure(ClauseList),
    /// Any other statement; the function definition and the return-alias
    /// assignment arrive here.
    Stmt(Stmt),
}

/// The parenthesized expression list of a `require`/`ensure` declaration.
/// May be empty at this stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseList {
    pub clauses: Vec<ContractClause>,
    pub span: Span,
}

/// A boolean condition paired with the literal text it was written as.
///
/// The text is captured by the parser; violation reports quote it verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractClause {
    pub condition: Box<Expr>,
    pub source: SmolStr,
    pub span: Span,
}

impl ContractClause {
    pub fn new(condition: Expr, source: impl Into<SmolStr>) -> Self {
        let span = condition.span;
        Self {
            condition: Box::new(condition),
            source: source.into(),
            span,
        }
    }
}

/// Which kind of contract a check enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    Requirement,
    Ensure,
    Invariant,
}

impl CheckKind {
    /// Capitalized name used in violation messages
    pub fn label(&self) -> &'static str {
        match self {
            CheckKind::Requirement => "Requirement",
            CheckKind::Ensure => "Ensure",
            CheckKind::Invariant => "Invariant",
        }
    }

    /// Keyword the clause is written with in source
    pub fn keyword(&self) -> &'static str {
        match self {
            CheckKind::Requirement => "require",
            CheckKind::Ensure => "ensure",
            CheckKind::Invariant => "invariant",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An injected runtime check: evaluate `clause`, and on `false` raise a
/// violation of `kind` attributed to `function`.
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub kind: CheckKind,
    pub clause: ContractClause,
    pub function: SmolStr,
}

/// A value on its way out of a function. `value` is evaluated first and bound
/// to `alias` in a scope only `checks` can see; the checks run in order and
/// the original value is produced if they all hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Postcondition {
    pub value: Expr,
    pub alias: SmolStr,
    pub checks: Vec<Check>,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// `nil` positioned at `span`; stands in for the value of a bare `return`.
    pub fn nil(span: Span) -> Self {
        Self::new(ExprKind::Nil, span)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // Literals
    Integer(SmolStr),
    Float(SmolStr),
    String(SmolStr),
    Atom(SmolStr),
    Bool(bool),
    Nil,

    // Identifiers
    Ident(SmolStr),

    // Collections
    Array(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),

    // Operators
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },

    // Function call
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },

    Paren(Box<Expr>),

    /// A statement sequence used as a value (the value of its last statement)
    Block(Block),

    /// Woven exit value with its ensure checks
    Ensured(Box<Postcondition>),
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Logical
    And,
    Or,

    // Ranges
    Range,
    RangeExclusive,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Range => "..=",
            BinaryOp::RangeExclusive => "..",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self.kind, StmtKind::While { .. } | StmtKind::For { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression statement
    Expr(Expr),

    /// Let binding: `let x = expr`
    Let { name: Ident, value: Expr },

    /// Assignment: `x = expr` or `x[i] = expr`
    Assign { target: Expr, value: Expr },

    /// Conditional; an `elsif` chain nests in `else_branch`
    If {
        condition: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },

    /// While loop
    While { condition: Expr, body: Block },

    /// For loop
    For {
        var: Ident,
        iterable: Expr,
        body: Block,
    },

    /// Return
    Return(Option<Expr>),

    Break,

    Continue,

    /// Nested function definition
    Function(FunctionDecl),

    /// `invariant(expr)` written immediately before a loop. `body` is that loop.
    Invariant {
        clause: ContractClause,
        body: Box<Stmt>,
    },

    /// Injected check
    Check(Check),
}
