//! Pretty printing for syntax trees.
//!
//! Renders functions, statements and expressions back into surface-like
//! text. Injected checks print as `check <keyword>(<source>)` and woven exit
//! values as a `with <alias> = <value> ... end` block, which makes the output
//! of the weaving passes easy to read and to snapshot.

use crate::*;

/// Pretty print a function declaration
pub fn pretty_print_function(func: &FunctionDecl) -> String {
    let mut out = String::new();
    let mut printer = PrettyPrinter::new(&mut out);
    printer.print_function(func);
    out
}

/// Pretty print a statement sequence at indentation zero
pub fn pretty_print_block(block: &Block) -> String {
    let mut out = String::new();
    let mut printer = PrettyPrinter::new(&mut out);
    printer.print_stmts(&block.stmts);
    out
}

/// Pretty print a single expression
pub fn pretty_print_expr(expr: &Expr) -> String {
    let mut out = String::new();
    let mut printer = PrettyPrinter::new(&mut out);
    printer.print_expr(expr);
    out
}

struct PrettyPrinter<'a> {
    out: &'a mut String,
    indent: usize,
}

impl<'a> PrettyPrinter<'a> {
    fn new(out: &'a mut String) -> Self {
        Self { out, indent: 0 }
    }

    fn indent(&mut self) {
        self.indent += 2;
    }

    fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(2);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push(' ');
        }
    }

    fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    fn print_function(&mut self, func: &FunctionDecl) {
        self.write_indent();
        self.write("fn ");
        self.write(&func.name.node);
        self.write("(");
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&param.node);
        }
        self.write(")");
        self.newline();
        self.print_body(&func.body.stmts);
        self.write_indent();
        self.write("end");
        self.newline();
    }

    fn print_body(&mut self, stmts: &[Stmt]) {
        self.indent();
        self.print_stmts(stmts);
        self.dedent();
    }

    fn print_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.print_stmt(stmt);
        }
    }

    fn print_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Function(func) => {
                self.print_function(func);
                return;
            }
            StmtKind::Invariant { clause, body } => {
                self.write_indent();
                self.write("invariant(");
                self.write(&clause.source);
                self.write(")");
                self.newline();
                self.print_stmt(body);
                return;
            }
            _ => {}
        }

        self.write_indent();
        match &stmt.kind {
            StmtKind::Expr(expr) => self.print_expr(expr),
            StmtKind::Let { name, value } => {
                self.write("let ");
                self.write(&name.node);
                self.write(" = ");
                self.print_expr(value);
            }
            StmtKind::Assign { target, value } => {
                self.print_expr(target);
                self.write(" = ");
                self.print_expr(value);
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.write("if ");
                self.print_expr(condition);
                self.newline();
                self.print_body(&then_branch.stmts);
                if let Some(else_branch) = else_branch {
                    self.write_indent();
                    self.write("else");
                    self.newline();
                    self.print_body(&else_branch.stmts);
                }
                self.write_indent();
                self.write("end");
            }
            StmtKind::While { condition, body } => {
                self.write("while ");
                self.print_expr(condition);
                self.newline();
                self.print_body(&body.stmts);
                self.write_indent();
                self.write("end");
            }
            StmtKind::For {
                var,
                iterable,
                body,
            } => {
                self.write("for ");
                self.write(&var.node);
                self.write(" in ");
                self.print_expr(iterable);
                self.newline();
                self.print_body(&body.stmts);
                self.write_indent();
                self.write("end");
            }
            StmtKind::Return(value) => {
                self.write("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.print_expr(value);
                }
            }
            StmtKind::Break => self.write("break"),
            StmtKind::Continue => self.write("continue"),
            StmtKind::Check(check) => self.print_check(check),
            StmtKind::Function(_) | StmtKind::Invariant { .. } => {}
        }
        self.newline();
    }

    fn print_check(&mut self, check: &Check) {
        self.write("check ");
        self.write(check.kind.keyword());
        self.write("(");
        self.write(&check.clause.source);
        self.write(")");
    }

    fn print_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Integer(s) | ExprKind::Float(s) | ExprKind::Ident(s) => self.write(s),
            ExprKind::String(s) => {
                self.write("\"");
                self.write(s);
                self.write("\"");
            }
            ExprKind::Atom(s) => {
                self.write(":");
                self.write(s);
            }
            ExprKind::Bool(b) => self.write(if *b { "true" } else { "false" }),
            ExprKind::Nil => self.write("nil"),
            ExprKind::Array(elements) => {
                self.write("[");
                self.print_comma_separated(elements);
                self.write("]");
            }
            ExprKind::Map(entries) => {
                self.write("{");
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.print_expr(key);
                    self.write(": ");
                    self.print_expr(value);
                }
                self.write("}");
            }
            ExprKind::Binary { op, left, right } => {
                self.print_expr(left);
                if matches!(op, BinaryOp::Range | BinaryOp::RangeExclusive) {
                    self.write(op.symbol());
                } else {
                    self.write(" ");
                    self.write(op.symbol());
                    self.write(" ");
                }
                self.print_expr(right);
            }
            ExprKind::Unary { op, operand } => {
                match op {
                    UnaryOp::Neg => self.write("-"),
                    UnaryOp::Not => self.write("not "),
                }
                self.print_expr(operand);
            }
            ExprKind::Index { object, index } => {
                self.print_expr(object);
                self.write("[");
                self.print_expr(index);
                self.write("]");
            }
            ExprKind::Call { func, args } => {
                self.print_expr(func);
                self.write("(");
                self.print_comma_separated(args);
                self.write(")");
            }
            ExprKind::Paren(inner) => {
                self.write("(");
                self.print_expr(inner);
                self.write(")");
            }
            ExprKind::Block(block) => {
                self.write("do");
                self.newline();
                self.print_body(&block.stmts);
                self.write_indent();
                self.write("end");
            }
            ExprKind::Ensured(post) => {
                self.write("with ");
                self.write(&post.alias);
                self.write(" = ");
                self.print_expr(&post.value);
                self.newline();
                self.indent();
                for check in &post.checks {
                    self.write_indent();
                    self.print_check(check);
                    self.newline();
                }
                self.dedent();
                self.write_indent();
                self.write("end");
            }
        }
    }

    fn print_comma_separated(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.print_expr(expr);
        }
    }
}
