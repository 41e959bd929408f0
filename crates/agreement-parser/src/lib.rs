//! Agreement Parser
//!
//! Recursive descent parser that produces an AST from the token stream.
//! Besides ordinary functions it understands `contract ... end` blocks and
//! `invariant(...)` loop annotations. The literal source text of every
//! contract clause is captured here, since violation reports quote it.

use agreement_ast::*;
use agreement_lexer::{Lexer, Token, TokenKind};
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of file - expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Unexpected character '{ch}' at position {span:?}")]
    UnexpectedCharacter { ch: char, span: Span },

    #[error("Invalid expression at position {span:?}: {hint}")]
    InvalidExpression { span: Span, hint: String },

    #[error("Invalid assignment target at position {span:?}: expected a name or an index expression")]
    InvalidAssignmentTarget { span: Span },

    #[error("Invariant annotation at position {span:?} must be followed by a while or for loop")]
    MisplacedInvariant { span: Span },

    #[error("Missing 'end' keyword for {construct} at position {span:?} - did you forget to close the block that started at {block_start:?}?")]
    MissingEnd {
        span: Span,
        construct: String,
        block_start: Span,
    },
}

impl ParseError {
    /// Source location of the error, when one is known
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedCharacter { span, .. }
            | ParseError::InvalidExpression { span, .. }
            | ParseError::InvalidAssignmentTarget { span }
            | ParseError::MisplacedInvariant { span }
            | ParseError::MissingEnd { span, .. } => Some(*span),
            ParseError::UnexpectedEof { .. } => None,
        }
    }
}

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Parser state
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    /// Open blocks (fn, contract, if, ...) for 'end' error reporting
    block_stack: Vec<(String, Span)>,
}

impl<'src> Parser<'src> {
    /// Create a new parser from source code
    pub fn new(source: &'src str) -> Self {
        let lexer = Lexer::new(source);
        let (tokens, lex_errors) = lexer.tokenize_filtered();

        let errors = lex_errors
            .into_iter()
            .map(|e| match e {
                agreement_lexer::LexerError::UnexpectedCharacter(pos, ch) => {
                    ParseError::UnexpectedCharacter {
                        ch,
                        span: Span::new(pos, pos + ch.len_utf8()),
                    }
                }
            })
            .collect();

        Self {
            source,
            tokens,
            pos: 0,
            errors,
            block_stack: Vec::new(),
        }
    }

    /// Parse the entire program
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let start = self.current_span();
        let mut items = Vec::new();

        self.skip_newlines();

        while !self.is_eof() {
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.errors.push(e);
                    self.recover_to_next_item();
                }
            }
            self.skip_newlines();
        }

        let end = self.previous_span();
        Ok(Program {
            items,
            span: start.merge(end),
        })
    }

    /// Get collected errors
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    // ========================================================================
    // Token Navigation
    // ========================================================================

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<&TokenKind> {
        self.current().map(|t| &t.kind)
    }

    fn current_span(&self) -> Span {
        self.current()
            .map(|t| t.span)
            .unwrap_or(Span::new(self.source.len(), self.source.len()))
    }

    fn current_token_text(&self) -> String {
        self.current_kind()
            .map(|k| format!("{}", k))
            .unwrap_or_else(|| "EOF".to_string())
    }

    fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens
                .get(self.pos - 1)
                .map(|t| t.span)
                .unwrap_or(Span::new(0, 0))
        } else {
            Span::new(0, 0)
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            self.pos += 1;
        }
    }

    /// Skip statement separators
    fn skip_newlines(&mut self) {
        while matches!(
            self.current_kind(),
            Some(TokenKind::Newline) | Some(TokenKind::Semi)
        ) {
            self.advance();
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    /// True where an optional trailing expression (`return [e]`) cannot start
    fn at_statement_end(&self) -> bool {
        matches!(
            self.current_kind(),
            None | Some(TokenKind::Newline)
                | Some(TokenKind::Semi)
                | Some(TokenKind::End)
                | Some(TokenKind::Else)
                | Some(TokenKind::Elsif)
        )
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.is_eof() {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current_token_text(),
                span: self.current_span(),
            }
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Span> {
        if self.check(&kind) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected(&format!("{}", kind)))
        }
    }

    /// Like `expect(End)` but reports which block is left open
    fn expect_end(&mut self) -> ParseResult<Span> {
        if self.check(&TokenKind::End) {
            return self.expect(TokenKind::End);
        }
        match self.block_stack.last().cloned() {
            Some((construct, block_start)) => Err(ParseError::MissingEnd {
                span: self.current_span(),
                construct,
                block_start,
            }),
            None => Err(self.unexpected("'end'")),
        }
    }

    fn recover_to_next_item(&mut self) {
        while !self.is_eof() {
            if matches!(
                self.current_kind(),
                Some(TokenKind::Fn | TokenKind::Contract)
            ) {
                break;
            }
            self.advance();
        }
    }

    /// Recover to the next statement boundary (newline, end, or branch keyword)
    fn recover_to_next_statement(&mut self) {
        while !self.is_eof() {
            match self.current_kind() {
                Some(TokenKind::Newline) => {
                    self.advance();
                    break;
                }
                Some(TokenKind::End) | Some(TokenKind::Elsif) | Some(TokenKind::Else) => {
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn push_block(&mut self, construct: &str, span: Span) {
        self.block_stack.push((construct.to_string(), span));
    }

    fn pop_block(&mut self) {
        self.block_stack.pop();
    }

    // ========================================================================
    // Item Parsing
    // ========================================================================

    fn parse_item(&mut self) -> ParseResult<Item> {
        match self.current_kind() {
            Some(TokenKind::Fn) => self.parse_function().map(Item::Function),
            Some(TokenKind::Contract) => self.parse_contract_block().map(Item::Contract),
            _ => Err(self.unexpected("'fn' or 'contract'")),
        }
    }

    // ========================================================================
    // Function Parsing
    // ========================================================================

    fn parse_function(&mut self) -> ParseResult<FunctionDecl> {
        let start = self.current_span();
        self.expect(TokenKind::Fn)?;

        let name = self.parse_identifier()?;

        self.expect(TokenKind::LParen)?;
        let params = self.parse_param_list()?;
        self.expect(TokenKind::RParen)?;

        self.push_block("function", start);
        let body = self.parse_block_with_tracking();
        self.pop_block();
        let body = body?;

        let end = self.previous_span();

        Ok(FunctionDecl {
            name,
            params,
            body,
            span: start.merge(end),
        })
    }

    fn parse_param_list(&mut self) -> ParseResult<Vec<Ident>> {
        let mut params = Vec::new();
        self.skip_newlines();

        if !self.check(&TokenKind::RParen) {
            params.push(self.parse_identifier()?);

            while self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
                if self.check(&TokenKind::RParen) {
                    break;
                }
                params.push(self.parse_identifier()?);
            }
        }
        self.skip_newlines();

        Ok(params)
    }

    // ========================================================================
    // Contract Parsing
    // ========================================================================

    /// `contract` followed by requires, ensures, an optional alias assignment
    /// and the function definition, closed by `end`. Items are kept in
    /// source order; their structure is validated later.
    fn parse_contract_block(&mut self) -> ParseResult<ContractBlock> {
        let start = self.current_span();
        self.expect(TokenKind::Contract)?;
        self.push_block("contract", start);

        let mut items = Vec::new();
        self.skip_newlines();

        let result = loop {
            if self.check(&TokenKind::End) || self.is_eof() {
                break self.expect_end();
            }
            let item = match self.current_kind() {
                Some(TokenKind::Require) => {
                    self.advance();
                    self.parse_clause_list().map(ContractItem::Require)
                }
                Some(TokenKind::Ensure) => {
                    self.advance();
                    self.parse_clause_list().map(ContractItem::Ensure)
                }
                _ => self.parse_statement().map(ContractItem::Stmt),
            };
            match item {
                Ok(item) => items.push(item),
                Err(e) => break Err(e),
            }
            self.skip_newlines();
        };
        self.pop_block();
        result?;

        let end = self.previous_span();
        Ok(ContractBlock {
            items,
            span: start.merge(end),
        })
    }

    /// `( expr, expr, ... )`; may be empty and may span lines
    fn parse_clause_list(&mut self) -> ParseResult<ClauseList> {
        let start = self.current_span();
        self.expect(TokenKind::LParen)?;
        self.skip_newlines();

        let mut clauses = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_eof() {
            clauses.push(self.parse_contract_clause()?);
            self.skip_newlines();
            if self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
            } else {
                break;
            }
        }

        self.expect(TokenKind::RParen)?;
        let end = self.previous_span();

        Ok(ClauseList {
            clauses,
            span: start.merge(end),
        })
    }

    fn parse_contract_clause(&mut self) -> ParseResult<ContractClause> {
        let condition = self.parse_expression()?;
        let source = condition.span.text(self.source);
        Ok(ContractClause::new(condition, source))
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Parse statements up to `end`, recording statement errors and carrying on
    fn parse_block_with_tracking(&mut self) -> ParseResult<Block> {
        let start = self.current_span();
        let mut stmts = Vec::new();

        self.skip_newlines();

        while !self.check(&TokenKind::End) && !self.is_eof() {
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.recover_to_next_statement();
                }
            }
            self.skip_newlines();
        }

        self.expect_end()?;
        let end = self.previous_span();

        Ok(Block {
            stmts,
            span: start.merge(end),
        })
    }

    /// Parse statements of one `if` branch, stopping at `elsif`/`else`/`end`
    fn parse_branch_body(&mut self) -> ParseResult<Block> {
        let start = self.current_span();
        let mut stmts = Vec::new();
        self.skip_newlines();

        while !self.check(&TokenKind::End)
            && !self.check(&TokenKind::Elsif)
            && !self.check(&TokenKind::Else)
            && !self.is_eof()
        {
            stmts.push(self.parse_statement()?);
            self.skip_newlines();
        }

        let end = self.previous_span();
        Ok(Block {
            stmts,
            span: start.merge(end),
        })
    }

    // ========================================================================
    // Statement Parsing
    // ========================================================================

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();

        let kind = match self.current_kind() {
            Some(TokenKind::Let) => {
                self.advance();
                let name = self.parse_identifier()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expression()?;
                StmtKind::Let { name, value }
            }
            Some(TokenKind::Return) => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                StmtKind::Return(value)
            }
            Some(TokenKind::Break) => {
                self.advance();
                StmtKind::Break
            }
            Some(TokenKind::Continue) => {
                self.advance();
                StmtKind::Continue
            }
            Some(TokenKind::Fn) => StmtKind::Function(self.parse_function()?),
            Some(TokenKind::For) => self.parse_for_stmt()?,
            Some(TokenKind::While) => self.parse_while_stmt()?,
            Some(TokenKind::If) => {
                self.push_block("if", start);
                let stmt = self.parse_if_stmt();
                self.pop_block();
                stmt?
            }
            Some(TokenKind::Invariant) => self.parse_invariant()?,
            _ => {
                let expr = self.parse_expression()?;
                if self.check(&TokenKind::Eq) {
                    if !matches!(expr.kind, ExprKind::Ident(_) | ExprKind::Index { .. }) {
                        return Err(ParseError::InvalidAssignmentTarget { span: expr.span });
                    }
                    self.advance();
                    let value = self.parse_expression()?;
                    StmtKind::Assign {
                        target: expr,
                        value,
                    }
                } else {
                    StmtKind::Expr(expr)
                }
            }
        };

        let end = self.previous_span();
        Ok(Stmt {
            kind,
            span: start.merge(end),
        })
    }

    fn parse_for_stmt(&mut self) -> ParseResult<StmtKind> {
        let start = self.expect(TokenKind::For)?;
        let var = self.parse_identifier()?;
        self.expect(TokenKind::In)?;
        let iterable = self.parse_expression()?;

        self.push_block("for loop", start);
        let body = self.parse_block_with_tracking();
        self.pop_block();

        Ok(StmtKind::For {
            var,
            iterable,
            body: body?,
        })
    }

    fn parse_while_stmt(&mut self) -> ParseResult<StmtKind> {
        let start = self.expect(TokenKind::While)?;
        let condition = self.parse_expression()?;

        self.push_block("while loop", start);
        let body = self.parse_block_with_tracking();
        self.pop_block();

        Ok(StmtKind::While {
            condition,
            body: body?,
        })
    }

    /// `if`/`elsif`/`else` chain; each `elsif` becomes an `if` nested in the
    /// previous else branch, so the whole chain shares one `end`.
    fn parse_if_stmt(&mut self) -> ParseResult<StmtKind> {
        self.advance(); // 'if' or 'elsif'
        let condition = self.parse_expression()?;
        let then_branch = self.parse_branch_body()?;

        let else_branch = match self.current_kind() {
            Some(TokenKind::Elsif) => {
                let start = self.current_span();
                let nested = self.parse_if_stmt()?;
                let span = start.merge(self.previous_span());
                return Ok(StmtKind::If {
                    condition,
                    then_branch,
                    else_branch: Some(Block::new(vec![Stmt::new(nested, span)], span)),
                });
            }
            Some(TokenKind::Else) => {
                self.advance();
                Some(self.parse_branch_body()?)
            }
            _ => None,
        };

        self.expect_end()?;

        Ok(StmtKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `invariant(expr)` followed by the loop it annotates
    fn parse_invariant(&mut self) -> ParseResult<StmtKind> {
        let start = self.expect(TokenKind::Invariant)?;
        self.expect(TokenKind::LParen)?;
        self.skip_newlines();
        let clause = self.parse_contract_clause()?;
        self.skip_newlines();
        self.expect(TokenKind::RParen)?;
        let annotation = start.merge(self.previous_span());

        self.skip_newlines();
        if !matches!(
            self.current_kind(),
            Some(TokenKind::While) | Some(TokenKind::For)
        ) {
            return Err(ParseError::MisplacedInvariant { span: annotation });
        }

        let body = self.parse_statement()?;
        Ok(StmtKind::Invariant {
            clause,
            body: Box::new(body),
        })
    }

    // ========================================================================
    // Expression Parsing
    // ========================================================================

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    /// One left-associative precedence level: operands come from `operand`,
    /// `op_for` picks out the operators that bind at this level.
    fn left_assoc(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<Expr>,
        op_for: fn(&TokenKind) -> Option<BinaryOp>,
    ) -> ParseResult<Expr> {
        let mut left = operand(self)?;
        while let Some(op) = self.current_kind().and_then(op_for) {
            self.advance();
            let right = operand(self)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        self.left_assoc(Self::parse_and, |kind| match kind {
            TokenKind::Or | TokenKind::PipePipe => Some(BinaryOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        self.left_assoc(Self::parse_comparison, |kind| match kind {
            TokenKind::And | TokenKind::AmpAmp => Some(BinaryOp::And),
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        self.left_assoc(Self::parse_range, |kind| {
            Some(match kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => return None,
            })
        })
    }

    /// Ranges do not chain: `a..b..c` is rejected
    fn parse_range(&mut self) -> ParseResult<Expr> {
        let left = self.parse_sum()?;

        let op = match self.current_kind() {
            Some(TokenKind::DotDot) => BinaryOp::RangeExclusive,
            Some(TokenKind::DotDotEq) => BinaryOp::Range,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_sum()?;

        if matches!(
            self.current_kind(),
            Some(TokenKind::DotDot) | Some(TokenKind::DotDotEq)
        ) {
            return Err(ParseError::InvalidExpression {
                span: self.current_span(),
                hint: "ranges cannot be chained".to_string(),
            });
        }

        Ok(binary(op, left, right))
    }

    fn parse_sum(&mut self) -> ParseResult<Expr> {
        self.left_assoc(Self::parse_term, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        self.left_assoc(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();

        let op = match self.current_kind() {
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Not) | Some(TokenKind::Bang) => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };

        self.advance();
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current_kind() {
                Some(TokenKind::LBracket) => {
                    self.advance();
                    self.skip_newlines();
                    let index = self.parse_expression()?;
                    self.skip_newlines();
                    self.expect(TokenKind::RBracket)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                Some(TokenKind::LParen) => {
                    self.advance();
                    let args = self.parse_arg_list(TokenKind::RParen)?;
                    self.expect(TokenKind::RParen)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            func: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();

        match self.current_kind().cloned() {
            Some(TokenKind::Integer(s)) => {
                self.advance();
                Ok(Expr::new(ExprKind::Integer(s), start))
            }
            Some(TokenKind::Float(s)) => {
                self.advance();
                Ok(Expr::new(ExprKind::Float(s), start))
            }
            Some(TokenKind::String(s)) => {
                self.advance();
                // Strip the surrounding quotes from the string
                let content = if s.len() >= 2 {
                    SmolStr::new(&s[1..s.len() - 1])
                } else {
                    s
                };
                Ok(Expr::new(ExprKind::String(content), start))
            }
            Some(TokenKind::Atom(s)) => {
                self.advance();
                Ok(Expr::new(ExprKind::Atom(s), start))
            }
            Some(TokenKind::True) => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(true), start))
            }
            Some(TokenKind::False) => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(false), start))
            }
            Some(TokenKind::Nil) => {
                self.advance();
                Ok(Expr::new(ExprKind::Nil, start))
            }
            Some(TokenKind::Identifier(s)) => {
                self.advance();
                Ok(Expr::new(ExprKind::Ident(s), start))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(TokenKind::RParen)?;
                let span = start.merge(self.previous_span());
                Ok(Expr::new(ExprKind::Paren(Box::new(inner)), span))
            }
            Some(TokenKind::LBracket) => {
                self.advance();
                let elements = self.parse_arg_list(TokenKind::RBracket)?;
                self.expect(TokenKind::RBracket)?;
                let span = start.merge(self.previous_span());
                Ok(Expr::new(ExprKind::Array(elements), span))
            }
            Some(TokenKind::LBrace) => {
                self.advance();
                let entries = self.parse_map_entries()?;
                self.expect(TokenKind::RBrace)?;
                let span = start.merge(self.previous_span());
                Ok(Expr::new(ExprKind::Map(entries), span))
            }
            Some(_) => Err(ParseError::InvalidExpression {
                span: start,
                hint: format!("{} cannot start an expression", self.current_token_text()),
            }),
            None => Err(ParseError::UnexpectedEof {
                expected: "expression".to_string(),
            }),
        }
    }

    /// Comma separated expressions up to (not including) `close`
    fn parse_arg_list(&mut self, close: TokenKind) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        self.skip_newlines();
        if !self.check(&close) {
            args.push(self.parse_expression()?);
            self.skip_newlines();
            while self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
                if self.check(&close) {
                    break;
                }
                args.push(self.parse_expression()?);
                self.skip_newlines();
            }
        }
        Ok(args)
    }

    fn parse_map_entries(&mut self) -> ParseResult<Vec<(Expr, Expr)>> {
        let mut entries = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            let key = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            self.skip_newlines();
            let value = self.parse_expression()?;
            entries.push((key, value));
            self.skip_newlines();
            if self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
            } else {
                break;
            }
        }
        Ok(entries)
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    fn parse_identifier(&mut self) -> ParseResult<Ident> {
        let span = self.current_span();
        match self.current_kind().cloned() {
            Some(TokenKind::Identifier(s)) => {
                self.advance();
                Ok(Spanned::new(s, span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

/// Convenience function to parse a string into a Program
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(source);
    let program = parser.parse_program().unwrap_or_else(|_e| Program {
        items: Vec::new(),
        span: Span::new(0, source.len()),
    });
    (program, parser.errors().to_vec())
}

/// Parse a single expression, e.g. a contract condition given on its own
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(source);
    if let Some(e) = parser.errors.first() {
        return Err(e.clone());
    }
    parser.skip_newlines();
    let expr = parser.parse_expression()?;
    parser.skip_newlines();
    if !parser.is_eof() {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> Program {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "Errors: {:?}", errors);
        program
    }

    fn first_function(program: &Program) -> &FunctionDecl {
        match &program.items[0] {
            Item::Function(f) => f,
            other => panic!("Expected function, got {:?}", other),
        }
    }

    fn first_contract(program: &Program) -> &ContractBlock {
        match &program.items[0] {
            Item::Contract(c) => c,
            other => panic!("Expected contract, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_function() {
        let source = r#"fn add(a, b)
  a + b
end"#;
        let program = parse_ok(source);
        assert_eq!(program.items.len(), 1);
        let f = first_function(&program);
        assert_eq!(f.name.node, "add");
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.body.stmts.len(), 1);
    }

    #[test]
    fn test_parse_contract_block() {
        let source = r#"contract
  require(length(dict) < 2, length(key) > 0)
  ensure(length(result) > length(dict))
  fn put_entry(dict, key, value)
    put(dict, key, value)
  end
end"#;
        let program = parse_ok(source);
        let contract = first_contract(&program);
        assert_eq!(contract.items.len(), 3);

        match &contract.items[0] {
            ContractItem::Require(list) => {
                let sources: Vec<&str> = list.clauses.iter().map(|c| c.source.as_str()).collect();
                assert_eq!(sources, vec!["length(dict) < 2", "length(key) > 0"]);
            }
            other => panic!("Expected require, got {:?}", other),
        }
        match &contract.items[1] {
            ContractItem::Ensure(list) => {
                assert_eq!(list.clauses[0].source, "length(result) > length(dict)");
            }
            other => panic!("Expected ensure, got {:?}", other),
        }
        assert!(matches!(
            &contract.items[2],
            ContractItem::Stmt(Stmt {
                kind: StmtKind::Function(_),
                ..
            })
        ));
    }

    #[test]
    fn test_clause_source_keeps_parentheses_and_spacing() {
        let source = "contract\n  require((a  +  b) > 0)\n  fn f(a, b)\n    a\n  end\nend";
        let program = parse_ok(source);
        let contract = first_contract(&program);
        match &contract.items[0] {
            ContractItem::Require(list) => assert_eq!(list.clauses[0].source, "(a  +  b) > 0"),
            other => panic!("Expected require, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_alias_assignment_and_empty_list() {
        let source = r#"contract
  ensure()
  result = out
  fn f()
    1
  end
end"#;
        let program = parse_ok(source);
        let contract = first_contract(&program);
        match &contract.items[0] {
            ContractItem::Ensure(list) => assert!(list.clauses.is_empty()),
            other => panic!("Expected ensure, got {:?}", other),
        }
        match &contract.items[1] {
            ContractItem::Stmt(Stmt {
                kind: StmtKind::Assign { target, value },
                ..
            }) => {
                assert_eq!(target.kind, ExprKind::Ident(SmolStr::new("result")));
                assert_eq!(value.kind, ExprKind::Ident(SmolStr::new("out")));
            }
            other => panic!("Expected alias assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_multiline_clause_list() {
        let source = r#"contract
  require(
    x > 0,
    y > 0,
  )
  fn f(x, y)
    x
  end
end"#;
        let program = parse_ok(source);
        let contract = first_contract(&program);
        match &contract.items[0] {
            ContractItem::Require(list) => assert_eq!(list.clauses.len(), 2),
            other => panic!("Expected require, got {:?}", other),
        }
    }

    #[test]
    fn test_elsif_nests_in_else_branch() {
        let source = r#"fn classify(n)
  if n < 0
    return :negative
  elsif n == 0
    return :zero
  else
    return :positive
  end
end"#;
        let program = parse_ok(source);
        let f = first_function(&program);
        let StmtKind::If { else_branch, .. } = &f.body.stmts[0].kind else {
            panic!("Expected if");
        };
        let else_branch = else_branch.as_ref().expect("else branch");
        assert_eq!(else_branch.stmts.len(), 1);
        let StmtKind::If {
            else_branch: inner_else,
            ..
        } = &else_branch.stmts[0].kind
        else {
            panic!("Expected nested if");
        };
        assert!(inner_else.is_some());
    }

    #[test]
    fn test_parse_invariant_annotation() {
        let source = r#"fn total(xs)
  let acc = 0
  invariant(acc >= 0)
  for x in xs
    acc = acc + x
  end
  acc
end"#;
        let program = parse_ok(source);
        let f = first_function(&program);
        assert_eq!(f.body.stmts.len(), 3);
        let StmtKind::Invariant { clause, body } = &f.body.stmts[1].kind else {
            panic!("Expected invariant annotation");
        };
        assert_eq!(clause.source, "acc >= 0");
        assert!(body.is_loop());
    }

    #[test]
    fn test_invariant_must_precede_loop() {
        let source = r#"fn f(x)
  invariant(x > 0)
  x = x + 1
end"#;
        let (_, errors) = parse(source);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ParseError::MisplacedInvariant { .. })));
    }

    #[test]
    fn test_parse_index_assignment() {
        let source = r#"fn f(arr)
  arr[0] = 5
end"#;
        let program = parse_ok(source);
        let f = first_function(&program);
        assert!(matches!(
            &f.body.stmts[0].kind,
            StmtKind::Assign {
                target: Expr {
                    kind: ExprKind::Index { .. },
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let source = r#"fn f(x)
  x + 1 = 2
end"#;
        let (_, errors) = parse(source);
        assert!(matches!(
            errors.first(),
            Some(ParseError::InvalidAssignmentTarget { .. })
        ));
    }

    #[test]
    fn test_return_without_value() {
        let source = r#"fn f(x)
  if x
    return
  end
  return x
end"#;
        let program = parse_ok(source);
        let f = first_function(&program);
        let StmtKind::If { then_branch, .. } = &f.body.stmts[0].kind else {
            panic!("Expected if");
        };
        assert_eq!(then_branch.stmts[0].kind, StmtKind::Return(None));
        assert!(matches!(f.body.stmts[1].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn test_nested_function_statement() {
        let source = r#"fn outer(x)
  fn inner(y)
    y * 2
  end
  inner(x)
end"#;
        let program = parse_ok(source);
        let f = first_function(&program);
        assert!(matches!(f.body.stmts[0].kind, StmtKind::Function(_)));
    }

    #[test]
    fn test_operator_precedence() {
        let expr = parse_expression("1 + 2 * 3 < 10 and not done").unwrap();
        let ExprKind::Binary { op, left, .. } = &expr.kind else {
            panic!("Expected binary");
        };
        assert_eq!(*op, BinaryOp::And);
        let ExprKind::Binary { op, left, .. } = &left.kind else {
            panic!("Expected comparison");
        };
        assert_eq!(*op, BinaryOp::Lt);
        let ExprKind::Binary { op, right, .. } = &left.kind else {
            panic!("Expected addition");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            right.kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_collections() {
        let expr = parse_expression(r#"{"a": [1, 2], :b: 3.5}"#).unwrap();
        let ExprKind::Map(entries) = &expr.kind else {
            panic!("Expected map");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0.kind, ExprKind::String(SmolStr::new("a")));
        assert!(matches!(&entries[0].1.kind, ExprKind::Array(items) if items.len() == 2));
        assert_eq!(entries[1].0.kind, ExprKind::Atom(SmolStr::new("b")));
    }

    #[test]
    fn test_parse_ranges() {
        let expr = parse_expression("0..=n").unwrap();
        assert!(matches!(
            expr.kind,
            ExprKind::Binary {
                op: BinaryOp::Range,
                ..
            }
        ));
        assert!(parse_expression("0..1..2").is_err());
    }

    #[test]
    fn test_missing_end_reports_open_block() {
        let source = "fn broken(x)\n  x + 1\n";
        let (_, errors) = parse(source);
        let unclosed_function = |e: &ParseError| {
            matches!(e, ParseError::MissingEnd { construct, .. } if construct == "function")
        };
        assert!(errors.iter().any(unclosed_function), "Errors: {:?}", errors);
    }

    #[test]
    fn test_unexpected_character_is_reported() {
        let (_, errors) = parse("fn f()\n  $\nend");
        assert!(matches!(
            errors.first(),
            Some(ParseError::UnexpectedCharacter { ch: '$', .. })
        ));
    }

    #[test]
    fn test_comments_are_ignored() {
        let source = r#"# leading comment
fn f(x) # trailing
  x # value
end"#;
        let program = parse_ok(source);
        assert_eq!(first_function(&program).body.stmts.len(), 1);
    }
}
