//! Agreement Lexer
//!
//! Tokenizes the contract annotation surface: `contract ... end` blocks,
//! `require(...)` / `ensure(...)` declarations, `invariant(...)` loop
//! annotations and the small statement language function bodies are written in.
//! Token recognition is generated by `logos`.

use logos::Logos;
use smol_str::SmolStr;
use std::fmt;
use std::ops::Range;

/// Byte range into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Slice the text this span covers out of `source`.
    ///
    /// Returns an empty string when the span does not fall on valid
    /// boundaries of `source` (e.g. dummy spans on synthesized nodes).
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// All token types of the annotation surface
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+")] // Skip whitespace (but not newlines)
pub enum TokenKind {
    #[token("fn")]
    Fn,
    #[token("let")]
    Let,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("elsif")]
    Elsif,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("while")]
    While,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,
    #[token("end")]
    End,
    #[token("contract")]
    Contract,
    #[token("require")]
    Require,
    #[token("ensure")]
    Ensure,
    #[token("invariant")]
    Invariant,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // Comparison
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,

    // Logical (symbol forms)
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("!")]
    Bang,

    // Assignment
    #[token("=")]
    Eq,

    // Ranges
    #[token("..")]
    DotDot,
    #[token("..=")]
    DotDotEq,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,

    /// Integer literal
    #[regex(r"[0-9][0-9_]*", |lex| SmolStr::new(lex.slice()))]
    Integer(SmolStr),

    /// Float literal
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*(?:[eE][+-]?[0-9][0-9_]*)?", |lex| SmolStr::new(lex.slice()))]
    Float(SmolStr),

    /// String literal (double quotes), quotes included
    #[regex(r#""(?:[^"\\]|\\.)*""#, |lex| SmolStr::new(lex.slice()))]
    String(SmolStr),

    /// Atom literal such as `:blue`, colon excluded
    #[regex(r":[a-zA-Z_][a-zA-Z0-9_]*", |lex| SmolStr::new(&lex.slice()[1..]))]
    Atom(SmolStr),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| SmolStr::new(lex.slice()))]
    Identifier(SmolStr),

    /// Line comment
    #[regex(r"#[^\n]*", |lex| SmolStr::new(lex.slice()))]
    LineComment(SmolStr),

    /// Newline (statement separator)
    #[regex(r"\n|\r\n")]
    Newline,

    /// Unrecognised input
    Error,
}

impl TokenKind {
    /// Fixed source text of keywords, operators and delimiters.
    pub fn lexeme(&self) -> Option<&'static str> {
        use TokenKind::*;
        let text = match self {
            Fn => "fn",
            Let => "let",
            If => "if",
            Else => "else",
            Elsif => "elsif",
            For => "for",
            In => "in",
            While => "while",
            Break => "break",
            Continue => "continue",
            Return => "return",
            End => "end",
            Contract => "contract",
            Require => "require",
            Ensure => "ensure",
            Invariant => "invariant",
            True => "true",
            False => "false",
            Nil => "nil",
            And => "and",
            Or => "or",
            Not => "not",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            EqEq => "==",
            NotEq => "!=",
            Lt => "<",
            Gt => ">",
            LtEq => "<=",
            GtEq => ">=",
            AmpAmp => "&&",
            PipePipe => "||",
            Bang => "!",
            Eq => "=",
            DotDot => "..",
            DotDotEq => "..=",
            LParen => "(",
            RParen => ")",
            LBracket => "[",
            RBracket => "]",
            LBrace => "{",
            RBrace => "}",
            Comma => ",",
            Colon => ":",
            Semi => ";",
            Integer(_) | Float(_) | String(_) | Atom(_) | Identifier(_) | LineComment(_)
            | Newline | Error => return None,
        };
        Some(text)
    }

    pub fn is_keyword(&self) -> bool {
        self.lexeme()
            .is_some_and(|text| text.bytes().all(|b| b.is_ascii_lowercase()))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, TokenKind::LineComment(_))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.lexeme() {
            return f.write_str(text);
        }
        match self {
            TokenKind::Integer(s) => write!(f, "integer `{}`", s),
            TokenKind::Float(s) => write!(f, "float `{}`", s),
            TokenKind::String(s) => write!(f, "string {}", s),
            TokenKind::Atom(s) => write!(f, "atom `:{}`", s),
            TokenKind::Identifier(s) => write!(f, "identifier `{}`", s),
            TokenKind::LineComment(_) => f.write_str("comment"),
            TokenKind::Newline => f.write_str("newline"),
            _ => f.write_str("unknown token"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexerError {
    #[error("Unexpected character '{1}' at position {0}")]
    UnexpectedCharacter(usize, char),
}

/// Lexer for annotation source code
pub struct Lexer<'src> {
    source: &'src str,
    inner: logos::Lexer<'src, TokenKind>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            inner: TokenKind::lexer(source),
        }
    }

    /// Lex everything, keeping comments. Unrecognised input becomes an
    /// [`TokenKind::Error`] token plus a matching error entry.
    pub fn tokenize(self) -> (Vec<Token>, Vec<LexerError>) {
        let source = self.source;
        let mut errors = Vec::new();
        let tokens = self
            .inner
            .spanned()
            .map(|(result, range)| {
                let span = Span::from(range);
                let kind = result.unwrap_or_else(|()| {
                    let found = span.text(source).chars().next().unwrap_or('?');
                    errors.push(LexerError::UnexpectedCharacter(span.start, found));
                    TokenKind::Error
                });
                Token::new(kind, span)
            })
            .collect();
        (tokens, errors)
    }

    /// Same as [`Lexer::tokenize`] with comments dropped. Newlines stay,
    /// they separate statements.
    pub fn tokenize_filtered(self) -> (Vec<Token>, Vec<LexerError>) {
        let (mut tokens, errors) = self.tokenize();
        tokens.retain(|t| !t.kind.is_comment());
        (tokens, errors)
    }
}
