//! Recursive-descent parser for the block-diagram DSL.
//!
//! Top-level statements are handed out one at a time through
//! [`Parser::next_statement`] so that each can be evaluated before the next
//! one is read. Bodies of functions, branches and loops are parsed in full
//! when their statement is parsed.

use std::rc::Rc;

use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{EngineError, Result};

/// Outcome of trying to parse an optional list element.
#[derive(Debug)]
pub enum Attempt<T> {
    /// An element was parsed
    Parsed(T),
    /// The current token cannot start an element; nothing was consumed
    NoElement,
}

/// Parser for DSL programs.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peeked: Option<Token>,
    /// Set when the last top-level statement must be followed by a separator
    needs_separator: bool,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            peeked: None,
            needs_separator: false,
        })
    }

    /// Parse the next top-level statement, or `None` at the end of input.
    pub fn next_statement(&mut self) -> Result<Option<Stmt>> {
        let separated = self.skip_separators()?;
        if self.current.kind == TokenKind::Eof {
            return Ok(None);
        }
        if self.needs_separator && !separated {
            return Err(self.unexpected("a newline or ';'"));
        }
        let stmt = self.statement()?;
        self.needs_separator = !stmt.ends_with_block();
        Ok(Some(stmt))
    }

    /// Parse every remaining statement.
    pub fn parse_program(&mut self) -> Result<Vec<Stmt>> {
        let mut program = Vec::new();
        while let Some(stmt) = self.next_statement()? {
            program.push(stmt);
        }
        Ok(program)
    }

    // ---------------------------------------------------------------------
    // Token handling

    fn advance(&mut self) -> Result<Token> {
        let next = match self.peeked.take() {
            Some(tok) => tok,
            None => self.lexer.next_token()?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn peek_kind(&mut self) -> Result<TokenKind> {
        if let Some(tok) = &self.peeked {
            return Ok(tok.kind);
        }
        let tok = self.lexer.next_token()?;
        let kind = tok.kind;
        self.peeked = Some(tok);
        Ok(kind)
    }

    fn accept(&mut self, kind: TokenKind) -> Result<bool> {
        if self.current.kind == kind {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            self.advance()
        } else {
            Err(self.unexpected(kind.to_string()))
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> EngineError {
        EngineError::syntax(
            self.current.line,
            self.current.column,
            expected,
            self.current.to_string(),
        )
    }

    /// Skip newlines and semicolons; report whether any were skipped.
    fn skip_separators(&mut self) -> Result<bool> {
        let mut skipped = false;
        while self.current.kind.is_separator() {
            self.advance()?;
            skipped = true;
        }
        Ok(skipped)
    }

    // ---------------------------------------------------------------------
    // Statements

    /// Parse statements up to and including the closing brace.
    fn block_body(&mut self) -> Result<Body> {
        let mut stmts = Vec::new();
        let mut needs_separator = false;
        loop {
            let separated = self.skip_separators()?;
            match self.current.kind {
                TokenKind::CloseBrace => {
                    self.advance()?;
                    return Ok(stmts.into());
                }
                TokenKind::Eof => return Err(self.unexpected(TokenKind::CloseBrace.to_string())),
                _ => {}
            }
            if needs_separator && !separated {
                return Err(self.unexpected("a newline, ';' or '}'"));
            }
            let stmt = self.statement()?;
            needs_separator = !stmt.ends_with_block();
            stmts.push(stmt);
        }
    }

    fn statement(&mut self) -> Result<Stmt> {
        let kind = self.current.kind;
        match kind {
            TokenKind::Def => {
                self.advance()?;
                self.funcdef()
            }
            TokenKind::Return => {
                self.advance()?;
                if matches!(
                    self.current.kind,
                    TokenKind::Newline | TokenKind::Semicolon | TokenKind::CloseBrace | TokenKind::Eof
                ) {
                    Ok(Stmt::Return(None))
                } else {
                    Ok(Stmt::Return(Some(self.expr()?)))
                }
            }
            TokenKind::If => {
                self.advance()?;
                self.if_stmt()
            }
            TokenKind::While => {
                self.advance()?;
                self.while_stmt()
            }
            TokenKind::For => Err(EngineError::UnsupportedSyntax {
                line: self.current.line,
                feature: "'for' loop".to_string(),
            }),
            TokenKind::Name if self.peek_kind()? == TokenKind::Assign => {
                let name = self.advance()?.text;
                self.advance()?;
                let value = self.logic_expr()?;
                Ok(Stmt::Assign { name, value })
            }
            _ => Ok(Stmt::Expr(self.logic_expr()?)),
        }
    }

    /// `NAME "(" { NAME ","? }* ")" "{" code "}"`
    fn funcdef(&mut self) -> Result<Stmt> {
        let name = self.expect(TokenKind::Name)?.text;
        self.expect(TokenKind::OpenParen)?;
        let mut params = Vec::new();
        while self.current.kind == TokenKind::Name {
            params.push(self.advance()?.text);
            self.accept(TokenKind::Comma)?;
        }
        self.expect(TokenKind::CloseParen)?;
        self.skip_separators()?;
        self.expect(TokenKind::OpenBrace)?;
        let body = self.block_body()?;
        Ok(Stmt::Def(Rc::new(Fun::new(name, params, body))))
    }

    fn if_stmt(&mut self) -> Result<Stmt> {
        let mut branches = Vec::new();
        let mut otherwise = None;
        loop {
            let cond = self.logic_expr()?;
            self.skip_separators()?;
            self.expect(TokenKind::OpenBrace)?;
            let body = self.block_body()?;
            branches.push((cond, body));

            self.skip_separators()?;
            if !self.accept(TokenKind::Else)? {
                break;
            }
            self.skip_separators()?;
            if self.accept(TokenKind::If)? {
                continue;
            }
            self.expect(TokenKind::OpenBrace)?;
            otherwise = Some(self.block_body()?);
            break;
        }
        Ok(Stmt::If { branches, otherwise })
    }

    fn while_stmt(&mut self) -> Result<Stmt> {
        let cond = self.logic_expr()?;
        self.skip_separators()?;
        self.expect(TokenKind::OpenBrace)?;
        let body = self.block_body()?;
        Ok(Stmt::While { cond, body })
    }

    // ---------------------------------------------------------------------
    // Expressions

    fn logic_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.logic_term()?;
        while self.accept(TokenKind::Or)? {
            let rhs = self.logic_term()?;
            lhs = Expr::Logic {
                op: LogicOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn logic_term(&mut self) -> Result<Expr> {
        let mut lhs = self.condition()?;
        while self.accept(TokenKind::And)? {
            let rhs = self.condition()?;
            lhs = Expr::Logic {
                op: LogicOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// `["not"] expr [ relOp expr ]`
    fn condition(&mut self) -> Result<Expr> {
        let negate = self.accept(TokenKind::Not)?;
        let lhs = self.expr()?;
        let op = match self.current.kind {
            TokenKind::EqEq => Some(RelOp::Eq),
            TokenKind::NotEq => Some(RelOp::Ne),
            TokenKind::Greater => Some(RelOp::Gt),
            TokenKind::Less => Some(RelOp::Lt),
            TokenKind::GreaterEq => Some(RelOp::Ge),
            TokenKind::LessEq => Some(RelOp::Le),
            _ => None,
        };
        let cond = match op {
            Some(op) => {
                self.advance()?;
                let rhs = self.expr()?;
                Expr::Compare {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            }
            None => lhs,
        };
        Ok(if negate { Expr::Not(Box::new(cond)) } else { cond })
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::At => BinOp::Pipe,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn factor(&mut self) -> Result<Expr> {
        self.accept(TokenKind::Plus)?;
        let negate = self.accept(TokenKind::Minus)?;

        let expr = match self.current.kind {
            TokenKind::Number => {
                let tok = self.advance()?;
                let value: f64 = tok
                    .text
                    .parse()
                    .map_err(|_| EngineError::syntax(tok.line, tok.column, "a number", tok.to_string()))?;
                return Ok(Expr::Number(if negate { -value } else { value }));
            }
            TokenKind::OpenParen => {
                self.advance()?;
                let inner = self.logic_expr()?;
                self.expect(TokenKind::CloseParen)?;
                inner
            }
            TokenKind::OpenBracket => {
                self.advance()?;
                Expr::Array(self.element_list(TokenKind::CloseBracket)?)
            }
            TokenKind::Name => self.named()?,
            _ => return Err(self.unexpected("a number, '(', '[' or a name")),
        };

        Ok(if negate { Expr::Neg(Box::new(expr)) } else { expr })
    }

    /// `NAME` followed by any chain of `[index]`, `(args)` and `.in`/`.out`.
    fn named(&mut self) -> Result<Expr> {
        let mut expr = Expr::Name(self.expect(TokenKind::Name)?.text);
        loop {
            match self.current.kind {
                TokenKind::OpenBracket => {
                    self.advance()?;
                    let index = self.logic_expr()?;
                    self.expect(TokenKind::CloseBracket)?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::OpenParen => {
                    self.advance()?;
                    let args = self.element_list(TokenKind::CloseParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                TokenKind::Dot => {
                    self.advance()?;
                    let member = self.expect(TokenKind::Name)?;
                    let dir = PortDir::from_member(&member.text).ok_or_else(|| {
                        EngineError::syntax(member.line, member.column, "'in' or 'out'", member.to_string())
                    })?;
                    expr = Expr::Ports {
                        target: Box::new(expr),
                        dir,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Elements separated by optional commas, up to and including `close`.
    fn element_list(&mut self, close: TokenKind) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            match self.try_logic_expr()? {
                Attempt::Parsed(item) => items.push(item),
                Attempt::NoElement => {
                    if !(self.accept(TokenKind::Comma)? || self.accept(TokenKind::Newline)?) {
                        break;
                    }
                }
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    /// Parse a logic expression if the current token can start one.
    pub fn try_logic_expr(&mut self) -> Result<Attempt<Expr>> {
        let starts_expression = matches!(
            self.current.kind,
            TokenKind::Number
                | TokenKind::Name
                | TokenKind::OpenParen
                | TokenKind::OpenBracket
                | TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::Not
        );
        if starts_expression {
            Ok(Attempt::Parsed(self.logic_expr()?))
        } else {
            Ok(Attempt::NoElement)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::*;

    fn single_expr(input: &str) -> Expr {
        let mut program = parse(input).unwrap();
        assert_eq!(program.len(), 1);
        match program.remove(0) {
            Stmt::Expr(e) => e,
            other => panic!("expected expression, got {other:?}"),
        }
    }

    fn num(v: f64) -> Box<Expr> {
        Box::new(Expr::Number(v))
    }

    #[test]
    fn test_precedence() {
        let expr = single_expr("1 + 2 * 3");
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinOp::Add,
                lhs: num(1.0),
                rhs: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    lhs: num(2.0),
                    rhs: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_negative_literal_and_negation() {
        assert_eq!(single_expr("-3"), Expr::Number(-3.0));
        assert_eq!(
            single_expr("-(x)"),
            Expr::Neg(Box::new(Expr::Name("x".to_string())))
        );
        assert_eq!(single_expr("+4"), Expr::Number(4.0));
    }

    #[test]
    fn test_assignment_vs_equality() {
        let program = parse("x = 2\nx == 2").unwrap();
        assert!(matches!(&program[0], Stmt::Assign { name, .. } if name == "x"));
        assert!(matches!(&program[1], Stmt::Expr(Expr::Compare { op: RelOp::Eq, .. })));
    }

    #[test]
    fn test_lists_with_optional_commas() {
        let expr = single_expr("[1, 2 3,, [4]]");
        match expr {
            Expr::Array(items) => {
                assert_eq!(items.len(), 4);
                assert!(matches!(items[3], Expr::Array(_)));
            }
            other => panic!("expected array, got {other:?}"),
        }
        assert!(matches!(single_expr("f()"), Expr::Call { args, .. } if args.is_empty()));
    }

    #[test]
    fn test_postfix_chain() {
        let expr = single_expr("a.out[0]");
        match expr {
            Expr::Index { target, .. } => {
                assert!(matches!(*target, Expr::Ports { dir: PortDir::Out, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(single_expr("x[3][0](1)"), Expr::Call { .. }));
    }

    #[test]
    fn test_if_else_chain() {
        let program = parse("if x == y {\n a = 1\n} else if x > y {\n a = 2\n}\nelse { a = 3 }").unwrap();
        match &program[0] {
            Stmt::If { branches, otherwise } => {
                assert_eq!(branches.len(), 2);
                assert!(otherwise.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_def_followed_without_separator() {
        let program = parse("def avg(x, y) { (x + y) / 2 } avg(1, 2)").unwrap();
        assert_eq!(program.len(), 2);
        match &program[0] {
            Stmt::Def(fun) => {
                assert_eq!(fun.name, "avg");
                assert_eq!(fun.params, vec!["x", "y"]);
                assert_eq!(fun.body.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_separator_is_an_error() {
        let err = parse("1 2").unwrap_err();
        assert!(matches!(err, EngineError::SyntaxError { .. }));
    }

    #[test]
    fn test_syntax_error_names_tokens() {
        let err = parse("x = (1 + 2").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("expected ')'"), "{text}");
        assert!(text.contains("end of input"), "{text}");
    }

    #[test]
    fn test_for_is_reserved() {
        let err = parse("for i = 1 { }").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedSyntax { .. }));
    }

    #[test]
    fn test_bare_return() {
        let program = parse("def f() { return }").unwrap();
        match &program[0] {
            Stmt::Def(fun) => assert_eq!(&*fun.body, &[Stmt::Return(None)]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_try_parse_reports_no_element() {
        let mut parser = Parser::new(Lexer::new(")")).unwrap();
        assert!(matches!(parser.try_logic_expr().unwrap(), Attempt::NoElement));
    }
}
