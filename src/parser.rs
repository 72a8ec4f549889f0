//! Recursive-descent parser.

use tracing::debug;

use crate::ast::{Expr, Ident, Literal, Stmt};
use crate::diag::Diagnostic;
use crate::scanner::Scanner;
use crate::token::{LexErrorKind, Token, TokenKind};

/// Upper bound on parameters of a declaration and arguments of a call.
const MAX_CALL_ITEMS: usize = 255;

type ParseResult<T> = Result<T, Diagnostic>;

/// What a parse produced: the declarations that were recognised and the
/// diagnostics that were raised.  Parsing stops at the first failing
/// declaration, so the list holds at most one entry; it stays a list so
/// callers need no knowledge of that policy.
#[derive(Debug)]
pub struct ParseOutput {
    pub program: Vec<Stmt>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Statement nesting context, threaded through statement parsing to reject
/// misplaced `break`/`continue`/`return` at parse time.
#[derive(Debug, Clone, Copy, Default)]
struct StmtCtx {
    in_loop: bool,
    in_function: bool,
}

#[derive(Debug)]
pub struct Parser<'a> {
    file: &'a str,
    src: &'a str,
    scanner: Scanner<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    pub fn new(file: &'a str, source: &'a str) -> Parser<'a> {
        Parser {
            file,
            src: source,
            scanner: Scanner::new(source),
            // Nothing has been scanned yet; parse entry points advance first.
            current: Token {
                kind: TokenKind::Eof,
                start: 0,
                len: 0,
            },
        }
    }

    pub fn parse_program(mut self) -> ParseOutput {
        let mut program = Vec::new();
        let mut diagnostics = Vec::new();
        if let Err(diag) = self.parse_program_body(&mut program) {
            diagnostics.push(diag);
        }
        debug!(
            declarations = program.len(),
            diagnostics = diagnostics.len(),
            "parsed program"
        );
        ParseOutput {
            program,
            diagnostics,
        }
    }

    fn parse_program_body(&mut self, program: &mut Vec<Stmt>) -> ParseResult<()> {
        self.advance()?;
        let ctx = StmtCtx::default();
        while self.current.kind != TokenKind::Eof {
            program.push(self.declaration(ctx)?);
        }
        Ok(())
    }

    /// Parse a single expression spanning the whole input.
    pub fn parse_expression(mut self) -> ParseResult<Expr> {
        self.advance()?;
        let expr = self.expression()?;
        if self.current.kind != TokenKind::Eof {
            return Err(self.error_here("Expect end of expression."));
        }
        Ok(expr)
    }

    fn declaration(&mut self, ctx: StmtCtx) -> ParseResult<Stmt> {
        match self.current.kind {
            TokenKind::Var => self.var_decl(),
            TokenKind::Fun => self.fun_decl(),
            _ => self.statement(ctx),
        }
    }

    /// Current token is `var`.
    fn var_decl(&mut self) -> ParseResult<Stmt> {
        self.advance()?;
        let name = self.identifier("Expect variable name.")?;
        let init = if self.current.kind == TokenKind::Equal {
            self.advance()?;
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::VarDecl(name, init))
    }

    /// Current token is `fun`.  The body is parsed with a fresh context: a
    /// function boundary hides any enclosing loop.
    fn fun_decl(&mut self) -> ParseResult<Stmt> {
        self.advance()?;
        let name = self.identifier("Expect function name.")?;
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.")?;
        let mut params: Vec<Ident> = Vec::new();
        if self.current.kind != TokenKind::RightParen {
            loop {
                if params.len() >= MAX_CALL_ITEMS {
                    return Err(self.error_here("Cannot have more than 255 parameters."));
                }
                let param = self.identifier("Expect parameter name.")?;
                if params.iter().any(|p| p.name == param.name) {
                    return Err(self.error_at(param.token, "Duplicated parameter name"));
                }
                params.push(param);
                if self.current.kind != TokenKind::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        if self.current.kind != TokenKind::LeftBrace {
            return Err(self.error_here("Expect '{' before function body."));
        }
        let body = self.block(StmtCtx {
            in_loop: false,
            in_function: true,
        })?;
        Ok(Stmt::FunDecl(name, params, Box::new(body)))
    }

    fn statement(&mut self, ctx: StmtCtx) -> ParseResult<Stmt> {
        match self.current.kind {
            TokenKind::Print => {
                self.advance()?;
                let expr = Box::new(self.expression()?);
                self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
                Ok(Stmt::Print(expr))
            }
            TokenKind::LeftBrace => self.block(ctx),
            TokenKind::If => self.if_stmt(ctx),
            TokenKind::While => self.while_stmt(ctx),
            TokenKind::For => self.for_stmt(ctx),
            TokenKind::Break => {
                if !ctx.in_loop {
                    return Err(self.error_here("break must be inside a loop"));
                }
                self.advance()?;
                self.consume(TokenKind::Semicolon, "Expect ';' after 'break'.")?;
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                if !ctx.in_loop {
                    return Err(self.error_here("continue must be inside a loop"));
                }
                self.advance()?;
                self.consume(TokenKind::Semicolon, "Expect ';' after 'continue'.")?;
                Ok(Stmt::Continue)
            }
            TokenKind::Return => {
                if !ctx.in_function {
                    return Err(self.error_here("return must be inside a function"));
                }
                self.advance()?;
                let value = if self.current.kind == TokenKind::Semicolon {
                    None
                } else {
                    Some(Box::new(self.expression()?))
                };
                self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
                Ok(Stmt::Return(value))
            }
            _ => {
                let expr = Box::new(self.expression()?);
                self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Current token is `{`.
    fn block(&mut self, ctx: StmtCtx) -> ParseResult<Stmt> {
        self.advance()?;
        let mut stmts = Vec::new();
        while !matches!(self.current.kind, TokenKind::RightBrace | TokenKind::Eof) {
            stmts.push(self.declaration(ctx)?);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(Stmt::Block(stmts))
    }

    fn if_stmt(&mut self, ctx: StmtCtx) -> ParseResult<Stmt> {
        self.advance()?;
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let cond = Box::new(self.expression()?);
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement(ctx)?);
        let else_branch = if self.current.kind == TokenKind::Else {
            self.advance()?;
            Some(Box::new(self.statement(ctx)?))
        } else {
            None
        };
        Ok(Stmt::If(cond, then_branch, else_branch))
    }

    /// `while` is sugar for a loop without initializer or increment.
    fn while_stmt(&mut self, ctx: StmtCtx) -> ParseResult<Stmt> {
        self.advance()?;
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let cond = Box::new(self.expression()?);
        self.consume(TokenKind::RightParen, "Expect ')' after while condition.")?;
        let body = Box::new(self.statement(StmtCtx {
            in_loop: true,
            ..ctx
        })?);
        Ok(Stmt::For {
            init: None,
            cond: Some(cond),
            incr: None,
            body,
        })
    }

    /// `for` lowers to a block holding a single loop node, giving a `var`
    /// initializer its own scope.
    fn for_stmt(&mut self, ctx: StmtCtx) -> ParseResult<Stmt> {
        self.advance()?;
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;
        let init = match self.current.kind {
            TokenKind::Semicolon => {
                self.advance()?;
                None
            }
            TokenKind::Var => Some(Box::new(self.var_decl()?)),
            _ => {
                let expr = Box::new(self.expression()?);
                self.consume(TokenKind::Semicolon, "Expect ';' after loop initializer.")?;
                Some(Box::new(Stmt::Expr(expr)))
            }
        };
        let cond = if self.current.kind == TokenKind::Semicolon {
            None
        } else {
            Some(Box::new(self.expression()?))
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;
        let incr = if self.current.kind == TokenKind::RightParen {
            None
        } else {
            Some(Box::new(self.expression()?))
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;
        let body = Box::new(self.statement(StmtCtx {
            in_loop: true,
            ..ctx
        })?);
        Ok(Stmt::Block(vec![Stmt::For {
            init,
            cond,
            incr,
            body,
        }]))
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let lhs = self.logic_or()?;
        if self.current.kind == TokenKind::Equal {
            let equal = self.current;
            self.advance()?;
            let rhs = self.assignment()?;
            return match lhs {
                Expr::Identifier(name) => Ok(Expr::Assignment(name, Box::new(rhs))),
                _ => Err(self.error_at(
                    equal,
                    "Cannot assign value. Left side must be a variable",
                )),
            };
        }
        Ok(lhs)
    }

    fn logic_or(&mut self) -> ParseResult<Expr> {
        let lhs = self.logic_and()?;
        if self.current.kind == TokenKind::Or {
            self.advance()?;
            let rhs = self.logic_or()?;
            return Ok(Expr::LogicOr(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn logic_and(&mut self) -> ParseResult<Expr> {
        let lhs = self.equality()?;
        if self.current.kind == TokenKind::And {
            self.advance()?;
            let rhs = self.logic_and()?;
            return Ok(Expr::LogicAnd(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while matches!(
            self.current.kind,
            TokenKind::EqualEqual | TokenKind::BangEqual
        ) {
            let op = self.current;
            self.advance()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.comparison()?));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while matches!(
            self.current.kind,
            TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual
        ) {
            let op = self.current;
            self.advance()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.term()?));
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while matches!(self.current.kind, TokenKind::Plus | TokenKind::Minus) {
            let op = self.current;
            self.advance()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.factor()?));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while matches!(self.current.kind, TokenKind::Star | TokenKind::Slash) {
            let op = self.current;
            self.advance()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(self.unary()?));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        match self.current.kind {
            TokenKind::Bang | TokenKind::Minus => {
                let op = self.current;
                self.advance()?;
                Ok(Expr::Unary(op, Box::new(self.unary()?)))
            }
            _ => self.call(),
        }
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let expr = self.primary()?;
        if self.current.kind == TokenKind::LeftParen {
            let paren = self.current;
            self.advance()?;
            let mut args = Vec::new();
            if self.current.kind != TokenKind::RightParen {
                loop {
                    if args.len() >= MAX_CALL_ITEMS {
                        return Err(self.error_here("Cannot have more than 255 arguments."));
                    }
                    args.push(self.expression()?);
                    if self.current.kind != TokenKind::Comma {
                        break;
                    }
                    self.advance()?;
                }
            }
            self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
            return Ok(Expr::Call(paren, Box::new(expr), args));
        }
        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.current;
        match token.kind {
            TokenKind::Number => {
                let value = token
                    .lexeme(self.src)
                    .parse::<f64>()
                    .map_err(|_| self.error_at(token, "Invalid number literal."))?;
                self.advance()?;
                Ok(Expr::Literal(Literal::Number(value)))
            }
            TokenKind::Str => {
                let lexeme = token.lexeme(self.src);
                // Strip the surrounding quotes.
                let value = lexeme[1..lexeme.len() - 1].to_string();
                self.advance()?;
                Ok(Expr::Literal(Literal::Str(value)))
            }
            TokenKind::True => {
                self.advance()?;
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            TokenKind::False => {
                self.advance()?;
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            TokenKind::Nil => {
                self.advance()?;
                Ok(Expr::Literal(Literal::Nil))
            }
            TokenKind::Identifier => {
                let name = Ident {
                    name: token.lexeme(self.src).to_string(),
                    token,
                };
                self.advance()?;
                Ok(Expr::Identifier(name))
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
                Ok(Expr::Grouping(Box::new(inner)))
            }
            _ => Err(self.error_here("Expect expression.")),
        }
    }

    fn identifier(&mut self, message: &str) -> ParseResult<Ident> {
        if self.current.kind == TokenKind::Identifier {
            let ident = Ident {
                name: self.current.lexeme(self.src).to_string(),
                token: self.current,
            };
            self.advance()?;
            Ok(ident)
        } else {
            Err(self.error_here(message))
        }
    }

    fn advance(&mut self) -> ParseResult<()> {
        let token = self.scanner.advance();
        if let TokenKind::Error(kind) = token.kind {
            return Err(self.error_at(token, lex_message(kind)));
        }
        self.current = token;
        Ok(())
    }

    fn consume(&mut self, expected: TokenKind, message: &str) -> ParseResult<()> {
        if self.current.kind == expected {
            self.advance()
        } else {
            Err(self.error_here(message))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> Diagnostic {
        self.error_at(self.current, message)
    }

    fn error_at(&self, token: Token, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            file: self.file.to_string(),
            token,
            message: message.into(),
        }
    }
}

fn lex_message(kind: LexErrorKind) -> &'static str {
    match kind {
        LexErrorKind::InvalidToken => "Invalid token.",
        LexErrorKind::InvalidSingleLineString => "Invalid single-line string.",
        LexErrorKind::NumberMissingDecimal => "Missing digits after decimal point.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(input: &str) -> Expr {
        Parser::new("test", input)
            .parse_expression()
            .expect("parse error")
    }

    fn parse_prg(input: &str) -> Vec<Stmt> {
        let out = Parser::new("test", input).parse_program();
        assert!(
            out.diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            out.diagnostics
        );
        out.program
    }

    fn parse_err(input: &str) -> Diagnostic {
        let out = Parser::new("test", input).parse_program();
        out.diagnostics
            .into_iter()
            .next()
            .expect("expected a diagnostic")
    }

    fn number(expr: &Expr) -> f64 {
        match expr {
            Expr::Literal(Literal::Number(n)) => *n,
            e => panic!("not a number literal: {:?}", e),
        }
    }

    #[test]
    fn number_literal() {
        assert_eq!(number(&parse_expr("42")), 42.0);
        assert_eq!(number(&parse_expr("4.25")), 4.25);
    }

    #[test]
    fn string_literal_is_unquoted() {
        assert_eq!(
            parse_expr("\"hi\""),
            Expr::Literal(Literal::Str("hi".to_string()))
        );
    }

    #[test]
    fn keyword_literals() {
        assert_eq!(parse_expr("true"), Expr::Literal(Literal::Bool(true)));
        assert_eq!(parse_expr("false"), Expr::Literal(Literal::Bool(false)));
        assert_eq!(parse_expr("nil"), Expr::Literal(Literal::Nil));
    }

    #[test]
    fn unary_nesting() {
        match parse_expr("--42") {
            Expr::Unary(op, inner) => {
                assert_eq!(op.kind, TokenKind::Minus);
                assert!(matches!(*inner, Expr::Unary(..)));
            }
            e => panic!("unexpected expr: {:?}", e),
        }
    }

    #[test]
    fn subtraction_is_left_associative() {
        match parse_expr("1 - 2 - 3") {
            Expr::Binary(lhs, op, rhs) => {
                assert_eq!(op.kind, TokenKind::Minus);
                assert!(matches!(*lhs, Expr::Binary(..)));
                assert_eq!(number(&rhs), 3.0);
            }
            e => panic!("unexpected expr: {:?}", e),
        }
    }

    #[test]
    fn factors_have_precedence_over_terms() {
        match parse_expr("1 + 2 * 3") {
            Expr::Binary(lhs, op, rhs) => {
                assert_eq!(op.kind, TokenKind::Plus);
                assert_eq!(number(&lhs), 1.0);
                match *rhs {
                    Expr::Binary(_, op, _) => assert_eq!(op.kind, TokenKind::Star),
                    e => panic!("unexpected rhs: {:?}", e),
                }
            }
            e => panic!("unexpected expr: {:?}", e),
        }
    }

    #[test]
    fn comparison_binds_tighter_than_equality() {
        match parse_expr("1 < 2 == true") {
            Expr::Binary(lhs, op, _) => {
                assert_eq!(op.kind, TokenKind::EqualEqual);
                match *lhs {
                    Expr::Binary(_, op, _) => assert_eq!(op.kind, TokenKind::Less),
                    e => panic!("unexpected lhs: {:?}", e),
                }
            }
            e => panic!("unexpected expr: {:?}", e),
        }
    }

    #[test]
    fn grouping_overrides_precedence() {
        match parse_expr("(1 + 2) * 3") {
            Expr::Binary(lhs, op, _) => {
                assert_eq!(op.kind, TokenKind::Star);
                assert!(matches!(*lhs, Expr::Grouping(_)));
            }
            e => panic!("unexpected expr: {:?}", e),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        match parse_expr("a = b = 1") {
            Expr::Assignment(name, rhs) => {
                assert_eq!(name.name, "a");
                match *rhs {
                    Expr::Assignment(name, _) => assert_eq!(name.name, "b"),
                    e => panic!("unexpected rhs: {:?}", e),
                }
            }
            e => panic!("unexpected expr: {:?}", e),
        }
    }

    #[test]
    fn logic_or_is_right_associative() {
        match parse_expr("a or b or c") {
            Expr::LogicOr(lhs, rhs) => {
                assert!(matches!(*lhs, Expr::Identifier(_)));
                assert!(matches!(*rhs, Expr::LogicOr(..)));
            }
            e => panic!("unexpected expr: {:?}", e),
        }
    }

    #[test]
    fn logic_and_binds_tighter_than_or() {
        match parse_expr("a or b and c") {
            Expr::LogicOr(_, rhs) => assert!(matches!(*rhs, Expr::LogicAnd(..))),
            e => panic!("unexpected expr: {:?}", e),
        }
    }

    #[test]
    fn call_with_arguments() {
        match parse_expr("foo(1, false)") {
            Expr::Call(_, callee, args) => {
                assert!(matches!(*callee, Expr::Identifier(_)));
                assert_eq!(args.len(), 2);
            }
            e => panic!("unexpected expr: {:?}", e),
        }
    }

    #[test]
    fn bad_assignment_target() {
        let diag = parse_err("(1+a) = b;");
        assert_eq!(diag.message, "Cannot assign value. Left side must be a variable");
    }

    #[test]
    fn missing_right_paren() {
        let diag = parse_err("(1;");
        assert_eq!(diag.message, "Expect ')' after expression.");
    }

    #[test]
    fn expr_and_print_stmts() {
        let prg = parse_prg("1; print 2;");
        assert_eq!(prg.len(), 2);
        assert!(matches!(prg[0], Stmt::Expr(_)));
        assert!(matches!(prg[1], Stmt::Print(_)));
    }

    #[test]
    fn var_decl_with_and_without_initializer() {
        let prg = parse_prg("var foo; var bar = 2;");
        match &prg[0] {
            Stmt::VarDecl(name, init) => {
                assert_eq!(name.name, "foo");
                assert!(init.is_none());
            }
            s => panic!("unexpected stmt: {:?}", s),
        }
        match &prg[1] {
            Stmt::VarDecl(name, init) => {
                assert_eq!(name.name, "bar");
                assert!(init.is_some());
            }
            s => panic!("unexpected stmt: {:?}", s),
        }
    }

    #[test]
    fn block_with_declarations() {
        match &parse_prg("{ var a = 1; a; }")[0] {
            Stmt::Block(stmts) => assert_eq!(stmts.len(), 2),
            s => panic!("unexpected stmt: {:?}", s),
        }
    }

    #[test]
    fn else_binds_to_nearest_if() {
        let prg = parse_prg("if (true) if (false) 1; else 2;");
        match &prg[0] {
            Stmt::If(_, then_branch, else_branch) => {
                assert!(else_branch.is_none());
                assert!(matches!(**then_branch, Stmt::If(_, _, Some(_))));
            }
            s => panic!("unexpected stmt: {:?}", s),
        }
    }

    #[test]
    fn while_lowers_to_loop_node() {
        let prg = parse_prg("while (true) 1;");
        match &prg[0] {
            Stmt::For {
                init,
                cond,
                incr,
                body,
            } => {
                assert!(init.is_none());
                assert!(cond.is_some());
                assert!(incr.is_none());
                assert!(matches!(**body, Stmt::Expr(_)));
            }
            s => panic!("unexpected stmt: {:?}", s),
        }
    }

    #[test]
    fn for_lowers_to_block_wrapping_loop_node() {
        let prg = parse_prg("for (var i = 0; i < 3; i = i + 1) print i;");
        match &prg[0] {
            Stmt::Block(stmts) => match &stmts[..] {
                [Stmt::For {
                    init,
                    cond,
                    incr,
                    body: _,
                }] => {
                    assert!(matches!(init.as_deref(), Some(Stmt::VarDecl(..))));
                    assert!(cond.is_some());
                    assert!(incr.is_some());
                }
                s => panic!("unexpected block contents: {:?}", s),
            },
            s => panic!("unexpected stmt: {:?}", s),
        }
    }

    #[test]
    fn for_clauses_may_all_be_absent() {
        let prg = parse_prg("for (;;) break;");
        match &prg[0] {
            Stmt::Block(stmts) => match &stmts[..] {
                [Stmt::For {
                    init, cond, incr, ..
                }] => {
                    assert!(init.is_none());
                    assert!(cond.is_none());
                    assert!(incr.is_none());
                }
                s => panic!("unexpected block contents: {:?}", s),
            },
            s => panic!("unexpected stmt: {:?}", s),
        }
    }

    #[test]
    fn fun_decl_with_params() {
        let prg = parse_prg("fun add(x, y) { return x + y; }");
        match &prg[0] {
            Stmt::FunDecl(name, params, body) => {
                assert_eq!(name.name, "add");
                assert_eq!(params.len(), 2);
                assert!(matches!(**body, Stmt::Block(_)));
            }
            s => panic!("unexpected stmt: {:?}", s),
        }
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        assert_eq!(parse_err("break;").message, "break must be inside a loop");
    }

    #[test]
    fn continue_outside_loop_is_rejected() {
        assert_eq!(
            parse_err("continue;").message,
            "continue must be inside a loop"
        );
    }

    #[test]
    fn return_outside_function_is_rejected() {
        assert_eq!(
            parse_err("return 1;").message,
            "return must be inside a function"
        );
    }

    #[test]
    fn break_in_function_inside_loop_is_rejected() {
        // The function boundary hides the enclosing loop.
        assert_eq!(
            parse_err("while (true) { fun f() { break; } }").message,
            "break must be inside a loop"
        );
    }

    #[test]
    fn return_inside_loop_inside_function_is_accepted() {
        parse_prg("fun f() { while (true) { return 1; } }");
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        assert_eq!(
            parse_err("fun f(a, a) {}").message,
            "Duplicated parameter name"
        );
    }

    #[test]
    fn lexical_error_is_surfaced_as_diagnostic() {
        assert_eq!(parse_err("var x = 1.;").message, "Missing digits after decimal point.");
        assert_eq!(parse_err("print \"abc;").message, "Invalid single-line string.");
        assert_eq!(parse_err("@").message, "Invalid token.");
    }

    #[test]
    fn parsing_stops_at_first_error() {
        let out = Parser::new("test", "var 1; var 2;").parse_program();
        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.program.is_empty());
    }

    #[test]
    fn diagnostic_carries_the_offending_token() {
        let diag = parse_err("var x = ;");
        assert_eq!(diag.message, "Expect expression.");
        assert_eq!(diag.token.start, 8);
        assert_eq!(diag.file, "test");
    }
}
