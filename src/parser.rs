//! Recursive-descent parser with panic-mode recovery.
//!
//! The grammar, lowest precedence first:
//!
//! ```text
//! assignment -> logical_or -> logical_and -> equality
//!            -> comparison -> term -> factor -> unary -> call -> primary
//! ```
//!
//! A failed declaration is recorded and the parser resynchronizes at the
//! next statement boundary, so one bad statement does not hide the rest.

use std::rc::Rc;

use crate::ast::{Expr, Stmt};
use crate::diag::{ErrorKind, KobyError};
use crate::token::{Literal, Token, TokenKind};

/// Past this many parameters or arguments the parser emits a warning.
const MAX_ARITY: usize = 255;

/// Statements and syntax diagnostics produced by one parse.
///
/// Warnings never make a parse unsuccessful; they are reported by the
/// driver and the statements stay usable.
#[derive(Debug)]
pub struct ParseResult {
    pub statements: Vec<Stmt>,
    pub errors: Vec<KobyError>,
    pub warnings: Vec<KobyError>,
}

impl ParseResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Turns a token stream into statements.
///
/// The token vector must be terminated by [`TokenKind::End`], which the
/// scanner guarantees.
#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    errors: Vec<KobyError>,
    warnings: Vec<KobyError>,
    pos: usize,
    loop_depth: u32,
}

impl Parser {
    pub fn from_tokens(tokens: Vec<Token>) -> Parser {
        Parser {
            tokens,
            errors: Vec::new(),
            warnings: Vec::new(),
            pos: 0,
            loop_depth: 0,
        }
    }

    pub fn parse(mut self) -> ParseResult {
        let mut statements = Vec::new();
        while !self.is_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        ParseResult {
            statements,
            errors: self.errors,
            warnings: self.warnings,
        }
    }

    /// Parses one declaration, recovering on error: the diagnostic is
    /// recorded and tokens are discarded up to the next statement boundary.
    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.advance_if(TokenKind::Var) {
            self.var_declaration()
        } else if self.advance_if(TokenKind::Fun) {
            self.func_declaration()
        } else {
            self.statement()
        };
        match result {
            Ok(stmt) => Some(stmt),
            Err(err) => {
                self.errors.push(err);
                self.synchronize();
                None
            }
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt, KobyError> {
        let name = self.consume(
            TokenKind::Identifier,
            ErrorKind::VarNameMissing,
            "Expect variable name.",
        )?;

        let initializer = if self.advance_if(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenKind::Semicolon,
            ErrorKind::SemicolonMissing,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::VarDecl { name, initializer })
    }

    fn func_declaration(&mut self) -> Result<Stmt, KobyError> {
        let name = self.consume(
            TokenKind::Identifier,
            ErrorKind::NamedFuncMissingName,
            "Expect function name.",
        )?;
        self.consume(
            TokenKind::LeftParen,
            ErrorKind::FuncParamsMissingParen,
            "Expect '(' after function name.",
        )?;
        let params = self.parameters()?;
        self.consume(
            TokenKind::RightParen,
            ErrorKind::FuncParamsMissingParen,
            "Expect ')' after parameters.",
        )?;
        self.consume(
            TokenKind::LeftBrace,
            ErrorKind::BlockNotClosed,
            "Expect '{' before function body.",
        )?;
        let body = self.block_statements()?;
        Ok(Stmt::FuncDecl {
            name,
            params,
            body: Rc::new(body),
        })
    }

    /// Comma-separated parameter names, current token sitting after `(`.
    fn parameters(&mut self) -> Result<Vec<Token>, KobyError> {
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.consume(
                    TokenKind::Identifier,
                    ErrorKind::FuncParamMissingName,
                    "Expect parameter name.",
                )?);
                if !self.advance_if(TokenKind::Comma) {
                    break;
                }
            }
        }
        if params.len() >= MAX_ARITY {
            self.warn("Can't have more than 255 parameters.");
        }
        Ok(params)
    }

    fn statement(&mut self) -> Result<Stmt, KobyError> {
        if self.advance_if(TokenKind::If) {
            return self.if_stmt();
        }
        if self.advance_if(TokenKind::While) {
            return self.while_stmt();
        }
        if self.advance_if(TokenKind::LeftBrace) {
            return Ok(Stmt::Block(self.block_statements()?));
        }
        if self.advance_if(TokenKind::For) {
            return self.for_stmt();
        }
        if self.advance_if(TokenKind::Break) {
            return self.break_stmt();
        }
        if self.advance_if(TokenKind::Continue) {
            return self.continue_stmt();
        }
        if self.advance_if(TokenKind::Return) {
            return self.return_stmt();
        }
        self.expr_stmt()
    }

    fn if_stmt(&mut self) -> Result<Stmt, KobyError> {
        self.consume(
            TokenKind::LeftParen,
            ErrorKind::IfCondMissingParen,
            "Expect '(' after 'if'.",
        )?;
        let condition = self.expression()?;
        self.consume(
            TokenKind::RightParen,
            ErrorKind::IfCondMissingParen,
            "Expect ')' after condition.",
        )?;
        let then_branch = Box::new(self.statement()?);
        // `else` binds to the nearest `if`.
        let else_branch = if self.advance_if(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_stmt(&mut self) -> Result<Stmt, KobyError> {
        self.consume(
            TokenKind::LeftParen,
            ErrorKind::WhileCondMissingParen,
            "Expect '(' after 'while'.",
        )?;
        let condition = self.expression()?;
        self.consume(
            TokenKind::RightParen,
            ErrorKind::WhileCondMissingParen,
            "Expect ')' after condition.",
        )?;
        let body = self.loop_body()?;
        Ok(Stmt::While {
            condition,
            body: Box::new(body),
        })
    }

    fn for_stmt(&mut self) -> Result<Stmt, KobyError> {
        self.consume(
            TokenKind::LeftParen,
            ErrorKind::ForCondMissingParen,
            "Expect '(' after 'for'.",
        )?;

        let initializer = if self.advance_if(TokenKind::Semicolon) {
            None
        } else if self.advance_if(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expr_stmt()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenKind::Semicolon,
            ErrorKind::SemicolonMissing,
            "Expect ';' after loop condition.",
        )?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenKind::RightParen,
            ErrorKind::ForCondMissingParen,
            "Expect ')' after for clauses.",
        )?;

        let mut body = self.loop_body()?;

        // Desugar into a while loop the interpreter already knows.
        if let Some(inc) = increment {
            body = Stmt::Block(vec![body, Stmt::Expr(inc)]);
        }
        let condition = condition.unwrap_or(Expr::Literal(Literal::Bool(true)));
        let mut stmt = Stmt::While {
            condition,
            body: Box::new(body),
        };
        if let Some(init) = initializer {
            stmt = Stmt::Block(vec![init, stmt]);
        }
        Ok(stmt)
    }

    /// Parses a loop body with `break`/`continue` allowed inside it.
    fn loop_body(&mut self) -> Result<Stmt, KobyError> {
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        body
    }

    fn break_stmt(&mut self) -> Result<Stmt, KobyError> {
        if self.loop_depth == 0 {
            return Err(KobyError::new(
                ErrorKind::BreakOutsideLoop,
                "Break statement can only be used inside a loop.",
                self.current().line,
            ));
        }
        self.consume(
            TokenKind::Semicolon,
            ErrorKind::SemicolonMissing,
            "Expect ';' after 'break'.",
        )?;
        Ok(Stmt::Break)
    }

    fn continue_stmt(&mut self) -> Result<Stmt, KobyError> {
        if self.loop_depth == 0 {
            return Err(KobyError::new(
                ErrorKind::ContinueOutsideLoop,
                "Continue statement can only be used inside a loop.",
                self.current().line,
            ));
        }
        self.consume(
            TokenKind::Semicolon,
            ErrorKind::SemicolonMissing,
            "Expect ';' after 'continue'.",
        )?;
        Ok(Stmt::Continue)
    }

    fn return_stmt(&mut self) -> Result<Stmt, KobyError> {
        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenKind::Semicolon,
            ErrorKind::SemicolonMissing,
            "Expect ';' after return value.",
        )?;
        Ok(Stmt::Return { value })
    }

    fn expr_stmt(&mut self) -> Result<Stmt, KobyError> {
        let expr = self.expression()?;
        self.consume(
            TokenKind::Semicolon,
            ErrorKind::SemicolonMissing,
            "Expect ';' after value.",
        )?;
        Ok(Stmt::Expr(expr))
    }

    /// Statements up to and including the closing `}`.
    fn block_statements(&mut self) -> Result<Vec<Stmt>, KobyError> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(
            TokenKind::RightBrace,
            ErrorKind::BlockNotClosed,
            "Expect '}' after block.",
        )?;
        Ok(statements)
    }

    fn expression(&mut self) -> Result<Expr, KobyError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, KobyError> {
        let expr = self.logical_or()?;

        if self.advance_if(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            // Only a plain variable may appear on the left of `=`; the
            // parser rejects anything else, there is no runtime check.
            if let Expr::Variable(name) = expr {
                return Ok(Expr::Assign {
                    name,
                    value: Box::new(value),
                });
            }
            return Err(KobyError::new(
                ErrorKind::InvalidAssignmentTarget,
                "Invalid assignment target.",
                equals.line,
            ));
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr, KobyError> {
        let mut expr = self.logical_and()?;
        while self.advance_if(TokenKind::Or) {
            let op = self.previous().clone();
            let right = self.logical_and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr, KobyError> {
        let mut expr = self.equality()?;
        while self.advance_if(TokenKind::And) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, KobyError> {
        let mut expr = self.comparison()?;
        while self.advance_if_any(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, KobyError> {
        let mut expr = self.term()?;
        while self.advance_if_any(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, KobyError> {
        let mut expr = self.factor()?;
        while self.advance_if_any(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, KobyError> {
        let mut expr = self.unary()?;
        while self.advance_if_any(&[TokenKind::Slash, TokenKind::Star, TokenKind::Percent]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, KobyError> {
        if self.advance_if_any(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                op,
                right: Box::new(right),
            });
        }
        self.call()
    }

    fn call(&mut self) -> Result<Expr, KobyError> {
        let mut expr = self.primary()?;
        while self.advance_if(TokenKind::LeftParen) {
            expr = self.finish_call(expr)?;
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, KobyError> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.advance_if(TokenKind::Comma) {
                    break;
                }
            }
        }
        if args.len() >= MAX_ARITY {
            self.warn("Can't have more than 255 arguments.");
        }
        let paren = self.consume(
            TokenKind::RightParen,
            ErrorKind::CallNotClosed,
            "Expect ')' after arguments.",
        )?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            args,
        })
    }

    fn primary(&mut self) -> Result<Expr, KobyError> {
        if self.advance_if(TokenKind::False) {
            return Ok(Expr::Literal(Literal::Bool(false)));
        }
        if self.advance_if(TokenKind::True) {
            return Ok(Expr::Literal(Literal::Bool(true)));
        }
        if self.advance_if(TokenKind::Nil) {
            return Ok(Expr::Literal(Literal::Nil));
        }
        if self.advance_if_any(&[TokenKind::Number, TokenKind::Str]) {
            return Ok(Expr::Literal(self.previous().literal.clone()));
        }
        if self.advance_if(TokenKind::LeftParen) {
            let expr = self.expression()?;
            self.consume(
                TokenKind::RightParen,
                ErrorKind::ExprNotClosed,
                "Expect ')' after expression.",
            )?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }
        if self.advance_if(TokenKind::Arrow) {
            return self.lambda();
        }
        if self.advance_if(TokenKind::Identifier) {
            return Ok(Expr::Variable(self.previous().clone()));
        }
        Err(KobyError::new(
            ErrorKind::UnknownParsingError,
            "Expect expression.",
            self.current().line,
        ))
    }

    /// `-> (params) { body }`, with the `->` already consumed.
    fn lambda(&mut self) -> Result<Expr, KobyError> {
        self.consume(
            TokenKind::LeftParen,
            ErrorKind::FuncParamsMissingParen,
            "Expect '(' after '->'.",
        )?;
        let params = self.parameters()?;
        self.consume(
            TokenKind::RightParen,
            ErrorKind::FuncParamsMissingParen,
            "Expect ')' after parameters.",
        )?;
        self.consume(
            TokenKind::LeftBrace,
            ErrorKind::BlockNotClosed,
            "Expect '{' before lambda body.",
        )?;
        let body = self.block_statements()?;
        Ok(Expr::Lambda {
            params,
            body: Rc::new(body),
        })
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn previous(&self) -> &Token {
        if self.pos == 0 {
            return self.current();
        }
        &self.tokens[self.pos - 1]
    }

    fn is_end(&self) -> bool {
        self.current().kind == TokenKind::End
    }

    fn advance(&mut self) {
        if !self.is_end() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_end() && self.current().kind == kind
    }

    /// Consumes the current token when it has the given kind.
    fn advance_if(&mut self, kind: TokenKind) -> bool {
        if self.current().kind == kind {
            self.advance();
            return true;
        }
        false
    }

    fn advance_if_any(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.iter().any(|kind| self.current().kind == *kind) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(
        &mut self,
        kind: TokenKind,
        err_kind: ErrorKind,
        message: &str,
    ) -> Result<Token, KobyError> {
        if self.advance_if(kind) {
            return Ok(self.previous().clone());
        }
        Err(KobyError::new(err_kind, message, self.current().line))
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(KobyError::new(
            ErrorKind::TooManyArguments,
            message,
            self.current().line,
        ));
    }

    /// Discards tokens until a statement boundary: just past a `;`, or in
    /// front of a token that can start a statement.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.current().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return => return,
                _ => self.advance(),
            }
        }
    }
}
