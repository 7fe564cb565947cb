use std::rc::Rc;

use crate::token::{Literal, Token};

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Binary {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },
    Unary {
        op: Token,
        right: Box<Expr>,
    },
    Grouping(Box<Expr>),
    Literal(Literal),
    Variable(Token),
    Assign {
        name: Token,
        value: Box<Expr>,
    },
    /// Kept apart from `Binary` because `and`/`or` short-circuit.
    Logical {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        /// Closing parenthesis, kept for error line reporting.
        paren: Token,
        args: Vec<Expr>,
    },
    Lambda {
        params: Vec<Token>,
        body: Rc<Vec<Stmt>>,
    },
}

/// Function bodies are reference-counted so function values can share them
/// with the tree without a deep clone.
#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    Expr(Expr),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    VarDecl {
        name: Token,
        initializer: Option<Expr>,
    },
    FuncDecl {
        name: Token,
        params: Vec<Token>,
        body: Rc<Vec<Stmt>>,
    },
    Block(Vec<Stmt>),
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Return {
        value: Option<Expr>,
    },
}
