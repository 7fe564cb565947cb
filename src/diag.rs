//! Diagnostics shared by the scanner, the parser and the evaluator.

use std::error::Error;
use std::fmt;

use crate::token::Position;

/// Everything that can go wrong in a Koby program, with its numeric code.
///
/// Codes are namespaced by stage: 1-100 lexing, 101-200 parsing, 201-300
/// evaluation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    // Lexical errors
    LexicalError,
    UnterminatedString,

    // Syntax errors
    UnknownParsingError,
    ExprNotClosed,
    BlockNotClosed,
    VarNameMissing,
    SemicolonMissing,
    InvalidAssignmentTarget,
    IfCondMissingParen,
    WhileCondMissingParen,
    ForCondMissingParen,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    CallNotClosed,
    TooManyArguments,
    NamedFuncMissingName,
    FuncParamsMissingParen,
    FuncParamMissingName,

    // Evaluation errors
    OperandInvalid,
    UndefinedVar,
    ArgumentCountMismatch,
    NotCallable,
    DuplicateVar,
}

impl ErrorKind {
    pub fn code(self) -> u16 {
        match self {
            ErrorKind::LexicalError => 1,
            ErrorKind::UnterminatedString => 2,
            ErrorKind::UnknownParsingError => 101,
            ErrorKind::ExprNotClosed => 102,
            ErrorKind::BlockNotClosed => 103,
            ErrorKind::VarNameMissing => 104,
            ErrorKind::SemicolonMissing => 105,
            ErrorKind::InvalidAssignmentTarget => 106,
            ErrorKind::IfCondMissingParen => 107,
            ErrorKind::WhileCondMissingParen => 108,
            ErrorKind::ForCondMissingParen => 109,
            ErrorKind::BreakOutsideLoop => 110,
            ErrorKind::ContinueOutsideLoop => 111,
            ErrorKind::CallNotClosed => 112,
            ErrorKind::TooManyArguments => 113,
            ErrorKind::NamedFuncMissingName => 114,
            ErrorKind::FuncParamsMissingParen => 115,
            ErrorKind::FuncParamMissingName => 116,
            ErrorKind::OperandInvalid => 201,
            ErrorKind::UndefinedVar => 202,
            ErrorKind::ArgumentCountMismatch => 203,
            ErrorKind::NotCallable => 204,
            ErrorKind::DuplicateVar => 205,
        }
    }

    /// Warnings are reported but never abort a stage.
    pub fn is_warning(self) -> bool {
        matches!(self, ErrorKind::TooManyArguments)
    }
}

/// A single diagnostic: what went wrong, where, and a message for the user.
#[derive(Debug, PartialEq, Clone)]
pub struct KobyError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Position,
}

impl KobyError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: Position) -> KobyError {
        KobyError {
            kind,
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for KobyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Error {}]{}\n[line {}]",
            self.kind.code(),
            self.message,
            self.line
        )
    }
}

impl Error for KobyError {}
