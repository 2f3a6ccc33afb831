//! Uniform fatal diagnostic surface (C6).
//!
//! ALAN-2022 has no error recovery: the first diagnostic terminates
//! compilation. Every fallible routine in the scanner, symbol
//! table, and parser/type-checker returns `Result<T, CompileError>` and
//! propagates with `?`; nothing here accumulates a `Vec` of errors. The
//! top-level driver in `lib.rs` is the one place an `Err` turns into a
//! printed diagnostic and a non-zero exit.

use std::fmt;

/// A 1-based `(line, col)` source position. `col` always refers to the
/// column of the first character of whatever is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // --- Lexical ---
    IllegalCharacter(char),
    IdentifierTooLong,
    NumberTooLarge,
    UnterminatedString,
    UnterminatedComment,
    IllegalEscape(char),
    NonPrintableInString,
    NewlineInString,

    // --- Syntactic ---
    Expected { expected: String, found: String },

    // --- Semantic ---
    MultipleDefinition(String),
    UnknownIdentifier(String),
    NotAVariable(String),
    NotAnArray(String),
    ScalarExpected,
    NotAFunction(String),
    NotAProcedure(String),
    TooFewArguments,
    TooManyArguments,
    IncompatibleTypes { expected: String, found: String },
    IllegalArrayOperation(String),

    // --- System ---
    CannotOpenSource(String),
    CannotWriteOutput(String),
    AssemblerInvocationFailure(String),
    JasminJarUnset,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::IllegalCharacter(c) => write!(f, "illegal character '{}'", c),
            ErrorKind::IdentifierTooLong => {
                write!(f, "identifier exceeds maximum length of 72 characters")
            }
            ErrorKind::NumberTooLarge => write!(f, "number literal exceeds 32-bit signed range"),
            ErrorKind::UnterminatedString => write!(f, "unterminated string literal"),
            ErrorKind::UnterminatedComment => write!(f, "unterminated comment"),
            ErrorKind::IllegalEscape(c) => write!(f, "illegal escape sequence '\\{}'", c),
            ErrorKind::NonPrintableInString => {
                write!(f, "non-printable character in string literal")
            }
            ErrorKind::NewlineInString => write!(f, "newline in string literal"),
            ErrorKind::Expected { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ErrorKind::MultipleDefinition(name) => {
                write!(f, "multiple definition of '{}'", name)
            }
            ErrorKind::UnknownIdentifier(name) => write!(f, "unknown identifier '{}'", name),
            ErrorKind::NotAVariable(name) => write!(f, "'{}' is not a variable", name),
            ErrorKind::NotAnArray(name) => write!(f, "'{}' is not an array", name),
            ErrorKind::ScalarExpected => write!(f, "scalar expression expected"),
            ErrorKind::NotAFunction(name) => write!(f, "'{}' is not a function", name),
            ErrorKind::NotAProcedure(name) => write!(f, "'{}' is not a procedure", name),
            ErrorKind::TooFewArguments => write!(f, "too few arguments"),
            ErrorKind::TooManyArguments => write!(f, "too many arguments"),
            ErrorKind::IncompatibleTypes { expected, found } => write!(
                f,
                "incompatible types (expected {}, found {})",
                expected, found
            ),
            ErrorKind::IllegalArrayOperation(msg) => write!(f, "illegal array operation: {}", msg),
            ErrorKind::CannotOpenSource(msg) => write!(f, "cannot open source file: {}", msg),
            ErrorKind::CannotWriteOutput(msg) => write!(f, "cannot write output file: {}", msg),
            ErrorKind::AssemblerInvocationFailure(msg) => {
                write!(f, "assembler invocation failed: {}", msg)
            }
            ErrorKind::JasminJarUnset => write!(f, "JASMIN_JAR environment variable is not set"),
        }
    }
}

/// A single fatal diagnostic, carrying the source position of the first
/// character of whatever triggered it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub pos: Position,
}

impl CompileError {
    pub fn new(kind: ErrorKind, pos: Position) -> Self {
        Self { kind, pos }
    }

    pub fn expected(expected: impl Into<String>, found: impl Into<String>, pos: Position) -> Self {
        Self::new(
            ErrorKind::Expected {
                expected: expected.into(),
                found: found.into(),
            },
            pos,
        )
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.kind)
    }
}

impl std::error::Error for CompileError {}

/// Formats a diagnostic the way the CLI driver prints it: `<file>:<line>:<col>: <kind>`.
pub fn format_with_file(file: &str, err: &CompileError) -> String {
    format!("{}:{}: {}", file, err.pos, err.kind)
}
