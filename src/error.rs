//! Error types shared across the compilation pipeline.
//!
//! Each stage owns one error enum and fails on the first problem it meets.
//! Lexer and parser errors point at a source line/column; code generation
//! errors are late re-checks over an already validated tree and report the
//! name they could not resolve instead.

use snafu::Snafu;

use crate::ty::Type;

pub type LexResult<T> = Result<T, LexError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type CompileResult<T> = Result<T, CompileError>;
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LexError {
  #[snafu(display("{line}:{col}: unexpected character '{ch}'"))]
  UnexpectedChar { ch: char, line: usize, col: usize },

  #[snafu(display("{line}:{col}: '{text}' is not a valid token"))]
  InvalidToken {
    text: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: integer literal '{text}' does not fit in 32 bits"))]
  IntegerOverflow {
    text: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: unterminated string literal"))]
  UnterminatedString { line: usize, col: usize },

  #[snafu(display("{line}:{col}: unterminated character literal"))]
  UnterminatedChar { line: usize, col: usize },

  #[snafu(display("{line}:{col}: character literal must hold exactly one ASCII character"))]
  InvalidCharLiteral { line: usize, col: usize },

  #[snafu(display("{line}:{col}: unknown escape sequence '\\{escape}'"))]
  UnknownEscape {
    escape: char,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: could not find the end of the block comment"))]
  UnterminatedComment { line: usize, col: usize },
}

impl LexError {
  /// Source position the error refers to.
  pub fn position(&self) -> (usize, usize) {
    match *self {
      Self::UnexpectedChar { line, col, .. }
      | Self::InvalidToken { line, col, .. }
      | Self::IntegerOverflow { line, col, .. }
      | Self::UnterminatedString { line, col }
      | Self::UnterminatedChar { line, col }
      | Self::InvalidCharLiteral { line, col }
      | Self::UnknownEscape { line, col, .. }
      | Self::UnterminatedComment { line, col } => (line, col),
    }
  }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ParseError {
  #[snafu(display("{line}:{col}: expected {expected}, got '{found}'"))]
  UnexpectedToken {
    expected: String,
    found: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: expected {expected}, got EOF"))]
  UnexpectedEof {
    expected: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: unknown identifier '{name}'"))]
  UnknownIdentifier {
    name: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: unknown function '{name}'"))]
  UnknownFunction {
    name: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: identifier '{name}' already in use"))]
  AlreadyInUse {
    name: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: cannot convert float expression to {target}"))]
  Narrowing { target: Type, line: usize, col: usize },

  #[snafu(display("{line}:{col}: expected a {expected} value, got {found}"))]
  TypeMismatch {
    expected: String,
    found: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: function '{name}' returns void and has no value"))]
  VoidValue {
    name: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: '{name}' cannot be declared void"))]
  VoidVariable {
    name: String,
    line: usize,
    col: usize,
  },

  #[snafu(display(
    "{line}:{col}: function '{name}' takes {expected} argument(s), {found} given"
  ))]
  ArgumentCount {
    name: String,
    expected: usize,
    found: usize,
    line: usize,
    col: usize,
  },

  #[snafu(display(
    "{line}:{col}: argument {index} of '{name}' must be {expected}, got {found}"
  ))]
  ArgumentType {
    name: String,
    index: usize,
    expected: Type,
    found: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: function '{name}' already has a body"))]
  Redefinition {
    name: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: definition of '{name}' does not match its prototype"))]
  SignatureMismatch {
    name: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: scope opened here is never closed"))]
  UnterminatedScope { line: usize, col: usize },

  #[snafu(display("{line}:{col}: 'return' outside of a function"))]
  ReturnOutsideFunction { line: usize, col: usize },

  #[snafu(display("{line}:{col}: 'return' inside void function '{name}'"))]
  ReturnInVoid {
    name: String,
    line: usize,
    col: usize,
  },

  #[snafu(display("{line}:{col}: '%' requires integer operands"))]
  FloatModulo { line: usize, col: usize },

  #[snafu(display("{line}:{col}: exit code cannot be a float value"))]
  FloatExit { line: usize, col: usize },

  #[snafu(display("{line}:{col}: 'main' must take no parameters and return int, char or void"))]
  InvalidMain { line: usize, col: usize },
}

impl ParseError {
  /// Source position of the offending token.
  pub fn position(&self) -> (usize, usize) {
    match *self {
      Self::UnexpectedToken { line, col, .. }
      | Self::UnexpectedEof { line, col, .. }
      | Self::UnknownIdentifier { line, col, .. }
      | Self::UnknownFunction { line, col, .. }
      | Self::AlreadyInUse { line, col, .. }
      | Self::Narrowing { line, col, .. }
      | Self::TypeMismatch { line, col, .. }
      | Self::VoidValue { line, col, .. }
      | Self::VoidVariable { line, col, .. }
      | Self::ArgumentCount { line, col, .. }
      | Self::ArgumentType { line, col, .. }
      | Self::Redefinition { line, col, .. }
      | Self::SignatureMismatch { line, col, .. }
      | Self::UnterminatedScope { line, col }
      | Self::ReturnOutsideFunction { line, col }
      | Self::ReturnInVoid { line, col, .. }
      | Self::FloatModulo { line, col }
      | Self::FloatExit { line, col }
      | Self::InvalidMain { line, col } => (line, col),
    }
  }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("unknown identifier: '{name}'"))]
  UnresolvedIdentifier { name: String },

  #[snafu(display("'{name}' is already declared in this scope"))]
  DuplicateVariable { name: String },

  #[snafu(display("expression does not fit a {expected} slot"))]
  ValueTypeMismatch { expected: Type },

  #[snafu(display("could not resolve {kind} literal: {text:?}"))]
  UnknownLiteral { kind: &'static str, text: String },

  #[snafu(display("float literal '{text}' is not a valid 32-bit float"))]
  InvalidFloatLiteral { text: String },

  #[snafu(display("unknown function: '{name}'"))]
  UnknownCallee { name: String },

  #[snafu(display("function '{name}' takes {expected} argument(s), {found} given"))]
  ArgumentCountMismatch {
    name: String,
    expected: usize,
    found: usize,
  },

  #[snafu(display("argument {index} of '{name}' does not match parameter type {expected}"))]
  ArgumentTypeMismatch {
    name: String,
    index: usize,
    expected: Type,
  },

  #[snafu(display("'{name}' of type {ty} cannot be used as {expected}"))]
  InvalidOperand {
    name: String,
    ty: Type,
    expected: &'static str,
  },

  #[snafu(display("function '{name}' is called but never defined"))]
  MissingDefinition { name: String },

  #[snafu(display("function '{name}' already has a body"))]
  DuplicateBody { name: String },

  #[snafu(display("'return' outside of a function"))]
  StrayReturn,
}

/// Any failure of the core pipeline, tagged by the stage that raised it.
#[derive(Debug, Snafu)]
pub enum Error {
  #[snafu(context(false), display("lex error at {source}"))]
  Lex { source: LexError },

  #[snafu(context(false), display("parse error at {source}"))]
  Parse { source: ParseError },

  #[snafu(context(false), display("compile error: {source}"))]
  Compile { source: CompileError },
}

impl Error {
  /// Source position for lex and parse failures; codegen errors have none.
  pub fn position(&self) -> Option<(usize, usize)> {
    match self {
      Self::Lex { source } => Some(source.position()),
      Self::Parse { source } => Some(source.position()),
      Self::Compile { .. } => None,
    }
  }
}
