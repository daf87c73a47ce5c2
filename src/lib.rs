//! Crate root: wires together the compilation pipeline.
//!
//! Source text flows through three stages, each failing fast with its own
//! error type:
//! - `tokenizer` performs lexical analysis and produces a flat token vector.
//! - `parser` builds the scope tree, binding names and checking types as it
//!   goes, and collects the literal table.
//! - `codegen` lowers the tree into 32-bit NASM assembly for Linux.
//!
//! `scope`, `literal`, `ty` and `ast` hold the data structures the stages
//! share.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod literal;
pub mod parser;
pub mod scope;
pub mod tokenizer;
pub mod ty;

pub use codegen::generate_program;
pub use error::{CompileError, Error, LexError, ParseError, Result};
pub use parser::{Program, parse_program};
pub use tokenizer::{Token, TokenKind, tokenize};

/// Compile a source string into NASM assembly text.
pub fn compile(source: &str) -> Result<String> {
  let tokens = tokenize(source)?;
  let program = parse_program(tokens)?;
  Ok(generate_program(&program.body, &program.literals)?)
}
