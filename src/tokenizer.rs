//! Lexical analysis: turns the raw source text into a vector of tokens.
//!
//! Characters are accumulated greedily into a word buffer; whitespace,
//! punctuation, quotes and `#` end the pending word, which is then
//! classified as a keyword, identifier or numeric literal. Quoted literals
//! and comments are scanned by dedicated helpers.

use std::fmt;

use snafu::ensure;
use tracing::debug;

use crate::error::{
  IntegerOverflowSnafu, InvalidCharLiteralSnafu, InvalidTokenSnafu, LexResult,
  UnexpectedCharSnafu, UnknownEscapeSnafu, UnterminatedCharSnafu, UnterminatedCommentSnafu,
  UnterminatedStringSnafu,
};
use crate::ty::Type;

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Type,
  Exit,
  Print,
  Return,
  IntLiteral,
  FloatLiteral,
  CharLiteral,
  StrLiteral,
  Identifier,
  Plus,
  Minus,
  Times,
  Division,
  Mod,
  OpenParen,
  CloseParen,
  OpenBrace,
  CloseBrace,
  Equals,
  Semicolon,
  Comma,
}

impl TokenKind {
  pub fn name(self) -> &'static str {
    match self {
      Self::Type => "TYPE",
      Self::Exit => "EXIT",
      Self::Print => "PRINT",
      Self::Return => "RETURN",
      Self::IntLiteral => "LITERAL_INT",
      Self::FloatLiteral => "LITERAL_FLOAT",
      Self::CharLiteral => "LITERAL_CHAR",
      Self::StrLiteral => "LITERAL_STR",
      Self::Identifier => "IDENT",
      Self::Plus => "PLUS",
      Self::Minus => "MINUS",
      Self::Times => "TIMES",
      Self::Division => "DIVISION",
      Self::Mod => "MOD",
      Self::OpenParen => "OPEN_PAREN",
      Self::CloseParen => "CLOSE_PAREN",
      Self::OpenBrace => "OPEN_BRACE",
      Self::CloseBrace => "CLOSE_BRACE",
      Self::Equals => "EQUALS",
      Self::Semicolon => "SEMICOLON",
      Self::Comma => "COMMA",
    }
  }

  /// Whether the token's text carries information beyond its kind.
  fn has_payload(self) -> bool {
    matches!(
      self,
      Self::Type
        | Self::IntLiteral
        | Self::FloatLiteral
        | Self::CharLiteral
        | Self::StrLiteral
        | Self::Identifier
    )
  }

  fn punctuator(c: char) -> Option<Self> {
    let kind = match c {
      '+' => Self::Plus,
      '-' => Self::Minus,
      '*' => Self::Times,
      '/' => Self::Division,
      '%' => Self::Mod,
      '(' => Self::OpenParen,
      ')' => Self::CloseParen,
      '{' => Self::OpenBrace,
      '}' => Self::CloseBrace,
      '=' => Self::Equals,
      ';' => Self::Semicolon,
      ',' => Self::Comma,
      _ => return None,
    };
    Some(kind)
  }
}

/// A lexeme together with the position of its first character.
///
/// For char and string literals `text` holds the decoded value, with escape
/// sequences already resolved and the quotes stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub line: usize,
  pub col: usize,
}

impl Token {
  pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
    Self {
      kind,
      text: text.into(),
      line,
      col,
    }
  }
}

impl fmt::Display for Token {
  /// Renders as `KIND` or `KIND(text)`, e.g. `TYPE(int)` or `SEMICOLON`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.kind.has_payload() {
      write!(f, "{}({})", self.kind.name(), self.text)
    } else {
      f.write_str(self.kind.name())
    }
  }
}

/// Lex the input into a flat vector of tokens.
pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
  let mut lexer = Lexer::new(input);
  lexer.run()?;
  debug!(count = lexer.tokens.len(), "tokenized source");
  Ok(lexer.tokens)
}

/// Word being accumulated, with the position of its first character.
struct Pending {
  text: String,
  line: usize,
  col: usize,
}

struct Lexer {
  chars: Vec<char>,
  pos: usize,
  line: usize,
  col: usize,
  pending: Option<Pending>,
  tokens: Vec<Token>,
}

impl Lexer {
  fn new(input: &str) -> Self {
    Self {
      chars: input.chars().collect(),
      pos: 0,
      line: 1,
      col: 1,
      pending: None,
      tokens: Vec::new(),
    }
  }

  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += 1;
    if c == '\n' {
      self.line += 1;
      self.col = 1;
    } else {
      self.col += 1;
    }
    Some(c)
  }

  fn run(&mut self) -> LexResult<()> {
    while let Some(c) = self.peek() {
      if c.is_whitespace() {
        self.flush()?;
        self.bump();
        continue;
      }

      if let Some(kind) = TokenKind::punctuator(c) {
        self.flush()?;
        self.tokens.push(Token::new(kind, c, self.line, self.col));
        self.bump();
        continue;
      }

      match c {
        '#' => {
          self.flush()?;
          self.skip_comment()?;
        }
        '"' => {
          self.flush()?;
          self.lex_string()?;
        }
        '\'' => {
          self.flush()?;
          self.lex_char()?;
        }
        c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
          let (line, col) = (self.line, self.col);
          self
            .pending
            .get_or_insert_with(|| Pending {
              text: String::new(),
              line,
              col,
            })
            .text
            .push(c);
          self.bump();
        }
        ch => {
          return UnexpectedCharSnafu {
            ch,
            line: self.line,
            col: self.col,
          }
          .fail();
        }
      }
    }

    self.flush()
  }

  /// Classify and emit the pending word, if any.
  fn flush(&mut self) -> LexResult<()> {
    let Some(Pending { text, line, col }) = self.pending.take() else {
      return Ok(());
    };

    let kind = match text.as_str() {
      "exit" => TokenKind::Exit,
      "print" => TokenKind::Print,
      "return" => TokenKind::Return,
      word if Type::from_keyword(word).is_some() => TokenKind::Type,
      word if is_identifier(word) => TokenKind::Identifier,
      word if word.bytes().all(|b| b.is_ascii_digit()) => {
        ensure!(
          word.parse::<u32>().is_ok_and(|v| v <= i32::MAX as u32 + 1),
          IntegerOverflowSnafu {
            text: word,
            line,
            col
          }
        );
        TokenKind::IntLiteral
      }
      word if is_float_literal(word) => TokenKind::FloatLiteral,
      word => {
        return InvalidTokenSnafu {
          text: word,
          line,
          col,
        }
        .fail();
      }
    };

    self.tokens.push(Token::new(kind, text, line, col));
    Ok(())
  }

  /// Skip a `#` line comment or a nestable `#[ ... ]#` block comment.
  fn skip_comment(&mut self) -> LexResult<()> {
    let (line, col) = (self.line, self.col);
    self.bump();

    if self.peek() != Some('[') {
      while let Some(c) = self.peek() {
        if c == '\n' {
          break;
        }
        self.bump();
      }
      return Ok(());
    }

    self.bump();
    let mut depth = 1usize;
    while depth > 0 {
      match self.bump() {
        None => return UnterminatedCommentSnafu { line, col }.fail(),
        Some('#') if self.peek() == Some('[') => {
          self.bump();
          depth += 1;
        }
        Some(']') if self.peek() == Some('#') => {
          self.bump();
          depth -= 1;
        }
        Some(_) => {}
      }
    }
    Ok(())
  }

  fn lex_string(&mut self) -> LexResult<()> {
    let (line, col) = (self.line, self.col);
    self.bump();

    let mut value = String::new();
    loop {
      match self.bump() {
        None => return UnterminatedStringSnafu { line, col }.fail(),
        Some('"') => break,
        Some('\\') => value.push(self.escape(line, col, false)?),
        Some(c) => value.push(c),
      }
    }

    self
      .tokens
      .push(Token::new(TokenKind::StrLiteral, value, line, col));
    Ok(())
  }

  fn lex_char(&mut self) -> LexResult<()> {
    let (line, col) = (self.line, self.col);
    self.bump();

    let mut value = String::new();
    loop {
      match self.bump() {
        None | Some('\n') => return UnterminatedCharSnafu { line, col }.fail(),
        Some('\'') => break,
        Some('\\') => value.push(self.escape(line, col, true)?),
        Some(c) => value.push(c),
      }
    }

    let mut chars = value.chars();
    let valid = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii());
    ensure!(valid, InvalidCharLiteralSnafu { line, col });

    self
      .tokens
      .push(Token::new(TokenKind::CharLiteral, value, line, col));
    Ok(())
  }

  /// Decode the character following a backslash.
  fn escape(&mut self, line: usize, col: usize, in_char: bool) -> LexResult<char> {
    let escape_line = self.line;
    let escape_col = self.col.saturating_sub(1);
    let Some(c) = self.bump() else {
      return if in_char {
        UnterminatedCharSnafu { line, col }.fail()
      } else {
        UnterminatedStringSnafu { line, col }.fail()
      };
    };

    let decoded = match c {
      'n' => '\n',
      't' => '\t',
      '0' => '\0',
      '\'' => '\'',
      '"' => '"',
      '\\' => '\\',
      escape => {
        return UnknownEscapeSnafu {
          escape,
          line: escape_line,
          col: escape_col,
        }
        .fail();
      }
    };
    Ok(decoded)
  }
}

fn is_identifier(word: &str) -> bool {
  let mut chars = word.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Digits with exactly one interior dot.
fn is_float_literal(word: &str) -> bool {
  match word.split_once('.') {
    Some((whole, frac)) => {
      !whole.is_empty()
        && !frac.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
    }
    None => false,
  }
}
