//! Value types of the source language.

use std::fmt;

/// Width of a pointer (and of every pushed argument slot) on the 32-bit target.
pub const PTR_SIZE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
  Int,
  Float,
  Char,
  Str,
  Void,
}

impl Type {
  /// Map a type keyword to its tag.
  pub fn from_keyword(word: &str) -> Option<Self> {
    match word {
      "int" => Some(Self::Int),
      "float" => Some(Self::Float),
      "char" => Some(Self::Char),
      "str" => Some(Self::Str),
      "void" => Some(Self::Void),
      _ => None,
    }
  }

  pub fn keyword(self) -> &'static str {
    match self {
      Self::Int => "int",
      Self::Float => "float",
      Self::Char => "char",
      Self::Str => "str",
      Self::Void => "void",
    }
  }

  pub fn is_numeric(self) -> bool {
    matches!(self, Self::Int | Self::Float | Self::Char)
  }

  /// Integer-valued types live in general-purpose registers.
  pub fn is_integer(self) -> bool {
    matches!(self, Self::Int | Self::Char)
  }

  /// Size of a stack slot holding a value of this type.
  pub fn size(self) -> u32 {
    match self {
      Self::Int => 4,
      Self::Float => 4,
      Self::Char => 1,
      Self::Str => PTR_SIZE,
      Self::Void => 0,
    }
  }

  /// Whether a numeric expression of the given float-ness may be stored into
  /// a slot of this type. Widening into `float` is allowed, narrowing is not.
  pub fn accepts_numeric(self, is_float: bool) -> bool {
    match self {
      Self::Float => true,
      Self::Int | Self::Char => !is_float,
      Self::Str | Self::Void => false,
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.keyword())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keywords_round_trip() {
    for ty in [Type::Int, Type::Float, Type::Char, Type::Str, Type::Void] {
      assert_eq!(Type::from_keyword(ty.keyword()), Some(ty));
    }
    assert_eq!(Type::from_keyword("double"), None);
  }

  #[test]
  fn slot_sizes_follow_the_target() {
    assert_eq!(Type::Int.size(), 4);
    assert_eq!(Type::Float.size(), 4);
    assert_eq!(Type::Char.size(), 1);
    assert_eq!(Type::Str.size(), PTR_SIZE);
  }

  #[test]
  fn float_only_widens() {
    assert!(Type::Float.accepts_numeric(false));
    assert!(Type::Float.accepts_numeric(true));
    assert!(Type::Int.accepts_numeric(false));
    assert!(!Type::Int.accepts_numeric(true));
    assert!(!Type::Char.accepts_numeric(true));
    assert!(!Type::Str.accepts_numeric(false));
  }
}
