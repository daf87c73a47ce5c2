//! Deduplicated float and string literals destined for the data segment.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
  Float,
  Str,
}

impl LiteralKind {
  pub fn name(self) -> &'static str {
    match self {
      Self::Float => "float",
      Self::Str => "string",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
  pub text: String,
  pub kind: LiteralKind,
  pub label: String,
}

/// Literal text to data-segment label, kept in first-registration order so
/// the emitted data segment is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteralTable {
  entries: Vec<Literal>,
  index: HashMap<(LiteralKind, String), usize>,
}

impl LiteralTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a literal, reusing the existing entry for repeated text.
  pub fn intern(&mut self, text: &str, kind: LiteralKind) -> &Literal {
    let key = (kind, text.to_string());
    let slot = match self.index.get(&key) {
      Some(&slot) => slot,
      None => {
        let slot = self.entries.len();
        self.entries.push(Literal {
          text: text.to_string(),
          kind,
          label: format!("lit{slot}"),
        });
        self.index.insert(key, slot);
        slot
      }
    };
    &self.entries[slot]
  }

  pub fn get(&self, text: &str, kind: LiteralKind) -> Option<&Literal> {
    self
      .index
      .get(&(kind, text.to_string()))
      .map(|&slot| &self.entries[slot])
  }

  pub fn label(&self, text: &str, kind: LiteralKind) -> Option<&str> {
    self.get(text, kind).map(|lit| lit.label.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = &Literal> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn repeated_text_shares_one_entry() {
    let mut table = LiteralTable::new();
    let first = table.intern("hello", LiteralKind::Str).label.clone();
    let second = table.intern("hello", LiteralKind::Str).label.clone();
    assert_eq!(first, second);
    assert_eq!(table.len(), 1);
  }

  #[test]
  fn kinds_are_distinct_namespaces() {
    let mut table = LiteralTable::new();
    table.intern("1.5", LiteralKind::Float);
    table.intern("1.5", LiteralKind::Str);
    assert_eq!(table.len(), 2);
    assert_eq!(table.label("1.5", LiteralKind::Float), Some("lit0"));
    assert_eq!(table.label("1.5", LiteralKind::Str), Some("lit1"));
  }

  #[test]
  fn labels_follow_registration_order() {
    let mut table = LiteralTable::new();
    table.intern("b", LiteralKind::Str);
    table.intern("2.0", LiteralKind::Float);
    table.intern("a", LiteralKind::Str);
    let labels: Vec<_> = table.iter().map(|lit| lit.label.as_str()).collect();
    assert_eq!(labels, ["lit0", "lit1", "lit2"]);
    assert!(table.get("c", LiteralKind::Str).is_none());
  }
}
