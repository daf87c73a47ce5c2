//! Symbol tables for lexical scopes and the functions declared in them.
//!
//! Both the parser and the code generator keep one `TableStack` mirroring
//! the scopes they are currently inside. Every scope gets its own frame
//! pointer at run time, so a variable's address is found by walking outward
//! and adding up the frames crossed on the way.

use std::collections::HashMap;

use crate::ty::{PTR_SIZE, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarInfo {
  pub ty: Type,
  pub size: u32,
  /// Displacement from the frame pointer of the declaring scope.
  pub offset: i32,
  /// Statically known length of the string a `str` slot points at.
  pub str_len: Option<usize>,
}

/// Identifiers declared in one scope.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
  vars: HashMap<String, VarInfo>,
  local_size: u32,
  frame: bool,
}

impl SymbolTable {
  /// A nested block inside the current frame.
  pub fn block() -> Self {
    Self::default()
  }

  /// The root of a new frame: the program scope or a function body.
  /// Lookups never continue past a frame root.
  pub fn frame() -> Self {
    Self {
      frame: true,
      ..Self::default()
    }
  }

  pub fn is_frame(&self) -> bool {
    self.frame
  }

  /// Bytes of locals pushed so far.
  pub fn local_size(&self) -> u32 {
    self.local_size
  }

  pub fn contains(&self, name: &str) -> bool {
    self.vars.contains_key(name)
  }

  pub fn get(&self, name: &str) -> Option<&VarInfo> {
    self.vars.get(name)
  }

  /// Allocate the next local slot below the frame pointer. Returns `None`
  /// if the name is already in use in this scope.
  pub fn declare(&mut self, name: &str, ty: Type) -> Option<&VarInfo> {
    if self.contains(name) {
      return None;
    }
    let size = ty.size();
    self.local_size += size;
    let info = VarInfo {
      ty,
      size,
      offset: -(self.local_size as i32),
      str_len: None,
    };
    Some(self.vars.entry(name.to_string()).or_insert(info))
  }

  /// Bind the `index`-th parameter. Arguments sit above the saved frame
  /// pointer and return address, one pointer-sized push slot each.
  pub fn declare_param(&mut self, name: &str, ty: Type, index: usize) -> Option<&VarInfo> {
    if self.contains(name) {
      return None;
    }
    let info = VarInfo {
      ty,
      size: ty.size(),
      offset: (2 * PTR_SIZE + PTR_SIZE * index as u32) as i32,
      str_len: None,
    };
    Some(self.vars.entry(name.to_string()).or_insert(info))
  }
}

/// Stack of symbol tables, innermost last.
#[derive(Debug, Clone, Default)]
pub struct TableStack {
  tables: Vec<SymbolTable>,
}

impl TableStack {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, table: SymbolTable) {
    self.tables.push(table);
  }

  pub fn pop(&mut self) -> Option<SymbolTable> {
    self.tables.pop()
  }

  pub fn depth(&self) -> usize {
    self.tables.len()
  }

  /// Declare in the innermost scope. `None` if the name is taken there or
  /// no scope is open.
  pub fn declare(&mut self, name: &str, ty: Type) -> Option<&VarInfo> {
    self.tables.last_mut()?.declare(name, ty)
  }

  /// Index of the table declaring `name`, searching outward through the
  /// current frame only.
  fn position(&self, name: &str) -> Option<usize> {
    for (i, table) in self.tables.iter().enumerate().rev() {
      if table.contains(name) {
        return Some(i);
      }
      if table.is_frame() {
        break;
      }
    }
    None
  }

  pub fn lookup(&self, name: &str) -> Option<&VarInfo> {
    let i = self.position(name)?;
    self.tables[i].get(name)
  }

  pub fn lookup_mut(&mut self, name: &str) -> Option<&mut VarInfo> {
    let i = self.position(name)?;
    self.tables[i].vars.get_mut(name)
  }

  /// Displacement of `name` from the innermost frame pointer.
  ///
  /// Each scope boundary crossed adds the enclosing scope's locals plus the
  /// frame pointer saved when the inner scope was entered.
  pub fn offset(&self, name: &str) -> Option<i32> {
    let mut base = 0i32;
    for i in (0..self.tables.len()).rev() {
      let table = &self.tables[i];
      if let Some(info) = table.get(name) {
        return Some(base + info.offset);
      }
      if table.is_frame() || i == 0 {
        return None;
      }
      base += (self.tables[i - 1].local_size + PTR_SIZE) as i32;
    }
    None
  }

  /// Number of open scopes from the innermost one out to and including the
  /// nearest frame root; a `return` has to unwind all of them.
  pub fn frame_depth(&self) -> usize {
    let mut depth = 0;
    for table in self.tables.iter().rev() {
      depth += 1;
      if table.is_frame() {
        break;
      }
    }
    depth
  }
}

/// Stack of per-scope function tables, innermost last.
#[derive(Debug, Clone)]
pub struct FunctionTableStack<F> {
  tables: Vec<HashMap<String, F>>,
}

impl<F> Default for FunctionTableStack<F> {
  fn default() -> Self {
    Self { tables: Vec::new() }
  }
}

impl<F> FunctionTableStack<F> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push_scope(&mut self) {
    self.tables.push(HashMap::new());
  }

  pub fn pop_scope(&mut self) -> Option<HashMap<String, F>> {
    self.tables.pop()
  }

  /// Innermost visible function with this name.
  pub fn lookup(&self, name: &str) -> Option<&F> {
    self.tables.iter().rev().find_map(|table| table.get(name))
  }

  pub fn lookup_mut(&mut self, name: &str) -> Option<&mut F> {
    self
      .tables
      .iter_mut()
      .rev()
      .find_map(|table| table.get_mut(name))
  }

  /// Function declared in the innermost scope only.
  pub fn local(&self, name: &str) -> Option<&F> {
    self.tables.last()?.get(name)
  }

  pub fn local_mut(&mut self, name: &str) -> Option<&mut F> {
    self.tables.last_mut()?.get_mut(name)
  }

  /// Register in the innermost scope, replacing any previous entry there.
  pub fn insert(&mut self, name: &str, function: F) {
    if let Some(table) = self.tables.last_mut() {
      table.insert(name.to_string(), function);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn locals_grow_downward_by_slot_size() {
    let mut table = SymbolTable::frame();
    assert_eq!(table.declare("a", Type::Int).map(|v| v.offset), Some(-4));
    assert_eq!(table.declare("c", Type::Char).map(|v| v.offset), Some(-5));
    assert_eq!(table.declare("s", Type::Str).map(|v| v.offset), Some(-9));
    assert_eq!(table.local_size(), 9);
    assert!(table.declare("a", Type::Float).is_none());
  }

  #[test]
  fn parameters_sit_above_the_return_address() {
    let mut table = SymbolTable::frame();
    assert_eq!(table.declare_param("x", Type::Int, 0).map(|v| v.offset), Some(8));
    assert_eq!(table.declare_param("y", Type::Char, 1).map(|v| v.offset), Some(12));
    assert_eq!(table.local_size(), 0);
  }

  #[test]
  fn outer_offsets_include_crossed_frames() {
    let mut stack = TableStack::new();
    stack.push(SymbolTable::frame());
    stack.declare("a", Type::Int);
    stack.declare("c", Type::Char);
    stack.push(SymbolTable::block());
    stack.declare("b", Type::Int);

    assert_eq!(stack.offset("b"), Some(-4));
    // 5 bytes of outer locals + saved ebp, then a's own -4.
    assert_eq!(stack.offset("a"), Some(5));
    assert_eq!(stack.offset("c"), Some(4));
    assert_eq!(stack.offset("missing"), None);
  }

  #[test]
  fn shadowing_ends_with_the_scope() {
    let mut stack = TableStack::new();
    stack.push(SymbolTable::frame());
    stack.declare("x", Type::Int);
    stack.push(SymbolTable::block());
    stack.declare("x", Type::Float);
    assert_eq!(stack.lookup("x").map(|v| v.ty), Some(Type::Float));
    stack.pop();
    assert_eq!(stack.lookup("x").map(|v| v.ty), Some(Type::Int));
    assert_eq!(stack.offset("x"), Some(-4));
  }

  #[test]
  fn lookups_stop_at_frame_roots() {
    let mut stack = TableStack::new();
    stack.push(SymbolTable::frame());
    stack.declare("outer", Type::Int);
    stack.push(SymbolTable::frame());
    stack.push(SymbolTable::block());
    assert!(stack.lookup("outer").is_none());
    assert_eq!(stack.offset("outer"), None);
    assert_eq!(stack.frame_depth(), 2);
  }

  #[test]
  fn function_tables_shadow_and_scope() {
    let mut functions = FunctionTableStack::new();
    functions.push_scope();
    functions.insert("f", 1);
    functions.push_scope();
    assert_eq!(functions.lookup("f"), Some(&1));
    assert_eq!(functions.local("f"), None);
    functions.insert("f", 2);
    assert_eq!(functions.lookup("f"), Some(&2));
    functions.pop_scope();
    assert_eq!(functions.lookup("f"), Some(&1));
  }
}
