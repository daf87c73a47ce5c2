//! Syntax tree produced by the parser.
//!
//! The tree only records names, types and literal text. Frame layout,
//! registers and labels are decided by the code generator.

use crate::ty::Type;

/// Additive operators joining `NumTerm`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOp {
  Add,
  Sub,
}

/// Multiplicative operators joining `NumFactor`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulOp {
  Mul,
  Div,
  Mod,
}

/// A lexical block. The program itself is the outermost scope; a function
/// body records the name of the function that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
  pub statements: Vec<Statement>,
  pub function: Option<String>,
}

impl Scope {
  pub fn new(function: Option<String>) -> Self {
    Self {
      statements: Vec::new(),
      function,
    }
  }

  pub fn is_function_body(&self) -> bool {
    self.function.is_some()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
  Declaration {
    ty: Type,
    name: String,
    value: Expression,
  },
  Reassignment {
    name: String,
    value: Expression,
  },
  FunctionDeclaration(FunctionDeclaration),
  FunctionCall(FunctionCall),
  Return(Expression),
  Print(StringExpression),
  Exit(NumExpression),
  Scope(Scope),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
  pub ty: Type,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
  pub name: String,
  pub return_type: Type,
  pub params: Vec<Parameter>,
  /// `None` for a prototype.
  pub body: Option<Scope>,
}

impl FunctionDeclaration {
  /// Return type and ordered parameter types must agree; names may differ.
  pub fn same_signature(&self, return_type: Type, params: &[Parameter]) -> bool {
    self.return_type == return_type
      && self.params.len() == params.len()
      && self.params.iter().zip(params).all(|(a, b)| a.ty == b.ty)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
  pub name: String,
  pub args: Vec<Expression>,
}

/// Right-hand side of a declaration, reassignment, return or argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
  Num(NumExpression),
  Char(CharExpression),
  Str(StringExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumExpression {
  Term(NumTerm),
  Binary {
    op: AddOp,
    lhs: Box<NumExpression>,
    rhs: NumTerm,
    is_float: bool,
  },
}

impl NumExpression {
  pub fn binary(op: AddOp, lhs: NumExpression, rhs: NumTerm) -> Self {
    let is_float = lhs.is_float() || rhs.is_float();
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs,
      is_float,
    }
  }

  pub fn is_float(&self) -> bool {
    match self {
      Self::Term(term) => term.is_float(),
      Self::Binary { is_float, .. } => *is_float,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumTerm {
  Factor(NumFactor),
  Binary {
    op: MulOp,
    lhs: Box<NumTerm>,
    rhs: NumFactor,
    is_float: bool,
  },
}

impl NumTerm {
  pub fn binary(op: MulOp, lhs: NumTerm, rhs: NumFactor) -> Self {
    let is_float = lhs.is_float() || rhs.is_float;
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs,
      is_float,
    }
  }

  pub fn is_float(&self) -> bool {
    match self {
      Self::Factor(factor) => factor.is_float,
      Self::Binary { is_float, .. } => *is_float,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumFactor {
  pub value: FactorValue,
  pub negative: bool,
  pub is_float: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FactorValue {
  Int(u32),
  /// Literal text, as registered in the literal table.
  Float(String),
  Char(u8),
  Identifier(String),
  Group(Box<NumExpression>),
  Call(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringExpression {
  Literal(String),
  Identifier(String),
  Call(FunctionCall),
}

/// Numeric expression stored into a one-byte `char` slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CharExpression(pub NumExpression);
