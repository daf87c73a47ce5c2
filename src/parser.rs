//! Recursive-descent parser producing the scope/statement tree.
//!
//! Names and types are bound while parsing: every `{` opens a fresh symbol
//! table and every `}` discards it, so an identifier can only be resolved
//! while its declaring scope is open. Numeric expressions follow the usual
//! precedence climb (expression, term, factor) and carry a float flag that
//! spreads upward from any float operand.

use tracing::{debug, trace};

use crate::ast::{
  AddOp, CharExpression, Expression, FactorValue, FunctionCall, FunctionDeclaration, MulOp,
  NumExpression, NumFactor, NumTerm, Parameter, Scope, Statement, StringExpression,
};
use crate::error::{
  AlreadyInUseSnafu, ArgumentCountSnafu, ArgumentTypeSnafu, FloatExitSnafu, FloatModuloSnafu,
  InvalidMainSnafu, NarrowingSnafu, ParseResult, RedefinitionSnafu, ReturnInVoidSnafu,
  ReturnOutsideFunctionSnafu, SignatureMismatchSnafu, TypeMismatchSnafu, UnexpectedEofSnafu,
  UnexpectedTokenSnafu, UnknownFunctionSnafu, UnknownIdentifierSnafu, UnterminatedScopeSnafu,
  VoidValueSnafu, VoidVariableSnafu,
};
use crate::literal::{LiteralKind, LiteralTable};
use crate::scope::{FunctionTableStack, SymbolTable, TableStack};
use crate::tokenizer::{Token, TokenKind};
use crate::ty::Type;

/// Parsed program: the outermost scope plus every literal it mentions.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub body: Scope,
  pub literals: LiteralTable,
}

/// What the parser remembers about a declared function.
#[derive(Debug, Clone)]
struct Signature {
  /// Bodyless copy of the first declaration seen.
  prototype: FunctionDeclaration,
  defined: bool,
}

impl Signature {
  fn return_type(&self) -> Type {
    self.prototype.return_type
  }

  fn params(&self) -> &[Parameter] {
    &self.prototype.params
  }
}

/// Binding state threaded through every parse routine.
struct ParseContext {
  tables: TableStack,
  functions: FunctionTableStack<Signature>,
  literals: LiteralTable,
  /// Enclosing function bodies, innermost last.
  returns: Vec<(String, Type)>,
}

impl ParseContext {
  fn new() -> Self {
    Self {
      tables: TableStack::new(),
      functions: FunctionTableStack::new(),
      literals: LiteralTable::new(),
      returns: Vec::new(),
    }
  }

  fn enter_scope(&mut self, table: SymbolTable) {
    self.tables.push(table);
    self.functions.push_scope();
  }

  fn leave_scope(&mut self) {
    self.tables.pop();
    self.functions.pop_scope();
  }
}

/// Parse a whole token stream into a program.
pub fn parse_program(tokens: Vec<Token>) -> ParseResult<Program> {
  let mut stream = TokenStream::new(tokens);
  let mut ctx = ParseContext::new();

  ctx.enter_scope(SymbolTable::frame());
  let mut body = Scope::new(None);
  while !stream.is_eof() {
    body.statements.push(parse_statement(&mut stream, &mut ctx)?);
  }
  ctx.leave_scope();

  debug!(
    statements = body.statements.len(),
    literals = ctx.literals.len(),
    "parsed program"
  );
  Ok(Program {
    body,
    literals: ctx.literals,
  })
}

fn parse_statement(stream: &mut TokenStream, ctx: &mut ParseContext) -> ParseResult<Statement> {
  let Some(kind) = stream.peek_kind() else {
    return stream.unexpected("statement");
  };

  match kind {
    TokenKind::OpenBrace => parse_scope(stream, ctx, None).map(Statement::Scope),
    TokenKind::Type if stream.peek_kind_at(2) == Some(TokenKind::OpenParen) => {
      parse_function_declaration(stream, ctx).map(Statement::FunctionDeclaration)
    }
    TokenKind::Type => parse_declaration(stream, ctx),
    TokenKind::Identifier if stream.peek_kind_at(1) == Some(TokenKind::OpenParen) => {
      let (call, _) = parse_call(stream, ctx)?;
      stream.expect(TokenKind::Semicolon, "';'")?;
      Ok(Statement::FunctionCall(call))
    }
    TokenKind::Identifier => parse_reassignment(stream, ctx),
    TokenKind::Print => parse_print(stream, ctx),
    TokenKind::Exit => parse_exit(stream, ctx),
    TokenKind::Return => parse_return(stream, ctx),
    _ => stream.unexpected("statement"),
  }
}

/// `'{' Statement* '}'`. A function body pre-binds its parameters in a new
/// frame so outer locals stay out of reach.
fn parse_scope(
  stream: &mut TokenStream,
  ctx: &mut ParseContext,
  function: Option<(&str, &[Parameter])>,
) -> ParseResult<Scope> {
  let open = stream.expect(TokenKind::OpenBrace, "'{'")?;

  let table = match function {
    Some((_, params)) => {
      let mut table = SymbolTable::frame();
      for (index, param) in params.iter().enumerate() {
        table.declare_param(&param.name, param.ty, index);
      }
      table
    }
    None => SymbolTable::block(),
  };
  ctx.enter_scope(table);

  let mut scope = Scope::new(function.map(|(name, _)| name.to_string()));
  loop {
    match stream.peek_kind() {
      None => {
        return UnterminatedScopeSnafu {
          line: open.line,
          col: open.col,
        }
        .fail();
      }
      Some(TokenKind::CloseBrace) => {
        stream.advance();
        break;
      }
      Some(_) => scope.statements.push(parse_statement(stream, ctx)?),
    }
  }

  ctx.leave_scope();
  Ok(scope)
}

/// `TYPE IDENT '=' Expr ';'`
fn parse_declaration(stream: &mut TokenStream, ctx: &mut ParseContext) -> ParseResult<Statement> {
  let type_token = stream.expect(TokenKind::Type, "data type")?;
  let ty = type_of(&type_token)?;
  let name = stream.expect(TokenKind::Identifier, "identifier")?;

  if ty == Type::Void {
    return VoidVariableSnafu {
      name: &name.text,
      line: name.line,
      col: name.col,
    }
    .fail();
  }

  stream.expect(TokenKind::Equals, "'='")?;
  let value = parse_value(stream, ctx, ty, &type_token)?;
  stream.expect(TokenKind::Semicolon, "';'")?;

  if ctx.tables.declare(&name.text, ty).is_none() {
    return AlreadyInUseSnafu {
      name: &name.text,
      line: name.line,
      col: name.col,
    }
    .fail();
  }
  trace!(name = %name.text, %ty, "declared variable");

  Ok(Statement::Declaration {
    ty,
    name: name.text,
    value,
  })
}

/// `IDENT '=' Expr ';'`, typed by the identifier's declaration.
fn parse_reassignment(stream: &mut TokenStream, ctx: &mut ParseContext) -> ParseResult<Statement> {
  let name = stream.expect(TokenKind::Identifier, "identifier")?;
  stream.expect(TokenKind::Equals, "'='")?;

  let Some(info) = ctx.tables.lookup(&name.text) else {
    return UnknownIdentifierSnafu {
      name: &name.text,
      line: name.line,
      col: name.col,
    }
    .fail();
  };
  let ty = info.ty;

  let value = parse_value(stream, ctx, ty, &name)?;
  stream.expect(TokenKind::Semicolon, "';'")?;

  Ok(Statement::Reassignment {
    name: name.text,
    value,
  })
}

/// `TYPE IDENT '(' Params? ')' ( ';' | Scope )`
fn parse_function_declaration(
  stream: &mut TokenStream,
  ctx: &mut ParseContext,
) -> ParseResult<FunctionDeclaration> {
  let type_token = stream.expect(TokenKind::Type, "return type")?;
  let return_type = type_of(&type_token)?;
  let name = stream.expect(TokenKind::Identifier, "function name")?;
  stream.expect(TokenKind::OpenParen, "'('")?;
  let params = parse_params(stream)?;

  let top_level = ctx.tables.depth() == 1;
  if top_level
    && name.text == "main"
    && (!params.is_empty() || !matches!(return_type, Type::Int | Type::Char | Type::Void))
  {
    return InvalidMainSnafu {
      line: name.line,
      col: name.col,
    }
    .fail();
  }

  let has_body = stream.peek_kind() == Some(TokenKind::OpenBrace);
  if !has_body {
    stream.expect(TokenKind::Semicolon, "';' or '{'")?;
  }

  match ctx.functions.local_mut(&name.text) {
    Some(existing) => {
      if !existing.prototype.same_signature(return_type, &params) {
        return SignatureMismatchSnafu {
          name: &name.text,
          line: name.line,
          col: name.col,
        }
        .fail();
      }
      if has_body && existing.defined {
        return RedefinitionSnafu {
          name: &name.text,
          line: name.line,
          col: name.col,
        }
        .fail();
      }
      existing.defined |= has_body;
    }
    None => ctx.functions.insert(
      &name.text,
      Signature {
        prototype: FunctionDeclaration {
          name: name.text.clone(),
          return_type,
          params: params.clone(),
          body: None,
        },
        defined: has_body,
      },
    ),
  }

  let body = if has_body {
    ctx.returns.push((name.text.clone(), return_type));
    let body = parse_scope(stream, ctx, Some((name.text.as_str(), params.as_slice())))?;
    ctx.returns.pop();
    debug!(function = %name.text, statements = body.statements.len(), "parsed function body");
    Some(body)
  } else {
    trace!(function = %name.text, "registered prototype");
    None
  };

  Ok(FunctionDeclaration {
    name: name.text,
    return_type,
    params,
    body,
  })
}

/// Parameter list after the opening parenthesis, consuming the closing one.
fn parse_params(stream: &mut TokenStream) -> ParseResult<Vec<Parameter>> {
  let mut params: Vec<Parameter> = Vec::new();
  if stream.equal(TokenKind::CloseParen) {
    return Ok(params);
  }

  loop {
    let type_token = stream.expect(TokenKind::Type, "parameter type")?;
    let ty = type_of(&type_token)?;
    let name = stream.expect(TokenKind::Identifier, "parameter name")?;

    if ty == Type::Void {
      return VoidVariableSnafu {
        name: &name.text,
        line: name.line,
        col: name.col,
      }
      .fail();
    }
    if params.iter().any(|param| param.name == name.text) {
      return AlreadyInUseSnafu {
        name: &name.text,
        line: name.line,
        col: name.col,
      }
      .fail();
    }
    params.push(Parameter {
      ty,
      name: name.text,
    });

    if stream.equal(TokenKind::Comma) {
      continue;
    }
    stream.expect(TokenKind::CloseParen, "',' or ')'")?;
    return Ok(params);
  }
}

/// `IDENT '(' Args? ')'`, checked against the callee's signature. Returns
/// the call and the callee's return type.
fn parse_call(
  stream: &mut TokenStream,
  ctx: &mut ParseContext,
) -> ParseResult<(FunctionCall, Type)> {
  let name = stream.expect(TokenKind::Identifier, "function name")?;
  stream.expect(TokenKind::OpenParen, "'('")?;

  let Some(signature) = ctx.functions.lookup(&name.text).cloned() else {
    return UnknownFunctionSnafu {
      name: &name.text,
      line: name.line,
      col: name.col,
    }
    .fail();
  };

  let mut args = Vec::new();
  if !stream.equal(TokenKind::CloseParen) {
    loop {
      let index = args.len();
      let arg = match signature.params().get(index) {
        Some(param) => parse_argument(stream, ctx, &name.text, index, param.ty)?,
        // Surplus arguments are still parsed so the count error reports them all.
        None => parse_untyped_argument(stream, ctx)?,
      };
      args.push(arg);

      if stream.equal(TokenKind::Comma) {
        continue;
      }
      stream.expect(TokenKind::CloseParen, "',' or ')'")?;
      break;
    }
  }

  if args.len() != signature.params().len() {
    return ArgumentCountSnafu {
      name: &name.text,
      expected: signature.params().len(),
      found: args.len(),
      line: name.line,
      col: name.col,
    }
    .fail();
  }

  Ok((
    FunctionCall {
      name: name.text,
      args,
    },
    signature.return_type(),
  ))
}

fn parse_argument(
  stream: &mut TokenStream,
  ctx: &mut ParseContext,
  callee: &str,
  index: usize,
  expected: Type,
) -> ParseResult<Expression> {
  let (line, col) = stream.position();
  let mismatch = |found: &str| {
    ArgumentTypeSnafu {
      name: callee,
      index,
      expected,
      found,
      line,
      col,
    }
    .fail()
  };

  check_leading_name(stream, ctx)?;
  let starts_string = starts_string_expression(stream, ctx);
  match expected {
    Type::Str if starts_string => Ok(Expression::Str(parse_string_expression(stream, ctx)?)),
    Type::Str => mismatch("a numeric expression"),
    _ if starts_string => mismatch("a string"),
    Type::Float => Ok(Expression::Num(parse_num_expression(stream, ctx)?)),
    Type::Int | Type::Char => {
      let expr = parse_num_expression(stream, ctx)?;
      if expr.is_float() {
        return mismatch("a float expression");
      }
      Ok(if expected == Type::Char {
        Expression::Char(CharExpression(expr))
      } else {
        Expression::Num(expr)
      })
    }
    Type::Void => mismatch("a value"),
  }
}

fn parse_untyped_argument(
  stream: &mut TokenStream,
  ctx: &mut ParseContext,
) -> ParseResult<Expression> {
  if starts_string_expression(stream, ctx) {
    Ok(Expression::Str(parse_string_expression(stream, ctx)?))
  } else {
    Ok(Expression::Num(parse_num_expression(stream, ctx)?))
  }
}

/// An argument is classified by the name it starts with, so that name has
/// to resolve first.
fn check_leading_name(stream: &TokenStream, ctx: &ParseContext) -> ParseResult<()> {
  let Some(token) = stream.peek().filter(|t| t.kind == TokenKind::Identifier) else {
    return Ok(());
  };
  if stream.peek_kind_at(1) == Some(TokenKind::OpenParen) {
    if ctx.functions.lookup(&token.text).is_none() {
      return UnknownFunctionSnafu {
        name: &token.text,
        line: token.line,
        col: token.col,
      }
      .fail();
    }
  } else if ctx.tables.lookup(&token.text).is_none() {
    return UnknownIdentifierSnafu {
      name: &token.text,
      line: token.line,
      col: token.col,
    }
    .fail();
  }
  Ok(())
}

/// Whether the upcoming tokens start a string-valued expression.
fn starts_string_expression(stream: &TokenStream, ctx: &ParseContext) -> bool {
  let Some(token) = stream.peek() else {
    return false;
  };
  match token.kind {
    TokenKind::StrLiteral => true,
    TokenKind::Identifier if stream.peek_kind_at(1) == Some(TokenKind::OpenParen) => ctx
      .functions
      .lookup(&token.text)
      .is_some_and(|sig| sig.return_type() == Type::Str),
    TokenKind::Identifier => ctx
      .tables
      .lookup(&token.text)
      .is_some_and(|info| info.ty == Type::Str),
    _ => false,
  }
}

/// Parse the right-hand side for a slot of type `target`, applying the
/// widening-only coercion rule. `anchor` locates narrowing errors.
fn parse_value(
  stream: &mut TokenStream,
  ctx: &mut ParseContext,
  target: Type,
  anchor: &Token,
) -> ParseResult<Expression> {
  match target {
    Type::Str => Ok(Expression::Str(parse_string_expression(stream, ctx)?)),
    Type::Float => Ok(Expression::Num(parse_num_expression(stream, ctx)?)),
    Type::Int | Type::Char => {
      let expr = parse_num_expression(stream, ctx)?;
      if !target.accepts_numeric(expr.is_float()) {
        return NarrowingSnafu {
          target,
          line: anchor.line,
          col: anchor.col,
        }
        .fail();
      }
      Ok(if target == Type::Char {
        Expression::Char(CharExpression(expr))
      } else {
        Expression::Num(expr)
      })
    }
    Type::Void => VoidVariableSnafu {
      name: &anchor.text,
      line: anchor.line,
      col: anchor.col,
    }
    .fail(),
  }
}

/// `'print' StringExpression ';'`
fn parse_print(stream: &mut TokenStream, ctx: &mut ParseContext) -> ParseResult<Statement> {
  stream.expect(TokenKind::Print, "'print'")?;
  let expr = parse_string_expression(stream, ctx)?;
  stream.expect(TokenKind::Semicolon, "';'")?;
  Ok(Statement::Print(expr))
}

/// `'exit' NumExpression ';'` with a non-float exit code.
fn parse_exit(stream: &mut TokenStream, ctx: &mut ParseContext) -> ParseResult<Statement> {
  let keyword = stream.expect(TokenKind::Exit, "'exit'")?;
  let expr = parse_num_expression(stream, ctx)?;
  if expr.is_float() {
    return FloatExitSnafu {
      line: keyword.line,
      col: keyword.col,
    }
    .fail();
  }
  stream.expect(TokenKind::Semicolon, "';'")?;
  Ok(Statement::Exit(expr))
}

/// `'return' Expr ';'`, typed by the enclosing function.
fn parse_return(stream: &mut TokenStream, ctx: &mut ParseContext) -> ParseResult<Statement> {
  let keyword = stream.expect(TokenKind::Return, "'return'")?;

  let Some((function, return_type)) = ctx.returns.last().cloned() else {
    return ReturnOutsideFunctionSnafu {
      line: keyword.line,
      col: keyword.col,
    }
    .fail();
  };
  if return_type == Type::Void {
    return ReturnInVoidSnafu {
      name: function,
      line: keyword.line,
      col: keyword.col,
    }
    .fail();
  }

  let value = parse_value(stream, ctx, return_type, &keyword)?;
  stream.expect(TokenKind::Semicolon, "';'")?;
  Ok(Statement::Return(value))
}

/// `NumTerm (('+'|'-') NumTerm)*`
fn parse_num_expression(
  stream: &mut TokenStream,
  ctx: &mut ParseContext,
) -> ParseResult<NumExpression> {
  let mut expr = NumExpression::Term(parse_num_term(stream, ctx)?);

  loop {
    let op = match stream.peek_kind() {
      Some(TokenKind::Plus) => AddOp::Add,
      Some(TokenKind::Minus) => AddOp::Sub,
      _ => break,
    };
    stream.advance();
    let rhs = parse_num_term(stream, ctx)?;
    expr = NumExpression::binary(op, expr, rhs);
  }

  Ok(expr)
}

/// `NumFactor (('*'|'/'|'%') NumFactor)*`
fn parse_num_term(stream: &mut TokenStream, ctx: &mut ParseContext) -> ParseResult<NumTerm> {
  let mut term = NumTerm::Factor(parse_num_factor(stream, ctx)?);

  loop {
    let op = match stream.peek_kind() {
      Some(TokenKind::Times) => MulOp::Mul,
      Some(TokenKind::Division) => MulOp::Div,
      Some(TokenKind::Mod) => MulOp::Mod,
      _ => break,
    };
    let (line, col) = stream.position();
    stream.advance();
    let rhs = parse_num_factor(stream, ctx)?;

    if op == MulOp::Mod && (term.is_float() || rhs.is_float) {
      return FloatModuloSnafu { line, col }.fail();
    }
    term = NumTerm::binary(op, term, rhs);
  }

  Ok(term)
}

/// Int literal magnitude. `2147483648` is only representable negated.
fn int_literal_value(text: &str, negative: bool) -> Option<u32> {
  let value = text.parse::<u32>().ok()?;
  let limit = if negative { i32::MAX as u32 + 1 } else { i32::MAX as u32 };
  (value <= limit).then_some(value)
}

/// `'-'? (INT | FLOAT | CHAR | IDENT | Call | '(' NumExpression ')')`
fn parse_num_factor(stream: &mut TokenStream, ctx: &mut ParseContext) -> ParseResult<NumFactor> {
  let negative = stream.equal(TokenKind::Minus);
  let Some(token) = stream.peek().cloned() else {
    return stream.unexpected("numeric factor");
  };

  let (value, is_float) = match token.kind {
    TokenKind::IntLiteral => {
      stream.advance();
      let Some(value) = int_literal_value(&token.text, negative) else {
        return UnexpectedTokenSnafu {
          expected: "32-bit integer",
          found: &token.text,
          line: token.line,
          col: token.col,
        }
        .fail();
      };
      (FactorValue::Int(value), false)
    }
    TokenKind::FloatLiteral => {
      stream.advance();
      ctx.literals.intern(&token.text, LiteralKind::Float);
      (FactorValue::Float(token.text), true)
    }
    TokenKind::CharLiteral => {
      stream.advance();
      let byte = token.text.bytes().next().unwrap_or(0);
      (FactorValue::Char(byte), false)
    }
    TokenKind::Identifier if stream.peek_kind_at(1) == Some(TokenKind::OpenParen) => {
      let (call, return_type) = parse_call(stream, ctx)?;
      match return_type {
        Type::Void => {
          return VoidValueSnafu {
            name: &token.text,
            line: token.line,
            col: token.col,
          }
          .fail();
        }
        Type::Str => {
          return TypeMismatchSnafu {
            expected: "numeric",
            found: format!("call to str function '{}'", token.text),
            line: token.line,
            col: token.col,
          }
          .fail();
        }
        ty => (FactorValue::Call(call), ty == Type::Float),
      }
    }
    TokenKind::Identifier => {
      stream.advance();
      let Some(info) = ctx.tables.lookup(&token.text) else {
        return UnknownIdentifierSnafu {
          name: &token.text,
          line: token.line,
          col: token.col,
        }
        .fail();
      };
      if !info.ty.is_numeric() {
        return TypeMismatchSnafu {
          expected: "numeric",
          found: format!("{} identifier '{}'", info.ty, token.text),
          line: token.line,
          col: token.col,
        }
        .fail();
      }
      let is_float = info.ty == Type::Float;
      (FactorValue::Identifier(token.text), is_float)
    }
    TokenKind::OpenParen => {
      stream.advance();
      let inner = parse_num_expression(stream, ctx)?;
      stream.expect(TokenKind::CloseParen, "')'")?;
      let is_float = inner.is_float();
      (FactorValue::Group(Box::new(inner)), is_float)
    }
    TokenKind::StrLiteral => {
      return TypeMismatchSnafu {
        expected: "numeric",
        found: "string literal",
        line: token.line,
        col: token.col,
      }
      .fail();
    }
    _ => return stream.unexpected("literal, identifier, or '('"),
  };

  Ok(NumFactor {
    value,
    negative,
    is_float,
  })
}

/// `STR | IDENT | Call`, all of type `str`.
fn parse_string_expression(
  stream: &mut TokenStream,
  ctx: &mut ParseContext,
) -> ParseResult<StringExpression> {
  let Some(token) = stream.peek().cloned() else {
    return stream.unexpected("string literal or identifier");
  };

  match token.kind {
    TokenKind::StrLiteral => {
      stream.advance();
      ctx.literals.intern(&token.text, LiteralKind::Str);
      Ok(StringExpression::Literal(token.text))
    }
    TokenKind::Identifier if stream.peek_kind_at(1) == Some(TokenKind::OpenParen) => {
      let (call, return_type) = parse_call(stream, ctx)?;
      match return_type {
        Type::Str => Ok(StringExpression::Call(call)),
        Type::Void => VoidValueSnafu {
          name: &token.text,
          line: token.line,
          col: token.col,
        }
        .fail(),
        ty => TypeMismatchSnafu {
          expected: "str",
          found: format!("call to {ty} function '{}'", token.text),
          line: token.line,
          col: token.col,
        }
        .fail(),
      }
    }
    TokenKind::Identifier => {
      stream.advance();
      match ctx.tables.lookup(&token.text).map(|info| info.ty) {
        Some(Type::Str) => Ok(StringExpression::Identifier(token.text)),
        Some(ty) => TypeMismatchSnafu {
          expected: "str",
          found: format!("{ty} identifier '{}'", token.text),
          line: token.line,
          col: token.col,
        }
        .fail(),
        None => UnknownIdentifierSnafu {
          name: &token.text,
          line: token.line,
          col: token.col,
        }
        .fail(),
      }
    }
    _ => stream.unexpected("string literal or identifier"),
  }
}

fn type_of(token: &Token) -> ParseResult<Type> {
  match Type::from_keyword(&token.text) {
    Some(ty) => Ok(ty),
    None => UnexpectedTokenSnafu {
      expected: "data type",
      found: &token.text,
      line: token.line,
      col: token.col,
    }
    .fail(),
  }
}

/// Cursor over the token vector.
struct TokenStream {
  tokens: Vec<Token>,
  pos: usize,
}

impl TokenStream {
  fn new(tokens: Vec<Token>) -> Self {
    Self { tokens, pos: 0 }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn peek_kind(&self) -> Option<TokenKind> {
    self.peek_kind_at(0)
  }

  fn peek_kind_at(&self, ahead: usize) -> Option<TokenKind> {
    self.tokens.get(self.pos + ahead).map(|token| token.kind)
  }

  fn advance(&mut self) {
    if self.pos < self.tokens.len() {
      self.pos += 1;
    }
  }

  fn is_eof(&self) -> bool {
    self.pos >= self.tokens.len()
  }

  /// Position of the current token, or of the last one at EOF.
  fn position(&self) -> (usize, usize) {
    self
      .peek()
      .or_else(|| self.tokens.last())
      .map_or((1, 1), |token| (token.line, token.col))
  }

  /// Consume the current token if it has the given kind.
  fn equal(&mut self, kind: TokenKind) -> bool {
    if self.peek_kind() == Some(kind) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
    if self.peek_kind() == Some(kind) {
      let token = self.tokens[self.pos].clone();
      self.pos += 1;
      return Ok(token);
    }
    self.unexpected(expected)
  }

  /// Error describing whatever sits at the cursor.
  fn unexpected<T>(&self, expected: &str) -> ParseResult<T> {
    let (line, col) = self.position();
    match self.peek() {
      Some(token) => UnexpectedTokenSnafu {
        expected,
        found: &token.text,
        line,
        col,
      }
      .fail(),
      None => UnexpectedEofSnafu {
        expected,
        line,
        col,
      }
      .fail(),
    }
  }
}
