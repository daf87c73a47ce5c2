//! Code generation: lower the scope tree into 32-bit NASM assembly.
//!
//! Every scope gets its own frame: `push ebp` / `mov ebp, esp` on entry and
//! the reverse on exit. Locals are pushed as they are declared, so their
//! addresses are recomputed here from a live `TableStack` instead of being
//! carried over from the parser.
//!
//! Each value type has one home register (`ebx` for int, char and string
//! addresses, `xmm0` for float). Binary operators keep the left operand on
//! the machine stack while the right one is evaluated into the same home
//! register, so nesting depth is bounded only by stack space and no value
//! stays live in a register across a call.

use std::mem;

use snafu::ensure;
use tracing::{debug, trace};

use crate::ast::{
  AddOp, CharExpression, Expression, FactorValue, FunctionCall, FunctionDeclaration, MulOp,
  NumExpression, NumFactor, NumTerm, Scope, Statement, StringExpression,
};
use crate::error::{
  ArgumentCountMismatchSnafu, ArgumentTypeMismatchSnafu, CompileResult, DuplicateBodySnafu,
  DuplicateVariableSnafu, InvalidFloatLiteralSnafu, InvalidOperandSnafu, MissingDefinitionSnafu,
  StrayReturnSnafu, UnknownCalleeSnafu, UnknownLiteralSnafu, UnresolvedIdentifierSnafu,
  ValueTypeMismatchSnafu,
};
use crate::literal::{LiteralKind, LiteralTable};
use crate::scope::{FunctionTableStack, SymbolTable, TableStack, VarInfo};
use crate::ty::{PTR_SIZE, Type};

/// Label of the sign-bit mask used to negate floats.
const NEG_MASK: &str = "nmask";

/// Emit the complete assembly file for a parsed program.
pub fn generate_program(body: &Scope, literals: &LiteralTable) -> CompileResult<String> {
  let mut generator = Generator::new(literals);
  generator.program(body)?;

  let mut asm = data_section(literals)?;
  asm.push_str("section .text\n");
  asm.push_str("global _start\n\n");
  asm.push_str("_start:\n");
  asm.push_str(&generator.out);
  asm.push_str(&generator.functions_code);

  debug!(
    literals = literals.len(),
    functions = generator.label_counter,
    bytes = asm.len(),
    "generated assembly"
  );
  Ok(asm)
}

fn data_section(literals: &LiteralTable) -> CompileResult<String> {
  let mut data = String::from("section .data\n");

  for literal in literals.iter() {
    match literal.kind {
      LiteralKind::Float => {
        let Ok(value) = literal.text.parse::<f32>() else {
          return InvalidFloatLiteralSnafu {
            text: &literal.text,
          }
          .fail();
        };
        data.push_str(&format!(
          "{} dd 0x{:08X} ; {}\n",
          literal.label,
          value.to_bits(),
          literal.text
        ));
      }
      LiteralKind::Str => {
        let bytes = literal.text.as_bytes();
        data.push_str(&format!("{} dd {}\n", literal.label, bytes.len()));
        if !bytes.is_empty() {
          let listed: Vec<String> = bytes.iter().map(|b| format!("0x{b:02X}")).collect();
          data.push_str(&format!("    db {}\n", listed.join(", ")));
        }
      }
    }
  }

  data.push_str(&format!("{NEG_MASK} dd 0x80000000\n\n"));
  Ok(data)
}

/// What the generator knows about a function visible in some scope.
#[derive(Debug, Clone)]
struct FunctionInfo {
  label: String,
  return_type: Type,
  params: Vec<Type>,
  defined: bool,
  called: bool,
}

struct Generator<'a> {
  literals: &'a LiteralTable,
  tables: TableStack,
  functions: FunctionTableStack<FunctionInfo>,
  /// Return types of the function bodies being emitted, innermost last.
  returns: Vec<Type>,
  label_counter: usize,
  /// Code of the body currently being emitted.
  out: String,
  /// Finished function bodies, placed after the entry code.
  functions_code: String,
}

impl<'a> Generator<'a> {
  fn new(literals: &'a LiteralTable) -> Self {
    Self {
      literals,
      tables: TableStack::new(),
      functions: FunctionTableStack::new(),
      returns: Vec::new(),
      label_counter: 0,
      out: String::new(),
      functions_code: String::new(),
    }
  }

  fn emit(&mut self, instr: impl AsRef<str>) {
    self.out.push_str("    ");
    self.out.push_str(instr.as_ref());
    self.out.push('\n');
  }

  /// Entry code: top-level statements, then `main` if it has a body, then
  /// the exit syscall with `ebx` as status.
  fn program(&mut self, body: &Scope) -> CompileResult<()> {
    self.open_scope(SymbolTable::frame());
    for stmt in &body.statements {
      self.statement(stmt)?;
    }

    let main = self
      .functions
      .local("main")
      .filter(|info| info.defined)
      .cloned();
    match main {
      Some(main) => {
        ensure!(
          main.params.is_empty(),
          ArgumentCountMismatchSnafu {
            name: "main",
            expected: main.params.len(),
            found: 0usize,
          }
        );
        self.emit(format!("call {}", main.label));
        match main.return_type {
          Type::Int => {}
          Type::Char => self.emit("movsx ebx, bl"),
          _ => self.emit("mov ebx, 0"),
        }
      }
      None => self.emit("mov ebx, 0"),
    }

    self.close_scope()?;
    self.emit("mov eax, 1");
    self.emit("int 0x80");
    Ok(())
  }

  fn open_scope(&mut self, table: SymbolTable) {
    self.emit("push ebp");
    self.emit("mov ebp, esp");
    self.tables.push(table);
    self.functions.push_scope();
  }

  /// Drop the innermost scope. Any function called from it that never got
  /// a body here is an error.
  fn close_scope(&mut self) -> CompileResult<()> {
    self.tables.pop();
    if let Some(functions) = self.functions.pop_scope() {
      let missing = functions
        .iter()
        .filter(|(_, info)| info.called && !info.defined)
        .map(|(name, _)| name)
        .min();
      if let Some(name) = missing {
        return MissingDefinitionSnafu { name }.fail();
      }
    }
    self.emit("mov esp, ebp");
    self.emit("pop ebp");
    Ok(())
  }

  fn scope(&mut self, scope: &Scope, table: SymbolTable) -> CompileResult<()> {
    self.open_scope(table);
    for stmt in &scope.statements {
      self.statement(stmt)?;
    }
    self.close_scope()?;
    if scope.is_function_body() {
      self.emit("ret");
    }
    Ok(())
  }

  fn statement(&mut self, stmt: &Statement) -> CompileResult<()> {
    match stmt {
      Statement::Declaration { ty, name, value } => self.declaration(*ty, name, value),
      Statement::Reassignment { name, value } => self.reassignment(name, value),
      Statement::FunctionDeclaration(decl) => self.function(decl),
      Statement::FunctionCall(call) => self.call(call).map(|_| ()),
      Statement::Return(value) => self.ret(value),
      Statement::Print(expr) => self.print(expr),
      Statement::Exit(expr) => {
        ensure!(
          !expr.is_float(),
          ValueTypeMismatchSnafu {
            expected: Type::Int
          }
        );
        self.int_expr(expr)?;
        self.emit("mov eax, 1");
        self.emit("int 0x80");
        Ok(())
      }
      Statement::Scope(scope) => self.scope(scope, SymbolTable::block()),
    }
  }

  fn declaration(&mut self, ty: Type, name: &str, value: &Expression) -> CompileResult<()> {
    let str_len = self.value(value, ty)?;

    self.emit(format!("sub esp, {}", ty.size()));
    self.store(ty, "[esp]");

    let Some(info) = self.tables.declare(name, ty) else {
      return DuplicateVariableSnafu { name }.fail();
    };
    trace!(name, %ty, offset = info.offset, "allocated local");
    self.set_str_len(name, str_len);
    Ok(())
  }

  fn reassignment(&mut self, name: &str, value: &Expression) -> CompileResult<()> {
    let info = self.var(name)?;
    let str_len = self.value(value, info.ty)?;
    let addr = self.address(name)?;
    self.store(info.ty, &addr);
    self.set_str_len(name, str_len);
    Ok(())
  }

  fn set_str_len(&mut self, name: &str, len: Option<usize>) {
    if let Some(info) = self.tables.lookup_mut(name)
      && info.ty == Type::Str
    {
      info.str_len = len;
    }
  }

  /// Register a prototype or body and emit the body into the function area.
  fn function(&mut self, decl: &FunctionDeclaration) -> CompileResult<()> {
    let has_body = decl.body.is_some();
    let label = match self.functions.local_mut(&decl.name) {
      Some(info) => {
        ensure!(
          !(has_body && info.defined),
          DuplicateBodySnafu { name: &decl.name }
        );
        info.defined |= has_body;
        info.label.clone()
      }
      None => {
        let label = format!("fn_{}_{}", decl.name, self.label_counter);
        self.label_counter += 1;
        trace!(function = %decl.name, %label, "assigned label");
        self.functions.insert(
          &decl.name,
          FunctionInfo {
            label: label.clone(),
            return_type: decl.return_type,
            params: decl.params.iter().map(|param| param.ty).collect(),
            defined: has_body,
            called: false,
          },
        );
        label
      }
    };

    let Some(body) = &decl.body else {
      return Ok(());
    };

    let mut table = SymbolTable::frame();
    for (index, param) in decl.params.iter().enumerate() {
      table.declare_param(&param.name, param.ty, index);
    }

    let caller_code = mem::take(&mut self.out);
    self.out.push_str(&format!("\n{label}:\n"));
    self.returns.push(decl.return_type);
    let result = self.scope(body, table);
    self.returns.pop();
    let body_code = mem::replace(&mut self.out, caller_code);
    result?;

    debug!(function = %decl.name, %label, "emitted function body");
    self.functions_code.push_str(&body_code);
    Ok(())
  }

  /// Push arguments right to left, call, and release them. The result is
  /// left in the home register of the callee's return type.
  fn call(&mut self, call: &FunctionCall) -> CompileResult<Type> {
    let Some(info) = self.functions.lookup(&call.name).cloned() else {
      return UnknownCalleeSnafu { name: &call.name }.fail();
    };
    ensure!(
      call.args.len() == info.params.len(),
      ArgumentCountMismatchSnafu {
        name: &call.name,
        expected: info.params.len(),
        found: call.args.len(),
      }
    );

    for (index, (arg, &ty)) in call.args.iter().zip(&info.params).enumerate().rev() {
      ensure!(
        fits(arg, ty),
        ArgumentTypeMismatchSnafu {
          name: &call.name,
          index,
          expected: ty,
        }
      );
      self.value(arg, ty)?;
      match ty {
        Type::Float => self.spill_float("xmm0"),
        _ => self.emit("push ebx"),
      }
    }

    if let Some(callee) = self.functions.lookup_mut(&call.name) {
      callee.called = true;
    }
    self.emit(format!("call {}", info.label));
    if !call.args.is_empty() {
      self.emit(format!("add esp, {}", PTR_SIZE as usize * call.args.len()));
    }
    if info.return_type == Type::Char {
      self.emit("movsx ebx, bl");
    }
    Ok(info.return_type)
  }

  /// Leave the value in the home register, unwind every frame opened inside
  /// the function, and return to the caller.
  fn ret(&mut self, value: &Expression) -> CompileResult<()> {
    let Some(&return_type) = self.returns.last() else {
      return StrayReturnSnafu.fail();
    };
    self.value(value, return_type)?;
    for _ in 0..self.tables.frame_depth() {
      self.emit("mov esp, ebp");
      self.emit("pop ebp");
    }
    self.emit("ret");
    Ok(())
  }

  /// `write(1, text, len)` on a length-prefixed string.
  fn print(&mut self, expr: &StringExpression) -> CompileResult<()> {
    let len = self.string(expr)?;
    self.emit("mov ecx, ebx");
    match len {
      Some(len) => self.emit(format!("mov edx, {len}")),
      None => self.emit("mov edx, dword [ecx]"),
    }
    self.emit("add ecx, 4");
    self.emit("mov ebx, 1");
    self.emit("mov eax, 4");
    self.emit("int 0x80");
    Ok(())
  }

  /// Evaluate a value for a slot of type `ty` into that type's home
  /// register. Returns the statically known length of a string value.
  fn value(&mut self, value: &Expression, ty: Type) -> CompileResult<Option<usize>> {
    match (ty, value) {
      (Type::Str, Expression::Str(expr)) => self.string(expr),
      (Type::Float, Expression::Num(expr) | Expression::Char(CharExpression(expr))) => {
        self.float_value(expr)?;
        Ok(None)
      }
      (Type::Int | Type::Char, Expression::Num(expr) | Expression::Char(CharExpression(expr)))
        if !expr.is_float() =>
      {
        self.int_expr(expr)?;
        Ok(None)
      }
      _ => ValueTypeMismatchSnafu { expected: ty }.fail(),
    }
  }

  fn store(&mut self, ty: Type, addr: &str) {
    match ty {
      Type::Char => self.emit(format!("mov byte {addr}, bl")),
      Type::Float => self.emit(format!("movss dword {addr}, xmm0")),
      _ => self.emit(format!("mov dword {addr}, ebx")),
    }
  }

  fn var(&self, name: &str) -> CompileResult<VarInfo> {
    match self.tables.lookup(name) {
      Some(info) => Ok(info.clone()),
      None => UnresolvedIdentifierSnafu { name }.fail(),
    }
  }

  /// `[ebp - k]` / `[ebp + k]` relative to the innermost frame.
  fn address(&self, name: &str) -> CompileResult<String> {
    let Some(offset) = self.tables.offset(name) else {
      return UnresolvedIdentifierSnafu { name }.fail();
    };
    Ok(if offset < 0 {
      format!("[ebp - {}]", -offset)
    } else {
      format!("[ebp + {offset}]")
    })
  }

  fn literal_label(&self, text: &str, kind: LiteralKind) -> CompileResult<String> {
    match self.literals.label(text, kind) {
      Some(label) => Ok(label.to_string()),
      None => UnknownLiteralSnafu {
        kind: kind.name(),
        text,
      }
      .fail(),
    }
  }

  /// String address into `ebx`.
  fn string(&mut self, expr: &StringExpression) -> CompileResult<Option<usize>> {
    match expr {
      StringExpression::Literal(text) => {
        let label = self.literal_label(text, LiteralKind::Str)?;
        self.emit(format!("mov ebx, {label}"));
        Ok(Some(text.len()))
      }
      StringExpression::Identifier(name) => {
        let info = self.var(name)?;
        ensure!(
          info.ty == Type::Str,
          InvalidOperandSnafu {
            name,
            ty: info.ty,
            expected: "a string",
          }
        );
        let addr = self.address(name)?;
        self.emit(format!("mov ebx, dword {addr}"));
        Ok(info.str_len)
      }
      StringExpression::Call(call) => {
        let ty = self.call(call)?;
        ensure!(
          ty == Type::Str,
          InvalidOperandSnafu {
            name: &call.name,
            ty,
            expected: "a string",
          }
        );
        Ok(None)
      }
    }
  }

  fn int_expr(&mut self, expr: &NumExpression) -> CompileResult<()> {
    match expr {
      NumExpression::Term(term) => self.int_term(term),
      NumExpression::Binary { op, lhs, rhs, .. } => {
        self.int_expr(lhs)?;
        self.emit("push ecx");
        self.emit("push ebx");
        self.int_term(rhs)?;
        self.emit("pop ecx");
        match op {
          AddOp::Add => self.emit("add ecx, ebx"),
          AddOp::Sub => self.emit("sub ecx, ebx"),
        }
        self.emit("mov ebx, ecx");
        self.emit("pop ecx");
        Ok(())
      }
    }
  }

  fn int_term(&mut self, term: &NumTerm) -> CompileResult<()> {
    match term {
      NumTerm::Factor(factor) => self.int_factor(factor),
      NumTerm::Binary {
        op: MulOp::Mul,
        lhs,
        rhs,
        ..
      } => {
        self.int_term(lhs)?;
        self.emit("push edx");
        self.emit("push ebx");
        self.int_factor(rhs)?;
        self.emit("pop edx");
        self.emit("imul edx, ebx");
        self.emit("mov ebx, edx");
        self.emit("pop edx");
        Ok(())
      }
      NumTerm::Binary { op, lhs, rhs, .. } => {
        self.int_term(lhs)?;
        self.emit("push eax");
        self.emit("push edx");
        self.emit("push ebx");
        self.int_factor(rhs)?;
        self.emit("pop eax");
        self.emit("cdq");
        self.emit("idiv ebx");
        if *op == MulOp::Mod {
          self.emit("mov ebx, edx");
        } else {
          self.emit("mov ebx, eax");
        }
        self.emit("pop edx");
        self.emit("pop eax");
        Ok(())
      }
    }
  }

  fn int_factor(&mut self, factor: &NumFactor) -> CompileResult<()> {
    match &factor.value {
      FactorValue::Int(value) => self.emit(format!("mov ebx, {value}")),
      FactorValue::Char(byte) => self.emit(format!("mov ebx, {byte}")),
      FactorValue::Identifier(name) => {
        let info = self.var(name)?;
        let addr = self.address(name)?;
        match info.ty {
          Type::Int => self.emit(format!("mov ebx, dword {addr}")),
          Type::Char => self.emit(format!("movsx ebx, byte {addr}")),
          ty => {
            return InvalidOperandSnafu {
              name,
              ty,
              expected: "an integer",
            }
            .fail();
          }
        }
      }
      FactorValue::Group(inner) => self.int_expr(inner)?,
      FactorValue::Call(call) => {
        let ty = self.call(call)?;
        ensure!(
          ty.is_integer(),
          InvalidOperandSnafu {
            name: &call.name,
            ty,
            expected: "an integer",
          }
        );
      }
      FactorValue::Float(text) => {
        return InvalidOperandSnafu {
          name: text,
          ty: Type::Float,
          expected: "an integer",
        }
        .fail();
      }
    }

    if factor.negative {
      self.emit("neg ebx");
    }
    Ok(())
  }

  /// Evaluate any numeric expression into `xmm0`, converting once when the
  /// whole expression is integer-valued.
  fn float_value(&mut self, expr: &NumExpression) -> CompileResult<()> {
    if expr.is_float() {
      self.float_expr(expr)
    } else {
      self.int_expr(expr)?;
      self.emit("cvtsi2ss xmm0, ebx");
      Ok(())
    }
  }

  fn spill_float(&mut self, reg: &str) {
    self.emit("sub esp, 4");
    self.emit(format!("movss dword [esp], {reg}"));
  }

  fn restore_float(&mut self, reg: &str) {
    self.emit(format!("movss {reg}, dword [esp]"));
    self.emit("add esp, 4");
  }

  /// Integer-valued leaf evaluated in `ebx` and converted into `xmm0`,
  /// keeping the caller's `ebx`.
  fn converted(&mut self, eval: impl FnOnce(&mut Self) -> CompileResult<()>) -> CompileResult<()> {
    self.emit("push ebx");
    eval(self)?;
    self.emit("cvtsi2ss xmm0, ebx");
    self.emit("pop ebx");
    Ok(())
  }

  /// Float mode reaches every leaf of the tree; integer factors are
  /// converted one at a time.
  fn float_expr(&mut self, expr: &NumExpression) -> CompileResult<()> {
    match expr {
      NumExpression::Term(term) => self.float_term(term),
      NumExpression::Binary { op, lhs, rhs, .. } => {
        self.float_expr(lhs)?;
        self.spill_float("xmm5");
        self.spill_float("xmm0");
        self.float_term(rhs)?;
        self.restore_float("xmm5");
        match op {
          AddOp::Add => self.emit("addss xmm5, xmm0"),
          AddOp::Sub => self.emit("subss xmm5, xmm0"),
        }
        self.emit("movss xmm0, xmm5");
        self.restore_float("xmm5");
        Ok(())
      }
    }
  }

  fn float_term(&mut self, term: &NumTerm) -> CompileResult<()> {
    match term {
      NumTerm::Factor(factor) => self.float_factor(factor),
      NumTerm::Binary { op, lhs, rhs, .. } => {
        let instr = match op {
          MulOp::Mul => "mulss",
          MulOp::Div => "divss",
          // `%` only ever has integer operands.
          MulOp::Mod if !term.is_float() => {
            return self.converted(|this| this.int_term(term));
          }
          MulOp::Mod => {
            return InvalidOperandSnafu {
              name: "%",
              ty: Type::Float,
              expected: "an integer",
            }
            .fail();
          }
        };
        self.float_term(lhs)?;
        self.spill_float("xmm6");
        self.spill_float("xmm0");
        self.float_factor(rhs)?;
        self.restore_float("xmm6");
        self.emit(format!("{instr} xmm6, xmm0"));
        self.emit("movss xmm0, xmm6");
        self.restore_float("xmm6");
        Ok(())
      }
    }
  }

  fn float_factor(&mut self, factor: &NumFactor) -> CompileResult<()> {
    let group = matches!(factor.value, FactorValue::Group(_));
    if !factor.is_float && !group {
      return self.converted(|this| this.int_factor(factor));
    }

    match &factor.value {
      FactorValue::Float(text) => {
        let label = self.literal_label(text, LiteralKind::Float)?;
        self.emit(format!("movss xmm0, dword [{label}]"));
      }
      FactorValue::Identifier(name) => {
        let info = self.var(name)?;
        ensure!(
          info.ty == Type::Float,
          InvalidOperandSnafu {
            name,
            ty: info.ty,
            expected: "a float",
          }
        );
        let addr = self.address(name)?;
        self.emit(format!("movss xmm0, dword {addr}"));
      }
      FactorValue::Group(inner) => self.float_expr(inner)?,
      FactorValue::Call(call) => {
        let ty = self.call(call)?;
        ensure!(
          ty == Type::Float,
          InvalidOperandSnafu {
            name: &call.name,
            ty,
            expected: "a float",
          }
        );
      }
      FactorValue::Int(_) | FactorValue::Char(_) => {
        return self.converted(|this| this.int_factor(factor));
      }
    }

    if factor.negative {
      self.emit(format!("movss xmm7, dword [{NEG_MASK}]"));
      self.emit("xorps xmm0, xmm7");
    }
    Ok(())
  }
}

/// Whether an argument expression can be passed for a parameter of `ty`.
fn fits(arg: &Expression, ty: Type) -> bool {
  match arg {
    Expression::Str(_) => ty == Type::Str,
    Expression::Num(expr) | Expression::Char(CharExpression(expr)) => {
      ty == Type::Float || (ty.is_integer() && !expr.is_float())
    }
  }
}
