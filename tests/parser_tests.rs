use nexc::ast::{Expression, FactorValue, NumExpression, NumFactor, NumTerm, Scope, Statement};
use nexc::literal::LiteralKind;
use nexc::ty::Type;
use nexc::{ParseError, Program, parse_program, tokenize};

fn parse(source: &str) -> Program {
  let tokens = tokenize(source).expect("lex should succeed");
  parse_program(tokens).expect("parse should succeed")
}

fn parse_err(source: &str) -> ParseError {
  let tokens = tokenize(source).expect("lex should succeed");
  parse_program(tokens).expect_err("parse should fail")
}

fn leaf(value: FactorValue, is_float: bool) -> NumExpression {
  NumExpression::Term(NumTerm::Factor(NumFactor {
    value,
    negative: false,
    is_float,
  }))
}

/// Float flag of the value declared as `name` at the top level.
fn declared_float_flag(program: &Program, name: &str) -> bool {
  program
    .body
    .statements
    .iter()
    .find_map(|stmt| match stmt {
      Statement::Declaration {
        name: declared,
        value: Expression::Num(expr),
        ..
      } if declared == name => Some(expr.is_float()),
      _ => None,
    })
    .expect("numeric declaration")
}

#[test]
fn parses_declaration_and_exit() {
  let program = parse("int x = 5; exit x;");
  let expected = Scope {
    statements: vec![
      Statement::Declaration {
        ty: Type::Int,
        name: "x".into(),
        value: Expression::Num(leaf(FactorValue::Int(5), false)),
      },
      Statement::Exit(leaf(FactorValue::Identifier("x".into()), false)),
    ],
    function: None,
  };
  assert_eq!(program.body, expected);
  assert!(program.literals.is_empty());
}

#[test]
fn multiplication_binds_tighter_than_addition() {
  let program = parse("int x = 1 + 2 * 3;");
  let Statement::Declaration {
    value: Expression::Num(NumExpression::Binary { lhs, rhs, .. }),
    ..
  } = &program.body.statements[0]
  else {
    panic!("expected a binary declaration");
  };
  assert_eq!(**lhs, leaf(FactorValue::Int(1), false));
  assert!(matches!(rhs, NumTerm::Binary { .. }));
}

#[test]
fn float_flag_spreads_from_any_float_leaf() {
  let program = parse(
    "float a = 1.0; int b = 2; float c = b * 3 + a; float d = b + 1; float e = (b - 1) * 2.5;",
  );
  assert!(declared_float_flag(&program, "c"));
  assert!(!declared_float_flag(&program, "d"));
  assert!(declared_float_flag(&program, "e"));
}

#[test]
fn narrowing_float_into_int_is_rejected() {
  let err = parse_err("int z = 1.5 + 2;");
  assert!(matches!(
    err,
    ParseError::Narrowing {
      target: Type::Int,
      line: 1,
      col: 1
    }
  ));
}

#[test]
fn narrowing_rejected_on_reassignment_and_return() {
  assert!(matches!(
    parse_err("char c = 'a'; c = 2.0;"),
    ParseError::Narrowing {
      target: Type::Char,
      ..
    }
  ));
  assert!(matches!(
    parse_err("int f() { return 0.5; }"),
    ParseError::Narrowing { .. }
  ));
}

#[test]
fn int_widens_into_float() {
  parse("int i = 3; char c = 'x'; float f = i + c; f = 7;");
}

#[test]
fn redeclaration_in_same_scope_is_rejected() {
  let err = parse_err("int x = 1; int x = 2;");
  assert!(matches!(err, ParseError::AlreadyInUse { ref name, col: 16, .. } if name == "x"));
  assert!(err.to_string().contains("identifier 'x' already in use"));
}

#[test]
fn inner_scope_may_shadow_outer_names() {
  let program = parse("int x = 1; { float x = 2.5; x = 3.5; } int y = x;");
  assert_eq!(program.body.statements.len(), 3);
}

#[test]
fn names_die_with_their_scope() {
  let err = parse_err("int x = 1; { int inner = 2; } int y = inner;");
  assert!(matches!(err, ParseError::UnknownIdentifier { ref name, .. } if name == "inner"));
}

#[test]
fn function_bodies_cannot_see_outer_locals() {
  let err = parse_err("int x = 1; int f() { return x; }");
  assert!(matches!(err, ParseError::UnknownIdentifier { .. }));
}

#[test]
fn surplus_arguments_are_counted() {
  let err = parse_err("int f(int a) { return a; } f(1, 2);");
  assert!(matches!(
    err,
    ParseError::ArgumentCount {
      expected: 1,
      found: 2,
      ..
    }
  ));
}

#[test]
fn argument_types_follow_the_parameters() {
  assert!(matches!(
    parse_err("int f(int a) { return a; } int x = f(1.5);"),
    ParseError::ArgumentType {
      index: 0,
      expected: Type::Int,
      ..
    }
  ));
  assert!(matches!(
    parse_err("void p(str s) { print s; } p(3);"),
    ParseError::ArgumentType {
      expected: Type::Str,
      ..
    }
  ));
}

#[test]
fn prototype_then_matching_body() {
  let program = parse("int f(int a); int g() { return f(2); } int f(int b) { return b * 2; }");
  let bodies = program
    .body
    .statements
    .iter()
    .filter(|stmt| matches!(stmt, Statement::FunctionDeclaration(decl) if decl.body.is_some()))
    .count();
  assert_eq!(bodies, 2);
}

#[test]
fn body_must_match_prototype() {
  assert!(matches!(
    parse_err("int f(int a); float f(int a) { return 1.0; }"),
    ParseError::SignatureMismatch { .. }
  ));
  assert!(matches!(
    parse_err("int f(int a); int f(char a) { return a; }"),
    ParseError::SignatureMismatch { .. }
  ));
}

#[test]
fn second_body_is_a_redefinition() {
  let err = parse_err("int f() { return 1; } int f() { return 2; }");
  assert!(matches!(err, ParseError::Redefinition { ref name, .. } if name == "f"));
}

#[test]
fn functions_may_recurse() {
  parse("int f(int n) { return f(n - 1); }");
}

#[test]
fn return_placement_is_checked() {
  assert!(matches!(
    parse_err("return 1;"),
    ParseError::ReturnOutsideFunction { line: 1, col: 1 }
  ));
  assert!(matches!(
    parse_err("void f() { return 1; }"),
    ParseError::ReturnInVoid { .. }
  ));
  assert!(matches!(
    parse_err("int f() { return 1; } { return 2; }"),
    ParseError::ReturnOutsideFunction { .. }
  ));
}

#[test]
fn void_values_and_variables_are_rejected() {
  assert!(matches!(
    parse_err("void f() { } int x = f();"),
    ParseError::VoidValue { .. }
  ));
  assert!(matches!(
    parse_err("void v = 1;"),
    ParseError::VoidVariable { .. }
  ));
}

#[test]
fn strings_and_numbers_do_not_mix() {
  assert!(matches!(
    parse_err("str s = \"hi\"; int n = s;"),
    ParseError::TypeMismatch { .. }
  ));
  assert!(matches!(
    parse_err("int n = 1; print n;"),
    ParseError::TypeMismatch { .. }
  ));
  assert!(matches!(
    parse_err("int n = \"text\";"),
    ParseError::TypeMismatch { .. }
  ));
}

#[test]
fn float_modulo_and_float_exit_are_rejected() {
  assert!(matches!(
    parse_err("int x = 5 % 2; float y = 5.0 % 2;"),
    ParseError::FloatModulo { line: 1, col: 30 }
  ));
  assert!(matches!(
    parse_err("exit 1.5;"),
    ParseError::FloatExit { .. }
  ));
}

#[test]
fn main_signature_is_restricted() {
  assert!(matches!(
    parse_err("int main(int a) { return a; }"),
    ParseError::InvalidMain { .. }
  ));
  assert!(matches!(
    parse_err("str main() { return \"x\"; }"),
    ParseError::InvalidMain { .. }
  ));
  parse("{ int main(int a) { return a; } }");
}

#[test]
fn unterminated_scope_points_at_its_brace() {
  let err = parse_err("int a = 1;\n  { int b = 2;");
  assert!(matches!(err, ParseError::UnterminatedScope { line: 2, col: 3 }));
}

#[test]
fn missing_punctuation_is_reported() {
  assert!(matches!(
    parse_err("int x = 1"),
    ParseError::UnexpectedEof { line: 1, col: 9, .. }
  ));
  assert!(matches!(
    parse_err("int x 1;"),
    ParseError::UnexpectedToken { ref found, .. } if found == "1"
  ));
}

#[test]
fn unknown_functions_are_rejected() {
  assert!(matches!(
    parse_err("g();"),
    ParseError::UnknownFunction { ref name, .. } if name == "g"
  ));
}

#[test]
fn unresolved_arguments_are_reported_by_name() {
  assert!(matches!(
    parse_err("void p(str s) { print s; } p(ghost);"),
    ParseError::UnknownIdentifier { ref name, col: 30, .. } if name == "ghost"
  ));
  assert!(matches!(
    parse_err("void p(str s) { print s; } p(make());"),
    ParseError::UnknownFunction { ref name, .. } if name == "make"
  ));
  assert!(matches!(
    parse_err("int f(int a) { return a; } f(ghost);"),
    ParseError::UnknownIdentifier { ref name, .. } if name == "ghost"
  ));
}

#[test]
fn int_literals_stay_in_signed_range() {
  parse("int lo = -2147483648; int hi = 2147483647;");
  assert!(matches!(
    parse_err("int x = 2147483648;"),
    ParseError::UnexpectedToken { ref found, col: 9, .. } if found == "2147483648"
  ));
}

#[test]
fn parse_errors_report_the_offending_token() {
  assert_eq!(parse_err("int x = 1; int x = 2;").position(), (1, 16));
  assert_eq!(parse_err("int a = 1;\nexit b;").position(), (2, 6));
}

#[test]
fn repeated_literals_share_one_entry() {
  let program = parse("print \"hi\"; print \"hi\"; float a = 1.5; float b = 1.5; float c = 2.5;");
  assert_eq!(program.literals.len(), 3);
  assert_eq!(program.literals.label("hi", LiteralKind::Str), Some("lit0"));
  assert_eq!(program.literals.label("1.5", LiteralKind::Float), Some("lit1"));
}
