use nexc::{Error, LexError, ParseError, compile, parse_program, tokenize};

#[test]
fn stage_errors_keep_their_kind() {
  assert!(matches!(
    compile("int x = 1;\n#[ never closed"),
    Err(Error::Lex {
      source: LexError::UnterminatedComment { line: 2, .. }
    })
  ));
  assert!(matches!(
    compile("int z = 1.5 + 2;"),
    Err(Error::Parse {
      source: ParseError::Narrowing { .. }
    })
  ));
  assert!(matches!(
    compile("int f(int a) { return a; } f(1, 2);"),
    Err(Error::Parse {
      source: ParseError::ArgumentCount { .. }
    })
  ));
}

#[test]
fn error_messages_carry_positions() {
  let err = compile("int x = 1;\nint x = 2;").expect_err("x declared twice");
  assert_eq!(
    err.to_string(),
    "parse error at 2:5: identifier 'x' already in use"
  );
}

#[test]
fn front_end_errors_expose_their_position() {
  let err = compile("int x = 1;\nint x = 2;").expect_err("x declared twice");
  assert_eq!(err.position(), Some((2, 5)));
  let err = compile("str s = \"open;").expect_err("unterminated string");
  assert_eq!(err.position(), Some((1, 9)));
}

#[test]
fn repeated_literals_collapse_for_any_count() {
  for count in 1..=5 {
    let mut source = "print \"same\";\n".repeat(count);
    for i in 0..count {
      source.push_str(&format!("float f{i} = 0.25;\n"));
    }
    let asm = compile(&source).expect("compile should succeed");
    assert_eq!(asm.matches("dd 4\n").count(), 1, "count = {count}");
    assert_eq!(asm.matches("; 0.25").count(), 1, "count = {count}");
  }
}

#[test]
fn repeated_float_literals_collapse_across_scopes() {
  let asm = compile("float a = 0.5; { float b = 0.5 * a; } float c = -0.5;")
    .expect("compile should succeed");
  assert_eq!(asm.matches("dd 0x3F000000").count(), 1);
}

#[test]
fn shadowed_names_resolve_outward_after_the_scope() {
  let source = "int x = 1; { char x = 'a'; exit x; } exit x;";
  let asm = compile(source).expect("compile should succeed");
  assert!(asm.contains("movsx ebx, byte [ebp - 1]"));
  assert!(asm.contains("mov ebx, dword [ebp - 4]"));

  let tokens = tokenize("{ int y = 1; } exit y;").expect("lex should succeed");
  assert!(matches!(
    parse_program(tokens),
    Err(ParseError::UnknownIdentifier { .. })
  ));
}

#[test]
fn full_program_compiles() {
  let source = r#"
    # length-prefixed greeting
    str greet(str who) { return who; }
    int square(int n) { return n * n; }
    float scale(float v, int k) { return v * k; }

    #[ main drives everything
       #[ nested note ]# ]#
    int main() {
      print greet("hello\n");
      int s = square(4) - 1;
      float f = scale(1.5, s);
      char c = 'a' + 1;
      {
        int inner = s % 3;
        s = inner + c;
      }
      return s;
    }
  "#;
  let asm = compile(source).expect("compile should succeed");
  for label in ["fn_greet_0:", "fn_square_1:", "fn_scale_2:", "fn_main_3:"] {
    assert!(asm.contains(label), "missing {label}");
  }
  assert!(asm.contains("call fn_main_3"));
  assert!(asm.contains("lit0 dd 6\n"));
}
