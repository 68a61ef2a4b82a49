//! End-to-end runs of complete programs through the public API.

use approx::assert_relative_eq;
use blockscript_core::{diagram, run_source, EngineConfig};

fn run(source: &str) -> String {
    run_source(source, &EngineConfig::default())
}

/// Parse the single number a program printed.
fn printed_number(source: &str) -> f64 {
    let out = run(source);
    out.trim()
        .parse()
        .unwrap_or_else(|_| panic!("expected a number, got {:?}", out))
}

#[test]
fn test_arithmetic() {
    assert_eq!(run("print(1+1)"), "2.0\n");
    assert_eq!(run("print(2*2)"), "4.0\n");
    assert_eq!(run("a = 1+1*3*(5-2*(1-2))\nprint(a)"), "22.0\n");
    assert_eq!(run("print(-3 / 2)"), "-1.5\n");
}

#[test]
fn test_variables() {
    assert_eq!(run("x = 3\nprint(x)"), "3.0\n");
    assert_eq!(run("x = 2; y = x + 1; print(y)"), "3.0\n");
}

#[test]
fn test_undefined_name_is_nan() {
    assert_eq!(run("print(a)"), "nan\n");
}

#[test]
fn test_division_by_zero() {
    assert!(run("1/0").contains("division by zero"));
}

#[test]
fn test_if_chains() {
    assert_eq!(run("if 6 > 5 {\n  print(1)\n}"), "1.0\n");
    assert_eq!(run("if 5 > 6 {\n  print(1)\n}"), "");

    let chain = |x: i32, y: i32| {
        format!(
            "x = {}\ny = {}\nif x == y {{\n  print(1)\n}} else if x + 3 == y {{\n  print(2)\n}} else {{\n  print(3)\n}}",
            x, y
        )
    };
    assert_eq!(run(&chain(8, 8)), "1.0\n");
    assert_eq!(run(&chain(5, 8)), "2.0\n");
    assert_eq!(run(&chain(5, 9)), "3.0\n");
}

#[test]
fn test_functions() {
    assert_eq!(run("def foo() {\n  print(1)\n}\nfoo()"), "1.0\n");
    assert_eq!(run("def foo(x) {\n  print(2 + x * x)\n}\nfoo(2)"), "6.0\n");
    assert_eq!(run("def foo(x, y) {\n  print(x * y)\n}\n\nfoo(3, 5)"), "15.0\n");
    assert_eq!(run("def foo() {\n  return 42\n}\nprint(foo())"), "42.0\n");
}

#[test]
fn test_function_result_is_last_statement() {
    let source = "def avg(a, b) {\n  (a + b) / 2\n}\nprint(avg(4, 10))";
    assert_eq!(run(source), "7.0\n");
    assert_eq!(run("def avg(x,y){ (x+y)/2 } print(avg(5+3, 2*3))"), "7.0\n");
}

#[test]
fn test_recursive_fibonacci() {
    let source = "\
def f(a, b, n) {
  if n > 0 {
    return f(b, a+b, n-1)
  } else {
    return b
  }
}

i = 0
while i < 10 {
  print(f(0, 1, i))
  i = i + 1
}
";
    assert_eq!(
        run(source),
        "1.0\n1.0\n2.0\n3.0\n5.0\n8.0\n13.0\n21.0\n34.0\n55.0\n"
    );
}

#[test]
fn test_while_loop() {
    let source = "i = 0\nwhile i < 10 {\n print(i)\n i = i + 1\n}";
    assert_eq!(run(source), "0.0\n1.0\n2.0\n3.0\n4.0\n5.0\n6.0\n7.0\n8.0\n9.0\n");
}

#[test]
fn test_nested_loops_with_branches() {
    let source = "\
i = 0
while i < 3 {
  j = 0
  while j < 2 {
    if i > 1 {
      print(1, i, j)
    } else {
      print(0, i, j)
    }
    j = j + 1
  }
  i = i + 1
}
";
    assert_eq!(
        run(source),
        "0.0 0.0 0.0\n0.0 0.0 1.0\n0.0 1.0 0.0\n0.0 1.0 1.0\n1.0 2.0 0.0\n1.0 2.0 1.0\n"
    );
}

#[test]
fn test_arrays() {
    assert_eq!(run("a = [1, 2, 3]\nprint(a[1])"), "2.0\n");
    assert_eq!(run("a = [1, 2, [3]]\nprint(a[2])"), "[3.0]\n");
    assert_eq!(run("a = [1, 2, [3]]\nprint(a[2][0])"), "3.0\n");

    let squares = "x = [1, 2, 3, 4, 5]\ni = 0\nwhile i < 5 {\n  print(x[i]*x[i])\n  i = i + 1\n}";
    assert_eq!(run(squares), "1.0\n4.0\n9.0\n16.0\n25.0\n");
}

#[test]
fn test_functions_in_arrays() {
    let fun = "def foo(x) {\n  return 33\n}\narr = [foo, 1]\n";
    assert_eq!(run(&format!("{}print(arr[0]())", fun)), "33.0\n");
    assert_eq!(run(&format!("{}print(arr)", fun)), "[<fun foo(x)>, 1.0]\n");
}

#[test]
fn test_function_sees_caller_bindings() {
    let source = "\
def f(z) {
  x = 1
  print(2*2, 3, x, f, z)
  return z
}

x = [4, f(5), [3, [4]]]
print(x)
";
    assert_eq!(run(source), "4.0 3.0 1.0 <fun f(z)> 5.0\n[4.0, 5.0, [3.0, [4.0]]]\n");
}

#[test]
fn test_nested_arrays() {
    let source = "\
def foo(x) {
 return 42
}

def bar(x) {
 print(x)
 print(x[2], x[2][0], x[2][0][0], x[3][0][0][1]())
}

x = [1, 2, [[13]], [[[1, foo]]]]
bar(x)
";
    assert_eq!(
        run(source),
        "[1.0, 2.0, [[13.0]], [[[1.0, <fun foo(x)>]]]]\n[[13.0]] [13.0] 13.0 42.0\n"
    );
}

#[test]
fn test_signal_routing() {
    let source = "\
x = num(3)
y = 4
a = add()
b = mult()
x.out[0] @ a.in[0]
y.out[0] @ a.in[1]
print(a)
x.out[0] @ b.in[0]
a.out[0] @ b.in[1]
print(b)
";
    assert_eq!(run(source), "7.0\n21.0\n");
}

#[test]
fn test_harmonic_response() {
    let source = "\
x = 1
y = integ()
e = x - y
e @ y
t = time()
calc(0.001, 10)
print(y)
print(e)
";
    assert_eq!(run(source), "0.99995\n5e-05\n");
}

#[test]
fn test_second_order_oscillator() {
    let source = "\
x = 1
dy = integ()
y = dy @ integ()
kdy = dy @ 0.3
e = x - (kdy + y)
e @ dy
t = time()
calc(0.00001, 3)
print(y)
";
    assert_relative_eq!(printed_number(source), 1.61094, epsilon = 1e-5);
}

#[test]
fn test_function_blocks() {
    let source = "\
def foo(x, y) {
    return [x + y, 42 - y]
}

a = 1
b = time()
f = fun(foo, 2)
a.out[0] @ f.in[0]
b.out[0] @ f.in[1]
calc(0.1, 5)
print(f)
print(f.out[0])
print(f.out[1])
";
    assert_eq!(run(source), "6.0\n6.0\n37.0\n");
}

#[test]
fn test_sliding_mode_controller() {
    let source = "\
def sign(x) {
  if x >= 0 {
    return [1]
  } else {
    return [-1]
  }
}

g = 1
dy = integ()
y = dy @ integ()
e = g - (y + 0.8*dy)
u = e @ fun(sign, 1)
u @ dy
t = time()
calc(0.00005, 2)
print(y)
";
    assert_relative_eq!(printed_number(source), 0.84814, epsilon = 1e-4);
}

#[test]
fn test_repeated_calc_starts_over() {
    let once = "y = integ()\n1 @ y\ncalc(0.1, 1)\nprint(y)";
    let twice = "y = integ()\n1 @ y\ncalc(0.1, 1)\ncalc(0.1, 1)\nprint(y)";
    assert_eq!(run(once), run(twice));
}

#[test]
fn test_algebraic_loop_is_reported() {
    let source = "a = add()\na @ a\ncalc(1, 0)\nprint(1)";
    let out = run(source);
    assert!(out.starts_with("deadlock at t=0: 1 block(s) waiting: add#"));
    assert!(out.ends_with("1.0\n"));
}

#[test]
fn test_errors_keep_earlier_output() {
    let out = run("print(1)\nnosuch(2)\nprint(2)");
    assert_eq!(out, "1.0\nUndefined function 'nosuch'\n");

    let out = run("print(1)\nx = $");
    assert!(out.starts_with("1.0\nLexer error at line 2"));
}

#[test]
fn test_precision_setting() {
    let config = EngineConfig::new().with_precision(Some(2));
    assert_eq!(run_source("print(2 / 3)", &config), "0.67\n");

    let config = EngineConfig::new().with_precision(None);
    assert_eq!(run_source("print(1 / 4)", &config), "0.25\n");
}

#[test]
fn test_translated_diagram_runs() {
    let json = r#"{
        "diag": { "layers": [
            { "type": "diagram-nodes", "models": {
                "n1": { "id": "c-1", "name": "const", "parameters": { "value": 1 },
                        "ports": [ { "id": "p-1", "name": "Out_0" } ] },
                "n2": { "id": "i-1", "name": "integ", "states": { "x0": 0 },
                        "ports": [ { "id": "p-2", "name": "In_0" }, { "id": "p-3", "name": "Out_0" } ] },
                "n3": { "id": "d-1", "name": "disp",
                        "ports": [ { "id": "p-4", "name": "In_0" } ] }
            } },
            { "type": "diagram-links", "models": {
                "l1": { "sourcePort": "p-1", "targetPort": "p-2" },
                "l2": { "sourcePort": "p-3", "targetPort": "p-4" }
            } }
        ] },
        "calc": { "dt": 0.5, "t": 2 }
    }"#;
    let source = diagram::translate(json).unwrap();
    assert_eq!(run(&source), "2.5\n");
}

#[test]
fn test_oversized_inputs_become_error_text() {
    let out = run("calc(0.000000000000000000000000000001, 1000000000)\nprint(1)");
    assert!(out.starts_with("Invalid simulation parameter:"), "{}", out);

    let out = run("def f(x) { x }\nb = fun(f, 100000000000000000000000)\nprint(1)");
    assert!(out.starts_with("Type error:"), "{}", out);

    let out = run("def f(n) { f(n + 1) }\nf(0)");
    assert_eq!(out, "Maximum call depth of 200 exceeded\n");
}
