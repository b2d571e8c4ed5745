//! End-to-end tests through the public API, from raw text to result.


use crate::*;
use approx::assert_abs_diff_eq;
use std::time::Duration;

fn eval_text(text: &str, ctx: &Context) -> Result<f64> {
    evaluate_ast(&parse_expression(text)?, ctx)
}

fn eval_plain(text: &str) -> Result<f64> {
    eval_text(text, &Context::new())
}

#[test]
fn test_precedence_and_associativity() {
    assert_eq!(eval_plain("2 + 3 * 4"), Ok(14.0));
    assert_eq!(eval_plain("(2 + 3) * 4"), Ok(20.0));
    assert_eq!(eval_plain("2 ^ 3 ^ 2"), Ok(512.0));
    assert_eq!(eval_plain("-2^2"), Ok(4.0));
    assert_eq!(eval_plain("2^-3"), Ok(0.125));
    assert_eq!(eval_plain("100 / 10 / 5"), Ok(2.0));
}

#[test]
fn test_arithmetic_errors() {
    assert_eq!(eval_plain("1/0"), Err(ExprError::DivisionByZero));
    assert_eq!(eval_plain("sqrt(-1)").unwrap_err().kind(), ErrorKind::Domain);
    assert_eq!(eval_plain("0^0"), Ok(1.0));
}

#[test]
fn test_undefined_variable_then_bound() {
    assert_eq!(
        eval_plain("x + 1"),
        Err(ExprError::UndefinedVariable { name: "x".into() })
    );
    assert_eq!(eval_text("x + 1", &Context::new().with_variable("x", 4.0)), Ok(5.0));
}

#[test]
fn test_case_rules() {
    // functions and constants ignore case
    assert_abs_diff_eq!(eval_plain("SIN(PI / 2)").unwrap(), 1.0);
    assert_abs_diff_eq!(eval_plain("Tau - 2 * pI").unwrap(), 0.0);
    // variables do not
    let ctx = Context::new().with_variable("x", 2.0);
    assert_eq!(
        eval_text("X", &ctx),
        Err(ExprError::UndefinedVariable { name: "X".into() })
    );
    let ctx = Context::new().with_variable("X", 3.0);
    assert_eq!(
        eval_text("x", &ctx),
        Err(ExprError::UndefinedVariable { name: "x".into() })
    );
}

#[test]
fn test_unsafe_functions() {
    for text in ["eval(x)", "EVAL(1)", "system(1)", "constructor(x)", "foo(1, 2)"] {
        assert_eq!(
            parse_expression(text).unwrap_err().kind(),
            ErrorKind::UnsafeFunction,
            "{text}"
        );
    }
}

#[test]
fn test_injection_attempts_are_rejected() {
    for text in [
        "x; process.exit()",
        "1 // comment",
        "window",
        "this",
        "`rm -rf`",
        "a[0]",
        "{}",
        "x => x",
        "__proto__",
        "1 + \"2\"",
    ] {
        assert_eq!(
            parse_expression(text).unwrap_err().kind(),
            ErrorKind::Validation,
            "{text}"
        );
    }
}

#[test]
fn test_depth_guard() {
    let deep = format!("{}1{}", "(".repeat(60), ")".repeat(60));
    assert_eq!(parse_expression(&deep), Err(ExprError::DepthExceeded { limit: 50 }));

    let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
    assert_eq!(parse_expression(&shallow), Ok(AstNode::Number(1.0)));

    let negations = format!("{}1", "-".repeat(60));
    assert_eq!(
        parse_expression(&negations).unwrap_err().kind(),
        ErrorKind::DepthExceeded
    );
}

#[test]
fn test_resource_limits() {
    let long = "1+".repeat(600) + "1";
    assert_eq!(parse_expression(&long).unwrap_err().kind(), ErrorKind::Validation);

    let many = "1+".repeat(300) + "1";
    assert_eq!(parse_expression(&many).unwrap_err().kind(), ErrorKind::Lex);

    assert_eq!(
        parse_expression("9007199254740993").unwrap_err().kind(),
        ErrorKind::Range
    );
}

#[test]
fn test_syntax_errors() {
    for (text, message) in [
        ("", "unexpected end of input"),
        ("  \t ", "unexpected end of input"),
        ("1 +", "unexpected end of input"),
        ("x <= 1", "operator `<=` is not supported"),
        ("sin", "function 'sin' must be called with parentheses"),
    ] {
        match parse_expression(text) {
            Err(ExprError::Syntax { message: actual, .. }) => assert_eq!(actual, message, "{text}"),
            other => panic!("{text}: expected a syntax error, got {other:?}"),
        }
    }
}

#[test]
fn test_derivatives() {
    let derive = |text: &str| {
        let ast = parse_expression(text).unwrap();
        generate_code(&simplify_ast(&differentiate_ast(&ast, "x").unwrap()))
    };
    assert_eq!(derive("x^2"), "2 * x");
    assert_eq!(derive("sin(x)"), "cos(x)");
    assert_eq!(derive("5*x^3 - x"), "15 * x^2 - 1");
    assert_eq!(derive("exp(2*x)"), "2 * exp(2 * x)");
    assert_eq!(derive("y * x"), "y");
}

#[test]
fn test_symbolic_fallback() {
    let ast = parse_expression("a * x + b").unwrap();
    let ctx = Context::new().with_variable("a", 2.0).with_variable("b", 0.0);
    assert_eq!(
        evaluate_or_symbolic(&ast, &ctx),
        Ok(Evaluation::Symbolic("2 * x".into()))
    );
    let ctx = ctx.with_variable("x", 1.5);
    assert_eq!(evaluate_or_symbolic(&ast, &ctx), Ok(Evaluation::Numeric(3.0)));
}

#[test]
fn test_complex_results() {
    let ast = parse_expression("sqrt(-4) + 1").unwrap();
    let z = evaluate_complex(&ast, &Context::new()).unwrap();
    assert_abs_diff_eq!(z.re, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(z.im, 2.0, epsilon = 1e-12);
}

#[test]
fn test_user_functions_are_scoped_to_their_table() {
    let mut table = FunctionTable::new();
    table.register("sq", UserFunction::new(|a| a[0] * a[0], 1)).unwrap();

    let ast = Builder::new("sq(3) + 1").with_functions(table.clone()).parse().unwrap();
    assert_eq!(evaluate_ast(&ast, &Context::new().with_functions(table)), Ok(10.0));

    // a second, empty table knows nothing about `sq`
    assert_eq!(
        evaluate_ast(&ast, &Context::new()),
        Err(ExprError::UnknownFunction { name: "sq".into() })
    );
    assert_eq!(
        parse_expression("sq(3)").unwrap_err().kind(),
        ErrorKind::UnsafeFunction
    );
}

#[test]
fn test_registering_reserved_names_fails() {
    let mut table = FunctionTable::new();
    for name in ["sin", "PI", "eval", "1abc", "a-b", ""] {
        let err = table.register(name, UserFunction::new(|a| a[0], 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{name}");
    }
    assert!(table.names().is_empty());
}

#[test]
fn test_timeout() {
    let mut table = FunctionTable::new();
    table
        .register(
            "wait",
            UserFunction::new(
                |a| {
                    std::thread::sleep(Duration::from_millis(15));
                    a[0]
                },
                1,
            ),
        )
        .unwrap();
    let ast = Builder::new("wait(1) + wait(2)").with_functions(table.clone()).parse().unwrap();
    let ctx = Context::new()
        .with_functions(table)
        .with_timeout(Duration::from_millis(10));
    assert_eq!(evaluate_ast(&ast, &ctx).unwrap_err().kind(), ErrorKind::Timeout);
}

#[test]
fn test_analyze() {
    let analysis = analyze("sin(x) * cos(Y) + pi");
    assert!(analysis.is_valid);
    assert_eq!(analysis.variables.iter().collect::<Vec<_>>(), ["Y", "x"]);
    assert_eq!(analysis.functions.iter().collect::<Vec<_>>(), ["cos", "sin"]);
    assert_eq!(analysis.complexity, 7);
    assert!(analysis.errors.is_empty());

    let analysis = analyze("   ");
    assert!(!analysis.is_valid);
    assert!(analysis.ast.is_none());
    assert_eq!(analysis.warnings, vec!["expression is empty"]);

    let analysis = analyze("x; y");
    assert!(!analysis.is_valid);
    assert_eq!(analysis.errors, vec!["disallowed sequence `;`"]);

    let analysis = analyze("eval(2)");
    assert!(!analysis.is_valid);
    assert_eq!(analysis.warnings, vec!["`eval` is not a built-in function"]);
    assert_eq!(analysis.errors, vec!["function `eval` is not allowed"]);
}

#[test]
fn test_validate_expression() {
    let result = validate_expression("  x  +\t1 ");
    assert!(result.is_valid());
    assert_eq!(result.sanitized, "x + 1");
    assert_eq!(validate_expression("").status, ValidationStatus::Empty);
}
