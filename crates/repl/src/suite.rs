//! The embedded end-to-end suite behind `--test`.
//!
//! Every case drives a machine through `evaluate` and compares printed
//! output, expected error kinds, or the live-object ledger. The suite
//! stops at the first failure and reports it; the process exit code is
//! the REPL's concern.

use lyra_core::{Machine, live_objects};

type SuiteResult = Result<(), String>;

fn expect_output(m: &mut Machine, expr: &str, expected: &str) -> SuiteResult {
    match m.evaluate(expr) {
        Ok(v) => {
            let printed = v.print(false);
            if printed == expected {
                Ok(())
            } else {
                Err(format!(
                    "expected {:?} to print {:?}, got {:?}",
                    expr, expected, printed
                ))
            }
        }
        Err(e) => Err(format!("expected {:?} to print {:?}, got error: {}", expr, expected, e)),
    }
}

fn expect_error(m: &mut Machine, expr: &str, kind: &str) -> SuiteResult {
    match m.evaluate(expr) {
        Ok(v) => Err(format!(
            "expected {:?} to fail with {}, got {}",
            expr,
            kind,
            v.print(false)
        )),
        Err(e) if e.kind() == kind => Ok(()),
        Err(e) => Err(format!(
            "expected {:?} to fail with {}, got {}: {}",
            expr,
            kind,
            e.kind(),
            e
        )),
    }
}

fn expect_contains(m: &mut Machine, expr: &str, needle: &str) -> SuiteResult {
    match m.evaluate(expr) {
        Ok(v) => {
            let printed = v.print(false);
            if printed.contains(needle) {
                Ok(())
            } else {
                Err(format!(
                    "expected the output of {:?} to contain {:?}, got {:?}",
                    expr, needle, printed
                ))
            }
        }
        Err(e) => Err(format!("expected output for {:?}, got error: {}", expr, e)),
    }
}

fn check(name: &str, result: SuiteResult) -> SuiteResult {
    result.map_err(|e| format!("{}: {}", name, e))
}

/// Run the whole suite, printing one line per section.
pub fn run() -> SuiteResult {
    let sections: &[(&str, fn() -> SuiteResult)] = &[
        ("lists", lists),
        ("quoting", quoting),
        ("variables", variables),
        ("let", let_forms),
        ("functions", functions),
        ("macros", macros),
        ("arithmetic", arithmetic),
        ("strings", strings),
        ("symbols", symbols),
        ("cyclic structures", cyclic),
        ("reclamation", reclamation),
        ("errors", errors),
    ];
    for (name, section) in sections {
        check(name, section())?;
        println!("{} ... ok", name);
    }
    Ok(())
}

fn lists() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_output(&mut m, "'(1 2 3)", "(1 2 3)")?;
    expect_output(&mut m, "'(1 2 . 3)", "(1 2 . 3)")?;
    expect_output(&mut m, "(cons 1 2)", "(1 . 2)")?;
    expect_output(&mut m, "(cons 1 '(2 3))", "(1 2 3)")?;
    expect_output(&mut m, "(nth 1 '(a b c))", "b")?;
    expect_output(&mut m, "(length '(1 2 3 4))", "4")?;
    expect_output(&mut m, "(make-list 3 'pigs)", "(pigs pigs pigs)")?;
    expect_output(
        &mut m,
        "(progn (setq l (make-list 3 '(a b))) (eq (car l) (cadr l)))",
        "t",
    )?;
    expect_output(&mut m, "(proper-list-p '(a b . c))", "nil")?;
    expect_output(&mut m, "(reverse '(1 2 3))", "(3 2 1)")?;
    Ok(())
}

fn quoting() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_output(&mut m, "'foo", "foo")?;
    expect_output(&mut m, "''foo", "'foo")?;
    expect_output(&mut m, "(quote (+ 1 2))", "(+ 1 2)")?;
    expect_output(&mut m, "'()", "nil")?;
    Ok(())
}

fn variables() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_output(&mut m, "(setq x 5)", "5")?;
    expect_output(&mut m, "x", "5")?;
    expect_output(&mut m, "(set 'y 15)", "15")?;
    expect_output(&mut m, "(boundp 'zebra)", "nil")?;
    expect_error(&mut m, "zebra", "void-variable")?;
    expect_output(&mut m, "(progn (makunbound 'x) (boundp 'x))", "nil")?;
    expect_error(&mut m, "x", "void-variable")?;
    expect_error(&mut m, "(setq nil 5)", "error")?;
    expect_output(
        &mut m,
        "(setq x -99) (defun getx () x) (let ((x 1)) (getx))",
        "1",
    )?;
    Ok(())
}

fn let_forms() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_output(&mut m, "(let ((x 1) (y (+ 1 2))) (+ x y))", "4")?;
    expect_output(&mut m, "(let* ((x 1) (y x)) y)", "1")?;
    expect_error(&mut m, "(let ((x 1) (y x)) y)", "void-variable")?;
    expect_error(&mut m, "(let (1) nil)", "wrong-type-argument")?;
    expect_output(&mut m, "(setq y 2) (let ((y 1) (z y)) (list y z))", "(1 2)")?;
    Ok(())
}

fn functions() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_output(&mut m, "(defun foo () 5)", "foo")?;
    expect_output(&mut m, "(foo)", "5")?;
    expect_output(&mut m, "(defun sum (a b) (+ a b))", "sum")?;
    expect_output(&mut m, "(sum 2 3)", "5")?;
    expect_error(&mut m, "(sum 1)", "wrong-number-of-arguments")?;
    expect_output(&mut m, "(func-arity 'sum)", "(2 . 2)")?;
    expect_output(&mut m, "(functionp 'sum)", "t")?;
    Ok(())
}

fn macros() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_output(
        &mut m,
        "(defmacro inc (v) (list 'setq v (list '1+ v))) (setq x 1) (inc x)",
        "2",
    )?;
    expect_output(&mut m, "(macroexpand-1 '(inc x))", "(setq x (1+ x))")?;
    expect_output(&mut m, "(macroexpand '(car x))", "(car x)")?;
    expect_output(&mut m, "(setq l '(a b)) (push 'c l)", "(c a b)")?;
    expect_output(&mut m, "(pop l)", "c")?;
    expect_output(&mut m, "l", "(a b)")?;
    expect_error(&mut m, "(pop nil)", "error")?;
    Ok(())
}

fn arithmetic() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_output(&mut m, "(+ 1 1)", "2")?;
    expect_output(&mut m, "(* 3 4)", "12")?;
    expect_output(&mut m, "(- 10 3 2)", "5")?;
    expect_output(&mut m, "(/ 10 2)", "5")?;
    expect_output(&mut m, "(% 5 2)", "1")?;
    expect_output(&mut m, "(1+ 0.0)", "1.0")?;
    expect_output(&mut m, "(= 1 1.0)", "t")?;
    match m.evaluate("(/ 10 3 3.0)") {
        Ok(lyra_core::Value::Float(f)) if (f - 1.111_111_11).abs() < 1e-3 => {}
        other => return Err(format!("(/ 10 3 3.0) produced {:?}", other.map(|v| v.print(false)))),
    }
    expect_error(&mut m, "(/ 1 0)", "arith-error")?;
    expect_error(&mut m, "(% 5 2.0)", "wrong-type-argument")?;
    Ok(())
}

fn strings() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_output(&mut m, "(concat \"ab\" \"cd\")", "\"abcd\"")?;
    expect_output(&mut m, "(substring \"abcdefg\" -3 -1)", "\"ef\"")?;
    expect_output(&mut m, "(string ?a ?b ?c)", "\"abc\"")?;
    expect_output(&mut m, "(length \"abc\")", "3")?;
    expect_output(&mut m, "(split-string \"  two words \")", "(\"two\" \"words\")")?;
    expect_output(
        &mut m,
        "(split-string \"aooob\" \"o*\")",
        "(\"\" \"a\" \"\" \"b\" \"\")",
    )?;
    expect_output(
        &mut m,
        "(progn (setq str \"abc\") (store-substring str 0 \"A\"))",
        "\"Abc\"",
    )?;
    expect_output(&mut m, "str", "\"Abc\"")?;
    expect_error(&mut m, "(store-substring str 3 \"D\")", "error")?;
    Ok(())
}

fn symbols() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_output(&mut m, "(intern \"\")", "##")?;
    expect_output(&mut m, "(eq (intern \"tt\") 'tt)", "t")?;
    expect_output(&mut m, "(setq sym (intern \"abra\"))", "abra")?;
    expect_output(&mut m, "(setq abra 500)", "500")?;
    expect_contains(&mut m, "(describe-variable sym)", "abra's value is 500")?;
    expect_output(&mut m, "(unintern sym)", "t")?;
    expect_output(&mut m, "(intern-soft \"abra\")", "nil")?;
    expect_contains(&mut m, "(describe-variable sym)", "abra's value is 500")?;
    expect_error(&mut m, "abra", "void-variable")?;
    expect_output(&mut m, "(symbolp (make-symbol \"fresh\"))", "t")?;
    expect_output(&mut m, "(eq (make-symbol \"a\") (make-symbol \"a\"))", "nil")?;
    Ok(())
}

fn cyclic() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_output(
        &mut m,
        "(progn (setq z (list 1 2 3)) (setcdr (cdr (cdr z)) (cdr z)) z)",
        "(1 2 3 2 . #2)",
    )?;
    expect_error(&mut m, "(length z)", "error")?;
    expect_output(&mut m, "(let ((a (list 1))) (setcdr a a))", "(1 . #0)")?;
    expect_output(&mut m, "(setq x (list 1 2 3))", "(1 2 3)")?;
    expect_output(&mut m, "(setcar x x)", "(#0 2 3)")?;
    Ok(())
}

fn reclamation() -> SuiteResult {
    let mut m = Machine::new(true);
    let base = live_objects();
    let obj = m
        .evaluate("(let ((a (list 1))) (setcdr a a))")
        .map_err(|e| e.to_string())?;
    if live_objects() <= base {
        return Err("cyclic list not counted as live".to_string());
    }
    drop(obj);
    if live_objects() != base {
        return Err(format!(
            "cyclic list leaked: {} live objects above baseline",
            live_objects() - base
        ));
    }
    Ok(())
}

fn errors() -> SuiteResult {
    let mut m = Machine::new(true);
    expect_error(&mut m, "(car", "syntax-error")?;
    expect_error(&mut m, "\"open", "syntax-error")?;
    expect_error(&mut m, "(no-such-fn 1)", "void-function")?;
    expect_error(&mut m, "(car 1)", "wrong-type-argument")?;
    expect_error(&mut m, "(null 1 2)", "wrong-number-of-arguments")?;
    let err = m
        .evaluate("(signal my-error (list \"boom\"))")
        .err()
        .ok_or("signal did not raise")?;
    if err.to_string() != "boom" {
        return Err(format!("signal printed {:?}", err.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_passes() {
        run().unwrap();
    }
}
