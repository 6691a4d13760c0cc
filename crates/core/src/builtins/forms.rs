//! Special forms and evaluator-facing functions.
//!
//! These are registered through the same surface as ordinary builtins;
//! what makes them special is only that they read argument forms raw
//! instead of evaluating them all.

use crate::args::Args;
use crate::cons::{ConsRef, ListBuilder};
use crate::error::{EvalResult, LispError};
use crate::machine::Machine;
use crate::symbol::SymbolValue;
use crate::value::{Function, FunctionBody, MANY_ARGS, Value};
use std::rc::Rc;

pub fn install(m: &mut Machine) {
    m.make_func("quote", 1, 1, |_m, args| {
        Ok(match args.peek_form() {
            Some(v) if !v.is_nil() => v.clone(),
            _ => Value::nil(),
        })
    });

    // Function quoting; returns its argument unevaluated, like quote.
    m.make_func("function", 1, 1, |_m, args| {
        Ok(args.next_form().unwrap_or_else(Value::nil))
    });

    m.make_func("if", 2, MANY_ARGS, |m, args| {
        let cond = args.eval_next(m)?.unwrap_or_else(Value::nil);
        if cond.is_truthy() {
            return Ok(args.eval_next(m)?.unwrap_or_else(Value::nil));
        }
        args.skip();
        let mut last = Value::nil();
        while args.has_next() {
            last = args.eval_next(m)?.unwrap_or_else(Value::nil);
        }
        Ok(last)
    });

    m.make_func("progn", 0, MANY_ARGS, |m, args| {
        let mut last = Value::nil();
        while args.has_next() {
            last = args.eval_next(m)?.unwrap_or_else(Value::nil);
        }
        Ok(last)
    });

    m.make_func("prog1", 0, MANY_ARGS, |m, args| {
        let mut first = None;
        while args.has_next() {
            let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
            if first.is_none() {
                first = Some(v);
            }
        }
        Ok(first.unwrap_or_else(Value::nil))
    });

    m.make_func("set", 2, 2, |m, args| {
        let target = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let sym = match &target {
            Value::Symbol(s) => s.clone(),
            v if v.is_nil() => SymbolValue::named("nil"),
            v => return Err(LispError::WrongTypeArgument(v.print(false))),
        };
        // A live local binding shadows the table for by-name targets.
        if let SymbolValue::Named(name) = &sym {
            if let Some(local) = m.top_local(name) {
                let value = args.eval_next(m)?.unwrap_or_else(Value::nil);
                local.set_variable(Some(value.clone()));
                return Ok(value);
            }
        }
        let record = m.record_for(&sym);
        if record.borrow().constant {
            return Err(LispError::error(format!(
                "setting-constant {}",
                sym.printed()
            )));
        }
        let value = args.eval_next(m)?.unwrap_or_else(Value::nil);
        record.set_variable(Some(value.clone()));
        Ok(value)
    });

    m.make_func("let", 2, MANY_ARGS, |m, args| run_let(m, args, false));
    m.make_func("let*", 2, MANY_ARGS, |m, args| run_let(m, args, true));

    m.make_func("defun", 2, MANY_ARGS, |m, args| {
        define_function(m, args, false)
    });
    m.make_func("defmacro", 2, MANY_ARGS, |m, args| {
        define_function(m, args, true)
    });

    m.make_func("eval", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        m.eval(&v)
    });

    m.make_func("eq", 2, 2, |m, args| {
        let a = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let b = args.eval_next(m)?.unwrap_or_else(Value::nil);
        Ok(Value::from_bool(m.values_eq(&a, &b)))
    });

    m.make_func("macroexpand", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        m.macro_expand(&v, false)
    });

    m.make_func("macroexpand-1", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        m.macro_expand(&v, true)
    });

    // (signal sym data): sym is taken unevaluated, data is evaluated.
    m.make_func("signal", 2, 2, |m, args| {
        let sym_form = args.next_form().unwrap_or_else(Value::nil);
        let Value::Symbol(s) = &sym_form else {
            return Err(LispError::WrongTypeArgument(sym_form.print(false)));
        };
        let data = args.eval_next(m)?.unwrap_or_else(Value::nil);
        Err(LispError::Signal {
            symbol: s.name(),
            data: Some(data),
        })
    });

    m.make_func("message", 1, MANY_ARGS, |m, args| {
        let first = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let Value::Str(fmt) = &first else {
            return Err(LispError::WrongTypeArgument(first.print(false)));
        };
        let template = fmt.borrow().clone();
        let text = format_message(m, &template, args)?;
        m.emit_message(&text);
        Ok(Value::string(text))
    });

    m.make_func("functionp", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let func = match &v {
            Value::Symbol(s) => m.record_for(s).borrow().function.clone(),
            Value::Function(f) => Some(f.clone()),
            other => return Err(LispError::WrongTypeArgument(other.print(false))),
        };
        Ok(Value::from_bool(
            func.map(|f| !f.is_macro).unwrap_or(false),
        ))
    });

    m.make_func("func-arity", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let func = match &v {
            Value::Symbol(s) => m.record_for(s).borrow().function.clone(),
            Value::Function(f) => Some(f.clone()),
            other => return Err(LispError::WrongTypeArgument(other.print(false))),
        };
        let Some(func) = func else {
            return Err(LispError::VoidFunction(v.print(false)));
        };
        let max = if func.max_args == MANY_ARGS {
            Value::symbol_named("many")
        } else {
            Value::Int(func.max_args as i64)
        };
        Ok(Value::cons(Value::Int(func.min_args as i64), max))
    });

    m.make_func("symbol-function", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let Value::Symbol(s) = &v else {
            return Err(LispError::WrongTypeArgument(v.print(false)));
        };
        Ok(match m.record_for(s).borrow().function.clone() {
            Some(f) => Value::Function(f),
            None => Value::nil(),
        })
    });
}

/// `let` evaluates every binding value before pushing any binding;
/// `let*` pushes as it goes, so later values see earlier bindings.
/// Either way the pops run on the error path too.
fn run_let(m: &mut Machine, args: &mut Args, star: bool) -> EvalResult<Value> {
    let bindings_form = args.next_form().unwrap_or_else(Value::nil);
    let Value::Cons(bindings) = &bindings_form else {
        return Err(LispError::WrongTypeArgument(bindings_form.print(false)));
    };
    let mut bound: Vec<String> = Vec::new();
    let result = bind_and_run(m, bindings, args, star, &mut bound);
    for name in bound.iter().rev() {
        m.pop_local(name);
    }
    result
}

fn bind_and_run(
    m: &mut Machine,
    bindings: &ConsRef,
    args: &mut Args,
    star: bool,
    bound: &mut Vec<String>,
) -> EvalResult<Value> {
    let mut pending: Vec<(String, Value)> = Vec::new();
    let mut cur = if bindings.is_empty() {
        None
    } else {
        Some(bindings.clone())
    };
    while let Some(c) = cur {
        let (entry, next) = {
            let b = c.borrow();
            (b.car.clone(), c.next())
        };
        if let Some(entry) = entry {
            let (name, value) = binding_pair(m, &entry)?;
            if star {
                m.push_local(&name, value);
                bound.push(name);
            } else {
                pending.push((name, value));
            }
        }
        cur = next;
    }
    for (name, value) in pending {
        m.push_local(&name, value);
        bound.push(name);
    }
    let mut result = Value::nil();
    while args.has_next() {
        result = args.eval_next(m)?.unwrap_or_else(Value::nil);
    }
    Ok(result)
}

fn binding_pair(m: &mut Machine, entry: &Value) -> EvalResult<(String, Value)> {
    match entry {
        Value::Symbol(s) => Ok((s.name(), Value::nil())),
        Value::Cons(c) if !c.is_empty() => {
            let (name_form, value_form) = {
                let b = c.borrow();
                (b.car.clone(), c.next().and_then(|n| n.borrow().car.clone()))
            };
            let Some(Value::Symbol(s)) = name_form else {
                return Err(LispError::WrongTypeArgument(entry.print(false)));
            };
            let value = match value_form {
                Some(f) => m.eval(&f)?,
                None => Value::nil(),
            };
            Ok((s.name(), value))
        }
        other => Err(LispError::WrongTypeArgument(other.print(false))),
    }
}

fn define_function(m: &mut Machine, args: &mut Args, is_macro: bool) -> EvalResult<Value> {
    let name_form = args.next_form().unwrap_or_else(Value::nil);
    let name = match &name_form {
        Value::Symbol(s) if !s.name().is_empty() => s.name(),
        v => return Err(LispError::WrongTypeArgument(v.print(false))),
    };
    let arglist_form = args.next_form().unwrap_or_else(Value::nil);
    let Value::Cons(arglist) = &arglist_form else {
        return Err(LispError::WrongTypeArgument(arglist_form.print(false)));
    };
    let mut params = Vec::new();
    let mut cur = if arglist.is_empty() {
        None
    } else {
        Some(arglist.clone())
    };
    while let Some(c) = cur {
        let (car, next) = {
            let b = c.borrow();
            (b.car.clone(), c.next())
        };
        match car {
            Some(Value::Symbol(s)) => params.push(s.name()),
            Some(_) => {
                return Err(LispError::error(format!(
                    "Malformed arglist: {}",
                    arglist_form.print(false)
                )));
            }
            None => {}
        }
        cur = next;
    }
    let mut body = ListBuilder::new();
    while let Some(f) = args.next_form() {
        body.append(f);
    }
    let argc = params.len();
    let func = Rc::new(Function {
        name: name.clone(),
        min_args: argc,
        max_args: argc,
        is_macro,
        body: FunctionBody::Lambda {
            params,
            body: body.build(),
        },
    });
    m.install_function(&name, func);
    Ok(Value::symbol_named(name))
}

/// Expand `%d`, `%s` and `%%` directives against the remaining
/// arguments. `%d` truncates floats; a directive whose argument has the
/// wrong type is an error, as is an unknown directive.
fn format_message(m: &mut Machine, template: &str, args: &mut Args) -> EvalResult<String> {
    let mut out = String::new();
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('d') => {
                let arg = args.eval_next(m)?.unwrap_or_else(Value::nil);
                let n = match arg {
                    Value::Int(i) => i,
                    Value::Float(f) => f as i64,
                    _ => {
                        return Err(LispError::error(
                            "Format specifier doesn't match argument type",
                        ));
                    }
                };
                out.push_str(&n.to_string());
            }
            Some('s') => {
                let arg = args.eval_next(m)?.unwrap_or_else(Value::nil);
                let Value::Str(s) = &arg else {
                    return Err(LispError::error(
                        "Format specifier doesn't match argument type",
                    ));
                };
                out.push_str(&s.borrow());
            }
            _ => return Err(LispError::error("Invalid format string")),
        }
    }
    Ok(out)
}
