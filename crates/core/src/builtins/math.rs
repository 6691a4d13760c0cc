//! Arithmetic.
//!
//! Chains stay integral until the first float operand; from there the
//! whole chain is float. `%` is integer-only. Dividing (or taking a
//! modulus) by zero raises an arith error.

use crate::args::Args;
use crate::error::{EvalResult, LispError};
use crate::machine::Machine;
use crate::value::{MANY_ARGS, Number, Value};

/// Running accumulator carrying both views of the chain.
struct Chain {
    i: i64,
    f: f64,
    fp: bool,
}

fn next_number(m: &mut Machine, args: &mut Args) -> EvalResult<Option<Number>> {
    let Some(v) = args.eval_next(m)? else {
        return Ok(None);
    };
    match v {
        Value::Int(i) => Ok(Some(Number::from_int(i))),
        Value::Float(f) => Ok(Some(Number::from_float(f))),
        other => Err(LispError::WrongTypeArgument(other.print(false))),
    }
}

pub fn install(m: &mut Machine) {
    m.make_func("+", 0, MANY_ARGS, |m, args| {
        let mut acc = Chain {
            i: 0,
            f: 0.0,
            fp: false,
        };
        while let Some(n) = next_number(m, args)? {
            acc.fp |= n.is_float;
            acc.i = acc.i.wrapping_add(if n.is_float { n.f as i64 } else { n.i });
            acc.f += n.f;
        }
        Ok(chain_value(&acc))
    });

    m.make_func("*", 0, MANY_ARGS, |m, args| {
        let mut acc = Chain {
            i: 1,
            f: 1.0,
            fp: false,
        };
        while let Some(n) = next_number(m, args)? {
            acc.fp |= n.is_float;
            acc.i = acc.i.wrapping_mul(if n.is_float { n.f as i64 } else { n.i });
            acc.f *= n.f;
        }
        Ok(chain_value(&acc))
    });

    m.make_func("-", 0, MANY_ARGS, |m, args| {
        let Some(first) = next_number(m, args)? else {
            return Ok(Value::Int(0));
        };
        if !args.has_next() {
            return Ok(if first.is_float {
                Value::Float(-first.f)
            } else {
                Value::Int(first.i.wrapping_neg())
            });
        }
        let mut acc = Chain {
            i: first.i,
            f: first.f,
            fp: first.is_float,
        };
        while let Some(n) = next_number(m, args)? {
            acc.fp |= n.is_float;
            acc.i = acc.i.wrapping_sub(if n.is_float { n.f as i64 } else { n.i });
            acc.f -= n.f;
        }
        Ok(chain_value(&acc))
    });

    m.make_func("/", 1, MANY_ARGS, |m, args| {
        let Some(first) = next_number(m, args)? else {
            return Err(LispError::WrongNumberOfArguments(0));
        };
        let mut acc = Chain {
            i: first.i,
            f: first.f,
            fp: first.is_float,
        };
        while let Some(n) = next_number(m, args)? {
            if n.f == 0.0 {
                return Err(LispError::Arith("Division by zero".to_string()));
            }
            acc.fp |= n.is_float;
            if n.is_float {
                acc.i = (acc.i as f64 / n.f) as i64;
            } else {
                acc.i = acc.i.wrapping_div(n.i);
            }
            acc.f /= n.f;
        }
        Ok(chain_value(&acc))
    });

    m.defun("%", |_m, (a, b): (i64, i64)| {
        if b == 0 {
            return Err(LispError::Arith("Division by zero".to_string()));
        }
        Ok(Value::Int(a.wrapping_rem(b)))
    });

    m.make_func("=", 1, MANY_ARGS, |m, args| {
        let mut i = 0i64;
        let mut f = 0f64;
        let mut fp = false;
        let mut first = true;
        while let Some(n) = next_number(m, args)? {
            if n.is_float {
                if !first && n.f != f {
                    return Ok(Value::nil());
                }
                f = n.f;
                fp = true;
            } else {
                if !first && ((!fp && n.i != i) || (fp && n.f != f)) {
                    return Ok(Value::nil());
                }
                i = n.i;
                f = n.f;
            }
            first = false;
        }
        Ok(Value::truth())
    });

    m.defun("numberp", |_m, (v,): (Value,)| v.is_int() || v.is_float());

    m.defun("1+", |_m, (n,): (Number,)| {
        if n.is_float {
            Value::Float(n.f + 1.0)
        } else {
            Value::Int(n.i.wrapping_add(1))
        }
    });

    m.defun("truncate", |_m, (n, divisor): (Number, Option<Number>)| {
        match divisor {
            None => Ok(Value::Int(if n.is_float { n.f as i64 } else { n.i })),
            Some(d) => {
                if d.f == 0.0 {
                    return Err(LispError::Arith("Division by zero".to_string()));
                }
                if n.is_float || d.is_float {
                    Ok(Value::Int((n.f / d.f) as i64))
                } else {
                    Ok(Value::Int(n.i.wrapping_div(d.i)))
                }
            }
        }
    });

    m.defun("floor", |_m, (n,): (Number,)| {
        Value::Int(if n.is_float { n.f.floor() as i64 } else { n.i })
    });

    m.defun("ceiling", |_m, (n,): (Number,)| {
        Value::Int(if n.is_float { n.f.ceil() as i64 } else { n.i })
    });
}

fn chain_value(acc: &Chain) -> Value {
    if acc.fp {
        Value::Float(acc.f)
    } else {
        Value::Int(acc.i)
    }
}
