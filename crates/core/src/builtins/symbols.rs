//! Symbol and symbol-table builtins.
//!
//! `unintern` only removes the table entry: a record that is still held
//! by some value keeps its slots, it just stops being discoverable by
//! name. `describe-variable` can therefore still report the old binding
//! through a handle taken before the unintern.

use crate::args::Args;
use crate::cons::ConsRef;
use crate::error::LispError;
use crate::machine::Machine;
use crate::symbol::{Symbol, SymbolRef};
use crate::value::Value;

pub fn install(m: &mut Machine) {
    m.defun("make-symbol", |_m, (name,): (String,)| {
        SymbolRef::new(Symbol::named(name))
    });

    m.defun("symbolp", |_m, (v,): (Value,)| v.is_symbol());

    m.make_func("symbol-name", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let Value::Symbol(s) = &v else {
            return Err(LispError::WrongTypeArgument(v.print(false)));
        };
        Ok(Value::string(s.name()))
    });

    m.make_func("symbol-value", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        if v.is_nil() {
            return Ok(Value::nil());
        }
        let Value::Symbol(s) = &v else {
            return Err(LispError::WrongTypeArgument(v.print(false)));
        };
        let record = m.record_for(s);
        let var = record.borrow().variable.clone();
        var.ok_or_else(|| LispError::VoidVariable(record.name()))
    });

    m.make_func("boundp", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        if v.is_nil() {
            return Ok(Value::truth());
        }
        let Value::Symbol(s) = &v else {
            return Err(LispError::WrongTypeArgument(v.print(false)));
        };
        let record = m.record_for(s);
        let bound = record.borrow().variable.is_some();
        Ok(Value::from_bool(bound))
    });

    m.defun("makunbound", |_m, (record,): (SymbolRef,)| {
        if record.borrow().constant {
            return Err(LispError::error(format!(
                "setting-constant {}",
                record.name()
            )));
        }
        record.set_variable(None);
        Ok(Value::symbol(record))
    });

    m.defun("intern", |m, (name,): (String,)| m.intern(&name));

    m.defun("intern-soft", |m, (name,): (String,)| {
        match m.table_lookup(&name) {
            Some(r) => Value::symbol(r),
            None => Value::nil(),
        }
    });

    m.make_func("unintern", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let Value::Symbol(s) = &v else {
            return Err(LispError::WrongTypeArgument(v.print(false)));
        };
        Ok(Value::from_bool(m.unintern(&s.name())))
    });

    m.make_func("describe-variable", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let description = match &v {
            Value::Symbol(s) => {
                let var = m.record_for(s).borrow().variable.clone();
                match var {
                    None => format!("{} is void as a variable.", v.print(false)),
                    Some(value) => {
                        format!("{}'s value is {}", v.print(false), value.print(false))
                    }
                }
            }
            value if value.is_nil() => "nil's value is nil".to_string(),
            _ => "You did not specify a variable.".to_string(),
        };
        Ok(Value::string(description))
    });

    m.defun("symbol-plist", |_m, (record,): (SymbolRef,)| {
        let existing = record.borrow().plist.clone();
        let plist = match existing {
            Some(p) => p,
            None => {
                let fresh = ConsRef::empty();
                record.borrow_mut().plist = Some(fresh.clone());
                fresh
            }
        };
        Value::Cons(plist)
    });

    m.defun("get", |m, (record, prop): (SymbolRef, Value)| {
        let plist = record.borrow().plist.clone();
        match plist {
            Some(p) => plist_lookup(m, &p, &prop).unwrap_or_else(Value::nil),
            None => Value::nil(),
        }
    });

    m.defun(
        "put",
        |m, (record, prop, value): (SymbolRef, Value, Value)| {
            let plist = {
                let existing = record.borrow().plist.clone();
                match existing {
                    Some(p) => p,
                    None => {
                        let fresh = ConsRef::empty();
                        record.borrow_mut().plist = Some(fresh.clone());
                        fresh
                    }
                }
            };
            plist_store(m, &plist, &prop, value.clone());
            value
        },
    );

    m.make_func("mapatoms", 1, 1, |m, args| {
        let v = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let Value::Symbol(s) = &v else {
            return Err(LispError::WrongTypeArgument(v.print(false)));
        };
        let record = m.record_for(s);
        let func = record.borrow().function.clone();
        let Some(func) = func else {
            return Err(LispError::VoidFunction(record.name()));
        };
        for r in m.table_records() {
            let mut call = Args::from_forms(vec![Value::quoted(Value::symbol(r))]);
            m.call_function(&func, &mut call)?;
        }
        Ok(Value::nil())
    });
}

/// Property lists are flat `(prop value prop value …)` lists compared
/// with identity equality.
fn plist_lookup(m: &Machine, plist: &ConsRef, key: &Value) -> Option<Value> {
    let mut cur = if plist.is_empty() {
        None
    } else {
        Some(plist.clone())
    };
    while let Some(prop_cell) = cur {
        let prop = prop_cell.borrow().car.clone();
        let value_cell = prop_cell.next()?;
        if let Some(p) = prop {
            if m.values_eq(&p, key) {
                return value_cell.borrow().car.clone();
            }
        }
        cur = value_cell.next();
    }
    None
}

fn plist_store(m: &Machine, plist: &ConsRef, key: &Value, value: Value) {
    // Overwrite an existing property in place.
    let mut cur = if plist.is_empty() {
        None
    } else {
        Some(plist.clone())
    };
    let mut last = plist.clone();
    while let Some(prop_cell) = cur {
        last = prop_cell.clone();
        let prop = prop_cell.borrow().car.clone();
        let Some(value_cell) = prop_cell.next() else {
            break;
        };
        if let Some(p) = prop {
            if m.values_eq(&p, key) {
                value_cell.set_car(Some(value));
                return;
            }
        }
        last = value_cell.clone();
        cur = value_cell.next();
    }
    // Append the new pair.
    if plist.is_empty() {
        plist.set_car(Some(key.clone()));
        plist.set_cdr(Some(Value::cons(value, Value::nil())));
        return;
    }
    let pair = Value::cons(key.clone(), Value::cons(value, Value::nil()));
    last.set_cdr(Some(pair));
}
