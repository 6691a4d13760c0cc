//! List primitives and list predicates.

use crate::cons::{ConsRef, ListBuilder};
use crate::machine::Machine;
use crate::value::{MANY_ARGS, Value};

pub fn install(m: &mut Machine) {
    m.defun("car", |_m, (cell,): (ConsRef,)| {
        cell.borrow().car.clone().unwrap_or_else(Value::nil)
    });

    m.defun("cdr", |_m, (cell,): (ConsRef,)| {
        cell.borrow().cdr.clone().unwrap_or_else(Value::nil)
    });

    m.make_func("cons", 2, 2, |m, args| {
        let car = args.eval_next(m)?.unwrap_or_else(Value::nil);
        let cdr = args.eval_next(m)?.unwrap_or_else(Value::nil);
        Ok(Value::cons(car, cdr))
    });

    m.make_func("list", 0, MANY_ARGS, |m, args| {
        let mut b = ListBuilder::new();
        while let Some(v) = args.eval_next(m)? {
            b.append(v);
        }
        Ok(Value::Cons(b.build()))
    });

    m.defun("setcar", |_m, (cell, new_car): (ConsRef, Value)| {
        cell.set_car(Some(new_car.clone()));
        new_car
    });

    m.defun("setcdr", |_m, (cell, new_cdr): (ConsRef, Value)| {
        cell.set_cdr(Some(new_cdr.clone()));
        new_cdr
    });

    m.defun("nth", |_m, (index, list): (i64, ConsRef)| {
        let mut p = list;
        for _ in 0..index.max(0) {
            match p.next() {
                Some(n) => p = n,
                None => return Value::nil(),
            }
        }
        let car = p.borrow().car.clone();
        car.unwrap_or_else(Value::nil)
    });

    // Every element is the same handle, so they are all eq.
    m.defun("make-list", |_m, (n, fill): (i64, Value)| {
        let mut r = Value::nil();
        for _ in 0..n.max(0) {
            r = Value::cons(fill.clone(), r);
        }
        r
    });

    m.defun("consp", |_m, (v,): (Value,)| v.is_list() && !v.is_nil());
    m.defun("listp", |_m, (v,): (Value,)| v.is_list());
    m.defun("nlistp", |_m, (v,): (Value,)| !v.is_list());
    m.defun("atom", |_m, (v,): (Value,)| !(v.is_list() && !v.is_nil()));
    m.defun("null", |_m, (truthy,): (bool,)| !truthy);

    // Length for proper lists, nil for dotted or cyclic ones.
    m.defun("proper-list-p", |_m, (v,): (Value,)| {
        let Value::Cons(cell) = &v else {
            return Value::nil();
        };
        if cell.is_cyclical() {
            return Value::nil();
        }
        let mut p = cell.clone();
        let mut count: i64 = if p.borrow().car.is_some() { 1 } else { 0 };
        while let Some(next) = p.next() {
            count += 1;
            p = next;
            let dotted = matches!(&p.borrow().cdr, Some(tail) if !tail.is_list());
            if dotted {
                return Value::nil();
            }
        }
        // A dotted first cell has no list continuation at all.
        let dotted = matches!(&cell.borrow().cdr, Some(tail) if !tail.is_list());
        if dotted {
            return Value::nil();
        }
        Value::Int(count)
    });
}
