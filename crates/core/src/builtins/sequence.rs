//! Operations over sequences: lists and strings.

use crate::cons::{ConsRef, ListBuilder};
use crate::error::{EvalResult, LispError};
use crate::machine::Machine;
use crate::value::Value;

pub fn install(m: &mut Machine) {
    m.defun("length", |_m, (v,): (Value,)| match &v {
        Value::Cons(cell) => Ok(Value::Int(list_length(cell)? as i64)),
        Value::Str(s) => Ok(Value::Int(s.len_chars() as i64)),
        other => Err(LispError::WrongTypeArgument(other.print(false))),
    });

    m.defun("elt", |_m, (v, index): (Value, i64)| match &v {
        Value::Cons(cell) => {
            let mut p = cell.clone();
            for _ in 0..index.max(0) {
                match p.next() {
                    Some(n) => p = n,
                    None => return Ok(Value::nil()),
                }
            }
            let car = p.borrow().car.clone();
            Ok(car.unwrap_or_else(Value::nil))
        }
        Value::Str(s) => {
            if index < 0 {
                return Err(LispError::error("Index out of range."));
            }
            s.char_at(index as usize)
                .map(Value::Char)
                .ok_or_else(|| LispError::error("Index out of range."))
        }
        other => Err(LispError::WrongTypeArgument(other.print(false))),
    });

    m.defun("sequencep", |_m, (v,): (Value,)| {
        v.is_list() || v.is_string()
    });

    m.defun("reverse", |_m, (v,): (Value,)| match &v {
        Value::Cons(cell) => {
            let mut items = Vec::new();
            let mut seen = Vec::new();
            let mut cur = if cell.is_empty() {
                None
            } else {
                Some(cell.clone())
            };
            while let Some(c) = cur {
                if seen.contains(&c.as_ptr()) {
                    return Err(LispError::error("Cyclical list reverse"));
                }
                seen.push(c.as_ptr());
                let (car, cdr, next) = {
                    let b = c.borrow();
                    (b.car.clone(), b.cdr.clone(), c.next())
                };
                if next.is_none() {
                    if let Some(tail) = cdr {
                        return Err(LispError::WrongTypeArgument(tail.print(false)));
                    }
                }
                if let Some(car) = car {
                    items.push(car);
                }
                cur = next;
            }
            let mut b = ListBuilder::new();
            for item in items.into_iter().rev() {
                b.append(item);
            }
            Ok(Value::Cons(b.build()))
        }
        Value::Str(s) => {
            let reversed: String = s.borrow().chars().rev().collect();
            Ok(Value::string(reversed))
        }
        other => Err(LispError::WrongTypeArgument(other.print(false))),
    });
}

/// Spine length; a repeated cell means the list is cyclic and has none.
fn list_length(cell: &ConsRef) -> EvalResult<usize> {
    if cell.is_empty() {
        return Ok(0);
    }
    let mut visited = vec![cell.as_ptr()];
    let mut len = 1;
    let mut p = cell.clone();
    while let Some(next) = p.next() {
        if visited.contains(&next.as_ptr()) {
            return Err(LispError::error("Cyclical list length"));
        }
        visited.push(next.as_ptr());
        len += 1;
        p = next;
    }
    Ok(len)
}
