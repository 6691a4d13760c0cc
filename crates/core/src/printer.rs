//! Printed forms.
//!
//! Default mode is reader-faithful; aesthetic mode drops string quotes.
//! Cons printing walks the spine once to detect cycles, then emits the
//! elements, closing a cyclic tail as `. #k` where `k` is the zero-based
//! index of the cell the cycle re-enters. A car that loops back into the
//! spine being printed is emitted as `#k` likewise.

use crate::cons::ConsRef;
use crate::value::Value;
use std::collections::HashMap;

/// Printed form of any value.
pub fn print_value(v: &Value, aesthetic: bool) -> String {
    match v {
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Char(c) => (*c as u32).to_string(),
        Value::Str(s) => {
            if aesthetic {
                s.borrow().clone()
            } else {
                format!("\"{}\"", s.borrow())
            }
        }
        Value::Symbol(s) => s.printed(),
        Value::Function(f) => format!("#<function {}>", f.name),
        Value::Cons(c) => print_cons(c, aesthetic),
    }
}

/// Floats always carry a decimal point, so `1.0` round-trips as a float.
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

fn print_cons(start: &ConsRef, aesthetic: bool) -> String {
    if start.is_empty() {
        return "nil".to_string();
    }

    // One spine pass up front: remember every cell in order and whether
    // the spine loops back on itself.
    let mut cell_ptrs: Vec<*const ()> = Vec::new();
    let mut infinite = false;
    let mut p = Some(start.clone());
    while let Some(c) = p {
        let ptr = c.as_ptr();
        if cell_ptrs.contains(&ptr) {
            infinite = true;
            break;
        }
        cell_ptrs.push(ptr);
        p = c.next();
    }

    if let Some(sugar) = quote_sugar(start, aesthetic) {
        return sugar;
    }

    let mut s = String::from("(");
    let mut t = Some(start.clone());
    let mut visited: HashMap<*const (), usize> = HashMap::new();
    let mut index: i64 = 0;
    let mut loopback: Option<i64> = None;
    while let Some(cur) = t {
        let ptr = cur.as_ptr();
        let (car, cdr, next) = {
            let b = cur.borrow();
            (b.car.clone(), b.cdr.clone(), cur.next())
        };
        if next.is_none() {
            if let Some(tail) = cdr {
                let car_text = car.map(|c| print_value(&c, aesthetic)).unwrap_or_default();
                s.push_str(&car_text);
                s.push_str(" . ");
                s.push_str(&print_value(&tail, aesthetic));
                break;
            }
        }
        let next_count = next
            .as_ref()
            .map(|n| *visited.get(&n.as_ptr()).unwrap_or(&0))
            .unwrap_or(0);
        let threshold = if cell_ptrs.len() > 1 { 2 } else { 1 };
        if infinite && next_count == threshold {
            s.push_str(". ");
            if cell_ptrs.len() == 1 {
                loopback = Some(0);
            }
            s.push_str(&format!("#{}", loopback.unwrap_or(0)));
            break;
        }
        if infinite && loopback.is_none() && next_count > 0 {
            loopback = Some(index);
        }
        *visited.entry(ptr).or_insert(0) += 1;
        index += 1;
        if let Some(car) = car {
            s.push_str(&car_text(&car, &cell_ptrs, aesthetic));
        }
        t = next;
        if t.is_some() {
            s.push(' ');
        }
    }
    s.push(')');
    s
}

/// `'x` for a two-element `(quote x)` list.
fn quote_sugar(start: &ConsRef, aesthetic: bool) -> Option<String> {
    {
        let b = start.borrow();
        match &b.car {
            Some(Value::Symbol(s)) if s.name() == "quote" => {}
            _ => return None,
        }
    }
    let next = start.next()?;
    let b = next.borrow();
    if b.cdr.is_some() {
        return None;
    }
    let quoted = b.car.as_ref()?;
    Some(format!("'{}", print_value(quoted, aesthetic)))
}

/// A car that is itself cyclic and re-enters the spine being printed is
/// shown as a back-reference into that spine.
fn car_text(car: &Value, cell_ptrs: &[*const ()], aesthetic: bool) -> String {
    if let Value::Cons(c) = car {
        if !c.is_empty() && c.is_cyclical() {
            if let Some(i) = cell_ptrs.iter().position(|p| *p == c.as_ptr()) {
                return format!("#{}", i);
            }
        }
    }
    print_value(car, aesthetic)
}
