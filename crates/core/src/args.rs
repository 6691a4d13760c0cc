//! Argument access and the native registration surface.
//!
//! A native function receives the machine and an [`Args`] cursor over the
//! unevaluated argument forms of its call. Ordinary builtins evaluate
//! each argument as they take it; special forms read the raw forms.
//!
//! On top of the cursor sits a typed layer: [`FromValue`] converts an
//! evaluated value into a Rust type (failing with `WrongTypeArgument`),
//! [`FromArg`] drives evaluation plus conversion (with `Option<T>` for
//! optional trailing arguments, where nil means absent), and
//! [`NativeParams`] assembles whole parameter tuples so that
//! `Machine::defun` can register a plainly-typed Rust function and derive
//! its arity from the signature.

use crate::cons::ConsRef;
use crate::error::{EvalResult, LispError};
use crate::machine::Machine;
use crate::string::LispString;
use crate::symbol::SymbolRef;
use crate::value::{Number, Value};

/// Cursor over the argument forms of one call.
pub struct Args {
    forms: Vec<Value>,
    index: usize,
}

impl Args {
    /// Collect the argument forms from the tail of a call form.
    pub fn from_tail(tail: Option<ConsRef>) -> Args {
        let mut forms = Vec::new();
        let mut cur = tail;
        while let Some(c) = cur {
            let (car, next) = {
                let b = c.borrow();
                (b.car.clone(), c.next())
            };
            match car {
                Some(v) => forms.push(v),
                None => break,
            }
            cur = next;
        }
        Args { forms, index: 0 }
    }

    pub fn from_forms(forms: Vec<Value>) -> Args {
        Args { forms, index: 0 }
    }

    /// Total number of argument forms.
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.index < self.forms.len()
    }

    /// The next form without evaluating or advancing.
    pub fn peek_form(&self) -> Option<&Value> {
        self.forms.get(self.index)
    }

    /// Take the next form unevaluated.
    pub fn next_form(&mut self) -> Option<Value> {
        let v = self.forms.get(self.index).cloned();
        if v.is_some() {
            self.index += 1;
        }
        v
    }

    pub fn skip(&mut self) {
        self.index += 1;
    }

    /// Evaluate and take the next argument; `None` when exhausted.
    pub fn eval_next(&mut self, m: &mut Machine) -> EvalResult<Option<Value>> {
        match self.next_form() {
            Some(form) => Ok(Some(m.eval(&form)?)),
            None => Ok(None),
        }
    }
}

/// Conversion from an evaluated value into a Rust parameter type.
pub trait FromValue: Sized {
    fn from_value(m: &mut Machine, v: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    fn from_value(_m: &mut Machine, v: &Value) -> Option<i64> {
        match v {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(_m: &mut Machine, v: &Value) -> Option<f64> {
        match v {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl FromValue for Number {
    fn from_value(_m: &mut Machine, v: &Value) -> Option<Number> {
        match v {
            Value::Int(i) => Some(Number::from_int(*i)),
            Value::Float(f) => Some(Number::from_float(*f)),
            _ => None,
        }
    }
}

impl FromValue for char {
    fn from_value(_m: &mut Machine, v: &Value) -> Option<char> {
        v.char_value()
    }
}

/// Copies the string content out of shared storage.
impl FromValue for String {
    fn from_value(_m: &mut Machine, v: &Value) -> Option<String> {
        match v {
            Value::Str(s) => Some(s.borrow().clone()),
            _ => None,
        }
    }
}

/// Shares the string storage.
impl FromValue for LispString {
    fn from_value(_m: &mut Machine, v: &Value) -> Option<LispString> {
        match v {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Any list, nil included.
impl FromValue for ConsRef {
    fn from_value(_m: &mut Machine, v: &Value) -> Option<ConsRef> {
        match v {
            Value::Cons(c) => Some(c.clone()),
            _ => None,
        }
    }
}

/// Resolves a symbol to its record, interning by name if needed; the
/// binding stack shadows the table, as everywhere else.
impl FromValue for SymbolRef {
    fn from_value(m: &mut Machine, v: &Value) -> Option<SymbolRef> {
        match v {
            Value::Symbol(s) => Some(m.record_for(s)),
            _ => None,
        }
    }
}

/// Truthiness: everything except nil.
impl FromValue for bool {
    fn from_value(_m: &mut Machine, v: &Value) -> Option<bool> {
        Some(v.is_truthy())
    }
}

impl FromValue for Value {
    fn from_value(_m: &mut Machine, v: &Value) -> Option<Value> {
        Some(v.clone())
    }
}

/// One parameter's worth of evaluation and conversion.
///
/// Implemented per concrete type rather than as a blanket over
/// [`FromValue`], so that `Option<T>` can carry its own rule: an
/// optional trailing parameter converts a missing argument or an
/// explicit nil to `None`.
pub trait FromArg: Sized {
    const OPTIONAL: bool = false;

    fn from_arg(m: &mut Machine, args: &mut Args) -> EvalResult<Self>;
}

fn required_arg<T: FromValue>(m: &mut Machine, args: &mut Args) -> EvalResult<T> {
    let v = args
        .eval_next(m)?
        .ok_or(LispError::WrongNumberOfArguments(0))?;
    T::from_value(m, &v).ok_or_else(|| LispError::WrongTypeArgument(v.print(false)))
}

fn optional_arg<T: FromValue>(m: &mut Machine, args: &mut Args) -> EvalResult<Option<T>> {
    if !args.has_next() {
        return Ok(None);
    }
    let v = args
        .eval_next(m)?
        .ok_or(LispError::WrongNumberOfArguments(0))?;
    match T::from_value(m, &v) {
        Some(t) => Ok(Some(t)),
        None if v.is_nil() => Ok(None),
        None => Err(LispError::WrongTypeArgument(v.print(false))),
    }
}

macro_rules! impl_from_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromArg for $ty {
                fn from_arg(m: &mut Machine, args: &mut Args) -> EvalResult<Self> {
                    required_arg::<$ty>(m, args)
                }
            }

            impl FromArg for Option<$ty> {
                const OPTIONAL: bool = true;

                fn from_arg(m: &mut Machine, args: &mut Args) -> EvalResult<Self> {
                    optional_arg::<$ty>(m, args)
                }
            }
        )*
    };
}

impl_from_arg!(
    i64,
    f64,
    Number,
    char,
    String,
    LispString,
    ConsRef,
    SymbolRef,
    bool,
    Value,
);

/// Conversion from a Rust return value back into a `Value`.
pub trait IntoValue {
    fn into_value(self, m: &mut Machine) -> EvalResult<Value>;
}

impl IntoValue for Value {
    fn into_value(self, _m: &mut Machine) -> EvalResult<Value> {
        Ok(self)
    }
}

impl IntoValue for EvalResult<Value> {
    fn into_value(self, _m: &mut Machine) -> EvalResult<Value> {
        self
    }
}

impl IntoValue for i64 {
    fn into_value(self, _m: &mut Machine) -> EvalResult<Value> {
        Ok(Value::Int(self))
    }
}

impl IntoValue for f64 {
    fn into_value(self, _m: &mut Machine) -> EvalResult<Value> {
        Ok(Value::Float(self))
    }
}

impl IntoValue for bool {
    fn into_value(self, _m: &mut Machine) -> EvalResult<Value> {
        Ok(Value::from_bool(self))
    }
}

impl IntoValue for String {
    fn into_value(self, _m: &mut Machine) -> EvalResult<Value> {
        Ok(Value::string(self))
    }
}

impl IntoValue for LispString {
    fn into_value(self, _m: &mut Machine) -> EvalResult<Value> {
        Ok(Value::Str(self))
    }
}

impl IntoValue for ConsRef {
    fn into_value(self, _m: &mut Machine) -> EvalResult<Value> {
        Ok(Value::Cons(self))
    }
}

impl IntoValue for SymbolRef {
    fn into_value(self, _m: &mut Machine) -> EvalResult<Value> {
        Ok(Value::symbol(self))
    }
}

/// A full parameter tuple, with arity derived from the types.
pub trait NativeParams: Sized {
    fn min_args() -> usize;
    fn max_args() -> usize;
    fn extract(m: &mut Machine, args: &mut Args) -> EvalResult<Self>;
}

macro_rules! impl_native_params {
    ($($name:ident),*) => {
        impl<$($name: FromArg),*> NativeParams for ($($name,)*) {
            fn min_args() -> usize {
                let flags: &[bool] = &[$($name::OPTIONAL),*];
                debug_assert!(
                    flags.windows(2).all(|w| !w[0] || w[1]),
                    "optional parameters must be trailing"
                );
                flags.iter().filter(|optional| !**optional).count()
            }

            fn max_args() -> usize {
                let flags: &[bool] = &[$($name::OPTIONAL),*];
                flags.len()
            }

            #[allow(unused_variables)]
            fn extract(m: &mut Machine, args: &mut Args) -> EvalResult<Self> {
                Ok(($($name::from_arg(m, args)?,)*))
            }
        }
    };
}

impl_native_params!();
impl_native_params!(A);
impl_native_params!(A, B);
impl_native_params!(A, B, C);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_walks_forms() {
        let mut args = Args::from_forms(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(args.len(), 2);
        assert!(matches!(args.next_form(), Some(Value::Int(1))));
        assert!(args.has_next());
        args.skip();
        assert!(!args.has_next());
        assert!(args.next_form().is_none());
    }

    #[test]
    fn test_from_tail_stops_at_empty_cell() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let Value::Cons(cell) = &list else {
            unreachable!()
        };
        let args = Args::from_tail(Some(cell.clone()));
        assert_eq!(args.len(), 3);
        let none = Args::from_tail(None);
        assert!(none.is_empty());
    }

    #[test]
    fn test_tuple_arity() {
        assert_eq!(<(i64, i64)>::min_args(), 2);
        assert_eq!(<(i64, i64)>::max_args(), 2);
        assert_eq!(<(String, Option<i64>, Option<i64>)>::min_args(), 1);
        assert_eq!(<(String, Option<i64>, Option<i64>)>::max_args(), 3);
        assert_eq!(<()>::min_args(), 0);
    }

    #[test]
    fn test_conversions() {
        let mut m = Machine::new(false);
        assert_eq!(i64::from_value(&mut m, &Value::Int(4)), Some(4));
        assert_eq!(i64::from_value(&mut m, &Value::Float(4.0)), None);
        assert_eq!(f64::from_value(&mut m, &Value::Int(4)), None);
        assert_eq!(char::from_value(&mut m, &Value::Int(97)), Some('a'));
        assert_eq!(bool::from_value(&mut m, &Value::nil()), Some(false));
        assert_eq!(bool::from_value(&mut m, &Value::Int(0)), Some(true));
    }
}
