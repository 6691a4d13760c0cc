//! Evaluator error taxonomy.
//!
//! Every failure the reader or evaluator can produce is a `LispError`.
//! Errors unwind through `EvalResult` to the nearest caller; the REPL is
//! the handler of last resort and keeps running after printing them.

use crate::value::Value;
use std::fmt;

/// Result alias used throughout the interpreter.
pub type EvalResult<T> = Result<T, LispError>;

/// Error type for reading and evaluating expressions.
#[derive(Debug, Clone)]
pub enum LispError {
    /// Malformed input text (unclosed list or string, bad character literal).
    Syntax(String),
    /// The head of a form does not name a function.
    VoidFunction(String),
    /// A symbol with no value in any live binding.
    VoidVariable(String),
    /// Argument count outside the function's declared arity.
    WrongNumberOfArguments(usize),
    /// An argument of the wrong type; carries the printed offender.
    WrongTypeArgument(String),
    /// Division by zero and friends.
    Arith(String),
    /// A signaled error: tag symbol plus associated data list.
    ///
    /// `(signal sym data)` produces this directly; internal errors use the
    /// `error` tag with a one-string data list.
    Signal {
        symbol: String,
        data: Option<Value>,
    },
    /// The evaluator could not make sense of a form at all.
    UnableToEvaluate(String),
}

impl LispError {
    /// General error with the `error` tag and a one-string data list.
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let data = Value::list(vec![Value::string(msg.clone())]);
        LispError::Signal {
            symbol: "error".to_string(),
            data: Some(data),
        }
    }

    /// Short kind name, as shown by the REPL before the message.
    pub fn kind(&self) -> &'static str {
        match self {
            LispError::Syntax(_) => "syntax-error",
            LispError::VoidFunction(_) => "void-function",
            LispError::VoidVariable(_) => "void-variable",
            LispError::WrongNumberOfArguments(_) => "wrong-number-of-arguments",
            LispError::WrongTypeArgument(_) => "wrong-type-argument",
            LispError::Arith(_) => "arith-error",
            LispError::Signal { .. } => "error",
            LispError::UnableToEvaluate(_) => "unable-to-evaluate",
        }
    }

    /// The message carried by a signaled error: the first string in the
    /// data list if there is one, else the tag symbol's name.
    fn signal_message(symbol: &str, data: &Option<Value>) -> String {
        if let Some(list) = data {
            if let Value::Cons(cell) = list {
                let first = cell.borrow().car.clone();
                if let Some(Value::Str(s)) = first {
                    return s.borrow().clone();
                }
            }
        }
        symbol.to_string()
    }
}

impl fmt::Display for LispError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LispError::Syntax(msg) => write!(f, "{}", msg),
            LispError::VoidFunction(name) => write!(f, "void-function: {}", name),
            LispError::VoidVariable(name) => write!(f, "void-variable: {}", name),
            LispError::WrongNumberOfArguments(n) => {
                write!(f, "wrong-number-of-arguments: {}", n)
            }
            LispError::WrongTypeArgument(printed) => {
                write!(f, "wrong-type-argument: {}", printed)
            }
            LispError::Arith(msg) => write!(f, "arith-error: {}", msg),
            LispError::Signal { symbol, data } => {
                write!(f, "{}", Self::signal_message(symbol, data))
            }
            LispError::UnableToEvaluate(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LispError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_carries_message() {
        let err = LispError::error("something broke");
        assert_eq!(err.kind(), "error");
        assert_eq!(err.to_string(), "something broke");
    }

    #[test]
    fn test_signal_without_string_data_prints_symbol() {
        let err = LispError::Signal {
            symbol: "my-condition".to_string(),
            data: None,
        };
        assert_eq!(err.to_string(), "my-condition");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(LispError::Syntax(String::new()).kind(), "syntax-error");
        assert_eq!(LispError::VoidVariable("x".into()).kind(), "void-variable");
        assert_eq!(LispError::Arith("x".into()).kind(), "arith-error");
    }
}
