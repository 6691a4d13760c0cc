//! The reader: text to value trees.
//!
//! The reader is self-contained and produces by-name symbol references;
//! nothing is interned until evaluation looks a name up. Several
//! top-level forms are wrapped in `(progn …)` so that evaluation of a
//! whole input is sequential.
//!
//! ```text
//! expr    := atom | list | quoted | string | char
//! list    := '(' expr* ('.' expr)? ')'
//! quoted  := "'" expr
//! string  := '"' ... '"'       raw copy, no escape processing
//! char    := '?' <one scalar>
//! atom    := [A-Za-z0-9.+%*/=?-]+
//! ```
//!
//! A `;` starts a comment running to end of line. A `.` inside a list is
//! only the cdr marker when it stands alone; otherwise it is an ordinary
//! symbol constituent, which takes one token of lookahead to decide.

use crate::cons::ConsRef;
use crate::error::{EvalResult, LispError};
use crate::value::Value;

/// Read a whole input. Multiple top-level forms become one `(progn …)`;
/// an input with no forms at all reads as nil.
pub fn read(src: &str) -> EvalResult<Value> {
    let mut r = Reader::new(src);
    let Some(first) = r.parse_next()? else {
        return Ok(Value::nil());
    };
    r.skip_whitespace();
    if r.at_end() {
        return Ok(first);
    }
    let mut items = vec![Value::symbol_named("progn"), first];
    loop {
        match r.parse_next()? {
            Some(form) => items.push(form),
            None => break,
        }
    }
    Ok(Value::list(items))
}

struct Reader {
    chars: Vec<char>,
    pos: usize,
}

fn is_sym_char(c: char) -> bool {
    matches!(c, '.' | '?' | '+' | '%' | '*' | '=' | '/' | '-') || c.is_ascii_alphanumeric()
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

impl Reader {
    fn new(src: &str) -> Reader {
        Reader {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if is_whitespace(c) {
                self.pos += 1;
            } else if c == ';' {
                while let Some(c) = self.peek() {
                    self.pos += 1;
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !is_sym_char(c) {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        name
    }

    fn parse_next(&mut self) -> EvalResult<Option<Value>> {
        self.skip_whitespace();
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        match c {
            '"' => {
                self.pos += 1;
                self.parse_string().map(Some)
            }
            '\'' => {
                self.pos += 1;
                match self.parse_next()? {
                    Some(v) => Ok(Some(Value::quoted(v))),
                    None => Err(LispError::Syntax("End of file after quote".to_string())),
                }
            }
            '(' => self.parse_list().map(Some),
            c if is_sym_char(c) => self.parse_named().map(Some),
            c => Err(LispError::Syntax(format!("Unexpected character: {}", c))),
        }
    }

    fn parse_string(&mut self) -> EvalResult<Value> {
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Value::string(s)),
                Some(c) => s.push(c),
                None => {
                    return Err(LispError::Syntax(
                        "End of file inside string literal".to_string(),
                    ));
                }
            }
        }
    }

    fn parse_named(&mut self) -> EvalResult<Value> {
        let name = self.read_name();
        if let Some(rest) = name.strip_prefix('?') {
            let mut it = rest.chars();
            return match (it.next(), it.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                // A bare `?` takes the next character raw, whatever it is.
                (None, _) => match self.bump() {
                    Some(c) => Ok(Value::Char(c)),
                    None => Err(LispError::Syntax(
                        "End of file after character prefix".to_string(),
                    )),
                },
                _ => Err(LispError::Syntax(format!("Invalid read syntax: {}", name))),
            };
        }
        if let Some(num) = numeric_constant(&name) {
            return Ok(num);
        }
        if name == "nil" {
            // The printed forms of () and nil are indistinguishable to
            // the evaluator, so collapse them here already.
            return Ok(Value::nil());
        }
        Ok(Value::symbol_named(name))
    }

    fn parse_list(&mut self) -> EvalResult<Value> {
        self.pos += 1; // '('
        let list = ConsRef::empty();
        let mut last = list.clone();
        let mut dotted = false;
        let mut dot_filled = false;
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(LispError::Syntax("End of file during parsing".to_string()));
                }
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }
            if dot_filled {
                return Err(LispError::Syntax(
                    "More than one form after . in list".to_string(),
                ));
            }
            if self.peek() == Some('.') {
                let saved = self.pos;
                let name = self.read_name();
                if name == "." {
                    if dotted {
                        return Err(LispError::Syntax("Unexpected . in list".to_string()));
                    }
                    if last.borrow().car.is_none() {
                        return Err(LispError::Syntax(
                            "Dotted pair with no preceding form".to_string(),
                        ));
                    }
                    dotted = true;
                    continue;
                }
                self.pos = saved;
            }
            let Some(item) = self.parse_next()? else {
                return Err(LispError::Syntax("End of file during parsing".to_string()));
            };
            if dotted {
                last.set_cdr(Some(item));
                dot_filled = true;
                continue;
            }
            if last.borrow().car.is_some() {
                let fresh = ConsRef::empty();
                last.set_cdr(Some(Value::Cons(fresh.clone())));
                last = fresh;
            }
            last.set_car(Some(item));
        }
        if dotted && !dot_filled {
            return Err(LispError::Syntax("Missing form after . in list".to_string()));
        }
        Ok(Value::Cons(list))
    }
}

fn numeric_constant(s: &str) -> Option<Value> {
    let mut dots = 0;
    let mut digits = 0;
    for (i, c) in s.chars().enumerate() {
        match c {
            '.' => {
                dots += 1;
                if dots == 2 {
                    return None;
                }
            }
            '+' | '-' => {
                if i > 0 {
                    return None;
                }
            }
            '0'..='9' => digits += 1,
            _ => return None,
        }
    }
    if digits == 0 {
        return None;
    }
    if dots > 0 {
        s.parse::<f64>().ok().map(Value::Float)
    } else {
        s.parse::<i64>().ok().map(Value::Int)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printed(src: &str) -> String {
        read(src).unwrap().print(false)
    }

    #[test]
    fn test_atoms() {
        assert_eq!(printed("12"), "12");
        assert_eq!(printed("-1"), "-1");
        assert_eq!(printed("+5"), "5");
        assert_eq!(printed("1.5"), "1.5");
        assert_eq!(printed("+.1"), "0.1");
        assert_eq!(printed("foo"), "foo");
        assert_eq!(printed("1+"), "1+");
        assert_eq!(printed("nil"), "nil");
        assert_eq!(printed("\"hi\""), "\"hi\"");
    }

    #[test]
    fn test_character_literals() {
        assert!(matches!(read("?a"), Ok(Value::Char('a'))));
        assert!(matches!(read("?0"), Ok(Value::Char('0'))));
        assert!(matches!(read("?("), Ok(Value::Char('('))));
        assert!(matches!(read("?λ"), Ok(Value::Char('λ'))));
        assert!(matches!(read("?"), Err(LispError::Syntax(_))));
        assert!(matches!(read("?ab"), Err(LispError::Syntax(_))));
    }

    #[test]
    fn test_lists() {
        assert_eq!(printed("()"), "nil");
        assert_eq!(printed("(1 2 3)"), "(1 2 3)");
        assert_eq!(printed("(1 (2 3) 4)"), "(1 (2 3) 4)");
        assert_eq!(printed("(a . b)"), "(a . b)");
        assert_eq!(printed("(1 2 . 3)"), "(1 2 . 3)");
        assert_eq!(printed("(a . nil)"), "(a)");
    }

    #[test]
    fn test_dot_is_a_symbol_constituent() {
        assert_eq!(printed("(.5)"), "(0.5)");
        assert_eq!(printed("(.foo)"), "(.foo)");
        assert_eq!(printed("(a .b)"), "(a .b)");
    }

    #[test]
    fn test_quote_desugars() {
        assert_eq!(printed("'foo"), "'foo");
        assert_eq!(printed("''foo"), "''foo");
        assert_eq!(printed("'(1 2)"), "'(1 2)");
        assert_eq!(printed("('a'b)"), "('a 'b)");
    }

    #[test]
    fn test_comments_are_whitespace() {
        assert_eq!(printed("'(;comment\n1)"), "'(1)");
        assert_eq!(printed("1 ; trailing"), "1");
    }

    #[test]
    fn test_multiple_forms_wrap_in_progn() {
        assert_eq!(printed("1 2 3"), "(progn 1 2 3)");
        assert_eq!(printed(""), "nil");
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(read("(car"), Err(LispError::Syntax(_))));
        assert!(matches!(read("\"abc"), Err(LispError::Syntax(_))));
        assert!(matches!(read("(a . )"), Err(LispError::Syntax(_))));
        assert!(matches!(read("(a . b c)"), Err(LispError::Syntax(_))));
        assert!(matches!(read("(a . . b)"), Err(LispError::Syntax(_))));
        assert!(matches!(read("(. b)"), Err(LispError::Syntax(_))));
        assert!(matches!(read(")"), Err(LispError::Syntax(_))));
    }
}
