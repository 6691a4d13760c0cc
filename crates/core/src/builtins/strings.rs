//! String builtins.
//!
//! Everything indexes by codepoint. `store-substring` edits the shared
//! storage in place, so the change shows through every handle of the
//! string.

use crate::args::FromValue;
use crate::cons::ListBuilder;
use crate::error::LispError;
use crate::machine::Machine;
use crate::string::LispString;
use crate::value::{MANY_ARGS, Value};
use regex::Regex;

pub fn install(m: &mut Machine) {
    m.defun("stringp", |_m, (v,): (Value,)| v.is_string());

    m.defun("string-or-null-p", |_m, (v,): (Value,)| {
        v.is_string() || v.is_nil()
    });

    m.defun("char-or-string-p", |_m, (v,): (Value,)| {
        v.is_string() || v.is_character()
    });

    m.defun("concat", |_m, (a, b): (String, String)| a + &b);

    m.defun(
        "substring",
        |_m, (s, start, end): (String, Option<i64>, Option<i64>)| {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let normalize = |idx: i64| if idx < 0 { len + idx } else { idx };
            let Some(start) = start else {
                return Ok(Value::string(s));
            };
            let start = normalize(start);
            let end = end.map(normalize).unwrap_or(len);
            if start < 0 || end > len || start > end {
                return Err(LispError::error("String index out of range"));
            }
            let sub: String = chars[start as usize..end as usize].iter().collect();
            Ok(Value::string(sub))
        },
    );

    // Build a string from characters.
    m.make_func("string", 0, MANY_ARGS, |m, args| {
        let mut out = String::new();
        while let Some(v) = args.eval_next(m)? {
            let Some(c) = char::from_value(m, &v) else {
                return Err(LispError::WrongTypeArgument(v.print(false)));
            };
            out.push(c);
        }
        Ok(Value::string(out))
    });

    m.defun("make-string", |_m, (n, c): (i64, char)| {
        let count = usize::try_from(n).unwrap_or(0);
        Value::string(c.to_string().repeat(count))
    });

    m.defun(
        "store-substring",
        |_m, (s, index, replacement): (LispString, i64, Value)| {
            let rep = match &replacement {
                Value::Str(r) => r.borrow().clone(),
                other => match other.char_value() {
                    Some(c) => c.to_string(),
                    None => return Err(LispError::WrongTypeArgument(other.print(false))),
                },
            };
            if index < 0 || !s.store_at(index as usize, &rep) {
                return Err(LispError::error("Index out of range"));
            }
            Ok(Value::Str(s))
        },
    );

    m.defun(
        "split-string",
        |_m, (s, separators, omit_nulls): (String, Option<String>, Option<Value>)| {
            let omit = omit_nulls.map(|v| v.is_truthy()).unwrap_or(false);
            let (pattern, keep_nulls) = match &separators {
                Some(sep) => (sep.clone(), !omit),
                None => ("[ \t\n\r]+".to_string(), false),
            };
            let re = Regex::new(&pattern)
                .map_err(|e| LispError::error(format!("Invalid regexp: {}", e)))?;
            let parts = split_with_pattern(&s, &re, keep_nulls);
            let mut b = ListBuilder::new();
            for p in parts {
                b.append(Value::string(p));
            }
            Ok(Value::Cons(b.build()))
        },
    );
}

/// The classic split loop: a zero-width match where the previous match
/// began advances the search by one codepoint so the scan always makes
/// progress, and null pieces are kept or dropped as requested.
fn split_with_pattern(s: &str, re: &Regex, keep_nulls: bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut notfirst = false;
    let mut prev_begin: Option<usize> = None;
    loop {
        let from = if notfirst && prev_begin == Some(start) && start < s.len() {
            next_char_boundary(s, start)
        } else {
            start
        };
        let Some(found) = re.find_at(s, from) else {
            break;
        };
        if start >= s.len() {
            break;
        }
        notfirst = true;
        prev_begin = Some(found.start());
        if keep_nulls || start < found.start() {
            parts.push(s[start..found.start()].to_string());
        }
        start = found.end();
    }
    if keep_nulls || start < s.len() {
        parts.push(s[start..].to_string());
    }
    parts
}

fn next_char_boundary(s: &str, at: usize) -> usize {
    at + s[at..].chars().next().map(char::len_utf8).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(s: &str, pat: &str, keep: bool) -> Vec<String> {
        split_with_pattern(s, &Regex::new(pat).unwrap(), keep)
    }

    #[test]
    fn test_plain_separator() {
        assert_eq!(split("Soup is good food", "o", true), vec![
            "S", "up is g", "", "d f", "", "d"
        ]);
        assert_eq!(split("Soup is good food", "o+", true), vec![
            "S", "up is g", "d f", "d"
        ]);
    }

    #[test]
    fn test_zero_width_matches_advance() {
        assert_eq!(split("aooob", "o*", true), vec!["", "a", "", "b", ""]);
        assert_eq!(split("ooaboo", "o*", true), vec!["", "", "a", "b", ""]);
        assert_eq!(split("", "", true), vec![""]);
        assert!(split("", "", false).is_empty());
        assert!(split("ooo", "o*", false).is_empty());
    }

    #[test]
    fn test_omit_nulls() {
        assert_eq!(split("Soup is good food", "o*", false), vec![
            "S", "u", "p", " ", "i", "s", " ", "g", "d", " ", "f", "d"
        ]);
        assert_eq!(split("Nice doggy!", "", false), vec![
            "N", "i", "c", "e", " ", "d", "o", "g", "g", "y", "!"
        ]);
    }

    #[test]
    fn test_default_separator_trims() {
        assert_eq!(split("  two words ", "[ \t\n\r]+", false), vec![
            "two", "words"
        ]);
    }
}
