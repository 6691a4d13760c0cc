//! The machine: symbol table, binding stack and evaluator.
//!
//! Variable lookup is dynamic: a name resolves to the topmost entry of
//! its binding stack if one is live, else to the global record. `let`,
//! `let*` and user function calls push bindings and pop them on every
//! exit path; errors are `Result`s, so the pops sit on the ordinary
//! return paths and unwinding cannot leak a binding.
//!
//! A form `(head . rest)` dispatches on `head`: special forms and
//! functions live in the same function slots and differ only in whether
//! they evaluate their arguments; a function whose macro flag is set has
//! its expansion evaluated exactly once in the caller's environment.

use crate::args::{Args, IntoValue, NativeParams};
use crate::builtins;
use crate::cons::ConsRef;
use crate::error::{EvalResult, LispError};
use crate::init;
use crate::reader;
use crate::symbol::{Symbol, SymbolRef, SymbolValue};
use crate::value::{Function, FunctionBody, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// Call-stack depth cap for user programs.
pub const MAX_RECURSION_DEPTH: usize = 500;

/// One interpreter instance: the global symbol table, the dynamic
/// binding stack and the message sink.
pub struct Machine {
    symbols: HashMap<String, SymbolRef>,
    locals: HashMap<String, Vec<SymbolRef>>,
    message_handler: Option<Box<dyn FnMut(&str)>>,
    depth: usize,
}

impl Machine {
    /// A fresh machine; with `init_std` the standard library is
    /// registered and the bootstrap program evaluated.
    pub fn new(init_std: bool) -> Machine {
        let mut m = Machine {
            symbols: HashMap::new(),
            locals: HashMap::new(),
            message_handler: None,
            depth: 0,
        };
        if init_std {
            m.set_variable("nil", Value::nil(), true);
            m.set_variable("t", Value::truth(), true);
            builtins::install_all(&mut m);
            m.evaluate(init::BOOTSTRAP)
                .expect("bootstrap program is well-formed");
        }
        m
    }

    /// Read a form (or a `progn` of several) from text.
    pub fn parse(&self, text: &str) -> EvalResult<Value> {
        reader::read(text)
    }

    /// Read and evaluate.
    pub fn evaluate(&mut self, text: &str) -> EvalResult<Value> {
        let form = reader::read(text)?;
        self.eval(&form)
    }

    /// Install a global variable.
    pub fn set_variable(&mut self, name: &str, value: Value, constant: bool) {
        let record = self.get_symbol(name);
        record.set_variable(Some(value));
        record.borrow_mut().constant = constant;
    }

    /// Sink for `message` output; unset, `message` writes to stdout.
    pub fn set_message_handler(&mut self, handler: impl FnMut(&str) + 'static) {
        self.message_handler = Some(Box::new(handler));
    }

    pub(crate) fn emit_message(&mut self, text: &str) {
        match &mut self.message_handler {
            Some(h) => h(text),
            None => println!("{}", text),
        }
    }

    /// The record for `name`, interned on first use. A live local
    /// binding shadows the table.
    pub fn intern(&mut self, name: &str) -> SymbolRef {
        self.get_symbol(name)
    }

    /// Remove `name` from the table. Existing handles keep the record
    /// alive; it merely stops being discoverable.
    pub fn unintern(&mut self, name: &str) -> bool {
        self.symbols.remove(name).is_some()
    }

    /// Table lookup without interning or consulting the binding stack.
    pub fn table_lookup(&self, name: &str) -> Option<SymbolRef> {
        self.symbols.get(name).cloned()
    }

    pub(crate) fn table_records(&self) -> Vec<SymbolRef> {
        self.symbols.values().cloned().collect()
    }

    pub(crate) fn get_symbol(&mut self, name: &str) -> SymbolRef {
        if let Some(top) = self.locals.get(name).and_then(|s| s.last()) {
            return top.clone();
        }
        if let Some(r) = self.symbols.get(name) {
            return r.clone();
        }
        let r = SymbolRef::new(Symbol::named(name));
        self.symbols.insert(name.to_string(), r.clone());
        r
    }

    pub(crate) fn get_symbol_or_null(&self, name: &str) -> Option<SymbolRef> {
        if let Some(top) = self.locals.get(name).and_then(|s| s.last()) {
            return Some(top.clone());
        }
        self.symbols.get(name).cloned()
    }

    /// The record behind a symbol value, interning by-name references.
    pub(crate) fn record_for(&mut self, s: &SymbolValue) -> SymbolRef {
        match s {
            SymbolValue::Record(r) => r.clone(),
            SymbolValue::Named(n) => self.get_symbol(n),
        }
    }

    fn record_for_readonly(&self, s: &SymbolValue) -> Option<SymbolRef> {
        match s {
            SymbolValue::Record(r) => Some(r.clone()),
            SymbolValue::Named(n) => self.get_symbol_or_null(n),
        }
    }

    pub(crate) fn top_local(&self, name: &str) -> Option<SymbolRef> {
        self.locals.get(name).and_then(|s| s.last()).cloned()
    }

    pub(crate) fn push_local(&mut self, name: &str, value: Value) {
        let mut sym = Symbol::named(name);
        sym.local = true;
        sym.variable = Some(value);
        self.locals
            .entry(name.to_string())
            .or_default()
            .push(SymbolRef::new(sym));
    }

    pub(crate) fn pop_local(&mut self, name: &str) {
        if let Some(stack) = self.locals.get_mut(name) {
            stack.pop();
            if stack.is_empty() {
                self.locals.remove(name);
            }
        }
    }

    /// Current binding-stack height for a name; the balance invariant
    /// says this is unchanged across any completed evaluation.
    pub fn binding_depth(&self, name: &str) -> usize {
        self.locals.get(name).map(|s| s.len()).unwrap_or(0)
    }

    /// The current value of a name: topmost binding first, table second.
    pub(crate) fn resolve_variable_value(&self, name: &str) -> Option<Value> {
        if let Some(top) = self.locals.get(name).and_then(|s| s.last()) {
            return top.borrow().variable.clone();
        }
        self.symbols.get(name).and_then(|r| r.borrow().variable.clone())
    }

    /// Function resolution never consults the binding stack.
    pub(crate) fn resolve_function(&self, name: &str) -> Option<Rc<Function>> {
        self.symbols.get(name).and_then(|r| r.borrow().function.clone())
    }

    pub(crate) fn function_of(&self, s: &SymbolValue) -> Option<Rc<Function>> {
        match s {
            SymbolValue::Record(r) => r.borrow().function.clone(),
            SymbolValue::Named(n) => self.resolve_function(n),
        }
    }

    /// Register a native function under `name`.
    pub fn make_func<F>(&mut self, name: &str, min_args: usize, max_args: usize, f: F)
    where
        F: Fn(&mut Machine, &mut Args) -> EvalResult<Value> + 'static,
    {
        let func = Rc::new(Function {
            name: name.to_string(),
            min_args,
            max_args,
            is_macro: false,
            body: FunctionBody::Native(Rc::new(f)),
        });
        self.install_function(name, func);
    }

    /// Register a typed native function; arity is derived from the
    /// parameter tuple, with `Option<T>` parameters optional.
    pub fn defun<P, R, F>(&mut self, name: &str, f: F)
    where
        P: NativeParams + 'static,
        R: IntoValue + 'static,
        F: Fn(&mut Machine, P) -> R + 'static,
    {
        let min = P::min_args();
        let max = P::max_args();
        self.make_func(name, min, max, move |m, args| {
            let params = P::extract(m, args)?;
            f(m, params).into_value(m)
        });
    }

    pub fn install_function(&mut self, name: &str, func: Rc<Function>) {
        let record = self.get_symbol(name);
        record.set_function(Some(func));
    }

    /// Evaluate a value to a value.
    pub fn eval(&mut self, v: &Value) -> EvalResult<Value> {
        match v {
            Value::Int(_) | Value::Float(_) | Value::Char(_) | Value::Str(_)
            | Value::Function(_) => Ok(v.clone()),
            Value::Symbol(s) => self.eval_symbol(s),
            Value::Cons(c) => self.eval_form(c),
        }
    }

    fn eval_symbol(&mut self, s: &SymbolValue) -> EvalResult<Value> {
        let var = match s {
            SymbolValue::Record(r) => r.borrow().variable.clone(),
            SymbolValue::Named(n) => self.resolve_variable_value(n),
        };
        var.ok_or_else(|| LispError::VoidVariable(s.printed()))
    }

    fn eval_form(&mut self, cell: &ConsRef) -> EvalResult<Value> {
        if cell.is_empty() {
            return Ok(Value::nil());
        }
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(LispError::error("Max recursion depth limit exceeded."));
        }
        self.depth += 1;
        let result = self.eval_form_inner(cell);
        self.depth -= 1;
        result
    }

    fn eval_form_inner(&mut self, cell: &ConsRef) -> EvalResult<Value> {
        let head = {
            let b = cell.borrow();
            b.car.clone()
        };
        let Some(head) = head else {
            return Err(LispError::VoidFunction("nil".to_string()));
        };
        let func = match &head {
            Value::Symbol(s) => self.function_of(s),
            _ => None,
        };
        let Some(func) = func else {
            return Err(LispError::VoidFunction(head.print(false)));
        };
        let mut args = Args::from_tail(cell.next());
        if func.is_macro {
            check_arity(&func, args.len())?;
            let expansion = self.expand_macro_call(&func, &mut args)?;
            return self.eval(&expansion);
        }
        self.call_function(&func, &mut args)
    }

    /// Invoke a function on collected argument forms, checking arity.
    pub fn call_function(&mut self, func: &Rc<Function>, args: &mut Args) -> EvalResult<Value> {
        check_arity(func, args.len())?;
        match &func.body {
            FunctionBody::Native(f) => {
                let f = Rc::clone(f);
                f(self, args)
            }
            FunctionBody::Lambda { params, body } => {
                let params = params.clone();
                let body = body.clone();
                self.apply_lambda(&params, &body, args)
            }
        }
    }

    /// Arguments are all evaluated in the caller's scope first; only then
    /// are the parameter bindings pushed.
    fn apply_lambda(
        &mut self,
        params: &[String],
        body: &ConsRef,
        args: &mut Args,
    ) -> EvalResult<Value> {
        let mut values = Vec::with_capacity(params.len());
        while let Some(v) = args.eval_next(self)? {
            values.push(v);
        }
        let mut pushed = 0;
        for (name, value) in params.iter().zip(values) {
            self.push_local(name, value);
            pushed += 1;
        }
        let result = self.eval_body(body);
        for name in params[..pushed].iter().rev() {
            self.pop_local(name);
        }
        result
    }

    /// Evaluate the forms of a body list in order; the last value wins.
    pub(crate) fn eval_body(&mut self, body: &ConsRef) -> EvalResult<Value> {
        let mut result = Value::nil();
        let mut cur = if body.is_empty() {
            None
        } else {
            Some(body.clone())
        };
        while let Some(c) = cur {
            let (form, next) = {
                let b = c.borrow();
                (b.car.clone(), c.next())
            };
            if let Some(form) = form {
                result = self.eval(&form)?;
            }
            cur = next;
        }
        Ok(result)
    }

    /// One macro expansion: deep-copy the body, substitute each parameter
    /// symbol with its quoted argument form, and evaluate the body forms.
    /// The caller decides what happens to the resulting form.
    fn expand_macro_call(&mut self, func: &Rc<Function>, args: &mut Args) -> EvalResult<Value> {
        let FunctionBody::Lambda { params, body } = &func.body else {
            return Err(LispError::UnableToEvaluate(format!(
                "{} has no expandable body",
                func.name
            )));
        };
        let mut substitutions: HashMap<String, Value> = HashMap::new();
        for p in params {
            let form = args.next_form().unwrap_or_else(Value::nil);
            substitutions.insert(p.clone(), form);
        }
        let copied = body.deep_copy();
        substitute_symbols(&copied, &substitutions);
        self.eval_body(&copied)
    }

    /// Expand a form while its head names a macro (`once` stops after
    /// the first step). Non-macro forms come back untouched, which makes
    /// full expansion a fixed point.
    pub fn macro_expand(&mut self, form: &Value, once: bool) -> EvalResult<Value> {
        let mut cur = form.clone();
        loop {
            let cell = match &cur {
                Value::Cons(c) if !c.is_empty() => c.clone(),
                _ => return Ok(cur),
            };
            let head = {
                let b = cell.borrow();
                b.car.clone()
            };
            let Some(Value::Symbol(s)) = head else {
                return Ok(cur);
            };
            let Some(func) = self.function_of(&s) else {
                return Ok(cur);
            };
            if !func.is_macro {
                return Ok(cur);
            }
            let mut args = Args::from_tail(cell.next());
            check_arity(&func, args.len())?;
            cur = self.expand_macro_call(&func, &mut args)?;
            if once {
                return Ok(cur);
            }
        }
    }

    /// Identity equality: scalars by value, shared storage by handle,
    /// symbols by the record their name currently resolves to.
    pub fn values_eq(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y,
            (Value::Char(x), Value::Char(y)) => x == y,
            (Value::Str(x), Value::Str(y)) => x.ptr_eq(y),
            (Value::Cons(x), Value::Cons(y)) => {
                (x.is_empty() && y.is_empty()) || x.ptr_eq(y)
            }
            (Value::Symbol(x), Value::Symbol(y)) => {
                match (self.record_for_readonly(x), self.record_for_readonly(y)) {
                    (Some(p), Some(q)) => p.ptr_eq(&q),
                    (None, None) => true,
                    _ => false,
                }
            }
            (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }

}

fn check_arity(func: &Function, argc: usize) -> EvalResult<()> {
    if argc < func.min_args || argc > func.max_args {
        return Err(LispError::WrongNumberOfArguments(argc));
    }
    Ok(())
}

/// Deep, name-based substitution for macro expansion. Replaces every
/// symbol in car position whose name is a parameter with the quoted
/// argument form; descends into nested lists. Inner rebindings of a
/// parameter name are rewritten too, matching the macro semantics the
/// language has always had.
fn substitute_symbols(list: &ConsRef, map: &HashMap<String, Value>) {
    let mut cur = Some(list.clone());
    while let Some(c) = cur {
        let (car, next) = {
            let b = c.borrow();
            (b.car.clone(), c.next())
        };
        match &car {
            Some(Value::Symbol(s)) => {
                if let Some(replacement) = map.get(&s.name()) {
                    c.set_car(Some(Value::quoted(replacement.clone())));
                }
            }
            Some(Value::Cons(inner)) => substitute_symbols(inner, map),
            _ => {}
        }
        cur = next;
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::live_objects;
    use std::cell::RefCell;

    fn machine() -> Machine {
        Machine::new(true)
    }

    fn out(m: &mut Machine, expr: &str) -> String {
        match m.evaluate(expr) {
            Ok(v) => v.print(false),
            Err(e) => panic!("evaluating {:?} failed: {}", expr, e),
        }
    }

    fn assert_out(m: &mut Machine, expr: &str, expected: &str) {
        assert_eq!(out(m, expr), expected, "for input {:?}", expr);
    }

    fn assert_err(m: &mut Machine, expr: &str, kind: &str) {
        match m.evaluate(expr) {
            Ok(v) => panic!(
                "expected {:?} to fail with {}, got {}",
                expr,
                kind,
                v.print(false)
            ),
            Err(e) => assert_eq!(e.kind(), kind, "for input {:?}", expr),
        }
    }

    #[test]
    fn test_list_basics() {
        let mut m = machine();
        assert_out(&mut m, "(make-list 3 'pigs)", "(pigs pigs pigs)");
        assert_out(&mut m, "(make-list 0 'pigs)", "nil");
        assert_out(&mut m, "(setq l (make-list 3 '(a b)))", "((a b) (a b) (a b))");
        assert_out(&mut m, "(eq (car l) (cadr l))", "t");
        assert_out(&mut m, "(listp (quote nil))", "t");
        assert_out(&mut m, "(listp nil)", "t");
        assert_out(&mut m, "(listp 'nil)", "t");
        assert_out(&mut m, "'(1 2 . 3)", "(1 2 . 3)");
        assert_out(&mut m, "()", "nil");
        assert_out(&mut m, "'(1)", "(1)");
        assert_out(&mut m, "'(1 2 3)", "(1 2 3)");
        assert_out(&mut m, "(consp '(1 2))", "t");
        assert_out(&mut m, "(consp 1)", "nil");
        assert_out(&mut m, "(consp nil)", "nil");
        assert_out(&mut m, "(atom '(1 2))", "nil");
        assert_out(&mut m, "(atom 1)", "t");
        assert_out(&mut m, "(atom nil)", "t");
        assert_out(&mut m, "(nlistp 1)", "t");
        assert_out(&mut m, "(nlistp nil)", "nil");
        assert_out(&mut m, "'(a . b)", "(a . b)");
        assert_out(&mut m, "(car '(a . b))", "a");
        assert_out(&mut m, "(cdr '(a . b))", "b");
        assert_out(&mut m, "(car '(a b . c))", "a");
        assert_out(&mut m, "(cdr '(a b . c))", "(b . c)");
        assert_out(&mut m, "(proper-list-p 1)", "nil");
        assert_out(&mut m, "(proper-list-p nil)", "0");
        assert_out(&mut m, "(proper-list-p '(1 2 3 4))", "4");
        assert_out(&mut m, "(proper-list-p '(a b . c))", "nil");
        assert_out(&mut m, "(length '(1 2 3 4))", "4");
        assert_out(&mut m, "(length '(1))", "1");
        assert_out(&mut m, "(length nil)", "0");
        assert_out(&mut m, "(setq x1 (list 'a 'b 'c))", "(a b c)");
        assert_out(&mut m, "(setq x2 (cons 'z (cdr x1)))", "(z b c)");
        assert_out(&mut m, "(setcar (cdr x1) 'foo)", "foo");
        assert_out(&mut m, "x1", "(a foo c)");
        assert_out(&mut m, "x2", "(z foo c)");
    }

    #[test]
    fn test_shared_structure_is_eq() {
        let mut m = machine();
        assert_out(
            &mut m,
            "(progn (setq x '(\"a\" \"b\")) (setq y (cons x x)) \
             (eq (car (car y)) (car (cdr y))))",
            "t",
        );
        assert_out(&mut m, "(setq z (cons \"c\" x))", "(\"c\" \"a\" \"b\")");
        assert_out(&mut m, "(eq (nth 1 x) (nth 2 z))", "t");
    }

    #[test]
    fn test_quote() {
        let mut m = machine();
        assert_out(&mut m, "'()", "nil");
        assert_out(&mut m, "(quote (+ 1 2))", "(+ 1 2)");
        assert_out(&mut m, "(quote foo)", "foo");
        assert_out(&mut m, "'foo", "foo");
        assert_out(&mut m, "''foo", "'foo");
        assert_out(&mut m, "'(quote foo)", "'foo");
        assert_out(&mut m, "'('a 'b)", "('a 'b)");
    }

    #[test]
    fn test_car_cdr() {
        let mut m = machine();
        assert_err(&mut m, "(car 1)", "wrong-type-argument");
        assert_err(&mut m, "(car (+ 1 1))", "wrong-type-argument");
        assert_out(&mut m, "(car nil)", "nil");
        assert_out(&mut m, "(car '())", "nil");
        assert_out(&mut m, "(car '(1 2))", "1");
        assert_err(&mut m, "(car (1 2))", "void-function");
        assert_out(&mut m, "(car '((1 2)))", "(1 2)");
        assert_out(&mut m, "(cdr '(a b c))", "(b c)");
        assert_out(&mut m, "(cdr '(a))", "nil");
        assert_out(&mut m, "(cdr '())", "nil");
        assert_out(&mut m, "(cdr (cdr '(a b c)))", "(c)");
        assert_err(&mut m, "(cdr 1)", "wrong-type-argument");
        assert_out(&mut m, "(setq test (list 'a 'b' c))", "(a b c)");
        assert_out(&mut m, "(setcar test 'd)", "d");
        assert_out(&mut m, "test", "(d b c)");
    }

    #[test]
    fn test_bootstrap_accessors() {
        let mut m = machine();
        assert_out(&mut m, "(car (car nil))", "nil");
        assert_out(&mut m, "(caar 'nil)", "nil");
        assert_out(&mut m, "(caar '((8) 2 3))", "8");
        assert_out(&mut m, "(cadr '(1 2 3))", "2");
        assert_out(&mut m, "(cadr nil)", "nil");
        assert_out(&mut m, "(cdar '((1 4) 2 3))", "(4)");
        assert_out(&mut m, "(cdar nil)", "nil");
        assert_err(&mut m, "(cdar '(1 2 3))", "wrong-type-argument");
        assert_out(&mut m, "(cddr '(1 2 3))", "(3)");
        assert_out(&mut m, "(car-safe '(1 2 3))", "1");
        assert_out(&mut m, "(car-safe 1)", "nil");
        assert_out(&mut m, "(cdr-safe '(1 2 3))", "(2 3)");
        assert_out(&mut m, "(cdr-safe 1)", "nil");
    }

    #[test]
    fn test_cons_and_list() {
        let mut m = machine();
        assert_out(&mut m, "(cons 1 '(2 3))", "(1 2 3)");
        assert_out(&mut m, "(cons 1 '())", "(1)");
        assert_out(&mut m, "(cons 1 2)", "(1 . 2)");
        assert_out(&mut m, "(list 'a 'b)", "(a b)");
        assert_out(&mut m, "(list 1 2 3 4 5)", "(1 2 3 4 5)");
        assert_out(&mut m, "(list 1 2 '(3 4 5) 'foo)", "(1 2 (3 4 5) foo)");
        assert_out(&mut m, "(list)", "nil");
        assert_out(&mut m, "(cdr (list 'a 'b 'c))", "(b c)");
    }

    #[test]
    fn test_nth() {
        let mut m = machine();
        assert_out(&mut m, "(setq x '(\"a\" \"b\"))", "(\"a\" \"b\")");
        assert_out(&mut m, "(nth 0 x)", "\"a\"");
        assert_out(&mut m, "(nth 1 x)", "\"b\"");
        assert_out(&mut m, "(nth 2 x)", "nil");
        assert_out(&mut m, "(eq (nth 1 x) (nth 1 x))", "t");
    }

    #[test]
    fn test_null() {
        let mut m = machine();
        assert_out(&mut m, "(null nil)", "t");
        assert_out(&mut m, "(null ())", "t");
        assert_err(&mut m, "(null (test))", "void-function");
        assert_err(&mut m, "(null)", "wrong-number-of-arguments");
        assert_err(&mut m, "(null 1 2)", "wrong-number-of-arguments");
        assert_out(&mut m, "(null '(1))", "nil");
        assert_out(&mut m, "(null (null t))", "t");
        assert_out(&mut m, "(null (null (null nil)))", "t");
    }

    #[test]
    fn test_eq() {
        let mut m = machine();
        assert_out(&mut m, "(progn (setq x \"a\")(eq x x))", "t");
        assert_out(&mut m, "(progn (setq y 1)(eq y y))", "t");
        assert_out(&mut m, "(eq \"a\" \"a\")", "nil");
        assert_out(&mut m, "(eq 'a 'a)", "t");
        assert_out(&mut m, "(eq 1 1)", "t");
        assert_out(&mut m, "(eq 1 1.0)", "nil");
        assert_out(&mut m, "(eq 1.0 1.0)", "t");
        assert_out(&mut m, "(eq nil nil)", "t");
        assert_out(&mut m, "(eq () nil)", "t");
        assert_out(&mut m, "(eq '() nil)", "t");
        assert_out(&mut m, "(progn (setq l '(a b))(eq l l))", "t");
        assert_err(&mut m, "(eq 'a a)", "void-variable");
    }

    #[test]
    fn test_variables_and_dynamic_binding() {
        let mut m = machine();
        assert_out(&mut m, "'(;comment\n1)", "(1)");
        assert_out(&mut m, "(boundp 'abracadabra)", "nil");
        assert_out(&mut m, "(let ((abracadabra 5))(boundp 'abracadabra))", "t");
        assert_out(&mut m, "(boundp 'abracadabra)", "nil");
        assert_out(&mut m, "(setq abracadabra 5)", "5");
        assert_out(&mut m, "(boundp 'abracadabra)", "t");
        assert_out(&mut m, "(boundp nil)", "t");
        assert_out(&mut m, "(numberp 1)", "t");
        assert_out(&mut m, "(numberp 1.0)", "t");
        assert_out(&mut m, "(numberp nil)", "nil");
        assert_out(&mut m, "(numberp \"A\")", "nil");
        assert_out(&mut m, "(set 'y 15)", "15");
        assert_out(
            &mut m,
            "(progn (setq x 1) (let (x z) (setq x 2) (setq z 3) (setq y x)) (list x y))",
            "(1 2)",
        );
        assert_out(&mut m, "(setq x 1) ; global binding", "1");
        assert_err(&mut m, "(let ((x 2)) (makunbound 'x) x)", "void-variable");
        assert_out(&mut m, "x ; unchanged", "1");
        assert_err(
            &mut m,
            "(let ((x 2)) (let ((x 3)) (makunbound 'x) x))",
            "void-variable",
        );
        assert_out(&mut m, "(let ((x 2)) (let ((x 3)) (makunbound 'x)) x)", "2");
        assert_out(
            &mut m,
            "(setq x -99) (defun getx () x) (let ((x 1)) (getx))",
            "1",
        );
        assert_out(
            &mut m,
            "(setq x -99) (defun addx () (setq x (1+ x))) (let ((x 1)) (addx) (addx))",
            "3",
        );
        assert_out(&mut m, "(addx)", "-98");
    }

    #[test]
    fn test_let() {
        let mut m = machine();
        assert_err(&mut m, "(let (1) nil)", "wrong-type-argument");
        assert_out(&mut m, "(let ((x 1) (y (+ 1 2))) (+ x y))", "4");
        assert_out(&mut m, "(let* ((x 1) (y x)) y)", "1");
        assert_err(&mut m, "(let ((x 1) (y x)) y)", "void-variable");
        assert_out(&mut m, "(setq y 2) (let ((y 1) (z y)) (list y z))", "(1 2)");
        assert_out(&mut m, "(setq y 2) (let* ((y 1) (z y)) (list y z))", "(1 1)");
        assert_out(
            &mut m,
            "(setq abracadabra 5) (setq foo 9) \
             (let ((abracadabra 'foo)) (symbol-value 'abracadabra))",
            "foo",
        );
        assert_out(
            &mut m,
            "(let ((abracadabra 'foo)) (symbol-value abracadabra))",
            "9",
        );
        assert_out(&mut m, "(symbol-value 'abracadabra)", "5");
    }

    #[test]
    fn test_binding_stack_balance() {
        let mut m = machine();
        for expr in [
            "(let ((x 1)) x)",
            "(let* ((x 1) (y x)) y)",
            "(progn (defun f (x y) (list x y)) (f 1 2))",
            "(let ((x 1)) (let ((x 2)) x))",
        ] {
            m.evaluate(expr).unwrap();
            assert_eq!(m.binding_depth("x"), 0, "after {:?}", expr);
            assert_eq!(m.binding_depth("y"), 0, "after {:?}", expr);
        }
        // Unwinding pops too.
        m.evaluate("(let ((x 1)) (car 1))").unwrap_err();
        assert_eq!(m.binding_depth("x"), 0);
        m.evaluate("(progn (defun g (x) (car 1)) (g 5))").unwrap_err();
        assert_eq!(m.binding_depth("x"), 0);
    }

    #[test]
    fn test_if() {
        let mut m = machine();
        assert_out(&mut m, "(if t 1)", "1");
        assert_out(&mut m, "(if (eq 1 1) 1)", "1");
        assert_out(&mut m, "(if nil 1)", "nil");
        assert_out(&mut m, "(if nil 1 2 3)", "3");
        assert_err(&mut m, "(if t)", "wrong-number-of-arguments");
    }

    #[test]
    fn test_progn_prog1() {
        let mut m = machine();
        let seen = std::rc::Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        m.set_message_handler(move |msg| sink.borrow_mut().push(msg.to_string()));
        assert_out(&mut m, "(progn (message \"A\") (message \"B\") 2)", "2");
        assert_out(&mut m, "(progn)", "nil");
        assert_out(&mut m, "(prog1 5 (message \"C\") (message \"D\") 2)", "5");
        assert_out(&mut m, "(prog1)", "nil");
        assert_eq!(*seen.borrow(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_defun() {
        let mut m = machine();
        assert_out(&mut m, "(defun foo () 5)", "foo");
        assert_out(&mut m, "(foo)", "5");
        assert_out(&mut m, "(defun foo2 (msg) msg)", "foo2");
        assert_err(&mut m, "(foo2)", "wrong-number-of-arguments");
        assert_out(&mut m, "(foo2 \"abc\")", "\"abc\"");
        assert_out(&mut m, "(defun sum3 (a b c) (+ a b c))", "sum3");
        assert_out(&mut m, "(sum3 1 2 3)", "6");
        assert_err(&mut m, "(defun 5 () nil)", "wrong-type-argument");
        assert_err(&mut m, "(defun bad (1) nil)", "error");
    }

    #[test]
    fn test_argument_evaluation_precedes_binding() {
        let mut m = machine();
        // Both argument expressions see the caller's x, not the fresh
        // parameter bindings.
        assert_out(
            &mut m,
            "(setq x 10) (defun pair (x y) (list x y)) (pair 1 x)",
            "(1 10)",
        );
    }

    #[test]
    fn test_macros() {
        let mut m = machine();
        assert_err(&mut m, "(pop nil)", "error");
        assert_out(&mut m, "(setq l '(a b))", "(a b)");
        assert_out(&mut m, "(push 'c l)", "(c a b)");
        assert_out(&mut m, "(push 'd l)", "(d c a b)");
        assert_out(
            &mut m,
            "(defmacro inc (var) (list 'setq var (list '1+ var)))",
            "inc",
        );
        assert_out(&mut m, "(setq x 1)", "1");
        assert_out(&mut m, "(inc x)", "2");
        assert_err(&mut m, "(inc 1)", "wrong-type-argument");
        assert_out(&mut m, "(setq li '(1 2 3))", "(1 2 3)");
        assert_out(&mut m, "(pop li)", "1");
        assert_out(&mut m, "li", "(2 3)");
        assert_err(&mut m, "(pop 1)", "wrong-type-argument");
    }

    #[test]
    fn test_macroexpand() {
        let mut m = machine();
        out(&mut m, "(defmacro inc (var) (list 'setq var (list '1+ var)))");
        assert_out(&mut m, "(macroexpand-1 '(inc x))", "(setq x (1+ x))");
        assert_out(&mut m, "(macroexpand '(inc x))", "(set 'x (1+ x))");
        // Non-macro forms are fixed points.
        assert_out(&mut m, "(macroexpand '(car x))", "(car x)");
        assert_out(&mut m, "(macroexpand '(inc x))", "(set 'x (1+ x))");
        assert_out(&mut m, "(macroexpand 5)", "5");
        assert_out(&mut m, "(macroexpand 'foo)", "foo");
    }

    #[test]
    fn test_arithmetic() {
        let mut m = machine();
        assert_out(&mut m, "-1", "-1");
        assert_out(&mut m, "(% 5 2)", "1");
        assert_err(&mut m, "(% 5 2.0)", "wrong-type-argument");
        assert_err(&mut m, "(% 5 0)", "arith-error");
        assert_out(&mut m, "(+ 1 1)", "2");
        assert_out(&mut m, "(+)", "0");
        assert_out(&mut m, "(* 3 4)", "12");
        assert_out(&mut m, "(*)", "1");
        assert_out(&mut m, "(+ 1 -1)", "0");
        assert_out(&mut m, "(- 5)", "-5");
        assert_out(&mut m, "(- 10 3 2)", "5");
        assert_out(&mut m, "(-)", "0");
        assert_out(&mut m, "(1+ 0)", "1");
        assert_out(&mut m, "(1+ 0.0)", "1.0");
        assert_err(&mut m, "(1+ \"a\")", "wrong-type-argument");
        assert_out(&mut m, "(+ +.1 -0.1)", "0.0");
        assert_out(&mut m, "(= 1 1)", "t");
        assert_out(&mut m, "(= 1.0 1)", "t");
        assert_out(&mut m, "(= 1 1.0)", "t");
        assert_out(&mut m, "(= 1 1.0 1.0 1.0)", "t");
        assert_out(&mut m, "(= 1 2)", "nil");
        assert_err(&mut m, "(truncate 1 0)", "arith-error");
        assert_out(&mut m, "(truncate 1)", "1");
        assert_out(&mut m, "(truncate 1.1)", "1");
        assert_out(&mut m, "(truncate -1.2)", "-1");
        assert_out(&mut m, "(truncate 19.5 3.2)", "6");
        assert_out(&mut m, "(truncate 5.999 nil)", "5");
        assert_out(&mut m, "(ceiling -1.5)", "-1");
        assert_out(&mut m, "(floor -1.5)", "-2");
        assert_out(&mut m, "(floor 1.5)", "1");
        assert_out(&mut m, "(ceiling 2)", "2");
    }

    #[test]
    fn test_division() {
        let mut m = machine();
        assert_out(&mut m, "(/ 10 2)", "5");
        assert_out(&mut m, "(/ 0 5)", "0");
        let v = m.evaluate("(/ 10 3 3.0)").unwrap();
        match v {
            Value::Float(f) => assert!((f - 1.111_111_11).abs() < 1e-3),
            other => panic!("expected float, got {}", other.print(false)),
        }
        assert_err(&mut m, "(/ 1 0)", "arith-error");
        assert_err(&mut m, "(/ 1 0.0)", "arith-error");
    }

    #[test]
    fn test_eval_builtin() {
        let mut m = machine();
        assert_out(&mut m, "(eval 1)", "1");
        assert_out(&mut m, "(setq foo 'bar)", "bar");
        assert_out(&mut m, "(setq bar 'baz)", "baz");
        assert_out(&mut m, "(eval 'foo)", "bar");
        assert_out(&mut m, "(eval foo)", "baz");
    }

    #[test]
    fn test_symbols() {
        let mut m = machine();
        assert_out(&mut m, "(symbolp 'abc)", "t");
        assert_out(&mut m, "(symbol-name 'abc)", "\"abc\"");
        assert_err(&mut m, "(symbolp abc)", "void-variable");
        assert_err(&mut m, "(symbol-name 2)", "wrong-type-argument");
        assert_out(&mut m, "(make-symbol \"test\")", "test");
        assert_out(&mut m, "(symbolp (make-symbol \"test\"))", "t");
        assert_err(&mut m, "(+ 1 (make-symbol \"newint\"))", "wrong-type-argument");
        assert_out(
            &mut m,
            "(progn (setq sym (make-symbol \"foo\"))(symbol-name sym))",
            "\"foo\"",
        );
        assert_out(&mut m, "(eq sym 'foo)", "nil");
        assert_out(&mut m, "'t", "t");
        assert_out(&mut m, "(symbolp (car (list 'a)))", "t");
        assert_err(
            &mut m,
            "(progn (setq testint (make-symbol \"abracadabra\"))(+ 1 (eval testint)))",
            "void-variable",
        );
    }

    #[test]
    fn test_intern() {
        let mut m = machine();
        assert_out(&mut m, "(intern \"\")", "##");
        assert_out(&mut m, "(eq (intern \"tt\") 'tt)", "t");
        assert_out(&mut m, "(setq sym (intern \"foo\"))", "foo");
        assert_out(&mut m, "(eq sym 'foo)", "t");
        assert_out(&mut m, "(intern-soft \"frazzle\")", "nil");
        assert_out(&mut m, "(setq sym (intern \"frazzle\"))", "frazzle");
        assert_out(&mut m, "(intern-soft \"frazzle\")", "frazzle");
        assert_out(&mut m, "(eq sym 'frazzle)", "t");
        assert_out(&mut m, "(setq sym (intern \"abc\"))", "abc");
        assert_out(&mut m, "(intern-soft \"abc\")", "abc");
        assert_out(&mut m, "(unintern sym)", "t");
        assert_out(&mut m, "(intern-soft \"abc\")", "nil");
    }

    #[test]
    fn test_symbol_identity_survives_unintern() {
        let mut m = machine();
        let seen = std::rc::Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        m.set_message_handler(move |msg| sink.borrow_mut().push(msg.to_string()));
        assert_out(&mut m, "(setq sym (intern \"abra\"))", "abra");
        assert_out(&mut m, "(setq abra 500)", "500");
        let d = out(&mut m, "(describe-variable 'abra)");
        assert!(d.contains("abra's value is 500"), "got {}", d);
        let d = out(&mut m, "(describe-variable sym)");
        assert!(d.contains("abra's value is 500"), "got {}", d);
        assert_out(&mut m, "(message \"%d\" abra)", "\"500\"");
        assert_err(&mut m, "(message \"%d\" sym)", "error");
        assert_out(&mut m, "(unintern sym)", "t");
        assert_err(&mut m, "(message \"%d\" abra)", "void-variable");
        let d = out(&mut m, "(describe-variable sym)");
        assert!(d.contains("abra's value is 500"), "got {}", d);
    }

    #[test]
    fn test_describe_variable() {
        let mut m = machine();
        assert_err(&mut m, "(describe-variable a)", "void-variable");
        let d = out(&mut m, "(describe-variable 'a)");
        assert!(d.contains("a is void as a variable"), "got {}", d);
        out(&mut m, "(setq a 12345)");
        let d = out(&mut m, "(describe-variable 'a)");
        assert!(d.contains("12345"), "got {}", d);
        let d = out(&mut m, "(describe-variable nil)");
        assert!(d.contains("nil's value is nil"), "got {}", d);
        let d = out(&mut m, "(describe-variable t)");
        assert!(d.contains("t's value is t"), "got {}", d);
        let d = out(&mut m, "(describe-variable 't)");
        assert!(d.contains("t's value is t"), "got {}", d);
        let d = out(&mut m, "(describe-variable 5)");
        assert!(d.contains("You did not specify a variable"), "got {}", d);
    }

    #[test]
    fn test_setting_constants_fails() {
        let mut m = machine();
        assert_err(&mut m, "(setq nil 5)", "error");
        assert_err(&mut m, "(setq t 5)", "error");
        assert_err(&mut m, "(makunbound 't)", "error");
    }

    #[test]
    fn test_cyclic_printing() {
        let mut m = machine();
        assert_out(
            &mut m,
            "(progn (set 'z (list 1 2 3))(setcdr (cdr (cdr z)) (cdr z)) z)",
            "(1 2 3 2 . #2)",
        );
        assert_err(&mut m, "(length z)", "error");
        assert_out(
            &mut m,
            "(progn (set 'z (list 1 2 3 4 5 6 7))\
             (setcdr (cdr (cdr (cdr (cdr (cdr (cdr z)))))) (cdr z))\
             z)",
            "(1 2 3 4 5 6 7 2 3 4 5 6 . #6)",
        );
        assert_out(&mut m, "(let ((a (list 1))) (proper-list-p (setcdr a a)))", "nil");
        assert_out(&mut m, "(let ((a (list 1)))(setcdr a a))", "(1 . #0)");
        assert_out(&mut m, "(setq x (list 1 2 3))", "(1 2 3)");
        assert_out(&mut m, "(setcar x x)", "(#0 2 3)");
    }

    #[test]
    fn test_cycle_reclamation() {
        let mut m = machine();
        let base = live_objects();
        m.evaluate("(pop nil)").unwrap_err();
        assert_eq!(live_objects(), base, "macro call must not leak");

        let obj = m.evaluate("(let ((a (list 1)))(setcdr a a))").unwrap();
        assert!(live_objects() > base);
        drop(obj);
        assert_eq!(live_objects(), base, "self-loop must be reclaimed");

        let obj = m
            .evaluate(
                "(progn (set 'z (list 1 2 3 4 5 6 7))\
                 (setcdr (cdr (cdr (cdr (cdr (cdr (cdr z)))))) (cdr z))\
                 z)",
            )
            .unwrap();
        assert!(live_objects() > base);
        let clone = obj.clone();
        drop(clone);
        assert!(live_objects() > base);
        drop(obj);
        // Still reachable through the global z.
        assert!(live_objects() > base);
        m.evaluate("(unintern 'z)").unwrap();
        assert_eq!(live_objects(), base, "cycle must free once z is gone");
    }

    #[test]
    fn test_symbol_cycle_reclamation() {
        let mut m = machine();
        let base = live_objects();
        m.evaluate(
            "(progn \
               (setq s1 (make-symbol \"a\")) \
               (setq s2 (make-symbol \"b\")) \
               (set s1 s2) \
               (set s2 s1) \
               (unintern 's1))",
        )
        .unwrap();
        assert!(live_objects() > base);
        m.evaluate("(unintern 's2)").unwrap();
        assert_eq!(live_objects(), base);
    }

    #[test]
    fn test_strings() {
        let mut m = machine();
        assert_out(&mut m, "(substring \"abcdefg\" 2)", "\"cdefg\"");
        assert_err(&mut m, "(substring \"abcdefg\" 2.0)", "wrong-type-argument");
        assert_out(&mut m, "(substring \"abcdefg\" 0 3)", "\"abc\"");
        assert_out(&mut m, "(substring \"abcdefg\")", "\"abcdefg\"");
        assert_out(&mut m, "(substring \"abcdefg\" -3 -1)", "\"ef\"");
        assert_out(&mut m, "(substring \"abcdefg\" -3 nil)", "\"efg\"");
        assert_out(&mut m, "(concat \"ab\" \"cd\")", "\"abcd\"");
        assert_out(&mut m, "(length \"abc\")", "3");
        assert_out(&mut m, "(char-or-string-p (elt \"abc\" 0))", "t");
        assert_out(&mut m, "(char-or-string-p \"abc\")", "t");
        assert_out(&mut m, "(char-or-string-p 1)", "nil");
        assert_out(&mut m, "(char-or-string-p ?a)", "t");
        assert_out(&mut m, "(string ?a ?b ?c)", "\"abc\"");
        assert_out(&mut m, "(string)", "\"\"");
        assert_out(&mut m, "(make-string 3 ?x)", "\"xxx\"");
        assert_out(&mut m, "(stringp (car '(\"a\")))", "t");
        assert_out(&mut m, "(stringp \"abc\")", "t");
        assert_out(&mut m, "(stringp 1)", "nil");
        assert_out(&mut m, "(stringp ())", "nil");
        assert_out(&mut m, "(string-or-null-p \"abc\")", "t");
        assert_out(&mut m, "(string-or-null-p nil)", "t");
        assert_out(&mut m, "(string-or-null-p 1)", "nil");
    }

    #[test]
    fn test_store_substring() {
        let mut m = machine();
        assert_out(
            &mut m,
            "(progn (setq str \"abc\") (store-substring str 0 \"A\"))",
            "\"Abc\"",
        );
        assert_out(&mut m, "(store-substring str 1 \"B\")", "\"ABc\"");
        assert_out(&mut m, "(store-substring str 2 \"C\")", "\"ABC\"");
        assert_err(&mut m, "(store-substring str 3 \"D\")", "error");
        assert_out(&mut m, "(store-substring str 2 ?c)", "\"ABc\"");
        assert_err(&mut m, "(store-substring str 4 ?d)", "error");
        assert_err(&mut m, "(store-substring str -1 ?d)", "error");
        // The edit is visible through the binding, not just the result.
        assert_out(&mut m, "str", "\"ABc\"");
    }

    #[test]
    fn test_split_string() {
        let mut m = machine();
        assert_out(&mut m, "(split-string \"  two words \")", "(\"two\" \"words\")");
        assert_out(
            &mut m,
            "(split-string \"  two words \" \"[ ]+\")",
            "(\"\" \"two\" \"words\" \"\")",
        );
        assert_out(
            &mut m,
            "(split-string \"Soup is good food\" \"o\")",
            "(\"S\" \"up is g\" \"\" \"d f\" \"\" \"d\")",
        );
        assert_out(
            &mut m,
            "(split-string \"Soup is good food\" \"o\" t)",
            "(\"S\" \"up is g\" \"d f\" \"d\")",
        );
        assert_out(&mut m, "(split-string \"aooob\" \"o*\")", "(\"\" \"a\" \"\" \"b\" \"\")");
        assert_out(&mut m, "(split-string \"ooaboo\" \"o*\")", "(\"\" \"\" \"a\" \"b\" \"\")");
        assert_out(&mut m, "(split-string \"\" \"\")", "(\"\")");
        assert_out(&mut m, "(split-string \"\" \"\" t)", "nil");
        assert_out(&mut m, "(split-string \"ooo\" \"o*\" t)", "nil");
    }

    #[test]
    fn test_message_formatting() {
        let mut m = machine();
        let seen = std::rc::Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        m.set_message_handler(move |msg| sink.borrow_mut().push(msg.to_string()));
        out(&mut m, "(message \"test\")");
        out(&mut m, "(message \"a%%b\")");
        out(&mut m, "(message \"%d\" 15)");
        out(&mut m, "(message \"num: %d.%%\" 50)");
        out(&mut m, "(message \"%d\" 1.99)");
        out(&mut m, "(message \"%s!\" \"hi\")");
        assert_eq!(
            *seen.borrow(),
            vec!["test", "a%b", "15", "num: 50.%", "1", "hi!"]
        );
        assert_err(&mut m, "(message \"%d\" \"s\")", "error");
        assert_err(&mut m, "(message \"%s\" 5)", "error");
        assert_err(&mut m, "(message \"%q\" 5)", "error");
        assert_err(&mut m, "(message 5)", "wrong-type-argument");
    }

    #[test]
    fn test_sequences() {
        let mut m = machine();
        assert_out(&mut m, "(elt '(a b c) 1)", "b");
        assert_out(&mut m, "(elt '(a b c) 9)", "nil");
        assert_err(&mut m, "(elt \"abc\" 9)", "error");
        assert_out(&mut m, "(sequencep \"abc\")", "t");
        assert_out(&mut m, "(sequencep '(1))", "t");
        assert_out(&mut m, "(sequencep nil)", "t");
        assert_out(&mut m, "(sequencep 5)", "nil");
        assert_out(&mut m, "(reverse '(1 2 3))", "(3 2 1)");
        assert_out(&mut m, "(reverse nil)", "nil");
        assert_out(&mut m, "(reverse \"abc\")", "\"cba\"");
        assert_err(&mut m, "(length 5)", "wrong-type-argument");
    }

    #[test]
    fn test_plists() {
        let mut m = machine();
        assert_out(&mut m, "(symbol-plist 'x)", "nil");
        assert_out(&mut m, "(put 'x 'prop 5)", "5");
        assert_out(&mut m, "(get 'x 'prop)", "5");
        assert_out(&mut m, "(get 'x 'other)", "nil");
        assert_out(&mut m, "(put 'x 'prop 6)", "6");
        assert_out(&mut m, "(get 'x 'prop)", "6");
        assert_out(&mut m, "(put 'x 'other 'y)", "y");
        assert_out(&mut m, "(symbol-plist 'x)", "(prop 6 other y)");
    }

    #[test]
    fn test_function_introspection() {
        let mut m = machine();
        assert_out(&mut m, "(functionp 'car)", "t");
        assert_out(&mut m, "(functionp 'no-such-function)", "nil");
        out(&mut m, "(defmacro mymac (a) a)");
        assert_out(&mut m, "(functionp 'mymac)", "nil");
        assert_out(&mut m, "(func-arity 'cons)", "(2 . 2)");
        assert_out(&mut m, "(func-arity '+)", "(0 . many)");
        assert_err(&mut m, "(func-arity 'no-such-function)", "void-function");
        out(&mut m, "(defun two (a b) a)");
        assert_out(&mut m, "(func-arity 'two)", "(2 . 2)");
        assert_out(&mut m, "(functionp (symbol-function 'car))", "t");
    }

    #[test]
    fn test_mapatoms() {
        let mut m = machine();
        out(&mut m, "(setq tally 0)");
        out(&mut m, "(defun bump (s) (setq tally (1+ tally)))");
        out(&mut m, "(mapatoms 'bump)");
        let v = m.evaluate("tally").unwrap();
        match v {
            Value::Int(n) => assert!(n > 0, "mapatoms visited no symbols"),
            other => panic!("tally was {}", other.print(false)),
        }
        assert_err(&mut m, "(mapatoms 'tally)", "void-function");
    }

    #[test]
    fn test_signal() {
        let mut m = machine();
        let err = m
            .evaluate("(signal my-error (list \"boom\" 5))")
            .unwrap_err();
        assert_eq!(err.kind(), "error");
        assert_eq!(err.to_string(), "boom");
        let err = m.evaluate("(signal my-error nil)").unwrap_err();
        assert_eq!(err.to_string(), "my-error");
    }

    #[test]
    fn test_recursion_depth_cap() {
        let mut m = machine();
        out(&mut m, "(defun loop-forever (x) (loop-forever x))");
        let err = m.evaluate("(loop-forever 1)").unwrap_err();
        assert_eq!(err.kind(), "error");
        assert!(err.to_string().contains("recursion depth"));
        // The depth counter unwinds with the error.
        assert_out(&mut m, "(+ 1 2)", "3");
    }

    #[test]
    fn test_characters() {
        let mut m = machine();
        assert_out(&mut m, "?a", "97");
        assert_out(&mut m, "(elt \"aĸc\" 1)", "312");
        assert_out(&mut m, "(length \"aĸc\")", "3");
        assert_out(&mut m, "(string 107 405)", "\"kƕ\"");
    }

    #[test]
    fn test_roundtrip_print_parse_print() {
        let mut m = machine();
        for src in [
            "(1 2 3)",
            "(a . b)",
            "(1 (2 (3)) . 4)",
            "'foo",
            "(\"str\" 1.5 sym)",
            "nil",
            "(quote a b)",
        ] {
            let once = m.parse(src).unwrap().print(false);
            let twice = m.parse(&once).unwrap().print(false);
            assert_eq!(once, twice, "round-trip of {:?}", src);
        }
    }

    #[test]
    fn test_parse_then_eval_matches_evaluate() {
        let mut m = machine();
        let form = m.parse("(+ 1 2)").unwrap();
        let v = m.eval(&form).unwrap();
        assert_eq!(v.print(false), "3");
        assert!(matches!(m.parse("(car"), Err(LispError::Syntax(_))));
    }

    #[test]
    fn test_machine_without_std() {
        let mut m = Machine::new(false);
        assert_err(&mut m, "(car '(1))", "void-function");
        assert_err(&mut m, "t", "void-variable");
        assert_out(&mut m, "5", "5");
    }
}
