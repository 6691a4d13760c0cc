//! Symbol records and the handles that reference them.
//!
//! A record carries the dynamic value slot, the function slot and the
//! property list. The symbol table owns records by name; `unintern` only
//! removes the table entry, so a record stays alive (and keeps its slots)
//! for as long as any value handle still references it.

use crate::cons::ConsRef;
use crate::cycle;
use crate::memory;
use crate::value::{Function, Value};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// A symbol record.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    /// `nil` and `t` are constant; assigning them fails.
    pub constant: bool,
    /// Records created by the binding stack rather than the table.
    pub local: bool,
    /// The dynamic value slot; `None` means void.
    pub variable: Option<Value>,
    /// The function slot.
    pub function: Option<Rc<Function>>,
    /// The property list, created lazily.
    pub plist: Option<ConsRef>,
}

impl Symbol {
    pub fn named(name: impl Into<String>) -> Symbol {
        Symbol {
            name: name.into(),
            constant: false,
            local: false,
            variable: None,
            function: None,
            plist: None,
        }
    }
}

impl Drop for Symbol {
    fn drop(&mut self) {
        memory::note_free();
    }
}

/// Shared handle to a symbol record.
#[derive(Debug)]
pub struct SymbolRef {
    inner: Rc<RefCell<Symbol>>,
}

impl SymbolRef {
    pub fn new(sym: Symbol) -> Self {
        memory::note_alloc();
        SymbolRef {
            inner: Rc::new(RefCell::new(sym)),
        }
    }

    pub(crate) fn from_rc(rc: Rc<RefCell<Symbol>>) -> Self {
        SymbolRef { inner: rc }
    }

    pub(crate) fn rc(&self) -> &Rc<RefCell<Symbol>> {
        &self.inner
    }

    pub fn borrow(&self) -> Ref<'_, Symbol> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Symbol> {
        self.inner.borrow_mut()
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.inner) as *const ()
    }

    pub fn ptr_eq(&self, other: &SymbolRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Replace the value slot. The old value is dropped only after the
    /// record borrow is released, which the cycle manager relies on.
    pub fn set_variable(&self, v: Option<Value>) {
        let old = {
            let mut b = self.inner.borrow_mut();
            std::mem::replace(&mut b.variable, v)
        };
        drop(old);
    }

    pub fn set_function(&self, f: Option<Rc<Function>>) {
        let old = {
            let mut b = self.inner.borrow_mut();
            std::mem::replace(&mut b.function, f)
        };
        drop(old);
    }
}

impl Clone for SymbolRef {
    fn clone(&self) -> Self {
        SymbolRef {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Drop for SymbolRef {
    fn drop(&mut self) {
        cycle::on_symbol_drop(&self.inner);
    }
}

/// A symbol as it appears inside a value: either resolved to a record,
/// or carrying only a name to be looked up at evaluation time. The
/// reader always produces the named form; `intern` and `make-symbol`
/// produce the resolved form.
#[derive(Debug, Clone)]
pub enum SymbolValue {
    Record(SymbolRef),
    Named(Rc<str>),
}

impl SymbolValue {
    pub fn named(name: impl AsRef<str>) -> SymbolValue {
        SymbolValue::Named(Rc::from(name.as_ref()))
    }

    pub fn name(&self) -> String {
        match self {
            SymbolValue::Record(r) => r.name(),
            SymbolValue::Named(n) => n.to_string(),
        }
    }

    /// Printed form: the name, or `##` for an empty name.
    pub fn printed(&self) -> String {
        let n = self.name();
        if n.is_empty() { "##".to_string() } else { n }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_identity_survives_clone() {
        let a = SymbolRef::new(Symbol::named("x"));
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        b.set_variable(Some(Value::Int(5)));
        assert!(matches!(a.borrow().variable, Some(Value::Int(5))));
    }

    #[test]
    fn test_empty_name_prints_as_hashes() {
        let s = SymbolValue::Record(SymbolRef::new(Symbol::named("")));
        assert_eq!(s.printed(), "##");
        let named = SymbolValue::named("foo");
        assert_eq!(named.printed(), "foo");
    }
}
