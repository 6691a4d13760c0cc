//! Reclamation of unreachable cyclic structures.
//!
//! Reference counting alone cannot free a list that points back into
//! itself, or a pair of symbols whose value slots reference each other.
//! Whenever a handle to shared storage is about to drop, this module runs
//! a local mark-and-sweep limited to the subgraph reachable from that
//! handle:
//!
//! 1. If the dying handle is the last one, plain reference counting wins
//!    and nothing else happens.
//! 2. Otherwise the subgraph is scanned, counting for every shared node
//!    how many handles inside the subgraph reference it, and taking its
//!    total reference count.
//! 3. If the two counts agree for every node, nothing outside the
//!    subgraph can reach it: every node's payload is reset, breaking the
//!    cycle, and the counts fall to zero on their own.
//! 4. If any node has references from elsewhere, the subgraph stays.
//!
//! While the algorithm runs, handle drops it causes itself are plain
//! reference-count decrements; a thread-local flag suppresses re-entry.
//!
//! Mutators must not let a replaced value drop while they still hold a
//! borrow of the cell or record it came from, because the scan needs to
//! borrow every cell it visits. `ConsRef::set_car`/`set_cdr` and
//! `SymbolRef::set_variable` implement that discipline.

use crate::cons::{ConsCell, ConsRef};
use crate::symbol::{Symbol, SymbolRef, SymbolValue};
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

thread_local! {
    /// True while a scan or a payload teardown is in progress.
    static ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// A shared heap node, held via one keeper clone during the scan.
/// Strings never appear here: they have no outgoing references and so
/// cannot close a cycle; plain reference counting frees them.
enum Node {
    Cons(Rc<RefCell<ConsCell>>),
    Symbol(Rc<RefCell<Symbol>>),
}

impl Node {
    fn from_value(v: &Value) -> Option<Node> {
        match v {
            Value::Cons(c) => Some(Node::Cons(Rc::clone(c.rc()))),
            Value::Symbol(SymbolValue::Record(r)) => Some(Node::Symbol(Rc::clone(r.rc()))),
            _ => None,
        }
    }

    fn key(&self) -> *const () {
        match self {
            Node::Cons(rc) => Rc::as_ptr(rc) as *const (),
            Node::Symbol(rc) => Rc::as_ptr(rc) as *const (),
        }
    }

    fn strong_count(&self) -> usize {
        match self {
            Node::Cons(rc) => Rc::strong_count(rc),
            Node::Symbol(rc) => Rc::strong_count(rc),
        }
    }

    /// Empty the node's outgoing references, letting the counts of its
    /// neighbors fall. Runs only under the suppression flag.
    fn reset_payload(&self) {
        match self {
            Node::Cons(rc) => {
                let (car, cdr) = {
                    let mut b = rc.borrow_mut();
                    (b.car.take(), b.cdr.take())
                };
                drop(car);
                drop(cdr);
            }
            Node::Symbol(rc) => {
                let var = rc.borrow_mut().variable.take();
                drop(var);
            }
        }
    }
}

struct ScanEntry {
    refs_from_graph: usize,
    node: Node,
}

/// Drop hook for cons handles.
pub(crate) fn on_cons_drop(rc: &Rc<RefCell<ConsCell>>) {
    if ACTIVE.with(|a| a.get()) {
        return;
    }
    if Rc::strong_count(rc) == 1 {
        return;
    }
    ACTIVE.with(|a| a.set(true));
    let key = Rc::as_ptr(rc) as *const ();
    let start = Value::Cons(ConsRef::from_rc(Rc::clone(rc)));
    release_if_unreachable(&start, key);
    drop(start);
    ACTIVE.with(|a| a.set(false));
}

/// Drop hook for symbol handles.
pub(crate) fn on_symbol_drop(rc: &Rc<RefCell<Symbol>>) {
    if ACTIVE.with(|a| a.get()) {
        return;
    }
    if Rc::strong_count(rc) == 1 {
        return;
    }
    ACTIVE.with(|a| a.set(true));
    let key = Rc::as_ptr(rc) as *const ();
    let start = Value::Symbol(SymbolValue::Record(SymbolRef::from_rc(Rc::clone(rc))));
    release_if_unreachable(&start, key);
    drop(start);
    ACTIVE.with(|a| a.set(false));
}

fn release_if_unreachable(start: &Value, start_key: *const ()) {
    let graph = scan(start);

    // The scan holds one keeper clone per node, and the start node is
    // additionally held by the temporary handle built for the scan.
    // Everything beyond those and the in-graph references is the outside
    // world still reaching in.
    let reachable_from_outside = graph.values().any(|e| {
        let ours = if e.node.key() == start_key { 2 } else { 1 };
        e.node.strong_count().saturating_sub(ours) > e.refs_from_graph
    });
    if reachable_from_outside {
        return;
    }

    for entry in graph.values() {
        entry.node.reset_payload();
    }
    // Keeper clones drop here; with the payloads gone the counts reach
    // zero and the storages free through plain reference counting.
}

/// Walk the subgraph, counting handle encounters per shared node and
/// keeping one clone of each. Descent stops at the second encounter of a
/// node, which both bounds the walk and terminates cycles.
fn scan(start: &Value) -> HashMap<*const (), ScanEntry> {
    let mut graph: HashMap<*const (), ScanEntry> = HashMap::new();
    start.traverse(&mut |v| {
        let Some(node) = Node::from_value(v) else {
            return true;
        };
        let entry = graph.entry(node.key()).or_insert(ScanEntry {
            refs_from_graph: 0,
            node,
        });
        entry.refs_from_graph += 1;
        entry.refs_from_graph < 2
    });
    graph
}
