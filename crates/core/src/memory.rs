//! Live-object accounting for the shared heap.
//!
//! Every reference-counted storage (cons cell, string storage, symbol
//! record) bumps a counter when allocated and decrements it when the
//! storage is actually freed. The reclamation tests use the counter to
//! prove that unreachable cyclic structures really are released.
//!
//! The counter is thread-local: heap values are `Rc`-based and never leave
//! their thread, and keeping the ledger per-thread lets the test harness
//! run machines in parallel without cross-talk.

use std::cell::Cell;

thread_local! {
    static LIVE_SHARED: Cell<i64> = const { Cell::new(0) };
}

/// Record one shared storage allocation.
pub(crate) fn note_alloc() {
    LIVE_SHARED.with(|c| c.set(c.get() + 1));
}

/// Record one shared storage release.
pub(crate) fn note_free() {
    LIVE_SHARED.with(|c| c.set(c.get() - 1));
}

/// Number of shared storages currently alive on this thread.
///
/// Cons cells, string storages and symbol records all count as one each.
pub fn live_objects() -> i64 {
    LIVE_SHARED.with(|c| c.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_balances() {
        let base = live_objects();
        note_alloc();
        note_alloc();
        assert_eq!(live_objects(), base + 2);
        note_free();
        note_free();
        assert_eq!(live_objects(), base);
    }
}
