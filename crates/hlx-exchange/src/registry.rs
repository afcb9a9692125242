//! Local record of orders placed through one `ExchangeClient`.
//!
//! One record table with two indices, `by_oid` and `by_cloid`, all behind
//! a single lock so a transition updates both indices together. The lock
//! is never held across an `.await`.
//!
//! Terminal records are kept so a repeated cancel can be answered
//! locally, but only the most recent `terminal_retention` of them; older
//! ones are evicted with their index entries.

use hlx_core::{CoreError, Oid, OrderEvent, OrderRef, OrderState};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// Terminal records retained by [`OrderRegistry::new`].
pub const DEFAULT_TERMINAL_RETENTION: usize = 1024;

/// What the client knows about one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRecord {
    pub oid: Option<Oid>,
    /// Wire form of the cloid.
    pub cloid: Option<String>,
    pub coin: String,
    pub state: OrderState,
}

#[derive(Debug, Default)]
struct Inner {
    next_key: u64,
    slab: HashMap<u64, OrderRecord>,
    by_oid: HashMap<Oid, u64>,
    by_cloid: HashMap<String, u64>,
    /// Keys of terminal records, oldest first.
    terminal: VecDeque<u64>,
}

impl Inner {
    fn key_of(&self, order: &OrderRef) -> Option<u64> {
        match order {
            OrderRef::Oid(oid) => self.by_oid.get(oid).copied(),
            OrderRef::Cloid(cloid) => self.by_cloid.get(&cloid.to_wire()).copied(),
        }
    }

    /// Drop a record and whichever index entries still point at it.
    fn remove(&mut self, key: u64) -> Option<OrderRecord> {
        let record = self.slab.remove(&key)?;
        if let Some(oid) = record.oid {
            if self.by_oid.get(&oid) == Some(&key) {
                self.by_oid.remove(&oid);
            }
        }
        if let Some(cloid) = &record.cloid {
            if self.by_cloid.get(cloid) == Some(&key) {
                self.by_cloid.remove(cloid);
            }
        }
        Some(record)
    }

    fn mark_terminal(&mut self, key: u64, retention: usize) {
        self.terminal.push_back(key);
        while self.terminal.len() > retention {
            let Some(oldest) = self.terminal.pop_front() else {
                break;
            };
            if let Some(record) = self.remove(oldest) {
                trace!(oid = ?record.oid, cloid = ?record.cloid, "Evicted terminal order");
            }
        }
    }
}

#[derive(Debug)]
pub struct OrderRegistry {
    inner: Mutex<Inner>,
    terminal_retention: usize,
}

impl Default for OrderRegistry {
    fn default() -> Self {
        Self::with_terminal_retention(DEFAULT_TERMINAL_RETENTION)
    }
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `retention` finished orders.
    pub fn with_terminal_retention(retention: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            terminal_retention: retention,
        }
    }

    /// Record a new order in `state`. Returns `false` when it carries
    /// neither an oid nor a cloid and so could never be looked up.
    ///
    /// A record already holding the same oid or cloid is replaced.
    pub fn insert(&self, record: OrderRecord) -> bool {
        if record.oid.is_none() && record.cloid.is_none() {
            return false;
        }
        let mut inner = self.inner.lock();
        let stale: Vec<u64> = record
            .oid
            .and_then(|oid| inner.by_oid.get(&oid).copied())
            .into_iter()
            .chain(record.cloid.as_ref().and_then(|c| inner.by_cloid.get(c).copied()))
            .collect();
        for key in stale {
            inner.remove(key);
        }

        let key = inner.next_key;
        inner.next_key += 1;
        if let Some(oid) = record.oid {
            inner.by_oid.insert(oid, key);
        }
        if let Some(cloid) = &record.cloid {
            inner.by_cloid.insert(cloid.clone(), key);
        }
        trace!(key, oid = ?record.oid, cloid = ?record.cloid, "Registered order");
        let terminal = record.state.is_terminal();
        inner.slab.insert(key, record);
        if terminal {
            inner.mark_terminal(key, self.terminal_retention);
        }
        true
    }

    pub fn get(&self, order: &OrderRef) -> Option<OrderRecord> {
        let inner = self.inner.lock();
        inner.key_of(order).and_then(|k| inner.slab.get(&k).cloned())
    }

    /// Apply a lifecycle event. `None` when the order is not tracked.
    pub fn apply(
        &self,
        order: &OrderRef,
        event: OrderEvent,
    ) -> Option<Result<OrderState, CoreError>> {
        let mut inner = self.inner.lock();
        let key = inner.key_of(order)?;
        let record = inner.slab.get_mut(&key)?;
        let result = record.state.transition(event);
        if let Ok(next) = result {
            debug!(%order, from = %record.state, to = %next, "Order transition");
            record.state = next;
            if next.is_terminal() {
                inner.mark_terminal(key, self.terminal_retention);
            }
        }
        Some(result)
    }

    /// A modify re-rested the order under `new_oid`; the cloid stays.
    pub fn repoint(&self, order: &OrderRef, new_oid: Oid) -> Option<Result<OrderState, CoreError>> {
        let mut inner = self.inner.lock();
        let key = inner.key_of(order)?;
        let record = inner.slab.get_mut(&key)?;
        let next = match record.state.transition(OrderEvent::Modify) {
            Ok(next) => next,
            Err(e) => return Some(Err(e)),
        };
        record.state = next;
        let old_oid = record.oid.replace(new_oid);

        if let Some(old) = old_oid {
            inner.by_oid.remove(&old);
        }
        inner.by_oid.insert(new_oid, key);
        debug!(%order, ?old_oid, new_oid, "Order re-pointed after modify");
        Some(Ok(next))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
