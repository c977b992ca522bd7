use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

/// One-to-many event dispatch to a dynamic set of listeners.
///
/// Registration may happen from any thread. `notify` works on a snapshot of
/// the listener set, so a listener may add or remove listeners (itself
/// included) from inside a callback; the change applies from the next event.
pub struct Notifier<L: ?Sized> {
    listeners: RwLock<Vec<Arc<L>>>,
}

impl<L: ?Sized> Notifier<L> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: Arc<L>) {
        self.listeners.write().push(listener);
    }

    /// Remove a listener by identity. Returns whether it was registered.
    pub fn remove_listener(&self, listener: &Arc<L>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn clear_listeners(&self) {
        self.listeners.write().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// The current registration set, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.listeners.read().clone()
    }

    /// Call `f` on every listener in registration order.
    ///
    /// A listener that panics is logged and skipped; the remaining listeners
    /// still receive the event. Returns the number of listeners that panicked.
    pub fn notify(&self, event: &str, f: impl Fn(&L)) -> u64 {
        let mut panicked = 0;
        for listener in self.snapshot() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| f(&listener)));
            if result.is_err() {
                log::error!("listener panicked while handling {}", event);
                panicked += 1;
            }
        }
        panicked
    }
}

impl<L: ?Sized> Default for Notifier<L> {
    fn default() -> Self {
        Self::new()
    }
}

fn same_listener<L: ?Sized>(a: &Arc<L>, b: &Arc<L>) -> bool {
    // Compare data pointers only; vtable pointers for the same type may differ
    // between codegen units.
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
