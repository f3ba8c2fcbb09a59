//! Maps an entry's starting offset to its one-shot completion callback (async submit path
//! only). Lives under the Coordinator's mutex.

use std::collections::HashMap;

pub type CompletionCallback = Box<dyn FnOnce(bool) + Send>;

#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<u64, CompletionCallback>,
}

impl CallbackRegistry {
    pub fn insert(&mut self, offset: u64, cb: CompletionCallback) {
        self.callbacks.insert(offset, cb);
    }

    pub fn take(&mut self, offset: u64) -> Option<CompletionCallback> {
        self.callbacks.remove(&offset)
    }

    /// Drains every outstanding callback, in ascending offset order, for firing at shutdown.
    pub fn drain_ascending(&mut self) -> Vec<CompletionCallback> {
        let mut entries: Vec<_> = self.callbacks.drain().collect();
        entries.sort_by_key(|(offset, _)| *offset);
        entries.into_iter().map(|(_, cb)| cb).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn take_removes_exactly_once() {
        let mut registry = CallbackRegistry::default();
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        registry.insert(0, Box::new(move |ok| fired2.store(ok, Ordering::SeqCst)));

        let cb = registry.take(0).unwrap();
        cb(true);
        assert!(fired.load(Ordering::SeqCst));
        assert!(registry.take(0).is_none());
    }

    #[test]
    fn missing_at_zero_is_none_not_panic() {
        let mut registry = CallbackRegistry::default();
        assert!(registry.take(0).is_none());
    }

    #[test]
    fn drain_ascending_orders_by_offset() {
        let mut registry = CallbackRegistry::default();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for offset in [30, 10, 20] {
            let order = order.clone();
            registry.insert(offset, Box::new(move |_| order.lock().push(offset)));
        }

        for cb in registry.drain_ascending() {
            cb(false);
        }

        assert_eq!(*order.lock(), vec![10, 20, 30]);
    }
}
