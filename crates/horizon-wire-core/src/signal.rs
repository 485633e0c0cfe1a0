//! Event sources.
//!
//! A [`Signal`] stands in for a UI element's event: slots are connected to
//! it and called, in connection order, every time it is emitted. Bound
//! invokers are connected with [`Signal::connect_invoker`] (the event's
//! payload is ignored, as for a button press) or [`Signal::connect_event`]
//! (the payload becomes the method argument, as for a slider).
//!
//! Slots are called directly on the emitting thread.
//!
//! # Example
//!
//! ```
//! use horizon_wire_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let id = value_changed.connect(|value| println!("value: {value}"));
//! value_changed.emit(42);
//! value_changed.disconnect(id);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::invoker::{BoundInvoker, EventInvoker};
use crate::logging::targets;
use crate::value::Value;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// An event source with any number of connected slots.
pub struct Signal<Args> {
    slots: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot (closure) to this signal.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Connect a bound invoker, called once per emission.
    ///
    /// The emitted arguments are not passed on. Invocation failures have
    /// already been reported by the invoker and are not propagated.
    pub fn connect_invoker(&self, invoker: BoundInvoker) -> ConnectionId {
        self.connect(move |_| {
            let _ = invoker.invoke();
        })
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.slots.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, calling every connected slot with `args`.
    ///
    /// The slot list is captured before the first call, so slots may connect
    /// or disconnect slots (including themselves) while running.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let slots: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");
        for slot in slots {
            slot(&args);
        }
    }

    /// Connect a slot that is disconnected when the returned guard drops.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            signal: self,
            id: self.connect(slot),
        }
    }
}

impl<Args> Signal<Args>
where
    Args: Clone + Into<Value>,
{
    /// Connect an event invoker, passing each emitted value as its argument.
    pub fn connect_event(&self, invoker: EventInvoker) -> ConnectionId {
        self.connect(move |args: &Args| {
            let _ = invoker.invoke_with(args.clone());
        })
    }
}

/// A connection that ends when the guard is dropped.
pub struct ConnectionGuard<'a, Args> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args> ConnectionGuard<'_, Args> {
    /// The guarded connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);
static_assertions::assert_impl_all!(Signal<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicI32;

    use super::*;

    #[test]
    fn test_connect_and_emit() {
        let signal = Signal::<i32>::new();
        let total = Arc::new(AtomicI32::new(0));

        let t = total.clone();
        signal.connect(move |n| {
            t.fetch_add(*n, Ordering::SeqCst);
        });
        let t = total.clone();
        signal.connect(move |n| {
            t.fetch_add(*n * 10, Ordering::SeqCst);
        });

        signal.emit(2);
        assert_eq!(total.load(Ordering::SeqCst), 22);
        assert_eq!(signal.connection_count(), 2);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<()>::new();
        let count = Arc::new(AtomicI32::new(0));
        let c = count.clone();
        let id = signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        signal.emit(());
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blocked_signal() {
        let signal = Signal::<()>::new();
        let count = Arc::new(AtomicI32::new(0));
        let c = count.clone();
        signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_blocked(true);
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        signal.set_blocked(false);
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_connection() {
        let signal = Signal::<()>::new();
        {
            let _guard = signal.connect_scoped(|_| {});
            assert_eq!(signal.connection_count(), 1);
        }
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_slot_may_disconnect_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let count = Arc::new(AtomicI32::new(0));

        let s = Arc::downgrade(&signal);
        let c = count.clone();
        signal.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            if let Some(signal) = s.upgrade() {
                signal.disconnect_all();
            }
        });

        signal.emit(());
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
