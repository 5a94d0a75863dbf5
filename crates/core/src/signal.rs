//! Change-notification signals
//!
//! Small single-threaded callback lists used by the registry and its
//! references. Callbacks run in connection order, on the thread that
//! triggered the dispatch. A callback must not connect to or disconnect
//! from the signal it is currently being dispatched from.

use std::cell::{Cell, RefCell};

/// Identifies one connected callback, for later disconnection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(usize);

/// A signal carrying a payload of type `T`
pub struct Signal<T> {
    slots: RefCell<Vec<(SlotId, Box<dyn Fn(&T)>)>>,
    next_slot: Cell<usize>,
}

impl<T> Signal<T> {
    /// Create a signal with no connected callbacks
    pub fn new() -> Self {
        Self { slots: RefCell::new(Vec::new()), next_slot: Cell::new(0) }
    }

    /// Connect a callback, returning its slot for disconnection
    pub fn connect(&self, callback: impl Fn(&T) + 'static) -> SlotId {
        let slot = SlotId(self.next_slot.get());
        self.next_slot.set(slot.0 + 1);
        self.slots.borrow_mut().push((slot, Box::new(callback)));
        slot
    }

    /// Disconnect a previously connected callback
    ///
    /// Returns `false` if the slot was already disconnected.
    pub fn disconnect(&self, slot: SlotId) -> bool {
        let mut slots = self.slots.borrow_mut();
        let before = slots.len();
        slots.retain(|(candidate, _)| *candidate != slot);
        slots.len() != before
    }

    /// Invoke every connected callback with `payload`
    pub fn dispatch(&self, payload: &T) {
        for (_, callback) in self.slots.borrow().iter() {
            callback(payload);
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A signal with no payload
pub struct NullarySignal(Signal<()>);

impl NullarySignal {
    pub fn new() -> Self {
        Self(Signal::new())
    }

    /// Connect a callback, returning its slot for disconnection
    pub fn connect(&self, callback: impl Fn() + 'static) -> SlotId {
        self.0.connect(move |()| callback())
    }

    /// Disconnect a previously connected callback
    pub fn disconnect(&self, slot: SlotId) -> bool {
        self.0.disconnect(slot)
    }

    /// Invoke every connected callback
    pub fn dispatch(&self) {
        self.0.dispatch(&());
    }
}

impl Default for NullarySignal {
    fn default() -> Self {
        Self::new()
    }
}
