//! Typed single-threaded publish/subscribe.

pub type SlotId = u32;

/// A named event with a typed payload. Slots run in subscription order.
pub struct Signal<T> {
    slots: Vec<(SlotId, Box<dyn FnMut(&T)>)>,
    next_slot: SlotId,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Signal { slots: Vec::new(), next_slot: 0 }
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("slots", &self.slots.len()).finish()
    }
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, slot: impl FnMut(&T) + 'static) -> SlotId {
        let id = self.next_slot;
        self.next_slot = self.next_slot.wrapping_add(1);
        self.slots.push((id, Box::new(slot)));
        id
    }

    pub fn unsubscribe(&mut self, id: SlotId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(sid, _)| *sid != id);
        self.slots.len() != before
    }

    pub fn emit(&mut self, payload: &T) {
        for (_, slot) in self.slots.iter_mut() {
            slot(payload);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
