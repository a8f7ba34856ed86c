/// Recorded event with its position in the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub seq: u64,
    pub payload: E,
}

/// Append-only event log for traceability.
///
/// Nothing reacts to these events; they exist so callers and tests can see
/// what happened and in which order.
#[derive(Debug)]
pub struct EventBus<E> {
    next_seq: u64,
    events: Vec<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            events: Vec::new(),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, payload: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event { seq, payload });
    }

    pub fn events(&self) -> &[Event<E>] {
        &self.events
    }

    pub fn payloads(&self) -> impl Iterator<Item = &E> {
        self.events.iter().map(|e| &e.payload)
    }

    /// Takes the recorded events. Sequence numbers keep counting.
    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.events)
    }
}
