//! Content-changed notifications.
//!
//! Each editor owns one [`EventBus`]. Listeners are called synchronously, in
//! registration order, once the transaction that produced the events commits.

use std::fmt;

use crate::model::{Fragment, NodeId};
use crate::position::{Position, Range};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Remove,
    Move,
    Split,
    Mark,
    Attributes,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContentChanged {
    pub kind: ChangeKind,
    pub old_range: Range,
    pub new_range: Range,
    pub inserted_nodes: Vec<NodeId>,
    pub overwritten_nodes: Vec<Fragment>,
    pub mark_check_nodes: Vec<NodeId>,
    pub target_position: Option<Position>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(usize);

type Listener = Box<dyn FnMut(&ContentChanged)>;

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ContentChanged) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &ContentChanged) {
        tracing::trace!(kind = ?event.kind, range = %event.new_range, "content changed");
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
