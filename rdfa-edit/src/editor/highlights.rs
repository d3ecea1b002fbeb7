//! Highlight and annotation ranges that survive edits.
//!
//! Registered ranges are carried through the mapper of every committed
//! transaction. Updates can be queued while a batch is being prepared; the
//! queue is applied on the next [`HighlightRegistry::flush`], after any
//! edits in between have been mapped into it.

use indexmap::IndexMap;

use crate::mapping::RangeMapper;
use crate::position::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HighlightId(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Highlight {
    pub range: Range,
    pub class: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Pending {
    Add(HighlightId, Highlight),
    Remove(HighlightId),
}

#[derive(Clone, Debug, Default)]
pub struct HighlightRegistry {
    highlights: IndexMap<HighlightId, Highlight>,
    queue: Vec<Pending>,
    next_id: u64,
}

impl HighlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> HighlightId {
        let id = HighlightId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add(&mut self, range: Range, class: impl Into<String>) -> HighlightId {
        let id = self.allocate();
        self.highlights.insert(
            id,
            Highlight {
                range,
                class: class.into(),
            },
        );
        id
    }

    pub fn remove(&mut self, id: HighlightId) -> Option<Highlight> {
        self.highlights.shift_remove(&id)
    }

    pub fn get(&self, id: HighlightId) -> Option<&Highlight> {
        self.highlights.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HighlightId, &Highlight)> {
        self.highlights.iter().map(|(&id, h)| (id, h))
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    /// Queues a highlight; the id is valid once the queue is flushed.
    pub fn queue_add(&mut self, range: Range, class: impl Into<String>) -> HighlightId {
        let id = self.allocate();
        self.queue.push(Pending::Add(
            id,
            Highlight {
                range,
                class: class.into(),
            },
        ));
        id
    }

    pub fn queue_remove(&mut self, id: HighlightId) {
        self.queue.push(Pending::Remove(id));
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Carries every range, queued ones included, across an edit.
    pub fn map(&mut self, mapper: &RangeMapper) {
        if mapper.is_identity() {
            return;
        }
        for highlight in self.highlights.values_mut() {
            highlight.range = mapper.map_range(&highlight.range);
        }
        for pending in &mut self.queue {
            if let Pending::Add(_, highlight) = pending {
                highlight.range = mapper.map_range(&highlight.range);
            }
        }
    }

    /// Applies queued updates in order. Returns how many were applied.
    pub fn flush(&mut self) -> usize {
        let queue = std::mem::take(&mut self.queue);
        let count = queue.len();
        for pending in queue {
            match pending {
                Pending::Add(id, highlight) => {
                    self.highlights.insert(id, highlight);
                }
                Pending::Remove(id) => {
                    self.highlights.shift_remove(&id);
                }
            }
        }
        if count > 0 {
            tracing::trace!(count, "highlight updates flushed");
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::StepMap;
    use crate::position::Position;
    use pretty_assertions::assert_eq;

    #[test]
    fn queued_ranges_are_mapped_before_they_apply() {
        let mut registry = HighlightRegistry::new();
        let live = registry.add(Range::between(4, 6), "live");
        let queued = registry.queue_add(Range::between(8, 9), "queued");
        assert_eq!(registry.get(queued), None);

        registry.map(&RangeMapper::from_step(StepMap::insertion(
            Position::new(0),
            3,
        )));
        assert_eq!(registry.flush(), 1);

        assert_eq!(registry.get(live).unwrap().range, Range::between(7, 9));
        assert_eq!(registry.get(queued).unwrap().range, Range::between(11, 12));

        registry.queue_remove(live);
        registry.flush();
        assert_eq!(registry.len(), 1);
    }
}
