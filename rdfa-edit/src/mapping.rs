//! Translating positions across edits.
//!
//! Every tree operation describes its effect on absolute offsets as a list of
//! [`StepMap`]s: "at `start`, `deleted` units were replaced by `inserted`
//! units". A [`RangeMapper`] applies those steps in order.

use crate::model::NodeId;
use crate::position::{Position, Range};

/// Which side a position exactly on an edit boundary sticks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Bias {
    Left,
    #[default]
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepMap {
    pub root: NodeId,
    pub start: usize,
    pub deleted: usize,
    pub inserted: usize,
}

impl StepMap {
    pub fn insertion(at: Position, inserted: usize) -> Self {
        Self {
            root: at.root(),
            start: at.offset(),
            deleted: 0,
            inserted,
        }
    }

    pub fn deletion(range: &Range) -> Self {
        Self::replacement(range, 0)
    }

    pub fn replacement(range: &Range, inserted: usize) -> Self {
        Self {
            root: range.root(),
            start: range.start.offset(),
            deleted: range.len(),
            inserted,
        }
    }

    pub fn map(&self, pos: Position, bias: Bias) -> Position {
        if pos.root() != self.root {
            return pos;
        }
        let offset = pos.offset();
        let end = self.start + self.deleted;
        if offset < self.start {
            return pos;
        }
        if offset > end {
            return pos.with_offset(offset - self.deleted + self.inserted);
        }
        // At the edges of a replaced span a position stays with the content
        // it touched; only a pure insertion point is ambiguous.
        let side = if self.deleted == 0 {
            bias
        } else if offset == self.start {
            Bias::Left
        } else if offset == end {
            Bias::Right
        } else {
            bias
        };
        match side {
            Bias::Left => pos.with_offset(self.start),
            Bias::Right => pos.with_offset(self.start + self.inserted),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.deleted == 0 && self.inserted == 0
    }
}

/// An ordered, composable list of step maps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeMapper {
    steps: Vec<StepMap>,
}

impl RangeMapper {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_step(step: StepMap) -> Self {
        let mut mapper = Self::identity();
        mapper.push(step);
        mapper
    }

    pub fn push(&mut self, step: StepMap) {
        if !step.is_identity() {
            self.steps.push(step);
        }
    }

    /// Appends `other`, which must be expressed in the coordinates produced
    /// by `self`.
    pub fn append(&mut self, other: &RangeMapper) {
        self.steps.extend_from_slice(&other.steps);
    }

    pub fn then(mut self, other: &RangeMapper) -> Self {
        self.append(other);
        self
    }

    pub fn steps(&self) -> &[StepMap] {
        &self.steps
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn map_position(&self, pos: Position, bias: Bias) -> Position {
        self.steps.iter().fold(pos, |pos, step| step.map(pos, bias))
    }

    pub fn map(&self, pos: Position) -> Position {
        self.map_position(pos, Bias::default())
    }

    /// Maps a range so that content inserted at either edge stays outside
    /// of it. Collapsed ranges behave as a cursor and move past insertions.
    pub fn map_range(&self, range: &Range) -> Range {
        if range.is_collapsed() {
            return Range::collapsed(self.map_position(range.start, Bias::Right));
        }
        let start = self.map_position(range.start, Bias::Right);
        let end = self.map_position(range.end, Bias::Left);
        if end < start {
            Range::collapsed(start)
        } else {
            Range::new(start, end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::before_insert(2, Bias::Right, 2)]
    #[case::after_insert(8, Bias::Right, 11)]
    #[case::at_insert_left(5, Bias::Left, 5)]
    #[case::at_insert_right(5, Bias::Right, 8)]
    fn insertion(#[case] pos: usize, #[case] bias: Bias, #[case] expected: usize) {
        let step = StepMap::insertion(Position::new(5), 3);
        assert_eq!(step.map(Position::new(pos), bias), Position::new(expected));
    }

    #[rstest]
    #[case::before(1, Bias::Right, 1)]
    #[case::start(2, Bias::Right, 2)]
    #[case::inside_left(4, Bias::Left, 2)]
    #[case::inside_right(4, Bias::Right, 2)]
    #[case::end(6, Bias::Left, 2)]
    #[case::after(9, Bias::Right, 5)]
    fn deletion(#[case] pos: usize, #[case] bias: Bias, #[case] expected: usize) {
        let step = StepMap::deletion(&Range::between(2, 6));
        assert_eq!(step.map(Position::new(pos), bias), Position::new(expected));
    }

    #[test]
    fn steps_compose_in_order() {
        let mut mapper = RangeMapper::from_step(StepMap::deletion(&Range::between(6, 8)));
        mapper.push(StepMap::insertion(Position::new(1), 4));
        assert_eq!(mapper.map(Position::new(10)), Position::new(12));
        assert_eq!(mapper.map(Position::new(3)), Position::new(7));
    }

    #[test]
    fn other_roots_are_untouched() {
        let step = StepMap::insertion(Position::new(0), 10);
        let elsewhere = Position::in_root(NodeId::from_index(7), 3);
        assert_eq!(step.map(elsewhere, Bias::Right), elsewhere);
    }

    #[test]
    fn ranges_exclude_edge_insertions() {
        let mapper = RangeMapper::from_step(StepMap::insertion(Position::new(4), 2));
        assert_eq!(
            mapper.map_range(&Range::between(4, 4)),
            Range::between(6, 6)
        );
        assert_eq!(
            mapper.map_range(&Range::between(2, 4)),
            Range::between(2, 4)
        );
        assert_eq!(
            mapper.map_range(&Range::between(4, 8)),
            Range::between(6, 10)
        );
    }
}
