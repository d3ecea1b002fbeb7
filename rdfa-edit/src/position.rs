//! Positions and ranges over a document's flattened content.
//!
//! A [`Position`] is an absolute offset into the content of a root element:
//! every element contributes an opening token, its content and a closing
//! token, every text node contributes its characters. The same location can
//! also be written as a structural path, see [`Document::to_path`].

use std::cmp::Ordering;
use std::fmt;

use crate::Error;
use crate::mapping::Bias;
use crate::model::{Document, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    root: NodeId,
    offset: usize,
}

impl Position {
    /// A position in the document root.
    pub fn new(offset: usize) -> Self {
        Self::in_root(NodeId::ROOT, offset)
    }

    pub fn in_root(root: NodeId, offset: usize) -> Self {
        Self { root, offset }
    }

    pub fn root(self) -> NodeId {
        self.root
    }

    pub fn offset(self) -> usize {
        self.offset
    }

    pub fn shifted(self, delta: usize) -> Self {
        Self::in_root(self.root, self.offset + delta)
    }

    pub(crate) fn with_offset(self, offset: usize) -> Self {
        Self::in_root(self.root, offset)
    }

    /// Orders two positions; `None` when they live in different roots.
    pub fn compare(self, other: Position) -> Option<Ordering> {
        (self.root == other.root).then(|| self.offset.cmp(&other.offset))
    }

    /// Whether `self` lies between `start` and `end`, both included.
    pub fn is_between(self, start: Position, end: Position) -> bool {
        matches!(
            self.compare(start),
            Some(Ordering::Greater | Ordering::Equal)
        ) && matches!(self.compare(end), Some(Ordering::Less | Ordering::Equal))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root == NodeId::ROOT {
            write!(f, "{}", self.offset)
        } else {
            write!(f, "{}@{}", self.offset, self.root)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Builds a range, swapping the ends when given in reverse.
    pub fn new(start: Position, end: Position) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// A range in the document root.
    pub fn between(start: usize, end: usize) -> Self {
        Self::new(Position::new(start), Position::new(end))
    }

    pub fn collapsed(at: Position) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn collapse(&self, to_left: bool) -> Self {
        Self::collapsed(if to_left { self.start } else { self.end })
    }

    pub fn root(&self) -> NodeId {
        self.start.root()
    }

    pub fn len(&self) -> usize {
        self.end.offset() - self.start.offset()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `pos` lies within the range, boundaries included.
    pub fn contains(&self, pos: Position) -> bool {
        pos.is_between(self.start, self.end)
    }

    /// Whether `pos` lies within the range, boundaries excluded.
    pub fn strictly_contains(&self, pos: Position) -> bool {
        pos.root() == self.root()
            && self.start.offset() < pos.offset()
            && pos.offset() < self.end.offset()
    }

    pub fn same_as(&self, other: &Range) -> bool {
        self == other
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// A position resolved against a concrete tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPos {
    pub position: Position,
    /// Element whose content holds the position.
    pub parent: NodeId,
    pub depth: usize,
    /// Index of the child at or after the position. When the position is
    /// inside a text node this is that text node's index.
    pub index: usize,
    /// Offset from the start of `parent`'s content.
    pub parent_offset: usize,
    /// Text node and character offset when strictly inside text.
    pub text: Option<(NodeId, usize)>,
}

/// Flattened text of a range with a way back from string indexes to
/// positions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextMapping {
    pub text: String,
    segments: Vec<Segment>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Segment {
    /// Cumulative character count before this segment.
    offset: usize,
    len: usize,
    start: Position,
}

impl TextMapping {
    /// Position of the character index `index`. At a seam between two text
    /// runs the bias picks the end of the left run or the start of the
    /// right one.
    pub fn position_at(&self, index: usize, bias: Bias) -> Option<Position> {
        let mut found = None;
        for segment in &self.segments {
            if index < segment.offset {
                break;
            }
            let end = segment.offset + segment.len;
            if index <= end {
                found = Some(segment.start.shifted(index - segment.offset));
                if bias == Bias::Left || index < end {
                    return found;
                }
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.segments.last().map_or(0, |s| s.offset + s.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Document {
    /// Resolves `pos` to its parent element and offset among children.
    pub fn resolve(&self, pos: Position) -> Result<ResolvedPos, Error> {
        let root = pos.root();
        let root_node = self.node(root)?;
        if root_node.is_text() {
            return Err(Error::NotAnElement { node: root });
        }
        let size = self.content_size(root);
        if pos.offset() > size {
            return Err(Error::PositionOutOfBounds {
                offset: pos.offset(),
                size,
            });
        }

        let mut parent = root;
        let mut rel = pos.offset();
        let mut depth = 0;
        'descend: loop {
            let mut acc = 0;
            for (index, &child) in self.children(parent).iter().enumerate() {
                if rel == acc {
                    return Ok(ResolvedPos {
                        position: pos,
                        parent,
                        depth,
                        index,
                        parent_offset: rel,
                        text: None,
                    });
                }
                let child_size = self.node_size(child);
                if rel < acc + child_size {
                    if self.text(child).is_some() {
                        return Ok(ResolvedPos {
                            position: pos,
                            parent,
                            depth,
                            index,
                            parent_offset: rel,
                            text: Some((child, rel - acc)),
                        });
                    }
                    rel -= acc + 1;
                    parent = child;
                    depth += 1;
                    continue 'descend;
                }
                acc += child_size;
            }
            return Ok(ResolvedPos {
                position: pos,
                parent,
                depth,
                index: self.children(parent).len(),
                parent_offset: rel,
                text: None,
            });
        }
    }

    /// Node directly after the position, `None` inside text or at the end
    /// of a parent's content.
    pub fn node_after(&self, pos: Position) -> Result<Option<NodeId>, Error> {
        let resolved = self.resolve(pos)?;
        if resolved.text.is_some() {
            return Ok(None);
        }
        Ok(self.children(resolved.parent).get(resolved.index).copied())
    }

    pub fn node_before(&self, pos: Position) -> Result<Option<NodeId>, Error> {
        let resolved = self.resolve(pos)?;
        if resolved.text.is_some() || resolved.index == 0 {
            return Ok(None);
        }
        Ok(self.children(resolved.parent).get(resolved.index - 1).copied())
    }

    /// The range covering `id` from its opening to its closing boundary.
    pub fn range_around(&self, id: NodeId) -> Result<Range, Error> {
        Ok(Range::new(self.node_start(id)?, self.node_end(id)?))
    }

    /// The range covering the content of element `id`.
    pub fn content_range(&self, id: NodeId) -> Result<Range, Error> {
        Ok(Range::new(self.content_start(id)?, self.content_end(id)?))
    }

    /// Converts a structural path into an absolute position. Each step is an
    /// offset among siblings where elements count 1 and text counts its
    /// length; every step but the last must land on an element.
    pub fn from_path(&self, root: NodeId, path: &[usize]) -> Result<Position, Error> {
        let Some((&last, steps)) = path.split_last() else {
            return self.content_start(root);
        };
        let mut parent = root;
        for &step in steps {
            let mut acc = 0;
            let mut next = None;
            for &child in self.children(parent) {
                if acc == step && self.element(child).is_some() {
                    next = Some(child);
                    break;
                }
                acc += self.node(child)?.path_len();
                if acc > step {
                    break;
                }
            }
            parent = next.ok_or(Error::InvalidPath {
                path: path.to_vec(),
            })?;
        }

        let base = self.content_start(parent)?;
        let mut path_acc = 0;
        let mut offset_acc = 0;
        for &child in self.children(parent) {
            let node = self.node(child)?;
            let len = node.path_len();
            if last < path_acc + len || last == path_acc {
                let inner = if node.is_text() { last - path_acc } else { 0 };
                return Ok(base.shifted(offset_acc + inner));
            }
            path_acc += len;
            offset_acc += self.node_size(child);
        }
        if last == path_acc {
            Ok(base.shifted(offset_acc))
        } else {
            Err(Error::InvalidPath {
                path: path.to_vec(),
            })
        }
    }

    /// Converts an absolute position into a structural path.
    pub fn to_path(&self, pos: Position) -> Result<Vec<usize>, Error> {
        let resolved = self.resolve(pos)?;
        let path_offset = |parent: NodeId, index: usize| -> usize {
            self.children(parent)
                .iter()
                .take(index)
                .filter_map(|&c| self.get(c))
                .map(|n| n.path_len())
                .sum()
        };

        let mut last = path_offset(resolved.parent, resolved.index);
        if let Some((_, inner)) = resolved.text {
            last += inner;
        }
        let mut path = vec![last];
        let mut node = resolved.parent;
        while node != pos.root() {
            let parent = self.parent(node).ok_or(Error::NoParent { node })?;
            let index = self
                .index_in_parent(node)
                .ok_or(Error::NoParent { node })?;
            path.push(path_offset(parent, index));
            node = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Whether both ends of `range` share the same parent element.
    pub fn is_confined(&self, range: &Range) -> Result<bool, Error> {
        Ok(self.resolve(range.start)?.parent == self.resolve(range.end)?.parent)
    }

    /// Deepest element containing both ends of the range. Fails soft: ranges
    /// spanning two roots, or not resolvable, have no common ancestor.
    pub fn common_ancestor(&self, range: &Range) -> Option<NodeId> {
        if range.start.root() != range.end.root() {
            return None;
        }
        let start = self.resolve(range.start).ok()?;
        let end = self.resolve(range.end).ok()?;
        let chain: Vec<NodeId> = std::iter::once(start.parent)
            .chain(self.ancestors(start.parent))
            .collect();
        std::iter::once(end.parent)
            .chain(self.ancestors(end.parent))
            .find(|n| chain.contains(n))
    }

    /// Expands the range outward so that both ends sit between whole
    /// children of the common ancestor.
    pub fn maximized_range(&self, range: &Range) -> Result<Range, Error> {
        let ancestor = self.common_ancestor(range).ok_or(Error::DifferentRoots)?;
        let start = self.outer_boundary(range.start, ancestor, true)?;
        let end = self.outer_boundary(range.end, ancestor, false)?;
        Ok(Range::new(start, end))
    }

    fn outer_boundary(
        &self,
        pos: Position,
        ancestor: NodeId,
        at_start: bool,
    ) -> Result<Position, Error> {
        let resolved = self.resolve(pos)?;
        let child = if resolved.parent == ancestor {
            match resolved.text {
                Some((text, _)) => text,
                None => return Ok(pos),
            }
        } else {
            std::iter::once(resolved.parent)
                .chain(self.ancestors(resolved.parent))
                .find(|&n| self.parent(n) == Some(ancestor))
                .ok_or(Error::Internal {
                    message: format!("{ancestor} is not an ancestor of {pos}"),
                })?
        };
        if at_start {
            self.node_start(child)
        } else {
            self.node_end(child)
        }
    }

    /// Decomposes a range into the shortest ordered list of non-empty
    /// confined ranges covering the same content.
    pub fn minimum_confined_ranges(&self, range: &Range) -> Result<Vec<Range>, Error> {
        if range.is_collapsed() {
            return Ok(Vec::new());
        }
        let ancestor = self.common_ancestor(range).ok_or(Error::DifferentRoots)?;

        let mut leading = Vec::new();
        let mut cur = range.start;
        let mut node = self.resolve(range.start)?.parent;
        while node != ancestor {
            let end = self.content_end(node)?;
            leading.push(Range::new(cur, end));
            cur = end.shifted(1);
            node = self.parent(node).ok_or(Error::NoParent { node })?;
        }

        let mut trailing = Vec::new();
        let mut cur_end = range.end;
        let mut node = self.resolve(range.end)?.parent;
        while node != ancestor {
            let start = self.content_start(node)?;
            trailing.push(Range::new(start, cur_end));
            cur_end = start.with_offset(start.offset() - 1);
            node = self.parent(node).ok_or(Error::NoParent { node })?;
        }

        let middle = Range::new(cur, cur_end);
        Ok(leading
            .into_iter()
            .chain(std::iter::once(middle))
            .chain(trailing.into_iter().rev())
            .filter(|r| !r.is_collapsed())
            .collect())
    }

    /// Text nodes under `root` with the absolute position of their start.
    pub(crate) fn text_runs(&self, root: NodeId) -> Result<Vec<(NodeId, Position)>, Error> {
        fn visit(
            doc: &Document,
            id: NodeId,
            cursor: &mut Position,
            out: &mut Vec<(NodeId, Position)>,
        ) {
            for &child in doc.children(id) {
                if let Some(text) = doc.text(child) {
                    out.push((child, *cursor));
                    *cursor = cursor.shifted(text.len());
                } else {
                    *cursor = cursor.shifted(1);
                    visit(doc, child, cursor, out);
                    *cursor = cursor.shifted(1);
                }
            }
        }

        let mut cursor = self.content_start(root)?;
        let mut out = Vec::new();
        visit(self, root, &mut cursor, &mut out);
        Ok(out)
    }

    /// Concatenated text inside `range`.
    pub fn text_in_range(&self, range: &Range) -> Result<String, Error> {
        Ok(self.text_with_mapping(range)?.text)
    }

    /// Text inside `range` plus the breakpoints needed to turn a string index
    /// back into a position.
    pub fn text_with_mapping(&self, range: &Range) -> Result<TextMapping, Error> {
        if range.start.root() != range.end.root() {
            return Err(Error::DifferentRoots);
        }
        let mut mapping = TextMapping::default();
        for (id, start) in self.text_runs(range.root())? {
            let Some(text) = self.text(id) else { continue };
            let len = text.len();
            let from = range.start.offset().max(start.offset());
            let to = range.end.offset().min(start.offset() + len);
            if from > to || (from == to && len > 0) {
                continue;
            }
            let skip = from - start.offset();
            mapping
                .text
                .extend(text.value.chars().skip(skip).take(to - from));
            mapping.segments.push(Segment {
                offset: mapping.segments.last().map_or(0, |s| s.offset + s.len),
                len: to - from,
                start: start.shifted(skip),
            });
        }
        Ok(mapping)
    }
}
