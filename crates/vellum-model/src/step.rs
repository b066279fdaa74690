//! Steps and slices: the atomic units of document mutation.

use crate::node::Node;

/// A piece of document content with open sides.
///
/// `open_start`/`open_end` count how many boundary tokens are missing on
/// each side. A fully closed slice (0/0) is a sequence of complete nodes;
/// an open 1/1 slice with two children expresses a textblock split, and an
/// open 1/1 empty slice expresses a join of two adjacent textblocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Slice {
    pub content: Vec<Node>,
    pub open_start: usize,
    pub open_end: usize,
}

impl Slice {
    /// The empty closed slice (a plain deletion).
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            open_start: 0,
            open_end: 0,
        }
    }

    /// The empty open 1/1 slice (joins two adjacent textblocks).
    pub fn open_empty() -> Self {
        Self {
            content: Vec::new(),
            open_start: 1,
            open_end: 1,
        }
    }

    /// A closed slice of inline nodes.
    pub fn inline(content: Vec<Node>) -> Self {
        Self {
            content,
            open_start: 0,
            open_end: 0,
        }
    }

    /// A closed slice of block nodes.
    pub fn blocks(content: Vec<Node>) -> Self {
        Self {
            content,
            open_start: 0,
            open_end: 0,
        }
    }

    /// Size of the slice in positions, accounting for open sides.
    pub fn size(&self) -> usize {
        let total: usize = self.content.iter().map(Node::node_size).sum();
        total.saturating_sub(self.open_start + self.open_end)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Type name of the first node in the slice, if any.
    pub fn first_type(&self) -> Option<&str> {
        self.content.first().map(|n| n.type_name.as_str())
    }
}

/// A single proposed mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Replace {
        from: usize,
        to: usize,
        slice: Slice,
    },
}

impl Step {
    pub fn replace(from: usize, to: usize, slice: Slice) -> Self {
        Step::Replace { from, to, slice }
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Step::Replace {
            from,
            to,
            slice: Slice::empty(),
        }
    }

    /// Map a document position through this step.
    pub fn map_pos(&self, pos: usize) -> usize {
        match self {
            Step::Replace { from, to, slice } => {
                if pos <= *from {
                    pos
                } else if pos >= *to {
                    (pos + slice.size()).saturating_sub(to - from)
                } else {
                    *from
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn test_slice_size_accounts_for_open_sides() {
        assert_eq!(Slice::empty().size(), 0);
        assert_eq!(Slice::open_empty().size(), 0);
        let s = Slice::inline(vec![Node::text_node("abc", vec![])]);
        assert_eq!(s.size(), 3);
    }

    #[test]
    fn test_map_pos() {
        // delete 3 positions at 2..5
        let step = Step::delete(2, 5);
        assert_eq!(step.map_pos(1), 1);
        assert_eq!(step.map_pos(2), 2);
        assert_eq!(step.map_pos(3), 2);
        assert_eq!(step.map_pos(5), 2);
        assert_eq!(step.map_pos(8), 5);

        // insert 2 positions at 4
        let step = Step::replace(4, 4, Slice::inline(vec![Node::text_node("xy", vec![])]));
        assert_eq!(step.map_pos(3), 3);
        assert_eq!(step.map_pos(4), 4);
        assert_eq!(step.map_pos(5), 7);
    }
}
