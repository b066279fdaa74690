//! Text selections over the document.

use crate::node::Node;
use crate::step::Step;

/// A selection between two document positions. `anchor` is the fixed side,
/// `head` the moving side; they are equal for a caret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn caret(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    /// Caret at the first valid cursor position of the document.
    pub fn at_start(doc: &Node) -> Self {
        Self::caret(doc.first_cursor_pos())
    }

    /// Caret at the last valid cursor position of the document.
    pub fn at_end(doc: &Node) -> Self {
        Self::caret(doc.last_cursor_pos())
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Map this selection through a step.
    pub fn map(&self, step: &Step) -> Self {
        Self {
            anchor: step.map_pos(self.anchor),
            head: step.map_pos(self.head),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::step::{Slice, Step};

    #[test]
    fn test_from_to_normalize() {
        let sel = Selection::new(7, 3);
        assert_eq!(sel.from(), 3);
        assert_eq!(sel.to(), 7);
        assert!(!sel.is_collapsed());
    }

    #[test]
    fn test_map_through_insertion() {
        let sel = Selection::caret(5);
        let step = Step::replace(2, 2, Slice::inline(vec![Node::text_node("ab", vec![])]));
        assert_eq!(sel.map(&step), Selection::caret(7));
    }
}
