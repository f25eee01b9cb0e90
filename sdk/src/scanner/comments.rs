//! Attaching comments to declarations by position

use tree_sitter::Node;

use crate::syntax::CommentNode;

/// The comments of one file, tracking which are claimed by a declaration
pub struct CommentIndex {
    comments: Vec<CommentNode>,
    claimed: Vec<bool>,
}

impl CommentIndex {
    pub fn new(comments: Vec<CommentNode>) -> Self {
        let claimed = vec![false; comments.len()];
        Self { comments, claimed }
    }

    /// Doc comment block of a node starting on `row`: the contiguous run of
    /// own-line comments whose last line is `row - 1`
    pub fn doc_for(&mut self, row: usize) -> Vec<String> {
        let picked = self.doc_block(row);
        self.claim(picked)
    }

    fn doc_block(&self, row: usize) -> Vec<usize> {
        let mut picked = Vec::new();
        let mut next_row = row;
        for idx in (0..self.comments.len()).rev() {
            let comment = &self.comments[idx];
            if comment.end_row >= next_row {
                continue;
            }
            if !comment.own_line || comment.end_row + 1 != next_row {
                break;
            }
            picked.push(idx);
            next_row = comment.start_row;
        }
        picked.reverse();
        picked
    }

    /// Comment starting on the last line of `node`, after it
    pub fn trailing_for(&mut self, node: Node<'_>) -> Vec<String> {
        let row = node.end_position().row;
        let end = node.end_byte();
        let picked: Vec<usize> = self
            .comments
            .iter()
            .enumerate()
            .filter(|(_, c)| c.start_row == row && c.start_byte >= end)
            .map(|(idx, _)| idx)
            .take(1)
            .collect();
        self.claim(picked)
    }

    /// Mark the doc block of a node as consumed without using it; lines
    /// containing `keep_marker` stay free
    pub fn discard_doc(&mut self, row: usize, keep_marker: &str) {
        let picked: Vec<usize> = self
            .doc_block(row)
            .into_iter()
            .filter(|&idx| !self.comments[idx].text.contains(keep_marker))
            .collect();
        self.claim(picked);
    }

    /// Whether the comment starting at `start_byte` was claimed by a declaration
    pub fn is_claimed(&self, start_byte: usize) -> bool {
        self.comments
            .iter()
            .position(|c| c.start_byte == start_byte)
            .is_some_and(|idx| self.claimed[idx])
    }

    fn claim(&mut self, picked: Vec<usize>) -> Vec<String> {
        picked
            .into_iter()
            .map(|idx| {
                self.claimed[idx] = true;
                self.comments[idx].text.clone()
            })
            .collect()
    }
}
