//! The context stack: which states are active, innermost last.
//!
//! The stack is the only thing carried from one line to the next, so it is
//! cheap to clone and compares by value. It is never empty: popping the last
//! frame puts the root frame back.

use crate::grammar::StateId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextStack {
    root: StateId,
    frames: Vec<StateId>,
}

impl ContextStack {
    pub fn new(root: StateId) -> Self {
        Self {
            root,
            frames: vec![root],
        }
    }

    /// The state rules are currently taken from.
    pub fn top(&self) -> StateId {
        self.frames.last().copied().unwrap_or(self.root)
    }

    pub fn root(&self) -> StateId {
        self.root
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frames from the bottom of the stack to the top.
    pub fn frames(&self) -> &[StateId] {
        &self.frames
    }

    pub(crate) fn push(&mut self, state: StateId) {
        self.frames.push(state);
    }

    /// Pop the top frame. Popping the last frame resets the stack to its root
    /// and returns `false`.
    pub(crate) fn pop(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            self.frames.clear();
            self.frames.push(self.root);
            false
        }
    }

    pub(crate) fn replace_top(&mut self, state: StateId) {
        match self.frames.last_mut() {
            Some(top) => *top = state,
            None => self.frames.push(state),
        }
    }
}
