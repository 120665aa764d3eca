//! Undo/redo history over (current axis, option document) snapshots.

use crate::axis::AxisSelector;
use crate::doc::OptionDocument;
use crate::error::{EditorError, HistoryKind, Result};

/// State captured before an edit: which axis was being edited and the whole option tree.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    axis: AxisSelector,
    options: OptionDocument,
}

impl HistorySnapshot {
    pub fn new(axis: AxisSelector, options: OptionDocument) -> Self {
        Self { axis, options }
    }

    pub fn axis(&self) -> AxisSelector {
        self.axis
    }

    pub fn options(&self) -> &OptionDocument {
        &self.options
    }

    pub fn into_parts(self) -> (AxisSelector, OptionDocument) {
        (self.axis, self.options)
    }
}

/// Plain LIFO of snapshots. Every push is one step; nothing is merged.
#[derive(Debug, Default, Clone)]
pub struct HistoryStack {
    entries: Vec<HistorySnapshot>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: HistorySnapshot) {
        self.entries.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<HistorySnapshot> {
        self.entries.pop()
    }

    pub fn peek(&self) -> Option<&HistorySnapshot> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The undo and redo stacks of one editing session.
#[derive(Debug, Default, Clone)]
pub struct History {
    undo_stack: HistoryStack,
    redo_stack: HistoryStack,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Record the state before a forward edit. Any redo steps are dropped.
    pub fn record(&mut self, before: HistorySnapshot) {
        tracing::trace!(depth = self.undo_stack.depth() + 1, "history: recorded step");
        self.undo_stack.push(before);
        self.redo_stack.clear();
    }

    /// Pop the newest undo step, parking `current` on the redo stack.
    pub fn undo(&mut self, current: HistorySnapshot) -> Result<HistorySnapshot> {
        let prev = self
            .undo_stack
            .pop()
            .ok_or(EditorError::HistoryEmpty(HistoryKind::Undo))?;
        self.redo_stack.push(current);
        Ok(prev)
    }

    /// Pop the newest redo step, parking `current` on the undo stack.
    pub fn redo(&mut self, current: HistorySnapshot) -> Result<HistorySnapshot> {
        let next = self
            .redo_stack
            .pop()
            .ok_or(EditorError::HistoryEmpty(HistoryKind::Redo))?;
        self.undo_stack.push(current);
        Ok(next)
    }

    /// Drops undo steps that would restore `current` unchanged. Returns how many were dropped.
    pub fn drop_steps_matching(&mut self, current: &OptionDocument) -> usize {
        let mut dropped = 0;
        while self.undo_stack.peek().is_some_and(|top| top.options() == current) {
            self.undo_stack.pop();
            dropped += 1;
        }
        dropped
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.depth()
    }
}
