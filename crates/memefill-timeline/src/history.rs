//! Undo/redo history of state snapshots.
//!
//! Every mutation pushes a copy of the state it is about to replace. Undo and
//! redo swap the current state with the top of the opposite stack, so an undo
//! followed by a redo always restores the exact state before the undo.

/// Undo/redo history stack.
#[derive(Debug, Clone)]
pub struct UndoStack<T> {
    /// Snapshots taken before each mutation (most recent last).
    undo: Vec<T>,
    /// Snapshots displaced by undo (most recent last).
    redo: Vec<T>,
    /// Maximum history depth.
    max_depth: usize,
}

impl<T> UndoStack<T> {
    /// Create a new undo stack with the given maximum depth.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Create a stack that never drops old snapshots.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Record the state as it was before a mutation.
    /// Clears the redo stack (new action invalidates redo history).
    pub fn push(&mut self, snapshot: T) {
        self.redo.clear();
        self.undo.push(snapshot);
        if self.undo.len() > self.max_depth {
            self.undo.remove(0);
        }
    }

    /// Step back: returns the previous state and stores `current` for redo.
    /// Hands `current` back as `Err` when there is nothing to undo.
    pub fn undo(&mut self, current: T) -> Result<T, T> {
        match self.undo.pop() {
            Some(previous) => {
                self.redo.push(current);
                Ok(previous)
            }
            None => Err(current),
        }
    }

    /// Step forward: returns the undone state and stores `current` for undo.
    pub fn redo(&mut self, current: T) -> Result<T, T> {
        match self.redo.pop() {
            Some(next) => {
                self.undo.push(current);
                Ok(next)
            }
            None => Err(current),
        }
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo steps available.
    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo steps available.
    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }
}

impl<T> Default for UndoStack<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}
