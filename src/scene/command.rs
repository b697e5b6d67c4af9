//! Undoable scene edits.

use super::Scene;

/// A reversible change to a scene.
pub trait Command {
    fn label(&self) -> String;
    fn apply(&mut self, scene: &mut Scene);
    fn revert(&mut self, scene: &mut Scene);
}

/// Where a host keeps executed commands.
pub trait CommandStack {
    /// Records an applied command; forgets anything that could be redone.
    fn push(&mut self, command: Box<dyn Command>);

    /// Reverts the latest command. Returns `false` when there is none.
    fn undo(&mut self, scene: &mut Scene) -> bool;

    /// Re-applies the latest undone command.
    fn redo(&mut self, scene: &mut Scene) -> bool;
}

/// Bounded in-memory undo history.
pub struct History {
    done: Vec<Box<dyn Command>>,
    undone: Vec<Box<dyn Command>>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            done: Vec::new(),
            undone: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn undo_label(&self) -> Option<String> {
        self.done.last().map(|c| c.label())
    }

    pub fn redo_label(&self) -> Option<String> {
        self.undone.last().map(|c| c.label())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl CommandStack for History {
    fn push(&mut self, command: Box<dyn Command>) {
        self.undone.clear();
        self.done.push(command);
        if self.done.len() > self.limit {
            self.done.remove(0);
        }
    }

    fn undo(&mut self, scene: &mut Scene) -> bool {
        let Some(mut command) = self.done.pop() else {
            return false;
        };
        log::debug!("Undo {}", command.label());
        command.revert(scene);
        self.undone.push(command);
        true
    }

    fn redo(&mut self, scene: &mut Scene) -> bool {
        let Some(mut command) = self.undone.pop() else {
            return false;
        };
        log::debug!("Redo {}", command.label());
        command.apply(scene);
        self.done.push(command);
        true
    }
}

/// Sets a scene parameter, remembering the previous value.
pub struct SetParameter {
    key: String,
    value: String,
    previous: Option<String>,
}

impl SetParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            previous: None,
        }
    }
}

impl Command for SetParameter {
    fn label(&self) -> String {
        format!("set {} to {}", self.key, self.value)
    }

    fn apply(&mut self, scene: &mut Scene) {
        self.previous = scene.parameter(&self.key);
        scene.set_parameter(&self.key, &self.value);
    }

    fn revert(&mut self, scene: &mut Scene) {
        match &self.previous {
            Some(previous) => scene.set_parameter(&self.key, previous),
            None => {
                scene.remove_parameter(&self.key);
            }
        }
    }
}
