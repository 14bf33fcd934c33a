//! Undo/redo history for scene editing

use kiln_scene::SceneGraph;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;

/// An undoable scene mutation
pub trait Command: Any {
    fn execute(&mut self, scene: &mut SceneGraph);
    fn undo(&mut self, scene: &mut SceneGraph);

    /// Commands only merge with commands of the same tag
    fn type_tag(&self) -> &'static str;
    fn description(&self) -> String;

    /// Try to fold `previous` (the current top of the undo stack) into this
    /// command. On success this command takes over the older pre-state and
    /// replaces `previous` in the history.
    fn merge_with(&mut self, _previous: &dyn Command) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// What just happened to the history, passed to the change hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    Executed(String),
    Merged(String),
    Undone(String),
    Redone(String),
    Cleared,
}

/// Undo/redo stacks with bounded depth, command merging and a saved marker
pub struct CommandHistory {
    undo: VecDeque<Box<dyn Command>>,
    redo: VecDeque<Box<dyn Command>>,
    max_depth: usize,
    /// Undo depth at the last save; None once that state is unreachable
    saved_at: Option<usize>,
    on_changed: Option<Box<dyn FnMut(&HistoryEvent)>>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHistory")
            .field("undo", &self.undo.len())
            .field("redo", &self.redo.len())
            .field("max_depth", &self.max_depth)
            .field("saved_at", &self.saved_at)
            .finish_non_exhaustive()
    }
}

impl CommandHistory {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            max_depth: max_depth.max(1),
            saved_at: Some(0),
            on_changed: None,
        }
    }

    pub fn set_on_changed(&mut self, hook: impl FnMut(&HistoryEvent) + 'static) {
        self.on_changed = Some(Box::new(hook));
    }

    fn notify(&mut self, event: HistoryEvent) {
        if let Some(hook) = self.on_changed.as_mut() {
            hook(&event);
        }
    }

    /// Run a command and record it, merging with the previous entry when
    /// the command allows it
    pub fn execute(&mut self, mut command: Box<dyn Command>, scene: &mut SceneGraph) {
        command.execute(scene);
        let description = command.description();

        if !self.redo.is_empty() {
            self.redo.clear();
            if self.saved_at.is_some_and(|n| n > self.undo.len()) {
                self.saved_at = None;
            }
        }

        let at_save_point = self.saved_at == Some(self.undo.len());
        let merged = !at_save_point
            && self.undo.back().is_some_and(|previous| {
                previous.type_tag() == command.type_tag() && command.merge_with(previous.as_ref())
            });

        if merged {
            self.undo.pop_back();
            self.undo.push_back(command);
        } else {
            self.undo.push_back(command);
            if self.undo.len() > self.max_depth {
                self.undo.pop_front();
                self.saved_at = match self.saved_at {
                    Some(0) | None => None,
                    Some(n) => Some(n - 1),
                };
            }
        }

        log::debug!("Executed: {}", description);
        self.notify(if merged {
            HistoryEvent::Merged(description)
        } else {
            HistoryEvent::Executed(description)
        });
    }

    pub fn undo(&mut self, scene: &mut SceneGraph) -> bool {
        let Some(mut command) = self.undo.pop_back() else {
            return false;
        };
        command.undo(scene);
        let description = command.description();
        self.redo.push_back(command);
        log::info!("Undo: {}", description);
        self.notify(HistoryEvent::Undone(description));
        true
    }

    pub fn redo(&mut self, scene: &mut SceneGraph) -> bool {
        let Some(mut command) = self.redo.pop_back() else {
            return false;
        };
        command.execute(scene);
        let description = command.description();
        self.undo.push_back(command);
        log::info!("Redo: {}", description);
        self.notify(HistoryEvent::Redone(description));
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo.back().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo.back().map(|c| c.description())
    }

    /// The most recent entry on the undo stack
    pub fn last(&self) -> Option<&dyn Command> {
        self.undo.back().map(|c| c.as_ref())
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth.max(1);
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
            self.saved_at = self.saved_at.and_then(|n| n.checked_sub(1));
        }
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.saved_at = Some(0);
        self.notify(HistoryEvent::Cleared);
    }

    /// Remember the current state as the saved one
    pub fn mark_saved(&mut self) {
        self.saved_at = Some(self.undo.len());
    }

    pub fn is_dirty(&self) -> bool {
        self.saved_at != Some(self.undo.len())
    }
}
