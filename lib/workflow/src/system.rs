//! Per-step editor flags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location of a step within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepPath {
    /// The trigger.
    Trigger,
    /// The action at an index.
    Action(usize),
}

impl fmt::Display for StepPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger => write!(f, "trigger"),
            Self::Action(index) => write!(f, "actions[{index}]"),
        }
    }
}

/// Editor flags for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFlags {
    /// A connector and operation are chosen.
    pub selected: bool,
    /// Authentication is satisfied.
    pub authenticated: bool,
    /// Every required input has a value.
    pub configured: bool,
    /// The step was tested or testing was skipped.
    pub tested: bool,
}

impl StepFlags {
    /// Returns true if every flag is set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.selected && self.authenticated && self.configured && self.tested
    }
}

/// Editor flags for every step of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    /// Trigger flags.
    pub trigger: StepFlags,
    /// Action flags, aligned with the workflow's actions.
    #[serde(default)]
    pub actions: Vec<StepFlags>,
}

impl SystemState {
    /// Returns the flags at a path, or the default if none were recorded.
    #[must_use]
    pub fn flags(&self, path: StepPath) -> StepFlags {
        match path {
            StepPath::Trigger => self.trigger,
            StepPath::Action(index) => self.actions.get(index).copied().unwrap_or_default(),
        }
    }

    /// Records the flags at a path, growing the action list as needed.
    pub fn set_flags(&mut self, path: StepPath, flags: StepFlags) {
        match path {
            StepPath::Trigger => self.trigger = flags,
            StepPath::Action(index) => {
                if self.actions.len() <= index {
                    self.actions.resize(index + 1, StepFlags::default());
                }
                self.actions[index] = flags;
            }
        }
    }

    /// Returns true if the trigger and the first `action_count` actions are complete.
    #[must_use]
    pub fn all_complete(&self, action_count: usize) -> bool {
        self.trigger.is_complete()
            && (0..action_count).all(|index| self.flags(StepPath::Action(index)).is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DONE: StepFlags = StepFlags {
        selected: true,
        authenticated: true,
        configured: true,
        tested: true,
    };

    #[test]
    fn path_display() {
        assert_eq!(StepPath::Trigger.to_string(), "trigger");
        assert_eq!(StepPath::Action(2).to_string(), "actions[2]");
    }

    #[test]
    fn set_flags_grows_actions() {
        let mut system = SystemState::default();
        system.set_flags(StepPath::Action(2), DONE);
        assert_eq!(system.actions.len(), 3);
        assert_eq!(system.flags(StepPath::Action(0)), StepFlags::default());
        assert_eq!(system.flags(StepPath::Action(2)), DONE);
    }

    #[test]
    fn all_complete_requires_every_step() {
        let mut system = SystemState::default();
        system.set_flags(StepPath::Trigger, DONE);
        assert!(system.all_complete(0));
        assert!(!system.all_complete(1));

        system.set_flags(StepPath::Action(0), DONE);
        assert!(system.all_complete(1));

        system.set_flags(
            StepPath::Action(0),
            StepFlags {
                tested: false,
                ..DONE
            },
        );
        assert!(!system.all_complete(1));
    }
}
