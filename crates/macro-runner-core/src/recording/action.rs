use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Command name the host reports for in-place typing.
pub const KEYBOARD_COMMAND: &str = "keyboard";

/// A single recorded user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordedAction {
    /// A UI or editor command invocation.
    Command {
        /// Command group the command belongs to.
        command_group_id: Uuid,
        /// Command identifier within its group.
        command_id: u32,
        /// Canonical command name, empty when the host could not resolve one.
        #[serde(default)]
        command_name: String,
        /// Typed character, set only for character-insertion commands.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input_char: Option<char>,
    },
    /// A non-document tool window gained focus.
    WindowActivation {
        /// Persistence id of the tool window.
        tool_window_id: Uuid,
        /// Caption shown on the tool window.
        caption: String,
    },
    /// A document gained focus.
    DocumentActivation {
        /// Full path of the document.
        path: String,
    },
}

impl RecordedAction {
    /// Build a character-insertion command.
    pub fn typed(input: char) -> Self {
        RecordedAction::Command {
            command_group_id: Uuid::nil(),
            command_id: 0,
            command_name: KEYBOARD_COMMAND.to_string(),
            input_char: Some(input),
        }
    }

    /// Build a named command with no group information.
    pub fn named(command_name: impl Into<String>) -> Self {
        RecordedAction::Command {
            command_group_id: Uuid::nil(),
            command_id: 0,
            command_name: command_name.into(),
            input_char: None,
        }
    }

    /// True for commands that insert a literal character.
    pub fn is_insert(&self) -> bool {
        matches!(
            self,
            RecordedAction::Command {
                input_char: Some(_),
                ..
            }
        )
    }

    /// True for window and document activations.
    pub fn is_activation(&self) -> bool {
        !matches!(self, RecordedAction::Command { .. })
    }
}

/// Characters that are reflected in generated insert statements.
pub fn is_valid_input(c: char) -> bool {
    !c.is_control()
}

/// Append-only, totally ordered log of recorded actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionLog {
    actions: Vec<RecordedAction>,
}

impl ActionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to the end of the log.
    pub fn push(&mut self, action: RecordedAction) {
        self.actions.push(action);
    }

    /// Drop every recorded action.
    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Number of recorded actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Recorded actions in recording order.
    pub fn actions(&self) -> &[RecordedAction] {
        &self.actions
    }

    /// Most recently recorded action.
    pub fn last(&self) -> Option<&RecordedAction> {
        self.actions.last()
    }
}

impl FromIterator<RecordedAction> for ActionLog {
    fn from_iter<I: IntoIterator<Item = RecordedAction>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}
