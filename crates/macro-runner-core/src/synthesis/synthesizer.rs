use crate::{
    recording::{ActionLog, RecordedAction, is_valid_input},
    synthesis::{CommandTarget, Statement, statement::write_reference},
};

use std::fmt::Write;

use tracing::{debug, instrument};

/// Declaration target used when the caller does not supply one.
pub const DEFAULT_REFERENCE_PATH: &str = "dte.js";

/// Turns a finished [`ActionLog`] into macro source text.
///
/// Rendering is a single left-to-right pass with one element of lookahead.
/// Runs of typed characters collapse into one insert statement and runs of
/// the same command collapse into one invocation with a repeat count.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    reference_path: String,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_PATH)
    }
}

impl Synthesizer {
    /// Create a synthesizer whose scripts reference the given declaration file.
    pub fn new(reference_path: impl Into<String>) -> Self {
        Self {
            reference_path: reference_path.into(),
        }
    }

    /// Render `log` to script text.
    ///
    /// `context_was_document` says whether a document had focus when the
    /// recording started.
    #[instrument(skip(self, log), fields(action_count = log.len()))]
    pub fn render(&self, log: &ActionLog, context_was_document: bool) -> String {
        let statements = compress(log, context_was_document);

        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = write_reference(&mut out, &self.reference_path);
        for statement in &statements {
            let _ = write!(out, "{statement}");
        }

        debug!(statement_count = statements.len(), "Macro rendered");

        out
    }
}

/// Compress `log` into the statements [`Synthesizer::render`] emits.
pub fn compress(log: &ActionLog, context_was_document: bool) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut in_document = context_was_document;
    let mut current_document: Option<&str> = None;
    let mut actions = log.actions().iter().peekable();

    while let Some(action) = actions.next() {
        match action {
            RecordedAction::Command {
                input_char: Some(first),
                ..
            } => {
                let mut text = String::new();
                push_valid(&mut text, *first);
                while let Some(next) = actions.next_if(|next| next.is_insert()) {
                    if let RecordedAction::Command {
                        input_char: Some(c),
                        ..
                    } = next
                    {
                        push_valid(&mut text, *c);
                    }
                }
                statements.push(Statement::InsertText(text));
            }
            RecordedAction::Command {
                command_group_id,
                command_id,
                command_name,
                input_char: None,
            } => {
                let mut count = 1;
                while actions
                    .next_if(|next| same_command(action, next))
                    .is_some()
                {
                    count += 1;
                }

                let target = if command_name.is_empty() {
                    CommandTarget::Dispatch {
                        group: *command_group_id,
                        id: *command_id,
                    }
                } else {
                    CommandTarget::Named(command_name.clone())
                };
                statements.push(Statement::Invoke { target, count });
            }
            RecordedAction::WindowActivation { caption, .. } => {
                statements.push(Statement::ActivateWindow(caption.clone()));
                in_document = false;
                current_document = None;
            }
            RecordedAction::DocumentActivation { path } => {
                if in_document && current_document == Some(path.as_str()) {
                    continue;
                }
                statements.push(Statement::OpenDocument(path.clone()));
                in_document = true;
                current_document = Some(path.as_str());
            }
        }
    }

    statements
}

fn push_valid(text: &mut String, c: char) {
    if is_valid_input(c) {
        text.push(c);
    }
}

/// Two non-insert commands merge when their names match, or, for unnamed
/// commands, when group and id both match.
fn same_command(current: &RecordedAction, next: &RecordedAction) -> bool {
    match (current, next) {
        (
            RecordedAction::Command {
                command_group_id: group_a,
                command_id: id_a,
                command_name: name_a,
                input_char: None,
            },
            RecordedAction::Command {
                command_group_id: group_b,
                command_id: id_b,
                command_name: name_b,
                input_char: None,
            },
        ) => {
            if name_a.is_empty() && name_b.is_empty() {
                group_a == group_b && id_a == id_b
            } else {
                name_a == name_b
            }
        }
        _ => false,
    }
}
