use std::fmt::{self, Write};

use uuid::Uuid;

/// Name of the automation root the generated script talks to.
pub const AUTOMATION_ROOT: &str = "dte";

/// Name of the helper object used to dispatch commands that have no name.
pub const COMMAND_HELPER: &str = "cmdHelper";

const INDENT: &str = "    ";

/// How a compressed command is addressed in the generated script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTarget {
    /// Canonical command name, e.g. `Edit.LineDown`.
    Named(String),
    /// Group and id for commands the host could not name.
    Dispatch {
        /// Command group.
        group: Uuid,
        /// Command id within the group.
        id: u32,
    },
}

/// One statement of a generated macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Insert literal text at the caret.
    InsertText(String),
    /// Invoke a command `count` times.
    Invoke {
        /// Command to run.
        target: CommandTarget,
        /// Repeat count; 1 renders as a plain call.
        count: usize,
    },
    /// Activate a tool window by caption.
    ActivateWindow(String),
    /// Open, or bring to front, a document.
    OpenDocument(String),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::InsertText(text) => writeln!(
                f,
                "{AUTOMATION_ROOT}.ActiveDocument.Selection.Text = {};",
                literal(text)
            ),
            Statement::Invoke { target, count } if *count > 1 => {
                writeln!(f, "for (var i = 0; i < {count}; i++) {{")?;
                f.write_str(INDENT)?;
                write_call(f, target)?;
                f.write_str("}\n")
            }
            Statement::Invoke { target, .. } => write_call(f, target),
            Statement::ActivateWindow(caption) => writeln!(
                f,
                "{AUTOMATION_ROOT}.Windows.Item({}).Activate();",
                literal(caption)
            ),
            Statement::OpenDocument(path) => writeln!(
                f,
                "{AUTOMATION_ROOT}.ItemOperations.OpenFile({});",
                literal(path)
            ),
        }
    }
}

fn write_call(f: &mut fmt::Formatter<'_>, target: &CommandTarget) -> fmt::Result {
    match target {
        CommandTarget::Named(name) => {
            writeln!(f, "{AUTOMATION_ROOT}.ExecuteCommand({});", literal(name))
        }
        CommandTarget::Dispatch { group, id } => writeln!(
            f,
            "{COMMAND_HELPER}.DispatchCommand({}, {id});",
            literal(&group.braced().to_string())
        ),
    }
}

/// Quote `text` as a script string literal. JSON string escaping is valid in
/// the script dialect.
pub(crate) fn literal(text: &str) -> String {
    serde_json::Value::String(text.to_owned()).to_string()
}

/// Render the fixed reference declaration that precedes every script.
pub(crate) fn write_reference(out: &mut String, reference_path: &str) -> fmt::Result {
    writeln!(out, "/// <reference path={} />", literal(reference_path))?;
    out.push('\n');
    Ok(())
}
