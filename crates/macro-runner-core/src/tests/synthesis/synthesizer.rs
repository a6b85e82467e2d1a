use crate::{
    ActionLog, CommandTarget, RecordedAction, Statement, Synthesizer, compress,
};

use uuid::Uuid;

fn typed(text: &str) -> Vec<RecordedAction> {
    text.chars().map(RecordedAction::typed).collect()
}

fn unnamed(group: Uuid, id: u32) -> RecordedAction {
    RecordedAction::Command {
        command_group_id: group,
        command_id: id,
        command_name: String::new(),
        input_char: None,
    }
}

fn document(path: &str) -> RecordedAction {
    RecordedAction::DocumentActivation {
        path: path.to_string(),
    }
}

/// WHAT: Five typed characters collapse into one insert statement
/// WHY: Typing is the most common action and must not emit one line per key
#[test]
fn given_five_typed_characters_when_rendering_then_one_insert_statement() {
    // Given: Log of "a".."e" typed in place
    let log: ActionLog = typed("abcde").into_iter().collect();

    // When: Rendering the log
    let script = Synthesizer::default().render(&log, true);

    // Then: Exactly one insert statement carrying all five characters
    assert_eq!(
        compress(&log, true),
        vec![Statement::InsertText("abcde".to_string())]
    );
    assert_eq!(script.matches("Selection.Text").count(), 1);
    assert!(script.contains(r#"dte.ActiveDocument.Selection.Text = "abcde";"#));
}

/// WHAT: A single typed character still emits an insert statement
/// WHY: Runs of length one are not special-cased away
#[test]
fn given_one_typed_character_when_compressing_then_single_character_insert() {
    // Given: Log with one typed character
    let log: ActionLog = typed("x").into_iter().collect();

    // When: Compressing
    let statements = compress(&log, true);

    // Then: One insert of that character
    assert_eq!(statements, vec![Statement::InsertText("x".to_string())]);
}

/// WHAT: Three identical named commands become one loop of three
/// WHY: Repeated navigation should read as a repeat count, not copy-paste
#[test]
fn given_three_line_downs_when_rendering_then_one_invocation_with_count_three() {
    // Given: Three Edit.LineDown commands
    let log: ActionLog = (0..3).map(|_| RecordedAction::named("Edit.LineDown")).collect();

    // When: Rendering
    let statements = compress(&log, true);
    let script = Synthesizer::default().render(&log, true);

    // Then: One invocation with repeat count 3
    assert_eq!(
        statements,
        vec![Statement::Invoke {
            target: CommandTarget::Named("Edit.LineDown".to_string()),
            count: 3,
        }]
    );
    assert!(script.contains("for (var i = 0; i < 3; i++) {"));
    assert_eq!(script.matches(r#"dte.ExecuteCommand("Edit.LineDown");"#).count(), 1);
}

/// WHAT: A lone command renders as a plain call
/// WHY: Count one must not produce a loop
#[test]
fn given_single_command_when_rendering_then_no_loop() {
    // Given: One Edit.SelectAll
    let log: ActionLog = [RecordedAction::named("Edit.SelectAll")].into_iter().collect();

    // When: Rendering
    let script = Synthesizer::default().render(&log, true);

    // Then: Plain invocation, no loop
    assert!(script.contains(r#"dte.ExecuteCommand("Edit.SelectAll");"#));
    assert!(!script.contains("for ("));
}

/// WHAT: Different commands between typing split the runs
/// WHY: Runs close as soon as a different kind of action appears
#[test]
fn given_typing_interrupted_by_command_when_compressing_then_three_statements() {
    // Given: "ab", a line break command, then "c"
    let mut actions = typed("ab");
    actions.push(RecordedAction::named("Edit.BreakLine"));
    actions.extend(typed("c"));
    let log: ActionLog = actions.into_iter().collect();

    // When: Compressing
    let statements = compress(&log, true);

    // Then: Insert, invoke, insert
    assert_eq!(
        statements,
        vec![
            Statement::InsertText("ab".to_string()),
            Statement::Invoke {
                target: CommandTarget::Named("Edit.BreakLine".to_string()),
                count: 1,
            },
            Statement::InsertText("c".to_string()),
        ]
    );
}

/// WHAT: Control characters are dropped from insert text
/// WHY: Only printable input belongs in generated string literals
#[test]
fn given_only_control_characters_when_compressing_then_empty_insert() {
    // Given: Typed bell and escape characters
    let log: ActionLog = typed("\u{7}\u{1b}").into_iter().collect();

    // When: Compressing
    let statements = compress(&log, true);

    // Then: The run still emits one insert, with empty text
    assert_eq!(statements, vec![Statement::InsertText(String::new())]);
}

/// WHAT: Activating the current document again emits nothing
/// WHY: A switch to the document already in focus is a no-op
#[test]
fn given_same_document_twice_when_compressing_then_one_switch() {
    // Given: The same document activated twice
    let log: ActionLog = [document("/src/a.cs"), document("/src/a.cs")]
        .into_iter()
        .collect();

    // When: Compressing
    let statements = compress(&log, true);

    // Then: One open statement
    assert_eq!(
        statements,
        vec![Statement::OpenDocument("/src/a.cs".to_string())]
    );
}

/// WHAT: Activating a different document emits a second switch
/// WHY: Each real context change must be replayed
#[test]
fn given_two_documents_when_compressing_then_two_switches() {
    // Given: Two different documents
    let log: ActionLog = [document("/src/a.cs"), document("/src/b.cs")]
        .into_iter()
        .collect();

    // When: Compressing
    let statements = compress(&log, true);

    // Then: Two open statements
    assert_eq!(statements.len(), 2);
}

/// WHAT: A tool window between two activations of one document keeps both
/// WHY: Focus left the document, so returning to it is a real switch
#[test]
fn given_window_between_same_document_when_compressing_then_document_reopened() {
    // Given: Document, tool window, same document
    let log: ActionLog = [
        document("/src/a.cs"),
        RecordedAction::WindowActivation {
            tool_window_id: Uuid::new_v4(),
            caption: "Output".to_string(),
        },
        document("/src/a.cs"),
    ]
    .into_iter()
    .collect();

    // When: Rendering
    let script = Synthesizer::default().render(&log, true);

    // Then: Both document switches and the window activation are present
    assert_eq!(script.matches("dte.ItemOperations.OpenFile").count(), 2);
    assert!(script.contains(r#"dte.Windows.Item("Output").Activate();"#));
}

/// WHAT: Unnamed commands merge only with the same group and id
/// WHY: Without a name, group and id are the command's identity
#[test]
fn given_unnamed_commands_when_compressing_then_merge_by_group_and_id() {
    // Given: Two equal unnamed commands followed by one with another id
    let group = Uuid::new_v4();
    let log: ActionLog = [unnamed(group, 7), unnamed(group, 7), unnamed(group, 8)]
        .into_iter()
        .collect();

    // When: Compressing and rendering
    let statements = compress(&log, true);
    let script = Synthesizer::default().render(&log, true);

    // Then: A count-2 dispatch followed by a single dispatch
    assert_eq!(
        statements,
        vec![
            Statement::Invoke {
                target: CommandTarget::Dispatch { group, id: 7 },
                count: 2,
            },
            Statement::Invoke {
                target: CommandTarget::Dispatch { group, id: 8 },
                count: 1,
            },
        ]
    );
    assert!(script.contains(&format!("cmdHelper.DispatchCommand(\"{}\", 8);", group.braced())));
}

/// WHAT: Quotes and backslashes in typed text are escaped
/// WHY: Generated scripts must stay syntactically valid
#[test]
fn given_quote_and_backslash_when_rendering_then_escaped_literal() {
    // Given: Typed text containing a quote and a backslash
    let log: ActionLog = typed(r#"a"\"#).into_iter().collect();

    // When: Rendering
    let script = Synthesizer::default().render(&log, true);

    // Then: Both are escaped
    assert!(script.contains(r#"Selection.Text = "a\"\\";"#));
}

/// WHAT: Output starts with the reference declaration and a blank line
/// WHY: Scripts need the automation surface binding to resolve `dte`
#[test]
fn given_custom_reference_when_rendering_then_declaration_first() {
    // Given: A synthesizer pointing at a custom declaration file
    let synthesizer = Synthesizer::new("types/dte.d.ts");
    let log = ActionLog::new();

    // When: Rendering an empty log
    let script = synthesizer.render(&log, false);

    // Then: Only the declaration is emitted
    assert_eq!(script, "/// <reference path=\"types/dte.d.ts\" />\n\n");
}

/// WHAT: Rendering the same log twice gives identical bytes
/// WHY: Saved macros must be reproducible
#[test]
fn given_mixed_log_when_rendering_twice_then_identical_output() {
    // Given: A log with every action kind
    let mut actions = typed("hi");
    actions.push(RecordedAction::named("Edit.LineDown"));
    actions.push(RecordedAction::named("Edit.LineDown"));
    actions.push(document("/tmp/x.txt"));
    actions.push(unnamed(Uuid::nil(), 3));
    let log: ActionLog = actions.into_iter().collect();
    let synthesizer = Synthesizer::default();

    // When: Rendering twice
    let first = synthesizer.render(&log, false);
    let second = synthesizer.render(&log, false);

    // Then: Byte-identical, and the log is untouched
    assert_eq!(first, second);
    assert_eq!(log.len(), 6);
}
