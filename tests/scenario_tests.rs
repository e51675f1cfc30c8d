//! End-to-end playground scenarios

mod common;

use common::Playground;
use tinker_workspace::api::{is_pristine, EditorSurface, RunState, SessionRecord};
use tinker_workspace::output::OutputLevel;
use tinker_workspace::store::{KeyValueStore, MemoryStore};
use tinker_workspace::Dialect;

#[test]
fn test_untyped_console_log() {
    let mut playground = Playground::new();
    let outcome = playground.run("console.log(\"hi\")", Dialect::Untyped);
    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(playground.entries(), vec![(OutputLevel::Log, "hi".to_string())]);
}

#[test]
fn test_typed_type_error_blocks_execution() {
    let mut playground = Playground::new();
    let outcome = playground.run("const x: number = \"bad\"; console.log('ran')", Dialect::Typed);
    assert_eq!(outcome.state, RunState::CompileFailed);
    assert_eq!(
        playground.entries(),
        vec![(
            OutputLevel::Error,
            "Compilation error: error TS2322 at 1:7: Type 'string' is not assignable to type 'number'.".to_string()
        )]
    );
}

#[test]
fn test_typed_expression_result() {
    let mut playground = Playground::new();
    let outcome = playground.run("1+1", Dialect::Typed);
    assert!(outcome.has_result);
    assert_eq!(playground.entries(), vec![(OutputLevel::Result, "→ 2".to_string())]);
}

#[test]
fn test_thrown_error_has_no_result() {
    let mut playground = Playground::new();
    let outcome = playground.run("throw new Error(\"boom\")", Dialect::Untyped);
    assert_eq!(outcome.state, RunState::Threw);
    let entries = playground.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, OutputLevel::Error);
    assert!(entries[0].1.contains("boom"), "{}", entries[0].1);
    assert!(playground.context.sink().entries_at(OutputLevel::Result).is_empty());
}

#[test]
fn test_clear_is_idempotent() {
    let mut playground = Playground::new();
    playground.run("console.log(1); console.warn(2)", Dialect::Untyped);
    assert_eq!(playground.context.sink().len(), 2);
    playground.context.clear_output();
    playground.context.clear_output();
    assert!(playground.context.sink().is_empty());
}

#[test]
fn test_same_program_same_output() {
    let source = "const xs = [3, 1, 2].sort(); console.log(xs); console.info({ n: xs.length }); xs.join('-')";
    let mut first = Playground::new();
    first.run(source, Dialect::Untyped);
    let expected = first.entries();
    drop(first);

    let mut second = Playground::new();
    second.run(source, Dialect::Untyped);
    assert_eq!(second.entries(), expected);
    assert_eq!(expected.last(), Some(&(OutputLevel::Result, "→ 1-2-3".to_string())));
}

#[test]
fn test_switch_swaps_only_pristine_buffers() {
    let mut playground = Playground::new();
    assert!(is_pristine(&playground.editor.get_value()));
    assert!(playground.context.switch_dialect(Dialect::Untyped));

    playground.editor.type_text("let mine = 1;");
    assert!(!playground.context.switch_dialect(Dialect::Typed));
    assert_eq!(playground.editor.get_value(), "let mine = 1;");
    assert_eq!(
        playground.entries(),
        vec![(OutputLevel::Info, "Switched to TypeScript".to_string())]
    );
}

#[test]
fn test_save_then_load_restores_session() {
    let store = MemoryStore::new();
    {
        let mut playground = Playground::with_store(store.clone());
        playground.run("console.log('kept')", Dialect::Untyped);
    }
    let saved: SessionRecord = serde_json::from_str(&store.get("tinker.session").unwrap().unwrap()).unwrap();
    assert_eq!(saved.dialect, Dialect::Untyped);

    let mut playground = Playground::with_store(store);
    assert_eq!(playground.context.dialect(), Dialect::Untyped);
    assert_eq!(playground.editor.get_value(), "console.log('kept')");
    playground.context.run();
    assert_eq!(playground.entries(), vec![(OutputLevel::Log, "kept".to_string())]);
}
