//! Console capability and value rendering, end to end

mod common;

use common::{execute, logs};
use tinker_output::OutputLevel;

#[test]
fn test_console_levels() {
    let run = execute("console.log('a'); console.info('b'); console.warn('c'); console.error('d');");
    assert_eq!(
        run.entries(),
        vec![
            (OutputLevel::Log, "a".to_string()),
            (OutputLevel::Info, "b".to_string()),
            (OutputLevel::Warn, "c".to_string()),
            (OutputLevel::Error, "d".to_string()),
        ]
    );
}

#[test]
fn test_values_render_independently_and_space_joined() {
    assert_eq!(logs("console.log('x', 1, true, null, undefined)"), vec!["x 1 true null undefined"]);
    assert_eq!(logs("console.log()"), vec![""]);
    assert_eq!(logs("console.log('a', [1, 2])"), vec!["a [\n  1,\n  2\n]"]);
}

#[test]
fn test_structured_values_use_indented_serialization() {
    assert_eq!(
        logs("console.log({ name: 'tinker', tags: ['a'], nested: { ok: true } })"),
        vec!["{\n  \"name\": \"tinker\",\n  \"tags\": [\n    \"a\"\n  ],\n  \"nested\": {\n    \"ok\": true\n  }\n}"]
    );
    assert_eq!(logs("console.log({})"), vec!["{}"]);
    assert_eq!(logs("console.log([undefined, () => 1])"), vec!["[\n  null,\n  null\n]"]);
}

#[test]
fn test_cyclic_structures_fall_back_to_plain_conversion() {
    assert_eq!(
        logs("const o = { a: 1 }; o.self = o; console.log(o); console.log('after')"),
        vec!["[object Object]", "after"]
    );
    assert_eq!(logs("const a = [1]; a.push(a); console.log(a)"), vec!["1,"]);
}

#[test]
fn test_deeply_nested_values_do_not_crash_the_run() {
    let source = "let a = []; for (let i = 0; i < 100000; i++) { a = [a]; }\n\
                  try { JSON.stringify(a); } catch (e) { console.log(e.name, e instanceof RangeError); }\n\
                  console.log(a); console.log('after');";
    assert_eq!(logs(source), vec!["RangeError true", "", "after"]);
}

#[test]
fn test_functions_render_as_source_text() {
    assert_eq!(
        logs("console.log((a, b) => a + b, function named() { return 1; })"),
        vec!["(a, b) => a + b function named() { return 1; }"]
    );
    assert_eq!(logs("console.log(Math.max)"), vec!["function max() { [native code] }"]);
}

#[test]
fn test_error_values_render_as_empty_structures() {
    assert_eq!(logs("console.log(new Error('hidden'))"), vec!["{}"]);
    assert_eq!(logs("console.log(String(new Error('shown')))"), vec!["Error: shown"]);
}

#[test]
fn test_numbers_use_script_formatting() {
    assert_eq!(
        logs("console.log(0.5, -0, 1e21, 2 ** 53, 1 / 3, NaN)"),
        vec!["0.5 0 1e+21 9007199254740992 0.3333333333333333 NaN"]
    );
    assert_eq!(logs("console.log([1e21, 0.1])"), vec!["[\n  1e+21,\n  0.1\n]"]);
}

#[test]
fn test_console_clear_discards_earlier_entries() {
    assert_eq!(
        logs("console.log('gone'); console.clear(); console.log('kept')"),
        vec!["kept"]
    );
}

#[test]
fn test_output_before_a_throw_is_kept() {
    let run = execute("console.log('before'); throw new Error('boom'); console.log('after');");
    assert_eq!(run.lines(), vec!["before"]);
    assert_eq!(run.error().as_deref(), Some("boom"));
    assert!(!run.result.has_value);
}

#[test]
fn test_host_globals_are_not_exposed() {
    for name in ["process", "require", "window", "document", "globalThis"] {
        let run = execute(&format!("typeof {}", name));
        let value = run.result.value.expect("typeof yields a string");
        assert_eq!(value.as_str(), Some("undefined"), "{} leaked", name);
    }
}
