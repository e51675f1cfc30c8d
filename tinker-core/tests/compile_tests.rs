//! Compile-then-execute behaviour across both dialects

mod common;

use common::{execute, run};
use tinker_core::{compile, CompilerAdapter, CompilerOptions, Dialect};

/// Typed source and the hand-written untyped equivalent
const EQUIVALENT: &[(&str, &str)] = &[
    (
        "function add(a: number, b: number): number { return a + b; }\nconsole.log(add(1, 2));",
        "function add(a, b) { return a + b; }\nconsole.log(add(1, 2));",
    ),
    (
        "interface Point { x: number; y?: number }\nconst p: Point = { x: 1 };\nconsole.log(p.x, p.y ?? 0);",
        "const p = { x: 1 };\nconsole.log(p.x, p.y ?? 0);",
    ),
    (
        "type Shape = { kind: 'circle'; r: number } | { kind: 'square'; side: number };\n\
         function area(s: Shape): number { switch (s.kind) { case 'circle': return s.r * s.r; case 'square': return s.side * s.side; } }\n\
         console.log(area({ kind: 'square', side: 3 }));",
        "function area(s) { switch (s.kind) { case 'circle': return s.r * s.r; case 'square': return s.side * s.side; } }\n\
         console.log(area({ kind: 'square', side: 3 }));",
    ),
    (
        "const xs = [1, 2, 3].map((n: number) => n * 2);\nconsole.log(xs);",
        "const xs = [1, 2, 3].map((n) => n * 2);\nconsole.log(xs);",
    ),
    (
        "let total: number = 0;\nfor (const n of [1, 2, 3]) { total += n; }\nconsole.info('total', total);",
        "let total = 0;\nfor (const n of [1, 2, 3]) { total += n; }\nconsole.info('total', total);",
    ),
    (
        "try { JSON.parse('x'); } catch (e) { if (e instanceof Error) { console.warn(e.name); } }",
        "try { JSON.parse('x'); } catch (e) { if (e instanceof Error) { console.warn(e.name); } }",
    ),
    (
        "const p = new Promise<number>((resolve) => setTimeout(() => resolve(1), 1));\np.then((v) => console.log(v + 1));\nconsole.log('sync');",
        "const p = new Promise((resolve) => setTimeout(() => resolve(1), 1));\np.then((v) => console.log(v + 1));\nconsole.log('sync');",
    ),
    (
        "function f(x?: string): number { if (!x) { return 0; } return x.length; }\nconsole.log(f(), f('abc'));",
        "function f(x) { if (!x) { return 0; } return x.length; }\nconsole.log(f(), f('abc'));",
    ),
];

#[test]
fn test_compiled_typed_source_matches_untyped_equivalent() {
    for (typed, untyped) in EQUIVALENT {
        let compiled = run(typed, Dialect::Typed).unwrap_or_else(|d| panic!("{:?} failed: {}", typed, d));
        let expected = execute(untyped);
        assert!(!expected.entries().is_empty(), "{:?} logs nothing", untyped);
        assert_eq!(compiled.entries(), expected.entries(), "typed source: {:?}", typed);
    }
}

#[test]
fn test_type_error_blocks_execution() {
    let diagnostic = match run("console.log('never'); const x: number = \"bad\";", Dialect::Typed) {
        Ok(_) => panic!("type error should fail compilation"),
        Err(message) => message,
    };
    assert!(
        diagnostic.contains("Type 'string' is not assignable to type 'number'."),
        "{}",
        diagnostic
    );
}

#[test]
fn test_only_the_first_diagnostic_is_reported() {
    let diagnostic = run("const a: number = 'x';\nconst b: string = 1;", Dialect::Typed).err().unwrap_or_default();
    assert!(diagnostic.contains("at 1:7"), "{}", diagnostic);
    assert!(!diagnostic.contains("2:"), "{}", diagnostic);
}

#[test]
fn test_typed_syntax_errors_are_diagnostics() {
    let diagnostic = run("let = ;", Dialect::Typed).err().unwrap_or_default();
    assert!(diagnostic.starts_with("error TS"), "{}", diagnostic);
}

#[test]
fn test_untyped_syntax_errors_surface_at_execution() {
    let compiled = compile("let = ;", Dialect::Untyped).unwrap();
    assert_eq!(compiled.executable_text(), Some("let = ;"));
    let run = run("let = ;", Dialect::Untyped).unwrap();
    assert!(run.lines().is_empty());
    assert!(run.error().unwrap_or_default().starts_with("SyntaxError: "));
}

#[test]
fn test_untyped_accepts_what_the_checker_rejects() {
    let run = run("const x = 1; console.log(x.nope, undeclaredLater)", Dialect::Untyped).unwrap();
    assert_eq!(run.error().as_deref(), Some("undeclaredLater is not defined"));
}

#[test]
fn test_bare_expression_completion_value() {
    let run = run("1+1", Dialect::Typed).unwrap();
    assert!(run.result.has_value);
    assert_eq!(run.result.value.as_ref().and_then(|v| v.as_number()), Some(2.0));
    assert!(run.lines().is_empty());
}

#[test]
fn test_nested_generic_annotations_erase_cleanly() {
    let source = "let arr: Array<Array<number>> = [[1]]; arr";
    let compiled = compile(source, Dialect::Typed).unwrap();
    assert_eq!(compiled.executable_text(), Some("let arr = [[1]]; arr"));
    let run = run(source, Dialect::Typed).unwrap();
    assert!(run.result.has_value);
    assert!(run.error().is_none());
}

#[test]
fn test_runaway_nesting_is_a_syntax_error() {
    let source = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
    let diagnostic = run(&source, Dialect::Typed).err().unwrap_or_default();
    assert!(diagnostic.starts_with("error TS1128"), "{}", diagnostic);
    assert!(diagnostic.contains("Expression is nested too deeply."), "{}", diagnostic);

    let run = run(&source, Dialect::Untyped).unwrap();
    let error = run.error().unwrap_or_default();
    assert!(error.starts_with("SyntaxError: Expression is nested too deeply."), "{}", error);
}

#[test]
fn test_adapter_reuses_one_backend() {
    let adapter = CompilerAdapter::load(&CompilerOptions::default()).unwrap();
    assert_eq!(adapter.backend_name(), "type-stripper");
    let first = adapter.compile("const n: number = 1;\nn", Dialect::Typed);
    let second = adapter.compile("const n: number = 1;\nn", Dialect::Typed);
    assert_eq!(first, second);
    assert_eq!(first.executable_text(), Some("const n = 1;\nn"));
}
