use super::*;
use crate::compiler::parser::{parse_program, Syntax};
use crate::runtime::event_loop::{UncaughtError, UncaughtKind};
use std::cell::RefCell;

fn interpreter() -> Interpreter {
    Interpreter::new(SandboxLimits::default())
}

fn run_in(interp: &mut Interpreter, scope: &Rc<Scope>, source: &str) -> ScriptResult<Option<Value>> {
    let program = parse_program(source, Syntax::Untyped).expect("test source parses");
    interp.run_program(&program, scope)
}

/// String form of the completion value
fn eval(source: &str) -> String {
    let mut interp = interpreter();
    let scope = interp.run_scope();
    match run_in(&mut interp, &scope, source) {
        Ok(value) => to_string(&value.unwrap_or_default()).to_string(),
        Err(thrown) => panic!("unexpected throw: {}", thrown.describe()),
    }
}

/// `Name: message` of the value the source throws
fn thrown(source: &str) -> String {
    let mut interp = interpreter();
    let scope = interp.run_scope();
    match run_in(&mut interp, &scope, source) {
        Ok(value) => panic!("expected a throw, got {:?}", value),
        Err(thrown) => thrown.describe(),
    }
}

#[test]
fn test_arithmetic_and_number_formatting() {
    assert_eq!(eval("1 + 2 * 3"), "7");
    assert_eq!(eval("0.1 + 0.2"), "0.30000000000000004");
    assert_eq!(eval("7 % 3 + 2 ** 3"), "9");
    assert_eq!(eval("1 / 0"), "Infinity");
    assert_eq!(eval("'3' * '4'"), "12");
    assert_eq!(eval("'a' + 1 + 2"), "a12");
}

#[test]
fn test_completion_value_is_last_expression_statement() {
    let mut interp = interpreter();
    let scope = interp.run_scope();
    let value = run_in(&mut interp, &scope, "1; 2; let x = 3;").unwrap();
    assert_eq!(value.and_then(|v| v.as_number()), Some(2.0));
    let value = run_in(&mut interp, &scope, "function f() { return 1; }").unwrap();
    assert!(value.is_none());
}

#[test]
fn test_closures_capture_bindings() {
    let source = "
        function counter() {
            let n = 0;
            return () => ++n;
        }
        const next = counter();
        next(); next();
        next()
    ";
    assert_eq!(eval(source), "3");
}

#[test]
fn test_for_loop_gives_each_iteration_its_own_binding() {
    let source = "
        const fns = [];
        for (let i = 0; i < 3; i++) { fns.push(() => i); }
        fns.map(f => f()).join(',')
    ";
    assert_eq!(eval(source), "0,1,2");
}

#[test]
fn test_destructuring_defaults_and_rest() {
    let source = "
        const { a, b = 5, ...rest } = { a: 1, c: 3, d: 4 };
        const [x, , y = 9, ...more] = [10, 20, undefined, 40, 50];
        [a, b, JSON.stringify(rest), x, y, more.join('|')].join(' ')
    ";
    assert_eq!(eval(source), "1 5 {\"c\":3,\"d\":4} 10 9 40|50");
}

#[test]
fn test_spread_in_calls_arrays_and_objects() {
    assert_eq!(eval("Math.max(...[1, 7, 3])"), "7");
    assert_eq!(eval("[0, ...[1, 2], 3].length"), "4");
    assert_eq!(eval("JSON.stringify({ ...{ a: 1 }, b: 2, a: 3 })"), "{\"a\":3,\"b\":2}");
}

#[test]
fn test_control_flow() {
    let source = "
        let out = [];
        for (const n of [1, 2, 3, 4, 5, 6]) {
            if (n === 2) continue;
            if (n === 5) break;
            out.push(n);
        }
        let i = 0;
        do { i++; } while (i < 3);
        out.push(i);
        switch (2) {
            case 1: out.push('one');
            case 2: out.push('two');
            case 3: out.push('three'); break;
            default: out.push('default');
        }
        out.join(',')
    ";
    assert_eq!(eval(source), "1,3,4,3,two,three");
}

#[test]
fn test_for_in_walks_own_keys_in_order() {
    assert_eq!(
        eval("const keys = []; for (const k in { b: 1, 2: 0, a: 2, 1: 0 }) keys.push(k); keys.join()"),
        "1,2,b,a"
    );
}

#[test]
fn test_try_catch_finally() {
    let source = "
        const log = [];
        function f() {
            try {
                throw new TypeError('bad');
            } catch (e) {
                log.push(e.name + ':' + e.message);
                return 'caught';
            } finally {
                log.push('finally');
            }
        }
        log.push(f());
        log.join(' ')
    ";
    assert_eq!(eval(source), "TypeError:bad finally caught");
}

#[test]
fn test_optional_chaining_and_nullish() {
    assert_eq!(eval("const o = null; o?.a.b.c"), "undefined");
    assert_eq!(eval("const o = { f: null }; o.f?.()"), "undefined");
    assert_eq!(eval("null ?? 'fallback'"), "fallback");
    assert_eq!(eval("0 ?? 'fallback'"), "0");
    assert_eq!(eval("let a = null; a ??= 4; a ||= 9; a &&= a + 1; a"), "5");
}

#[test]
fn test_typeof_and_instanceof() {
    assert_eq!(eval("typeof notDeclared"), "undefined");
    assert_eq!(eval("typeof null"), "object");
    assert_eq!(eval("typeof (() => 1)"), "function");
    assert_eq!(eval("new RangeError('x') instanceof Error"), "true");
    assert_eq!(eval("[] instanceof Array"), "true");
    assert_eq!(eval("function P() {} new P() instanceof P"), "true");
}

#[test]
fn test_reference_errors() {
    assert_eq!(thrown("missing + 1"), "ReferenceError: missing is not defined");
    assert_eq!(thrown("y = 1"), "ReferenceError: y is not defined");
    assert_eq!(
        thrown("z; let z = 1;"),
        "ReferenceError: Cannot access 'z' before initialization"
    );
}

#[test]
fn test_type_errors() {
    assert_eq!(thrown("const c = 1; c = 2;"), "TypeError: Assignment to constant variable.");
    assert_eq!(
        thrown("const u = undefined; u.a"),
        "TypeError: Cannot read properties of undefined (reading 'a')"
    );
    assert_eq!(thrown("const foo = 1; foo()"), "TypeError: foo is not a function");
    assert_eq!(thrown("const o = {}; o.run()"), "TypeError: o.run is not a function");
    assert_eq!(thrown("new Math.max()"), "TypeError: max is not a constructor");
}

#[test]
fn test_call_depth_guard_throws_catchable_range_error() {
    let mut interp = Interpreter::new(SandboxLimits { max_call_depth: 20 });
    let scope = interp.run_scope();
    let source = "
        function down(n) { return down(n + 1); }
        let caught;
        try { down(0); } catch (e) { caught = e instanceof RangeError && e.message; }
        caught
    ";
    let value = run_in(&mut interp, &scope, source).unwrap().unwrap_or_default();
    assert_eq!(to_string(&value).as_ref(), "Maximum call stack size exceeded");
    // the guard resets after unwinding
    let value = run_in(&mut interp, &scope, "(function f(n) { return n ? f(n - 1) : 'ok'; })(5)").unwrap();
    assert_eq!(value.as_ref().and_then(|v| v.as_str()), Some("ok"));
}

#[test]
fn test_default_call_depth_fits_a_small_thread() {
    let handle = std::thread::Builder::new()
        .stack_size(512 * 1024)
        .spawn(|| {
            let recurse = "function f(n) { return n == 0 ? 0 : 1 + f(n - 1); }";
            let within = eval(&format!("{} f(200)", recurse));
            let beyond = thrown(&format!("{} f(100000)", recurse));
            (within, beyond)
        })
        .unwrap();
    let (within, beyond) = handle.join().unwrap();
    assert_eq!(within, "200");
    assert_eq!(beyond, "RangeError: Maximum call stack size exceeded");
}

#[test]
fn test_array_methods() {
    assert_eq!(eval("[1, 2, 3, 4].filter(n => n % 2).map(n => n * 10).join()"), "10,30");
    assert_eq!(eval("[1, 2, 3].reduce((a, b) => a + b, 0)"), "6");
    assert_eq!(eval("[10, 9, 1].sort().join()"), "1,10,9");
    assert_eq!(eval("[10, 9, 1].sort((a, b) => a - b).join()"), "1,9,10");
    assert_eq!(eval("[1, [2, [3, [4]]]].flat(2).length"), "4");
    assert_eq!(eval("const a = [1, 2, 3, 4]; a.splice(1, 2, 'x'); a.join()"), "1,x,4");
    assert_eq!(eval("[1, 2, 3].at(-1)"), "3");
    assert_eq!(eval("[NaN].includes(NaN)"), "true");
    assert_eq!(eval("[NaN].indexOf(NaN)"), "-1");
    assert_eq!(
        thrown("[].reduce((a, b) => a + b)"),
        "TypeError: Reduce of empty array with no initial value"
    );
}

#[test]
fn test_string_methods() {
    assert_eq!(eval("'Hello'.toUpperCase() + 'World'.slice(-3)"), "HELLOrld");
    assert_eq!(eval("'a-b-c'.split('-').reverse().join('+')"), "c+b+a");
    assert_eq!(eval("'5'.padStart(3, '0')"), "005");
    assert_eq!(eval("'  trim me '.trim()"), "trim me");
    assert_eq!(eval("'aaa'.replace('a', 'b') + 'aaa'.replaceAll('a', 'c')"), "baaccc");
    assert_eq!(eval("'abc'[1] + 'abc'.length"), "b3");
    assert_eq!(eval("`sum: ${1 + 1}`"), "sum: 2");
    assert_eq!(thrown("'x'.repeat(-1)"), "RangeError: Invalid count value: -1");
}

#[test]
fn test_object_and_json_builtins() {
    assert_eq!(eval("Object.keys({ b: 1, a: 2, 1: 3 }).join()"), "1,b,a");
    assert_eq!(eval("Object.entries({ a: 1 })[0].join('=')"), "a=1");
    assert_eq!(
        eval("JSON.stringify({ a: [1, 'two', null], f() {}, u: undefined })"),
        "{\"a\":[1,\"two\",null]}"
    );
    assert_eq!(eval("JSON.parse('{\"x\": [1, 2]}').x[1]"), "2");
    assert_eq!(
        thrown("const o = {}; o.self = o; JSON.stringify(o)"),
        "TypeError: Converting circular structure to JSON"
    );
    assert_eq!(eval("const f = Object.freeze({ a: 1 }); f.a = 2; f.a"), "1");
}

#[test]
fn test_number_builtins() {
    assert_eq!(eval("(1.005).toFixed(2)"), "1.00");
    assert_eq!(eval("(2.5).toFixed(0)"), "3");
    assert_eq!(eval("(255).toString(16)"), "ff");
    assert_eq!(eval("parseInt('42px') + parseFloat('0.5kg')"), "42.5");
    assert_eq!(eval("Number('') + Number(' 12 ')"), "12");
    assert_eq!(eval("isNaN('abc') && !Number.isNaN('abc')"), "true");
    assert_eq!(eval("String(null) + String([1, [2, 3]])"), "null1,2,3");
}

#[test]
fn test_error_objects() {
    assert_eq!(eval("String(new Error('boom'))"), "Error: boom");
    assert_eq!(eval("Error('plain call').message"), "plain call");
    assert_eq!(eval("Object.keys(new Error('hidden')).length"), "0");
    assert_eq!(eval("new TypeError('t').stack.split('\\n')[0]"), "TypeError: t");
}

#[test]
fn test_function_names_and_lengths() {
    assert_eq!(eval("const named = function () {}; named.name"), "named");
    assert_eq!(eval("const o = { m: () => 1 }; o.m.name"), "m");
    assert_eq!(eval("((a, b = 1, ...c) => 0).length"), "1");
    assert_eq!(eval("Math.max.name"), "max");
}

#[test]
fn test_event_loop_ordering() {
    let mut interp = interpreter();
    let scope = interp.run_scope();
    let source = "
        var order = [];
        setTimeout(() => order.push('timeout'), 0);
        Promise.resolve(1).then(v => order.push('then ' + v));
        queueMicrotask(() => order.push('microtask'));
        new Promise(resolve => { order.push('executor'); resolve(); });
        order.push('sync');
    ";
    run_in(&mut interp, &scope, source).unwrap();
    interp.run_until_idle();
    let value = run_in(&mut interp, &scope, "order.join(', ')").unwrap().unwrap_or_default();
    assert_eq!(
        to_string(&value).as_ref(),
        "executor, sync, then 1, microtask, timeout"
    );
}

#[test]
fn test_promise_combinators() {
    let mut interp = interpreter();
    let scope = interp.run_scope();
    let source = "
        var results = [];
        Promise.all([1, Promise.resolve(2), new Promise(r => setTimeout(() => r(3), 1))])
            .then(values => results.push(values.join('+')));
        Promise.race([new Promise(r => setTimeout(() => r('slow'), 5)), 'fast'])
            .then(v => results.push(v));
        Promise.reject(new Error('nope'))
            .catch(e => e.message)
            .finally(() => results.push('finally'))
            .then(v => results.push(v));
    ";
    run_in(&mut interp, &scope, source).unwrap();
    interp.run_until_idle();
    let value = run_in(&mut interp, &scope, "results.join(' ')").unwrap().unwrap_or_default();
    assert_eq!(to_string(&value).as_ref(), "fast finally nope 1+2+3");
}

#[test]
fn test_clear_timeout_cancels() {
    let mut interp = interpreter();
    let scope = interp.run_scope();
    run_in(
        &mut interp,
        &scope,
        "var fired = false; const id = setTimeout(() => { fired = true; }, 0); clearTimeout(id);",
    )
    .unwrap();
    interp.run_until_idle();
    let value = run_in(&mut interp, &scope, "fired").unwrap();
    assert_eq!(value.map(|v| v.truthy()), Some(false));
}

#[test]
fn test_deferred_failures_go_to_the_reporter() {
    let mut interp = interpreter();
    let reported: Rc<RefCell<Vec<UncaughtError>>> = Rc::default();
    let sink = reported.clone();
    interp
        .event_loop()
        .set_reporter(Rc::new(move |err: &UncaughtError| sink.borrow_mut().push(err.clone())));
    interp.event_loop().set_current_run(7);
    let scope = interp.run_scope();
    let source = "
        setTimeout(() => { throw new Error('late'); }, 0);
        Promise.reject(new Error('ignored'));
        Promise.reject(new Error('handled')).catch(() => {});
    ";
    run_in(&mut interp, &scope, source).unwrap();
    interp.run_until_idle();
    let reported = reported.borrow();
    assert_eq!(reported.len(), 2);
    assert!(reported.iter().all(|e| e.run_id == 7));
    assert!(reported
        .iter()
        .any(|e| e.kind == UncaughtKind::Rejection && e.to_string() == "Uncaught (in promise) Error: ignored"));
    assert!(reported
        .iter()
        .any(|e| e.kind == UncaughtKind::Exception && e.to_string() == "Uncaught Error: late"));
}

#[test]
fn test_realm_is_shared_but_run_scopes_are_not() {
    let mut interp = interpreter();
    let first = interp.run_scope();
    run_in(&mut interp, &first, "const local = 1;").unwrap();
    let second = interp.run_scope();
    assert_eq!(
        run_in(&mut interp, &second, "local").unwrap_err().describe(),
        "ReferenceError: local is not defined"
    );
    assert!(interp.realm().global("Math").is_some());
}
