use js::{JsError, RuntimeError, Value, Vm, VmConfig};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn eval(source: &str) -> Value {
    init_logging();
    let mut vm = Vm::new();
    match vm.interpret(source) {
        Ok(value) => value,
        Err(err) => panic!("script failed: {err}\n{source}"),
    }
}

#[test]
fn function_computes_and_returns() {
    let value = eval("function f() { var x = 1 + 2; return x; } return f();");
    assert_eq!(value, Value::Number(3.0));
}

#[test]
fn catch_binds_the_thrown_value_and_execution_continues() {
    let value = eval(
        "var seen;
         try { throw 'boom'; seen = 'unreached'; } catch (e) { seen = e; }
         seen = seen + '!';
         return seen;",
    );
    assert_eq!(value, Value::from("boom!"));
}

#[test]
fn finally_runs_and_the_error_keeps_propagating() {
    let value = eval(
        "var log = [];
         function f() { try { throw new Error('x'); } finally { log.push('f'); } }
         try { f(); } catch (e) { log.push(e.message); }
         return log.join();",
    );
    assert_eq!(value, Value::from("f,x"));
}

#[test]
fn error_thrown_from_catch_still_runs_finally() {
    let value = eval(
        "var log = [];
         try {
           try { throw 1; } catch (e) { log.push('c' + e); throw 2; } finally { log.push('f'); }
         } catch (e) { log.push(e); }
         return log.join();",
    );
    assert_eq!(value, Value::from("c1,f,2"));
}

#[test]
fn exceptions_unwind_through_frames() {
    let value = eval(
        "function inner() { throw new TypeError('deep'); }
         function middle() { inner(); return 'no'; }
         try { middle(); } catch (e) { return e.name + ':' + e.message; }",
    );
    assert_eq!(value, Value::from("TypeError:deep"));
}

#[test]
fn reference_errors_are_catchable() {
    let value = eval(
        "try { missing; } catch (e) {
           return e instanceof ReferenceError && e.message == 'missing is not defined';
         }",
    );
    assert_eq!(value, Value::Bool(true));
}

#[test]
fn uncaught_errors_surface_to_the_host() {
    init_logging();
    let mut vm = Vm::new();
    let err = vm.interpret("nope();").unwrap_err();
    assert_eq!(
        err,
        JsError::Runtime(RuntimeError::Uncaught(
            "ReferenceError: nope is not defined".into()
        ))
    );
    let err = vm.interpret("var x = 1; x();").unwrap_err();
    assert!(
        matches!(&err, JsError::Runtime(RuntimeError::Uncaught(m)) if m.starts_with("TypeError")),
        "unexpected: {err:?}"
    );
}

#[test]
fn syntax_errors_are_reported_before_running() {
    let mut vm = Vm::new();
    let err = vm.interpret("print('ran'); var = ;").unwrap_err();
    assert!(matches!(err, JsError::Syntax(ref errors) if !errors.is_empty()), "{err:?}");
    assert!(vm.take_console().is_empty());
}

#[test]
fn closures_keep_private_state() {
    let value = eval(
        "function counter() { var n = 0; return function() { n = n + 1; return n; }; }
         var a = counter();
         var b = counter();
         a(); a(); b();
         return a() * 10 + b();",
    );
    assert_eq!(value, Value::Number(32.0));
}

#[test]
fn closures_share_a_captured_variable() {
    let value = eval(
        "function pair() {
           var n = 0;
           return [function() { n = n + 1; }, function() { return n; }];
         }
         var p = pair();
         p[0](); p[0]();
         return p[1]();",
    );
    assert_eq!(value, Value::Number(2.0));
}

#[test]
fn nested_declarations_capture_earlier_locals() {
    let value = eval(
        "function f() { var x = 5; function g() { return x; } return g(); }
         return f();",
    );
    assert_eq!(value, Value::Number(5.0));
}

#[test]
fn nested_declarations_see_locals_declared_after_them() {
    let value = eval(
        "function f() {
           var before = g();
           var x = 1;
           function g() { return typeof x; }
           return before + ':' + g();
         }
         function h() { function get() { return n; } var n = 1; n = n + 1; return get(); }
         return f() + ':' + h();",
    );
    assert_eq!(value, Value::from("undefined:number:2"));
}

#[test]
fn redeclaring_a_var_without_a_value_keeps_it() {
    let value = eval("function f(a) { var a; var b = a; var b; return b; } return f(7);");
    assert_eq!(value, Value::Number(7.0));
}

#[test]
fn constructors_prototypes_and_instanceof() {
    let value = eval(
        "function Point(x, y) { this.x = x; this.y = y; }
         Point.prototype.sum = function() { return this.x + this.y; };
         var p = new Point(1, 2);
         return p.sum() + (p instanceof Point ? 10 : 0) + (p instanceof Array ? 100 : 0);",
    );
    assert_eq!(value, Value::Number(13.0));
}

#[test]
fn arrow_functions_use_the_enclosing_this() {
    let value = eval(
        "var o = { v: 5, f: function() { var g = () => this.v; return g(); } };
         return o.f();",
    );
    assert_eq!(value, Value::Number(5.0));
}

#[test]
fn missing_arguments_are_undefined_and_extra_ones_dropped() {
    let value = eval(
        "function f(a, b) { return typeof b; }
         function g(a) { return a; }
         return f(1) + g(2, 3, 4);",
    );
    assert_eq!(value, Value::from("undefined2"));
}

#[test]
fn loops_and_logical_operators() {
    let value = eval(
        "var total = 0;
         for (let i = 0; i < 10; i++) { if (i % 2 == 0 || i == 9) total += i; }
         var j = 0;
         while (j < 3) j++;
         return total + j + (null || 'x').length + (0 && 1);",
    );
    assert_eq!(value, Value::Number(33.0));
}

#[test]
fn runaway_recursion_is_a_stack_overflow() {
    init_logging();
    let mut vm = Vm::new();
    let err = vm.interpret("function f() { return f(); } f();").unwrap_err();
    assert_eq!(err, JsError::Runtime(RuntimeError::StackOverflow));
    assert_eq!(vm.interpret("return 1;").expect("still usable"), Value::Number(1.0));
}

#[test]
fn recursion_through_natives_is_bounded_too() {
    init_logging();
    let mut vm = Vm::with_config(VmConfig {
        max_frames: 64,
        ..VmConfig::default()
    });
    let source = "function f() { try { return f.call(null); } catch (e) { return 'caught'; } } f();";
    let err = vm.interpret(source).unwrap_err();
    assert_eq!(err, JsError::Runtime(RuntimeError::StackOverflow));
}

#[test]
fn host_natives_and_calls() {
    init_logging();
    let mut vm = Vm::new();
    vm.define_native("twice", |vm, _this, args| {
        let f = args.first().cloned().unwrap_or_default();
        vm.call(&f, &Value::Undefined, &[])?;
        vm.call(&f, &Value::Undefined, &[])
    });
    let value = vm
        .interpret("var n = 0; twice(function() { n++; }); return n;")
        .expect("runs");
    assert_eq!(value, Value::Number(2.0));

    let value = vm
        .interpret("try { twice(function() { throw 'inner'; }); } catch (e) { return e; }")
        .expect("runs");
    assert_eq!(value, Value::from("inner"));

    let f = vm.global("n").expect("global n");
    assert_eq!(f, Value::Number(2.0));
}
