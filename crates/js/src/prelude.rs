//! Built-in globals: console output, `Object`, `Array`, `String`, the Error
//! constructors, `Date`, `Math` and `Function.prototype.call`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::heap::{HeapRef, ObjectKind};
use crate::runtime::Prototypes;
use crate::value::Value;
use crate::vm::{Vm, error_string};

type NativeResult = Result<Value, Value>;

pub(crate) fn install(vm: &mut Vm) {
    vm.define_global("undefined", Value::Undefined);
    vm.define_global("NaN", Value::Number(f64::NAN));
    vm.define_global("Infinity", Value::Number(f64::INFINITY));

    init_console(vm);
    init_object(vm);
    init_function(vm);
    init_array(vm);
    init_string(vm);
    init_error(vm);
    init_date(vm);
    init_math(vm);
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// Links a constructor and its prototype both ways and makes it global.
fn define_constructor(vm: &mut Vm, name: &str, constructor: Value, proto: HeapRef) {
    if let Some(r) = constructor.as_object() {
        vm.heap_mut()[r]
            .properties
            .set("prototype", Value::Object(proto));
    }
    vm.heap_mut()[proto]
        .properties
        .set("constructor", constructor.clone());
    vm.define_global(name, constructor);
}

// Console.

fn print(vm: &mut Vm, _this: &Value, args: &[Value]) -> NativeResult {
    let parts: Vec<String> = args.iter().map(|v| vm.to_display_string(v)).collect();
    vm.print(parts.join(" "));
    Ok(Value::Undefined)
}

fn init_console(vm: &mut Vm) {
    vm.define_native("print", print);
    vm.define_native("log", print);
    let console = vm.new_object();
    vm.define_method(console, "log", print);
    vm.define_global("console", Value::Object(console));
}

// Object.

fn init_object(vm: &mut Vm) {
    let proto = vm.context().prototypes.object;
    let constructor = vm.native("Object", |vm, _this, args| {
        match args.first() {
            Some(value @ Value::Object(_)) => Ok(value.clone()),
            _ => Ok(Value::Object(vm.new_object())),
        }
    });
    if let Some(r) = constructor.as_object() {
        vm.define_method(r, "keys", |vm, _this, args| {
            let keys = match arg(args, 0) {
                Value::Object(r) => own_keys(vm, r),
                _ => Vec::new(),
            };
            Ok(Value::Object(vm.new_array(keys)))
        });
    }
    define_constructor(vm, "Object", constructor, proto);

    vm.define_method(proto, "hasOwnProperty", |vm, this, args| {
        let key = vm.to_display_string(&arg(args, 0));
        let Value::Object(r) = this else {
            return Ok(Value::Bool(false));
        };
        let object = &vm.heap()[*r];
        let own = match &object.kind {
            ObjectKind::Array(items) => {
                key == "length" || key.parse::<usize>().is_ok_and(|i| i < items.len())
            }
            _ => false,
        };
        Ok(Value::Bool(own || object.properties.contains(&key)))
    });
    vm.define_method(proto, "toString", |vm, this, _args| {
        Ok(Value::from(vm.to_display_string(this)))
    });
}

fn own_keys(vm: &Vm, r: HeapRef) -> Vec<Value> {
    let object = &vm.heap()[r];
    let indices = match &object.kind {
        ObjectKind::Array(items) => items.len(),
        _ => 0,
    };
    (0..indices)
        .map(|i| Value::from(i.to_string()))
        .chain(object.properties.keys().map(|k| Value::String(k.clone())))
        .collect()
}

// Function.

fn init_function(vm: &mut Vm) {
    let proto = vm.context().prototypes.function;
    vm.define_method(proto, "call", |vm, this, args| {
        let receiver = arg(args, 0);
        let rest = args.get(1..).unwrap_or_default();
        vm.call(this, &receiver, rest)
    });
}

// Array.

fn with_array<T>(vm: &mut Vm, this: &Value, f: impl FnOnce(&mut Vec<Value>) -> T) -> Result<T, Value> {
    if let Some(r) = this.as_object() {
        if let ObjectKind::Array(items) = &mut vm.heap_mut()[r].kind {
            return Ok(f(items));
        }
    }
    Err(vm.type_error("receiver is not an array"))
}

fn init_array(vm: &mut Vm) {
    let proto = vm.context().prototypes.array;
    let constructor = vm.native("Array", |vm, _this, args| {
        Ok(Value::Object(vm.new_array(args.to_vec())))
    });
    define_constructor(vm, "Array", constructor, proto);

    vm.define_method(proto, "push", |vm, this, args| {
        let len = with_array(vm, this, |items| {
            items.extend_from_slice(args);
            items.len()
        })?;
        Ok(Value::Number(len as f64))
    });
    vm.define_method(proto, "pop", |vm, this, _args| {
        Ok(with_array(vm, this, Vec::pop)?.unwrap_or_default())
    });
    vm.define_method(proto, "indexOf", |vm, this, args| {
        let needle = arg(args, 0);
        let index = with_array(vm, this, |items| {
            items.iter().position(|item| item.strict_equals(&needle))
        })?;
        Ok(Value::Number(index.map_or(-1.0, |i| i as f64)))
    });
    vm.define_method(proto, "join", |vm, this, args| {
        let separator = match arg(args, 0) {
            Value::Undefined => ",".to_string(),
            other => vm.to_display_string(&other),
        };
        let items = with_array(vm, this, |items| items.clone())?;
        let parts: Vec<String> = items
            .iter()
            .map(|item| {
                if item.is_nullish() {
                    String::new()
                } else {
                    vm.to_display_string(item)
                }
            })
            .collect();
        Ok(Value::from(parts.join(&separator)))
    });
}

// String.

fn this_string(vm: &Vm, this: &Value) -> String {
    vm.to_display_string(this)
}

/// Clamps a script number argument to a char index in `0..=len`.
fn char_index(value: &Value, len: usize, default: usize) -> usize {
    match value {
        Value::Undefined => default,
        other => {
            let n = other.to_number();
            if n.is_nan() || n <= 0.0 {
                0
            } else {
                (n.trunc() as usize).min(len)
            }
        }
    }
}

fn init_string(vm: &mut Vm) {
    let proto = vm.context().prototypes.string;
    let constructor = vm.native("String", |vm, _this, args| {
        Ok(Value::from(match args.first() {
            Some(value) => vm.to_display_string(value),
            None => String::new(),
        }))
    });
    define_constructor(vm, "String", constructor, proto);

    vm.define_method(proto, "charAt", |vm, this, args| {
        let s = this_string(vm, this);
        let index = arg(args, 0).to_number();
        let index = if index.is_nan() { 0.0 } else { index.trunc() };
        let c = if index < 0.0 {
            None
        } else {
            s.chars().nth(index as usize)
        };
        Ok(Value::from(c.map(String::from).unwrap_or_default()))
    });
    vm.define_method(proto, "indexOf", |vm, this, args| {
        let s = this_string(vm, this);
        let needle = vm.to_display_string(&arg(args, 0));
        let index = s
            .find(&needle)
            .map_or(-1.0, |byte| s[..byte].chars().count() as f64);
        Ok(Value::Number(index))
    });
    vm.define_method(proto, "toUpperCase", |vm, this, _args| {
        Ok(Value::from(this_string(vm, this).to_uppercase()))
    });
    vm.define_method(proto, "toLowerCase", |vm, this, _args| {
        Ok(Value::from(this_string(vm, this).to_lowercase()))
    });
    vm.define_method(proto, "substring", |vm, this, args| {
        let chars: Vec<char> = this_string(vm, this).chars().collect();
        let start = char_index(&arg(args, 0), chars.len(), 0);
        let end = char_index(&arg(args, 1), chars.len(), chars.len());
        let (from, to) = if start <= end { (start, end) } else { (end, start) };
        Ok(Value::from(chars[from..to].iter().collect::<String>()))
    });
    vm.define_method(proto, "toString", |vm, this, _args| {
        Ok(Value::from(this_string(vm, this)))
    });
}

// Errors.

fn init_error(vm: &mut Vm) {
    let kinds: [(&str, fn(&Prototypes) -> HeapRef); 3] = [
        ("Error", |p| p.error),
        ("TypeError", |p| p.type_error),
        ("ReferenceError", |p| p.reference_error),
    ];
    for (name, select) in kinds {
        let proto = select(&vm.context().prototypes);
        // Natives capture the selector, not the prototype reference.
        let constructor = vm.native(name, move |vm, this, args| {
            let proto = select(&vm.context().prototypes);
            // Without `new`, `this` is not a fresh instance.
            let error = match this {
                Value::Object(r) if vm.context().inherits(*r, proto) => *r,
                _ => vm.alloc(ObjectKind::Ordinary, proto),
            };
            let message = arg(args, 0);
            if !matches!(message, Value::Undefined) {
                let message = vm.to_display_string(&message);
                vm.heap_mut()[error]
                    .properties
                    .set("message", Value::from(message));
            }
            Ok(Value::Object(error))
        });
        define_constructor(vm, name, constructor, proto);
        let properties = &mut vm.heap_mut()[proto].properties;
        properties.set("name", Value::from(name));
        properties.set("message", Value::from(""));
    }

    let error = vm.context().prototypes.error;
    vm.define_method(error, "toString", |vm, this, _args| {
        let name = vm.get_property(this, "name")?;
        let message = vm.get_property(this, "message")?;
        Ok(Value::from(error_string(
            &vm.to_display_string(&name),
            &vm.to_display_string(&message),
        )))
    });
}

// Date.

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_millis() as f64)
}

fn init_date(vm: &mut Vm) {
    let proto = vm.context().prototypes.date;
    let constructor = vm.native("Date", |vm, this, _args| {
        let proto = vm.context().prototypes.date;
        let date = match this {
            Value::Object(r) if vm.context().inherits(*r, proto) => *r,
            _ => vm.alloc(ObjectKind::Ordinary, proto),
        };
        vm.heap_mut()[date].kind = ObjectKind::Date(now_ms());
        Ok(Value::Object(date))
    });
    if let Some(r) = constructor.as_object() {
        vm.define_method(r, "now", |_vm, _this, _args| Ok(Value::Number(now_ms())));
    }
    define_constructor(vm, "Date", constructor, proto);

    vm.define_method(proto, "getTime", |vm, this, _args| {
        let ms = this
            .as_object()
            .and_then(|r| match vm.heap()[r].kind {
                ObjectKind::Date(ms) => Some(ms),
                _ => None,
            });
        match ms {
            Some(ms) => Ok(Value::Number(ms)),
            None => Err(vm.type_error("this is not a Date object")),
        }
    });
}

// Math.

fn init_math(vm: &mut Vm) {
    let math = vm.new_object();
    vm.heap_mut()[math]
        .properties
        .set("PI", Value::Number(std::f64::consts::PI));

    let unary: [(&str, fn(f64) -> f64); 4] = [
        ("floor", f64::floor),
        ("ceil", f64::ceil),
        ("abs", f64::abs),
        ("sqrt", f64::sqrt),
    ];
    for (name, op) in unary {
        vm.define_method(math, name, move |_vm, _this, args| {
            Ok(Value::Number(op(arg(args, 0).to_number())))
        });
    }
    vm.define_method(math, "max", |_vm, _this, args| {
        Ok(Value::Number(fold_numbers(args, f64::NEG_INFINITY, f64::max)))
    });
    vm.define_method(math, "min", |_vm, _this, args| {
        Ok(Value::Number(fold_numbers(args, f64::INFINITY, f64::min)))
    });
    vm.define_global("Math", Value::Object(math));
}

/// `Math.max`/`Math.min`: any `NaN` argument makes the result `NaN`.
fn fold_numbers(args: &[Value], init: f64, op: fn(f64, f64) -> f64) -> f64 {
    args.iter().map(Value::to_number).fold(init, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            op(acc, n)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Value {
        let mut vm = Vm::new();
        vm.interpret(source).expect("script runs")
    }

    #[test]
    fn array_methods() {
        assert_eq!(
            eval("var a = [1, 2]; a.push(3); return a.join('-');"),
            Value::from("1-2-3")
        );
        assert_eq!(eval("return [4, 5, 6].indexOf(5);"), Value::Number(1.0));
        assert_eq!(eval("var a = [1, 2]; a.pop(); return a.length;"), Value::Number(1.0));
    }

    #[test]
    fn string_methods() {
        assert_eq!(eval("return 'hello'.charAt(1);"), Value::from("e"));
        assert_eq!(eval("return 'hello'.substring(3, 1);"), Value::from("el"));
        assert_eq!(eval("return 'héllo'.indexOf('l');"), Value::Number(2.0));
        assert_eq!(eval("return 'Ab'.toUpperCase() + 'Ab'.toLowerCase();"), Value::from("ABab"));
    }

    #[test]
    fn object_keys_and_own_properties() {
        assert_eq!(
            eval("return Object.keys({a: 1, b: 2}).join();"),
            Value::from("a,b")
        );
        assert_eq!(
            eval("var o = {a: 1}; return o.hasOwnProperty('a') && !o.hasOwnProperty('toString');"),
            Value::Bool(true)
        );
    }

    #[test]
    fn errors_render_name_and_message() {
        assert_eq!(
            eval("return new TypeError('bad').toString();"),
            Value::from("TypeError: bad")
        );
        assert_eq!(eval("return String(Error('x'));"), Value::from("Error: x"));
        assert_eq!(eval("return new Error() instanceof Error;"), Value::Bool(true));
    }

    #[test]
    fn math_functions() {
        assert_eq!(eval("return Math.max(1, 7, 3) + Math.min(2, -1);"), Value::Number(6.0));
        assert_eq!(eval("return Math.floor(2.7) + Math.ceil(0.2) + Math.abs(-3);"), Value::Number(6.0));
        assert_eq!(eval("return Math.sqrt(16);"), Value::Number(4.0));
    }

    #[test]
    fn date_now_is_positive() {
        assert_eq!(eval("return Date.now() > 0;"), Value::Bool(true));
        assert_eq!(eval("return new Date().getTime() > 0;"), Value::Bool(true));
    }

    #[test]
    fn console_output_is_collected() {
        let mut vm = Vm::new();
        vm.interpret("console.log('a', 1); print([1, 2]);").expect("runs");
        assert_eq!(vm.take_console(), vec!["a 1".to_string(), "1,2".to_string()]);
    }
}
