//! Stack-based bytecode interpreter.
//!
//! One value stack is shared by every call frame. A frame records where its
//! slots start (`base`, the callee slot), its instruction pointer and the
//! exception handlers installed by `TRY` inside it. Script exceptions travel
//! as [`Unwind::Throw`] through ordinary `Result` returns: the dispatcher
//! looks for the innermost handler, popping frames until one is found or the
//! run that owns those frames gives up.
//!
//! Natives may call back into the VM ([`Vm::call`]); each such call runs a
//! nested dispatch loop that stops once its own frames are gone. Collection
//! happens only between instructions of the outermost loop, where the stack
//! and frames hold every live reference.

use std::cell::RefCell;
use std::rc::Rc;

use crate::chunk::{Constant, FunctionProto};
use crate::compiler;
use crate::error::{JsError, RuntimeError};
use crate::heap::{Closure, Heap, HeapRef, Native, NativeFn, Object, ObjectKind, Upvalue};
use crate::opcode::OpCode;
use crate::parser;
use crate::prelude;
use crate::runtime::RuntimeContext;
use crate::value::{Value, array_index, number_to_string};

/// Arrays longer than this cannot be created by index assignment.
const MAX_ARRAY_LENGTH: usize = 1 << 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VmConfig {
    /// Call depth at which a call fails with `StackOverflow`.
    pub max_frames: usize,
    /// Allocations between automatic collections.
    pub gc_threshold: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_frames: 512,
            gc_threshold: 1024,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Handler {
    catch_ip: usize,
    stack_len: usize,
}

struct CallFrame {
    closure: HeapRef,
    proto: Rc<FunctionProto>,
    upvalues: Vec<Rc<RefCell<Upvalue>>>,
    ip: usize,
    base: usize,
    handlers: Vec<Handler>,
    /// Called through `new`: a non-object return yields `this`.
    construct: bool,
}

enum Flow {
    Continue,
    /// A frame returned this value; it has not been pushed yet.
    Return(Value),
}

enum Unwind {
    Throw(Value),
    Fatal(RuntimeError),
}

type Step<T = Flow> = Result<T, Unwind>;

enum Callable {
    Closure(Closure),
    Native(NativeFn),
}

pub struct Vm {
    ctx: RuntimeContext,
    config: VmConfig,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    /// Upvalues still pointing into the stack.
    open_upvalues: Vec<Rc<RefCell<Upvalue>>>,
    /// Depth of native calls in progress; collection waits for zero.
    native_depth: usize,
    /// A fatal error raised below a native call, re-raised once it returns.
    fatal: Option<RuntimeError>,
    console: Vec<String>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    /// A VM with the built-in globals installed.
    pub fn with_config(config: VmConfig) -> Self {
        let mut vm = Self {
            ctx: RuntimeContext::new(config.gc_threshold),
            config,
            stack: Vec::with_capacity(256),
            frames: Vec::new(),
            open_upvalues: Vec::new(),
            native_depth: 0,
            fatal: None,
            console: Vec::new(),
        };
        prelude::install(&mut vm);
        vm
    }

    pub fn config(&self) -> VmConfig {
        self.config
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.ctx
    }

    pub fn heap(&self) -> &Heap {
        &self.ctx.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.ctx.heap
    }

    /// Parses and compiles `source` without running it.
    pub fn compile(source: &str) -> Result<Rc<FunctionProto>, JsError> {
        let program = parser::parse(source)?;
        Ok(compiler::compile(&program)?)
    }

    /// Compiles and runs a script. A top-level `return` supplies the result;
    /// otherwise it is `undefined`.
    pub fn interpret(&mut self, source: &str) -> Result<Value, JsError> {
        let proto = Self::compile(source)?;
        self.execute(proto, Value::Undefined)
    }

    /// Runs a compiled script with `this` bound to `this`.
    pub fn execute(&mut self, proto: Rc<FunctionProto>, this: Value) -> Result<Value, JsError> {
        let closure = self.alloc(
            ObjectKind::Closure(Closure {
                proto,
                upvalues: Vec::new(),
            }),
            self.ctx.prototypes.function,
        );
        self.call_function(&Value::Object(closure), &this, &[])
    }

    /// Calls a script value from the host. Uncaught exceptions come back as
    /// `RuntimeError::Uncaught`.
    pub fn call_function(
        &mut self,
        callee: &Value,
        this: &Value,
        args: &[Value],
    ) -> Result<Value, JsError> {
        self.fatal = None;
        match self.invoke(callee, this, args) {
            Ok(value) => Ok(value),
            Err(Unwind::Throw(value)) => {
                let message = self.to_display_string(&value);
                log::warn!(target: "js.vm", "uncaught {message}");
                Err(RuntimeError::Uncaught(message).into())
            }
            Err(Unwind::Fatal(error)) => {
                log::warn!(target: "js.vm", "script aborted: {error}");
                Err(error.into())
            }
        }
    }

    /// Calls a script value from inside a native. `Err` is the thrown value;
    /// the native should pass it on.
    pub fn call(&mut self, callee: &Value, this: &Value, args: &[Value]) -> Result<Value, Value> {
        match self.invoke(callee, this, args) {
            Ok(value) => Ok(value),
            Err(Unwind::Throw(value)) => Err(value),
            Err(Unwind::Fatal(error)) => {
                self.fatal = Some(error);
                Err(Value::Undefined)
            }
        }
    }

    fn invoke(&mut self, callee: &Value, this: &Value, args: &[Value]) -> Step<Value> {
        let stop = self.frames.len();
        let base = self.stack.len();
        self.stack.push(callee.clone());
        self.stack.push(this.clone());
        self.stack.extend_from_slice(args);

        let result = match self.call_value(args.len(), false) {
            Ok(()) if self.frames.len() > stop => self.run(stop),
            Ok(()) => Ok(self.stack.pop().unwrap_or_default()),
            Err(unwind) => Err(unwind),
        };
        self.close_upvalues(base);
        self.stack.truncate(base);
        result
    }

    // Globals and objects.

    pub fn global_object(&self) -> HeapRef {
        self.ctx.global
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.ctx.heap[self.ctx.global].properties.get(name).cloned()
    }

    pub fn define_global(&mut self, name: &str, value: Value) {
        let global = self.ctx.global;
        self.ctx.heap[global].properties.set(name, value);
    }

    /// Wraps a Rust function as a script function value.
    pub fn native<F>(&mut self, name: &str, func: F) -> Value
    where
        F: Fn(&mut Vm, &Value, &[Value]) -> Result<Value, Value> + 'static,
    {
        let func: NativeFn = Rc::new(func);
        let native = Native {
            name: Rc::from(name),
            func,
        };
        Value::Object(self.alloc(ObjectKind::Native(native), self.ctx.prototypes.function))
    }

    pub fn define_native<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&mut Vm, &Value, &[Value]) -> Result<Value, Value> + 'static,
    {
        let value = self.native(name, func);
        self.define_global(name, value);
    }

    /// Installs a native method as an own property of `target`.
    pub fn define_method<F>(&mut self, target: HeapRef, name: &str, func: F)
    where
        F: Fn(&mut Vm, &Value, &[Value]) -> Result<Value, Value> + 'static,
    {
        let value = self.native(name, func);
        self.ctx.heap[target].properties.set(name, value);
    }

    pub fn alloc(&mut self, kind: ObjectKind, proto: HeapRef) -> HeapRef {
        self.ctx.alloc(kind, proto)
    }

    pub fn new_object(&mut self) -> HeapRef {
        self.alloc(ObjectKind::Ordinary, self.ctx.prototypes.object)
    }

    pub fn new_array(&mut self, items: Vec<Value>) -> HeapRef {
        self.alloc(ObjectKind::Array(items), self.ctx.prototypes.array)
    }

    /// An object carrying an embedder handle, e.g. a DOM node id.
    pub fn alloc_host(&mut self, data: u64, proto: Option<HeapRef>) -> HeapRef {
        let proto = proto.unwrap_or(self.ctx.prototypes.object);
        self.alloc(ObjectKind::Host(data), proto)
    }

    pub fn host_data(&self, value: &Value) -> Option<u64> {
        match self.ctx.heap.get(value.as_object()?)?.kind {
            ObjectKind::Host(data) => Some(data),
            _ => None,
        }
    }

    /// An Error instance inheriting from `proto`.
    pub fn make_error(&mut self, proto: HeapRef, message: &str) -> Value {
        let error = self.alloc(ObjectKind::Ordinary, proto);
        self.ctx.heap[error].properties.set("message", Value::from(message));
        Value::Object(error)
    }

    pub fn type_error(&mut self, message: &str) -> Value {
        self.make_error(self.ctx.prototypes.type_error, message)
    }

    pub fn reference_error(&mut self, message: &str) -> Value {
        self.make_error(self.ctx.prototypes.reference_error, message)
    }

    pub fn error(&mut self, message: &str) -> Value {
        self.make_error(self.ctx.prototypes.error, message)
    }

    /// Script console output: kept for the host and logged.
    pub fn print(&mut self, line: String) {
        log::info!(target: "js.vm", "{line}");
        self.console.push(line);
    }

    pub fn take_console(&mut self) -> Vec<String> {
        std::mem::take(&mut self.console)
    }

    // Garbage collection.

    /// Collects everything unreachable from the stack, the frames, the
    /// global object and the built-in prototypes. Returns the number of
    /// cells freed.
    pub fn collect_garbage(&mut self) -> usize {
        let before = self.ctx.heap.live_cells();
        let mut roots: Vec<HeapRef> = self.ctx.roots().collect();
        roots.extend(self.stack.iter().filter_map(Value::as_object));
        roots.extend(self.frames.iter().map(|f| f.closure));
        for frame in &self.frames {
            for upvalue in &frame.upvalues {
                if let Upvalue::Closed(Value::Object(r)) = &*upvalue.borrow() {
                    roots.push(*r);
                }
            }
        }
        let freed = self.ctx.heap.collect(roots);
        log::debug!(
            target: "js.gc",
            "collected {freed} cells ({before} -> {})",
            self.ctx.heap.live_cells()
        );
        freed
    }

    // Property access.

    /// `target[key]` for a string key, following the prototype chain.
    pub fn get_property(&mut self, target: &Value, key: &str) -> Result<Value, Value> {
        let start = match target {
            Value::Undefined | Value::Null => {
                let message = format!("cannot read property '{key}' of {target}");
                return Err(self.type_error(&message));
            }
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                self.ctx.prototypes.string
            }
            Value::Bool(_) | Value::Number(_) => self.ctx.prototypes.object,
            Value::Object(r) => {
                match &self.ctx.heap[*r].kind {
                    ObjectKind::Array(items) if key == "length" => {
                        return Ok(Value::Number(items.len() as f64));
                    }
                    ObjectKind::Closure(_) if key == "prototype" => {}
                    _ => return Ok(self.lookup(*r, key).unwrap_or_default()),
                }
                return Ok(Value::Object(self.function_prototype(*r)));
            }
        };
        Ok(self.lookup(start, key).unwrap_or_default())
    }

    fn lookup(&self, start: HeapRef, key: &str) -> Option<Value> {
        let mut current = Some(start);
        while let Some(r) = current {
            let object = self.ctx.heap.get(r)?;
            if let Some(value) = object.properties.get(key) {
                return Some(value.clone());
            }
            current = object.prototype;
        }
        None
    }

    pub fn set_property(&mut self, target: &Value, key: &str, value: Value) -> Result<(), Value> {
        let r = match target {
            Value::Undefined | Value::Null => {
                let message = format!("cannot set property '{key}' of {target}");
                return Err(self.type_error(&message));
            }
            Value::Object(r) => *r,
            // Primitives have no own properties; the write is dropped.
            _ => return Ok(()),
        };
        let is_array = matches!(self.ctx.heap[r].kind, ObjectKind::Array(_));
        if is_array && key == "length" {
            let len = value.to_number();
            if len < 0.0 || len.fract() != 0.0 || len > MAX_ARRAY_LENGTH as f64 {
                return Err(self.error("invalid array length"));
            }
            if let ObjectKind::Array(items) = &mut self.ctx.heap[r].kind {
                items.resize(len as usize, Value::Undefined);
            }
            return Ok(());
        }
        self.ctx.heap[r].properties.set(key, value);
        Ok(())
    }

    fn get_index(&mut self, target: &Value, key: &Value) -> Result<Value, Value> {
        if let Some(index) = array_index(key) {
            match target {
                Value::String(s) => {
                    return Ok(s
                        .chars()
                        .nth(index)
                        .map_or(Value::Undefined, |c| Value::from(c.to_string())));
                }
                Value::Object(r) => {
                    if let ObjectKind::Array(items) = &self.ctx.heap[*r].kind {
                        return Ok(items.get(index).cloned().unwrap_or_default());
                    }
                }
                _ => {}
            }
        }
        let key = self.to_display_string(key);
        self.get_property(target, &key)
    }

    fn set_index(&mut self, target: &Value, key: &Value, value: Value) -> Result<(), Value> {
        if let (Some(index), Value::Object(r)) = (array_index(key), target) {
            if matches!(self.ctx.heap[*r].kind, ObjectKind::Array(_)) {
                if index >= MAX_ARRAY_LENGTH {
                    return Err(self.error("invalid array length"));
                }
                if let ObjectKind::Array(items) = &mut self.ctx.heap[*r].kind {
                    if index >= items.len() {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                }
                return Ok(());
            }
        }
        let key = self.to_display_string(key);
        self.set_property(target, &key, value)
    }

    /// The `prototype` object of a script function, created on first use.
    fn function_prototype(&mut self, function: HeapRef) -> HeapRef {
        if let Some(Value::Object(proto)) = self.ctx.heap[function].properties.get("prototype") {
            return *proto;
        }
        let proto = self.new_object();
        self.ctx.heap[proto]
            .properties
            .set("constructor", Value::Object(function));
        self.ctx.heap[function]
            .properties
            .set("prototype", Value::Object(proto));
        proto
    }

    /// A fresh object for `new callee`, inheriting from `callee.prototype`.
    fn construct_this(&mut self, callee: HeapRef) -> HeapRef {
        let proto = match &self.ctx.heap[callee].kind {
            ObjectKind::Closure(_) => self.function_prototype(callee),
            _ => match self.ctx.heap[callee].properties.get("prototype") {
                Some(Value::Object(proto)) => *proto,
                _ => self.ctx.prototypes.object,
            },
        };
        self.alloc(ObjectKind::Ordinary, proto)
    }

    // Conversions.

    /// Script-visible string form of any value.
    pub fn to_display_string(&self, value: &Value) -> String {
        let mut seen = Vec::new();
        self.display(value, &mut seen)
    }

    fn display(&self, value: &Value, seen: &mut Vec<HeapRef>) -> String {
        let Value::Object(r) = value else {
            return value.to_string();
        };
        let Some(object) = self.ctx.heap.get(*r) else {
            return String::new();
        };
        if seen.contains(r) {
            return String::new();
        }
        match &object.kind {
            ObjectKind::Array(items) => {
                seen.push(*r);
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            self.display(item, seen)
                        }
                    })
                    .collect();
                seen.pop();
                parts.join(",")
            }
            ObjectKind::Closure(closure) => format!("function {}() {{ [code] }}", closure.proto.name),
            ObjectKind::Native(native) => format!("function {}() {{ [native code] }}", native.name),
            ObjectKind::Date(ms) => number_to_string(*ms),
            ObjectKind::Ordinary | ObjectKind::Host(_) => {
                if self.ctx.inherits(*r, self.ctx.prototypes.error) {
                    let name = self.lookup(*r, "name").unwrap_or_default();
                    let message = self.lookup(*r, "message").unwrap_or_default();
                    error_string(&name.to_string(), &message.to_string())
                } else {
                    "[object Object]".to_string()
                }
            }
        }
    }

    fn type_of(&self, value: &Value) -> &'static str {
        match value {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(r) => match self.ctx.heap.get(*r) {
                Some(object) if object.is_callable() => "function",
                _ => "object",
            },
        }
    }

    fn instance_of(&mut self, value: &Value, constructor: &Value) -> Result<bool, Value> {
        let callable = constructor
            .as_object()
            .and_then(|r| self.ctx.heap.get(r))
            .is_some_and(Object::is_callable);
        if !callable {
            return Err(self.type_error("right-hand side of 'instanceof' is not callable"));
        }
        let Value::Object(proto) = self.get_property(constructor, "prototype")? else {
            return Ok(false);
        };
        Ok(value
            .as_object()
            .is_some_and(|object| self.ctx.inherits(object, proto)))
    }

    // Dispatch.

    fn frame(&self) -> &CallFrame {
        &self.frames[self.frames.len() - 1]
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.frame_mut();
        let byte = frame.proto.chunk.code[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_u16(&mut self) -> usize {
        let frame = self.frame_mut();
        let value = frame.proto.chunk.read_u16(frame.ip);
        frame.ip += 2;
        value as usize
    }

    fn read_constant(&mut self) -> Constant {
        let idx = self.read_byte() as usize;
        self.frame().proto.chunk.constants[idx].clone()
    }

    fn read_name(&mut self) -> Rc<str> {
        match self.read_constant() {
            Constant::String(name) => name,
            Constant::Number(n) => Rc::from(number_to_string(n)),
            Constant::Function(f) => f.name.clone(),
        }
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }

    fn peek(&self, distance: usize) -> &Value {
        &self.stack[self.stack.len() - 1 - distance]
    }

    fn throw<T>(value: Value) -> Step<T> {
        Err(Unwind::Throw(value))
    }

    /// Runs until the frame count drops back to `stop`, returning the value
    /// the last of those frames returned.
    fn run(&mut self, stop: usize) -> Step<Value> {
        loop {
            if self.native_depth == 0 && self.ctx.heap.should_collect() {
                self.collect_garbage();
            }
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Return(value)) => {
                    if self.frames.len() <= stop {
                        return Ok(value);
                    }
                    self.stack.push(value);
                }
                Err(Unwind::Throw(value)) => self.handle_throw(value, stop)?,
                Err(Unwind::Fatal(error)) => {
                    self.unwind_frames(stop);
                    return Err(Unwind::Fatal(error));
                }
            }
        }
    }

    /// Transfers control to the innermost handler in this run's frames, or
    /// gives the exception back once they are exhausted.
    fn handle_throw(&mut self, value: Value, stop: usize) -> Step<()> {
        while self.frames.len() > stop {
            if let Some(handler) = self.frame_mut().handlers.pop() {
                self.close_upvalues(handler.stack_len);
                self.stack.truncate(handler.stack_len);
                self.stack.push(value);
                self.frame_mut().ip = handler.catch_ip;
                return Ok(());
            }
            self.pop_frame();
        }
        Self::throw(value)
    }

    fn unwind_frames(&mut self, stop: usize) {
        while self.frames.len() > stop {
            self.pop_frame();
        }
    }

    fn pop_frame(&mut self) -> Option<CallFrame> {
        let frame = self.frames.pop()?;
        self.close_upvalues(frame.base);
        self.stack.truncate(frame.base);
        Some(frame)
    }

    fn capture_upvalue(&mut self, slot: usize) -> Rc<RefCell<Upvalue>> {
        let existing = self
            .open_upvalues
            .iter()
            .find(|u| matches!(*u.borrow(), Upvalue::Open(s) if s == slot));
        if let Some(upvalue) = existing {
            return upvalue.clone();
        }
        let upvalue = Rc::new(RefCell::new(Upvalue::Open(slot)));
        self.open_upvalues.push(upvalue.clone());
        upvalue
    }

    /// Moves every open upvalue at or above `from` off the stack.
    fn close_upvalues(&mut self, from: usize) {
        let stack = &self.stack;
        self.open_upvalues.retain(|upvalue| {
            let mut upvalue = upvalue.borrow_mut();
            match *upvalue {
                Upvalue::Open(slot) if slot >= from => {
                    *upvalue = Upvalue::Closed(stack.get(slot).cloned().unwrap_or_default());
                    false
                }
                _ => true,
            }
        });
    }

    /// Calls the callee sitting below `this` and `argc` arguments. A script
    /// function gets a new frame; a native runs to completion and its result
    /// replaces the call slots.
    fn call_value(&mut self, argc: usize, construct: bool) -> Step<()> {
        let callee_slot = self.stack.len() - argc - 2;
        let callee = self.stack[callee_slot].clone();
        let target = callee.as_object().and_then(|r| {
            let callable = match &self.ctx.heap.get(r)?.kind {
                ObjectKind::Closure(closure) => Callable::Closure(closure.clone()),
                ObjectKind::Native(native) => Callable::Native(native.func.clone()),
                _ => return None,
            };
            Some((r, callable))
        });

        match target {
            Some((r, Callable::Closure(closure))) => {
                if self.frames.len() >= self.config.max_frames {
                    return Err(Unwind::Fatal(RuntimeError::StackOverflow));
                }
                if construct {
                    let this = self.construct_this(r);
                    self.stack[callee_slot + 1] = Value::Object(this);
                }
                let arity = closure.proto.arity as usize;
                self.stack.resize(callee_slot + 2 + arity, Value::Undefined);
                self.frames.push(CallFrame {
                    closure: r,
                    proto: closure.proto,
                    upvalues: closure.upvalues,
                    ip: 0,
                    base: callee_slot,
                    handlers: Vec::new(),
                    construct,
                });
                Ok(())
            }
            Some((r, Callable::Native(func))) => {
                if construct {
                    let this = self.construct_this(r);
                    self.stack[callee_slot + 1] = Value::Object(this);
                }
                let this = self.stack[callee_slot + 1].clone();
                let args = self.stack[callee_slot + 2..].to_vec();
                self.native_depth += 1;
                let result = func(self, &this, &args);
                self.native_depth -= 1;
                if let Some(error) = self.fatal.take() {
                    return Err(Unwind::Fatal(error));
                }
                let result = result.map_err(Unwind::Throw)?;
                let result = if construct && result.as_object().is_none() {
                    this
                } else {
                    result
                };
                self.stack.truncate(callee_slot);
                self.stack.push(result);
                Ok(())
            }
            None => {
                let what = if construct { "a constructor" } else { "a function" };
                let message = format!("{} is not {what}", self.to_display_string(&callee));
                Self::throw(self.type_error(&message))
            }
        }
    }

    fn binary_number(&mut self, op: impl Fn(f64, f64) -> f64) {
        let b = self.pop().to_number();
        let a = self.pop().to_number();
        self.stack.push(Value::Number(op(a, b)));
    }

    fn compare(&mut self, op: impl Fn(std::cmp::Ordering) -> bool) {
        let b = self.pop();
        let a = self.pop();
        let ordering = match (&a, &b) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => a.to_number().partial_cmp(&b.to_number()),
        };
        self.stack.push(Value::Bool(ordering.is_some_and(op)));
    }

    fn add(&mut self) {
        let b = self.pop();
        let a = self.pop();
        let stringy = |v: &Value| matches!(v, Value::String(_) | Value::Object(_));
        let result = if stringy(&a) || stringy(&b) {
            let mut s = self.to_display_string(&a);
            s.push_str(&self.to_display_string(&b));
            Value::from(s)
        } else {
            Value::Number(a.to_number() + b.to_number())
        };
        self.stack.push(result);
    }

    fn step(&mut self) -> Step {
        let byte = self.read_byte();
        let Some(op) = OpCode::from_byte(byte) else {
            return Err(Unwind::Fatal(RuntimeError::InvalidOpcode(byte)));
        };
        match op {
            OpCode::Constant => {
                let value = match self.read_constant() {
                    Constant::Number(n) => Value::Number(n),
                    Constant::String(s) => Value::String(s),
                    Constant::Function(_) => Value::Undefined,
                };
                self.stack.push(value);
            }
            OpCode::Undefined => self.stack.push(Value::Undefined),
            OpCode::Null => self.stack.push(Value::Null),
            OpCode::True => self.stack.push(Value::Bool(true)),
            OpCode::False => self.stack.push(Value::Bool(false)),
            OpCode::Pop => {
                self.pop();
            }
            OpCode::Dup => self.stack.push(self.peek(0).clone()),
            OpCode::Dup2 => {
                let a = self.peek(1).clone();
                let b = self.peek(0).clone();
                self.stack.push(a);
                self.stack.push(b);
            }
            OpCode::Swap => {
                let len = self.stack.len();
                self.stack.swap(len - 1, len - 2);
            }
            OpCode::GetLocal => {
                let slot = self.frame().base + self.read_byte() as usize;
                self.stack.push(self.stack[slot].clone());
            }
            OpCode::SetLocal => {
                let slot = self.frame().base + self.read_byte() as usize;
                self.stack[slot] = self.peek(0).clone();
            }
            OpCode::GetUpvalue => {
                let idx = self.read_byte() as usize;
                let value = match &*self.frame().upvalues[idx].borrow() {
                    Upvalue::Open(slot) => self.stack[*slot].clone(),
                    Upvalue::Closed(value) => value.clone(),
                };
                self.stack.push(value);
            }
            OpCode::SetUpvalue => {
                let idx = self.read_byte() as usize;
                let value = self.peek(0).clone();
                let upvalue = self.frame().upvalues[idx].clone();
                let mut upvalue = upvalue.borrow_mut();
                match &mut *upvalue {
                    Upvalue::Open(slot) => self.stack[*slot] = value,
                    Upvalue::Closed(closed) => *closed = value,
                }
            }
            OpCode::GetGlobal => {
                let name = self.read_name();
                match self.global(&name) {
                    Some(value) => self.stack.push(value),
                    None => {
                        return Self::throw(self.reference_error(&format!("{name} is not defined")));
                    }
                }
            }
            OpCode::SetGlobal => {
                let name = self.read_name();
                if !self.ctx.heap[self.ctx.global].properties.contains(&name) {
                    return Self::throw(self.reference_error(&format!("{name} is not defined")));
                }
                let value = self.peek(0).clone();
                self.define_global(&name, value);
            }
            OpCode::DefineGlobal => {
                let name = self.read_name();
                let value = self.pop();
                self.define_global(&name, value);
            }
            OpCode::GetProperty => {
                let name = self.read_name();
                let target = self.pop();
                let value = self.get_property(&target, &name).map_err(Unwind::Throw)?;
                self.stack.push(value);
            }
            OpCode::SetProperty => {
                let name = self.read_name();
                let value = self.pop();
                let target = self.pop();
                self.set_property(&target, &name, value.clone())
                    .map_err(Unwind::Throw)?;
                self.stack.push(value);
            }
            OpCode::GetIndex => {
                let key = self.pop();
                let target = self.pop();
                let value = self.get_index(&target, &key).map_err(Unwind::Throw)?;
                self.stack.push(value);
            }
            OpCode::SetIndex => {
                let value = self.pop();
                let key = self.pop();
                let target = self.pop();
                self.set_index(&target, &key, value.clone())
                    .map_err(Unwind::Throw)?;
                self.stack.push(value);
            }
            OpCode::Add => self.add(),
            OpCode::Subtract => self.binary_number(|a, b| a - b),
            OpCode::Multiply => self.binary_number(|a, b| a * b),
            OpCode::Divide => self.binary_number(|a, b| a / b),
            OpCode::Modulo => self.binary_number(|a, b| a % b),
            OpCode::BitAnd => self.binary_number(|a, b| f64::from(to_int32(a) & to_int32(b))),
            OpCode::BitOr => self.binary_number(|a, b| f64::from(to_int32(a) | to_int32(b))),
            OpCode::Negate => {
                let n = self.pop().to_number();
                self.stack.push(Value::Number(-n));
            }
            OpCode::ToNumber => {
                let n = self.pop().to_number();
                self.stack.push(Value::Number(n));
            }
            OpCode::Not => {
                let value = self.pop();
                self.stack.push(Value::Bool(!value.is_truthy()));
            }
            OpCode::TypeOf => {
                let value = self.pop();
                let name = self.type_of(&value);
                self.stack.push(Value::from(name));
            }
            OpCode::Equal | OpCode::NotEqual | OpCode::StrictEqual | OpCode::StrictNotEqual => {
                let b = self.pop();
                let a = self.pop();
                let result = match op {
                    OpCode::Equal => a.loose_equals(&b),
                    OpCode::NotEqual => !a.loose_equals(&b),
                    OpCode::StrictEqual => a.strict_equals(&b),
                    _ => !a.strict_equals(&b),
                };
                self.stack.push(Value::Bool(result));
            }
            OpCode::Less => self.compare(|o| o.is_lt()),
            OpCode::LessEqual => self.compare(|o| o.is_le()),
            OpCode::Greater => self.compare(|o| o.is_gt()),
            OpCode::GreaterEqual => self.compare(|o| o.is_ge()),
            OpCode::InstanceOf => {
                let constructor = self.pop();
                let value = self.pop();
                let result = self
                    .instance_of(&value, &constructor)
                    .map_err(Unwind::Throw)?;
                self.stack.push(Value::Bool(result));
            }
            OpCode::Jump => {
                let offset = self.read_u16();
                self.frame_mut().ip += offset;
            }
            OpCode::JumpIfFalse => {
                let offset = self.read_u16();
                if !self.peek(0).is_truthy() {
                    self.frame_mut().ip += offset;
                }
            }
            OpCode::Loop => {
                let offset = self.read_u16();
                self.frame_mut().ip -= offset;
            }
            OpCode::Call | OpCode::New => {
                let argc = self.read_byte() as usize;
                self.call_value(argc, op == OpCode::New)?;
            }
            OpCode::Closure => {
                let Constant::Function(proto) = self.read_constant() else {
                    return Err(Unwind::Fatal(RuntimeError::InvalidOpcode(byte)));
                };
                let mut upvalues = Vec::with_capacity(proto.upvalue_count as usize);
                for _ in 0..proto.upvalue_count {
                    let is_local = self.read_byte() == 1;
                    let index = self.read_byte() as usize;
                    let upvalue = if is_local {
                        let slot = self.frame().base + index;
                        self.capture_upvalue(slot)
                    } else {
                        self.frame().upvalues[index].clone()
                    };
                    upvalues.push(upvalue);
                }
                let closure = self.alloc(
                    ObjectKind::Closure(Closure { proto, upvalues }),
                    self.ctx.prototypes.function,
                );
                self.stack.push(Value::Object(closure));
            }
            OpCode::CloseUpvalue => {
                self.close_upvalues(self.stack.len() - 1);
                self.pop();
            }
            OpCode::Return => {
                let mut result = self.pop();
                let frame = self.frame();
                if frame.construct && result.as_object().is_none() {
                    result = self.stack[frame.base + 1].clone();
                }
                self.pop_frame();
                return Ok(Flow::Return(result));
            }
            OpCode::Array => {
                let array = self.new_array(Vec::new());
                self.stack.push(Value::Object(array));
            }
            OpCode::ArrayPush => {
                let value = self.pop();
                if let Some(r) = self.peek(0).as_object() {
                    if let ObjectKind::Array(items) = &mut self.ctx.heap[r].kind {
                        items.push(value);
                    }
                }
            }
            OpCode::Object => {
                let object = self.new_object();
                self.stack.push(Value::Object(object));
            }
            OpCode::InitProperty => {
                let name = self.read_name();
                let value = self.pop();
                if let Some(r) = self.peek(0).as_object() {
                    self.ctx.heap[r].properties.set(name, value);
                }
            }
            OpCode::Try => {
                let offset = self.read_u16();
                let stack_len = self.stack.len();
                let frame = self.frame_mut();
                let catch_ip = frame.ip + offset;
                frame.handlers.push(Handler {
                    catch_ip,
                    stack_len,
                });
            }
            OpCode::EndTry => {
                self.frame_mut().handlers.pop();
            }
            OpCode::Throw => {
                let value = self.pop();
                return Self::throw(value);
            }
        }
        Ok(Flow::Continue)
    }

}

fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32 as i32
}

pub(crate) fn error_string(name: &str, message: &str) -> String {
    match (name.is_empty(), message.is_empty()) {
        (_, true) => name.to_string(),
        (true, false) => message.to_string(),
        (false, false) => format!("{name}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Value {
        let mut vm = Vm::new();
        vm.interpret(source).expect("script runs")
    }

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(run("return 1 + 2 * 3;"), Value::Number(7.0));
        assert_eq!(run("return 'a' + 1;"), Value::from("a1"));
        assert_eq!(run("return 7 % 4 | 8;"), Value::Number(11.0));
        assert_eq!(run("return -5 & 0xff;"), Value::Number(251.0));
    }

    #[test]
    fn postfix_and_compound_updates() {
        assert_eq!(run("var i = 1; var j = i++; return j * 10 + i;"), Value::Number(12.0));
        assert_eq!(run("var o = {n: 5}; var old = o.n--; return old * 10 + o.n;"), Value::Number(54.0));
        assert_eq!(run("var a = [1]; a[0] += 4; return a[0];"), Value::Number(5.0));
    }

    #[test]
    fn invalid_opcode_is_fatal() {
        let mut vm = Vm::new();
        let mut proto = FunctionProto::default();
        proto.chunk.write(0xfe, 1);
        let err = vm.execute(Rc::new(proto), Value::Undefined).unwrap_err();
        assert_eq!(err, JsError::Runtime(RuntimeError::InvalidOpcode(0xfe)));
    }

    #[test]
    fn int32_conversion_wraps() {
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_int32(f64::NAN), 0);
    }

    #[test]
    fn vm_is_usable_after_an_uncaught_error() {
        let mut vm = Vm::new();
        assert!(vm.interpret("function f() { throw 1; } f();").is_err());
        assert_eq!(vm.interpret("return 2;").expect("runs"), Value::Number(2.0));
    }
}
