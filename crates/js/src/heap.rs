//! Garbage-collected object heap.
//!
//! Objects live in an arena of slots addressed by [`HeapRef`]; freed slots go
//! on a free list and are reused. Collection is mark-and-sweep with
//! tri-color marking: roots start grey, a worklist scans grey cells and turns
//! them black, and every cell still white afterwards is freed. The worklist
//! keeps marking iterative, so deep object graphs cannot overflow the Rust
//! stack.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

use crate::chunk::FunctionProto;
use crate::value::Value;
use crate::vm::Vm;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapRef(u32);

impl HeapRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Host function callable from scripts: `(vm, this, args)`. `Err` carries a
/// thrown script value.
///
/// Natives must not keep `HeapRef`s in their captured state; the collector
/// cannot see them.
pub type NativeFn = Rc<dyn Fn(&mut Vm, &Value, &[Value]) -> Result<Value, Value>>;

#[derive(Clone)]
pub struct Native {
    pub name: Rc<str>,
    pub func: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native {}>", self.name)
    }
}

/// A captured variable: a live stack slot until its frame returns, then a
/// value of its own.
#[derive(Clone, Debug, PartialEq)]
pub enum Upvalue {
    Open(usize),
    Closed(Value),
}

#[derive(Clone, Debug)]
pub struct Closure {
    pub proto: Rc<FunctionProto>,
    pub upvalues: Vec<Rc<RefCell<Upvalue>>>,
}

#[derive(Clone, Debug)]
pub enum ObjectKind {
    Ordinary,
    Array(Vec<Value>),
    Closure(Closure),
    Native(Native),
    /// Milliseconds since the Unix epoch.
    Date(f64),
    /// Opaque handle owned by the embedder (a DOM node id, for example).
    Host(u64),
}

/// Own properties in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Properties(Vec<(Rc<str>, Value)>);

impl Properties {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| &**k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: impl Into<Rc<str>>, value: Value) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &Rc<str>> {
        self.0.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Object {
    pub kind: ObjectKind,
    pub properties: Properties,
    pub prototype: Option<HeapRef>,
}

impl Object {
    pub fn new(kind: ObjectKind, prototype: Option<HeapRef>) -> Self {
        Self {
            kind,
            properties: Properties::default(),
            prototype,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Closure(_) | ObjectKind::Native(_))
    }

    fn trace(&self, visit: &mut impl FnMut(HeapRef)) {
        if let Some(proto) = self.prototype {
            visit(proto);
        }
        for value in self.properties.values() {
            if let Some(r) = value.as_object() {
                visit(r);
            }
        }
        match &self.kind {
            ObjectKind::Array(items) => {
                for r in items.iter().filter_map(Value::as_object) {
                    visit(r);
                }
            }
            ObjectKind::Closure(closure) => {
                for upvalue in &closure.upvalues {
                    // Open upvalues point into the stack, which is a root.
                    if let Upvalue::Closed(Value::Object(r)) = &*upvalue.borrow() {
                        visit(*r);
                    }
                }
            }
            ObjectKind::Ordinary
            | ObjectKind::Native(_)
            | ObjectKind::Date(_)
            | ObjectKind::Host(_) => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

pub struct Heap {
    cells: Vec<Option<Object>>,
    free: Vec<u32>,
    live: usize,
    allocated_since_gc: usize,
    threshold: usize,
}

impl Heap {
    /// `threshold`: allocations between automatic collections.
    pub fn new(threshold: usize) -> Self {
        Self {
            cells: Vec::new(),
            free: Vec::new(),
            live: 0,
            allocated_since_gc: 0,
            threshold: threshold.max(1),
        }
    }

    pub fn alloc(&mut self, object: Object) -> HeapRef {
        self.live += 1;
        self.allocated_since_gc += 1;
        match self.free.pop() {
            Some(slot) => {
                self.cells[slot as usize] = Some(object);
                HeapRef(slot)
            }
            None => {
                self.cells.push(Some(object));
                HeapRef((self.cells.len() - 1) as u32)
            }
        }
    }

    /// Number of cells currently allocated.
    pub fn live_cells(&self) -> usize {
        self.live
    }

    pub fn should_collect(&self) -> bool {
        self.allocated_since_gc >= self.threshold
    }

    pub fn get(&self, r: HeapRef) -> Option<&Object> {
        self.cells.get(r.index())?.as_ref()
    }

    pub fn get_mut(&mut self, r: HeapRef) -> Option<&mut Object> {
        self.cells.get_mut(r.index())?.as_mut()
    }

    /// Frees every cell not reachable from `roots`. Returns the number freed.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = HeapRef>) -> usize {
        let mut colors = vec![Color::White; self.cells.len()];
        let mut grey: Vec<HeapRef> = Vec::new();

        let shade = |r: HeapRef, colors: &mut Vec<Color>, grey: &mut Vec<HeapRef>| {
            if let Some(color) = colors.get_mut(r.index()) {
                if *color == Color::White {
                    *color = Color::Grey;
                    grey.push(r);
                }
            }
        };
        for root in roots {
            shade(root, &mut colors, &mut grey);
        }
        while let Some(r) = grey.pop() {
            if let Some(object) = self.get(r) {
                object.trace(&mut |child| shade(child, &mut colors, &mut grey));
            }
            colors[r.index()] = Color::Black;
        }

        let mut freed = 0;
        for (slot, color) in colors.iter().enumerate() {
            if *color == Color::White && self.cells[slot].is_some() {
                self.cells[slot] = None;
                self.free.push(slot as u32);
                freed += 1;
            }
        }
        self.live -= freed;
        self.allocated_since_gc = 0;
        freed
    }
}

impl Index<HeapRef> for Heap {
    type Output = Object;

    fn index(&self, r: HeapRef) -> &Object {
        match self.get(r) {
            Some(object) => object,
            None => panic!("use of collected heap cell {r:?}"),
        }
    }
}

impl IndexMut<HeapRef> for Heap {
    fn index_mut(&mut self, r: HeapRef) -> &mut Object {
        match self.get_mut(r) {
            Some(object) => object,
            None => panic!("use of collected heap cell {r:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(heap: &mut Heap) -> HeapRef {
        heap.alloc(Object::new(ObjectKind::Ordinary, None))
    }

    #[test]
    fn unreachable_cycles_are_freed() {
        let mut heap = Heap::new(100);
        let root = object(&mut heap);
        let a = object(&mut heap);
        let b = object(&mut heap);
        heap[a].properties.set("b", Value::Object(b));
        heap[b].properties.set("a", Value::Object(a));
        heap[root].properties.set("a", Value::Object(a));

        assert_eq!(heap.collect([root]), 0);
        heap[root].properties.set("a", Value::Null);
        assert_eq!(heap.collect([root]), 2);
        assert_eq!(heap.live_cells(), 1);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut heap = Heap::new(100);
        let a = object(&mut heap);
        heap.collect([]);
        assert!(heap.get(a).is_none());
        let b = object(&mut heap);
        assert_eq!(a, b);
    }

    #[test]
    fn deep_chains_mark_iteratively() {
        let mut heap = Heap::new(usize::MAX);
        let root = object(&mut heap);
        let mut tail = root;
        for _ in 0..100_000 {
            let next = object(&mut heap);
            heap[tail].properties.set("next", Value::Object(next));
            tail = next;
        }
        assert_eq!(heap.collect([root]), 0);
        assert_eq!(heap.live_cells(), 100_001);
    }

    #[test]
    fn closed_upvalues_keep_their_values_alive() {
        let mut heap = Heap::new(100);
        let captured = object(&mut heap);
        let closure = heap.alloc(Object::new(
            ObjectKind::Closure(Closure {
                proto: Rc::new(FunctionProto::default()),
                upvalues: vec![Rc::new(RefCell::new(Upvalue::Closed(Value::Object(captured))))],
            }),
            None,
        ));
        assert_eq!(heap.collect([closure]), 0);
        assert_eq!(heap.collect([]), 2);
    }
}
