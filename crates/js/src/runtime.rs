//! Per-engine state: the heap, the global object and the built-in
//! prototypes. One context belongs to one [`Vm`](crate::Vm); nothing here is
//! process-wide.

use crate::heap::{Heap, HeapRef, Object, ObjectKind};

/// Built-in prototype objects. Instances delegate unresolved lookups to
/// these.
#[derive(Clone, Copy, Debug)]
pub struct Prototypes {
    pub object: HeapRef,
    pub function: HeapRef,
    pub array: HeapRef,
    pub string: HeapRef,
    pub error: HeapRef,
    pub type_error: HeapRef,
    pub reference_error: HeapRef,
    pub date: HeapRef,
}

pub struct RuntimeContext {
    pub heap: Heap,
    pub global: HeapRef,
    pub prototypes: Prototypes,
}

impl RuntimeContext {
    pub fn new(gc_threshold: usize) -> Self {
        let mut heap = Heap::new(gc_threshold);
        let ordinary = |heap: &mut Heap, proto: Option<HeapRef>| {
            heap.alloc(Object::new(ObjectKind::Ordinary, proto))
        };
        let object = ordinary(&mut heap, None);
        let function = ordinary(&mut heap, Some(object));
        let array = heap.alloc(Object::new(ObjectKind::Array(Vec::new()), Some(object)));
        let string = ordinary(&mut heap, Some(object));
        let error = ordinary(&mut heap, Some(object));
        let type_error = ordinary(&mut heap, Some(error));
        let reference_error = ordinary(&mut heap, Some(error));
        let date = ordinary(&mut heap, Some(object));
        let global = ordinary(&mut heap, None);

        Self {
            heap,
            global,
            prototypes: Prototypes {
                object,
                function,
                array,
                string,
                error,
                type_error,
                reference_error,
                date,
            },
        }
    }

    /// Allocates an object with `proto` as its prototype.
    pub fn alloc(&mut self, kind: ObjectKind, proto: HeapRef) -> HeapRef {
        self.heap.alloc(Object::new(kind, Some(proto)))
    }

    /// Cells that stay alive regardless of what scripts hold.
    pub fn roots(&self) -> impl Iterator<Item = HeapRef> + '_ {
        let p = &self.prototypes;
        [
            self.global,
            p.object,
            p.function,
            p.array,
            p.string,
            p.error,
            p.type_error,
            p.reference_error,
            p.date,
        ]
        .into_iter()
    }

    /// Whether `proto` appears on `object`'s prototype chain.
    pub fn inherits(&self, object: HeapRef, proto: HeapRef) -> bool {
        let mut current = self.heap.get(object).and_then(|o| o.prototype);
        while let Some(r) = current {
            if r == proto {
                return true;
            }
            current = self.heap.get(r).and_then(|o| o.prototype);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_prototypes_chain_to_error() {
        let ctx = RuntimeContext::new(64);
        let p = ctx.prototypes;
        assert!(ctx.inherits(p.type_error, p.error));
        assert!(ctx.inherits(p.type_error, p.object));
        assert!(!ctx.inherits(p.array, p.error));
    }

    #[test]
    fn roots_survive_collection() {
        let mut ctx = RuntimeContext::new(64);
        let before = ctx.heap.live_cells();
        let roots: Vec<HeapRef> = ctx.roots().collect();
        assert_eq!(ctx.heap.collect(roots), 0);
        assert_eq!(ctx.heap.live_cells(), before);
    }
}
