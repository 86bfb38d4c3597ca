//! # Per-runtime heap.
//!
//! A slab of boxed composite values referenced from operand stacks and locals
//! by [`HeapRef`]. Every cell is owned by the frame that allocated it; when the
//! frame returns its cells are released, except the returned cell, which is
//! handed over to the caller frame.

use crate::actor::{Message, Template};

/// Index of a heap cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeapRef(u32);

/// Heap cell contents.
#[derive(Clone, Debug)]
pub enum HeapObject {
    Str(String),
    Msg(Message),
    Template(Template),
}

#[derive(Debug, Default)]
pub struct Heap {
    cells: Vec<Option<HeapObject>>,
    free: Vec<u32>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, obj: HeapObject) -> HeapRef {
        match self.free.pop() {
            Some(i) => {
                self.cells[i as usize] = Some(obj);
                HeapRef(i)
            }
            None => {
                self.cells.push(Some(obj));
                HeapRef((self.cells.len() - 1) as u32)
            }
        }
    }

    pub fn get(&self, r: HeapRef) -> Option<&HeapObject> {
        self.cells.get(r.0 as usize).and_then(Option::as_ref)
    }

    /// Frees a cell; releasing an already free cell is a no-op.
    pub fn release(&mut self, r: HeapRef) {
        let freed = self
            .cells
            .get_mut(r.0 as usize)
            .is_some_and(|cell| cell.take().is_some());
        if freed {
            self.free.push(r.0);
        }
    }

    /// Number of live cells.
    pub fn live(&self) -> usize {
        self.cells.len() - self.free.len()
    }
}
