use alloc::vec;
use alloc::vec::Vec;
use wasmbox_core::{Trap, TrapCode};
use wasmbox_ir::FuncIdx;

use crate::module::TableType;

/// A module's table instance: a fixed-size array of optional function
/// references, populated by element segments at instantiation and read by
/// `call_indirect`.
///
/// The MVP restricts tables to `funcref`; this interpreter doesn't expose any
/// table opcode besides the indirect-call lookup (`table.get`/`set`/`grow`
/// are out of scope).
#[derive(Debug)]
pub struct Table {
    elems: Vec<Option<FuncIdx>>,
}

impl Table {
    pub fn new(ty: &TableType) -> Self {
        Self { elems: vec![None; ty.limits.min as usize] }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Writes an element segment's function indices starting at `offset`.
    pub fn init_elements(&mut self, offset: u32, funcs: &[FuncIdx]) -> Result<(), Trap> {
        let start = offset as usize;
        let end = start.checked_add(funcs.len()).ok_or(Trap::new(TrapCode::TableOutOfBounds))?;
        if end > self.elems.len() {
            return Err(Trap::new(TrapCode::TableOutOfBounds));
        }
        for (slot, func) in self.elems[start..end].iter_mut().zip(funcs) {
            *slot = Some(*func);
        }
        Ok(())
    }

    /// Resolves a `call_indirect`'s table index to a function, trapping on an
    /// out-of-bounds index or an unpopulated (`null`) slot.
    pub fn get(&self, index: u32) -> Result<FuncIdx, Trap> {
        self.elems
            .get(index as usize)
            .ok_or(Trap::new(TrapCode::TableOutOfBounds))?
            .ok_or(Trap::new(TrapCode::IndirectCallToNull))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Limits;

    fn table(min: u32) -> Table {
        Table::new(&TableType { element: wasmbox_core::ValueType::FuncRef, limits: Limits { min, max: None } })
    }

    #[test]
    fn starts_all_null() {
        let t = table(3);
        assert_eq!(t.get(0).unwrap_err().code(), TrapCode::IndirectCallToNull);
    }

    #[test]
    fn init_elements_populates_the_requested_range() {
        let mut t = table(3);
        t.init_elements(1, &[FuncIdx::new(5), FuncIdx::new(6)]).unwrap();
        assert_eq!(t.get(1).unwrap(), FuncIdx::new(5));
        assert_eq!(t.get(2).unwrap(), FuncIdx::new(6));
        assert_eq!(t.get(0).unwrap_err().code(), TrapCode::IndirectCallToNull);
    }

    #[test]
    fn out_of_bounds_index_traps() {
        let t = table(2);
        assert_eq!(t.get(5).unwrap_err().code(), TrapCode::TableOutOfBounds);
    }
}
