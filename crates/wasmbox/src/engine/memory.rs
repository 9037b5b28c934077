use alloc::vec;
use alloc::vec::Vec;
use wasmbox_core::{Trap, TrapCode, WASM_PAGE_SIZE};

use crate::module::MemoryType;

/// The absolute cap the Wasm MVP binary format itself imposes on a linear
/// memory: a 32-bit address space divided into 64KiB pages.
const ABSOLUTE_MAX_PAGES: u32 = 1 << 16;

/// A module's single linear memory instance.
///
/// Every memory opcode re-reads this through `&self`/`&mut self` rather than
/// a pointer captured once at dispatch start, so a `memory.grow` is visible
/// to the very next access without any explicit cache-invalidation step.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
    max_pages: u32,
}

impl Memory {
    pub fn new(ty: &MemoryType) -> Self {
        let max_pages = ty.limits.max.unwrap_or(ABSOLUTE_MAX_PAGES).min(ABSOLUTE_MAX_PAGES);
        let size = ty.limits.min as usize * WASM_PAGE_SIZE as usize;
        Self { data: vec![0; size], max_pages }
    }

    pub fn size_pages(&self) -> u32 {
        (self.data.len() / WASM_PAGE_SIZE as usize) as u32
    }

    /// Implements `memory.grow`: returns the previous page count on success,
    /// or the current (unchanged) page count if growing by `delta` pages
    /// would exceed this memory's declared maximum.
    pub fn grow(&mut self, delta: u32) -> u32 {
        let current = self.size_pages();
        let Some(target) = current.checked_add(delta) else {
            return current;
        };
        if target > self.max_pages {
            return current;
        }
        self.data.resize(target as usize * WASM_PAGE_SIZE as usize, 0);
        current
    }

    fn bounds_check(&self, offset: u32, len: usize) -> Result<usize, Trap> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(Trap::new(TrapCode::MemoryOutOfBounds))?;
        if end > self.data.len() {
            return Err(Trap::new(TrapCode::MemoryOutOfBounds));
        }
        Ok(start)
    }

    pub fn read(&self, offset: u32, buf: &mut [u8]) -> Result<(), Trap> {
        let start = self.bounds_check(offset, buf.len())?;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    pub fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Trap> {
        let start = self.bounds_check(offset, bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Copies a data segment's bytes in at instantiation time. Distinct from
    /// [`Memory::write`] only in spirit: an out-of-bounds active data segment
    /// is a load-time failure, not a runtime trap, but both surface as
    /// [`TrapCode::MemoryOutOfBounds`] since nothing downstream distinguishes
    /// them.
    pub fn init_data(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Trap> {
        self.write(offset, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Limits;

    fn mem(min: u32, max: Option<u32>) -> Memory {
        Memory::new(&MemoryType { limits: Limits { min, max } })
    }

    #[test]
    fn starts_zeroed_at_declared_page_count() {
        let m = mem(2, None);
        assert_eq!(m.size_pages(), 2);
        assert_eq!(m.data.len(), 2 * WASM_PAGE_SIZE as usize);
    }

    #[test]
    fn grow_returns_previous_size_and_extends() {
        let mut m = mem(1, Some(4));
        assert_eq!(m.grow(2), 1);
        assert_eq!(m.size_pages(), 3);
    }

    #[test]
    fn grow_past_max_fails_without_mutating() {
        let mut m = mem(1, Some(2));
        assert_eq!(m.grow(5), 1);
        assert_eq!(m.size_pages(), 1);
    }

    #[test]
    fn out_of_bounds_access_traps() {
        let m = mem(1, None);
        let mut buf = [0u8; 4];
        assert_eq!(
            m.read(WASM_PAGE_SIZE - 2, &mut buf).unwrap_err().code(),
            TrapCode::MemoryOutOfBounds
        );
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut m = mem(1, None);
        m.write(10, &[1, 2, 3, 4]).unwrap();
        let mut buf = [0u8; 4];
        m.read(10, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }
}
