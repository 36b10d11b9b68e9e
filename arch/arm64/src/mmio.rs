// =============================================================================
// Pulse - Memory-Mapped Register Access
// =============================================================================
// Typed handles for 32-bit device registers. Every access is volatile so the
// compiler never merges, reorders or elides it.
// =============================================================================

use core::ptr;

/// A single 32-bit memory-mapped register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reg32 {
    addr: usize,
}

impl Reg32 {
    /// Create a handle for the register at `addr`.
    ///
    /// # Safety
    /// `addr` must be the 4-byte aligned address of a device register (or of
    /// memory standing in for one) that stays valid for the handle's use.
    pub const unsafe fn new(addr: usize) -> Self {
        Self { addr }
    }

    /// Volatile read.
    #[inline]
    pub fn read(self) -> u32 {
        // SAFETY: validity of the address was promised in `new`
        unsafe { ptr::read_volatile(self.addr as *const u32) }
    }

    /// Volatile write.
    #[inline]
    pub fn write(self, value: u32) {
        // SAFETY: validity of the address was promised in `new`
        unsafe { ptr::write_volatile(self.addr as *mut u32, value) }
    }

    /// Read-modify-write. Not atomic with respect to the device.
    #[inline]
    pub fn modify(self, f: impl FnOnce(u32) -> u32) {
        self.write(f(self.read()));
    }
}

/// A contiguous block of registers addressed by byte offset from a base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterBlock {
    base: usize,
}

impl RegisterBlock {
    /// # Safety
    /// `base` must point at the register block of the device the caller
    /// intends to drive, and every offset later passed to [`reg`](Self::reg)
    /// must lie inside it.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Handle for the register at `offset` bytes from the base.
    #[inline]
    pub fn reg(self, offset: usize) -> Reg32 {
        // SAFETY: the block's constructor covers every offset inside it
        unsafe { Reg32::new(self.base + offset) }
    }
}

// =============================================================================
// Fake register file for host tests
// =============================================================================

#[cfg(test)]
pub(crate) mod fake {
    use super::RegisterBlock;

    /// Heap memory that stands in for a device register window.
    pub struct FakeRegisters {
        words: Box<[u32]>,
    }

    impl FakeRegisters {
        pub fn new(size_bytes: usize) -> Self {
            Self { words: vec![0u32; size_bytes / 4].into_boxed_slice() }
        }

        /// Address the fake window starts at.
        pub fn base(&self) -> usize {
            self.words.as_ptr() as usize
        }

        pub fn block(&self) -> RegisterBlock {
            // SAFETY: the block only ever touches offsets inside `words`
            unsafe { RegisterBlock::new(self.base()) }
        }

        pub fn get(&self, offset: usize) -> u32 {
            self.block().reg(offset).read()
        }

        pub fn set(&self, offset: usize, value: u32) {
            self.block().reg(offset).write(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeRegisters;

    #[test]
    fn write_then_read_hits_the_same_word() {
        let regs = FakeRegisters::new(0x40);
        let block = regs.block();
        block.reg(0x08).write(0xDEAD_BEEF);
        assert_eq!(regs.get(0x08), 0xDEAD_BEEF);
        assert_eq!(regs.get(0x04), 0);
        assert_eq!(regs.get(0x0C), 0);
    }

    #[test]
    fn modify_preserves_other_bits() {
        let regs = FakeRegisters::new(0x10);
        regs.set(0x4, 0b1010);
        regs.block().reg(0x4).modify(|v| v | 0b0001);
        assert_eq!(regs.get(0x4), 0b1011);
    }
}
