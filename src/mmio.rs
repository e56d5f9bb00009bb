//! Register window access
//!
//! Every driver in this crate talks to its hardware through a
//! [`RegisterWindow`]: 32-bit reads and writes at byte offsets from the start
//! of the block. On the calculator that is a volatile pointer into the
//! ioremapped region ([`MmioWindow`]); in tests it is one of the register
//! models in [`crate::sim`].

use std::ptr;
use std::sync::Arc;

/// Read/write access to a block of 32-bit memory-mapped registers.
pub trait RegisterWindow {
    /// Read the register at byte `offset`
    fn read32(&self, offset: usize) -> u32;

    /// Write the register at byte `offset`
    fn write32(&self, offset: usize, value: u32);

    /// Copy consecutive 16-bit registers starting at `offset` into `buf`.
    ///
    /// Halfwords are packed two per 32-bit word, low half first. `offset`
    /// must be halfword aligned.
    fn read16_burst(&self, offset: usize, buf: &mut [u16]) {
        let mut i = 0;
        while i < buf.len() {
            let byte = offset + i * 2;
            let word = self.read32(byte & !3);
            if byte & 2 == 0 {
                buf[i] = word as u16;
                if i + 1 < buf.len() {
                    buf[i + 1] = (word >> 16) as u16;
                }
                i += 2;
            } else {
                buf[i] = (word >> 16) as u16;
                i += 1;
            }
        }
    }
}

impl<T: RegisterWindow + ?Sized> RegisterWindow for &T {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }

    fn read16_burst(&self, offset: usize, buf: &mut [u16]) {
        (**self).read16_burst(offset, buf)
    }
}

impl<T: RegisterWindow + ?Sized> RegisterWindow for Arc<T> {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }

    fn read16_burst(&self, offset: usize, buf: &mut [u16]) {
        (**self).read16_burst(offset, buf)
    }
}

/// Volatile access to a mapped register block.
#[derive(Debug)]
pub struct MmioWindow {
    base: *mut u32,
    len: usize,
}

// The window is a plain address; synchronisation is the owning driver's job.
unsafe impl Send for MmioWindow {}
unsafe impl Sync for MmioWindow {}

impl MmioWindow {
    /// Wrap a mapped register block.
    ///
    /// # Safety
    ///
    /// `base` must point to `len` bytes of device memory that stay mapped for
    /// the lifetime of the window, and `base` must be 4-byte aligned.
    pub const unsafe fn new(base: *mut u32, len: usize) -> Self {
        Self { base, len }
    }

    /// Size of the window in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn reg(&self, offset: usize) -> *mut u32 {
        debug_assert!(offset % 4 == 0, "unaligned register offset {:#x}", offset);
        debug_assert!(offset + 4 <= self.len, "register offset {:#x} out of window", offset);
        self.base.wrapping_byte_add(offset)
    }
}

impl RegisterWindow for MmioWindow {
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: `new` guarantees the block is mapped and aligned.
        unsafe { ptr::read_volatile(self.reg(offset)) }
    }

    fn write32(&self, offset: usize, value: u32) {
        // SAFETY: `new` guarantees the block is mapped and aligned.
        unsafe { ptr::write_volatile(self.reg(offset), value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mmio_window_over_ram() {
        let mut backing = [0u32; 4];
        let window = unsafe { MmioWindow::new(backing.as_mut_ptr(), 16) };

        window.write32(0x8, 0xDEAD_BEEF);
        assert_eq!(window.read32(0x8), 0xDEAD_BEEF);
        assert_eq!(window.read32(0x0), 0);
        assert_eq!(window.len(), 16);
    }

    #[test]
    fn test_read16_burst_packing() {
        let mut backing = [0x2222_1111u32, 0x4444_3333, 0, 0];
        let window = unsafe { MmioWindow::new(backing.as_mut_ptr(), 16) };

        let mut rows = [0u16; 4];
        window.read16_burst(0, &mut rows);
        assert_eq!(rows, [0x1111, 0x2222, 0x3333, 0x4444]);
    }

    #[test]
    fn test_read16_burst_odd_start() {
        let mut backing = [0x2222_1111u32, 0x4444_3333, 0, 0];
        let window = unsafe { MmioWindow::new(backing.as_mut_ptr(), 16) };

        let mut rows = [0u16; 3];
        window.read16_burst(2, &mut rows);
        assert_eq!(rows, [0x2222, 0x3333, 0x4444]);
    }

    #[test]
    fn test_window_through_arc() {
        let mut backing = [0u32; 2];
        let window = Arc::new(unsafe { MmioWindow::new(backing.as_mut_ptr(), 8) });
        let shared = Arc::clone(&window);

        shared.write32(0x4, 7);
        assert_eq!(window.read32(0x4), 7);
    }
}
