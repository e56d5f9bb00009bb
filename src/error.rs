//! Error type shared by the drivers in this crate

use thiserror::Error;

/// Errors reported by driver setup and interrupt bookkeeping.
///
/// Nothing on the interrupt fast path returns these; the exception loop and
/// the scan handler log and carry on instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Inter-scan delay does not fit the 16-bit scan-mode field
    #[error("scan delay of {cycles} cycles overflows the 16-bit field (max {max})")]
    ScanDelayOverflow { cycles: u64, max: u64 },
    /// Inter-row delay does not fit the 14-bit scan-mode field
    #[error("row delay of {cycles} cycles overflows the 14-bit field (max {max})")]
    RowDelayOverflow { cycles: u64, max: u64 },
    /// Hardware line outside the controller's 64 lines
    #[error("hardware irq {0} out of range")]
    InvalidHwIrq(u32),
    /// Logical irq has no descriptor
    #[error("irq {0} is not mapped")]
    NotMapped(u32),
    /// A handler is already bound to this logical irq
    #[error("irq {0} already has a handler")]
    AlreadyRequested(u32),
    /// Tried to free a logical irq that has no handler
    #[error("irq {0} has no handler to free")]
    NotRequested(u32),
    /// The descriptor table has no free logical numbers left
    #[error("no free irq descriptors")]
    DomainFull,
    /// Controller was already initialised
    #[error("interrupt controller already initialised")]
    AlreadyInitialized,
    /// Interrupt specifier had the wrong number of cells
    #[error("bad interrupt specifier: expected 1 cell, got {0}")]
    BadSpecifier(usize),
}

pub type Result<T> = core::result::Result<T, Error>;
