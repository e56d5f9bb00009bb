//! Interrupt handling
//!
//! Three layers, bottom up:
//! - `zevio`: the TI-NSPIRE classic interrupt controller (two banks, IRQ and
//!   FIQ, 32 lines each) and its exception entry loop
//! - `domain`: hardware line number to logical irq number translation
//! - `desc`: logical irq descriptors, handler binding and level flow
//!
//! Hardware line numbers (`hwirq`) cover both banks: 0-31 are IRQ bank lines,
//! 32-63 are FIQ bank lines. Logical irq numbers (`virq`) start at 1; 0 is
//! never a valid logical irq.

pub mod desc;
pub mod domain;
pub mod zevio;

pub use desc::{FlowHandler, IrqDesc, IrqDescs, IrqFlags, IrqStats};
pub use domain::IrqDomain;
pub use zevio::{ZevioConfig, ZevioIntc};

/// Lines per bank
pub const MAX_INTRS: u32 = 32;
/// First hardware line number belonging to the FIQ bank
pub const FIQ_START: u32 = MAX_INTRS;
/// Hardware lines across both banks
pub const NR_HWIRQS: u32 = 2 * MAX_INTRS;

/// One of the controller's two register banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bank {
    /// Normal interrupt bank (register offset 0x000)
    Irq,
    /// Fast interrupt bank (register offset 0x100)
    Fiq,
}

impl Bank {
    pub const ALL: [Bank; 2] = [Bank::Irq, Bank::Fiq];

    /// Byte offset of this bank's registers from the controller base
    pub fn offset(self) -> usize {
        match self {
            Bank::Irq => 0x000,
            Bank::Fiq => 0x100,
        }
    }

    /// Position of this bank in per-bank arrays
    pub fn index(self) -> usize {
        match self {
            Bank::Irq => 0,
            Bank::Fiq => 1,
        }
    }

    /// Hardware line number of `line` within this bank
    pub fn hwirq(self, line: u32) -> u32 {
        match self {
            Bank::Irq => line,
            Bank::Fiq => FIQ_START + line,
        }
    }

    /// Split a hardware line number into bank and line
    pub fn from_hwirq(hwirq: u32) -> Option<(Bank, u32)> {
        if hwirq < FIQ_START {
            Some((Bank::Irq, hwirq))
        } else if hwirq < NR_HWIRQS {
            Some((Bank::Fiq, hwirq - FIQ_START))
        } else {
            None
        }
    }
}

/// What a handler did with an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// Not ours (shared line, nothing pending in the device)
    None,
    /// Serviced
    Handled,
}

/// Chip-level callbacks on a hardware line.
pub trait IrqChip: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pop the line's bank off the controller's priority stack
    fn ack(&self, hwirq: u32);

    /// Stop the line from asserting bank status
    fn mask(&self, hwirq: u32);

    /// Let the line assert bank status again
    fn unmask(&self, hwirq: u32);
}

/// Delivers a logical irq to whatever is bound to it.
pub trait IrqDispatch {
    fn dispatch(&self, virq: u32) -> IrqReturn;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_offsets() {
        assert_eq!(Bank::Irq.offset(), 0x000);
        assert_eq!(Bank::Fiq.offset(), 0x100);
    }

    #[test]
    fn test_hwirq_split() {
        assert_eq!(Bank::from_hwirq(0), Some((Bank::Irq, 0)));
        assert_eq!(Bank::from_hwirq(31), Some((Bank::Irq, 31)));
        assert_eq!(Bank::from_hwirq(32), Some((Bank::Fiq, 0)));
        assert_eq!(Bank::from_hwirq(63), Some((Bank::Fiq, 31)));
        assert_eq!(Bank::from_hwirq(64), None);
    }

    #[test]
    fn test_hwirq_roundtrip_fiq() {
        let hwirq = Bank::Fiq.hwirq(5);
        assert_eq!(hwirq, 37);
        assert_eq!(Bank::from_hwirq(hwirq), Some((Bank::Fiq, 5)));
    }
}
