//! Zevio interrupt controller model
//!
//! Each bank keeps:
//! - `raw`: source lines currently asserted
//! - `latched`: lines that have been seen asserted while enabled and not yet
//!   retired
//! - `enabled`: enable mask
//! - a priority stack of lines handed out through the current number register
//!
//! A latched line retires when its source is low and it is not on the stack:
//! either the source drops while the line is idle, or the acknowledge read
//! pops it after the source already dropped. Status reads `latched & enabled`.

use std::sync::Mutex;

use crate::irq::zevio::{
    IO_ACK, IO_CURRENT, IO_DISABLE, IO_ENABLE, IO_INVERT_SEL, IO_MAX_PRIORITY,
    IO_PRIORITY_RESET, IO_PRIORITY_SEL, IO_RAW_STATUS, IO_STATUS, IO_STICKY_SEL,
};
use crate::irq::{Bank, MAX_INTRS};
use crate::mmio::RegisterWindow;

#[derive(Debug, Clone, Default)]
struct BankState {
    raw: u32,
    latched: u32,
    enabled: u32,
    /// Lines handed out by the current number register, innermost last
    in_service: Vec<u32>,
    max_priority: u32,
    /// Value last written to priority reset
    priority: u32,
    priority_resets: u32,
    ack_reads: u32,
}

impl BankState {
    fn status(&self) -> u32 {
        self.latched & self.enabled
    }

    fn is_in_service(&self, line: u32) -> bool {
        self.in_service.contains(&line)
    }

    fn assert(&mut self, bit: u32) {
        self.raw |= bit;
        self.latched |= bit & self.enabled;
    }

    fn deassert(&mut self, line: u32) {
        let bit = 1 << line;
        self.raw &= !bit;
        if !self.is_in_service(line) {
            self.latched &= !bit;
        }
    }

    fn current(&mut self) -> u32 {
        let status = self.status();
        if status == 0 {
            return 0;
        }
        let line = status.trailing_zeros();
        self.in_service.push(line);
        line
    }

    fn acknowledge(&mut self) -> u32 {
        self.ack_reads += 1;
        if let Some(line) = self.in_service.pop() {
            if self.raw & (1 << line) == 0 {
                self.latched &= !(1 << line);
            }
        }
        self.priority
    }
}

#[derive(Debug, Clone, Default)]
struct ZevioState {
    banks: [BankState; 2],
    invert_sel: u32,
    sticky_sel: u32,
    priorities: [u32; MAX_INTRS as usize],
}

/// Register-level model of the zevio interrupt controller
#[derive(Debug, Default)]
pub struct SimZevio {
    state: Mutex<ZevioState>,
}

impl SimZevio {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut ZevioState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Drive a source line high
    pub fn assert_line(&self, bank: Bank, line: u32) {
        self.with(|s| s.banks[bank.index()].assert(1 << line));
    }

    /// Drive a source line low
    pub fn deassert(&self, bank: Bank, line: u32) {
        self.with(|s| s.banks[bank.index()].deassert(line));
    }

    pub fn set_line(&self, bank: Bank, line: u32, level: bool) {
        if level {
            self.assert_line(bank, line);
        } else {
            self.deassert(bank, line);
        }
    }

    pub fn status(&self, bank: Bank) -> u32 {
        self.with(|s| s.banks[bank.index()].status())
    }

    pub fn raw(&self, bank: Bank) -> u32 {
        self.with(|s| s.banks[bank.index()].raw)
    }

    pub fn enabled(&self, bank: Bank) -> u32 {
        self.with(|s| s.banks[bank.index()].enabled)
    }

    pub fn max_priority(&self, bank: Bank) -> u32 {
        self.with(|s| s.banks[bank.index()].max_priority)
    }

    /// Lines taken through the current number register and not yet acked
    pub fn in_service_depth(&self, bank: Bank) -> usize {
        self.with(|s| s.banks[bank.index()].in_service.len())
    }

    pub fn priority_resets(&self, bank: Bank) -> u32 {
        self.with(|s| s.banks[bank.index()].priority_resets)
    }

    pub fn ack_reads(&self, bank: Bank) -> u32 {
        self.with(|s| s.banks[bank.index()].ack_reads)
    }

    pub fn invert_select(&self) -> u32 {
        self.with(|s| s.invert_sel)
    }

    pub fn sticky_select(&self) -> u32 {
        self.with(|s| s.sticky_sel)
    }

    pub fn line_priority(&self, line: u32) -> u32 {
        self.with(|s| s.priorities[line as usize % MAX_INTRS as usize])
    }

    fn bank_of(offset: usize) -> Option<(usize, usize)> {
        match offset {
            0x000..=0x0FF => Some((0, offset)),
            0x100..=0x1FF => Some((1, offset - 0x100)),
            _ => None,
        }
    }
}

impl RegisterWindow for SimZevio {
    fn read32(&self, offset: usize) -> u32 {
        self.with(|s| {
            if let Some((bank, reg)) = Self::bank_of(offset) {
                let bank = &mut s.banks[bank];
                return match reg {
                    IO_STATUS => bank.status(),
                    IO_RAW_STATUS => bank.raw,
                    IO_ENABLE => bank.enabled,
                    IO_CURRENT => bank.current(),
                    IO_PRIORITY_RESET => bank.priority,
                    IO_ACK => bank.acknowledge(),
                    IO_MAX_PRIORITY => bank.max_priority,
                    _ => 0,
                };
            }
            match offset {
                IO_INVERT_SEL => s.invert_sel,
                IO_STICKY_SEL => s.sticky_sel,
                o if (IO_PRIORITY_SEL..IO_PRIORITY_SEL + 0x80).contains(&o) => {
                    s.priorities[(o - IO_PRIORITY_SEL) / 4]
                }
                _ => 0,
            }
        })
    }

    fn write32(&self, offset: usize, value: u32) {
        self.with(|s| {
            if let Some((bank, reg)) = Self::bank_of(offset) {
                let bank = &mut s.banks[bank];
                match reg {
                    IO_ENABLE => {
                        bank.enabled |= value;
                        bank.latched |= bank.raw & value;
                    }
                    IO_DISABLE => bank.enabled &= !value,
                    IO_PRIORITY_RESET => {
                        bank.priority = value;
                        bank.priority_resets += 1;
                    }
                    IO_MAX_PRIORITY => bank.max_priority = value,
                    // Status, raw and current are read-only
                    _ => {}
                }
                return;
            }
            match offset {
                IO_INVERT_SEL => s.invert_sel = value,
                IO_STICKY_SEL => s.sticky_sel = value,
                o if (IO_PRIORITY_SEL..IO_PRIORITY_SEL + 0x80).contains(&o) => {
                    s.priorities[(o - IO_PRIORITY_SEL) / 4] = value;
                }
                _ => {}
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let ic = SimZevio::new();
        for bank in Bank::ALL {
            assert_eq!(ic.status(bank), 0);
            assert_eq!(ic.enabled(bank), 0);
            assert_eq!(ic.raw(bank), 0);
        }
    }

    #[test]
    fn test_raise_needs_enable() {
        let ic = SimZevio::new();
        ic.assert_line(Bank::Irq, 4);
        assert_eq!(ic.read32(IO_RAW_STATUS), 1 << 4);
        assert_eq!(ic.read32(IO_STATUS), 0);

        ic.write32(IO_ENABLE, 1 << 4);
        assert_eq!(ic.read32(IO_STATUS), 1 << 4);
    }

    #[test]
    fn test_fiq_bank_offset() {
        let ic = SimZevio::new();
        ic.write32(0x100 + IO_ENABLE, 1 << 2);
        ic.assert_line(Bank::Fiq, 2);
        assert_eq!(ic.read32(0x100 + IO_STATUS), 1 << 2);
        assert_eq!(ic.read32(IO_STATUS), 0);
    }

    #[test]
    fn test_current_reports_lowest_line() {
        let ic = SimZevio::new();
        ic.write32(IO_ENABLE, !0);
        ic.assert_line(Bank::Irq, 9);
        ic.assert_line(Bank::Irq, 3);
        assert_eq!(ic.read32(IO_CURRENT), 3);
        assert_eq!(ic.in_service_depth(Bank::Irq), 1);
    }

    #[test]
    fn test_status_holds_until_ack() {
        let ic = SimZevio::new();
        ic.write32(IO_ENABLE, 1 << 7);
        ic.assert_line(Bank::Irq, 7);
        assert_eq!(ic.read32(IO_CURRENT), 7);

        // Source drops while in service: still pending until acked
        ic.deassert(Bank::Irq, 7);
        assert_eq!(ic.read32(IO_STATUS), 1 << 7);

        ic.read32(IO_ACK);
        assert_eq!(ic.read32(IO_STATUS), 0);
    }

    #[test]
    fn test_ack_with_source_high_keeps_status() {
        let ic = SimZevio::new();
        ic.write32(IO_ENABLE, 1 << 1);
        ic.assert_line(Bank::Irq, 1);
        ic.read32(IO_CURRENT);
        ic.read32(IO_ACK);
        assert_eq!(ic.read32(IO_STATUS), 1 << 1);
    }

    #[test]
    fn test_ack_empty_stack_is_noop() {
        let ic = SimZevio::new();
        ic.write32(IO_ENABLE, 1 << 5);
        ic.assert_line(Bank::Irq, 5);
        ic.read32(IO_ACK);
        ic.read32(IO_ACK);
        assert_eq!(ic.read32(IO_STATUS), 1 << 5);
        assert_eq!(ic.ack_reads(Bank::Irq), 2);
    }

    #[test]
    fn test_priority_reset_roundtrip() {
        let ic = SimZevio::new();
        ic.write32(IO_PRIORITY_RESET, 0x3);
        assert_eq!(ic.read32(IO_ACK), 0x3);
        assert_eq!(ic.priority_resets(Bank::Irq), 1);
    }

    #[test]
    fn test_disable_hides_status() {
        let ic = SimZevio::new();
        ic.write32(IO_ENABLE, 1 << 2);
        ic.assert_line(Bank::Irq, 2);
        ic.write32(IO_DISABLE, 1 << 2);
        assert_eq!(ic.read32(IO_STATUS), 0);
        assert_eq!(ic.read32(IO_RAW_STATUS), 1 << 2);
    }

    #[test]
    fn test_global_registers() {
        let ic = SimZevio::new();
        ic.write32(IO_INVERT_SEL, !0);
        ic.write32(IO_STICKY_SEL, 0x10);
        ic.write32(IO_PRIORITY_SEL + 4 * 5, 2);
        assert_eq!(ic.invert_select(), !0);
        assert_eq!(ic.read32(IO_STICKY_SEL), 0x10);
        assert_eq!(ic.line_priority(5), 2);
    }
}
