//! Power management block model
//!
//! Only the ON key interrupt is modelled.

use std::sync::{Arc, Mutex};

use super::SimZevio;
use crate::irq::Bank;
use crate::mmio::RegisterWindow;
use crate::onkey::{regs, ON_KEY_INT, ON_KEY_RELEASED};

#[derive(Debug, Default)]
struct PowerState {
    int_mask: u32,
    int_status: u32,
    held: bool,
    irq: Option<(Arc<SimZevio>, Bank, u32)>,
}

impl PowerState {
    fn update_irq(&self) {
        if let Some((ic, bank, line)) = &self.irq {
            ic.set_line(*bank, *line, self.int_status & self.int_mask != 0);
        }
    }
}

/// Register-level model of the power management block
#[derive(Debug, Default)]
pub struct SimPowerBlock {
    state: Mutex<PowerState>,
}

impl SimPowerBlock {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut PowerState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    pub fn connect_irq(&self, ic: Arc<SimZevio>, bank: Bank, line: u32) {
        self.with(|s| {
            s.irq = Some((ic, bank, line));
            s.update_irq();
        });
    }

    /// Press or release the ON key. A press latches the interrupt.
    pub fn set_on_key(&self, held: bool) {
        self.with(|s| {
            if held && !s.held {
                s.int_status |= ON_KEY_INT;
            }
            s.held = held;
            s.update_irq();
        });
    }

    pub fn int_status(&self) -> u32 {
        self.with(|s| s.int_status)
    }

    pub fn int_mask(&self) -> u32 {
        self.with(|s| s.int_mask)
    }
}

impl RegisterWindow for SimPowerBlock {
    fn read32(&self, offset: usize) -> u32 {
        self.with(|s| match offset {
            regs::INT_MASK => s.int_mask,
            regs::INT_STATUS => s.int_status,
            regs::STATUS if s.held => 0,
            regs::STATUS => ON_KEY_RELEASED,
            _ => 0,
        })
    }

    fn write32(&self, offset: usize, value: u32) {
        self.with(|s| match offset {
            regs::INT_MASK => {
                s.int_mask = value;
                s.update_irq();
            }
            regs::INT_STATUS => {
                s.int_status &= !value;
                s.update_irq();
            }
            _ => {}
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_latches_interrupt() {
        let pm = SimPowerBlock::new();
        assert_eq!(pm.read32(regs::STATUS), ON_KEY_RELEASED);

        pm.set_on_key(true);
        assert_eq!(pm.read32(regs::STATUS), 0);
        assert_eq!(pm.int_status(), ON_KEY_INT);

        // Release does not raise a second interrupt
        pm.write32(regs::INT_STATUS, ON_KEY_INT);
        pm.set_on_key(false);
        assert_eq!(pm.int_status(), 0);
        assert_eq!(pm.read32(regs::STATUS), ON_KEY_RELEASED);
    }

    #[test]
    fn test_irq_needs_mask() {
        let ic = Arc::new(SimZevio::new());
        let pm = SimPowerBlock::new();
        pm.connect_irq(Arc::clone(&ic), Bank::Irq, 15);

        pm.set_on_key(true);
        assert_eq!(ic.raw(Bank::Irq), 0);

        pm.write32(regs::INT_MASK, ON_KEY_INT);
        assert_eq!(ic.raw(Bank::Irq), 1 << 15);
        pm.write32(regs::INT_STATUS, ON_KEY_INT);
        assert_eq!(ic.raw(Bank::Irq), 0);
    }
}
