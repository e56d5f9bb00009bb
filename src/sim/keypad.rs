//! Keypad scanner model
//!
//! The host sets the electrical level of each matrix position; [`scan`]
//! stands in for one pass of the hardware's continuous scan and latches the
//! rows into the data registers.
//!
//! [`scan`]: SimKeypad::scan

use std::sync::{Arc, Mutex};

use super::SimZevio;
use crate::irq::Bank;
use crate::keypad::{mode, regs, status, KEYPAD_COLS, KEYPAD_ROWS};
use crate::mmio::RegisterWindow;

#[derive(Debug, Default)]
struct KeypadState {
    scan_mode: u32,
    control: u32,
    int_status: u32,
    int_mask: u32,
    /// Levels the host drives onto the matrix
    hw_rows: [u16; KEYPAD_ROWS],
    /// Rows captured by the last scan
    data: [u16; KEYPAD_ROWS],
    aux_enable: u32,
    aux_status: u32,
    writes: usize,
    /// Controller line this block drives
    irq: Option<(Arc<SimZevio>, Bank, u32)>,
}

impl KeypadState {
    fn irq_pending(&self) -> bool {
        self.int_status & self.int_mask != 0
    }

    fn update_irq(&self) {
        if let Some((ic, bank, line)) = &self.irq {
            ic.set_line(*bank, *line, self.irq_pending());
        }
    }
}

/// Register-level model of the keypad scanner
#[derive(Debug, Default)]
pub struct SimKeypad {
    state: Mutex<KeypadState>,
}

impl SimKeypad {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut KeypadState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Drive the interrupt output into a controller line
    pub fn connect_irq(&self, ic: Arc<SimZevio>, bank: Bank, line: u32) {
        self.with(|s| {
            s.irq = Some((ic, bank, line));
            s.update_irq();
        });
    }

    /// Set the level seen at one matrix position
    pub fn set_bit(&self, row: usize, col: usize, level: bool) {
        assert!(row < KEYPAD_ROWS && col < KEYPAD_COLS, "({}, {}) outside matrix", row, col);
        self.with(|s| {
            if level {
                s.hw_rows[row] |= 1 << col;
            } else {
                s.hw_rows[row] &= !(1 << col);
            }
        });
    }

    /// Set the levels of a whole row
    pub fn set_row(&self, row: usize, bits: u16) {
        self.with(|s| s.hw_rows[row] = bits);
    }

    pub fn is_scanning(&self) -> bool {
        self.with(|s| s.scan_mode & 0x3 == mode::CONTINUOUS)
    }

    /// Run one full scan. Returns whether the interrupt output is asserted
    /// afterwards.
    pub fn scan(&self) -> bool {
        self.with(|s| {
            if s.scan_mode & 0x3 != mode::CONTINUOUS {
                return false;
            }
            s.int_status |= status::SCAN_DONE;
            if s.hw_rows != s.data {
                s.int_status |= status::DATA_CHANGED;
            }
            s.data = s.hw_rows;
            s.update_irq();
            s.irq_pending()
        })
    }

    /// Flag changed data without scanning
    pub fn raise_data_changed(&self) {
        self.with(|s| {
            s.int_status |= status::DATA_CHANGED;
            s.update_irq();
        });
    }

    /// Touchpad activity on the auxiliary interrupt
    pub fn raise_aux(&self) {
        self.with(|s| s.aux_status |= 1);
    }

    pub fn int_status(&self) -> u32 {
        self.with(|s| s.int_status)
    }

    /// Register writes seen so far
    pub fn write_count(&self) -> usize {
        self.with(|s| s.writes)
    }
}

impl RegisterWindow for SimKeypad {
    fn read32(&self, offset: usize) -> u32 {
        self.with(|s| match offset {
            regs::SCAN_MODE => s.scan_mode,
            regs::CNTL => s.control,
            regs::INT => s.int_status,
            regs::INTMSK => s.int_mask,
            o if (regs::DATA..regs::DATA + KEYPAD_ROWS * 2).contains(&o) => {
                let row = (o - regs::DATA) / 2 & !1;
                u32::from(s.data[row]) | u32::from(s.data[row + 1]) << 16
            }
            regs::UNKNOWN_INT => s.aux_enable,
            regs::UNKNOWN_INT_STS => s.aux_status,
            _ => 0,
        })
    }

    fn write32(&self, offset: usize, value: u32) {
        self.with(|s| {
            s.writes += 1;
            match offset {
                regs::SCAN_MODE => s.scan_mode = value,
                regs::CNTL => s.control = value,
                regs::INT => {
                    s.int_status &= !value;
                    s.update_irq();
                }
                regs::INTMSK => {
                    s.int_mask = value;
                    s.update_irq();
                }
                regs::UNKNOWN_INT => s.aux_enable = value,
                regs::UNKNOWN_INT_STS => s.aux_status &= !value,
                // Data registers are read-only
                _ => {}
            }
        })
    }
}
