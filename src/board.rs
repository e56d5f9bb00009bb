//! Board descriptions
//!
//! ## Memory map
//!
//! | Physical     | Block                                 |
//! |--------------|---------------------------------------|
//! | 0x90000000   | APB peripherals (2 MiB, see `apb`)    |
//! | 0xDC000000   | Interrupt controller (4 KiB)          |
//!
//! Interrupt line numbers are hardware lines of the IRQ bank.

use crate::keypad::{KeyCodeTable, KeypadConfig, ReportMode};

pub const APB_PHYS_BASE: usize = 0x9000_0000;
pub const APB_SIZE: usize = 2 * 1024 * 1024;
pub const INTERRUPT_PHYS_BASE: usize = 0xDC00_0000;
pub const INTERRUPT_SIZE: usize = 4 * 1024;

/// Offsets of APB peripherals from [`APB_PHYS_BASE`]
pub mod apb {
    pub const GPIO: usize = 0x00000;
    pub const UART: usize = 0x20000;
    pub const I2C: usize = 0x50000;
    pub const WATCHDOG: usize = 0x60000;
    pub const RTC: usize = 0x90000;
    pub const MISC: usize = 0xA0000;
    pub const POWER: usize = 0xB0000;
    pub const TIMER2: usize = 0xD0000;
    pub const KEYPAD: usize = 0xE0000;
    pub const CONTRAST: usize = 0xF0000;

    /// Register window size of one APB peripheral
    pub const BLOCK_SIZE: usize = 4 * 1024;
}

/// Physical address of an APB peripheral
pub const fn apb_phys(offset: usize) -> usize {
    APB_PHYS_BASE + offset
}

/// Interrupt lines
pub mod irqs {
    pub const UART: u32 = 1;
    pub const WATCHDOG: u32 = 3;
    pub const RTC: u32 = 4;
    pub const USB_OTG: u32 = 8;
    pub const USB_HOST: u32 = 9;
    pub const ADC: u32 = 11;
    /// Power management, shared by the ON key
    pub const POWER: u32 = 15;
    pub const KEYPAD: u32 = 16;
    pub const TIMER2: u32 = 19;
    pub const LCD: u32 = 21;
}

/// Default delay between keypad scans, microseconds
pub const KEYPAD_SCAN_INTERVAL_US: u32 = 1000;
/// Default delay between keypad rows, microseconds
pub const KEYPAD_ROW_DELAY_US: u32 = 200;

/// Calculator model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Classic with touchpad keypad
    Touchpad,
    /// Classic with clickpad keypad
    Clickpad,
    /// CX
    Cx,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::Touchpad => "TI-NSPIRE Touchpad Calculator",
            Variant::Clickpad => "TI-NSPIRE Clickpad Calculator",
            Variant::Cx => "TI-NSPIRE CX Calculator",
        }
    }

    /// Whether this model uses the classic ("zevio") interrupt controller
    pub fn has_classic_intc(self) -> bool {
        !matches!(self, Variant::Cx)
    }

    pub fn keymap(self) -> KeyCodeTable {
        match self {
            Variant::Clickpad => KeyCodeTable::clickpad(),
            Variant::Touchpad | Variant::Cx => KeyCodeTable::touchpad(),
        }
    }

    pub fn keypad_config(self) -> KeypadConfig {
        KeypadConfig {
            scan_interval_us: KEYPAD_SCAN_INTERVAL_US,
            row_delay_us: KEYPAD_ROW_DELAY_US,
            active_low: self.has_classic_intc(),
            report_mode: ReportMode::Absolute,
        }
    }
}
