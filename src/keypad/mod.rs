//! TI-Nspire keypad scanner
//!
//! APB offset 0xE0000, interrupt line 16.
//!
//! The scanner walks an 8x11 key matrix on its own once it is put in
//! continuous mode, waiting `row_delay` cycles between rows and
//! `scan_delay` cycles between full scans. The latest scan is kept in eight
//! 16-bit row words at 0x10, one bit per column.
//!
//! ## Scan mode register (offset 0x00)
//!
//! | Bits  | Field                                |
//! |-------|--------------------------------------|
//! | 0-1   | Mode (3 = continuous scan)           |
//! | 2-15  | Delay between rows, in clock cycles  |
//! | 16-31 | Delay between scans, in clock cycles |
//!
//! Both delays are derived from the APB clock at configure time. A delay that
//! does not fit its field is rejected; nothing is written in that case.

pub mod keymap;

use std::sync::{Mutex, MutexGuard};

use log::{debug, info};

pub use keymap::KeyCodeTable;

use crate::bits::{field_fits, field_get, field_max, field_prep};
use crate::clock::ClockSource;
use crate::error::{Error, Result};
use crate::input::{InputSink, KeyCode};
use crate::irq::IrqReturn;
use crate::mmio::RegisterWindow;

/// Number of keypad rows
pub const KEYPAD_ROWS: usize = 8;
/// Number of keypad columns
pub const KEYPAD_COLS: usize = 11;

/// Register offsets
pub(crate) mod regs {
    /// Scan mode and timing
    pub const SCAN_MODE: usize = 0x00;
    /// Matrix size
    pub const CNTL: usize = 0x04;
    /// Interrupt status, write 1 to clear
    pub const INT: usize = 0x08;
    /// Interrupt mask
    pub const INTMSK: usize = 0x0C;
    /// Row data (0x10-0x1F, one 16-bit word per row)
    pub const DATA: usize = 0x10;
    /// Auxiliary interrupt enable. Fires on touchpad activity and hangs the
    /// system if left on.
    pub const UNKNOWN_INT: usize = 0x40;
    /// Auxiliary interrupt status
    pub const UNKNOWN_INT_STS: usize = 0x44;
}

/// Interrupt status bits
pub(crate) mod status {
    /// A full scan finished
    pub const SCAN_DONE: u32 = 1 << 0;
    /// A scan read different data from the previous one
    pub const DATA_CHANGED: u32 = 1 << 1;
    /// Everything the handler acknowledges
    pub const ACK_ALL: u32 = SCAN_DONE | DATA_CHANGED;
}

/// Scan modes
pub(crate) mod mode {
    pub const IDLE: u32 = 0;
    pub const CONTINUOUS: u32 = 3;
}

const MODE_SHIFT: u32 = 0;
const MODE_WIDTH: u32 = 2;
const ROW_DELAY_SHIFT: u32 = 2;
const ROW_DELAY_WIDTH: u32 = 14;
const SCAN_DELAY_SHIFT: u32 = 16;
const SCAN_DELAY_WIDTH: u32 = 16;

const CNTL_ROWS_SHIFT: u32 = 0;
const CNTL_COLS_SHIFT: u32 = 8;
const CNTL_FIELD_WIDTH: u32 = 8;

/// Scanner delays in clock cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadTiming {
    pub scan_delay_cycles: u32,
    pub row_delay_cycles: u32,
}

impl KeypadTiming {
    /// Convert delays in microseconds to cycles of a `clock_rate_hz` clock.
    pub fn compute(clock_rate_hz: u64, scan_interval_us: u32, row_delay_us: u32) -> Result<Self> {
        let cycles_per_us = (clock_rate_hz / 1_000_000).max(1);

        let scan = delay_cycles(cycles_per_us, scan_interval_us);
        if !field_fits(scan, SCAN_DELAY_WIDTH) {
            return Err(Error::ScanDelayOverflow {
                cycles: scan,
                max: field_max(SCAN_DELAY_WIDTH),
            });
        }

        let row = delay_cycles(cycles_per_us, row_delay_us);
        if !field_fits(row, ROW_DELAY_WIDTH) {
            return Err(Error::RowDelayOverflow {
                cycles: row,
                max: field_max(ROW_DELAY_WIDTH),
            });
        }

        Ok(Self {
            scan_delay_cycles: scan as u32,
            row_delay_cycles: row as u32,
        })
    }

    /// Scan mode register value selecting continuous scanning with these delays
    pub fn scan_mode_word(&self) -> u32 {
        field_prep(mode::CONTINUOUS, MODE_SHIFT, MODE_WIDTH)
            | field_prep(self.row_delay_cycles, ROW_DELAY_SHIFT, ROW_DELAY_WIDTH)
            | field_prep(self.scan_delay_cycles, SCAN_DELAY_SHIFT, SCAN_DELAY_WIDTH)
    }

    /// Split a scan mode register value into its mode and delays
    pub fn from_scan_mode_word(word: u32) -> (u32, Self) {
        (
            field_get(word, MODE_SHIFT, MODE_WIDTH),
            Self {
                scan_delay_cycles: field_get(word, SCAN_DELAY_SHIFT, SCAN_DELAY_WIDTH),
                row_delay_cycles: field_get(word, ROW_DELAY_SHIFT, ROW_DELAY_WIDTH),
            },
        )
    }
}

/// Cycles in `us` microseconds, saturating so an overflow never fits a field
fn delay_cycles(cycles_per_us: u64, us: u32) -> u64 {
    cycles_per_us.checked_mul(u64::from(us)).unwrap_or(u64::MAX)
}

/// Matrix size register value
pub fn control_word(rows: usize, cols: usize) -> u32 {
    field_prep(rows as u32, CNTL_ROWS_SHIFT, CNTL_FIELD_WIDTH)
        | field_prep(cols as u32, CNTL_COLS_SHIFT, CNTL_FIELD_WIDTH)
}

/// Which key states the scan handler reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Every bound key on every scan. The input layer drops repeats, and a
    /// release missed between two scans cannot leave a key stuck.
    #[default]
    Absolute,
    /// Only keys whose state differs from the previous scan
    Delta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadConfig {
    /// Delay between full scans, microseconds
    pub scan_interval_us: u32,
    /// Delay between rows, microseconds
    pub row_delay_us: u32,
    /// A cleared data bit means "pressed"
    pub active_low: bool,
    pub report_mode: ReportMode,
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            scan_interval_us: 1000,
            row_delay_us: 200,
            active_low: true,
            report_mode: ReportMode::Absolute,
        }
    }
}

/// Everything the scan handler touches, behind one lock
struct ScanState<S> {
    input: S,
    /// Logical pressed bits of the last reported scan, per row
    last: [u16; KEYPAD_ROWS],
}

/// Keypad scanner driver
pub struct NspireKeypad<W, S> {
    regs: W,
    keymap: KeyCodeTable,
    config: KeypadConfig,
    /// Interrupt status bits this driver owns
    int_mask: u32,
    state: Mutex<ScanState<S>>,
}

impl<W: RegisterWindow, S: InputSink> NspireKeypad<W, S> {
    /// Create a driver for the scanner at `regs`. Nothing is written until
    /// [`configure`](Self::configure).
    pub fn new(regs: W, keymap: KeyCodeTable, config: KeypadConfig, input: S) -> Self {
        Self {
            regs,
            keymap,
            config,
            int_mask: status::DATA_CHANGED,
            state: Mutex::new(ScanState {
                input,
                last: [0; KEYPAD_ROWS],
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScanState<S>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn config(&self) -> &KeypadConfig {
        &self.config
    }

    pub fn keymap(&self) -> &KeyCodeTable {
        &self.keymap
    }

    /// Run `f` on the input sink, under the scan lock
    pub fn with_input<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.lock().input)
    }

    /// Program timing from `clock` and start continuous scanning
    pub fn configure(&self, clock: &impl ClockSource) -> Result<KeypadTiming> {
        let timing = KeypadTiming::compute(
            clock.rate_hz(),
            self.config.scan_interval_us,
            self.config.row_delay_us,
        )?;

        self.regs.write32(regs::SCAN_MODE, timing.scan_mode_word());
        self.regs
            .write32(regs::CNTL, control_word(KEYPAD_ROWS, KEYPAD_COLS));
        self.regs.write32(regs::INTMSK, self.int_mask);

        // Keep the touchpad interrupt off and clear whatever it left pending
        self.regs.write32(regs::UNKNOWN_INT, 0);
        self.regs.write32(regs::UNKNOWN_INT_STS, !0);

        info!(
            "TI-NSPIRE keypad (scan_interval={}us, row_delay={}us{})",
            self.config.scan_interval_us,
            self.config.row_delay_us,
            if self.config.active_low { ", active_low" } else { "" }
        );
        debug!(
            "keypad: scan delay {} cycles, row delay {} cycles",
            timing.scan_delay_cycles, timing.row_delay_cycles
        );
        Ok(timing)
    }

    /// Scan-complete interrupt handler
    pub fn on_scan_interrupt(&self) -> IrqReturn {
        if self.regs.read32(regs::INT) & self.int_mask == 0 {
            return IrqReturn::None;
        }

        let mut state = self.lock();

        let mut rows = [0u16; KEYPAD_ROWS];
        self.regs.read16_burst(regs::DATA, &mut rows);

        let ScanState { input, last } = &mut *state;
        let mut pressed = [0u16; KEYPAD_ROWS];
        for (row, &bits) in rows.iter().enumerate() {
            pressed[row] = self.pressed_bits(bits);
        }

        let now = self.key_states(&pressed);
        let before = match self.config.report_mode {
            ReportMode::Absolute => None,
            ReportMode::Delta => Some(self.key_states(last)),
        };
        for (i, &(code, down)) in now.iter().enumerate() {
            if before.as_ref().map_or(true, |before| before[i].1 != down) {
                input.report_key(code, down);
            }
        }
        *last = pressed;
        input.sync();

        self.regs.write32(regs::INT, status::ACK_ALL);
        IrqReturn::Handled
    }

    /// State of every bound key code, in first-position order. A code bound
    /// to several positions is down when any of them is.
    fn key_states(&self, pressed: &[u16; KEYPAD_ROWS]) -> Vec<(KeyCode, bool)> {
        let mut states: Vec<(KeyCode, bool)> = Vec::new();
        for (row, col, code) in self.keymap.bound() {
            let down = pressed[row] & (1 << col) != 0;
            match states.iter_mut().find(|(c, _)| *c == code) {
                Some(state) => state.1 |= down,
                None => states.push((code, down)),
            }
        }
        states
    }

    /// Logical pressed bits of one row word
    fn pressed_bits(&self, hw: u16) -> u16 {
        let cols = (1u16 << KEYPAD_COLS) - 1;
        if self.config.active_low {
            !hw & cols
        } else {
            hw & cols
        }
    }

    /// Mask the scanner's interrupt and stop scanning
    pub fn shutdown(&self) {
        let _state = self.lock();
        self.regs.write32(regs::INTMSK, 0);
        self.regs.write32(regs::SCAN_MODE, mode::IDLE);
        debug!("keypad: stopped");
    }
}
