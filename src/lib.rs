//! TI-Nspire board support
//!
//! Drivers for the interrupt controller and keypad of the TI-Nspire
//! calculators, written against a register-window abstraction so they run
//! on the device and on a host against software register models.
//!
//! # Architecture
//!
//! - `mmio`: register window trait and the volatile pointer implementation
//! - `irq`: zevio interrupt controller, irq domain and descriptor table
//! - `keypad`: matrix keypad scanner and keymaps
//! - `onkey`: ON key on the power management interrupt
//! - `input`: key event sink and input device
//! - `clock`: fixed board clocks and CPU/AHB divider algebra
//! - `board`: memory map, interrupt lines and per-model keypad settings
//! - `sim`: register models used as mock hardware
//!
//! # Interrupt path
//!
//! ```text
//! exception -> ZevioIntc::handle_exception
//!           -> IrqDomain (hwirq -> virq)
//!           -> IrqDescs::dispatch (mask, handler, unmask)
//!           -> NspireKeypad::on_scan_interrupt -> InputSink
//! ```
//!
//! # Memory Map
//!
//! | Address Range           | Region                        |
//! |-------------------------|-------------------------------|
//! | 0x90000000 - 0x901FFFFF | APB peripherals               |
//! | 0x900B0000              | Power management (ON key)     |
//! | 0x900E0000              | Keypad scanner                |
//! | 0xDC000000 - 0xDC000FFF | Interrupt controller          |

pub mod bits;
pub mod board;
pub mod clock;
pub mod error;
pub mod input;
pub mod irq;
pub mod keypad;
pub mod mmio;
pub mod onkey;
pub mod sim;

#[cfg(test)]
mod board_integration_test;

pub use board::Variant;
pub use clock::{ClockSource, ClockTree};
pub use error::{Error, Result};
pub use input::{InputDevice, InputEvent, InputSink, KeyCode};
pub use irq::{Bank, IrqChip, IrqDescs, IrqDispatch, IrqReturn, ZevioConfig, ZevioIntc};
pub use keypad::{KeyCodeTable, KeypadConfig, KeypadTiming, NspireKeypad, ReportMode};
pub use mmio::{MmioWindow, RegisterWindow};
pub use onkey::OnKey;
