//! Software register models
//!
//! Each model implements [`RegisterWindow`](crate::mmio::RegisterWindow) and
//! behaves like the real block at the register level, so the drivers can be
//! exercised on a host. Peripheral models can drive a line of a
//! [`SimZevio`] to raise interrupts.

pub mod keypad;
pub mod power;
pub mod zevio;

pub use keypad::SimKeypad;
pub use power::SimPowerBlock;
pub use zevio::SimZevio;
