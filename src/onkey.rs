//! ON key
//!
//! The ON key is wired to the power management block (APB offset 0xB0000)
//! and shares its interrupt line with the rest of that block. The block only
//! interrupts on a press, so while the key is down its state has to be
//! polled: [`OnKey::on_interrupt`] and [`OnKey::poll`] say whether the key
//! is still down, and the caller polls again after [`POLL_INTERVAL`] until
//! it is not.

use std::sync::Mutex;
use std::time::Duration;

use log::info;

use crate::input::keys::KEY_POWER;
use crate::input::InputSink;
use crate::irq::IrqReturn;
use crate::mmio::RegisterWindow;

/// Register offsets within the power management block
pub(crate) mod regs {
    pub const INT_MASK: usize = 0x10;
    /// Write 1 to clear
    pub const INT_STATUS: usize = 0x14;
    pub const STATUS: usize = 0x28;
}

/// ON key bit in the interrupt registers
pub const ON_KEY_INT: u32 = 1 << 0;
/// Status bit, clear while the ON key is held
pub const ON_KEY_RELEASED: u32 = 1 << 4;

/// Delay between polls while the key is held
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// ON key driver
pub struct OnKey<W, S> {
    regs: W,
    input: Mutex<S>,
}

impl<W: RegisterWindow, S: InputSink> OnKey<W, S> {
    /// Create the ON key driver over the power block's registers
    pub fn new(regs: W, input: S) -> Self {
        Self {
            regs,
            input: Mutex::new(input),
        }
    }

    /// Unmask the ON key interrupt and drop any stale one
    pub fn init(&self) {
        self.regs.write32(regs::INT_MASK, ON_KEY_INT);
        self.regs.write32(regs::INT_STATUS, ON_KEY_INT);
        info!("TI-NSPIRE ON Key");
    }

    pub fn is_held(&self) -> bool {
        self.regs.read32(regs::STATUS) & ON_KEY_RELEASED == 0
    }

    /// Interrupt handler. On `Handled`, the flag says whether the key is
    /// still down and needs polling.
    pub fn on_interrupt(&self) -> (IrqReturn, bool) {
        if self.regs.read32(regs::INT_STATUS) & ON_KEY_INT == 0 {
            return (IrqReturn::None, false);
        }
        self.regs.write32(regs::INT_STATUS, ON_KEY_INT);
        (IrqReturn::Handled, self.poll())
    }

    /// Report the current key state. Returns whether to poll again.
    pub fn poll(&self) -> bool {
        let held = self.is_held();
        let mut input = self.input.lock().unwrap_or_else(|e| e.into_inner());
        input.report_key(KEY_POWER, held);
        input.sync();
        held
    }

    pub fn with_input<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.input.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputDevice, InputEvent};
    use crate::sim::SimPowerBlock;
    use std::sync::Arc;

    fn setup() -> (Arc<SimPowerBlock>, OnKey<Arc<SimPowerBlock>, InputDevice>) {
        let pm = Arc::new(SimPowerBlock::new());
        let key = OnKey::new(Arc::clone(&pm), InputDevice::new("onkey"));
        key.init();
        (pm, key)
    }

    #[test]
    fn test_init_unmasks_and_clears() {
        let pm = Arc::new(SimPowerBlock::new());
        pm.set_on_key(true);
        let key = OnKey::new(Arc::clone(&pm), InputDevice::new("onkey"));
        key.init();
        assert_eq!(pm.int_mask(), ON_KEY_INT);
        assert_eq!(pm.int_status(), 0);
    }

    #[test]
    fn test_spurious_is_not_ours() {
        let (_pm, key) = setup();
        assert_eq!(key.on_interrupt(), (IrqReturn::None, false));
        assert_eq!(key.with_input(|dev| dev.pending_frames()), 0);
    }

    #[test]
    fn test_press_then_poll_until_release() {
        let (pm, key) = setup();

        pm.set_on_key(true);
        assert_eq!(key.on_interrupt(), (IrqReturn::Handled, true));
        assert_eq!(pm.int_status(), 0);

        // Still held: polling reports nothing new
        assert!(key.poll());

        pm.set_on_key(false);
        assert!(!key.poll());

        let frames = key.with_input(|dev| dev.take_frames());
        assert_eq!(
            frames,
            vec![
                vec![InputEvent::Key { code: KEY_POWER, pressed: true }, InputEvent::Sync],
                vec![InputEvent::Key { code: KEY_POWER, pressed: false }, InputEvent::Sync],
            ]
        );
    }

    #[test]
    fn test_quick_tap_reports_release() {
        let (pm, key) = setup();
        pm.set_on_key(true);
        pm.set_on_key(false);

        // Interrupt arrives after the key is already up
        assert_eq!(key.on_interrupt(), (IrqReturn::Handled, false));
        let raw = key.with_input(|dev| dev.is_pressed(KEY_POWER));
        assert!(!raw);
    }

    #[test]
    fn test_poll_interval() {
        assert_eq!(POLL_INTERVAL, Duration::from_millis(10));
    }
}
