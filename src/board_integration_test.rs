//! Integration test for the interrupt and key pipeline
//! Wires the controller, keypad scanner and ON key to their register models
//! and drives key presses through `handle_exception`.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use crate::board::{irqs, Variant};
    use crate::clock::ClockTree;
    use crate::input::keys::*;
    use crate::input::{InputDevice, InputEvent};
    use crate::irq::{Bank, IrqDescs, ZevioConfig, ZevioIntc};
    use crate::keypad::{NspireKeypad, KEYPAD_ROWS};
    use crate::onkey::OnKey;
    use crate::sim::{SimKeypad, SimPowerBlock, SimZevio};

    type Keypad = NspireKeypad<Arc<SimKeypad>, InputDevice>;
    type PowerKey = OnKey<Arc<SimPowerBlock>, InputDevice>;

    struct Board {
        ic: Arc<SimZevio>,
        intc: Arc<ZevioIntc<Arc<SimZevio>>>,
        descs: IrqDescs,
        kp_regs: Arc<SimKeypad>,
        keypad: Arc<Keypad>,
        pm_regs: Arc<SimPowerBlock>,
        onkey: Arc<PowerKey>,
        /// Set by the ON key handler while the key needs polling
        onkey_poll: Arc<AtomicBool>,
    }

    impl Board {
        fn run_irqs(&self) -> usize {
            self.intc.handle_exception(&self.descs)
        }

        fn keypad_frames(&self) -> Vec<Vec<InputEvent>> {
            self.keypad.with_input(|dev| dev.take_frames())
        }
    }

    fn boot(variant: Variant) -> Board {
        let ic = Arc::new(SimZevio::new());
        let intc = ZevioIntc::probe(Arc::clone(&ic), ZevioConfig::default()).unwrap();
        let mut descs = IrqDescs::new(128);
        let clocks = ClockTree::nspire();

        let kp_regs = Arc::new(SimKeypad::new());
        kp_regs.connect_irq(Arc::clone(&ic), Bank::Irq, irqs::KEYPAD);
        // Idle matrix: every line pulled high
        for row in 0..KEYPAD_ROWS {
            kp_regs.set_row(row, 0xFFFF);
        }
        let keypad = Arc::new(NspireKeypad::new(
            Arc::clone(&kp_regs),
            variant.keymap(),
            variant.keypad_config(),
            InputDevice::new("nspire-keypad"),
        ));
        keypad.configure(clocks.get("apb_pclk").unwrap()).unwrap();
        let virq = intc.map(&mut descs, irqs::KEYPAD).unwrap();
        let handler = Arc::clone(&keypad);
        descs
            .request_irq(virq, "nspire_keypad", move |_| handler.on_scan_interrupt())
            .unwrap();

        let pm_regs = Arc::new(SimPowerBlock::new());
        pm_regs.connect_irq(Arc::clone(&ic), Bank::Irq, irqs::POWER);
        let onkey = Arc::new(OnKey::new(Arc::clone(&pm_regs), InputDevice::new("onkey")));
        onkey.init();
        let onkey_poll = Arc::new(AtomicBool::new(false));
        let virq = intc.map(&mut descs, irqs::POWER).unwrap();
        let (handler, poll) = (Arc::clone(&onkey), Arc::clone(&onkey_poll));
        descs
            .request_irq(virq, "onkey", move |_| {
                let (ret, held) = handler.on_interrupt();
                poll.store(held, Ordering::SeqCst);
                ret
            })
            .unwrap();

        Board {
            ic,
            intc,
            descs,
            kp_regs,
            keypad,
            pm_regs,
            onkey,
            onkey_poll,
        }
    }

    #[test]
    fn test_first_scan_reports_nothing() {
        let board = boot(Variant::Touchpad);

        // Latched data starts at zero, so the first idle scan counts as a change
        assert!(board.kp_regs.scan());
        assert_eq!(board.run_irqs(), 1);
        assert!(board.keypad_frames().is_empty());
        assert_eq!(board.ic.status(Bank::Irq), 0);
    }

    #[test]
    fn test_key_press_and_release() {
        let board = boot(Variant::Touchpad);
        board.kp_regs.scan();
        board.run_irqs();

        // '1' at (1, 7), active low
        board.kp_regs.set_bit(1, 7, false);
        board.kp_regs.scan();
        assert_eq!(board.run_irqs(), 1);

        board.kp_regs.set_bit(1, 7, true);
        board.kp_regs.scan();
        assert_eq!(board.run_irqs(), 1);

        assert_eq!(
            board.keypad_frames(),
            vec![
                vec![InputEvent::Key { code: KEY_1, pressed: true }, InputEvent::Sync],
                vec![InputEvent::Key { code: KEY_1, pressed: false }, InputEvent::Sync],
            ]
        );
        let virq = board.intc.find_mapping(irqs::KEYPAD).unwrap();
        assert_eq!(board.descs.stats(virq).unwrap().handled, 3);
        assert_eq!(board.ic.in_service_depth(Bank::Irq), 0);
    }

    #[test]
    fn test_unchanged_scan_raises_nothing() {
        let board = boot(Variant::Clickpad);
        board.kp_regs.scan();
        board.run_irqs();

        assert!(!board.kp_regs.scan());
        assert_eq!(board.run_irqs(), 0);
    }

    #[test]
    fn test_clickpad_keymap() {
        let board = boot(Variant::Clickpad);
        board.kp_regs.scan();
        board.run_irqs();

        // (2, 0) is '/' on the clickpad
        board.kp_regs.set_bit(2, 0, false);
        board.kp_regs.scan();
        board.run_irqs();

        assert!(board.keypad.with_input(|dev| dev.is_pressed(KEY_KPSLASH)));
    }

    #[test]
    fn test_cx_is_active_high() {
        let board = boot(Variant::Cx);
        for row in 0..KEYPAD_ROWS {
            board.kp_regs.set_row(row, 0);
        }
        board.kp_regs.scan();
        board.run_irqs();
        assert!(board.keypad_frames().is_empty());

        board.kp_regs.set_bit(4, 6, true);
        board.kp_regs.scan();
        board.run_irqs();
        assert_eq!(
            board.keypad_frames(),
            vec![vec![InputEvent::Key { code: KEY_A, pressed: true }, InputEvent::Sync]]
        );
    }

    #[test]
    fn test_onkey_and_keypad_together() {
        let board = boot(Variant::Touchpad);
        board.kp_regs.scan();
        board.run_irqs();

        board.kp_regs.set_bit(1, 7, false);
        board.kp_regs.scan();
        board.pm_regs.set_on_key(true);
        assert_eq!(board.ic.raw(Bank::Irq), (1 << irqs::KEYPAD) | (1 << irqs::POWER));

        assert_eq!(board.run_irqs(), 2);
        assert_eq!(board.ic.status(Bank::Irq), 0);
        assert!(board.keypad.with_input(|dev| dev.is_pressed(KEY_1)));
        assert!(board.onkey.with_input(|dev| dev.is_pressed(KEY_POWER)));
        assert!(board.onkey_poll.load(Ordering::SeqCst));
    }

    #[test]
    fn test_onkey_polling_until_release() {
        let board = boot(Variant::Touchpad);
        board.pm_regs.set_on_key(true);
        board.run_irqs();
        assert!(board.onkey_poll.load(Ordering::SeqCst));

        // Held: no new interrupt, keep polling
        assert_eq!(board.run_irqs(), 0);
        assert!(board.onkey.poll());

        board.pm_regs.set_on_key(false);
        assert!(!board.onkey.poll());
        assert_eq!(board.run_irqs(), 0);

        let frames = board.onkey.with_input(|dev| dev.take_frames());
        assert_eq!(frames.len(), 2);
        assert!(!board.onkey.with_input(|dev| dev.is_pressed(KEY_POWER)));
    }

    #[test]
    fn test_keypad_shutdown_silences_line() {
        let board = boot(Variant::Touchpad);
        board.kp_regs.set_bit(0, 0, false);
        board.kp_regs.scan();
        board.keypad.shutdown();

        assert_eq!(board.ic.raw(Bank::Irq), 0);
        assert_eq!(board.run_irqs(), 0);
        assert!(board.keypad_frames().is_empty());
    }

    #[test]
    fn test_freed_keypad_irq_is_masked() {
        let mut board = boot(Variant::Touchpad);
        let virq = board.intc.find_mapping(irqs::KEYPAD).unwrap();
        board.descs.free_irq(virq).unwrap();
        assert!(!board.intc.is_enabled(Bank::Irq, irqs::KEYPAD));

        board.kp_regs.scan();
        assert_eq!(board.run_irqs(), 0);
        assert_eq!(board.ic.raw(Bank::Irq), 1 << irqs::KEYPAD);
    }
}
