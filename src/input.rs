//! Key event reporting
//!
//! Drivers push key state through an [`InputSink`]: any number of
//! `report_key` calls followed by one `sync` closing the frame.
//! [`InputDevice`] is the usual sink. Like the Linux input core it remembers
//! which keys are down and drops reports that do not change anything, so a
//! driver may report the absolute state of every key on every scan.

use std::collections::{BTreeSet, VecDeque};

/// Linux input key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyCode(pub u16);

impl KeyCode {
    /// "No key": table entries holding this are never reported
    pub const RESERVED: KeyCode = KeyCode(0);

    pub fn is_reserved(self) -> bool {
        self == Self::RESERVED
    }
}

/// Key codes used by the calculator keymaps (linux/input-event-codes.h)
pub mod keys {
    use super::KeyCode;

    pub const KEY_RESERVED: KeyCode = KeyCode(0);
    pub const KEY_ESC: KeyCode = KeyCode(1);
    pub const KEY_1: KeyCode = KeyCode(2);
    pub const KEY_2: KeyCode = KeyCode(3);
    pub const KEY_3: KeyCode = KeyCode(4);
    pub const KEY_4: KeyCode = KeyCode(5);
    pub const KEY_5: KeyCode = KeyCode(6);
    pub const KEY_6: KeyCode = KeyCode(7);
    pub const KEY_7: KeyCode = KeyCode(8);
    pub const KEY_8: KeyCode = KeyCode(9);
    pub const KEY_9: KeyCode = KeyCode(10);
    pub const KEY_0: KeyCode = KeyCode(11);
    pub const KEY_MINUS: KeyCode = KeyCode(12);
    pub const KEY_EQUAL: KeyCode = KeyCode(13);
    pub const KEY_BACKSPACE: KeyCode = KeyCode(14);
    pub const KEY_TAB: KeyCode = KeyCode(15);
    pub const KEY_Q: KeyCode = KeyCode(16);
    pub const KEY_W: KeyCode = KeyCode(17);
    pub const KEY_E: KeyCode = KeyCode(18);
    pub const KEY_R: KeyCode = KeyCode(19);
    pub const KEY_T: KeyCode = KeyCode(20);
    pub const KEY_Y: KeyCode = KeyCode(21);
    pub const KEY_U: KeyCode = KeyCode(22);
    pub const KEY_I: KeyCode = KeyCode(23);
    pub const KEY_O: KeyCode = KeyCode(24);
    pub const KEY_P: KeyCode = KeyCode(25);
    pub const KEY_LEFTBRACE: KeyCode = KeyCode(26);
    pub const KEY_RIGHTBRACE: KeyCode = KeyCode(27);
    pub const KEY_ENTER: KeyCode = KeyCode(28);
    pub const KEY_LEFTCTRL: KeyCode = KeyCode(29);
    pub const KEY_A: KeyCode = KeyCode(30);
    pub const KEY_S: KeyCode = KeyCode(31);
    pub const KEY_D: KeyCode = KeyCode(32);
    pub const KEY_F: KeyCode = KeyCode(33);
    pub const KEY_G: KeyCode = KeyCode(34);
    pub const KEY_H: KeyCode = KeyCode(35);
    pub const KEY_J: KeyCode = KeyCode(36);
    pub const KEY_K: KeyCode = KeyCode(37);
    pub const KEY_L: KeyCode = KeyCode(38);
    pub const KEY_SEMICOLON: KeyCode = KeyCode(39);
    pub const KEY_APOSTROPHE: KeyCode = KeyCode(40);
    pub const KEY_LEFTSHIFT: KeyCode = KeyCode(42);
    pub const KEY_BACKSLASH: KeyCode = KeyCode(43);
    pub const KEY_Z: KeyCode = KeyCode(44);
    pub const KEY_X: KeyCode = KeyCode(45);
    pub const KEY_C: KeyCode = KeyCode(46);
    pub const KEY_V: KeyCode = KeyCode(47);
    pub const KEY_B: KeyCode = KeyCode(48);
    pub const KEY_N: KeyCode = KeyCode(49);
    pub const KEY_M: KeyCode = KeyCode(50);
    pub const KEY_COMMA: KeyCode = KeyCode(51);
    pub const KEY_DOT: KeyCode = KeyCode(52);
    pub const KEY_SLASH: KeyCode = KeyCode(53);
    pub const KEY_KPASTERISK: KeyCode = KeyCode(55);
    pub const KEY_LEFTALT: KeyCode = KeyCode(56);
    pub const KEY_SPACE: KeyCode = KeyCode(57);
    pub const KEY_KPPLUS: KeyCode = KeyCode(78);
    pub const KEY_KPSLASH: KeyCode = KeyCode(98);
    pub const KEY_UP: KeyCode = KeyCode(103);
    pub const KEY_PAGEUP: KeyCode = KeyCode(104);
    pub const KEY_LEFT: KeyCode = KeyCode(105);
    pub const KEY_RIGHT: KeyCode = KeyCode(106);
    pub const KEY_DOWN: KeyCode = KeyCode(108);
    pub const KEY_PAGEDOWN: KeyCode = KeyCode(109);
    pub const KEY_DELETE: KeyCode = KeyCode(111);
    pub const KEY_POWER: KeyCode = KeyCode(116);
}

/// Receiver of key state reports.
pub trait InputSink {
    /// Report the current state of one key
    fn report_key(&mut self, code: KeyCode, pressed: bool);

    /// Close the current frame of reports
    fn sync(&mut self);
}

/// One event as delivered to readers of an [`InputDevice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key { code: KeyCode, pressed: bool },
    Sync,
}

/// Raw recorder: keeps every report, duplicates included
impl InputSink for Vec<InputEvent> {
    fn report_key(&mut self, code: KeyCode, pressed: bool) {
        self.push(InputEvent::Key { code, pressed });
    }

    fn sync(&mut self) {
        self.push(InputEvent::Sync);
    }
}

/// Input device with key-state tracking and framed event delivery.
#[derive(Debug, Clone, Default)]
pub struct InputDevice {
    name: String,
    down: BTreeSet<KeyCode>,
    /// Events reported since the last sync
    pending: Vec<InputEvent>,
    /// Completed frames, oldest first, each ending in `Sync`
    frames: VecDeque<Vec<InputEvent>>,
}

impl InputDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.down.contains(&code)
    }

    /// Keys currently held, in code order
    pub fn pressed_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.down.iter().copied()
    }

    /// Pop the oldest completed frame
    pub fn next_frame(&mut self) -> Option<Vec<InputEvent>> {
        self.frames.pop_front()
    }

    /// Take every completed frame
    pub fn take_frames(&mut self) -> Vec<Vec<InputEvent>> {
        self.frames.drain(..).collect()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }
}

impl InputSink for InputDevice {
    fn report_key(&mut self, code: KeyCode, pressed: bool) {
        if code.is_reserved() {
            return;
        }
        let changed = if pressed {
            self.down.insert(code)
        } else {
            self.down.remove(&code)
        };
        if changed {
            self.pending.push(InputEvent::Key { code, pressed });
        }
    }

    fn sync(&mut self) {
        // An empty frame carries no information; readers never see one.
        if self.pending.is_empty() {
            return;
        }
        let mut frame = std::mem::take(&mut self.pending);
        frame.push(InputEvent::Sync);
        self.frames.push_back(frame);
    }
}
