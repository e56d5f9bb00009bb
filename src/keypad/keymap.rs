//! Keypad matrix key code tables

use super::{KEYPAD_COLS, KEYPAD_ROWS};
use crate::input::keys::*;
use crate::input::KeyCode;

/// Key code for every (row, column) of the matrix. Positions holding
/// [`KeyCode::RESERVED`] are wired but unbound and never reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodeTable {
    codes: [[KeyCode; KEYPAD_COLS]; KEYPAD_ROWS],
}

const R: KeyCode = KEY_RESERVED;

const TOUCHPAD: [[KeyCode; KEYPAD_COLS]; KEYPAD_ROWS] = [
    [KEY_ENTER, KEY_ENTER, R, R, KEY_SPACE, KEY_Z, KEY_Y, KEY_0, KEY_TAB, R, R],
    [KEY_X, KEY_W, KEY_V, KEY_3, KEY_U, KEY_T, KEY_S, KEY_1, R, R, KEY_RIGHT],
    [KEY_R, KEY_Q, KEY_P, KEY_6, KEY_O, KEY_N, KEY_M, KEY_4, KEY_APOSTROPHE, KEY_DOWN, R],
    [KEY_L, KEY_K, KEY_J, KEY_9, KEY_I, KEY_H, KEY_G, KEY_7, KEY_SLASH, KEY_LEFT, R],
    [KEY_F, KEY_E, KEY_D, R, KEY_C, KEY_B, KEY_A, KEY_EQUAL, KEY_KPASTERISK, KEY_UP, R],
    [R, KEY_LEFTALT, KEY_MINUS, KEY_RIGHTBRACE, KEY_DOT, KEY_LEFTBRACE, KEY_5, R, KEY_SEMICOLON, KEY_BACKSPACE, KEY_DELETE],
    [KEY_BACKSLASH, R, KEY_KPPLUS, KEY_PAGEUP, KEY_2, KEY_PAGEDOWN, KEY_8, KEY_ESC, R, KEY_TAB, R],
    [R, R, R, R, R, R, R, R, KEY_LEFTSHIFT, KEY_LEFTCTRL, KEY_COMMA],
];

const CLICKPAD: [[KeyCode; KEYPAD_COLS]; KEYPAD_ROWS] = [
    [KEY_ENTER, KEY_ENTER, KEY_SPACE, R, KEY_Z, KEY_DOT, KEY_Y, KEY_0, KEY_X, R, R],
    [KEY_COMMA, KEY_KPPLUS, KEY_W, KEY_3, KEY_V, KEY_2, KEY_U, KEY_1, KEY_T, R, R],
    [KEY_KPSLASH, KEY_MINUS, KEY_S, KEY_6, KEY_R, KEY_5, KEY_Q, KEY_4, KEY_P, R, R],
    [KEY_SEMICOLON, KEY_KPASTERISK, KEY_O, KEY_9, KEY_N, KEY_8, KEY_M, KEY_7, KEY_L, R, R],
    [KEY_APOSTROPHE, KEY_SLASH, KEY_K, R, KEY_J, R, KEY_I, R, KEY_H, R, R],
    [KEY_APOSTROPHE, R, KEY_G, KEY_RIGHTBRACE, KEY_F, KEY_LEFTBRACE, KEY_E, KEY_DELETE, KEY_D, KEY_LEFTSHIFT, R],
    [R, KEY_ENTER, KEY_C, KEY_PAGEUP, KEY_B, KEY_PAGEDOWN, KEY_A, KEY_ESC, KEY_BACKSLASH, KEY_TAB, R],
    [KEY_UP, R, KEY_RIGHT, R, KEY_DOWN, R, KEY_LEFT, KEY_BACKSPACE, KEY_LEFTCTRL, R, KEY_EQUAL],
];

impl KeyCodeTable {
    pub const fn new(codes: [[KeyCode; KEYPAD_COLS]; KEYPAD_ROWS]) -> Self {
        Self { codes }
    }

    /// Table with every position unbound
    pub const fn empty() -> Self {
        Self::new([[KEY_RESERVED; KEYPAD_COLS]; KEYPAD_ROWS])
    }

    /// Classic touchpad keypad
    pub const fn touchpad() -> Self {
        Self::new(TOUCHPAD)
    }

    /// Classic clickpad keypad
    pub const fn clickpad() -> Self {
        Self::new(CLICKPAD)
    }

    /// Code at (row, col), `None` outside the matrix
    pub fn get(&self, row: usize, col: usize) -> Option<KeyCode> {
        self.codes.get(row)?.get(col).copied()
    }

    /// Bind one position; returns the previous code
    pub fn set(&mut self, row: usize, col: usize, code: KeyCode) -> Option<KeyCode> {
        let slot = self.codes.get_mut(row)?.get_mut(col)?;
        Some(std::mem::replace(slot, code))
    }

    /// Every bound position as `(row, col, code)`
    pub fn bound(&self) -> impl Iterator<Item = (usize, usize, KeyCode)> + '_ {
        self.codes.iter().enumerate().flat_map(|(row, cols)| {
            cols.iter()
                .enumerate()
                .filter(|(_, code)| !code.is_reserved())
                .map(move |(col, code)| (row, col, *code))
        })
    }
}

impl Default for KeyCodeTable {
    fn default() -> Self {
        Self::empty()
    }
}
