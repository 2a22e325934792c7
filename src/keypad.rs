use crate::u4;

/// Snapshot of the 16-key hexadecimal keypad (true = pressed).
///
/// The input collaborator owns and updates it; the engine only reads it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Keypad([bool; 16]);

impl Keypad {
    pub const fn new() -> Self {
        Self([false; 16])
    }

    pub fn set(&mut self, key: u4, pressed: bool) {
        self.0[key] = pressed;
    }

    pub fn is_pressed(&self, key: u4) -> bool {
        self.0[key]
    }

    /// Lowest-numbered key that is currently held down.
    pub fn first_pressed(&self) -> Option<u4> {
        u4::all().find(|&key| self.0[key])
    }
}

impl From<[bool; 16]> for Keypad {
    fn from(keys: [bool; 16]) -> Self {
        Self(keys)
    }
}
